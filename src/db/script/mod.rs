mod classify;
mod splitter;
mod types;

pub use classify::{classify_statement, is_procedural};
pub use splitter::{parse, parse_file, ScriptSplitter};
pub use types::*;
