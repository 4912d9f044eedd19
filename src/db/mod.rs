pub mod connection;
pub mod runner;
pub mod script;
pub mod storedproc;
pub mod validate;

pub use connection::*;
pub use runner::*;
pub use script::*;
pub use validate::*;
