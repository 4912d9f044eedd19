mod executor;
mod plan;

pub use executor::*;
pub use plan::*;

#[cfg(test)]
mod runner_tests;
