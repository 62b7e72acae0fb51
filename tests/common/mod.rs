pub mod asserts;
pub mod executors;
pub mod fixtures;

pub use asserts::*;
pub use executors::*;
pub use fixtures::*;
