mod basic;
mod interface;
mod lock;
mod mutex;
mod state;
#[cfg(test)]
mod tests;

pub use basic::*;
pub use interface::*;
pub use lock::*;
pub use mutex::*;
