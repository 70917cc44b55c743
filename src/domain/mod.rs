//! Domain layer - swap execution and the trade cycle

pub mod execution;
pub mod trading;

#[cfg(test)]
pub(crate) mod testing;
