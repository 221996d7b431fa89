pub mod commands;
pub mod config;
pub mod discord;
pub mod engine;
pub mod error;
pub mod platform;

#[cfg(test)]
pub(crate) mod testing;
