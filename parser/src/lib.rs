//! Extraction of approval commands from comment bodies.

pub mod command;
mod error;
mod ignore_block;
pub mod token;

pub use error::Error;
