pub mod agent;
pub mod analysis;
pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod samples;
pub mod session;
pub mod types;

pub use types::*;
