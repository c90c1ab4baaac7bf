pub mod audio;
pub mod config;
pub mod emotion;
pub mod error;
pub mod fusion;
pub mod replay;
pub mod session;
pub mod transcript;

pub use error::{IntakeError, Result};
