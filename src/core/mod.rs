//! Core utilities: configuration, errors, process execution, validation.

pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod validation;

pub use error::{AppError, AppResult};
