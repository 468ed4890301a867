//! # webobs-core
//!
//! Core crate for WebObs. Contains the configuration schemas and the
//! unified error system shared by the relay engine and the HTTP layer.
//!
//! This crate has **no** internal dependencies on other WebObs crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
