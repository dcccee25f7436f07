//! Shared configuration and error types for the kalends workspace.

pub mod config;
pub mod error;
