//! Shared types, errors, and configuration for Claimflow.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy with HTTP mappings
//! - Configuration management
//! - JWT claims and the authenticated principal
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
