//! Agri-advisor core.
//!
//! Domain types, the rule matcher, the recommendation and rule-proposal
//! workflows, and the port traits the storage and server layers plug into.
//! This crate never touches sqlx or axum; `agri-postgres` and `agri-server`
//! do.

pub mod advisor;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod ports;
pub mod principal;
pub mod report;
pub mod service;
pub mod types;
pub mod validate;
pub mod weather;

pub use error::{AgriError, FieldError};
pub use principal::{AuthClaims, Principal};
pub use service::{AdvisoryService, AdvisoryServiceImpl};
