//! Core type definitions for the BADER licensing core.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the entitlement engine:
//! - Tenant, license, and activation identifiers (UUID v7)
//! - Capability flags and the platform access matrix
//! - Edition labels derived from capability patterns
//!
//! Persisted records belong to `bader-store` and stateful orchestration to
//! `bader-licensing`; nothing here performs I/O.

mod capability;
mod ids;

pub use capability::{Capabilities, Edition, Platform};
pub use ids::{ActivationId, LicenseId, TenantId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
