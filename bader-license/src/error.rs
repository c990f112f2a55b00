//! Error types for the license code module.

use bader_types::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// License code errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LicenseError {
    /// Wrong prefix, wrong segment count, or a non-hex payload segment.
    #[error("malformed license code: {0}")]
    MalformedCode(String),

    /// Checksum mismatch; no decoded payload can be trusted.
    #[error("license code failed its integrity check")]
    IntegrityFailure,

    /// Checksum valid, but the expiry lies in the past.
    #[error("license expired on {0}")]
    Expired(DateTime<Utc>),

    /// Valid, unexpired code that does not grant the requested platform.
    #[error("{0} access is not included in this license; upgrade the license to enable it")]
    PlatformNotLicensed(Platform),
}

/// Result type for license code operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
