//! Offline validation rules on top of the code codec.

use bader_types::{Capabilities, Platform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::CodeCodec;
use crate::error::LicenseError;

/// Outcome of validating a license code at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    /// Present whenever the checksum held, including for expired codes, so
    /// callers can show what a lapsed license used to grant.
    pub capabilities: Option<Capabilities>,
    pub expires_at: Option<DateTime<Utc>>,
    pub tenant_hint: Option<String>,
    pub error: Option<LicenseError>,
}

impl Validation {
    fn failure(error: LicenseError) -> Self {
        Self {
            valid: false,
            capabilities: None,
            expires_at: None,
            tenant_hint: None,
            error: Some(error),
        }
    }
}

/// Result of a platform access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Applies time-based and integrity-based acceptance rules to codes.
///
/// Pure function of (code string, current time); never errors on malformed
/// input, returning tagged failure results instead.
#[derive(Debug, Clone)]
pub struct OfflineValidator {
    codec: CodeCodec,
}

impl OfflineValidator {
    /// Creates a validator over the given codec.
    #[must_use]
    pub fn new(codec: CodeCodec) -> Self {
        Self { codec }
    }

    /// Returns the underlying codec.
    #[must_use]
    pub fn codec(&self) -> &CodeCodec {
        &self.codec
    }

    /// Decodes a code and applies the integrity and expiry rules.
    ///
    /// Structural or checksum failure yields an invalid result with no
    /// payload (fail closed). A checksum-valid but expired code is invalid
    /// with [`LicenseError::Expired`], capabilities still reported.
    #[must_use]
    pub fn validate(&self, code: &str, now: DateTime<Utc>) -> Validation {
        let decoded = match self.codec.decode(code, now) {
            Ok(decoded) => decoded,
            Err(error) => return Validation::failure(error),
        };

        let error = (decoded.expires_at < now).then(|| LicenseError::Expired(decoded.expires_at));
        Validation {
            valid: error.is_none(),
            capabilities: Some(decoded.capabilities),
            expires_at: Some(decoded.expires_at),
            tenant_hint: Some(decoded.tenant_hint),
            error,
        }
    }

    /// Gate for one of the three access platforms.
    ///
    /// Denies with the validation error when the code itself is invalid,
    /// and with an upgrade-suggesting message when the code is fine but the
    /// platform's capability bit is unset.
    #[must_use]
    pub fn check_platform_access(
        &self,
        code: &str,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        let validation = self.validate(code, now);
        if !validation.valid {
            let reason = validation
                .error
                .map_or_else(|| "invalid license".to_string(), |e| e.to_string());
            return AccessDecision::deny(reason);
        }
        match validation.capabilities {
            Some(caps) if caps.grants(platform) => AccessDecision::allow(),
            _ => AccessDecision::deny(LicenseError::PlatformNotLicensed(platform).to_string()),
        }
    }

    /// The sync capability gate.
    ///
    /// Sync is not a platform; the lifecycle manager consults this before
    /// permitting cross-device synchronization.
    #[must_use]
    pub fn sync_allowed(&self, code: &str, now: DateTime<Utc>) -> bool {
        let validation = self.validate(code, now);
        validation.valid && validation.capabilities.is_some_and(|caps| caps.sync)
    }
}
