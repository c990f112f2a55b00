//! License code encoding and decoding.
//!
//! The masking key is the first 4 bytes of MD5 over the shared secret,
//! interpreted big-endian. Capability bits and the expiry timestamp are
//! XORed with it before rendering as hex; the tenant segment and checksum
//! are SHA-256 prefixes. Segment order is covered by the checksum and must
//! not change independently per field.

use bader_types::Capabilities;
use chrono::{DateTime, Duration, Utc};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LicenseError, LicenseResult};

/// Literal prefix of every license code.
pub const CODE_PREFIX: &str = "BADER";

/// Window applied when a checksum-valid code carries an expiry segment that
/// does not parse: one year from the decode instant.
const CORRUPT_EXPIRY_FALLBACK_DAYS: i64 = 365;

/// The payload recovered from a structurally valid, checksum-valid code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCode {
    pub capabilities: Capabilities,
    pub expires_at: DateTime<Utc>,
    /// First 4 hex chars of the tenant hash, as carried in the code.
    /// Informational only: it is never re-checked against a persisted
    /// tenant id and must not be treated as an authorization signal.
    pub tenant_hint: String,
}

/// Encoder/decoder for BADER license codes.
///
/// The shared secret is injected at construction so tests can supply
/// deterministic secrets and deployments can choose their own. There is no
/// key-rotation path: decoding only ever consults the single configured
/// secret, so rotating it invalidates every outstanding code.
#[derive(Debug, Clone)]
pub struct CodeCodec {
    secret: String,
    mask: u32,
}

impl CodeCodec {
    /// Creates a codec over the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let digest = Md5::digest(secret.as_bytes());
        let mask = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        Self { secret, mask }
    }

    /// Encodes capabilities, an expiry, and a tenant identifier into a code.
    ///
    /// The tenant identifier contributes only the informational `TTTT`
    /// segment; pass an empty string when issuing an unassigned code.
    #[must_use]
    pub fn encode(
        &self,
        tenant: &str,
        capabilities: Capabilities,
        expires_at: DateTime<Utc>,
    ) -> String {
        let bits = u32::from(capabilities.bits());
        let platform_seg = format!("{:04X}", (bits ^ self.mask) & 0xFFFF);
        let expiry_secs = expires_at.timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let expiry_seg = format!("{:08X}", expiry_secs ^ self.mask);
        let tenant_seg = tenant_segment(tenant);
        let checksum = self.checksum(&platform_seg, &expiry_seg, &tenant_seg);
        format!("{CODE_PREFIX}-{platform_seg}-{expiry_seg}-{tenant_seg}-{checksum}")
    }

    /// Decodes and integrity-checks a code.
    ///
    /// `now` is consulted only for the corrupt-expiry fallback documented
    /// below; the decode itself needs no clock, network, or store access.
    ///
    /// # Errors
    ///
    /// [`LicenseError::MalformedCode`] for a wrong prefix, wrong segment
    /// count, or a non-hex capability segment; [`LicenseError::IntegrityFailure`]
    /// for a checksum mismatch. Both fail closed: no payload is returned.
    pub fn decode(&self, code: &str, now: DateTime<Utc>) -> LicenseResult<DecodedCode> {
        let code = code.trim();
        let parts: Vec<&str> = code.split('-').collect();
        if parts.len() != 5 {
            return Err(LicenseError::MalformedCode(format!(
                "expected 5 hyphen-separated parts, found {}",
                parts.len()
            )));
        }
        if parts[0] != CODE_PREFIX {
            return Err(LicenseError::MalformedCode(format!(
                "missing {CODE_PREFIX} prefix"
            )));
        }
        let (platform_seg, expiry_seg, tenant_seg, provided) =
            (parts[1], parts[2], parts[3], parts[4]);

        let expected = self.checksum(platform_seg, expiry_seg, tenant_seg);
        if !provided.eq_ignore_ascii_case(&expected) {
            return Err(LicenseError::IntegrityFailure);
        }

        let bits = u32::from_str_radix(platform_seg, 16).map_err(|_| {
            LicenseError::MalformedCode("capability segment is not hexadecimal".to_string())
        })?;
        let capabilities = Capabilities::from_bits(((bits ^ self.mask) & 0xF) as u8);

        // Intentional fallback, not an oversight: a checksum-valid code whose
        // expiry segment fails to parse decodes successfully with an expiry
        // one year out instead of erroring. Damage confined to this segment
        // should not brick an otherwise self-consistent code.
        let expires_at = u32::from_str_radix(expiry_seg, 16)
            .ok()
            .and_then(|raw| DateTime::from_timestamp(i64::from(raw ^ self.mask), 0))
            .unwrap_or_else(|| now + Duration::days(CORRUPT_EXPIRY_FALLBACK_DAYS));

        Ok(DecodedCode {
            capabilities,
            expires_at,
            tenant_hint: tenant_seg.to_ascii_uppercase(),
        })
    }

    /// Checksum segment: first 4 uppercase hex chars of SHA-256 over the
    /// three payload segments followed by the shared secret.
    pub(crate) fn checksum(&self, platform_seg: &str, expiry_seg: &str, tenant_seg: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(platform_seg.as_bytes());
        hasher.update(expiry_seg.as_bytes());
        hasher.update(tenant_seg.as_bytes());
        hasher.update(self.secret.as_bytes());
        let digest = hasher.finalize();
        format!("{:02X}{:02X}", digest[0], digest[1])
    }
}

/// Tenant segment: first 4 uppercase hex chars of SHA-256 over the tenant
/// identifier.
fn tenant_segment(tenant: &str) -> String {
    let digest = Sha256::digest(tenant.as_bytes());
    format!("{:02X}{:02X}", digest[0], digest[1])
}
