//! Shared helpers for license code tests.

#![allow(dead_code)]

use bader_license::{CodeCodec, CODE_PREFIX};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Deterministic secret; the fixed-vector tests below depend on it.
pub const SECRET: &str = "bader-test-secret";

pub fn codec() -> CodeCodec {
    CodeCodec::new(SECRET)
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Rebuilds the checksum the way the codec does, so tests can forge codes
/// with arbitrary payload segments (including non-hex ones).
pub fn forge_code(platform_seg: &str, expiry_seg: &str, tenant_seg: &str) -> String {
    let digest =
        Sha256::digest(format!("{platform_seg}{expiry_seg}{tenant_seg}{SECRET}").as_bytes());
    let checksum = format!("{:02X}{:02X}", digest[0], digest[1]);
    format!("{CODE_PREFIX}-{platform_seg}-{expiry_seg}-{tenant_seg}-{checksum}")
}
