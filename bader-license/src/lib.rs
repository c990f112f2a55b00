//! Offline license codes for BADER.
//!
//! This crate implements the self-checking, human-transcribable entitlement
//! code format and its acceptance rules:
//! - Code encoding/decoding with an integrity checksum ([`CodeCodec`])
//! - Offline validation and per-platform access gating ([`OfflineValidator`])
//!
//! Both are pure: a disconnected client validates with nothing but the code
//! string and its own clock. No network, no store.
//!
//! # Code format
//!
//! `BADER-PPPP-EEEEEEEE-TTTT-CCCC`, uppercase hex segments:
//! - `PPPP` — capability bits, XOR-masked
//! - `EEEEEEEE` — expiry (Unix seconds), XOR-masked
//! - `TTTT` — tenant hash hint, informational only
//! - `CCCC` — SHA-256 checksum over the preceding segments plus the secret
//!
//! # Security model
//!
//! The XOR masking is a deterrent against casual inspection, not a
//! cryptographic boundary: anyone holding the shared secret, or the
//! algorithm plus enough sample codes, can forge codes. If stronger
//! guarantees are ever needed, replace the masking step with an HMAC or
//! authenticated-encryption scheme behind the same [`CodeCodec`] surface;
//! callers are unaffected.

mod codec;
mod error;
mod validator;

pub use codec::{CodeCodec, DecodedCode, CODE_PREFIX};
pub use error::{LicenseError, LicenseResult};
pub use validator::{AccessDecision, OfflineValidator, Validation};
