//! Embedder-facing configuration.

use bader_license::CodeCodec;
use serde::{Deserialize, Serialize};

/// Configuration an embedding application supplies to the licensing core.
///
/// The code secret is the only mandatory value; it keys both the masking of
/// code payload segments and the code checksum. Rotating it invalidates
/// every outstanding code, so treat it as deployment-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicensingConfig {
    pub code_secret: String,
    /// Issuance duration used when the caller does not specify one.
    #[serde(default = "default_license_months")]
    pub default_license_months: u32,
}

fn default_license_months() -> u32 {
    12
}

impl LicensingConfig {
    /// Builds the code codec keyed by this configuration's secret.
    #[must_use]
    pub fn codec(&self) -> CodeCodec {
        CodeCodec::new(self.code_secret.clone())
    }
}
