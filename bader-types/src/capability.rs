//! Capability flags, the platform access matrix, and edition labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three access surfaces a license can gate.
///
/// `sync` is deliberately not a platform: it is a capability consumed by the
/// lifecycle manager as an extra gate (cross-device synchronization) and is
/// never matched against a platform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Desktop,
    Web,
    Mobile,
}

impl Platform {
    /// All platforms, in bit order.
    pub const ALL: [Platform; 3] = [Platform::Desktop, Platform::Web, Platform::Mobile];

    /// Returns the lowercase wire name of the platform.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Web => "web",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Self::Desktop),
            "web" => Ok(Self::Web),
            "mobile" => Ok(Self::Mobile),
            other => Err(crate::Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// The four independently grantable capability flags of a license.
///
/// Bit layout (low nibble): bit 0 desktop, bit 1 web, bit 2 mobile,
/// bit 3 sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub desktop: bool,
    pub web: bool,
    pub mobile: bool,
    pub sync: bool,
}

impl Capabilities {
    /// Creates a capability set from individual flags.
    #[must_use]
    pub const fn new(desktop: bool, web: bool, mobile: bool, sync: bool) -> Self {
        Self {
            desktop,
            web,
            mobile,
            sync,
        }
    }

    /// Desktop-only access (the LOCAL edition).
    #[must_use]
    pub const fn local() -> Self {
        Self::new(true, false, false, false)
    }

    /// Web + mobile + sync without desktop (the ONLINE edition).
    #[must_use]
    pub const fn online() -> Self {
        Self::new(false, true, true, true)
    }

    /// All three platforms plus sync (the HYBRID edition).
    #[must_use]
    pub const fn hybrid() -> Self {
        Self::new(true, true, true, true)
    }

    /// Packs the flags into the low nibble of a byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        (self.desktop as u8)
            | ((self.web as u8) << 1)
            | ((self.mobile as u8) << 2)
            | ((self.sync as u8) << 3)
    }

    /// Unpacks a capability set from the low nibble of a byte; higher bits
    /// are ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            desktop: bits & 0b0001 != 0,
            web: bits & 0b0010 != 0,
            mobile: bits & 0b0100 != 0,
            sync: bits & 0b1000 != 0,
        }
    }

    /// Returns whether the capability for the given platform is granted.
    #[must_use]
    pub fn grants(self, platform: Platform) -> bool {
        match platform {
            Platform::Desktop => self.desktop,
            Platform::Web => self.web,
            Platform::Mobile => self.mobile,
        }
    }

    /// Classifies the flag pattern into its edition label.
    ///
    /// Total over all 16 combinations: the three named patterns map to
    /// their editions, everything else is CUSTOM.
    #[must_use]
    pub fn edition(self) -> Edition {
        match (self.desktop, self.web, self.mobile, self.sync) {
            (true, false, false, false) => Edition::Local,
            (false, true, true, true) => Edition::Online,
            (true, true, true, true) => Edition::Hybrid,
            _ => Edition::Custom,
        }
    }
}

/// Human-readable label for a capability pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Edition {
    Local,
    Online,
    Hybrid,
    Custom,
}

impl Edition {
    /// Returns the uppercase label used in admin tooling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Online => "ONLINE",
            Self::Hybrid => "HYBRID",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
