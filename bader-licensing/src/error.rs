//! Error type for lifecycle and registry operations.

use bader_license::LicenseError;
use bader_store::StoreError;
use thiserror::Error;

pub type LicensingResult<T> = Result<T, LicensingError>;

#[derive(Debug, Error)]
pub enum LicensingError {
    #[error("license is already assigned to another tenant")]
    AlreadyAssigned,

    #[error("license belongs to a different tenant")]
    ForeignLicense,

    #[error("license has been deactivated")]
    InactiveLicense,

    #[error("transfer requires explicit confirmation")]
    ConfirmationRequired,

    #[error("device is blocked: {reason}")]
    DeviceBlocked { reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    License(#[from] LicenseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
