//! Stateful licensing orchestration for BADER.
//!
//! Two collaborators over the shared [`bader_store::Database`]:
//!
//! - [`LicenseManager`] issues codes and moves them between tenants while
//!   upholding the single-active-license-per-tenant invariant.
//! - [`DeviceRegistry`] tracks which devices log in under which tenants and
//!   enforces administrative blocks.
//!
//! Both are constructed from an [`std::sync::Arc`]-shared database handle;
//! the code secret arrives through [`LicensingConfig`] or directly as a
//! [`bader_license::CodeCodec`].

pub mod config;
mod error;
pub mod manager;
pub mod registry;

pub use config::LicensingConfig;
pub use error::{LicensingError, LicensingResult};
pub use manager::{IssuedLicense, LicenseManager};
pub use registry::{
    DeviceAttributes, DeviceRegistry, DeviceStats, DeviceView, NetworkContext, Registration,
    RegistrationStatus, TenantDeviceCount,
};
