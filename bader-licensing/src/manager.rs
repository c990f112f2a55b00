//! License lifecycle operations.
//!
//! All assignment-like operations perform the same atomic swap inside one
//! `BEGIN IMMEDIATE` transaction: deactivate every active license of the
//! target tenant, then bind and activate exactly one. That transaction is
//! what upholds the at-most-one-active-license-per-tenant invariant.

use std::sync::Arc;

use bader_license::{CodeCodec, OfflineValidator};
use bader_store::rusqlite::Connection;
use bader_store::{licenses, tenants, Database, License, Tenant};
use bader_types::{Capabilities, Edition, LicenseId, TenantId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LicensingError, LicensingResult};

/// Days counted per month of issuance.
const DAYS_PER_MONTH: i64 = 30;

/// A freshly issued license together with its derived edition label.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedLicense {
    pub license: License,
    pub code: String,
    pub edition: Edition,
}

/// Stateful orchestrator for license issuance, assignment, and hardware
/// binding.
pub struct LicenseManager {
    db: Arc<Database>,
    codec: CodeCodec,
    validator: OfflineValidator,
}

impl LicenseManager {
    pub fn new(db: Arc<Database>, codec: CodeCodec) -> Self {
        let validator = OfflineValidator::new(codec.clone());
        Self {
            db,
            codec,
            validator,
        }
    }

    /// Returns the validator keyed by this manager's secret.
    #[must_use]
    pub fn validator(&self) -> &OfflineValidator {
        &self.validator
    }

    /// Issues a new license valid for `months` from now.
    ///
    /// With a tenant, issuance itself performs the atomic swap so the new
    /// license immediately becomes the tenant's single active one. Without a
    /// tenant the license is created active but unassigned, waiting for
    /// [`assign`](Self::assign).
    pub fn generate(
        &self,
        tenant: Option<&TenantId>,
        capabilities: Capabilities,
        months: u32,
    ) -> LicensingResult<IssuedLicense> {
        let now = Utc::now();
        let expires_at = now + Duration::days(i64::from(months) * DAYS_PER_MONTH);
        let tenant_key = tenant.map(TenantId::to_string).unwrap_or_default();
        let code = self.codec.encode(&tenant_key, capabilities, expires_at);

        let license = License {
            id: LicenseId::new(),
            code: code.clone(),
            capabilities,
            issued_at: now,
            expires_at,
            is_active: true,
            tenant_id: tenant.copied(),
            hardware_id: None,
        };

        self.db.with_tx(|tx| {
            if let Some(tenant) = tenant {
                licenses::deactivate_for_tenant(tx, tenant)?;
            }
            licenses::insert(tx, &license)?;
            Ok::<_, LicensingError>(())
        })?;

        info!(
            license = %license.id,
            tenant = ?license.tenant_id,
            edition = %capabilities.edition(),
            months,
            "generated license"
        );
        Ok(IssuedLicense {
            license,
            code,
            edition: capabilities.edition(),
        })
    }

    /// Binds an unassigned license to a tenant, deactivating whatever the
    /// tenant held before.
    ///
    /// # Errors
    ///
    /// [`LicensingError::AlreadyAssigned`] when the code is bound to a
    /// different tenant. Re-assigning to the same tenant is permitted and
    /// simply re-activates the license.
    pub fn assign(&self, code: &str, tenant: &TenantId) -> LicensingResult<License> {
        let license = self.db.with_tx(|tx| {
            let mut license = require_license_by_code(tx, code)?;
            if license.tenant_id.is_some_and(|bound| bound != *tenant) {
                return Err(LicensingError::AlreadyAssigned);
            }
            licenses::deactivate_for_tenant(tx, tenant)?;
            license.tenant_id = Some(*tenant);
            license.is_active = true;
            licenses::update(tx, &license)?;
            Ok(license)
        })?;
        info!(license = %license.id, tenant = %tenant, "assigned license");
        Ok(license)
    }

    /// Moves a license to another organization, resolving or creating the
    /// destination tenant from a name or slug.
    ///
    /// Requires `confirm`; transfers are disruptive enough that callers must
    /// opt in explicitly. The destination's previous licenses are
    /// deactivated; the source tenant's other licenses are untouched.
    pub fn transfer(
        &self,
        code: &str,
        destination: &str,
        confirm: bool,
    ) -> LicensingResult<(License, Tenant)> {
        if !confirm {
            return Err(LicensingError::ConfirmationRequired);
        }
        let now = Utc::now();
        let slug = slugify(destination);
        let (license, tenant) = self.db.with_tx(|tx| {
            let mut license = require_license_by_code(tx, code)?;
            let tenant = match tenants::by_slug(tx, &slug)? {
                Some(tenant) => tenant,
                None => {
                    let tenant = Tenant {
                        id: TenantId::new(),
                        name: destination.trim().to_string(),
                        slug: slug.clone(),
                        created_at: now,
                    };
                    tenants::insert(tx, &tenant)?;
                    tenant
                }
            };
            licenses::deactivate_for_tenant(tx, &tenant.id)?;
            license.tenant_id = Some(tenant.id);
            license.is_active = true;
            licenses::update(tx, &license)?;
            Ok::<_, LicensingError>((license, tenant))
        })?;
        info!(license = %license.id, tenant = %tenant.id, slug = %tenant.slug, "transferred license");
        Ok((license, tenant))
    }

    /// Replaces a tenant's current license with a new code.
    ///
    /// # Errors
    ///
    /// [`LicensingError::ForeignLicense`] when the code belongs to another
    /// tenant, [`LicensingError::InactiveLicense`] when it has been
    /// deactivated.
    pub fn upgrade(&self, tenant: &TenantId, new_code: &str) -> LicensingResult<License> {
        let license = self.db.with_tx(|tx| {
            let mut license = require_license_by_code(tx, new_code)?;
            if license.tenant_id.is_some_and(|bound| bound != *tenant) {
                return Err(LicensingError::ForeignLicense);
            }
            if !license.is_active {
                return Err(LicensingError::InactiveLicense);
            }
            licenses::deactivate_for_tenant(tx, tenant)?;
            license.tenant_id = Some(*tenant);
            license.is_active = true;
            licenses::update(tx, &license)?;
            Ok(license)
        })?;
        info!(license = %license.id, tenant = %tenant, "upgraded license");
        Ok(license)
    }

    /// Binds a license to a hardware identifier, first activation wins.
    ///
    /// Subsequent calls are no-ops that return the license as stored, even
    /// when the offered identifier differs; unbinding is an explicit
    /// administrative act via [`clear_hardware`](Self::clear_hardware).
    pub fn activate_hardware(&self, code: &str, hardware_id: &str) -> LicensingResult<License> {
        let (license, bound) = self.db.with_tx(|tx| {
            let mut license = require_license_by_code(tx, code)?;
            if license.hardware_id.is_some() {
                return Ok::<_, LicensingError>((license, false));
            }
            license.hardware_id = Some(hardware_id.to_string());
            licenses::update(tx, &license)?;
            Ok((license, true))
        })?;
        if bound {
            info!(license = %license.id, "bound license to hardware");
        } else {
            debug!(license = %license.id, "hardware already bound, keeping existing binding");
        }
        Ok(license)
    }

    /// Clears a license's hardware binding so it can activate elsewhere.
    pub fn clear_hardware(&self, code: &str) -> LicensingResult<License> {
        let license = self.db.with_tx(|tx| {
            let mut license = require_license_by_code(tx, code)?;
            license.hardware_id = None;
            licenses::update(tx, &license)?;
            Ok::<_, LicensingError>(license)
        })?;
        info!(license = %license.id, "cleared hardware binding");
        Ok(license)
    }

    /// The tenant's current active license, if any.
    pub fn active_license(&self, tenant: &TenantId) -> LicensingResult<Option<License>> {
        self.db.with_conn(|conn| {
            Ok(licenses::active_for_tenant(conn, tenant)?.into_iter().next())
        })
    }

    /// Whether the tenant's active license permits cross-device sync now.
    ///
    /// A tenant with no active license never syncs.
    pub fn sync_allowed(&self, tenant: &TenantId, now: DateTime<Utc>) -> LicensingResult<bool> {
        let license = self.active_license(tenant)?;
        Ok(license.is_some_and(|l| self.validator.sync_allowed(&l.code, now)))
    }
}

fn require_license_by_code(conn: &Connection, code: &str) -> LicensingResult<License> {
    licenses::by_code(conn, code)?
        .ok_or_else(|| LicensingError::NotFound(format!("license code {code}")))
}

/// Lowercases and collapses a display name into a URL-safe slug.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
