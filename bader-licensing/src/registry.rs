//! Device registration, blocking, and fleet statistics.
//!
//! Devices are keyed by `(tenant, device_id)`. The fingerprint is a derived
//! digest over the hardware-ish attributes; it is recomputed on every
//! registration and stored as tamper evidence, never used for identity.

use std::sync::Arc;

use bader_store::rusqlite::Connection;
use bader_store::{
    activations, licenses, tenants, ActivationFilter, ActivationTotals, Database, DeviceActivation,
};
use bader_types::{ActivationId, TenantId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{LicensingError, LicensingResult};

/// How many recently seen devices the stats view includes.
const RECENT_ACTIVATIONS: u32 = 10;

/// Tenant name shown when an activation's tenant row no longer exists.
const UNKNOWN_TENANT: &str = "unknown";

/// Reason reported for a blocked device whose row carries none.
const DEFAULT_BLOCK_REASON: &str = "unauthorized access";

/// Device-reported attributes accompanying a registration.
///
/// `device_id` is the client's stable identifier and the only mandatory
/// field. Everything else is descriptive and overwritten wholesale on each
/// registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub device_id: String,
    pub user_id: Option<String>,
    pub device_name: Option<String>,
    pub device_type: Option<String>,
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub cpu_info: Option<String>,
    pub ram_size: Option<String>,
    pub screen_resolution: Option<String>,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub mac_address: Option<String>,
    pub disk_serial: Option<String>,
}

/// Connection-level context observed server-side, not device-reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Whether a registration created a new record or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Updated,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub status: RegistrationStatus,
    pub activation_id: ActivationId,
}

/// An activation joined with its resolved tenant name, for admin views.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    pub activation: DeviceActivation,
    pub tenant_name: String,
}

/// Per-tenant device count with the tenant name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TenantDeviceCount {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub devices: u64,
}

/// Fleet-wide (or tenant-scoped) device statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    pub totals: ActivationTotals,
    pub by_platform: Vec<(String, u64)>,
    pub by_device_type: Vec<(String, u64)>,
    pub by_tenant: Vec<TenantDeviceCount>,
    pub recent: Vec<DeviceView>,
}

/// Tracks which devices have activated under which tenants.
pub struct DeviceRegistry {
    db: Arc<Database>,
}

impl DeviceRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Digest of the hardware-ish attributes: SHA-256 over the pipe-joined
    /// sequence device id, platform, hostname, MAC, disk serial, CPU info
    /// (missing fields contribute empty strings), truncated to 32 hex chars.
    #[must_use]
    pub fn fingerprint(attrs: &DeviceAttributes) -> String {
        let parts = [
            attrs.device_id.as_str(),
            attrs.platform.as_deref().unwrap_or(""),
            attrs.hostname.as_deref().unwrap_or(""),
            attrs.mac_address.as_deref().unwrap_or(""),
            attrs.disk_serial.as_deref().unwrap_or(""),
            attrs.cpu_info.as_deref().unwrap_or(""),
        ];
        let digest = Sha256::digest(parts.join("|").as_bytes());
        digest[..16].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Registers a device login under a tenant, upserting on
    /// `(tenant, device_id)`.
    ///
    /// An existing record gets its descriptive fields overwritten, its
    /// fingerprint recomputed, `login_count` bumped, and `last_seen` /
    /// `last_login` stamped. The tenant's active license id is linked when
    /// one exists; otherwise any previous link is kept.
    ///
    /// # Errors
    ///
    /// [`LicensingError::DeviceBlocked`] when the record is blocked; the
    /// row is left untouched, including its counters.
    pub fn register(
        &self,
        tenant: &TenantId,
        attrs: DeviceAttributes,
        network: NetworkContext,
    ) -> LicensingResult<Registration> {
        let now = Utc::now();
        let fingerprint = Self::fingerprint(&attrs);
        let device_id = attrs.device_id.clone();

        let result = self.db.with_tx(|tx| {
            let active_license = licenses::active_for_tenant(tx, tenant)?
                .into_iter()
                .next()
                .map(|l| l.id);
            match activations::by_tenant_and_device(tx, tenant, &attrs.device_id)? {
                Some(existing) if existing.is_blocked => Err(LicensingError::DeviceBlocked {
                    reason: existing
                        .block_reason
                        .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
                }),
                Some(mut existing) => {
                    existing.license_id = active_license.or(existing.license_id);
                    existing.user_id = attrs.user_id.or(existing.user_id);
                    existing.device_fingerprint = fingerprint;
                    existing.device_name = attrs.device_name;
                    existing.device_type = attrs.device_type;
                    existing.platform = attrs.platform;
                    existing.os_version = attrs.os_version;
                    existing.app_version = attrs.app_version;
                    existing.cpu_info = attrs.cpu_info;
                    existing.ram_size = attrs.ram_size;
                    existing.screen_resolution = attrs.screen_resolution;
                    existing.hostname = attrs.hostname;
                    existing.username = attrs.username;
                    existing.mac_address = attrs.mac_address;
                    existing.disk_serial = attrs.disk_serial;
                    existing.ip_address = network.ip_address;
                    existing.user_agent = network.user_agent;
                    existing.last_seen = now;
                    existing.last_login = Some(now);
                    existing.login_count += 1;
                    activations::update(tx, &existing)?;
                    Ok((RegistrationStatus::Updated, existing.id))
                }
                None => {
                    let activation = DeviceActivation {
                        id: ActivationId::new(),
                        tenant_id: *tenant,
                        license_id: active_license,
                        user_id: attrs.user_id,
                        device_id: attrs.device_id,
                        device_fingerprint: fingerprint,
                        device_name: attrs.device_name,
                        device_type: attrs.device_type,
                        platform: attrs.platform,
                        os_version: attrs.os_version,
                        app_version: attrs.app_version,
                        cpu_info: attrs.cpu_info,
                        ram_size: attrs.ram_size,
                        screen_resolution: attrs.screen_resolution,
                        hostname: attrs.hostname,
                        username: attrs.username,
                        mac_address: attrs.mac_address,
                        disk_serial: attrs.disk_serial,
                        ip_address: network.ip_address,
                        user_agent: network.user_agent,
                        first_seen: now,
                        last_seen: now,
                        last_login: Some(now),
                        login_count: 1,
                        is_active: true,
                        is_blocked: false,
                        block_reason: None,
                    };
                    activations::insert(tx, &activation)?;
                    Ok((RegistrationStatus::Registered, activation.id))
                }
            }
        });

        match result {
            Ok((status, activation_id)) => {
                debug!(tenant = %tenant, device = %device_id, ?status, "registered device login");
                Ok(Registration {
                    status,
                    activation_id,
                })
            }
            Err(error) => {
                if let LicensingError::DeviceBlocked { reason } = &error {
                    warn!(tenant = %tenant, device = %device_id, reason = %reason, "rejected blocked device");
                }
                Err(error)
            }
        }
    }

    /// Blocks a device. Its history stays; the next registration fails.
    ///
    /// Idempotent; blocking an already-blocked device updates the reason
    /// when one is supplied.
    pub fn block(
        &self,
        id: &ActivationId,
        reason: Option<String>,
    ) -> LicensingResult<DeviceActivation> {
        let activation = self.db.with_tx(|tx| {
            let mut activation = require_activation(tx, id)?;
            activation.is_blocked = true;
            activation.block_reason = reason.or(activation.block_reason);
            activations::update(tx, &activation)?;
            Ok::<_, LicensingError>(activation)
        })?;
        info!(activation = %activation.id, tenant = %activation.tenant_id, "blocked device");
        Ok(activation)
    }

    /// Lifts a block, clearing the stored reason. Idempotent.
    pub fn unblock(&self, id: &ActivationId) -> LicensingResult<DeviceActivation> {
        let activation = self.db.with_tx(|tx| {
            let mut activation = require_activation(tx, id)?;
            activation.is_blocked = false;
            activation.block_reason = None;
            activations::update(tx, &activation)?;
            Ok::<_, LicensingError>(activation)
        })?;
        info!(activation = %activation.id, tenant = %activation.tenant_id, "unblocked device");
        Ok(activation)
    }

    /// Deletes a device record and its history outright.
    pub fn remove(&self, id: &ActivationId) -> LicensingResult<()> {
        self.db.with_tx(|tx| {
            require_activation(tx, id)?;
            activations::delete(tx, id)?;
            Ok::<_, LicensingError>(())
        })?;
        info!(activation = %id, "removed device record");
        Ok(())
    }

    /// Filtered admin listing, most recently seen first.
    pub fn list(&self, filter: &ActivationFilter) -> LicensingResult<Vec<DeviceView>> {
        self.db.with_conn(|conn| {
            activations::list(conn, filter)?
                .into_iter()
                .map(|activation| resolve_view(conn, activation))
                .collect()
        })
    }

    /// Aggregate statistics, fleet-wide or scoped to one tenant.
    ///
    /// Tenant rows may lag behind activations (or be gone entirely); such
    /// entries render with the `unknown` name rather than failing the view.
    pub fn stats(&self, scope: Option<&TenantId>) -> LicensingResult<DeviceStats> {
        self.db.with_conn(|conn| {
            let totals = activations::totals(conn, scope)?;
            let by_platform = activations::count_by_platform(conn, scope)?;
            let by_device_type = activations::count_by_device_type(conn, scope)?;

            let mut by_tenant = Vec::new();
            for (tenant_id, devices) in activations::count_by_tenant(conn)? {
                if scope.is_some_and(|s| *s != tenant_id) {
                    continue;
                }
                by_tenant.push(TenantDeviceCount {
                    tenant_id,
                    tenant_name: tenant_name(conn, &tenant_id)?,
                    devices,
                });
            }

            let recent = activations::recent(conn, RECENT_ACTIVATIONS, scope)?
                .into_iter()
                .map(|activation| resolve_view(conn, activation))
                .collect::<LicensingResult<Vec<_>>>()?;

            Ok(DeviceStats {
                totals,
                by_platform,
                by_device_type,
                by_tenant,
                recent,
            })
        })
    }
}

fn require_activation(conn: &Connection, id: &ActivationId) -> LicensingResult<DeviceActivation> {
    activations::by_id(conn, id)?.ok_or_else(|| LicensingError::NotFound(format!("activation {id}")))
}

fn tenant_name(conn: &Connection, id: &TenantId) -> LicensingResult<String> {
    Ok(tenants::by_id(conn, id)?.map_or_else(|| UNKNOWN_TENANT.to_string(), |t| t.name))
}

fn resolve_view(conn: &Connection, activation: DeviceActivation) -> LicensingResult<DeviceView> {
    let tenant_name = tenant_name(conn, &activation.tenant_id)?;
    Ok(DeviceView {
        activation,
        tenant_name,
    })
}
