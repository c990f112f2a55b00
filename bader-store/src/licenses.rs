//! License records and queries.

use bader_types::{Capabilities, LicenseId, TenantId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::row::{timestamp_col, uuid_col};

/// A persisted entitlement record.
///
/// Invariant, enforced by the lifecycle manager's transactions: at most one
/// license with `is_active` per non-null `tenant_id` at any time. Licenses
/// are soft-deactivated when superseded, never deleted by normal flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    /// The printable code string, globally unique.
    pub code: String,
    pub capabilities: Capabilities,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// Unassigned licenses exist; assignment binds this exactly once barring
    /// an explicit transfer.
    pub tenant_id: Option<TenantId>,
    /// Set on first hardware activation, immutable thereafter unless
    /// explicitly cleared by an administrator.
    pub hardware_id: Option<String>,
}

const COLUMNS: &str =
    "id, code, desktop, web, mobile, sync, issued_at, expires_at, is_active, tenant_id, hardware_id";

fn from_row(row: &Row<'_>) -> rusqlite::Result<License> {
    let id: String = row.get(0)?;
    let tenant_id: Option<String> = row.get(9)?;
    let tenant_id = match tenant_id {
        Some(raw) => Some(uuid_col(9, &raw, TenantId::parse)?),
        None => None,
    };
    Ok(License {
        id: uuid_col(0, &id, LicenseId::parse)?,
        code: row.get(1)?,
        capabilities: Capabilities::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
        issued_at: timestamp_col(6, row.get(6)?)?,
        expires_at: timestamp_col(7, row.get(7)?)?,
        is_active: row.get(8)?,
        tenant_id,
        hardware_id: row.get(10)?,
    })
}

/// Inserts a new license. Fails on a duplicate code.
pub fn insert(conn: &Connection, license: &License) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO licenses (id, code, desktop, web, mobile, sync, issued_at, expires_at, \
         is_active, tenant_id, hardware_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            license.id.to_string(),
            license.code,
            license.capabilities.desktop,
            license.capabilities.web,
            license.capabilities.mobile,
            license.capabilities.sync,
            license.issued_at.timestamp(),
            license.expires_at.timestamp(),
            license.is_active,
            license.tenant_id.map(|t| t.to_string()),
            license.hardware_id,
        ],
    )?;
    Ok(())
}

/// Writes back every mutable field of an existing license.
pub fn update(conn: &Connection, license: &License) -> StoreResult<()> {
    let rows = conn.execute(
        "UPDATE licenses SET code = ?2, desktop = ?3, web = ?4, mobile = ?5, sync = ?6, \
         issued_at = ?7, expires_at = ?8, is_active = ?9, tenant_id = ?10, hardware_id = ?11 \
         WHERE id = ?1",
        params![
            license.id.to_string(),
            license.code,
            license.capabilities.desktop,
            license.capabilities.web,
            license.capabilities.mobile,
            license.capabilities.sync,
            license.issued_at.timestamp(),
            license.expires_at.timestamp(),
            license.is_active,
            license.tenant_id.map(|t| t.to_string()),
            license.hardware_id,
        ],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!("license {}", license.id)));
    }
    Ok(())
}

/// Looks up a license by id.
pub fn by_id(conn: &Connection, id: &LicenseId) -> StoreResult<Option<License>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM licenses WHERE id = ?1"),
        params![id.to_string()],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Looks up a license by its unique code string.
pub fn by_code(conn: &Connection, code: &str) -> StoreResult<Option<License>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM licenses WHERE code = ?1"),
        params![code],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// All active licenses bound to a tenant, freshest expiry first.
pub fn active_for_tenant(conn: &Connection, tenant: &TenantId) -> StoreResult<Vec<License>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM licenses WHERE tenant_id = ?1 AND is_active = 1 \
         ORDER BY expires_at DESC"
    ))?;
    let rows = stmt.query_map(params![tenant.to_string()], from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Soft-deactivates every active license of a tenant, returning how many
/// rows flipped. Part of the atomic swap every assignment-like operation
/// performs.
pub fn deactivate_for_tenant(conn: &Connection, tenant: &TenantId) -> StoreResult<usize> {
    conn.execute(
        "UPDATE licenses SET is_active = 0 WHERE tenant_id = ?1 AND is_active = 1",
        params![tenant.to_string()],
    )
    .map_err(Into::into)
}
