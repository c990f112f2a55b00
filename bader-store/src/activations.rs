//! Device activation records and queries.
//!
//! One row per `(tenant_id, device_id)` pair, upserted on every login and
//! never auto-deleted. Aggregation queries back the admin statistics view.

use bader_types::{ActivationId, LicenseId, TenantId};
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::row::{timestamp_col, uuid_col};

/// A persisted device registration record for one tenant/device pair.
///
/// `device_id` is the client-supplied identity key; `device_fingerprint` is
/// a derived tamper-evidence signal, recomputed on every registration and
/// never used for lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceActivation {
    pub id: ActivationId,
    pub tenant_id: TenantId,
    pub license_id: Option<LicenseId>,
    pub user_id: Option<String>,
    pub device_id: String,
    pub device_fingerprint: String,
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
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_count: i64,
    pub is_active: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
}

/// Filters for the administrative device listing.
#[derive(Debug, Clone, Default)]
pub struct ActivationFilter {
    pub tenant_id: Option<TenantId>,
    pub platform: Option<String>,
    pub device_type: Option<String>,
    pub is_blocked: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Aggregate activation counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivationTotals {
    pub total: u64,
    /// Active and not blocked.
    pub active: u64,
    pub blocked: u64,
}

const COLUMNS: &str = "id, tenant_id, license_id, user_id, device_id, device_fingerprint, \
     device_name, device_type, platform, os_version, app_version, cpu_info, ram_size, \
     screen_resolution, hostname, username, mac_address, disk_serial, ip_address, user_agent, \
     first_seen, last_seen, last_login, login_count, is_active, is_blocked, block_reason";

fn from_row(row: &Row<'_>) -> rusqlite::Result<DeviceActivation> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let license_id: Option<String> = row.get(2)?;
    let license_id = match license_id {
        Some(raw) => Some(uuid_col(2, &raw, LicenseId::parse)?),
        None => None,
    };
    let last_login: Option<i64> = row.get(22)?;
    let last_login = match last_login {
        Some(secs) => Some(timestamp_col(22, secs)?),
        None => None,
    };
    Ok(DeviceActivation {
        id: uuid_col(0, &id, ActivationId::parse)?,
        tenant_id: uuid_col(1, &tenant_id, TenantId::parse)?,
        license_id,
        user_id: row.get(3)?,
        device_id: row.get(4)?,
        device_fingerprint: row.get(5)?,
        device_name: row.get(6)?,
        device_type: row.get(7)?,
        platform: row.get(8)?,
        os_version: row.get(9)?,
        app_version: row.get(10)?,
        cpu_info: row.get(11)?,
        ram_size: row.get(12)?,
        screen_resolution: row.get(13)?,
        hostname: row.get(14)?,
        username: row.get(15)?,
        mac_address: row.get(16)?,
        disk_serial: row.get(17)?,
        ip_address: row.get(18)?,
        user_agent: row.get(19)?,
        first_seen: timestamp_col(20, row.get(20)?)?,
        last_seen: timestamp_col(21, row.get(21)?)?,
        last_login,
        login_count: row.get(23)?,
        is_active: row.get(24)?,
        is_blocked: row.get(25)?,
        block_reason: row.get(26)?,
    })
}

/// Inserts a new activation row. Fails if the `(tenant_id, device_id)` pair
/// already exists.
pub fn insert(conn: &Connection, activation: &DeviceActivation) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO device_activations (id, tenant_id, license_id, user_id, device_id, \
         device_fingerprint, device_name, device_type, platform, os_version, app_version, \
         cpu_info, ram_size, screen_resolution, hostname, username, mac_address, disk_serial, \
         ip_address, user_agent, first_seen, last_seen, last_login, login_count, is_active, \
         is_blocked, block_reason) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
        params![
            activation.id.to_string(),
            activation.tenant_id.to_string(),
            activation.license_id.map(|l| l.to_string()),
            activation.user_id,
            activation.device_id,
            activation.device_fingerprint,
            activation.device_name,
            activation.device_type,
            activation.platform,
            activation.os_version,
            activation.app_version,
            activation.cpu_info,
            activation.ram_size,
            activation.screen_resolution,
            activation.hostname,
            activation.username,
            activation.mac_address,
            activation.disk_serial,
            activation.ip_address,
            activation.user_agent,
            activation.first_seen.timestamp(),
            activation.last_seen.timestamp(),
            activation.last_login.map(|t| t.timestamp()),
            activation.login_count,
            activation.is_active,
            activation.is_blocked,
            activation.block_reason,
        ],
    )?;
    Ok(())
}

/// Writes back every mutable field of an existing activation.
pub fn update(conn: &Connection, activation: &DeviceActivation) -> StoreResult<()> {
    let rows = conn.execute(
        "UPDATE device_activations SET tenant_id = ?2, license_id = ?3, user_id = ?4, \
         device_id = ?5, device_fingerprint = ?6, device_name = ?7, device_type = ?8, \
         platform = ?9, os_version = ?10, app_version = ?11, cpu_info = ?12, ram_size = ?13, \
         screen_resolution = ?14, hostname = ?15, username = ?16, mac_address = ?17, \
         disk_serial = ?18, ip_address = ?19, user_agent = ?20, first_seen = ?21, \
         last_seen = ?22, last_login = ?23, login_count = ?24, is_active = ?25, \
         is_blocked = ?26, block_reason = ?27 \
         WHERE id = ?1",
        params![
            activation.id.to_string(),
            activation.tenant_id.to_string(),
            activation.license_id.map(|l| l.to_string()),
            activation.user_id,
            activation.device_id,
            activation.device_fingerprint,
            activation.device_name,
            activation.device_type,
            activation.platform,
            activation.os_version,
            activation.app_version,
            activation.cpu_info,
            activation.ram_size,
            activation.screen_resolution,
            activation.hostname,
            activation.username,
            activation.mac_address,
            activation.disk_serial,
            activation.ip_address,
            activation.user_agent,
            activation.first_seen.timestamp(),
            activation.last_seen.timestamp(),
            activation.last_login.map(|t| t.timestamp()),
            activation.login_count,
            activation.is_active,
            activation.is_blocked,
            activation.block_reason,
        ],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!("activation {}", activation.id)));
    }
    Ok(())
}

/// Looks up an activation by id.
pub fn by_id(conn: &Connection, id: &ActivationId) -> StoreResult<Option<DeviceActivation>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM device_activations WHERE id = ?1"),
        params![id.to_string()],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Looks up the activation for a tenant/device pair, the registry's upsert
/// key.
pub fn by_tenant_and_device(
    conn: &Connection,
    tenant: &TenantId,
    device_id: &str,
) -> StoreResult<Option<DeviceActivation>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM device_activations WHERE tenant_id = ?1 AND device_id = ?2"),
        params![tenant.to_string(), device_id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Deletes an activation row and its history. Admin-only path.
pub fn delete(conn: &Connection, id: &ActivationId) -> StoreResult<()> {
    let rows = conn.execute(
        "DELETE FROM device_activations WHERE id = ?1",
        params![id.to_string()],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!("activation {id}")));
    }
    Ok(())
}

/// Filtered administrative listing, most recently seen first.
pub fn list(conn: &Connection, filter: &ActivationFilter) -> StoreResult<Vec<DeviceActivation>> {
    let mut sql = format!("SELECT {COLUMNS} FROM device_activations WHERE 1 = 1");
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(tenant) = &filter.tenant_id {
        sql.push_str(&format!(" AND tenant_id = ?{}", args.len() + 1));
        args.push(Box::new(tenant.to_string()));
    }
    if let Some(platform) = &filter.platform {
        sql.push_str(&format!(" AND platform = ?{}", args.len() + 1));
        args.push(Box::new(platform.clone()));
    }
    if let Some(device_type) = &filter.device_type {
        sql.push_str(&format!(" AND device_type = ?{}", args.len() + 1));
        args.push(Box::new(device_type.clone()));
    }
    if let Some(blocked) = filter.is_blocked {
        sql.push_str(&format!(" AND is_blocked = ?{}", args.len() + 1));
        args.push(Box::new(blocked));
    }
    sql.push_str(" ORDER BY last_seen DESC");
    sql.push_str(&format!(
        " LIMIT {} OFFSET {}",
        filter.limit.unwrap_or(100),
        filter.offset
    ));

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// The `limit` most recently seen activations, optionally scoped to one
/// tenant.
pub fn recent(
    conn: &Connection,
    limit: u32,
    scope: Option<&TenantId>,
) -> StoreResult<Vec<DeviceActivation>> {
    list(
        conn,
        &ActivationFilter {
            tenant_id: scope.copied(),
            limit: Some(limit),
            ..ActivationFilter::default()
        },
    )
}

/// Total / active / blocked counts, optionally scoped to one tenant.
pub fn totals(conn: &Connection, scope: Option<&TenantId>) -> StoreResult<ActivationTotals> {
    let sql = format!(
        "SELECT COUNT(*), \
         COALESCE(SUM(CASE WHEN is_active = 1 AND is_blocked = 0 THEN 1 ELSE 0 END), 0), \
         COALESCE(SUM(CASE WHEN is_blocked = 1 THEN 1 ELSE 0 END), 0) \
         FROM device_activations{}",
        scope.map_or(String::new(), |_| " WHERE tenant_id = ?1".to_string())
    );
    let map = |row: &Row<'_>| {
        Ok(ActivationTotals {
            total: row.get::<_, i64>(0)? as u64,
            active: row.get::<_, i64>(1)? as u64,
            blocked: row.get::<_, i64>(2)? as u64,
        })
    };
    let totals = match scope {
        Some(tenant) => conn.query_row(&sql, params![tenant.to_string()], map)?,
        None => conn.query_row(&sql, [], map)?,
    };
    Ok(totals)
}

/// Activation counts grouped by platform, largest group first. Rows without
/// a platform are reported as `unknown`.
pub fn count_by_platform(
    conn: &Connection,
    scope: Option<&TenantId>,
) -> StoreResult<Vec<(String, u64)>> {
    count_by_column(conn, "platform", scope)
}

/// Activation counts grouped by device type, largest group first. Rows
/// without a type are reported as `unknown`.
pub fn count_by_device_type(
    conn: &Connection,
    scope: Option<&TenantId>,
) -> StoreResult<Vec<(String, u64)>> {
    count_by_column(conn, "device_type", scope)
}

fn count_by_column(
    conn: &Connection,
    column: &str,
    scope: Option<&TenantId>,
) -> StoreResult<Vec<(String, u64)>> {
    let sql = format!(
        "SELECT COALESCE({column}, 'unknown'), COUNT(*) FROM device_activations{} \
         GROUP BY 1 ORDER BY 2 DESC",
        scope.map_or(String::new(), |_| " WHERE tenant_id = ?1".to_string())
    );
    let map = |row: &Row<'_>| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64));
    let mut stmt = conn.prepare(&sql)?;
    let rows = match scope {
        Some(tenant) => stmt.query_map(params![tenant.to_string()], map)?,
        None => stmt.query_map([], map)?,
    };
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Activation counts grouped by tenant, largest group first.
pub fn count_by_tenant(conn: &Connection) -> StoreResult<Vec<(TenantId, u64)>> {
    let mut stmt = conn.prepare(
        "SELECT tenant_id, COUNT(*) FROM device_activations GROUP BY tenant_id \
         ORDER BY COUNT(*) DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let raw: String = row.get(0)?;
        Ok((uuid_col(0, &raw, TenantId::parse)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}
