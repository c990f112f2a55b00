//! Schema creation and versioned migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreResult;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS tenants (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS licenses (
    id          TEXT PRIMARY KEY,
    code        TEXT NOT NULL UNIQUE,
    desktop     INTEGER NOT NULL DEFAULT 0,
    web         INTEGER NOT NULL DEFAULT 0,
    mobile      INTEGER NOT NULL DEFAULT 0,
    sync        INTEGER NOT NULL DEFAULT 0,
    issued_at   INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    tenant_id   TEXT,
    hardware_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_licenses_tenant ON licenses(tenant_id);

CREATE TABLE IF NOT EXISTS device_activations (
    id                 TEXT PRIMARY KEY,
    tenant_id          TEXT NOT NULL,
    license_id         TEXT,
    user_id            TEXT,
    device_id          TEXT NOT NULL,
    device_fingerprint TEXT NOT NULL,
    device_name        TEXT,
    device_type        TEXT,
    platform           TEXT,
    os_version         TEXT,
    app_version        TEXT,
    cpu_info           TEXT,
    ram_size           TEXT,
    screen_resolution  TEXT,
    hostname           TEXT,
    username           TEXT,
    mac_address        TEXT,
    disk_serial        TEXT,
    ip_address         TEXT,
    user_agent         TEXT,
    first_seen         INTEGER NOT NULL,
    last_seen          INTEGER NOT NULL,
    last_login         INTEGER,
    login_count        INTEGER NOT NULL DEFAULT 0,
    is_active          INTEGER NOT NULL DEFAULT 1,
    is_blocked         INTEGER NOT NULL DEFAULT 0,
    block_reason       TEXT,
    UNIQUE (tenant_id, device_id)
);
CREATE INDEX IF NOT EXISTS idx_activations_last_seen ON device_activations(last_seen);
";

/// Brings the schema up to the current version. Runs on every open.
pub(crate) fn migrate(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!(from = version, to = SCHEMA_VERSION, "migrated store schema");
    }
    Ok(())
}
