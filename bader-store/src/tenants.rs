//! Tenant records and queries.
//!
//! The minimal collaborator surface the lifecycle manager needs: resolve or
//! create a tenant by slug, and resolve a name for admin views.

use bader_types::TenantId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::row::{timestamp_col, uuid_col};

/// A persisted tenant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, name, slug, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    let id: String = row.get(0)?;
    Ok(Tenant {
        id: uuid_col(0, &id, TenantId::parse)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: timestamp_col(3, row.get(3)?)?,
    })
}

/// Inserts a new tenant. Fails on a duplicate slug.
pub fn insert(conn: &Connection, tenant: &Tenant) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO tenants (id, name, slug, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            tenant.id.to_string(),
            tenant.name,
            tenant.slug,
            tenant.created_at.timestamp(),
        ],
    )?;
    Ok(())
}

/// Looks up a tenant by id.
pub fn by_id(conn: &Connection, id: &TenantId) -> StoreResult<Option<Tenant>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tenants WHERE id = ?1"),
        params![id.to_string()],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Looks up a tenant by its unique slug.
pub fn by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Tenant>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tenants WHERE slug = ?1"),
        params![slug],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}
