//! Shared fixtures for lifecycle and registry tests.

#![allow(dead_code)]

use std::sync::Arc;

use bader_license::CodeCodec;
use bader_licensing::{DeviceAttributes, DeviceRegistry, LicenseManager, NetworkContext};
use bader_store::{tenants, Database, Tenant};
use bader_types::TenantId;
use chrono::Utc;

pub const SECRET: &str = "bader-test-secret";

pub fn db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

pub fn manager(db: &Arc<Database>) -> LicenseManager {
    LicenseManager::new(Arc::clone(db), CodeCodec::new(SECRET))
}

pub fn registry(db: &Arc<Database>) -> DeviceRegistry {
    DeviceRegistry::new(Arc::clone(db))
}

/// Inserts a tenant row and returns its id.
pub fn seed_tenant(db: &Database, name: &str, slug: &str) -> TenantId {
    let tenant = Tenant {
        id: TenantId::new(),
        name: name.to_string(),
        slug: slug.to_string(),
        created_at: Utc::now(),
    };
    db.with_conn(|conn| tenants::insert(conn, &tenant)).unwrap();
    tenant.id
}

pub fn attrs(device_id: &str) -> DeviceAttributes {
    DeviceAttributes {
        device_id: device_id.to_string(),
        user_id: Some("user-1".into()),
        device_name: Some("Test Machine".into()),
        device_type: Some("laptop".into()),
        platform: Some("macos".into()),
        os_version: Some("14.2".into()),
        app_version: Some("1.4.0".into()),
        cpu_info: Some("arm64".into()),
        ram_size: Some("16GB".into()),
        screen_resolution: Some("2560x1600".into()),
        hostname: Some("host-1".into()),
        username: Some("alice".into()),
        mac_address: Some("aa:bb:cc:dd:ee:ff".into()),
        disk_serial: Some("disk-1".into()),
    }
}

pub fn network() -> NetworkContext {
    NetworkContext {
        ip_address: Some("203.0.113.7".into()),
        user_agent: Some("bader-desktop/1.4.0".into()),
    }
}
