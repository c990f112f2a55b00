mod common;

use bader_licensing::{DeviceRegistry, LicensingError, RegistrationStatus};
use bader_store::{activations, ActivationFilter};
use bader_types::{ActivationId, Capabilities, TenantId};
use common::{attrs, db, manager, network, registry, seed_tenant};
use pretty_assertions::{assert_eq, assert_ne};

// ── Fingerprint ───────────────────────────────────────────────────

#[test]
fn fingerprint_is_32_lowercase_hex_chars() {
    let fp = DeviceRegistry::fingerprint(&attrs("dev-1"));
    assert_eq!(fp.len(), 32);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn fingerprint_is_deterministic() {
    let a = DeviceRegistry::fingerprint(&attrs("dev-1"));
    let b = DeviceRegistry::fingerprint(&attrs("dev-1"));
    assert_eq!(a, b);
}

#[test]
fn fingerprint_covers_hardware_attributes_only() {
    let base = attrs("dev-1");

    let mut renamed = attrs("dev-1");
    renamed.device_name = Some("Renamed".into());
    renamed.app_version = Some("2.0.0".into());
    assert_eq!(
        DeviceRegistry::fingerprint(&base),
        DeviceRegistry::fingerprint(&renamed)
    );

    let mut moved = attrs("dev-1");
    moved.hostname = Some("host-2".into());
    assert_ne!(
        DeviceRegistry::fingerprint(&base),
        DeviceRegistry::fingerprint(&moved)
    );
}

#[test]
fn fingerprint_treats_missing_fields_as_empty() {
    let mut sparse = attrs("dev-1");
    sparse.hostname = None;
    sparse.mac_address = None;

    let mut blank = attrs("dev-1");
    blank.hostname = Some(String::new());
    blank.mac_address = Some(String::new());

    assert_eq!(
        DeviceRegistry::fingerprint(&sparse),
        DeviceRegistry::fingerprint(&blank)
    );
}

// ── Registration ──────────────────────────────────────────────────

#[test]
fn first_registration_creates_a_record() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    assert_eq!(registration.status, RegistrationStatus::Registered);

    let row = db
        .with_conn(|conn| activations::by_id(conn, &registration.activation_id))
        .unwrap()
        .unwrap();
    assert_eq!(row.device_id, "dev-1");
    assert_eq!(row.login_count, 1);
    assert_eq!(row.device_fingerprint, DeviceRegistry::fingerprint(&attrs("dev-1")));
    assert_eq!(row.ip_address.as_deref(), Some("203.0.113.7"));
    assert!(row.last_login.is_some());
    assert!(!row.is_blocked);
}

#[test]
fn repeat_registration_updates_in_place() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let first = registry.register(&tenant, attrs("dev-1"), network()).unwrap();

    let mut changed = attrs("dev-1");
    changed.app_version = Some("1.5.0".into());
    changed.hostname = Some("host-2".into());
    let second = registry.register(&tenant, changed.clone(), network()).unwrap();

    assert_eq!(second.status, RegistrationStatus::Updated);
    assert_eq!(second.activation_id, first.activation_id);

    let row = db
        .with_conn(|conn| activations::by_id(conn, &second.activation_id))
        .unwrap()
        .unwrap();
    assert_eq!(row.login_count, 2);
    assert_eq!(row.app_version.as_deref(), Some("1.5.0"));
    assert_eq!(row.hostname.as_deref(), Some("host-2"));
    // Fingerprint tracks the new hardware attributes.
    assert_eq!(row.device_fingerprint, DeviceRegistry::fingerprint(&changed));
}

#[test]
fn same_device_under_two_tenants_is_two_records() {
    let db = db();
    let registry = registry(&db);
    let t1 = seed_tenant(&db, "Acme", "acme");
    let t2 = seed_tenant(&db, "Globex", "globex");

    let a = registry.register(&t1, attrs("dev-1"), network()).unwrap();
    let b = registry.register(&t2, attrs("dev-1"), network()).unwrap();
    assert_eq!(a.status, RegistrationStatus::Registered);
    assert_eq!(b.status, RegistrationStatus::Registered);
    assert_ne!(a.activation_id, b.activation_id);
}

#[test]
fn registration_links_the_active_license() {
    let db = db();
    let registry = registry(&db);
    let manager = manager(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    // No license yet: the record carries no link.
    let first = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    let row = db
        .with_conn(|conn| activations::by_id(conn, &first.activation_id))
        .unwrap()
        .unwrap();
    assert!(row.license_id.is_none());

    // Once a license is active, the next login links it.
    let issued = manager.generate(Some(&tenant), Capabilities::hybrid(), 12).unwrap();
    registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    let row = db
        .with_conn(|conn| activations::by_id(conn, &first.activation_id))
        .unwrap()
        .unwrap();
    assert_eq!(row.license_id, Some(issued.license.id));
}

// ── Blocking ──────────────────────────────────────────────────────

#[test]
fn blocked_device_cannot_register_and_row_is_untouched() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    registry
        .block(&registration.activation_id, Some("fraud".into()))
        .unwrap();

    let result = registry.register(&tenant, attrs("dev-1"), network());
    match result {
        Err(LicensingError::DeviceBlocked { reason }) => assert_eq!(reason, "fraud"),
        other => panic!("expected DeviceBlocked, got {other:?}"),
    }

    let row = db
        .with_conn(|conn| activations::by_id(conn, &registration.activation_id))
        .unwrap()
        .unwrap();
    assert_eq!(row.login_count, 1);
}

#[test]
fn blocked_without_reason_reports_a_default() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    registry.block(&registration.activation_id, None).unwrap();

    match registry.register(&tenant, attrs("dev-1"), network()) {
        Err(LicensingError::DeviceBlocked { reason }) => {
            assert_eq!(reason, "unauthorized access");
        }
        other => panic!("expected DeviceBlocked, got {other:?}"),
    }
}

#[test]
fn unblock_restores_registration() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    registry
        .block(&registration.activation_id, Some("suspicious".into()))
        .unwrap();
    let unblocked = registry.unblock(&registration.activation_id).unwrap();
    assert!(!unblocked.is_blocked);
    assert!(unblocked.block_reason.is_none());

    let again = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    assert_eq!(again.status, RegistrationStatus::Updated);
}

#[test]
fn block_and_unblock_are_idempotent() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");
    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();

    registry.block(&registration.activation_id, Some("first".into())).unwrap();
    let blocked = registry.block(&registration.activation_id, None).unwrap();
    assert!(blocked.is_blocked);
    // A reasonless re-block keeps the original reason.
    assert_eq!(blocked.block_reason.as_deref(), Some("first"));

    registry.unblock(&registration.activation_id).unwrap();
    let unblocked = registry.unblock(&registration.activation_id).unwrap();
    assert!(!unblocked.is_blocked);
}

#[test]
fn block_unknown_activation_is_not_found() {
    let db = db();
    let registry = registry(&db);
    let result = registry.block(&ActivationId::new(), None);
    assert!(matches!(result, Err(LicensingError::NotFound(_))));
}

// ── Removal ───────────────────────────────────────────────────────

#[test]
fn removed_device_registers_fresh() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let registration = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    registry.remove(&registration.activation_id).unwrap();

    let fresh = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    assert_eq!(fresh.status, RegistrationStatus::Registered);
    assert_ne!(fresh.activation_id, registration.activation_id);

    let row = db
        .with_conn(|conn| activations::by_id(conn, &fresh.activation_id))
        .unwrap()
        .unwrap();
    assert_eq!(row.login_count, 1);
}

#[test]
fn remove_unknown_activation_is_not_found() {
    let db = db();
    let registry = registry(&db);
    let result = registry.remove(&ActivationId::new());
    assert!(matches!(result, Err(LicensingError::NotFound(_))));
}

// ── Listing and stats ─────────────────────────────────────────────

#[test]
fn list_resolves_tenant_names() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme Corp", "acme-corp");
    registry.register(&tenant, attrs("dev-1"), network()).unwrap();

    let views = registry.list(&ActivationFilter::default()).unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].tenant_name, "Acme Corp");
    assert_eq!(views[0].activation.device_id, "dev-1");
}

#[test]
fn list_filters_blocked_devices() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");

    let keep = registry.register(&tenant, attrs("dev-1"), network()).unwrap();
    let blocked = registry.register(&tenant, attrs("dev-2"), network()).unwrap();
    registry.block(&blocked.activation_id, None).unwrap();

    let views = registry
        .list(&ActivationFilter {
            is_blocked: Some(false),
            ..ActivationFilter::default()
        })
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].activation.id, keep.activation_id);
}

#[test]
fn stats_aggregate_the_fleet() {
    let db = db();
    let registry = registry(&db);
    let acme = seed_tenant(&db, "Acme", "acme");
    let globex = seed_tenant(&db, "Globex", "globex");

    registry.register(&acme, attrs("dev-1"), network()).unwrap();
    registry.register(&acme, attrs("dev-2"), network()).unwrap();
    let mut windows = attrs("dev-3");
    windows.platform = Some("windows".into());
    registry.register(&globex, windows, network()).unwrap();

    let blocked = registry.register(&acme, attrs("dev-4"), network()).unwrap();
    registry.block(&blocked.activation_id, None).unwrap();

    let stats = registry.stats(None).unwrap();
    assert_eq!(stats.totals.total, 4);
    assert_eq!(stats.totals.active, 3);
    assert_eq!(stats.totals.blocked, 1);

    assert_eq!(stats.by_platform[0], ("macos".to_string(), 3));
    assert!(stats.by_platform.contains(&("windows".to_string(), 1)));

    assert_eq!(stats.by_tenant.len(), 2);
    assert_eq!(stats.by_tenant[0].tenant_id, acme);
    assert_eq!(stats.by_tenant[0].tenant_name, "Acme");
    assert_eq!(stats.by_tenant[0].devices, 3);
    assert_eq!(stats.by_tenant[1].tenant_name, "Globex");

    assert_eq!(stats.recent.len(), 4);
}

#[test]
fn stats_scope_to_one_tenant() {
    let db = db();
    let registry = registry(&db);
    let acme = seed_tenant(&db, "Acme", "acme");
    let globex = seed_tenant(&db, "Globex", "globex");

    registry.register(&acme, attrs("dev-1"), network()).unwrap();
    registry.register(&globex, attrs("dev-2"), network()).unwrap();

    let stats = registry.stats(Some(&acme)).unwrap();
    assert_eq!(stats.totals.total, 1);
    assert_eq!(stats.by_tenant.len(), 1);
    assert_eq!(stats.by_tenant[0].tenant_id, acme);
    assert_eq!(stats.recent.len(), 1);
    assert_eq!(stats.recent[0].activation.device_id, "dev-1");
}

#[test]
fn stats_tolerate_missing_tenant_rows() {
    let db = db();
    let registry = registry(&db);
    // Never inserted into the tenants table.
    let ghost = TenantId::new();
    registry.register(&ghost, attrs("dev-1"), network()).unwrap();

    let stats = registry.stats(None).unwrap();
    assert_eq!(stats.by_tenant.len(), 1);
    assert_eq!(stats.by_tenant[0].tenant_name, "unknown");
    assert_eq!(stats.recent[0].tenant_name, "unknown");
}

#[test]
fn stats_recent_is_capped_at_ten() {
    let db = db();
    let registry = registry(&db);
    let tenant = seed_tenant(&db, "Acme", "acme");
    for i in 0..12 {
        registry.register(&tenant, attrs(&format!("dev-{i}")), network()).unwrap();
    }

    let stats = registry.stats(None).unwrap();
    assert_eq!(stats.totals.total, 12);
    assert_eq!(stats.recent.len(), 10);
}
