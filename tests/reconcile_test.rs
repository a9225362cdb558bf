//! Reconciler integration tests

use chrono::Utc;
use migration_core::domain::{
	Batch, Instance, InstanceDisk, InstanceOverride, MigrationStatus, Source, SourceProperties,
};
use migration_core::{reconcile_batch, registry, Database, Error};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use uuid::Uuid;

async fn test_db(dir: &tempfile::TempDir) -> Database {
	let _ = tracing_subscriber::fmt::try_init();
	let db = Database::create(&dir.path().join("inventory.db"))
		.await
		.expect("Failed to create database");
	db.migrate().await.expect("Failed to run migrations");
	db
}

async fn seed_source(db: &Database, name: &str) -> i64 {
	registry::source::create(db.conn(), Source::new(name, SourceProperties::Common))
		.await
		.unwrap()
		.id
		.unwrap()
}

fn small_instance(source_id: i64, name: &str, cpus: i64) -> Instance {
	Instance {
		uuid: Uuid::new_v4(),
		migration_status: MigrationStatus::NotAssignedBatch,
		last_update_from_source: Utc::now(),
		last_manual_update: None,
		source_id,
		target_id: None,
		batch_id: None,
		name: name.to_string(),
		architecture: "x86_64".into(),
		inventory_path: format!("/dc/vm/{name}"),
		os: "Ubuntu 22.04".into(),
		os_version: "22.04".into(),
		disks: vec![InstanceDisk {
			name: "disk0".into(),
			is_shared: false,
			size_in_bytes: 10 * 1024 * 1024 * 1024,
		}],
		nics: vec![],
		number_cpus: cpus,
		memory_in_mib: 4096,
		use_legacy_bios: false,
		secure_boot_enabled: true,
		tpm_present: false,
	}
}

#[tokio::test]
async fn adopts_matching_and_converges() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let small = registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	let big = registry::instance::create(db.conn(), small_instance(source_id, "db01", 16))
		.await
		.unwrap();

	let batch = registry::batch::create(db.conn(), Batch::new("small-vms", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();

	let summary = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(summary.adopted, 1);
	assert_eq!(summary.dropped, 0);

	let adopted = registry::instance::get_by_uuid(db.conn(), small.uuid).await.unwrap();
	assert_eq!(adopted.batch_id, batch.id);
	assert_eq!(adopted.migration_status, MigrationStatus::AssignedBatch);

	let ignored = registry::instance::get_by_uuid(db.conn(), big.uuid).await.unwrap();
	assert_eq!(ignored.batch_id, None);

	// Convergence: a second run with nothing changed performs no writes.
	let second = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(second.writes(), 0);
}

#[tokio::test]
async fn drops_members_that_stopped_matching() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let instance = registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	registry::batch::create(db.conn(), Batch::new("small-vms", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();
	reconcile_batch(&db, "small-vms").await.unwrap();

	// Tighten the criteria so the member no longer matches.
	let mut batch = registry::batch::get_by_name(db.conn(), "small-vms").await.unwrap();
	batch.include_expression = "CPU.NumberCPUs <= 1".into();
	registry::batch::update(db.conn(), &batch).await.unwrap();

	let summary = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(summary.dropped, 1);
	assert_eq!(summary.adopted, 0);

	let dropped = registry::instance::get_by_uuid(db.conn(), instance.uuid).await.unwrap();
	assert_eq!(dropped.batch_id, None);
	assert_eq!(dropped.migration_status, MigrationStatus::NotAssignedBatch);
}

#[tokio::test]
async fn migrating_member_is_never_detached() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let instance = registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	let batch = registry::batch::create(db.conn(), Batch::new("small-vms", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();
	reconcile_batch(&db, "small-vms").await.unwrap();

	// The executor starts the transfer.
	registry::instance::set_migration_status(
		db.conn(),
		instance.uuid,
		MigrationStatus::BackgroundImport,
	)
	.await
	.unwrap();

	// Criteria change so the member no longer matches; it must stay.
	let mut updated = registry::batch::get_by_name(db.conn(), "small-vms").await.unwrap();
	updated.include_expression = "false".into();
	registry::batch::update(db.conn(), &updated).await.unwrap();

	let summary = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(summary.writes(), 0);

	let still_member = registry::instance::get_by_uuid(db.conn(), instance.uuid).await.unwrap();
	assert_eq!(still_member.batch_id, batch.id);
	assert_eq!(still_member.migration_status, MigrationStatus::BackgroundImport);
}

#[tokio::test]
async fn first_writer_wins_across_batches() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let instance = registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	let first = registry::batch::create(db.conn(), Batch::new("first", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();
	registry::batch::create(db.conn(), Batch::new("second", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();

	reconcile_batch(&db, "first").await.unwrap();
	let second_summary = reconcile_batch(&db, "second").await.unwrap();
	assert_eq!(second_summary.writes(), 0);

	let fetched = registry::instance::get_by_uuid(db.conn(), instance.uuid).await.unwrap();
	assert_eq!(fetched.batch_id, first.id);
}

#[tokio::test]
async fn evaluator_error_aborts_without_partial_writes() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	registry::instance::create(db.conn(), small_instance(source_id, "web02", 2))
		.await
		.unwrap();

	// The expression parses (so create accepts it) but fails at evaluation
	// time on every instance: path_base requires a string argument.
	registry::batch::create(
		db.conn(),
		Batch::new("broken", "path_base(CPU.NumberCPUs) == \"x\""),
	)
	.await
	.unwrap();

	let err = reconcile_batch(&db, "broken").await.unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");

	// No partial adoption happened.
	for instance in registry::instance::list(db.conn()).await.unwrap() {
		assert_eq!(instance.batch_id, None);
	}
}

#[tokio::test]
async fn overrides_feed_the_criteria_snapshot() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	// 2 CPUs synced from the source, but the operator corrected it to 8.
	let instance = registry::instance::create(db.conn(), small_instance(source_id, "web01", 2))
		.await
		.unwrap();
	let mut o = InstanceOverride::new(instance.uuid);
	o.number_cpus = Some(8);
	registry::instance_override::create(db.conn(), o).await.unwrap();

	registry::batch::create(db.conn(), Batch::new("small-vms", "CPU.NumberCPUs <= 4"))
		.await
		.unwrap();
	let summary = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(summary.adopted, 0);

	let fetched = registry::instance::get_by_uuid(db.conn(), instance.uuid).await.unwrap();
	assert_eq!(fetched.batch_id, None);
}

#[tokio::test]
async fn user_disabled_instances_are_not_adopted() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let mut disabled = small_instance(source_id, "web01", 2);
	disabled.migration_status = MigrationStatus::UserDisabledMigration;
	let disabled = registry::instance::create(db.conn(), disabled).await.unwrap();

	registry::batch::create(db.conn(), Batch::new("small-vms", "true"))
		.await
		.unwrap();
	let summary = reconcile_batch(&db, "small-vms").await.unwrap();
	assert_eq!(summary.adopted, 0);

	let fetched = registry::instance::get_by_uuid(db.conn(), disabled.uuid).await.unwrap();
	assert_eq!(fetched.batch_id, None);
	assert_eq!(fetched.migration_status, MigrationStatus::UserDisabledMigration);
}

#[tokio::test]
async fn reconcile_by_inventory_path_with_path_helpers() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;
	let source_id = seed_source(&db, "vcenter01").await;

	let mut prod = small_instance(source_id, "web01", 2);
	prod.inventory_path = "/dc/prod/web01".into();
	let prod = registry::instance::create(db.conn(), prod).await.unwrap();

	let mut dev = small_instance(source_id, "web02", 2);
	dev.inventory_path = "/dc/dev/web02".into();
	let dev = registry::instance::create(db.conn(), dev).await.unwrap();

	registry::batch::create(
		db.conn(),
		Batch::new("prod", "path_dir(InventoryPath) == \"/dc/prod\""),
	)
	.await
	.unwrap();

	let summary = reconcile_batch(&db, "prod").await.unwrap();
	assert_eq!(summary.adopted, 1);

	assert!(registry::instance::get_by_uuid(db.conn(), prod.uuid)
		.await
		.unwrap()
		.batch_id
		.is_some());
	assert!(registry::instance::get_by_uuid(db.conn(), dev.uuid)
		.await
		.unwrap()
		.batch_id
		.is_none());
}
