//! Registry integration tests
//!
//! Exercises the CRUD guards against a real temp-file SQLite database.

use chrono::Utc;
use migration_core::domain::{
	Batch, BatchStatus, Instance, InstanceDisk, InstanceOverride, MigrationStatus, Source,
	SourceProperties, Target,
};
use migration_core::{registry, Database, Error};
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

fn test_instance(uuid: Uuid, source_id: i64, name: &str) -> Instance {
	Instance {
		uuid,
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
		number_cpus: 2,
		memory_in_mib: 4096,
		use_legacy_bios: false,
		secure_boot_enabled: true,
		tpm_present: false,
	}
}

#[tokio::test]
async fn source_names_are_unique() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
		.await
		.unwrap();

	let err = registry::source::create(
		db.conn(),
		Source::new("vcenter01", SourceProperties::Common),
	)
	.await
	.unwrap_err();
	assert!(matches!(err, Error::Conflict { .. }), "{err:?}");
}

#[tokio::test]
async fn instance_requires_existing_source() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let uuid = Uuid::new_v4();
	let err = registry::instance::create(db.conn(), test_instance(uuid, 42, "web01"))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::ForeignKeyViolation(_)), "{err:?}");

	// Same instance succeeds once the source exists.
	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	registry::instance::create(
		db.conn(),
		test_instance(uuid, source.id.unwrap(), "web01"),
	)
	.await
	.unwrap();

	let fetched = registry::instance::get_by_uuid(db.conn(), uuid).await.unwrap();
	assert_eq!(fetched.name, "web01");
	assert_eq!(fetched.batch_id, None);
}

#[tokio::test]
async fn source_with_instances_cannot_be_deleted() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	registry::instance::create(
		db.conn(),
		test_instance(Uuid::new_v4(), source.id.unwrap(), "web01"),
	)
	.await
	.unwrap();

	let err = registry::source::delete(db.conn(), "vcenter01").await.unwrap_err();
	assert!(matches!(err, Error::ForeignKeyViolation(_)), "{err:?}");
}

#[tokio::test]
async fn running_batch_rejects_update_and_delete() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let mut batch = registry::batch::create(db.conn(), Batch::new("week1", "true"))
		.await
		.unwrap();
	assert_eq!(batch.status, BatchStatus::Defined);

	// The external executor flips the batch to running.
	batch.status = BatchStatus::Running;
	registry::batch::update(db.conn(), &batch).await.unwrap();

	batch.include_expression = "false".into();
	let err = registry::batch::update(db.conn(), &batch).await.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");

	let err = registry::batch::delete(db.conn(), "week1").await.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");

	// The executor's status hook is how a batch leaves Running; afterwards
	// it is modifiable again.
	registry::batch::set_status(db.conn(), "week1", BatchStatus::Finished)
		.await
		.unwrap();
	let mut finished = registry::batch::get_by_name(db.conn(), "week1").await.unwrap();
	assert_eq!(finished.status, BatchStatus::Finished);
	finished.include_expression = "false".into();
	registry::batch::update(db.conn(), &finished).await.unwrap();
}

#[tokio::test]
async fn batch_with_malformed_expression_is_rejected() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let err = registry::batch::create(db.conn(), Batch::new("bad", "CPU.NumberCPUs <="))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
}

#[tokio::test]
async fn batch_names_are_unique() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	registry::batch::create(db.conn(), Batch::new("week1", "true")).await.unwrap();
	let err = registry::batch::create(db.conn(), Batch::new("week1", "false"))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Conflict { .. }), "{err:?}");
}

#[tokio::test]
async fn deleting_instance_cascades_to_override() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	let uuid = Uuid::new_v4();
	registry::instance::create(
		db.conn(),
		test_instance(uuid, source.id.unwrap(), "web01"),
	)
	.await
	.unwrap();

	let mut o = InstanceOverride::new(uuid);
	o.number_cpus = Some(8);
	registry::instance_override::create(db.conn(), o).await.unwrap();

	// Delete under one transaction, like a composed caller would.
	let txn = db.begin().await.unwrap();
	registry::instance::delete(&txn, uuid).await.unwrap();
	txn.commit().await.unwrap();

	let err = registry::instance_override::get_by_uuid(db.conn(), uuid)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::NotFound { .. }), "{err:?}");

	// Recreating an override for the deleted instance is a dangling
	// reference.
	let err = registry::instance_override::create(db.conn(), InstanceOverride::new(uuid))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::ForeignKeyViolation(_)), "{err:?}");
}

#[tokio::test]
async fn override_rejected_while_assigned_or_migrating() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	let batch = registry::batch::create(db.conn(), Batch::new("week1", "true"))
		.await
		.unwrap();

	let uuid = Uuid::new_v4();
	let mut instance = test_instance(uuid, source.id.unwrap(), "web01");
	instance.batch_id = batch.id;
	instance.migration_status = MigrationStatus::AssignedBatch;
	registry::instance::create(db.conn(), instance).await.unwrap();

	let err = registry::instance_override::create(db.conn(), InstanceOverride::new(uuid))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");
}

#[tokio::test]
async fn migrating_instance_rejects_update_and_delete() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	let batch = registry::batch::create(db.conn(), Batch::new("week1", "true"))
		.await
		.unwrap();

	let uuid = Uuid::new_v4();
	let mut instance = test_instance(uuid, source.id.unwrap(), "web01");
	instance.batch_id = batch.id;
	instance.migration_status = MigrationStatus::BackgroundImport;
	registry::instance::create(db.conn(), instance.clone()).await.unwrap();

	instance.number_cpus = 4;
	let err = registry::instance::update(db.conn(), &instance).await.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");

	let err = registry::instance::delete(db.conn(), uuid).await.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");
}

#[tokio::test]
async fn deleting_batch_unassigns_members() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	let batch = registry::batch::create(db.conn(), Batch::new("week1", "true"))
		.await
		.unwrap();

	let uuid = Uuid::new_v4();
	let mut instance = test_instance(uuid, source.id.unwrap(), "web01");
	instance.batch_id = batch.id;
	instance.migration_status = MigrationStatus::AssignedBatch;
	registry::instance::create(db.conn(), instance).await.unwrap();

	let txn = db.begin().await.unwrap();
	registry::batch::delete(&txn, "week1").await.unwrap();
	txn.commit().await.unwrap();

	let fetched = registry::instance::get_by_uuid(db.conn(), uuid).await.unwrap();
	assert_eq!(fetched.batch_id, None);
	assert_eq!(fetched.migration_status, MigrationStatus::NotAssignedBatch);
}

#[tokio::test]
async fn deleting_batch_with_migrating_member_fails_atomically() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let source =
		registry::source::create(db.conn(), Source::new("vcenter01", SourceProperties::Common))
			.await
			.unwrap();
	let batch = registry::batch::create(db.conn(), Batch::new("week1", "true"))
		.await
		.unwrap();

	// One idle member, one migrating member.
	let idle_uuid = Uuid::new_v4();
	let mut idle = test_instance(idle_uuid, source.id.unwrap(), "web01");
	idle.batch_id = batch.id;
	idle.migration_status = MigrationStatus::AssignedBatch;
	registry::instance::create(db.conn(), idle).await.unwrap();

	let migrating_uuid = Uuid::new_v4();
	let mut migrating = test_instance(migrating_uuid, source.id.unwrap(), "web02");
	migrating.batch_id = batch.id;
	migrating.migration_status = MigrationStatus::FinalImport;
	registry::instance::create(db.conn(), migrating).await.unwrap();

	let txn = db.begin().await.unwrap();
	let err = registry::batch::delete(&txn, "week1").await.unwrap_err();
	assert!(matches!(err, Error::InvalidState(_)), "{err:?}");
	txn.rollback().await.unwrap();

	// Nothing changed: batch still there, both instances still assigned.
	let batch = registry::batch::get_by_name(db.conn(), "week1").await.unwrap();
	assert_eq!(batch.name, "week1");
	for uuid in [idle_uuid, migrating_uuid] {
		let fetched = registry::instance::get_by_uuid(db.conn(), uuid).await.unwrap();
		assert_eq!(fetched.batch_id, batch.id);
	}
}

#[tokio::test]
async fn uncommitted_writes_are_invisible_to_other_scopes() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let txn = db.begin().await.unwrap();
	registry::source::create(&txn, Source::new("vcenter01", SourceProperties::Common))
		.await
		.unwrap();

	// Same scope observes the uncommitted row.
	registry::source::get_by_name(&txn, "vcenter01").await.unwrap();
	txn.rollback().await.unwrap();

	// After rollback the row never existed.
	let err = registry::source::get_by_name(db.conn(), "vcenter01")
		.await
		.unwrap_err();
	assert!(matches!(err, Error::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn target_and_config_round_trip() {
	let dir = tempdir().unwrap();
	let db = test_db(&dir).await;

	let mut target = Target::new("incus01", "https://incus01:8443");
	target.project = "migration".into();
	let created = registry::target::create(db.conn(), target).await.unwrap();
	assert!(created.id.is_some());

	let fetched = registry::target::get_by_name(db.conn(), "incus01").await.unwrap();
	assert_eq!(fetched.project, "migration");

	registry::config::set(db.conn(), "sync_interval", "10m").await.unwrap();
	registry::config::set(db.conn(), "sync_interval", "5m").await.unwrap();
	assert_eq!(
		registry::config::get(db.conn(), "sync_interval").await.unwrap(),
		"5m"
	);
}
