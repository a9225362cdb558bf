//! Instance registry
//!
//! Instances are keyed by the UUID the source environment assigned them.
//! A migrating instance rejects update and delete; assignment fields
//! (`batch_id` plus the matching status) are otherwise only touched by the
//! reconciler and the batch-delete cascade.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Instance, MigrationStatus};
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

/// Create a new instance
///
/// The referenced source must exist; target and batch references are
/// optional but must exist when set. The batch assignment invariant
/// (`NotAssignedBatch` exactly when no batch is set) is enforced here.
pub async fn create<C: ConnectionTrait>(conn: &C, instance: Instance) -> Result<Instance> {
	let source = entities::Source::find_by_id(instance.source_id)
		.one(conn)
		.await?;
	if source.is_none() {
		return Err(Error::ForeignKeyViolation(format!(
			"instance {} references nonexistent source {}",
			instance.uuid, instance.source_id
		)));
	}
	validate_references(conn, &instance).await?;
	validate_assignment_invariant(&instance)?;

	let existing = entities::Instance::find_by_id(instance.uuid).one(conn).await?;
	if existing.is_some() {
		return Err(Error::conflict("instance", instance.uuid.to_string()));
	}

	let model = entities::instance::ActiveModel {
		uuid: Set(instance.uuid),
		migration_status: Set(instance.migration_status.to_string()),
		last_update_from_source: Set(instance.last_update_from_source),
		last_manual_update: Set(instance.last_manual_update),
		source_id: Set(instance.source_id),
		target_id: Set(entities::id_to_db(instance.target_id)),
		batch_id: Set(entities::id_to_db(instance.batch_id)),
		name: Set(instance.name.clone()),
		architecture: Set(instance.architecture.clone()),
		inventory_path: Set(instance.inventory_path.clone()),
		os: Set(instance.os.clone()),
		os_version: Set(instance.os_version.clone()),
		disks: Set(serde_json::to_value(&instance.disks)?),
		nics: Set(serde_json::to_value(&instance.nics)?),
		number_cpus: Set(instance.number_cpus),
		memory_in_mib: Set(instance.memory_in_mib),
		use_legacy_bios: Set(instance.use_legacy_bios),
		secure_boot_enabled: Set(instance.secure_boot_enabled),
		tpm_present: Set(instance.tpm_present),
	};
	let record = model.insert(conn).await?;

	info!("Created instance {:?} ({})", record.name, record.uuid);

	record.to_domain()
}

pub async fn get_by_uuid<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<Instance> {
	entities::Instance::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", uuid.to_string()))?
		.to_domain()
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Instance>> {
	entities::Instance::find()
		.order_by_asc(entities::instance::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect()
}

/// All instances currently assigned to the given batch
pub async fn list_by_batch<C: ConnectionTrait>(conn: &C, batch_id: i64) -> Result<Vec<Instance>> {
	entities::Instance::find()
		.filter(entities::instance::Column::BatchId.eq(batch_id))
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect()
}

/// All instances not assigned to any batch
pub async fn list_unassigned<C: ConnectionTrait>(conn: &C) -> Result<Vec<Instance>> {
	entities::Instance::find()
		.filter(entities::instance::Column::BatchId.eq(entities::INVALID_ID))
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect()
}

/// Update a persisted instance
///
/// Rejected while the instance is migrating, and while its assigned batch
/// is in a migration phase. Records the manual-edit timestamp.
pub async fn update<C: ConnectionTrait>(conn: &C, instance: &Instance) -> Result<()> {
	let current = entities::Instance::find_by_id(instance.uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", instance.uuid.to_string()))?
		.to_domain()?;

	if current.is_migrating() {
		return Err(Error::InvalidState(format!(
			"instance {} is currently migrating",
			instance.uuid
		)));
	}

	if let Some(batch_id) = current.batch_id {
		let batch = super::batch::get_by_id(conn, batch_id).await?;
		if !batch.can_be_modified() {
			return Err(Error::InvalidState(format!(
				"instance {} is assigned to batch {:?}, which is currently in a migration phase",
				instance.uuid, batch.name
			)));
		}
	}

	validate_references(conn, instance).await?;
	validate_assignment_invariant(instance)?;

	let record = entities::Instance::find_by_id(instance.uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", instance.uuid.to_string()))?;
	let mut active: entities::instance::ActiveModel = record.into();
	active.migration_status = Set(instance.migration_status.to_string());
	active.last_update_from_source = Set(instance.last_update_from_source);
	active.last_manual_update = Set(Some(Utc::now()));
	active.source_id = Set(instance.source_id);
	active.target_id = Set(entities::id_to_db(instance.target_id));
	active.batch_id = Set(entities::id_to_db(instance.batch_id));
	active.name = Set(instance.name.clone());
	active.architecture = Set(instance.architecture.clone());
	active.inventory_path = Set(instance.inventory_path.clone());
	active.os = Set(instance.os.clone());
	active.os_version = Set(instance.os_version.clone());
	active.disks = Set(serde_json::to_value(&instance.disks)?);
	active.nics = Set(serde_json::to_value(&instance.nics)?);
	active.number_cpus = Set(instance.number_cpus);
	active.memory_in_mib = Set(instance.memory_in_mib);
	active.use_legacy_bios = Set(instance.use_legacy_bios);
	active.secure_boot_enabled = Set(instance.secure_boot_enabled);
	active.tpm_present = Set(instance.tpm_present);
	active.update(conn).await?;

	Ok(())
}

/// Delete an instance and its override, if any
///
/// Pass a transaction so the override cascade and the row deletion commit
/// together. Rejected while the instance is migrating.
pub async fn delete<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<()> {
	let current = entities::Instance::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", uuid.to_string()))?
		.to_domain()?;

	if current.is_migrating() {
		return Err(Error::InvalidState(format!(
			"instance {uuid} is currently migrating"
		)));
	}

	entities::InstanceOverride::delete_by_id(uuid).exec(conn).await?;
	entities::Instance::delete_by_id(uuid).exec(conn).await?;

	info!("Deleted instance {uuid}");

	Ok(())
}

/// Set an instance's migration status directly
///
/// This is the migration executor's hook for moving instances through the
/// transfer phases; it intentionally skips the migrating guard, which
/// exists to protect in-flight work from everyone *else*.
pub async fn set_migration_status<C: ConnectionTrait>(
	conn: &C,
	uuid: Uuid,
	status: MigrationStatus,
) -> Result<()> {
	let record = entities::Instance::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", uuid.to_string()))?;

	let mut active: entities::instance::ActiveModel = record.into();
	active.migration_status = Set(status.to_string());
	active.update(conn).await?;

	info!("Instance {uuid} migration status set to {status}");

	Ok(())
}

/// Move an instance in or out of a batch
///
/// Only the reconciler and the batch-delete cascade call this; it bypasses
/// the batch-modifiability guard but still refuses to touch a migrating
/// instance.
pub(crate) async fn set_assignment<C: ConnectionTrait>(
	conn: &C,
	uuid: Uuid,
	batch_id: Option<i64>,
	status: MigrationStatus,
) -> Result<()> {
	let record = entities::Instance::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance", uuid.to_string()))?;

	if record.to_domain()?.is_migrating() {
		return Err(Error::InvalidState(format!(
			"instance {uuid} is currently migrating"
		)));
	}

	let mut active: entities::instance::ActiveModel = record.into();
	active.batch_id = Set(entities::id_to_db(batch_id));
	active.migration_status = Set(status.to_string());
	active.update(conn).await?;

	Ok(())
}

async fn validate_references<C: ConnectionTrait>(conn: &C, instance: &Instance) -> Result<()> {
	if let Some(id) = instance.target_id {
		let exists = entities::Target::find_by_id(id).one(conn).await?;
		if exists.is_none() {
			return Err(Error::ForeignKeyViolation(format!(
				"instance {} references nonexistent target {id}",
				instance.uuid
			)));
		}
	}
	if let Some(id) = instance.batch_id {
		let exists = entities::Batch::find_by_id(id).one(conn).await?;
		if exists.is_none() {
			return Err(Error::ForeignKeyViolation(format!(
				"instance {} references nonexistent batch {id}",
				instance.uuid
			)));
		}
	}
	Ok(())
}

/// `NotAssignedBatch` means no batch, `AssignedBatch` means a batch is set.
/// The in-flight statuses belong to the migration executor and are not
/// second-guessed here.
fn validate_assignment_invariant(instance: &Instance) -> Result<()> {
	let consistent = match instance.migration_status {
		MigrationStatus::NotAssignedBatch | MigrationStatus::UserDisabledMigration => {
			instance.batch_id.is_none()
		}
		MigrationStatus::AssignedBatch => instance.batch_id.is_some(),
		_ => true,
	};
	if !consistent {
		return Err(Error::InvalidState(format!(
			"instance {} status {} is inconsistent with its batch assignment",
			instance.uuid, instance.migration_status
		)));
	}
	Ok(())
}
