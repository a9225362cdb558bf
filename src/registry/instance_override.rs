//! Instance override registry
//!
//! Overrides are user corrections layered over source-synced attributes.
//! They may only change while the instance is free: not assigned to a
//! batch and not migrating.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait};
use tracing::info;
use uuid::Uuid;

use crate::domain::InstanceOverride;
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

/// Create an override for an existing, unassigned, non-migrating instance
pub async fn create<C: ConnectionTrait>(
	conn: &C,
	instance_override: InstanceOverride,
) -> Result<InstanceOverride> {
	guard_instance(conn, instance_override.uuid).await?;

	let existing = entities::InstanceOverride::find_by_id(instance_override.uuid)
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict(
			"instance override",
			instance_override.uuid.to_string(),
		));
	}

	let model = entities::instance_override::ActiveModel {
		uuid: Set(instance_override.uuid),
		last_update: Set(Utc::now()),
		comment: Set(instance_override.comment.clone()),
		number_cpus: Set(instance_override.number_cpus),
		memory_in_bytes: Set(instance_override.memory_in_bytes),
	};
	let record = model.insert(conn).await?;

	info!("Created override for instance {}", record.uuid);

	Ok(record.to_domain())
}

pub async fn get_by_uuid<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<InstanceOverride> {
	Ok(entities::InstanceOverride::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance override", uuid.to_string()))?
		.to_domain())
}

/// Fetch an override if one exists; used when building criteria snapshots
pub async fn get_optional<C: ConnectionTrait>(
	conn: &C,
	uuid: Uuid,
) -> Result<Option<InstanceOverride>> {
	Ok(entities::InstanceOverride::find_by_id(uuid)
		.one(conn)
		.await?
		.map(|m| m.to_domain()))
}

pub async fn update<C: ConnectionTrait>(
	conn: &C,
	instance_override: &InstanceOverride,
) -> Result<()> {
	guard_instance(conn, instance_override.uuid).await?;

	let current = entities::InstanceOverride::find_by_id(instance_override.uuid)
		.one(conn)
		.await?
		.ok_or_else(|| {
			Error::not_found("instance override", instance_override.uuid.to_string())
		})?;

	let mut active: entities::instance_override::ActiveModel = current.into();
	active.last_update = Set(Utc::now());
	active.comment = Set(instance_override.comment.clone());
	active.number_cpus = Set(instance_override.number_cpus);
	active.memory_in_bytes = Set(instance_override.memory_in_bytes);
	active.update(conn).await?;

	Ok(())
}

pub async fn delete<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<()> {
	let record = entities::InstanceOverride::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("instance override", uuid.to_string()))?;

	entities::InstanceOverride::delete_by_id(record.uuid)
		.exec(conn)
		.await?;

	info!("Deleted override for instance {uuid}");

	Ok(())
}

/// The owning instance must exist, be unassigned, and not be migrating
async fn guard_instance<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<()> {
	let instance = entities::Instance::find_by_id(uuid)
		.one(conn)
		.await?
		.ok_or_else(|| {
			Error::ForeignKeyViolation(format!(
				"override references nonexistent instance {uuid}"
			))
		})?
		.to_domain()?;

	if instance.is_migrating() {
		return Err(Error::InvalidState(format!(
			"instance {uuid} is currently migrating"
		)));
	}
	if instance.batch_id.is_some() {
		return Err(Error::InvalidState(format!(
			"instance {uuid} is currently assigned to a batch"
		)));
	}
	Ok(())
}
