//! Batch registry
//!
//! Update and delete re-read the persisted status first: a batch in a
//! migration phase (`Running`) rejects both, and deletion additionally
//! refuses to detach any member instance that is mid-migration.

use sea_orm::ActiveValue::Set;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;

use crate::criteria::CompiledExpression;
use crate::domain::{Batch, MigrationStatus};
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

/// Create a new batch in status `Defined`
///
/// The include expression must compile and the target, when set, must
/// exist; both are checked before anything is written.
pub async fn create<C: ConnectionTrait>(conn: &C, batch: Batch) -> Result<Batch> {
	CompiledExpression::parse(&batch.include_expression)?;
	validate_target(conn, batch.target_id).await?;

	let existing = entities::Batch::find()
		.filter(entities::batch::Column::Name.eq(&batch.name))
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict("batch", &batch.name));
	}

	let model = entities::batch::ActiveModel {
		name: Set(batch.name.clone()),
		status: Set(crate::domain::BatchStatus::Defined.to_string()),
		include_expression: Set(batch.include_expression.clone()),
		window_start: Set(batch.window_start),
		window_end: Set(batch.window_end),
		target_id: Set(entities::id_to_db(batch.target_id)),
		target_project: Set(batch.target_project.clone()),
		storage_pool: Set(batch.storage_pool.clone()),
		default_network: Set(batch.default_network.clone()),
		..Default::default()
	};
	let record = model.insert(conn).await?;

	info!("Created batch {:?} with ID {}", record.name, record.id);

	record.to_domain()
}

pub async fn get_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Batch> {
	entities::Batch::find()
		.filter(entities::batch::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("batch", name))?
		.to_domain()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> Result<Batch> {
	entities::Batch::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("batch", id.to_string()))?
		.to_domain()
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Batch>> {
	entities::Batch::find()
		.order_by_asc(entities::batch::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect()
}

/// Update a persisted batch
///
/// The guard runs against the batch's *current* persisted status, not the
/// caller's copy, so a batch that started running since the caller read it
/// is still protected.
pub async fn update<C: ConnectionTrait>(conn: &C, batch: &Batch) -> Result<()> {
	let id = batch.required_id()?;
	let current = entities::Batch::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("batch", &batch.name))?;

	if !current.to_domain()?.can_be_modified() {
		return Err(Error::InvalidState(format!(
			"batch {:?} is currently in a migration phase",
			current.name
		)));
	}

	CompiledExpression::parse(&batch.include_expression)?;
	validate_target(conn, batch.target_id).await?;

	if current.name != batch.name {
		let taken = entities::Batch::find()
			.filter(entities::batch::Column::Name.eq(&batch.name))
			.one(conn)
			.await?;
		if taken.is_some() {
			return Err(Error::conflict("batch", &batch.name));
		}
	}

	let mut active: entities::batch::ActiveModel = current.into();
	active.name = Set(batch.name.clone());
	active.status = Set(batch.status.to_string());
	active.include_expression = Set(batch.include_expression.clone());
	active.window_start = Set(batch.window_start);
	active.window_end = Set(batch.window_end);
	active.target_id = Set(entities::id_to_db(batch.target_id));
	active.target_project = Set(batch.target_project.clone());
	active.storage_pool = Set(batch.storage_pool.clone());
	active.default_network = Set(batch.default_network.clone());
	active.update(conn).await?;

	Ok(())
}

/// Set a batch's lifecycle status directly
///
/// This is the migration executor's hook: it bypasses the modifiability
/// guard, since moving out of `Running` is exactly what the guard would
/// otherwise forbid.
pub async fn set_status<C: ConnectionTrait>(
	conn: &C,
	name: &str,
	status: crate::domain::BatchStatus,
) -> Result<()> {
	let record = entities::Batch::find()
		.filter(entities::batch::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("batch", name))?;

	let mut active: entities::batch::ActiveModel = record.into();
	active.status = Set(status.to_string());
	active.update(conn).await?;

	info!("Batch {name:?} status set to {status}");

	Ok(())
}

/// Delete a batch by name, unassigning its member instances
///
/// Runs entirely on the given connection: pass a transaction so the
/// unassignments and the row deletion commit or roll back together. Fails
/// with `InvalidState` before touching anything if the batch is running or
/// any member instance is migrating.
pub async fn delete<C: ConnectionTrait>(conn: &C, name: &str) -> Result<()> {
	let record = entities::Batch::find()
		.filter(entities::batch::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("batch", name))?;

	let batch = record.to_domain()?;
	if !batch.can_be_modified() {
		return Err(Error::InvalidState(format!(
			"batch {name:?} is currently in a migration phase"
		)));
	}

	let members = entities::Instance::find()
		.filter(entities::instance::Column::BatchId.eq(record.id))
		.all(conn)
		.await?;

	// A migrating instance is never silently detached; refuse the whole
	// deletion instead.
	for member in &members {
		let instance = member.to_domain()?;
		if instance.is_migrating() {
			return Err(Error::InvalidState(format!(
				"cannot delete batch {name:?}: instance {} is currently migrating",
				instance.uuid
			)));
		}
	}

	for member in members {
		let mut active: entities::instance::ActiveModel = member.into();
		active.batch_id = Set(entities::INVALID_ID);
		active.migration_status = Set(MigrationStatus::NotAssignedBatch.to_string());
		active.update(conn).await?;
	}

	entities::Batch::delete_by_id(record.id).exec(conn).await?;

	info!("Deleted batch {:?}", name);

	Ok(())
}

async fn validate_target<C: ConnectionTrait>(conn: &C, target_id: Option<i64>) -> Result<()> {
	if let Some(id) = target_id {
		let exists = entities::Target::find_by_id(id).one(conn).await?;
		if exists.is_none() {
			return Err(Error::ForeignKeyViolation(format!(
				"batch references nonexistent target {id}"
			)));
		}
	}
	Ok(())
}
