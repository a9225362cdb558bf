//! Source registry

use sea_orm::ActiveValue::Set;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
	QueryOrder,
};
use tracing::info;

use crate::domain::Source;
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

/// Create a new source. Fails with `Conflict` if the name is taken.
pub async fn create<C: ConnectionTrait>(conn: &C, source: Source) -> Result<Source> {
	let existing = entities::Source::find()
		.filter(entities::source::Column::Name.eq(&source.name))
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict("source", &source.name));
	}

	let model = entities::source::ActiveModel {
		name: Set(source.name.clone()),
		source_type: Set(source.properties.kind().to_string()),
		config: Set(entities::source::config_to_db(&source.properties)?),
		..Default::default()
	};
	let record = model.insert(conn).await?;

	info!("Created source {:?} with ID {}", record.name, record.id);

	record.to_domain()
}

pub async fn get_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Source> {
	entities::Source::find()
		.filter(entities::source::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("source", name))?
		.to_domain()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> Result<Source> {
	entities::Source::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("source", id.to_string()))?
		.to_domain()
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Source>> {
	entities::Source::find()
		.order_by_asc(entities::source::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect()
}

/// Update a persisted source. Renames fail with `Conflict` if the new name
/// is taken.
pub async fn update<C: ConnectionTrait>(conn: &C, source: &Source) -> Result<()> {
	let id = source.id.ok_or(Error::NotPersisted("source"))?;
	let current = entities::Source::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("source", &source.name))?;

	if current.name != source.name {
		let taken = entities::Source::find()
			.filter(entities::source::Column::Name.eq(&source.name))
			.one(conn)
			.await?;
		if taken.is_some() {
			return Err(Error::conflict("source", &source.name));
		}
	}

	let mut active: entities::source::ActiveModel = current.into();
	active.name = Set(source.name.clone());
	active.source_type = Set(source.properties.kind().to_string());
	active.config = Set(entities::source::config_to_db(&source.properties)?);
	active.update(conn).await?;

	Ok(())
}

/// Delete a source by name. Fails while any instance still references it.
pub async fn delete<C: ConnectionTrait>(conn: &C, name: &str) -> Result<()> {
	let record = entities::Source::find()
		.filter(entities::source::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("source", name))?;

	let referencing = entities::Instance::find()
		.filter(entities::instance::Column::SourceId.eq(record.id))
		.count(conn)
		.await?;
	if referencing > 0 {
		return Err(Error::ForeignKeyViolation(format!(
			"source {name:?} is still referenced by {referencing} instance(s)"
		)));
	}

	entities::Source::delete_by_id(record.id).exec(conn).await?;

	info!("Deleted source {:?}", name);

	Ok(())
}
