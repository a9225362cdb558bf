//! Target registry

use sea_orm::ActiveValue::Set;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
	QueryOrder,
};
use tracing::info;

use crate::domain::Target;
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

/// Create a new target. Fails with `Conflict` if the name is taken.
pub async fn create<C: ConnectionTrait>(conn: &C, target: Target) -> Result<Target> {
	let existing = entities::Target::find()
		.filter(entities::target::Column::Name.eq(&target.name))
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict("target", &target.name));
	}

	let model = entities::target::ActiveModel {
		name: Set(target.name.clone()),
		endpoint: Set(target.endpoint.clone()),
		tls_key: Set(target.tls_client_key.clone()),
		tls_cert: Set(target.tls_client_cert.clone()),
		oidc_tokens: Set(target.oidc_tokens.clone()),
		insecure: Set(target.insecure),
		profile: Set(target.profile.clone()),
		project: Set(target.project.clone()),
		..Default::default()
	};
	let record = model.insert(conn).await?;

	info!("Created target {:?} with ID {}", record.name, record.id);

	Ok(record.to_domain())
}

pub async fn get_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Target> {
	Ok(entities::Target::find()
		.filter(entities::target::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("target", name))?
		.to_domain())
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> Result<Target> {
	Ok(entities::Target::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("target", id.to_string()))?
		.to_domain())
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Target>> {
	Ok(entities::Target::find()
		.order_by_asc(entities::target::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect())
}

pub async fn update<C: ConnectionTrait>(conn: &C, target: &Target) -> Result<()> {
	let id = target.id.ok_or(Error::NotPersisted("target"))?;
	let current = entities::Target::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("target", &target.name))?;

	if current.name != target.name {
		let taken = entities::Target::find()
			.filter(entities::target::Column::Name.eq(&target.name))
			.one(conn)
			.await?;
		if taken.is_some() {
			return Err(Error::conflict("target", &target.name));
		}
	}

	let mut active: entities::target::ActiveModel = current.into();
	active.name = Set(target.name.clone());
	active.endpoint = Set(target.endpoint.clone());
	active.tls_key = Set(target.tls_client_key.clone());
	active.tls_cert = Set(target.tls_client_cert.clone());
	active.oidc_tokens = Set(target.oidc_tokens.clone());
	active.insecure = Set(target.insecure);
	active.profile = Set(target.profile.clone());
	active.project = Set(target.project.clone());
	active.update(conn).await?;

	Ok(())
}

/// Delete a target by name. Fails while any instance still references it.
pub async fn delete<C: ConnectionTrait>(conn: &C, name: &str) -> Result<()> {
	let record = entities::Target::find()
		.filter(entities::target::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("target", name))?;

	let referencing = entities::Instance::find()
		.filter(entities::instance::Column::TargetId.eq(record.id))
		.count(conn)
		.await?;
	if referencing > 0 {
		return Err(Error::ForeignKeyViolation(format!(
			"target {name:?} is still referenced by {referencing} instance(s)"
		)));
	}

	entities::Target::delete_by_id(record.id).exec(conn).await?;

	info!("Deleted target {:?}", name);

	Ok(())
}
