//! Certificate registry, keyed by fingerprint

use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder};
use tracing::info;

use crate::domain::Certificate;
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

pub async fn create<C: ConnectionTrait>(conn: &C, certificate: Certificate) -> Result<Certificate> {
	let existing = entities::Certificate::find_by_id(&certificate.fingerprint)
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict("certificate", &certificate.fingerprint));
	}

	let model = entities::certificate::ActiveModel {
		fingerprint: Set(certificate.fingerprint.clone()),
		cert_type: Set(certificate.cert_type.clone()),
		name: Set(certificate.name.clone()),
		description: Set(certificate.description.clone()),
		certificate: Set(certificate.certificate.clone()),
	};
	let record = model.insert(conn).await?;

	info!("Created certificate {:?} ({})", record.name, record.fingerprint);

	Ok(record.to_domain())
}

pub async fn get_by_fingerprint<C: ConnectionTrait>(
	conn: &C,
	fingerprint: &str,
) -> Result<Certificate> {
	Ok(entities::Certificate::find_by_id(fingerprint)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("certificate", fingerprint))?
		.to_domain())
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Certificate>> {
	Ok(entities::Certificate::find()
		.order_by_asc(entities::certificate::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect())
}

pub async fn update<C: ConnectionTrait>(conn: &C, certificate: &Certificate) -> Result<()> {
	let current = entities::Certificate::find_by_id(&certificate.fingerprint)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("certificate", &certificate.fingerprint))?;

	let mut active: entities::certificate::ActiveModel = current.into();
	active.cert_type = Set(certificate.cert_type.clone());
	active.name = Set(certificate.name.clone());
	active.description = Set(certificate.description.clone());
	active.certificate = Set(certificate.certificate.clone());
	active.update(conn).await?;

	Ok(())
}

pub async fn delete<C: ConnectionTrait>(conn: &C, fingerprint: &str) -> Result<()> {
	let record = entities::Certificate::find_by_id(fingerprint)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("certificate", fingerprint))?;

	entities::Certificate::delete_by_id(&record.fingerprint)
		.exec(conn)
		.await?;

	info!("Deleted certificate {:?}", fingerprint);

	Ok(())
}
