//! Network registry

use sea_orm::ActiveValue::Set;
use sea_orm::{
	ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;

use crate::domain::Network;
use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

pub async fn create<C: ConnectionTrait>(conn: &C, network: Network) -> Result<Network> {
	let existing = entities::Network::find()
		.filter(entities::network::Column::Name.eq(&network.name))
		.one(conn)
		.await?;
	if existing.is_some() {
		return Err(Error::conflict("network", &network.name));
	}

	let model = entities::network::ActiveModel {
		name: Set(network.name.clone()),
		config: Set(network.config.clone()),
		..Default::default()
	};
	let record = model.insert(conn).await?;

	info!("Created network {:?} with ID {}", record.name, record.id);

	Ok(record.to_domain())
}

pub async fn get_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Network> {
	Ok(entities::Network::find()
		.filter(entities::network::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("network", name))?
		.to_domain())
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Network>> {
	Ok(entities::Network::find()
		.order_by_asc(entities::network::Column::Name)
		.all(conn)
		.await?
		.iter()
		.map(|m| m.to_domain())
		.collect())
}

pub async fn update<C: ConnectionTrait>(conn: &C, network: &Network) -> Result<()> {
	let id = network.id.ok_or(Error::NotPersisted("network"))?;
	let current = entities::Network::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("network", &network.name))?;

	if current.name != network.name {
		let taken = entities::Network::find()
			.filter(entities::network::Column::Name.eq(&network.name))
			.one(conn)
			.await?;
		if taken.is_some() {
			return Err(Error::conflict("network", &network.name));
		}
	}

	let mut active: entities::network::ActiveModel = current.into();
	active.name = Set(network.name.clone());
	active.config = Set(network.config.clone());
	active.update(conn).await?;

	Ok(())
}

pub async fn delete<C: ConnectionTrait>(conn: &C, name: &str) -> Result<()> {
	let record = entities::Network::find()
		.filter(entities::network::Column::Name.eq(name))
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("network", name))?;

	entities::Network::delete_by_id(record.id).exec(conn).await?;

	info!("Deleted network {:?}", name);

	Ok(())
}
