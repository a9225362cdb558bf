//! Config registry - key/value settings with upsert semantics

use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder};

use crate::error::{Error, Result};
use crate::infrastructure::database::entities;

pub async fn get<C: ConnectionTrait>(conn: &C, key: &str) -> Result<String> {
	Ok(entities::Config::find_by_id(key)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("config key", key))?
		.value)
}

/// Set a config key, inserting or replacing as needed
pub async fn set<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> Result<()> {
	match entities::Config::find_by_id(key).one(conn).await? {
		Some(current) => {
			let mut active: entities::config::ActiveModel = current.into();
			active.value = Set(value.to_string());
			active.update(conn).await?;
		}
		None => {
			let model = entities::config::ActiveModel {
				key: Set(key.to_string()),
				value: Set(value.to_string()),
			};
			model.insert(conn).await?;
		}
	}
	Ok(())
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<(String, String)>> {
	Ok(entities::Config::find()
		.order_by_asc(entities::config::Column::Key)
		.all(conn)
		.await?
		.into_iter()
		.map(|m| (m.key, m.value))
		.collect())
}

pub async fn delete<C: ConnectionTrait>(conn: &C, key: &str) -> Result<()> {
	let record = entities::Config::find_by_id(key)
		.one(conn)
		.await?
		.ok_or_else(|| Error::not_found("config key", key))?;

	entities::Config::delete_by_id(&record.key).exec(conn).await?;

	Ok(())
}
