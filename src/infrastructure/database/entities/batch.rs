//! Batch entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Batch, BatchStatus};
use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	pub status: String,
	pub include_expression: String,
	pub window_start: Option<DateTimeUtc>,
	pub window_end: Option<DateTimeUtc>,
	pub target_id: i64, // -1 sentinel when no target chosen yet
	pub target_project: String,
	pub storage_pool: String,
	pub default_network: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Convert database model to the domain batch
	pub fn to_domain(&self) -> crate::error::Result<Batch> {
		let status = BatchStatus::from_str(&self.status).map_err(|_| {
			Error::Database(DbErr::Custom(format!(
				"batch {:?} has unknown status {:?}",
				self.name, self.status
			)))
		})?;
		Ok(Batch {
			id: Some(self.id),
			name: self.name.clone(),
			status,
			include_expression: self.include_expression.clone(),
			window_start: self.window_start,
			window_end: self.window_end,
			target_id: super::id_from_db(self.target_id),
			target_project: self.target_project.clone(),
			storage_pool: self.storage_pool.clone(),
			default_network: self.default_network.clone(),
		})
	}
}
