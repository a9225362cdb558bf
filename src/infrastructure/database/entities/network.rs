//! Network entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Network;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "networks")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	pub config: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	pub fn to_domain(&self) -> Network {
		Network {
			id: Some(self.id),
			name: self.name.clone(),
			config: self.config.clone(),
		}
	}
}
