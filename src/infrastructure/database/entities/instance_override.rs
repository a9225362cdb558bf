//! Instance override entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::InstanceOverride;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instance_overrides")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub uuid: Uuid,
	pub last_update: DateTimeUtc,
	pub comment: String,
	pub number_cpus: Option<i64>,
	pub memory_in_bytes: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::instance::Entity",
		from = "Column::Uuid",
		to = "super::instance::Column::Uuid"
	)]
	Instance,
}

impl Related<super::instance::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Instance.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	pub fn to_domain(&self) -> InstanceOverride {
		InstanceOverride {
			uuid: self.uuid,
			last_update: self.last_update,
			comment: self.comment.clone(),
			number_cpus: self.number_cpus,
			memory_in_bytes: self.memory_in_bytes,
		}
	}
}
