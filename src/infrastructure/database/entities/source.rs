//! Source entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Source, SourceProperties, VmwareProperties};
use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sources")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	#[sea_orm(column_name = "type")]
	pub source_type: String,
	pub config: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Convert database model to the domain source
	pub fn to_domain(&self) -> crate::error::Result<Source> {
		let properties = match self.source_type.as_str() {
			"common" => SourceProperties::Common,
			"vmware" => {
				let config = self.config.clone().ok_or_else(|| {
					Error::Database(DbErr::Custom(format!(
						"vmware source {:?} has no connection config",
						self.name
					)))
				})?;
				let vmware: VmwareProperties = serde_json::from_value(config)?;
				SourceProperties::Vmware(vmware)
			}
			other => {
				return Err(Error::Database(DbErr::Custom(format!(
					"source {:?} has unknown type {:?}",
					self.name, other
				))))
			}
		};
		Ok(Source {
			id: Some(self.id),
			name: self.name.clone(),
			properties,
		})
	}
}

/// Connection config column value for a domain source
pub fn config_to_db(properties: &SourceProperties) -> crate::error::Result<Option<Json>> {
	match properties {
		SourceProperties::Common => Ok(None),
		SourceProperties::Vmware(vmware) => Ok(Some(serde_json::to_value(vmware)?)),
	}
}
