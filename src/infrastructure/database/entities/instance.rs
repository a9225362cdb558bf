//! Instance entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Instance, MigrationStatus};
use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instances")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub uuid: Uuid,
	pub migration_status: String,
	pub last_update_from_source: DateTimeUtc,
	pub last_manual_update: Option<DateTimeUtc>,
	pub source_id: i64,
	pub target_id: i64, // -1 sentinel
	pub batch_id: i64,  // -1 sentinel; kept in lockstep with migration_status
	pub name: String,
	pub architecture: String,
	pub inventory_path: String,
	pub os: String,
	pub os_version: String,
	pub disks: Json,
	pub nics: Json,
	pub number_cpus: i64,
	pub memory_in_mib: i64,
	pub use_legacy_bios: bool,
	pub secure_boot_enabled: bool,
	pub tpm_present: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::source::Entity",
		from = "Column::SourceId",
		to = "super::source::Column::Id"
	)]
	Source,
}

impl Related<super::source::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Source.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Convert database model to the domain instance
	pub fn to_domain(&self) -> crate::error::Result<Instance> {
		let migration_status =
			MigrationStatus::from_str(&self.migration_status).map_err(|_| {
				Error::Database(DbErr::Custom(format!(
					"instance {} has unknown migration status {:?}",
					self.uuid, self.migration_status
				)))
			})?;
		Ok(Instance {
			uuid: self.uuid,
			migration_status,
			last_update_from_source: self.last_update_from_source,
			last_manual_update: self.last_manual_update,
			source_id: self.source_id,
			target_id: super::id_from_db(self.target_id),
			batch_id: super::id_from_db(self.batch_id),
			name: self.name.clone(),
			architecture: self.architecture.clone(),
			inventory_path: self.inventory_path.clone(),
			os: self.os.clone(),
			os_version: self.os_version.clone(),
			disks: serde_json::from_value(self.disks.clone())?,
			nics: serde_json::from_value(self.nics.clone())?,
			number_cpus: self.number_cpus,
			memory_in_mib: self.memory_in_mib,
			use_legacy_bios: self.use_legacy_bios,
			secure_boot_enabled: self.secure_boot_enabled,
			tpm_present: self.tpm_present,
		})
	}
}
