//! Instance - one virtual machine tracked through the migration lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use uuid::Uuid;

use super::instance_override::InstanceOverride;

/// A virtual machine in the migration inventory
///
/// The UUID is assigned by the source environment and is the instance's
/// identity everywhere in this crate. Hardware and software attributes are
/// synced from the source; `last_manual_update` records user edits on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
	pub uuid: Uuid,
	pub migration_status: MigrationStatus,
	pub last_update_from_source: DateTime<Utc>,
	pub last_manual_update: Option<DateTime<Utc>>,

	/// Source environment this instance was inventoried from
	pub source_id: i64,
	/// Target environment, once chosen
	pub target_id: Option<i64>,
	/// Batch assignment; `None` means unassigned
	pub batch_id: Option<i64>,

	pub name: String,
	pub architecture: String,
	pub inventory_path: String,
	pub os: String,
	pub os_version: String,
	pub disks: Vec<InstanceDisk>,
	pub nics: Vec<InstanceNic>,
	pub number_cpus: i64,
	pub memory_in_mib: i64,
	pub use_legacy_bios: bool,
	pub secure_boot_enabled: bool,
	pub tpm_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceDisk {
	pub name: String,
	pub is_shared: bool,
	pub size_in_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceNic {
	pub hwaddr: String,
	pub network: String,
}

/// Migration lifecycle of one instance
///
/// Transitions into and out of the migrating states are made exclusively by
/// the external migration executor; the registries and the reconciler only
/// read them as guard conditions.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Serialize,
	Deserialize,
	strum::Display,
	strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum MigrationStatus {
	NotAssignedBatch,
	AssignedBatch,
	UserDisabledMigration,
	BackgroundImport,
	Idle,
	FinalImport,
	ImportComplete,
	Finished,
	Error,
}

impl MigrationStatus {
	/// True while a transfer is in flight, including the idle gap between
	/// background passes and the cutover phases
	pub fn is_migrating(self) -> bool {
		matches!(
			self,
			MigrationStatus::BackgroundImport
				| MigrationStatus::Idle
				| MigrationStatus::FinalImport
				| MigrationStatus::ImportComplete
		)
	}
}

impl Instance {
	pub fn is_migrating(&self) -> bool {
		self.migration_status.is_migrating()
	}

	/// Migrating instances are exempt from deletion, update, and forced
	/// unassignment
	pub fn can_be_modified(&self) -> bool {
		!self.is_migrating()
	}

	/// Attribute snapshot consumed by the criteria evaluator
	///
	/// Field names here are the predicate language's attribute schema, so
	/// they are stable API: `Name`, `InventoryPath`, `OS`, `OSVersion`,
	/// `CPU.NumberCPUs`, `Memory.MemoryInBytes`, `Disks`, `NICs`,
	/// `TPMPresent`, `UseLegacyBios`, `SecureBootEnabled`, `Source.Name`.
	/// Override CPU/memory values take effect here so criteria evaluate
	/// against what the instance will actually get.
	pub fn criteria_snapshot(
		&self,
		source_name: &str,
		instance_override: Option<&InstanceOverride>,
	) -> Json {
		let number_cpus = instance_override
			.and_then(|o| o.number_cpus)
			.unwrap_or(self.number_cpus);
		let memory_in_bytes = instance_override
			.and_then(|o| o.memory_in_bytes)
			.unwrap_or(self.memory_in_mib * 1024 * 1024);

		json!({
			"Name": self.name,
			"InventoryPath": self.inventory_path,
			"OS": self.os,
			"OSVersion": self.os_version,
			"CPU": { "NumberCPUs": number_cpus },
			"Memory": { "MemoryInBytes": memory_in_bytes },
			"Disks": self.disks,
			"NICs": self.nics,
			"TPMPresent": self.tpm_present,
			"UseLegacyBios": self.use_legacy_bios,
			"SecureBootEnabled": self.secure_boot_enabled,
			"Source": { "Name": source_name },
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn instance() -> Instance {
		Instance {
			uuid: Uuid::new_v4(),
			migration_status: MigrationStatus::NotAssignedBatch,
			last_update_from_source: Utc::now(),
			last_manual_update: None,
			source_id: 1,
			target_id: None,
			batch_id: None,
			name: "web01".into(),
			architecture: "x86_64".into(),
			inventory_path: "/dc/vm/web01".into(),
			os: "Ubuntu 22.04".into(),
			os_version: "22.04".into(),
			disks: vec![InstanceDisk {
				name: "disk0".into(),
				is_shared: false,
				size_in_bytes: 10 * 1024 * 1024 * 1024,
			}],
			nics: vec![],
			number_cpus: 2,
			memory_in_mib: 4096,
			use_legacy_bios: false,
			secure_boot_enabled: true,
			tpm_present: false,
		}
	}

	#[test]
	fn migrating_states() {
		for status in [
			MigrationStatus::BackgroundImport,
			MigrationStatus::Idle,
			MigrationStatus::FinalImport,
			MigrationStatus::ImportComplete,
		] {
			assert!(status.is_migrating(), "{status}");
		}
		for status in [
			MigrationStatus::NotAssignedBatch,
			MigrationStatus::AssignedBatch,
			MigrationStatus::UserDisabledMigration,
			MigrationStatus::Finished,
			MigrationStatus::Error,
		] {
			assert!(!status.is_migrating(), "{status}");
		}
	}

	#[test]
	fn snapshot_exposes_schema_attributes() {
		let snap = instance().criteria_snapshot("vcenter01", None);
		assert_eq!(snap["Name"], "web01");
		assert_eq!(snap["CPU"]["NumberCPUs"], 2);
		assert_eq!(snap["Memory"]["MemoryInBytes"], 4096i64 * 1024 * 1024);
		assert_eq!(snap["Disks"][0]["IsShared"], false);
		assert_eq!(snap["Source"]["Name"], "vcenter01");
	}

	#[test]
	fn snapshot_applies_overrides() {
		let o = InstanceOverride {
			uuid: Uuid::new_v4(),
			last_update: Utc::now(),
			comment: String::new(),
			number_cpus: Some(8),
			memory_in_bytes: Some(16 * 1024 * 1024 * 1024),
		};
		let snap = instance().criteria_snapshot("vcenter01", Some(&o));
		assert_eq!(snap["CPU"]["NumberCPUs"], 8);
		assert_eq!(snap["Memory"]["MemoryInBytes"], 16i64 * 1024 * 1024 * 1024);
	}
}
