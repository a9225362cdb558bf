//! Initial migration to create all tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		// Create sources table
		manager
			.create_table(
				Table::create()
					.table(Sources::Table)
					.if_not_exists()
					.col(ColumnDef::new(Sources::Id).big_integer().not_null().auto_increment().primary_key())
					.col(ColumnDef::new(Sources::Name).string().not_null().unique_key())
					.col(ColumnDef::new(Sources::Type).string().not_null())
					.col(ColumnDef::new(Sources::Config).json())
					.to_owned(),
			)
			.await?;

		// Create targets table
		manager
			.create_table(
				Table::create()
					.table(Targets::Table)
					.if_not_exists()
					.col(ColumnDef::new(Targets::Id).big_integer().not_null().auto_increment().primary_key())
					.col(ColumnDef::new(Targets::Name).string().not_null().unique_key())
					.col(ColumnDef::new(Targets::Endpoint).string().not_null())
					.col(ColumnDef::new(Targets::TlsKey).string().not_null().default(""))
					.col(ColumnDef::new(Targets::TlsCert).string().not_null().default(""))
					.col(ColumnDef::new(Targets::OidcTokens).string())
					.col(ColumnDef::new(Targets::Insecure).boolean().not_null().default(false))
					.col(ColumnDef::new(Targets::Profile).string().not_null().default(""))
					.col(ColumnDef::new(Targets::Project).string().not_null().default(""))
					.to_owned(),
			)
			.await?;

		// Create networks table
		manager
			.create_table(
				Table::create()
					.table(Networks::Table)
					.if_not_exists()
					.col(ColumnDef::new(Networks::Id).big_integer().not_null().auto_increment().primary_key())
					.col(ColumnDef::new(Networks::Name).string().not_null().unique_key())
					.col(ColumnDef::new(Networks::Config).json().not_null())
					.to_owned(),
			)
			.await?;

		// Create certificates table, keyed by fingerprint
		manager
			.create_table(
				Table::create()
					.table(Certificates::Table)
					.if_not_exists()
					.col(ColumnDef::new(Certificates::Fingerprint).string().not_null().primary_key())
					.col(ColumnDef::new(Certificates::Type).string().not_null())
					.col(ColumnDef::new(Certificates::Name).string().not_null())
					.col(ColumnDef::new(Certificates::Description).string().not_null().default(""))
					.col(ColumnDef::new(Certificates::Certificate).string().not_null())
					.to_owned(),
			)
			.await?;

		// Create batches table. TargetId keeps the -1 sentinel instead of a
		// SQL foreign key; the registries validate the reference.
		manager
			.create_table(
				Table::create()
					.table(Batches::Table)
					.if_not_exists()
					.col(ColumnDef::new(Batches::Id).big_integer().not_null().auto_increment().primary_key())
					.col(ColumnDef::new(Batches::Name).string().not_null().unique_key())
					.col(ColumnDef::new(Batches::Status).string().not_null())
					.col(ColumnDef::new(Batches::IncludeExpression).string().not_null())
					.col(ColumnDef::new(Batches::WindowStart).timestamp_with_time_zone())
					.col(ColumnDef::new(Batches::WindowEnd).timestamp_with_time_zone())
					.col(ColumnDef::new(Batches::TargetId).big_integer().not_null().default(-1))
					.col(ColumnDef::new(Batches::TargetProject).string().not_null().default(""))
					.col(ColumnDef::new(Batches::StoragePool).string().not_null().default(""))
					.col(ColumnDef::new(Batches::DefaultNetwork).string().not_null().default(""))
					.to_owned(),
			)
			.await?;

		// Create instances table. SourceId is a hard reference; TargetId and
		// BatchId keep the -1 sentinel.
		manager
			.create_table(
				Table::create()
					.table(Instances::Table)
					.if_not_exists()
					.col(ColumnDef::new(Instances::Uuid).uuid().not_null().primary_key())
					.col(ColumnDef::new(Instances::MigrationStatus).string().not_null())
					.col(ColumnDef::new(Instances::LastUpdateFromSource).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(Instances::LastManualUpdate).timestamp_with_time_zone())
					.col(ColumnDef::new(Instances::SourceId).big_integer().not_null())
					.col(ColumnDef::new(Instances::TargetId).big_integer().not_null().default(-1))
					.col(ColumnDef::new(Instances::BatchId).big_integer().not_null().default(-1))
					.col(ColumnDef::new(Instances::Name).string().not_null())
					.col(ColumnDef::new(Instances::Architecture).string().not_null().default(""))
					.col(ColumnDef::new(Instances::InventoryPath).string().not_null().default(""))
					.col(ColumnDef::new(Instances::Os).string().not_null().default(""))
					.col(ColumnDef::new(Instances::OsVersion).string().not_null().default(""))
					.col(ColumnDef::new(Instances::Disks).json().not_null())
					.col(ColumnDef::new(Instances::Nics).json().not_null())
					.col(ColumnDef::new(Instances::NumberCpus).big_integer().not_null().default(0))
					.col(ColumnDef::new(Instances::MemoryInMib).big_integer().not_null().default(0))
					.col(ColumnDef::new(Instances::UseLegacyBios).boolean().not_null().default(false))
					.col(ColumnDef::new(Instances::SecureBootEnabled).boolean().not_null().default(false))
					.col(ColumnDef::new(Instances::TpmPresent).boolean().not_null().default(false))
					.foreign_key(
						ForeignKey::create()
							.from(Instances::Table, Instances::SourceId)
							.to(Sources::Table, Sources::Id)
							.on_delete(ForeignKeyAction::Restrict),
					)
					.to_owned(),
			)
			.await?;

		// Create instance_overrides table, 1:1 with instances
		manager
			.create_table(
				Table::create()
					.table(InstanceOverrides::Table)
					.if_not_exists()
					.col(ColumnDef::new(InstanceOverrides::Uuid).uuid().not_null().primary_key())
					.col(ColumnDef::new(InstanceOverrides::LastUpdate).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(InstanceOverrides::Comment).string().not_null().default(""))
					.col(ColumnDef::new(InstanceOverrides::NumberCpus).big_integer())
					.col(ColumnDef::new(InstanceOverrides::MemoryInBytes).big_integer())
					.foreign_key(
						ForeignKey::create()
							.from(InstanceOverrides::Table, InstanceOverrides::Uuid)
							.to(Instances::Table, Instances::Uuid)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		// Create config table
		manager
			.create_table(
				Table::create()
					.table(ConfigTable::Table)
					.if_not_exists()
					.col(ColumnDef::new(ConfigTable::Key).string().not_null().primary_key())
					.col(ColumnDef::new(ConfigTable::Value).string().not_null())
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(ConfigTable::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(InstanceOverrides::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Instances::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Batches::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Certificates::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Networks::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Targets::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Sources::Table).to_owned())
			.await?;

		Ok(())
	}
}

// Table identifiers

#[derive(Iden)]
enum Sources {
	Table,
	Id,
	Name,
	Type,
	Config,
}

#[derive(Iden)]
enum Targets {
	Table,
	Id,
	Name,
	Endpoint,
	TlsKey,
	TlsCert,
	OidcTokens,
	Insecure,
	Profile,
	Project,
}

#[derive(Iden)]
enum Networks {
	Table,
	Id,
	Name,
	Config,
}

#[derive(Iden)]
enum Certificates {
	Table,
	Fingerprint,
	Type,
	Name,
	Description,
	Certificate,
}

#[derive(Iden)]
enum Batches {
	Table,
	Id,
	Name,
	Status,
	IncludeExpression,
	WindowStart,
	WindowEnd,
	TargetId,
	TargetProject,
	StoragePool,
	DefaultNetwork,
}

#[derive(Iden)]
enum Instances {
	Table,
	Uuid,
	MigrationStatus,
	LastUpdateFromSource,
	LastManualUpdate,
	SourceId,
	TargetId,
	BatchId,
	Name,
	Architecture,
	InventoryPath,
	Os,
	OsVersion,
	Disks,
	Nics,
	NumberCpus,
	MemoryInMib,
	UseLegacyBios,
	SecureBootEnabled,
	TpmPresent,
}

#[derive(Iden)]
enum InstanceOverrides {
	Table,
	Uuid,
	LastUpdate,
	Comment,
	NumberCpus,
	MemoryInBytes,
}

#[derive(Iden)]
enum ConfigTable {
	#[iden = "config"]
	Table,
	Key,
	Value,
}
