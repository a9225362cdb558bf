//! Database infrastructure using SeaORM

use sea_orm::{
	ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection,
	DatabaseTransaction, DbErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper for the migration inventory
///
/// The pool is capped at one connection, so every mutation serializes
/// behind it; that single-writer model is the isolation the registries
/// assume.
pub struct Database {
	conn: DatabaseConnection,
}

impl Database {
	/// Create a new database at the specified path
	pub async fn create(path: &Path) -> Result<Self, DbErr> {
		// Ensure parent directory exists
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
		}

		let db_url = format!("sqlite://{}?mode=rwc", path.display());
		let conn = Self::connect(db_url).await?;

		info!("Created new database at {:?}", path);

		Ok(Self { conn })
	}

	/// Open an existing database
	pub async fn open(path: &Path) -> Result<Self, DbErr> {
		if !path.exists() {
			return Err(DbErr::Custom(format!(
				"Database does not exist: {}",
				path.display()
			)));
		}

		let db_url = format!("sqlite://{}", path.display());
		let conn = Self::connect(db_url).await?;

		info!("Opened database at {:?}", path);

		Ok(Self { conn })
	}

	async fn connect(db_url: String) -> Result<DatabaseConnection, DbErr> {
		let mut opt = ConnectOptions::new(db_url);
		opt.max_connections(1)
			.min_connections(1)
			.connect_timeout(Duration::from_secs(8))
			.idle_timeout(Duration::from_secs(8))
			.sqlx_logging(false); // We'll use tracing instead

		let conn = SeaDatabase::connect(opt).await?;
		conn.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
		Ok(conn)
	}

	/// Run migrations
	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(&self.conn, None).await?;
		info!("Database migrations completed successfully");
		Ok(())
	}

	/// Get the database connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}

	/// Open a write transaction
	///
	/// Registry functions are generic over [`sea_orm::ConnectionTrait`];
	/// composed operations pass the returned transaction through every call
	/// that must commit or roll back as one unit.
	pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
		self.conn.begin().await
	}
}
