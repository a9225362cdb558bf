//! Domain error types shared by the registries and the reconciler

use sea_orm::DbErr;
use thiserror::Error;

use crate::criteria::ExpressionError;

/// Errors surfaced by registry and reconciler operations
#[derive(Debug, Error)]
pub enum Error {
	/// Lookup by key or ID yielded no row
	#[error("{entity} {name:?} not found")]
	NotFound { entity: &'static str, name: String },

	/// Unique-constraint violation (duplicate name, fingerprint, UUID)
	#[error("{entity} {name:?} already exists")]
	Conflict { entity: &'static str, name: String },

	/// Reference to a nonexistent row, or a row still referenced on delete
	#[error("{0}")]
	ForeignKeyViolation(String),

	/// Operation blocked by a lifecycle guard
	#[error("{0}")]
	InvalidState(String),

	/// Malformed or ill-typed criteria expression
	#[error("invalid criteria expression: {0}")]
	InvalidArgument(#[from] ExpressionError),

	/// Operation requires a surrogate ID that has not been assigned yet
	#[error("{0} has not been persisted yet")]
	NotPersisted(&'static str),

	/// Store-level failure that is not a constraint violation
	#[error("database error: {0}")]
	Database(DbErr),

	/// Encoding failure for JSON-typed columns
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Result type for registry and reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
		Error::NotFound {
			entity,
			name: name.into(),
		}
	}

	pub fn conflict(entity: &'static str, name: impl Into<String>) -> Self {
		Error::Conflict {
			entity,
			name: name.into(),
		}
	}
}

impl From<DbErr> for Error {
	/// Map store-level constraint failures onto the domain taxonomy instead
	/// of leaking raw driver error text as a generic database failure.
	fn from(err: DbErr) -> Self {
		let text = err.to_string();
		if text.contains("UNIQUE constraint failed") {
			Error::Conflict {
				entity: "row",
				name: text,
			}
		} else if text.contains("FOREIGN KEY constraint failed") {
			Error::ForeignKeyViolation(text)
		} else {
			Error::Database(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn constraint_errors_map_to_domain_kinds() {
		let unique = DbErr::Custom("UNIQUE constraint failed: batches.name".into());
		assert!(matches!(Error::from(unique), Error::Conflict { .. }));

		let fk = DbErr::Custom("FOREIGN KEY constraint failed".into());
		assert!(matches!(Error::from(fk), Error::ForeignKeyViolation(_)));

		let other = DbErr::Custom("disk I/O error".into());
		assert!(matches!(Error::from(other), Error::Database(_)));
	}
}
