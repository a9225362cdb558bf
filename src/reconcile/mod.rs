//! Assignment reconciler
//!
//! Re-derives instance→batch assignment from the batch's current criteria
//! and each instance's current attributes. Runs as two passes inside one
//! transaction: first drop members that stopped matching, then adopt
//! unassigned instances that now match. Migrating instances are left alone
//! in both directions.
//!
//! Reconciliation is first-writer-wins across batches: an instance another
//! batch already adopted is not considered here. Callers that care about
//! cross-batch exclusivity serialize their reconcile calls per batch.

use tracing::{debug, info};

use crate::criteria::CompiledExpression;
use crate::domain::{Instance, MigrationStatus};
use crate::error::Result;
use crate::infrastructure::database::Database;
use crate::registry;

/// Writes performed by one reconcile run
///
/// A second run with no intervening attribute or criteria change reports
/// zero writes; that convergence is part of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
	pub batch: String,
	pub adopted: usize,
	pub dropped: usize,
}

impl ReconcileSummary {
	pub fn writes(&self) -> usize {
		self.adopted + self.dropped
	}
}

/// Reconcile one batch's membership
///
/// Any evaluator error aborts the whole call; the open transaction is
/// dropped uncommitted, so no partial assignment is ever visible.
pub async fn reconcile_batch(db: &Database, batch_name: &str) -> Result<ReconcileSummary> {
	let txn = db.begin().await.map_err(crate::error::Error::from)?;

	let batch = registry::batch::get_by_name(&txn, batch_name).await?;
	let batch_id = batch.required_id()?;
	let criteria = CompiledExpression::parse(&batch.include_expression)?;

	let mut summary = ReconcileSummary {
		batch: batch.name.clone(),
		adopted: 0,
		dropped: 0,
	};

	// Drop pass: members that no longer match are unassigned, unless they
	// are migrating - those stay attached no matter what the criteria say.
	for instance in registry::instance::list_by_batch(&txn, batch_id).await? {
		let matches = evaluate(&txn, &criteria, &instance).await?;
		if matches {
			continue;
		}
		if instance.is_migrating() {
			debug!(
				"Instance {} no longer matches batch {:?} but is migrating; leaving assigned",
				instance.uuid, batch.name
			);
			continue;
		}
		registry::instance::set_assignment(
			&txn,
			instance.uuid,
			None,
			MigrationStatus::NotAssignedBatch,
		)
		.await?;
		summary.dropped += 1;
	}

	// Adopt pass: unassigned instances that match are taken into the batch.
	// Instances the operator disabled stay out even when they match.
	for instance in registry::instance::list_unassigned(&txn).await? {
		if instance.migration_status != MigrationStatus::NotAssignedBatch {
			continue;
		}
		let matches = evaluate(&txn, &criteria, &instance).await?;
		if !matches {
			continue;
		}
		registry::instance::set_assignment(
			&txn,
			instance.uuid,
			Some(batch_id),
			MigrationStatus::AssignedBatch,
		)
		.await?;
		summary.adopted += 1;
	}

	txn.commit().await.map_err(crate::error::Error::from)?;

	info!(
		"Reconciled batch {:?}: {} adopted, {} dropped",
		summary.batch, summary.adopted, summary.dropped
	);

	Ok(summary)
}

async fn evaluate<C: sea_orm::ConnectionTrait>(
	conn: &C,
	criteria: &CompiledExpression,
	instance: &Instance,
) -> Result<bool> {
	let source = registry::source::get_by_id(conn, instance.source_id).await?;
	let instance_override = registry::instance_override::get_optional(conn, instance.uuid).await?;
	let snapshot = instance.criteria_snapshot(&source.name, instance_override.as_ref());
	Ok(criteria.matches(&snapshot)?)
}
