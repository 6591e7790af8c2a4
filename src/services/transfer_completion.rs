use crate::{
    db::DbPool,
    entities::{
        production_result::{self, Entity as ProductionResultEntity, ProductionStage},
        transfer_audit_log::AuditAction,
        weight_transfer::{self, Entity as WeightTransferEntity, TransferCategory, TransferStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{audit, audit::NewAuditEntry, stock_ledger, Actor},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Completes approved transfers: the only place warehouse stock is mutated.
///
/// All stock changes for one completion happen in a single transaction. Any
/// failure inside it rolls everything back, leaves the transfer `approved`,
/// and surfaces as `Ok(false)` plus a best-effort failure audit entry written
/// outside the rolled-back transaction.
#[derive(Clone)]
pub struct TransferCompletionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransferCompletionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Completes a transfer. Legal only from `approved`; terminal states
    /// return their own error so callers can distinguish a double call from a
    /// real failure. Returns `Ok(false)` (never an error) for insufficient
    /// stock and persistence faults, so callers must check the boolean.
    #[instrument(skip(self))]
    pub async fn complete(&self, transfer_id: Uuid, actor: Actor) -> Result<bool, ServiceError> {
        let db = self.db.as_ref();

        let transfer = WeightTransferEntity::find_by_id(transfer_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        match transfer.status_enum() {
            Some(TransferStatus::Approved) => {}
            Some(TransferStatus::Completed) => return Err(ServiceError::AlreadyCompleted),
            Some(TransferStatus::Rejected) => return Err(ServiceError::AlreadyRejected),
            Some(TransferStatus::Pending) => {
                return Err(ServiceError::InvalidStatus(
                    "Only approved transfers can be completed".to_string(),
                ))
            }
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown transfer status '{}'",
                    transfer.status
                )))
            }
        }

        let result = match transfer.production_result_id {
            Some(result_id) => ProductionResultEntity::find_by_id(result_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?,
            None => None,
        };

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        match self
            .apply_completion(&txn, &transfer, result.as_ref(), actor)
            .await
        {
            Ok(()) => {
                txn.commit().await.map_err(ServiceError::DatabaseError)?;

                counter!("rollflow.transfers.completed", 1);
                info!(
                    %transfer_id,
                    group_id = %transfer.transfer_group_id,
                    weight = %transfer.weight_transferred,
                    "Transfer completed"
                );
                self.event_sender
                    .send_or_log(Event::TransferCompleted {
                        transfer_id,
                        transfer_group_id: transfer.transfer_group_id,
                        weight_transferred: transfer.weight_transferred,
                    })
                    .await;

                Ok(true)
            }
            Err(err @ ServiceError::InsufficientStock(_))
            | Err(err @ ServiceError::DatabaseError(_)) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(%transfer_id, error = %rollback_err, "Rollback failed");
                }

                let reason = err.to_string();
                warn!(%transfer_id, %reason, "Transfer completion failed; stock unchanged");

                // Written against the pool so it survives the rollback.
                let failure_entry =
                    NewAuditEntry::new(AuditAction::TransferCompletionFailed, actor)
                        .transfer(&transfer)
                        .notes(reason.clone());
                if let Err(audit_err) = audit::record(db, failure_entry).await {
                    error!(%transfer_id, error = %audit_err, "Failed to write failure audit entry");
                }

                counter!("rollflow.transfers.completion_failed", 1);
                self.event_sender
                    .send_or_log(Event::TransferCompletionFailed {
                        transfer_id,
                        reason,
                    })
                    .await;

                Ok(false)
            }
            Err(other) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(%transfer_id, error = %rollback_err, "Rollback failed");
                }
                Err(other)
            }
        }
    }

    /// Stock mutation and audit entries for one completion. Runs entirely
    /// inside the caller's transaction.
    async fn apply_completion<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &weight_transfer::Model,
        result: Option<&production_result::Model>,
        actor: Actor,
    ) -> Result<(), ServiceError> {
        let category = transfer.category_enum().ok_or_else(|| {
            ServiceError::InternalError(format!("Unknown transfer category '{}'", transfer.category))
        })?;

        // Source side. Cutting consumes the roll in its entirety: the first
        // transfer in the group to complete decrements the full input weight,
        // later siblings decrement nothing.
        let source_decrement = match result {
            Some(res) if res.stage_enum() == Some(ProductionStage::Cutting) => {
                if self.group_already_consumed(conn, transfer).await? {
                    None
                } else {
                    Some(res.input_weight)
                }
            }
            _ => match category {
                TransferCategory::Waste => None,
                TransferCategory::Productive | TransferCategory::Remainder => {
                    Some(transfer.weight_transferred)
                }
            },
        };

        if let Some(amount) = source_decrement {
            let (before, after) = stock_ledger::decrement_stock(
                conn,
                transfer.material_id,
                transfer.source_warehouse_id,
                amount,
            )
            .await?;

            audit::record(
                conn,
                NewAuditEntry::new(AuditAction::StockDecremented, actor)
                    .transfer(transfer)
                    .stock_change(
                        transfer.material_id,
                        transfer.source_warehouse_id,
                        before,
                        after,
                    ),
            )
            .await?;
        }

        // Destination side: waste and destination-less remainders have no
        // stock effect and are tracked as audit entries only.
        if let Some(destination_id) = transfer.destination_warehouse_id {
            let (before, after) = stock_ledger::increment_or_create_stock(
                conn,
                transfer.material_id,
                destination_id,
                transfer.weight_transferred,
            )
            .await?;

            audit::record(
                conn,
                NewAuditEntry::new(AuditAction::StockIncremented, actor)
                    .transfer(transfer)
                    .stock_change(transfer.material_id, destination_id, before, after),
            )
            .await?;
        }

        match category {
            TransferCategory::Waste => {
                audit::record(
                    conn,
                    NewAuditEntry::new(AuditAction::WasteRecorded, actor)
                        .transfer(transfer)
                        .weight_delta(transfer.weight_transferred)
                        .notes("Waste weight tracked without stock effect"),
                )
                .await?;
            }
            TransferCategory::Remainder => {
                audit::record(
                    conn,
                    NewAuditEntry::new(AuditAction::RemainderRecorded, actor)
                        .transfer(transfer)
                        .weight_delta(transfer.weight_transferred),
                )
                .await?;
            }
            TransferCategory::Productive => {}
        }

        let mut active: weight_transfer::ActiveModel = transfer.clone().into();
        active.status = Set(TransferStatus::Completed.as_str().to_string());
        active.completed_at = Set(Some(Utc::now()));
        active
            .update(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        audit::record(
            conn,
            NewAuditEntry::new(AuditAction::TransferCompleted, actor).transfer(transfer),
        )
        .await?;

        Ok(())
    }

    /// True once any sibling transfer in the group has completed, i.e. the
    /// originating roll has already been consumed from source stock.
    async fn group_already_consumed<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &weight_transfer::Model,
    ) -> Result<bool, ServiceError> {
        let completed_siblings = WeightTransferEntity::find()
            .filter(weight_transfer::Column::TransferGroupId.eq(transfer.transfer_group_id))
            .filter(weight_transfer::Column::Id.ne(transfer.id))
            .filter(weight_transfer::Column::Status.eq(TransferStatus::Completed.as_str()))
            .count(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(completed_siblings > 0)
    }
}
