use crate::{
    db::DbPool,
    entities::{
        production_result::{self, Entity as ProductionResultEntity, ProductionStage, ResultStatus},
        transfer_audit_log::AuditAction,
        weight_transfer,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{audit, audit::NewAuditEntry, transfer_groups::TransferGroupService, Actor},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Raw measurements an operator reports at the end of a cutting or sorting
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductionResult {
    pub order_id: Uuid,
    pub material_id: Uuid,
    pub stage: ProductionStage,
    pub warehouse_id: Uuid,
    pub operator_id: Uuid,
    pub input_weight: Decimal,
    pub output_weight: Decimal,
    pub waste_weight: Decimal,
    pub remaining_weight: Decimal,
    pub destination_warehouse_id: Option<Uuid>,
    pub remainder_destination_id: Option<Uuid>,
    pub stage_metadata: Option<serde_json::Value>,
}

impl NewProductionResult {
    /// Signed difference between input weight and the sum of outputs.
    pub fn weight_difference(&self) -> Decimal {
        self.input_weight - (self.output_weight + self.waste_weight + self.remaining_weight)
    }
}

/// Records stage output and gates the approve/reject transitions behind
/// mass-balance validation.
#[derive(Clone)]
pub struct ProductionResultService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    transfer_groups: Arc<TransferGroupService>,
    /// Mass-balance tolerance in kilograms.
    tolerance: Decimal,
}

impl ProductionResultService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        transfer_groups: Arc<TransferGroupService>,
        tolerance: Decimal,
    ) -> Self {
        Self {
            db,
            event_sender,
            transfer_groups,
            tolerance,
        }
    }

    /// Persists one stage's measurements.
    ///
    /// Balanced results land in `completed`, ready for approval. An
    /// imbalanced result is still persisted (status `pending`, inspectable
    /// for correction) but the call fails with `WeightImbalance` carrying the
    /// signed difference; such a row can never reach `approved`.
    #[instrument(skip(self, input))]
    pub async fn record_result(
        &self,
        input: NewProductionResult,
    ) -> Result<production_result::Model, ServiceError> {
        if input.input_weight <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Input weight must be positive, got: {}",
                input.input_weight
            )));
        }
        for (label, weight) in [
            ("output", input.output_weight),
            ("waste", input.waste_weight),
            ("remaining", input.remaining_weight),
        ] {
            if weight < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "{} weight cannot be negative, got: {}",
                    label, weight
                )));
            }
        }

        let difference = input.weight_difference();
        let balanced = difference.abs() < self.tolerance;

        let row = production_result::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(input.order_id),
            material_id: Set(input.material_id),
            stage: Set(input.stage.as_str().to_string()),
            warehouse_id: Set(input.warehouse_id),
            operator_id: Set(input.operator_id),
            input_weight: Set(input.input_weight),
            output_weight: Set(input.output_weight),
            waste_weight: Set(input.waste_weight),
            remaining_weight: Set(input.remaining_weight),
            destination_warehouse_id: Set(input.destination_warehouse_id),
            remainder_destination_id: Set(input.remainder_destination_id),
            status: Set(if balanced {
                ResultStatus::Completed.as_str().to_string()
            } else {
                ResultStatus::Pending.as_str().to_string()
            }),
            transfers_created: Set(false),
            stage_metadata: Set(input.stage_metadata),
            completed_at: Set(balanced.then(Utc::now)),
            ..Default::default()
        };

        let created = row
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        if !balanced {
            warn!(
                result_id = %created.id,
                %difference,
                "Production result recorded with weight imbalance"
            );
            return Err(ServiceError::WeightImbalance { difference });
        }

        info!(result_id = %created.id, stage = %created.stage, "Production result recorded");
        self.event_sender
            .send_or_log(Event::ProductionResultRecorded {
                result_id: created.id,
                order_id: created.order_id,
                stage: created.stage.clone(),
                input_weight: created.input_weight,
            })
            .await;

        Ok(created)
    }

    /// Approves a completed result and builds its transfer group in the same
    /// transaction; a builder failure (e.g. `MissingApprover`) rolls the
    /// approval back.
    #[instrument(skip(self))]
    pub async fn approve_result(
        &self,
        result_id: Uuid,
        approver: Uuid,
        notes: Option<String>,
    ) -> Result<(production_result::Model, Vec<weight_transfer::Model>), ServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let result = ProductionResultEntity::find_by_id(result_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Production result {} not found", result_id))
            })?;

        // Terminal states win over the balance re-check so the caller learns
        // the real reason the result is untouchable. Balance is re-validated
        // for anything still in flight; a record that failed validation at
        // recording time stays blocked here.
        match result.status_enum() {
            Some(ResultStatus::Completed) => {
                if result.weight_difference().abs() >= self.tolerance {
                    return Err(ServiceError::AlreadyImbalanced);
                }
            }
            Some(ResultStatus::Approved) => return Err(ServiceError::AlreadyApproved),
            Some(ResultStatus::Rejected) => return Err(ServiceError::AlreadyRejected),
            Some(ResultStatus::Pending) => {
                if result.weight_difference().abs() >= self.tolerance {
                    return Err(ServiceError::AlreadyImbalanced);
                }
                return Err(ServiceError::InvalidStatus(
                    "Only completed results can be approved".to_string(),
                ));
            }
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown result status '{}'",
                    result.status
                )))
            }
        }

        let mut active: production_result::ActiveModel = result.into();
        active.status = Set(ResultStatus::Approved.as_str().to_string());
        active.approved_by = Set(Some(approver));
        active.approval_notes = Set(notes);
        active.approved_at = Set(Some(Utc::now()));
        let approved = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let transfers = self.transfer_groups.build_for_result(&txn, &approved).await?;

        audit::record(
            &txn,
            NewAuditEntry::new(AuditAction::ResultApproved, Actor::User(approver))
                .production_result(approved.id)
                .notes(format!("{} transfers created", transfers.len())),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        counter!("rollflow.production_results.approved", 1);
        info!(%result_id, transfer_count = transfers.len(), "Production result approved");

        self.event_sender
            .send_or_log(Event::ProductionResultApproved {
                result_id,
                approved_by: approver,
                transfer_count: transfers.len(),
            })
            .await;
        if let Some(first) = transfers.first() {
            self.event_sender
                .send_or_log(Event::TransferGroupCreated {
                    transfer_group_id: first.transfer_group_id,
                    production_result_id: Some(result_id),
                    transfer_count: transfers.len(),
                })
                .await;
        }

        Ok((approved, transfers))
    }

    /// Rejects a completed result. Terminal; the record is never edited
    /// afterwards.
    #[instrument(skip(self))]
    pub async fn reject_result(
        &self,
        result_id: Uuid,
        approver: Uuid,
        reason: String,
    ) -> Result<production_result::Model, ServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let result = ProductionResultEntity::find_by_id(result_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Production result {} not found", result_id))
            })?;

        match result.status_enum() {
            Some(ResultStatus::Completed) => {}
            Some(ResultStatus::Approved) => return Err(ServiceError::AlreadyApproved),
            Some(ResultStatus::Rejected) => return Err(ServiceError::AlreadyRejected),
            Some(ResultStatus::Pending) => {
                return Err(ServiceError::InvalidStatus(
                    "Only completed results can be rejected".to_string(),
                ))
            }
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown result status '{}'",
                    result.status
                )))
            }
        }

        let mut active: production_result::ActiveModel = result.into();
        active.status = Set(ResultStatus::Rejected.as_str().to_string());
        active.rejection_reason = Set(Some(reason.clone()));
        let rejected = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        audit::record(
            &txn,
            NewAuditEntry::new(AuditAction::ResultRejected, Actor::User(approver))
                .production_result(rejected.id)
                .notes(reason.clone()),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        warn!(%result_id, %reason, "Production result rejected");
        self.event_sender
            .send_or_log(Event::ProductionResultRejected {
                result_id,
                rejected_by: approver,
                reason,
            })
            .await;

        Ok(rejected)
    }

    pub async fn get_result(
        &self,
        result_id: Uuid,
    ) -> Result<Option<production_result::Model>, ServiceError> {
        ProductionResultEntity::find_by_id(result_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
