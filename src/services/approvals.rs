use crate::{
    db::DbPool,
    entities::{
        transfer_audit_log::AuditAction,
        weight_transfer::{self, Entity as WeightTransferEntity, TransferStatus},
        weight_transfer_approval::{self, ApprovalStatus, Entity as ApprovalEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{audit, audit::NewAuditEntry, inventory_requests, Actor},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Roles an approval chain is built from. The warehouse each role is scoped
/// to comes from the transfer being approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalRole {
    SourceWarehouseManager,
    TransitManager,
    DestinationWarehouseManager,
}

impl ApprovalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalRole::SourceWarehouseManager => "source_warehouse_manager",
            ApprovalRole::TransitManager => "transit_manager",
            ApprovalRole::DestinationWarehouseManager => "destination_warehouse_manager",
        }
    }

    /// Warehouse this role is resolved against for a given transfer.
    /// Transit managers are not warehouse-scoped.
    pub fn warehouse_scope(&self, transfer: &weight_transfer::Model) -> Option<Uuid> {
        match self {
            ApprovalRole::SourceWarehouseManager => Some(transfer.source_warehouse_id),
            ApprovalRole::TransitManager => None,
            ApprovalRole::DestinationWarehouseManager => transfer.destination_warehouse_id,
        }
    }
}

/// Role string used on the synthetic approval row attached to auto-approved
/// waste transfers.
pub const AUTO_APPROVED_ROLE: &str = "auto_approved";

/// Ordered role chains per transfer kind.
#[derive(Debug, Clone)]
pub struct ApprovalChainConfig {
    /// Chain for productive material and forwarded remainders.
    pub full_chain: Vec<ApprovalRole>,
    /// Chain for remainders routed back to their source warehouse.
    pub remainder_return_chain: Vec<ApprovalRole>,
}

impl Default for ApprovalChainConfig {
    fn default() -> Self {
        Self {
            full_chain: vec![
                ApprovalRole::SourceWarehouseManager,
                ApprovalRole::TransitManager,
                ApprovalRole::DestinationWarehouseManager,
            ],
            remainder_return_chain: vec![ApprovalRole::SourceWarehouseManager],
        }
    }
}

/// Capability-based approver lookup, pluggable so tests can substitute an
/// in-memory directory. Production implementations typically join role
/// assignments against warehouse membership.
#[async_trait]
pub trait ApproverResolver: Send + Sync {
    async fn resolve_approver(
        &self,
        role: ApprovalRole,
        warehouse_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, ServiceError>;
}

/// Outcome of a successful approval call.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub approval: weight_transfer_approval::Model,
    /// True when this was the final slot and the transfer is now approved.
    pub fully_approved: bool,
}

/// Per-slot view used in the approval status summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalSlotStatus {
    pub sequence: i32,
    pub role: String,
    pub approver_id: Option<Uuid>,
    pub status: String,
    pub is_final_approval: bool,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalStatusSummary {
    pub transfer_id: Uuid,
    pub transfer_status: String,
    pub pending_inventory_requests: u64,
    pub slots: Vec<ApprovalSlotStatus>,
}

/// Sequential approval engine.
///
/// Every check is re-validated against the database at call time; nothing is
/// cached, so concurrent approvals on sibling transfers in the same group
/// cannot interfere with each other.
#[derive(Clone)]
pub struct ApprovalService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    resolver: Arc<dyn ApproverResolver>,
    chain: ApprovalChainConfig,
}

impl ApprovalService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        resolver: Arc<dyn ApproverResolver>,
        chain: ApprovalChainConfig,
    ) -> Self {
        Self {
            db,
            event_sender,
            resolver,
            chain,
        }
    }

    pub fn chain(&self) -> &ApprovalChainConfig {
        &self.chain
    }

    /// Creates the ordered approval chain for a transfer, resolving one
    /// approver per role. An unresolvable role fails the whole call with
    /// `MissingApprover` so the surrounding transaction rolls back; slots are
    /// never silently left unassigned.
    pub(crate) async fn create_chain<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &weight_transfer::Model,
        roles: &[ApprovalRole],
    ) -> Result<Vec<weight_transfer_approval::Model>, ServiceError> {
        let total = roles.len();
        let mut created = Vec::with_capacity(total);

        for (index, role) in roles.iter().enumerate() {
            let warehouse_id = role.warehouse_scope(transfer);
            let approver_id = self
                .resolver
                .resolve_approver(*role, warehouse_id)
                .await?
                .ok_or_else(|| ServiceError::MissingApprover {
                    role: role.as_str().to_string(),
                    warehouse_id,
                })?;

            let row = weight_transfer_approval::ActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(transfer.id),
                approver_id: Set(Some(approver_id)),
                approver_kind: Set(Actor::User(approver_id).kind_str().to_string()),
                role: Set(role.as_str().to_string()),
                approval_sequence: Set((index + 1) as i32),
                is_final_approval: Set(index + 1 == total),
                status: Set(ApprovalStatus::Pending.as_str().to_string()),
                ..Default::default()
            };
            created.push(row.insert(conn).await.map_err(ServiceError::DatabaseError)?);
        }

        Ok(created)
    }

    /// Attaches the single synthetic system approval that waste transfers are
    /// born with. A deliberate bypass of the sequential engine, not a bug.
    pub(crate) async fn create_system_approval<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &weight_transfer::Model,
    ) -> Result<weight_transfer_approval::Model, ServiceError> {
        let row = weight_transfer_approval::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_id: Set(transfer.id),
            approver_id: Set(None),
            approver_kind: Set(Actor::System.kind_str().to_string()),
            role: Set(AUTO_APPROVED_ROLE.to_string()),
            approval_sequence: Set(1),
            is_final_approval: Set(true),
            status: Set(ApprovalStatus::Approved.as_str().to_string()),
            decided_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        row.insert(conn).await.map_err(ServiceError::DatabaseError)
    }

    /// Grants the caller's pending approval on a transfer.
    ///
    /// Failure modes, in check order: `NotFound`, `AlreadyApproved` /
    /// `AlreadyRejected` / `AlreadyCompleted` (transfer no longer pending),
    /// `Unauthorized` (no pending slot for this approver),
    /// `InventoryRequestsPending` (first slot only), `SequenceViolation`
    /// (an earlier slot is not yet approved). None of these mutate state.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        transfer_id: Uuid,
        approver: Uuid,
        notes: Option<String>,
    ) -> Result<ApprovalOutcome, ServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let transfer = WeightTransferEntity::find_by_id(transfer_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        match transfer.status_enum() {
            Some(TransferStatus::Pending) => {}
            Some(TransferStatus::Approved) => return Err(ServiceError::AlreadyApproved),
            Some(TransferStatus::Rejected) => return Err(ServiceError::AlreadyRejected),
            Some(TransferStatus::Completed) => return Err(ServiceError::AlreadyCompleted),
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown transfer status '{}'",
                    transfer.status
                )))
            }
        }

        let approvals = ApprovalEntity::find()
            .filter(weight_transfer_approval::Column::TransferId.eq(transfer_id))
            .order_by_asc(weight_transfer_approval::Column::ApprovalSequence)
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let slot = approvals
            .iter()
            .find(|a| {
                a.approver_id == Some(approver)
                    && a.status_enum() == Some(ApprovalStatus::Pending)
            })
            .cloned()
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!(
                    "User {} has no pending approval on transfer {}",
                    approver, transfer_id
                ))
            })?;

        // The inventory gate applies to the first slot only; later slots are
        // not re-blocked by slow stock counts.
        if slot.approval_sequence == 1 {
            let pending = inventory_requests::pending_count(&txn, transfer_id).await?;
            if pending > 0 {
                return Err(ServiceError::InventoryRequestsPending);
            }
        }

        let out_of_order = approvals.iter().any(|a| {
            a.approval_sequence < slot.approval_sequence
                && a.status_enum() != Some(ApprovalStatus::Approved)
        });
        if out_of_order {
            return Err(ServiceError::SequenceViolation);
        }

        let is_final = slot.is_final_approval;
        let sequence = slot.approval_sequence;

        let mut active: weight_transfer_approval::ActiveModel = slot.into();
        active.status = Set(ApprovalStatus::Approved.as_str().to_string());
        active.notes = Set(notes);
        active.decided_at = Set(Some(Utc::now()));
        let updated_slot = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        audit::record(
            &txn,
            NewAuditEntry::new(AuditAction::ApprovalGranted, Actor::User(approver))
                .transfer(&transfer)
                .notes(format!("Approval sequence {} granted", sequence)),
        )
        .await?;

        if is_final {
            let mut active_transfer: weight_transfer::ActiveModel = transfer.clone().into();
            active_transfer.status = Set(TransferStatus::Approved.as_str().to_string());
            active_transfer
                .update(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        counter!("rollflow.approvals.granted", 1);
        info!(%transfer_id, %approver, sequence, is_final, "Approval granted");
        self.event_sender
            .send_or_log(Event::TransferApprovalGranted {
                transfer_id,
                approver_id: approver,
                approval_sequence: sequence,
                fully_approved: is_final,
            })
            .await;

        Ok(ApprovalOutcome {
            approval: updated_slot,
            fully_approved: is_final,
        })
    }

    /// Rejects a transfer. Any holder of a pending slot may reject; the whole
    /// transfer is rejected immediately and no further approvals are
    /// processed.
    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        transfer_id: Uuid,
        approver: Uuid,
        reason: String,
    ) -> Result<weight_transfer::Model, ServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let transfer = WeightTransferEntity::find_by_id(transfer_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        match transfer.status_enum() {
            Some(TransferStatus::Pending) => {}
            Some(TransferStatus::Approved) => return Err(ServiceError::AlreadyApproved),
            Some(TransferStatus::Rejected) => return Err(ServiceError::AlreadyRejected),
            Some(TransferStatus::Completed) => return Err(ServiceError::AlreadyCompleted),
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown transfer status '{}'",
                    transfer.status
                )))
            }
        }

        let slot = ApprovalEntity::find()
            .filter(weight_transfer_approval::Column::TransferId.eq(transfer_id))
            .filter(weight_transfer_approval::Column::ApproverId.eq(approver))
            .filter(
                weight_transfer_approval::Column::Status.eq(ApprovalStatus::Pending.as_str()),
            )
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!(
                    "User {} has no pending approval on transfer {}",
                    approver, transfer_id
                ))
            })?;

        let mut active_slot: weight_transfer_approval::ActiveModel = slot.into();
        active_slot.status = Set(ApprovalStatus::Rejected.as_str().to_string());
        active_slot.notes = Set(Some(reason.clone()));
        active_slot.decided_at = Set(Some(Utc::now()));
        active_slot
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut active_transfer: weight_transfer::ActiveModel = transfer.clone().into();
        active_transfer.status = Set(TransferStatus::Rejected.as_str().to_string());
        let updated = active_transfer
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        audit::record(
            &txn,
            NewAuditEntry::new(AuditAction::ApprovalRejected, Actor::User(approver))
                .transfer(&transfer)
                .notes(reason.clone()),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        counter!("rollflow.approvals.rejected", 1);
        warn!(%transfer_id, %approver, %reason, "Transfer rejected");
        self.event_sender
            .send_or_log(Event::TransferRejected {
                transfer_id,
                rejected_by: approver,
                reason,
            })
            .await;

        Ok(updated)
    }

    /// Point-in-time view of a transfer's approval chain.
    #[instrument(skip(self))]
    pub async fn approval_status(
        &self,
        transfer_id: Uuid,
    ) -> Result<ApprovalStatusSummary, ServiceError> {
        let db = self.db.as_ref();

        let transfer = WeightTransferEntity::find_by_id(transfer_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        let approvals = ApprovalEntity::find()
            .filter(weight_transfer_approval::Column::TransferId.eq(transfer_id))
            .order_by_asc(weight_transfer_approval::Column::ApprovalSequence)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let pending_inventory_requests = inventory_requests::pending_count(db, transfer_id).await?;

        Ok(ApprovalStatusSummary {
            transfer_id,
            transfer_status: transfer.status,
            pending_inventory_requests,
            slots: approvals
                .into_iter()
                .map(|a| ApprovalSlotStatus {
                    sequence: a.approval_sequence,
                    role: a.role,
                    approver_id: a.approver_id,
                    status: a.status,
                    is_final_approval: a.is_final_approval,
                    decided_at: a.decided_at,
                })
                .collect(),
        })
    }
}
