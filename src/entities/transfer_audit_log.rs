use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Auditable events. Stored as strings; one row is written per mutating event
/// and rows are never updated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    StockDecremented,
    StockIncremented,
    StockReceived,
    WasteRecorded,
    RemainderRecorded,
    ApprovalGranted,
    ApprovalRejected,
    ResultApproved,
    ResultRejected,
    InventoryRequestCompleted,
    TransferCompleted,
    TransferCompletionFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::StockDecremented => "stock_decremented",
            AuditAction::StockIncremented => "stock_incremented",
            AuditAction::StockReceived => "stock_received",
            AuditAction::WasteRecorded => "waste_recorded",
            AuditAction::RemainderRecorded => "remainder_recorded",
            AuditAction::ApprovalGranted => "approval_granted",
            AuditAction::ApprovalRejected => "approval_rejected",
            AuditAction::ResultApproved => "result_approved",
            AuditAction::ResultRejected => "result_rejected",
            AuditAction::InventoryRequestCompleted => "inventory_request_completed",
            AuditAction::TransferCompleted => "transfer_completed",
            AuditAction::TransferCompletionFailed => "transfer_completion_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stock_decremented" => Some(AuditAction::StockDecremented),
            "stock_incremented" => Some(AuditAction::StockIncremented),
            "stock_received" => Some(AuditAction::StockReceived),
            "waste_recorded" => Some(AuditAction::WasteRecorded),
            "remainder_recorded" => Some(AuditAction::RemainderRecorded),
            "approval_granted" => Some(AuditAction::ApprovalGranted),
            "approval_rejected" => Some(AuditAction::ApprovalRejected),
            "result_approved" => Some(AuditAction::ResultApproved),
            "result_rejected" => Some(AuditAction::ResultRejected),
            "inventory_request_completed" => Some(AuditAction::InventoryRequestCompleted),
            "transfer_completed" => Some(AuditAction::TransferCompleted),
            "transfer_completion_failed" => Some(AuditAction::TransferCompletionFailed),
            _ => None,
        }
    }
}

/// Append-only audit trail entry for one stock delta or state transition.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_id: Option<Uuid>,
    pub transfer_group_id: Option<Uuid>,
    pub production_result_id: Option<Uuid>,
    pub action: String,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub quantity_before: Option<Decimal>,
    pub quantity_after: Option<Decimal>,
    /// Signed stock delta in kilograms, when the event moved weight.
    pub weight_delta: Option<Decimal>,
    /// "user" or "system".
    pub actor_kind: String,
    pub actor_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
