use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

/// One slot in a transfer's ordered approval chain.
///
/// Slot `k` may only move to `approved` once every slot with a lower sequence
/// is approved. `is_final_approval` is true only on the highest sequence.
/// System auto-approvals (waste) carry `approver_kind = "system"` and no
/// approver id. Rows outlive their transfer; they are never cascade-deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weight_transfer_approvals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub approver_id: Option<Uuid>,
    /// "user" or "system".
    pub approver_kind: String,
    /// Role the slot was created for, e.g. "source_warehouse_manager".
    pub role: String,
    pub approval_sequence: i32,
    pub is_final_approval: bool,
    pub status: String,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn status_enum(&self) -> Option<ApprovalStatus> {
        ApprovalStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::weight_transfer::Entity",
        from = "Column::TransferId",
        to = "super::weight_transfer::Column::Id"
    )]
    WeightTransfer,
}

impl Related<super::weight_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WeightTransfer.def()
    }
}

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
