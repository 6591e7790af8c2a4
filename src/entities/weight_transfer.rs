use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of material a transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCategory {
    Productive,
    Waste,
    Remainder,
}

impl TransferCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferCategory::Productive => "productive",
            TransferCategory::Waste => "waste",
            TransferCategory::Remainder => "remainder",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "productive" => Some(TransferCategory::Productive),
            "waste" => Some(TransferCategory::Waste),
            "remainder" => Some(TransferCategory::Remainder),
            _ => None,
        }
    }
}

/// Transfer state machine: `pending -> {approved, rejected}`,
/// `approved -> completed`. Rejected and completed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransferStatus::Pending),
            "approved" => Some(TransferStatus::Approved),
            "rejected" => Some(TransferStatus::Rejected),
            "completed" => Some(TransferStatus::Completed),
            _ => None,
        }
    }
}

/// One categorized movement of weight between warehouses.
///
/// Sibling transfers built from the same production result share a
/// `transfer_group_id`. Waste transfers never require sequential approval and
/// are created already approved; every other category carries at least one
/// approval row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weight_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub material_id: Uuid,
    pub production_result_id: Option<Uuid>,
    pub transfer_group_id: Uuid,
    /// "productive", "waste" or "remainder"; see [`TransferCategory`].
    pub category: String,
    pub weight_transferred: Decimal,
    pub status: String,
    pub requires_sequential_approval: bool,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub notes: Option<String>,
    /// Open-ended context bag, not validated by the core.
    pub metadata: Option<Json>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn category_enum(&self) -> Option<TransferCategory> {
        TransferCategory::from_str(&self.category)
    }

    pub fn status_enum(&self) -> Option<TransferStatus> {
        TransferStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_result::Entity",
        from = "Column::ProductionResultId",
        to = "super::production_result::Column::Id"
    )]
    ProductionResult,
    #[sea_orm(has_many = "super::weight_transfer_approval::Entity")]
    Approval,
    #[sea_orm(has_many = "super::inventory_request::Entity")]
    InventoryRequest,
}

impl Related<super::production_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionResult.def()
    }
}

impl Related<super::weight_transfer_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approval.def()
    }
}

impl Related<super::inventory_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRequest.def()
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
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}
