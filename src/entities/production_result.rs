use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Production stage that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionStage {
    Cutting,
    Sorting,
}

impl ProductionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStage::Cutting => "cutting",
            ProductionStage::Sorting => "sorting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cutting" => Some(ProductionStage::Cutting),
            "sorting" => Some(ProductionStage::Sorting),
            _ => None,
        }
    }
}

/// Lifecycle of a recorded production result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pending,
    Completed,
    Approved,
    Rejected,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::Completed => "completed",
            ResultStatus::Approved => "approved",
            ResultStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ResultStatus::Pending),
            "completed" => Some(ResultStatus::Completed),
            "approved" => Some(ResultStatus::Approved),
            "rejected" => Some(ResultStatus::Rejected),
            _ => None,
        }
    }
}

/// Raw output of one cutting or sorting run on a roll.
///
/// `input_weight` must balance against `output_weight + waste_weight +
/// remaining_weight` within the configured tolerance before the row may be
/// approved. Rows are never deleted; rejection is terminal.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub material_id: Uuid,
    /// "cutting" or "sorting"; see [`ProductionStage`].
    pub stage: String,
    /// Warehouse where the stage ran; the source of the resulting transfers.
    pub warehouse_id: Uuid,
    pub operator_id: Uuid,
    pub input_weight: Decimal,
    /// Productive (cut or sorted) output weight.
    pub output_weight: Decimal,
    pub waste_weight: Decimal,
    pub remaining_weight: Decimal,
    /// Where productive output is headed once the result is approved.
    pub destination_warehouse_id: Option<Uuid>,
    /// Forward routing for the remainder; unset means back to source.
    pub remainder_destination_id: Option<Uuid>,
    pub status: String,
    /// Set once the transfer group has been built; makes building idempotent.
    pub transfers_created: bool,
    pub approved_by: Option<Uuid>,
    pub approval_notes: Option<String>,
    pub rejection_reason: Option<String>,
    /// Stage-specific context, not validated by the core.
    pub stage_metadata: Option<Json>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn stage_enum(&self) -> Option<ProductionStage> {
        ProductionStage::from_str(&self.stage)
    }

    pub fn status_enum(&self) -> Option<ResultStatus> {
        ResultStatus::from_str(&self.status)
    }

    /// Signed difference between input weight and the sum of output components.
    pub fn weight_difference(&self) -> Decimal {
        self.input_weight - (self.output_weight + self.waste_weight + self.remaining_weight)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::weight_transfer::Entity")]
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
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}
