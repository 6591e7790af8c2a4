use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    SourceCheck,
    DestinationCheck,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::SourceCheck => "source_check",
            RequestType::DestinationCheck => "destination_check",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "source_check" => Some(RequestType::SourceCheck),
            "destination_check" => Some(RequestType::DestinationCheck),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

/// Stock verification request spawned alongside a transfer's approval chain.
///
/// A transfer's first approval cannot be granted while any of its requests is
/// still pending. Completed by a warehouse operator supplying the on-hand
/// figure they observed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub warehouse_id: Uuid,
    /// "source_check" or "destination_check".
    pub request_type: String,
    pub status: String,
    pub observed_quantity: Option<Decimal>,
    pub completed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn status_enum(&self) -> Option<RequestStatus> {
        RequestStatus::from_str(&self.status)
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
