use crate::{
    db::DbPool,
    entities::transfer_audit_log::{self, AuditAction, Entity as AuditLogEntity},
    errors::ServiceError,
    services::Actor,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// One audit entry waiting to be written. Built with the fluent helpers so
/// call sites read as a sentence.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub actor: Actor,
    pub transfer_id: Option<Uuid>,
    pub transfer_group_id: Option<Uuid>,
    pub production_result_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub quantity_before: Option<Decimal>,
    pub quantity_after: Option<Decimal>,
    pub weight_delta: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, actor: Actor) -> Self {
        Self {
            action,
            actor,
            transfer_id: None,
            transfer_group_id: None,
            production_result_id: None,
            product_id: None,
            warehouse_id: None,
            quantity_before: None,
            quantity_after: None,
            weight_delta: None,
            notes: None,
        }
    }

    pub fn transfer(mut self, transfer: &crate::entities::weight_transfer::Model) -> Self {
        self.transfer_id = Some(transfer.id);
        self.transfer_group_id = Some(transfer.transfer_group_id);
        self.production_result_id = transfer.production_result_id;
        self
    }

    pub fn production_result(mut self, result_id: Uuid) -> Self {
        self.production_result_id = Some(result_id);
        self
    }

    pub fn stock_change(
        mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        before: Decimal,
        after: Decimal,
    ) -> Self {
        self.product_id = Some(product_id);
        self.warehouse_id = Some(warehouse_id);
        self.quantity_before = Some(before);
        self.quantity_after = Some(after);
        self.weight_delta = Some(after - before);
        self
    }

    pub fn weight_delta(mut self, delta: Decimal) -> Self {
        self.weight_delta = Some(delta);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Appends one audit row. Callable with either a live transaction or the
/// pool itself; failure-path entries deliberately use the pool so they
/// survive a rolled-back transaction.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    entry: NewAuditEntry,
) -> Result<transfer_audit_log::Model, ServiceError> {
    let row = transfer_audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        transfer_id: Set(entry.transfer_id),
        transfer_group_id: Set(entry.transfer_group_id),
        production_result_id: Set(entry.production_result_id),
        action: Set(entry.action.as_str().to_string()),
        product_id: Set(entry.product_id),
        warehouse_id: Set(entry.warehouse_id),
        quantity_before: Set(entry.quantity_before),
        quantity_after: Set(entry.quantity_after),
        weight_delta: Set(entry.weight_delta),
        actor_kind: Set(entry.actor.kind_str().to_string()),
        actor_id: Set(entry.actor.id()),
        notes: Set(entry.notes),
        ..Default::default()
    };

    row.insert(conn).await.map_err(ServiceError::DatabaseError)
}

/// Read access to the audit trail.
#[derive(Clone)]
pub struct AuditService {
    db: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn for_transfer(
        &self,
        transfer_id: Uuid,
    ) -> Result<Vec<transfer_audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .filter(transfer_audit_log::Column::TransferId.eq(transfer_id))
            .order_by_asc(transfer_audit_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn for_group(
        &self,
        transfer_group_id: Uuid,
    ) -> Result<Vec<transfer_audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .filter(transfer_audit_log::Column::TransferGroupId.eq(transfer_group_id))
            .order_by_asc(transfer_audit_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn for_production_result(
        &self,
        result_id: Uuid,
    ) -> Result<Vec<transfer_audit_log::Model>, ServiceError> {
        AuditLogEntity::find()
            .filter(transfer_audit_log::Column::ProductionResultId.eq(result_id))
            .order_by_asc(transfer_audit_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
