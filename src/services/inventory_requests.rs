use crate::{
    db::DbPool,
    entities::{
        inventory_request::{self, Entity as InventoryRequestEntity, RequestStatus, RequestType},
        transfer_audit_log::AuditAction,
        weight_transfer,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{audit, audit::NewAuditEntry, Actor},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Number of still-pending verification requests on a transfer. The approval
/// engine consults this before granting the first approval.
pub(crate) async fn pending_count<C: ConnectionTrait>(
    conn: &C,
    transfer_id: Uuid,
) -> Result<u64, ServiceError> {
    InventoryRequestEntity::find()
        .filter(inventory_request::Column::TransferId.eq(transfer_id))
        .filter(inventory_request::Column::Status.eq(RequestStatus::Pending.as_str()))
        .count(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Inventory verification gate: spawns stock-check requests alongside a
/// transfer's approval chain and records the figures operators report back.
#[derive(Clone)]
pub struct InventoryRequestService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryRequestService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates the source check and, when the transfer has a destination, the
    /// destination check. Waste transfers never get here; the group builder
    /// skips them.
    pub(crate) async fn create_for_transfer<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &weight_transfer::Model,
    ) -> Result<Vec<inventory_request::Model>, ServiceError> {
        let mut created = Vec::new();

        let source = inventory_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_id: Set(transfer.id),
            warehouse_id: Set(transfer.source_warehouse_id),
            request_type: Set(RequestType::SourceCheck.as_str().to_string()),
            status: Set(RequestStatus::Pending.as_str().to_string()),
            ..Default::default()
        };
        created.push(
            source
                .insert(conn)
                .await
                .map_err(ServiceError::DatabaseError)?,
        );

        if let Some(destination_id) = transfer.destination_warehouse_id {
            let destination = inventory_request::ActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(transfer.id),
                warehouse_id: Set(destination_id),
                request_type: Set(RequestType::DestinationCheck.as_str().to_string()),
                status: Set(RequestStatus::Pending.as_str().to_string()),
                ..Default::default()
            };
            created.push(
                destination
                    .insert(conn)
                    .await
                    .map_err(ServiceError::DatabaseError)?,
            );
        }

        Ok(created)
    }

    /// Marks a request completed with the on-hand figure the operator
    /// observed. Completing an already-completed request is a no-op success.
    #[instrument(skip(self))]
    pub async fn complete_request(
        &self,
        request_id: Uuid,
        observed_quantity: Option<Decimal>,
        operator: Uuid,
    ) -> Result<inventory_request::Model, ServiceError> {
        let db = self.db.as_ref();

        let request = InventoryRequestEntity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory request {} not found", request_id))
            })?;

        match request.status_enum() {
            Some(RequestStatus::Completed) => return Ok(request),
            Some(RequestStatus::Cancelled) => {
                return Err(ServiceError::InvalidStatus(
                    "Inventory request has been cancelled".to_string(),
                ))
            }
            Some(RequestStatus::Pending) => {}
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Unknown inventory request status '{}'",
                    request.status
                )))
            }
        }

        let transfer_id = request.transfer_id;
        let warehouse_id = request.warehouse_id;

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let mut active: inventory_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Completed.as_str().to_string());
        active.observed_quantity = Set(observed_quantity);
        active.completed_by = Set(Some(operator));
        active.completed_at = Set(Some(Utc::now()));
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut entry =
            NewAuditEntry::new(AuditAction::InventoryRequestCompleted, Actor::User(operator));
        entry.transfer_id = Some(transfer_id);
        entry.warehouse_id = Some(warehouse_id);
        entry.quantity_after = observed_quantity;
        audit::record(&txn, entry).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(%request_id, %transfer_id, "Inventory request completed");
        self.event_sender
            .send_or_log(Event::InventoryRequestCompleted {
                request_id,
                transfer_id,
                observed_quantity,
            })
            .await;

        Ok(updated)
    }

    pub async fn for_transfer(
        &self,
        transfer_id: Uuid,
    ) -> Result<Vec<inventory_request::Model>, ServiceError> {
        InventoryRequestEntity::find()
            .filter(inventory_request::Column::TransferId.eq(transfer_id))
            .order_by_asc(inventory_request::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
