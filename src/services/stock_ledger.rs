use crate::{
    db::DbPool,
    entities::{
        stock_record::{self, Entity as StockRecordEntity},
        transfer_audit_log::AuditAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{audit, audit::NewAuditEntry, Actor},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Finds the stock record for a (product, warehouse) pair.
pub(crate) async fn find_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Option<stock_record::Model>, ServiceError> {
    StockRecordEntity::find()
        .filter(stock_record::Column::ProductId.eq(product_id))
        .filter(stock_record::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Decrements on-hand stock, returning (before, after) quantities.
///
/// Fails with `InsufficientStock` when the record is missing or short; the
/// caller decides whether that aborts the surrounding transaction. If the
/// decrement would leave less than the reserved quantity, the reservation is
/// clamped down so `quantity >= reserved_quantity` keeps holding.
pub(crate) async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
    amount: Decimal,
) -> Result<(Decimal, Decimal), ServiceError> {
    let record = find_stock(conn, product_id, warehouse_id)
        .await?
        .ok_or_else(|| {
            ServiceError::InsufficientStock(format!(
                "No stock record for product {} at warehouse {}",
                product_id, warehouse_id
            ))
        })?;

    if record.quantity < amount {
        return Err(ServiceError::InsufficientStock(format!(
            "Available: {}, required: {}",
            record.quantity, amount
        )));
    }

    let before = record.quantity;
    let after = before - amount;
    let reserved = record.reserved_quantity.min(after);

    let mut active: stock_record::ActiveModel = record.into();
    active.quantity = Set(after);
    active.reserved_quantity = Set(reserved);
    active.updated_at = Set(Utc::now());
    active
        .update(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok((before, after))
}

/// Increments on-hand stock, lazily creating the record on first inbound
/// movement into a warehouse. Returns (before, after) quantities.
pub(crate) async fn increment_or_create_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
    amount: Decimal,
) -> Result<(Decimal, Decimal), ServiceError> {
    match find_stock(conn, product_id, warehouse_id).await? {
        Some(record) => {
            let before = record.quantity;
            let after = before + amount;

            let mut active: stock_record::ActiveModel = record.into();
            active.quantity = Set(after);
            active.updated_at = Set(Utc::now());
            active
                .update(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            Ok((before, after))
        }
        None => {
            let row = stock_record::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                warehouse_id: Set(warehouse_id),
                quantity: Set(amount),
                reserved_quantity: Set(Decimal::ZERO),
                ..Default::default()
            };
            row.insert(conn).await.map_err(ServiceError::DatabaseError)?;

            Ok((Decimal::ZERO, amount))
        }
    }
}

/// Read access plus the receiving path for warehouse stock.
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<stock_record::Model>, ServiceError> {
        find_stock(self.db.as_ref(), product_id, warehouse_id).await
    }

    /// On-hand quantity, zero when no record exists yet.
    pub async fn on_hand(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        Ok(self
            .get_stock(product_id, warehouse_id)
            .await?
            .map(|r| r.quantity)
            .unwrap_or(Decimal::ZERO))
    }

    /// Receives stock into a warehouse outside the transfer pipeline
    /// (initial load, goods receipt). Writes one audit entry.
    #[instrument(skip(self))]
    pub async fn receive_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<stock_record::Model, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Received quantity must be positive, got: {}",
                quantity
            )));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let (before, after) =
            increment_or_create_stock(&txn, product_id, warehouse_id, quantity).await?;

        let mut entry = NewAuditEntry::new(AuditAction::StockReceived, actor)
            .stock_change(product_id, warehouse_id, before, after);
        if let Some(n) = notes {
            entry = entry.notes(n);
        }
        audit::record(&txn, entry).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(%product_id, %warehouse_id, %quantity, "Stock received");
        self.event_sender
            .send_or_log(Event::StockReceived {
                product_id,
                warehouse_id,
                quantity,
                timestamp: Utc::now(),
            })
            .await;

        find_stock(self.db.as_ref(), product_id, warehouse_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Stock record vanished after receive".to_string())
            })
    }
}
