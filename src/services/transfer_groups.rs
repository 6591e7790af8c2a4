use crate::{
    db::DbPool,
    entities::{
        production_result::{self, ResultStatus},
        weight_transfer::{self, Entity as WeightTransferEntity, TransferCategory, TransferStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{approvals::ApprovalService, inventory_requests::InventoryRequestService},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Manually requested transfer, entered outside the production pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransferRequest {
    pub order_id: Uuid,
    pub material_id: Uuid,
    pub category: TransferCategory,
    pub weight: Decimal,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Shape checks applied before a manual transfer touches the database.
pub fn validate_transfer_data(request: &NewTransferRequest) -> Result<(), ServiceError> {
    if request.weight <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Transfer weight must be positive, got: {}",
            request.weight
        )));
    }

    if request.destination_warehouse_id == Some(request.source_warehouse_id) {
        return Err(ServiceError::ValidationError(
            "Source and destination warehouse must differ".to_string(),
        ));
    }

    if request.category == TransferCategory::Productive
        && request.destination_warehouse_id.is_none()
    {
        return Err(ServiceError::ValidationError(
            "Productive transfers require a destination warehouse".to_string(),
        ));
    }

    Ok(())
}

/// Builds categorized transfer groups from approved production results and
/// handles manually requested transfers.
#[derive(Clone)]
pub struct TransferGroupService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    approvals: Arc<ApprovalService>,
    inventory: Arc<InventoryRequestService>,
}

impl TransferGroupService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        approvals: Arc<ApprovalService>,
        inventory: Arc<InventoryRequestService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            approvals,
            inventory,
        }
    }

    /// Partitions an approved result's output into one transfer per non-zero
    /// component, all sharing a fresh group id. Idempotent: once
    /// `transfers_created` is set on the result, the existing rows are
    /// returned untouched.
    ///
    /// Runs inside the caller's transaction so a `MissingApprover` failure
    /// rolls back the whole approval.
    pub(crate) async fn build_for_result<C: ConnectionTrait>(
        &self,
        conn: &C,
        result: &production_result::Model,
    ) -> Result<Vec<weight_transfer::Model>, ServiceError> {
        if result.transfers_created {
            return WeightTransferEntity::find()
                .filter(weight_transfer::Column::ProductionResultId.eq(result.id))
                .order_by_asc(weight_transfer::Column::CreatedAt)
                .all(conn)
                .await
                .map_err(ServiceError::DatabaseError);
        }

        if result.status_enum() != Some(ResultStatus::Approved) {
            return Err(ServiceError::InvalidStatus(format!(
                "Transfers can only be built from an approved result, got '{}'",
                result.status
            )));
        }

        let group_id = Uuid::new_v4();
        let mut transfers = Vec::new();

        if result.output_weight > Decimal::ZERO {
            let destination = result.destination_warehouse_id.ok_or_else(|| {
                ServiceError::ValidationError(
                    "Productive output requires a destination warehouse".to_string(),
                )
            })?;

            let transfer = self
                .insert_transfer(
                    conn,
                    result,
                    group_id,
                    TransferCategory::Productive,
                    result.output_weight,
                    Some(destination),
                    TransferStatus::Pending,
                    true,
                )
                .await?;

            self.approvals
                .create_chain(conn, &transfer, &self.approvals.chain().full_chain.clone())
                .await?;
            self.inventory.create_for_transfer(conn, &transfer).await?;
            transfers.push(transfer);
        }

        if result.waste_weight > Decimal::ZERO {
            // Waste is exempt from the approval chain but still weight-tracked:
            // it is born approved with a single synthetic system approval.
            let transfer = self
                .insert_transfer(
                    conn,
                    result,
                    group_id,
                    TransferCategory::Waste,
                    result.waste_weight,
                    None,
                    TransferStatus::Approved,
                    false,
                )
                .await?;

            self.approvals.create_system_approval(conn, &transfer).await?;
            transfers.push(transfer);
        }

        if result.remaining_weight > Decimal::ZERO {
            // Destination-id-driven routing: forwarded remainders run the full
            // chain; remainders returning to the stage warehouse need only the
            // source manager's sign-off.
            let (destination, roles) = match result.remainder_destination_id {
                Some(dest) => (dest, self.approvals.chain().full_chain.clone()),
                None => (
                    result.warehouse_id,
                    self.approvals.chain().remainder_return_chain.clone(),
                ),
            };

            let transfer = self
                .insert_transfer(
                    conn,
                    result,
                    group_id,
                    TransferCategory::Remainder,
                    result.remaining_weight,
                    Some(destination),
                    TransferStatus::Pending,
                    true,
                )
                .await?;

            self.approvals.create_chain(conn, &transfer, &roles).await?;
            self.inventory.create_for_transfer(conn, &transfer).await?;
            transfers.push(transfer);
        }

        let mut active_result: production_result::ActiveModel = result.clone().into();
        active_result.transfers_created = Set(true);
        active_result
            .update(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(transfers)
    }

    /// Creates a single manually requested transfer with its own group id,
    /// approval chain, and inventory requests. Waste requests are
    /// auto-approved exactly like waste built from a production result, and a
    /// remainder with no destination returns to its source warehouse under
    /// the short chain, exactly like a remainder built from a result.
    #[instrument(skip(self, request))]
    pub async fn request_transfer(
        &self,
        request: NewTransferRequest,
    ) -> Result<weight_transfer::Model, ServiceError> {
        validate_transfer_data(&request)?;

        let group_id = Uuid::new_v4();
        let is_waste = request.category == TransferCategory::Waste;
        let is_remainder_return = request.category == TransferCategory::Remainder
            && request.destination_warehouse_id.is_none();
        let destination = if is_remainder_return {
            Some(request.source_warehouse_id)
        } else {
            request.destination_warehouse_id
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let row = weight_transfer::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(request.order_id),
            material_id: Set(request.material_id),
            production_result_id: Set(None),
            transfer_group_id: Set(group_id),
            category: Set(request.category.as_str().to_string()),
            weight_transferred: Set(request.weight),
            status: Set(if is_waste {
                TransferStatus::Approved.as_str().to_string()
            } else {
                TransferStatus::Pending.as_str().to_string()
            }),
            requires_sequential_approval: Set(!is_waste),
            source_warehouse_id: Set(request.source_warehouse_id),
            destination_warehouse_id: Set(destination),
            notes: Set(request.notes),
            metadata: Set(request.metadata),
            ..Default::default()
        };
        let transfer = row.insert(&txn).await.map_err(ServiceError::DatabaseError)?;

        if is_waste {
            self.approvals.create_system_approval(&txn, &transfer).await?;
        } else {
            let roles = if is_remainder_return {
                self.approvals.chain().remainder_return_chain.clone()
            } else {
                self.approvals.chain().full_chain.clone()
            };
            self.approvals.create_chain(&txn, &transfer, &roles).await?;
            self.inventory.create_for_transfer(&txn, &transfer).await?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(transfer_id = %transfer.id, %group_id, "Transfer requested");
        self.event_sender
            .send_or_log(Event::TransferGroupCreated {
                transfer_group_id: group_id,
                production_result_id: None,
                transfer_count: 1,
            })
            .await;

        Ok(transfer)
    }

    pub async fn transfers_in_group(
        &self,
        transfer_group_id: Uuid,
    ) -> Result<Vec<weight_transfer::Model>, ServiceError> {
        WeightTransferEntity::find()
            .filter(weight_transfer::Column::TransferGroupId.eq(transfer_group_id))
            .order_by_asc(weight_transfer::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_transfer<C: ConnectionTrait>(
        &self,
        conn: &C,
        result: &production_result::Model,
        group_id: Uuid,
        category: TransferCategory,
        weight: Decimal,
        destination: Option<Uuid>,
        status: TransferStatus,
        requires_sequential_approval: bool,
    ) -> Result<weight_transfer::Model, ServiceError> {
        let row = weight_transfer::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(result.order_id),
            material_id: Set(result.material_id),
            production_result_id: Set(Some(result.id)),
            transfer_group_id: Set(group_id),
            category: Set(category.as_str().to_string()),
            weight_transferred: Set(weight),
            status: Set(status.as_str().to_string()),
            requires_sequential_approval: Set(requires_sequential_approval),
            source_warehouse_id: Set(result.warehouse_id),
            destination_warehouse_id: Set(destination),
            ..Default::default()
        };
        row.insert(conn).await.map_err(ServiceError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(category: TransferCategory, weight: Decimal) -> NewTransferRequest {
        NewTransferRequest {
            order_id: Uuid::new_v4(),
            material_id: Uuid::new_v4(),
            category,
            weight,
            source_warehouse_id: Uuid::new_v4(),
            destination_warehouse_id: Some(Uuid::new_v4()),
            notes: None,
            metadata: None,
        }
    }

    #[test]
    fn rejects_non_positive_weight() {
        let req = request(TransferCategory::Productive, dec!(0));
        assert!(matches!(
            validate_transfer_data(&req),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_same_source_and_destination() {
        let mut req = request(TransferCategory::Productive, dec!(10));
        req.destination_warehouse_id = Some(req.source_warehouse_id);
        assert!(matches!(
            validate_transfer_data(&req),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn productive_requires_destination() {
        let mut req = request(TransferCategory::Productive, dec!(10));
        req.destination_warehouse_id = None;
        assert!(matches!(
            validate_transfer_data(&req),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn waste_without_destination_is_valid() {
        let mut req = request(TransferCategory::Waste, dec!(5));
        req.destination_warehouse_id = None;
        assert!(validate_transfer_data(&req).is_ok());
    }
}
