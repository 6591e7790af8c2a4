mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use rollflow_core::{
    entities::{inventory_request::RequestStatus, transfer_audit_log},
    errors::ServiceError,
    services::Actor,
};

#[tokio::test]
async fn receiving_stock_creates_and_grows_the_record() {
    let app = TestApp::new().await;
    let material = app.seed_product("ROLL-80G").await;
    let warehouse = app.seed_warehouse("RAW").await;

    assert_eq!(app.on_hand(material.id, warehouse.id).await, dec!(0));

    let operator = Uuid::new_v4();
    let record = app
        .services
        .stock_ledger
        .receive_stock(
            material.id,
            warehouse.id,
            dec!(500),
            Actor::User(operator),
            Some("goods receipt 4711".to_string()),
        )
        .await
        .expect("first receipt");
    assert_eq!(record.quantity, dec!(500));
    assert_eq!(record.reserved_quantity, dec!(0));

    let record = app
        .services
        .stock_ledger
        .receive_stock(material.id, warehouse.id, dec!(250), Actor::User(operator), None)
        .await
        .expect("second receipt");
    assert_eq!(record.quantity, dec!(750));

    // Each receipt leaves one audit entry with before/after quantities.
    let receipts = transfer_audit_log::Entity::find()
        .filter(transfer_audit_log::Column::Action.eq("stock_received"))
        .filter(transfer_audit_log::Column::WarehouseId.eq(warehouse.id))
        .all(app.db.as_ref())
        .await
        .expect("query audit trail");
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].quantity_before, Some(dec!(0)));
    assert_eq!(receipts[0].quantity_after, Some(dec!(500)));
    assert_eq!(receipts[1].quantity_before, Some(dec!(500)));
    assert_eq!(receipts[1].quantity_after, Some(dec!(750)));
    assert_eq!(receipts[0].actor_id, Some(operator));
    assert_eq!(receipts[0].actor_kind, "user");
}

#[tokio::test]
async fn non_positive_receipts_are_refused() {
    let app = TestApp::new().await;
    let material = app.seed_product("ROLL-80G").await;
    let warehouse = app.seed_warehouse("RAW").await;

    let err = app
        .services
        .stock_ledger
        .receive_stock(material.id, warehouse.id, dec!(0), Actor::System, None)
        .await
        .expect_err("zero receipt must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .stock_ledger
        .receive_stock(material.id, warehouse.id, dec!(-5), Actor::System, None)
        .await
        .expect_err("negative receipt must fail");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn completing_an_inventory_request_is_idempotent() {
    let app = TestApp::new().await;
    let material = app.seed_product("ROLL-80G").await;
    let (source, _) = app.seed_managed_warehouse("RAW").await;
    let (destination, _) = app.seed_managed_warehouse("FIN").await;
    app.directory.set_transit_manager(Uuid::new_v4());
    app.seed_stock(material.id, source.id, dec!(100)).await;

    let transfer = app
        .services
        .transfer_groups
        .request_transfer(rollflow_core::services::transfer_groups::NewTransferRequest {
            order_id: Uuid::new_v4(),
            material_id: material.id,
            category: rollflow_core::entities::weight_transfer::TransferCategory::Productive,
            weight: dec!(40),
            source_warehouse_id: source.id,
            destination_warehouse_id: Some(destination.id),
            notes: None,
            metadata: None,
        })
        .await
        .expect("request transfer");

    let requests = app
        .services
        .inventory_requests
        .for_transfer(transfer.id)
        .await
        .expect("list requests");
    assert_eq!(requests.len(), 2);

    let operator = Uuid::new_v4();
    let completed = app
        .services
        .inventory_requests
        .complete_request(requests[0].id, Some(dec!(100)), operator)
        .await
        .expect("complete request");
    assert_eq!(completed.status_enum(), Some(RequestStatus::Completed));
    assert_eq!(completed.observed_quantity, Some(dec!(100)));
    assert_eq!(completed.completed_by, Some(operator));

    // A second completion is a no-op success and keeps the first figures.
    let again = app
        .services
        .inventory_requests
        .complete_request(requests[0].id, Some(dec!(999)), Uuid::new_v4())
        .await
        .expect("repeat completion");
    assert_eq!(again.observed_quantity, Some(dec!(100)));
    assert_eq!(again.completed_by, Some(operator));
}
