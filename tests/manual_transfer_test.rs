mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use rollflow_core::{
    entities::weight_transfer::{TransferCategory, TransferStatus},
    errors::ServiceError,
    services::{transfer_groups::NewTransferRequest, Actor},
};

fn request(
    material_id: Uuid,
    category: TransferCategory,
    weight: rust_decimal::Decimal,
    source_id: Uuid,
    destination_id: Option<Uuid>,
) -> NewTransferRequest {
    NewTransferRequest {
        order_id: Uuid::new_v4(),
        material_id,
        category,
        weight,
        source_warehouse_id: source_id,
        destination_warehouse_id: destination_id,
        notes: None,
        metadata: None,
    }
}

#[tokio::test]
async fn manual_productive_transfer_runs_the_full_pipeline() {
    let app = TestApp::new().await;
    let material = app.seed_product("CORE-76MM").await;
    let (source, source_manager) = app.seed_managed_warehouse("RAW").await;
    let (destination, destination_manager) = app.seed_managed_warehouse("FIN").await;
    let transit_manager = Uuid::new_v4();
    app.directory.set_transit_manager(transit_manager);

    app.seed_stock(material.id, source.id, dec!(100)).await;

    let transfer = app
        .services
        .transfer_groups
        .request_transfer(request(
            material.id,
            TransferCategory::Productive,
            dec!(40),
            source.id,
            Some(destination.id),
        ))
        .await
        .expect("request transfer");

    assert_eq!(transfer.status_enum(), Some(TransferStatus::Pending));
    assert_eq!(transfer.production_result_id, None);
    assert!(transfer.requires_sequential_approval);

    let status = app
        .services
        .approvals
        .approval_status(transfer.id)
        .await
        .expect("approval status");
    assert_eq!(status.slots.len(), 3);
    assert_eq!(status.pending_inventory_requests, 2);

    app.complete_inventory_checks(transfer.id, Uuid::new_v4())
        .await;
    for approver in [source_manager, transit_manager, destination_manager] {
        app.services
            .approvals
            .approve(transfer.id, approver, None)
            .await
            .expect("approval");
    }

    let done = app
        .services
        .transfer_completion
        .complete(transfer.id, Actor::User(destination_manager))
        .await
        .expect("complete transfer");
    assert!(done);

    // Manual transfers move exactly what they carry.
    assert_eq!(app.on_hand(material.id, source.id).await, dec!(60));
    assert_eq!(app.on_hand(material.id, destination.id).await, dec!(40));
}

#[tokio::test]
async fn manual_waste_transfer_is_auto_approved() {
    let app = TestApp::new().await;
    let material = app.seed_product("CORE-76MM").await;
    let source = app.seed_warehouse("RAW").await;
    app.seed_stock(material.id, source.id, dec!(100)).await;

    let transfer = app
        .services
        .transfer_groups
        .request_transfer(request(
            material.id,
            TransferCategory::Waste,
            dec!(15),
            source.id,
            None,
        ))
        .await
        .expect("request waste transfer");

    assert_eq!(transfer.status_enum(), Some(TransferStatus::Approved));
    assert!(!transfer.requires_sequential_approval);

    let status = app
        .services
        .approvals
        .approval_status(transfer.id)
        .await
        .expect("approval status");
    assert_eq!(status.slots.len(), 1);
    assert_eq!(status.slots[0].role, "auto_approved");
    assert_eq!(status.slots[0].approver_id, None);
    assert_eq!(status.pending_inventory_requests, 0);

    let done = app
        .services
        .transfer_completion
        .complete(transfer.id, Actor::System)
        .await
        .expect("complete waste transfer");
    assert!(done);

    // Manual waste has no production result behind it; it is tracked without
    // any stock movement.
    assert_eq!(app.on_hand(material.id, source.id).await, dec!(100));

    let trail = app
        .services
        .audit
        .for_transfer(transfer.id)
        .await
        .expect("audit trail");
    assert!(trail.iter().any(|e| e.action == "waste_recorded"));
    assert!(!trail.iter().any(|e| e.action == "stock_decremented"));
}

#[tokio::test]
async fn manual_remainder_without_destination_returns_to_source() {
    let app = TestApp::new().await;
    let material = app.seed_product("CORE-76MM").await;
    let (source, source_manager) = app.seed_managed_warehouse("RAW").await;
    app.seed_stock(material.id, source.id, dec!(100)).await;

    let transfer = app
        .services
        .transfer_groups
        .request_transfer(request(
            material.id,
            TransferCategory::Remainder,
            dec!(20),
            source.id,
            None,
        ))
        .await
        .expect("request remainder transfer");

    // Routed back to its own warehouse under the short chain.
    assert_eq!(transfer.destination_warehouse_id, Some(source.id));
    assert_eq!(transfer.status_enum(), Some(TransferStatus::Pending));
    assert!(transfer.requires_sequential_approval);

    let status = app
        .services
        .approvals
        .approval_status(transfer.id)
        .await
        .expect("approval status");
    assert_eq!(status.slots.len(), 1);
    assert_eq!(status.slots[0].role, "source_warehouse_manager");

    app.complete_inventory_checks(transfer.id, Uuid::new_v4())
        .await;
    let outcome = app
        .services
        .approvals
        .approve(transfer.id, source_manager, None)
        .await
        .expect("source manager approval");
    assert!(outcome.fully_approved);

    let done = app
        .services
        .transfer_completion
        .complete(transfer.id, Actor::User(source_manager))
        .await
        .expect("complete remainder transfer");
    assert!(done);

    // The weight leaves and re-enters the same warehouse.
    assert_eq!(app.on_hand(material.id, source.id).await, dec!(100));

    let trail = app
        .services
        .audit
        .for_transfer(transfer.id)
        .await
        .expect("audit trail");
    assert!(trail.iter().any(|e| e.action == "remainder_recorded"));
    assert!(trail.iter().any(|e| e.action == "stock_decremented"));
    assert!(trail.iter().any(|e| e.action == "stock_incremented"));
}

#[tokio::test]
async fn invalid_manual_requests_are_refused() {
    let app = TestApp::new().await;
    let material = app.seed_product("CORE-76MM").await;
    let source = app.seed_warehouse("RAW").await;

    let err = app
        .services
        .transfer_groups
        .request_transfer(request(
            material.id,
            TransferCategory::Productive,
            dec!(10),
            source.id,
            None,
        ))
        .await
        .expect_err("productive without destination must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .transfer_groups
        .request_transfer(request(
            material.id,
            TransferCategory::Productive,
            dec!(10),
            source.id,
            Some(source.id),
        ))
        .await
        .expect_err("same source and destination must fail");
    assert_matches!(err, ServiceError::ValidationError(_));
}
