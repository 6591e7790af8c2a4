mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use rollflow_core::{
    entities::{
        production_result::ProductionStage,
        weight_transfer::{self, TransferStatus},
    },
    errors::ServiceError,
    services::production_results::NewProductionResult,
};

struct Pipeline {
    app: TestApp,
    transfer: weight_transfer::Model,
    source_manager: Uuid,
    transit_manager: Uuid,
    destination_manager: Uuid,
}

/// Records and approves a pure-output cutting result so exactly one
/// productive transfer with the full three-step chain exists.
async fn pipeline() -> Pipeline {
    let app = TestApp::new().await;
    let material = app.seed_product("ROLL-120G").await;
    let (source, source_manager) = app.seed_managed_warehouse("RAW").await;
    let (destination, destination_manager) = app.seed_managed_warehouse("FIN").await;
    let transit_manager = Uuid::new_v4();
    app.directory.set_transit_manager(transit_manager);

    let recorded = app
        .services
        .production_results
        .record_result(NewProductionResult {
            order_id: Uuid::new_v4(),
            material_id: material.id,
            stage: ProductionStage::Cutting,
            warehouse_id: source.id,
            operator_id: Uuid::new_v4(),
            input_weight: dec!(500),
            output_weight: dec!(500),
            waste_weight: dec!(0),
            remaining_weight: dec!(0),
            destination_warehouse_id: Some(destination.id),
            remainder_destination_id: None,
            stage_metadata: None,
        })
        .await
        .expect("record result");

    let (_, transfers) = app
        .services
        .production_results
        .approve_result(recorded.id, Uuid::new_v4(), None)
        .await
        .expect("approve result");
    assert_eq!(transfers.len(), 1);
    let transfer = transfers.into_iter().next().expect("productive transfer");

    Pipeline {
        app,
        transfer,
        source_manager,
        transit_manager,
        destination_manager,
    }
}

#[tokio::test]
async fn first_approval_is_gated_on_inventory_checks() {
    let p = pipeline().await;

    let err = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.source_manager, None)
        .await
        .expect_err("approval before verification must fail");
    assert_matches!(err, ServiceError::InventoryRequestsPending);
    assert_eq!(err.error_code(), "INVENTORY_REQUESTS_PENDING");

    p.app
        .complete_inventory_checks(p.transfer.id, Uuid::new_v4())
        .await;

    let outcome = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.source_manager, None)
        .await
        .expect("approval after verification");
    assert!(!outcome.fully_approved);
}

#[tokio::test]
async fn approvals_must_follow_the_sequence() {
    let p = pipeline().await;
    p.app
        .complete_inventory_checks(p.transfer.id, Uuid::new_v4())
        .await;

    // Transit holds slot 2; slot 1 is still pending.
    let err = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.transit_manager, None)
        .await
        .expect_err("out-of-order approval must fail");
    assert_matches!(err, ServiceError::SequenceViolation);

    // Someone with no slot at all is unauthorized, not sequence-blocked.
    let err = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, Uuid::new_v4(), None)
        .await
        .expect_err("stranger must be refused");
    assert_matches!(err, ServiceError::Unauthorized(_));

    // In order: source, transit, destination. Only the last flips the
    // transfer to approved.
    let first = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.source_manager, None)
        .await
        .expect("source approval");
    assert!(!first.fully_approved);

    let second = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.transit_manager, None)
        .await
        .expect("transit approval");
    assert!(!second.fully_approved);

    let third = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.destination_manager, None)
        .await
        .expect("destination approval");
    assert!(third.fully_approved);

    let status = p
        .app
        .services
        .approvals
        .approval_status(p.transfer.id)
        .await
        .expect("approval status");
    assert_eq!(status.transfer_status, TransferStatus::Approved.as_str());
    assert!(status.slots.iter().all(|s| s.status == "approved"));

    // Nothing left to approve.
    let err = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.destination_manager, None)
        .await
        .expect_err("approving an approved transfer must fail");
    assert_matches!(err, ServiceError::AlreadyApproved);
}

#[tokio::test]
async fn later_slots_are_not_blocked_by_new_inventory_state() {
    let p = pipeline().await;
    p.app
        .complete_inventory_checks(p.transfer.id, Uuid::new_v4())
        .await;

    p.app
        .services
        .approvals
        .approve(p.transfer.id, p.source_manager, None)
        .await
        .expect("source approval");

    // The gate applies to sequence 1 only; transit proceeds regardless.
    let outcome = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.transit_manager, None)
        .await
        .expect("transit approval");
    assert!(!outcome.fully_approved);
}

#[tokio::test]
async fn any_pending_approver_can_reject() {
    let p = pipeline().await;
    p.app
        .complete_inventory_checks(p.transfer.id, Uuid::new_v4())
        .await;

    p.app
        .services
        .approvals
        .approve(p.transfer.id, p.source_manager, None)
        .await
        .expect("source approval");

    // Transit rejects out of turn; rejection is not sequence-bound.
    let rejected = p
        .app
        .services
        .approvals
        .reject(p.transfer.id, p.transit_manager, "seal broken".to_string())
        .await
        .expect("transit rejection");
    assert_eq!(rejected.status_enum(), Some(TransferStatus::Rejected));

    // The chain is dead afterwards.
    let err = p
        .app
        .services
        .approvals
        .approve(p.transfer.id, p.destination_manager, None)
        .await
        .expect_err("rejected transfer cannot be approved");
    assert_matches!(err, ServiceError::AlreadyRejected);

    let err = p
        .app
        .services
        .transfer_completion
        .complete(p.transfer.id, rollflow_core::services::Actor::System)
        .await
        .expect_err("rejected transfer cannot be completed");
    assert_matches!(err, ServiceError::AlreadyRejected);
}

#[tokio::test]
async fn pending_transfer_cannot_be_completed() {
    let p = pipeline().await;

    let err = p
        .app
        .services
        .transfer_completion
        .complete(p.transfer.id, rollflow_core::services::Actor::System)
        .await
        .expect_err("pending transfer cannot be completed");
    assert_matches!(err, ServiceError::InvalidStatus(_));
}
