//! rollflow-core
//!
//! Weight-transfer backbone for a roll-converting plant: operators record
//! cutting and sorting output, the recorded weights are validated against the
//! consumed input, and every kilogram then moves between warehouses through
//! categorized transfers guarded by a sequential approval chain and an
//! inventory verification gate. Warehouse stock is mutated in exactly one
//! place, transfer completion, and every mutation leaves an audit trail.
//!
//! Service construction follows a fixed order because the production pipeline
//! services layer on each other:
//!
//! ```no_run
//! use rollflow_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn build(db: Arc<rollflow_core::db::DbPool>, resolver: Arc<dyn ApproverResolver>) {
//! let (event_sender, receiver) = rollflow_core::events::channel(1024);
//! let services = Services::build(db, event_sender, resolver, Default::default());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        approvals::{ApprovalChainConfig, ApprovalService, ApproverResolver},
        audit::AuditService,
        inventory_requests::InventoryRequestService,
        production_results::ProductionResultService,
        stock_ledger::StockLedgerService,
        transfer_completion::TransferCompletionService,
        transfer_groups::TransferGroupService,
    },
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Everything a caller needs to drive the transfer pipeline, wired in
/// dependency order over one shared pool and event channel.
#[derive(Clone)]
pub struct Services {
    pub stock_ledger: Arc<StockLedgerService>,
    pub audit: Arc<AuditService>,
    pub inventory_requests: Arc<InventoryRequestService>,
    pub approvals: Arc<ApprovalService>,
    pub transfer_groups: Arc<TransferGroupService>,
    pub production_results: Arc<ProductionResultService>,
    pub transfer_completion: Arc<TransferCompletionService>,
}

impl Services {
    pub fn build(
        db: Arc<DbPool>,
        event_sender: EventSender,
        resolver: Arc<dyn ApproverResolver>,
        chain: ApprovalChainConfig,
    ) -> Self {
        Self::build_with_tolerance(db, event_sender, resolver, chain, Decimal::new(1, 2))
    }

    /// As `build`, with an explicit mass-balance tolerance in kilograms.
    pub fn build_with_tolerance(
        db: Arc<DbPool>,
        event_sender: EventSender,
        resolver: Arc<dyn ApproverResolver>,
        chain: ApprovalChainConfig,
        tolerance: Decimal,
    ) -> Self {
        let stock_ledger = Arc::new(StockLedgerService::new(db.clone(), event_sender.clone()));
        let audit = Arc::new(AuditService::new(db.clone()));
        let inventory_requests = Arc::new(InventoryRequestService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let approvals = Arc::new(ApprovalService::new(
            db.clone(),
            event_sender.clone(),
            resolver,
            chain,
        ));
        let transfer_groups = Arc::new(TransferGroupService::new(
            db.clone(),
            event_sender.clone(),
            approvals.clone(),
            inventory_requests.clone(),
        ));
        let production_results = Arc::new(ProductionResultService::new(
            db.clone(),
            event_sender.clone(),
            transfer_groups.clone(),
            tolerance,
        ));
        let transfer_completion =
            Arc::new(TransferCompletionService::new(db, event_sender));

        Self {
            stock_ledger,
            audit,
            inventory_requests,
            approvals,
            transfer_groups,
            production_results,
            transfer_completion,
        }
    }
}

pub mod prelude {
    pub use crate::{
        errors::{OperationResult, ServiceError},
        events::{Event, EventSender},
        services::{
            approvals::{
                ApprovalChainConfig, ApprovalOutcome, ApprovalRole, ApprovalService,
                ApproverResolver,
            },
            audit::AuditService,
            inventory_requests::InventoryRequestService,
            production_results::{NewProductionResult, ProductionResultService},
            stock_ledger::StockLedgerService,
            transfer_completion::TransferCompletionService,
            transfer_groups::{NewTransferRequest, TransferGroupService},
            Actor,
        },
        Services,
    };
}
