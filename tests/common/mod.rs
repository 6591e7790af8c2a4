use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::task::JoinHandle;
use uuid::Uuid;

use rollflow_core::{
    config::AppConfig,
    db::{self, DbPool},
    entities::{product, warehouse},
    errors::ServiceError,
    events,
    services::{
        approvals::{ApprovalChainConfig, ApprovalRole, ApproverResolver},
        Actor,
    },
    Services,
};

/// In-memory approver directory. Tests register warehouse managers and a
/// transit manager up front; unregistered roles resolve to nobody, which is
/// how `MissingApprover` scenarios are staged.
#[derive(Default)]
pub struct StaticDirectory {
    inner: RwLock<DirectoryInner>,
}

#[derive(Default)]
struct DirectoryInner {
    transit_manager: Option<Uuid>,
    warehouse_managers: HashMap<Uuid, Uuid>,
}

impl StaticDirectory {
    pub fn assign_warehouse_manager(&self, warehouse_id: Uuid, user_id: Uuid) {
        self.inner
            .write()
            .expect("directory lock poisoned")
            .warehouse_managers
            .insert(warehouse_id, user_id);
    }

    pub fn set_transit_manager(&self, user_id: Uuid) {
        self.inner.write().expect("directory lock poisoned").transit_manager = Some(user_id);
    }
}

#[async_trait]
impl ApproverResolver for StaticDirectory {
    async fn resolve_approver(
        &self,
        role: ApprovalRole,
        warehouse_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, ServiceError> {
        let inner = self.inner.read().expect("directory lock poisoned");
        Ok(match role {
            ApprovalRole::TransitManager => inner.transit_manager,
            ApprovalRole::SourceWarehouseManager | ApprovalRole::DestinationWarehouseManager => {
                warehouse_id.and_then(|id| inner.warehouse_managers.get(&id).copied())
            }
        })
    }
}

/// Test harness backed by an in-memory SQLite database with the full service
/// stack wired over it.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: Services,
    pub directory: Arc<StaticDirectory>,
    _event_task: JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let db = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let directory = Arc::new(StaticDirectory::default());
        let services = Services::build(
            db.clone(),
            event_sender,
            directory.clone(),
            ApprovalChainConfig::default(),
        );

        Self {
            db,
            services,
            directory,
            _event_task: event_task,
        }
    }

    pub async fn seed_product(&self, sku: &str) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Test material {}", sku)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed product")
    }

    pub async fn seed_warehouse(&self, code: &str) -> warehouse::Model {
        warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Test warehouse {}", code)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed warehouse")
    }

    /// Seeds a warehouse together with a manager registered in the approver
    /// directory. Returns the warehouse and the manager's user id.
    pub async fn seed_managed_warehouse(&self, code: &str) -> (warehouse::Model, Uuid) {
        let warehouse = self.seed_warehouse(code).await;
        let manager = Uuid::new_v4();
        self.directory.assign_warehouse_manager(warehouse.id, manager);
        (warehouse, manager)
    }

    pub async fn seed_stock(&self, product_id: Uuid, warehouse_id: Uuid, quantity: Decimal) {
        self.services
            .stock_ledger
            .receive_stock(product_id, warehouse_id, quantity, Actor::System, None)
            .await
            .expect("seed stock");
    }

    /// Completes every pending inventory verification request on a transfer,
    /// reporting the observed quantity as the current on-hand figure.
    pub async fn complete_inventory_checks(&self, transfer_id: Uuid, operator: Uuid) {
        let requests = self
            .services
            .inventory_requests
            .for_transfer(transfer_id)
            .await
            .expect("list inventory requests");

        for request in requests {
            self.services
                .inventory_requests
                .complete_request(request.id, None, operator)
                .await
                .expect("complete inventory request");
        }
    }

    pub async fn on_hand(&self, product_id: Uuid, warehouse_id: Uuid) -> Decimal {
        self.services
            .stock_ledger
            .on_hand(product_id, warehouse_id)
            .await
            .expect("read on-hand stock")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
