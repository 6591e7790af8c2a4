use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events emitted by the weight-transfer subsystem.
///
/// Delivery is best-effort and in-process; state transitions are already
/// persisted (with audit rows) before an event is sent, so a dropped event
/// never loses data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductionResultRecorded {
        result_id: Uuid,
        order_id: Uuid,
        stage: String,
        input_weight: Decimal,
    },
    ProductionResultApproved {
        result_id: Uuid,
        approved_by: Uuid,
        transfer_count: usize,
    },
    ProductionResultRejected {
        result_id: Uuid,
        rejected_by: Uuid,
        reason: String,
    },
    TransferGroupCreated {
        transfer_group_id: Uuid,
        production_result_id: Option<Uuid>,
        transfer_count: usize,
    },
    TransferApprovalGranted {
        transfer_id: Uuid,
        approver_id: Uuid,
        approval_sequence: i32,
        fully_approved: bool,
    },
    TransferRejected {
        transfer_id: Uuid,
        rejected_by: Uuid,
        reason: String,
    },
    TransferCompleted {
        transfer_id: Uuid,
        transfer_group_id: Uuid,
        weight_transferred: Decimal,
    },
    TransferCompletionFailed {
        transfer_id: Uuid,
        reason: String,
    },
    InventoryRequestCompleted {
        request_id: Uuid,
        transfer_id: Uuid,
        observed_quantity: Option<Decimal>,
    },
    StockReceived {
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing delivery failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (not propagating) delivery failure. Used on
    /// paths where the state change has already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event delivery failed: {}", e);
        }
    }
}

/// Builds a connected sender/receiver pair with a bounded queue.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Event processing loop. Spawn once per process; exits when all senders drop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TransferCompletionFailed {
                transfer_id,
                reason,
            } => {
                error!(%transfer_id, %reason, "Transfer completion failed");
            }
            Event::TransferRejected {
                transfer_id,
                rejected_by,
                reason,
            } => {
                warn!(%transfer_id, %rejected_by, %reason, "Transfer rejected");
            }
            other => {
                info!(event = ?other, "Processed event");
            }
        }
    }

    info!("Event processing loop stopped");
}
