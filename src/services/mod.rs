//! Services implementing the weight-transfer pipeline:
//! result recording, transfer group building, sequential approval,
//! inventory verification, and transactional completion.

pub mod approvals;
pub mod audit;
pub mod inventory_requests;
pub mod production_results;
pub mod stock_ledger;
pub mod transfer_completion;
pub mod transfer_groups;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who performed an action. `System` is the sentinel for automatic
/// transitions (waste auto-approval); no magic user id is ever used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    User(Uuid),
    System,
}

impl Actor {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Actor::User(_) => "user",
            Actor::System => "system",
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::System => None,
        }
    }
}
