use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type shared by every service in the crate.
///
/// Business-rule failures are values carried back to the caller; only
/// infrastructure faults (database, event bus) originate from lower layers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Weight imbalance of {difference} kg between input and recorded output")]
    WeightImbalance { difference: Decimal },

    #[error("Result failed weight balance validation and cannot be approved")]
    AlreadyImbalanced,

    #[error("Transfer has already been approved")]
    AlreadyApproved,

    #[error("Transfer has already been rejected")]
    AlreadyRejected,

    #[error("Transfer has already been completed")]
    AlreadyCompleted,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("An earlier approval in the chain is still pending")]
    SequenceViolation,

    #[error("Inventory verification requests are still pending")]
    InventoryRequestsPending,

    #[error("No approver found for role '{role}' (warehouse {warehouse_id:?})")]
    MissingApprover {
        role: String,
        warehouse_id: Option<Uuid>,
    },

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Stable machine-readable code for this error.
    ///
    /// This is the single source of truth for the code surfaced to whatever
    /// caller layer is attached; messages may change, codes may not.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::WeightImbalance { .. } => "WEIGHT_IMBALANCE",
            Self::AlreadyImbalanced => "ALREADY_IMBALANCED",
            Self::AlreadyApproved => "ALREADY_APPROVED",
            Self::AlreadyRejected => "ALREADY_REJECTED",
            Self::AlreadyCompleted => "ALREADY_COMPLETED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::SequenceViolation => "SEQUENCE_VIOLATION",
            Self::InventoryRequestsPending => "INVENTORY_REQUESTS_PENDING",
            Self::MissingApprover { .. } => "MISSING_APPROVER",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::EventError(_) => "EVENT_ERROR",
            Self::InternalError(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Message suitable for callers. Infrastructure errors return generic
    /// text so implementation details never cross the boundary.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal error".to_string(),
            Self::EventError(_) => "Event delivery failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Plain result object for boundary callers that want a success flag and a
/// code/message pair instead of a Rust `Result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error_code: None,
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for OperationResult {
    fn from(error: &ServiceError) -> Self {
        Self {
            success: false,
            error_code: Some(error.error_code().to_string()),
            message: error.response_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ServiceError::SequenceViolation.error_code(),
            "SEQUENCE_VIOLATION"
        );
        assert_eq!(
            ServiceError::InventoryRequestsPending.error_code(),
            "INVENTORY_REQUESTS_PENDING"
        );
        assert_eq!(
            ServiceError::WeightImbalance {
                difference: dec!(0.5)
            }
            .error_code(),
            "WEIGHT_IMBALANCE"
        );
    }

    #[test]
    fn database_errors_do_not_leak_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom(
            "connection refused at 10.0.0.3".to_string(),
        ));
        let result = OperationResult::from(&err);
        assert!(!result.success);
        assert_eq!(result.message, "Database error");
        assert_eq!(result.error_code.as_deref(), Some("DATABASE_ERROR"));
    }
}
