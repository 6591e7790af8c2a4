//! Database entities for the weight-transfer subsystem.
//!
//! All ids are UUIDs, all weights and quantities are `Decimal` (kilograms),
//! and all status/category columns are stored as strings with typed helpers
//! beside each entity.

pub mod inventory_request;
pub mod product;
pub mod production_result;
pub mod stock_record;
pub mod transfer_audit_log;
pub mod warehouse;
pub mod weight_transfer;
pub mod weight_transfer_approval;
