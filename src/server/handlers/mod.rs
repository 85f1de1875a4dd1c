pub mod devices;
pub mod extensions;
pub mod health;
pub mod lines;
pub mod partitions;

use serde::Serialize;
use utoipa::ToSchema;

/// Result of a bulk delete.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedCount {
    pub deleted: u64,
}
