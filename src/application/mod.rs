//! Use cases orchestrating aggregates inside store transactions
pub mod catalog;
pub mod orders;

pub use catalog::{CatalogService, Reservation};
pub use orders::{OrderLineRequest, OrderService, PlaceOrder, StatusTarget, StatusUpdate};

use crate::infrastructure::UnitOfWork;
use crate::Result;

/// Commits on success. On failure the unit is rolled back explicitly and the
/// original error is returned.
pub(crate) async fn finish<T>(tx: Box<dyn UnitOfWork>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}
