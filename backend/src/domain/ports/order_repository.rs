//! Port for order persistence.
//!
//! Status updates are guarded by the order state machine: adapters only
//! apply a status change when the stored status is an allowed predecessor of
//! the target, so redelivered or out-of-order writes cannot resurrect a
//! terminal order.

use async_trait::async_trait;

use crate::domain::{NewOrder, ObjectKey, Order, OrderId, OrderStatus, Style};

use super::define_port_error;

define_port_error! {
    /// Errors raised by order repository adapters.
    pub enum OrderRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "order repository connection failed: {message}" [retryable],
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "order repository query failed: {message}",
    }
}

/// Durable storage for orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a `pending` order and return the stored row.
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepositoryError>;

    async fn find(&self, id: OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// Overwrite the style regardless of current status.
    ///
    /// Returns the updated row, or `None` when no order has this id.
    async fn set_style(
        &self,
        id: OrderId,
        style: Style,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Record a successful payment: status becomes `processing` and the
    /// charge id is stored in the same statement.
    ///
    /// Only `pending` and `processing` orders are updated. The first stored
    /// charge id is kept. Returns `None` when no order has this id or its
    /// status no longer accepts payment.
    async fn mark_paid(
        &self,
        id: OrderId,
        payment_charge_id: Option<String>,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Move the order to `next` when the state machine allows it.
    ///
    /// Returns `false` when the order is missing or its current status is not
    /// an allowed predecessor of `next`.
    async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<bool, OrderRepositoryError>;

    /// Store the output path and set `processed` in one update.
    ///
    /// Guarded like [`OrderRepository::transition`].
    async fn complete_generation(
        &self,
        id: OrderId,
        output_image_path: ObjectKey,
    ) -> Result<bool, OrderRepositoryError>;

    /// Record an error detail without changing status.
    async fn record_error(&self, id: OrderId, error: String) -> Result<(), OrderRepositoryError>;

    /// Set `failed` with an error detail when the state machine allows it.
    async fn mark_failed(&self, id: OrderId, error: String) -> Result<bool, OrderRepositoryError>;
}
