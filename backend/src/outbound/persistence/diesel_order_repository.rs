//! PostgreSQL-backed `OrderRepository`.
//!
//! Status writes filter on the allowed predecessor statuses so the database
//! enforces the order state machine even when two deliveries race.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{OrderRepository, OrderRepositoryError};
use crate::domain::{ChatId, NewOrder, ObjectKey, Order, OrderId, OrderStatus, Style};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewOrderRow, OrderRow};
use super::pool::DbPool;
use super::schema::orders;

diesel::define_sql_function! {
    /// SQL `COALESCE` over nullable text.
    fn coalesce(first: Nullable<Text>, second: Nullable<Text>) -> Nullable<Text>;
}

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: diesel::result::Error) -> OrderRepositoryError {
    map_diesel_error(
        error,
        OrderRepositoryError::query,
        OrderRepositoryError::connection,
    )
}

fn row_to_order(row: OrderRow) -> Result<Order, OrderRepositoryError> {
    let OrderRow {
        id,
        created_at,
        chat_id,
        input_image_path,
        output_image_path,
        style,
        status,
        error,
        payment_charge_id,
    } = row;

    let decode_key = |raw: String| {
        ObjectKey::new(raw)
            .map_err(|err| OrderRepositoryError::query(format!("order {id}: {err}")))
    };
    let style = style
        .map(|raw| raw.parse::<Style>())
        .transpose()
        .map_err(|err| OrderRepositoryError::query(format!("order {id}: {err}")))?;

    Ok(Order {
        id: OrderId::new(id),
        created_at,
        chat_id: ChatId::new(chat_id),
        input_image_path: decode_key(input_image_path)?,
        output_image_path: output_image_path.map(decode_key).transpose()?,
        style,
        status: OrderStatus::from_stored(&status),
        error,
        payment_charge_id,
    })
}

fn predecessors(next: OrderStatus) -> Vec<&'static str> {
    next.allowed_predecessors()
        .into_iter()
        .map(OrderStatus::as_str)
        .collect()
}

impl DieselOrderRepository {
    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, OrderRepositoryError> {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, OrderRepositoryError::connection))
    }
}

#[async_trait]
impl OrderRepository for DieselOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepositoryError> {
        let mut conn = self.connection().await?;
        let row = NewOrderRow {
            chat_id: order.chat_id.as_i64(),
            input_image_path: order.input_image_path.as_str(),
            status: OrderStatus::Pending.as_str(),
        };

        let inserted = diesel::insert_into(orders::table)
            .values(&row)
            .returning(OrderRow::as_returning())
            .get_result::<OrderRow>(&mut conn)
            .await
            .map_err(map_error)?;
        row_to_order(inserted)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.connection().await?;

        let row = orders::table
            .filter(orders::id.eq(id.as_i64()))
            .select(OrderRow::as_select())
            .first::<OrderRow>(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(row_to_order).transpose()
    }

    async fn set_style(
        &self,
        id: OrderId,
        style: Style,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.connection().await?;

        let row = diesel::update(orders::table.filter(orders::id.eq(id.as_i64())))
            .set((
                orders::style.eq(style.slug()),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .returning(OrderRow::as_returning())
            .get_result::<OrderRow>(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(row_to_order).transpose()
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        payment_charge_id: Option<String>,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.connection().await?;
        let next = OrderStatus::Processing;

        let row = diesel::update(
            orders::table
                .filter(orders::id.eq(id.as_i64()))
                .filter(orders::status.eq_any(predecessors(next))),
        )
        .set((
            orders::status.eq(next.as_str()),
            orders::payment_charge_id.eq(coalesce(orders::payment_charge_id, payment_charge_id)),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderRow::as_returning())
        .get_result::<OrderRow>(&mut conn)
        .await
        .optional()
        .map_err(map_error)?;
        row.map(row_to_order).transpose()
    }

    async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<bool, OrderRepositoryError> {
        let mut conn = self.connection().await?;

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id.as_i64()))
                .filter(orders::status.eq_any(predecessors(next))),
        )
        .set((
            orders::status.eq(next.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_error)?;
        Ok(updated > 0)
    }

    async fn complete_generation(
        &self,
        id: OrderId,
        output_image_path: ObjectKey,
    ) -> Result<bool, OrderRepositoryError> {
        let mut conn = self.connection().await?;
        let next = OrderStatus::Processed;

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id.as_i64()))
                .filter(orders::status.eq_any(predecessors(next))),
        )
        .set((
            orders::status.eq(next.as_str()),
            orders::output_image_path.eq(output_image_path.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_error)?;
        Ok(updated > 0)
    }

    async fn record_error(&self, id: OrderId, error: String) -> Result<(), OrderRepositoryError> {
        let mut conn = self.connection().await?;

        diesel::update(orders::table.filter(orders::id.eq(id.as_i64())))
            .set((
                orders::error.eq(error),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn mark_failed(&self, id: OrderId, error: String) -> Result<bool, OrderRepositoryError> {
        let mut conn = self.connection().await?;
        let next = OrderStatus::Failed;

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id.as_i64()))
                .filter(orders::status.eq_any(predecessors(next))),
        )
        .set((
            orders::status.eq(next.as_str()),
            orders::error.eq(error),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_error)?;
        Ok(updated > 0)
    }
}
