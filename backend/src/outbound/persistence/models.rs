//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Jsonb};

use super::schema::{chats, fulfillment_jobs, orders};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ChatRow {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    /// Stored in the `type` column.
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chats)]
pub(crate) struct NewChatRow<'a> {
    pub id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub language_code: Option<&'a str>,
    pub chat_type: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrderRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub chat_id: i64,
    pub input_image_path: String,
    pub output_image_path: Option<String>,
    pub style: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub payment_charge_id: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub(crate) struct NewOrderRow<'a> {
    pub chat_id: i64,
    pub input_image_path: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fulfillment_jobs)]
pub(crate) struct NewJobRow {
    pub payload: serde_json::Value,
}

/// Row returned by the claim statement.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct ClaimedJobRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Jsonb)]
    pub payload: serde_json::Value,
    #[diesel(sql_type = Integer)]
    pub attempts: i32,
}
