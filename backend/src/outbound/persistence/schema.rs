//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate
//! with `diesel print-schema` when a migration changes a table.

diesel::table! {
    /// Chats seen by the bot. The profile is written on first contact only.
    chats (id) {
        id -> Int8,
        username -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        language_code -> Nullable<Text>,
        #[sql_name = "type"]
        chat_type -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Stylization orders.
    orders (id) {
        id -> Int8,
        created_at -> Timestamptz,
        chat_id -> Int8,
        input_image_path -> Text,
        output_image_path -> Nullable<Text>,
        style -> Nullable<Text>,
        status -> Text,
        error -> Nullable<Text>,
        payment_charge_id -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Durable fulfillment queue.
    fulfillment_jobs (id) {
        id -> Int8,
        payload -> Jsonb,
        attempts -> Int4,
        available_at -> Timestamptz,
        locked_until -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(orders -> chats (chat_id));

diesel::allow_tables_to_appear_in_same_query!(chats, orders, fulfillment_jobs);
