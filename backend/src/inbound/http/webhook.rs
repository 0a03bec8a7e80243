//! Telegram webhook endpoint.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde_json::json;
use tracing::{debug, warn};

use super::dto::UpdateDto;
use super::error::ApiResult;
use super::state::HttpState;
use crate::domain::{Error, InboundUpdate};

/// Header Telegram uses to echo the secret registered with `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Accept one Telegram update.
///
/// Handler failures are logged and answered with 200 so Telegram does not
/// redeliver the update; users are informed by the services themselves.
#[post("/telegram/webhook")]
pub async fn receive_update(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let presented = request
        .headers()
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state.accepts_secret(presented) {
        warn!("rejected webhook call with a missing or wrong secret token");
        return Err(Error::unauthorized("invalid webhook secret token"));
    }

    let dto: UpdateDto = serde_json::from_slice(&body).map_err(|err| {
        Error::invalid_request("malformed update payload")
            .with_details(json!({ "reason": err.to_string() }))
    })?;
    let update = InboundUpdate::from(dto);
    let update_id = update.update_id;
    debug!(update_id, "received update");

    if let Err(err) = state.dispatcher.dispatch(update).await {
        warn!(update_id, error = %err, "update handling failed");
    }
    Ok(HttpResponse::Ok().finish())
}
