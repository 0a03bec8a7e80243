//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `STYLEBOT_*` environment variables, CLI flags, or a
//! config file. [`AppSettings::resolve`] validates them into a
//! [`BotConfig`] with secrets held in [`Zeroizing`] buffers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{ChatId, PricingPolicy};
use crate::inbound::worker::QueueConsumerConfig;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORAGE_ROOT: &str = "./data";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_PRICE_STARS: u32 = 1;
const DEFAULT_WORKER_BATCH_SIZE: usize = 10;
const DEFAULT_WORKER_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_WORKER_MAX_DELIVERIES: u32 = 3;
const DEFAULT_WORKER_RETRY_DELAY_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_DB_CHECKOUT_TIMEOUT_SECS: u64 = 30;

/// Raw settings as supplied by the operator.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STYLEBOT")]
pub struct AppSettings {
    /// Telegram bot token.
    pub bot_token: Option<String>,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Chat that receives operator notifications and the admin price.
    pub admin_chat_id: Option<i64>,
    /// Secret Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<String>,
    pub bind_addr: Option<String>,
    /// Root directory of the image store.
    pub storage_root: Option<PathBuf>,
    pub telegram_api_base: Option<String>,
    pub openai_api_base: Option<String>,
    pub image_model: Option<String>,
    pub price_stars: Option<u32>,
    pub admin_price_stars: Option<u32>,
    pub worker_batch_size: Option<usize>,
    pub worker_poll_interval_ms: Option<u64>,
    pub worker_max_deliveries: Option<u32>,
    pub worker_retry_delay_secs: Option<u64>,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_secs: Option<u64>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    pub db_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub db_checkout_timeout_secs: Option<u64>,
    /// Serve the webhook without consuming the fulfillment queue.
    #[ortho_config(default = false)]
    pub no_worker: bool,
    /// Consume the fulfillment queue without serving HTTP.
    #[ortho_config(default = false)]
    pub worker_only: bool,
}

/// Configuration failures detected while resolving settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("`no_worker` and `worker_only` cannot both be set")]
    ConflictingRunMode,
}

impl SettingsError {
    fn invalid(field: &'static str, message: impl ToString) -> Self {
        Self::Invalid {
            field,
            message: message.to_string(),
        }
    }
}

/// Which halves of the service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Webhook server and queue consumer.
    Combined,
    HttpOnly,
    WorkerOnly,
}

impl RunMode {
    pub fn serves_http(self) -> bool {
        !matches!(self, Self::WorkerOnly)
    }

    pub fn runs_worker(self) -> bool {
        !matches!(self, Self::HttpOnly)
    }
}

/// Validated configuration.
pub struct BotConfig {
    pub bot_token: Zeroizing<String>,
    pub openai_api_key: Zeroizing<String>,
    pub database_url: Zeroizing<String>,
    pub webhook_secret: Option<Zeroizing<String>>,
    pub bind_addr: SocketAddr,
    pub storage_root: PathBuf,
    pub telegram_api_base: Url,
    pub openai_api_base: Url,
    pub image_model: String,
    pub pricing: PricingPolicy,
    pub consumer: QueueConsumerConfig,
    pub http_timeout: Duration,
    pub db_max_connections: u32,
    pub db_min_idle: u32,
    pub db_checkout_timeout: Duration,
    pub run_mode: RunMode,
}

impl BotConfig {
    /// Pool settings for the configured database.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.database_url.as_str())
            .with_max_size(self.db_max_connections)
            .with_min_idle(self.db_min_idle)
            .with_checkout_timeout(self.db_checkout_timeout)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<Zeroizing<String>, SettingsError> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(Zeroizing::new)
        .ok_or(SettingsError::Missing(field))
}

fn parse_url(value: Option<String>, default: &str, field: &'static str) -> Result<Url, SettingsError> {
    let raw = value.unwrap_or_else(|| default.to_owned());
    Url::parse(&raw).map_err(|err| SettingsError::invalid(field, err))
}

fn positive<T>(value: T, field: &'static str) -> Result<T, SettingsError>
where
    T: PartialOrd + Default,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(SettingsError::invalid(field, "must be greater than zero"))
    }
}

impl AppSettings {
    /// Validate raw settings, filling defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a required secret is missing, a value
    /// does not parse, or the run-mode flags conflict.
    pub fn resolve(self) -> Result<BotConfig, SettingsError> {
        let run_mode = match (self.no_worker, self.worker_only) {
            (true, true) => return Err(SettingsError::ConflictingRunMode),
            (true, false) => RunMode::HttpOnly,
            (false, true) => RunMode::WorkerOnly,
            (false, false) => RunMode::Combined,
        };

        let bind_addr = self
            .bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|err| SettingsError::invalid("bind_addr", err))?;
        let price_stars = positive(
            self.price_stars.unwrap_or(DEFAULT_PRICE_STARS),
            "price_stars",
        )?;
        let admin_price_stars = positive(
            self.admin_price_stars.unwrap_or(DEFAULT_PRICE_STARS),
            "admin_price_stars",
        )?;
        let consumer = QueueConsumerConfig {
            batch_size: positive(
                self.worker_batch_size.unwrap_or(DEFAULT_WORKER_BATCH_SIZE),
                "worker_batch_size",
            )?,
            poll_interval: Duration::from_millis(
                self.worker_poll_interval_ms
                    .unwrap_or(DEFAULT_WORKER_POLL_INTERVAL_MS),
            ),
            retry_delay: Duration::from_secs(
                self.worker_retry_delay_secs
                    .unwrap_or(DEFAULT_WORKER_RETRY_DELAY_SECS),
            ),
            max_deliveries: positive(
                self.worker_max_deliveries
                    .unwrap_or(DEFAULT_WORKER_MAX_DELIVERIES),
                "worker_max_deliveries",
            )?,
        };
        let http_timeout = Duration::from_secs(positive(
            self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            "http_timeout_secs",
        )?);

        let db_max_connections = positive(
            self.db_max_connections
                .unwrap_or(PoolConfig::DEFAULT_MAX_SIZE),
            "db_max_connections",
        )?;
        let db_min_idle = self.db_min_idle.unwrap_or(PoolConfig::DEFAULT_MIN_IDLE);
        if db_min_idle > db_max_connections {
            return Err(SettingsError::invalid(
                "db_min_idle",
                "must not exceed db_max_connections",
            ));
        }
        let db_checkout_timeout = Duration::from_secs(positive(
            self.db_checkout_timeout_secs
                .unwrap_or(DEFAULT_DB_CHECKOUT_TIMEOUT_SECS),
            "db_checkout_timeout_secs",
        )?);

        Ok(BotConfig {
            bot_token: required(self.bot_token, "bot_token")?,
            openai_api_key: required(self.openai_api_key, "openai_api_key")?,
            database_url: required(self.database_url, "database_url")?,
            webhook_secret: self
                .webhook_secret
                .filter(|secret| !secret.trim().is_empty())
                .map(Zeroizing::new),
            bind_addr,
            storage_root: self
                .storage_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT)),
            telegram_api_base: parse_url(
                self.telegram_api_base,
                DEFAULT_TELEGRAM_API_BASE,
                "telegram_api_base",
            )?,
            openai_api_base: parse_url(
                self.openai_api_base,
                DEFAULT_OPENAI_API_BASE,
                "openai_api_base",
            )?,
            image_model: self
                .image_model
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_owned()),
            pricing: PricingPolicy {
                price_stars,
                admin_price_stars,
                admin_chat_id: self.admin_chat_id.map(ChatId::new),
            },
            consumer,
            http_timeout,
            db_max_connections,
            db_min_idle,
            db_checkout_timeout,
            run_mode,
        })
    }
}
