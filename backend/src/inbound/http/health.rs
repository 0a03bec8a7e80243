//! Liveness and readiness endpoints.
//!
//! Readiness is reported only after startup finished and every registered
//! [`ReadinessCheck`] passes, so a lost database or a stopped queue consumer
//! takes the instance out of rotation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, HttpResponseBuilder, get, http::header, web};
use serde::Serialize;
use tracing::warn;

use crate::domain::ports::ReadinessCheck;

/// Shared health state for the readiness and liveness endpoints.
pub struct HealthState {
    started: AtomicBool,
    live: AtomicBool,
    checks: Vec<Arc<dyn ReadinessCheck>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            started: AtomicBool::new(false),
            live: AtomicBool::new(true),
            checks: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Starting,
    Ready,
    Degraded,
    Alive,
    Draining,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failing: Vec<&'static str>,
}

impl HealthState {
    /// Not ready and live, with no dependency checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency that must pass before readiness is reported.
    pub fn with_check(mut self, check: Arc<dyn ReadinessCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Mark startup complete once migrations ran and adapters are built.
    pub fn mark_ready(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Fail liveness while the process drains during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Names of the registered checks that currently fail.
    pub async fn failing_checks(&self) -> Vec<&'static str> {
        let mut failing = Vec::new();
        for check in &self.checks {
            if !check.is_ready().await {
                failing.push(check.name());
            }
        }
        failing
    }

    fn respond(mut builder: HttpResponseBuilder, body: HealthBody) -> HttpResponse {
        builder
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(body)
    }
}

/// Readiness endpoint: 200 once started and every check passes, 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    if !state.is_started() {
        return HealthState::respond(
            HttpResponse::ServiceUnavailable(),
            HealthBody {
                status: Status::Starting,
                failing: Vec::new(),
            },
        );
    }

    let failing = state.failing_checks().await;
    if failing.is_empty() {
        HealthState::respond(
            HttpResponse::Ok(),
            HealthBody {
                status: Status::Ready,
                failing,
            },
        )
    } else {
        warn!(?failing, "readiness checks failing");
        HealthState::respond(
            HttpResponse::ServiceUnavailable(),
            HealthBody {
                status: Status::Degraded,
                failing,
            },
        )
    }
}

/// Liveness endpoint: 200 while alive, 503 once draining.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    if state.is_alive() {
        HealthState::respond(
            HttpResponse::Ok(),
            HealthBody {
                status: Status::Alive,
                failing: Vec::new(),
            },
        )
    } else {
        HealthState::respond(
            HttpResponse::ServiceUnavailable(),
            HealthBody {
                status: Status::Draining,
                failing: Vec::new(),
            },
        )
    }
}
