//! Health check module
//! Reports whether the webhook receiver is able to do its job

use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, warn};

use crate::services::webhook_processor::WebhookSettings;

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Healthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up() -> Self {
        Self {
            status: ComponentState::Up,
            details: None,
        }
    }

    pub fn down(details: impl Into<String>) -> Self {
        Self {
            status: ComponentState::Down,
            details: Some(details.into()),
        }
    }

    pub fn warning(details: impl Into<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            details: Some(details.into()),
        }
    }
}

/// Configuration-level checks for the webhook receiver. Without a signing
/// secret every notification is rejected; without an events queue they are
/// accepted but not forwarded.
pub fn check_webhook_health(settings: &WebhookSettings) -> HealthStatus {
    let mut health_status = HealthStatus::new();

    if settings.webhook_secret.is_some() {
        health_status
            .checks
            .insert("webhook_secret".to_string(), ComponentHealth::up());
    } else {
        error!("Health check: webhook secret is not configured");
        health_status.checks.insert(
            "webhook_secret".to_string(),
            ComponentHealth::down("STRIPE_WEBHOOK_SECRET not set"),
        );
        health_status.status = HealthState::Unhealthy;
    }

    if settings.events_queue_url.is_some() {
        health_status
            .checks
            .insert("events_queue".to_string(), ComponentHealth::up());
    } else {
        warn!("Health check: payment events queue is not configured");
        health_status.checks.insert(
            "events_queue".to_string(),
            ComponentHealth::warning("PAYMENT_EVENTS_QUEUE_URL not set, events are not published"),
        );
        if health_status.status == HealthState::Healthy {
            health_status.status = HealthState::Degraded;
        }
    }

    health_status
}
