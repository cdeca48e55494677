//! Health check module
//! Provides health status for the application and its dependencies

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::error;

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Healthy)
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    db_pool: sqlx::PgPool,
}

impl HealthChecker {
    pub fn new(db_pool: sqlx::PgPool) -> Self {
        Self { db_pool }
    }

    /// Probe the database with a short timeout and report per-component
    /// status.
    pub async fn check(&self) -> HealthStatus {
        let mut checks = HashMap::new();

        let start = Instant::now();
        let db_health = match timeout(
            Duration::from_secs(3),
            crate::database::health_check(&self.db_pool),
        )
        .await
        {
            Ok(Ok(())) => ComponentHealth::up(Some(start.elapsed().as_millis())),
            Ok(Err(e)) => {
                error!(error = %e, "database health check failed");
                ComponentHealth::down(Some(e.to_string()))
            }
            Err(_) => ComponentHealth::down(Some("timed out".to_string())),
        };

        let healthy = matches!(db_health.status, ComponentState::Up);
        checks.insert("database".to_string(), db_health);

        HealthStatus {
            status: if healthy {
                HealthState::Healthy
            } else {
                HealthState::Unhealthy
            },
            checks,
            timestamp: chrono::Utc::now(),
        }
    }
}
