use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::RedisOrderCache;
use crate::messaging::RedpandaPublisher;
use crate::orchestrator::OrderOrchestrator;
use crate::utils::CircuitState;

// ============================================================================
// Health Checks
// ============================================================================
//
// Readiness is the worst status across components. Only the store can
// make the service unhealthy; cache and broker trouble degrades it, since
// the orchestrator absorbs their failures.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }
}

#[async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn check_health(&self) -> ComponentHealth;
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub components: Vec<ComponentHealth>,
}

/// Runs every registered probe for `/readyz`.
#[derive(Clone)]
pub struct Readiness {
    version: String,
    probes: Vec<Arc<dyn HealthCheckable>>,
}

impl Readiness {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthCheckable>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn report(&self) -> HealthReport {
        let mut components = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            components.push(probe.check_health().await);
        }

        let status = components
            .iter()
            .map(|c| &c.status)
            .max_by_key(|s| s.severity())
            .cloned()
            .unwrap_or(HealthStatus::Healthy);

        if status.is_unhealthy() {
            tracing::warn!(status = ?status, "Readiness check failed");
        }

        HealthReport {
            status,
            version: self.version.clone(),
            components,
        }
    }
}

// ============================================================================
// Probes
// ============================================================================

#[async_trait]
impl HealthCheckable for OrderOrchestrator {
    async fn check_health(&self) -> ComponentHealth {
        let status = match self.ping_store().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        };
        ComponentHealth::new("database", status)
    }
}

#[async_trait]
impl HealthCheckable for RedisOrderCache {
    async fn check_health(&self) -> ComponentHealth {
        let status = match self.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Degraded(e.to_string()),
        };
        ComponentHealth::new("cache", status)
    }
}

#[async_trait]
impl HealthCheckable for RedpandaPublisher {
    async fn check_health(&self) -> ComponentHealth {
        let status = match self.circuit_state().await {
            CircuitState::Closed => HealthStatus::Healthy,
            other => HealthStatus::Degraded(format!("publisher circuit {}", other.as_str())),
        };
        ComponentHealth::new("broker", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, HealthStatus);

    #[async_trait]
    impl HealthCheckable for Fixed {
        async fn check_health(&self) -> ComponentHealth {
            ComponentHealth::new(self.0, self.1.clone())
        }
    }

    #[tokio::test]
    async fn test_no_probes_is_healthy() {
        let report = Readiness::new("1.0.0").report().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.components.is_empty());
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let report = Readiness::new("1.0.0")
            .with_probe(Arc::new(Fixed("database", HealthStatus::Healthy)))
            .with_probe(Arc::new(Fixed("cache", HealthStatus::Degraded("slow".into()))))
            .report()
            .await;
        assert_eq!(report.status, HealthStatus::Degraded("slow".into()));

        let report = Readiness::new("1.0.0")
            .with_probe(Arc::new(Fixed("cache", HealthStatus::Degraded("slow".into()))))
            .with_probe(Arc::new(Fixed("database", HealthStatus::Unhealthy("down".into()))))
            .report()
            .await;
        assert!(report.status.is_unhealthy());
    }

    #[test]
    fn test_status_wire_shape() {
        let value = serde_json::to_value(HealthStatus::Degraded("circuit open".into())).unwrap();
        assert_eq!(value["state"], "degraded");
        assert_eq!(value["reason"], "circuit open");

        let value = serde_json::to_value(HealthStatus::Healthy).unwrap();
        assert_eq!(value["state"], "healthy");
    }
}
