//! Storage health probe.

use crate::db::repository::FullRepository;

/// Outcome of probing the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Connected,
    Disconnected,
    Error(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Connected)
    }

    pub fn describe(&self) -> String {
        match self {
            HealthStatus::Connected => "connected".to_string(),
            HealthStatus::Disconnected => "disconnected".to_string(),
            HealthStatus::Error(e) => format!("error: {}", e),
        }
    }
}

/// Never fails; storage errors are folded into the status.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> HealthStatus {
    match repo.health_check().await {
        Ok(true) => HealthStatus::Connected,
        Ok(false) => HealthStatus::Disconnected,
        Err(e) => HealthStatus::Error(e.to_string()),
    }
}
