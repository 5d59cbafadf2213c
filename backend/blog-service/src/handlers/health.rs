/// Liveness and readiness probes
use crate::app::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize, Debug)]
pub struct ComponentCheck {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize, Debug)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: ComponentStatus,
    pub checks: HashMap<String, ComponentCheck>,
    pub timestamp: String,
}

/// GET /health
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

/// GET /health/ready
///
/// The repository gates readiness. A failing page store only degrades it, since
/// cached routes fall back to rendering.
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let mut checks = HashMap::new();
    let mut ready = true;
    let mut degraded = false;

    let start = Instant::now();
    let repo_result = state.repo.health_check().await;
    let latency = Some(start.elapsed().as_millis() as u64);
    let repo_check = match repo_result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Repository reachable".to_string(),
            latency_ms: latency,
        },
        Err(e) => {
            ready = false;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("Repository check failed: {}", e),
                latency_ms: latency,
            }
        }
    };
    checks.insert("repository".to_string(), repo_check);

    let start = Instant::now();
    let cache_result = state.pages.get("health:probe").await;
    let latency = Some(start.elapsed().as_millis() as u64);
    let cache_check = match cache_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Page store reachable".to_string(),
            latency_ms: latency,
        },
        Err(e) => {
            degraded = true;
            ComponentCheck {
                status: ComponentStatus::Degraded,
                message: format!("Page store check failed: {}", e),
                latency_ms: latency,
            }
        }
    };
    checks.insert("page_cache".to_string(), cache_check);

    let status = if !ready {
        ComponentStatus::Unhealthy
    } else if degraded {
        ComponentStatus::Degraded
    } else {
        ComponentStatus::Healthy
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
