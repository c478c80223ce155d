use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use brewline_core::suggestions::SuggestionStores;
use brewline_core::AdminOverrideService;
use brewline_db::DbPool;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    admin: AdminOverrideService,
}

impl HealthState {
    pub fn new(db_pool: DbPool, stores: SuggestionStores) -> Self {
        Self { db_pool, admin: AdminOverrideService::new(stores) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub suggestions: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Binds the health listener and serves it until `shutdown` flips to `true`.
pub async fn spawn(
    bind_address: &str,
    port: u16,
    state: HealthState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    Ok(tokio::spawn(async move {
        let graceful = async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        };

        if let Err(error) =
            axum::serve(listener, router(state)).with_graceful_shutdown(graceful).await
        {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    }))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let suggestions = suggestions_check(&state.admin).await;
    let ready = database.status == "ready" && suggestions.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "brewline-server runtime initialized".to_string(),
        },
        database,
        suggestions,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn suggestions_check(admin: &AdminOverrideService) -> HealthCheck {
    match admin.get_settings().await {
        Ok(settings) => HealthCheck {
            status: "ready",
            detail: format!(
                "suggestion policy loaded (auto {}, strategy {})",
                if settings.auto_enabled { "enabled" } else { "disabled" },
                settings.auto_strategy
            ),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("suggestion policy unavailable: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use brewline_db::{connect_with_settings, migrations, sql_stores};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::health::{router, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let response = router(HealthState::new(pool.clone(), sql_stores(&pool)))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["database"]["status"], "ready");
        assert_eq!(payload["suggestions"]["status"], "ready");
        assert!(payload["suggestions"]["detail"].as_str().unwrap_or_default().contains("hybrid"));

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_closed() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let response = router(HealthState::new(pool.clone(), sql_stores(&pool)))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["status"], "degraded");
        assert_eq!(payload["database"]["status"], "degraded");
        assert_eq!(payload["suggestions"]["status"], "degraded");
        assert_eq!(payload["service"]["status"], "ready");
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let response = router(HealthState::new(pool.clone(), sql_stores(&pool)))
            .oneshot(Request::builder().uri("/suggestions").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
