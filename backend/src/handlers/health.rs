use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{services::cache::Cache as _, state::AppState};

/// Liveness of the two backends behind the session store.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let redis_ok = state.cache.ping().await.is_ok();
    let database_ok = sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .is_ok();

    Json(json!({
        "status": if redis_ok && database_ok { "ok" } else { "degraded" },
        "service": "keygate-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "checks": {
            "redis": if redis_ok { "ok" } else { "error" },
            "database": if database_ok { "ok" } else { "error" },
        },
    }))
}
