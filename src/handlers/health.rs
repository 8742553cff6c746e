use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
