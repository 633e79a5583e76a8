use crate::model::HealthResponse;
use axum::Json;

pub async fn ping_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}
