use crate::error::{AppError, Result};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

pub async fn shorten_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>> {
    let Json(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let long_url = match request.long_url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(AppError::BadRequest("longUrl is required".to_string())),
    };
    if HeaderValue::from_str(&long_url).is_err() {
        return Err(AppError::BadRequest(
            "longUrl contains characters not allowed in a redirect".to_string(),
        ));
    }

    let key = state.shortener().create(&long_url).await?;
    let short_url = key.to_url(state.base_url());
    info!(key = %key, long_url = %long_url, short_url = %short_url, "shortened url");

    Ok(Json(ShortenResponse { short_url }))
}

pub async fn redirect_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    match state.shortener().resolve(&key).await? {
        Some(long_url) => {
            let Ok(location) = HeaderValue::try_from(long_url.as_str()) else {
                return Err(AppError::InvalidRedirect(key));
            };
            info!(key = %key, long_url = %long_url, "redirecting");
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        None => {
            warn!(key = %key, "unknown short key");
            Err(AppError::NotFound(key))
        }
    }
}
