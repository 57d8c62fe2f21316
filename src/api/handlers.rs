use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{CharactersResponse, HealthResponse, SynthesisRequest};
use crate::api::routes::AppState;
use crate::error::AppError;

pub const AUDIO_FILENAME: &str = "speech.wav";

fn text_required() -> AppError {
    AppError::Validation("text is required".into())
}

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    // Any unreadable body is reported the same way as a missing text field
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Unreadable synthesis request: {}", rejection.body_text());
            return Err(text_required());
        }
    };

    let text = match request.text {
        Some(text) if !text.is_empty() => text,
        _ => return Err(text_required()),
    };

    tracing::info!(
        character = request.character.as_deref().unwrap_or(state.tts.default_character()),
        chars = text.chars().count(),
        "Synthesizing speech"
    );
    tracing::debug!(text = %text, "Synthesis text");

    let wav = state.tts.speak(text, request.character).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", AUDIO_FILENAME),
            ),
        ],
        wav,
    )
        .into_response())
}

pub async fn list_characters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CharactersResponse>, AppError> {
    let characters = state.tts.list_characters().await?;
    Ok(Json(CharactersResponse { characters }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
