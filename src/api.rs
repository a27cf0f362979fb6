use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{
    app_state::AppState,
    models::{AnalysisResponse, SubmissionContext},
};

// --- Payloads ---

#[derive(Debug, Deserialize)]
pub struct AnalyzeSubmissionPayload {
    team_name: String,
    project_title: String,
    description: String,
    #[serde(default)]
    github_link: Option<String>,
    #[serde(default)]
    demo_link: Option<String>,
    #[serde(default)]
    pitch_file_url: Option<String>,
}

impl From<AnalyzeSubmissionPayload> for SubmissionContext {
    fn from(p: AnalyzeSubmissionPayload) -> Self {
        // Un campo opcional vacío equivale a no enviarlo.
        let present = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            team_name: p.team_name,
            project_title: p.project_title,
            description: p.description,
            github_link: present(p.github_link),
            demo_link: present(p.demo_link),
            pitch_file_url: present(p.pitch_file_url),
        }
    }
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/analyze-submission", post(analyze_submission_handler))
        .route("/api/status", get(status_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn analyze_submission_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeSubmissionPayload>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, (StatusCode, Json<serde_json::Value>)> {
    // Cuerpo inválido: mismo formato `{ error }` que el resto de fallos.
    let Json(payload) = payload.map_err(|rejection| {
        (
            rejection.status(),
            Json(json!({ "error": rejection.body_text() })),
        )
    })?;

    match state.analyzer.analyze(payload.into()).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Error en analyze-submission: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model": state.analyzer.model_name(),
        "pitch_analysis": state.analyzer.pitch_enabled(),
        "github_api": state.config.github_api_url,
    }))
}
