//! Cliente del modelo generativo (Gemini `generateContent`).
//!
//! Una sola llamada síncrona, sin streaming ni reintentos. El pitch deck, si
//! existe, viaja como `inline_data` antes del texto del prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::models::PitchAsset;

/// Seam sobre el endpoint de IA, para poder sustituirlo en tests.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        pitch: Option<&PitchAsset>,
    ) -> Result<String, AnalysisError>;

    fn model_name(&self) -> &str;
}

const API_KEY_HEADER: &str = "x-goog-api-key";

// --- Cuerpo de la petición ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_k: 32,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

// --- Respuesta (sólo lo que leemos) ---

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Texto del primer candidato, si lo hay.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
    }
}

fn build_request<'a>(prompt: &'a str, pitch: Option<&'a PitchAsset>) -> GenerateRequest<'a> {
    let mut parts = Vec::with_capacity(2);
    if let Some(p) = pitch {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: &p.mime_type,
                data: &p.data,
            },
        });
    }
    parts.push(Part::Text { text: prompt });

    GenerateRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig::default(),
    }
}

/// Cliente REST de Gemini.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Falla si la API key está vacía.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Config("GEMINI_API_KEY is not configured".into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AnalysisError> {
        Self::new(&cfg.gemini_api_base, &cfg.gemini_api_key, &cfg.gemini_model)
    }
}

#[async_trait]
impl AnalysisModel for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        pitch: Option<&PitchAsset>,
    ) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let body = build_request(prompt, pitch);

        info!(
            "Llamando a {} ({} caracteres de prompt)",
            self.model,
            prompt.chars().count()
        );
        // La key va en cabecera: los errores de reqwest incluyen la URL.
        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Error de red llamando a Gemini: {e}");
                AnalysisError::ModelUnavailable(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!("Gemini API error: {} {}", status.as_u16(), text);
            return Err(AnalysisError::ModelUnavailable(format!(
                "{} {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| {
                AnalysisError::ModelUnavailable(format!("respuesta ilegible: {}", e.without_url()))
            })?;

        parsed
            .first_text()
            .ok_or_else(|| AnalysisError::ModelUnavailable("No analysis text returned from Gemini".into()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn pitch_part_goes_before_text() {
        let pitch = PitchAsset {
            data: "AAEC".into(),
            mime_type: "application/pdf".into(),
            size: 3,
        };
        let body = serde_json::to_value(build_request("judge this", Some(&pitch))).unwrap();

        assert_eq!(
            body["contents"][0]["parts"][0],
            json!({ "inline_data": { "mime_type": "application/pdf", "data": "AAEC" } })
        );
        assert_eq!(body["contents"][0]["parts"][1], json!({ "text": "judge this" }));
        assert_eq!(body["generationConfig"]["topK"], 32);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn text_only_request_has_single_part() {
        let body = serde_json::to_value(build_request("hi", None)).unwrap();
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = GeminiClient::new("http://x", " ", "m").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[tokio::test]
    async fn returns_first_candidate_text() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|headers: HeaderMap, Json(_body): Json<Value>| async move {
                assert_eq!(
                    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()),
                    Some("secret")
                );
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "{\"final_score\": 80}" }] } }]
                }))
            }),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(base, "secret", "gemini-test").unwrap();
        let text = client.generate("prompt", None).await.unwrap();
        assert_eq!(text, "{\"final_score\": 80}");
    }

    #[tokio::test]
    async fn error_status_is_model_unavailable() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(base, "secret", "gemini-test").unwrap();
        let err = client.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
        assert!(err.to_string().contains("429 quota exceeded"));
    }

    #[tokio::test]
    async fn empty_candidates_is_model_unavailable() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|| async { Json(json!({ "candidates": [] })) }),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(base, "secret", "gemini-test").unwrap();
        let err = client.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn network_error_does_not_expose_api_key() {
        let client = GeminiClient::new("http://127.0.0.1:1", "SUPERSECRETKEY", "m").unwrap();
        let err = client.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn unreadable_body_does_not_expose_api_key() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|| async { "<html>not json</html>" }),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(base, "SUPERSECRETKEY", "m").unwrap();
        let err = client.generate("prompt", None).await.unwrap_err();
        assert!(err.to_string().contains("respuesta ilegible"));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
    }
}
