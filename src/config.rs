//! Carga y gestión de configuración de la aplicación (Gemini + GitHub + Storage).

use std::env;

use crate::error::AnalysisError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_PITCH_BUCKET: &str = "pitch-files";

/// Credenciales del storage donde viven los pitch decks.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,

    pub github_api_url: String,
    pub github_token: Option<String>,

    /// `None` desactiva el análisis del pitch deck (no es un error).
    pub storage: Option<StorageConfig>,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de cualquier fuente clave/valor.
    /// Los valores vacíos cuentan como ausentes.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| AnalysisError::Config("GEMINI_API_KEY is not configured".into()))?;

        let server_addr = get("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:3322".to_string());
        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_api_base = get("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let github_api_url = get("GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let github_token = get("GITHUB_TOKEN");

        let storage = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_key)) => Some(StorageConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
                bucket: get("PITCH_BUCKET").unwrap_or_else(|| DEFAULT_PITCH_BUCKET.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            server_addr,
            gemini_api_key,
            gemini_model,
            gemini_api_base,
            github_api_url,
            github_token,
            storage,
        })
    }
}
