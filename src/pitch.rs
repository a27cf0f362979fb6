//! Descarga del pitch deck desde el storage y codificación para el modelo.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{info, warn};
use url::Url;

use crate::config::StorageConfig;
use crate::models::PitchAsset;

/// Fichero crudo tal y como lo devuelve el storage.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Capacidad mínima que necesitamos del storage: bajar un fichero por ruta.
#[async_trait]
pub trait PitchStorage: Send + Sync {
    async fn download(&self, bucket: &str, path: &str) -> Result<StoredFile>;
}

/// Storage de Supabase (`/storage/v1/object/{bucket}/{path}`).
pub struct SupabaseStorage {
    http: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn from_config(cfg: &StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: cfg.url.clone(),
            service_key: cfg.service_key.clone(),
        }
    }
}

#[async_trait]
impl PitchStorage for SupabaseStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<StoredFile> {
        let resp = self
            .http
            .get(format!("{}/storage/v1/object/{bucket}/{path}", self.url))
            .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
            .header("apikey", &self.service_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("El storage respondió {status}: {body}"));
        }

        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = resp.bytes().await?.to_vec();
        Ok(StoredFile { bytes, mime_type })
    }
}

/// Obtiene el pitch deck de una entrega. Sin storage configurado siempre
/// devuelve `None`.
#[derive(Clone)]
pub struct PitchFetcher {
    storage: Option<Arc<dyn PitchStorage>>,
    bucket: String,
}

impl PitchFetcher {
    pub fn new(storage: Option<Arc<dyn PitchStorage>>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Ruta dentro del bucket a partir de una URL que contiene `/{bucket}/`.
    pub fn resolve_path(&self, file_url: &str) -> Option<String> {
        let url = Url::parse(file_url).ok()?;
        let marker = format!("/{}/", self.bucket);
        let (_, path) = url.path().split_once(marker.as_str())?;
        (!path.is_empty()).then(|| path.to_string())
    }

    /// Nunca propaga errores: un pitch deck es contexto opcional.
    pub async fn fetch(&self, file_url: &str) -> Option<PitchAsset> {
        let Some(storage) = &self.storage else {
            warn!("Storage no configurado, se omite el pitch deck");
            return None;
        };
        let Some(path) = self.resolve_path(file_url) else {
            warn!("La URL del pitch deck no contiene '/{}/': {file_url}", self.bucket);
            return None;
        };

        info!("Descargando pitch deck: {path}");
        let file = match storage.download(&self.bucket, &path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Error descargando el pitch deck: {e}");
                return None;
            }
        };

        let mime_type = file
            .mime_type
            .filter(|m| !m.is_empty())
            .or_else(|| mime_guess::from_path(&path).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let size = file.bytes.len();
        info!("Pitch deck descargado, {size} bytes ({mime_type})");
        Some(PitchAsset {
            data: STANDARD.encode(&file.bytes),
            mime_type,
            size,
        })
    }
}
