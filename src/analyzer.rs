//! Orquestación del análisis de una entrega.
//!
//! Flujo:
//!   1. Enriquecimiento en paralelo: GitHub ∥ pitch deck (fallos absorbidos).
//!   2. Construcción del prompt.
//!   3. Llamada al modelo (único fallo que se propaga).
//!   4. Extracción del resultado con respaldo garantizado.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AnalysisError,
    extract,
    github::GithubClient,
    llm::{AnalysisModel, GeminiClient},
    models::{AnalysisResponse, SubmissionContext},
    pitch::{PitchFetcher, PitchStorage, SupabaseStorage},
    prompt,
};

/// Sin estado compartido entre ejecuciones; se puede clonar libremente.
#[derive(Clone)]
pub struct SubmissionAnalyzer {
    github: GithubClient,
    pitch: PitchFetcher,
    model: Arc<dyn AnalysisModel>,
}

impl SubmissionAnalyzer {
    pub fn new(github: GithubClient, pitch: PitchFetcher, model: Arc<dyn AnalysisModel>) -> Self {
        Self { github, pitch, model }
    }

    /// Valida la configuración al arrancar: sin API key no hay analizador.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AnalysisError> {
        let model = GeminiClient::from_config(cfg)?;
        let github = GithubClient::new(&cfg.github_api_url, cfg.github_token.clone());
        let pitch = match &cfg.storage {
            Some(storage) => {
                let backend: Arc<dyn PitchStorage> = Arc::new(SupabaseStorage::from_config(storage));
                PitchFetcher::new(Some(backend), storage.bucket.clone())
            }
            None => {
                warn!("SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY ausentes: análisis de pitch desactivado");
                PitchFetcher::new(None, crate::config::DEFAULT_PITCH_BUCKET)
            }
        };
        Ok(Self::new(github, pitch, Arc::new(model)))
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn pitch_enabled(&self) -> bool {
        self.pitch.is_enabled()
    }

    pub async fn analyze(&self, ctx: SubmissionContext) -> Result<AnalysisResponse, AnalysisError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id, project = %ctx.project_title);
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: SubmissionContext) -> Result<AnalysisResponse, AnalysisError> {
        info!(
            team = %ctx.team_name,
            github = ctx.github_link.as_deref().unwrap_or("-"),
            "Iniciando análisis"
        );

        // 1) GitHub y pitch deck son independientes: se lanzan a la vez.
        let github_fut = async {
            match ctx.github_link.as_deref() {
                Some(link) => self.github.enrich(link).await,
                None => None,
            }
        };
        let pitch_fut = async {
            match ctx.pitch_file_url.as_deref() {
                Some(url) => self.pitch.fetch(url).await,
                None => None,
            }
        };
        let (github_data, pitch_asset) = futures::join!(github_fut, pitch_fut);

        // 2) Prompt
        let prompt_text = prompt::build_prompt(&ctx, github_data.as_ref(), pitch_asset.as_ref());

        // 3) Modelo
        let raw = self.model.generate(&prompt_text, pitch_asset.as_ref()).await?;
        info!("Respuesta del modelo recibida ({} caracteres)", raw.chars().count());

        // 4) Extracción
        let analysis = extract::extract(&raw, github_data.is_some(), pitch_asset.is_some());
        info!(final_score = analysis.final_score, "Análisis completado");

        Ok(AnalysisResponse {
            analysis,
            github_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PitchAsset;
    use crate::pitch::StoredFile;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Modelo falso que registra los prompts recibidos.
    #[derive(Default)]
    struct RecordingModel {
        reply: Option<String>,
        prompts: Mutex<Vec<(String, bool)>>,
    }

    impl RecordingModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(text.to_string()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl AnalysisModel for RecordingModel {
        async fn generate(
            &self,
            prompt: &str,
            pitch: Option<&PitchAsset>,
        ) -> Result<String, AnalysisError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), pitch.is_some()));
            self.reply
                .clone()
                .ok_or_else(|| AnalysisError::ModelUnavailable("503 overloaded".into()))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct PdfStorage;

    #[async_trait]
    impl PitchStorage for PdfStorage {
        async fn download(&self, _bucket: &str, _path: &str) -> anyhow::Result<StoredFile> {
            Ok(StoredFile {
                bytes: b"%PDF-1.7".to_vec(),
                mime_type: Some("application/pdf".into()),
            })
        }
    }

    fn analyzer(model: Arc<RecordingModel>, storage: Option<Arc<dyn PitchStorage>>) -> SubmissionAnalyzer {
        SubmissionAnalyzer::new(
            // Puerto cerrado: todas las peticiones a GitHub fallan.
            GithubClient::new("http://127.0.0.1:1", None),
            PitchFetcher::new(storage, "pitch-files"),
            model,
        )
    }

    fn todo_app() -> SubmissionContext {
        SubmissionContext {
            team_name: "Team".into(),
            project_title: "Todo".into(),
            description: "A todo app".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn bare_submission_gets_a_scored_result() {
        let model = RecordingModel::replying("I liked it, 8/10.");
        let response = analyzer(model.clone(), None).analyze(todo_app()).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("No GitHub repository provided."));
        assert!(prompts[0].0.contains("No pitch deck provided."));
        assert!(!prompts[0].1);

        assert!(response.github_data.is_none());
        let score = response.analysis.final_score.unwrap();
        assert!((1.0..=100.0).contains(&score));
        assert_eq!(response.analysis.github_activity_score, Some(0.0));
        assert_eq!(response.analysis.pitch_quality_score, None);
    }

    #[tokio::test]
    async fn failing_github_still_reaches_the_model() {
        let model = RecordingModel::replying(
            r#"{"innovation_score": 6, "completeness_score": 5, "github_activity_score": 2, "final_score": 55}"#,
        );
        let mut ctx = todo_app();
        ctx.github_link = Some("https://github.com/acme/rocket".into());

        let response = analyzer(model.clone(), None).analyze(ctx).await.unwrap();

        let data = response.github_data.unwrap();
        assert_eq!(data.total_commits, 0);
        assert!(data.contributors.is_empty());
        assert_eq!(data.stars, 0);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
        assert_eq!(response.analysis.final_score, Some(55.0));
    }

    #[tokio::test]
    async fn pitch_is_attached_and_reflected_in_fallback() {
        let model = RecordingModel::replying("not json at all");
        let mut ctx = todo_app();
        ctx.pitch_file_url =
            Some("https://proj.supabase.co/storage/v1/object/public/pitch-files/t/deck.pdf".into());

        let storage: Arc<dyn PitchStorage> = Arc::new(PdfStorage);
        let response = analyzer(model.clone(), Some(storage)).analyze(ctx).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].1);
        assert!(prompts[0].0.contains("PITCH DECK ANALYSIS"));
        assert_eq!(response.analysis.pitch_quality_score, Some(extract::FALLBACK_SUB_SCORE));
    }

    #[tokio::test]
    async fn model_failure_is_propagated() {
        let model = Arc::new(RecordingModel::default());
        let err = analyzer(model, None).analyze(todo_app()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
    }

    #[test]
    fn missing_api_key_prevents_construction() {
        let err = AppConfig::from_lookup(|_| None)
            .and_then(|cfg| SubmissionAnalyzer::from_config(&cfg))
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
