//! Modelos de dominio: la entrega a analizar, los datos de enriquecimiento
//! (GitHub, pitch deck) y el resultado estructurado del análisis.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Entrada inmutable de una ejecución de análisis.
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    pub team_name: String,
    pub project_title: String,
    pub description: String,
    pub github_link: Option<String>,
    pub demo_link: Option<String>,
    pub pitch_file_url: Option<String>,
}

/// Un commit resumido tal y como se incluye en el prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub message: String,
    pub date: Option<DateTime<Utc>>,
    pub author: String,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorSummary {
    pub login: String,
    pub contributions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestStats {
    pub total: usize,
    pub merged: usize,
    pub open: usize,
}

/// Datos del repositorio de GitHub. Cada campo cae a su valor vacío si la
/// petición correspondiente falla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEnrichment {
    pub repository: String,
    pub readme: Option<String>,
    pub total_commits: usize,
    /// Los 30 commits más recientes.
    pub commits: Vec<CommitSummary>,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub language: String,
    pub languages: BTreeMap<String, u64>,
    pub description: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    /// Top 10 por contribuciones.
    pub contributors: Vec<ContributorSummary>,
    pub pull_requests: PullRequestStats,
}

impl RepositoryEnrichment {
    /// Registro con todos los campos a su valor por defecto.
    pub fn empty(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            readme: None,
            total_commits: 0,
            commits: Vec::new(),
            stars: 0,
            forks: 0,
            watchers: 0,
            open_issues: 0,
            language: "Unknown".to_string(),
            languages: BTreeMap::new(),
            description: String::new(),
            created_at: None,
            updated_at: None,
            first_commit: None,
            last_commit: None,
            contributors: Vec::new(),
            pull_requests: PullRequestStats::default(),
        }
    }

    /// `true` si ninguna de las peticiones aportó datos.
    pub fn is_empty(&self) -> bool {
        self.readme.is_none()
            && self.total_commits == 0
            && self.contributors.is_empty()
            && self.languages.is_empty()
            && self.pull_requests.total == 0
            && self.created_at.is_none()
            && self.stars == 0
            && self.forks == 0
    }
}

/// Pitch deck descargado y codificado en base64 para enviarlo al modelo.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchAsset {
    pub data: String,
    pub mime_type: String,
    pub size: usize,
}

/// Resultado estructurado del análisis. Es también el objeto JSON que se le
/// pide al modelo.
///
/// El modelo no siempre respeta los tipos: los scores pueden llegar como
/// `null`, como texto (`"8"`) o faltar, y las listas como una sola cadena.
/// Todo se acepta tal cual; nada de eso invalida el resto del análisis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub technical_assessment: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub innovation_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub completeness_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub github_activity_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub pitch_quality_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub potential_impact: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub areas_for_improvement: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub overall_recommendation: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub final_score: Option<f64>,
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Número, cadena numérica o `null`. Cualquier otra cosa cuenta como ausente.
fn lenient_score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .map(value_to_text)
        .unwrap_or_default())
}

fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(value_to_text).collect(),
        Some(other) => vec![value_to_text(other)],
    })
}

/// Respuesta completa del endpoint de análisis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisResult,
    pub github_data: Option<RepositoryEnrichment>,
}
