//! Cliente de la API REST de GitHub para enriquecer una entrega.
//!
//! Cada sub-recurso (README, commits, metadatos, contributors, lenguajes,
//! pull requests) se pide de forma independiente y en paralelo. Si una
//! petición falla, ese campo queda a su valor por defecto y el resto sigue.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::{CommitSummary, ContributorSummary, PullRequestStats, RepositoryEnrichment};

pub const README_MAX_CHARS: usize = 8000;
pub const COMMITS_PAGE_SIZE: usize = 100;
pub const PULLS_PAGE_SIZE: usize = 50;
pub const MAX_COMMITS_KEPT: usize = 30;
pub const MAX_CONTRIBUTORS_KEPT: usize = 10;

const CLIENT_USER_AGENT: &str = concat!("hackathon-judge/", env!("CARGO_PKG_VERSION"));

// --- Tipos de la API (sólo los campos que usamos) ---

#[derive(Debug, Deserialize)]
struct ApiCommit {
    commit: ApiCommitDetail,
    #[serde(default)]
    stats: Option<ApiCommitStats>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCommitStats {
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ApiRepo {
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    watchers_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContributor {
    #[serde(default)]
    login: String,
    #[serde(default)]
    contributions: u64,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    #[serde(default)]
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
}

/// Extrae `(owner, repo)` de una URL de GitHub. Quita el sufijo `.git`.
pub fn parse_repo_url(url: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/\s?#]+)/([^/\s?#]+)").expect("regex de GitHub válida")
    });

    let caps = re.captures(url)?;
    let owner = caps.get(1)?.as_str().to_string();
    let repo = caps.get(2)?.as_str().trim_end_matches(".git").to_string();
    if repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// Cliente de GitHub de un solo intento, sin reintentos.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Devuelve `None` si la URL no tiene forma `github.com/owner/repo`.
    pub async fn enrich(&self, repository_url: &str) -> Option<RepositoryEnrichment> {
        let Some((owner, repo)) = parse_repo_url(repository_url) else {
            warn!("URL de GitHub no reconocida, se omite el enriquecimiento: {repository_url}");
            return None;
        };
        info!("Obteniendo datos de GitHub para {owner}/{repo}");

        let base = format!("repos/{owner}/{repo}");
        let commits_path = format!("{base}/commits?per_page={COMMITS_PAGE_SIZE}");
        let readme_path = format!("{base}/readme");
        let contributors_path = format!("{base}/contributors");
        let languages_path = format!("{base}/languages");
        let pulls_path = format!("{base}/pulls?state=all&per_page={PULLS_PAGE_SIZE}");

        // Todas las peticiones son independientes; cada una absorbe su propio error.
        let (readme, commits, repo_info, contributors, languages, pulls) = futures::join!(
            self.get_text(&readme_path, "application/vnd.github.v3.raw"),
            self.get_json::<Vec<ApiCommit>>(&commits_path),
            self.get_json::<ApiRepo>(&base),
            self.get_json::<Vec<ApiContributor>>(&contributors_path),
            self.get_json::<BTreeMap<String, u64>>(&languages_path),
            self.get_json::<Vec<ApiPull>>(&pulls_path),
        );

        let commits = commits.unwrap_or_default();
        let repo_info = repo_info.unwrap_or_default();
        let contributors = contributors.unwrap_or_default();
        let pulls = pulls.unwrap_or_default();

        let mut enrichment = RepositoryEnrichment::empty(format!("{owner}/{repo}"));
        enrichment.readme = readme.map(|text| truncate_chars(&text, README_MAX_CHARS));
        enrichment.total_commits = commits.len();
        (enrichment.first_commit, enrichment.last_commit) = commit_span(&commits);
        enrichment.commits = commits.into_iter().take(MAX_COMMITS_KEPT).map(summarize_commit).collect();
        enrichment.stars = repo_info.stargazers_count;
        enrichment.forks = repo_info.forks_count;
        enrichment.watchers = repo_info.watchers_count;
        enrichment.open_issues = repo_info.open_issues_count;
        if let Some(language) = repo_info.language {
            enrichment.language = language;
        }
        enrichment.languages = languages.unwrap_or_default();
        enrichment.description = repo_info.description.unwrap_or_default();
        enrichment.created_at = repo_info.created_at;
        enrichment.updated_at = repo_info.updated_at;
        enrichment.contributors = contributors
            .into_iter()
            .take(MAX_CONTRIBUTORS_KEPT)
            .map(|c| ContributorSummary {
                login: c.login,
                contributions: c.contributions,
            })
            .collect();
        enrichment.pull_requests = PullRequestStats {
            total: pulls.len(),
            merged: pulls.iter().filter(|pr| pr.merged_at.is_some()).count(),
            open: pulls.iter().filter(|pr| pr.state == "open").count(),
        };

        info!(
            commits = enrichment.total_commits,
            contributors = enrichment.contributors.len(),
            prs = enrichment.pull_requests.total,
            "Datos de GitHub obtenidos"
        );
        Some(enrichment)
    }

    fn request(&self, path: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .get(format!("{}/{}", self.api_url, path))
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, accept);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        req
    }

    async fn send(&self, path: &str, accept: &str) -> Option<reqwest::Response> {
        match self.request(path, accept).send().await {
            Ok(resp) if resp.status().is_success() => Some(resp),
            Ok(resp) => {
                warn!("GitHub respondió {} para {path}", resp.status());
                None
            }
            Err(e) => {
                warn!("Error de red consultando GitHub ({path}): {e}");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let resp = self.send(path, "application/vnd.github+json").await?;
        match resp.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Respuesta de GitHub no válida para {path}: {e}");
                None
            }
        }
    }

    async fn get_text(&self, path: &str, accept: &str) -> Option<String> {
        let resp = self.send(path, accept).await?;
        resp.text()
            .await
            .map_err(|e| debug!("No se pudo leer el cuerpo de {path}: {e}"))
            .ok()
    }
}

fn summarize_commit(c: ApiCommit) -> CommitSummary {
    let stats = c.stats.unwrap_or_default();
    let (author, date) = match c.commit.author {
        Some(a) => (a.name, a.date),
        None => (String::new(), None),
    };
    CommitSummary {
        message: c.commit.message,
        date,
        author,
        additions: stats.additions,
        deletions: stats.deletions,
    }
}

/// Primer y último commit según la fecha de autor.
fn commit_span(commits: &[ApiCommit]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let dates = commits
        .iter()
        .filter_map(|c| c.commit.author.as_ref().and_then(|a| a.date));
    dates.fold((None, None), |(min, max), d| {
        (
            Some(min.map_or(d, |m: DateTime<Utc>| m.min(d))),
            Some(max.map_or(d, |m: DateTime<Utc>| m.max(d))),
        )
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
