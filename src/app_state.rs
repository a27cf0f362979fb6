use std::sync::Arc;

use crate::{analyzer::SubmissionAnalyzer, config::AppConfig};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub analyzer: SubmissionAnalyzer,
}
