//! Errores que cruzan la frontera del análisis.
//!
//! Sólo la configuración y la llamada al modelo pueden fallar; el resto
//! (GitHub, pitch deck, parseo de la respuesta) se degrada en el sitio.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Falta una credencial obligatoria (p. ej. la API key de Gemini).
    #[error("{0}")]
    Config(String),

    /// El endpoint de IA respondió con error o sin texto.
    #[error("Failed to analyze submission: {0}")]
    ModelUnavailable(String),
}
