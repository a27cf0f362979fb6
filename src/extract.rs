//! Extracción del resultado estructurado a partir del texto del modelo.
//!
//! Se prueban estrategias en orden (JSON directo, bloque ```json, primer
//! objeto `{...}` balanceado). Cualquier objeto JSON vale, aunque le falten
//! campos o traiga scores mal tipados. Sólo si no aparece ningún objeto se
//! devuelve un registro de respaldo determinista: esta función nunca falla.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::AnalysisResult;

pub const FALLBACK_SUB_SCORE: f64 = 7.0;
pub const FALLBACK_FINAL_SCORE: f64 = 70.0;

type Strategy = fn(&str) -> Option<AnalysisResult>;

/// Cadena de estrategias, de la más estricta a la más laxa.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("json directo", parse_whole as Strategy),
    ("bloque de código", parse_fenced_block as Strategy),
    ("objeto balanceado", parse_first_object as Strategy),
];

pub fn extract(raw: &str, had_repo: bool, had_pitch: bool) -> AnalysisResult {
    for (name, strategy) in STRATEGIES {
        if let Some(result) = strategy(raw) {
            debug!("Respuesta del modelo parseada con la estrategia '{name}'");
            match result.final_score {
                Some(score) if !(1.0..=100.0).contains(&score) => {
                    warn!("final_score fuera de rango devuelto por el modelo: {score}")
                }
                None => warn!("El modelo no devolvió final_score"),
                _ => {}
            }
            return result;
        }
    }
    warn!("No se pudo parsear la respuesta del modelo, se usa el registro de respaldo");
    fallback(raw, had_repo, had_pitch)
}

/// Registro de respaldo. Los scores de GitHub y pitch reflejan si esas
/// entradas existían.
pub fn fallback(raw: &str, had_repo: bool, had_pitch: bool) -> AnalysisResult {
    AnalysisResult {
        technical_assessment: raw.to_string(),
        innovation_score: Some(FALLBACK_SUB_SCORE),
        completeness_score: Some(FALLBACK_SUB_SCORE),
        github_activity_score: Some(if had_repo { FALLBACK_SUB_SCORE } else { 0.0 }),
        pitch_quality_score: had_pitch.then_some(FALLBACK_SUB_SCORE),
        potential_impact: "Analysis completed - see technical assessment for details".to_string(),
        strengths: vec!["Detailed analysis available in technical assessment".to_string()],
        areas_for_improvement: vec![
            "See technical assessment for specific recommendations".to_string(),
        ],
        overall_recommendation: "Review technical assessment for comprehensive evaluation"
            .to_string(),
        final_score: Some(FALLBACK_FINAL_SCORE),
    }
}

/// Sólo objetos: `[]`, `"texto"` o `42` no son un análisis.
fn parse_object(text: &str) -> Option<AnalysisResult> {
    match serde_json::from_str::<Value>(text).ok()? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn parse_whole(raw: &str) -> Option<AnalysisResult> {
    parse_object(raw.trim())
}

fn parse_fenced_block(raw: &str) -> Option<AnalysisResult> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("regex de bloque válida")
    });
    re.captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_object(m.as_str()))
}

fn parse_first_object(raw: &str) -> Option<AnalysisResult> {
    parse_object(first_balanced_object(raw)?)
}

/// Primer tramo `{...}` con llaves balanceadas, ignorando las que aparecen
/// dentro de cadenas JSON.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "technical_assessment": "Solid axum backend with {braces} in prose",
            "innovation_score": 8,
            "completeness_score": 6,
            "github_activity_score": 5,
            "pitch_quality_score": null,
            "potential_impact": "Helps students",
            "strengths": ["clean code", "good docs"],
            "areas_for_improvement": ["add tests"],
            "overall_recommendation": "Promising",
            "final_score": 72
        })
    }

    #[test]
    fn plain_json_is_taken_verbatim() {
        let raw = sample().to_string();
        let result = extract(&raw, true, false);
        assert_eq!(serde_json::to_value(&result).unwrap()["strengths"], sample()["strengths"]);
        assert_eq!(result.innovation_score, Some(8.0));
        assert_eq!(result.final_score, Some(72.0));
        assert_eq!(result.pitch_quality_score, None);
        assert_eq!(result.technical_assessment, "Solid axum backend with {braces} in prose");
    }

    #[test]
    fn fenced_block_matches_unwrapped() {
        let plain = extract(&sample().to_string(), true, true);
        let fenced = format!(
            "Here is my evaluation:\n```json\n{}\n```\nGood luck!",
            serde_json::to_string_pretty(&sample()).unwrap()
        );
        assert_eq!(extract(&fenced, true, true), plain);

        let unlabeled = format!("```\n{}\n```", sample());
        assert_eq!(extract(&unlabeled, true, true), plain);
    }

    #[test]
    fn embedded_object_is_found() {
        let raw = format!("Sure! {} Let me know if you need more.", sample());
        assert_eq!(extract(&raw, false, false), extract(&sample().to_string(), false, false));
    }

    #[test]
    fn balanced_scan_skips_braces_in_strings() {
        let text = r#"noise {"a": "}{", "b": {"c": 1}} trailing }"#;
        assert_eq!(
            first_balanced_object(text),
            Some(r#"{"a": "}{", "b": {"c": 1}}"#)
        );
        assert_eq!(first_balanced_object("no braces"), None);
        assert_eq!(first_balanced_object("{ unclosed"), None);
    }

    #[test]
    fn non_json_falls_back_with_input_flags() {
        let raw = "The project is great but I cannot produce JSON today.";

        let none = extract(raw, false, false);
        assert_eq!(none.technical_assessment, raw);
        assert_eq!(none.github_activity_score, Some(0.0));
        assert_eq!(none.pitch_quality_score, None);
        assert_eq!(none.final_score, Some(FALLBACK_FINAL_SCORE));

        let both = extract(raw, true, true);
        assert!(both.github_activity_score.unwrap() > 0.0);
        assert_eq!(both.pitch_quality_score, Some(FALLBACK_SUB_SCORE));
        assert_eq!(both.innovation_score, Some(FALLBACK_SUB_SCORE));
    }

    #[test]
    fn null_scores_keep_the_model_analysis() {
        let raw = r#"{"technical_assessment": "Great work", "innovation_score": 8,
            "completeness_score": 7, "github_activity_score": null,
            "pitch_quality_score": null, "strengths": ["idea"], "final_score": 76}"#;
        let result = extract(raw, false, false);
        assert_eq!(result.technical_assessment, "Great work");
        assert_eq!(result.github_activity_score, None);
        assert_eq!(result.final_score, Some(76.0));
        assert_eq!(result.strengths, vec!["idea".to_string()]);
    }

    #[test]
    fn string_scores_are_read_as_numbers() {
        let raw = r#"```json
{"innovation_score": "8", "completeness_score": " 6.5 ", "github_activity_score": "n/a",
 "final_score": "81", "strengths": "single strength"}
```"#;
        let result = extract(raw, true, false);
        assert_eq!(result.innovation_score, Some(8.0));
        assert_eq!(result.completeness_score, Some(6.5));
        assert_eq!(result.github_activity_score, None);
        assert_eq!(result.final_score, Some(81.0));
        assert_eq!(result.strengths, vec!["single strength".to_string()]);
    }

    #[test]
    fn any_object_is_accepted_even_without_scores() {
        let raw = r#"{"overall_recommendation": "Ship it"}"#;
        let result = extract(raw, true, false);
        assert_eq!(result.overall_recommendation, "Ship it");
        assert_eq!(result.final_score, None);
        assert!(result.technical_assessment.is_empty());
    }

    #[test]
    fn non_object_json_falls_back() {
        for raw in ["[1, 2, 3]", "\"just a string\"", "42"] {
            let result = extract(raw, false, false);
            assert_eq!(result.technical_assessment, raw);
            assert_eq!(result.final_score, Some(FALLBACK_FINAL_SCORE));
        }
    }
}
