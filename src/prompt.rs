//! Construcción del prompt de evaluación.
//!
//! Función pura: mismas entradas, mismo texto. Cada entrada opcional
//! (GitHub, pitch deck, demo) se renderiza en uno de tres bloques: con datos,
//! presente pero vacía, o ausente. La rúbrica es siempre la misma.

use crate::models::{PitchAsset, RepositoryEnrichment, SubmissionContext};

pub const NO_GITHUB: &str = "No GitHub repository provided.";
pub const NO_PITCH: &str = "No pitch deck provided.";
pub const NO_DEMO: &str = "No demo link provided.";

const PREAMBLE: &str = "You are an expert hackathon judge with deep technical expertise. \
Analyze this project submission thoroughly and provide detailed, accurate insights.";

const RUBRIC: &str = r#"SCORING CRITERIA (Be precise and justify each score):

1. **Technical Assessment** (Detailed analysis):
   - Code quality and architecture
   - Technology stack appropriateness
   - Implementation complexity
   - Best practices adherence
   - Scalability and performance considerations

2. **Innovation Score** (1-10):
   - Originality of the idea
   - Creative use of technology
   - Novel problem-solving approach
   - Market differentiation

3. **Completeness Score** (1-10):
   - Feature completeness
   - Documentation quality
   - Testing coverage
   - Production readiness
   - Polish and user experience

4. **GitHub Activity Score** (1-10):
   - Commit frequency and quality
   - Team collaboration effectiveness
   - Code review practices
   - Development velocity
   - Documentation maintenance

5. **Pitch Quality Score** (1-10, if pitch provided):
   - Presentation clarity
   - Business model viability
   - Market understanding
   - Value proposition strength
   - Visual design quality

6. **Potential Impact**:
   - Real-world applicability
   - Target audience size
   - Problem significance
   - Scalability potential

7. **Strengths** (List 3-5 specific strengths)

8. **Areas for Improvement** (List 3-5 specific, actionable suggestions)

9. **Overall Recommendation** (Detailed summary with final thoughts)

10. **Final Overall Score** (1-100):
    Calculate weighted average:
    - Technical (25%)
    - Innovation (20%)
    - Completeness (20%)
    - GitHub Activity (15%)
    - Pitch Quality (10%, if available)
    - Impact (10%)

IMPORTANT:
- Be thorough and specific in your analysis
- Provide concrete examples from the code/commits
- Give actionable feedback
- Be fair but critical
- Justify all scores with evidence

Format your response as a valid JSON object with these exact keys:
{
  "technical_assessment": "string",
  "innovation_score": number (1-10),
  "completeness_score": number (1-10),
  "github_activity_score": number (1-10),
  "pitch_quality_score": number (1-10 or null),
  "potential_impact": "string",
  "strengths": ["string array"],
  "areas_for_improvement": ["string array"],
  "overall_recommendation": "string",
  "final_score": number (1-100)
}"#;

/// Ensambla el prompt completo a partir de la entrega y sus enriquecimientos.
pub fn build_prompt(
    ctx: &SubmissionContext,
    github: Option<&RepositoryEnrichment>,
    pitch: Option<&PitchAsset>,
) -> String {
    format!(
        "{PREAMBLE}\n\n\
PROJECT INFORMATION:\n\
- Team Name: {team}\n\
- Project Title: {title}\n\
- Description: {description}\n\n\
{pitch_block}\n\n\
{github_block}\n\n\
{demo_block}\n\n\
{RUBRIC}",
        team = ctx.team_name,
        title = ctx.project_title,
        description = ctx.description,
        pitch_block = pitch_section(pitch),
        github_block = github_section(ctx.github_link.as_deref(), github),
        demo_block = demo_section(ctx.demo_link.as_deref()),
    )
}

fn pitch_section(pitch: Option<&PitchAsset>) -> String {
    match pitch {
        None => NO_PITCH.to_string(),
        Some(p) if p.size == 0 => format!(
            "PITCH DECK:\nA {} pitch deck was submitted but the file is empty. \
Set pitch_quality_score to null.",
            p.mime_type
        ),
        Some(p) => format!(
            "PITCH DECK ANALYSIS:\n\
A {} pitch deck has been submitted ({:.2} KB).\n\
Please analyze the pitch deck structure, content quality, presentation style, and business viability.\n\
The pitch deck is provided as base64 data for your analysis.",
            p.mime_type,
            p.size as f64 / 1024.0
        ),
    }
}

fn github_section(link: Option<&str>, github: Option<&RepositoryEnrichment>) -> String {
    let Some(data) = github else {
        return NO_GITHUB.to_string();
    };
    let repository = link.unwrap_or(data.repository.as_str());

    if data.is_empty() {
        return format!(
            "GITHUB REPOSITORY:\nRepository: {repository}\n\
The repository was provided but no data could be retrieved from GitHub \
(it may be private, missing or rate-limited). Judge GitHub activity from the description only."
        );
    }

    let languages = serde_json::to_string(&data.languages).unwrap_or_default();
    let commits = serde_json::to_string_pretty(&data.commits).unwrap_or_default();
    let contributors = serde_json::to_string_pretty(&data.contributors).unwrap_or_default();
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());

    format!(
        "GITHUB REPOSITORY DEEP ANALYSIS:\n\
Repository: {repository}\n\
- Main Language: {language}\n\
- All Languages Used: {languages}\n\
- Stars: {stars} | Forks: {forks} | Watchers: {watchers}\n\
- Open Issues: {issues}\n\
- Created: {created}\n\
- Last Updated: {updated}\n\
- First Commit: {first}\n\
- Last Commit: {last}\n\
- Repository Description: {description}\n\n\
COMMIT ACTIVITY (Total: {total} commits):\n{commits}\n\n\
CONTRIBUTORS ({contributor_count} total):\n{contributors}\n\n\
PULL REQUESTS:\n\
- Total: {pr_total}\n\
- Merged: {pr_merged}\n\
- Open: {pr_open}\n\n\
README CONTENT:\n{readme}\n\n\
ANALYSIS FOCUS:\n\
- Assess commit frequency, quality, and consistency\n\
- Evaluate code structure and architecture from commit messages\n\
- Analyze team collaboration through contributor activity\n\
- Review development practices (PRs, code reviews)\n\
- Assess project documentation quality",
        language = data.language,
        stars = data.stars,
        forks = data.forks,
        watchers = data.watchers,
        issues = data.open_issues,
        created = or_unknown(data.created_at.clone()),
        updated = or_unknown(data.updated_at.clone()),
        first = or_unknown(data.first_commit.map(|d| d.to_rfc3339())),
        last = or_unknown(data.last_commit.map(|d| d.to_rfc3339())),
        description = data.description,
        total = data.total_commits,
        contributor_count = data.contributors.len(),
        pr_total = data.pull_requests.total,
        pr_merged = data.pull_requests.merged,
        pr_open = data.pull_requests.open,
        readme = data.readme.as_deref().unwrap_or("No README available"),
    )
}

fn demo_section(demo: Option<&str>) -> String {
    match demo {
        None => NO_DEMO.to_string(),
        Some(link) if link.trim().is_empty() => {
            "DEMO LINK: the demo field was left blank; treat the project as having no live demo."
                .to_string()
        }
        Some(link) => format!(
            "DEMO LINK: {link}\nPlease consider the availability and quality of the live demo in your assessment."
        ),
    }
}
