use sitesmith_core::{AgentKind, Artifact, ReviewReport};

use super::parse::extract_json;
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Reviewer of a landing-page studio. Audit the HTML for broken structure, \
accessibility, responsiveness, and faithfulness to the design specification. Respond \
with one JSON object: {\"score\": 0-100, \"pass\": true|false, \"issues\": [{\"severity\": \
\"critical\"|\"warning\"|\"info\", \"category\": \"...\", \"description\": \"...\", \
\"fix_suggestion\": \"...\"}], \"summary\": \"...\"}. Set pass to true only when \
nothing critical remains.";

pub struct ReviewerAgent;

impl Agent for ReviewerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Reviewer
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let page = input.require_page()?;
        let mut prompt = format!("Review this HTML landing page:\n\n```html\n{}\n```", page.html);
        if let Some(design) = input.design_json() {
            prompt.push_str(&format!(
                "\n\nThe intended design specification was:\n{design}"
            ));
        }
        Ok(prompt)
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let json = extract_json(raw);
        let report: ReviewReport = serde_json::from_str(&json)?;
        Ok(Artifact::Review(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_core::{ArtifactKey, IssueSeverity, PageArtifact};

    #[test]
    fn test_parse_report() {
        let raw = r#"Here is my review:
```json
{"score": 72, "pass": false, "issues": [
  {"severity": "critical", "category": "a11y", "description": "No alt text", "fix_suggestion": "Add alt"},
  {"severity": "info", "description": "Consider lazy loading"}
], "summary": "Close"}
```"#;
        let artifact = ReviewerAgent.parse_output(raw).unwrap();
        let report = artifact.as_review().unwrap();
        assert_eq!(report.score, 72.0);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[1].severity, IssueSeverity::Info);
        assert!(!report.verdict().is_approved());
    }

    #[test]
    fn test_missing_pass_field_is_invalid() {
        let err = ReviewerAgent
            .parse_output(r#"{"score": 90, "issues": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("pass"));
    }

    #[test]
    fn test_prompt_embeds_page() {
        let input = AgentInput::new("coffee", "landing", "en").with_artifact(
            ArtifactKey::Page,
            Artifact::Page(PageArtifact::new("<!DOCTYPE html><html>cafe</html>")),
        );
        let prompt = ReviewerAgent.build_prompt(&input).unwrap();
        assert!(prompt.contains("cafe"));
        assert!(!prompt.contains("design specification"));
    }
}
