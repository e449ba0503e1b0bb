use sitesmith_core::{AgentKind, Artifact, PageArtifact};

use super::parse::{contains_ignore_case, extract_html};
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Refinement editor of a landing-page studio. Apply the user's requested change \
to the existing HTML and keep everything else intact. Return the COMPLETE modified HTML \
document.";

pub struct RefinementAgent;

impl Agent for RefinementAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Refinement
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let page = input.require_page()?;
        let instruction = input
            .instruction
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| AgentError::MissingInput("refinement instruction".to_string()))?;
        Ok(format!(
            "Current HTML code:\n\n```html\n{}\n```\n\n\
             User's modification request:\n{instruction}\n\n\
             Apply the requested changes and return the COMPLETE modified HTML.",
            page.html
        ))
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let html = extract_html(raw);
        if !contains_ignore_case(&html, "</html>") {
            return Err(AgentError::validation("missing closing </html> tag"));
        }
        Ok(Artifact::Page(PageArtifact::new(html)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_core::ArtifactKey;

    #[test]
    fn test_prompt_carries_instruction() {
        let input = AgentInput::new("", "landing", "en")
            .with_artifact(
                ArtifactKey::Page,
                Artifact::Page(PageArtifact::new("<html></html>")),
            )
            .with_instruction("Make the hero button green");
        let prompt = RefinementAgent.build_prompt(&input).unwrap();
        assert!(prompt.contains("Make the hero button green"));
    }

    #[test]
    fn test_blank_instruction_is_missing_input() {
        let input = AgentInput::new("", "landing", "en")
            .with_artifact(
                ArtifactKey::Page,
                Artifact::Page(PageArtifact::new("<html></html>")),
            )
            .with_instruction("  ");
        assert!(matches!(
            RefinementAgent.build_prompt(&input),
            Err(AgentError::MissingInput(_))
        ));
    }
}
