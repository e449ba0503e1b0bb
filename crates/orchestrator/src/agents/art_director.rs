use sitesmith_core::{AgentKind, Artifact, DesignTokens};

use super::parse::extract_json;
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Art Director of a landing-page studio. From the strategic brief, define the \
visual identity as a single JSON object. Required keys, each a hex color such as \
\"#1a2b3c\": primary_color, secondary_color, background_color, text_color, accent_color. \
Optional keys: heading_font, body_font, border_radius, spacing, shadow_style, \
image_style. Return only the JSON.";

pub struct ArtDirectorAgent;

impl Agent for ArtDirectorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ArtDirector
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let strategy = input.require_strategy()?;
        Ok(format!(
            "Here is the strategic brief:\n\n{}\n\nTemplate style hint: {}",
            strategy.summary, input.template.style_hints
        ))
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let json = extract_json(raw);
        let tokens: DesignTokens = serde_json::from_str(&json)?;
        tokens
            .validate()
            .map_err(|e| AgentError::validation(e.to_string()))?;
        Ok(Artifact::Design(tokens))
    }
}
