use sitesmith_core::{AgentKind, Artifact, Strategy};

use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Strategist of a landing-page studio. Read the business description and \
produce a concise strategic brief in markdown: target audience, value proposition, \
positioning against competitors, brand tone, primary conversion goal, SEO keywords, and \
the recommended page sections in order. Be specific to this business.";

pub struct StrategistAgent;

impl Agent for StrategistAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Strategist
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let description = input.require_description()?;
        Ok(format!(
            "Business Description:\n{description}\n\n\
             Template Style Hint: {}\n\n\
             Preferred Sections: {}",
            input.template.style_hints,
            input.template.section_list()
        ))
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let summary = raw.trim();
        if summary.is_empty() {
            return Err(AgentError::validation("strategy is empty"));
        }
        Ok(Artifact::Strategy(Strategy {
            summary: summary.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_template_hints() {
        let input = AgentInput::new("artisanal coffee shop", "restaurant", "en");
        let prompt = StrategistAgent.build_prompt(&input).unwrap();
        assert!(prompt.contains("artisanal coffee shop"));
        assert!(prompt.contains("Warm colors"));
        assert!(prompt.contains("gallery"));
    }

    #[test]
    fn test_empty_output_is_invalid() {
        assert!(matches!(
            StrategistAgent.parse_output("  \n"),
            Err(AgentError::Validation(_))
        ));
    }
}
