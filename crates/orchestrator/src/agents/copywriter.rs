use sitesmith_core::{AgentKind, Artifact, PageCopy};

use super::parse::markdown_sections;
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Copywriter of a landing-page studio. Using the strategic brief, write \
conversion-focused copy for every requested section. Start each section with a markdown \
heading naming it (for example `# Hero`). Give the hero a headline, a subheadline and a \
call to action. Keep sentences short and concrete.";

pub struct CopywriterAgent;

impl Agent for CopywriterAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Copywriter
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let strategy = input.require_strategy()?;
        let mut prompt = format!(
            "Here is the strategic brief:\n\n{}\n\nInclude these sections: {}",
            strategy.summary,
            input.template.section_list()
        );

        let language = input.language;
        if !language.is_default() {
            prompt.push_str(&format!(
                "\n\nIMPORTANT: Write ALL content in {}. Text direction is {}. \
                 Adapt tone and cultural references for a {}-speaking audience.",
                language.name,
                language.direction.as_str().to_uppercase(),
                language.name
            ));
        }
        Ok(prompt)
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let sections = markdown_sections(raw);
        if sections.is_empty() {
            return Err(AgentError::validation(
                "copy has no sections; start each section with a markdown heading",
            ));
        }

        let headline = sections
            .first()
            .and_then(|s| s.body.lines().find(|l| !l.trim().is_empty()))
            .map(|l| l.trim().trim_matches('*').trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(Artifact::Copy(PageCopy {
            raw: raw.trim().to_string(),
            headline,
            sections,
        }))
    }
}
