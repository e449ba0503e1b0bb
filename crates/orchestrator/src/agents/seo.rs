use sitesmith_core::{AgentKind, Artifact, PageArtifact};

use super::parse::{contains_ignore_case, extract_html};
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the SEO Optimizer of a landing-page studio. Improve the HTML for search engines \
and social sharing without changing its visible copy or layout: a descriptive <title>, a \
meta description, Open Graph and Twitter tags, a canonical link, schema.org JSON-LD for \
the business, and correct heading hierarchy. Return the complete HTML document.";

pub struct SeoOptimizerAgent;

impl Agent for SeoOptimizerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SeoOptimizer
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let page = input.require_page()?;
        let mut prompt = format!("Optimize this HTML for SEO:\n\n```html\n{}\n```", page.html);
        let description = input.business_description.trim();
        if !description.is_empty() {
            prompt.push_str(&format!("\n\nBusiness description: {description}"));
        }
        if let Ok(strategy) = input.require_strategy() {
            prompt.push_str(&format!(
                "\n\nStrategic keywords and context:\n{}",
                strategy.summary
            ));
        }
        Ok(prompt)
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let html = extract_html(raw);
        if !contains_ignore_case(&html, "</html>") {
            return Err(AgentError::validation("missing closing </html> tag"));
        }
        if !contains_ignore_case(&html, "<title") {
            return Err(AgentError::validation("missing <title> tag"));
        }
        if !contains_ignore_case(&html, "name=\"description\"") {
            return Err(AgentError::validation("missing meta description"));
        }
        Ok(Artifact::Page(PageArtifact::new(html)))
    }
}
