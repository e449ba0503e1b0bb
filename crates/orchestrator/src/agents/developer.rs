use sitesmith_core::{AgentKind, Artifact, PageArtifact, ReviewIssue};

use super::parse::{contains_ignore_case, extract_html};
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the Developer of a landing-page studio. Build a complete, responsive, single-file \
HTML landing page from the copy and the design tokens. Use semantic HTML5, accessible \
markup and inline CSS or a CSS CDN. Use the provided copy verbatim. Return the full \
document starting with <!DOCTYPE html> and ending with </html>.";

pub struct DeveloperAgent;

pub(crate) fn issue_list(issues: &[ReviewIssue]) -> String {
    issues
        .iter()
        .map(|issue| {
            format!(
                "- [{}] {}: {}",
                issue.severity.as_str().to_uppercase(),
                issue.description,
                issue.fix_suggestion
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl DeveloperAgent {
    fn build_fix_prompt(page: &PageArtifact, issues: &[ReviewIssue]) -> String {
        format!(
            "Fix the following issues in this HTML:\n\n{}\n\n\
             Current HTML:\n```html\n{}\n```\n\n\
             Return the COMPLETE fixed HTML. Start with <!DOCTYPE html> and end with </html>.",
            issue_list(issues),
            page.html
        )
    }
}

impl Agent for DeveloperAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Developer
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        if !input.issues.is_empty() {
            let page = input.require_page()?;
            return Ok(Self::build_fix_prompt(page, &input.issues));
        }

        let copy = input.require_copy()?;
        let design = input
            .design_json()
            .ok_or_else(|| AgentError::MissingInput("design artifact".to_string()))?;
        Ok(format!(
            "Here is the website copy:\n\n{}\n\n---\n\n\
             Here is the design specification (JSON):\n\n{}\n\n---\n\n\
             The business description: {}\n\n\
             Sections, in order: {}\nStyle: {}\nDocument language: {} ({})",
            copy.raw,
            design,
            input.business_description.trim(),
            input.template.section_list(),
            input.template.style_hints,
            input.language.code,
            input.language.direction.as_str()
        ))
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let html = extract_html(raw);
        if !contains_ignore_case(&html, "<!DOCTYPE html>") {
            return Err(AgentError::validation("missing <!DOCTYPE html> declaration"));
        }
        if !contains_ignore_case(&html, "</html>") {
            return Err(AgentError::validation("missing closing </html> tag"));
        }
        Ok(Artifact::Page(PageArtifact::new(html)))
    }
}
