//! Helpers for pulling structured content out of model responses.

use regex::Regex;
use sitesmith_core::CopySection;
use std::sync::OnceLock;

/// Extracts a JSON object from a response that may wrap it in a code fence or prose.
pub fn extract_json(content: &str) -> String {
    if let Some(start) = content.find("```json") {
        let json_start = start + 7;
        if let Some(end) = content[json_start..].find("```") {
            return content[json_start..json_start + end].trim().to_string();
        }
    }

    if let Some(start) = content.find("```\n{") {
        if let Some(end) = content[start + 4..].find("\n```") {
            return content[start + 4..start + 4 + end].trim().to_string();
        }
    }

    if let Some(start) = content.find('{') {
        if let Some(end) = content.rfind('}') {
            if end > start {
                return content[start..=end].to_string();
            }
        }
    }

    content.trim().to_string()
}

struct HtmlPatterns {
    fenced: Regex,
    document: Regex,
}

static HTML_PATTERNS: OnceLock<Option<HtmlPatterns>> = OnceLock::new();

fn html_patterns() -> Option<&'static HtmlPatterns> {
    HTML_PATTERNS
        .get_or_init(|| {
            Some(HtmlPatterns {
                fenced: Regex::new(r"(?s)```(?:html|HTML)?[ \t]*\n?(.*?)\n?[ \t]*```").ok()?,
                document: Regex::new(r"(?is)(<!DOCTYPE html>.*</html>)").ok()?,
            })
        })
        .as_ref()
}

/// Extracts an HTML document from fenced or bare output.
pub fn extract_html(content: &str) -> String {
    if let Some(patterns) = html_patterns() {
        let caps = patterns
            .fenced
            .captures(content)
            .or_else(|| patterns.document.captures(content));
        if let Some(caps) = caps {
            return caps[1].trim().to_string();
        }
    }

    content.trim().to_string()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Splits markdown into heading-delimited sections. Text before the first
/// heading is ignored.
pub fn markdown_sections(content: &str) -> Vec<CopySection> {
    let mut sections: Vec<CopySection> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let title = trimmed
                .trim_start_matches('#')
                .trim()
                .trim_matches('*')
                .trim()
                .to_string();
            if !title.is_empty() {
                sections.push(CopySection {
                    title,
                    body: String::new(),
                });
                continue;
            }
        }
        if let Some(current) = sections.last_mut() {
            if !current.body.is_empty() || !line.trim().is_empty() {
                current.body.push_str(line);
                current.body.push('\n');
            }
        }
    }

    for section in &mut sections {
        section.body = section.body.trim_end().to_string();
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_markdown() {
        let content = "Some text\n```json\n{\"score\": 80}\n```\nMore text";
        assert_eq!(extract_json(content), "{\"score\": 80}");
    }

    #[test]
    fn test_extract_json_raw() {
        let content = "Response: {\"pass\": false, \"summary\": \"test\"} thanks";
        let json = extract_json(content);
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_json_nested() {
        let content = r#"{"variants": {"headline": {"B": "x"}}}"#;
        assert_eq!(extract_json(content), content);
    }

    #[test]
    fn test_extract_html_fenced() {
        let content = "Here you go:\n```html\n<!DOCTYPE html><html></html>\n```\nEnjoy";
        assert_eq!(extract_html(content), "<!DOCTYPE html><html></html>");
    }

    #[test]
    fn test_extract_html_bare() {
        let content = "Sure! <!doctype html>\n<html><body>Hi</body></html> done";
        assert_eq!(extract_html(content), "<!doctype html>\n<html><body>Hi</body></html>");
    }

    #[test]
    fn test_html_patterns_compiled_once() {
        let first = html_patterns().expect("patterns compile");
        let second = html_patterns().expect("patterns compile");
        assert!(std::ptr::eq(first, second));
        assert_eq!(extract_html("  plain text  "), "plain text");
    }

    #[test]
    fn test_markdown_sections() {
        let content = "Intro text\n# Hero\n**Wake up to better coffee**\n\n## Features\n- Single origin\n- Roasted daily\n";
        let sections = markdown_sections(content);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Hero");
        assert_eq!(sections[0].body, "**Wake up to better coffee**");
        assert_eq!(sections[1].body, "- Single origin\n- Roasted daily");
    }

    #[test]
    fn test_markdown_without_headings() {
        assert!(markdown_sections("just prose").is_empty());
    }
}
