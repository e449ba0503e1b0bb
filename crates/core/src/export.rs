//! Read-only view of a finished page for exporters.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::domain::{PageArtifact, RunContext};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub lang: Option<String>,
    pub description: Option<String>,
    pub meta: Vec<MetaTag>,
    /// `og:*` properties.
    pub open_graph: Vec<MetaTag>,
    /// Parsed schema.org JSON-LD blocks. Blocks that are not valid JSON are skipped.
    pub json_ld: Vec<serde_json::Value>,
}

struct Patterns {
    title: Regex,
    lang: Regex,
    meta: Regex,
    key: Regex,
    content: Regex,
    json_ld: Regex,
    style: Regex,
}

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

fn patterns() -> Option<&'static Patterns> {
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?,
                lang: Regex::new(r#"(?is)<html\b[^>]*\blang\s*=\s*["']([^"']+)["']"#).ok()?,
                meta: Regex::new(r"(?is)<meta\b[^>]*>").ok()?,
                key: Regex::new(r#"(?i)\b(name|property)\s*=\s*["']([^"']+)["']"#).ok()?,
                content: Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()?,
                json_ld: Regex::new(
                    r#"(?is)<script\b[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#,
                )
                .ok()?,
                style: Regex::new(r"(?is)<style\b[^>]*>(.*?)</style>").ok()?,
            })
        })
        .as_ref()
}

impl PageMetadata {
    pub fn extract(html: &str) -> Self {
        let Some(p) = patterns() else {
            return Self::default();
        };

        let title = p
            .title
            .captures(html)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty());
        let lang = p.lang.captures(html).map(|c| c[1].trim().to_string());

        let mut meta = Vec::new();
        let mut open_graph = Vec::new();
        for tag in p.meta.find_iter(html) {
            let tag = tag.as_str();
            let (Some(key), Some(content)) = (p.key.captures(tag), p.content.captures(tag)) else {
                continue;
            };
            let content = content
                .get(1)
                .or_else(|| content.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let entry = MetaTag {
                name: key[2].to_string(),
                content,
            };
            if entry.name.starts_with("og:") {
                open_graph.push(entry);
            } else {
                meta.push(entry);
            }
        }

        let description = meta
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case("description"))
            .map(|m| m.content.clone());

        let json_ld = p
            .json_ld
            .captures_iter(html)
            .filter_map(|c| serde_json::from_str(c[1].trim()).ok())
            .collect();

        Self {
            title,
            lang,
            description,
            meta,
            open_graph,
            json_ld,
        }
    }

    pub fn og(&self, property: &str) -> Option<&str> {
        self.open_graph
            .iter()
            .find(|m| m.name == property)
            .map(|m| m.content.as_str())
    }
}

/// Inline `<style>` blocks in document order.
pub fn inline_styles(html: &str) -> Vec<String> {
    let Some(p) = patterns() else {
        return Vec::new();
    };
    p.style
        .captures_iter(html)
        .map(|c| c[1].trim().to_string())
        .filter(|css| !css.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportBundle {
    pub run_id: Uuid,
    pub html: String,
    pub styles: Vec<String>,
    pub metadata: PageMetadata,
    pub total_cost_usd: f64,
    pub exported_at: DateTime<Utc>,
}

impl ExportBundle {
    pub fn from_page(run_id: Uuid, page: &PageArtifact, total_cost_usd: f64) -> Self {
        Self {
            run_id,
            html: page.html.clone(),
            styles: inline_styles(&page.html),
            metadata: PageMetadata::extract(&page.html),
            total_cost_usd,
            exported_at: Utc::now(),
        }
    }

    pub fn from_run(ctx: &RunContext) -> Result<Self> {
        let page = ctx.final_page().ok_or_else(|| {
            CoreError::Validation(format!("run {} has no page to export", ctx.id))
        })?;
        Ok(Self::from_page(ctx.id, page, ctx.total_cost_usd()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artifact, ArtifactKey, StageName};

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title> Bean &amp; Brew </title>
  <meta charset="utf-8">
  <meta name="description" content="Small-batch coffee roasted daily.">
  <meta property="og:title" content='Bean and Brew'>
  <script type="application/ld+json">{"@type": "CafeOrCoffeeShop", "name": "Bean & Brew"}</script>
  <script type="application/ld+json">not json</script>
  <style>body { color: #1a1a1a; }</style>
</head>
<body><h1>Fresh every morning</h1></body>
</html>"#;

    #[test]
    fn test_extract_metadata() {
        let meta = PageMetadata::extract(PAGE);
        assert_eq!(meta.title.as_deref(), Some("Bean &amp; Brew"));
        assert_eq!(meta.lang.as_deref(), Some("en"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Small-batch coffee roasted daily.")
        );
        assert_eq!(meta.og("og:title"), Some("Bean and Brew"));
        assert_eq!(meta.json_ld.len(), 1);
        assert_eq!(meta.json_ld[0]["@type"], "CafeOrCoffeeShop");
    }

    #[test]
    fn test_inline_styles() {
        assert_eq!(inline_styles(PAGE), vec!["body { color: #1a1a1a; }"]);
        assert!(inline_styles("<html></html>").is_empty());
    }

    #[test]
    fn test_bundle_requires_page() {
        let mut ctx = RunContext::new("coffee", "landing", "en");
        assert!(ExportBundle::from_run(&ctx).is_err());

        ctx.start().unwrap();
        ctx.insert_artifact(
            ArtifactKey::Page,
            StageName::AutoFix,
            Artifact::Page(PageArtifact::new(PAGE)),
        )
        .unwrap();
        let bundle = ExportBundle::from_run(&ctx).unwrap();
        assert_eq!(bundle.run_id, ctx.id);
        assert_eq!(bundle.styles.len(), 1);
        assert!(bundle.metadata.title.is_some());
    }
}
