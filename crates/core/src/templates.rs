//! Built-in page templates and copy languages.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPLATE: &str = "landing";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub sections: &'static [&'static str],
    pub style_hints: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        id: "landing",
        name: "Landing Page (Default)",
        sections: &["hero", "features", "about", "cta", "footer"],
        style_hints: "Single-page focus, conversion-optimized, minimal navigation",
    },
    Template {
        id: "saas",
        name: "SaaS / Tech Startup",
        sections: &["hero", "features", "pricing", "testimonials", "faq", "cta", "footer"],
        style_hints: "Modern, clean, professional with gradients and shadows",
    },
    Template {
        id: "restaurant",
        name: "Restaurant / Café",
        sections: &["hero", "about", "gallery", "features", "testimonials", "contact", "footer"],
        style_hints: "Warm colors, food photography, elegant typography",
    },
    Template {
        id: "portfolio",
        name: "Portfolio / Creative",
        sections: &["hero", "gallery", "about", "testimonials", "contact", "footer"],
        style_hints: "Minimalist, bold typography, lots of whitespace",
    },
    Template {
        id: "ecommerce",
        name: "E-commerce / Product",
        sections: &["hero", "features", "gallery", "pricing", "testimonials", "faq", "footer"],
        style_hints: "Product-focused, trust badges, clear CTAs",
    },
    Template {
        id: "agency",
        name: "Agency / Services",
        sections: &["hero", "features", "about", "stats", "testimonials", "team", "cta", "footer"],
        style_hints: "Bold, professional, case-study focused",
    },
];

impl Template {
    pub fn all() -> &'static [Template] {
        TEMPLATES
    }

    pub fn find(id: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|t| t.id == id)
    }

    /// Unknown ids resolve to the default landing template.
    pub fn resolve(id: &str) -> &'static Template {
        Self::find(id).unwrap_or(&TEMPLATES[0])
    }

    pub fn section_list(&self) -> String {
        self.sections.join(", ")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub direction: TextDirection,
}

const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", direction: TextDirection::Ltr },
    Language { code: "he", name: "Hebrew", direction: TextDirection::Rtl },
    Language { code: "ar", name: "Arabic", direction: TextDirection::Rtl },
    Language { code: "es", name: "Spanish", direction: TextDirection::Ltr },
    Language { code: "fr", name: "French", direction: TextDirection::Ltr },
    Language { code: "de", name: "German", direction: TextDirection::Ltr },
    Language { code: "ru", name: "Russian", direction: TextDirection::Ltr },
];

impl Language {
    pub fn all() -> &'static [Language] {
        LANGUAGES
    }

    pub fn find(code: &str) -> Option<&'static Language> {
        LANGUAGES.iter().find(|l| l.code == code)
    }

    /// Unknown codes resolve to English.
    pub fn resolve(code: &str) -> &'static Language {
        Self::find(code).unwrap_or(&LANGUAGES[0])
    }

    pub fn is_default(&self) -> bool {
        self.code == DEFAULT_LANGUAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_template() {
        assert_eq!(Template::resolve("saas").name, "SaaS / Tech Startup");
        assert_eq!(Template::resolve("blog").id, DEFAULT_TEMPLATE);
        assert_eq!(Template::all().len(), 6);
        assert!(Template::resolve("agency").section_list().contains("team"));
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(Language::resolve("he").direction, TextDirection::Rtl);
        assert_eq!(Language::resolve("xx").code, "en");
        assert!(Language::resolve("en").is_default());
        assert!(!Language::resolve("de").is_default());
    }
}
