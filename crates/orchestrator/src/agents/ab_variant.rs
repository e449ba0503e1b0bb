use sitesmith_core::{AgentKind, Artifact, VariantSet};

use super::parse::extract_json;
use super::{Agent, AgentError, AgentInput};

const SYSTEM_PROMPT: &str = "\
You are the A/B Testing Specialist of a landing-page studio. Given the original copy \
(variant A), write two alternatives, B and C, for the headline, subheadline and calls to \
action. Each alternative must take a distinct psychological angle while keeping the brand \
tone. Respond with one JSON object: {\"variants\": {\"headline\": {\"A\": \"...\", \"B\": \
\"...\", \"C\": \"...\"}, ...}, \"rationale\": \"...\"}.";

pub struct AbVariantAgent;

impl Agent for AbVariantAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::AbVariant
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError> {
        let copy = input.require_copy()?;
        Ok(format!(
            "Original website copy:\n\n{}\n\n\
             Generate A/B test variants for the key conversion elements (headline, \
             subheadline, CTAs). Every B and C must be a distinct alternative, never a \
             copy of A. Return the JSON with variants B and C alongside the original A.",
            copy.raw
        ))
    }

    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError> {
        let json = extract_json(raw);
        let set: VariantSet = serde_json::from_str(&json)?;

        let has_alternative = set.variants.values().any(|labels| {
            let original = labels.get("A");
            labels
                .iter()
                .any(|(label, text)| label != "A" && Some(text) != original)
        });
        if !has_alternative {
            return Err(AgentError::validation(
                "no alternative variants produced; add B and C that differ from A",
            ));
        }
        Ok(Artifact::Variants(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let raw = r#"{"variants": {"headline": {"A": "Great coffee", "B": "Your morning ritual", "C": "Only 20 bags left today"}}, "rationale": "emotion vs urgency"}"#;
        let artifact = AbVariantAgent.parse_output(raw).unwrap();
        let set = artifact.as_variants().unwrap();
        assert_eq!(set.variants["headline"]["B"], "Your morning ritual");
        assert_eq!(set.rationale, "emotion vs urgency");
    }

    #[test]
    fn test_missing_variants_key_is_invalid() {
        let err = AbVariantAgent
            .parse_output(r#"{"headline": {"B": "x"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("variants"));
    }

    #[test]
    fn test_identical_variants_are_invalid() {
        let raw = r#"{"variants": {"headline": {"A": "Same", "B": "Same"}}}"#;
        assert!(AbVariantAgent.parse_output(raw).is_err());
    }
}
