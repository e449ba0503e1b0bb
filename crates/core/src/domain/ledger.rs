use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    TransientFailure,
    FatalFailure,
    InvalidOutput,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::TransientFailure => "transient_failure",
            Self::FatalFailure => "fatal_failure",
            Self::InvalidOutput => "invalid_output",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One provider attempt as seen by the cost ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostEntry {
    pub agent: AgentKind,
    /// 1-based attempt number within one agent run.
    pub attempt: u32,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub outcome: AttemptOutcome,
    /// True when token counts were estimated from prompt length.
    #[serde(default)]
    pub estimated: bool,
    pub recorded_at: DateTime<Utc>,
}

impl CostEntry {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CostSummary {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

impl CostSummary {
    pub fn add(&mut self, entry: &CostEntry) {
        self.calls += 1;
        self.input_tokens += entry.input_tokens;
        self.output_tokens += entry.output_tokens;
        self.cost_usd += entry.cost_usd;
        self.latency_ms += entry.latency_ms;
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl<'a> FromIterator<&'a CostEntry> for CostSummary {
    fn from_iter<I: IntoIterator<Item = &'a CostEntry>>(iter: I) -> Self {
        let mut summary = Self::default();
        for entry in iter {
            summary.add(entry);
        }
        summary
    }
}

/// Append-only record of every provider attempt in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct CostLedger {
    entries: Vec<CostEntry>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: CostEntry) {
        self.entries.push(entry);
    }

    pub fn extend<I: IntoIterator<Item = CostEntry>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for(&self, agent: AgentKind) -> impl Iterator<Item = &CostEntry> {
        self.entries.iter().filter(move |e| e.agent == agent)
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.entries.iter().map(|e| e.cost_usd).sum()
    }

    pub fn summary(&self) -> CostSummary {
        self.entries.iter().collect()
    }

    pub fn summary_for(&self, agent: AgentKind) -> CostSummary {
        self.entries_for(agent).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(agent: AgentKind, attempt: u32, cost_usd: f64, outcome: AttemptOutcome) -> CostEntry {
        CostEntry {
            agent,
            attempt,
            model: "gpt-4o".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            cost_usd,
            latency_ms: 10,
            outcome,
            estimated: false,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_ledger_totals() {
        let mut ledger = CostLedger::new();
        ledger.append(entry(AgentKind::Strategist, 1, 0.01, AttemptOutcome::TransientFailure));
        ledger.append(entry(AgentKind::Strategist, 2, 0.02, AttemptOutcome::Succeeded));
        ledger.append(entry(AgentKind::Copywriter, 1, 0.03, AttemptOutcome::Succeeded));

        assert_eq!(ledger.len(), 3);
        assert!((ledger.total_cost_usd() - 0.06).abs() < 1e-9);
        assert_eq!(ledger.entries_for(AgentKind::Strategist).count(), 2);

        let summary = ledger.summary_for(AgentKind::Strategist);
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.total_tokens(), 300);
    }

    #[test]
    fn test_ledger_serializes_as_list() {
        let mut ledger = CostLedger::new();
        ledger.append(entry(AgentKind::Reviewer, 1, 0.0, AttemptOutcome::InvalidOutput));
        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["outcome"], "invalid_output");

        let back: CostLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }
}
