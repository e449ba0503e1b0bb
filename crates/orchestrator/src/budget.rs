use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BudgetConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum BudgetBreach {
    Cost { spent_usd: f64, limit_usd: f64 },
    Duration { elapsed: Duration, limit: Duration },
}

impl fmt::Display for BudgetBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cost {
                spent_usd,
                limit_usd,
            } => write!(f, "spent ${spent_usd:.4} of ${limit_usd:.4}"),
            Self::Duration { elapsed, limit } => write!(
                f,
                "ran for {}s of {}s",
                elapsed.as_secs(),
                limit.as_secs()
            ),
        }
    }
}

/// Global ceilings for one run, checked at stage boundaries.
#[derive(Debug, Clone)]
pub struct Budget {
    max_cost_usd: Option<f64>,
    max_duration: Option<Duration>,
    started: Instant,
}

impl Budget {
    pub fn start(config: &BudgetConfig) -> Self {
        Self {
            max_cost_usd: config.max_cost_usd,
            max_duration: config.max_duration_secs.map(Duration::from_secs),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self, spent_usd: f64) -> Option<BudgetBreach> {
        if let Some(limit_usd) = self.max_cost_usd {
            if spent_usd > limit_usd {
                return Some(BudgetBreach::Cost {
                    spent_usd,
                    limit_usd,
                });
            }
        }
        if let Some(limit) = self.max_duration {
            let elapsed = self.elapsed();
            if elapsed > limit {
                return Some(BudgetBreach::Duration { elapsed, limit });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_breach() {
        let budget = Budget::start(&BudgetConfig {
            max_cost_usd: Some(0.01),
            max_duration_secs: None,
        });
        assert!(budget.check(0.01).is_none());
        assert!(matches!(
            budget.check(0.02),
            Some(BudgetBreach::Cost { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_breach() {
        let budget = Budget::start(&BudgetConfig {
            max_cost_usd: None,
            max_duration_secs: Some(60),
        });
        assert!(budget.check(100.0).is_none());

        tokio::time::sleep(Duration::from_secs(61)).await;
        let breach = budget.check(0.0).unwrap();
        assert!(breach.to_string().contains("of 60s"));
    }

    #[test]
    fn test_default_config_never_breaches() {
        assert!(Budget::start(&BudgetConfig::default())
            .check(f64::MAX)
            .is_none());
    }
}
