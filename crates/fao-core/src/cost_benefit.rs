//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Keyword-driven cost and ROI estimates for insights."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::sync::Arc;

use parking_lot::Mutex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{FactoryError, Result};
use crate::insights::InsightCache;

/// First matching keyword wins. Matching is case sensitive.
const KEYWORD_COSTS: [(&str, u32); 4] = [
    ("Optimize", 5000),
    ("Reorganize", 3000),
    ("Schedule", 2000),
    ("Implement", 10000),
];
const FALLBACK_COST: u32 = 8000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostBenefit {
    pub cost: u32,
    pub roi: f64,
    /// Months.
    pub payback_period: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBenefitLookup {
    pub suggestion: String,
    pub analysis: CostBenefit,
}

pub fn estimate_cost(suggestion: &str) -> u32 {
    KEYWORD_COSTS
        .iter()
        .find(|(keyword, _)| suggestion.contains(keyword))
        .map(|(_, cost)| *cost)
        .unwrap_or(FALLBACK_COST)
}

pub fn payback_months(cost: u32) -> u32 {
    if cost < 5000 {
        3
    } else if cost < 8000 {
        6
    } else {
        12
    }
}

#[derive(Debug)]
pub struct CostBenefitEstimator {
    cache: Arc<InsightCache>,
    rng: Mutex<StdRng>,
}

impl CostBenefitEstimator {
    pub fn new(cache: Arc<InsightCache>, rng: StdRng) -> Self {
        Self {
            cache,
            rng: Mutex::new(rng),
        }
    }

    pub fn estimate(&self, suggestion: &str) -> CostBenefit {
        let cost = estimate_cost(suggestion);
        let roi = self.rng.lock().gen_range(1.5..2.5);
        CostBenefit {
            cost,
            roi,
            payback_period: payback_months(cost),
        }
    }

    /// Estimate a previously generated insight by its cache id.
    pub fn cost_benefit(&self, suggestion_id: &str) -> Result<CostBenefitLookup> {
        let suggestion = self
            .cache
            .get(suggestion_id)
            .ok_or_else(|| FactoryError::SuggestionNotFound {
                id: suggestion_id.to_owned(),
            })?;
        let analysis = self.estimate(&suggestion);
        Ok(CostBenefitLookup {
            suggestion,
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> CostBenefitEstimator {
        CostBenefitEstimator::new(Arc::new(InsightCache::new()), StdRng::seed_from_u64(42))
    }

    #[test]
    fn keyword_cascade_picks_first_match() {
        assert_eq!(estimate_cost("Dock: Optimize and Reorganize"), 5000);
        assert_eq!(estimate_cost("Reorganize shelving"), 3000);
        assert_eq!(estimate_cost("Schedule maintenance"), 2000);
        assert_eq!(estimate_cost("Implement cross-training"), 10000);
        assert_eq!(estimate_cost("Install additional lighting"), 8000);
        assert_eq!(estimate_cost("optimize lowercase"), 8000);
    }

    #[test]
    fn payback_thresholds() {
        assert_eq!(payback_months(2000), 3);
        assert_eq!(payback_months(4999), 3);
        assert_eq!(payback_months(5000), 6);
        assert_eq!(payback_months(8000), 12);
        assert_eq!(payback_months(10000), 12);
    }

    #[test]
    fn roi_stays_in_range() {
        let estimator = estimator();
        for _ in 0..500 {
            let estimate = estimator.estimate("Schedule maintenance");
            assert!((1.5..2.5).contains(&estimate.roi));
            assert_eq!(estimate.payback_period, 3);
        }
    }

    #[test]
    fn unknown_id_is_not_found() {
        let err = estimator().cost_benefit("insight-99").unwrap_err();
        assert!(matches!(err, FactoryError::SuggestionNotFound { ref id } if id == "insight-99"));
    }

    #[test]
    fn cached_insight_is_estimated() {
        let cache = Arc::new(InsightCache::new());
        cache.store(&["Storage: Reorganize inventory layout".into()]);
        let estimator = CostBenefitEstimator::new(Arc::clone(&cache), StdRng::seed_from_u64(1));
        let lookup = estimator.cost_benefit("insight-0").unwrap();
        assert_eq!(lookup.suggestion, "Storage: Reorganize inventory layout");
        assert_eq!(lookup.analysis.cost, 3000);
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["analysis"]["paybackPeriod"], 3);
    }
}
