//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Optimization insight generation and the insight cache."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
//! Insights come from a chat-completions backend when one is configured and
//! from a fixed template otherwise. Backend failures always degrade to the
//! template; callers never see them.

use std::sync::Arc;

use fao_common::config::AiConfig;
use fao_sim::Observation;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::backend::ChatCompletionClient;
use crate::errors::Result;

pub const MAX_INSIGHTS: usize = 5;
const GENERAL_LOCATION: &str = "General";

/// Insight text keyed by `insight-<index>`, shared with the cost-benefit lookup.
#[derive(Debug, Default)]
pub struct InsightCache {
    entries: RwLock<IndexMap<String, String>>,
}

impl InsightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_id(index: usize) -> String {
        format!("insight-{index}")
    }

    /// Store each insight under its position. Ids from previous cycles are overwritten.
    pub fn store(&self, insights: &[String]) {
        let mut entries = self.entries.write();
        for (index, insight) in insights.iter().enumerate() {
            entries.insert(Self::cache_id(index), insight.clone());
        }
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.entries.read().get(id).cloned()
    }
}

#[derive(Debug)]
pub enum InsightBackend {
    External(ChatCompletionClient),
    Templated,
}

impl InsightBackend {
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        match ChatCompletionClient::from_config(config)? {
            Some(client) => Ok(Self::External(client)),
            None => {
                warn!("no AI API key configured, using templated insights");
                Ok(Self::Templated)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::External(_) => "external",
            Self::Templated => "templated",
        }
    }
}

#[derive(Debug)]
pub struct InsightGenerator {
    backend: InsightBackend,
    cache: Arc<InsightCache>,
}

impl InsightGenerator {
    pub fn new(backend: InsightBackend, cache: Arc<InsightCache>) -> Self {
        Self { backend, cache }
    }

    pub fn backend(&self) -> &InsightBackend {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<InsightCache> {
        &self.cache
    }

    pub async fn generate_insights(&self, observations: &[Observation]) -> Vec<String> {
        info!(observations = observations.len(), backend = self.backend.kind(), "generating AI insights");
        let insights = match &self.backend {
            InsightBackend::External(client) => {
                let prompt = build_prompt(&analysis_context(observations));
                match client.complete(&prompt).await {
                    Ok(content) => {
                        let parsed = parse_suggestions(&content);
                        if parsed.is_empty() {
                            error!("AI service returned no usable suggestions");
                            templated_insights(observations)
                        } else {
                            parsed
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "AI service failed");
                        templated_insights(observations)
                    }
                }
            }
            InsightBackend::Templated => templated_insights(observations),
        };
        self.cache.store(&insights);
        insights
    }
}

/// One status block per observation, newline separated.
pub fn analysis_context(observations: &[Observation]) -> String {
    observations
        .iter()
        .map(|observation| {
            let analysis = &observation.analysis;
            let anomalies = if analysis.anomalies.is_empty() {
                "None".to_owned()
            } else {
                analysis
                    .anomalies
                    .iter()
                    .map(|anomaly| anomaly.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "Camera: {} - {}\nStatus: {} objects detected\nActivity Level: {:.2}\nAnomalies: {}\nPeople: {}\nMachine Status: {}",
                observation.camera_id,
                observation.location,
                analysis.object_count,
                analysis.activity_level,
                anomalies,
                analysis.people_count,
                analysis.machine_status,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(context: &str) -> String {
    format!(
        "As a factory optimization AI, analyze this factory data and provide 5 specific optimization suggestions with estimated impact:\n\nFactory Status:\n{context}\n\nSuggestions should be in the format:\n[Area] [Suggestion] - [Impact Estimate]"
    )
}

/// Non-blank trimmed lines, at most [`MAX_INSIGHTS`].
pub fn parse_suggestions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_INSIGHTS)
        .map(str::to_owned)
        .collect()
}

pub fn templated_insights(observations: &[Observation]) -> Vec<String> {
    let locations: IndexSet<&str> = observations
        .iter()
        .map(|observation| observation.location.as_str())
        .collect();
    let location = |index: usize| {
        locations
            .get_index(index)
            .copied()
            .unwrap_or(GENERAL_LOCATION)
    };
    vec![
        format!("{}: Optimize conveyor speed - potential 15% efficiency gain", location(0)),
        format!(
            "{}: Reorganize inventory layout - estimated 20min/day time savings",
            location(1)
        ),
        format!(
            "{}: Schedule maintenance for Machine #7 - vibration patterns indicate wear",
            location(2)
        ),
        "General: Implement cross-training for staff - could reduce downtime by 30%".to_owned(),
        "General: Install additional lighting in packaging area - expected to reduce errors by 12%"
            .to_owned(),
    ]
}
