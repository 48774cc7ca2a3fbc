//! ---
//! fao_section: "01-core-functionality"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Typed failures raised by the factory services."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FactoryError>;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Suggestion {id} not found")]
    SuggestionNotFound { id: String },

    #[error("No available drones")]
    NoAvailableDrone,

    #[error("failed to process camera {camera_id}: {source}")]
    Capture {
        camera_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("insight backend request failed: {0}")]
    InsightBackend(#[from] reqwest::Error),

    #[error("insight backend returned an empty completion")]
    EmptyCompletion,

    #[error("unable to load observation replay: {0}")]
    Replay(#[source] anyhow::Error),
}
