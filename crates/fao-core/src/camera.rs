//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Per-camera observation aggregation."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::Utc;
use fao_common::config::CameraConfig;
use fao_sim::{Observation, ObservationSource};
use tracing::{info, warn};

use crate::errors::FactoryError;

/// Collects one observation per configured camera from an injected source.
pub struct CameraAggregator {
    cameras: Vec<CameraConfig>,
    source: Arc<dyn ObservationSource>,
}

impl CameraAggregator {
    pub fn new(cameras: Vec<CameraConfig>, source: Arc<dyn ObservationSource>) -> Self {
        Self { cameras, source }
    }

    /// Capture every camera in configuration order. Cameras whose capture fails
    /// are logged and left out of the result.
    pub async fn process_feeds(&self) -> Vec<Observation> {
        info!(cameras = self.cameras.len(), source = self.source.name(), "processing camera feeds");
        let mut results = Vec::with_capacity(self.cameras.len());
        for camera in &self.cameras {
            match self.capture(camera).await {
                Ok(observation) => results.push(observation),
                Err(err) => warn!(camera = %camera.id, error = %err, "camera skipped"),
            }
        }
        results
    }

    async fn capture(&self, camera: &CameraConfig) -> Result<Observation, FactoryError> {
        let analysis = self
            .source
            .capture(camera)
            .await
            .map_err(|source| FactoryError::Capture {
                camera_id: camera.id.clone(),
                source,
            })?;
        Ok(Observation {
            camera_id: camera.id.clone(),
            location: camera.location.clone(),
            timestamp: Utc::now(),
            analysis,
        })
    }
}

impl std::fmt::Debug for CameraAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraAggregator")
            .field("cameras", &self.cameras.len())
            .field("source", &self.source.name())
            .finish()
    }
}
