//! ---
//! fao_section: "11-simulation"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Recorded scenario replay observation source."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use fao_common::config::CameraConfig;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::frames::{Anomaly, CameraAnalysis, MachineStatus};
use crate::ObservationSource;

/// Raw row of a recorded scenario. `anomalies` is a `;`-separated tag list so the
/// same shape works for JSON and CSV.
#[derive(Debug, Deserialize)]
pub struct ReplayRecord {
    pub camera_id: String,
    pub object_count: u32,
    #[serde(default)]
    pub anomalies: String,
    #[serde(default)]
    pub people_count: u32,
    #[serde(default)]
    pub machine_status: MachineStatus,
}

impl ReplayRecord {
    fn into_analysis(self) -> Result<(String, CameraAnalysis)> {
        let anomalies = self
            .anomalies
            .split(';')
            .filter(|tag| !tag.trim().is_empty())
            .map(|tag| tag.parse::<Anomaly>().map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid anomalies for camera {}", self.camera_id))?;
        let analysis = CameraAnalysis::from_counts(
            self.object_count,
            anomalies,
            self.people_count,
            self.machine_status,
        );
        Ok((self.camera_id, analysis))
    }
}

/// Replays recorded analyses per camera, cycling when a camera's frames run out.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    frames: IndexMap<String, Vec<CameraAnalysis>>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl ReplayFeed {
    pub fn from_path(path: &Path) -> Result<Self> {
        let records = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::read_json(path)?,
            Some("csv") => Self::read_csv(path)?,
            _ => anyhow::bail!("unsupported scenario format: {}", path.display()),
        };
        let feed = Self::from_records(records)?;
        debug!(path = %path.display(), cameras = feed.frames.len(), "replay scenario loaded");
        Ok(feed)
    }

    pub fn from_records(records: Vec<ReplayRecord>) -> Result<Self> {
        let mut frames: IndexMap<String, Vec<CameraAnalysis>> = IndexMap::new();
        for record in records {
            let (camera_id, analysis) = record.into_analysis()?;
            frames.entry(camera_id).or_default().push(analysis);
        }
        Ok(Self {
            frames,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    pub fn camera_ids(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    fn next_for(&self, camera_id: &str) -> Option<CameraAnalysis> {
        let frames = self.frames.get(camera_id)?;
        if frames.is_empty() {
            return None;
        }
        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(camera_id.to_owned()).or_insert(0);
        let frame = frames[*cursor].clone();
        *cursor = (*cursor + 1) % frames.len();
        Some(frame)
    }

    fn read_json(path: &Path) -> Result<Vec<ReplayRecord>> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read scenario file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid scenario JSON {}", path.display()))
    }

    fn read_csv(path: &Path) -> Result<Vec<ReplayRecord>> {
        let file = fs::File::open(path)
            .with_context(|| format!("unable to open scenario csv {}", path.display()))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut records = Vec::new();
        for row in reader.deserialize::<ReplayRecord>() {
            records.push(row.with_context(|| format!("invalid scenario row in {}", path.display()))?);
        }
        Ok(records)
    }
}

#[async_trait]
impl ObservationSource for ReplayFeed {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn capture(&self, camera: &CameraConfig) -> Result<CameraAnalysis> {
        self.next_for(&camera.id)
            .ok_or_else(|| anyhow!("no recorded frames for camera {}", camera.id))
    }
}
