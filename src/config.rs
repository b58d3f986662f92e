//! Frame engine configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::flow::{DEFAULT_CPU_FLOW_MARKER, DEFAULT_GPU_FLOW_MARKER};
use crate::frame::{DEFAULT_TARGET_FRAME_TIME_MS, DEFAULT_TOLERANCE_US};
use crate::phase::ThreadIds;
use crate::tree::DEFAULT_IGNORE_PATTERN;

/// Configuration for a [`crate::FrameProcessor`].
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Thread id of the runtime's UI thread.
    pub cpu_thread_id: Option<i64>,
    /// Thread id of the runtime's raster thread.
    pub gpu_thread_id: Option<i64>,
    /// Frame budget in milliseconds. A phase is slow when it takes more than half of it.
    pub target_frame_time_ms: f64,
    /// Microseconds a flow may extend past the frame markers and still match.
    pub tolerance_us: i64,
    /// Event name that marks a UI thread tree as a frame's CPU work.
    pub cpu_flow_marker: String,
    /// Event name that marks a raster thread tree as a frame's GPU work.
    pub gpu_flow_marker: String,
    /// Root events whose name contains this are housekeeping and never tracked.
    pub ignore_pattern: String,
    /// Log every completed tree.
    pub debug: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            cpu_thread_id: None,
            gpu_thread_id: None,
            target_frame_time_ms: DEFAULT_TARGET_FRAME_TIME_MS,
            tolerance_us: DEFAULT_TOLERANCE_US,
            cpu_flow_marker: DEFAULT_CPU_FLOW_MARKER.to_string(),
            gpu_flow_marker: DEFAULT_GPU_FLOW_MARKER.to_string(),
            ignore_pattern: DEFAULT_IGNORE_PATTERN.to_string(),
            debug: false,
        }
    }
}

impl FrameConfig {
    pub fn with_threads(cpu_thread_id: i64, gpu_thread_id: i64) -> Self {
        Self {
            cpu_thread_id: Some(cpu_thread_id),
            gpu_thread_id: Some(gpu_thread_id),
            ..Self::default()
        }
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn thread_ids(&self) -> ThreadIds {
        ThreadIds {
            cpu: self.cpu_thread_id,
            gpu: self.gpu_thread_id,
        }
    }
}
