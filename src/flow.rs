//! Flow root detection.
//!
//! Only two kinds of completed trees matter for frame assembly: the UI-thread tree that drives
//! a frame (it contains `Engine::BeginFrame`) and the raster-thread tree that consumes the
//! resulting layer tree (it contains `PipelineConsume`). Everything else is dropped.

use serde::Serialize;

use crate::node::TraceNode;
use crate::phase::ThreadPhase;

pub const DEFAULT_CPU_FLOW_MARKER: &str = "Engine::BeginFrame";
pub const DEFAULT_GPU_FLOW_MARKER: &str = "PipelineConsume";

/// Which slot of a frame a flow root fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Cpu,
    Gpu,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Cpu => "cpu",
            FlowKind::Gpu => "gpu",
        }
    }
}

/// A completed tree identified as the CPU or GPU work of one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRoot {
    pub kind: FlowKind,
    pub node: TraceNode,
}

impl FlowRoot {
    pub fn start(&self) -> i64 {
        self.node.start()
    }

    /// End of the flow. A flow root is always a closed tree, but an unclosed one is treated as
    /// zero length rather than unbounded.
    pub fn end(&self) -> i64 {
        self.node.end().unwrap_or(self.node.start())
    }

    pub fn duration(&self) -> i64 {
        self.end().saturating_sub(self.start())
    }
}

#[derive(Debug, Clone)]
pub struct FlowDetector {
    cpu_marker: String,
    gpu_marker: String,
}

impl Default for FlowDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_FLOW_MARKER, DEFAULT_GPU_FLOW_MARKER)
    }
}

impl FlowDetector {
    pub fn new(cpu_marker: impl Into<String>, gpu_marker: impl Into<String>) -> Self {
        Self {
            cpu_marker: cpu_marker.into(),
            gpu_marker: gpu_marker.into(),
        }
    }

    /// Decide what a completed root is. Returns `None` for trees that are not a frame's flow.
    pub fn detect(&self, node: TraceNode) -> Option<FlowRoot> {
        let kind = match node.phase() {
            ThreadPhase::Cpu if node.contains_named(&self.cpu_marker) => FlowKind::Cpu,
            ThreadPhase::Gpu if node.contains_named(&self.gpu_marker) => FlowKind::Gpu,
            _ => return None,
        };
        Some(FlowRoot { kind, node })
    }
}
