//! Event ingestion.
//!
//! [`FrameProcessor`] is the single entry point: hand it decoded events one at a time and
//! subscribe to receive the frames they complete. Every call runs to completion before it
//! returns; nothing blocks and nothing runs in the background.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Result;

use crate::assembler::{FrameAssembler, MarkerKind};
use crate::config::FrameConfig;
use crate::event::{EventPhase, TraceEvent};
use crate::flow::FlowDetector;
use crate::frame::TimelineFrame;
use crate::node::TraceNode;
use crate::phase::{classify, ThreadIds, ThreadPhase};
use crate::tree::EventTreeBuilder;

#[derive(Debug)]
pub struct FrameProcessor {
    threads: ThreadIds,
    cpu_tree: EventTreeBuilder,
    gpu_tree: EventTreeBuilder,
    detector: FlowDetector,
    assembler: FrameAssembler,
    debug: bool,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl FrameProcessor {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            threads: config.thread_ids(),
            cpu_tree: EventTreeBuilder::new(ThreadPhase::Cpu, config.ignore_pattern.clone()),
            gpu_tree: EventTreeBuilder::new(ThreadPhase::Gpu, config.ignore_pattern),
            detector: FlowDetector::new(config.cpu_flow_marker, config.gpu_flow_marker),
            assembler: FrameAssembler::new(config.tolerance_us, config.target_frame_time_ms),
            debug: config.debug,
        }
    }

    /// Receive every frame completed from now on.
    pub fn subscribe(&mut self) -> Receiver<Arc<TimelineFrame>> {
        self.assembler.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.assembler.subscriber_count()
    }

    /// Frames still waiting on a marker or a flow.
    pub fn pending_frame_count(&self) -> usize {
        self.assembler.pending_frame_count()
    }

    /// Flow roots no frame has accepted yet.
    pub fn unmatched_flow_count(&self) -> usize {
        self.assembler.unmatched_flow_count()
    }

    pub fn emitted_frame_count(&self) -> u64 {
        self.assembler.emitted_frame_count()
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    /// Number of open intervals on the given thread.
    pub fn open_depth(&self, phase: ThreadPhase) -> usize {
        match phase {
            ThreadPhase::Cpu => self.cpu_tree.open_depth(),
            ThreadPhase::Gpu => self.gpu_tree.open_depth(),
            ThreadPhase::Unknown => 0,
        }
    }

    /// Process one event.
    ///
    /// The only error is a [`crate::ContractViolation`], which means internal state would have
    /// been overwritten; the event that caused it has been abandoned.
    pub fn process_event(&mut self, event: &TraceEvent) -> Result<()> {
        if event.phase.is_frame_marker() {
            return self.handle_marker(event);
        }

        let builder = match classify(event, &self.threads) {
            ThreadPhase::Cpu => &mut self.cpu_tree,
            ThreadPhase::Gpu => &mut self.gpu_tree,
            ThreadPhase::Unknown => return Ok(()),
        };
        if let Some(root) = builder.handle_event(event)? {
            self.handle_root(root)?;
        }
        Ok(())
    }

    pub fn process_events<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        for event in events {
            self.process_event(event)?;
        }
        Ok(())
    }

    fn handle_marker(&mut self, event: &TraceEvent) -> Result<()> {
        let Some(correlation_id) = event.correlation_id() else {
            tracing::debug!(
                "dropping '{}' marker '{}' at {} without an id",
                event.phase,
                event.name,
                event.timestamp
            );
            return Ok(());
        };
        let kind = match event.phase {
            EventPhase::FrameStart => MarkerKind::Start,
            _ => MarkerKind::End,
        };
        self.assembler
            .handle_marker(kind, &event.name, &correlation_id, event.timestamp)?;
        Ok(())
    }

    fn handle_root(&mut self, root: TraceNode) -> Result<()> {
        if self.debug {
            tracing::debug!(
                "completed {} tree:\n{}",
                root.phase().as_str(),
                root.dump()
            );
        }
        let name = root.name().to_string();
        match self.detector.detect(root) {
            Some(flow) => self.assembler.add_flow(flow)?,
            None => tracing::debug!("discarding non-flow root '{}'", name),
        }
        Ok(())
    }
}
