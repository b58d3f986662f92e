//! Frame assembly.
//!
//! Frames are created by their start/end markers and completed by attaching one CPU and one GPU
//! flow root. Flow roots that arrive before a frame can take them wait in a holding list and
//! are retried whenever a marker or another flow root arrives.
//!
//! Nothing here ever expires. A frame whose markers or flows never show up (a producer crashed,
//! the trace was cut) stays pending forever, and so does a flow root that fits no frame. Both
//! are visible through [`FrameAssembler::pending_frame_count`] and
//! [`FrameAssembler::unmatched_flow_count`].

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::broadcast::FrameBroadcaster;
use crate::error::ContractViolation;
use crate::flow::FlowRoot;
use crate::frame::TimelineFrame;

/// Which end of a frame a boundary marker describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

/// Display id of the frame a boundary marker belongs to.
pub fn frame_id(name: &str, correlation_id: &str) -> String {
    format!("{name}-{correlation_id}")
}

// (marker name, correlation id). Display ids can collide; keys cannot.
type FrameKey = (String, String);

#[derive(Debug)]
pub struct FrameAssembler {
    pending: HashMap<FrameKey, TimelineFrame>,
    unmatched: Vec<FlowRoot>,
    broadcaster: FrameBroadcaster,
    tolerance: i64,
    target_frame_time_ms: f64,
    emitted: u64,
}

impl FrameAssembler {
    pub fn new(tolerance: i64, target_frame_time_ms: f64) -> Self {
        Self {
            pending: HashMap::new(),
            unmatched: Vec::new(),
            broadcaster: FrameBroadcaster::new(),
            tolerance,
            target_frame_time_ms,
            emitted: 0,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<Arc<TimelineFrame>> {
        self.broadcaster.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    pub fn pending_frame_count(&self) -> usize {
        self.pending.len()
    }

    pub fn unmatched_flow_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn emitted_frame_count(&self) -> u64 {
        self.emitted
    }

    pub fn pending_frame(&self, name: &str, correlation_id: &str) -> Option<&TimelineFrame> {
        self.pending
            .get(&(name.to_string(), correlation_id.to_string()))
    }

    pub fn unmatched_flows(&self) -> &[FlowRoot] {
        &self.unmatched
    }

    /// Apply a boundary marker to its frame, then retry every held flow root.
    pub fn handle_marker(
        &mut self,
        kind: MarkerKind,
        name: &str,
        correlation_id: &str,
        ts: i64,
    ) -> Result<(), ContractViolation> {
        let target = self.target_frame_time_ms;
        let frame = self
            .pending
            .entry((name.to_string(), correlation_id.to_string()))
            .or_insert_with_key(|(name, id)| TimelineFrame::new(frame_id(name, id), target));
        match kind {
            MarkerKind::Start => frame.set_marker_start(ts),
            MarkerKind::End => frame.set_marker_end(ts),
        }
        self.rematch()
    }

    /// Offer a newly completed flow root to the pending frames, holding it if none take it.
    pub fn add_flow(&mut self, flow: FlowRoot) -> Result<(), ContractViolation> {
        for key in self.well_formed_keys() {
            let Some(frame) = self.pending.get_mut(&key) else {
                continue;
            };
            if frame.needs(flow.kind) && frame.fits(&flow, self.tolerance) {
                frame.attach(flow)?;
                return self.emit_if_ready(&key);
            }
        }
        tracing::debug!(
            "holding {} flow [{}, {}], {} held",
            flow.kind.as_str(),
            flow.start(),
            flow.end(),
            self.unmatched.len() + 1
        );
        self.unmatched.push(flow);
        Ok(())
    }

    // Earliest frame gets first pick of the earliest flows.
    fn rematch(&mut self) -> Result<(), ContractViolation> {
        if self.unmatched.is_empty() {
            return Ok(());
        }
        self.unmatched.sort_by_key(FlowRoot::start);

        for key in self.well_formed_keys() {
            let Some(frame) = self.pending.get_mut(&key) else {
                continue;
            };
            let mut i = 0;
            while i < self.unmatched.len() {
                let flow = &self.unmatched[i];
                if frame.needs(flow.kind) && frame.fits(flow, self.tolerance) {
                    frame.attach(self.unmatched.remove(i))?;
                } else {
                    i += 1;
                }
            }
            self.emit_if_ready(&key)?;
        }
        Ok(())
    }

    /// Keys of well formed frames, ordered by effective start time.
    fn well_formed_keys(&self) -> Vec<FrameKey> {
        let mut frames: Vec<(i64, &FrameKey)> = self
            .pending
            .iter()
            .filter(|(_, frame)| frame.is_well_formed())
            .filter_map(|(key, frame)| Some((frame.start_time()?, key)))
            .collect();
        frames.sort();
        frames.into_iter().map(|(_, key)| key.clone()).collect()
    }

    fn emit_if_ready(&mut self, key: &FrameKey) -> Result<(), ContractViolation> {
        let Some(frame) = self.pending.get_mut(key) else {
            return Ok(());
        };
        if !frame.is_ready() || frame.is_emitted() {
            return Ok(());
        }
        frame.mark_emitted()?;
        let Some(frame) = self.pending.remove(key) else {
            return Ok(());
        };

        self.emitted += 1;
        tracing::debug!(
            "frame {} complete: {:?}us (cpu {:?}us, gpu {:?}us)",
            frame.id(),
            frame.duration(),
            frame.cpu_duration(),
            frame.gpu_duration()
        );
        self.broadcaster.publish(Arc::new(frame));
        Ok(())
    }
}
