//! Per-thread interval tree reconstruction.
//!
//! The builder keeps a stack of open nodes. The top of the stack is the "current" node, the
//! entry beneath it is its parent. A node only moves into its parent's child list when it
//! closes, so every node has exactly one owner at all times: the stack while open, the parent
//! once closed, and the caller once a root completes.

use crate::error::ContractViolation;
use crate::event::{EventPhase, TraceEvent};
use crate::node::TraceNode;
use crate::phase::ThreadPhase;

pub const DEFAULT_IGNORE_PATTERN: &str = "VSYNC";

#[derive(Debug)]
pub struct EventTreeBuilder {
    phase: ThreadPhase,
    // Roots whose name contains this are housekeeping work and never tracked.
    ignore_pattern: String,
    open: Vec<TraceNode>,
}

impl EventTreeBuilder {
    pub fn new(phase: ThreadPhase, ignore_pattern: impl Into<String>) -> Self {
        Self {
            phase,
            ignore_pattern: ignore_pattern.into(),
            open: Vec::new(),
        }
    }

    pub fn phase(&self) -> ThreadPhase {
        self.phase
    }

    /// The innermost open node, if any.
    pub fn current(&self) -> Option<&TraceNode> {
        self.open.last()
    }

    /// Number of currently open nodes.
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    /// Feed one duration event. Returns a root once a whole tree has closed.
    pub fn handle_event(
        &mut self,
        event: &TraceEvent,
    ) -> Result<Option<TraceNode>, ContractViolation> {
        match event.phase {
            EventPhase::DurationBegin => {
                self.begin(event);
                Ok(None)
            }
            EventPhase::DurationEnd => self.end(event.timestamp),
            EventPhase::Complete => Ok(self.complete(event)),
            _ => Ok(None),
        }
    }

    fn begin(&mut self, event: &TraceEvent) {
        if self.open.is_empty() && self.is_ignored(&event.name) {
            tracing::debug!(
                "ignoring {} root '{}' at {}",
                self.phase.as_str(),
                event.name,
                event.timestamp
            );
            return;
        }
        self.open
            .push(TraceNode::new(&event.name, self.phase, event.timestamp));
    }

    fn end(&mut self, ts: i64) -> Result<Option<TraceNode>, ContractViolation> {
        let Some(mut node) = self.open.pop() else {
            return Ok(None);
        };
        if let Err(err) = node.close(ts) {
            self.open.push(node);
            return Err(err);
        }
        match self.open.last_mut() {
            Some(parent) => {
                parent.add_child(node);
                Ok(None)
            }
            None => Ok(Some(node)),
        }
    }

    fn complete(&mut self, event: &TraceEvent) -> Option<TraceNode> {
        let Some(dur) = event.duration else {
            tracing::debug!(
                "dropping complete event '{}' at {} without a duration",
                event.name,
                event.timestamp
            );
            return None;
        };
        let node = TraceNode::complete(
            &event.name,
            self.phase,
            event.timestamp,
            event.timestamp.saturating_add(dur),
        );
        match self.open.last_mut() {
            Some(current) => {
                current.insert(node);
                None
            }
            None => Some(node),
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        !self.ignore_pattern.is_empty() && name.contains(&self.ignore_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> EventTreeBuilder {
        EventTreeBuilder::new(ThreadPhase::Cpu, DEFAULT_IGNORE_PATTERN)
    }

    fn begin(name: &str, ts: i64) -> TraceEvent {
        TraceEvent::new(name, EventPhase::DurationBegin, ts)
    }

    fn end(ts: i64) -> TraceEvent {
        TraceEvent::new("", EventPhase::DurationEnd, ts)
    }

    fn complete(name: &str, ts: i64, dur: i64) -> TraceEvent {
        TraceEvent::new(name, EventPhase::Complete, ts).with_duration(dur)
    }

    #[test]
    fn test_begin_end_nesting() {
        let mut b = builder();
        assert!(b.handle_event(&begin("Frame", 0)).unwrap().is_none());
        assert!(b.handle_event(&begin("Build", 5)).unwrap().is_none());
        assert_eq!(b.current().unwrap().name(), "Build");
        assert!(b.handle_event(&end(15)).unwrap().is_none());
        assert_eq!(b.current().unwrap().name(), "Frame");
        assert!(b.handle_event(&begin("Paint", 20)).unwrap().is_none());
        assert!(b.handle_event(&end(30)).unwrap().is_none());

        let root = b.handle_event(&end(40)).unwrap().unwrap();
        assert_eq!(root.duration(), Some(40));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].duration(), Some(10));
        assert_eq!(b.open_depth(), 0);
    }

    #[test]
    fn test_end_without_open_node_is_ignored() {
        let mut b = builder();
        assert!(b.handle_event(&end(10)).unwrap().is_none());
    }

    #[test]
    fn test_ignored_root_is_not_tracked() {
        let mut b = builder();
        assert!(b.handle_event(&begin("VSYNC", 0)).unwrap().is_none());
        assert_eq!(b.open_depth(), 0);
        assert!(b.handle_event(&end(3)).unwrap().is_none());
    }

    #[test]
    fn test_ignore_pattern_only_applies_to_roots() {
        let mut b = builder();
        b.handle_event(&begin("Frame", 0)).unwrap();
        b.handle_event(&begin("VSYNC", 1)).unwrap();
        assert_eq!(b.open_depth(), 2);
        b.handle_event(&end(2)).unwrap();
        let root = b.handle_event(&end(3)).unwrap().unwrap();
        assert_eq!(root.children()[0].name(), "VSYNC");
    }

    #[test]
    fn test_complete_without_open_node_is_a_root() {
        let mut b = builder();
        let root = b.handle_event(&complete("Raster", 100, 20)).unwrap().unwrap();
        assert_eq!(root.end(), Some(120));
    }

    #[test]
    fn test_complete_without_duration_is_dropped() {
        let mut b = builder();
        let event = TraceEvent::new("Raster", EventPhase::Complete, 100);
        assert!(b.handle_event(&event).unwrap().is_none());
    }

    #[test]
    fn test_complete_events_reinserted_under_open_node() {
        let mut b = builder();
        b.handle_event(&begin("Frame", 0)).unwrap();
        b.handle_event(&complete("inner", 20, 10)).unwrap();
        b.handle_event(&complete("outer", 10, 50)).unwrap();
        let root = b.handle_event(&end(100)).unwrap().unwrap();

        assert_eq!(root.children().len(), 1);
        let outer = &root.children()[0];
        assert_eq!(outer.name(), "outer");
        assert_eq!(outer.children()[0].name(), "inner");
    }

    #[test]
    fn test_nodes_take_builder_phase() {
        let mut b = EventTreeBuilder::new(ThreadPhase::Gpu, DEFAULT_IGNORE_PATTERN);
        assert_eq!(b.phase(), ThreadPhase::Gpu);
        let root = b.handle_event(&complete("Raster", 0, 5)).unwrap().unwrap();
        assert_eq!(root.phase(), ThreadPhase::Gpu);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let mut b = builder();
        let root = b
            .handle_event(&complete("Raster", 100, i64::MAX))
            .unwrap()
            .unwrap();
        assert_eq!(root.end(), Some(i64::MAX));
        assert_eq!(root.duration(), Some(i64::MAX - 100));
    }

    #[test]
    fn test_other_phases_ignored() {
        let mut b = builder();
        let instant = TraceEvent::new("mark", EventPhase::Other('i'), 5);
        assert!(b.handle_event(&instant).unwrap().is_none());
        assert_eq!(b.open_depth(), 0);
    }
}
