//! Interval tree nodes.
//!
//! A node owns its children outright. There is no stored parent pointer: while a tree is being
//! built, the builder's stack of open nodes provides the way back up (see [`crate::tree`]), and
//! once a tree is closed nothing needs to walk upward.

use std::fmt::Write;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::ContractViolation;
use crate::phase::ThreadPhase;
use crate::set_once::SetOnce;

#[derive(Debug, Clone, Serialize)]
pub struct TraceNode {
    name: String,
    phase: ThreadPhase,
    start: i64,
    end: SetOnce<i64>,
    children: Vec<TraceNode>,
    #[serde(skip)]
    depth: OnceLock<usize>,
}

impl TraceNode {
    /// An open node; its end is set later by [`TraceNode::close`].
    pub fn new(name: impl Into<String>, phase: ThreadPhase, start: i64) -> Self {
        Self {
            name: name.into(),
            phase,
            start,
            end: SetOnce::new(),
            children: Vec::new(),
            depth: OnceLock::new(),
        }
    }

    /// A node whose interval is already known.
    pub fn complete(name: impl Into<String>, phase: ThreadPhase, start: i64, end: i64) -> Self {
        let mut node = Self::new(name, phase, start);
        // A fresh SetOnce cannot already be set.
        let _ = node.end.set(end);
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> ThreadPhase {
        self.phase
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> Option<i64> {
        self.end.value()
    }

    pub fn duration(&self) -> Option<i64> {
        self.end().map(|end| end.saturating_sub(self.start))
    }

    pub fn children(&self) -> &[TraceNode] {
        &self.children
    }

    pub fn is_closed(&self) -> bool {
        self.end.is_set()
    }

    pub fn close(&mut self, end: i64) -> Result<(), ContractViolation> {
        self.end
            .set(end)
            .map_err(|_| ContractViolation::NodeAlreadyClosed {
                name: self.name.clone(),
            })
    }

    pub fn add_child(&mut self, child: TraceNode) {
        self.assert_mutable();
        self.children.push(child);
    }

    /// Depth of the subtree rooted here; a leaf has depth 1.
    ///
    /// Cached on first use. The subtree must not be mutated afterwards.
    pub fn depth(&self) -> usize {
        *self.depth.get_or_init(|| {
            self.children
                .iter()
                .map(TraceNode::depth)
                .max()
                .unwrap_or(0)
                + 1
        })
    }

    /// Whether `other`'s interval lies strictly inside this one.
    ///
    /// When either end is unknown only the starts are compared.
    pub fn strictly_contains(&self, other: &TraceNode) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => self.start < other.start && other_end < end,
            _ => self.start < other.start,
        }
    }

    /// Insert `node` into this subtree at the position implied by interval containment.
    ///
    /// Existing children that fall strictly inside `node` move under it; if an existing child
    /// strictly contains `node`, the insertion continues inside that child instead.
    pub fn insert(&mut self, mut node: TraceNode) {
        self.assert_mutable();
        if self.children.is_empty() {
            self.children.push(node);
            return;
        }

        let existing = std::mem::take(&mut self.children);
        let mut kept = Vec::with_capacity(existing.len() + 1);
        let mut host = None;
        for child in existing {
            if node.strictly_contains(&child) {
                node.add_child(child);
            } else {
                if host.is_none() && child.strictly_contains(&node) {
                    host = Some(kept.len());
                }
                kept.push(child);
            }
        }
        self.children = kept;

        match host {
            Some(idx) => self.children[idx].insert(node),
            None => self.children.push(node),
        }
    }

    /// Whether a node named `name` exists anywhere in this subtree.
    pub fn contains_named(&self, name: &str) -> bool {
        self.name == name || self.children.iter().any(|c| c.contains_named(name))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TraceNode::node_count).sum::<usize>()
    }

    /// Indented textual rendering of the subtree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, level: usize) {
        let end = self.end().map_or_else(|| "?".to_string(), |e| e.to_string());
        let dur = self
            .duration()
            .map_or_else(|| "?".to_string(), |d| d.to_string());
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{:indent$}{} [start: {}] [end: {}] [dur: {}]",
            "",
            self.name,
            self.start,
            end,
            dur,
            indent = level * 2
        );
        for child in &self.children {
            child.dump_into(out, level + 1);
        }
    }

    fn assert_mutable(&self) {
        debug_assert!(
            self.depth.get().is_none(),
            "node '{}' mutated after its depth was cached",
            self.name
        );
    }
}
