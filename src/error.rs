//! Contract violation errors.
//!
//! These are not user-recoverable: they mean the engine was asked to overwrite
//! state that may only be written once. The operation that hit one is aborted
//! before any further state is touched, and the error is surfaced through
//! `anyhow::Result` so callers can `downcast_ref::<ContractViolation>()`.

use std::fmt;

/// A write to a set-once field that already held a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// A node's end time was closed twice.
    NodeAlreadyClosed { name: String },
    /// A frame slot was filled twice.
    FlowAlreadyAttached { frame: String, slot: &'static str },
    /// A frame was emitted twice.
    AlreadyEmitted { frame: String },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::NodeAlreadyClosed { name } => {
                write!(f, "node '{name}' already has an end time")
            }
            ContractViolation::FlowAlreadyAttached { frame, slot } => {
                write!(f, "frame {frame}: {slot} flow already attached")
            }
            ContractViolation::AlreadyEmitted { frame } => {
                write!(f, "frame {frame} already emitted")
            }
        }
    }
}

impl std::error::Error for ContractViolation {}
