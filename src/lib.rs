//! frametrace - reconstruct rendered frames from a runtime's trace event stream.
//!
//! A UI runtime records each frame as two trees of nested duration events, one on its UI
//! thread and one on its raster thread, bracketed by frame start/end marker events. This crate
//! rebuilds those trees incrementally as events arrive, picks out the trees that drive a frame,
//! matches them to their frame markers and publishes each finished frame exactly once.
//!
//! # Modules
//!
//! - [`event`] - decoded trace events
//! - [`phase`] - UI/raster thread classification
//! - [`node`] / [`tree`] - interval trees and their incremental builder
//! - [`flow`] - picking out the trees that belong to a frame
//! - [`frame`] / [`assembler`] - frame records and matching
//! - [`broadcast`] - fan-out of completed frames
//! - [`processor`] - the ingestion entry point
//!
//! # Example
//!
//! ```no_run
//! use frametrace::{FrameConfig, FrameProcessor};
//!
//! let mut processor = FrameProcessor::new(FrameConfig::with_threads(775, 1031));
//! let frames = processor.subscribe();
//!
//! let trace = frametrace::trace_file::load_trace_events("timeline.json")?;
//! processor.process_events(&trace.events)?;
//!
//! for frame in frames.try_iter() {
//!     println!("{}: {:?}us slow_ui={}", frame.id(), frame.duration(), frame.is_cpu_slow());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod assembler;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod event;
pub mod flow;
pub mod frame;
pub mod node;
pub mod phase;
pub mod processor;
pub mod set_once;
pub mod trace_file;
pub mod tree;

pub use config::FrameConfig;
pub use error::ContractViolation;
pub use event::{EventPhase, TraceEvent};
pub use flow::{FlowKind, FlowRoot};
pub use frame::TimelineFrame;
pub use node::TraceNode;
pub use phase::{ThreadIds, ThreadPhase};
pub use processor::FrameProcessor;
