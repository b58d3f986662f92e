//! Loading Chrome trace JSON files.
//!
//! Both layouts of the format are accepted: a bare array of events, or an object whose
//! `traceEvents` member holds the array. Events that do not decode (a missing timestamp, say)
//! are skipped and counted rather than failing the whole file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::event::TraceEvent;

#[derive(Deserialize)]
#[serde(untagged)]
enum TraceFile {
    Array(Vec<Value>),
    Object {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<Value>,
    },
}

/// Events decoded from a trace, plus how many entries were skipped.
#[derive(Debug, Default)]
pub struct LoadedTrace {
    pub events: Vec<TraceEvent>,
    pub skipped: usize,
}

pub fn parse_trace_events(contents: &str) -> Result<LoadedTrace> {
    let raw = match serde_json::from_str::<TraceFile>(contents)
        .context("not a Chrome trace: expected an event array or a traceEvents object")?
    {
        TraceFile::Array(events) => events,
        TraceFile::Object { trace_events } => trace_events,
    };

    let mut loaded = LoadedTrace::default();
    for value in raw {
        match serde_json::from_value::<TraceEvent>(value) {
            Ok(event) => loaded.events.push(event),
            Err(err) => {
                tracing::debug!("skipping undecodable trace event: {}", err);
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}

pub fn load_trace_events(path: impl AsRef<Path>) -> Result<LoadedTrace> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace_events(&contents).with_context(|| format!("failed to load {}", path.display()))
}
