//! Decoded trace events.
//!
//! A [`TraceEvent`] is one record of the runtime's Chrome-style timeline, already decoded by
//! whoever reads the trace. The processor only borrows events; it never keeps them.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Single character phase code of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPhase {
    /// `B`: an interval opens.
    DurationBegin,
    /// `E`: the innermost open interval closes.
    DurationEnd,
    /// `X`: a self-contained interval carrying its own duration.
    Complete,
    /// `s`: frame start marker.
    FrameStart,
    /// `f`: frame end marker.
    FrameEnd,
    /// Any other code; ignored by the frame engine.
    Other(char),
}

impl EventPhase {
    pub fn from_code(code: char) -> Self {
        match code {
            'B' => EventPhase::DurationBegin,
            'E' => EventPhase::DurationEnd,
            'X' => EventPhase::Complete,
            's' => EventPhase::FrameStart,
            'f' => EventPhase::FrameEnd,
            other => EventPhase::Other(other),
        }
    }

    pub fn code(&self) -> char {
        match self {
            EventPhase::DurationBegin => 'B',
            EventPhase::DurationEnd => 'E',
            EventPhase::Complete => 'X',
            EventPhase::FrameStart => 's',
            EventPhase::FrameEnd => 'f',
            EventPhase::Other(c) => *c,
        }
    }

    pub fn is_frame_marker(&self) -> bool {
        matches!(self, EventPhase::FrameStart | EventPhase::FrameEnd)
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl<'de> Deserialize<'de> for EventPhase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(EventPhase::from_code(c)),
            _ => Err(serde::de::Error::custom(format!(
                "phase must be a single character, got '{raw}'"
            ))),
        }
    }
}

/// One decoded trace event. Timestamps and durations are in microseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    #[serde(rename = "cat", default)]
    pub category: String,
    #[serde(rename = "ph")]
    pub phase: EventPhase,
    #[serde(rename = "pid", default)]
    pub process_id: i64,
    #[serde(rename = "tid", default)]
    pub thread_id: i64,
    #[serde(rename = "dur", default, deserialize_with = "de_opt_micros")]
    pub duration: Option<i64>,
    #[serde(rename = "ts", deserialize_with = "de_micros")]
    pub timestamp: i64,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TraceEvent {
    pub fn new(name: impl Into<String>, phase: EventPhase, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            phase,
            process_id: 0,
            thread_id: 0,
            duration: None,
            timestamp,
            args: Map::new(),
            id: None,
            scope: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_pid(mut self, pid: i64) -> Self {
        self.process_id = pid;
        self
    }

    pub fn with_tid(mut self, tid: i64) -> Self {
        self.thread_id = tid;
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Correlation id of a boundary marker: the dedicated `id` field, falling back to
    /// `args["id"]`.
    pub fn correlation_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        match self.args.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Key grouping async events: `category:scope:id`.
    pub fn async_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.category,
            self.scope.as_deref().unwrap_or(""),
            self.correlation_id().unwrap_or_default()
        )
    }

    /// A string argument, if present.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMicros {
    Int(i64),
    Float(f64),
}

impl From<RawMicros> for i64 {
    fn from(raw: RawMicros) -> Self {
        match raw {
            RawMicros::Int(v) => v,
            RawMicros::Float(v) => v.round() as i64,
        }
    }
}

fn de_micros<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    RawMicros::deserialize(deserializer).map(i64::from)
}

fn de_opt_micros<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<RawMicros>::deserialize(deserializer)?.map(i64::from))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    String(String),
    Number(serde_json::Number),
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<RawId>::deserialize(deserializer)?.map(|id| match id {
            RawId::String(s) => s,
            RawId::Number(n) => n.to_string(),
        }),
    )
}
