use serde::Serialize;

use crate::event::TraceEvent;

/// Which half of a frame an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadPhase {
    /// Work on the UI thread: layout, build, paint, `Engine::BeginFrame`.
    Cpu,
    /// Work on the raster thread: `PipelineConsume` and friends.
    Gpu,
    Unknown,
}

impl ThreadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadPhase::Cpu => "cpu",
            ThreadPhase::Gpu => "gpu",
            ThreadPhase::Unknown => "unknown",
        }
    }
}

/// Thread ids of the runtime's UI and raster threads, if known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadIds {
    pub cpu: Option<i64>,
    pub gpu: Option<i64>,
}

impl ThreadIds {
    pub fn new(cpu: i64, gpu: i64) -> Self {
        Self {
            cpu: Some(cpu),
            gpu: Some(gpu),
        }
    }

    fn is_unconfigured(&self) -> bool {
        self.cpu.is_none() && self.gpu.is_none()
    }
}

/// Classify an event by thread.
///
/// Before any thread id is configured, the `type` argument some runtimes attach to their
/// timeline events is used as a hint.
pub fn classify(event: &TraceEvent, threads: &ThreadIds) -> ThreadPhase {
    if threads.cpu == Some(event.thread_id) {
        return ThreadPhase::Cpu;
    }
    if threads.gpu == Some(event.thread_id) {
        return ThreadPhase::Gpu;
    }
    if threads.is_unconfigured() {
        return match event.arg_str("type") {
            Some("ui") | Some("cpu") => ThreadPhase::Cpu,
            Some("gpu") | Some("raster") => ThreadPhase::Gpu,
            _ => ThreadPhase::Unknown,
        };
    }
    ThreadPhase::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPhase;

    fn event_on(tid: i64) -> TraceEvent {
        TraceEvent::new("Animate", EventPhase::DurationBegin, 0).with_tid(tid)
    }

    #[test]
    fn test_classify_by_thread_id() {
        let threads = ThreadIds::new(1, 2);
        assert_eq!(classify(&event_on(1), &threads), ThreadPhase::Cpu);
        assert_eq!(classify(&event_on(2), &threads), ThreadPhase::Gpu);
        assert_eq!(classify(&event_on(3), &threads), ThreadPhase::Unknown);
    }

    #[test]
    fn test_args_hint_only_without_thread_ids() {
        let hinted = event_on(9).with_arg("type", "raster");
        assert_eq!(classify(&hinted, &ThreadIds::default()), ThreadPhase::Gpu);
        assert_eq!(classify(&hinted, &ThreadIds::new(1, 2)), ThreadPhase::Unknown);

        let ui = event_on(9).with_arg("type", "ui");
        assert_eq!(classify(&ui, &ThreadIds::default()), ThreadPhase::Cpu);
        assert_eq!(
            classify(&event_on(9), &ThreadIds::default()),
            ThreadPhase::Unknown
        );
    }
}
