//! Frame records.
//!
//! A frame's nominal window comes from its start/end marker events. Its work is one CPU flow
//! root and one GPU flow root, each matched to the frame within a small tolerance, so the
//! effective frame bounds can slightly exceed the markers.

use serde::Serialize;

use crate::error::ContractViolation;
use crate::flow::{FlowKind, FlowRoot};
use crate::set_once::SetOnce;

/// 60 fps.
pub const DEFAULT_TARGET_FRAME_TIME_MS: f64 = 1000.0 / 60.0;

/// Slack, in microseconds, by which a flow may extend past the frame markers.
pub const DEFAULT_TOLERANCE_US: i64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineFrame {
    id: String,
    marker_start: Option<i64>,
    marker_end: Option<i64>,
    cpu_flow: SetOnce<FlowRoot>,
    gpu_flow: SetOnce<FlowRoot>,
    #[serde(skip)]
    emitted: SetOnce<()>,
    target_frame_time_ms: f64,
}

impl TimelineFrame {
    pub fn new(id: impl Into<String>, target_frame_time_ms: f64) -> Self {
        Self {
            id: id.into(),
            marker_start: None,
            marker_end: None,
            cpu_flow: SetOnce::new(),
            gpu_flow: SetOnce::new(),
            emitted: SetOnce::new(),
            target_frame_time_ms,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn marker_start(&self) -> Option<i64> {
        self.marker_start
    }

    pub fn marker_end(&self) -> Option<i64> {
        self.marker_end
    }

    /// Record a start marker. A repeated marker widens the window to the earliest start.
    pub fn set_marker_start(&mut self, ts: i64) {
        self.marker_start = Some(self.marker_start.map_or(ts, |cur| cur.min(ts)));
    }

    /// Record an end marker. A repeated marker widens the window to the latest end.
    pub fn set_marker_end(&mut self, ts: i64) {
        self.marker_end = Some(self.marker_end.map_or(ts, |cur| cur.max(ts)));
    }

    pub fn cpu_flow(&self) -> Option<&FlowRoot> {
        self.cpu_flow.get()
    }

    pub fn gpu_flow(&self) -> Option<&FlowRoot> {
        self.gpu_flow.get()
    }

    /// Both markers have been seen.
    pub fn is_well_formed(&self) -> bool {
        self.marker_start.is_some() && self.marker_end.is_some()
    }

    /// Well formed and both flows attached.
    pub fn is_ready(&self) -> bool {
        self.is_well_formed() && self.cpu_flow.is_set() && self.gpu_flow.is_set()
    }

    pub fn is_emitted(&self) -> bool {
        self.emitted.is_set()
    }

    pub fn needs(&self, kind: FlowKind) -> bool {
        match kind {
            FlowKind::Cpu => !self.cpu_flow.is_set(),
            FlowKind::Gpu => !self.gpu_flow.is_set(),
        }
    }

    /// Whether `flow` can belong to this frame.
    ///
    /// The flow must start no earlier than `tolerance` before the start marker and end no later
    /// than `tolerance` after the end marker. A CPU flow must also start strictly before an
    /// attached GPU flow, and a GPU flow strictly after an attached CPU flow.
    pub fn fits(&self, flow: &FlowRoot, tolerance: i64) -> bool {
        let (Some(start), Some(end)) = (self.marker_start, self.marker_end) else {
            return false;
        };
        let start_fits = start.saturating_sub(flow.start()).saturating_sub(tolerance) < 0;
        let end_fits = end.saturating_sub(flow.end()).saturating_add(tolerance) > 0;
        let ordered = match flow.kind {
            FlowKind::Cpu => self.gpu_flow().map_or(true, |gpu| flow.start() < gpu.start()),
            FlowKind::Gpu => self.cpu_flow().map_or(true, |cpu| flow.start() > cpu.start()),
        };
        start_fits && end_fits && ordered
    }

    pub fn attach(&mut self, flow: FlowRoot) -> Result<(), ContractViolation> {
        let kind = flow.kind;
        let slot = match kind {
            FlowKind::Cpu => &mut self.cpu_flow,
            FlowKind::Gpu => &mut self.gpu_flow,
        };
        slot.set(flow)
            .map_err(|_| ContractViolation::FlowAlreadyAttached {
                frame: self.id.clone(),
                slot: kind.as_str(),
            })
    }

    pub fn mark_emitted(&mut self) -> Result<(), ContractViolation> {
        self.emitted
            .set(())
            .map_err(|_| ContractViolation::AlreadyEmitted {
                frame: self.id.clone(),
            })
    }

    /// Earlier of the start marker and the CPU flow start.
    pub fn start_time(&self) -> Option<i64> {
        min_opt(self.marker_start, self.cpu_flow().map(FlowRoot::start))
    }

    /// Later of the end marker and the GPU flow end.
    pub fn end_time(&self) -> Option<i64> {
        max_opt(self.marker_end, self.gpu_flow().map(FlowRoot::end))
    }

    pub fn duration(&self) -> Option<i64> {
        Some(self.end_time()?.saturating_sub(self.start_time()?))
    }

    pub fn cpu_start(&self) -> Option<i64> {
        self.cpu_flow().map(FlowRoot::start)
    }

    pub fn cpu_end(&self) -> Option<i64> {
        self.cpu_flow().map(FlowRoot::end)
    }

    pub fn cpu_duration(&self) -> Option<i64> {
        self.cpu_flow().map(FlowRoot::duration)
    }

    pub fn gpu_start(&self) -> Option<i64> {
        self.gpu_flow().map(FlowRoot::start)
    }

    pub fn gpu_end(&self) -> Option<i64> {
        self.gpu_flow().map(FlowRoot::end)
    }

    pub fn gpu_duration(&self) -> Option<i64> {
        self.gpu_flow().map(FlowRoot::duration)
    }

    pub fn cpu_duration_ms(&self) -> Option<f64> {
        self.cpu_duration().map(micros_to_ms)
    }

    pub fn gpu_duration_ms(&self) -> Option<f64> {
        self.gpu_duration().map(micros_to_ms)
    }

    /// CPU work took more than half the frame budget.
    pub fn is_cpu_slow(&self) -> bool {
        self.cpu_duration_ms()
            .is_some_and(|ms| ms > self.slow_threshold_ms())
    }

    /// GPU work took more than half the frame budget.
    pub fn is_gpu_slow(&self) -> bool {
        self.gpu_duration_ms()
            .is_some_and(|ms| ms > self.slow_threshold_ms())
    }

    fn slow_threshold_ms(&self) -> f64 {
        self.target_frame_time_ms / 2.0
    }
}

fn micros_to_ms(us: i64) -> f64 {
    us as f64 / 1000.0
}

fn min_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TraceNode;
    use crate::phase::ThreadPhase;

    fn flow(kind: FlowKind, start: i64, end: i64) -> FlowRoot {
        let phase = match kind {
            FlowKind::Cpu => ThreadPhase::Cpu,
            FlowKind::Gpu => ThreadPhase::Gpu,
        };
        FlowRoot {
            kind,
            node: TraceNode::complete("root", phase, start, end),
        }
    }

    fn frame(start: i64, end: i64) -> TimelineFrame {
        let mut frame = TimelineFrame::new("Frame-1", DEFAULT_TARGET_FRAME_TIME_MS);
        frame.set_marker_start(start);
        frame.set_marker_end(end);
        frame
    }

    #[test]
    fn test_well_formed_and_ready() {
        let mut f = TimelineFrame::new("Frame-1", DEFAULT_TARGET_FRAME_TIME_MS);
        assert!(!f.is_well_formed());
        f.set_marker_start(100);
        assert!(!f.is_well_formed());
        f.set_marker_end(200);
        assert!(f.is_well_formed());
        assert!(!f.is_ready());
        f.attach(flow(FlowKind::Cpu, 105, 150)).unwrap();
        f.attach(flow(FlowKind::Gpu, 160, 195)).unwrap();
        assert!(f.is_ready());
    }

    #[test]
    fn test_repeated_markers_widen_window() {
        let mut f = frame(100, 200);
        f.set_marker_start(120);
        f.set_marker_end(180);
        assert_eq!(f.marker_start(), Some(100));
        assert_eq!(f.marker_end(), Some(200));
        f.set_marker_start(90);
        f.set_marker_end(210);
        assert_eq!(f.marker_start(), Some(90));
        assert_eq!(f.marker_end(), Some(210));
    }

    #[test]
    fn test_start_tolerance_boundary() {
        let f = frame(1000, 2000);
        assert!(f.fits(&flow(FlowKind::Cpu, 1000 - 49, 1500), DEFAULT_TOLERANCE_US));
        assert!(!f.fits(&flow(FlowKind::Cpu, 1000 - 50, 1500), DEFAULT_TOLERANCE_US));
        assert!(!f.fits(&flow(FlowKind::Cpu, 1000 - 51, 1500), DEFAULT_TOLERANCE_US));
    }

    #[test]
    fn test_end_tolerance_boundary() {
        let f = frame(1000, 2000);
        assert!(f.fits(&flow(FlowKind::Gpu, 1500, 2000 + 49), DEFAULT_TOLERANCE_US));
        assert!(!f.fits(&flow(FlowKind::Gpu, 1500, 2000 + 50), DEFAULT_TOLERANCE_US));
    }

    #[test]
    fn test_ordering_against_counterpart() {
        let mut f = frame(1000, 2000);
        f.attach(flow(FlowKind::Gpu, 1500, 1900)).unwrap();
        assert!(f.fits(&flow(FlowKind::Cpu, 1100, 1400), DEFAULT_TOLERANCE_US));
        assert!(!f.fits(&flow(FlowKind::Cpu, 1500, 1600), DEFAULT_TOLERANCE_US));

        let mut f = frame(1000, 2000);
        f.attach(flow(FlowKind::Cpu, 1100, 1400)).unwrap();
        assert!(f.fits(&flow(FlowKind::Gpu, 1500, 1900), DEFAULT_TOLERANCE_US));
        assert!(!f.fits(&flow(FlowKind::Gpu, 1100, 1900), DEFAULT_TOLERANCE_US));
    }

    #[test]
    fn test_extreme_flow_bounds_do_not_fit() {
        let f = frame(1000, 2000);
        assert!(!f.fits(&flow(FlowKind::Cpu, i64::MIN, 1500), i64::MAX));
        assert!(!f.fits(&flow(FlowKind::Gpu, 1500, i64::MAX), DEFAULT_TOLERANCE_US));
    }

    #[test]
    fn test_not_well_formed_never_fits() {
        let mut f = TimelineFrame::new("Frame-1", DEFAULT_TARGET_FRAME_TIME_MS);
        f.set_marker_start(1000);
        assert!(!f.fits(&flow(FlowKind::Cpu, 1100, 1200), DEFAULT_TOLERANCE_US));
    }

    #[test]
    fn test_second_attach_is_contract_violation() {
        let mut f = frame(1000, 2000);
        f.attach(flow(FlowKind::Cpu, 1100, 1200)).unwrap();
        let err = f.attach(flow(FlowKind::Cpu, 1300, 1400)).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::FlowAlreadyAttached {
                frame: "Frame-1".to_string(),
                slot: "cpu"
            }
        );
        assert_eq!(f.cpu_start(), Some(1100));
    }

    #[test]
    fn test_second_emit_is_contract_violation() {
        let mut f = frame(1000, 2000);
        f.mark_emitted().unwrap();
        assert!(f.is_emitted());
        assert!(f.mark_emitted().is_err());
    }

    #[test]
    fn test_effective_bounds() {
        let mut f = frame(1000, 2000);
        f.attach(flow(FlowKind::Cpu, 980, 1500)).unwrap();
        f.attach(flow(FlowKind::Gpu, 1600, 2030)).unwrap();
        assert_eq!(f.start_time(), Some(980));
        assert_eq!(f.end_time(), Some(2030));
        assert_eq!(f.duration(), Some(1050));
        assert_eq!(f.cpu_duration(), Some(520));
        assert_eq!(f.gpu_duration(), Some(430));
    }

    #[test]
    fn test_slow_threshold() {
        // Half of 16.667ms is 8.333ms.
        let mut f = frame(0, 40_000);
        f.attach(flow(FlowKind::Cpu, 10, 10 + 8_334)).unwrap();
        f.attach(flow(FlowKind::Gpu, 20_000, 20_000 + 8_333)).unwrap();
        assert!(f.is_cpu_slow());
        assert!(!f.is_gpu_slow());
    }

    #[test]
    fn test_custom_target_frame_time() {
        let mut f = TimelineFrame::new("Frame-1", 1000.0 / 120.0);
        f.set_marker_start(0);
        f.set_marker_end(40_000);
        f.attach(flow(FlowKind::Cpu, 10, 10 + 5_000)).unwrap();
        assert!(f.is_cpu_slow());
        assert!(!f.is_gpu_slow());
    }
}
