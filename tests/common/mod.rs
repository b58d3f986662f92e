//! Common event builders for frametrace integration tests.

#![allow(dead_code)]

use frametrace::{EventPhase, FrameConfig, FrameProcessor, TraceEvent};

pub const UI_TID: i64 = 775;
pub const RASTER_TID: i64 = 1031;
pub const MARKER_NAME: &str = "PipelineItem";

pub fn processor() -> FrameProcessor {
    FrameProcessor::new(FrameConfig::with_threads(UI_TID, RASTER_TID))
}

pub fn begin(name: &str, tid: i64, ts: i64) -> TraceEvent {
    TraceEvent::new(name, EventPhase::DurationBegin, ts)
        .with_category("Embedder")
        .with_tid(tid)
}

pub fn end(tid: i64, ts: i64) -> TraceEvent {
    TraceEvent::new("", EventPhase::DurationEnd, ts)
        .with_category("Embedder")
        .with_tid(tid)
}

pub fn complete(name: &str, tid: i64, ts: i64, dur: i64) -> TraceEvent {
    TraceEvent::new(name, EventPhase::Complete, ts)
        .with_category("Embedder")
        .with_tid(tid)
        .with_duration(dur)
}

pub fn frame_start(id: &str, ts: i64) -> TraceEvent {
    TraceEvent::new(MARKER_NAME, EventPhase::FrameStart, ts)
        .with_category("Embedder")
        .with_id(id)
}

pub fn frame_end(id: &str, ts: i64) -> TraceEvent {
    TraceEvent::new(MARKER_NAME, EventPhase::FrameEnd, ts)
        .with_category("Embedder")
        .with_id(id)
}

pub fn frame_id(id: &str) -> String {
    format!("{MARKER_NAME}-{id}")
}

/// UI thread tree spanning `[start, end]` with `Engine::BeginFrame` nested two levels down.
pub fn cpu_flow(start: i64, end_ts: i64) -> Vec<TraceEvent> {
    vec![
        begin("VsyncProcessCallback", UI_TID, start),
        begin("Animator::BeginFrame", UI_TID, start + 1),
        complete("Engine::BeginFrame", UI_TID, start + 2, end_ts - start - 4),
        end(UI_TID, end_ts - 1),
        end(UI_TID, end_ts),
    ]
}

/// Raster thread tree spanning `[start, end]` with `PipelineConsume` under a sibling branch.
pub fn gpu_flow(start: i64, end_ts: i64) -> Vec<TraceEvent> {
    vec![
        begin("GPURasterizer::Draw", RASTER_TID, start),
        complete("GPURasterizer::DoDraw", RASTER_TID, start + 1, 1),
        begin("Rasterizer::DrawToSurfaces", RASTER_TID, start + 3),
        complete("PipelineConsume", RASTER_TID, start + 4, 1),
        end(RASTER_TID, end_ts - 1),
        end(RASTER_TID, end_ts),
    ]
}

pub fn feed(processor: &mut FrameProcessor, events: &[TraceEvent]) {
    processor
        .process_events(events)
        .expect("processing should not violate any contract");
}
