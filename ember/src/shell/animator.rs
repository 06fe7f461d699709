use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::Mutex;

use super::rasterizer::{RasterFrame, Rasterizer};
use crate::painting::scene::Scene;
use crate::runtime::TaskRunners;
use crate::runtime::events::{EngineEvent, EngineEventSender, emit};
use crate::runtime::vsync_waiter::VsyncWaiter;

const MAX_INTERVALS: usize = 90;

/// Receives begin-frame notifications on UI.
pub trait AnimatorDelegate: Send + Sync {
    fn on_animator_begin_frame(&self, frame_time: Instant, frame_number: u64);
}

struct FrameTimings {
    intervals: VecDeque<Duration>,
    last_begin_at: Option<Instant>,
}

impl FrameTimings {
    fn new() -> Self {
        Self {
            intervals: VecDeque::new(),
            last_begin_at: None,
        }
    }

    fn record(&mut self, frame_time: Instant) {
        let Some(last) = self.last_begin_at else {
            self.last_begin_at = Some(frame_time);
            return;
        };

        self.last_begin_at = Some(frame_time);
        self.intervals
            .push_back(frame_time.saturating_duration_since(last));
        if self.intervals.len() > MAX_INTERVALS {
            self.intervals.pop_front();
        }
    }

    fn average_fps(&self) -> f32 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.intervals.iter().copied().sum();
        let avg = sum / self.intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }
}

struct AnimatorState {
    frame_pending: bool,
    frame_number: u64,
    current_frame: Option<(u64, Instant)>,
    timings: FrameTimings,
}

/// Gates frame production on vsync.
///
/// Any number of `request_frame` calls made before the next vsync collapse
/// into a single pending wait and produce exactly one begin-frame.
pub struct Animator {
    runners: TaskRunners,
    waiter: Arc<dyn VsyncWaiter>,
    rasterizer: Arc<dyn Rasterizer>,
    delegate: Weak<dyn AnimatorDelegate>,
    events: Option<EngineEventSender>,
    state: Mutex<AnimatorState>,
}

impl Animator {
    pub fn new(
        runners: TaskRunners,
        waiter: Arc<dyn VsyncWaiter>,
        rasterizer: Arc<dyn Rasterizer>,
        delegate: Weak<dyn AnimatorDelegate>,
        events: Option<EngineEventSender>,
    ) -> Arc<Self> {
        Arc::new(Self {
            runners,
            waiter,
            rasterizer,
            delegate,
            events,
            state: Mutex::new(AnimatorState {
                frame_pending: false,
                frame_number: 0,
                current_frame: None,
                timings: FrameTimings::new(),
            }),
        })
    }

    pub fn frame_pending(&self) -> bool {
        self.state.lock().frame_pending
    }

    pub fn frame_number(&self) -> u64 {
        self.state.lock().frame_number
    }

    pub fn average_fps(&self) -> f32 {
        self.state.lock().timings.average_fps()
    }

    pub fn request_frame(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.frame_pending {
                trace!("frame already pending; request coalesced");
                return;
            }
            state.frame_pending = true;
        }

        emit(self.events.as_ref(), EngineEvent::FrameScheduled);

        let animator = Arc::downgrade(self);
        let ui = self.runners.ui().clone();
        self.waiter.async_wait_for_vsync(Box::new(move |frame_time| {
            let posted = ui.try_post(move || {
                if let Some(animator) = animator.upgrade() {
                    animator.begin_frame(frame_time);
                }
            });
            if posted.is_err() {
                debug!("vsync arrived after UI shut down");
            }
        }));
    }

    fn begin_frame(&self, frame_time: Instant) {
        let frame_number = {
            let mut state = self.state.lock();
            state.frame_pending = false;
            state.frame_number += 1;
            state.timings.record(frame_time);
            state.current_frame = Some((state.frame_number, frame_time));
            state.frame_number
        };

        emit(self.events.as_ref(), EngineEvent::FrameBegun(frame_number));

        if let Some(delegate) = self.delegate.upgrade() {
            delegate.on_animator_begin_frame(frame_time, frame_number);
        }

        self.state.lock().current_frame = None;
    }

    /// Hands `scene` to the rasterizer on GPU, tagged with the frame being
    /// produced. Scenes rendered outside a frame reuse the last frame number.
    pub fn render(&self, scene: Scene) {
        let (frame_number, frame_time) = {
            let state = self.state.lock();
            state
                .current_frame
                .unwrap_or((state.frame_number, Instant::now()))
        };

        let rasterizer = self.rasterizer.clone();
        let events = self.events.clone();
        let posted = self.runners.gpu().try_post(move || {
            rasterizer.draw(RasterFrame {
                frame_number,
                frame_time,
                scene,
            });
            emit(events.as_ref(), EngineEvent::FrameRasterized(frame_number));
        });
        if posted.is_err() {
            debug!("dropping frame {}: GPU shut down", frame_number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_fps_tracks_recent_intervals() {
        let start = Instant::now();
        let mut timings = FrameTimings::new();
        assert_eq!(timings.average_fps(), 0.0);

        for i in 0..200u32 {
            timings.record(start + Duration::from_millis(20) * i);
        }

        assert_eq!(timings.intervals.len(), MAX_INTERVALS);
        assert!((timings.average_fps() - 50.0).abs() < 0.01);
    }
}
