use std::io;
use std::mem;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

use crate::error::RuntimeError;
use crate::framework::util::refresh_interval;

pub type VsyncCallback = Box<dyn FnOnce(Instant) + Send + 'static>;

/// Delivers one timestamp per request at the next refresh boundary.
///
/// Callbacks run on whatever thread observes the signal; callers re-post to
/// the context they need. Dropping a waiter discards outstanding requests
/// without invoking them.
pub trait VsyncWaiter: Send + Sync {
    fn async_wait_for_vsync(&self, callback: VsyncCallback);
}

/// First grid point `origin + k * interval` strictly after `now`.
pub fn next_boundary(
    origin: Instant,
    interval: Duration,
    now: Instant,
) -> Instant {
    let interval_nanos = interval.as_nanos().max(1);
    let elapsed = now.saturating_duration_since(origin).as_nanos();
    let ticks = elapsed / interval_nanos + 1;
    let offset = u64::try_from(ticks * interval_nanos).unwrap_or(u64::MAX);
    origin + Duration::from_nanos(offset)
}

#[derive(Default)]
struct ClockState {
    pending: Vec<VsyncCallback>,
    stopped: bool,
}

struct ClockShared {
    state: Mutex<ClockState>,
    wake: Condvar,
}

/// Monotonic-clock waiter for headless runs and for displays that cannot
/// provide a hardware signal.
pub struct FallbackVsyncWaiter {
    shared: Arc<ClockShared>,
    interval: Duration,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

type ClockSpawner =
    fn(String, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>;

fn spawn_named(
    name: String,
    body: Box<dyn FnOnce() + Send>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(body)
}

impl FallbackVsyncWaiter {
    pub fn new(refresh_rate: f32) -> Result<Self, RuntimeError> {
        Self::with_thread_name(refresh_rate, "ember.vsync")
    }

    pub fn with_thread_name(
        refresh_rate: f32,
        thread_name: impl Into<String>,
    ) -> Result<Self, RuntimeError> {
        Self::spawn_with(refresh_rate, thread_name.into(), spawn_named)
    }

    fn spawn_with(
        refresh_rate: f32,
        name: String,
        spawn: ClockSpawner,
    ) -> Result<Self, RuntimeError> {
        let interval = refresh_interval(refresh_rate);
        let origin = Instant::now();
        let shared = Arc::new(ClockShared {
            state: Mutex::new(ClockState::default()),
            wake: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = spawn(
            name.clone(),
            Box::new(move || run_clock(thread_shared, origin, interval)),
        )
        .map_err(|source| RuntimeError::ThreadSpawn { name, source })?;

        Ok(Self {
            shared,
            interval,
            thread_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn run_clock(shared: Arc<ClockShared>, origin: Instant, interval: Duration) {
    loop {
        let mut state = shared.state.lock();
        while state.pending.is_empty() && !state.stopped {
            shared.wake.wait(&mut state);
        }
        if state.stopped {
            return;
        }

        let deadline = next_boundary(origin, interval, Instant::now());
        while !state.stopped && Instant::now() < deadline {
            shared.wake.wait_until(&mut state, deadline);
        }
        if state.stopped {
            return;
        }

        // Requests that arrived while waiting share this boundary.
        let callbacks = mem::take(&mut state.pending);
        drop(state);

        trace!("vsync fired for {} waiter(s)", callbacks.len());
        for callback in callbacks {
            callback(deadline);
        }
    }
}

impl VsyncWaiter for FallbackVsyncWaiter {
    fn async_wait_for_vsync(&self, callback: VsyncCallback) {
        let mut state = self.shared.state.lock();
        if state.stopped {
            return;
        }
        state.pending.push(callback);
        self.shared.wake.notify_one();
    }
}

impl Drop for FallbackVsyncWaiter {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.stopped = true;
            state.pending.clear();
        }
        self.shared.wake.notify_all();

        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Default)]
struct SignalState {
    pending: Vec<VsyncCallback>,
    disconnected: bool,
    closed: bool,
}

struct SignalShared {
    state: Mutex<SignalState>,
    fallback: FallbackVsyncWaiter,
}

/// Waiter paced by an external display signal delivered through the paired
/// [`VsyncPulse`]. Once the pulse is dropped or disconnected the signal counts
/// as unavailable and requests are served from the monotonic clock instead.
pub struct DisplayVsyncWaiter {
    shared: Arc<SignalShared>,
}

/// Handle given to the display signal source.
pub struct VsyncPulse {
    shared: Weak<SignalShared>,
}

impl DisplayVsyncWaiter {
    pub fn new(
        fallback_refresh_rate: f32,
    ) -> Result<(Self, VsyncPulse), RuntimeError> {
        let shared = Arc::new(SignalShared {
            state: Mutex::new(SignalState::default()),
            fallback: FallbackVsyncWaiter::new(fallback_refresh_rate)?,
        });
        let pulse = VsyncPulse {
            shared: Arc::downgrade(&shared),
        };
        Ok((Self { shared }, pulse))
    }

    pub fn signal_available(&self) -> bool {
        !self.shared.state.lock().disconnected
    }
}

impl VsyncWaiter for DisplayVsyncWaiter {
    fn async_wait_for_vsync(&self, callback: VsyncCallback) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        if state.disconnected {
            drop(state);
            self.shared.fallback.async_wait_for_vsync(callback);
            return;
        }
        state.pending.push(callback);
    }
}

impl Drop for DisplayVsyncWaiter {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        state.pending.clear();
    }
}

impl VsyncPulse {
    /// Fires every outstanding request with `frame_time`. Returns how many
    /// callbacks ran.
    pub fn pulse(&self, frame_time: Instant) -> usize {
        let Some(shared) = self.shared.upgrade() else {
            return 0;
        };

        let callbacks = {
            let mut state = shared.state.lock();
            if state.disconnected || state.closed {
                return 0;
            }
            mem::take(&mut state.pending)
        };

        let fired = callbacks.len();
        for callback in callbacks {
            callback(frame_time);
        }
        fired
    }

    /// Marks the display signal unavailable. Outstanding requests are handed
    /// to the clock fallback so nobody waits forever.
    pub fn disconnect(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let stranded = {
            let mut state = shared.state.lock();
            if state.disconnected {
                return;
            }
            state.disconnected = true;
            mem::take(&mut state.pending)
        };

        debug!(
            "display vsync signal lost; {} request(s) moved to clock",
            stranded.len()
        );
        for callback in stranded {
            shared.fallback.async_wait_for_vsync(callback);
        }
    }
}

impl Drop for VsyncPulse {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn next_boundary_is_strictly_after_now() {
        let origin = Instant::now();
        let interval = Duration::from_millis(10);

        assert_eq!(
            next_boundary(origin, interval, origin),
            origin + interval
        );
        assert_eq!(
            next_boundary(origin, interval, origin + interval),
            origin + interval * 2
        );
        assert_eq!(
            next_boundary(origin, interval, origin + Duration::from_millis(25)),
            origin + interval * 3
        );
    }

    #[test]
    fn fallback_fires_once_with_monotonic_timestamps() {
        let waiter = FallbackVsyncWaiter::new(240.0).expect("clock waiter");
        let (tx, rx) = mpsc::channel();

        let requested_at = Instant::now();
        let first_tx = tx.clone();
        waiter.async_wait_for_vsync(Box::new(move |t| {
            let _ = first_tx.send(t);
        }));
        let first = rx.recv_timeout(TIMEOUT).expect("first vsync");

        waiter.async_wait_for_vsync(Box::new(move |t| {
            let _ = tx.send(t);
        }));
        let second = rx.recv_timeout(TIMEOUT).expect("second vsync");

        assert!(first > requested_at);
        assert!(second > first);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn fallback_drop_discards_pending_requests() {
        let fired = Arc::new(AtomicUsize::new(0));
        let waiter = FallbackVsyncWaiter::new(1.0).expect("clock waiter");

        let counter = fired.clone();
        waiter.async_wait_for_vsync(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(waiter);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn display_pulse_fires_each_request_once() {
        let (waiter, pulse) =
            DisplayVsyncWaiter::new(60.0).expect("display waiter");
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = fired.clone();
            waiter.async_wait_for_vsync(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(pulse.pulse(Instant::now()), 3);
        assert_eq!(pulse.pulse(Instant::now()), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn display_waiter_drop_silences_pulse() {
        let (waiter, pulse) =
            DisplayVsyncWaiter::new(60.0).expect("display waiter");
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        waiter.async_wait_for_vsync(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(waiter);

        assert_eq!(pulse.pulse(Instant::now()), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn lost_signal_falls_back_to_clock() {
        let (waiter, pulse) =
            DisplayVsyncWaiter::new(240.0).expect("display waiter");
        let (tx, rx) = mpsc::channel();

        let stranded_tx = tx.clone();
        waiter.async_wait_for_vsync(Box::new(move |t| {
            let _ = stranded_tx.send(t);
        }));
        drop(pulse);
        assert!(!waiter.signal_available());
        rx.recv_timeout(TIMEOUT).expect("stranded request completes");

        waiter.async_wait_for_vsync(Box::new(move |t| {
            let _ = tx.send(t);
        }));
        rx.recv_timeout(TIMEOUT).expect("later request completes");
    }

    #[test]
    fn clock_spawn_failure_is_reported() {
        fn refuse(
            _name: String,
            _body: Box<dyn FnOnce() + Send>,
        ) -> io::Result<JoinHandle<()>> {
            Err(io::Error::other("out of threads"))
        }

        let result =
            FallbackVsyncWaiter::spawn_with(60.0, "test.vsync".to_string(), refuse);
        match result {
            Err(RuntimeError::ThreadSpawn { name, .. }) => {
                assert_eq!(name, "test.vsync");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("waiter built without a clock thread"),
        }
    }
}
