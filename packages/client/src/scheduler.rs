//! Local beat scheduler.
//!
//! Turns a metronome-start payload into a stream of beat events on the local
//! clock. Beat times are recomputed from the absolute schedule on every tick
//! rather than accumulated from sleep durations, so timer jitter and clock
//! drift corrections never shift the underlying grid: beat `n` always lies
//! at `start_at + (n - 1) * interval` in server time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pulseband_shared::time::Clock;
use tokio::sync::mpsc;

/// One audible beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// 1-based absolute beat index since the scheduled start.
    pub index: u64,
    /// 1-based position within the measure.
    pub beat_in_measure: u32,
    /// Measure length, carried along for display.
    pub beats_per_measure: u32,
}

/// Timing parameters of a running metronome, in server time.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    pub start_at_utc: i64,
    pub beat_interval_ms: f64,
    pub beats_per_measure: u32,
}

/// Position of a beat within its measure.
pub fn beat_in_measure(index: u64, beats_per_measure: u32) -> u32 {
    ((index - 1) % u64::from(beats_per_measure)) as u32 + 1
}

struct Inner {
    track: Option<BeatTrack>,
    clock_offset_ms: f64,
    last_emitted_index: u64,
    listeners: Vec<mpsc::UnboundedSender<Beat>>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

/// Emits beat events according to a [`BeatTrack`], compensating for the
/// client/server clock offset.
pub struct BeatScheduler {
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<Inner>>,
}

impl BeatScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Arc::new(Mutex::new(Inner {
                track: None,
                clock_offset_ms: 0.0,
                last_emitted_index: 0,
                listeners: Vec::new(),
                timer: None,
            })),
        }
    }

    /// Subscribe to beat events. Subscriptions survive start/stop cycles.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Beat> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().listeners.push(tx);
        rx
    }

    /// Start (or restart) beating along the given track.
    ///
    /// When the start lies in the past the scheduler fast-forwards: it emits
    /// the most recent beat on the grid immediately and continues from there.
    pub fn start(&self, track: BeatTrack) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.track = Some(track);
        inner.last_emitted_index = 0;
        self.arm_timer(&mut inner);
    }

    /// Stop beating. Subscribers stay registered.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.track = None;
        inner.last_emitted_index = 0;
    }

    /// Apply a fresh clock-offset sample (server minus client, in ms).
    ///
    /// The pending timer is re-armed against the corrected clock, so a
    /// correction takes effect on the very next beat rather than one beat
    /// late. Emitted indices stay monotonic across the re-arm.
    pub fn apply_drift_correction(&self, clock_offset_ms: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.clock_offset_ms = clock_offset_ms;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
            self.arm_timer(&mut inner);
        }
    }

    /// Currently applied clock offset in milliseconds.
    pub fn clock_offset_ms(&self) -> f64 {
        self.inner.lock().unwrap().clock_offset_ms
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().timer.is_some()
    }

    fn arm_timer(&self, inner: &mut Inner) {
        let clock = self.clock.clone();
        let tick_inner = self.inner.clone();
        inner.timer = Some(tokio::spawn(async move {
            tick_loop(clock, tick_inner).await;
        }));
    }
}

impl Drop for BeatScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.lock().unwrap().timer.take() {
            timer.abort();
        }
    }
}

/// Index of the next beat to emit: the most recent grid boundary at or
/// before `now` (beat 1 when the start is still ahead), never one already
/// emitted. A boundary that has already elapsed is due immediately, so a
/// mid-interval start or a forward clock correction fires its beat with
/// zero delay instead of waiting out the rest of the interval.
fn next_beat_index(track: &BeatTrack, now_server_ms: f64, last_emitted: u64) -> u64 {
    let elapsed = now_server_ms - track.start_at_utc as f64;
    let computed = if elapsed <= 0.0 {
        1
    } else {
        (elapsed / track.beat_interval_ms).floor() as u64 + 1
    };
    computed.max(last_emitted + 1)
}

async fn tick_loop(clock: Arc<dyn Clock>, inner: Arc<Mutex<Inner>>) {
    loop {
        // Compute the next beat and its delay under the lock, sleep outside it
        let (index, delay_ms) = {
            let inner = inner.lock().unwrap();
            let track = match &inner.track {
                Some(track) => track,
                None => return,
            };
            let now_server = clock.now_utc_millis() as f64 + inner.clock_offset_ms;
            let index = next_beat_index(track, now_server, inner.last_emitted_index);
            let beat_at = track.start_at_utc as f64 + (index - 1) as f64 * track.beat_interval_ms;
            (index, (beat_at - now_server).max(0.0))
        };

        tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1000.0)).await;

        let mut inner = inner.lock().unwrap();
        let track = match &inner.track {
            Some(track) => track.clone(),
            None => return,
        };
        let now_server = clock.now_utc_millis() as f64 + inner.clock_offset_ms;
        let beat_at = track.start_at_utc as f64 + (index - 1) as f64 * track.beat_interval_ms;
        // A correction can land between the sleep elapsing and this lock and
        // push the beat later; go around again instead of emitting early
        if now_server + 0.5 < beat_at {
            continue;
        }

        let beat = Beat {
            index,
            beat_in_measure: beat_in_measure(index, track.beats_per_measure),
            beats_per_measure: track.beats_per_measure,
        };
        inner.listeners.retain(|listener| listener.send(beat).is_ok());
        inner.last_emitted_index = index;
    }
}
