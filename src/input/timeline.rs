//! timeline.rs
//! Playhead tracking for the audio engine's timeline.
//!
//! Each sample is classified against the previous one, then checked for edge
//! crossings of the cue timestamp table. A rewind larger than the seek-back
//! window only moves `last_time`: no crossing of any cue is evaluated for it,
//! so scrubbing back never replays the acts in between. Forward jumps larger
//! than `max_forward_jump` never fire the cues they skip.

use log::{debug, info};

use crate::game::acts::{ActState, CueTimes, Transition};
use crate::utils::config::ShowConfig;

/// Parses `M:SS`, `H:MM:SS` (seconds may be fractional), optionally wrapped in quotes.
/// Anything else is `None`.
pub fn parse_time_str(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '\'' && *c != '"').collect();
    let parts: Vec<&str> = cleaned.split(':').collect();

    let secs = match parts.as_slice() {
        [m, s] => m.parse::<i64>().ok()? as f64 * 60.0 + s.parse::<f64>().ok()?,
        [h, m, s] => {
            h.parse::<i64>().ok()? as f64 * 3600.0
                + m.parse::<i64>().ok()? as f64 * 60.0
                + s.parse::<f64>().ok()?
        }
        _ => return None,
    };

    secs.is_finite().then_some(secs)
}

/// True when the playhead moved forward by at most `max_forward_jump` and
/// `target` lies in `(prev, now]`.
#[inline]
pub fn crossed_edge(prev: Option<f64>, now: f64, target: f64, max_forward_jump: f64) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    let step = now - prev;
    if step <= 0.0 || step > max_forward_jump {
        return false;
    }
    prev < target && target <= now
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleClass {
    /// No previous sample since startup.
    First,
    Forward,
    /// Forward by more than the jump limit (operator scrubbed ahead).
    ForwardJump,
    /// Same position or a small rewind inside the seek-back window.
    Stalled,
    /// Rewind beyond the seek-back window; crossings suppressed.
    SeekBack,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub class: SampleClass,
    pub prev: Option<f64>,
    pub transitions: Vec<Transition>,
}

pub struct TimelineTracker {
    times: CueTimes,
    max_forward_jump: f64,
    seek_back_window: f64,
}

impl TimelineTracker {
    pub fn new(times: CueTimes, max_forward_jump: f64, seek_back_window: f64) -> Self {
        Self { times, max_forward_jump, seek_back_window }
    }

    pub fn from_config(config: &ShowConfig) -> Self {
        Self::new(config.cue_times.clone(), config.max_forward_jump, config.seek_back_window)
    }

    pub fn classify(&self, prev: Option<f64>, now: f64) -> SampleClass {
        let Some(prev) = prev else {
            return SampleClass::First;
        };
        if now + self.seek_back_window < prev {
            return SampleClass::SeekBack;
        }
        let step = now - prev;
        if step <= 0.0 {
            SampleClass::Stalled
        } else if step > self.max_forward_jump {
            SampleClass::ForwardJump
        } else {
            SampleClass::Forward
        }
    }

    /// Consumes one playhead sample. Guard checks and flag writes happen with the
    /// `last_time` update, in one critical section on `acts`.
    pub fn process(&self, acts: &ActState, now: f64) -> SampleReport {
        acts.with_stage(|stage| {
            let prev = stage.last_time;
            let class = self.classify(prev, now);
            stage.last_time = Some(now);

            let transitions = match (class, prev) {
                (SampleClass::SeekBack, Some(p)) => {
                    info!("[Timeline] seek back {:.2}s -> {:.2}s, crossings suppressed", p, now);
                    Vec::new()
                }
                (_, Some(p)) => stage.cross(p, now, &self.times, self.max_forward_jump),
                (_, None) => Vec::new(),
            };

            debug!("[Timeline] {:?} -> {:.2}s ({:?}) {:?}", prev, now, class, transitions);
            SampleReport { class, prev, transitions }
        })
    }
}
