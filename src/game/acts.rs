//! acts.rs
//! Act flags and the timeline transition table.
//!
//! All flags and the last playhead sample live behind one mutex (`ActState`).
//! Every guard check and the flag write it protects run inside the same
//! critical section, so two near-simultaneous samples cannot both fire a row.
//! Effects that block (cue sends, timers, starting rounds) are returned as
//! `Transition`s and executed by the caller after the lock is released.

use parking_lot::Mutex;
use serde::Deserialize;

use crate::input::timeline::crossed_edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Act {
    /// Act 1
    Startup,
    /// Act 2
    GameIntro,
    /// Act 3
    Round1,
    /// Act 4
    Elimination,
    /// Act 5
    Round2Intro,
    /// Act 6
    Round2,
    /// Act 6.5: wrong guess, waiting for the replay crossing.
    Round2Lost,
    /// Act 7
    Victory,
    /// Act 8
    Outro,
    Restart,
}

impl Act {
    pub const COUNT: usize = 10;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Act::Startup => "1",
            Act::GameIntro => "2",
            Act::Round1 => "3",
            Act::Elimination => "4",
            Act::Round2Intro => "5",
            Act::Round2 => "6",
            Act::Round2Lost => "6.5",
            Act::Victory => "7",
            Act::Outro => "8",
            Act::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActFlags {
    fired: [bool; Act::COUNT],
}

impl ActFlags {
    #[inline]
    pub fn is_set(&self, act: Act) -> bool {
        self.fired[act.index()]
    }

    #[inline]
    pub fn set(&mut self, act: Act) {
        self.fired[act.index()] = true;
    }

    #[inline]
    fn clear(&mut self, act: Act) {
        self.fired[act.index()] = false;
    }
}

/// Cue timestamps in seconds from the start of the show timeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CueTimes {
    pub act3: f64,
    /// The intro can be reached from three points in the soundtrack.
    pub act5: Vec<f64>,
    pub act6: Vec<f64>,
    pub act6_return: f64,
    pub act7_end: f64,
    pub restart: f64,
}

impl Default for CueTimes {
    fn default() -> Self {
        Self {
            act3: 3.0 * 60.0 + 49.0,
            act5: vec![5.0 * 60.0 + 56.0, 6.0 * 60.0 + 34.0, 6.0 * 60.0 + 58.0],
            act6: vec![7.0 * 60.0 + 43.0],
            act6_return: 8.0 * 60.0 + 19.0,
            act7_end: 12.0 * 60.0 + 49.0,
            restart: 8.0 * 60.0 + 39.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartRound1,
    PlayRound2Intro,
    StartRound2,
    /// Loser loop: flags already rewound to Act 5; reset round 2 and replay the intro.
    ReplayRound2,
    ScheduleOutro,
    Restart,
}

#[derive(Debug, Clone, Default)]
pub struct Stage {
    pub flags: ActFlags,
    pub last_time: Option<f64>,
}

impl Stage {
    /// Evaluates the transition table for the move `prev -> now`, rows in order.
    pub fn cross(&mut self, prev: f64, now: f64, times: &CueTimes, max_forward_jump: f64) -> Vec<Transition> {
        let crossed = |t: f64| crossed_edge(Some(prev), now, t, max_forward_jump);
        let mut out = Vec::new();
        let f = &mut self.flags;

        if !f.is_set(Act::Round1) && crossed(times.act3) {
            f.set(Act::Round1);
            out.push(Transition::StartRound1);
        }

        if !f.is_set(Act::Round2Intro) && times.act5.iter().any(|&t| crossed(t)) {
            f.set(Act::Round2Intro);
            out.push(Transition::PlayRound2Intro);
        }

        if !f.is_set(Act::Round2) && times.act6.iter().any(|&t| crossed(t)) {
            f.set(Act::Round2);
            out.push(Transition::StartRound2);
        }

        if f.is_set(Act::Round2Lost) && crossed(times.act6_return) {
            f.clear(Act::Round2Lost);
            f.clear(Act::Round2Intro);
            f.clear(Act::Round2);
            f.set(Act::Round2Intro);
            out.push(Transition::ReplayRound2);
        }

        if f.is_set(Act::Victory) && !f.is_set(Act::Outro) && crossed(times.act7_end) {
            f.set(Act::Outro);
            out.push(Transition::ScheduleOutro);
        }

        if f.is_set(Act::Outro) && !f.is_set(Act::Restart) && crossed(times.restart) {
            f.set(Act::Restart);
            out.push(Transition::Restart);
        }

        out
    }
}

pub struct ActState {
    stage: Mutex<Stage>,
}

impl ActState {
    pub fn new() -> Self {
        Self { stage: Mutex::new(Stage::default()) }
    }

    pub fn is_set(&self, act: Act) -> bool {
        self.stage.lock().flags.is_set(act)
    }

    /// Sets `act`; returns false if it was already set.
    pub fn mark(&self, act: Act) -> bool {
        let mut stage = self.stage.lock();
        let fresh = !stage.flags.is_set(act);
        stage.flags.set(act);
        fresh
    }

    pub fn snapshot(&self) -> Stage {
        self.stage.lock().clone()
    }

    /// Runs `f` with the stage locked. `f` must not block.
    pub fn with_stage<R>(&self, f: impl FnOnce(&mut Stage) -> R) -> R {
        f(&mut self.stage.lock())
    }
}

impl Default for ActState {
    fn default() -> Self {
        Self::new()
    }
}
