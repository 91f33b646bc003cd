//! round1.rs
//! Round 1, the elimination round ("early/late sit").
//!
//! The music pauses at a random moment. Anyone sitting before the pause is an
//! early sitter and the earliest of them is out. If nobody sat early, everyone
//! races for a seat after the pause and the last one down is out.

use log::info;
use rand::Rng;
use std::collections::BTreeMap;

use crate::game::rounds::{RoundContext, StartOnce};
use crate::input::seat::Seat;
use crate::utils::config::ShowConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Round1Outcome {
    pub eliminated: Seat,
    /// Seconds after round start at which each early sitter first sat.
    pub early_sits: BTreeMap<Seat, f64>,
}

/// Runs the round until a seat is eliminated. `on_pause` is called exactly once,
/// when the pause deadline passes or when all three seats sat early.
/// Returns `None` if the show shut down mid-round.
pub fn play(ctx: &RoundContext, pause_after: f64, poll: f64, on_pause: impl FnOnce()) -> Option<Round1Outcome> {
    let start = ctx.now();
    // Recording order matters for ties.
    let mut early: Vec<(Seat, f64)> = Vec::with_capacity(Seat::ALL.len());

    loop {
        if !ctx.is_running() {
            return None;
        }
        let elapsed = ctx.now() - start;
        if elapsed >= pause_after {
            break;
        }

        for seat in Seat::ALL {
            if !early.iter().any(|(s, _)| *s == seat) && ctx.seats.is_pressed(seat) {
                info!("[Round 1] early sit {} {:.2}s", seat.name(), elapsed);
                early.push((seat, elapsed));
            }
        }
        if early.len() == Seat::ALL.len() {
            info!("[Round 1] all seats sat early");
            break;
        }

        ctx.clock.sleep_secs(poll);
    }

    on_pause();
    info!("[Round 1] music paused");

    let eliminated = match earliest(&early) {
        Some(seat) => {
            info!("[Round 1] early sitter {} eliminated", seat.name());
            seat
        }
        None => {
            let seat = last_to_sit(ctx, poll)?;
            info!("[Round 1] {} sat last, eliminated", seat.name());
            seat
        }
    };

    Some(Round1Outcome { eliminated, early_sits: early.into_iter().collect() })
}

/// Minimum early-sit time; the first recorded wins a tie.
fn earliest(early: &[(Seat, f64)]) -> Option<Seat> {
    early
        .iter()
        .fold(None, |best: Option<(Seat, f64)>, &(seat, t)| match best {
            Some((_, bt)) if bt <= t => best,
            _ => Some((seat, t)),
        })
        .map(|(seat, _)| seat)
}

/// Post-pause race: waits until all seats are down and returns the one that sat last.
fn last_to_sit(ctx: &RoundContext, poll: f64) -> Option<Seat> {
    let mut last_sit: [Option<f64>; 3] = [None; 3];

    ctx.poll_until(poll, || {
        if ctx.seats.all_pressed(&Seat::ALL) {
            return Some(());
        }
        for seat in Seat::ALL {
            let slot = &mut last_sit[seat.index()];
            if slot.is_none() && ctx.seats.is_pressed(seat) {
                *slot = Some(ctx.now());
                info!("[Round 1] {} sat after the pause", seat.name());
            }
        }
        None
    })?;

    // Seats that were already down when the last one arrived keep their time;
    // a seat first seen in the final all-pressed read counts as the latest.
    let arrived = ctx.now();

    Seat::ALL
        .iter()
        .copied()
        .fold(None, |best: Option<(Seat, f64)>, seat| {
            let t = last_sit[seat.index()].unwrap_or(arrived);
            match best {
                Some((_, bt)) if bt >= t => best,
                _ => Some((seat, t)),
            }
        })
        .map(|(seat, _)| seat)
}

pub struct Round1Controller {
    once: StartOnce,
    pause_min: f64,
    pause_max: f64,
    poll: f64,
}

impl Round1Controller {
    pub fn new(pause_min: f64, pause_max: f64, poll: f64) -> Self {
        Self { once: StartOnce::new(), pause_min, pause_max, poll }
    }

    pub fn from_config(config: &ShowConfig) -> Self {
        Self::new(config.pause_min, config.pause_max, config.round1_poll)
    }

    /// Only the first call returns true.
    pub fn try_start(&self) -> bool {
        self.once.try_begin()
    }

    pub fn is_started(&self) -> bool {
        self.once.is_started()
    }

    /// Uniform in `[pause_min, pause_max]`.
    pub fn draw_pause(&self, rng: &mut impl Rng) -> f64 {
        rng.random_range(self.pause_min..=self.pause_max)
    }

    pub fn run(&self, ctx: &RoundContext, pause_after: f64, on_pause: impl FnOnce()) -> Option<Round1Outcome> {
        info!("[Round 1] pause after {:.1}s", pause_after);
        play(ctx, pause_after, self.poll, on_pause)
    }
}
