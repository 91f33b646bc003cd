//! round2.rs
//! Round 2, the guessing round: a hidden target seat is hinted by audio and
//! the two remaining players must both sit, one of them on the target.

use log::info;
use rand::Rng;
use std::collections::BTreeSet;

use crate::game::rounds::{RoundContext, StartOnce};
use crate::input::seat::Seat;
use crate::utils::config::ShowConfig;

/// Seats that must be down at the same time to end the round.
pub const REQUIRED_SEATS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Round2Outcome {
    pub target: Seat,
    pub pressed: BTreeSet<Seat>,
    pub correct: bool,
}

/// Blocks until at least two seats are pressed at once. There is no timeout;
/// only a shutdown ends the wait early (`None`).
pub fn play(ctx: &RoundContext, target: Seat, poll: f64) -> Option<Round2Outcome> {
    let pressed = ctx.poll_until(poll, || {
        let pressed = ctx.seats.count_pressed(&Seat::ALL);
        (pressed.len() >= REQUIRED_SEATS).then_some(pressed)
    })?;

    let names: Vec<&str> = pressed.iter().map(|s| s.name()).collect();
    info!("[Round 2] pressed {}", names.join(", "));

    let correct = pressed.contains(&target);
    Some(Round2Outcome { target, pressed, correct })
}

pub struct Round2Controller {
    once: StartOnce,
    poll: f64,
}

impl Round2Controller {
    pub fn new(poll: f64) -> Self {
        Self { once: StartOnce::new(), poll }
    }

    pub fn from_config(config: &ShowConfig) -> Self {
        Self::new(config.round2_poll)
    }

    pub fn try_start(&self) -> bool {
        self.once.try_begin()
    }

    /// Loser loop only: lets the next act-6 crossing start the round again.
    pub fn reset(&self) {
        self.once.reset();
    }

    pub fn is_started(&self) -> bool {
        self.once.is_started()
    }

    pub fn choose_target(&self, rng: &mut impl Rng) -> Seat {
        Seat::ALL[rng.random_range(0..Seat::ALL.len())]
    }

    pub fn run(&self, ctx: &RoundContext, target: Seat) -> Option<Round2Outcome> {
        info!("[Round 2] target {}", target.name());
        play(ctx, target, self.poll)
    }
}
