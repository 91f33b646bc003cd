//! lobby.rs
//! Act 2 gate: the game intro starts once all three seats stay occupied for
//! the hold time.

use log::debug;

use crate::game::rounds::RoundContext;
use crate::input::seat::Seat;

/// Pause between hold attempts while the seats are not all occupied.
const IDLE_POLL_SECS: f64 = 0.1;

/// Blocks until every seat has been held continuously for `hold_time` seconds.
/// Returns false if the show shut down first.
pub fn wait_for_full_house(ctx: &RoundContext, hold_time: f64, poll: f64) -> bool {
    while ctx.is_running() {
        if ctx.seats.all_pressed(&Seat::ALL) {
            let t0 = ctx.now();
            debug!("[Lobby] all seats taken, holding");
            while ctx.is_running() && ctx.seats.all_pressed(&Seat::ALL) {
                if ctx.now() - t0 >= hold_time {
                    return true;
                }
                ctx.clock.sleep_secs(poll);
            }
            debug!("[Lobby] hold broken");
        }
        ctx.clock.sleep_secs(IDLE_POLL_SECS);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::seat::{ScriptedSeats, SeatSensors};
    use crate::utils::clock::{Clock, ManualClock};
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    fn ctx(clock: &Arc<ManualClock>, seats: ScriptedSeats) -> RoundContext {
        RoundContext::new(
            Arc::new(SeatSensors::new(Box::new(seats))),
            clock.clone(),
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn broken_hold_starts_over() {
        let clock = Arc::new(ManualClock::new());
        // Left stands up at 3s and comes back at 4s; the full hold only completes at 9s.
        let seats = ScriptedSeats::idle(clock.clone())
            .sit(Seat::Right, 0.0)
            .sit(Seat::Middle, 0.0)
            .sit_between(Seat::Left, 0.0, 3.0)
            .sit_between(Seat::Left, 4.0, f64::INFINITY);

        assert!(wait_for_full_house(&ctx(&clock, seats), 5.0, 0.05));
        assert!(clock.now() >= 9.0 - 1e-6);
        assert!(clock.now() < 9.5);
    }

    #[test]
    fn gives_up_on_shutdown() {
        let clock = Arc::new(ManualClock::new());
        let c = ctx(&clock, ScriptedSeats::idle(clock.clone()));
        c.running.store(false, Ordering::Release);
        assert!(!wait_for_full_house(&c, 5.0, 0.05));
    }
}
