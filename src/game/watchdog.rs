//! watchdog.rs
//! Idle watchdog, armed after Act 2. Any occupied seat counts as activity;
//! when nobody has sat for longer than the idle limit the show is restarted.

use log::info;

use crate::game::rounds::RoundContext;
use crate::utils::config::ShowConfig;

#[derive(Debug, Clone, Copy)]
pub struct IdleWatchdog {
    idle_limit: f64,
    period: f64,
}

impl IdleWatchdog {
    pub fn new(idle_limit: f64, period: f64) -> Self {
        Self { idle_limit, period }
    }

    pub fn from_config(config: &ShowConfig) -> Self {
        Self::new(config.idle_limit, config.watchdog_period)
    }

    /// Blocks until the seats have been idle for longer than the limit and
    /// returns the idle time. `None` if the show shut down first.
    pub fn watch(&self, ctx: &RoundContext) -> Option<f64> {
        info!("[Watchdog] armed ({:.0}s idle limit)", self.idle_limit);
        let mut last_active = ctx.now();

        ctx.poll_until(self.period, || {
            let now = ctx.now();
            if ctx.seats.any_pressed() {
                last_active = now;
            }
            let idle = now - last_active;
            (idle > self.idle_limit).then_some(idle)
        })
        .inspect(|idle| info!("[Watchdog] no activity for {:.1}s", idle))
    }
}
