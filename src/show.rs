//! show.rs
//! The show controller. One `Show` owns every act flag, lock, child controller
//! and worker thread of a single run; a restart drops it and builds a new one.
//!
//! Threads spawned per run:
//! - lobby: waits for the Act 2 full house, then arms the watchdog
//! - watchdog: idle monitor, requests a restart on expiry
//! - round1 / round2: one minigame run each (round2 again after a loser replay)
//! - short-lived timers for delayed cues (elimination, victory, outro)
//!
//! Playhead samples arrive through `handle_playhead` on the listener thread, one
//! at a time. Every loop and timer checks the shared `running` flag, so
//! `shutdown` can join them all.

use crossbeam::channel::Sender;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crate::game::{
    acts::{Act, ActState, Transition},
    lobby,
    round1::Round1Controller,
    round2::Round2Controller,
    rounds::RoundContext,
    watchdog::IdleWatchdog,
};
use crate::input::{
    seat::{Seat, SeatSensors},
    timeline::{SampleClass, TimelineTracker},
};
use crate::output::{
    cues,
    dispatcher::{CueDispatcher, CueSink},
};
use crate::utils::{
    clock::Clock,
    config::ShowConfig,
    error::Result,
    journal::{ShowEvent, ShowJournal},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    IdleTimeout,
    EndOfShow,
    /// SIGINT/SIGTERM: tear down and exit instead of rebuilding.
    Shutdown,
}

impl RestartReason {
    pub fn name(&self) -> &'static str {
        match self {
            RestartReason::IdleTimeout => "idle_timeout",
            RestartReason::EndOfShow => "end_of_show",
            RestartReason::Shutdown => "shutdown",
        }
    }
}

/// What the rounds decided so far in this run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowResults {
    pub round1_eliminated: Option<Seat>,
    /// Kept across a loser replay until the next round 2 draws a new target.
    pub last_round2_target: Option<Seat>,
    pub round2_correct: Option<bool>,
    pub winner: Option<Seat>,
}

/// Hardware and transport the show runs against.
pub struct ShowParts {
    pub seats: SeatSensors,
    pub sink: Arc<dyn CueSink>,
    pub clock: Arc<dyn Clock>,
    pub journal: ShowJournal,
}

pub struct Show {
    config: ShowConfig,
    ctx: RoundContext,
    cues: CueDispatcher,
    acts: ActState,
    tracker: TimelineTracker,
    round1: Round1Controller,
    round2: Round2Controller,
    watchdog: IdleWatchdog,
    rng: Mutex<StdRng>,
    results: Mutex<ShowResults>,
    journal: ShowJournal,
    restart_tx: Sender<RestartReason>,
    restart_requested: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Show {
    pub fn new(config: ShowConfig, parts: ShowParts, restart_tx: Sender<RestartReason>) -> Result<Arc<Self>> {
        let cues = CueDispatcher::new(
            parts.sink,
            config.console_endpoint()?,
            config.audio_endpoint()?,
            parts.journal.clone(),
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let ctx = RoundContext::new(
            Arc::new(parts.seats),
            parts.clock,
            Arc::new(AtomicBool::new(true)),
        );

        Ok(Arc::new(Self {
            tracker: TimelineTracker::from_config(&config),
            round1: Round1Controller::from_config(&config),
            round2: Round2Controller::from_config(&config),
            watchdog: IdleWatchdog::from_config(&config),
            config,
            ctx,
            cues,
            acts: ActState::new(),
            rng: Mutex::new(rng),
            results: Mutex::new(ShowResults::default()),
            journal: parts.journal,
            restart_tx,
            restart_requested: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }))
    }

    /// Shutdown flag shared with every worker and the listener.
    pub fn running(&self) -> Arc<AtomicBool> {
        self.ctx.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    pub fn acts(&self) -> &ActState {
        &self.acts
    }

    pub fn results(&self) -> ShowResults {
        self.results.lock().clone()
    }

    pub fn journal(&self) -> &ShowJournal {
        &self.journal
    }

    /// Act 1 cues, then the lobby thread waiting for Act 2.
    pub fn start(self: &Arc<Self>) {
        if !self.ctx.wait(self.config.startup_settle) {
            return;
        }
        self.cues.send_all(cues::startup());
        self.fire(Act::Startup, None);

        let show = Arc::clone(self);
        self.spawn("lobby", move || show.run_lobby());
        info!("[Show] ready, waiting for players and playhead");
    }

    fn run_lobby(self: &Arc<Self>) {
        if !lobby::wait_for_full_house(&self.ctx, self.config.hold_time, self.config.hold_poll) {
            return;
        }
        info!("[Show] all seated");
        self.cues.send_all(cues::game_intro());
        self.fire(Act::GameIntro, None);

        let show = Arc::clone(self);
        self.spawn("watchdog", move || {
            if show.watchdog.watch(&show.ctx).is_some() {
                show.request_restart(RestartReason::IdleTimeout);
            }
        });
    }

    /// Entry point for every decoded playhead sample. Callers must not call
    /// this concurrently; the listener thread serializes it.
    pub fn handle_playhead(self: &Arc<Self>, secs: f64) {
        let report = self.tracker.process(&self.acts, secs);

        if report.class == SampleClass::SeekBack {
            if let Some(from) = report.prev {
                self.journal.record(ShowEvent::SeekBack { from, to: secs });
            }
        }

        for transition in report.transitions {
            self.apply(transition, secs);
        }
    }

    fn apply(self: &Arc<Self>, transition: Transition, playhead: f64) {
        match transition {
            Transition::StartRound1 => {
                self.announce(Act::Round1, Some(playhead));
                self.start_round1();
            }
            Transition::PlayRound2Intro => {
                self.announce(Act::Round2Intro, Some(playhead));
                self.cues.send_all(cues::round2_intro());
            }
            Transition::StartRound2 => {
                self.announce(Act::Round2, Some(playhead));
                self.start_round2();
            }
            Transition::ReplayRound2 => {
                info!("[Show] Act 6.5 over, back to Act 5");
                self.round2.reset();
                self.cues.send_all(cues::round2_intro());
                self.announce(Act::Round2Intro, Some(playhead));
            }
            Transition::ScheduleOutro => {
                self.announce(Act::Outro, Some(playhead));
                self.after("outro", self.config.outro_buffer, |show| {
                    show.cues.send_all(cues::outro());
                });
            }
            Transition::Restart => {
                self.announce(Act::Restart, Some(playhead));
                self.request_restart(RestartReason::EndOfShow);
            }
        }
    }

    fn start_round1(self: &Arc<Self>) {
        if !self.round1.try_start() {
            debug!("[Show] round 1 already started");
            return;
        }
        let show = Arc::clone(self);
        self.spawn("round1", move || show.run_round1());
    }

    fn run_round1(self: &Arc<Self>) {
        self.cues.send_all(cues::round1_start());
        let pause_after = {
            let mut rng = self.rng.lock();
            self.round1.draw_pause(&mut *rng)
        };

        let Some(outcome) = self.round1.run(&self.ctx, pause_after, || {
            self.cues.send_all(cues::pause_music());
        }) else {
            return;
        };

        let seat = outcome.eliminated;
        self.results.lock().round1_eliminated = Some(seat);
        self.journal.record(ShowEvent::Round1Decided { eliminated: seat.name() });

        self.after("elimination", self.config.elimination_delay, move |show| {
            show.cues.send_all(cues::elimination(seat));
            show.fire(Act::Elimination, None);
        });
    }

    fn start_round2(self: &Arc<Self>) {
        if !self.round2.try_start() {
            debug!("[Show] round 2 already started");
            return;
        }
        let show = Arc::clone(self);
        self.spawn("round2", move || show.run_round2());
    }

    fn run_round2(self: &Arc<Self>) {
        self.cues.send_all(cues::round2_start());
        let target = {
            let mut rng = self.rng.lock();
            self.round2.choose_target(&mut *rng)
        };
        self.results.lock().last_round2_target = Some(target);
        self.cues.send(cues::round2_clue(target));

        let Some(outcome) = self.round2.run(&self.ctx, target) else {
            return;
        };
        self.results.lock().round2_correct = Some(outcome.correct);
        self.journal.record(ShowEvent::Round2Decided {
            target: target.name(),
            correct: outcome.correct,
        });

        if outcome.correct {
            self.after("victory", self.config.victory_delay, move |show| {
                show.results.lock().winner = Some(target);
                show.fire(Act::Victory, None);
                show.cues.send_all(cues::victory(target));
            });
        } else {
            info!("[Round 2] wrong seat, no victory");
            self.cues.send_all(cues::loser());
            self.fire(Act::Round2Lost, None);
        }
    }

    /// Asks the supervisor for a full restart. Only the first request per run is sent.
    pub fn request_restart(&self, reason: RestartReason) {
        if self.restart_requested.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("[Show] full restart requested ({})", reason.name());
        self.journal.record(ShowEvent::Restart { reason: reason.name() });
        if self.restart_tx.send(reason).is_err() {
            warn!("[Show] restart requested but no supervisor is listening");
        }
    }

    /// Stops every loop and timer of this run and joins their threads.
    /// Must not be called from a worker thread.
    pub fn shutdown(&self) {
        self.ctx.running.store(false, Ordering::Release);
        loop {
            let next = self.workers.lock().pop();
            let Some(handle) = next else {
                break;
            };
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("[Show] {} thread panicked", name);
            }
        }
        debug!("[Show] all workers stopped");
    }

    fn fire(&self, act: Act, playhead: Option<f64>) {
        self.acts.mark(act);
        self.announce(act, playhead);
    }

    fn announce(&self, act: Act, playhead: Option<f64>) {
        match playhead {
            Some(t) => info!("[Show] Act {} at {:.2}s", act.label(), t),
            None => info!("[Show] Act {}", act.label()),
        }
        self.journal.record(ShowEvent::ActFired { act: act.label(), playhead });
    }

    fn after(self: &Arc<Self>, name: &str, delay: f64, f: impl FnOnce(&Show) + Send + 'static) {
        let show = Arc::clone(self);
        self.spawn(name, move || {
            if show.ctx.wait(delay) {
                f(&show);
            }
        });
    }

    fn spawn(&self, name: &str, f: impl FnOnce() + Send + 'static) {
        if !self.is_running() {
            return;
        }
        match thread::Builder::new().name(name.to_string()).spawn(f) {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
            }
            Err(e) => error!("[Show] failed to spawn {} thread: {}", name, e),
        }
    }
}
