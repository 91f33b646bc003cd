//! Whole-show scenarios: a `Show` on a virtual clock, seats driven by the test,
//! cues captured by a recording sink, playhead samples fed in directly.

use chairs_show::game::acts::Act;
use chairs_show::input::seat::{Level, Seat, SeatInput, SeatSensors};
use chairs_show::output::cues::audio;
use chairs_show::output::dispatcher::{CueMessage, RecordingSink};
use chairs_show::show::{RestartReason, Show, ShowParts};
use chairs_show::utils::clock::ManualClock;
use chairs_show::utils::config::ShowConfig;
use chairs_show::utils::journal::ShowJournal;
use crossbeam::channel::{Receiver, unbounded};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

/// Seat switches the test flips by hand.
#[derive(Default)]
struct Pad {
    down: [AtomicBool; 3],
}

impl Pad {
    fn set(&self, seats: &[Seat]) {
        for seat in Seat::ALL {
            self.down[seat.index()].store(seats.contains(&seat), Ordering::SeqCst);
        }
    }
}

struct PadInput(Arc<Pad>);

impl SeatInput for PadInput {
    fn read(&self, seat: Seat) -> io::Result<Level> {
        Ok(if self.0.down[seat.index()].load(Ordering::SeqCst) { Level::Low } else { Level::High })
    }
}

struct Rig {
    show: Arc<Show>,
    sink: Arc<RecordingSink>,
    pad: Arc<Pad>,
    restarts: Receiver<RestartReason>,
}

impl Rig {
    fn new(config: ShowConfig) -> Self {
        let pad = Arc::new(Pad::default());
        let sink = Arc::new(RecordingSink::new());
        let (tx, restarts) = unbounded();
        let show = Show::new(
            config,
            ShowParts {
                seats: SeatSensors::new(Box::new(PadInput(pad.clone()))),
                sink: sink.clone(),
                clock: Arc::new(ManualClock::new()),
                journal: ShowJournal::new(),
            },
            tx,
        )
        .unwrap();
        show.start();
        Self { show, sink, pad, restarts }
    }

    fn feed(&self, samples: &[f64]) {
        for &s in samples {
            self.show.handle_playhead(s);
        }
    }

    fn count(&self, msg: &CueMessage) -> usize {
        self.sink.count(msg)
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.show.shutdown();
    }
}

fn config() -> ShowConfig {
    ShowConfig {
        console_addr: "127.0.0.1:5000".into(),
        audio_addr: "127.0.0.1:8000".into(),
        seed: Some(7),
        idle_limit: 1.0e9,
        startup_settle: 0.0,
        ..ShowConfig::default()
    }
}

fn eventually(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn startup_then_full_house_intro() {
    let rig = Rig::new(config());
    let sent = rig.sink.sent();
    assert_eq!(sent[0], CueMessage::console_off(16));
    assert_eq!(sent[2], CueMessage::audio_action(audio::WELCOME));
    assert!(rig.show.acts().is_set(Act::Startup));
    assert!(!rig.show.acts().is_set(Act::GameIntro));

    rig.pad.set(&Seat::ALL);
    eventually("act 2", || rig.show.acts().is_set(Act::GameIntro));
    assert_eq!(rig.count(&CueMessage::audio_action(audio::ROUND1_INTRO)), 1);
    assert_eq!(rig.count(&CueMessage::console_go(7)), 1);
}

#[test]
fn replayed_crossing_starts_round1_once() {
    let rig = Rig::new(config());
    rig.pad.set(&Seat::ALL);

    rig.feed(&[228.5, 229.2, 229.2, 229.9]);
    eventually("elimination", || rig.show.acts().is_set(Act::Elimination));

    assert_eq!(rig.count(&CueMessage::audio_action(audio::ROUND1_GAME)), 1);
    assert_eq!(rig.count(&CueMessage::audio_action(audio::PAUSE)), 1);
    // All three sat at once; the first seat in wiring order is out.
    assert_eq!(rig.show.results().round1_eliminated, Some(Seat::Right));
    assert_eq!(rig.count(&CueMessage::console_go(12)), 1);
}

#[test]
fn loser_loop_replays_round2() {
    let rig = Rig::new(config());

    rig.feed(&[355.5, 356.5]);
    assert!(rig.show.acts().is_set(Act::Round2Intro));
    rig.feed(&[462.5, 463.5]);

    eventually("round 2 target", || rig.show.results().last_round2_target.is_some());
    let target = rig.show.results().last_round2_target.unwrap();
    let others: Vec<Seat> = Seat::ALL.into_iter().filter(|s| *s != target).collect();
    rig.pad.set(&others);

    eventually("act 6.5", || rig.show.acts().is_set(Act::Round2Lost));
    assert_eq!(rig.show.results().round2_correct, Some(false));
    assert_eq!(rig.count(&CueMessage::audio_action(audio::LOSER)), 1);

    rig.feed(&[498.5, 499.5]);
    let acts = rig.show.acts();
    assert!(acts.is_set(Act::Round2Intro));
    assert!(!acts.is_set(Act::Round2));
    assert!(!acts.is_set(Act::Round2Lost));
    assert_eq!(rig.count(&CueMessage::audio_action(audio::ROUND2_INTRO)), 2);

    // Operator rewinds to just before round 2; the next crossing starts it again.
    rig.feed(&[462.5, 463.5]);
    assert!(acts.is_set(Act::Round2));
    eventually("second round 2", || rig.count(&CueMessage::console_go(19)) == 2);
}

#[test]
fn victory_outro_once_then_restart() {
    let rig = Rig::new(config());
    rig.pad.set(&Seat::ALL);

    rig.feed(&[462.5, 463.5]);
    eventually("victory", || rig.show.acts().is_set(Act::Victory));
    let results = rig.show.results();
    assert_eq!(results.round2_correct, Some(true));
    assert_eq!(results.winner, results.last_round2_target);

    // Small rewind and replay of the end crossing must not schedule a second outro.
    rig.feed(&[768.5, 769.5, 768.5, 769.5]);
    eventually("outro", || rig.count(&CueMessage::audio_action(audio::OUTRO)) == 1);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.count(&CueMessage::audio_action(audio::OUTRO)), 1);
    assert!(rig.show.acts().is_set(Act::Outro));

    rig.feed(&[518.5, 519.5]);
    assert_eq!(rig.restarts.recv_timeout(Duration::from_secs(5)), Ok(RestartReason::EndOfShow));
    assert!(rig.show.acts().is_set(Act::Restart));
}

#[test]
fn restart_crossing_needs_outro() {
    let rig = Rig::new(config());
    rig.feed(&[518.5, 519.5]);
    assert!(!rig.show.acts().is_set(Act::Restart));
    assert!(rig.restarts.try_recv().is_err());
}

#[test]
fn idle_watchdog_requests_one_restart() {
    let rig = Rig::new(ShowConfig { idle_limit: 3.0, ..config() });
    rig.pad.set(&Seat::ALL);
    eventually("act 2", || rig.show.acts().is_set(Act::GameIntro));

    rig.pad.set(&[]);
    assert_eq!(rig.restarts.recv_timeout(Duration::from_secs(5)), Ok(RestartReason::IdleTimeout));

    rig.show.request_restart(RestartReason::EndOfShow);
    assert!(rig.restarts.try_recv().is_err());
}

#[test]
fn shutdown_unblocks_waiting_round() {
    let rig = Rig::new(config());
    rig.feed(&[462.5, 463.5]);
    eventually("round 2 target", || rig.show.results().last_round2_target.is_some());

    rig.show.shutdown();
    assert!(!rig.show.is_running());
    assert_eq!(rig.show.results().round2_correct, None);
}
