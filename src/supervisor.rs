//! supervisor.rs
//! Process lifetime: builds a `Show`, runs it, and on a restart request tears it
//! down and builds a fresh one from the original configuration.
//!
//! Teardown order: stop flag, join show workers, join listener, drop the show
//! (unexports GPIO, closes the OSC socket), pause, rebuild.
//!
//! SIGINT/SIGTERM arrive on the same channel as `RestartReason::Shutdown`; the
//! current run is torn down the same way, the journal is flushed and closed,
//! and `run` returns.

use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{error, info, warn};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

use crate::input::{
    listener::Listener,
    seat::{ScriptedSeats, SeatInput, SeatSensors, SysfsSeatInput},
};
use crate::output::dispatcher::{CueSink, LogCueSink, UdpCueSink};
use crate::show::{RestartReason, Show, ShowParts};
use crate::utils::{
    clock::{Clock, SystemClock},
    config::{SeatBackend, ShowConfig},
    error::Result,
    journal::ShowJournal,
};

pub fn seat_input(config: &ShowConfig, clock: Arc<dyn Clock>) -> Result<Box<dyn SeatInput>> {
    Ok(match config.seat_backend {
        SeatBackend::Sysfs => Box::new(SysfsSeatInput::open(&config.seat_pins)?),
        SeatBackend::Simulated => {
            warn!("[Supervisor] simulated seats, nobody will ever sit");
            Box::new(ScriptedSeats::idle(clock))
        }
    })
}

pub fn cue_sink(config: &ShowConfig) -> Result<Arc<dyn CueSink>> {
    if config.dry_run {
        info!("[Supervisor] dry run, cues are logged only");
        Ok(Arc::new(LogCueSink))
    } else {
        Ok(Arc::new(UdpCueSink::new()?))
    }
}

/// One run: everything a restart discards.
struct Run {
    show: Arc<Show>,
    listener: Option<JoinHandle<()>>,
}

fn build_run(config: &ShowConfig, journal: &ShowJournal, restart_tx: Sender<RestartReason>) -> Result<Run> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let seats = SeatSensors::new(seat_input(config, clock.clone())?);

    let show = Show::new(
        config.clone(),
        ShowParts { seats, sink: cue_sink(config)?, clock, journal: journal.clone() },
        restart_tx,
    )?;
    let listener = Listener::bind(config.listen_endpoint()?, show.running())?;
    let listener = spawn_listener(listener, Arc::clone(&show));

    Ok(Run { show, listener })
}

/// Playhead samples are handled on this one thread, in arrival order.
fn spawn_listener(listener: Listener, show: Arc<Show>) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("osc-listener".into())
        .spawn_with_priority(ThreadPriority::Max, move |priority| {
            if let Err(e) = priority {
                warn!("[Supervisor] listener runs at default priority: {:?}", e);
            }
            listener.run(|secs| show.handle_playhead(secs));
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("[Supervisor] failed to spawn listener: {}", e);
            None
        }
    }
}

impl Run {
    fn teardown(mut self) {
        self.show.shutdown();
        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                error!("[Supervisor] listener thread panicked");
            }
        }
    }
}

/// Runs shows back to back until SIGINT/SIGTERM. Returns `Ok` after a clean
/// stop, or the error of a run that failed to start.
pub fn run(config: ShowConfig) -> Result<()> {
    let journal = ShowJournal::new();
    if let Some(path) = &config.journal_path {
        match journal.start_exporter(path.clone()) {
            Ok(()) => info!("[Supervisor] journal -> {}", path.display()),
            Err(e) => warn!("[Supervisor] journal disabled: {}", e),
        }
    }

    let (restart_tx, restarts) = unbounded();
    let signal_tx = restart_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal_tx.send(RestartReason::Shutdown);
    }) {
        warn!("[Supervisor] no signal handler, a kill skips cleanup: {}", e);
    }

    supervise(&config, &journal, restart_tx, restarts, build_run)
}

fn supervise(
    config: &ShowConfig,
    journal: &ShowJournal,
    restart_tx: Sender<RestartReason>,
    restarts: Receiver<RestartReason>,
    build: impl Fn(&ShowConfig, &ShowJournal, Sender<RestartReason>) -> Result<Run>,
) -> Result<()> {
    let mut generation: u64 = 0;
    loop {
        generation += 1;
        info!("[Supervisor] === show #{} ===", generation);

        let run = match build(config, journal, restart_tx.clone()) {
            Ok(run) => run,
            Err(e) => {
                journal.stop_exporter();
                return Err(e);
            }
        };
        run.show.start();

        let reason = restarts.recv();
        run.teardown();

        // A signal may land while the old show was being torn down.
        let mut stop = matches!(reason, Ok(RestartReason::Shutdown));
        for pending in restarts.try_iter() {
            stop |= pending == RestartReason::Shutdown;
        }
        if stop {
            info!("[Supervisor] shutdown requested, stopping");
            journal.stop_exporter();
            return Ok(());
        }

        match reason {
            Ok(reason) => info!("[Supervisor] restarting ({})", reason.name()),
            Err(_) => warn!("[Supervisor] restart channel closed, rebuilding"),
        }
        thread::sleep(Duration::from_secs_f64(config.restart_pause.max(0.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{
        fs,
        sync::atomic::{AtomicUsize, Ordering},
        time::Instant,
    };

    fn config(journal: &std::path::Path) -> ShowConfig {
        ShowConfig {
            console_addr: "127.0.0.1:5000".into(),
            audio_addr: "127.0.0.1:8000".into(),
            listen_addr: "127.0.0.1:0".into(),
            seat_backend: SeatBackend::Simulated,
            dry_run: true,
            startup_settle: 0.0,
            restart_pause: 0.0,
            journal_path: Some(journal.to_path_buf()),
            ..ShowConfig::default()
        }
    }

    #[test]
    fn shutdown_tears_down_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        let config = config(&path);
        let journal = ShowJournal::new();
        journal.start_exporter(path.clone()).unwrap();

        let shows: Mutex<Vec<Arc<Show>>> = Mutex::new(Vec::new());
        let (tx, rx) = unbounded();
        tx.send(RestartReason::Shutdown).unwrap();

        let result = supervise(&config, &journal, tx, rx, |c, j, restart_tx| {
            let run = build_run(c, j, restart_tx)?;
            shows.lock().push(Arc::clone(&run.show));
            Ok(run)
        });

        assert!(result.is_ok());
        let shows = shows.lock();
        assert_eq!(shows.len(), 1);
        assert!(!shows[0].is_running());
        // Exporter was stopped, so the final rows are on disk.
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(",act,1,"));
    }

    #[test]
    fn restart_rebuilds_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("journal.csv"));
        let journal = ShowJournal::new();
        let builds = AtomicUsize::new(0);
        let (tx, rx) = unbounded();
        let control = tx.clone();

        let result = thread::scope(|s| {
            let supervisor = s.spawn(|| {
                supervise(&config, &journal, tx, rx, |c, j, restart_tx| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    build_run(c, j, restart_tx)
                })
            });

            control.send(RestartReason::EndOfShow).unwrap();
            let deadline = Instant::now() + Duration::from_secs(10);
            while builds.load(Ordering::SeqCst) < 2 {
                assert!(Instant::now() < deadline, "show was not rebuilt");
                thread::sleep(Duration::from_millis(5));
            }
            control.send(RestartReason::Shutdown).unwrap();
            supervisor.join().unwrap()
        });

        assert!(result.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }
}
