//! Show journal: what the controller did, in order, for post-show review.
//!
//! - `record()` pushes onto a bounded lock-free queue and returns immediately
//! - a consumer thread drains the queue and appends CSV rows to the journal file
//! - full queue drops the event (journal never blocks cue dispatch)

use crossbeam_queue::ArrayQueue;
use csv::{Writer, WriterBuilder};
use log::{debug, error};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

const JOURNAL_CAPACITY: usize = 4096;
const CONSUMER_POLL_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum ShowEvent {
    CueSent {
        destination: &'static str,
        address: String,
        payload: String,
        delivered: bool,
    },
    ActFired {
        act: &'static str,
        playhead: Option<f64>,
    },
    SeekBack {
        from: f64,
        to: f64,
    },
    Round1Decided {
        eliminated: &'static str,
    },
    Round2Decided {
        target: &'static str,
        correct: bool,
    },
    Restart {
        reason: &'static str,
    },
}

impl ShowEvent {
    fn columns(&self) -> (&'static str, String, f64) {
        match self {
            ShowEvent::CueSent { destination, address, payload, delivered } => (
                "cue",
                format!("{} {} {}", destination, address, payload),
                if *delivered { 1.0 } else { 0.0 },
            ),
            ShowEvent::ActFired { act, playhead } => {
                ("act", act.to_string(), playhead.unwrap_or(f64::NAN))
            }
            ShowEvent::SeekBack { from, to } => ("seek_back", format!("{:.2}", from), *to),
            ShowEvent::Round1Decided { eliminated } => ("round1", eliminated.to_string(), 0.0),
            ShowEvent::Round2Decided { target, correct } => {
                ("round2", target.to_string(), if *correct { 1.0 } else { 0.0 })
            }
            ShowEvent::Restart { reason } => ("restart", reason.to_string(), 0.0),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    at: Instant,
    event: ShowEvent,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    seq: u64,
    ts_epoch_ms: u64,
    show_secs: f64,
    event: &'static str,
    detail: String,
    value: f64,
}

#[derive(Clone)]
pub struct ShowJournal {
    queue: Arc<ArrayQueue<Entry>>,
    started: Instant,
    seq: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    consumer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ShowJournal {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(JOURNAL_CAPACITY)),
            started: Instant::now(),
            seq: Arc::new(AtomicU64::new(1)),
            dropped: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            consumer: Arc::new(Mutex::new(None)),
        }
    }

    #[inline]
    pub fn record(&self, event: ShowEvent) {
        let entry = Entry {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            at: Instant::now(),
            event,
        };
        if self.queue.push(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spawns the consumer appending to `output_csv`. The header is written only
    /// when the file is new, so restarts keep extending one journal.
    pub fn start_exporter(&self, output_csv: PathBuf) -> Result<(), String> {
        let mut guard = self.consumer.lock();
        if guard.is_some() {
            return Err("journal exporter already running".into());
        }

        let queue = self.queue.clone();
        let running = self.running.clone();
        let dropped = self.dropped.clone();
        let started = self.started;
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("journal".into())
            .spawn(move || {
                let is_new = !output_csv.exists();
                let file = match OpenOptions::new().create(true).append(true).open(&output_csv) {
                    Ok(f) => f,
                    Err(e) => {
                        error!("failed to open journal {:?}: {}", output_csv, e);
                        return;
                    }
                };
                let mut wtr = WriterBuilder::new().has_headers(is_new).from_writer(file);

                while running.load(Ordering::SeqCst) {
                    let mut any = false;
                    while let Some(entry) = queue.pop() {
                        any = true;
                        write_row(&mut wtr, started, entry);
                    }
                    if any {
                        // Rows must reach the file while the show is still running.
                        wtr.flush().ok();
                    } else {
                        thread::sleep(Duration::from_millis(CONSUMER_POLL_MS));
                    }
                }

                // Final drain
                while let Some(entry) = queue.pop() {
                    write_row(&mut wtr, started, entry);
                }
                wtr.flush().ok();
                debug!("[ShowJournal] exporter exiting. dropped={}", dropped.load(Ordering::Relaxed));
            })
            .map_err(|e| e.to_string())?;

        *guard = Some(handle);
        Ok(())
    }

    pub fn stop_exporter(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.consumer.lock().take() {
            let _ = h.join();
        }
    }
}

fn write_row<W: Write>(wtr: &mut Writer<W>, started: Instant, entry: Entry) {
    let (event, detail, value) = entry.event.columns();
    let row = CsvRow {
        seq: entry.seq,
        ts_epoch_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64,
        show_secs: entry.at.duration_since(started).as_secs_f64(),
        event,
        detail,
        value,
    };
    wtr.serialize(&row).ok();
}

impl Default for ShowJournal {
    fn default() -> Self {
        Self::new()
    }
}
