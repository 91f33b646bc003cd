//! seat.rs
//! Seat presence sensors: three switches wired active-low (pulled high, driven low when occupied).
//! - `SeatInput` is the hardware seam; `SysfsSeatInput` reads Linux GPIO lines
//! - `SeatSensors` turns raw levels into pressed/unpressed and keeps the last known
//!   state per seat so a failed read leaves the seat unchanged for that cycle

use log::{debug, warn};
use parking_lot::Mutex;
use std::{
    collections::BTreeSet,
    fs,
    io,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crate::utils::clock::Clock;
use crate::utils::config::SeatPins;
use crate::utils::error::{Result, ShowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seat {
    Right,
    Left,
    Middle,
}

impl Seat {
    /// Wiring order of the installation; ties between seats resolve in this order.
    pub const ALL: [Seat; 3] = [Seat::Right, Seat::Left, Seat::Middle];

    pub fn name(&self) -> &'static str {
        match self {
            Seat::Right => "Right",
            Seat::Left => "Left",
            Seat::Middle => "Middle",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Seat::Right => 0,
            Seat::Left => 1,
            Seat::Middle => 2,
        }
    }

    pub fn pin(&self, pins: &SeatPins) -> u32 {
        match self {
            Seat::Right => pins.right,
            Seat::Left => pins.left,
            Seat::Middle => pins.middle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

pub trait SeatInput: Send + Sync {
    fn read(&self, seat: Seat) -> io::Result<Level>;
}

// ============================================================================
// Linux sysfs GPIO
// ============================================================================

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Exports the seat lines on open and unexports them on drop.
///
/// sysfs cannot enable the SoC pull-ups, so the seat switches need external
/// pull-up resistors (or a device-tree overlay) for the idle-high level.
pub struct SysfsSeatInput {
    root: PathBuf,
    pins: [u32; 3],
    exported: Vec<u32>,
}

impl SysfsSeatInput {
    pub fn open(pins: &SeatPins) -> Result<Self> {
        Self::open_at(PathBuf::from(GPIO_ROOT), pins)
    }

    pub fn open_at(root: PathBuf, pins: &SeatPins) -> Result<Self> {
        let mut input = Self {
            root,
            pins: [pins.right, pins.left, pins.middle],
            exported: Vec::new(),
        };

        for pin in input.pins {
            let line = input.line_dir(pin);
            if !line.exists() {
                fs::write(input.root.join("export"), pin.to_string())
                    .map_err(|source| ShowError::Gpio { pin, source })?;
                input.exported.push(pin);
                // udev needs a moment to fix permissions on the new line
                thread::sleep(Duration::from_millis(100));
            }
            fs::write(line.join("direction"), "in")
                .map_err(|source| ShowError::Gpio { pin, source })?;
            debug!("[Seats] GPIO {} configured as input", pin);
        }

        Ok(input)
    }

    fn line_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }
}

impl SeatInput for SysfsSeatInput {
    fn read(&self, seat: Seat) -> io::Result<Level> {
        let pin = self.pins[seat.index()];
        let raw = fs::read_to_string(self.line_dir(pin).join("value"))?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected GPIO value {:?}", other),
            )),
        }
    }
}

impl Drop for SysfsSeatInput {
    fn drop(&mut self) {
        for pin in self.exported.drain(..) {
            if let Err(e) = fs::write(self.root.join("unexport"), pin.to_string()) {
                warn!("[Seats] failed to release GPIO {}: {}", pin, e);
            }
        }
    }
}

// ============================================================================
// Scripted seats (simulation + tests)
// ============================================================================

/// Seat levels driven by a clock: each seat is occupied during its scripted windows.
pub struct ScriptedSeats {
    clock: Arc<dyn Clock>,
    windows: Mutex<[Vec<(f64, f64)>; 3]>,
}

impl ScriptedSeats {
    /// Nobody ever sits.
    pub fn idle(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Mutex::new([Vec::new(), Vec::new(), Vec::new()]),
        }
    }

    /// Occupied from `at` onwards.
    pub fn sit(self, seat: Seat, at: f64) -> Self {
        self.sit_between(seat, at, f64::INFINITY)
    }

    pub fn sit_between(self, seat: Seat, from: f64, until: f64) -> Self {
        self.windows.lock()[seat.index()].push((from, until));
        self
    }
}

impl SeatInput for ScriptedSeats {
    fn read(&self, seat: Seat) -> io::Result<Level> {
        let now = self.clock.now();
        let occupied = self.windows.lock()[seat.index()]
            .iter()
            .any(|&(from, until)| now >= from && now < until);
        Ok(if occupied { Level::Low } else { Level::High })
    }
}

// ============================================================================
// SeatSensors
// ============================================================================

pub struct SeatSensors {
    input: Box<dyn SeatInput>,
    last_known: [AtomicBool; 3],
}

impl SeatSensors {
    pub fn new(input: Box<dyn SeatInput>) -> Self {
        Self {
            input,
            last_known: [AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    /// Active-low: pressed when the line reads low.
    pub fn is_pressed(&self, seat: Seat) -> bool {
        let slot = &self.last_known[seat.index()];
        match self.input.read(seat) {
            Ok(level) => {
                let pressed = level == Level::Low;
                slot.store(pressed, Ordering::Relaxed);
                pressed
            }
            Err(e) => {
                warn!("[Seats] read failed for {} seat, keeping last state: {}", seat.name(), e);
                slot.load(Ordering::Relaxed)
            }
        }
    }

    pub fn all_pressed(&self, seats: &[Seat]) -> bool {
        seats.iter().all(|&s| self.is_pressed(s))
    }

    pub fn count_pressed(&self, seats: &[Seat]) -> BTreeSet<Seat> {
        seats.iter().copied().filter(|&s| self.is_pressed(s)).collect()
    }

    pub fn any_pressed(&self) -> bool {
        Seat::ALL.iter().any(|&s| self.is_pressed(s))
    }
}
