//! Show configuration: TOML file with every field defaulted, plus CLI overrides.
//!
//! Defaults reproduce the installation: console and audio engine endpoints on the
//! exhibit LAN, BCM pins 17/27/22 for the Right/Left/Middle seats, and the
//! timeline of the produced soundtrack.

use serde::Deserialize;
use std::{fs, net::SocketAddr, path::{Path, PathBuf}};

use crate::game::acts::CueTimes;
use crate::utils::error::{Result, ShowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatBackend {
    /// Linux sysfs GPIO (`/sys/class/gpio`)
    Sysfs,
    /// No hardware; seats never report pressed.
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeatPins {
    pub right: u32,
    pub left: u32,
    pub middle: u32,
}

impl Default for SeatPins {
    fn default() -> Self {
        Self { right: 17, left: 27, middle: 22 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    pub console_addr: String,
    pub audio_addr: String,
    pub listen_addr: String,

    pub seat_backend: SeatBackend,
    pub seat_pins: SeatPins,

    /// Seconds all three seats must stay occupied before Act 2.
    pub hold_time: f64,
    pub idle_limit: f64,
    pub watchdog_period: f64,

    pub max_forward_jump: f64,
    pub seek_back_window: f64,
    pub cue_times: CueTimes,

    pub pause_min: f64,
    pub pause_max: f64,
    pub elimination_delay: f64,
    pub victory_delay: f64,
    pub outro_buffer: f64,
    pub restart_pause: f64,
    pub startup_settle: f64,

    pub hold_poll: f64,
    pub round1_poll: f64,
    pub round2_poll: f64,

    pub seed: Option<u64>,
    pub journal_path: Option<PathBuf>,
    /// Log cues instead of sending them.
    pub dry_run: bool,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            console_addr: "192.168.254.231:5000".into(),
            audio_addr: "192.168.254.12:8000".into(),
            listen_addr: "0.0.0.0:2010".into(),
            seat_backend: SeatBackend::Sysfs,
            seat_pins: SeatPins::default(),
            hold_time: 5.0,
            idle_limit: 90.0,
            watchdog_period: 0.5,
            max_forward_jump: 2.0,
            seek_back_window: 5.0,
            cue_times: CueTimes::default(),
            pause_min: 5.0,
            pause_max: 30.0,
            elimination_delay: 3.0,
            victory_delay: 3.0,
            outro_buffer: 2.0,
            restart_pause: 1.0,
            startup_settle: 1.0,
            hold_poll: 0.05,
            round1_poll: 0.05,
            round2_poll: 0.02,
            seed: None,
            journal_path: None,
            dry_run: false,
        }
    }
}

impl ShowConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ShowConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn console_endpoint(&self) -> Result<SocketAddr> {
        parse_addr(&self.console_addr)
    }

    pub fn audio_endpoint(&self) -> Result<SocketAddr> {
        parse_addr(&self.audio_addr)
    }

    pub fn listen_endpoint(&self) -> Result<SocketAddr> {
        parse_addr(&self.listen_addr)
    }

    pub fn validate(&self) -> Result<()> {
        self.console_endpoint()?;
        self.audio_endpoint()?;
        self.listen_endpoint()?;
        if !(self.pause_min > 0.0 && self.pause_min <= self.pause_max && self.pause_max.is_finite()) {
            return Err(ShowError::InvalidConfig(format!(
                "pause range [{}, {}] is empty",
                self.pause_min, self.pause_max
            )));
        }

        // Poll periods and the jump limit of zero would spin or never cross.
        for (name, value) in [
            ("hold_poll", self.hold_poll),
            ("round1_poll", self.round1_poll),
            ("round2_poll", self.round2_poll),
            ("watchdog_period", self.watchdog_period),
            ("max_forward_jump", self.max_forward_jump),
        ] {
            positive(name, value)?;
        }
        for (name, value) in [
            ("hold_time", self.hold_time),
            ("idle_limit", self.idle_limit),
            ("seek_back_window", self.seek_back_window),
            ("elimination_delay", self.elimination_delay),
            ("victory_delay", self.victory_delay),
            ("outro_buffer", self.outro_buffer),
            ("restart_pause", self.restart_pause),
            ("startup_settle", self.startup_settle),
        ] {
            non_negative(name, value)?;
        }

        let times = &self.cue_times;
        let all = [times.act3, times.act6_return, times.act7_end, times.restart]
            .into_iter()
            .chain(times.act5.iter().copied())
            .chain(times.act6.iter().copied());
        for t in all {
            if !t.is_finite() {
                return Err(ShowError::InvalidConfig(format!("cue time {} is not finite", t)));
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ShowError::InvalidConfig(format!("{} must be a finite number above 0, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ShowError::InvalidConfig(format!("{} must be a finite number of seconds, got {}", name, value)))
    }
}

fn parse_addr(s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|e| ShowError::InvalidAddress(format!("{}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_installation_defaults() {
        let cfg = ShowConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:2010");
        assert_eq!(cfg.seat_pins.left, 27);
        assert_eq!(cfg.seat_backend, SeatBackend::Sysfs);
        assert_eq!(cfg.cue_times.act3, 229.0);
        assert_eq!(cfg.idle_limit, 90.0);
    }

    #[test]
    fn partial_override() {
        let cfg = ShowConfig::from_toml_str(
            r#"
            seat_backend = "simulated"
            seed = 7
            hold_time = 2.5

            [seat_pins]
            middle = 5

            [cue_times]
            act5 = [10.0, 20.0]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.seat_backend, SeatBackend::Simulated);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.hold_time, 2.5);
        assert_eq!(cfg.seat_pins.middle, 5);
        assert_eq!(cfg.seat_pins.right, 17);
        assert_eq!(cfg.cue_times.act5, vec![10.0, 20.0]);
        assert_eq!(cfg.cue_times.act3, 229.0);
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let err = ShowConfig::from_toml_str(r#"console_addr = "not-an-address""#).unwrap_err();
        assert!(matches!(err, ShowError::InvalidAddress(_)));
    }

    #[test]
    fn bad_pause_range_is_rejected() {
        assert!(ShowConfig::from_toml_str("pause_min = 40.0").is_err());
    }

    #[test]
    fn zero_poll_is_rejected() {
        let err = ShowConfig::from_toml_str("round2_poll = 0.0").unwrap_err();
        assert!(matches!(err, ShowError::InvalidConfig(ref m) if m.contains("round2_poll")));
        assert!(ShowConfig::from_toml_str("watchdog_period = -0.5").is_err());
    }

    #[test]
    fn infinite_hold_is_rejected() {
        let err = ShowConfig::from_toml_str("hold_time = inf").unwrap_err();
        assert!(matches!(err, ShowError::InvalidConfig(ref m) if m.contains("hold_time")));
        assert!(ShowConfig::from_toml_str("max_forward_jump = nan").is_err());
    }

    #[test]
    fn negative_delay_is_rejected() {
        assert!(ShowConfig::from_toml_str("victory_delay = -1.0").is_err());
        assert!(ShowConfig::from_toml_str("restart_pause = 0.0").is_ok());
    }

    #[test]
    fn non_finite_cue_time_is_rejected() {
        let toml = "[cue_times]\nact6 = [inf]";
        assert!(ShowConfig::from_toml_str(toml).is_err());
    }
}
