//! dispatcher.rs
//! Fire-and-forget cue delivery to the lighting console and the audio engine.
//! - one UDP datagram per cue, no acknowledgement, no retry
//! - delivery failures are logged and journaled, never returned to game logic

use log::{error, info};
use parking_lot::Mutex;
use rosc::{OscMessage, OscPacket, OscType};
use std::{
    fmt,
    net::{SocketAddr, UdpSocket},
    sync::Arc,
};

use crate::utils::error::Result;
use crate::utils::journal::{ShowEvent, ShowJournal};

/// Console command address; the payload is the command line text.
pub const CONSOLE_CMD_ADDRESS: &str = "/gma3/cmd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Console,
    AudioEngine,
}

impl Destination {
    pub fn name(&self) -> &'static str {
        match self {
            Destination::Console => "console",
            Destination::AudioEngine => "audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CuePayload {
    Text(String),
    Trigger(f32),
}

impl fmt::Display for CuePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CuePayload::Text(s) => write!(f, "{:?}", s),
            CuePayload::Trigger(v) => write!(f, "{:.1}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CueMessage {
    pub destination: Destination,
    pub address: String,
    pub payload: CuePayload,
}

impl CueMessage {
    pub fn console_go(sequence: u32) -> Self {
        Self::console(format!("Go+ Sequence {}", sequence))
    }

    pub fn console_off(sequence: u32) -> Self {
        Self::console(format!("Off Sequence {}", sequence))
    }

    fn console(command: String) -> Self {
        Self {
            destination: Destination::Console,
            address: CONSOLE_CMD_ADDRESS.to_string(),
            payload: CuePayload::Text(command),
        }
    }

    /// Audio engine action `/action/<id>` triggered with `1.0`.
    pub fn audio_action(id: u32) -> Self {
        Self {
            destination: Destination::AudioEngine,
            address: format!("/action/{}", id),
            payload: CuePayload::Trigger(1.0),
        }
    }

    pub fn to_osc(&self) -> OscPacket {
        let arg = match &self.payload {
            CuePayload::Text(s) => OscType::String(s.clone()),
            CuePayload::Trigger(v) => OscType::Float(*v),
        };
        OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: vec![arg],
        })
    }
}

/// Transport seam for cue delivery.
pub trait CueSink: Send + Sync {
    fn deliver(&self, msg: &CueMessage, target: SocketAddr) -> Result<()>;
}

pub struct UdpCueSink {
    socket: UdpSocket,
}

impl UdpCueSink {
    pub fn new() -> Result<Self> {
        Ok(Self { socket: UdpSocket::bind("0.0.0.0:0")? })
    }
}

impl CueSink for UdpCueSink {
    fn deliver(&self, msg: &CueMessage, target: SocketAddr) -> Result<()> {
        let bytes = rosc::encoder::encode(&msg.to_osc())?;
        self.socket.send_to(&bytes, target)?;
        Ok(())
    }
}

/// Dry-run transport: the dispatcher's own log line is the only output.
pub struct LogCueSink;

impl CueSink for LogCueSink {
    fn deliver(&self, _msg: &CueMessage, _target: SocketAddr) -> Result<()> {
        Ok(())
    }
}

/// Keeps every delivered cue in order.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<CueMessage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<CueMessage> {
        self.sent.lock().clone()
    }

    pub fn count(&self, msg: &CueMessage) -> usize {
        self.sent.lock().iter().filter(|m| *m == msg).count()
    }
}

impl CueSink for RecordingSink {
    fn deliver(&self, msg: &CueMessage, _target: SocketAddr) -> Result<()> {
        self.sent.lock().push(msg.clone());
        Ok(())
    }
}

pub struct CueDispatcher {
    sink: Arc<dyn CueSink>,
    console: SocketAddr,
    audio: SocketAddr,
    journal: ShowJournal,
}

impl CueDispatcher {
    pub fn new(sink: Arc<dyn CueSink>, console: SocketAddr, audio: SocketAddr, journal: ShowJournal) -> Self {
        Self { sink, console, audio, journal }
    }

    pub fn endpoint(&self, destination: Destination) -> SocketAddr {
        match destination {
            Destination::Console => self.console,
            Destination::AudioEngine => self.audio,
        }
    }

    /// Sends and forgets. Returns whether the transport accepted the datagram,
    /// which callers are free to ignore.
    pub fn send(&self, msg: CueMessage) -> bool {
        let target = self.endpoint(msg.destination);
        let delivered = match self.sink.deliver(&msg, target) {
            Ok(()) => {
                info!("[Cue {} {}] {} -> {}", msg.destination.name(), target, msg.address, msg.payload);
                true
            }
            Err(e) => {
                error!("[Cue {} {}] {} not sent: {}", msg.destination.name(), target, msg.address, e);
                false
            }
        };

        self.journal.record(ShowEvent::CueSent {
            destination: msg.destination.name(),
            address: msg.address,
            payload: msg.payload.to_string(),
            delivered,
        });
        delivered
    }

    pub fn send_all(&self, msgs: impl IntoIterator<Item = CueMessage>) {
        for msg in msgs {
            self.send(msg);
        }
    }
}
