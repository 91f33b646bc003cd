//! listener.rs
//! OSC/UDP entry point for playhead samples from the audio engine.
//! - every address is accepted off the wire; only `/time/str` carries a sample
//! - bundles are flattened in order
//! - packets are handled one at a time on the listener thread, preserving arrival order

use log::{debug, info, warn};
use rosc::{OscMessage, OscPacket, OscType};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crate::input::timeline::parse_time_str;
use crate::utils::error::Result;

pub const TIME_ADDRESS: &str = "/time/str";

const READ_TIMEOUT_MS: u64 = 250;

/// Playhead seconds carried by a single message, if it is a well-formed time message.
pub fn playhead_from_message(msg: &OscMessage) -> Option<f64> {
    if msg.addr != TIME_ADDRESS {
        return None;
    }
    match msg.args.first()? {
        OscType::String(s) => parse_time_str(s),
        _ => None,
    }
}

pub fn playhead_from_packet(packet: &OscPacket, out: &mut Vec<f64>) {
    match packet {
        OscPacket::Message(msg) => out.extend(playhead_from_message(msg)),
        OscPacket::Bundle(bundle) => {
            for inner in &bundle.content {
                playhead_from_packet(inner, out);
            }
        }
    }
}

pub fn decode_datagram(buf: &[u8]) -> Result<Vec<f64>> {
    let (_, packet) = rosc::decoder::decode_udp(buf)?;
    let mut samples = Vec::new();
    playhead_from_packet(&packet, &mut samples);
    Ok(samples)
}

pub struct Listener {
    socket: UdpSocket,
    running: Arc<AtomicBool>,
}

impl Listener {
    /// Binds with SO_REUSEADDR so a rebuilt show can take the port back straight away.
    pub fn bind(addr: SocketAddr, running: Arc<AtomicBool>) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))?;
        let socket: UdpSocket = socket.into();
        info!("[Listener] OSC on {}", socket.local_addr()?);
        Ok(Self { socket, running })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocks until `running` goes false, handing each decoded sample to `on_sample`.
    pub fn run(&self, mut on_sample: impl FnMut(f64)) {
        let mut buf = [0u8; rosc::decoder::MTU];

        while self.running.load(Ordering::Acquire) {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => match decode_datagram(&buf[..n]) {
                    Ok(samples) => {
                        for s in samples {
                            on_sample(s);
                        }
                    }
                    Err(e) => debug!("[Listener] dropped packet from {}: {}", from, e),
                },
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) => {
                    warn!("[Listener] recv failed: {}", e);
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }

        debug!("[Listener] stopped.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use rosc::{OscBundle, OscTime, encoder};

    fn time_msg(s: &str) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: TIME_ADDRESS.into(),
            args: vec![OscType::String(s.into())],
        })
    }

    #[test]
    fn only_time_address_is_used() {
        let other = OscMessage { addr: "/time/beats".into(), args: vec![OscType::String("3:49".into())] };
        assert_eq!(playhead_from_message(&other), None);

        let float_arg = OscMessage { addr: TIME_ADDRESS.into(), args: vec![OscType::Float(229.0)] };
        assert_eq!(playhead_from_message(&float_arg), None);

        let empty = OscMessage { addr: TIME_ADDRESS.into(), args: vec![] };
        assert_eq!(playhead_from_message(&empty), None);
    }

    #[test]
    fn bundle_is_flattened_in_order() {
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime { seconds: 0, fractional: 1 },
            content: vec![time_msg("0:10"), time_msg("garbage"), time_msg("0:11")],
        });
        let bytes = encoder::encode(&bundle).unwrap();
        assert_eq!(decode_datagram(&bytes).unwrap(), vec![10.0, 11.0]);
    }

    #[test]
    fn garbage_datagram_is_an_error() {
        assert!(decode_datagram(&[1, 2, 3]).is_err());
    }

    #[test]
    fn receives_over_udp() {
        let running = Arc::new(AtomicBool::new(true));
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), running.clone()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = unbounded();

        let handle = thread::spawn(move || listener.run(|s| tx.send(s).unwrap()));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        for s in ["3:48.5", "\"3:49.25\""] {
            sender.send_to(&encoder::encode(&time_msg(s)).unwrap(), addr).unwrap();
        }

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 228.5);
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 229.25);

        running.store(false, Ordering::Release);
        handle.join().unwrap();
    }
}
