//! MIDI output: device enumeration, connection, and message sending via a dedicated thread.

use crate::error::{Error, Result};
use crate::event::MidiMessage;
use crate::sink::MidiSink;
use conductor_core::AtomicFlag;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputDevice {
    pub index: usize,
    pub name: String,
}

enum OutputCommand {
    Connect(usize, Sender<Result<String>>),
    Disconnect,
    Send(MidiMessage),
    Shutdown,
}

/// Hardware sink backed by midir.
///
/// The connection lives on its own thread; `send` only queues the message,
/// so callers never block on the platform backend.
pub struct MidiOutputSink {
    commands: Sender<OutputCommand>,
    connected_device: Arc<arc_swap::ArcSwap<Option<String>>>,
    connected: Arc<AtomicFlag>,
    thread: Option<JoinHandle<()>>,
}

impl MidiOutputSink {
    pub fn new() -> Result<Self> {
        let (commands, receiver) = bounded(1024);
        let connected_device = Arc::new(arc_swap::ArcSwap::new(Arc::new(None)));
        let connected = Arc::new(AtomicFlag::new(false));

        let device = Arc::clone(&connected_device);
        let flag = Arc::clone(&connected);
        let thread = thread::Builder::new()
            .name("midi-output".to_string())
            .spawn(move || Self::output_thread(receiver, device, flag))
            .map_err(|e| Error::MidiDevice(format!("failed to spawn output thread: {e}")))?;

        Ok(Self {
            commands,
            connected_device,
            connected,
            thread: Some(thread),
        })
    }

    fn output_thread(
        commands: Receiver<OutputCommand>,
        connected_device: Arc<arc_swap::ArcSwap<Option<String>>>,
        connected: Arc<AtomicFlag>,
    ) {
        let mut connection: Option<MidiOutputConnection> = None;

        let release = |connection: &mut Option<MidiOutputConnection>| {
            if let Some(conn) = connection.take() {
                drop(conn);
                info!("MIDI output disconnected");
            }
            connected.set(false);
            connected_device.store(Arc::new(None));
        };

        loop {
            match commands.recv_timeout(Duration::from_millis(100)) {
                Ok(OutputCommand::Connect(index, reply)) => {
                    release(&mut connection);
                    let result = Self::connect_to_device(index).map(|(conn, name)| {
                        connection = Some(conn);
                        info!(device = %name, "MIDI output connected");
                        name
                    });
                    if let Ok(name) = &result {
                        connected.set(true);
                        connected_device.store(Arc::new(Some(name.clone())));
                    }
                    let _ = reply.send(result);
                }
                Ok(OutputCommand::Disconnect) => release(&mut connection),
                Ok(OutputCommand::Send(message)) => match connection.as_mut() {
                    Some(conn) => {
                        if let Err(e) = conn.send(&message.to_bytes()) {
                            warn!("MIDI output send failed, dropping connection: {e}");
                            release(&mut connection);
                        }
                    }
                    None => debug!("Cannot send MIDI message: no device connected"),
                },
                Ok(OutputCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    release(&mut connection);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    fn connect_to_device(index: usize) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new("conductor-output")?;

        let ports = midi_output.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| Error::MidiDevice(format!("MIDI output device {index} not found")))?;

        let name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {index}"));

        let connection = midi_output.connect(port, "conductor-output")?;
        Ok((connection, name))
    }

    pub fn list_devices() -> Vec<MidiOutputDevice> {
        let Ok(midi_output) = MidiOutput::new("conductor-device-list") else {
            return Vec::new();
        };
        midi_output
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidiOutputDevice {
                index,
                name: midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {index}")),
            })
            .collect()
    }

    /// Connect to the device at `index`, replacing any current connection.
    /// Returns the device name.
    pub fn connect(&self, index: usize) -> Result<String> {
        let (reply, response) = bounded(1);
        self.commands
            .send(OutputCommand::Connect(index, reply))
            .map_err(|_| Error::MidiDevice("MIDI output thread not running".to_string()))?;
        response
            .recv()
            .map_err(|_| Error::MidiDevice("MIDI output thread not running".to_string()))?
    }

    /// Connect to the first device whose name contains `name` (case-insensitive).
    pub fn connect_by_name(&self, name: &str) -> Result<String> {
        let needle = name.to_lowercase();
        let device = Self::list_devices()
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI output device found matching '{name}'"))
            })?;
        self.connect(device.index)
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(OutputCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn connected_device_name(&self) -> Option<String> {
        Option::clone(&self.connected_device.load())
    }
}

impl MidiSink for MidiOutputSink {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        if !self.connected.get() {
            return Err(Error::SinkUnavailable("no MIDI output connected".to_string()));
        }
        self.commands
            .try_send(OutputCommand::Send(*message))
            .map_err(|e| Error::SinkUnavailable(format!("MIDI output queue: {e}")))
    }
}

impl Drop for MidiOutputSink {
    fn drop(&mut self) {
        let _ = self.commands.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
