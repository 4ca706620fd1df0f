//! MIDI input port polled by the arpeggiator.
//!
//! The midir connection is opened and held on a dedicated thread; its
//! callback pushes parsed messages into a bounded channel that `poll` drains.
//! The thread re-lists devices periodically and closes the connection when
//! its device disappears, which disconnects the channel so `poll` reports
//! `PortClosed`.

use crate::error::{Error, Result};
use crate::event::MidiMessage;
use crate::source::MidiInputSource;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const INPUT_QUEUE_CAPACITY: usize = 256;
const DEVICE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortExit {
    Closed,
    DeviceLost,
}

/// Block until the port handle closes or `present` reports the device gone.
fn watch_port(
    closed: &Receiver<()>,
    interval: Duration,
    mut present: impl FnMut() -> bool,
) -> PortExit {
    loop {
        match closed.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if !present() {
                    return PortExit::DeviceLost;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return PortExit::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

pub struct MidiInputPort {
    name: String,
    messages: Receiver<MidiMessage>,
    close: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MidiInputPort {
    pub fn list_devices() -> Vec<MidiInputDevice> {
        let Ok(midi_input) = MidiInput::new("conductor-device-list") else {
            return Vec::new();
        };
        midi_input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidiInputDevice {
                index,
                name: midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {index}")),
            })
            .collect()
    }

    /// Open the input device at `index`.
    pub fn open(index: usize) -> Result<Self> {
        let (producer, messages) = bounded(INPUT_QUEUE_CAPACITY);
        let (close, closed) = bounded::<()>(1);
        let (reply, opened) = bounded(1);

        let thread = thread::Builder::new()
            .name("midi-input".to_string())
            .spawn(move || {
                let (connection, name) = match Self::connect_to_device(index, producer) {
                    Ok((connection, name)) => {
                        let _ = reply.send(Ok(name.clone()));
                        (connection, name)
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return;
                    }
                };
                let exit = watch_port(&closed, DEVICE_CHECK_INTERVAL, || {
                    Self::list_devices().iter().any(|d| d.name == name)
                });
                // Dropping the callback releases the producer side
                let _ = connection.close();
                match exit {
                    PortExit::Closed => info!(device = %name, "MIDI input closed"),
                    PortExit::DeviceLost => warn!(device = %name, "MIDI input device lost"),
                }
            })
            .map_err(|e| Error::MidiDevice(format!("failed to spawn input thread: {e}")))?;

        let name = opened
            .recv()
            .map_err(|_| Error::MidiDevice("MIDI input thread exited".to_string()))??;
        info!(device = %name, "MIDI input connected");

        Ok(Self {
            name,
            messages,
            close,
            thread: Some(thread),
        })
    }

    /// Open the first input device whose name contains `name` (case-insensitive).
    pub fn open_by_name(name: &str) -> Result<Self> {
        let needle = name.to_lowercase();
        let device = Self::list_devices()
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI input device found matching '{name}'"))
            })?;
        Self::open(device.index)
    }

    fn connect_to_device(
        index: usize,
        producer: Sender<MidiMessage>,
    ) -> Result<(MidiInputConnection<()>, String)> {
        let mut midi_input = MidiInput::new("conductor-input")?;
        midi_input.ignore(Ignore::All);

        let ports = midi_input.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| Error::MidiDevice(format!("MIDI input device {index} not found")))?;

        let name = midi_input
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {index}"));

        let connection = midi_input.connect(
            port,
            "conductor-input",
            move |_timestamp, bytes, _| match MidiMessage::from_bytes(bytes) {
                Some(message) => {
                    if producer.try_send(message).is_err() {
                        debug!("MIDI input queue full, dropping message");
                    }
                }
                None => debug!("Ignoring malformed MIDI input: {bytes:?}"),
            },
            (),
        )?;

        Ok((connection, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiInputSource for MidiInputPort {
    fn poll(&mut self) -> Result<Option<MidiMessage>> {
        match self.messages.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::PortClosed(self.name.clone())),
        }
    }
}

impl Drop for MidiInputPort {
    fn drop(&mut self) {
        let _ = self.close.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
