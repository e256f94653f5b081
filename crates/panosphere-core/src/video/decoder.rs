use super::{DecodePoll, FrameDecoder, FrameReader};
use crate::error::DecodeError;
use crate::frame::VideoFrame;
use instant::Instant;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Frames decoded ahead of the render thread.
const QUEUE_DEPTH: usize = 2;

enum Command {
    Rewind,
    Shutdown,
}

/// Every message carries the rewind generation it was produced in, so frames
/// decoded before a rewind can be dropped on the receiving side.
enum WorkerMessage {
    Frame { epoch: u64, frame: VideoFrame },
    EndOfStream { epoch: u64 },
    Failed { epoch: u64, error: DecodeError },
}

/// Runs a [`FrameReader`] on its own thread and exposes it as a
/// non-blocking [`FrameDecoder`].
///
/// The worker paces output at the reader's nominal frame rate and stays at
/// most [`QUEUE_DEPTH`] frames ahead. Dropping the decoder shuts the worker
/// down and joins it.
pub struct ThreadedDecoder {
    frames: Option<Receiver<WorkerMessage>>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    epoch: u64,
}

impl ThreadedDecoder {
    pub fn spawn<R>(reader: R) -> Result<Self, DecodeError>
    where
        R: FrameReader + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::sync_channel(QUEUE_DEPTH);
        let (command_tx, command_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("panosphere-decode".into())
            .spawn(move || decode_loop(reader, frame_tx, command_rx))?;
        Ok(Self {
            frames: Some(frame_rx),
            commands: command_tx,
            worker: Some(worker),
            epoch: 0,
        })
    }
}

impl FrameDecoder for ThreadedDecoder {
    fn poll_frame(&mut self) -> Result<DecodePoll, DecodeError> {
        let frames = self.frames.as_ref().ok_or(DecodeError::Disconnected)?;
        loop {
            match frames.try_recv() {
                Ok(WorkerMessage::Frame { epoch, frame }) if epoch == self.epoch => {
                    return Ok(DecodePoll::Frame(frame))
                }
                Ok(WorkerMessage::EndOfStream { epoch }) if epoch == self.epoch => {
                    return Ok(DecodePoll::EndOfStream)
                }
                Ok(WorkerMessage::Failed { epoch, error }) if epoch == self.epoch => {
                    return Err(error)
                }
                // Left over from before a rewind.
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(DecodePoll::Pending),
                Err(TryRecvError::Disconnected) => return Err(DecodeError::Disconnected),
            }
        }
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.commands
            .send(Command::Rewind)
            .map_err(|_| DecodeError::Disconnected)?;
        self.epoch += 1;
        Ok(())
    }
}

impl Drop for ThreadedDecoder {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        // Unblocks a worker parked on a full queue.
        drop(self.frames.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[video] decode worker panicked");
            }
        }
    }
}

fn decode_loop<R: FrameReader>(
    mut reader: R,
    frames: SyncSender<WorkerMessage>,
    commands: Receiver<Command>,
) {
    let rate = reader.frame_rate();
    let frame_interval = if rate.is_finite() && rate > 0.0 {
        Duration::from_secs_f64(1.0 / rate)
    } else {
        Duration::ZERO
    };
    log::debug!("[video] decode worker started at {rate:.3} fps");

    let mut epoch = 0u64;
    let mut idle = false;
    let mut next_due = Instant::now();

    loop {
        let command = if idle {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        } else {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        };
        match command {
            Some(Command::Shutdown) => break,
            Some(Command::Rewind) => {
                epoch += 1;
                next_due = Instant::now();
                if let Err(error) = reader.rewind() {
                    idle = true;
                    if frames.send(WorkerMessage::Failed { epoch, error }).is_err() {
                        break;
                    }
                } else {
                    idle = false;
                }
                continue;
            }
            None => {}
        }

        let message = match reader.next_frame() {
            Ok(Some(frame)) => {
                let now = Instant::now();
                if next_due > now {
                    thread::sleep(next_due - now);
                }
                next_due = next_due.max(now) + frame_interval;
                WorkerMessage::Frame { epoch, frame }
            }
            Ok(None) => {
                idle = true;
                WorkerMessage::EndOfStream { epoch }
            }
            Err(error) => {
                idle = true;
                WorkerMessage::Failed { epoch, error }
            }
        };
        if frames.send(message).is_err() {
            break;
        }
    }
    log::debug!("[video] decode worker exiting");
}
