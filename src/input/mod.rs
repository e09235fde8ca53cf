pub mod decoder;

use std::collections::VecDeque;
use std::future::Future;
use std::io::Read;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver};

use crate::editor::keys::KeyEvent;

pub use decoder::KeyDecoder;

/// Idle time after which a half-received escape sequence is flushed as keys.
const SEQUENCE_FLUSH: Duration = Duration::from_millis(10);
const READ_BUF_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize { width: usize, height: usize },
}

/// Anything the input session can pull events from. `None` means the
/// source is exhausted (stdin closed).
pub trait KeySource {
    fn next_event(&mut self) -> impl Future<Output = Option<InputEvent>> + Send;
}

impl KeySource for Receiver<InputEvent> {
    fn next_event(&mut self) -> impl Future<Output = Option<InputEvent>> + Send {
        self.recv()
    }
}

impl KeySource for UnboundedReceiver<InputEvent> {
    fn next_event(&mut self) -> impl Future<Output = Option<InputEvent>> + Send {
        self.recv()
    }
}

/// Raw stdin decoded into keys, plus terminal resizes on unix.
pub struct StdinKeySource {
    bytes: Receiver<Vec<u8>>,
    decoder: KeyDecoder,
    pending: VecDeque<KeyEvent>,
    #[cfg(unix)]
    resize: Option<tokio::signal::unix::Signal>,
}

impl StdinKeySource {
    /// Start the blocking reader thread. Must be called inside a tokio
    /// runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
        thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "stdin read failed");
                        break;
                    }
                }
            }
            tracing::debug!("stdin reader finished");
        });

        #[cfg(unix)]
        let resize = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change())
            .map_err(|err| tracing::warn!(error = %err, "cannot watch terminal resizes"))
            .ok();

        Self {
            bytes: rx,
            decoder: KeyDecoder::new(),
            pending: VecDeque::new(),
            #[cfg(unix)]
            resize,
        }
    }

    #[cfg(unix)]
    async fn next_chunk(&mut self) -> Option<Chunk> {
        match self.resize.as_mut() {
            Some(signal) => tokio::select! {
                chunk = self.bytes.recv() => chunk.map(Chunk::Bytes),
                Some(()) = signal.recv() => Some(Chunk::Resize),
            },
            None => self.bytes.recv().await.map(Chunk::Bytes),
        }
    }

    #[cfg(not(unix))]
    async fn next_chunk(&mut self) -> Option<Chunk> {
        self.bytes.recv().await.map(Chunk::Bytes)
    }
}

enum Chunk {
    Bytes(Vec<u8>),
    Resize,
}

impl KeySource for StdinKeySource {
    fn next_event(&mut self) -> impl Future<Output = Option<InputEvent>> + Send {
        async move {
            loop {
                if let Some(key) = self.pending.pop_front() {
                    return Some(InputEvent::Key(key));
                }

                let chunk = if self.decoder.has_pending() {
                    match tokio::time::timeout(SEQUENCE_FLUSH, self.next_chunk()).await {
                        Ok(chunk) => chunk,
                        Err(_) => {
                            let flushed = self.decoder.flush();
                            self.pending.extend(flushed);
                            continue;
                        }
                    }
                } else {
                    self.next_chunk().await
                };

                match chunk? {
                    Chunk::Bytes(bytes) => {
                        let keys = self.decoder.advance(&bytes);
                        self.pending.extend(keys);
                    }
                    Chunk::Resize => {
                        let (width, height) = crate::terminal::size();
                        return Some(InputEvent::Resize { width, height });
                    }
                }
            }
        }
    }
}
