//! Remote control via Unix socket
//!
//! Accepts one command per line (see [`crate::command::parse_command`]) and
//! forwards them to the main loop, so parameters can be tuned from a shell:
//! `echo "strength 0.3" | nc -U /tmp/pixelsmear.sock`

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::command::{parse_command, Command, CommandSource};

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/pixelsmear.sock";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Failed to bind socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set socket non-blocking: {0}")]
    NonBlocking(#[source] std::io::Error),

    #[error("MQTT error: {0}")]
    Mqtt(String),
}

/// Controller that listens for commands on a Unix socket
pub struct Controller {
    path: PathBuf,
    receiver: Receiver<Command>,
    shutdown: Arc<AtomicBool>,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Create a new controller listening on the Unix socket at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref().to_path_buf();

        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path).map_err(|source| ControlError::Bind {
            path: path.clone(),
            source,
        })?;

        // Non-blocking so the accept loop can notice a shutdown
        listener
            .set_nonblocking(true)
            .map_err(ControlError::NonBlocking)?;

        let (sender, receiver) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                Self::listener_loop(&listener, &sender, &shutdown);
            })
        };

        tracing::info!(path = %path.display(), "Control socket listening");

        Ok(Self {
            path,
            receiver,
            shutdown,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: &UnixListener, sender: &Sender<Command>, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        Self::handle_client(stream, &sender);
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No connection ready, sleep briefly
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Control socket closed");
                    break;
                }
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: &Sender<Command>) {
        // Accepted streams inherit non-blocking mode on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(error = %e, "Failed to configure control client");
            return;
        }
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            match parse_command(&line) {
                Some(cmd) => {
                    tracing::debug!(command = ?cmd, "Socket command");
                    if sender.send(cmd).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(line = %line.trim(), "Unknown control command"),
            }
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for Controller {
    /// Get any pending commands (non-blocking)
    fn poll(&mut self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Clean up the socket file
        let _ = std::fs::remove_file(&self.path);
    }
}
