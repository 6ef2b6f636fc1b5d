use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use thiserror::Error;

use crate::config::Config;

// Every command is terminated by a single newline
const TERMINATOR: &str = "\n";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("pipe not found: {}\nMake sure Audacity is running and mod-script-pipe is enabled.", .0.display())]
    PipeNotFound(PathBuf),

    #[error("could not open {}: {}", .path.display(), .source)]
    Connect { path: PathBuf, source: io::Error },

    #[error("not connected to Audacity")]
    NotConnected,

    #[error("pipe i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("Audacity closed the response pipe")]
    Disconnected,

    #[error("no response from Audacity after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("could not parse {kind} info from Audacity: {source}")]
    BadInfo {
        kind: &'static str,
        source: serde_json::Error,
    },

    #[error("{command} failed:\n{response}")]
    CommandFailed { command: String, response: String },

    #[error("{0}")]
    Config(String),
}

#[cfg(windows)]
fn default_pipe_paths() -> Result<(PathBuf, PathBuf)> {
    // Fixed names, one scripting server per machine
    Ok((
        PathBuf::from(r"\\.\pipe\ToSrvPipe"),
        PathBuf::from(r"\\.\pipe\FromSrvPipe"),
    ))
}

#[cfg(unix)]
fn default_pipe_paths() -> Result<(PathBuf, PathBuf)> {
    // Audacity names the pipes after the user that launched it
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .map_err(|_| {
            Error::Config(
                "could not determine the user name: set $USER or configure to_pipe/from_pipe"
                    .to_string(),
            )
        })?;
    Ok((
        PathBuf::from(format!("/tmp/audacity_script_pipe.to.{}", user)),
        PathBuf::from(format!("/tmp/audacity_script_pipe.from.{}", user)),
    ))
}

/// Where this client will look for the two pipes, config overrides applied.
pub fn pipe_paths(config: &Config) -> Result<(PathBuf, PathBuf)> {
    match (&config.to_pipe, &config.from_pipe) {
        (Some(to), Some(from)) => Ok((PathBuf::from(to), PathBuf::from(from))),
        (to, from) => {
            let (default_to, default_from) = default_pipe_paths()?;
            Ok((
                to.as_ref().map(PathBuf::from).unwrap_or(default_to),
                from.as_ref().map(PathBuf::from).unwrap_or(default_from),
            ))
        }
    }
}

// Read lines on a separate thread so waiting for a reply can carry a
// deadline. The thread exits on end-of-file or once the client has
// dropped its end of the channel.
fn spawn_reader(reader: impl Read + Send + 'static) -> Receiver<io::Result<String>> {
    let (sender, receiver) = bounded(64);
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if line.ends_with('\n') {
                        line.pop();
                        if line.ends_with('\r') {
                            line.pop();
                        }
                    }
                    if sender.send(Ok(line.clone())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = sender.send(Err(e));
                    break;
                }
            }
        }
    });
    receiver
}

/// A connection to a running Audacity instance. Strictly one command in
/// flight at a time: send, then read the reply.
pub struct PipeClient {
    writer: Option<Box<dyn Write>>,
    lines: Option<Receiver<io::Result<String>>>,
    timeout: Option<Duration>,
}

impl PipeClient {
    /// Open both ends of the scripting pipe. Audacity creates the pipes at
    /// startup while mod-script-pipe is enabled, so they must already
    /// exist. Failure is reported, never retried.
    pub fn connect(config: &Config) -> Result<Self> {
        let (to_path, from_path) = pipe_paths(config)?;
        Self::connect_paths(&to_path, &from_path, config.timeout())
    }

    fn connect_paths(
        to_path: &Path,
        from_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        // A missing pipe gets a clearer message than the raw open error
        #[cfg(unix)]
        for path in [to_path, from_path] {
            if !path.exists() {
                return Err(Error::PipeNotFound(path.to_path_buf()));
            }
        }

        let writer = OpenOptions::new()
            .write(true)
            .open(to_path)
            .map_err(|source| Error::Connect {
                path: to_path.to_path_buf(),
                source,
            })?;
        let reader = OpenOptions::new()
            .read(true)
            .open(from_path)
            .map_err(|source| Error::Connect {
                path: from_path.to_path_buf(),
                source,
            })?;

        log::debug!(
            "connected: to={} from={}",
            to_path.display(),
            from_path.display()
        );
        Ok(Self::from_halves(writer, reader, timeout))
    }

    /// Wire a client onto already-open halves of the exchange.
    pub(crate) fn from_halves(
        writer: impl Write + 'static,
        reader: impl Read + Send + 'static,
        timeout: Option<Duration>,
    ) -> Self {
        PipeClient {
            writer: Some(Box::new(writer)),
            lines: Some(spawn_reader(reader)),
            timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Write one command down the pipe, terminator appended, flushed so
    /// Audacity sees it immediately.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;
        log::debug!("send: {}", command);
        let framed = format!("{}{}", command, TERMINATOR);
        writer.write_all(framed.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Collect one reply: everything up to the blank line Audacity ends
    /// each response with. Blank lines ahead of any content are skipped.
    /// Without a configured timeout this blocks until the host answers or
    /// closes its pipe; with one, the whole reply must arrive in time.
    pub fn read_response(&mut self) -> Result<String> {
        let lines = self.lines.as_ref().ok_or(Error::NotConnected)?;
        let deadline = self.timeout.map(|t| (t, Instant::now() + t));

        let mut response = String::new();
        loop {
            let received = match deadline {
                None => lines.recv().map_err(|_| Error::Disconnected)?,
                Some((timeout, until)) => {
                    let left = until.saturating_duration_since(Instant::now());
                    match lines.recv_timeout(left) {
                        Ok(received) => received,
                        Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout(timeout)),
                        Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected),
                    }
                }
            };
            let line = received?;

            if line.trim().is_empty() {
                if response.is_empty() {
                    continue;
                }
                break;
            }
            response.push_str(&line);
            response.push('\n');
        }

        response.pop();
        log::debug!("recv: {} bytes", response.len());
        Ok(response)
    }

    /// Send one command and wait for its reply.
    pub fn do_command(&mut self, command: &str) -> Result<String> {
        self.send_command(command)?;
        self.read_response()
    }

    /// Release both ends of the exchange. Safe to call more than once;
    /// afterwards every operation fails with [`Error::NotConnected`].
    pub fn close(&mut self) {
        if self.is_connected() {
            log::debug!("disconnected");
        }
        self.writer.take();
        self.lines.take();
    }
}

impl Drop for PipeClient {
    fn drop(&mut self) {
        self.close();
    }
}
