//! Pseudo-terminal hosting with timed keystroke injection.
//!
//! The child runs inside a pty sized like the current terminal. Its output is
//! relayed to our stdout and our stdin is forwarded to it, so the session is
//! fully interactive. The payload is typed on a fixed schedule with no
//! acknowledgment that the program is ready for it.

use std::{
    io::{ErrorKind, Read, Write},
    path::Path,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use async_trait::async_trait;
use cxresume_core::{InjectTiming, LaunchError, PtyInjector};
use portable_pty::{CommandBuilder, PtySize, native_pty_system};
use thiserror::Error;

use crate::shell::get_shell_command;

const FALLBACK_COLS: u16 = 120;
const FALLBACK_ROWS: u16 = 30;
const READ_BUF: usize = 8192;
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

type SharedWriter = Arc<StdMutex<Box<dyn Write + Send>>>;

/// Pseudo-terminal error.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("Failed to open pty: {0}")]
    Open(String),
    #[error("Failed to spawn in pty: {0}")]
    Spawn(String),
    #[error("Pty I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PtyError> for LaunchError {
    fn from(err: PtyError) -> Self {
        match err {
            PtyError::Open(msg) => Self::PtyUnavailable(msg),
            PtyError::Spawn(msg) => Self::Spawn(msg),
            PtyError::Io(e) => Self::Io(e),
        }
    }
}

/// One scheduled write: wait `delay`, then send `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub delay: Duration,
    pub bytes: Vec<u8>,
}

impl Frame {
    fn new(delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            delay,
            bytes: bytes.into(),
        }
    }
}

/// The write schedule for `payload`.
///
/// Newlines become carriage returns so multi-line text is submitted line by
/// line instead of landing as one bracketed paste.
#[must_use]
pub fn injection_frames(payload: &str, timing: &InjectTiming) -> Vec<Frame> {
    let body = payload.replace('\n', "\r");
    let mut frames = Vec::with_capacity(3);
    if timing.wake_enter {
        frames.push(Frame::new(timing.initial_delay, "\r"));
        frames.push(Frame::new(timing.effective_wake_delay(), body));
    } else {
        frames.push(Frame::new(timing.initial_delay, body));
    }
    frames.push(Frame::new(InjectTiming::SUBMIT_DELAY, "\r"));
    frames
}

/// [`PtyInjector`] backed by the platform's native pty.
#[derive(Debug, Clone, Default)]
pub struct NativePtyInjector;

impl NativePtyInjector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PtyInjector for NativePtyInjector {
    async fn run_injected(
        &self,
        command: &str,
        working_dir: &Path,
        payload: &str,
        timing: &InjectTiming,
    ) -> Result<i32, LaunchError> {
        let frames = injection_frames(payload, timing);
        Ok(run_in_pty(command, working_dir, frames).await?)
    }
}

async fn run_in_pty(command: &str, working_dir: &Path, frames: Vec<Frame>) -> Result<i32, PtyError> {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((FALLBACK_COLS, FALLBACK_ROWS));
    let pair = native_pty_system()
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| PtyError::Open(e.to_string()))?;

    let (shell, shell_arg) = get_shell_command();
    let mut builder = CommandBuilder::new(shell);
    builder.arg(shell_arg);
    builder.arg(command);
    builder.cwd(working_dir);

    let mut child = pair
        .slave
        .spawn_command(builder)
        .map_err(|e| PtyError::Spawn(e.to_string()))?;
    // Only the child holds the slave side, so the reader sees EOF when it exits.
    drop(pair.slave);

    tracing::debug!(command, cwd = %working_dir.display(), rows, cols, "Spawned in pty");

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| PtyError::Open(e.to_string()))?;
    let writer: SharedWriter = Arc::new(StdMutex::new(
        pair.master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?,
    ));

    let raw = RawModeGuard::enable();

    let output_handle = tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_BUF];
        let mut stdout = std::io::stdout();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if stdout.write_all(&buf[..n]).and_then(|()| stdout.flush()).is_err() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    forward_stdin(writer.clone());

    let inject_handle = tokio::spawn({
        let writer = writer.clone();
        async move {
            for frame in frames {
                tokio::time::sleep(frame.delay).await;
                let writer = writer.clone();
                let written = tokio::task::spawn_blocking(move || write_bytes(&writer, &frame.bytes)).await;
                if !matches!(written, Ok(Ok(()))) {
                    tracing::debug!("Pty closed before injection finished");
                    break;
                }
            }
        }
    });

    let status = tokio::task::spawn_blocking(move || child.wait())
        .await
        .map_err(|e| PtyError::Io(std::io::Error::other(e)))??;

    inject_handle.abort();
    drop(pair.master);
    if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, output_handle).await.is_err() {
        tracing::debug!("Pty output relay did not finish after exit");
    }
    drop(raw);

    let code = i32::try_from(status.exit_code()).unwrap_or(1);
    tracing::debug!(code, "Pty child exited");
    Ok(code)
}

fn write_bytes(writer: &SharedWriter, bytes: &[u8]) -> std::io::Result<()> {
    let mut guard = writer
        .lock()
        .map_err(|_| std::io::Error::other("pty writer poisoned"))?;
    guard.write_all(bytes)?;
    guard.flush()
}

/// Copy our stdin into the pty on a detached thread.
///
/// The thread stays parked on a blocking read after the child exits; it ends
/// with the process.
fn forward_stdin(writer: SharedWriter) {
    let spawned = std::thread::Builder::new()
        .name("pty-stdin".into())
        .spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if write_bytes(&writer, &buf[..n]).is_err() {
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Could not forward stdin to pty");
    }
}

/// Puts the controlling terminal into raw mode for the lifetime of the guard.
struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    fn enable() -> Self {
        let enabled = match crossterm::terminal::enable_raw_mode() {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Raw mode unavailable; input is line buffered");
                false
            }
        };
        Self { enabled }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn frames_without_wake() {
        let timing = InjectTiming {
            initial_delay: ms(1000),
            wake_enter: false,
            wake_delay: ms(250),
        };
        let frames = injection_frames("line one\nline two", &timing);
        assert_eq!(
            frames,
            [
                Frame::new(ms(1000), "line one\rline two"),
                Frame::new(ms(100), "\r"),
            ]
        );
    }

    #[test]
    fn frames_with_wake_clamp_delay() {
        let timing = InjectTiming {
            initial_delay: ms(500),
            wake_enter: true,
            wake_delay: ms(0),
        };
        let frames = injection_frames("p", &timing);
        assert_eq!(
            frames,
            [
                Frame::new(ms(500), "\r"),
                Frame::new(ms(50), "p"),
                Frame::new(ms(100), "\r"),
            ]
        );
    }

    #[test]
    fn open_failure_degrades_to_unavailable() {
        let err: LaunchError = PtyError::Open("no ptys".into()).into();
        assert!(matches!(err, LaunchError::PtyUnavailable(_)));
        let err: LaunchError = PtyError::Spawn("boom".into()).into();
        assert!(matches!(err, LaunchError::Spawn(_)));
    }
}
