//! Voice recorder
//!
//! Captures audio from a `Microphone`. A recording stops on `stop()` or
//! automatically after `RECORDING_LIMIT`, whichever comes first; both paths
//! release the device.

use crate::logging;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

pub const RECORDING_LIMIT: Duration = Duration::from_secs(5);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Microphone access was denied. Please allow microphone access to record.")]
    PermissionDenied,
    #[error("No microphone is available")]
    Unavailable,
    #[error("Already recording")]
    AlreadyRecording,
    #[error("Not recording")]
    NotRecording,
    #[error("Microphone error: {0}")]
    Device(String),
}

/// A recording in progress. Finishing it releases the device.
#[async_trait]
pub trait Capture: Send {
    async fn finish(self: Box<Self>) -> Vec<u8>;
}

#[async_trait]
pub trait Microphone: Send + Sync {
    /// Request access and start capturing
    async fn open(&self) -> Result<Box<dyn Capture>, RecordingError>;
}

#[derive(Default)]
struct RecorderInner {
    capture: Option<Box<dyn Capture>>,
    /// Auto-stop task for the current recording. Kept after it fires so
    /// `stop` can wait for a capture it is still finishing.
    timer: Option<JoinHandle<()>>,
    generation: u64,
    /// Audio from a recording the limit cut off, held until `stop`
    timed_out: Option<Vec<u8>>,
}

pub struct VoiceRecorder {
    mic: Arc<dyn Microphone>,
    limit: Duration,
    inner: Arc<Mutex<RecorderInner>>,
}

fn lock(inner: &Mutex<RecorderInner>) -> std::sync::MutexGuard<'_, RecorderInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl VoiceRecorder {
    pub fn new(mic: Arc<dyn Microphone>) -> Self {
        Self::with_limit(mic, RECORDING_LIMIT)
    }

    pub fn with_limit(mic: Arc<dyn Microphone>, limit: Duration) -> Self {
        Self {
            mic,
            limit,
            inner: Arc::new(Mutex::new(RecorderInner::default())),
        }
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.inner).capture.is_some()
    }

    pub async fn start(&self) -> Result<(), RecordingError> {
        if self.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }

        let capture = match self.mic.open().await {
            Ok(capture) => capture,
            Err(e) => {
                logging::log_error(None, &format!("Recording not started: {}", e));
                return Err(e);
            }
        };

        let started = {
            let mut inner = lock(&self.inner);
            if inner.capture.is_some() {
                Err(capture)
            } else {
                inner.generation += 1;
                inner.capture = Some(capture);
                inner.timed_out = None;
                Ok(inner.generation)
            }
        };
        let generation = match started {
            Ok(generation) => generation,
            Err(extra) => {
                extra.finish().await;
                return Err(RecordingError::AlreadyRecording);
            }
        };

        let shared = Arc::clone(&self.inner);
        let limit = self.limit;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            let capture = {
                let mut inner = lock(&shared);
                if inner.generation != generation {
                    return;
                }
                inner.capture.take()
            };
            if let Some(capture) = capture {
                let audio = capture.finish().await;
                logging::log_speech(&format!("Recording auto-stopped after {:?} ({} bytes)", limit, audio.len()));
                let mut inner = lock(&shared);
                // A newer recording owns the slot now
                if inner.generation == generation {
                    inner.timed_out = Some(audio);
                }
            }
        });
        lock(&self.inner).timer = Some(timer);

        logging::log_speech("Recording started");
        Ok(())
    }

    /// End the recording and return the captured audio. After an automatic
    /// stop this returns what was captured up to the limit.
    pub async fn stop(&self) -> Result<Vec<u8>, RecordingError> {
        let (capture, timer) = {
            let mut inner = lock(&self.inner);
            (inner.capture.take(), inner.timer.take())
        };

        if let Some(capture) = capture {
            if let Some(timer) = timer {
                timer.abort();
            }
            let audio = capture.finish().await;
            logging::log_speech(&format!("Recording stopped ({} bytes)", audio.len()));
            return Ok(audio);
        }

        // The limit already took the capture; wait until it has been finished
        if let Some(timer) = timer {
            let _ = timer.await;
        }
        lock(&self.inner).timed_out.take().ok_or(RecordingError::NotRecording)
    }
}

// ============ Command-line microphone ============

/// Records WAV from `arecord` (ALSA) or `rec` (SoX)
pub struct CommandMicrophone {
    program: Option<PathBuf>,
}

impl Default for CommandMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandMicrophone {
    pub fn new() -> Self {
        let program = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                ["arecord", "rec"]
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            })
        });
        Self { program }
    }
}

struct ProcessCapture {
    child: Child,
    reader: JoinHandle<Vec<u8>>,
}

#[async_trait]
impl Capture for ProcessCapture {
    async fn finish(mut self: Box<Self>) -> Vec<u8> {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        self.reader.await.unwrap_or_default()
    }
}

#[async_trait]
impl Microphone for CommandMicrophone {
    async fn open(&self) -> Result<Box<dyn Capture>, RecordingError> {
        let program = self.program.as_ref().ok_or(RecordingError::Unavailable)?;

        let mut command = Command::new(program);
        if program.ends_with("arecord") {
            command.args(["-q", "-f", "cd", "-t", "wav", "-"]);
        } else {
            command.args(["-q", "-t", "wav", "-"]);
        }

        let mut child = command
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => RecordingError::PermissionDenied,
                _ => RecordingError::Device(e.to_string()),
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecordingError::Device("No audio stream".to_string()))?;
        let reader = tokio::spawn(async move {
            let mut audio = Vec::new();
            let _ = stdout.read_to_end(&mut audio).await;
            audio
        });

        Ok(Box::new(ProcessCapture { child, reader }))
    }
}
