//! Microphone capture through an ffmpeg child process.
//!
//! ffmpeg records the configured input device as mono signed 16-bit
//! little-endian PCM and streams it to a pipe, which keeps platform audio
//! APIs out of the crate. The low bits of the samples are dominated by
//! thermal noise in the ADC input stage.
//!
//! A helper thread drains the pipe into a bounded channel so a read can
//! give up after `read_timeout_ms` when ffmpeg stalls.

use super::noise::{NoiseError, NoiseSource, SampleBlock, SourceStatus};
use crate::config::SourceConfig;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::{self, ErrorKind, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Pipe chunks buffered ahead of `read`.
const PIPE_CHUNKS: usize = 16;

/// Size of a single pipe read.
const PIPE_READ_BYTES: usize = 4096;

/// Noise source reading the default microphone via ffmpeg.
#[derive(Debug, Default)]
pub struct MicrophoneSource {
    child: Option<Child>,
    pipe: Option<Receiver<Vec<u8>>>,
    pending: Vec<u8>,
    read_timeout: Duration,
    status: SourceStatus,
    sequence: u64,
}

impl MicrophoneSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(config: &SourceConfig) -> Command {
        let mut command = Command::new(&config.ffmpeg_path);
        command
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(["-f", &config.input_format, "-i", &config.input_device])
            .args(["-ac", "1", "-ar", &config.sample_rate.to_string()])
            .args(["-f", "s16le", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }

    fn read_exact(&mut self, n_samples: usize) -> Result<Vec<u8>, NoiseError> {
        let pipe = self.pipe.as_ref().ok_or(NoiseError::NotOpen)?;
        let wanted = n_samples * 2;
        let deadline = Instant::now() + self.read_timeout;

        while self.pending.len() < wanted {
            match pipe.recv_deadline(deadline) {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(NoiseError::ReadFailed(format!(
                        "no audio within {} ms",
                        self.read_timeout.as_millis()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // ffmpeg exited: the device went away or never opened.
                    self.status = SourceStatus::Stopped;
                    return Err(NoiseError::ReadFailed("audio stream ended".into()));
                }
            }
        }

        Ok(self.pending.drain(..wanted).collect())
    }

    fn terminate(&mut self) {
        self.pipe = None;
        self.pending.clear();
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited is the common case here.
                tracing::debug!(error = %e, "ffmpeg kill failed");
            }
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "Failed to reap ffmpeg process");
            }
        }
    }
}

/// Forwards ffmpeg's stdout in chunks until end of stream or until the
/// receiving side is dropped.
fn spawn_pipe_reader(mut stdout: ChildStdout) -> io::Result<Receiver<Vec<u8>>> {
    let (tx, rx) = bounded(PIPE_CHUNKS);
    thread::Builder::new()
        .name("ffmpeg-pipe".into())
        .spawn(move || {
            let mut buf = [0u8; PIPE_READ_BYTES];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!(error = %e, "ffmpeg pipe read failed");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

impl NoiseSource for MicrophoneSource {
    fn name(&self) -> &str {
        "microphone"
    }

    fn open(&mut self, config: &SourceConfig) -> Result<(), NoiseError> {
        config
            .validate()
            .map_err(|e| NoiseError::OpenFailed(e.to_string()))?;
        self.terminate();

        let mut child = Self::command(config).spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                NoiseError::DeviceNotFound(format!("{} not found on PATH", config.ffmpeg_path))
            } else {
                NoiseError::OpenFailed(e.to_string())
            }
        })?;

        let stdout = child.stdout.take();
        self.child = Some(child);
        let pipe = stdout
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "ffmpeg stdout not captured"))
            .and_then(spawn_pipe_reader);
        match pipe {
            Ok(pipe) => self.pipe = Some(pipe),
            Err(e) => {
                self.terminate();
                self.status = SourceStatus::Unavailable;
                return Err(NoiseError::OpenFailed(e.to_string()));
            }
        }
        self.read_timeout = Duration::from_millis(config.read_timeout_ms);
        self.sequence = 0;
        self.status = SourceStatus::Active;

        // Prime one chunk: ffmpeg exits straight away when the device
        // cannot be opened, which surfaces here as end-of-stream.
        if let Err(e) = self.read_exact(config.samples_per_read()) {
            self.terminate();
            self.status = SourceStatus::Unavailable;
            return Err(NoiseError::OpenFailed(format!(
                "{} input '{}': {}",
                config.input_format, config.input_device, e
            )));
        }

        tracing::info!(
            format = %config.input_format,
            device = %config.input_device,
            sample_rate = config.sample_rate,
            "Microphone opened for entropy collection"
        );
        Ok(())
    }

    fn read(&mut self, n_samples: usize) -> Result<SampleBlock, NoiseError> {
        if !self.status.is_active() {
            return Err(NoiseError::NotOpen);
        }
        let bytes = self.read_exact(n_samples)?;
        self.sequence += 1;
        Ok(SampleBlock::from_le_bytes(&bytes, self.sequence))
    }

    fn status(&self) -> SourceStatus {
        self.status
    }

    fn close(&mut self) {
        if self.child.is_none() {
            return;
        }
        self.terminate();
        self.status = SourceStatus::Stopped;
        tracing::info!("Microphone closed");
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.close();
    }
}
