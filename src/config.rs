//! Generator configuration.
//!
//! Every section has working defaults, so an empty TOML file is a valid
//! configuration. Values are validated once at construction; nothing in
//! the hot path re-checks them.

use crate::extraction::FeatureSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which noise backend the generator should try to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// No device; every sample comes from system entropy.
    Fallback,
    /// System-entropy backed stand-in for a device.
    System,
    /// Deterministic simulated device (seeded ChaCha20).
    Simulated,
    /// Default microphone captured through ffmpeg.
    #[default]
    Microphone,
}

/// Configuration for the noise source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Backend to open.
    pub backend: SourceBackend,
    /// Sampling rate in Hz.
    pub sample_rate: u32,
    /// Device buffer size in samples; each read pulls half of it.
    pub chunk_size: usize,
    /// Path or name of the ffmpeg executable.
    pub ffmpeg_path: String,
    /// ffmpeg input format (`alsa`, `pulse`, `avfoundation`, `dshow`).
    pub input_format: String,
    /// ffmpeg input device name.
    pub input_device: String,
    /// Seed for the simulated backend.
    pub simulated_seed: u64,
    /// Longest a single device read may wait for audio, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let (input_format, input_device) = if cfg!(target_os = "macos") {
            ("avfoundation", ":0")
        } else if cfg!(target_os = "windows") {
            ("dshow", "audio=default")
        } else {
            ("alsa", "default")
        };

        Self {
            backend: SourceBackend::default(),
            sample_rate: 44_100,
            chunk_size: 1024,
            ffmpeg_path: "ffmpeg".to_string(),
            input_format: input_format.to_string(),
            input_device: input_device.to_string(),
            simulated_seed: 0x5EED,
            read_timeout_ms: 2000,
        }
    }
}

impl SourceConfig {
    /// Creates a configuration for the given backend with default parameters.
    pub fn for_backend(backend: SourceBackend) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Number of samples pulled by one read.
    pub fn samples_per_read(&self) -> usize {
        (self.chunk_size / 2).max(2)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.chunk_size < 4 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidReadTimeout);
        }
        Ok(())
    }
}

/// Configuration for the background collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum number of queued samples; extra samples are dropped.
    pub queue_capacity: usize,
    /// Pause between successful iterations, in milliseconds.
    pub interval_ms: u64,
    /// Pause after a failed iteration, in milliseconds.
    pub backoff_ms: u64,
    /// How long `close()` waits for the worker, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            interval_ms: 10,
            backoff_ms: 100,
            join_timeout_ms: 1000,
        }
    }
}

impl CollectorConfig {
    /// Pause between successful iterations.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Pause after a failed iteration.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Upper bound on waiting for the worker during shutdown.
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }
        if self.join_timeout_ms == 0 {
            return Err(ConfigError::InvalidJoinTimeout);
        }
        Ok(())
    }
}

/// Which bytes feed the quality history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// The four bytes of every emitted value.
    #[default]
    Output,
    /// The first 100 bytes of the material conditioned by every call.
    Material,
}

/// Configuration for the generator itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Size of a system-entropy read replacing a device sample.
    pub fallback_bytes: usize,
    /// Capacity of the quality history in bytes.
    pub history_capacity: usize,
    /// History length below which quality metrics are withheld.
    pub min_history: usize,
    /// Start the background collector when a device is open.
    pub collect_in_background: bool,
    /// Mix extra system entropy and timing material into every call.
    pub supplementary_sources: bool,
    /// Bytes recorded into the quality history.
    pub history_mode: HistoryMode,
    /// Feature extraction stages.
    pub features: FeatureSet,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fallback_bytes: 32,
            history_capacity: 10_000,
            min_history: 100,
            collect_in_background: true,
            supplementary_sources: true,
            history_mode: HistoryMode::default(),
            features: FeatureSet::default(),
        }
    }
}

impl GeneratorConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_bytes == 0 {
            return Err(ConfigError::InvalidFallbackSize);
        }
        if self.min_history == 0 || self.history_capacity < self.min_history {
            return Err(ConfigError::InvalidHistory {
                capacity: self.history_capacity,
                minimum: self.min_history,
            });
        }
        Ok(())
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port.
    pub port: u16,
    /// Bind address.
    pub bind: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            bind: "0.0.0.0".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid sample rate {0} Hz (must be 8000-192000)")]
    InvalidSampleRate(u32),
    #[error("invalid chunk size {0} (must be at least 4)")]
    InvalidChunkSize(usize),
    #[error("device read timeout must be non-zero")]
    InvalidReadTimeout,
    #[error("queue capacity must be non-zero")]
    InvalidQueueCapacity,
    #[error("collector join timeout must be non-zero")]
    InvalidJoinTimeout,
    #[error("fallback read size must be non-zero")]
    InvalidFallbackSize,
    #[error("history capacity {capacity} cannot hold the {minimum}-byte minimum")]
    InvalidHistory { capacity: usize, minimum: usize },
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()?;
        self.collector.validate()?;
        self.generator.validate()
    }
}
