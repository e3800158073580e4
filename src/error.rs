//! Error types shared by the store, the sample cache and the performance helpers

use std::fmt;
use std::path::PathBuf;

/// Errors raised by sardine-tools
#[derive(Debug)]
pub enum ToolsError {
    /// Sample name was never registered in the length cache
    SampleNotFound(String),
    /// Sample name was numbered by a scan but its file could not be decoded
    SampleUndecodable(String),
    /// No Dirt-Samples directory could be located
    SamplesDirNotFound,
    /// Audio file that cannot be decoded for its duration
    UnsupportedAudio(PathBuf),
    /// Key pattern failed to compile
    InvalidPattern(String),
    /// Value that has no counterpart in the parameter store (null, arrays)
    UnsupportedValue(String),
    /// A loop step finished without any duration to sleep for
    MissingStepDuration(usize),
    /// IO error
    Io(std::io::Error),
    /// WAV decoding error
    Wav(String),
    /// Serialization error
    Serde(String),
    /// Configuration error
    Config(String),
}

impl fmt::Display for ToolsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolsError::SampleNotFound(name) => write!(
                f,
                "Sample '{}' not found. Did you forget to call `calculate_sample_lengths()`?",
                name
            ),
            ToolsError::SampleUndecodable(name) => write!(
                f,
                "Sample '{}' was scanned but its duration could not be read",
                name
            ),
            ToolsError::SamplesDirNotFound => {
                write!(f, "Could not find SuperDirt samples directory")
            }
            ToolsError::UnsupportedAudio(path) => {
                write!(f, "Unsupported audio file: {}", path.display())
            }
            ToolsError::InvalidPattern(msg) => write!(f, "Invalid key pattern: {}", msg),
            ToolsError::UnsupportedValue(msg) => write!(f, "Unsupported value: {}", msg),
            ToolsError::MissingStepDuration(step) => {
                write!(f, "No step duration available at step {}", step)
            }
            ToolsError::Io(e) => write!(f, "IO error: {}", e),
            ToolsError::Wav(msg) => write!(f, "WAV error: {}", msg),
            ToolsError::Serde(msg) => write!(f, "Serialization error: {}", msg),
            ToolsError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for ToolsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ToolsError {
    fn from(e: std::io::Error) -> Self {
        ToolsError::Io(e)
    }
}

impl From<hound::Error> for ToolsError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ToolsError::Io(io),
            other => ToolsError::Wav(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolsError {
    fn from(e: serde_json::Error) -> Self {
        ToolsError::Serde(e.to_string())
    }
}

impl From<regex::Error> for ToolsError {
    fn from(e: regex::Error) -> Self {
        ToolsError::InvalidPattern(e.to_string())
    }
}

/// Result type for sardine-tools operations
pub type ToolsResult<T> = Result<T, ToolsError>;
