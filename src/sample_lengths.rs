//! Sample length cache for Dirt-Samples style libraries
//!
//! Slicing and time-stretching need to know how long a sample is before it
//! is played. This module scans a sample library once and keeps a map from
//! SuperDirt-style names (`bd:0`, `bd:1`, ...) to durations in seconds.
//!
//! # Directory Structure
//!
//! ```text
//! Dirt-Samples/
//!   bd/
//!     BT0A0A7.wav    -> bd:0
//!     BT0AADA.wav    -> bd:1
//!   sfx/
//!     000_boom.wav   -> sfx:0
//! ```
//!
//! Files are numbered per family in sorted order. When several directories
//! are scanned, numbering for a family continues where the previous
//! directory stopped.
//!
//! # Examples
//!
//! ```
//! use sardine_tools::sample_lengths::SampleLengths;
//!
//! let mut lengths = SampleLengths::new();
//! lengths.insert("x:0", 1.5);
//!
//! assert_eq!(lengths.get_length("x:0").unwrap(), 1.5);
//! assert!(lengths.get_length("x:1").is_err());
//! ```

use crate::error::{ToolsError, ToolsResult};
use lazy_static::lazy_static;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// File extensions counted as samples (case-insensitive)
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "aif", "aiff", "flac", "mp3"];

lazy_static! {
    static ref SAMPLE_LENGTHS: RwLock<SampleLengths> = RwLock::new(SampleLengths::new());
}

/// Durations in seconds keyed by sample name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleLengths {
    lengths: BTreeMap<String, f64>,
    /// Names that were numbered during a scan but could not be decoded
    #[serde(skip)]
    undecodable: BTreeSet<String>,
}

impl SampleLengths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn insert(&mut self, name: &str, seconds: f64) {
        self.lengths.insert(name.to_string(), seconds);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lengths.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.lengths.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Duration of `name` in seconds. Unknown names are a hard error.
    pub fn get_length(&self, name: &str) -> ToolsResult<f64> {
        match self.lengths.get(name) {
            Some(seconds) => Ok(*seconds),
            None if self.undecodable.contains(name) => {
                Err(ToolsError::SampleUndecodable(name.to_string()))
            }
            None => Err(ToolsError::SampleNotFound(name.to_string())),
        }
    }

    /// Number of indices already taken by `family`, decodable or not
    pub fn family_count(&self, family: &str) -> usize {
        let prefix = format!("{}:", family);
        self.lengths
            .keys()
            .chain(self.undecodable.iter())
            .filter(|k| k.starts_with(&prefix))
            .count()
    }

    /// Scan sample directories.
    ///
    /// An empty `dirs` slice falls back to [`default_sample_dirs`]. Without
    /// `families`, every sub-directory of the first directory is used.
    pub fn scan(dirs: &[PathBuf], families: Option<&[String]>) -> ToolsResult<Self> {
        let dirs = if dirs.is_empty() {
            default_sample_dirs()?
        } else {
            dirs.to_vec()
        };

        let mut families: Option<Vec<String>> = families.map(|f| f.to_vec());
        let mut lengths = SampleLengths::new();

        for dir in &dirs {
            let family_names = match &families {
                Some(names) => names.clone(),
                None => {
                    let names = list_families(dir)?;
                    families = Some(names.clone());
                    names
                }
            };

            for family in &family_names {
                let family_dir = dir.join(family);
                if !family_dir.is_dir() {
                    warn!("Sample family '{}' not found in {}", family, dir.display());
                    continue;
                }
                lengths.scan_family(family, &family_dir)?;
            }
        }

        info!("Calculated lengths for {} samples", lengths.len());
        Ok(lengths)
    }

    fn scan_family(&mut self, family: &str, family_dir: &Path) -> ToolsResult<()> {
        let files = list_audio_files(family_dir)?;
        let start_index = self.family_count(family);

        // Header reads are independent, order is restored by the indexed collect
        let durations: Vec<ToolsResult<f64>> =
            files.par_iter().map(|path| sample_duration(path)).collect();

        for (i, (path, duration)) in files.iter().zip(durations).enumerate() {
            let name = format!("{}:{}", family, start_index + i);
            match duration {
                Ok(seconds) => {
                    debug!("{} = {:.3}s", name, seconds);
                    self.lengths.insert(name, seconds);
                }
                Err(e) => {
                    warn!("Error processing {}: {}", path.display(), e);
                    self.undecodable.insert(name);
                }
            }
        }
        Ok(())
    }
}

/// First existing SuperDirt sample location in the user's home directory
pub fn default_sample_dirs() -> ToolsResult<Vec<PathBuf>> {
    let home = dirs::home_dir().ok_or(ToolsError::SamplesDirNotFound)?;
    let candidates = [
        home.join(".local")
            .join("share")
            .join("SuperCollider")
            .join("downloaded-quarks")
            .join("Dirt-Samples"),
        home.join("Library")
            .join("Application Support")
            .join("SuperCollider")
            .join("downloaded-quarks")
            .join("Dirt-Samples"),
    ];

    candidates
        .into_iter()
        .find(|path| path.exists())
        .map(|path| vec![path])
        .ok_or(ToolsError::SamplesDirNotFound)
}

/// Duration of a WAV file in seconds
pub fn sample_duration(path: &Path) -> ToolsResult<f64> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Err(ToolsError::UnsupportedAudio(path.to_path_buf()));
    }

    let reader = hound::WavReader::open(path)?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(ToolsError::Wav(format!("zero sample rate in {}", path.display())));
    }
    Ok(reader.duration() as f64 / sample_rate as f64)
}

fn list_families(dir: &Path) -> ToolsResult<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .collect();
    names.sort();
    Ok(names)
}

fn list_audio_files(dir: &Path) -> ToolsResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Replace the process-wide sample lengths
pub fn set_lengths(lengths: SampleLengths) {
    let mut guard = SAMPLE_LENGTHS.write().unwrap_or_else(|e| e.into_inner());
    *guard = lengths;
}

/// Look up a duration in the process-wide sample lengths
pub fn get_length(name: &str) -> ToolsResult<f64> {
    SAMPLE_LENGTHS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get_length(name)
}

/// Snapshot of the process-wide sample lengths
pub fn lengths() -> SampleLengths {
    SAMPLE_LENGTHS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Scan the sample directories and install the result process-wide
pub fn calculate_sample_lengths(
    dirs: &[PathBuf],
    families: Option<&[String]>,
) -> ToolsResult<SampleLengths> {
    let lengths = SampleLengths::scan(dirs, families)?;
    set_lengths(lengths.clone());
    Ok(lengths)
}
