//! Sample slicing on a step grid
//!
//! [`cut`] divides a sample into equal slices and plays them in the order
//! given by a sequence pattern, one slice per step.

use crate::error::{ToolsError, ToolsResult};
use crate::params::{ParamMap, Value};
use crate::runtime::{value_at, Runtime};
use crate::sample_lengths::SampleLengths;
use tracing::debug;

/// Extra parameters whose patterns also decide the loop length
const PATTERN_KEYS: [&str; 5] = ["note", "pan", "amp", "gain", "shape"];

/// A per-step quantity, either constant or evaluated from a pattern
#[derive(Clone, Debug, PartialEq)]
pub enum Timing {
    Fixed(f64),
    Pattern(String),
}

impl Timing {
    pub fn at(&self, rt: &mut dyn Runtime, i: usize) -> Option<f64> {
        match self {
            Timing::Fixed(v) => Some(*v),
            Timing::Pattern(p) => rt.pattern_value(p, i),
        }
    }

    fn pattern(&self) -> Option<&str> {
        match self {
            Timing::Pattern(p) => Some(p),
            Timing::Fixed(_) => None,
        }
    }
}

impl From<f64> for Timing {
    fn from(v: f64) -> Self {
        Timing::Fixed(v)
    }
}

impl From<&str> for Timing {
    fn from(pattern: &str) -> Self {
        match pattern.trim().parse::<f64>() {
            Ok(v) => Timing::Fixed(v),
            Err(_) => Timing::Pattern(pattern.to_string()),
        }
    }
}

/// Options for [`cut`]
#[derive(Clone, Debug)]
pub struct CutOptions {
    /// Number of equal slices
    pub n_slices: usize,
    /// Slice indices to play; defaults to `0 1 .. n_slices-1`
    pub sequence: Option<String>,
    /// Loop length; derived from the patterns when absent
    pub n_steps: Option<usize>,
    /// Beats per step; derived from the slice length when absent
    pub period: Option<Timing>,
    /// Stretch the whole sample over this many beats
    pub stretch: Option<f64>,
    pub begin: f64,
    pub end: f64,
    pub speed: Option<Timing>,
    /// Sent with every slice, overriding the generated parameters
    pub extra: ParamMap,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            n_slices: 8,
            sequence: None,
            n_steps: None,
            period: None,
            stretch: None,
            begin: 0.0,
            end: 1.0,
            speed: None,
            extra: ParamMap::new(),
        }
    }
}

impl CutOptions {
    pub fn slices(n_slices: usize) -> Self {
        Self {
            n_slices,
            ..Default::default()
        }
    }

    pub fn sequence(mut self, sequence: &str) -> Self {
        self.sequence = Some(sequence.to_string());
        self
    }

    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }

    pub fn period(mut self, period: impl Into<Timing>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn stretch(mut self, beats: f64) -> Self {
        self.stretch = Some(beats);
        self
    }

    pub fn range(mut self, begin: f64, end: f64) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }

    pub fn speed(mut self, speed: impl Into<Timing>) -> Self {
        self.speed = Some(speed.into());
        self
    }

    pub fn extra(mut self, extra: ParamMap) -> Self {
        self.extra = extra;
        self
    }

    fn loop_length(&self, rt: &mut dyn Runtime) -> usize {
        if let Some(n) = self.n_steps {
            return n;
        }
        let period_pattern = self.period.as_ref().and_then(Timing::pattern);
        if self.sequence.is_none() && period_pattern.is_none() {
            return self.n_slices;
        }

        let mut patterns: Vec<&str> = Vec::new();
        patterns.extend(period_pattern);
        patterns.extend(self.sequence.as_deref().filter(|s| Value::from(*s).is_pattern()));
        patterns.extend(self.speed.as_ref().and_then(Timing::pattern));
        patterns.extend(
            PATTERN_KEYS
                .iter()
                .filter_map(|key| self.extra.get(key))
                .filter(|value| value.is_pattern())
                .filter_map(Value::as_str),
        );

        patterns
            .into_iter()
            .map(|pattern| rt.pattern_len(pattern))
            .max()
            .unwrap_or(self.n_slices)
    }
}

/// Play slices of `sample` and return the total duration in beats.
///
/// Rested steps of the sequence send nothing but still take their time.
/// Fails when the sample has no known length, or when a period pattern rests
/// on a step.
pub fn cut(
    rt: &mut dyn Runtime,
    lengths: &SampleLengths,
    sample: &str,
    opts: &CutOptions,
) -> ToolsResult<f64> {
    let sample_length = lengths.get_length(sample)?;
    let n_slices = opts.n_slices.max(1);
    let n_steps = opts.loop_length(rt);

    let base_speed = match opts.stretch {
        Some(beats) => sample_length / (beats * rt.beat_duration()),
        None => 1.0,
    };

    let sequence = opts.sequence.clone().unwrap_or_else(|| {
        (0..n_slices)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    });

    let slice_width = (opts.end - opts.begin) / n_slices as f64;
    debug!("cut {} into {} slices over {} steps", sample, n_slices, n_steps);

    let mut total = 0.0;
    for j in 0..n_steps {
        let current_slice = value_at(rt, &Value::from(sequence.as_str()), j);

        let factor = opts
            .speed
            .as_ref()
            .and_then(|speed| speed.at(rt, j))
            .unwrap_or(1.0);
        let mut speed = base_speed * factor;
        if speed == 0.0 {
            speed = 1.0;
        }

        if let Some(slice) = current_slice {
            let mut event = ParamMap::new();
            event.insert("sound", sample);
            event.insert("begin", opts.begin + slice_width * slice);
            event.insert("end", opts.begin + slice_width * (slice + 1.0));
            event.insert("speed", speed);
            event.insert("cut", 1);
            event.insert("i", j);
            let event = event.merged(opts.extra.clone());
            rt.send(&event);
        }

        let step = match &opts.period {
            Some(period) => period.at(rt, j),
            None => {
                let slice_beats = match opts.stretch {
                    Some(beats) => beats / n_slices as f64,
                    None => sample_length / n_slices as f64 / rt.beat_duration(),
                };
                Some(slice_beats / speed.abs())
            }
        };
        let step = step.ok_or(ToolsError::MissingStepDuration(j))?;

        rt.sleep(step);
        total += step;
    }

    Ok(total)
}
