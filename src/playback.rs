//! Multi-voice step loops and swimmer control
//!
//! A performance script usually builds a few voices from a [`State`] node
//! and plays them together for a number of steps:
//!
//! ```
//! use sardine_tools::playback::{loop_steps, Period, Voice};
//! use sardine_tools::State;
//! # use sardine_tools::params::ParamMap;
//! # use sardine_tools::runtime::Runtime;
//! # struct Silent;
//! # impl Runtime for Silent {
//! #     fn send(&mut self, _: &ParamMap) -> Option<f64> { None }
//! #     fn send_ziffers(&mut self, _: &str, _: &str, _: &ParamMap) -> Option<f64> { None }
//! #     fn pattern_value(&mut self, _: &str, _: usize) -> Option<f64> { None }
//! #     fn pattern_len(&mut self, _: &str) -> usize { 1 }
//! #     fn beat_duration(&self) -> f64 { 0.5 }
//! #     fn sleep(&mut self, _: f64) {}
//! #     fn swim(&mut self, _: &str) {}
//! #     fn die(&mut self, _: &str) {}
//! #     fn has_player(&self, _: &str) -> bool { false }
//! #     fn add_player(&mut self, _: &str) {}
//! # }
//! # let mut rt = Silent;
//!
//! let mut state = State::new();
//! state.dotted("drums.kick").set([("sound", "bd"), ("n", "0 . 0 .")]);
//! state.dotted("drums.kick").insert("p", 0.25);
//!
//! let kick = state.dotted("drums.kick");
//! let period = kick.get("p").map(Period::from).unwrap_or_default();
//! let mut voices = [Voice::dirt(kick.params(&[], None))];
//!
//! let total = loop_steps(&mut rt, &mut voices, 4, &period).unwrap();
//! assert_eq!(total, 1.0);
//! ```
//!
//! [`State`]: crate::state::State

use crate::error::{ToolsError, ToolsResult};
use crate::params::{ParamMap, Value};
use crate::runtime::Runtime;
use crate::senders;
use tracing::{debug, info};

/// Duration of one loop step
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Period {
    /// Use the duration suggested by the voices
    #[default]
    FromSender,
    Fixed(f64),
    Pattern(String),
}

impl Period {
    fn at(&self, rt: &mut dyn Runtime, step: usize) -> Option<f64> {
        match self {
            Period::FromSender => None,
            Period::Fixed(beats) => Some(*beats),
            Period::Pattern(pattern) => rt.pattern_value(pattern, step),
        }
    }
}

impl From<f64> for Period {
    fn from(beats: f64) -> Self {
        Period::Fixed(beats)
    }
}

impl From<&str> for Period {
    fn from(pattern: &str) -> Self {
        match pattern.trim().parse::<f64>() {
            Ok(beats) => Period::Fixed(beats),
            Err(_) => Period::Pattern(pattern.to_string()),
        }
    }
}

impl From<&Value> for Period {
    fn from(value: &Value) -> Self {
        match value {
            Value::Text(text) => Period::from(text.as_str()),
            Value::Int(_) | Value::Float(_) => {
                value.as_f64().map_or(Period::FromSender, Period::Fixed)
            }
            _ => Period::FromSender,
        }
    }
}

type Sender = Box<dyn FnMut(&mut dyn Runtime, &ParamMap) -> Option<f64>>;

/// A sender paired with the parameters it plays
pub struct Voice {
    sender: Sender,
    params: ParamMap,
}

impl Voice {
    pub fn new<F>(sender: F, params: ParamMap) -> Self
    where
        F: FnMut(&mut dyn Runtime, &ParamMap) -> Option<f64> + 'static,
    {
        Self {
            sender: Box::new(sender),
            params,
        }
    }

    /// Voice that plays through the rest-aware dirt sender
    pub fn dirt(params: ParamMap) -> Self {
        Self::new(senders::dirt, params)
    }

    /// Voice that plays a ziffers melody with mono sustains
    pub fn ziffers_mono(name: &str, ziff: &str, coef: f64, params: ParamMap) -> Self {
        let name = name.to_string();
        let ziff = ziff.to_string();
        Self::new(
            move |rt, params| senders::ziffers_mono(rt, &name, &ziff, coef, params),
            params,
        )
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Send the voice's params for `step`, with `i` set to the step
    pub fn play(&mut self, rt: &mut dyn Runtime, step: usize) -> Option<f64> {
        let mut params = self.params.clone();
        params.insert("i", step);
        (self.sender)(rt, &params)
    }
}

/// Play every voice for `n_steps` steps and return the elapsed beats.
///
/// With [`Period::FromSender`] a step lasts as long as the last duration a
/// voice suggested, carried over from earlier steps when no voice suggests
/// one.
pub fn loop_steps(
    rt: &mut dyn Runtime,
    voices: &mut [Voice],
    n_steps: usize,
    period: &Period,
) -> ToolsResult<f64> {
    let mut step_duration: Option<f64> = None;
    let mut total = 0.0;

    for step in 0..n_steps {
        for voice in voices.iter_mut() {
            let suggested = voice.play(rt, step);
            if *period == Period::FromSender && suggested.is_some() {
                step_duration = suggested;
            }
        }

        if *period != Period::FromSender {
            step_duration = period.at(rt, step);
        }

        let beats = step_duration.ok_or(ToolsError::MissingStepDuration(step))?;
        rt.sleep(beats);
        total += beats;
    }

    debug!("loop of {} steps lasted {} beats", n_steps, total);
    Ok(total)
}

/// Start swimming functions by name
pub fn start<I, S>(rt: &mut dyn Runtime, names: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for name in names {
        rt.swim(name.as_ref());
    }
}

/// Stop swimming functions by name
pub fn stop<I, S>(rt: &mut dyn Runtime, names: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for name in names {
        rt.die(name.as_ref());
    }
}

/// Whether [`ensure_player`] found a player or registered a new one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    Existing,
    Created,
}

/// Reuse the player called `name`, registering it first if needed
pub fn ensure_player(rt: &mut dyn Runtime, name: &str) -> PlayerStatus {
    if rt.has_player(name) {
        return PlayerStatus::Existing;
    }
    rt.add_player(name);
    info!("Created player {}", name);
    PlayerStatus::Created
}
