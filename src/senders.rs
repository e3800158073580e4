//! Sender wrappers around the runtime's dirt and ziffers senders
//!
//! Note patterns containing `.` rests would otherwise keep the previous
//! sound ringing, so [`dirt`] rewrites the sound into a structure-preserving
//! form that silences rested steps.

use crate::params::{ParamMap, Value};
use crate::runtime::Runtime;
use tracing::debug;

/// Keys checked, in order, for the note pattern of an event
pub const NOTE_KEYS: [&str; 3] = ["n", "midinote", "freq"];

/// First truthy value among `n`, `midinote` and `freq`
pub fn note_pattern(params: &ParamMap) -> Option<&Value> {
    NOTE_KEYS
        .iter()
        .filter_map(|key| params.get(key))
        .find(|value| value.is_truthy())
}

/// Sound pattern that follows the rests of `pattern`
pub fn rest_aware_sound(instrument: &str, pattern: &str) -> String {
    format!("{i} ^| [{i} ^| [{pattern}]]", i = instrument)
}

fn rest_pattern(params: &ParamMap) -> Option<&str> {
    note_pattern(params)
        .and_then(Value::as_str)
        .filter(|pattern| pattern.contains('.'))
}

/// Send a dirt event, rewriting `sound` when the note pattern has rests
pub fn dirt(rt: &mut dyn Runtime, params: &ParamMap) -> Option<f64> {
    let rewritten = rest_pattern(params).and_then(|pattern| {
        let instrument = params.get("sound")?.as_str()?;
        Some(rest_aware_sound(instrument, pattern))
    });

    match rewritten {
        Some(sound) => {
            debug!("rest-aware sound: {}", sound);
            let mut params = params.clone();
            params.insert("sound", sound);
            rt.send(&params)
        }
        None => rt.send(params),
    }
}

/// [`dirt`] with the instrument given separately from the params
pub fn dirt_sound(rt: &mut dyn Runtime, instrument: &str, params: &ParamMap) -> Option<f64> {
    let sound = match rest_pattern(params) {
        Some(pattern) => rest_aware_sound(instrument, pattern),
        None => instrument.to_string(),
    };
    let mut event = ParamMap::new();
    event.insert("sound", sound);
    let event = event.merged(
        params
            .iter()
            .filter(|(k, _)| *k != "sound")
            .map(|(k, v)| (k, v.clone())),
    );
    rt.send(&event)
}

/// Duration in beats of a ziffers note token.
///
/// `w`, `h`, `q`, `e` and `s` are whole to sixteenth notes; a `.` right
/// after the letter makes the note dotted.
pub fn parse_ziff_duration(note: &str) -> Option<f64> {
    let mut chars = note.chars();
    let base = match chars.next()? {
        'w' => 4.0,
        'h' => 2.0,
        'q' => 1.0,
        'e' => 0.5,
        's' => 0.25,
        _ => return None,
    };
    if chars.next() == Some('.') {
        Some(base * 1.5)
    } else {
        Some(base)
    }
}

/// Sustain pattern for a ziffers melody: each note's duration times `coef`
pub fn ziff_sustains(ziff: &str, coef: f64) -> String {
    ziff.split_whitespace()
        .filter_map(parse_ziff_duration)
        .map(|duration| format!("{:?}", duration * coef))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Send a ziffers melody with sustains that cut each note at its duration
pub fn ziffers_mono(
    rt: &mut dyn Runtime,
    name: &str,
    ziff: &str,
    coef: f64,
    params: &ParamMap,
) -> Option<f64> {
    let mut params = params.clone();
    params.insert("sustain", ziff_sustains(ziff, coef));
    rt.send_ziffers(name, ziff, &params)
}
