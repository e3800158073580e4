//! Seam to the external live-coding runtime
//!
//! Scheduling, pattern evaluation and SuperDirt dispatch belong to the host
//! environment. Helpers in this crate only drive it through [`Runtime`].

use crate::params::{ParamMap, Value};

/// Operations the performance helpers need from the host runtime.
///
/// Implementations are used as `&mut dyn Runtime`, so the trait stays
/// object safe.
pub trait Runtime {
    /// Emit a dirt event now. May suggest a duration in beats.
    fn send(&mut self, params: &ParamMap) -> Option<f64>;

    /// Emit a ziffers melody through the named sender
    fn send_ziffers(&mut self, name: &str, ziff: &str, params: &ParamMap) -> Option<f64>;

    /// Evaluate `pattern` at step `i`. `None` is a rest.
    fn pattern_value(&mut self, pattern: &str, i: usize) -> Option<f64>;

    /// Number of steps in one cycle of `pattern`
    fn pattern_len(&mut self, pattern: &str) -> usize;

    /// Seconds per beat
    fn beat_duration(&self) -> f64;

    /// Advance the caller's time by `beats`
    fn sleep(&mut self, beats: f64);

    /// Start a swimming function
    fn swim(&mut self, name: &str);

    /// Stop a swimming function
    fn die(&mut self, name: &str);

    fn has_player(&self, name: &str) -> bool;

    fn add_player(&mut self, name: &str);
}

/// Numeric value of a parameter at step `i`.
///
/// Numbers are returned as-is, numeric text is parsed, and anything else is
/// handed to the runtime's pattern evaluator.
pub fn value_at(rt: &mut dyn Runtime, value: &Value, i: usize) -> Option<f64> {
    match value {
        Value::Text(text) => match text.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => rt.pattern_value(text, i),
        },
        Value::Node(_) => None,
        other => other.as_f64(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Runtime that records every call. Patterns are whitespace separated
    /// numbers, `.` and `~` are rests.
    #[derive(Default)]
    pub struct MockRuntime {
        pub sent: Vec<ParamMap>,
        pub ziffers: Vec<(String, String, ParamMap)>,
        pub sleeps: Vec<f64>,
        pub swimming: Vec<String>,
        pub stopped: Vec<String>,
        pub players: Vec<String>,
        pub send_result: Option<f64>,
        pub beat: f64,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self {
                beat: 0.5,
                ..Default::default()
            }
        }
    }

    impl Runtime for MockRuntime {
        fn send(&mut self, params: &ParamMap) -> Option<f64> {
            self.sent.push(params.clone());
            self.send_result
        }

        fn send_ziffers(&mut self, name: &str, ziff: &str, params: &ParamMap) -> Option<f64> {
            self.ziffers
                .push((name.to_string(), ziff.to_string(), params.clone()));
            None
        }

        fn pattern_value(&mut self, pattern: &str, i: usize) -> Option<f64> {
            let tokens: Vec<&str> = pattern.split_whitespace().collect();
            if tokens.is_empty() {
                return None;
            }
            tokens[i % tokens.len()].parse().ok()
        }

        fn pattern_len(&mut self, pattern: &str) -> usize {
            pattern.split_whitespace().count()
        }

        fn beat_duration(&self) -> f64 {
            self.beat
        }

        fn sleep(&mut self, beats: f64) {
            self.sleeps.push(beats);
        }

        fn swim(&mut self, name: &str) {
            self.swimming.push(name.to_string());
        }

        fn die(&mut self, name: &str) {
            self.stopped.push(name.to_string());
        }

        fn has_player(&self, name: &str) -> bool {
            self.players.iter().any(|p| p == name)
        }

        fn add_player(&mut self, name: &str) {
            self.players.push(name.to_string());
        }
    }
}
