//! Hierarchical parameter store for live performances
//!
//! A [`State`] is a nested key/value tree. Each performance keeps one root
//! and hangs one branch per instrument off it (`lead`, `drums.hh`, ...). Loop
//! callbacks re-run every cycle, so the store is built around two ideas:
//!
//! - **Auto-vivification**: asking for a child that does not exist yet
//!   creates an empty node, attaches it and hands it back. The next access
//!   returns the same node, so values written from one callback are visible
//!   to the next.
//! - **Default-only initialisation**: [`State::init`] installs a value the
//!   first time and afterwards returns whatever is stored, including values
//!   tweaked live from elsewhere.
//!
//! # Examples
//!
//! ```
//! use sardine_tools::params;
//! use sardine_tools::state::State;
//!
//! let mut state = State::new();
//!
//! // First cycle installs the defaults...
//! let lead = state.path(["lead"]);
//! lead.init(params! { "n_steps" => 16, "p" => 0.5, "cutoff" => 5000 });
//!
//! // ...someone tweaks a value live...
//! state.child("lead").insert("cutoff", 1200);
//!
//! // ...and the next cycle picks up the tweak instead of resetting it.
//! let current = state.child("lead").init(params! { "cutoff" => 5000 });
//! assert_eq!(current.get("cutoff").unwrap(), &1200);
//!
//! // Sound parameters without the scheduling keys
//! let sound = state.child("lead").params(&[], None);
//! assert!(sound.get("n_steps").is_none());
//! ```

use crate::error::{ToolsError, ToolsResult};
use crate::params::{ParamMap, Value};
use regex::Regex;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Keys used by the loop calling convention: step count, period and step index
pub const RESERVED_KEYS: [&str; 3] = ["n_steps", "p", "i"];

/// Keys starting with this prefix are internal and never exported
pub const INTERNAL_PREFIX: char = '_';

/// Key filter matched at the start of the key
#[derive(Clone, Debug)]
pub struct KeyPattern(Regex);

impl KeyPattern {
    pub fn new(pattern: &str) -> ToolsResult<Self> {
        Ok(Self(Regex::new(&format!("^(?:{})", pattern))?))
    }

    pub fn matches(&self, key: &str) -> bool {
        self.0.is_match(key)
    }
}

impl FromStr for KeyPattern {
    type Err = ToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One node of the parameter tree
#[derive(Clone, Default)]
pub struct State {
    entries: Vec<(String, Value)>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node from a plain mapping
    pub fn from_map(map: ParamMap) -> Self {
        map.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Read a direct entry without creating anything
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let idx = self.position(key)?;
        Some(&mut self.entries[idx].1)
    }

    /// Read a nested entry without creating anything
    pub fn get_path<I, S>(&self, segments: I) -> Option<&Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = segments.into_iter();
        let first = segments.next()?;
        let mut value = self.get(first.as_ref())?;
        for segment in segments {
            value = value.as_node()?.get(segment.as_ref())?;
        }
        Some(value)
    }

    /// Attribute-style read: the stored value, or a freshly attached empty
    /// node when the key is absent
    pub fn attr(&mut self, key: &str) -> &mut Value {
        let idx = self.slot(key);
        &mut self.entries[idx].1
    }

    /// Child node at `key`, created when absent. A scalar stored under `key`
    /// is replaced by an empty node.
    pub fn child(&mut self, key: &str) -> &mut State {
        let idx = self.slot(key);
        node_in(key, &mut self.entries[idx].1)
    }

    /// Walk (and create) every level of `segments`
    pub fn path<I, S>(&mut self, segments: I) -> &mut State
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .fold(self, |node, segment| node.child(segment.as_ref()))
    }

    /// Same as [`State::path`] with a dotted string, e.g. `"drums.hh"`
    pub fn dotted(&mut self, path: &str) -> &mut State {
        self.path(path.split('.').filter(|s| !s.is_empty()))
    }

    /// Write a value. An overwritten key keeps its position.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Write every pair and return the values just stored
    pub fn set<I, K, V>(&mut self, pairs: I) -> ParamMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut result = ParamMap::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            self.insert(key.clone(), value.clone());
            result.insert(key, value);
        }
        result
    }

    /// Write only the keys that are absent. Returns the current value of
    /// every supplied key, whether it was written now or earlier.
    pub fn init<I, K, V>(&mut self, pairs: I) -> ParamMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut result = ParamMap::new();
        for (key, value) in pairs {
            let key = key.into();
            let idx = match self.position(&key) {
                Some(idx) => idx,
                None => {
                    self.entries.push((key.clone(), value.into()));
                    self.entries.len() - 1
                }
            };
            result.insert(key, self.entries[idx].1.clone());
        }
        result
    }

    /// Remove the given keys, ignoring those that are absent
    pub fn delete<I, S>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.remove(key.as_ref());
        }
        self
    }

    /// Direct scalar entries, without internal keys. Does not recurse.
    pub fn to_dict(&self) -> ParamMap {
        self.scalars()
            .map(|(k, v)| (k, v.clone()))
            .collect()
    }

    /// Direct scalar entries minus the listed keys and the keys matched by
    /// `pattern` at their start
    pub fn skip(&self, keys: &[&str], pattern: Option<&KeyPattern>) -> ParamMap {
        self.scalars()
            .filter(|(k, _)| !keys.contains(k))
            .filter(|(k, _)| !pattern.is_some_and(|p| p.matches(k)))
            .map(|(k, v)| (k, v.clone()))
            .collect()
    }

    /// Sound parameters: [`State::skip`] with the reserved scheduling keys
    /// always excluded
    pub fn params(&self, extra: &[&str], pattern: Option<&KeyPattern>) -> ParamMap {
        let mut keys: Vec<&str> = RESERVED_KEYS.to_vec();
        keys.extend_from_slice(extra);
        self.skip(&keys, pattern)
    }

    /// Parse a snapshot, trying TOML first and JSON second
    pub fn parse(content: &str) -> ToolsResult<Self> {
        if let Ok(state) = toml::from_str(content) {
            return Ok(state);
        }
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> ToolsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Save as TOML for `.toml` paths, JSON otherwise
    pub fn save(&self, path: &Path) -> ToolsResult<()> {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let content = if is_toml {
            self.to_toml()?
        } else {
            self.to_json()?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_json(&self) -> ToolsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_toml(&self) -> ToolsResult<String> {
        // TOML needs plain values ahead of sub-tables
        toml::to_string_pretty(&self.scalars_first())
            .map_err(|e| ToolsError::Serde(e.to_string()))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Index of `key`, attaching an empty node first if needed
    fn slot(&mut self, key: &str) -> usize {
        match self.position(key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), Value::Node(State::new())));
                self.entries.len() - 1
            }
        }
    }

    fn scalars(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter()
            .filter(|(k, v)| !k.starts_with(INTERNAL_PREFIX) && !v.is_node())
    }

    fn scalars_first(&self) -> State {
        let mut ordered = State::new();
        for (k, v) in self.iter().filter(|(_, v)| !v.is_node()) {
            ordered.insert(k, v.clone());
        }
        for (k, v) in self.iter() {
            if let Value::Node(child) = v {
                ordered.insert(k, child.scalars_first());
            }
        }
        ordered
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = State::new();
        for (k, v) in iter {
            state.insert(k, v);
        }
        state
    }
}

impl IntoIterator for State {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl TryFrom<serde_json::Value> for State {
    type Error = ToolsError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Object(map) => {
                let mut state = State::new();
                for (k, v) in map {
                    state.insert(k, Value::try_from(v)?);
                }
                Ok(state)
            }
            other => Err(ToolsError::UnsupportedValue(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct StateVisitor;

impl<'de> Visitor<'de> for StateVisitor {
    type Value = State;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a table of parameters")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<State, A::Error> {
        let mut state = State::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            state.insert(key, value);
        }
        Ok(state)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StateVisitor)
    }
}

/// Node stored in `slot`, replacing a scalar with an empty node first
fn node_in<'a>(key: &str, slot: &'a mut Value) -> &'a mut State {
    match slot {
        Value::Node(state) => state,
        scalar => {
            debug!("Replacing scalar '{}' = {:?} with a nested node", key, scalar);
            *scalar = Value::Node(State::new());
            node_in(key, scalar)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_child_is_created_once() {
        let mut state = State::new();
        let first: *const State = state.child("melody");
        let second: *const State = state.child("melody");
        assert_eq!(first, second);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_attr_vivifies_empty_node() {
        let mut state = State::new();
        assert!(state.attr("melody").is_node());
        assert!(state.contains_key("melody"));
        assert!(state.get("melody").unwrap().as_node().unwrap().is_empty());
    }

    #[test]
    fn test_attr_returns_scalar() {
        let mut state = State::new();
        state.insert("cutoff", 5000);
        assert_eq!(*state.attr("cutoff"), 5000);
    }

    #[test]
    fn test_child_overwrites_scalar() {
        let mut state = State::new();
        state.insert("fx", 1);
        state.insert("amp", 0.5);
        state.child("fx").insert("hpf", 400);
        assert_eq!(state.get_path(["fx", "hpf"]).unwrap(), &400);
        assert_eq!(state.keys().collect::<Vec<_>>(), ["fx", "amp"]);

        state.dotted("fx.hpf.mod").insert("rate", 2);
        assert_eq!(state.get_path(["fx", "hpf", "mod", "rate"]).unwrap(), &2);
    }

    #[test]
    fn test_get_does_not_vivify() {
        let state = State::new();
        assert!(state.get("missing").is_none());
        assert!(state.get_path(["a", "b"]).is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_dotted_path() {
        let mut state = State::new();
        state.dotted("drums.hh").insert("gain", 0.55);
        assert_eq!(state.get_path(["drums", "hh", "gain"]).unwrap(), &0.55);
    }

    #[test]
    fn test_init_keeps_existing_value() {
        let mut state = State::new();
        state.insert("amp", 0.3);
        let result = state.init(params! { "amp" => 0.05, "cutoff" => 5000 });
        assert_eq!(result, params! { "amp" => 0.3, "cutoff" => 5000 });
        assert_eq!(state.get("cutoff").unwrap(), &5000);
    }

    #[test]
    fn test_set_overwrites_and_returns_pairs() {
        let mut state = State::new();
        state.insert("amp", 0.1);
        let result = state.set(params! { "amp" => 0.8 });
        assert_eq!(result, params! { "amp" => 0.8 });
        assert_eq!(state.get("amp").unwrap(), &0.8);
    }

    #[test]
    fn test_delete_chains() {
        let mut state: State = params! { "a" => 1, "b" => 2, "c" => 3 }
            .into_iter()
            .collect();
        state.delete(["a"]).delete(["b", "zzz"]);
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_to_dict_skips_nodes_and_internal_keys() {
        let mut state = State::new();
        state.insert("amp", 0.5);
        state.insert("_cache", 1);
        state.child("fx").insert("room", 0.3);
        assert_eq!(state.to_dict(), params! { "amp" => 0.5 });
    }

    #[test]
    fn test_skip_pattern_is_anchored() {
        let mut state = State::new();
        state.set(params! { "env_attack" => 1, "my_env" => 2, "amp" => 0.3 });
        let pattern = KeyPattern::new("env").unwrap();
        let result = state.skip(&["amp"], Some(&pattern));
        assert_eq!(result, params! { "my_env" => 2 });
    }

    #[test]
    fn test_invalid_key_pattern() {
        assert!(matches!(
            KeyPattern::new("(unclosed"),
            Err(ToolsError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_params_excludes_reserved_keys() {
        let mut state = State::new();
        state.init(params! {
            "n_steps" => 16,
            "p" => 0.5,
            "i" => 3,
            "orbit" => 1,
            "sound" => "supersaw",
        });
        assert_eq!(
            state.params(&[], None),
            params! { "orbit" => 1, "sound" => "supersaw" }
        );
        assert_eq!(state.params(&["orbit"], None), params! { "sound" => "supersaw" });
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: State = params! { "x" => 1, "y" => 2 }.into_iter().collect();
        let b: State = params! { "y" => 2, "x" => 1 }.into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_json_converts_nested_objects() {
        let json = serde_json::json!({ "drums": { "kick": 0.8 }, "bpm": 120 });
        let state = State::try_from(json).unwrap();
        assert!(state.get("drums").unwrap().is_node());
        assert_eq!(state.get_path(["drums", "kick"]).unwrap(), &0.8);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut state = State::new();
        state.child("lead").set(params! { "cutoff" => 5000, "sound" => "supersaw" });
        state.insert("bpm", 120);
        let toml = state.to_toml().unwrap();
        assert!(toml.contains("bpm = 120"));
        let parsed = State::parse(&toml).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_json_round_trip() {
        let mut state = State::new();
        state.dotted("drums.sn1").set(params! { "sound" => ". sn:1", "shape" => 0.5 });
        let json = state.to_json().unwrap();
        let parsed = State::parse(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
