//! # sardine-tools - Performance Helpers for Live Coding
//!
//! Helpers for live-coding music sessions driven by an external pattern
//! runtime (clock, pattern parser, SuperDirt dispatch). The runtime is
//! reached through the [`runtime::Runtime`] trait; everything else lives
//! here.
//!
//! ## Core Features
//!
//! - **Hierarchical Parameter Store**: nested, auto-vivifying [`State`] with
//!   default-only initialisation and scheduling-key filtering
//! - **Tree Display**: ASCII rendering of a store for quick inspection
//! - **Sample Lengths**: scan a Dirt-Samples library and look up `bd:0` style
//!   durations
//! - **Slicing and Granular Playback**: [`slicer::cut`] and
//!   [`granular::granulate`]
//! - **Senders and Loops**: rest-aware dirt sender, ziffers mono sustains and
//!   multi-voice step loops
//!
//! ## Quick Start
//!
//! ```rust
//! use sardine_tools::{params, State};
//!
//! let mut state = State::new();
//! state.dotted("drums.hh").init(params! { "sound" => "hh", "p" => 0.25 });
//!
//! println!("{}", state.tree(None));
//! // └── drums
//! //     └── hh
//! //         ├── sound: "hh"
//! //         └── p: 0.25
//! ```

pub mod config;
pub mod error;
pub mod granular;
pub mod params;
pub mod playback;
pub mod runtime;
pub mod sample_lengths;
pub mod senders;
pub mod slicer;
pub mod state;
pub mod state_display;

pub use error::{ToolsError, ToolsResult};
pub use params::{merge, ParamMap, Value};
pub use runtime::Runtime;
pub use sample_lengths::SampleLengths;
pub use state::{KeyPattern, State};
