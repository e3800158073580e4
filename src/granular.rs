//! Granular playback of a sample
//!
//! Each grain is a short slice of the sample with randomised position,
//! speed, amplitude and pan. Grains are spread evenly over the requested
//! duration.

use crate::params::ParamMap;
use crate::runtime::Runtime;
use rand::Rng;
use tracing::warn;

/// Grain cloud shape
#[derive(Clone, Debug)]
pub struct GrainCloud {
    /// Grains per beat
    pub density: f64,
    /// Total duration in beats
    pub duration: f64,
    /// Grain length as a fraction of the sample (0-1)
    pub grain_size: f64,
    /// Random offset applied to the grain position (0-1)
    pub position_jitter: f64,
    /// Added to `base_speed`; negative speeds play backwards
    pub speed_range: (f64, f64),
    pub amp_jitter: f64,
    pub pan_range: (f64, f64),
    pub base_speed: f64,
    pub base_amp: f64,
    pub base_pan: f64,
    /// Sent with every grain; the randomised keys take precedence
    pub extra: ParamMap,
}

impl Default for GrainCloud {
    fn default() -> Self {
        Self {
            density: 8.0,
            duration: 1.0,
            grain_size: 0.1,
            position_jitter: 0.2,
            speed_range: (-2.0, 1.0),
            amp_jitter: 0.1,
            pan_range: (0.0, 1.0),
            base_speed: 1.0,
            base_amp: 0.8,
            base_pan: 0.5,
            extra: ParamMap::new(),
        }
    }
}

impl GrainCloud {
    /// Number of grains in the cloud
    pub fn grain_count(&self) -> usize {
        (self.density * self.duration).floor().max(0.0) as usize
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64)) -> f64 {
    low + (high - low) * rng.gen::<f64>()
}

/// Randomised parameters for one grain
pub fn grain_params<R: Rng + ?Sized>(rng: &mut R, cloud: &GrainCloud) -> ParamMap {
    let max_begin = (1.0 - cloud.grain_size).max(0.0);

    let position = rng.gen::<f64>() * max_begin;
    let offset = (rng.gen::<f64>() * 2.0 - 1.0) * cloud.position_jitter;
    let begin = (position + offset).clamp(0.0, max_begin);

    let speed = cloud.base_speed + uniform(rng, cloud.speed_range);
    let amp = cloud.base_amp + (rng.gen::<f64>() * 2.0 - 1.0) * cloud.amp_jitter;

    let (min_pan, max_pan) = cloud.pan_range;
    let pan = cloud.base_pan
        + uniform(rng, (min_pan - cloud.base_pan, max_pan - cloud.base_pan));

    let mut grain = cloud.extra.clone();
    grain.insert("begin", begin);
    grain.insert("end", begin + cloud.grain_size);
    grain.insert("speed", speed);
    grain.insert("amp", amp);
    grain.insert("pan", pan.clamp(0.0, 1.0));
    grain
}

/// Send `sample` as the sound of a grain, unchanged by any note pattern
fn send_grain(rt: &mut dyn Runtime, sample: &str, grain: &ParamMap) -> Option<f64> {
    let mut event = ParamMap::new();
    event.insert("sound", sample);
    let event = event.merged(
        grain
            .iter()
            .filter(|(k, _)| *k != "sound")
            .map(|(k, v)| (k, v.clone())),
    );
    rt.send(&event)
}

/// Play a grain cloud of `sample` through the runtime's dirt sender
pub fn granulate<R: Rng + ?Sized>(
    rt: &mut dyn Runtime,
    rng: &mut R,
    sample: &str,
    cloud: &GrainCloud,
) -> f64 {
    granulate_with(rt, rng, sample, cloud, send_grain)
}

/// Play a grain cloud through a custom sender. Returns the cloud duration.
pub fn granulate_with<R, F>(
    rt: &mut dyn Runtime,
    rng: &mut R,
    sample: &str,
    cloud: &GrainCloud,
    mut sender: F,
) -> f64
where
    R: Rng + ?Sized,
    F: FnMut(&mut dyn Runtime, &str, &ParamMap) -> Option<f64>,
{
    let grains = cloud.grain_count();
    if grains == 0 {
        warn!(
            "Grain cloud for {} is empty (density {} over {} beats)",
            sample, cloud.density, cloud.duration
        );
        return cloud.duration;
    }

    let grain_duration = cloud.duration / grains as f64;
    for _ in 0..grains {
        let grain = grain_params(rng, cloud);
        sender(rt, sample, &grain);
        rt.sleep(grain_duration);
    }

    cloud.duration
}
