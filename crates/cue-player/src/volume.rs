//! Volume limits and clamped stepping.
//!
//! Two knobs share one clamp range: each clip's own volume and the output device's master
//! volume. Absolute sets bypass the range; relative steps are clamped into it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

/// Step used by increase/decrease operations when the caller does not pass one.
pub const DEFAULT_VOLUME_STEP: f32 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum VolumeError {
    #[error("invalid volume limits: min {min} max {max}")]
    InvalidLimits { min: f32, max: f32 },
}

/// Inclusive clamp range applied to stepped volume changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeLimits {
    min: f32,
    max: f32,
}

impl VolumeLimits {
    /// Build a range; both bounds must be finite and `min <= max`.
    pub fn new(min: f32, max: f32) -> Result<Self, VolumeError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(VolumeError::InvalidLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn clamp(&self, volume: f32) -> f32 {
        volume.clamp(self.min, self.max)
    }

    /// Apply `delta` to `current` and clamp the result.
    pub fn step(&self, current: f32, delta: f32) -> f32 {
        let next = current + delta;
        if next.is_nan() {
            return self.min;
        }
        self.clamp(next)
    }
}

impl Default for VolumeLimits {
    fn default() -> Self {
        Self { min: 0.0, max: 2.0 }
    }
}

/// Lock-free `f32` cell used for volumes read by the dispatch thread.
#[derive(Debug)]
pub struct AtomicVolume(AtomicU32);

impl AtomicVolume {
    pub fn new(volume: f32) -> Self {
        Self(AtomicU32::new(volume.to_bits()))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, volume: f32) {
        self.0.store(volume.to_bits(), Ordering::Relaxed);
    }

    /// Atomically replace the value with `f(current)` and return the new value.
    pub fn update(&self, f: impl Fn(f32) -> f32) -> f32 {
        let mut next = 0.0;
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            next = f(f32::from_bits(bits));
            Some(next.to_bits())
        });
        next
    }
}

impl Default for AtomicVolume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Engine-owned limit state plus the default step.
#[derive(Debug)]
pub struct VolumeControl {
    limits: Mutex<VolumeLimits>,
    default_step: f32,
}

impl VolumeControl {
    pub fn new(limits: VolumeLimits, default_step: f32) -> Self {
        Self {
            limits: Mutex::new(limits),
            default_step,
        }
    }

    pub fn limits(&self) -> VolumeLimits {
        *self.limits.lock().unwrap()
    }

    pub fn set_limits(&self, limits: VolumeLimits) {
        *self.limits.lock().unwrap() = limits;
    }

    /// Replace only the upper bound, keeping the current lower bound.
    pub fn set_max(&self, max: f32) -> Result<VolumeLimits, VolumeError> {
        let mut g = self.limits.lock().unwrap();
        let next = VolumeLimits::new(g.min, max)?;
        *g = next;
        Ok(next)
    }

    /// Replace only the lower bound, keeping the current upper bound.
    pub fn set_min(&self, min: f32) -> Result<VolumeLimits, VolumeError> {
        let mut g = self.limits.lock().unwrap();
        let next = VolumeLimits::new(min, g.max)?;
        *g = next;
        Ok(next)
    }

    pub fn step_or_default(&self, step: Option<f32>) -> f32 {
        step.unwrap_or(self.default_step)
    }

    /// Raise `current` by `step` within the limits current at call time.
    pub fn raised(&self, current: f32, step: Option<f32>) -> f32 {
        self.limits().step(current, self.step_or_default(step))
    }

    /// Lower `current` by `step` within the limits current at call time.
    pub fn lowered(&self, current: f32, step: Option<f32>) -> f32 {
        self.limits().step(current, -self.step_or_default(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_limits_are_zero_to_two() {
        let limits = VolumeLimits::default();
        assert_eq!(limits.min(), 0.0);
        assert_eq!(limits.max(), 2.0);
    }

    #[test]
    fn new_rejects_inverted_and_non_finite_bounds() {
        assert!(VolumeLimits::new(1.0, 0.5).is_err());
        assert!(VolumeLimits::new(f32::NAN, 1.0).is_err());
        assert!(VolumeLimits::new(0.0, f32::INFINITY).is_err());
        assert!(VolumeLimits::new(0.5, 0.5).is_ok());
    }

    #[test]
    fn step_clamps_both_ends() {
        let limits = VolumeLimits::new(0.5, 1.5).unwrap();
        assert_eq!(limits.step(1.45, 0.1), 1.5);
        assert_eq!(limits.step(0.55, -0.1), 0.5);
        assert!((limits.step(1.0, 0.1) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn step_pulls_out_of_range_values_into_range() {
        let limits = VolumeLimits::new(0.0, 1.0).unwrap();
        // An unclamped absolute set may have left the value above max.
        assert_eq!(limits.step(5.0, -0.1), 1.0);
        assert_eq!(limits.step(-3.0, 0.1), 0.0);
    }

    #[test]
    fn set_max_keeps_min_and_rejects_below_min() {
        let control = VolumeControl::new(VolumeLimits::new(0.5, 2.0).unwrap(), 0.1);
        let next = control.set_max(2.5).unwrap();
        assert_eq!(next, VolumeLimits::new(0.5, 2.5).unwrap());
        assert!(control.set_max(0.1).is_err());
        assert_eq!(control.limits().max(), 2.5);
    }

    #[test]
    fn set_min_rejects_above_max() {
        let control = VolumeControl::new(VolumeLimits::default(), 0.1);
        assert_eq!(
            control.set_min(3.0),
            Err(VolumeError::InvalidLimits { min: 3.0, max: 2.0 })
        );
        assert_eq!(control.limits(), VolumeLimits::default());
    }

    #[test]
    fn default_step_applies_when_none() {
        let control = VolumeControl::new(VolumeLimits::default(), 0.25);
        assert_eq!(control.raised(1.0, None), 1.25);
        assert_eq!(control.lowered(1.0, Some(0.5)), 0.5);
    }

    #[test]
    fn atomic_volume_update_returns_new_value() {
        let v = AtomicVolume::new(0.3);
        let next = v.update(|cur| cur * 2.0);
        assert_eq!(next, 0.6);
        assert_eq!(v.get(), 0.6);
        v.set(-4.0);
        assert_eq!(v.get(), -4.0);
    }

    proptest! {
        #[test]
        fn step_stays_in_range(
            bounds in (-2.0f32..2.0, 0.0f32..3.0),
            start in -10.0f32..10.0,
            steps in prop::collection::vec(-1.0f32..1.0, 1..50)
        ) {
            let (min, width) = bounds;
            let limits = VolumeLimits::new(min, min + width).unwrap();
            let mut current = start;
            for delta in steps {
                current = limits.step(current, delta);
                prop_assert!(current >= limits.min() && current <= limits.max());
            }
        }
    }
}
