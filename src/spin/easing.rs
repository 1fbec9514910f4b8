//! Easing curves and time-based tweens

/// Timing curve mapping normalized time to normalized progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// Decelerates, overshoots past the target, then settles back
    BackOut { overshoot: f64 },
}

impl Easing {
    pub fn back_out(overshoot: f64) -> Self {
        Easing::BackOut { overshoot }
    }

    /// Progress at normalized time `t` (clamped to [0, 1]).
    ///
    /// Both curves return exactly 0 at `t = 0` and exactly 1 at `t = 1`.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        match *self {
            Easing::Linear => t,
            Easing::BackOut { overshoot } => {
                let u = t - 1.0;
                u * u * ((overshoot + 1.0) * u + overshoot) + 1.0
            }
        }
    }
}

/// Linear interpolation between two angles
#[inline]
pub fn interpolate(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

/// Eased transition of a single value over a fixed duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration_ms: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            easing,
        }
    }

    /// Normalized time after `elapsed_ms`
    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Value after `elapsed_ms`; exactly `to` once finished
    pub fn sample(&self, elapsed_ms: f64) -> f64 {
        if self.is_finished(elapsed_ms) {
            return self.to;
        }
        let eased = self.easing.apply(self.progress(elapsed_ms));
        interpolate(self.from, self.to, eased)
    }

    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.duration_ms
    }
}
