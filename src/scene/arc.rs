//! Slice arc geometry: equal pie partition, wedge paths and label paths
//!
//! Angles are radians measured clockwise from twelve o'clock:
//! - slice i spans [i * width, (i + 1) * width)
//! - the last slice ends exactly at TAU, so the pie has no gap

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec2;

use crate::{fmt_num, polar_to_svg};

/// Angular extent of one slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceArc {
    pub index: usize,
    /// Start angle (radians)
    pub start_angle: f64,
    /// End angle (radians)
    pub end_angle: f64,
}

/// Split the circle into `count` equal slices
pub fn pie(count: usize) -> Vec<SliceArc> {
    if count == 0 {
        return Vec::new();
    }
    let width = TAU / count as f64;
    (0..count)
        .map(|i| SliceArc {
            index: i,
            start_angle: i as f64 * width,
            end_angle: if i + 1 == count { TAU } else { (i + 1) as f64 * width },
        })
        .collect()
}

impl SliceArc {
    /// Angular span (radians)
    #[inline]
    pub fn angular_span(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Angular span in degrees
    pub fn span_degrees(&self) -> f64 {
        self.angular_span().to_degrees()
    }

    /// Whether the slice covers the whole circle
    pub fn is_full_circle(&self) -> bool {
        self.angular_span() >= TAU - 1e-9
    }

    /// Labels on slices ending past three o'clock would read upside down
    pub fn label_is_flipped(&self) -> bool {
        self.end_angle > FRAC_PI_2
    }

    /// Vertical text offset that pulls the label inside the wedge
    pub fn label_dy(&self) -> f64 {
        if self.label_is_flipped() { -40.0 } else { 40.0 }
    }

    /// Closed wedge path from the center out to the rim
    pub fn wedge_path(&self, radius: f64) -> String {
        if self.is_full_circle() {
            // Two half circles: a single arc command cannot close on itself
            let top = polar_to_svg(radius, 0.0);
            let bottom = polar_to_svg(radius, PI);
            return format!(
                "M{},{}A{r},{r},0,1,1,{},{}A{r},{r},0,1,1,{},{}Z",
                fmt_num(top.x),
                fmt_num(top.y),
                fmt_num(bottom.x),
                fmt_num(bottom.y),
                fmt_num(top.x),
                fmt_num(top.y),
                r = fmt_num(radius),
            );
        }

        let arc = self.outer_arc(radius);
        format!("{}L0,0Z", arc.to_path())
    }

    /// Rim arc of the wedge, start to end (clockwise)
    pub fn outer_arc(&self, radius: f64) -> LabelArc {
        LabelArc {
            from: polar_to_svg(radius, self.start_angle),
            to: polar_to_svg(radius, self.end_angle),
            radius,
            large_arc: self.angular_span() > PI,
            clockwise: true,
        }
    }

    /// Path the label text follows.
    ///
    /// This is the wedge's rim arc, reversed for slices ending past three o'clock.
    /// A full-circle slice uses the upper half of the rim.
    pub fn label_arc(&self, radius: f64) -> LabelArc {
        if self.is_full_circle() {
            return LabelArc {
                from: polar_to_svg(radius, -FRAC_PI_2),
                to: polar_to_svg(radius, FRAC_PI_2),
                radius,
                large_arc: false,
                clockwise: true,
            };
        }

        let arc = self.outer_arc(radius);
        if self.label_is_flipped() { arc.reversed() } else { arc }
    }
}

/// A single circular arc between two rim points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelArc {
    pub from: DVec2,
    pub to: DVec2,
    pub radius: f64,
    pub large_arc: bool,
    /// SVG sweep flag (1 = clockwise on screen)
    pub clockwise: bool,
}

impl LabelArc {
    /// Same arc traversed the other way: swap endpoints and flip the sweep
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            radius: self.radius,
            large_arc: self.large_arc,
            clockwise: !self.clockwise,
        }
    }

    pub fn to_path(&self) -> String {
        format!(
            "M{},{}A{r},{r},0,{},{},{},{}",
            fmt_num(self.from.x),
            fmt_num(self.from.y),
            self.large_arc as u8,
            self.clockwise as u8,
            fmt_num(self.to.x),
            fmt_num(self.to.y),
            r = fmt_num(self.radius),
        )
    }
}
