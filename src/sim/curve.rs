//! Motion curves for grapple travel, retract and retract-time decay
//!
//! A curve maps normalized time in [0, 1] to a factor. Presets cover the
//! usual easings; `Keyframes` is a piecewise-linear curve for hand tuning.

use serde::{Deserialize, Serialize};

/// A single key of a piecewise-linear curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub t: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(t: f32, value: f32) -> Self {
        Self { t, value }
    }
}

/// Tunable curve evaluated over normalized time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionCurve {
    #[default]
    Linear,
    /// Quadratic ease in (slow start)
    EaseIn,
    /// Quadratic ease out (fast start)
    EaseOut,
    /// Smoothstep
    EaseInOut,
    Constant {
        value: f32,
    },
    /// Piecewise linear, clamped to the first/last key outside their range
    Keyframes {
        keys: Vec<Keyframe>,
    },
}

impl MotionCurve {
    /// Evaluate the curve at `t`
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            MotionCurve::Linear => t,
            MotionCurve::EaseIn => t * t,
            MotionCurve::EaseOut => t * (2.0 - t),
            MotionCurve::EaseInOut => t * t * (3.0 - 2.0 * t),
            MotionCurve::Constant { value } => *value,
            MotionCurve::Keyframes { keys } => evaluate_keys(keys, t),
        }
    }

    /// True if the curve never decreases as `t` grows
    pub fn is_non_decreasing(&self) -> bool {
        match self {
            MotionCurve::Keyframes { keys } => keys.windows(2).all(|w| w[1].value >= w[0].value),
            _ => true,
        }
    }

    /// Keys must be sorted by strictly increasing time
    pub fn is_well_formed(&self) -> bool {
        match self {
            MotionCurve::Keyframes { keys } => {
                !keys.is_empty()
                    && keys.iter().all(|k| k.t.is_finite() && k.value.is_finite())
                    && keys.windows(2).all(|w| w[1].t > w[0].t)
            }
            MotionCurve::Constant { value } => value.is_finite(),
            _ => true,
        }
    }
}

fn evaluate_keys(keys: &[Keyframe], t: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 0.0;
    };
    if t <= first.t {
        return first.value;
    }
    if t >= last.t {
        return last.value;
    }
    for w in keys.windows(2) {
        let (a, b) = (w[0], w[1]);
        if t <= b.t {
            let span = b.t - a.t;
            if span <= f32::EPSILON {
                return b.value;
            }
            let s = (t - a.t) / span;
            return a.value + (b.value - a.value) * s;
        }
    }
    last.value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_hit_endpoints() {
        for curve in [
            MotionCurve::Linear,
            MotionCurve::EaseIn,
            MotionCurve::EaseOut,
            MotionCurve::EaseInOut,
        ] {
            assert!(curve.evaluate(0.0).abs() < 1e-6, "{:?}", curve);
            assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-6, "{:?}", curve);
        }
    }

    #[test]
    fn test_evaluate_clamps_time() {
        assert_eq!(MotionCurve::Linear.evaluate(-1.0), 0.0);
        assert_eq!(MotionCurve::Linear.evaluate(2.0), 1.0);
    }

    #[test]
    fn test_keyframes_interpolate() {
        let curve = MotionCurve::Keyframes {
            keys: vec![Keyframe::new(0.0, 0.2), Keyframe::new(0.5, 0.6), Keyframe::new(1.0, 1.0)],
        };
        assert!((curve.evaluate(0.25) - 0.4).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.8).abs() < 1e-6);
        assert!(curve.is_non_decreasing());
        assert!(curve.is_well_formed());
    }

    #[test]
    fn test_keyframes_validation() {
        let falling = MotionCurve::Keyframes {
            keys: vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.5)],
        };
        assert!(!falling.is_non_decreasing());

        let unsorted = MotionCurve::Keyframes {
            keys: vec![Keyframe::new(0.5, 0.0), Keyframe::new(0.2, 1.0)],
        };
        assert!(!unsorted.is_well_formed());

        let empty = MotionCurve::Keyframes { keys: vec![] };
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_curve_json_shape() {
        let curve: MotionCurve = serde_json::from_str(r#"{"kind":"ease_out"}"#).unwrap();
        assert_eq!(curve, MotionCurve::EaseOut);

        let curve: MotionCurve =
            serde_json::from_str(r#"{"kind":"keyframes","keys":[{"t":0.0,"value":0.3},{"t":1.0,"value":1.0}]}"#)
                .unwrap();
        assert!((curve.evaluate(0.0) - 0.3).abs() < 1e-6);
    }
}
