// Curve - ordered keyframe container with step/linear/bezier sampling
// One keyframe per tick; ticks are relative to the owning block's start

use crate::automation::keyframe::{CurveType, Keyframe, Tangent};
use std::collections::BTreeMap;
use std::ops::Bound;

/// How two overlapping keyframe ranges combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Keep every existing key, then add the incoming ones. Existing keys
    /// win tick collisions (insertion is first-writer-wins).
    #[default]
    Merge,
    /// Delete existing keys inside the incoming key-range, then add the
    /// incoming ones.
    Replace,
    /// Delete existing keys at/after the incoming range's start, then add
    /// the incoming ones.
    Join,
}

/// An ordered mapping of tick to keyframe for one automation channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    keys: BTreeMap<i64, Keyframe>,
}

/// Early-accept tolerance for the bezier time solve, relative to the
/// segment's tick span. Also the endpoint snap distance in ticks.
const BEZIER_EPSILON: f64 = 1e-4;

/// Bisection iteration bound. The solve always terminates.
const BEZIER_ITERATIONS: u32 = 25;

impl Curve {
    pub fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate keyframes in tick order.
    pub fn keyframes(&self) -> impl Iterator<Item = &Keyframe> {
        self.keys.values()
    }

    pub fn get(&self, tick: i64) -> Option<&Keyframe> {
        self.keys.get(&tick)
    }

    pub fn first_keyframe(&self) -> Option<&Keyframe> {
        self.keys.first_key_value().map(|(_, kf)| kf)
    }

    pub fn last_keyframe(&self) -> Option<&Keyframe> {
        self.keys.last_key_value().map(|(_, kf)| kf)
    }

    /// Tick of the last keyframe, or 0 for an empty curve.
    pub fn duration(&self) -> i64 {
        self.keys.last_key_value().map(|(t, _)| *t).unwrap_or(0)
    }

    /// First keyframe strictly after `tick`.
    pub fn next_keyframe(&self, tick: i64) -> Option<&Keyframe> {
        self.keys
            .range((Bound::Excluded(tick), Bound::Unbounded))
            .next()
            .map(|(_, kf)| kf)
    }

    /// Last keyframe strictly before `tick`.
    pub fn prev_keyframe(&self, tick: i64) -> Option<&Keyframe> {
        self.keys.range(..tick).next_back().map(|(_, kf)| kf)
    }

    /// First keyframe at or after `tick`.
    pub fn first_keyframe_at_or_after(&self, tick: i64) -> Option<&Keyframe> {
        self.keys.range(tick..).next().map(|(_, kf)| kf)
    }

    /// Insert a keyframe. A key already present at that tick wins: the
    /// insert is a silent no-op (first writer wins).
    ///
    /// A keyframe arriving with `CurveType::Init` inherits the previous
    /// key's interpolation mode (or `Linear` at the front of the curve).
    /// When the inherited mode is `Bezier`, unset tangents on this key and
    /// its neighbors are auto-populated to a third of the gap on each side,
    /// so freshly inserted keys come out smooth without per-key authoring.
    pub fn add_key(&mut self, mut kf: Keyframe) {
        if self.keys.contains_key(&kf.tick) {
            return;
        }

        if kf.curve_type == CurveType::Init {
            let prev = self
                .keys
                .range(..kf.tick)
                .next_back()
                .map(|(_, p)| (p.tick, p.curve_type, p.out_tangent.is_set()));

            match prev {
                None => kf.curve_type = CurveType::Linear,
                Some((prev_tick, prev_type, prev_out_set)) => {
                    kf.curve_type = match prev_type {
                        CurveType::Init => CurveType::Linear,
                        other => other,
                    };

                    if kf.curve_type == CurveType::Bezier {
                        let third = (kf.tick - prev_tick) / 3;
                        kf.in_tangent = Tangent::new(third, 0.0);
                        if !prev_out_set {
                            if let Some(p) = self.keys.get_mut(&prev_tick) {
                                p.out_tangent = Tangent::new(third, 0.0);
                            }
                        }

                        let next = self
                            .keys
                            .range((Bound::Excluded(kf.tick), Bound::Unbounded))
                            .next()
                            .map(|(_, n)| (n.tick, n.in_tangent.is_set()));
                        if let Some((next_tick, next_in_set)) = next {
                            let next_third = (next_tick - kf.tick) / 3;
                            if !kf.out_tangent.is_set() {
                                kf.out_tangent = Tangent::new(next_third, 0.0);
                            }
                            if !next_in_set {
                                if let Some(n) = self.keys.get_mut(&next_tick) {
                                    n.in_tangent = Tangent::new(next_third, 0.0);
                                }
                            }
                        }
                    }
                }
            }
        }

        self.keys.insert(kf.tick, kf);
    }

    /// Remove the keyframe at `tick`. Removing a nonexistent key is a
    /// silent no-op.
    pub fn delete_key(&mut self, tick: i64) -> Option<Keyframe> {
        self.keys.remove(&tick)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Split the curve at `offset`: all keys at/after `offset` move into
    /// the returned curve, retimed relative to `offset`.
    pub fn split_off_at(&mut self, offset: i64) -> Curve {
        let tail = self.keys.split_off(&offset);
        let mut second = Curve::new();
        for (_, kf) in tail {
            second.keys.insert(kf.tick - offset, kf.offset(-offset));
        }
        second
    }

    /// Merge another curve's keys into this one at `tick + offset`,
    /// filtering existing keys per `policy`. Callers pass the later-starting
    /// curve as `other`, so `offset` (the start-tick difference) is >= 0.
    pub fn merge_from(&mut self, other: &Curve, offset: i64, policy: MergePolicy) {
        match policy {
            MergePolicy::Merge => {}
            MergePolicy::Replace => {
                if let (Some(first), Some(last)) = (other.first_keyframe(), other.last_keyframe())
                {
                    let doomed: Vec<i64> = self
                        .keys
                        .range(first.tick + offset..=last.tick + offset)
                        .map(|(t, _)| *t)
                        .collect();
                    for t in doomed {
                        self.keys.remove(&t);
                    }
                }
            }
            MergePolicy::Join => {
                let doomed: Vec<i64> = self.keys.range(offset..).map(|(t, _)| *t).collect();
                for t in doomed {
                    self.keys.remove(&t);
                }
            }
        }

        for kf in other.keys.values() {
            self.add_key(kf.offset(offset));
        }
    }

    /// Sample the curve at a (block-relative) tick.
    ///
    /// Empty curve -> 0. Queries before the first key hold the first value;
    /// queries at/after the last key hold the last value. In between, the
    /// straddling pair interpolates per the earlier key's curve type.
    pub fn sample(&self, tick: i64) -> f64 {
        let Some((_, first)) = self.keys.first_key_value() else {
            return 0.0;
        };
        if self.keys.len() == 1 {
            return first.value;
        }

        // Upper bound: first key strictly after the query.
        let after = self
            .keys
            .range((Bound::Excluded(tick), Bound::Unbounded))
            .next()
            .map(|(_, kf)| kf);
        let Some(after) = after else {
            // At/after the last key: hold its value.
            return self.keys.last_key_value().map(|(_, kf)| kf.value).unwrap_or(0.0);
        };

        let before = self.keys.range(..=tick).next_back().map(|(_, kf)| kf);
        let Some(before) = before else {
            // Before the first key: hold its value (`after` is the first key).
            return after.value;
        };

        match before.curve_type {
            CurveType::Step => before.value,
            CurveType::Linear | CurveType::Init => {
                let span = (after.tick - before.tick) as f64;
                before.value
                    + (after.value - before.value) * (tick - before.tick) as f64 / span
            }
            CurveType::Bezier => sample_bezier(before, after, tick),
        }
    }
}

/// Evaluate the bezier segment between `before` and `after` at `tick`.
///
/// The time component is a cubic in the bezier parameter `t`; `t` is found
/// by bisection (bounded at 25 iterations, best guess returned), then the
/// value component is evaluated at that `t`. Tangents crossing the paired
/// keyframe's tick are clamped to the segment before solving; unset
/// tangents contribute nothing.
fn sample_bezier(before: &Keyframe, after: &Keyframe, tick: i64) -> f64 {
    let t0 = before.tick as f64;
    let t3 = after.tick as f64;
    let span = t3 - t0;
    let query = tick as f64;

    let out = resolve_tangent(before.out_tangent, span);
    let inc = resolve_tangent(after.in_tangent, span);

    // Value-axis control points.
    let v0 = before.value;
    let v1 = before.value + out.1;
    let v2 = after.value - inc.1;
    let v3 = after.value;

    // Degenerate queries at either end of the segment.
    if (query - t0).abs() < BEZIER_EPSILON {
        return cubic(v0, v1, v2, v3, 0.0);
    }
    if (t3 - query).abs() < BEZIER_EPSILON {
        return cubic(v0, v1, v2, v3, 1.0);
    }

    // Time-axis control points.
    let p0 = t0;
    let p1 = t0 + out.0;
    let p2 = t3 - inc.0;
    let p3 = t3;

    let mut t = 0.5;
    let mut step = 0.25;
    let mut best_t = t;
    let mut best_err = f64::INFINITY;
    for _ in 0..BEZIER_ITERATIONS {
        let time = cubic(p0, p1, p2, p3, t);
        let err = (time - query).abs();
        if err < best_err {
            best_err = err;
            best_t = t;
        }
        if err < BEZIER_EPSILON * span {
            break;
        }
        if time < query {
            t += step;
        } else {
            t -= step;
        }
        step *= 0.5;
    }

    cubic(v0, v1, v2, v3, best_t)
}

/// Clamp a tangent to the segment span; unset tangents are (0, 0.0).
fn resolve_tangent(tangent: Tangent, span: f64) -> (f64, f64) {
    if !tangent.is_set() {
        return (0.0, 0.0);
    }
    let dx = (tangent.dx.max(0) as f64).min(span);
    (dx, tangent.dy)
}

fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}
