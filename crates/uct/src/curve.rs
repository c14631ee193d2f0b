//! Approximate Pareto frontiers in (risk, reward) space.
//!
//! A [`ParetoCurve`] estimates, per node, the best expected reward
//! achievable at each accepted risk level. It is stored as support points
//! sorted by risk; after every update the points are pruned to a monotone
//! non-decreasing, concave upper envelope, so segment slopes strictly
//! decrease from left to right and derivative matching is well defined.
//!
//! [`mix`] searches the best randomization between two frontiers that hits
//! a risk target exactly.

/// One support point of a frontier, with its sample weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurvePoint {
    /// Accepted risk (expected discounted penalty).
    pub risk: f32,

    /// Best observed expected reward at that risk.
    pub reward: f32,

    weight: f32,
}

/// Risk distance under which a new sample merges into an existing point.
const MERGE_TOLERANCE: f32 = 1e-3;

/// Feasibility slack for the mixing constraint.
const MIX_EPS: f32 = 1e-6;

/// Minimum risk separation between neighboring support points. Keeps
/// segment slopes finite when merged points drift toward each other.
const RISK_EPS: f32 = 1e-6;

/// A monotone non-decreasing reward-versus-risk frontier estimate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParetoCurve {
    points: Vec<CurvePoint>,
}

impl ParetoCurve {
    /// An empty frontier.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Whether no sample has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of support points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// The support points, sorted by risk.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Incorporate an observed (reward, risk) sample.
    ///
    /// Samples close in risk to an existing point merge into it by running
    /// mean; otherwise a new support point is added. The envelope is then
    /// re-established, so the frontier stays monotone and concave.
    pub fn update(&mut self, reward: f32, risk: f32) {
        match self
            .points
            .iter()
            .position(|p| (p.risk - risk).abs() <= MERGE_TOLERANCE)
        {
            Some(i) => {
                let p = &mut self.points[i];
                p.weight += 1.0;
                p.risk += (risk - p.risk) / p.weight;
                p.reward += (reward - p.reward) / p.weight;
            }
            None => self.points.push(CurvePoint {
                risk,
                reward,
                weight: 1.0,
            }),
        }
        self.enforce();
    }

    /// Reward bounds `(min_r, max_r)` of the frontier; `(0, 0)` when empty.
    pub fn r_bounds(&self) -> (f32, f32) {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first.reward, last.reward),
            _ => (0.0, 0.0),
        }
    }

    /// Risk bounds `(min_risk, max_risk)` of the frontier; `(0, 0)` when
    /// empty.
    pub fn risk_bounds(&self) -> (f32, f32) {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first.risk, last.risk),
            _ => (0.0, 0.0),
        }
    }

    /// Best reward achievable at `risk`, interpolating between support
    /// points and clamping outside the observed risk range.
    pub fn value_at(&self, risk: f32) -> f32 {
        let n = self.points.len();
        if n == 0 {
            return 0.0;
        }
        if risk <= self.points[0].risk {
            return self.points[0].reward;
        }
        if risk >= self.points[n - 1].risk {
            return self.points[n - 1].reward;
        }
        for w in self.points.windows(2) {
            if risk <= w[1].risk {
                let t = (risk - w[0].risk) / (w[1].risk - w[0].risk);
                return w[0].reward + t * (w[1].reward - w[0].reward);
            }
        }
        self.points[n - 1].reward
    }

    /// Slope at `risk`; the right-derivative at breakpoints, zero beyond
    /// the last support point and on degenerate frontiers.
    pub fn derivative(&self, risk: f32) -> f32 {
        let n = self.points.len();
        if n < 2 || risk >= self.points[n - 1].risk {
            return 0.0;
        }
        for w in self.points.windows(2) {
            if risk < w[1].risk {
                return segment_slope(w[0], w[1]);
            }
        }
        0.0
    }

    /// Smallest risk whose slope has dropped to `d` or below.
    ///
    /// Segment slopes strictly decrease, so this is the left endpoint of
    /// the first segment with slope ≤ `d`; the last support point's risk if
    /// every slope exceeds `d`.
    pub fn inverse_derivative(&self, d: f32) -> f32 {
        let n = self.points.len();
        if n == 0 {
            return 0.0;
        }
        if n == 1 {
            return self.points[0].risk;
        }
        for (i, w) in self.points.windows(2).enumerate() {
            if segment_slope(w[0], w[1]) <= d {
                return self.points[i].risk;
            }
        }
        self.points[n - 1].risk
    }

    /// Restore sortedness, dominance, and concavity after an update.
    fn enforce(&mut self) {
        self.points.sort_by(|a, b| {
            a.risk
                .partial_cmp(&b.risk)
                .expect("BUG: NaN risk on frontier")
        });

        // Dominance: keep strictly increasing rewards at separated risks.
        let mut kept: Vec<CurvePoint> = Vec::with_capacity(self.points.len());
        for p in self.points.drain(..) {
            if let Some(k) = kept.last_mut() {
                if p.risk - k.risk <= RISK_EPS {
                    if p.reward > k.reward {
                        *k = p;
                    }
                    continue;
                }
                if p.reward <= k.reward {
                    continue;
                }
            }
            kept.push(p);
        }

        // Concave upper envelope.
        let mut hull: Vec<CurvePoint> = Vec::with_capacity(kept.len());
        for p in kept {
            while hull.len() >= 2 {
                let a = hull[hull.len() - 2];
                let b = hull[hull.len() - 1];
                if segment_slope(a, b) <= segment_slope(b, p) {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(p);
        }
        self.points = hull;
    }
}

fn segment_slope(a: CurvePoint, b: CurvePoint) -> f32 {
    (b.reward - a.reward) / (b.risk - a.risk)
}

/// Best randomization between two frontiers hitting a risk target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mix {
    /// Risk at which the first frontier is played.
    pub risk_a: f32,

    /// Probability of playing the first frontier.
    pub weight_a: f32,

    /// Risk at which the second frontier is played.
    pub risk_b: f32,

    /// Mixture value, bonuses included.
    pub value: f32,
}

/// Search the best mixture of two frontiers under a risk target.
///
/// Candidate risks per frontier are its support points plus `steps` grid
/// steps of size `step` around the clamped target. Every candidate pair
/// bracketing the target is scored at the weight that meets the target
/// exactly: `w · risk_a + (1 − w) · risk_b = target`. The first candidate
/// pair wins ties.
///
/// If the target lies outside both frontiers' risk ranges no pair can
/// bracket it; the mixture then degenerates to the closest achievable
/// endpoints with all weight on the better one.
pub fn mix(
    a: &ParetoCurve,
    b: &ParetoCurve,
    bonus_a: f32,
    bonus_b: f32,
    steps: usize,
    step: f32,
    target: f32,
) -> Mix {
    let cand_a = candidate_risks(a, target, steps, step);
    let cand_b = candidate_risks(b, target, steps, step);

    let mut best: Option<Mix> = None;
    for &risk_a in &cand_a {
        for &risk_b in &cand_b {
            let weight_a = match mixing_weight(risk_a, risk_b, target) {
                Some(w) => w,
                None => continue,
            };
            let value = weight_a * (a.value_at(risk_a) + bonus_a)
                + (1.0 - weight_a) * (b.value_at(risk_b) + bonus_b);
            if best.map_or(true, |m| value > m.value) {
                best = Some(Mix {
                    risk_a,
                    weight_a,
                    risk_b,
                    value,
                });
            }
        }
    }

    best.unwrap_or_else(|| degenerate_mix(a, b, bonus_a, bonus_b, target))
}

/// Support-point risks plus a grid around the clamped target.
fn candidate_risks(curve: &ParetoCurve, target: f32, steps: usize, step: f32) -> Vec<f32> {
    let (lo, hi) = curve.risk_bounds();
    let pivot = target.clamp(lo, hi);
    let mut out: Vec<f32> = curve.points().iter().map(|p| p.risk).collect();
    out.push(pivot);
    for i in 1..=steps {
        let delta = i as f32 * step;
        out.push((pivot - delta).max(lo));
        out.push((pivot + delta).min(hi));
    }
    out
}

/// Weight on `risk_a` that meets the target, if the pair brackets it.
fn mixing_weight(risk_a: f32, risk_b: f32, target: f32) -> Option<f32> {
    if target < risk_a.min(risk_b) - MIX_EPS || target > risk_a.max(risk_b) + MIX_EPS {
        return None;
    }
    let span = risk_b - risk_a;
    if span.abs() <= MIX_EPS {
        return Some(1.0);
    }
    Some(((risk_b - target) / span).clamp(0.0, 1.0))
}

/// Fallback when no candidate pair brackets the target.
fn degenerate_mix(a: &ParetoCurve, b: &ParetoCurve, bonus_a: f32, bonus_b: f32, target: f32) -> Mix {
    let (a_lo, a_hi) = a.risk_bounds();
    let (b_lo, b_hi) = b.risk_bounds();
    let (risk_a, risk_b) = if target > a_hi.max(b_hi) {
        (a_hi, b_hi)
    } else {
        (a_lo, b_lo)
    };
    let value_a = a.value_at(risk_a) + bonus_a;
    let value_b = b.value_at(risk_b) + bonus_b;
    if value_a >= value_b {
        Mix {
            risk_a,
            weight_a: 1.0,
            risk_b,
            value: value_a,
        }
    } else {
        Mix {
            risk_a,
            weight_a: 0.0,
            risk_b,
            value: value_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(samples: &[(f32, f32)]) -> ParetoCurve {
        let mut c = ParetoCurve::new();
        for &(reward, risk) in samples {
            c.update(reward, risk);
        }
        c
    }

    fn assert_monotone(c: &ParetoCurve) {
        for w in c.points().windows(2) {
            assert!(w[0].risk < w[1].risk, "risks out of order: {:?}", c);
            assert!(w[0].reward < w[1].reward, "rewards out of order: {:?}", c);
        }
    }

    #[test]
    fn test_empty_curve_is_degenerate() {
        let c = ParetoCurve::new();
        assert!(c.is_empty());
        assert_eq!(c.r_bounds(), (0.0, 0.0));
        assert_eq!(c.value_at(0.5), 0.0);
        assert_eq!(c.derivative(0.5), 0.0);
        assert_eq!(c.inverse_derivative(1.0), 0.0);
    }

    #[test]
    fn test_update_keeps_monotone() {
        let c = curve(&[(1.0, 0.0), (3.0, 1.0), (2.5, 0.5), (0.5, 0.9)]);
        assert_monotone(&c);
        // The (0.5, 0.9) sample is dominated and cannot surface.
        let (min_r, max_r) = c.r_bounds();
        assert!((min_r - 1.0).abs() < 1e-6);
        assert!((max_r - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_merges_nearby_samples() {
        let mut c = ParetoCurve::new();
        c.update(1.0, 0.5);
        c.update(3.0, 0.5);
        assert_eq!(c.len(), 1);
        assert!((c.points()[0].reward - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_concave_envelope_drops_inner_points() {
        // (0.5, 1.0) lies below the chord from (0, 0) to (1, 4).
        let c = curve(&[(0.0, 0.0), (1.0, 0.5), (4.0, 1.0)]);
        assert_eq!(c.len(), 2);
        assert_monotone(&c);
    }

    #[test]
    fn test_value_at_interpolates() {
        let c = curve(&[(1.0, 0.0), (3.0, 1.0)]);
        assert!((c.value_at(0.5) - 2.0).abs() < 1e-6);
        assert!((c.value_at(-1.0) - 1.0).abs() < 1e-6);
        assert!((c.value_at(2.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_derivative_is_right_slope() {
        let c = curve(&[(0.0, 0.0), (2.0, 0.5), (3.0, 1.0)]);
        assert!((c.derivative(0.0) - 4.0).abs() < 1e-5);
        assert!((c.derivative(0.25) - 4.0).abs() < 1e-5);
        assert!((c.derivative(0.5) - 2.0).abs() < 1e-5);
        assert_eq!(c.derivative(1.0), 0.0);
    }

    #[test]
    fn test_inverse_derivative_ties_to_lower_risk() {
        let c = curve(&[(0.0, 0.0), (2.0, 0.5), (3.0, 1.0)]);
        // Slopes are 4 then 2.
        assert!((c.inverse_derivative(5.0) - 0.0).abs() < 1e-6);
        assert!((c.inverse_derivative(4.0) - 0.0).abs() < 1e-6);
        assert!((c.inverse_derivative(3.0) - 0.5).abs() < 1e-6);
        assert!((c.inverse_derivative(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mix_two_point_masses() {
        // The two-armed bandit frontiers: safe at (risk 0, reward 1),
        // risky at (risk 1, reward 3).
        let safe = curve(&[(1.0, 0.0)]);
        let risky = curve(&[(3.0, 1.0)]);

        let m = mix(&safe, &risky, 0.0, 0.0, 10, 0.01, 0.2);
        assert!((m.risk_a - 0.0).abs() < 1e-6);
        assert!((m.risk_b - 1.0).abs() < 1e-6);
        assert!((m.weight_a - 0.8).abs() < 1e-5);
        assert!((m.value - 1.4).abs() < 1e-5);
    }

    #[test]
    fn test_mix_vacuous_target_takes_best_reward() {
        let safe = curve(&[(1.0, 0.0)]);
        let risky = curve(&[(3.0, 1.0)]);

        let m = mix(&safe, &risky, 0.0, 0.0, 10, 0.01, 1.0);
        assert!((m.weight_a - 0.0).abs() < 1e-6);
        assert!((m.value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_mix_zero_target_forces_safe_arm() {
        let safe = curve(&[(1.0, 0.0)]);
        let risky = curve(&[(3.0, 1.0)]);

        let m = mix(&safe, &risky, 0.0, 0.0, 10, 0.01, 0.0);
        assert!((m.weight_a - 1.0).abs() < 1e-6);
        assert!((m.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mix_bonus_shifts_choice() {
        let safe = curve(&[(1.0, 0.0)]);
        let risky = curve(&[(3.0, 1.0)]);

        // A large bonus on the safe arm dominates the mixture value.
        let with_bonus = mix(&safe, &risky, 10.0, 0.0, 10, 0.01, 0.2);
        let without = mix(&safe, &risky, 0.0, 0.0, 10, 0.01, 0.2);
        assert!(with_bonus.value > without.value);
    }

    #[test]
    fn test_mix_target_above_both_ranges() {
        let a = curve(&[(1.0, 0.1)]);
        let b = curve(&[(2.0, 0.3)]);

        let m = mix(&a, &b, 0.0, 0.0, 10, 0.01, 0.9);
        assert!((m.weight_a - 0.0).abs() < 1e-6);
        assert!((m.value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_mix_empty_curves() {
        let a = ParetoCurve::new();
        let b = ParetoCurve::new();

        let m = mix(&a, &b, 0.0, 0.0, 10, 0.01, 0.5);
        assert_eq!(m.value, 0.0);
        assert!(m.weight_a == 0.0 || m.weight_a == 1.0);
    }
}
