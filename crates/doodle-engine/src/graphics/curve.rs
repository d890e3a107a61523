//! Bezier evaluation for the curve drawing tools.
//!
//! A control polygon of `n` points describes a Bezier curve of degree `n - 1`.
//! Curves are sampled at `t = i / (samples - 1)` so the first and last samples
//! land exactly on the end points.

use glam::Vec2;

/// Minimum number of samples taken along a curve.
pub const MIN_SAMPLES: usize = 2;

/// Evaluates the curve at `t` with de Casteljau's algorithm.
///
/// Returns `None` for an empty control polygon.
pub fn evaluate(points: &[Vec2], t: f32) -> Option<Vec2> {
    let mut work: Vec<Vec2> = points.to_vec();
    if work.is_empty() {
        return None;
    }
    for level in (1..work.len()).rev() {
        for i in 0..level {
            work[i] = work[i].lerp(work[i + 1], t);
        }
    }
    Some(work[0])
}

/// Samples the curve at `samples` evenly spaced parameters.
///
/// `samples` is raised to [`MIN_SAMPLES`]. An empty polygon yields no points.
pub fn sample(points: &[Vec2], samples: usize) -> Vec<Vec2> {
    if points.is_empty() {
        return Vec::new();
    }
    let samples = samples.max(MIN_SAMPLES);
    let last = (samples - 1) as f32;
    (0..samples)
        .filter_map(|i| evaluate(points, i as f32 / last))
        .collect()
}

/// Control polygons of the upper and lower halves of a circle outline.
pub fn circle_halves(centre: Vec2, radius: f32) -> [[Vec2; 4]; 2] {
    let half = |dir: f32| {
        [
            centre + Vec2::new(-radius, 0.0),
            centre + Vec2::new(-radius, dir * radius),
            centre + Vec2::new(radius, dir * radius),
            centre + Vec2::new(radius, 0.0),
        ]
    };
    [half(1.0), half(-1.0)]
}

/// Control polygons of the upper and lower halves of a filled circle.
///
/// The extra apex control at `1.25 * radius` pulls the quartic closer to a
/// round arc than the cubic outline.
pub fn filled_circle_halves(centre: Vec2, radius: f32) -> [[Vec2; 5]; 2] {
    let half = |dir: f32| {
        [
            centre + Vec2::new(-radius, 0.0),
            centre + Vec2::new(-radius, dir * radius),
            centre + Vec2::new(0.0, dir * radius * 1.25),
            centre + Vec2::new(radius, dir * radius),
            centre + Vec2::new(radius, 0.0),
        ]
    };
    [half(1.0), half(-1.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn cubic_matches_closed_form() {
        let p = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(-0.3, -1.0),
            Vec2::new(0.3, 1.0),
            Vec2::new(1.0, 1.0),
        ];
        for t in [0.0f32, 0.25, 0.5, 0.8, 1.0] {
            let u = 1.0 - t;
            let expected = p[0] * u * u * u
                + p[1] * 3.0 * u * u * t
                + p[2] * 3.0 * u * t * t
                + p[3] * t * t * t;
            assert!(close(evaluate(&p, t).unwrap(), expected), "t = {t}");
        }
    }

    #[test]
    fn samples_hit_end_points() {
        let p = [Vec2::new(-2.0, 0.0), Vec2::new(0.0, 3.0), Vec2::new(2.0, 0.0)];
        let pts = sample(&p, 15);
        assert_eq!(pts.len(), 15);
        assert!(close(pts[0], p[0]));
        assert!(close(pts[14], p[2]));
        // Quadratic apex sits halfway to the control point.
        assert!(close(pts[7], Vec2::new(0.0, 1.5)));
    }

    #[test]
    fn sample_count_is_clamped() {
        let p = [Vec2::ZERO, Vec2::ONE];
        assert_eq!(sample(&p, 0).len(), 2);
        assert_eq!(sample(&p, 1).len(), 2);
    }

    #[test]
    fn degenerate_polygons() {
        assert!(sample(&[], 10).is_empty());
        assert!(evaluate(&[], 0.5).is_none());

        let single = sample(&[Vec2::new(3.0, 4.0)], 4);
        assert!(single.iter().all(|p| *p == Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn circle_halves_span_the_diameter() {
        let [upper, lower] = circle_halves(Vec2::new(1.0, 1.0), 2.0);
        assert_eq!(upper[0], Vec2::new(-1.0, 1.0));
        assert_eq!(upper[3], Vec2::new(3.0, 1.0));
        assert!(evaluate(&upper, 0.5).unwrap().y > 1.0);
        assert!(evaluate(&lower, 0.5).unwrap().y < 1.0);
    }

    #[test]
    fn filled_halves_are_symmetric() {
        let [upper, lower] = filled_circle_halves(Vec2::ZERO, 1.0);
        let top = evaluate(&upper, 0.5).unwrap();
        let bottom = evaluate(&lower, 0.5).unwrap();
        assert!(close(top, -bottom));
        assert_eq!(upper[2], Vec2::new(0.0, 1.25));
    }
}
