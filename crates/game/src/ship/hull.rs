//! Ship hull polygon generation.
//!
//! A hull outline is defined by six control points (ship-local, closed
//! hexagon) forming three straight edges (port/starboard sides, stern
//! transom) alternating with three quadratic-Bezier arcs (bow and the two
//! shoulders), then resampled to a fixed 49-point closed polygon used for
//! both SAT collision and the deck AABB.

use glam::Vec2;

pub const HULL_POINT_COUNT: usize = 49;

/// Six control points, ordered starboard-bow -> starboard-stern ->
/// stern -> port-stern -> port-bow -> bow -> (back to starboard-bow).
#[derive(Debug, Clone, Copy)]
pub struct HullControlPoints {
    pub starboard_bow: Vec2,
    pub starboard_stern: Vec2,
    pub stern: Vec2,
    pub port_stern: Vec2,
    pub port_bow: Vec2,
    pub bow: Vec2,
}

impl Default for HullControlPoints {
    /// Brigantine-shaped default hull: ~675 units long, ~180 units beam.
    fn default() -> Self {
        Self {
            bow: Vec2::new(400.0, 0.0),
            starboard_bow: Vec2::new(250.0, 90.0),
            starboard_stern: Vec2::new(-260.0, 90.0),
            stern: Vec2::new(-320.0, 0.0),
            port_stern: Vec2::new(-260.0, -90.0),
            port_bow: Vec2::new(250.0, -90.0),
        }
    }
}

/// How far a shoulder/bow arc bulges outward from its chord, as a fraction
/// of chord length.
const ARC_BULGE: f32 = 0.18;

fn quadratic_bezier(p0: Vec2, control: Vec2, p1: Vec2, t: f32) -> Vec2 {
    let a = p0.lerp(control, t);
    let b = control.lerp(p1, t);
    a.lerp(b, t)
}

fn arc_control(p0: Vec2, p1: Vec2, outward: Vec2) -> Vec2 {
    let mid = p0.lerp(p1, 0.5);
    let chord = (p1 - p0).length();
    mid + outward.normalize_or_zero() * (chord * ARC_BULGE)
}

/// Builds the raw (unresampled) closed outline from the six control points:
/// starboard side (line), stern-to-port-stern (arc), port side (line),
/// bow-to-starboard-bow (arc) ... three lines and three arcs in total.
fn raw_outline(points: &HullControlPoints, samples_per_arc: usize) -> Vec<Vec2> {
    let mut out = Vec::new();

    // Edge 1: bow arc (port_bow -> starboard_bow via bow control), rounds the bow.
    for i in 0..samples_per_arc {
        let t = i as f32 / samples_per_arc as f32;
        out.push(quadratic_bezier(
            points.port_bow,
            arc_control(points.port_bow, points.starboard_bow, Vec2::new(1.0, 0.0)),
            points.starboard_bow,
            t,
        ));
    }

    // Edge 2: starboard side (straight line).
    out.push(points.starboard_bow);

    // Edge 3: starboard-stern shoulder arc.
    for i in 0..samples_per_arc {
        let t = i as f32 / samples_per_arc as f32;
        out.push(quadratic_bezier(
            points.starboard_stern,
            arc_control(
                points.starboard_stern,
                points.stern,
                Vec2::new(-1.0, 1.0),
            ),
            points.stern,
            t,
        ));
    }

    // Edge 4: stern transom (straight line).
    out.push(points.stern);

    // Edge 5: port-stern shoulder arc.
    for i in 0..samples_per_arc {
        let t = i as f32 / samples_per_arc as f32;
        out.push(quadratic_bezier(
            points.port_stern,
            arc_control(points.port_stern, points.port_bow, Vec2::new(-1.0, -1.0)),
            points.port_bow,
            t,
        ));
    }

    // Edge 6: port side (straight line).
    out.push(points.port_bow);

    out
}

/// Resamples a closed polygon to exactly `target` points, evenly spaced by
/// arc length, preserving the original shape.
fn resample_closed(points: &[Vec2], target: usize) -> Vec<Vec2> {
    assert!(points.len() >= 2);

    let mut cumulative = Vec::with_capacity(points.len() + 1);
    cumulative.push(0.0f32);
    for i in 0..points.len() {
        let next = points[(i + 1) % points.len()];
        let dist = (next - points[i]).length();
        cumulative.push(cumulative[i] + dist);
    }
    let total_length = *cumulative.last().unwrap();

    let mut result = Vec::with_capacity(target);
    for k in 0..target {
        let target_dist = total_length * (k as f32) / (target as f32);
        let seg = cumulative
            .windows(2)
            .position(|w| target_dist >= w[0] && target_dist <= w[1])
            .unwrap_or(points.len() - 1);

        let seg_start = cumulative[seg];
        let seg_end = cumulative[seg + 1];
        let t = if seg_end > seg_start {
            (target_dist - seg_start) / (seg_end - seg_start)
        } else {
            0.0
        };

        let p0 = points[seg % points.len()];
        let p1 = points[(seg + 1) % points.len()];
        result.push(p0.lerp(p1, t));
    }
    result
}

/// Generates the 49-vertex closed hull polygon, ship-local coordinates.
pub fn generate_hull(control: &HullControlPoints) -> Vec<Vec2> {
    let raw = raw_outline(control, 12);
    resample_closed(&raw, HULL_POINT_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hull_has_exactly_49_points() {
        let hull = generate_hull(&HullControlPoints::default());
        assert_eq!(hull.len(), HULL_POINT_COUNT);
    }

    #[test]
    fn hull_is_roughly_centered_on_origin() {
        let hull = generate_hull(&HullControlPoints::default());
        let centroid: Vec2 = hull.iter().copied().sum::<Vec2>() / hull.len() as f32;
        assert!(centroid.length() < 200.0);
    }

    #[test]
    fn hull_bow_is_forwardmost_point() {
        let hull = generate_hull(&HullControlPoints::default());
        let max_x = hull.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        assert!(max_x > 350.0);
    }
}
