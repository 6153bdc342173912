//! Ship-ship and projectile-hull collision: bounding-circle broadphase
//! followed by the Separating Axis Theorem on the 49-vertex hulls, and
//! impulse-based response using mass and moment of inertia (spec.md
//! §4.1.5).

use glam::Vec2;

use crate::ship::Ship;

/// Conservative bounding radius for a brigantine-class hull (half the
/// deck's longest span plus margin).
const SHIP_BOUNDING_RADIUS: f32 = 420.0;

fn bounding_circles_overlap(a: &Ship, b: &Ship) -> bool {
    (a.position - b.position).length() <= 2.0 * SHIP_BOUNDING_RADIUS
}

/// Projects a polygon onto `axis`, returning `(min, max)`.
fn project(polygon: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for p in polygon {
        let d = p.dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

fn axes_of(polygon: &[Vec2]) -> Vec<Vec2> {
    let mut axes = Vec::with_capacity(polygon.len());
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let edge = b - a;
        let normal = Vec2::new(-edge.y, edge.x);
        if normal.length_squared() > 1e-8 {
            axes.push(normal.normalize());
        }
    }
    axes
}

/// A SAT overlap result: the minimum-translation-vector axis and depth
/// needed to separate `a` from `b`.
#[derive(Debug, Clone, Copy)]
pub struct Overlap {
    pub axis: Vec2,
    pub depth: f32,
}

/// Tests two convex polygons (world-space vertices) for overlap via the
/// Separating Axis Theorem, returning the minimum translation vector if
/// they intersect.
pub fn polygon_overlap(a: &[Vec2], b: &[Vec2]) -> Option<Overlap> {
    let mut smallest_depth = f32::MAX;
    let mut smallest_axis = Vec2::ZERO;

    for axis in axes_of(a).into_iter().chain(axes_of(b)) {
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        let overlap = (max_a.min(max_b)) - (min_a.max(min_b));
        if overlap <= 0.0 {
            return None;
        }
        if overlap < smallest_depth {
            smallest_depth = overlap;
            smallest_axis = axis;
        }
    }

    Some(Overlap {
        axis: smallest_axis,
        depth: smallest_depth,
    })
}

/// Ship-ship collision check, broadphase-filtered by bounding circles.
pub fn ship_ship_overlap(a: &Ship, b: &Ship) -> Option<Overlap> {
    if !bounding_circles_overlap(a, b) {
        return None;
    }
    polygon_overlap(&a.hull_world(), &b.hull_world())
}

/// Resolves a ship-ship collision with an impulse along the separating
/// axis, weighted by each ship's mass, and pushes the hulls apart by the
/// overlap depth (split proportional to inverse mass).
pub fn resolve_ship_collision(a: &mut Ship, b: &mut Ship, overlap: Overlap) {
    let axis = if (b.position - a.position).dot(overlap.axis) < 0.0 {
        -overlap.axis
    } else {
        overlap.axis
    };

    let inv_mass_a = 1.0 / a.params.mass;
    let inv_mass_b = 1.0 / b.params.mass;
    let total_inv_mass = inv_mass_a + inv_mass_b;
    if total_inv_mass <= 0.0 {
        return;
    }

    let relative_velocity = b.velocity - a.velocity;
    let velocity_along_axis = relative_velocity.dot(axis);
    if velocity_along_axis < 0.0 {
        const RESTITUTION: f32 = 0.2;
        let impulse_mag = -(1.0 + RESTITUTION) * velocity_along_axis / total_inv_mass;
        let impulse = axis * impulse_mag;
        a.velocity -= impulse * inv_mass_a;
        b.velocity += impulse * inv_mass_b;
    }

    let correction = axis * overlap.depth;
    a.position -= correction * (inv_mass_a / total_inv_mass);
    b.position += correction * (inv_mass_b / total_inv_mass);
}

/// Segment-polygon intersection test for a projectile's motion this tick
/// against a ship's hull, returning the first hit point if any.
pub fn segment_hits_polygon(start: Vec2, end: Vec2, polygon: &[Vec2]) -> Option<Vec2> {
    let mut closest: Option<(f32, Vec2)> = None;
    for i in 0..polygon.len() {
        let p1 = polygon[i];
        let p2 = polygon[(i + 1) % polygon.len()];
        if let Some((t, point)) = segment_intersection(start, end, p1, p2) {
            if closest.map(|(best_t, _)| t < best_t).unwrap_or(true) {
                closest = Some((t, point));
            }
        }
    }
    closest.map(|(_, point)| point)
}

fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<(f32, Vec2)> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-8 {
        return None;
    }
    let diff = p3 - p1;
    let t = (diff.x * d2.y - diff.y * d2.x) / denom;
    let u = (diff.x * d1.y - diff.y * d1.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, p1 + d1 * t))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distant_ships_do_not_overlap() {
        let a = Ship::new(1, Vec2::ZERO, 0.0);
        let b = Ship::new(2, Vec2::new(5000.0, 0.0), 0.0);
        assert!(ship_ship_overlap(&a, &b).is_none());
    }

    #[test]
    fn coincident_ships_overlap() {
        let a = Ship::new(1, Vec2::ZERO, 0.0);
        let b = Ship::new(2, Vec2::ZERO, 0.0);
        assert!(ship_ship_overlap(&a, &b).is_some());
    }

    #[test]
    fn collision_resolution_pushes_ships_apart() {
        let mut a = Ship::new(1, Vec2::new(-50.0, 0.0), 0.0);
        let mut b = Ship::new(2, Vec2::new(50.0, 0.0), 0.0);
        let overlap = ship_ship_overlap(&a, &b).expect("should overlap");
        let dist_before = (a.position - b.position).length();
        resolve_ship_collision(&mut a, &mut b, overlap);
        let dist_after = (a.position - b.position).length();
        assert!(dist_after > dist_before);
    }

    #[test]
    fn segment_hits_axis_aligned_square() {
        let square = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        let hit = segment_hits_polygon(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0), &square);
        assert!(hit.is_some());
        assert!((hit.unwrap().x + 10.0).abs() < 1e-3);
    }

    #[test]
    fn segment_miss_returns_none() {
        let square = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        let hit = segment_hits_polygon(Vec2::new(-50.0, 100.0), Vec2::new(50.0, 100.0), &square);
        assert!(hit.is_none());
    }
}
