//! # Geometry Utilities
//!
//! Range tests and the swept overlap test used by trade detection.
//!
//! A moving NPC is only sampled once per tick. A fast NPC can cross a Rug's
//! trade circle between two samples without either sample landing inside,
//! so trades are tested against the segment `previous -> current` rather
//! than the current point.
//!
//! ```text
//!        previous ●
//!                  \
//!              .----\----.
//!             /      \    \     segment crosses the circle,
//!            |   ◎    \    |    neither endpoint is inside
//!             \        \  /
//!              '--------\'
//!                        ● current
//! ```

use crate::math::Vec2;

/// Clamps a position so that each axis lies in `[0, range)`.
///
/// `range` is the world extent (window width and height in pixels). The
/// upper bound is exclusive so a clamped position always maps to a valid tile.
#[must_use]
pub fn clamp(value: Vec2, range: Vec2) -> Vec2 {
    Vec2::new(clamp_axis(value.x, range.x), clamp_axis(value.y, range.y))
}

fn clamp_axis(value: f32, limit: f32) -> f32 {
    let upper = just_below(limit);
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value > upper {
        upper
    } else {
        value
    }
}

/// Largest `f32` strictly below `limit`, or `0.0` when `limit` is not positive.
fn just_below(limit: f32) -> f32 {
    if limit > 0.0 && limit.is_finite() {
        f32::from_bits(limit.to_bits() - 1)
    } else {
        0.0
    }
}

/// True iff the squared distance between `a` and `b` is at most `radius²`.
#[inline]
#[must_use]
pub fn points_in_range(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance_squared(b) <= radius * radius
}

/// Tests whether the segment `seg_a -> seg_b` touches the circle at `center`.
///
/// True when either endpoint is within `radius` of `center`, or when the
/// perpendicular foot of `center` on the segment's line is within `radius`
/// and lies between the endpoints.
///
/// Vertical and horizontal segments place the foot directly. Any other
/// segment projects `center` onto its direction. A zero-length segment
/// reduces to the endpoint test.
#[must_use]
pub fn line_segment_overlaps_circle(seg_a: Vec2, seg_b: Vec2, center: Vec2, radius: f32) -> bool {
    if points_in_range(seg_a, center, radius) || points_in_range(seg_b, center, radius) {
        return true;
    }

    let dx = seg_b.x - seg_a.x;
    let dy = seg_b.y - seg_a.y;

    if dx == 0.0 && dy == 0.0 {
        return false;
    }

    let foot = if dx == 0.0 {
        // Vertical: the perpendicular through center is horizontal
        Vec2::new(seg_a.x, center.y)
    } else if dy == 0.0 {
        // Horizontal: the perpendicular through center is vertical
        Vec2::new(center.x, seg_a.y)
    } else {
        // Project onto the segment direction; no slope, so steep lines stay finite
        let direction = seg_b - seg_a;
        let t = (center - seg_a).dot(direction) / direction.length_squared();
        seg_a + direction * t
    };

    points_in_range(foot, center, radius) && within_bounds(foot, seg_a, seg_b)
}

/// Whether `point` lies inside the axis-aligned bounding box of the segment.
fn within_bounds(point: Vec2, seg_a: Vec2, seg_b: Vec2) -> bool {
    let (min_x, max_x) = if seg_a.x <= seg_b.x { (seg_a.x, seg_b.x) } else { (seg_b.x, seg_a.x) };
    let (min_y, max_y) = if seg_a.y <= seg_b.y { (seg_a.y, seg_b.y) } else { (seg_b.y, seg_a.y) };

    point.x >= min_x && point.x <= max_x && point.y >= min_y && point.y <= max_y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_keeps_upper_bound_exclusive() {
        let range = Vec2::new(300.0, 200.0);

        let clamped = clamp(Vec2::new(300.0, 500.0), range);
        assert!(clamped.x < 300.0);
        assert!(clamped.y < 200.0);
        assert!(clamped.x > 299.9);

        assert_eq!(clamp(Vec2::new(-4.0, 12.0), range), Vec2::new(0.0, 12.0));
        assert_eq!(clamp(Vec2::new(f32::NAN, 12.0), range), Vec2::new(0.0, 12.0));
    }

    #[test]
    fn test_points_in_range_is_inclusive() {
        assert!(points_in_range(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0), 5.0));
        assert!(!points_in_range(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0), 4.99));
    }

    #[test]
    fn test_endpoint_at_center() {
        let center = Vec2::new(10.0, 10.0);
        assert!(line_segment_overlaps_circle(center, Vec2::new(90.0, 50.0), center, 1.0));
    }

    #[test]
    fn test_segment_passing_through() {
        // Horizontal, vertical and diagonal segments straight through the circle
        let center = Vec2::new(0.0, 0.0);
        assert!(line_segment_overlaps_circle(Vec2::new(-10.0, 0.5), Vec2::new(10.0, 0.5), center, 2.0));
        assert!(line_segment_overlaps_circle(Vec2::new(1.0, -10.0), Vec2::new(1.0, 10.0), center, 2.0));
        assert!(line_segment_overlaps_circle(
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(1.0, -1.0),
            2.0
        ));
    }

    #[test]
    fn test_segment_far_away() {
        assert!(!line_segment_overlaps_circle(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(100.0, 100.0),
            1.0
        ));
    }

    #[test]
    fn test_foot_beyond_segment_end() {
        // The infinite line passes through the circle, the segment stops short
        assert!(!line_segment_overlaps_circle(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(15.0, 0.5),
            1.0
        ));
        assert!(!line_segment_overlaps_circle(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(20.0, 20.5),
            1.0
        ));
    }

    #[test]
    fn test_nearly_vertical_segment_through_circle() {
        let center = Vec2::new(0.0, 0.0);
        assert!(line_segment_overlaps_circle(
            Vec2::new(0.0, -10.0),
            Vec2::new(1e-38, 10.0),
            center,
            1.0
        ));
        assert!(!line_segment_overlaps_circle(
            Vec2::new(5.0, -10.0),
            Vec2::new(5.0 + 1e-30, 10.0),
            center,
            1.0
        ));
    }

    #[test]
    fn test_zero_length_segment() {
        let p = Vec2::new(5.0, 5.0);
        assert!(!line_segment_overlaps_circle(p, p, Vec2::new(50.0, 50.0), 3.0));
        assert!(line_segment_overlaps_circle(p, p, Vec2::new(6.0, 6.0), 3.0));
    }
}
