//! Planar vehicle footprints and small linear-algebra helpers.

use crate::domain::errors::{DomainError, DomainResult};

/// Passenger-car outline in body coordinates, normalized to unit length and
/// width: x runs from rear (-0.5) to front (+0.5), y from right to left.
const PASSENGER_OUTLINE: [(f64, f64); 10] = [
    (0.5, -73.0 / 235.0),
    (272.0 / 647.0, -104.5 / 235.0),
    (153.0 / 647.0, -0.5),
    (-294.0 / 647.0, -0.5),
    (-0.5, -96.0 / 235.0),
    (-0.5, 96.0 / 235.0),
    (-294.0 / 647.0, 0.5),
    (153.0 / 647.0, 0.5),
    (272.0 / 647.0, 104.5 / 235.0),
    (0.5, 73.0 / 235.0),
];

/// World coordinates in metres.
pub type Point = (f64, f64);

/// Pose and size of a vehicle as reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePose {
    /// Front-bumper centre
    pub front: Point,
    /// Heading in degrees, 0 = north, clockwise
    pub heading_deg: f64,
    /// Metres
    pub length: f64,
    /// Metres
    pub width: f64,
}

impl VehiclePose {
    /// World-frame outline of the vehicle.
    pub fn footprint(&self) -> Vec<Point> {
        let theta = self.heading_deg.to_radians();
        // Unit vector along the heading and its left normal.
        let (fx, fy) = (theta.sin(), theta.cos());
        let (lx, ly) = (-fy, fx);
        let cx = self.front.0 - fx * self.length / 2.0;
        let cy = self.front.1 - fy * self.length / 2.0;

        PASSENGER_OUTLINE
            .iter()
            .map(|&(u, v)| {
                let along = u * self.length;
                let across = v * self.width;
                (
                    cx + fx * along + lx * across,
                    cy + fy * along + ly * across,
                )
            })
            .collect()
    }
}

/// Euclidean distance between two vehicle footprints; zero when they overlap.
pub fn footprint_distance(a: &VehiclePose, b: &VehiclePose) -> f64 {
    polygon_distance(&a.footprint(), &b.footprint())
}

/// Distance between two simple polygons; zero when they touch or overlap.
pub fn polygon_distance(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    if polygons_intersect(a, b) {
        return 0.0;
    }

    let mut best = f64::INFINITY;
    for (p1, p2) in edges(a) {
        for (q1, q2) in edges(b) {
            best = best.min(segment_distance(p1, p2, q1, q2));
        }
    }
    best
}

fn edges(polygon: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(&p, &q)| (p, q))
}

fn polygons_intersect(a: &[Point], b: &[Point]) -> bool {
    for (p1, p2) in edges(a) {
        for (q1, q2) in edges(b) {
            if segments_intersect(p1, p2, q1, q2) {
                return true;
            }
        }
    }
    contains_point(a, b[0]) || contains_point(b, a[0])
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    r.0 >= p.0.min(q.0) && r.0 <= p.0.max(q.0) && r.1 >= p.1.min(q.1) && r.1 <= p.1.max(q.1)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Even-odd point-in-polygon test.
fn contains_point(polygon: &[Point], point: Point) -> bool {
    let mut inside = false;
    for (a, b) in edges(polygon) {
        if (a.1 > point.1) != (b.1 > point.1) {
            let x = a.0 + (point.1 - a.1) / (b.1 - a.1) * (b.0 - a.0);
            if point.0 < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

fn segment_distance(p1: Point, p2: Point, q1: Point, q2: Point) -> f64 {
    if segments_intersect(p1, p2, q1, q2) {
        return 0.0;
    }
    point_segment_distance(p1, q1, q2)
        .min(point_segment_distance(p2, q1, q2))
        .min(point_segment_distance(q1, p1, p2))
        .min(point_segment_distance(q2, p1, p2))
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Orthonormal basis whose first row is the normalized `normal`.
///
/// The remaining rows span the tangent space, built by Gram-Schmidt over
/// the standard basis.
pub fn orthonormal_frame(normal: &[f64]) -> DomainResult<Vec<Vec<f64>>> {
    const EPS: f64 = 1e-10;

    let length = norm(normal);
    if normal.is_empty() || !length.is_finite() || length < EPS {
        return Err(DomainError::DataConsistency(
            "boundary normal is empty or degenerate".to_string(),
        ));
    }

    let dim = normal.len();
    let mut frame: Vec<Vec<f64>> = vec![normal.iter().map(|x| x / length).collect()];
    for axis in 0..dim {
        if frame.len() == dim {
            break;
        }
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        for basis in &frame {
            let projection = dot(&v, basis);
            for (vi, bi) in v.iter_mut().zip(basis) {
                *vi -= projection * bi;
            }
        }
        let length = norm(&v);
        if length > EPS {
            frame.push(v.into_iter().map(|x| x / length).collect());
        }
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(x: f64, y: f64, heading_deg: f64) -> VehiclePose {
        VehiclePose {
            front: (x, y),
            heading_deg,
            length: 5.0,
            width: 1.8,
        }
    }

    #[test]
    fn test_footprint_extent_heading_east() {
        let outline = car(10.0, 0.0, 90.0).footprint();
        let max_x = outline.iter().map(|p| p.0).fold(f64::MIN, f64::max);
        let min_x = outline.iter().map(|p| p.0).fold(f64::MAX, f64::min);
        let max_y = outline.iter().map(|p| p.1).fold(f64::MIN, f64::max);
        assert!((max_x - 10.0).abs() < 1e-9);
        assert!((min_x - 5.0).abs() < 1e-9);
        assert!((max_y - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_bumper_to_bumper_distance() {
        // Both heading east in the same lane, 3 m gap between them.
        let leader = car(18.0, 0.0, 90.0);
        let follower = car(10.0, 0.0, 90.0);
        let distance = footprint_distance(&leader, &follower);
        assert!((distance - 3.0).abs() < 1e-6, "got {distance}");
    }

    #[test]
    fn test_side_by_side_distance() {
        let a = car(10.0, 0.0, 90.0);
        let b = car(10.0, 3.2, 90.0);
        let distance = footprint_distance(&a, &b);
        assert!((distance - 1.4).abs() < 1e-6, "got {distance}");
    }

    #[test]
    fn test_overlap_is_zero() {
        let a = car(10.0, 0.0, 90.0);
        let b = car(9.0, 2.0, 0.0);
        assert_eq!(footprint_distance(&a, &b), 0.0);

        // Containment without edge crossings.
        let outer = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let inner = [(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)];
        assert_eq!(polygon_distance(&outer, &inner), 0.0);
    }

    #[test]
    fn test_orthonormal_frame() {
        let frame = orthonormal_frame(&[3.0, 4.0, 0.0]).unwrap();
        assert_eq!(frame.len(), 3);
        assert!((frame[0][0] - 0.6).abs() < 1e-12);
        assert!((frame[0][1] - 0.8).abs() < 1e-12);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot(&frame[i], &frame[j]) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_normal_rejected() {
        assert!(orthonormal_frame(&[0.0, 0.0]).is_err());
        assert!(orthonormal_frame(&[]).is_err());
    }
}
