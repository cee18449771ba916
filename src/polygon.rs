//! Polygon admission: simplicity, convexity, counter-clockwise orientation.
//!
//! Used during lowering to validate the `poly2d` argument of `polygon(...)`
//! before it is turned into a prism SDF. See `spec.md` §4.3.

use euclid::default::Point2D;
use thiserror::Error;

/// A polygon failed admission: it self-intersects or is non-convex.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum PolygonError {
    #[error("polygon is self-intersecting")]
    SelfIntersecting,
    #[error("polygon must be convex")]
    NotConvex,
}

fn orient(p: Point2D<f32>, q: Point2D<f32>, r: Point2D<f32>) -> f32 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

fn on_segment(p: Point2D<f32>, q: Point2D<f32>, r: Point2D<f32>) -> bool {
    q.x >= p.x.min(r.x) && q.x <= p.x.max(r.x) && q.y >= p.y.min(r.y) && q.y <= p.y.max(r.y)
}

/// True if segment `ab` and segment `cd` intersect, including the collinear
/// touching case.
fn seg_intersect(a: Point2D<f32>, b: Point2D<f32>, c: Point2D<f32>, d: Point2D<f32>) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if o1 == 0.0 && on_segment(a, c, b) {
        return true;
    }
    if o2 == 0.0 && on_segment(a, d, b) {
        return true;
    }
    if o3 == 0.0 && on_segment(c, a, d) {
        return true;
    }
    if o4 == 0.0 && on_segment(c, b, d) {
        return true;
    }

    (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0)
}

/// Rejects a self-intersecting polygon. Only non-adjacent edges are
/// checked; `i==0, j==n-1` is adjacent (the closing edge).
fn check_simple(poly: &[Point2D<f32>]) -> Result<(), PolygonError> {
    let n = poly.len();
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        for j in (i + 1)..n {
            let adjacent = j - i <= 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            let c = poly[j];
            let d = poly[(j + 1) % n];
            if seg_intersect(a, b, c, d) {
                return Err(PolygonError::SelfIntersecting);
            }
        }
    }
    Ok(())
}

/// True if all consecutive-edge cross products (zeros ignored) agree in
/// sign.
pub fn is_convex(poly: &[Point2D<f32>]) -> bool {
    let n = poly.len();
    let mut sign = 0i32;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            continue;
        }
        let cur = if cross > 0.0 { 1 } else { -1 };
        if sign == 0 {
            sign = cur;
        } else if sign != cur {
            return false;
        }
    }
    true
}

/// Reverses the vertex order if the signed area is negative, so the
/// returned polygon is counter-clockwise.
pub fn ensure_ccw(poly: Vec<Point2D<f32>>) -> Vec<Point2D<f32>> {
    let n = poly.len();
    let mut area = 0.0f32;
    for i in 0..n {
        let (x1, y1) = (poly[i].x, poly[i].y);
        let (x2, y2) = (poly[(i + 1) % n].x, poly[(i + 1) % n].y);
        area += x1 * y2 - x2 * y1;
    }
    if area < 0.0 {
        poly.into_iter().rev().collect()
    } else {
        poly
    }
}

/// Admits a polygon for use as an `extrude`/`blend2D`/`sweep` profile:
/// checks simplicity and convexity, then normalizes to CCW. `poly` must
/// already have at least 3 vertices (enforced by the typechecker's
/// `polygon(...)` arity).
pub fn admit_polygon(poly: Vec<Point2D<f32>>) -> Result<Vec<Point2D<f32>>, PolygonError> {
    check_simple(&poly)?;
    if !is_convex(&poly) {
        return Err(PolygonError::NotConvex);
    }
    Ok(ensure_ccw(poly))
}

#[cfg(test)]
fn pt(x: f32, y: f32) -> Point2D<f32> {
    Point2D::new(x, y)
}

#[test]
fn unit_square_is_simple_convex_and_already_ccw() {
    let square = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
    let admitted = admit_polygon(square.clone()).unwrap();
    assert_eq!(admitted, square);
}

#[test]
fn clockwise_square_is_reversed_to_ccw() {
    let cw = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)];
    let admitted = admit_polygon(cw).unwrap();
    let ccw = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
    assert_eq!(admitted, ccw);
}

#[test]
fn bowtie_is_rejected_as_self_intersecting() {
    let bowtie = vec![pt(0.0, 0.0), pt(1.0, 1.0), pt(1.0, 0.0), pt(0.0, 1.0)];
    assert_eq!(
        admit_polygon(bowtie).unwrap_err(),
        PolygonError::SelfIntersecting
    );
}

#[test]
fn non_convex_dart_is_rejected() {
    let dart = vec![pt(0.0, 0.0), pt(2.0, 0.0), pt(1.0, 1.0), pt(2.0, 2.0), pt(0.0, 2.0)];
    assert_eq!(admit_polygon(dart).unwrap_err(), PolygonError::NotConvex);
}

#[test]
fn hexagon_is_convex() {
    let hex: Vec<Point2D<f32>> = (0..6)
        .map(|k| {
            let theta = (k as f32) * std::f32::consts::PI / 3.0;
            pt(theta.cos(), theta.sin())
        })
        .collect();
    assert!(is_convex(&hex));
    assert!(admit_polygon(hex).is_ok());
}
