//! `geometry_dsl` compiles a small functional DSL describing 3D solids as
//! signed distance functions. A program is a single expression built from
//! numeric literals, `vec2`/`vec3` constructors, and named calls
//! (`sphere`, `union`, `sweep`, …); it compiles to a typed intermediate
//! representation which can either be evaluated directly at a point or
//! emitted as GLSL shader source.
//!
//! Pipeline: [`lexer`] → [`parser`] → [`types`] → [`lower`] → [`eval`] /
//! [`glsl`]. Each stage is independently callable; [`compile_to_glsl`] and
//! [`eval_at`] are the two convenience entry points that run the whole
//! pipeline and collapse the per-stage errors into [`CompileError`].

pub mod ast;
pub mod eval;
pub mod glsl;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod polygon;
pub mod token;
pub mod types;
pub mod vec3;

use thiserror::Error;

pub use ast::Expr;
pub use eval::{eval_ir, IrEvalError};
pub use glsl::{emit_glsl, GlslEmitError};
pub use lexer::LexError;
pub use lower::{lower, LoweringError};
pub use parser::{parse, ParseError};
pub use types::{type_of, Type, TypeError};
pub use vec3::Vec3;

/// The union of every stage error, for callers that just want "compile or
/// tell me why not" without matching on five separate error enums.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    #[error(transparent)]
    Eval(#[from] IrEvalError),
    #[error(transparent)]
    Glsl(#[from] GlslEmitError),
}

/// Parses, typechecks, lowers, and emits `src` as a GLSL `sdf` function.
pub fn compile_to_glsl(src: &str) -> Result<String, CompileError> {
    let expr = parse(src)?;
    type_of(&expr)?;
    let ir = lower(&expr)?;
    Ok(emit_glsl(&ir)?)
}

/// Parses, typechecks, lowers, and evaluates `src` at `point`.
pub fn eval_at(src: &str, point: (f32, f32, f32)) -> Result<f32, CompileError> {
    let expr = parse(src)?;
    type_of(&expr)?;
    let ir = lower(&expr)?;
    let (x, y, z) = point;
    Ok(eval_ir(&ir, Vec3::new(x, y, z))?)
}

#[cfg(test)]
fn at(src: &str, point: (f32, f32, f32)) -> f32 {
    eval_at(src, point).unwrap()
}

#[test]
fn sphere_at_center_and_outside() {
    assert_eq!(at("sphere(1)", (0.0, 0.0, 0.0)), -1.0);
    assert_eq!(at("sphere(1)", (2.0, 0.0, 0.0)), 1.0);
}

#[test]
fn difference_of_two_spheres_at_center() {
    assert_eq!(at("difference(sphere(1), sphere(0.5))", (0.0, 0.0, 0.0)), 0.5);
}

#[test]
fn translated_sphere_shifts_its_zero_set() {
    assert_eq!(at("translate(sphere(1), vec3(1,0,0))", (1.0, 0.0, 0.0)), -1.0);
}

#[test]
fn union_of_three_spheres_typechecks_and_evaluates() {
    let expr = parse("union(sphere(1), sphere(2), sphere(3))").unwrap();
    assert_eq!(type_of(&expr).unwrap(), Type::Field);
    assert_eq!(at("union(sphere(1), sphere(2), sphere(3))", (0.0, 0.0, 0.0)), -3.0);
}

#[test]
fn cylinder_at_three_points() {
    assert_eq!(at("cylinder(1, 0.5)", (0.0, 0.0, 0.0)), -0.5);
    assert_eq!(at("cylinder(1, 0.5)", (0.0, 1.0, 0.0)), 0.5);
    assert_eq!(at("cylinder(1, 0.5)", (1.0, 0.0, 0.0)), 0.0);
}

#[test]
fn glsl_of_compound_scene_contains_expected_calls() {
    let glsl = compile_to_glsl("union(sphere(1), cylinder(0.5,1), box(vec3(1,1,1)))").unwrap();
    assert!(glsl.contains("min("));
    assert!(glsl.contains("length("));
    assert_eq!(glsl.matches("sdf(vec3 p)").count(), 1);
    assert_eq!(glsl.matches("return").count(), 1);
}

#[test]
fn translate_law_matches_shifted_evaluation() {
    let g = "sphere(1)";
    let translated = "translate(sphere(1), vec3(1,2,3))";
    let p = (4.0, 5.0, 6.0);
    let shifted = (4.0 - 1.0, 5.0 - 2.0, 6.0 - 3.0);
    assert_eq!(at(translated, p), at(g, shifted));
}

#[test]
fn difference_of_a_shape_with_itself_is_nonnegative() {
    for p in [(0.0, 0.0, 0.0), (0.5, 0.0, 0.0), (2.0, 0.0, 0.0)] {
        assert!(at("difference(sphere(1), sphere(1))", p) >= 0.0);
    }
}

#[test]
fn union_of_a_shape_with_itself_is_the_shape() {
    for p in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (3.0, 0.0, 0.0)] {
        assert_eq!(at("union(sphere(1), sphere(1))", p), at("sphere(1)", p));
    }
}

#[test]
fn rotate_by_zero_is_identity() {
    for p in [(0.3, 0.1, -0.4), (1.0, 1.0, 1.0)] {
        assert_eq!(at("rotate(sphere(1), vec3(0,0,0))", p), at("sphere(1)", p));
    }
}

#[test]
fn self_intersecting_polygon_is_a_compile_error() {
    let err = compile_to_glsl(
        "extrude(polygon(vec2(0,0), vec2(1,1), vec2(1,0), vec2(0,1)), 1)",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Lowering(LoweringError::Polygon(polygon::PolygonError::SelfIntersecting))
    ));
}

#[test]
fn non_convex_polygon_is_a_compile_error() {
    let dart = "polygon(vec2(0,0), vec2(2,0), vec2(1,1), vec2(2,2), vec2(0,2))";
    let err = compile_to_glsl(&format!("extrude({dart}, 1)")).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Lowering(LoweringError::Polygon(polygon::PolygonError::NotConvex))
    ));
}

#[test]
fn clockwise_square_extrudes_identically_to_ccw_square() {
    let ccw = "extrude(polygon(vec2(0,0), vec2(1,0), vec2(1,1), vec2(0,1)), 1)";
    let cw = "extrude(polygon(vec2(0,0), vec2(0,1), vec2(1,1), vec2(1,0)), 1)";
    for p in [(0.2, 0.3, 0.0), (0.9, 0.9, 0.5), (-1.0, -1.0, 2.0)] {
        assert_eq!(at(ccw, p), at(cw, p));
    }
}

#[test]
fn eval_ir_at_origin_is_finite_for_every_primitive() {
    for src in [
        "sphere(1)",
        "cylinder(1, 1)",
        "box(vec3(1,1,1))",
        "hex_nut(2, 1, 1)",
    ] {
        assert!(at(src, (0.0, 0.0, 0.0)).is_finite());
    }
}

// Ported from `test_blend2d.py`: circle-to-polygon morph along a line.
#[test]
fn blend2d_circle_to_square_along_vertical_line() {
    let src = "blend2D(circle(1), polygon(vec2(-1,-1), vec2(1,-1), vec2(1,1), vec2(-1,1)), \
               line(vec3(0,0,0), vec3(0,10,0)))";
    // On the path centerline the closest-point projection is exact (q=0),
    // so the tangential cap term `abs(qt)` is exactly 0 and clips the
    // (negative, inside-profile) blended distance up to 0.
    let at_start = at(src, (0.0, 0.0, 0.0));
    let at_end = at(src, (0.0, 10.0, 0.0));
    assert!(at_start.abs() < 1e-3);
    assert!(at_end.abs() < 1e-3);
}

// Ported from `test_blend2d.py`: a polyline path with a corner.
#[test]
fn blend2d_over_polyline_with_a_corner_is_finite_everywhere() {
    let src = "blend2D(circle(0.5), circle(0.8), polyline(vec3(0,0,0), vec3(0,2,0), vec3(2,2,0)))";
    for p in [(0.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 2.0, 0.0), (2.0, 2.0, 0.0)] {
        assert!(at(src, p).is_finite());
    }
}

// Ported from `test_blend2d.py`: polygon-to-polygon morph.
#[test]
fn blend2d_polygon_to_polygon() {
    let src = "blend2D(\
        polygon(vec2(-1,-1), vec2(1,-1), vec2(1,1), vec2(-1,1)), \
        polygon(vec2(-2,-2), vec2(2,-2), vec2(2,2), vec2(-2,2)), \
        line(vec3(0,0,0), vec3(0,5,0)))";
    assert!(at(src, (0.0, 2.5, 0.0)).is_finite());
}

// Ported from `test_blend2d.py`: circle-to-circle morph (radius interpolation).
#[test]
fn blend2d_circle_to_circle_interpolates_radius() {
    let src = "blend2D(circle(1), circle(2), line(vec3(0,0,0), vec3(0,10,0)))";
    let mid = at(src, (1.5, 5.0, 0.0));
    assert!(mid.is_finite());
}

// Ported from `test_blend2d.py`: blend2D composed with translate/rotate.
#[test]
fn blend2d_combined_with_translate_and_rotate() {
    let src = "translate(rotate(blend2D(circle(1), circle(2), line(vec3(0,0,0), vec3(0,4,0))), \
               vec3(0,0,90)), vec3(1,1,1))";
    assert!(at(src, (1.0, 1.0, 1.0)).is_finite());
}

// Ported from `test_blend2d.py`: blend2D as one arm of a union.
#[test]
fn blend2d_inside_a_union() {
    let src = "union(sphere(1), blend2D(circle(1), circle(2), line(vec3(3,0,0), vec3(3,5,0))))";
    assert_eq!(at(src, (0.0, 0.0, 0.0)), -1.0);
}

// Ported from `test_blend2d.py`: a horizontal (X-axis) path. Every sampled
// point lies exactly on the centerline, so `qt` is exactly 0 and caps the
// (otherwise negative, since both profiles are identical radius-1 circles)
// blended distance up to 0 — see `blend2d_circle_to_square_along_vertical_line`.
#[test]
fn blend2d_along_a_horizontal_path() {
    let src = "blend2D(circle(1), circle(1), line(vec3(0,0,0), vec3(10,0,0)))";
    for x in [0.0, 2.5, 5.0, 10.0] {
        assert!(at(src, (x, 0.0, 0.0)).abs() < 1e-3);
    }
}
