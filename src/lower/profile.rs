//! Profile → SDF: the convex polygon prism and the circle disc, plus the
//! smooth-min join used by rounded sweeps. See `spec.md` §4.6 "convex
//! polygon prism".

use euclid::default::Point2D;

use crate::ast::Expr;
use crate::ir::{ir_binary, ir_const, ir_mul, ir_unary, ir_var, ir_vec3, Ir, IrType, Op};

use super::{extract_number, extract_polygon, LoweringError};

/// A profile is either a convex polygon or a circle, both living in the
/// local (normal, binormal) plane of whatever combinator placed them.
pub(crate) enum Profile {
    Polygon(Vec<Point2D<f32>>),
    Circle(f32),
}

/// Extracts a `polygon(...)` or `circle(...)` call into a [`Profile`].
pub(crate) fn extract_profile(expr: &Expr) -> Result<Profile, LoweringError> {
    match expr {
        Expr::Call(name, _) if name == "polygon" => Ok(Profile::Polygon(extract_polygon(expr)?)),
        Expr::Call(name, args) if name == "circle" => {
            if args.len() != 1 {
                return Err(LoweringError::CircleArity);
            }
            Ok(Profile::Circle(extract_number(&args[0], "circle arg 0")?))
        }
        _ => Err(LoweringError::InvalidProfile),
    }
}

/// The 2D SDF of a CCW convex polygon at local coordinates `(px, py)`:
/// `max_i (n_i . (p - V_i))` over outward edge normals `n_i`.
pub(crate) fn ir_polygon_sdf(poly: &[Point2D<f32>], px: Ir, py: Ir) -> Result<Ir, LoweringError> {
    let mut max_d: Option<Ir> = None;
    let n = poly.len();
    for i in 0..n {
        let v1 = poly[i];
        let v2 = poly[(i + 1) % n];
        let (ex, ey) = (v2.x - v1.x, v2.y - v1.y);
        let (mut nx, mut ny) = (ey, -ex);
        let nlen = (nx * nx + ny * ny).sqrt();
        if nlen == 0.0 {
            continue;
        }
        nx /= nlen;
        ny /= nlen;

        let dx = ir_binary(Op::Sub, px.clone(), ir_const(v1.x), IrType::F32);
        let dy = ir_binary(Op::Sub, py.clone(), ir_const(v1.y), IrType::F32);
        let dot = ir_binary(
            Op::Add,
            ir_mul(ir_const(nx), dx),
            ir_mul(ir_const(ny), dy),
            IrType::F32,
        );
        max_d = Some(match max_d {
            None => dot,
            Some(cur) => ir_binary(Op::Max, cur, dot, IrType::F32),
        });
    }
    max_d.ok_or(LoweringError::DegeneratePolygon)
}

/// The extruded-prism SDF: `max(polygon_sdf, |axis| - h)`.
pub(crate) fn ir_prism_sdf(
    poly: &[Point2D<f32>],
    h: Ir,
    px: Ir,
    py: Ir,
    axis: Ir,
) -> Result<Ir, LoweringError> {
    let max_d = ir_polygon_sdf(poly, px, py)?;
    let d_axis = ir_binary(Op::Sub, ir_unary(Op::Abs, axis, IrType::F32), h, IrType::F32);
    Ok(ir_binary(Op::Max, max_d, d_axis, IrType::F32))
}

/// The 2D circle SDF at local coordinates `(px, py)`.
pub(crate) fn ir_circle_sdf(radius: f32, px: Ir, py: Ir) -> Ir {
    let radial = ir_unary(Op::Length, ir_vec3(px, py, ir_const(0.0)), IrType::F32);
    ir_binary(Op::Sub, radial, ir_const(radius), IrType::F32)
}

/// Either profile SDF, dispatched on kind.
pub(crate) fn profile_sdf(profile: &Profile, px: Ir, py: Ir) -> Result<Ir, LoweringError> {
    match profile {
        Profile::Polygon(poly) => ir_polygon_sdf(poly, px, py),
        Profile::Circle(r) => Ok(ir_circle_sdf(*r, px, py)),
    }
}

/// The quartic smooth minimum with blend radius `k`; degenerates to a hard
/// `min` at `k <= 0`.
pub(crate) fn ir_smin(a: Ir, b: Ir, k: f32) -> Ir {
    if k <= 0.0 {
        return ir_binary(Op::Min, a, b, IrType::F32);
    }
    let inv_k = 1.0 / k;
    let diff = ir_binary(Op::Sub, a.clone(), b.clone(), IrType::F32);
    let adiff = ir_unary(Op::Abs, diff, IrType::F32);
    let h_raw = ir_binary(Op::Sub, ir_const(k), adiff, IrType::F32);
    let h = ir_mul(ir_binary(Op::Max, h_raw, ir_const(0.0), IrType::F32), ir_const(inv_k));
    let h2 = ir_mul(h.clone(), h.clone());
    let h3 = ir_mul(h2, h);
    let smooth = ir_mul(ir_const(k * (1.0 / 6.0)), h3);
    ir_binary(Op::Sub, ir_binary(Op::Min, a, b, IrType::F32), smooth, IrType::F32)
}

/// `extrude(profile, h)`: builds the prism (polygon) or the Z-axis disc
/// extrusion (circle).
pub(crate) fn lower_extrude(profile_expr: &Expr, height_expr: &Expr) -> Result<Ir, LoweringError> {
    let h = super::lower(height_expr)?;
    let p = ir_var();
    let px = ir_unary(Op::VecX, p.clone(), IrType::F32);
    let py = ir_unary(Op::VecY, p.clone(), IrType::F32);
    let pz = ir_unary(Op::VecZ, p, IrType::F32);

    match extract_profile(profile_expr)? {
        Profile::Polygon(poly) => ir_prism_sdf(&poly, h, px, py, pz),
        Profile::Circle(r) => {
            let radial = ir_unary(Op::Length, ir_vec3(px, py, ir_const(0.0)), IrType::F32);
            let dx = ir_binary(Op::Sub, radial, ir_const(r), IrType::F32);
            let dz = ir_binary(Op::Sub, ir_unary(Op::Abs, pz, IrType::F32), h, IrType::F32);
            let inside = ir_binary(
                Op::Min,
                ir_binary(Op::Max, dx.clone(), dz.clone(), IrType::F32),
                ir_const(0.0),
                IrType::F32,
            );
            let max_dx = ir_binary(Op::Max, dx, ir_const(0.0), IrType::F32);
            let max_dz = ir_binary(Op::Max, dz, ir_const(0.0), IrType::F32);
            let out = ir_unary(Op::Length, ir_vec3(max_dx, max_dz, ir_const(0.0)), IrType::F32);
            Ok(ir_binary(Op::Add, inside, out, IrType::F32))
        }
    }
}

#[test]
fn extrude_polygon_combines_profile_with_axis_distance() {
    let expr = Expr::call(
        "extrude",
        vec![
            Expr::call(
                "polygon",
                vec![
                    Expr::vec2(Expr::Number(0.0), Expr::Number(0.0)),
                    Expr::vec2(Expr::Number(1.0), Expr::Number(0.0)),
                    Expr::vec2(Expr::Number(0.0), Expr::Number(1.0)),
                ],
            ),
            Expr::Number(1.0),
        ],
    );
    let ir = lower_extrude(&expr_args(&expr)[0], &expr_args(&expr)[1]).unwrap();
    assert_eq!(ir.op, Op::Max);
}

#[test]
fn extrude_circle_builds_rounded_disc() {
    let ir = lower_extrude(&Expr::call("circle", vec![Expr::Number(1.0)]), &Expr::Number(1.0)).unwrap();
    assert_eq!(ir.op, Op::Add);
}

#[test]
fn smin_degenerates_to_min_at_zero_radius() {
    let ir = ir_smin(ir_const(1.0), ir_const(2.0), 0.0);
    assert_eq!(ir.op, Op::Min);
}

#[cfg(test)]
fn expr_args(expr: &Expr) -> &[Expr] {
    match expr {
        Expr::Call(_, args) => args,
        _ => panic!("expected a call"),
    }
}
