//! AST → IR lowering: expands composite primitives (box, cylinder, prism,
//! sweep, blend, rotate, translate) into algebraic IR over `p`. See
//! `spec.md` §4.6.
//!
//! Arity and coarse argument typing are already guaranteed by
//! [`crate::types::type_of`] by the time lowering runs; what lowering adds
//! is the requirement that certain arguments — polygon vertices, path
//! points, primitive dimensions — be *constant* literals, since the DSL has
//! no notion of a runtime-computed shape descriptor.

pub mod blend;
pub mod profile;
pub mod sweep;

use euclid::default::Point2D;
use thiserror::Error;

use crate::ast::Expr;
use crate::ir::{ir_binary, ir_const, ir_mul, ir_unary, ir_var, ir_vec3, ir_vec_op, subst, Ir, IrType, Op};
use crate::polygon::{self, PolygonError};

pub(crate) type Vec3Lit = (f32, f32, f32);

/// A lowering error: a non-constant shape argument, a malformed profile or
/// path, or an unrecognized call (the last only reachable if lowering runs
/// without a prior typecheck).
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum LoweringError {
    #[error("{context} must be a numeric constant")]
    NotConstant { context: String },
    #[error("polygon vertices must be constant vec2 literals")]
    PolygonVertexNotConstant,
    #[error("path points must be constant vec3 literals")]
    PathPointNotConstant,
    #[error(transparent)]
    Polygon(#[from] PolygonError),
    #[error("{what} expects {expected}, got {got}")]
    Arity {
        what: String,
        expected: String,
        got: usize,
    },
    #[error("extrude expects polygon(...) or circle(...) as first arg")]
    InvalidProfile,
    #[error("path must be line(...), polyline(...), or helix(...)")]
    InvalidPath,
    #[error("circle expects 1 argument")]
    CircleArity,
    #[error("polygon has only degenerate (zero-length) edges")]
    DegeneratePolygon,
    #[error("{what} has zero length")]
    ZeroLength { what: String },
    #[error("{what} has no valid segments")]
    NoValidSegments { what: String },
    #[error("unknown function {name}")]
    UnknownFunction { name: String },
}

/// A binary op over two `vec3` operands producing an `f32`: `dot((a,b,c),
/// vec3(x,y,z))` where `a,b,c` are already `f32` IR nodes.
pub(crate) fn ir_dot3(a: Ir, b: Ir, c: Ir, x: Ir, y: Ir, z: Ir) -> Ir {
    let dx = ir_mul(a, x);
    let dy = ir_mul(b, y);
    let dz = ir_mul(c, z);
    ir_binary(Op::Add, ir_binary(Op::Add, dx, dy, IrType::F32), dz, IrType::F32)
}

/// `dot(vec, (cx,cy,cz))` for a constant direction vector.
pub(crate) fn ir_dot3_const(vec: Ir, cx: f32, cy: f32, cz: f32) -> Ir {
    let vx = ir_unary(Op::VecX, vec.clone(), IrType::F32);
    let vy = ir_unary(Op::VecY, vec.clone(), IrType::F32);
    let vz = ir_unary(Op::VecZ, vec, IrType::F32);
    ir_dot3(ir_const(cx), ir_const(cy), ir_const(cz), vx, vy, vz)
}

pub(crate) fn ir_clamp01(val: Ir) -> Ir {
    ir_binary(
        Op::Min,
        ir_binary(Op::Max, val, ir_const(0.0), IrType::F32),
        ir_const(1.0),
        IrType::F32,
    )
}

fn extract_number(expr: &Expr, context: &str) -> Result<f32, LoweringError> {
    match expr {
        Expr::Number(v) => Ok(*v),
        _ => Err(LoweringError::NotConstant {
            context: context.to_string(),
        }),
    }
}

fn extract_vec2_literal(expr: &Expr) -> Result<Point2D<f32>, LoweringError> {
    match expr {
        Expr::Vec2(x, y) => {
            let x = extract_number(x, "vec2 component")?;
            let y = extract_number(y, "vec2 component")?;
            Ok(Point2D::new(x, y))
        }
        _ => Err(LoweringError::PolygonVertexNotConstant),
    }
}

fn extract_vec3_literal(expr: &Expr) -> Result<Vec3Lit, LoweringError> {
    match expr {
        Expr::Vec3(x, y, z) => {
            let x = extract_number(x, "vec3 component")?;
            let y = extract_number(y, "vec3 component")?;
            let z = extract_number(z, "vec3 component")?;
            Ok((x, y, z))
        }
        _ => Err(LoweringError::PathPointNotConstant),
    }
}

/// Extracts, admits, and CCW-normalizes a `polygon(...)` call's vertices.
pub(crate) fn extract_polygon(expr: &Expr) -> Result<Vec<Point2D<f32>>, LoweringError> {
    match expr {
        Expr::Call(name, args) if name == "polygon" => {
            let poly: Result<Vec<_>, _> = args.iter().map(extract_vec2_literal).collect();
            Ok(polygon::admit_polygon(poly?)?)
        }
        _ => Err(LoweringError::InvalidProfile),
    }
}

/// Extracts a `line(...)`/`polyline(...)`/`helix(...)` call into its
/// constituent 3D points.
pub(crate) fn extract_path(expr: &Expr) -> Result<Vec<Vec3Lit>, LoweringError> {
    match expr {
        Expr::Call(name, args) if name == "line" => {
            if args.len() != 2 {
                return Err(LoweringError::Arity {
                    what: "line".to_string(),
                    expected: "2".to_string(),
                    got: args.len(),
                });
            }
            Ok(vec![
                extract_vec3_literal(&args[0])?,
                extract_vec3_literal(&args[1])?,
            ])
        }
        Expr::Call(name, args) if name == "polyline" => {
            if args.len() < 2 {
                return Err(LoweringError::Arity {
                    what: "polyline".to_string(),
                    expected: "at least 2".to_string(),
                    got: args.len(),
                });
            }
            args.iter().map(extract_vec3_literal).collect()
        }
        Expr::Call(name, _) if name == "helix" => extract_helix_polyline(expr),
        _ => Err(LoweringError::InvalidPath),
    }
}

/// `(radius, pitch, turns)` from a `helix(...)` call.
pub(crate) fn extract_helix_params(expr: &Expr) -> Result<(f32, f32, f32), LoweringError> {
    match expr {
        Expr::Call(name, args) if name == "helix" => {
            if args.len() != 3 {
                return Err(LoweringError::Arity {
                    what: "helix".to_string(),
                    expected: "3".to_string(),
                    got: args.len(),
                });
            }
            let radius = extract_number(&args[0], "helix arg 0")?;
            let pitch = extract_number(&args[1], "helix arg 1")?;
            let turns = extract_number(&args[2], "helix arg 2")?;
            Ok((radius, pitch, turns))
        }
        _ => Err(LoweringError::InvalidPath),
    }
}

/// Samples a `helix(...)` call to `max(1, ceil(24*turns)) + 1` points, for
/// use in the generic (non-analytic) path branch.
fn extract_helix_polyline(expr: &Expr) -> Result<Vec<Vec3Lit>, LoweringError> {
    let (radius, pitch, turns) = extract_helix_params(expr)?;
    let segments_per_turn = 24.0f32;
    let steps = (1.0f32).max((segments_per_turn * turns.max(0.0)).ceil()) as i64;
    let total_angle = std::f32::consts::TAU * turns;
    let angle_step = if steps > 0 {
        total_angle / steps as f32
    } else {
        0.0
    };
    let mut points = Vec::with_capacity(steps as usize + 1);
    for i in 0..=steps {
        let angle = angle_step * i as f32;
        let y = pitch * angle / std::f32::consts::TAU;
        let x = radius * angle.cos();
        let z = radius * angle.sin();
        points.push((x, y, z));
    }
    Ok(points)
}

/// The 6 vertices of a regular hexagon of circumradius `radius`, vertex 0
/// on the +X axis.
pub(crate) fn hexagon_vertices(radius: f32) -> Vec<Point2D<f32>> {
    let c = 0.866_025_4_f32;
    vec![
        Point2D::new(radius, 0.0),
        Point2D::new(radius * 0.5, radius * c),
        Point2D::new(-radius * 0.5, radius * c),
        Point2D::new(-radius, 0.0),
        Point2D::new(-radius * 0.5, -radius * c),
        Point2D::new(radius * 0.5, -radius * c),
    ]
}

/// Lowers a fully-typechecked AST into IR.
pub fn lower(expr: &Expr) -> Result<Ir, LoweringError> {
    match expr {
        Expr::Number(v) => Ok(ir_const(*v)),
        Expr::Vec3(x, y, z) => Ok(ir_vec3(lower(x)?, lower(y)?, lower(z)?)),
        Expr::Vec2(_, _) => Err(LoweringError::NotConstant {
            context: "vec2 outside of a polygon vertex list".to_string(),
        }),
        Expr::Call(name, args) => lower_call(name, args),
    }
}

fn lower_call(name: &str, args: &[Expr]) -> Result<Ir, LoweringError> {
    match name {
        "sphere" => {
            let r = lower(&args[0])?;
            let p = ir_var();
            Ok(ir_binary(Op::Sub, ir_unary(Op::Length, p, IrType::F32), r, IrType::F32))
        }
        "circle" => Err(LoweringError::InvalidProfile),
        "cylinder" => lower_cylinder(args),
        "box" => lower_box(args),
        "union" => {
            let mut cur = lower(&args[0])?;
            for arg in &args[1..] {
                cur = ir_binary(Op::Min, cur, lower(arg)?, IrType::F32);
            }
            Ok(cur)
        }
        "difference" => {
            let a = lower(&args[0])?;
            let b = lower(&args[1])?;
            Ok(ir_binary(Op::Max, a, ir_unary(Op::Neg, b, IrType::F32), IrType::F32))
        }
        "polygon" => Err(LoweringError::InvalidProfile),
        "line" | "polyline" => Err(LoweringError::InvalidPath),
        "extrude" => profile::lower_extrude(&args[0], &args[1]),
        "hex_nut" => lower_hex_nut(args),
        "blend2D" => blend::lower_blend2d(&args[0], &args[1], &args[2]),
        "sweep" => sweep::lower_sweep(&args[0], &args[1]),
        "rotate" => lower_rotate(args),
        "translate" => lower_translate(args),
        "offset" => {
            let g = lower(&args[0])?;
            let d = lower(&args[1])?;
            Ok(ir_binary(Op::Sub, g, d, IrType::F32))
        }
        "vec3" => Ok(ir_vec3(lower(&args[0])?, lower(&args[1])?, lower(&args[2])?)),
        _ => Err(LoweringError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn lower_cylinder(args: &[Expr]) -> Result<Ir, LoweringError> {
    let r = lower(&args[0])?;
    let h = lower(&args[1])?;
    let p = ir_var();
    let p_abs = ir_unary(Op::VecAbs, p.clone(), IrType::Vec3);
    let y = ir_unary(Op::VecY, p_abs, IrType::F32);
    let neg_y = ir_unary(Op::Neg, y.clone(), IrType::F32);
    let abs_y = ir_binary(Op::Max, y, neg_y, IrType::F32);
    let dy = ir_binary(Op::Sub, abs_y, h, IrType::F32);

    let x = ir_unary(Op::VecX, p.clone(), IrType::F32);
    let z = ir_unary(Op::VecZ, p, IrType::F32);
    let radial_vec = ir_vec3(x, ir_const(0.0), z);
    let radial = ir_unary(Op::Length, radial_vec, IrType::F32);
    let dx = ir_binary(Op::Sub, radial, r, IrType::F32);

    let inside = ir_binary(
        Op::Min,
        ir_binary(Op::Max, dx.clone(), dy.clone(), IrType::F32),
        ir_const(0.0),
        IrType::F32,
    );
    let max_dx = ir_binary(Op::Max, dx, ir_const(0.0), IrType::F32);
    let max_dy = ir_binary(Op::Max, dy, ir_const(0.0), IrType::F32);
    let out = ir_unary(Op::Length, ir_vec3(max_dx, max_dy, ir_const(0.0)), IrType::F32);
    Ok(ir_binary(Op::Add, inside, out, IrType::F32))
}

fn lower_box(args: &[Expr]) -> Result<Ir, LoweringError> {
    let size = lower(&args[0])?;
    let p = ir_var();
    let q = ir_vec_op(Op::VecSub, ir_unary(Op::VecAbs, p, IrType::Vec3), size);
    let qmax = ir_vec_op(Op::VecMax, q.clone(), ir_vec3(ir_const(0.0), ir_const(0.0), ir_const(0.0)));
    let d1 = ir_unary(Op::Length, qmax, IrType::F32);
    let qx = ir_unary(Op::VecX, q.clone(), IrType::F32);
    let qy = ir_unary(Op::VecY, q.clone(), IrType::F32);
    let qz = ir_unary(Op::VecZ, q, IrType::F32);
    let max1 = ir_binary(Op::Max, qx, qy, IrType::F32);
    let max2 = ir_binary(Op::Max, max1, qz, IrType::F32);
    let d2 = ir_binary(Op::Min, max2, ir_const(0.0), IrType::F32);
    Ok(ir_binary(Op::Add, d1, d2, IrType::F32))
}

fn lower_hex_nut(args: &[Expr]) -> Result<Ir, LoweringError> {
    if args.len() != 3 {
        return Err(LoweringError::Arity {
            what: "hex_nut".to_string(),
            expected: "3".to_string(),
            got: args.len(),
        });
    }
    let outer_r = extract_number(&args[0], "hex_nut arg 0")?;
    let inner_r = extract_number(&args[1], "hex_nut arg 1")?;
    let half_h = extract_number(&args[2], "hex_nut arg 2")?;

    let poly = hexagon_vertices(outer_r);
    let poly_args: Vec<Expr> = poly
        .iter()
        .map(|v| Expr::vec2(Expr::Number(v.x), Expr::Number(v.y)))
        .collect();
    let prism = Expr::call(
        "rotate",
        vec![
            Expr::call(
                "extrude",
                vec![Expr::call("polygon", poly_args), Expr::Number(half_h)],
            ),
            Expr::vec3(Expr::Number(90.0), Expr::Number(0.0), Expr::Number(0.0)),
        ],
    );
    let hole = Expr::call(
        "cylinder",
        vec![Expr::Number(inner_r), Expr::Number(half_h + 0.01)],
    );
    lower(&Expr::call("difference", vec![prism, hole]))
}

fn lower_rotate(args: &[Expr]) -> Result<Ir, LoweringError> {
    let g = lower(&args[0])?;
    let angles = lower(&args[1])?;
    let p = ir_var();

    let deg_to_rad = std::f32::consts::PI / 180.0;
    let ax = ir_mul(
        ir_unary(Op::Neg, ir_unary(Op::VecX, angles.clone(), IrType::F32), IrType::F32),
        ir_const(deg_to_rad),
    );
    let ay = ir_mul(
        ir_unary(Op::Neg, ir_unary(Op::VecY, angles.clone(), IrType::F32), IrType::F32),
        ir_const(deg_to_rad),
    );
    let az = ir_mul(
        ir_unary(Op::Neg, ir_unary(Op::VecZ, angles, IrType::F32), IrType::F32),
        ir_const(deg_to_rad),
    );

    let cx = ir_unary(Op::Cos, ax.clone(), IrType::F32);
    let sx = ir_unary(Op::Sin, ax, IrType::F32);
    let cy = ir_unary(Op::Cos, ay.clone(), IrType::F32);
    let sy = ir_unary(Op::Sin, ay, IrType::F32);
    let cz = ir_unary(Op::Cos, az.clone(), IrType::F32);
    let sz = ir_unary(Op::Sin, az, IrType::F32);

    let x0 = ir_unary(Op::VecX, p.clone(), IrType::F32);
    let y0 = ir_unary(Op::VecY, p.clone(), IrType::F32);
    let z0 = ir_unary(Op::VecZ, p, IrType::F32);

    let y1 = ir_binary(Op::Sub, ir_mul(y0.clone(), cx.clone()), ir_mul(z0.clone(), sx.clone()), IrType::F32);
    let z1 = ir_binary(Op::Add, ir_mul(y0, sx), ir_mul(z0, cx), IrType::F32);
    let x1 = x0;

    let x2 = ir_binary(Op::Add, ir_mul(x1.clone(), cy.clone()), ir_mul(z1.clone(), sy.clone()), IrType::F32);
    let z2 = ir_binary(
        Op::Add,
        ir_mul(ir_unary(Op::Neg, x1, IrType::F32), sy),
        ir_mul(z1, cy),
        IrType::F32,
    );
    let y2 = y1;

    let x3 = ir_binary(Op::Sub, ir_mul(x2.clone(), cz.clone()), ir_mul(y2.clone(), sz.clone()), IrType::F32);
    let y3 = ir_binary(Op::Add, ir_mul(x2, sz), ir_mul(y2, cz), IrType::F32);
    let z3 = z2;

    let rotated = ir_vec3(x3, y3, z3);
    Ok(subst(&g, &rotated))
}

fn lower_translate(args: &[Expr]) -> Result<Ir, LoweringError> {
    let g = lower(&args[0])?;
    let v = lower(&args[1])?;
    let p = ir_var();
    let shifted = ir_vec_op(Op::VecSub, p, v);
    Ok(subst(&g, &shifted))
}

#[test]
fn sphere_lowers_to_length_minus_radius() {
    let expr = Expr::call("sphere", vec![Expr::Number(2.0)]);
    let ir = lower(&expr).unwrap();
    assert_eq!(ir.op, Op::Sub);
    assert_eq!(ir.args[0].op, Op::Length);
    assert_eq!(ir.args[1].value, Some(2.0));
}

#[test]
fn union_folds_left_with_min() {
    let expr = Expr::call(
        "union",
        vec![
            Expr::call("sphere", vec![Expr::Number(1.0)]),
            Expr::call("sphere", vec![Expr::Number(2.0)]),
            Expr::call("sphere", vec![Expr::Number(3.0)]),
        ],
    );
    let ir = lower(&expr).unwrap();
    assert_eq!(ir.op, Op::Min);
    assert_eq!(ir.args[0].op, Op::Min);
}

#[test]
fn difference_is_max_with_negated_rhs() {
    let expr = Expr::call(
        "difference",
        vec![
            Expr::call("sphere", vec![Expr::Number(2.0)]),
            Expr::call("sphere", vec![Expr::Number(1.0)]),
        ],
    );
    let ir = lower(&expr).unwrap();
    assert_eq!(ir.op, Op::Max);
    assert_eq!(ir.args[1].op, Op::Neg);
}

#[test]
fn translate_substitutes_p_with_shifted_point() {
    let expr = Expr::call(
        "translate",
        vec![
            Expr::call("sphere", vec![Expr::Number(1.0)]),
            Expr::vec3(Expr::Number(1.0), Expr::Number(0.0), Expr::Number(0.0)),
        ],
    );
    let ir = lower(&expr).unwrap();
    // sub(length(vec_sub(p, v)), 1) — the length arg is no longer bare `p`.
    assert_eq!(ir.args[0].args[0].op, Op::VecSub);
}

#[test]
fn bare_circle_cannot_be_lowered_directly() {
    let expr = Expr::call("circle", vec![Expr::Number(1.0)]);
    assert_eq!(lower(&expr).unwrap_err(), LoweringError::InvalidProfile);
}

#[test]
fn hex_nut_lowers_without_error() {
    let expr = Expr::call(
        "hex_nut",
        vec![Expr::Number(5.0), Expr::Number(3.0), Expr::Number(2.0)],
    );
    assert!(lower(&expr).is_ok());
}

#[test]
fn non_literal_polygon_vertex_is_rejected() {
    // A vertex built from a call rather than a numeric literal cannot be
    // admitted as a polygon vertex.
    let bad_vertex = Expr::vec2(Expr::call("sphere", vec![Expr::Number(1.0)]), Expr::Number(0.0));
    let err = extract_vec2_literal(&bad_vertex).unwrap_err();
    assert_eq!(err, LoweringError::NotConstant { context: "vec2 component".to_string() });
}
