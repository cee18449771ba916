//! `blend2D(profile1, profile2, path)`: linearly interpolates between two
//! profile SDFs by the path's global arc-length parameter. See `spec.md`
//! §4.6 "blend2D".
//!
//! This is explicitly *not* a true signed distance field — `spec.md` §9
//! accepts the approximation, and so does this lowering, which builds
//! `(1-t)*sdf1 + t*sdf2` rather than anything metric-preserving.

use crate::ast::Expr;
use crate::ir::{ir_binary, ir_const, ir_mul, ir_unary, ir_var, ir_vec3, ir_vec_op, Ir, IrType, Op};

use super::profile::{extract_profile, profile_sdf};
use super::{extract_path, ir_clamp01, ir_dot3_const, LoweringError, Vec3Lit};

fn ir_blend_sdf(sdf1: Ir, sdf2: Ir, t: Ir) -> Ir {
    let one_minus_t = ir_binary(Op::Sub, ir_const(1.0), t.clone(), IrType::F32);
    let term1 = ir_mul(one_minus_t, sdf1);
    let term2 = ir_mul(t, sdf2);
    ir_binary(Op::Add, term1, term2, IrType::F32)
}

pub(crate) fn lower_blend2d(
    profile1_expr: &Expr,
    profile2_expr: &Expr,
    path_expr: &Expr,
) -> Result<Ir, LoweringError> {
    let profile1 = extract_profile(profile1_expr)?;
    let profile2 = extract_profile(profile2_expr)?;
    let path: Vec<Vec3Lit> = extract_path(path_expr)?;
    if path.len() < 2 {
        return Err(LoweringError::Arity {
            what: "blend2D path".to_string(),
            expected: "at least 2 points".to_string(),
            got: path.len(),
        });
    }

    struct Segment {
        ax: f32,
        ay: f32,
        az: f32,
        abx: f32,
        aby: f32,
        abz: f32,
        seg_len: f32,
        cum_len: f32,
    }

    let mut segments = Vec::new();
    let mut total_length = 0.0f32;
    for w in path.windows(2) {
        let (ax, ay, az) = w[0];
        let (bx, by, bz) = w[1];
        let (abx, aby, abz) = (bx - ax, by - ay, bz - az);
        let seg_len = (abx * abx + aby * aby + abz * abz).sqrt();
        if seg_len == 0.0 {
            continue;
        }
        segments.push(Segment {
            ax,
            ay,
            az,
            abx,
            aby,
            abz,
            seg_len,
            cum_len: total_length,
        });
        total_length += seg_len;
    }
    if segments.is_empty() {
        return Err(LoweringError::NoValidSegments {
            what: "blend2D path".to_string(),
        });
    }
    if total_length == 0.0 {
        return Err(LoweringError::ZeroLength {
            what: "blend2D path".to_string(),
        });
    }
    let inv_total_length = 1.0 / total_length;

    let p = ir_var();
    let mut cur: Option<Ir> = None;

    for seg in &segments {
        let (tx, ty, tz) = (seg.abx / seg.seg_len, seg.aby / seg.seg_len, seg.abz / seg.seg_len);

        let (mut upx, mut upy, mut upz) = (0.0, 1.0, 0.0);
        if (tx * upx + ty * upy + tz * upz).abs() > 0.999 {
            upx = 1.0;
            upy = 0.0;
            upz = 0.0;
        }
        let mut nx = upy * tz - upz * ty;
        let mut ny = upz * tx - upx * tz;
        let mut nz = upx * ty - upy * tx;
        let nlen = (nx * nx + ny * ny + nz * nz).sqrt();
        if nlen == 0.0 {
            continue;
        }
        nx /= nlen;
        ny /= nlen;
        nz /= nlen;

        let bx = ty * nz - tz * ny;
        let by = tz * nx - tx * nz;
        let bz = tx * ny - ty * nx;

        let a_vec = ir_vec3(ir_const(seg.ax), ir_const(seg.ay), ir_const(seg.az));
        let pa = ir_vec_op(Op::VecSub, p.clone(), a_vec.clone());
        let dot_pa_ab = ir_dot3_const(pa, seg.abx, seg.aby, seg.abz);
        let seg_len_sq = seg.seg_len * seg.seg_len;
        let t_seg = ir_mul(dot_pa_ab, ir_const(1.0 / seg_len_sq));
        let t_seg_clamped = ir_clamp01(t_seg);

        let ab_scaled = ir_vec3(
            ir_mul(ir_const(seg.abx), t_seg_clamped.clone()),
            ir_mul(ir_const(seg.aby), t_seg_clamped.clone()),
            ir_mul(ir_const(seg.abz), t_seg_clamped.clone()),
        );
        let c = ir_vec_op(Op::VecAdd, a_vec, ab_scaled);
        let q = ir_vec_op(Op::VecSub, p.clone(), c);

        let px = ir_dot3_const(q.clone(), nx, ny, nz);
        let py = ir_dot3_const(q.clone(), bx, by, bz);
        let qt = ir_dot3_const(q, tx, ty, tz);

        let t_offset = ir_mul(t_seg_clamped, ir_const(seg.seg_len));
        let t_global = ir_mul(
            ir_binary(Op::Add, ir_const(seg.cum_len), t_offset, IrType::F32),
            ir_const(inv_total_length),
        );

        let sdf1 = profile_sdf(&profile1, px.clone(), py.clone())?;
        let sdf2 = profile_sdf(&profile2, px, py)?;
        let profile_blend = ir_blend_sdf(sdf1, sdf2, t_global);

        let seg_ir = ir_binary(Op::Max, profile_blend, ir_unary(Op::Abs, qt, IrType::F32), IrType::F32);

        cur = Some(match cur {
            None => seg_ir,
            Some(acc) => ir_binary(Op::Min, acc, seg_ir, IrType::F32),
        });
    }

    cur.ok_or(LoweringError::NoValidSegments {
        what: "blend2D path".to_string(),
    })
}

#[test]
fn blend_of_circle_to_triangle_along_line_lowers_to_max_of_mix() {
    let expr = Expr::call(
        "blend2D",
        vec![
            Expr::call("circle", vec![Expr::Number(1.0)]),
            Expr::call(
                "polygon",
                vec![
                    Expr::vec2(Expr::Number(0.0), Expr::Number(0.0)),
                    Expr::vec2(Expr::Number(1.0), Expr::Number(0.0)),
                    Expr::vec2(Expr::Number(0.0), Expr::Number(1.0)),
                ],
            ),
            Expr::call(
                "line",
                vec![
                    Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
                    Expr::vec3(Expr::Number(0.0), Expr::Number(5.0), Expr::Number(0.0)),
                ],
            ),
        ],
    );
    if let Expr::Call(_, args) = &expr {
        let ir = lower_blend2d(&args[0], &args[1], &args[2]).unwrap();
        assert_eq!(ir.op, Op::Max);
    } else {
        unreachable!()
    }
}

#[test]
fn blend_over_polyline_with_corner_folds_segments_with_min() {
    let path = Expr::call(
        "polyline",
        vec![
            Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
            Expr::vec3(Expr::Number(0.0), Expr::Number(2.0), Expr::Number(0.0)),
            Expr::vec3(Expr::Number(2.0), Expr::Number(2.0), Expr::Number(0.0)),
        ],
    );
    let c1 = Expr::call("circle", vec![Expr::Number(0.5)]);
    let c2 = Expr::call("circle", vec![Expr::Number(0.8)]);
    let ir = lower_blend2d(&c1, &c2, &path).unwrap();
    assert_eq!(ir.op, Op::Min);
}

#[test]
fn degenerate_path_with_no_valid_segments_is_rejected() {
    let path = Expr::call(
        "line",
        vec![
            Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
            Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
        ],
    );
    let c1 = Expr::call("circle", vec![Expr::Number(0.5)]);
    let c2 = Expr::call("circle", vec![Expr::Number(0.8)]);
    let err = lower_blend2d(&c1, &c2, &path).unwrap_err();
    assert!(matches!(err, LoweringError::NoValidSegments { .. }));
}
