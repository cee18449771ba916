//! `sweep(profile, path)`: extrudes a profile along a line/polyline
//! (generic, segment-by-segment) or a helix (analytic, closed-form
//! parameter recovery). See `spec.md` §4.6 "Sweep".

use crate::ast::Expr;
use crate::ir::{ir_binary, ir_const, ir_mul, ir_unary, ir_var, ir_vec3, ir_vec_op, Ir, IrType, Op};

use super::profile::{extract_profile, ir_smin, profile_sdf, Profile};
use super::{extract_helix_params, extract_path, ir_clamp01, ir_dot3, ir_dot3_const, LoweringError, Vec3Lit};

const TAU: f32 = std::f32::consts::TAU;

pub(crate) fn lower_sweep(profile_expr: &Expr, path_expr: &Expr) -> Result<Ir, LoweringError> {
    let profile = extract_profile(profile_expr)?;

    if let Expr::Call(name, _) = path_expr {
        if name == "helix" {
            return lower_helix_sweep(&profile, path_expr);
        }
    }

    lower_generic_sweep(&profile, path_expr)
}

/// The local (normal, binormal) frame for a tangent `t`, using a fixed "up"
/// reference that's swapped out when nearly parallel to `t`.
fn local_frame(tx: f32, ty: f32, tz: f32) -> Option<(f32, f32, f32, f32, f32, f32)> {
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
        return None;
    }
    nx /= nlen;
    ny /= nlen;
    nz /= nlen;
    let bx = ty * nz - tz * ny;
    let by = tz * nx - tx * nz;
    let bz = tx * ny - ty * nx;
    Some((nx, ny, nz, bx, by, bz))
}

fn lower_generic_sweep(profile: &Profile, path_expr: &Expr) -> Result<Ir, LoweringError> {
    let path: Vec<Vec3Lit> = extract_path(path_expr)?;
    if path.len() < 2 {
        return Err(LoweringError::Arity {
            what: "sweep path".to_string(),
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
        len2: f32,
        tx: f32,
        ty: f32,
        tz: f32,
    }

    let mut segments = Vec::new();
    for w in path.windows(2) {
        let (ax, ay, az) = w[0];
        let (bx, by, bz) = w[1];
        let (abx, aby, abz) = (bx - ax, by - ay, bz - az);
        let len2 = abx * abx + aby * aby + abz * abz;
        if len2 == 0.0 {
            continue;
        }
        let tlen = len2.sqrt();
        segments.push(Segment {
            ax,
            ay,
            az,
            abx,
            aby,
            abz,
            len2,
            tx: abx / tlen,
            ty: aby / tlen,
            tz: abz / tlen,
        });
    }
    if segments.is_empty() {
        return Err(LoweringError::NoValidSegments {
            what: "sweep path".to_string(),
        });
    }

    let profile_radius = match profile {
        Profile::Circle(r) => Some(*r),
        Profile::Polygon(_) => None,
    };
    let use_round_joins = profile_radius.is_some();
    let mut join_smooth = Vec::new();
    if use_round_joins {
        for i in 1..segments.len() {
            let prev = &segments[i - 1];
            let cur = &segments[i];
            let dot = (prev.tx * cur.tx + prev.ty * cur.ty + prev.tz * cur.tz).clamp(-1.0, 1.0);
            let k = profile_radius.unwrap() * (0.0f32).max((1.0 - dot) * 0.5);
            join_smooth.push(k);
        }
    }

    let p = ir_var();
    let mut cur: Option<Ir> = None;
    let last_idx = segments.len() - 1;
    for (idx, seg) in segments.iter().enumerate() {
        let Some((nx, ny, nz, bx, by, bz)) = local_frame(seg.tx, seg.ty, seg.tz) else {
            continue;
        };
        let inv_len2 = 1.0 / seg.len2;

        let a_vec = ir_vec3(ir_const(seg.ax), ir_const(seg.ay), ir_const(seg.az));
        let pa = ir_vec_op(Op::VecSub, p.clone(), a_vec.clone());
        let dot_pa_ab = ir_dot3_const(pa, seg.abx, seg.aby, seg.abz);
        let t_raw = ir_mul(dot_pa_ab, ir_const(inv_len2));
        let t_clamped = ir_clamp01(t_raw);

        let ab_scaled = ir_vec3(
            ir_mul(ir_const(seg.abx), t_clamped.clone()),
            ir_mul(ir_const(seg.aby), t_clamped.clone()),
            ir_mul(ir_const(seg.abz), t_clamped),
        );
        let c = ir_vec_op(Op::VecAdd, a_vec, ab_scaled);
        let q = ir_vec_op(Op::VecSub, p.clone(), c);

        let px = ir_dot3_const(q.clone(), nx, ny, nz);
        let py = ir_dot3_const(q.clone(), bx, by, bz);
        let qt = ir_dot3_const(q, seg.tx, seg.ty, seg.tz);

        let seg_ir = match profile {
            Profile::Circle(r) => {
                if use_round_joins && idx != 0 && idx != last_idx {
                    let qlen = ir_unary(Op::Length, ir_vec3(px, py, qt), IrType::F32);
                    ir_binary(Op::Sub, qlen, ir_const(*r), IrType::F32)
                } else {
                    let radial = ir_unary(Op::Length, ir_vec3(px, py, ir_const(0.0)), IrType::F32);
                    let profile_d = ir_binary(Op::Sub, radial, ir_const(*r), IrType::F32);
                    ir_binary(Op::Max, profile_d, ir_unary(Op::Abs, qt, IrType::F32), IrType::F32)
                }
            }
            Profile::Polygon(_) => {
                let profile_d = profile_sdf(profile, px, py)?;
                ir_binary(Op::Max, profile_d, ir_unary(Op::Abs, qt, IrType::F32), IrType::F32)
            }
        };

        cur = Some(match cur {
            None => seg_ir,
            Some(acc) => {
                if use_round_joins {
                    let k = if idx > 0 { join_smooth[idx - 1] } else { 0.0 };
                    if k > 0.0 {
                        ir_smin(acc, seg_ir, k)
                    } else {
                        ir_binary(Op::Min, acc, seg_ir, IrType::F32)
                    }
                } else {
                    ir_binary(Op::Min, acc, seg_ir, IrType::F32)
                }
            }
        });
    }

    cur.ok_or(LoweringError::NoValidSegments {
        what: "sweep path".to_string(),
    })
}

/// The analytic helix sweep: recovers the helix's angular parameter `t`
/// from `p` via `atan2` and an unwrap against `p.y`, instead of projecting
/// onto a sampled polyline.
fn lower_helix_sweep(profile: &Profile, path_expr: &Expr) -> Result<Ir, LoweringError> {
    let (radius, pitch, turns) = extract_helix_params(path_expr)?;
    let h = pitch / TAU;
    let total_angle = TAU * turns.max(0.0);

    let p = ir_var();
    let p_x = ir_unary(Op::VecX, p.clone(), IrType::F32);
    let p_y = ir_unary(Op::VecY, p.clone(), IrType::F32);
    let p_z = ir_unary(Op::VecZ, p.clone(), IrType::F32);

    let angle = ir_binary(Op::Atan2, p_z.clone(), p_x.clone(), IrType::F32);
    let angle_div = ir_mul(angle.clone(), ir_const(1.0 / TAU));
    let angle_mod = ir_binary(
        Op::Sub,
        angle,
        ir_mul(ir_const(TAU), ir_unary(Op::Floor, angle_div, IrType::F32)),
        IrType::F32,
    );

    let y_over_h = if h != 0.0 {
        ir_mul(p_y, ir_const(1.0 / h))
    } else {
        ir_const(0.0)
    };
    let k_num = ir_binary(Op::Sub, y_over_h, angle_mod.clone(), IrType::F32);
    let k_div = ir_mul(k_num, ir_const(1.0 / TAU));
    let k = ir_unary(Op::Floor, ir_binary(Op::Add, k_div, ir_const(0.5), IrType::F32), IrType::F32);

    let mut t = ir_binary(Op::Add, angle_mod, ir_mul(ir_const(TAU), k), IrType::F32);
    if total_angle > 0.0 {
        t = ir_binary(
            Op::Min,
            ir_binary(Op::Max, t, ir_const(0.0), IrType::F32),
            ir_const(total_angle),
            IrType::F32,
        );
    }

    let sin_t = ir_unary(Op::Sin, t.clone(), IrType::F32);
    let cos_t = ir_unary(Op::Cos, t.clone(), IrType::F32);

    let hx = ir_mul(ir_const(radius), cos_t.clone());
    let hz = ir_mul(ir_const(radius), sin_t.clone());
    let hy = ir_mul(ir_const(h), t);
    let helix_pos = ir_vec3(hx, hy, hz);
    let q = ir_vec_op(Op::VecSub, p, helix_pos);

    let mut d = match profile {
        Profile::Circle(r) => ir_binary(Op::Sub, ir_unary(Op::Length, q, IrType::F32), ir_const(*r), IrType::F32),
        Profile::Polygon(_) => {
            let tlen = (radius * radius + h * h).sqrt();
            let inv_tlen = if tlen > 0.0 { 1.0 / tlen } else { 0.0 };

            let nx = cos_t.clone();
            let ny = ir_const(0.0);
            let nz = sin_t.clone();

            let tx = ir_mul(ir_const(-radius * inv_tlen), sin_t.clone());
            let ty = ir_const(h * inv_tlen);
            let tz = ir_mul(ir_const(radius * inv_tlen), cos_t.clone());

            let bx = ir_mul(ty.clone(), nz.clone());
            let by = ir_binary(Op::Sub, ir_mul(tz.clone(), nx.clone()), ir_mul(tx.clone(), nz.clone()), IrType::F32);
            let bz = ir_mul(ir_unary(Op::Neg, ty.clone(), IrType::F32), nx.clone());

            let qx = ir_unary(Op::VecX, q.clone(), IrType::F32);
            let qy = ir_unary(Op::VecY, q.clone(), IrType::F32);
            let qz = ir_unary(Op::VecZ, q, IrType::F32);

            let px = ir_dot3(qx.clone(), qy.clone(), qz.clone(), nx, ny, nz);
            let py = ir_dot3(qx.clone(), qy.clone(), qz.clone(), bx, by, bz);
            let qt = ir_dot3(qx, qy, qz, tx, ty, tz);

            let profile_d = profile_sdf(profile, px, py)?;
            ir_binary(Op::Max, profile_d, ir_unary(Op::Abs, qt, IrType::F32), IrType::F32)
        }
    };

    if total_angle > 0.0 {
        let d_cap = ir_binary(
            Op::Max,
            ir_unary(Op::Neg, p_y.clone(), IrType::F32),
            ir_binary(Op::Sub, p_y, ir_const(h * total_angle), IrType::F32),
            IrType::F32,
        );
        d = ir_binary(Op::Max, d, d_cap, IrType::F32);
    }
    Ok(d)
}

#[test]
fn line_sweep_of_circle_lowers_to_a_single_segment_max() {
    let expr = Expr::call(
        "sweep",
        vec![
            Expr::call("circle", vec![Expr::Number(0.5)]),
            Expr::call(
                "line",
                vec![
                    Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
                    Expr::vec3(Expr::Number(0.0), Expr::Number(1.0), Expr::Number(0.0)),
                ],
            ),
        ],
    );
    if let Expr::Call(_, args) = &expr {
        let ir = lower_sweep(&args[0], &args[1]).unwrap();
        assert_eq!(ir.op, Op::Max);
    } else {
        unreachable!()
    }
}

#[test]
fn helix_sweep_is_analytic_and_uses_atan2() {
    let helix = Expr::call(
        "helix",
        vec![Expr::Number(1.0), Expr::Number(2.0), Expr::Number(3.0)],
    );
    let profile = Expr::call("circle", vec![Expr::Number(0.3)]);
    let ir = lower_sweep(&profile, &helix).unwrap();
    fn contains_atan2(node: &Ir) -> bool {
        node.op == Op::Atan2 || node.args.iter().any(contains_atan2)
    }
    assert!(contains_atan2(&ir));
}

#[test]
fn polyline_sweep_folds_segments_with_min() {
    let path = Expr::call(
        "polyline",
        vec![
            Expr::vec3(Expr::Number(0.0), Expr::Number(0.0), Expr::Number(0.0)),
            Expr::vec3(Expr::Number(1.0), Expr::Number(0.0), Expr::Number(0.0)),
            Expr::vec3(Expr::Number(1.0), Expr::Number(1.0), Expr::Number(0.0)),
        ],
    );
    let profile = Expr::call("circle", vec![Expr::Number(0.2)]);
    let ir = lower_sweep(&profile, &path).unwrap();
    assert_eq!(ir.op, Op::Min);
}
