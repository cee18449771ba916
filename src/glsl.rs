//! Emits a single `float sdf(vec3 p)` GLSL function from an [`Ir`] tree, no
//! common-subexpression elimination. See `spec.md` §4.8.

use std::fmt::Write as _;

use thiserror::Error;

use crate::ir::{Ir, Op};

/// An emission error. The op set is closed and every [`Ir`] node this
/// crate's [`crate::lower::lower`] can produce emits successfully, so this
/// exists only for parity with the other pipeline stages (`spec.md` §7).
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum GlslEmitError {
    #[error("cannot emit GLSL for op {op}")]
    UnsupportedOp { op: &'static str },
}

fn fmt_f(v: f32) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{}.0", v as i64)
    } else {
        v.to_string()
    }
}

fn emit_expr(node: &Ir, out: &mut String) -> Result<(), GlslEmitError> {
    match node.op {
        Op::Const => {
            out.push_str(&fmt_f(node.value.unwrap_or(0.0)));
        }
        Op::Vec3 => {
            out.push_str("vec3(");
            emit_expr(&node.args[0], out)?;
            out.push_str(", ");
            emit_expr(&node.args[1], out)?;
            out.push_str(", ");
            emit_expr(&node.args[2], out)?;
            out.push(')');
        }
        Op::Var => out.push('p'),
        Op::Add | Op::VecAdd => emit_infix(node, "+", out)?,
        Op::Sub | Op::VecSub => emit_infix(node, "-", out)?,
        Op::Neg => {
            out.push_str("(-");
            emit_expr(&node.args[0], out)?;
            out.push(')');
        }
        Op::Mul => emit_infix(node, "*", out)?,
        Op::Min => emit_call2(node, "min", out)?,
        Op::Max | Op::VecMax => emit_call2(node, "max", out)?,
        Op::Abs | Op::VecAbs => emit_call1(node, "abs", out)?,
        Op::Length => emit_call1(node, "length", out)?,
        Op::Sin => emit_call1(node, "sin", out)?,
        Op::Cos => emit_call1(node, "cos", out)?,
        Op::Floor => emit_call1(node, "floor", out)?,
        Op::Atan2 => emit_call2(node, "atan", out)?,
        Op::VecX => emit_field(node, "x", out)?,
        Op::VecY => emit_field(node, "y", out)?,
        Op::VecZ => emit_field(node, "z", out)?,
    }
    Ok(())
}

fn emit_infix(node: &Ir, op: &str, out: &mut String) -> Result<(), GlslEmitError> {
    out.push('(');
    emit_expr(&node.args[0], out)?;
    let _ = write!(out, " {op} ");
    emit_expr(&node.args[1], out)?;
    out.push(')');
    Ok(())
}

fn emit_call1(node: &Ir, name: &str, out: &mut String) -> Result<(), GlslEmitError> {
    out.push_str(name);
    out.push('(');
    emit_expr(&node.args[0], out)?;
    out.push(')');
    Ok(())
}

fn emit_call2(node: &Ir, name: &str, out: &mut String) -> Result<(), GlslEmitError> {
    out.push_str(name);
    out.push('(');
    emit_expr(&node.args[0], out)?;
    out.push_str(", ");
    emit_expr(&node.args[1], out)?;
    out.push(')');
    Ok(())
}

fn emit_field(node: &Ir, field: &str, out: &mut String) -> Result<(), GlslEmitError> {
    emit_expr(&node.args[0], out)?;
    out.push('.');
    out.push_str(field);
    Ok(())
}

/// Emits `node` as the body of a `float sdf(vec3 p) { return ...; }`
/// GLSL function.
pub fn emit_glsl(node: &Ir) -> Result<String, GlslEmitError> {
    let mut expr = String::new();
    emit_expr(node, &mut expr)?;
    Ok(format!("float sdf(vec3 p) {{\n    return {expr};\n}}\n"))
}

#[cfg(test)]
use crate::ir::{ir_binary, ir_const, ir_unary, ir_var, IrType};

#[test]
fn const_is_formatted_with_trailing_dot_zero() {
    let mut out = String::new();
    emit_expr(&ir_const(2.0), &mut out).unwrap();
    assert_eq!(out, "2.0");
}

#[test]
fn fractional_const_keeps_its_digits() {
    let mut out = String::new();
    emit_expr(&ir_const(1.5), &mut out).unwrap();
    assert_eq!(out, "1.5");
}

#[test]
fn sphere_emits_a_single_sdf_function() {
    let sphere = ir_binary(
        Op::Sub,
        ir_unary(Op::Length, ir_var(), IrType::F32),
        ir_const(1.0),
        IrType::F32,
    );
    let glsl = emit_glsl(&sphere).unwrap();
    assert!(glsl.starts_with("float sdf(vec3 p) {"));
    assert!(glsl.contains("length(p)"));
    assert!(glsl.contains("1.0"));
    assert_eq!(glsl.matches("sdf(").count(), 1);
}

#[test]
fn atan2_emits_as_glsl_atan() {
    let tree = ir_binary(Op::Atan2, ir_const(0.0), ir_const(1.0), IrType::F32);
    let glsl = emit_glsl(&tree).unwrap();
    assert!(glsl.contains("atan(0.0, 1.0)"));
}
