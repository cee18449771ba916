//! Direct interpretation of an [`Ir`] tree at a point `p`. See `spec.md`
//! §4.7.
//!
//! Extends the reference interpreter with the ops it never lowered to but
//! the real `lower()` rules (rotate, the helix sweep) actually produce:
//! `mul`, scalar `abs`, `sin`, `cos`, `atan2`, `floor`.

use thiserror::Error;

use crate::ir::{Ir, Op};
use crate::vec3::Vec3;

/// An evaluation error: the IR tree mixed up scalar and vector positions.
/// Every `Ir` this crate's own [`crate::lower::lower`] produces is
/// well-typed by construction, so this is only reachable from a
/// hand-assembled `Ir` tree.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum IrEvalError {
    #[error("expected a scalar operand for {op}, got a vec3 subtree")]
    ExpectedScalar { op: &'static str },
    #[error("expected a vec3 operand for {op}, got a scalar subtree")]
    ExpectedVector { op: &'static str },
}

enum Value {
    F32(f32),
    Vec3(Vec3),
}

fn as_scalar(v: Value, op: &'static str) -> Result<f32, IrEvalError> {
    match v {
        Value::F32(f) => Ok(f),
        Value::Vec3(_) => Err(IrEvalError::ExpectedScalar { op }),
    }
}

fn as_vector(v: Value, op: &'static str) -> Result<Vec3, IrEvalError> {
    match v {
        Value::Vec3(v) => Ok(v),
        Value::F32(_) => Err(IrEvalError::ExpectedVector { op }),
    }
}

fn eval(node: &Ir, p: Vec3) -> Result<Value, IrEvalError> {
    Ok(match node.op {
        Op::Const => Value::F32(node.value.unwrap_or(0.0)),
        Op::Vec3 => {
            let x = as_scalar(eval(&node.args[0], p)?, "vec3")?;
            let y = as_scalar(eval(&node.args[1], p)?, "vec3")?;
            let z = as_scalar(eval(&node.args[2], p)?, "vec3")?;
            Value::Vec3(Vec3::new(x, y, z))
        }
        Op::Var => Value::Vec3(p),
        Op::Add => {
            let a = as_scalar(eval(&node.args[0], p)?, "add")?;
            let b = as_scalar(eval(&node.args[1], p)?, "add")?;
            Value::F32(a + b)
        }
        Op::Sub => {
            let a = as_scalar(eval(&node.args[0], p)?, "sub")?;
            let b = as_scalar(eval(&node.args[1], p)?, "sub")?;
            Value::F32(a - b)
        }
        Op::Neg => Value::F32(-as_scalar(eval(&node.args[0], p)?, "neg")?),
        Op::Mul => {
            let a = as_scalar(eval(&node.args[0], p)?, "mul")?;
            let b = as_scalar(eval(&node.args[1], p)?, "mul")?;
            Value::F32(a * b)
        }
        Op::Min => {
            let a = as_scalar(eval(&node.args[0], p)?, "min")?;
            let b = as_scalar(eval(&node.args[1], p)?, "min")?;
            Value::F32(a.min(b))
        }
        Op::Max => {
            let a = as_scalar(eval(&node.args[0], p)?, "max")?;
            let b = as_scalar(eval(&node.args[1], p)?, "max")?;
            Value::F32(a.max(b))
        }
        Op::Abs => Value::F32(as_scalar(eval(&node.args[0], p)?, "abs")?.abs()),
        Op::Length => Value::F32(as_vector(eval(&node.args[0], p)?, "length")?.length()),
        Op::VecX => Value::F32(as_vector(eval(&node.args[0], p)?, "vec_x")?.x),
        Op::VecY => Value::F32(as_vector(eval(&node.args[0], p)?, "vec_y")?.y),
        Op::VecZ => Value::F32(as_vector(eval(&node.args[0], p)?, "vec_z")?.z),
        Op::Sin => Value::F32(as_scalar(eval(&node.args[0], p)?, "sin")?.sin()),
        Op::Cos => Value::F32(as_scalar(eval(&node.args[0], p)?, "cos")?.cos()),
        Op::Atan2 => {
            let y = as_scalar(eval(&node.args[0], p)?, "atan2")?;
            let x = as_scalar(eval(&node.args[1], p)?, "atan2")?;
            Value::F32(y.atan2(x))
        }
        Op::Floor => Value::F32(as_scalar(eval(&node.args[0], p)?, "floor")?.floor()),
        Op::VecAdd => {
            let a = as_vector(eval(&node.args[0], p)?, "vec_add")?;
            let b = as_vector(eval(&node.args[1], p)?, "vec_add")?;
            Value::Vec3(a.add(b))
        }
        Op::VecSub => {
            let a = as_vector(eval(&node.args[0], p)?, "vec_sub")?;
            let b = as_vector(eval(&node.args[1], p)?, "vec_sub")?;
            Value::Vec3(a.sub(b))
        }
        Op::VecAbs => Value::Vec3(as_vector(eval(&node.args[0], p)?, "vec_abs")?.abs()),
        Op::VecMax => {
            let a = as_vector(eval(&node.args[0], p)?, "vec_max")?;
            let b = as_vector(eval(&node.args[1], p)?, "vec_max")?;
            Value::Vec3(a.max(b))
        }
    })
}

/// Evaluates `node` at the point `p`, requiring the root to be a scalar
/// (`f32`) tree — the only type a compiled distance field can have.
pub fn eval_ir(node: &Ir, p: Vec3) -> Result<f32, IrEvalError> {
    as_scalar(eval(node, p)?, "root")
}

#[cfg(test)]
use crate::ir::{ir_binary, ir_const, ir_unary, ir_var, ir_vec3, IrType};

#[test]
fn sphere_distance_matches_length_minus_radius() {
    let r = ir_const(2.0);
    let sphere = ir_binary(Op::Sub, ir_unary(Op::Length, ir_var(), IrType::F32), r, IrType::F32);
    assert_eq!(eval_ir(&sphere, Vec3::new(3.0, 0.0, 0.0)).unwrap(), 1.0);
    assert_eq!(eval_ir(&sphere, Vec3::ZERO).unwrap(), -2.0);
}

#[test]
fn vec3_literal_components_round_trip() {
    let v = ir_vec3(ir_const(1.0), ir_const(2.0), ir_const(3.0));
    let tree = ir_unary(Op::VecY, v, IrType::F32);
    assert_eq!(eval_ir(&tree, Vec3::ZERO).unwrap(), 2.0);
}

#[test]
fn vector_root_is_rejected() {
    let err = eval_ir(&ir_var(), Vec3::ZERO).unwrap_err();
    assert_eq!(err, IrEvalError::ExpectedScalar { op: "root" });
}

#[test]
fn atan2_and_floor_are_available() {
    let tree = ir_binary(Op::Atan2, ir_const(0.0), ir_const(1.0), IrType::F32);
    assert_eq!(eval_ir(&tree, Vec3::ZERO).unwrap(), 0.0);
    let tree = ir_unary(Op::Floor, ir_const(1.9), IrType::F32);
    assert_eq!(eval_ir(&tree, Vec3::ZERO).unwrap(), 1.0);
}
