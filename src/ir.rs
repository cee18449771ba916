//! The typed intermediate representation: a tree of scalar/vector ops over
//! a single free variable `p: vec3`. See `spec.md` §3 and §4.5.

/// The type of an [`Ir`] node: `spec.md` only needs two, since `poly2d` /
/// `circle2d` / `path` are consumed entirely during lowering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrType {
    F32,
    Vec3,
}

/// An IR operation tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Const,
    Vec3,
    Var,
    Add,
    Sub,
    Neg,
    Mul,
    Min,
    Max,
    Abs,
    Length,
    VecX,
    VecY,
    VecZ,
    Sin,
    Cos,
    Atan2,
    Floor,
    VecAdd,
    VecSub,
    VecAbs,
    VecMax,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Const => "const",
            Op::Vec3 => "vec3",
            Op::Var => "var",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Neg => "neg",
            Op::Mul => "mul",
            Op::Min => "min",
            Op::Max => "max",
            Op::Abs => "abs",
            Op::Length => "length",
            Op::VecX => "vec_x",
            Op::VecY => "vec_y",
            Op::VecZ => "vec_z",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Atan2 => "atan2",
            Op::Floor => "floor",
            Op::VecAdd => "vec_add",
            Op::VecSub => "vec_sub",
            Op::VecAbs => "vec_abs",
            Op::VecMax => "vec_max",
        }
    }
}

/// A node in the typed IR tree: `{op, args, type, value}`, matching
/// `spec.md`'s record shape. `Const` carries `value` and has no children;
/// `Var` has no children and denotes the free point `p`.
#[derive(Clone, Debug, PartialEq)]
pub struct Ir {
    pub op: Op,
    pub args: Vec<Ir>,
    pub ty: IrType,
    pub value: Option<f32>,
}

pub fn ir_const(v: f32) -> Ir {
    Ir {
        op: Op::Const,
        args: vec![],
        ty: IrType::F32,
        value: Some(v),
    }
}

pub fn ir_vec3(x: Ir, y: Ir, z: Ir) -> Ir {
    Ir {
        op: Op::Vec3,
        args: vec![x, y, z],
        ty: IrType::Vec3,
        value: None,
    }
}

/// The free variable `p`. The single legal name is implicit; [`subst`]
/// always substitutes all occurrences.
pub fn ir_var() -> Ir {
    Ir {
        op: Op::Var,
        args: vec![],
        ty: IrType::Vec3,
        value: None,
    }
}

pub fn ir_unary(op: Op, a: Ir, ty: IrType) -> Ir {
    Ir {
        op,
        args: vec![a],
        ty,
        value: None,
    }
}

pub fn ir_binary(op: Op, a: Ir, b: Ir, ty: IrType) -> Ir {
    Ir {
        op,
        args: vec![a, b],
        ty,
        value: None,
    }
}

/// A binary op over two `vec3` operands, producing a `vec3`.
pub fn ir_vec_op(op: Op, a: Ir, b: Ir) -> Ir {
    Ir {
        op,
        args: vec![a, b],
        ty: IrType::Vec3,
        value: None,
    }
}

pub fn ir_mul(a: Ir, b: Ir) -> Ir {
    ir_binary(Op::Mul, a, b, IrType::F32)
}

/// Hygienically substitutes every occurrence of `var` in `node` with
/// `repl`, rebuilding the tree bottom-up. The IR has exactly one free
/// variable, so no capture/shadowing bookkeeping is needed.
pub fn subst(node: &Ir, repl: &Ir) -> Ir {
    if node.op == Op::Var {
        return repl.clone();
    }
    Ir {
        op: node.op,
        args: node.args.iter().map(|a| subst(a, repl)).collect(),
        ty: node.ty,
        value: node.value,
    }
}

/// Renders `node` as an indented tree, one op per line, mirroring the
/// reference interpreter's debug dump.
pub fn pretty(node: &Ir) -> String {
    let mut out = String::new();
    pretty_into(node, "", &mut out);
    out
}

fn pretty_into(node: &Ir, indent: &str, out: &mut String) {
    out.push_str(indent);
    out.push_str(node.op.name());
    match node.op {
        Op::Const => out.push_str(&format!("({})", node.value.unwrap_or(0.0))),
        Op::Var => out.push_str("(p)"),
        _ => {}
    }
    out.push_str(" : ");
    out.push_str(match node.ty {
        IrType::F32 => "f32",
        IrType::Vec3 => "vec3",
    });
    for arg in &node.args {
        out.push('\n');
        pretty_into(arg, &format!("{indent}  "), out);
    }
}

#[test]
fn subst_replaces_every_var_occurrence() {
    let p = ir_var();
    let tree = ir_binary(Op::Add, ir_unary(Op::VecX, p.clone(), IrType::F32), ir_const(1.0), IrType::F32);
    let repl = ir_vec3(ir_const(1.0), ir_const(2.0), ir_const(3.0));
    let result = subst(&tree, &repl);
    assert_eq!(
        result,
        ir_binary(
            Op::Add,
            ir_unary(Op::VecX, repl.clone(), IrType::F32),
            ir_const(1.0),
            IrType::F32
        )
    );
}

#[test]
fn subst_is_idempotent_on_var_free_trees() {
    let tree = ir_binary(Op::Add, ir_const(1.0), ir_const(2.0), IrType::F32);
    let repl = ir_var();
    assert_eq!(subst(&tree, &repl), tree);
}

#[test]
fn pretty_prints_const_value_and_type() {
    let s = pretty(&ir_const(2.5));
    assert_eq!(s, "const(2.5) : f32");
}

#[test]
fn pretty_is_one_line_per_node() {
    let tree = ir_binary(Op::Min, ir_const(1.0), ir_const(2.0), IrType::F32);
    assert_eq!(pretty(&tree).lines().count(), 3);
}
