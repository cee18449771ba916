//! Static type system over the SDF algebra: `spec.md` §4.4.

use thiserror::Error;

use crate::ast::Expr;

/// A type in the closed enumeration the DSL operates over. `Field` is a
/// function `vec3 -> f32`; `Poly2d`/`Circle2d`/`Path` are compile-time-only
/// shape descriptors only legal as the profile/path argument of `extrude`,
/// `sweep`, or `blend2D`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    F32,
    Vec2,
    Vec3,
    Field,
    Poly2d,
    Circle2d,
    Path,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Type::F32 => "f32",
            Type::Vec2 => "vec2",
            Type::Vec3 => "vec3",
            Type::Field => "field",
            Type::Poly2d => "poly2d",
            Type::Circle2d => "circle2d",
            Type::Path => "path",
        };
        f.write_str(s)
    }
}

/// A type error: unknown function, wrong arity, or wrong argument type.
/// Carries the offending argument index and the expected/actual type tags
/// where applicable.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum TypeError {
    #[error("unknown function {name}")]
    UnknownFunction { name: String },
    #[error("{name} expects {expected} args, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{name} arg {index} expects {expected}, got {got}")]
    ArgType {
        name: String,
        index: usize,
        expected: String,
        got: Type,
    },
    #[error("vec2 components must be f32")]
    Vec2Component,
    #[error("vec3 components must be f32")]
    Vec3Component,
}

/// A call's fixed-arity, fixed-type signature.
struct Sig {
    args: &'static [Type],
    ret: Type,
}

fn sig(name: &str) -> Option<Sig> {
    use Type::*;
    Some(match name {
        "sphere" => Sig {
            args: &[F32],
            ret: Field,
        },
        "cylinder" => Sig {
            args: &[F32, F32],
            ret: Field,
        },
        "box" => Sig {
            args: &[Vec3],
            ret: Field,
        },
        "hex_nut" => Sig {
            args: &[F32, F32, F32],
            ret: Field,
        },
        "circle" => Sig {
            args: &[F32],
            ret: Circle2d,
        },
        "helix" => Sig {
            args: &[F32, F32, F32],
            ret: Path,
        },
        "line" => Sig {
            args: &[Vec3, Vec3],
            ret: Path,
        },
        "difference" => Sig {
            args: &[Field, Field],
            ret: Field,
        },
        "rotate" => Sig {
            args: &[Field, Vec3],
            ret: Field,
        },
        "translate" => Sig {
            args: &[Field, Vec3],
            ret: Field,
        },
        "offset" => Sig {
            args: &[Field, F32],
            ret: Field,
        },
        _ => return None,
    })
}

fn is_profile_type(t: Type) -> bool {
    matches!(t, Type::Poly2d | Type::Circle2d)
}

/// Computes the type of `expr`, or the first type error found.
pub fn type_of(expr: &Expr) -> Result<Type, TypeError> {
    match expr {
        Expr::Number(_) => Ok(Type::F32),
        Expr::Vec2(x, y) => {
            if type_of(x)? != Type::F32 || type_of(y)? != Type::F32 {
                return Err(TypeError::Vec2Component);
            }
            Ok(Type::Vec2)
        }
        Expr::Vec3(x, y, z) => {
            if type_of(x)? != Type::F32 || type_of(y)? != Type::F32 || type_of(z)? != Type::F32 {
                return Err(TypeError::Vec3Component);
            }
            Ok(Type::Vec3)
        }
        Expr::Call(name, args) => type_of_call(name, args),
    }
}

fn type_of_call(name: &str, args: &[Expr]) -> Result<Type, TypeError> {
    match name {
        "union" => {
            if args.len() < 2 {
                return Err(TypeError::Arity {
                    name: name.to_string(),
                    expected: "at least 2".to_string(),
                    got: args.len(),
                });
            }
            for (idx, arg) in args.iter().enumerate() {
                let got = type_of(arg)?;
                if got != Type::Field {
                    return Err(TypeError::ArgType {
                        name: name.to_string(),
                        index: idx,
                        expected: Type::Field.to_string(),
                        got,
                    });
                }
            }
            Ok(Type::Field)
        }
        "polygon" => {
            if args.len() < 3 {
                return Err(TypeError::Arity {
                    name: name.to_string(),
                    expected: "at least 3".to_string(),
                    got: args.len(),
                });
            }
            for (idx, arg) in args.iter().enumerate() {
                let got = type_of(arg)?;
                if got != Type::Vec2 {
                    return Err(TypeError::ArgType {
                        name: name.to_string(),
                        index: idx,
                        expected: Type::Vec2.to_string(),
                        got,
                    });
                }
            }
            Ok(Type::Poly2d)
        }
        "polyline" => {
            if args.len() < 2 {
                return Err(TypeError::Arity {
                    name: name.to_string(),
                    expected: "at least 2".to_string(),
                    got: args.len(),
                });
            }
            for (idx, arg) in args.iter().enumerate() {
                let got = type_of(arg)?;
                if got != Type::Vec3 {
                    return Err(TypeError::ArgType {
                        name: name.to_string(),
                        index: idx,
                        expected: Type::Vec3.to_string(),
                        got,
                    });
                }
            }
            Ok(Type::Path)
        }
        "extrude" => {
            check_arity(name, args, 2)?;
            check_profile_arg(name, &args[0], 0)?;
            check_arg_type(name, &args[1], 1, Type::F32)?;
            Ok(Type::Field)
        }
        "sweep" => {
            check_arity(name, args, 2)?;
            check_profile_arg(name, &args[0], 0)?;
            check_arg_type(name, &args[1], 1, Type::Path)?;
            Ok(Type::Field)
        }
        "blend2D" => {
            check_arity(name, args, 3)?;
            check_profile_arg(name, &args[0], 0)?;
            check_profile_arg(name, &args[1], 1)?;
            check_arg_type(name, &args[2], 2, Type::Path)?;
            Ok(Type::Field)
        }
        _ => {
            let Some(Sig { args: expected, ret }) = sig(name) else {
                return Err(TypeError::UnknownFunction {
                    name: name.to_string(),
                });
            };
            check_arity(name, args, expected.len())?;
            for (idx, (arg, exp)) in args.iter().zip(expected.iter()).enumerate() {
                check_arg_type(name, arg, idx, *exp)?;
            }
            Ok(ret)
        }
    }
}

fn check_arity(name: &str, args: &[Expr], expected: usize) -> Result<(), TypeError> {
    if args.len() != expected {
        return Err(TypeError::Arity {
            name: name.to_string(),
            expected: expected.to_string(),
            got: args.len(),
        });
    }
    Ok(())
}

fn check_arg_type(name: &str, arg: &Expr, index: usize, expected: Type) -> Result<(), TypeError> {
    let got = type_of(arg)?;
    if got != expected {
        return Err(TypeError::ArgType {
            name: name.to_string(),
            index,
            expected: expected.to_string(),
            got,
        });
    }
    Ok(())
}

fn check_profile_arg(name: &str, arg: &Expr, index: usize) -> Result<(), TypeError> {
    let got = type_of(arg)?;
    if !is_profile_type(got) {
        return Err(TypeError::ArgType {
            name: name.to_string(),
            index,
            expected: "poly2d or circle2d".to_string(),
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
use crate::parser::parse;

#[cfg(test)]
fn ty(src: &str) -> Type {
    type_of(&parse(src).unwrap()).unwrap()
}

#[test]
fn primitives() {
    assert_eq!(ty("sphere(1)"), Type::Field);
    assert_eq!(ty("cylinder(1, 2)"), Type::Field);
    assert_eq!(ty("box(vec3(1,1,1))"), Type::Field);
    assert_eq!(ty("hex_nut(1, 0.5, 0.5)"), Type::Field);
}

#[test]
fn union_is_variadic_and_total() {
    assert_eq!(ty("union(sphere(1), sphere(2), sphere(3))"), Type::Field);
    let err = type_of(&parse("union(sphere(1))").unwrap()).unwrap_err();
    assert!(matches!(err, TypeError::Arity { .. }));
}

#[test]
fn unknown_function_errors() {
    let err = type_of(&parse("frobnicate(1)").unwrap()).unwrap_err();
    assert!(matches!(err, TypeError::UnknownFunction { .. }));
}

#[test]
fn wrong_arg_type_reports_index() {
    let err = type_of(&parse("sphere(vec3(1,1,1))").unwrap()).unwrap_err();
    match err {
        TypeError::ArgType { index, got, .. } => {
            assert_eq!(index, 0);
            assert_eq!(got, Type::Vec3);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn extrude_accepts_polygon_or_circle() {
    assert_eq!(
        ty("extrude(polygon(vec2(0,0), vec2(1,0), vec2(0,1)), 1)"),
        Type::Field
    );
    assert_eq!(ty("extrude(circle(1), 1)"), Type::Field);
}

#[test]
fn sweep_and_blend2d_accept_paths() {
    assert_eq!(
        ty("sweep(circle(1), line(vec3(0,0,0), vec3(0,1,0)))"),
        Type::Field
    );
    assert_eq!(
        ty(
            "blend2D(circle(1), polygon(vec2(0,0),vec2(1,0),vec2(0,1)), \
             line(vec3(0,0,0), vec3(0,1,0)))"
        ),
        Type::Field
    );
}

#[test]
fn polygon_and_polyline_variadic_arity() {
    let err = type_of(&parse("polygon(vec2(0,0), vec2(1,0))").unwrap()).unwrap_err();
    assert!(matches!(err, TypeError::Arity { .. }));
    let err = type_of(&parse("polyline(vec3(0,0,0))").unwrap()).unwrap_err();
    assert!(matches!(err, TypeError::Arity { .. }));
}

#[test]
fn type_of_is_deterministic() {
    let expr = parse("union(sphere(1), cylinder(0.5, 1), box(vec3(1,1,1)))").unwrap();
    assert_eq!(type_of(&expr), type_of(&expr));
}
