//! The abstract syntax tree produced by [`crate::parser::Parser`].

/// A parsed expression: a literal number, a vector constructor, or a named
/// call. Children are owned by their parent, forming an immutable tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f32),
    Vec2(Box<Expr>, Box<Expr>),
    Vec3(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn number(v: f32) -> Expr {
        Expr::Number(v)
    }

    pub fn vec2(x: Expr, y: Expr) -> Expr {
        Expr::Vec2(Box::new(x), Box::new(y))
    }

    pub fn vec3(x: Expr, y: Expr, z: Expr) -> Expr {
        Expr::Vec3(Box::new(x), Box::new(y), Box::new(z))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call(name.into(), args)
    }
}
