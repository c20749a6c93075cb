use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Top-level JSON AST document: `{ "name": ..., "expression": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub expression: Term,
    #[serde(default)]
    pub location: Option<Location>,
}

/// A `let` binding name. `_` denotes no binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub text: String,
    pub location: Location,
}

/// Binary operator wire strings, per the AST shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// A syntax-tree term, mirroring the JSON wire shape exactly, kind-tagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Term {
    Int { value: i64, location: Location },
    Str { value: String, location: Location },
    Bool { value: bool, location: Location },
    Tuple {
        first: Box<Term>,
        second: Box<Term>,
        location: Location,
    },
    Var { text: String, location: Location },
    Let {
        name: Parameter,
        value: Box<Term>,
        next: Box<Term>,
        location: Location,
    },
    Print { value: Box<Term>, location: Location },
    First { value: Box<Term>, location: Location },
    Second { value: Box<Term>, location: Location },
    Binary {
        lhs: Box<Term>,
        op: BinaryOp,
        rhs: Box<Term>,
        location: Location,
    },
    Call {
        callee: Box<Term>,
        arguments: Vec<Term>,
        location: Location,
    },
    If {
        condition: Box<Term>,
        then: Box<Term>,
        otherwise: Box<Term>,
        location: Location,
    },
    Function {
        parameters: Vec<Parameter>,
        value: Box<Term>,
        location: Location,
    },
}

impl Term {
    pub fn location(&self) -> &Location {
        match self {
            Term::Int { location, .. }
            | Term::Str { location, .. }
            | Term::Bool { location, .. }
            | Term::Tuple { location, .. }
            | Term::Var { location, .. }
            | Term::Let { location, .. }
            | Term::Print { location, .. }
            | Term::First { location, .. }
            | Term::Second { location, .. }
            | Term::Binary { location, .. }
            | Term::Call { location, .. }
            | Term::If { location, .. }
            | Term::Function { location, .. } => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            filename: "t.rinha".into(),
            line: 1,
            start: 0,
            end: 1,
        }
    }

    #[test]
    fn deserializes_binary_term() {
        let json = serde_json::json!({
            "kind": "Binary",
            "lhs": {"kind": "Int", "value": 1, "location": loc()},
            "op": "Add",
            "rhs": {"kind": "Int", "value": 2, "location": loc()},
            "location": loc()
        });
        let term: Term = serde_json::from_value(json).unwrap();
        match term {
            Term::Binary { op, .. } => assert_eq!(op, BinaryOp::Add),
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn deserializes_let_with_function_value() {
        let json = serde_json::json!({
            "kind": "Let",
            "name": {"text": "fib", "location": loc()},
            "value": {
                "kind": "Function",
                "parameters": [{"text": "n", "location": loc()}],
                "value": {"kind": "Int", "value": 0, "location": loc()},
                "location": loc()
            },
            "next": {"kind": "Var", "text": "fib", "location": loc()},
            "location": loc()
        });
        let term: Term = serde_json::from_value(json).unwrap();
        assert!(matches!(term, Term::Let { .. }));
    }

    #[test]
    fn underscore_is_a_plain_parameter_name() {
        let p = Parameter {
            text: "_".into(),
            location: loc(),
        };
        assert_eq!(p.text, "_");
    }
}
