use crate::address::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// C binding strength; higher binds tighter. All binary operators are left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::BitAnd => 5,
            BinaryOp::BitXor => 4,
            BinaryOp::BitOr => 3,
            BinaryOp::And => 2,
            BinaryOp::Or => 1,
        }
    }
}

/// Precedence of unary prefix operators and casts.
pub const PREFIX_PRECEDENCE: u8 = 11;
/// Precedence of calls, indexing and member access.
pub const POSTFIX_PRECEDENCE: u8 = 12;
/// Precedence of leaves (variables, literals).
pub const PRIMARY_PRECEDENCE: u8 = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKind {
    Var(String),
    /// Numeric literal, kept in the engine's spelling.
    Number(String),
    /// String literal contents without quotes.
    Str(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: String,
        arrow: bool,
    },
    Cast {
        ty: String,
        operand: Box<Expr>,
    },
}

/// Expression node. `addr` is the address of the operation that produced this node, when the
/// engine attributes it to an instruction other than the enclosing statement's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub addr: Option<Address>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, addr: None }
    }

    pub fn at(mut self, addr: Address) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Var(name.into()))
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Number(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Str(text.into()))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Box::new(Expr::var(callee)),
            args,
        })
    }

    pub fn cast(ty: impl Into<String>, operand: Expr) -> Self {
        Self::new(ExprKind::Cast {
            ty: ty.into(),
            operand: Box::new(operand),
        })
    }

    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Var(_) | ExprKind::Number(_) | ExprKind::Str(_) => PRIMARY_PRECEDENCE,
            ExprKind::Unary { .. } | ExprKind::Cast { .. } => PREFIX_PRECEDENCE,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Call { .. } | ExprKind::Index { .. } | ExprKind::Field { .. } => {
                POSTFIX_PRECEDENCE
            }
        }
    }

    /// Every address attached to this expression tree, in pre-order.
    pub fn addresses(&self) -> Vec<Address> {
        let mut out = Vec::new();
        self.collect_addresses(&mut out);
        out
    }

    fn collect_addresses(&self, out: &mut Vec<Address>) {
        if let Some(addr) = self.addr {
            out.push(addr);
        }
        match &self.kind {
            ExprKind::Var(_) | ExprKind::Number(_) | ExprKind::Str(_) => {}
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
                operand.collect_addresses(out)
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.collect_addresses(out);
                rhs.collect_addresses(out);
            }
            ExprKind::Call { callee, args } => {
                callee.collect_addresses(out);
                for arg in args {
                    arg.collect_addresses(out);
                }
            }
            ExprKind::Index { base, index } => {
                base.collect_addresses(out);
                index.collect_addresses(out);
            }
            ExprKind::Field { base, .. } => base.collect_addresses(out),
        }
    }
}
