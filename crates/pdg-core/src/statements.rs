use crate::address::Address;
use crate::expressions::Expr;
use serde::{Deserialize, Serialize};

/// One source-level statement. Variants carrying `addr` are statement boundaries: their
/// representative address is the instruction the engine attributes the statement to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Expr {
        addr: Address,
        expr: Expr,
    },
    Assign {
        addr: Address,
        target: Expr,
        value: Expr,
    },
    Return {
        addr: Address,
        value: Option<Expr>,
    },
    If {
        addr: Address,
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        addr: Address,
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        addr: Address,
        body: Vec<Stmt>,
        cond: Expr,
    },
    Goto {
        addr: Address,
        label: String,
    },
    Label(String),
    Break,
    Continue,
    Comment(String),
}

impl Stmt {
    pub fn addr(&self) -> Option<Address> {
        match self {
            Stmt::Expr { addr, .. }
            | Stmt::Assign { addr, .. }
            | Stmt::Return { addr, .. }
            | Stmt::If { addr, .. }
            | Stmt::While { addr, .. }
            | Stmt::DoWhile { addr, .. }
            | Stmt::Goto { addr, .. } => Some(*addr),
            Stmt::Label(_) | Stmt::Break | Stmt::Continue | Stmt::Comment(_) => None,
        }
    }

    /// Every statement and expression address reachable from this statement, in source order.
    pub fn addresses(&self) -> Vec<Address> {
        let mut out = Vec::new();
        self.collect_addresses(&mut out);
        out
    }

    fn collect_addresses(&self, out: &mut Vec<Address>) {
        if let Some(addr) = self.addr() {
            out.push(addr);
        }
        match self {
            Stmt::Expr { expr, .. } => out.extend(expr.addresses()),
            Stmt::Assign { target, value, .. } => {
                out.extend(target.addresses());
                out.extend(value.addresses());
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    out.extend(value.addresses());
                }
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                out.extend(cond.addresses());
                for stmt in then_body {
                    stmt.collect_addresses(out);
                }
                for stmt in else_body.iter().flatten() {
                    stmt.collect_addresses(out);
                }
            }
            Stmt::While { cond, body, .. } | Stmt::DoWhile { cond, body, .. } => {
                out.extend(cond.addresses());
                for stmt in body {
                    stmt.collect_addresses(out);
                }
            }
            Stmt::Goto { .. }
            | Stmt::Label(_)
            | Stmt::Break
            | Stmt::Continue
            | Stmt::Comment(_) => {}
        }
    }
}
