use crate::address::{Address, AddressRange};
use crate::statements::Stmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prototype {
    pub return_type: String,
    pub params: Vec<Parameter>,
}

impl Default for Prototype {
    fn default() -> Self {
        Self {
            return_type: "void".to_string(),
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: String,
}

/// The engine's decompiled representation of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompiledFunction {
    pub name: String,
    pub entry: Address,
    pub range: AddressRange,
    pub prototype: Prototype,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    /// Header annotations printed above the prototype.
    pub warnings: Vec<String>,
    /// End-of-line comments keyed by the statement address they follow.
    pub comments: BTreeMap<Address, String>,
}

impl DecompiledFunction {
    pub fn new(name: impl Into<String>, range: AddressRange) -> Self {
        Self {
            name: name.into(),
            entry: range.start,
            range,
            prototype: Prototype::default(),
            locals: Vec::new(),
            body: Vec::new(),
            warnings: Vec::new(),
            comments: BTreeMap::new(),
        }
    }

    pub fn warning_header(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    /// Every address referenced by the body, in source order.
    pub fn addresses(&self) -> Vec<Address> {
        self.body.iter().flat_map(Stmt::addresses).collect()
    }

    /// First referenced address that falls outside the function's range.
    pub fn stray_address(&self) -> Option<Address> {
        self.addresses()
            .into_iter()
            .chain(self.comments.keys().copied())
            .find(|addr| !self.range.contains(*addr))
    }
}
