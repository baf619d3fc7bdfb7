use crate::address::Address;
use crate::engine::EngineError;
use thiserror::Error;

/// Ways a single decompilation can end without output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompileError {
    #[error("No function")]
    NoFunctionAtLocation(Address),

    #[error("No function in Scope")]
    FunctionNotInScope(Address),

    #[error("Decompilation interrupted (status {status})")]
    EngineAborted { status: i32 },

    #[error("Decompiler Error: {0}")]
    EngineException(#[from] EngineError),
}
