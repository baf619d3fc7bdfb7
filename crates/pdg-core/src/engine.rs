use crate::address::Address;
use crate::function::DecompiledFunction;
use crate::spec_paths::SpecPathRegistry;
use thiserror::Error;

/// Structured low-level failure raised by an engine, carrying its own explanation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{explain}")]
pub struct EngineError {
    pub explain: String,
}

impl EngineError {
    pub fn new(explain: impl Into<String>) -> Self {
        Self {
            explain: explain.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine-side handle for a function found in the engine's global scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// A decompiler engine instance. One instance serves exactly one decompilation.
pub trait Engine {
    /// Load processor specifications and populate the symbol scope.
    fn init(&mut self, specs: &SpecPathRegistry) -> EngineResult<()>;

    /// Look up the function starting at `entry` in the engine's global scope.
    fn find_function(&self, entry: Address) -> Option<FunctionId>;

    /// Run the transformation pipeline. Negative status means the run was interrupted;
    /// zero means nothing changed.
    fn perform(&mut self, func: FunctionId) -> EngineResult<i32>;

    /// Warnings collected while the engine was running.
    fn warnings(&self) -> Vec<String>;

    fn function(&self, func: FunctionId) -> EngineResult<&DecompiledFunction>;

    fn function_mut(&mut self, func: FunctionId) -> EngineResult<&mut DecompiledFunction>;

    /// The engine's own XML serialization of one function.
    fn function_xml(&self, func: FunctionId) -> EngineResult<String>;

    /// The engine's full document serialization.
    fn document_xml(&self) -> EngineResult<String>;
}

/// Builds a fresh engine per decompilation.
pub trait EngineFactory {
    type Engine: Engine;

    fn create(&self) -> Self::Engine;
}
