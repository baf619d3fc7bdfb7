/*! Core types shared by every pdg crate.
 *
 * A decompiler engine hands back structured pseudocode, a host hands over addresses, configuration
 * and a console. This crate pins down those seams: the decompiled function model, the traits an
 * engine and a host must implement, and the errors a decompilation can end in.
 */

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod expressions;
pub mod format;
pub mod function;
pub mod host;
pub mod spec_paths;
pub mod statements;

pub use address::{Address, AddressRange};
pub use config::{ConfigCallback, ConfigError, ConfigNode, ConfigStore, MemoryConfig};
pub use engine::{Engine, EngineError, EngineFactory, EngineResult, FunctionId};
pub use error::DecompileError;
pub use expressions::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use function::{DecompiledFunction, Parameter, Prototype, VarDecl};
pub use host::{BufferedConsole, CommentSink, ConsoleSink, FunctionDatabase, HostFunction};
pub use spec_paths::{SpecPathRegistry, SpecPaths};
pub use statements::Stmt;

pub type Result<T> = std::result::Result<T, DecompileError>;
