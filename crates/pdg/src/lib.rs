/*! Decompile one function and show it the way the reader needs it.
 *
 * Plain pseudocode for reading, XML for tooling, an address column for lining code up with the
 * disassembly, and seek/comment directives for pushing every statement back into the analysis
 * database as a comment. The plugin wires configuration and commands; the driver does the work.
 */

pub mod commands;
pub mod driver;
pub mod plugin;

pub use pdg_core as core;
pub use pdg_emit as emit;
pub use pdg_listing as listing;

pub use pdg_core::{
    Address, BufferedConsole, ConfigStore, ConsoleSink, DecompileError, MemoryConfig, SpecPaths,
};
pub use pdg_emit::{Mode, RenderStyle, StyleOptions};
pub use pdg_listing::ListingProgram;

pub use commands::{parse_command, Command, CMD_PREFIX, USAGE};
pub use driver::{Decompiler, Payload, WARNING_PREFIX};
pub use plugin::{style_options, Plugin, CONFIG_VARS};
