/*! Turn decompiled functions back into readable text.
 *
 * One printer walks the pseudocode; sinks registered on its emitter watch the same pass from
 * different angles. The line sink learns which addresses fed each output line, the statement sink
 * learns which text each address produced. Post-processing turns those views into the payloads a
 * host can print or feed back into its comment store.
 */

pub mod annotated_emitter;
pub mod c_printer;
pub mod config;
pub mod emitter;
pub mod output;
pub mod statement_emitter;

pub use annotated_emitter::{annotate_offsets, OffsetCollector, OutputLine};
pub use c_printer::CPrinter;
pub use config::{CommentStyle, RenderStyle, StyleOptions};
pub use emitter::{EmitContext, Emitter, LineSink, StatementSink};
pub use output::{xml_envelope, JsonFormatter, Mode};
pub use statement_emitter::{
    clean_statement, comment_script, CommentScript, StatementCollector, StatementRecord,
};
