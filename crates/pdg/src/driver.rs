use crate::plugin::style_options;
use pdg_core::{
    Address, ConfigStore, ConsoleSink, DecompileError, Engine, EngineFactory, FunctionDatabase,
    Result, SpecPaths,
};
use pdg_emit::{
    annotate_offsets, comment_script, xml_envelope, CPrinter, Emitter, Mode, OffsetCollector,
    OutputLine, RenderStyle, StatementCollector, StatementRecord, StyleOptions,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Prefix of every engine warning attached to the function header.
pub const WARNING_PREFIX: &str = "[pdg] ";

/// Rendered result of one decompilation, ready for the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Payload {
    Code { text: String },
    Xml { xml: String },
    DebugXml { xml: String },
    Annotated { text: String, lines: Vec<OutputLine> },
    Statements { records: Vec<StatementRecord> },
}

impl Payload {
    pub fn mode(&self) -> Mode {
        match self {
            Payload::Code { .. } => Mode::Default,
            Payload::Xml { .. } => Mode::Xml,
            Payload::DebugXml { .. } => Mode::DebugXml,
            Payload::Annotated { .. } => Mode::OffsetAnnotated,
            Payload::Statements { .. } => Mode::StatementList,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Payload::Code { text } => text.clone(),
            Payload::Xml { xml } | Payload::DebugXml { xml } => xml.clone(),
            Payload::Annotated { text, lines } => annotate_offsets(text, lines),
            Payload::Statements { records } => comment_script(records),
        }
    }

    /// Console messages in print order. Statement lists print one directive pair per record.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Payload::Statements { records } => records.iter().map(|r| r.directives()).collect(),
            _ => vec![self.render()],
        }
    }
}

/// Runs single decompilations against a host database and an engine factory.
pub struct Decompiler<'a, D: ?Sized, F> {
    database: &'a D,
    factory: &'a F,
    specs: SpecPaths,
}

impl<'a, D, F> Decompiler<'a, D, F>
where
    D: FunctionDatabase + ?Sized,
    F: EngineFactory,
{
    pub fn new(database: &'a D, factory: &'a F, specs: SpecPaths) -> Self {
        Self {
            database,
            factory,
            specs,
        }
    }

    pub fn specs(&self) -> &SpecPaths {
        &self.specs
    }

    /// Decompile the function covering `at` and render it in `mode`.
    pub fn decompile(&self, at: Address, mode: Mode, options: &StyleOptions) -> Result<Payload> {
        let func = self
            .database
            .function_at(at)
            .ok_or(DecompileError::NoFunctionAtLocation(at))?;
        debug!(at = %at, function = %func.name, entry = %func.addr, mode = %mode, "decompiling");

        let mut engine = self.factory.create();
        engine.init(&self.specs.read())?;

        let id = engine
            .find_function(func.addr)
            .ok_or(DecompileError::FunctionNotInScope(func.addr))?;

        let status = engine.perform(id)?;
        if status < 0 {
            return Err(DecompileError::EngineAborted { status });
        }

        for warning in engine.warnings() {
            engine
                .function_mut(id)?
                .warning_header(format!("{}{}", WARNING_PREFIX, warning));
        }

        let printer = CPrinter::new(RenderStyle::from_options(options));
        let decompiled = engine.function(id)?;

        let payload = match mode {
            Mode::Default => Payload::Code {
                text: printer.render(decompiled),
            },
            Mode::Xml => {
                let code = printer.render(decompiled);
                Payload::Xml {
                    xml: xml_envelope(&engine.function_xml(id)?, &code),
                }
            }
            Mode::DebugXml => Payload::DebugXml {
                xml: engine.document_xml()?,
            },
            Mode::OffsetAnnotated => {
                let mut offsets = OffsetCollector::new();
                let text = {
                    let mut emitter = Emitter::new(printer.style()).with_line_sink(&mut offsets);
                    printer.print_function(decompiled, &mut emitter);
                    emitter.finish()
                };
                Payload::Annotated {
                    text,
                    lines: offsets.into_lines(),
                }
            }
            Mode::StatementList => {
                let mut statements = StatementCollector::new();
                {
                    let mut emitter = Emitter::new(printer.style())
                        .with_statement_sink(&mut statements)
                        .with_offset_tags(true);
                    printer.print_function(decompiled, &mut emitter);
                    emitter.finish();
                }
                Payload::Statements {
                    records: statements.records(),
                }
            }
        };

        info!(function = %func.name, mode = %mode, status, "decompiled");
        Ok(payload)
    }

    /// One host command: read style options, decompile, print the payload or one diagnostic.
    pub fn invoke(
        &self,
        at: Address,
        mode: Mode,
        config: &dyn ConfigStore,
        console: &mut dyn ConsoleSink,
    ) {
        let options = style_options(config);
        match self.decompile(at, mode, &options) {
            Ok(payload) => {
                for message in payload.messages() {
                    console.print(&message);
                }
            }
            Err(err) => {
                warn!(at = %at, error = %err, "decompilation failed");
                console.diagnostic(&err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdg_core::{BufferedConsole, MemoryConfig};
    use pdg_listing::ListingProgram;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"
function sym.answer @ 0x1000 .. 0x1010 {
    proto answer() -> int;
    warning "Could not recover jumptable";
    0x1008: return 42;
}

function sym.spin @ 0x2000 .. 0x2010 {
    status -2;
    0x2000: return;
}
"#;

    fn program() -> ListingProgram {
        ListingProgram::parse(LISTING).unwrap()
    }

    #[test]
    fn test_warning_headers_are_prefixed() {
        let program = program();
        let decompiler = Decompiler::new(&program, &program, SpecPaths::new());
        let payload = decompiler
            .decompile(Address(0x1004), Mode::Default, &StyleOptions::default())
            .unwrap();

        assert_eq!(
            payload.render(),
            "/* WARNING: [pdg] Could not recover jumptable */\nint answer(void)\n{\n  return 42;\n}\n"
        );
    }

    #[test]
    fn test_negative_status_aborts() {
        let program = program();
        let decompiler = Decompiler::new(&program, &program, SpecPaths::new());
        let err = decompiler
            .decompile(Address(0x2000), Mode::Default, &StyleOptions::default())
            .unwrap_err();
        assert_eq!(err, DecompileError::EngineAborted { status: -2 });
    }

    #[test]
    fn test_invoke_reports_one_diagnostic() {
        let program = program();
        let decompiler = Decompiler::new(&program, &program, SpecPaths::new());
        let config = MemoryConfig::new();
        let mut console = BufferedConsole::new();

        decompiler.invoke(Address(0x9000), Mode::Xml, &config, &mut console);
        assert!(console.output.is_empty());
        assert_eq!(console.diagnostics, vec!["No function".to_string()]);
    }

    #[test]
    fn test_payload_mode_matches_request() {
        let program = program();
        let decompiler = Decompiler::new(&program, &program, SpecPaths::new());
        for mode in Mode::ALL {
            let payload = decompiler
                .decompile(Address(0x1000), mode, &StyleOptions::default())
                .unwrap();
            assert_eq!(payload.mode(), mode);
        }
    }
}
