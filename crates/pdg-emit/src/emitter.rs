use crate::config::RenderStyle;
use crate::statement_emitter::{OFFSET_START_MARKER, OFFSET_STOP_MARKER};
use pdg_core::Address;

/// Receives every finished output line together with the addresses that fed it.
pub trait LineSink {
    fn line(&mut self, index: usize, text: &str, addrs: &[Address]);
}

/// Receives the raw text of every statement, keyed by its representative address.
pub trait StatementSink {
    fn statement(&mut self, addr: Address, raw: &str);
}

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
    pub max_width: usize,
}

impl EmitContext {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_chars: "    ".to_string(),
            max_width: 120,
        }
    }

    pub fn from_style(style: &RenderStyle) -> Self {
        Self {
            indent_level: 0,
            indent_chars: " ".repeat(style.indent_increment),
            max_width: style.max_line_len,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    pub fn nested(&self) -> Self {
        let mut ctx = self.clone();
        ctx.indent();
        ctx
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Token-level writer shared by the printer and every registered sink.
///
/// Tokens carry an optional source address. The emitter keeps the current line and its address
/// set, wraps at soft spaces when a line would exceed the maximum width, and forwards finished
/// lines and statements to the sinks.
pub struct Emitter<'a> {
    context: EmitContext,
    output: String,
    line: String,
    line_width: usize,
    line_addrs: Vec<Address>,
    line_index: usize,
    pending_space: bool,
    tag_offsets: bool,
    statement: Option<(Address, String)>,
    line_sinks: Vec<&'a mut dyn LineSink>,
    statement_sinks: Vec<&'a mut dyn StatementSink>,
}

impl<'a> Emitter<'a> {
    pub fn new(style: &RenderStyle) -> Self {
        Self {
            context: EmitContext::from_style(style),
            output: String::new(),
            line: String::new(),
            line_width: 0,
            line_addrs: Vec::new(),
            line_index: 0,
            pending_space: false,
            tag_offsets: false,
            statement: None,
            line_sinks: Vec::new(),
            statement_sinks: Vec::new(),
        }
    }

    pub fn with_line_sink(mut self, sink: &'a mut dyn LineSink) -> Self {
        self.line_sinks.push(sink);
        self
    }

    pub fn with_statement_sink(mut self, sink: &'a mut dyn StatementSink) -> Self {
        self.statement_sinks.push(sink);
        self
    }

    /// Append a positional tag to every statement handed to statement sinks.
    pub fn with_offset_tags(mut self, enabled: bool) -> Self {
        self.tag_offsets = enabled;
        self
    }

    pub fn context(&self) -> &EmitContext {
        &self.context
    }

    pub fn indent(&mut self) {
        self.context.indent();
    }

    pub fn dedent(&mut self) {
        self.context.dedent();
    }

    /// Write one token. `addr` is the address of the operation the token came from.
    pub fn token(&mut self, text: &str, addr: Option<Address>) {
        let width = text.chars().count();

        if self.pending_space {
            self.pending_space = false;
            if self.line_has_code()
                && self.line_width + 1 + width > self.context.max_width
                && self.context.max_width > 0
            {
                self.wrap();
            } else {
                self.push_raw(" ");
            }
            if let Some((_, buffer)) = self.statement.as_mut() {
                buffer.push(' ');
            }
        }

        self.start_line();
        self.push_raw(text);

        if let Some(addr) = addr {
            if !self.line_addrs.contains(&addr) {
                self.line_addrs.push(addr);
            }
        }

        if let Some((_, buffer)) = self.statement.as_mut() {
            buffer.push_str(text);
        }
    }

    /// A space that may become a line break if the next token does not fit.
    pub fn soft_space(&mut self) {
        self.pending_space = true;
    }

    /// A space that never breaks.
    pub fn space(&mut self) {
        self.token(" ", None);
    }

    /// Comment text; never wrapped, never part of a statement.
    pub fn comment(&mut self, text: &str) {
        self.pending_space = false;
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            self.start_line();
            self.push_raw(piece);
        }
    }

    /// Pad the current line with `count` spaces.
    pub fn pad(&mut self, count: usize) {
        self.start_line();
        self.push_raw(&" ".repeat(count));
    }

    pub fn newline(&mut self) {
        self.pending_space = false;

        for sink in self.line_sinks.iter_mut() {
            sink.line(self.line_index, &self.line, &self.line_addrs);
        }

        self.output.push_str(&self.line);
        self.output.push('\n');
        self.line.clear();
        self.line_addrs.clear();
        self.line_width = 0;
        self.line_index += 1;
    }

    pub fn begin_statement(&mut self, addr: Address) {
        self.statement = Some((addr, String::new()));
    }

    pub fn end_statement(&mut self) {
        let Some((addr, mut text)) = self.statement.take() else {
            return;
        };
        if self.tag_offsets {
            text.push_str(&format!(
                "{}0x{:x}{}",
                OFFSET_START_MARKER, addr, OFFSET_STOP_MARKER
            ));
        }
        for sink in self.statement_sinks.iter_mut() {
            sink.statement(addr, &text);
        }
    }

    /// Flush a trailing partial line and hand back the full text.
    pub fn finish(mut self) -> String {
        self.end_statement();
        if !self.line.is_empty() {
            self.newline();
        }
        self.output
    }

    fn line_has_code(&self) -> bool {
        !self.line.trim_start().is_empty()
    }

    fn start_line(&mut self) {
        if self.line.is_empty() {
            let indent = self.context.get_indent();
            self.push_raw(&indent);
        }
    }

    fn wrap(&mut self) {
        self.newline();
        let indent = self.context.nested().get_indent();
        self.push_raw(&indent);
    }

    fn push_raw(&mut self, text: &str) {
        self.line.push_str(text);
        self.line_width += text.chars().count();
    }
}
