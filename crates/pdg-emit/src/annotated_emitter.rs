use crate::emitter::LineSink;
use pdg_core::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Width of the address column in front of the `|` separator.
pub const PREFIX_WIDTH: usize = 20;

/// One rendered line and the source addresses that contributed tokens to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub index: usize,
    pub text: String,
    pub addrs: Vec<Address>,
}

impl OutputLine {
    /// The first address emitted on this line.
    pub fn first_addr(&self) -> Option<Address> {
        self.addrs.first().copied()
    }
}

/// Line sink recording a dense line → address-set correspondence.
#[derive(Debug, Clone, Default)]
pub struct OffsetCollector {
    lines: Vec<OutputLine>,
}

impl OffsetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<OutputLine> {
        self.lines
    }
}

impl LineSink for OffsetCollector {
    fn line(&mut self, index: usize, text: &str, addrs: &[Address]) {
        // The correspondence stays dense even if an index is skipped.
        while self.lines.len() < index {
            let missing = self.lines.len();
            self.lines.push(OutputLine {
                index: missing,
                text: String::new(),
                addrs: Vec::new(),
            });
        }
        self.lines.push(OutputLine {
            index,
            text: text.to_string(),
            addrs: addrs.to_vec(),
        });
    }
}

pub fn format_offset_prefix(addr: Option<Address>) -> String {
    match addr {
        Some(addr) => format!("    0x{:010x}    |", addr.offset()),
        None => format!("{}|", " ".repeat(PREFIX_WIDTH)),
    }
}

/// Prefix each line of `text` with the first address of its set, or a blank column.
///
/// Stops at whichever of the text and the correspondence runs out first.
pub fn annotate_offsets(text: &str, offsets: &[OutputLine]) -> String {
    let mut output = String::new();
    let mut annotated = 0;

    for (line, entry) in text.lines().zip(offsets) {
        output.push_str(&format_offset_prefix(entry.first_addr()));
        output.push_str(line);
        output.push('\n');
        annotated += 1;
    }

    let total = text.lines().count();
    if annotated < total {
        debug!(
            annotated,
            total,
            entries = offsets.len(),
            "offset correspondence shorter than rendered text"
        );
    }

    output
}
