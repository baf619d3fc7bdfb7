use crate::emitter::StatementSink;
use anyhow::{anyhow, bail, Result};
use pdg_core::{Address, CommentSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OFFSET_START_MARKER: &str = "R2_OFFSET_START";
pub const OFFSET_STOP_MARKER: &str = "R2_OFFSET_STOP";

/// A statement's representative address and its single-line text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub addr: Address,
    pub text: String,
}

impl StatementRecord {
    /// The seek / set-comment directive pair for this record.
    pub fn directives(&self) -> String {
        format!("s 0x{:x}\n\"CC {}\"\n", self.addr, quote(&self.text))
    }
}

/// Statement sink collecting raw statement text by address.
#[derive(Debug, Clone, Default)]
pub struct StatementCollector {
    statements: BTreeMap<Address, Vec<String>>,
}

impl StatementCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Cleaned records in ascending address order. Several statements at one address keep
    /// their emission order.
    pub fn records(&self) -> Vec<StatementRecord> {
        self.statements
            .iter()
            .flat_map(|(addr, texts)| {
                texts.iter().map(move |raw| StatementRecord {
                    addr: *addr,
                    text: clean_statement(raw),
                })
            })
            .collect()
    }
}

impl StatementSink for StatementCollector {
    fn statement(&mut self, addr: Address, raw: &str) {
        self.statements
            .entry(addr)
            .or_default()
            .push(raw.to_string());
    }
}

/// Strip positional marker spans and newlines from raw statement text.
///
/// A start marker without a matching stop marker swallows the rest of the text.
pub fn clean_statement(raw: &str) -> String {
    let mut text = raw.to_string();

    while let Some(start) = text.find(OFFSET_START_MARKER) {
        let end = text[start..]
            .find(OFFSET_STOP_MARKER)
            .map(|stop| start + stop + OFFSET_STOP_MARKER.len())
            .unwrap_or(text.len());
        text.replace_range(start..end, "");
    }

    text.retain(|c| c != '\n');
    text
}

/// Only double quotes are escaped; backslashes from the code pass through as typed.
fn quote(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn unquote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'"') {
            continue;
        }
        out.push(c);
    }
    out
}

pub fn comment_script(records: &[StatementRecord]) -> String {
    records.iter().map(StatementRecord::directives).collect()
}

/// Parsed form of a seek / set-comment directive script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentScript {
    entries: Vec<(Address, String)>,
}

impl CommentScript {
    pub fn parse(script: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seek: Option<Address> = None;

        for (lineno, line) in script.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if let Some(target) = line.strip_prefix("s ") {
                let addr = target
                    .parse::<Address>()
                    .map_err(|e| anyhow!("line {}: bad seek target {:?}: {}", lineno + 1, target, e))?;
                seek = Some(addr);
            } else if let Some(body) = line
                .strip_prefix("\"CC ")
                .and_then(|rest| rest.strip_suffix('"'))
            {
                let Some(addr) = seek else {
                    bail!("line {}: comment before any seek", lineno + 1);
                };
                entries.push((addr, unquote(body)));
            } else {
                bail!("line {}: unrecognized directive {:?}", lineno + 1, line);
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(Address, String)] {
        &self.entries
    }

    pub fn apply(&self, sink: &mut dyn CommentSink) {
        for (addr, text) in &self.entries {
            sink.set_comment(*addr, text);
        }
    }
}
