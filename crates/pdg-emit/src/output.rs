use anyhow::Result;
use pdg_core::format::escape_xml;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output mode of a decompilation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Plain C pseudocode.
    Default,
    /// Function description and code in one XML envelope.
    Xml,
    /// Full engine state as XML.
    DebugXml,
    /// Pseudocode with an address column on every line.
    OffsetAnnotated,
    /// Seek / comment directives, one pair per statement.
    StatementList,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Default,
        Mode::Xml,
        Mode::DebugXml,
        Mode::OffsetAnnotated,
        Mode::StatementList,
    ];

    /// Mode selected by the text following the command prefix. Only the first character counts.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.chars().next() {
            None => Some(Mode::Default),
            Some('x') => Some(Mode::Xml),
            Some('d') => Some(Mode::DebugXml),
            Some('o') => Some(Mode::OffsetAnnotated),
            Some('*') => Some(Mode::StatementList),
            Some(_) => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Mode::Default => "",
            Mode::Xml => "x",
            Mode::DebugXml => "d",
            Mode::OffsetAnnotated => "o",
            Mode::StatementList => "*",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Default => "default",
            Mode::Xml => "xml",
            Mode::DebugXml => "debug-xml",
            Mode::OffsetAnnotated => "offsets",
            Mode::StatementList => "statements",
        };
        f.write_str(name)
    }
}

/// Wrap an engine function description and rendered code in a `<result>` document.
pub fn xml_envelope(function_xml: &str, code: &str) -> String {
    format!(
        "<result><function>{}</function><code>{}</code></result>",
        function_xml,
        escape_xml(code)
    )
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }
}
