use crate::address::{Address, AddressRange};
use serde::{Deserialize, Serialize};

/// A function as the host's analysis database knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFunction {
    pub name: String,
    pub addr: Address,
    pub size: u64,
}

impl HostFunction {
    pub fn range(&self) -> AddressRange {
        AddressRange::with_size(self.addr, self.size)
    }
}

pub trait FunctionDatabase {
    /// The analyzed function covering `addr`, if any.
    fn function_at(&self, addr: Address) -> Option<HostFunction>;
}

/// Console text sink. Each call carries one complete, formatted string.
pub trait ConsoleSink {
    fn print(&mut self, text: &str);

    fn diagnostic(&mut self, text: &str);
}

/// Host comment store, fed by the `s`/`CC` directive pairs.
pub trait CommentSink {
    fn set_comment(&mut self, addr: Address, text: &str);
}

/// Console that keeps everything it is handed.
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    pub output: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_text(&self) -> String {
        self.output.concat()
    }

    pub fn clear(&mut self) {
        self.output.clear();
        self.diagnostics.clear();
    }
}

impl ConsoleSink for BufferedConsole {
    fn print(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn diagnostic(&mut self, text: &str) {
        self.diagnostics.push(text.to_string());
    }
}

impl CommentSink for std::collections::BTreeMap<Address, String> {
    fn set_comment(&mut self, addr: Address, text: &str) {
        self.insert(addr, text.to_string());
    }
}
