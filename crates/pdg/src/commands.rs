use pdg_emit::Mode;

pub const CMD_PREFIX: &str = "pdg";

pub const USAGE: &str = "\
Usage: pdg  # Native Ghidra decompiler plugin
| pdg       # Decompile current function with the Ghidra decompiler
| pdgd      # Dump the debug XML Dump
| pdgx      # Dump the XML of the current decompiled function
| pdgo      # Decompile current function side by side with offsets
| pdg*      # Decompiled code is returned to r2 as comment
Environment:
| %SLEIGHHOME  # Path to ghidra build root directory
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Decompile(Mode),
    Usage,
}

/// `None` when the input belongs to some other command family.
pub fn parse_command(input: &str) -> Option<Command> {
    let suffix = input.strip_prefix(CMD_PREFIX)?;
    Some(match Mode::from_suffix(suffix) {
        Some(mode) => Command::Decompile(mode),
        None => Command::Usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_table() {
        assert_eq!(parse_command("pdg"), Some(Command::Decompile(Mode::Default)));
        assert_eq!(parse_command("pdgx"), Some(Command::Decompile(Mode::Xml)));
        assert_eq!(parse_command("pdgd"), Some(Command::Decompile(Mode::DebugXml)));
        assert_eq!(
            parse_command("pdgo"),
            Some(Command::Decompile(Mode::OffsetAnnotated))
        );
        assert_eq!(
            parse_command("pdg*"),
            Some(Command::Decompile(Mode::StatementList))
        );
        assert_eq!(parse_command("pdg?"), Some(Command::Usage));
        assert_eq!(parse_command("pdg x"), Some(Command::Usage));
        assert_eq!(parse_command("pd"), None);
        assert_eq!(parse_command("s 0x1000"), None);
    }

    #[test]
    fn test_usage_lists_every_mode() {
        for mode in Mode::ALL {
            assert!(USAGE.contains(&format!("| pdg{} ", mode.suffix())));
        }
    }
}
