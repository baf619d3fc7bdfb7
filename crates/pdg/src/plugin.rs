use crate::commands::{parse_command, Command, USAGE};
use crate::driver::Decompiler;
use pdg_core::{
    Address, ConfigError, ConfigNode, ConfigStore, ConsoleSink, EngineFactory, FunctionDatabase,
    SpecPaths,
};
use pdg_emit::StyleOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SLEIGHHOME: &str = "pdg.sleighhome";
pub const CMT_CPP: &str = "pdg.cmt.cpp";
pub const CMT_INDENT: &str = "pdg.cmt.indent";
pub const NL_BRACE: &str = "pdg.nl.brace";
pub const NL_ELSE: &str = "pdg.nl.else";
pub const INDENT: &str = "pdg.indent";
pub const LINELEN: &str = "pdg.linelen";

/// Fallback spec home below `$HOME` for an r2pm-installed Ghidra.
pub const R2PM_GHIDRA_DIR: &str = ".local/share/radare2/r2pm/git/ghidra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigVar {
    pub key: &'static str,
    pub default: &'static str,
    pub desc: &'static str,
}

pub const CONFIG_VARS: [ConfigVar; 7] = [
    ConfigVar {
        key: SLEIGHHOME,
        default: "",
        desc: "SLEIGHHOME",
    },
    ConfigVar {
        key: CMT_CPP,
        default: "true",
        desc: "C++ comment style",
    },
    ConfigVar {
        key: CMT_INDENT,
        default: "4",
        desc: "Comment indent",
    },
    ConfigVar {
        key: NL_BRACE,
        default: "false",
        desc: "Newline before opening '{'",
    },
    ConfigVar {
        key: NL_ELSE,
        default: "false",
        desc: "Newline before else",
    },
    ConfigVar {
        key: INDENT,
        default: "4",
        desc: "Indent increment",
    },
    ConfigVar {
        key: LINELEN,
        default: "120",
        desc: "Max line length",
    },
];

/// Style settings as currently stored. Keys the store does not know stay unset.
pub fn style_options(config: &dyn ConfigStore) -> StyleOptions {
    let int = |key: &str| config.get_int(key).map(|v| usize::try_from(v).unwrap_or(usize::MAX));
    StyleOptions {
        cpp_comments: config.get_bool(CMT_CPP),
        comment_indent: int(CMT_INDENT),
        newline_before_brace: config.get_bool(NL_BRACE),
        newline_before_else: config.get_bool(NL_ELSE),
        indent_increment: int(INDENT),
        max_line_len: int(LINELEN),
    }
}

fn non_empty(value: &str) -> Option<&Path> {
    let value = value.trim();
    (!value.is_empty()).then(|| Path::new(value))
}

/// Pick the initial spec home: a configured value wins, then `SLEIGHHOME` from `env`, then the
/// r2pm Ghidra checkout below `HOME` when it exists.
pub fn bootstrap_sleighhome<E>(
    config: &mut dyn ConfigStore,
    specs: &SpecPaths,
    env: E,
) -> Result<Option<PathBuf>, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(home) = config.get(SLEIGHHOME).filter(|v| !v.trim().is_empty()) {
        debug!(home = %home, "using configured sleigh home");
        specs.reset(non_empty(&home));
        return Ok(Some(PathBuf::from(home.trim())));
    }

    if let Some(home) = env("SLEIGHHOME").filter(|v| !v.trim().is_empty()) {
        config.set(SLEIGHHOME, &home)?;
        return Ok(Some(PathBuf::from(home.trim())));
    }

    if let Some(user_home) = env("HOME").filter(|v| !v.is_empty()) {
        let candidate = Path::new(&user_home).join(R2PM_GHIDRA_DIR);
        if candidate.is_dir() {
            config.set(SLEIGHHOME, &candidate.to_string_lossy())?;
            return Ok(Some(candidate));
        }
    }

    debug!("no sleigh home found");
    Ok(None)
}

/// Host-facing plugin: configuration registration, command dispatch and teardown.
pub struct Plugin<'a, D: ?Sized, F> {
    decompiler: Decompiler<'a, D, F>,
}

impl<'a, D, F> Plugin<'a, D, F>
where
    D: FunctionDatabase + ?Sized,
    F: EngineFactory,
{
    pub fn new(database: &'a D, factory: &'a F) -> Self {
        Self::with_specs(database, factory, SpecPaths::new())
    }

    pub fn with_specs(database: &'a D, factory: &'a F, specs: SpecPaths) -> Self {
        Self {
            decompiler: Decompiler::new(database, factory, specs),
        }
    }

    pub fn decompiler(&self) -> &Decompiler<'a, D, F> {
        &self.decompiler
    }

    pub fn specs(&self) -> &SpecPaths {
        self.decompiler.specs()
    }

    /// Register every variable, subscribe the spec-home callback and bootstrap spec home from the
    /// process environment.
    pub fn init(&self, config: &mut dyn ConfigStore) -> Result<(), ConfigError> {
        self.init_with_env(config, |key| std::env::var(key).ok())
    }

    pub fn init_with_env<E>(&self, config: &mut dyn ConfigStore, env: E) -> Result<(), ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        config.lock(false);
        for var in CONFIG_VARS {
            if config.get(var.key).is_none() {
                config.set(var.key, var.default)?;
            }
            config.describe(var.key, var.desc)?;
        }

        let specs = self.specs().clone();
        config.on_change(
            SLEIGHHOME,
            Box::new(move |node: &ConfigNode| specs.reset(non_empty(&node.value))),
        )?;
        config.lock(true);

        let home = bootstrap_sleighhome(config, self.specs(), env)?;
        info!(
            vars = CONFIG_VARS.len(),
            sleighhome = ?home,
            "plugin initialised"
        );
        Ok(())
    }

    /// Drop everything learned about processor specifications.
    pub fn fini(&self) {
        self.specs().reset(None);
        debug!("plugin finalised");
    }

    /// Dispatch one raw command line. Returns `false` for input this plugin does not own.
    pub fn call(
        &self,
        input: &str,
        at: Address,
        config: &dyn ConfigStore,
        console: &mut dyn ConsoleSink,
    ) -> bool {
        match parse_command(input) {
            None => false,
            Some(Command::Usage) => {
                console.print(USAGE);
                true
            }
            Some(Command::Decompile(mode)) => {
                self.decompiler.invoke(at, mode, config, console);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdg_core::MemoryConfig;
    use pdg_listing::ListingProgram;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_init_registers_defaults_and_locks() {
        let program = ListingProgram::default();
        let plugin = Plugin::new(&program, &program);
        let mut config = MemoryConfig::new();
        plugin.init_with_env(&mut config, no_env).unwrap();

        let keys: Vec<_> = config.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "pdg.sleighhome",
                "pdg.cmt.cpp",
                "pdg.cmt.indent",
                "pdg.nl.brace",
                "pdg.nl.else",
                "pdg.indent",
                "pdg.linelen",
            ]
        );
        assert_eq!(config.description(NL_BRACE).as_deref(), Some("Newline before opening '{'"));
        assert_eq!(config.node(LINELEN).unwrap().default, "120");
        assert!(config.is_locked());
        assert!(config.set("pdg.unknown", "1").is_err());
    }

    #[test]
    fn test_style_options_from_defaults() {
        let program = ListingProgram::default();
        let plugin = Plugin::new(&program, &program);
        let mut config = MemoryConfig::new();
        plugin.init_with_env(&mut config, no_env).unwrap();

        assert_eq!(
            style_options(&config),
            StyleOptions {
                cpp_comments: Some(true),
                comment_indent: Some(4),
                newline_before_brace: Some(false),
                newline_before_else: Some(false),
                indent_increment: Some(4),
                max_line_len: Some(120),
            }
        );
        assert_eq!(style_options(&MemoryConfig::new()), StyleOptions::default());
    }

    #[test]
    fn test_sleighhome_change_rescans() {
        let home = TempDir::new().unwrap();
        let languages = home.path().join("Ghidra/Processors/x86/data/languages");
        fs::create_dir_all(&languages).unwrap();
        fs::write(languages.join("x86.ldefs"), "").unwrap();

        let program = ListingProgram::default();
        let plugin = Plugin::new(&program, &program);
        let mut config = MemoryConfig::new();
        plugin.init_with_env(&mut config, no_env).unwrap();
        assert!(plugin.specs().read().is_empty());

        config
            .set(SLEIGHHOME, &home.path().to_string_lossy())
            .unwrap();
        assert_eq!(plugin.specs().read().language_dirs(), &[languages]);

        config.set(SLEIGHHOME, "").unwrap();
        assert!(plugin.specs().read().is_empty());
    }

    #[test]
    fn test_bootstrap_order() {
        let user_home = TempDir::new().unwrap();
        let r2pm = user_home.path().join(R2PM_GHIDRA_DIR);
        fs::create_dir_all(&r2pm).unwrap();
        let home_str = user_home.path().to_string_lossy().to_string();

        let specs = SpecPaths::new();
        let mut config = MemoryConfig::new();
        let picked = bootstrap_sleighhome(&mut config, &specs, |key| match key {
            "HOME" => Some(home_str.clone()),
            _ => None,
        })
        .unwrap();
        assert_eq!(picked, Some(r2pm.clone()));
        assert_eq!(config.get(SLEIGHHOME), Some(r2pm.to_string_lossy().to_string()));

        let mut config = MemoryConfig::new();
        let picked = bootstrap_sleighhome(&mut config, &specs, |key| match key {
            "SLEIGHHOME" => Some("/opt/ghidra".to_string()),
            "HOME" => Some(home_str.clone()),
            _ => None,
        })
        .unwrap();
        assert_eq!(picked, Some(PathBuf::from("/opt/ghidra")));

        let mut config = MemoryConfig::new();
        config.set(SLEIGHHOME, "/usr/share/ghidra").unwrap();
        let picked = bootstrap_sleighhome(&mut config, &specs, |_| Some("/ignored".to_string()))
            .unwrap();
        assert_eq!(picked, Some(PathBuf::from("/usr/share/ghidra")));
        assert_eq!(config.get(SLEIGHHOME).as_deref(), Some("/usr/share/ghidra"));
    }

    #[test]
    fn test_call_ignores_foreign_commands() {
        let program = ListingProgram::default();
        let plugin = Plugin::new(&program, &program);
        let config = MemoryConfig::new();
        let mut console = pdg_core::BufferedConsole::new();

        assert!(!plugin.call("pdf", Address(0), &config, &mut console));
        assert!(!plugin.call("afl", Address(0), &config, &mut console));
        assert!(plugin.call("pdg?", Address(0), &config, &mut console));
        assert_eq!(console.output, vec![USAGE.to_string()]);
    }

    #[test]
    fn test_fini_clears_specs() {
        let home = TempDir::new().unwrap();
        let languages = home.path().join("languages");
        fs::create_dir_all(&languages).unwrap();
        fs::write(languages.join("arm.ldefs"), "").unwrap();

        let program = ListingProgram::default();
        let plugin = Plugin::new(&program, &program);
        plugin.specs().reset(Some(home.path()));
        assert!(!plugin.specs().read().is_empty());

        plugin.fini();
        assert!(plugin.specs().read().is_empty());
    }
}
