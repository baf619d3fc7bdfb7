use crate::lower::{Listing, ListingFunction};
use crate::{parse_file, parse_listing, xml, ListingResult};
use pdg_core::{
    Address, DecompiledFunction, Engine, EngineError, EngineFactory, EngineResult, FunctionDatabase,
    FunctionId, HostFunction, SpecPathRegistry,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A loaded listing acting as both the host's function database and the engine factory.
#[derive(Debug, Clone, Default)]
pub struct ListingProgram {
    listing: Listing,
}

impl ListingProgram {
    pub fn new(listing: Listing) -> Self {
        Self { listing }
    }

    pub fn parse(input: &str) -> ListingResult<Self> {
        parse_listing(input).map(Self::new)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ListingResult<Self> {
        parse_file(path).map(Self::new)
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }
}

impl FunctionDatabase for ListingProgram {
    fn function_at(&self, addr: Address) -> Option<HostFunction> {
        self.listing.function_at(addr).map(|func| HostFunction {
            name: func.symbol.clone(),
            addr: func.range.start,
            size: func.range.size(),
        })
    }
}

impl EngineFactory for ListingProgram {
    type Engine = ListingEngine;

    fn create(&self) -> ListingEngine {
        ListingEngine::new(self.listing.clone())
    }
}

/// Engine instance over its own copy of a listing.
#[derive(Debug, Clone)]
pub struct ListingEngine {
    listing: Listing,
    language: Option<PathBuf>,
    initialized: bool,
    warnings: Vec<String>,
}

impl ListingEngine {
    pub fn new(listing: Listing) -> Self {
        Self {
            listing,
            language: None,
            initialized: false,
            warnings: Vec::new(),
        }
    }

    /// Language definition file picked during `init`.
    pub fn language(&self) -> Option<&Path> {
        self.language.as_deref()
    }

    fn entry(&self, func: FunctionId) -> EngineResult<&ListingFunction> {
        self.listing
            .functions
            .get(func.0)
            .ok_or_else(|| EngineError::new(format!("Unknown function id {}", func.0)))
    }

    fn entry_mut(&mut self, func: FunctionId) -> EngineResult<&mut ListingFunction> {
        self.listing
            .functions
            .get_mut(func.0)
            .ok_or_else(|| EngineError::new(format!("Unknown function id {}", func.0)))
    }
}

impl Engine for ListingEngine {
    /// With spec directories registered, the listing's architecture must have a matching
    /// `<processor>.ldefs` file. Without any, the lookup is skipped.
    fn init(&mut self, specs: &SpecPathRegistry) -> EngineResult<()> {
        if let Some(arch) = &self.listing.arch {
            if specs.is_empty() {
                debug!(arch = %arch, "no spec directories registered, skipping language lookup");
            } else {
                let processor = arch.split(':').next().unwrap_or(arch.as_str());
                let found = specs
                    .language_definitions()
                    .into_iter()
                    .find(|path| path.file_stem().map_or(false, |stem| stem == processor));

                match found {
                    Some(path) => {
                        info!(arch = %arch, ldefs = %path.display(), "language selected");
                        self.language = Some(path);
                    }
                    None => {
                        return Err(EngineError::new(format!(
                            "No language definition for {}",
                            arch
                        )))
                    }
                }
            }
        }

        self.initialized = true;
        Ok(())
    }

    fn find_function(&self, entry: Address) -> Option<FunctionId> {
        if !self.initialized {
            return None;
        }
        self.listing
            .functions
            .iter()
            .position(|func| func.scoped && func.range.start == entry)
            .map(FunctionId)
    }

    fn perform(&mut self, func: FunctionId) -> EngineResult<i32> {
        let entry = self.entry(func)?;
        if let Some(error) = &entry.error {
            return Err(EngineError::new(error.clone()));
        }

        let status = entry.status;
        let warnings = entry.warnings.clone();
        debug!(
            function = %entry.symbol,
            status,
            warnings = warnings.len(),
            "pipeline finished"
        );
        self.warnings = warnings;
        Ok(status)
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }

    fn function(&self, func: FunctionId) -> EngineResult<&DecompiledFunction> {
        self.entry(func).map(|entry| &entry.decompiled)
    }

    fn function_mut(&mut self, func: FunctionId) -> EngineResult<&mut DecompiledFunction> {
        self.entry_mut(func).map(|entry| &mut entry.decompiled)
    }

    fn function_xml(&self, func: FunctionId) -> EngineResult<String> {
        self.function(func).map(xml::function_xml)
    }

    fn document_xml(&self) -> EngineResult<String> {
        Ok(xml::document_xml(&self.listing, self.language()))
    }
}
