/*! Serve pre-decompiled functions from a text listing.
 *
 * A listing spells out what a decompiler engine would hand back: prototype, locals and structured
 * statements, each tagged with the address it came from. Loading one gives a function database and
 * an engine factory, so the rendering pipeline can run without the engine being present.
 */

use pdg_core::{Address, AddressRange};
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub mod engine;
pub mod lower;
pub mod xml;

pub use engine::{ListingEngine, ListingProgram};
pub use lower::{Listing, ListingFunction};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct ListingParser;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Syntax error:\n{0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid number {text:?}: {source}")]
    Number {
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Malformed listing: {0}")]
    Malformed(String),

    #[error("Function {function} has an empty range {range}")]
    EmptyRange { function: String, range: AddressRange },

    #[error("Function {function}: address {addr} lies outside {range}")]
    StrayAddress {
        function: String,
        addr: Address,
        range: AddressRange,
    },

    #[error("Functions {first} and {second} overlap")]
    Overlap { first: String, second: String },
}

pub type ListingResult<T> = Result<T, ListingError>;

pub type ParseResult<T> = Result<T, Box<pest::error::Error<Rule>>>;

pub fn parse(input: &str) -> ParseResult<Pairs<'_, Rule>> {
    ListingParser::parse(Rule::listing, input).map_err(Box::new)
}

/// Parse, lower and validate a listing.
pub fn parse_listing(input: &str) -> ListingResult<Listing> {
    let pairs = parse(input)?;
    let listing = lower::lower_listing(pairs)?;
    validate(&listing)?;
    debug!(
        arch = listing.arch.as_deref().unwrap_or("-"),
        functions = listing.functions.len(),
        "listing loaded"
    );
    Ok(listing)
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> ListingResult<Listing> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ListingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_listing(&input)
}

pub fn check(input: &str) -> bool {
    parse_listing(input).is_ok()
}

/// Ranges must be non-empty and disjoint; every statement, operator and note address must fall
/// inside its function.
pub fn validate(listing: &Listing) -> ListingResult<()> {
    for func in &listing.functions {
        if func.range.is_empty() {
            return Err(ListingError::EmptyRange {
                function: func.symbol.clone(),
                range: func.range,
            });
        }
        if let Some(addr) = func.decompiled.stray_address() {
            return Err(ListingError::StrayAddress {
                function: func.symbol.clone(),
                addr,
                range: func.range,
            });
        }
    }

    let mut ordered: Vec<&ListingFunction> = listing.functions.iter().collect();
    ordered.sort_by_key(|func| func.range.start);
    for pair in ordered.windows(2) {
        if pair[1].range.start < pair[0].range.end {
            return Err(ListingError::Overlap {
                first: pair[0].symbol.clone(),
                second: pair[1].symbol.clone(),
            });
        }
    }

    Ok(())
}
