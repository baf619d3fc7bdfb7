use crate::lower::{Listing, ListingFunction};
use pdg_core::format::escape_xml;
use pdg_core::DecompiledFunction;
use std::path::Path;

/// Engine-style description of one function: entry, prototype and local scope.
pub fn function_xml(func: &DecompiledFunction) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "<addr space=\"ram\" offset=\"0x{:x}\"/>",
        func.entry
    ));

    out.push_str(&format!(
        "<prototype name=\"{}\" model=\"default\"><returnsym><type name=\"{}\"/></returnsym>",
        escape_xml(&func.name),
        escape_xml(&func.prototype.return_type)
    ));
    for (index, param) in func.prototype.params.iter().enumerate() {
        out.push_str(&format!(
            "<param index=\"{}\" name=\"{}\"><type name=\"{}\"/></param>",
            index,
            escape_xml(&param.name),
            escape_xml(&param.ty)
        ));
    }
    out.push_str("</prototype>");

    out.push_str("<localdb>");
    for local in &func.locals {
        out.push_str(&format!(
            "<symbol name=\"{}\"><type name=\"{}\"/></symbol>",
            escape_xml(&local.name),
            escape_xml(&local.ty)
        ));
    }
    out.push_str("</localdb>");

    out
}

fn function_entry(func: &ListingFunction) -> String {
    let mut out = format!(
        "<function name=\"{}\" entry=\"0x{:x}\" size=\"0x{:x}\" status=\"{}\" scoped=\"{}\">",
        escape_xml(&func.symbol),
        func.range.start,
        func.range.size(),
        func.status,
        func.scoped
    );
    out.push_str(&function_xml(&func.decompiled));
    for warning in &func.warnings {
        out.push_str(&format!("<warning>{}</warning>", escape_xml(warning)));
    }
    for (addr, text) in &func.decompiled.comments {
        out.push_str(&format!(
            "<comment addr=\"0x{:x}\">{}</comment>",
            addr,
            escape_xml(text)
        ));
    }
    out.push_str("</function>");
    out
}

/// Whole-engine state dump.
pub fn document_xml(listing: &Listing, language: Option<&Path>) -> String {
    let mut out = String::from("<save_state>\n");

    if let Some(arch) = &listing.arch {
        out.push_str(&format!("<arch name=\"{}\"/>\n", escape_xml(arch)));
    }
    if let Some(language) = language {
        out.push_str(&format!(
            "<language path=\"{}\"/>\n",
            escape_xml(&language.display().to_string())
        ));
    }

    out.push_str("<db>\n");
    for func in &listing.functions {
        out.push_str(&function_entry(func));
        out.push('\n');
    }
    out.push_str("</db>\n</save_state>\n");
    out
}
