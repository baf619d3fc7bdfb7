use pdg_core::{Address, Engine, EngineFactory, FunctionDatabase, SpecPathRegistry, Stmt};
use pdg_listing::{parse_file, ListingError, ListingProgram};
use std::fs;
use tempfile::TempDir;

const STRLEN: &str = r#"
# strlen as the engine would print it
arch "x86:LE:64:default";

function sym.my_strlen @ 0x1139 .. 0x1170 {
    proto my_strlen(s: char *) -> size_t;
    local n: size_t;
    note 0x1141 "loop counter";

    0x1141: n = 0;
    0x1149: while (s[n]@0x1150 != 0) {
        0x114b: n = n + 1;
    }
    0x116e: return n;
}
"#;

#[test]
fn test_parse_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strlen.pdg");
    fs::write(&path, STRLEN).unwrap();

    let listing = parse_file(&path).unwrap();
    assert_eq!(listing.functions.len(), 1);

    let func = &listing.functions[0].decompiled;
    assert_eq!(func.name, "my_strlen");
    assert_eq!(func.prototype.return_type, "size_t");
    assert_eq!(func.body.len(), 3);
    assert!(matches!(func.body[1], Stmt::While { .. }));
    assert_eq!(
        func.addresses(),
        vec![
            Address(0x1141),
            Address(0x1149),
            Address(0x1150),
            Address(0x114b),
            Address(0x116e),
        ]
    );
}

#[test]
fn test_syntax_error_points_at_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.pdg");
    fs::write(&path, "function f @ 0x10 .. 0x20 {\n    0x10: return\n}\n").unwrap();

    let err = parse_file(&path).unwrap_err();
    assert!(matches!(err, ListingError::Syntax(_)));
    assert!(err.to_string().contains("3:1"));
}

#[test]
fn test_program_drives_engine() {
    let program = ListingProgram::parse(STRLEN).unwrap();
    let host = program.function_at(Address(0x1150)).unwrap();
    assert_eq!(host.name, "sym.my_strlen");

    let mut engine = program.create();
    engine.init(&SpecPathRegistry::new()).unwrap();
    let id = engine.find_function(host.addr).unwrap();
    assert_eq!(engine.perform(id).unwrap(), 0);
    assert!(engine.warnings().is_empty());

    let xml = engine.function_xml(id).unwrap();
    assert!(xml.starts_with("<addr space=\"ram\" offset=\"0x1139\"/>"));
    assert!(xml.contains("<param index=\"0\" name=\"s\"><type name=\"char *\"/></param>"));
}
