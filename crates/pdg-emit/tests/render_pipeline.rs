use pdg_core::{
    Address, AddressRange, BinaryOp, DecompiledFunction, Expr, ExprKind, Parameter, Stmt, VarDecl,
};
use pdg_emit::{
    annotate_offsets, clean_statement, comment_script, CPrinter, CommentScript, CommentStyle,
    Emitter, OffsetCollector, RenderStyle, StatementCollector, StatementSink, StyleOptions,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn loop_function() -> DecompiledFunction {
    let mut func = DecompiledFunction::new(
        "sum",
        AddressRange::with_size(Address(0x1000), 0x100),
    );
    func.prototype.return_type = "int".to_string();
    func.prototype.params = vec![
        Parameter::new("buf", "int *"),
        Parameter::new("n", "int"),
    ];
    func.locals = vec![
        VarDecl {
            name: "i".to_string(),
            ty: "int".to_string(),
        },
        VarDecl {
            name: "total".to_string(),
            ty: "int".to_string(),
        },
    ];
    func.body = vec![
        Stmt::Assign {
            addr: Address(0x1004),
            target: Expr::var("total"),
            value: Expr::number("0"),
        },
        Stmt::Assign {
            addr: Address(0x1008),
            target: Expr::var("i"),
            value: Expr::number("0"),
        },
        Stmt::While {
            addr: Address(0x1010),
            cond: Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("n")),
            body: vec![
                Stmt::Assign {
                    addr: Address(0x1018),
                    target: Expr::var("total"),
                    value: Expr::binary(
                        BinaryOp::Add,
                        Expr::var("total"),
                        Expr::new(ExprKind::Index {
                            base: Box::new(Expr::var("buf")),
                            index: Box::new(Expr::var("i")),
                        })
                        .at(Address(0x1014)),
                    ),
                },
                Stmt::Assign {
                    addr: Address(0x101c),
                    target: Expr::var("i"),
                    value: Expr::binary(BinaryOp::Add, Expr::var("i"), Expr::number("1")),
                },
            ],
        },
        Stmt::Return {
            addr: Address(0x1030),
            value: Some(Expr::var("total")),
        },
    ];
    func.comments.insert(Address(0x1004), "accumulator".to_string());
    func.comments.insert(Address(0x1010), "main loop".to_string());
    func
}

fn style(cpp: bool) -> RenderStyle {
    RenderStyle::from_options(&StyleOptions {
        cpp_comments: Some(cpp),
        comment_indent: Some(4),
        newline_before_brace: Some(false),
        newline_before_else: Some(false),
        indent_increment: Some(4),
        max_line_len: Some(120),
    })
}

#[test]
fn test_comment_style_only_touches_comments() {
    let func = loop_function();
    let line = CPrinter::new(style(true)).render(&func);
    let block = CPrinter::new(style(false)).render(&func);

    let line_lines: Vec<_> = line.lines().collect();
    let block_lines: Vec<_> = block.lines().collect();
    assert_eq!(line_lines.len(), block_lines.len());

    for (a, b) in line_lines.iter().zip(&block_lines) {
        if a.contains("//") {
            let code_a = &a[..a.find("//").unwrap()];
            let code_b = &b[..b.find("/*").unwrap()];
            assert_eq!(code_a, code_b);
        } else {
            assert_eq!(a, b);
        }
    }
}

#[test]
fn test_rendering_is_deterministic() {
    let func = loop_function();
    let printer = CPrinter::new(style(true));
    assert_eq!(printer.render(&func), printer.render(&func));
}

#[test]
fn test_offset_collector_matches_rendered_lines() {
    let func = loop_function();
    let printer = CPrinter::new(style(true));
    let mut offsets = OffsetCollector::new();

    let text = {
        let mut emitter = Emitter::new(printer.style()).with_line_sink(&mut offsets);
        printer.print_function(&func, &mut emitter);
        emitter.finish()
    };

    assert_eq!(text, printer.render(&func));
    assert_eq!(offsets.lines().len(), text.lines().count());

    let annotated = annotate_offsets(&text, offsets.lines());
    assert_eq!(annotated.lines().count(), text.lines().count());
    assert!(annotated.contains("    0x0000001018    |        total = total + buf[i];\n"));
    assert!(annotated.contains("    0x0000001004    |    total = 0;    // accumulator\n"));
    assert!(annotated.contains("                    |int sum(int *buf, int n)\n"));
}

#[derive(Default)]
struct RawStatements(BTreeMap<Address, Vec<String>>);

impl StatementSink for RawStatements {
    fn statement(&mut self, addr: Address, raw: &str) {
        self.0.entry(addr).or_default().push(raw.to_string());
    }
}

#[test]
fn test_statement_records_round_trip_through_comment_store() {
    let func = loop_function();
    let printer = CPrinter::new(style(true));
    let mut statements = StatementCollector::new();
    let mut raw = RawStatements::default();

    {
        let mut emitter = Emitter::new(printer.style())
            .with_statement_sink(&mut statements)
            .with_statement_sink(&mut raw)
            .with_offset_tags(true);
        printer.print_function(&func, &mut emitter);
        emitter.finish();
    }

    let tagged = &raw.0[&Address(0x1018)];
    assert_eq!(
        tagged,
        &vec!["total = total + buf[i];R2_OFFSET_START0x1018R2_OFFSET_STOP".to_string()]
    );
    assert_eq!(clean_statement(&tagged[0]), "total = total + buf[i];");

    let records = statements.records();
    let addrs: Vec<u64> = records.iter().map(|r| r.addr.offset()).collect();
    assert_eq!(addrs, vec![0x1004, 0x1008, 0x1010, 0x1018, 0x101c, 0x1030]);
    assert_eq!(records[2].text, "while (i < n)");

    let script = comment_script(&records);
    let mut store: BTreeMap<Address, String> = BTreeMap::new();
    CommentScript::parse(&script).unwrap().apply(&mut store);
    assert_eq!(store.len(), 6);
    assert_eq!(store[&Address(0x1030)], "return total;");
}

#[test]
fn test_long_call_wraps_inside_statement() {
    let mut func = loop_function();
    func.body = vec![Stmt::Expr {
        addr: Address(0x1040),
        expr: Expr::call(
            "format_message",
            vec![
                Expr::var("first_argument"),
                Expr::var("second_argument"),
                Expr::var("third_argument"),
            ],
        ),
    }];
    func.comments.clear();

    let mut narrow = style(true);
    narrow.max_line_len = 40;
    let printer = CPrinter::new(narrow);
    let mut offsets = OffsetCollector::new();
    let mut statements = StatementCollector::new();

    let text = {
        let mut emitter = Emitter::new(printer.style())
            .with_line_sink(&mut offsets)
            .with_statement_sink(&mut statements);
        printer.print_function(&func, &mut emitter);
        emitter.finish()
    };

    assert!(text.contains(
        "    format_message(first_argument,\n        second_argument, third_argument);\n"
    ));

    let tagged: Vec<_> = offsets
        .lines()
        .iter()
        .filter(|line| line.first_addr() == Some(Address(0x1040)))
        .collect();
    assert_eq!(tagged.len(), 2);

    let records = statements.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].text,
        "format_message(first_argument, second_argument, third_argument);"
    );
}

#[test]
fn test_engine_default_comment_style_is_block() {
    assert_eq!(RenderStyle::default().comment_style, CommentStyle::Block);
}
