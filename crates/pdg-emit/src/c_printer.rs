use crate::config::RenderStyle;
use crate::emitter::Emitter;
use pdg_core::expressions::{PREFIX_PRECEDENCE, POSTFIX_PRECEDENCE};
use pdg_core::{Address, DecompiledFunction, Expr, ExprKind, Stmt};

fn escape_c(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// `char *` + `p` reads `char *p`, `int` + `x` reads `int x`.
fn declaration(ty: &str, name: &str) -> String {
    if ty.ends_with('*') {
        format!("{}{}", ty, name)
    } else {
        format!("{} {}", ty, name)
    }
}

/// C-like pretty-printer over the decompiled representation.
pub struct CPrinter {
    style: RenderStyle,
}

impl CPrinter {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Plain text of `func`, with no sinks attached.
    pub fn render(&self, func: &DecompiledFunction) -> String {
        let mut emitter = Emitter::new(&self.style);
        self.print_function(func, &mut emitter);
        emitter.finish()
    }

    /// Walk `func` into `em`. Every output mode renders through this one token stream; modes only
    /// differ in which sinks are attached to `em` and how their views are post-processed.
    pub fn print_function(&self, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        for warning in &func.warnings {
            let text = self
                .style
                .comment_style
                .format(&format!("WARNING: {}", warning));
            em.comment(&text);
            em.newline();
        }

        self.print_prototype(func, em);
        em.newline();
        if self.style.newline_after_prototype {
            em.newline();
        }

        em.token("{", None);
        em.newline();
        em.indent();

        for local in &func.locals {
            em.token(&declaration(&local.ty, &local.name), None);
            em.token(";", None);
            em.newline();
        }
        if !func.locals.is_empty() {
            em.newline();
        }

        for stmt in &func.body {
            self.print_stmt(stmt, func, em);
        }

        em.dedent();
        em.token("}", None);
        em.newline();
    }

    fn print_prototype(&self, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        let proto = &func.prototype;
        em.token(&declaration(&proto.return_type, &func.name), None);
        em.token("(", None);
        if proto.params.is_empty() {
            em.token("void", None);
        }
        for (i, param) in proto.params.iter().enumerate() {
            if i > 0 {
                self.comma(em, None);
            }
            em.token(&declaration(&param.ty, &param.name), None);
        }
        em.token(")", None);
    }

    fn comma(&self, em: &mut Emitter<'_>, addr: Option<Address>) {
        em.token(",", addr);
        if self.style.space_after_comma {
            em.soft_space();
        }
    }

    fn open_brace(&self, em: &mut Emitter<'_>) {
        if self.style.newline_before_brace {
            em.newline();
        } else {
            em.space();
        }
        em.token("{", None);
        em.newline();
    }

    fn print_body(&self, body: &[Stmt], func: &DecompiledFunction, em: &mut Emitter<'_>) {
        em.indent();
        for stmt in body {
            self.print_stmt(stmt, func, em);
        }
        em.dedent();
    }

    fn trailing_comment(&self, addr: Address, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        if let Some(comment) = func.comments.get(&addr).filter(|c| !c.is_empty()) {
            em.pad(self.style.comment_indent);
            em.comment(&self.style.comment_style.format(comment));
        }
    }

    fn leading_comment(&self, addr: Address, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        if let Some(comment) = func.comments.get(&addr).filter(|c| !c.is_empty()) {
            em.comment(&self.style.comment_style.format(comment));
            em.newline();
        }
    }

    fn simple_stmt<F>(&self, addr: Address, func: &DecompiledFunction, em: &mut Emitter<'_>, body: F)
    where
        F: FnOnce(&Self, &mut Emitter<'_>),
    {
        em.begin_statement(addr);
        body(self, em);
        em.token(";", Some(addr));
        em.end_statement();
        self.trailing_comment(addr, func, em);
        em.newline();
    }

    fn print_stmt(&self, stmt: &Stmt, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        match stmt {
            Stmt::Expr { addr, expr } => self.simple_stmt(*addr, func, em, |p, em| {
                p.print_expr(expr, Some(*addr), em);
            }),
            Stmt::Assign {
                addr,
                target,
                value,
            } => self.simple_stmt(*addr, func, em, |p, em| {
                p.print_expr(target, Some(*addr), em);
                em.space();
                em.token("=", Some(*addr));
                em.soft_space();
                p.print_expr(value, Some(*addr), em);
            }),
            Stmt::Return { addr, value } => self.simple_stmt(*addr, func, em, |p, em| {
                em.token("return", Some(*addr));
                if let Some(value) = value {
                    em.space();
                    p.print_expr(value, Some(*addr), em);
                }
            }),
            Stmt::Goto { addr, label } => self.simple_stmt(*addr, func, em, |_, em| {
                em.token("goto", Some(*addr));
                em.space();
                em.token(label, Some(*addr));
            }),
            Stmt::If { addr, .. } => {
                self.leading_comment(*addr, func, em);
                self.print_if(stmt, func, em);
                em.newline();
            }
            Stmt::While { addr, cond, body } => {
                self.leading_comment(*addr, func, em);
                em.begin_statement(*addr);
                self.print_condition("while", cond, *addr, em);
                em.end_statement();
                self.open_brace(em);
                self.print_body(body, func, em);
                em.token("}", None);
                em.newline();
            }
            Stmt::DoWhile { addr, body, cond } => {
                self.leading_comment(*addr, func, em);
                em.token("do", Some(*addr));
                self.open_brace(em);
                self.print_body(body, func, em);
                em.token("}", None);
                em.space();
                em.begin_statement(*addr);
                self.print_condition("while", cond, *addr, em);
                em.token(";", Some(*addr));
                em.end_statement();
                em.newline();
            }
            Stmt::Label(label) => {
                let level = em.context().indent_level;
                if level > 0 {
                    em.dedent();
                }
                em.token(&format!("{}:", label), None);
                em.newline();
                if level > 0 {
                    em.indent();
                }
            }
            Stmt::Break => {
                em.token("break;", None);
                em.newline();
            }
            Stmt::Continue => {
                em.token("continue;", None);
                em.newline();
            }
            Stmt::Comment(text) => {
                em.comment(&self.style.comment_style.format(text));
                em.newline();
            }
        }
    }

    /// Print an `if` chain starting at the current position, leaving the closing brace open
    /// on the current line.
    fn print_if(&self, stmt: &Stmt, func: &DecompiledFunction, em: &mut Emitter<'_>) {
        let Stmt::If {
            addr,
            cond,
            then_body,
            else_body,
        } = stmt
        else {
            return;
        };

        em.begin_statement(*addr);
        self.print_condition("if", cond, *addr, em);
        em.end_statement();
        self.open_brace(em);
        self.print_body(then_body, func, em);
        em.token("}", None);

        let Some(else_body) = else_body else {
            return;
        };

        if self.style.newline_before_else {
            em.newline();
        } else {
            em.space();
        }
        em.token("else", None);

        match else_body.as_slice() {
            [nested @ Stmt::If { .. }] => {
                em.space();
                self.print_if(nested, func, em);
            }
            _ => {
                self.open_brace(em);
                self.print_body(else_body, func, em);
                em.token("}", None);
            }
        }
    }

    fn print_condition(&self, keyword: &str, cond: &Expr, addr: Address, em: &mut Emitter<'_>) {
        em.token(keyword, Some(addr));
        em.space();
        em.token("(", Some(addr));
        self.print_expr(cond, Some(addr), em);
        em.token(")", Some(addr));
    }

    fn print_operand(
        &self,
        expr: &Expr,
        parenthesize: bool,
        inherited: Option<Address>,
        em: &mut Emitter<'_>,
    ) {
        if parenthesize {
            em.token("(", inherited);
            self.print_expr(expr, inherited, em);
            em.token(")", inherited);
        } else {
            self.print_expr(expr, inherited, em);
        }
    }

    pub fn print_expr(&self, expr: &Expr, inherited: Option<Address>, em: &mut Emitter<'_>) {
        let addr = expr.addr.or(inherited);

        match &expr.kind {
            ExprKind::Var(name) => em.token(name, addr),
            ExprKind::Number(text) => em.token(text, addr),
            ExprKind::Str(text) => em.token(&format!("\"{}\"", escape_c(text)), addr),
            ExprKind::Unary { op, operand } => {
                em.token(op.symbol(), addr);
                let same_symbol = matches!(
                    &operand.kind,
                    ExprKind::Unary { op: inner, .. } if inner.symbol() == op.symbol()
                ) || matches!(&operand.kind, ExprKind::Number(n) if n.starts_with(op.symbol()));
                let parenthesize = operand.precedence() < PREFIX_PRECEDENCE || same_symbol;
                self.print_operand(operand, parenthesize, addr, em);
            }
            ExprKind::Cast { ty, operand } => {
                em.token(&format!("({})", ty), addr);
                let parenthesize = operand.precedence() < PREFIX_PRECEDENCE;
                self.print_operand(operand, parenthesize, addr, em);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                self.print_operand(lhs, lhs.precedence() < prec, addr, em);
                em.space();
                em.token(op.symbol(), addr);
                em.soft_space();
                self.print_operand(rhs, rhs.precedence() <= prec, addr, em);
            }
            ExprKind::Call { callee, args } => {
                self.print_operand(callee, callee.precedence() < POSTFIX_PRECEDENCE, addr, em);
                em.token("(", addr);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.comma(em, addr);
                    }
                    self.print_expr(arg, addr, em);
                }
                em.token(")", addr);
            }
            ExprKind::Index { base, index } => {
                self.print_operand(base, base.precedence() < POSTFIX_PRECEDENCE, addr, em);
                em.token("[", addr);
                self.print_expr(index, addr, em);
                em.token("]", addr);
            }
            ExprKind::Field { base, field, arrow } => {
                self.print_operand(base, base.precedence() < POSTFIX_PRECEDENCE, addr, em);
                em.token(if *arrow { "->" } else { "." }, addr);
                em.token(field, addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommentStyle, StyleOptions};
    use pdg_core::{AddressRange, BinaryOp, Parameter, UnaryOp, VarDecl};
    use pretty_assertions::assert_eq;

    fn sample() -> DecompiledFunction {
        let mut func = DecompiledFunction::new(
            "check",
            AddressRange::with_size(Address(0x401000), 0x40),
        );
        func.prototype.return_type = "int".to_string();
        func.prototype.params = vec![Parameter::new("argc", "int")];
        func.locals = vec![VarDecl {
            name: "p".to_string(),
            ty: "char *".to_string(),
        }];
        func.body = vec![
            Stmt::If {
                addr: Address(0x401004),
                cond: Expr::binary(BinaryOp::Lt, Expr::var("argc"), Expr::number("2")),
                then_body: vec![Stmt::Return {
                    addr: Address(0x401008),
                    value: Some(Expr::number("1")),
                }],
                else_body: Some(vec![Stmt::Assign {
                    addr: Address(0x401010),
                    target: Expr::var("p"),
                    value: Expr::call("getenv", vec![Expr::string("HOME")]),
                }]),
            },
            Stmt::Return {
                addr: Address(0x401020),
                value: Some(Expr::number("0")),
            },
        ];
        func
    }

    fn style() -> RenderStyle {
        RenderStyle::from_options(&StyleOptions {
            cpp_comments: Some(true),
            indent_increment: Some(4),
            comment_indent: Some(4),
            newline_before_brace: Some(false),
            newline_before_else: Some(false),
            max_line_len: Some(120),
        })
    }

    #[test]
    fn test_render_function() {
        let text = CPrinter::new(style()).render(&sample());
        assert_eq!(
            text,
            "int check(int argc)\n\
             {\n\
             \x20   char *p;\n\
             \n\
             \x20   if (argc < 2) {\n\
             \x20       return 1;\n\
             \x20   } else {\n\
             \x20       p = getenv(\"HOME\");\n\
             \x20   }\n\
             \x20   return 0;\n\
             }\n"
        );
    }

    #[test]
    fn test_newline_before_brace_and_else() {
        let mut style = style();
        style.newline_before_brace = true;
        style.newline_before_else = true;
        let text = CPrinter::new(style).render(&sample());

        assert!(text.contains("    if (argc < 2)\n    {\n        return 1;\n    }\n    else\n    {\n"));
    }

    #[test]
    fn test_parenthesization_follows_precedence() {
        let printer = CPrinter::new(style());
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b")),
            Expr::binary(BinaryOp::Sub, Expr::var("c"), Expr::var("d")),
        );
        let nested = Expr::binary(
            BinaryOp::Sub,
            Expr::var("a"),
            Expr::binary(BinaryOp::Sub, Expr::var("b"), Expr::var("c")),
        );
        let unary = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Neg, Expr::var("x")));
        let cast = Expr::cast("uint", Expr::binary(BinaryOp::Add, Expr::var("x"), Expr::number("1")));

        let render = |e: &Expr| {
            let mut em = Emitter::new(printer.style());
            printer.print_expr(e, None, &mut em);
            em.finish()
        };

        assert_eq!(render(&expr), "(a + b) * (c - d)\n");
        assert_eq!(render(&nested), "a - (b - c)\n");
        assert_eq!(render(&unary), "-(-x)\n");
        assert_eq!(render(&cast), "(uint)(x + 1)\n");
    }

    #[test]
    fn test_block_comments_and_warnings() {
        let mut func = sample();
        func.warning_header("[pdg] Removing unreachable block");
        func.comments.insert(Address(0x401020), "done".to_string());

        let mut style = style();
        style.comment_style = CommentStyle::Block;
        let text = CPrinter::new(style).render(&func);

        assert!(text.starts_with("/* WARNING: [pdg] Removing unreachable block */\nint check"));
        assert!(text.contains("    return 0;    /* done */\n"));
    }

    #[test]
    fn test_else_if_chain() {
        let mut func = sample();
        func.body = vec![Stmt::If {
            addr: Address(0x401004),
            cond: Expr::var("a"),
            then_body: vec![Stmt::Break],
            else_body: Some(vec![Stmt::If {
                addr: Address(0x401008),
                cond: Expr::var("b"),
                then_body: vec![Stmt::Continue],
                else_body: None,
            }]),
        }];
        let text = CPrinter::new(style()).render(&func);

        assert!(text.contains(
            "    if (a) {\n        break;\n    } else if (b) {\n        continue;\n    }\n"
        ));
    }

    #[test]
    fn test_engine_defaults_print_blank_line_after_prototype() {
        let text = CPrinter::new(RenderStyle::default()).render(&sample());
        assert!(text.starts_with("int check(int argc)\n\n{\n  char *p;\n"));
    }
}
