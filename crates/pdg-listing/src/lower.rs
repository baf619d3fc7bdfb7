use crate::{ListingError, ListingResult, Rule};
use pdg_core::{
    Address, AddressRange, BinaryOp, DecompiledFunction, Expr, ExprKind, Parameter, Stmt, UnaryOp,
    VarDecl,
};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Processor language id, e.g. `x86:LE:64:default`.
    pub arch: Option<String>,
    pub functions: Vec<ListingFunction>,
}

impl Listing {
    /// The function whose range covers `addr`.
    pub fn function_at(&self, addr: Address) -> Option<&ListingFunction> {
        self.functions.iter().find(|func| func.range.contains(addr))
    }
}

/// One listed function: what the host knows about it and what the engine would produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFunction {
    /// Name in the host's analysis database.
    pub symbol: String,
    pub range: AddressRange,
    pub decompiled: DecompiledFunction,
    /// Warnings raised while the engine runs.
    pub warnings: Vec<String>,
    /// Status returned by the engine's transformation pipeline.
    pub status: i32,
    /// Low-level engine failure raised instead of a status.
    pub error: Option<String>,
    /// Whether the engine's global scope knows the function.
    pub scoped: bool,
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_arch
            | Rule::kw_function
            | Rule::kw_proto
            | Rule::kw_local
            | Rule::kw_warning
            | Rule::kw_note
            | Rule::kw_status
            | Rule::kw_error
            | Rule::kw_unscoped
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_while
            | Rule::kw_do
            | Rule::kw_return
            | Rule::kw_goto
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_cast
    )
}

fn significant(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn expect<'i>(
    parts: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
) -> ListingResult<Pair<'i, Rule>> {
    parts
        .next()
        .ok_or_else(|| ListingError::Malformed(format!("missing {}", what)))
}

fn unexpected(pair: &Pair<'_, Rule>) -> ListingError {
    ListingError::Malformed(format!(
        "unexpected {:?} at {:?}",
        pair.as_rule(),
        pair.as_str()
    ))
}

fn parse_hex(pair: &Pair<'_, Rule>) -> ListingResult<Address> {
    pair.as_str()
        .parse::<Address>()
        .map_err(|source| ListingError::Number {
            text: pair.as_str().to_string(),
            source,
        })
}

fn parse_int(pair: &Pair<'_, Rule>) -> ListingResult<i32> {
    pair.as_str()
        .parse::<i32>()
        .map_err(|source| ListingError::Number {
            text: pair.as_str().to_string(),
            source,
        })
}

fn string_value(pair: Pair<'_, Rule>) -> String {
    let body = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `char*`, `char  *` and `char *` all read `char *`; words are single-spaced.
fn normalize_type(text: &str) -> String {
    let base = text.trim_end_matches(|c: char| c == '*' || c == ' ');
    let stars = text[base.len()..].chars().filter(|c| *c == '*').count();
    let base = base.split_whitespace().collect::<Vec<_>>().join(" ");
    if stars == 0 {
        base
    } else {
        format!("{} {}", base, "*".repeat(stars))
    }
}

pub fn lower_listing(pairs: Pairs<'_, Rule>) -> ListingResult<Listing> {
    let mut listing = Listing::default();

    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::arch_decl => {
                let mut parts = significant(pair);
                listing.arch = Some(string_value(expect(&mut parts, "arch id")?));
            }
            Rule::function => listing.functions.push(lower_function(pair)?),
            Rule::EOI => {}
            _ => return Err(unexpected(&pair)),
        }
    }

    Ok(listing)
}

fn lower_function(pair: Pair<'_, Rule>) -> ListingResult<ListingFunction> {
    let mut parts = significant(pair);
    let symbol = expect(&mut parts, "function name")?.as_str().to_string();
    let entry = parse_hex(&expect(&mut parts, "entry address")?)?;
    let end = parse_hex(&expect(&mut parts, "end address")?)?;
    let range = AddressRange::new(entry, end);

    let mut func = ListingFunction {
        symbol: symbol.clone(),
        range,
        decompiled: DecompiledFunction::new(symbol, range),
        warnings: Vec::new(),
        status: 0,
        error: None,
        scoped: true,
    };

    for item in parts {
        match item.as_rule() {
            Rule::proto_decl => lower_proto(item, &mut func.decompiled)?,
            Rule::local_decl => {
                let mut parts = significant(item);
                let name = expect(&mut parts, "local name")?.as_str().to_string();
                let ty = normalize_type(expect(&mut parts, "local type")?.as_str());
                func.decompiled.locals.push(VarDecl { name, ty });
            }
            Rule::warning_decl => {
                let mut parts = significant(item);
                func.warnings
                    .push(string_value(expect(&mut parts, "warning text")?));
            }
            Rule::note_decl => {
                let mut parts = significant(item);
                let addr = parse_hex(&expect(&mut parts, "note address")?)?;
                let text = string_value(expect(&mut parts, "note text")?);
                func.decompiled.comments.insert(addr, text);
            }
            Rule::status_decl => {
                let mut parts = significant(item);
                func.status = parse_int(&expect(&mut parts, "status")?)?;
            }
            Rule::error_decl => {
                let mut parts = significant(item);
                func.error = Some(string_value(expect(&mut parts, "error text")?));
            }
            Rule::unscoped_decl => func.scoped = false,
            _ => func.decompiled.body.push(lower_stmt(item)?),
        }
    }

    Ok(func)
}

fn lower_proto(pair: Pair<'_, Rule>, func: &mut DecompiledFunction) -> ListingResult<()> {
    let mut parts = significant(pair);
    func.name = expect(&mut parts, "prototype name")?.as_str().to_string();
    func.prototype.params.clear();

    for part in parts {
        match part.as_rule() {
            Rule::param => {
                let mut inner = part.into_inner();
                let name = expect(&mut inner, "parameter name")?.as_str();
                let ty = normalize_type(expect(&mut inner, "parameter type")?.as_str());
                func.prototype.params.push(Parameter::new(name, ty));
            }
            Rule::type_name => func.prototype.return_type = normalize_type(part.as_str()),
            _ => return Err(unexpected(&part)),
        }
    }

    Ok(())
}

fn lower_block(pair: Pair<'_, Rule>) -> ListingResult<Vec<Stmt>> {
    pair.into_inner().map(lower_stmt).collect()
}

fn lower_stmt(pair: Pair<'_, Rule>) -> ListingResult<Stmt> {
    match pair.as_rule() {
        Rule::addressed_stmt => {
            let mut parts = pair.into_inner();
            let addr = parse_hex(&expect(&mut parts, "statement address")?)?;
            lower_addressed(addr, expect(&mut parts, "statement")?)
        }
        Rule::break_stmt => Ok(Stmt::Break),
        Rule::continue_stmt => Ok(Stmt::Continue),
        Rule::label_stmt => {
            let mut parts = pair.into_inner();
            Ok(Stmt::Label(expect(&mut parts, "label")?.as_str().to_string()))
        }
        Rule::comment_stmt => {
            let text = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().trim_end().to_string())
                .unwrap_or_default();
            Ok(Stmt::Comment(text))
        }
        _ => Err(unexpected(&pair)),
    }
}

fn lower_addressed(addr: Address, pair: Pair<'_, Rule>) -> ListingResult<Stmt> {
    let rule = pair.as_rule();
    let mut parts = significant(pair);

    match rule {
        Rule::if_stmt => {
            let cond = lower_expr(expect(&mut parts, "if condition")?)?;
            let then_body = lower_block(expect(&mut parts, "if body")?)?;
            let else_body = match parts.next() {
                Some(clause) => {
                    let mut inner = significant(clause);
                    let branch = expect(&mut inner, "else body")?;
                    Some(match branch.as_rule() {
                        Rule::block => lower_block(branch)?,
                        _ => vec![lower_stmt(branch)?],
                    })
                }
                None => None,
            };
            Ok(Stmt::If {
                addr,
                cond,
                then_body,
                else_body,
            })
        }
        Rule::while_stmt => {
            let cond = lower_expr(expect(&mut parts, "while condition")?)?;
            let body = lower_block(expect(&mut parts, "while body")?)?;
            Ok(Stmt::While { addr, cond, body })
        }
        Rule::do_stmt => {
            let body = lower_block(expect(&mut parts, "do body")?)?;
            let cond = lower_expr(expect(&mut parts, "do condition")?)?;
            Ok(Stmt::DoWhile { addr, body, cond })
        }
        Rule::return_stmt => {
            let value = parts.next().map(lower_expr).transpose()?;
            Ok(Stmt::Return { addr, value })
        }
        Rule::goto_stmt => {
            let label = expect(&mut parts, "goto label")?.as_str().to_string();
            Ok(Stmt::Goto { addr, label })
        }
        Rule::assign_stmt => {
            let target = lower_expr(expect(&mut parts, "assignment target")?)?;
            let value = lower_expr(expect(&mut parts, "assignment value")?)?;
            Ok(Stmt::Assign {
                addr,
                target,
                value,
            })
        }
        Rule::expr_stmt => {
            let expr = lower_expr(expect(&mut parts, "expression")?)?;
            Ok(Stmt::Expr { addr, expr })
        }
        _ => Err(ListingError::Malformed(format!(
            "unexpected statement kind {:?}",
            rule
        ))),
    }
}

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::log_or, Assoc::Left))
            .op(Op::infix(Rule::log_and, Assoc::Left))
            .op(Op::infix(Rule::bit_or, Assoc::Left))
            .op(Op::infix(Rule::bit_xor, Assoc::Left))
            .op(Op::infix(Rule::bit_and, Assoc::Left))
            .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::ne, Assoc::Left))
            .op(Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::le, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::ge, Assoc::Left))
            .op(Op::infix(Rule::shl, Assoc::Left) | Op::infix(Rule::shr, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::rem, Assoc::Left))
            .op(Op::prefix(Rule::neg)
                | Op::prefix(Rule::not)
                | Op::prefix(Rule::bit_not)
                | Op::prefix(Rule::deref)
                | Op::prefix(Rule::addr_of)
                | Op::prefix(Rule::cast_op))
            .op(Op::postfix(Rule::call)
                | Op::postfix(Rule::index)
                | Op::postfix(Rule::field)
                | Op::postfix(Rule::arrow)
                | Op::postfix(Rule::at_addr))
    })
}

fn binary_op(rule: Rule) -> Option<BinaryOp> {
    Some(match rule {
        Rule::log_or => BinaryOp::Or,
        Rule::log_and => BinaryOp::And,
        Rule::bit_or => BinaryOp::BitOr,
        Rule::bit_xor => BinaryOp::BitXor,
        Rule::bit_and => BinaryOp::BitAnd,
        Rule::eq => BinaryOp::Eq,
        Rule::ne => BinaryOp::Ne,
        Rule::lt => BinaryOp::Lt,
        Rule::le => BinaryOp::Le,
        Rule::gt => BinaryOp::Gt,
        Rule::ge => BinaryOp::Ge,
        Rule::shl => BinaryOp::Shl,
        Rule::shr => BinaryOp::Shr,
        Rule::add => BinaryOp::Add,
        Rule::sub => BinaryOp::Sub,
        Rule::mul => BinaryOp::Mul,
        Rule::div => BinaryOp::Div,
        Rule::rem => BinaryOp::Rem,
        _ => return None,
    })
}

fn unary_op(rule: Rule) -> Option<UnaryOp> {
    Some(match rule {
        Rule::neg => UnaryOp::Neg,
        Rule::not => UnaryOp::Not,
        Rule::bit_not => UnaryOp::BitNot,
        Rule::deref => UnaryOp::Deref,
        Rule::addr_of => UnaryOp::AddrOf,
        _ => return None,
    })
}

/// Lower an `expr` pair.
pub fn lower_expr(pair: Pair<'_, Rule>) -> ListingResult<Expr> {
    fold_expr(pair.into_inner())
}

fn fold_expr(pairs: Pairs<'_, Rule>) -> ListingResult<Expr> {
    pratt()
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => Ok(Expr::number(primary.as_str())),
            Rule::string => Ok(Expr::string(string_value(primary))),
            Rule::ident => Ok(Expr::var(primary.as_str())),
            Rule::expr => lower_expr(primary),
            _ => Err(unexpected(&primary)),
        })
        .map_prefix(|op, operand| {
            let operand = operand?;
            if op.as_rule() == Rule::cast_op {
                let ty = significant(op)
                    .next()
                    .map(|p| normalize_type(p.as_str()))
                    .unwrap_or_default();
                return Ok(Expr::cast(ty, operand));
            }
            match unary_op(op.as_rule()) {
                Some(unary) => Ok(Expr::unary(unary, operand)),
                None => Err(unexpected(&op)),
            }
        })
        .map_postfix(|base, op| {
            let base = base?;
            match op.as_rule() {
                Rule::call => {
                    let args = op
                        .into_inner()
                        .map(lower_expr)
                        .collect::<ListingResult<Vec<_>>>()?;
                    Ok(Expr::new(ExprKind::Call {
                        callee: Box::new(base),
                        args,
                    }))
                }
                Rule::index => {
                    let mut inner = op.into_inner();
                    let index = lower_expr(expect(&mut inner, "index")?)?;
                    Ok(Expr::new(ExprKind::Index {
                        base: Box::new(base),
                        index: Box::new(index),
                    }))
                }
                Rule::field | Rule::arrow => {
                    let arrow = op.as_rule() == Rule::arrow;
                    let mut inner = op.into_inner();
                    let field = expect(&mut inner, "field name")?.as_str().to_string();
                    Ok(Expr::new(ExprKind::Field {
                        base: Box::new(base),
                        field,
                        arrow,
                    }))
                }
                Rule::at_addr => {
                    let mut inner = op.into_inner();
                    let addr = parse_hex(&expect(&mut inner, "operator address")?)?;
                    Ok(base.at(addr))
                }
                _ => Err(unexpected(&op)),
            }
        })
        .map_infix(|lhs, op, rhs| match binary_op(op.as_rule()) {
            Some(binary) => Ok(Expr::binary(binary, lhs?, rhs?)),
            None => Err(unexpected(&op)),
        })
        .parse(pairs)
}
