use crate::{Grammar, RhsNode, Symbol, SymbolKind};

/// Rewrites every raw EBNF production into pure BNF, clearing and
/// rebuilding [Grammar::prods] from scratch. Each `?`/`*`/`+` operator
/// introduces a fresh generated nonterminal (named `<context>__gen_N`)
/// and is expanded in terms of it; everything else is flattened directly
/// into the enclosing production.
pub fn expand_ebnf(grammar: &mut Grammar) {
    grammar.clear_productions();
    let raw = grammar.raw.clone();
    for rp in &raw {
        expand_expr_into_lhs(grammar, &rp.lhs, Some(&rp.expr));
    }
}

fn expand_expr_into_lhs(grammar: &mut Grammar, lhs: &str, expr: Option<&RhsNode>) {
    let Some(expr) = expr else {
        grammar.add_production(lhs, Vec::new());
        return;
    };
    match expr {
        RhsNode::Alternation { items, .. } => {
            for item in items {
                expand_expr_into_lhs(grammar, lhs, Some(item));
            }
        }
        RhsNode::Sequence { items, .. } => {
            if items.is_empty() {
                grammar.add_production(lhs, Vec::new());
                return;
            }
            let mut seq = Vec::new();
            for item in items {
                append_expr_to_sequence(grammar, lhs, item, &mut seq);
            }
            grammar.add_production(lhs, seq);
        }
        RhsNode::Symbol { name, kind, .. } => {
            grammar.add_production(
                lhs,
                vec![Symbol {
                    text: name.clone(),
                    kind: *kind,
                }],
            );
        }
        RhsNode::Optional { .. } | RhsNode::KleeneStar { .. } | RhsNode::KleenePlus { .. } => {
            let sym = ensure_expr_symbol(grammar, lhs, expr);
            grammar.add_production(lhs, vec![sym]);
        }
    }
}

fn append_expr_to_sequence(grammar: &mut Grammar, context: &str, expr: &RhsNode, out: &mut Vec<Symbol>) {
    match expr {
        RhsNode::Sequence { items, .. } => {
            for item in items {
                append_expr_to_sequence(grammar, context, item, out);
            }
        }
        RhsNode::Symbol { name, kind, .. } => out.push(Symbol {
            text: name.clone(),
            kind: *kind,
        }),
        _ => out.push(ensure_expr_symbol(grammar, context, expr)),
    }
}

/// Resolves `expr` to a single symbol usable in a production's rhs,
/// generating a helper nonterminal when `expr` isn't already atomic.
fn ensure_expr_symbol(grammar: &mut Grammar, context: &str, expr: &RhsNode) -> Symbol {
    match expr {
        RhsNode::Symbol { name, kind, .. } => Symbol {
            text: name.clone(),
            kind: *kind,
        },
        RhsNode::Sequence { .. } | RhsNode::Alternation { .. } => {
            let gen = grammar.make_generated_name(context);
            expand_expr_into_lhs(grammar, &gen, Some(expr));
            Symbol {
                text: gen,
                kind: SymbolKind::NonTerminal,
            }
        }
        RhsNode::Optional { inner, .. } => make_optional_symbol(grammar, context, inner),
        RhsNode::KleeneStar { inner, .. } => make_star_symbol(grammar, context, inner),
        RhsNode::KleenePlus { inner, .. } => make_plus_symbol(grammar, context, inner),
    }
}

/// `gen ::= <expr> | ;` — the helper matches `expr` or epsilon.
fn make_optional_symbol(grammar: &mut Grammar, context: &str, expr: &RhsNode) -> Symbol {
    let gen = grammar.make_generated_name(context);
    grammar.add_production(&gen, Vec::new());
    expand_expr_into_lhs(grammar, &gen, Some(expr));
    Symbol {
        text: gen,
        kind: SymbolKind::NonTerminal,
    }
}

/// `gen ::= <expr> gen | ;` — zero or more repetitions of `expr`.
fn make_star_symbol(grammar: &mut Grammar, context: &str, expr: &RhsNode) -> Symbol {
    let gen = grammar.make_generated_name(context);
    grammar.add_production(&gen, Vec::new());
    let inner = ensure_expr_symbol(grammar, &gen, expr);
    grammar.add_production(
        &gen,
        vec![
            inner,
            Symbol {
                text: gen.clone(),
                kind: SymbolKind::NonTerminal,
            },
        ],
    );
    Symbol {
        text: gen,
        kind: SymbolKind::NonTerminal,
    }
}

/// `gen ::= <expr> gen_star` — one or more repetitions of `expr`, built
/// from a single occurrence followed by a star helper over the same
/// expression.
fn make_plus_symbol(grammar: &mut Grammar, context: &str, expr: &RhsNode) -> Symbol {
    let gen = grammar.make_generated_name(context);
    let head = ensure_expr_symbol(grammar, &gen, expr);
    let tail = make_star_symbol(grammar, &gen, expr);
    grammar.add_production(&gen, vec![head, tail]);
    Symbol {
        text: gen,
        kind: SymbolKind::NonTerminal,
    }
}
