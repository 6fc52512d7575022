use crate::util::Diagnostics;
use crate::{Grammar, Production, Symbol, SymbolKind};

/// One nonterminal's production group while normalisation is in progress.
/// `lhs` duplicates `items[*].lhs` but is kept distinct so a group for a
/// brand new helper nonterminal can exist before it owns any productions.
struct NontermGroup {
    lhs: String,
    items: Vec<Production>,
}

/// Runs the left-recursion elimination passes against a grammar's current
/// BNF production list (normally the output of [crate::expander::expand_ebnf]).
/// Left factoring is available but never applied by [Normalizer::run]; call
/// [Normalizer::apply_left_factoring] explicitly if it's wanted.
pub struct Normalizer;

impl Normalizer {
    /// Eliminates indirect left recursion via Paull's algorithm, then
    /// immediate left recursion, nonterminal by nonterminal in the order
    /// they were first registered. Substitution against an already-normalised
    /// nonterminal is restricted to the grammar's *original* nonterminals
    /// (never against a helper introduced by this same pass) — the guard
    /// that keeps this terminating on EBNF-derived grammars.
    pub fn run(grammar: &mut Grammar, diagnostics: &mut Diagnostics) {
        let mut groups = group_by_lhs(grammar);
        let original_count = groups.len();

        diagnostics.warn(format!(
            "normalizing {} nonterminals, {} productions",
            original_count,
            groups.iter().map(|g| g.items.len()).sum::<usize>()
        ));

        let mut i = 0;
        while i < groups.len() {
            if i < 50 || i % 200 == 0 {
                diagnostics.warn(format!(
                    "normalizing {} ({} prods) [i={}/{}]",
                    groups[i].lhs,
                    groups[i].items.len(),
                    i + 1,
                    groups.len()
                ));
            }
            let limit = original_count.min(i);
            for j in 0..limit {
                substitute_indirect_left_recursion(&mut groups, i, j);
            }
            eliminate_immediate_left_recursion(grammar, &mut groups, i);
            i += 1;
        }

        rebuild_grammar(grammar, &groups);
    }

    /// Runs a single left-factoring pass over the grammar's current
    /// productions: for each nonterminal with two or more alternatives
    /// sharing a common symbol prefix, factors the longest common prefix
    /// out into a fresh helper nonterminal. Disabled by default (see
    /// [Normalizer::run]) because on some EBNF-derived grammars it
    /// generates helpers without ever converging; exposed here for callers
    /// that want it on a grammar small enough to make that safe.
    pub fn apply_left_factoring(grammar: &mut Grammar) {
        let mut groups = group_by_lhs(grammar);
        let mut i = 0;
        while i < groups.len() {
            left_factor_one(grammar, &mut groups, i);
            i += 1;
        }
        rebuild_grammar(grammar, &groups);
    }
}

fn group_by_lhs(grammar: &Grammar) -> Vec<NontermGroup> {
    let mut groups: Vec<NontermGroup> = grammar
        .nonterminals
        .iter()
        .map(|name| NontermGroup {
            lhs: name.to_string(),
            items: Vec::new(),
        })
        .collect();

    for prod in &grammar.prods {
        match groups.iter_mut().find(|g| g.lhs == prod.lhs) {
            Some(group) => group.items.push(prod.clone()),
            None => groups.push(NontermGroup {
                lhs: prod.lhs.clone(),
                items: vec![prod.clone()],
            }),
        }
    }
    groups
}

fn rebuild_grammar(grammar: &mut Grammar, groups: &[NontermGroup]) {
    grammar.clear_productions();
    for group in groups {
        for prod in &group.items {
            grammar.add_production(&prod.lhs, prod.rhs.clone());
        }
    }
}

fn starts_with_nonterm(prod: &Production, name: &str) -> bool {
    matches!(prod.rhs.first(), Some(s) if s.kind == SymbolKind::NonTerminal && s.text == name)
}

/// Rewrites `Ai`'s productions of the form `Ai -> Aj rest` into one
/// `Ai -> gamma rest` production per alternative `gamma` of `Aj`, leaving
/// every other production of `Ai` untouched. `j` is assumed `< i` so the
/// two borrows never alias.
fn substitute_indirect_left_recursion(groups: &mut [NontermGroup], i: usize, j: usize) {
    let (left, right) = groups.split_at_mut(i);
    let ai = &mut right[0];
    let aj = &left[j];

    let mut result = Vec::with_capacity(ai.items.len());
    for p in &ai.items {
        if starts_with_nonterm(p, &aj.lhs) {
            let tail = &p.rhs[1..];
            for q in &aj.items {
                let mut rhs = Vec::with_capacity(q.rhs.len() + tail.len());
                rhs.extend(q.rhs.iter().cloned());
                rhs.extend(tail.iter().cloned());
                result.push(Production {
                    lhs: ai.lhs.clone(),
                    rhs,
                });
            }
        } else {
            result.push(p.clone());
        }
    }
    ai.items = result;
}

/// Splits `Ai`'s alternatives into left-recursive ones (`alpha`, of the
/// form `Ai -> Ai rest`) and the rest (`beta`), then rewrites:
/// `Ai -> beta Ai'` for each beta (or just `Ai -> Ai'` if there are no
/// betas) and `Ai' -> rest Ai' | ` for each alpha's rest. A no-op if `Ai`
/// has no directly left-recursive alternative.
fn eliminate_immediate_left_recursion(grammar: &mut Grammar, groups: &mut Vec<NontermGroup>, i: usize) {
    let lhs = groups[i].lhs.clone();
    let mut alphas = Vec::new();
    let mut betas = Vec::new();
    for p in groups[i].items.drain(..) {
        if starts_with_nonterm(&p, &lhs) {
            alphas.push(p);
        } else {
            betas.push(p);
        }
    }

    if alphas.is_empty() {
        groups[i].items = betas;
        return;
    }

    let helper = grammar.make_generated_name(&lhs);
    let helper_symbol = Symbol {
        text: helper.clone(),
        kind: SymbolKind::NonTerminal,
    };

    let mut new_items = Vec::new();
    if betas.is_empty() {
        new_items.push(Production {
            lhs: lhs.clone(),
            rhs: vec![helper_symbol.clone()],
        });
    } else {
        for beta in betas {
            let mut rhs = beta.rhs;
            rhs.push(helper_symbol.clone());
            new_items.push(Production { lhs: lhs.clone(), rhs });
        }
    }
    groups[i].items = new_items;

    let mut helper_items = Vec::new();
    for alpha in &alphas {
        if alpha.rhs.len() <= 1 {
            continue;
        }
        let mut rhs: Vec<Symbol> = alpha.rhs[1..].to_vec();
        rhs.push(helper_symbol.clone());
        helper_items.push(Production {
            lhs: helper.clone(),
            rhs,
        });
    }
    helper_items.push(Production {
        lhs: helper.clone(),
        rhs: Vec::new(),
    });

    groups.push(NontermGroup {
        lhs: helper,
        items: helper_items,
    });
}

/// Factors one nonterminal's alternatives by their longest shared symbol
/// prefix, if at least two alternatives share a first symbol. Returns
/// `false` (a no-op) if there's nothing to factor. Mirrors
/// `apply_left_factoring` in the original tool, which picks the *first*
/// first-symbol value with two or more occurrences rather than the
/// largest group.
fn left_factor_one(grammar: &mut Grammar, groups: &mut Vec<NontermGroup>, i: usize) -> bool {
    if groups[i].items.len() < 2 {
        return false;
    }

    let mut group_idx: Vec<usize> = Vec::new();
    {
        let items = &groups[i].items;
        'outer: for (idx, p) in items.iter().enumerate() {
            if p.rhs.is_empty() {
                continue;
            }
            let mut matches = vec![idx];
            for (jdx, q) in items.iter().enumerate().skip(idx + 1) {
                if q.rhs.is_empty() {
                    continue;
                }
                if q.rhs[0] == p.rhs[0] {
                    matches.push(jdx);
                }
            }
            if matches.len() >= 2 {
                group_idx = matches;
                break 'outer;
            }
        }
    }
    if group_idx.is_empty() {
        return false;
    }

    let lhs = groups[i].lhs.clone();
    let helper = grammar.make_generated_name(&lhs);

    let prefix_len = {
        let items = &groups[i].items;
        let mut lcp = group_idx
            .iter()
            .map(|&idx| items[idx].rhs.len())
            .min()
            .unwrap_or(0);
        let first = &items[group_idx[0]];
        let mut pos = 0;
        while pos < lcp {
            let sym = &first.rhs[pos];
            if group_idx
                .iter()
                .all(|&idx| items[idx].rhs[pos] == *sym)
            {
                pos += 1;
            } else {
                break;
            }
        }
        lcp = pos;
        lcp
    };

    let mut helper_items = Vec::new();
    for &idx in &group_idx {
        let rhs = &groups[i].items[idx].rhs;
        let remainder = if rhs.len() > prefix_len {
            rhs[prefix_len..].to_vec()
        } else {
            Vec::new()
        };
        helper_items.push(Production {
            lhs: helper.clone(),
            rhs: remainder,
        });
    }

    let mut new_items = Vec::new();
    for (idx, p) in groups[i].items.iter().enumerate() {
        if !group_idx.contains(&idx) {
            new_items.push(p.clone());
        }
    }
    let mut factored_rhs: Vec<Symbol> = groups[i].items[group_idx[0]].rhs[..prefix_len].to_vec();
    factored_rhs.push(Symbol {
        text: helper.clone(),
        kind: SymbolKind::NonTerminal,
    });
    new_items.push(Production { lhs, rhs: factored_rhs });

    groups[i].items = new_items;
    groups.push(NontermGroup {
        lhs: helper,
        items: helper_items,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Diagnostics;

    fn nt(name: &str) -> Symbol {
        Symbol {
            text: name.to_string(),
            kind: SymbolKind::NonTerminal,
        }
    }
    fn term(name: &str) -> Symbol {
        Symbol {
            text: name.to_string(),
            kind: SymbolKind::Terminal,
        }
    }

    #[test]
    fn removes_immediate_left_recursion() {
        // expr -> expr PLUS term | term
        let mut g = Grammar::new(Vec::new(), Some("expr".to_string()));
        g.add_production("expr", vec![nt("expr"), term("PLUS"), nt("term")]);
        g.add_production("expr", vec![nt("term")]);
        g.add_production("term", vec![term("NUM")]);

        let mut diag = Diagnostics::new();
        Normalizer::run(&mut g, &mut diag);

        assert!(!g.prods.iter().any(|p| starts_with_nonterm(p, "expr")));
        let helper = g
            .prods
            .iter()
            .find(|p| p.lhs == "expr" && p.rhs.len() == 2)
            .map(|p| p.rhs[1].text.clone())
            .expect("expr -> term expr' production");
        let helper_prods: Vec<_> = g.prods.iter().filter(|p| p.lhs == helper).collect();
        assert!(helper_prods.iter().any(|p| p.rhs.is_empty()));
        assert!(helper_prods
            .iter()
            .any(|p| p.rhs.len() == 3 && p.rhs[2].text == helper));
    }

    #[test]
    fn removes_indirect_left_recursion_through_one_level() {
        // a -> b x
        // b -> a y | z
        let mut g = Grammar::new(Vec::new(), Some("a".to_string()));
        g.add_production("a", vec![nt("b"), term("X")]);
        g.add_production("b", vec![nt("a"), term("Y")]);
        g.add_production("b", vec![term("Z")]);

        let mut diag = Diagnostics::new();
        Normalizer::run(&mut g, &mut diag);

        assert!(!g.prods.iter().any(|p| p.lhs == "a" && starts_with_nonterm(p, "a")));
        assert!(!g.prods.iter().any(|p| p.lhs == "b" && starts_with_nonterm(p, "b")));
        assert!(!leftmost_cycle_exists(&g));
    }

    /// Builds the "lhs can leftmost-derive starting with this nonterminal"
    /// graph and checks it's acyclic, i.e. no nonterminal can leftmost-derive
    /// itself one or more steps out — the actual invariant spec.md §3
    /// requires after normalisation, as opposed to the narrower (and not
    /// universally true, even for a textbook-correct Paull's algorithm run)
    /// claim that no single production's rhs literally starts with some
    /// specific other nonterminal.
    fn leftmost_cycle_exists(g: &Grammar) -> bool {
        use std::collections::HashMap;
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        for p in &g.prods {
            if let Some(s) = p.rhs.first() {
                if s.kind == SymbolKind::NonTerminal {
                    edges.entry(p.lhs.as_str()).or_default().push(s.text.as_str());
                }
            }
        }
        for start in g.nonterminals.iter() {
            let mut stack = vec![start];
            let mut seen = std::collections::HashSet::new();
            while let Some(node) = stack.pop() {
                if let Some(next) = edges.get(node) {
                    for &n in next {
                        if n == start {
                            return true;
                        }
                        if seen.insert(n) {
                            stack.push(n);
                        }
                    }
                }
            }
        }
        false
    }

    #[test]
    fn left_factoring_is_opt_in_and_shares_common_prefix() {
        let mut g = Grammar::new(Vec::new(), Some("stmt".to_string()));
        g.add_production("stmt", vec![term("IF"), nt("expr"), term("THEN")]);
        g.add_production("stmt", vec![term("IF"), nt("expr"), term("ELSE")]);

        Normalizer::apply_left_factoring(&mut g);

        let stmt_prods: Vec<_> = g.prods.iter().filter(|p| p.lhs == "stmt").collect();
        assert_eq!(stmt_prods.len(), 1);
        assert_eq!(stmt_prods[0].rhs.len(), 3);
        let helper = &stmt_prods[0].rhs[2].text;
        let helper_prods: Vec<_> = g.prods.iter().filter(|p| &p.lhs == helper).collect();
        assert_eq!(helper_prods.len(), 2);
    }
}
