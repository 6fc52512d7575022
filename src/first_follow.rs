use std::collections::HashMap;
use std::fmt::Write as _;

use crate::util::{Diagnostics, OrderedSet};
use crate::{Grammar, Production, Symbol, SymbolKind};

const MAX_ITERATIONS: u32 = 1000;

/// NULLABLE/FIRST/FOLLOW sets for every nonterminal in a grammar, computed
/// over a fixed point. Indexed by nonterminal name rather than position so
/// callers never have to reason about `Grammar::nonterminals`' index space
/// directly.
pub struct Analysis {
    pub nullable: HashMap<String, bool>,
    pub first: HashMap<String, OrderedSet>,
    pub follow: HashMap<String, OrderedSet>,
}

impl Analysis {
    fn empty(grammar: &Grammar) -> Self {
        let mut nullable = HashMap::new();
        let mut first = HashMap::new();
        let mut follow = HashMap::new();
        for name in grammar.nonterminals.iter() {
            nullable.insert(name.to_string(), false);
            first.insert(name.to_string(), OrderedSet::new());
            follow.insert(name.to_string(), OrderedSet::new());
        }
        Self {
            nullable,
            first,
            follow,
        }
    }

    pub fn is_nullable(&self, name: &str) -> bool {
        self.nullable.get(name).copied().unwrap_or(false)
    }
}

/// Runs NULLABLE, then FIRST, then FOLLOW to a fixed point (capped at
/// [MAX_ITERATIONS] each, with a warning on the diagnostics list if the cap
/// is hit), then checks every nonterminal with more than one alternative
/// for LL(1) conflicts (FIRST/FIRST overlap, and nullable-alternative vs
/// FOLLOW overlap) and warns about nonterminals with no productions at
/// all. Conflicts and undefined nonterminals are warnings, never errors:
/// the grammar may still be perfectly usable by a GLR or backtracking
/// parser downstream.
pub fn analyze(grammar: &Grammar, diagnostics: &mut Diagnostics) -> Analysis {
    let mut analysis = Analysis::empty(grammar);

    compute_nullable(grammar, &mut analysis.nullable, diagnostics);
    compute_first(grammar, &mut analysis, diagnostics);
    compute_follow(grammar, &mut analysis, diagnostics);

    check_ll1_conflicts(grammar, &analysis, diagnostics);
    report_undefined_nonterminals(grammar, diagnostics);

    analysis
}

fn compute_nullable(grammar: &Grammar, nullable: &mut HashMap<String, bool>, diagnostics: &mut Diagnostics) {
    run_to_fixed_point("NULLABLE", diagnostics, |changed| {
        for p in &grammar.prods {
            if *nullable.get(&p.lhs).unwrap_or(&false) {
                continue;
            }
            let all_nullable = p.rhs.is_empty()
                || p.rhs
                    .iter()
                    .all(|s| s.kind == SymbolKind::NonTerminal && nullable.get(&s.text).copied().unwrap_or(false));
            if all_nullable {
                nullable.insert(p.lhs.clone(), true);
                *changed = true;
            }
        }
    });
}

fn compute_first(grammar: &Grammar, analysis: &mut Analysis, diagnostics: &mut Diagnostics) {
    run_to_fixed_point("FIRST", diagnostics, |changed| {
        for p in &grammar.prods {
            if p.rhs.is_empty() || !analysis.first.contains_key(&p.lhs) {
                continue;
            }
            for sym in &p.rhs {
                match sym.kind {
                    SymbolKind::Terminal => {
                        let set = analysis.first.get_mut(&p.lhs).unwrap();
                        *changed |= set.insert(sym.text.clone());
                        break;
                    }
                    SymbolKind::NonTerminal => {
                        if !analysis.first.contains_key(&sym.text) {
                            break;
                        }
                        let addition: Vec<String> =
                            analysis.first[&sym.text].iter().map(str::to_string).collect();
                        let set = analysis.first.get_mut(&p.lhs).unwrap();
                        for item in addition {
                            *changed |= set.insert(item);
                        }
                        if !analysis.is_nullable(&sym.text) {
                            break;
                        }
                    }
                }
            }
        }
    });
}

fn compute_follow(grammar: &Grammar, analysis: &mut Analysis, diagnostics: &mut Diagnostics) {
    if let Some(start) = &grammar.start_symbol {
        if let Some(set) = analysis.follow.get_mut(start) {
            set.insert("$");
        }
    }

    run_to_fixed_point("FOLLOW", diagnostics, |changed| {
        for p in &grammar.prods {
            if !analysis.follow.contains_key(&p.lhs) {
                continue;
            }
            let mut trailer: Vec<String> =
                analysis.follow[&p.lhs].iter().map(str::to_string).collect();

            for sym in p.rhs.iter().rev() {
                match sym.kind {
                    SymbolKind::Terminal => {
                        trailer = vec![sym.text.clone()];
                    }
                    SymbolKind::NonTerminal => {
                        if !analysis.follow.contains_key(&sym.text) {
                            continue;
                        }
                        let set = analysis.follow.get_mut(&sym.text).unwrap();
                        for item in &trailer {
                            *changed |= set.insert(item.clone());
                        }
                        if analysis.is_nullable(&sym.text) {
                            for item in analysis.first[&sym.text].iter() {
                                if !trailer.contains(&item.to_string()) {
                                    trailer.push(item.to_string());
                                    *changed = true;
                                }
                            }
                        } else {
                            trailer = analysis.first[&sym.text].iter().map(str::to_string).collect();
                        }
                    }
                }
            }
        }
    });
}

fn run_to_fixed_point(label: &str, diagnostics: &mut Diagnostics, mut step: impl FnMut(&mut bool)) {
    let mut iterations = 0;
    loop {
        let mut changed = false;
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            diagnostics.warn(format!(
                "{} computation exceeded {} iterations, stopping",
                label, MAX_ITERATIONS
            ));
            break;
        }
        step(&mut changed);
        if !changed {
            break;
        }
    }
}

/// FIRST of a production's whole right-hand side (not just its lhs's
/// aggregate FIRST set), plus whether that rhs is itself nullable. Used
/// only by the LL(1) conflict check, where each alternative needs its own
/// FIRST rather than the union already stored on the nonterminal.
fn rhs_first(grammar: &Grammar, p: &Production, analysis: &Analysis) -> (OrderedSet, bool) {
    let mut out = OrderedSet::new();
    if p.rhs.is_empty() {
        return (out, true);
    }
    for (k, sym) in p.rhs.iter().enumerate() {
        match sym.kind {
            SymbolKind::Terminal => {
                out.insert(sym.text.clone());
                return (out, false);
            }
            SymbolKind::NonTerminal => {
                let Some(first) = analysis.first.get(&sym.text) else {
                    return (out, false);
                };
                for item in first.iter() {
                    out.insert(item);
                }
                if !analysis.is_nullable(&sym.text) {
                    return (out, false);
                }
                if k == p.rhs.len() - 1 {
                    return (out, true);
                }
            }
        }
    }
    (out, false)
}

fn intersects(a: &OrderedSet, b: &OrderedSet) -> bool {
    a.iter().any(|item| b.contains(item))
}

fn check_ll1_conflicts(grammar: &Grammar, analysis: &Analysis, diagnostics: &mut Diagnostics) {
    for lhs in grammar.nonterminals.iter() {
        let indices: Vec<usize> = grammar
            .prods
            .iter()
            .enumerate()
            .filter(|(_, p)| p.lhs == lhs)
            .map(|(i, _)| i)
            .collect();
        if indices.len() <= 1 {
            continue;
        }

        let follow = &analysis.follow[lhs];
        for (pi, &p_idx) in indices.iter().enumerate() {
            let (first_p, nullable_p) = rhs_first(grammar, &grammar.prods[p_idx], analysis);
            for &q_idx in &indices[pi + 1..] {
                let (first_q, nullable_q) = rhs_first(grammar, &grammar.prods[q_idx], analysis);

                if intersects(&first_p, &first_q) {
                    diagnostics.warn(format!(
                        "{} alternatives {} and {} overlap in FIRST",
                        lhs, p_idx, q_idx
                    ));
                }
                if nullable_p && intersects(&first_q, follow) {
                    diagnostics.warn(format!("{} production {} nullable vs FOLLOW", lhs, p_idx));
                }
                if nullable_q && intersects(&first_p, follow) {
                    diagnostics.warn(format!("{} production {} nullable vs FOLLOW", lhs, q_idx));
                }
            }
        }
    }
}

fn report_undefined_nonterminals(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    for name in grammar.nonterminals.iter() {
        if !grammar.prods.iter().any(|p| p.lhs == name) {
            diagnostics.warn(format!("nonterminal {} has no productions", name));
        }
    }
}

/// Full NULLABLE/FIRST/FOLLOW listing, one section per table, in
/// nonterminal declaration order.
pub fn format_verbose(grammar: &Grammar, analysis: &Analysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NULLABLE:");
    for name in grammar.nonterminals.iter() {
        let _ = writeln!(out, "  {} : {}", name, if analysis.is_nullable(name) { "yes" } else { "no" });
    }
    write_set_section(&mut out, "FIRST sets", grammar, &analysis.first);
    write_set_section(&mut out, "FOLLOW sets", grammar, &analysis.follow);
    out
}

fn write_set_section(out: &mut String, title: &str, grammar: &Grammar, sets: &HashMap<String, OrderedSet>) {
    let _ = writeln!(out, "{}:", title);
    for name in grammar.nonterminals.iter() {
        let items: Vec<&str> = sets.get(name).map(|s| s.iter().collect()).unwrap_or_default();
        let _ = writeln!(out, "  {} : {{{}}}", name, items.join(", "));
    }
}

/// Counts-only report (`--ff-summary`): total FIRST/FOLLOW entries and how
/// many nonterminals are nullable, without dumping every set's contents.
pub fn format_summary(grammar: &Grammar, analysis: &Analysis) -> String {
    let mut out = String::new();
    let n = grammar.nonterminals.len();
    let nullable_count = analysis.nullable.values().filter(|v| **v).count();
    let total_first: usize = analysis.first.values().map(OrderedSet::len).sum();
    let total_follow: usize = analysis.follow.values().map(OrderedSet::len).sum();

    let _ = writeln!(out, "FIRST/FOLLOW summary (counts only):");
    let _ = writeln!(out, "  nonterminals: {}", n);
    let _ = writeln!(out, "  nullable: {}", nullable_count);
    let _ = writeln!(out, "  total FIRST entries: {}", total_first);
    let _ = writeln!(out, "  total FOLLOW entries: {}", total_follow);
    for name in grammar.nonterminals.iter() {
        let first_len = analysis.first.get(name).map(OrderedSet::len).unwrap_or(0);
        let follow_len = analysis.follow.get(name).map(OrderedSet::len).unwrap_or(0);
        let nullable_tag = if analysis.is_nullable(name) { ", NULLABLE" } else { "" };
        let _ = writeln!(out, "  {} -> FIRST:{}, FOLLOW:{}{}", name, first_len, follow_len, nullable_tag);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn nullable_propagates_through_epsilon_productions() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production("s", vec![nt("a"), nt("b")]);
        g.add_production("a", vec![]);
        g.add_production("b", vec![]);

        let mut diag = Diagnostics::new();
        let analysis = analyze(&g, &mut diag);
        assert!(analysis.is_nullable("a"));
        assert!(analysis.is_nullable("b"));
        assert!(analysis.is_nullable("s"));
    }

    #[test]
    fn first_set_of_a_nonterminal_includes_leading_terminal() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production("s", vec![term("NUM")]);

        let mut diag = Diagnostics::new();
        let analysis = analyze(&g, &mut diag);
        assert!(analysis.first["s"].contains("NUM"));
    }

    #[test]
    fn follow_set_of_start_symbol_contains_end_marker() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production("s", vec![term("NUM")]);

        let mut diag = Diagnostics::new();
        let analysis = analyze(&g, &mut diag);
        assert!(analysis.follow["s"].contains("$"));
    }

    #[test]
    fn overlapping_first_sets_produce_a_diagnostic() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production("s", vec![term("NUM"), term("PLUS")]);
        g.add_production("s", vec![term("NUM")]);

        let mut diag = Diagnostics::new();
        analyze(&g, &mut diag);
        assert!(diag.iter().any(|d| d.message.contains("overlap in FIRST")));
    }

    #[test]
    fn nonterminal_with_no_productions_is_reported() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production("s", vec![nt("missing")]);

        let mut diag = Diagnostics::new();
        analyze(&g, &mut diag);
        assert!(diag.iter().any(|d| d.message.contains("missing has no productions")));
    }
}
