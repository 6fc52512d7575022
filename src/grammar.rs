use crate::{Grammar, Production, RawProduction, Symbol, SymbolKind};
use crate::util::OrderedSet;

impl Grammar {
    pub fn new(raw: Vec<RawProduction>, start_symbol: Option<String>) -> Self {
        Self {
            start_symbol,
            raw,
            prods: Vec::new(),
            nonterminals: OrderedSet::new(),
            terminals: OrderedSet::new(),
            gen_counter: 0,
        }
    }

    pub fn register_symbol(&mut self, name: &str, kind: SymbolKind) {
        match kind {
            SymbolKind::NonTerminal => {
                self.nonterminals.insert(name);
            }
            SymbolKind::Terminal => {
                self.terminals.insert(name);
            }
        }
    }

    pub fn is_terminal_name(&self, name: &str) -> bool {
        self.terminals.contains(name)
    }

    pub fn is_nonterminal_name(&self, name: &str) -> bool {
        self.nonterminals.contains(name)
    }

    /// Appends one BNF production, registering its lhs and every rhs
    /// symbol in the terminal/nonterminal name tables. An empty `rhs`
    /// encodes epsilon.
    pub fn add_production(&mut self, lhs: &str, rhs: Vec<Symbol>) {
        for symbol in &rhs {
            self.register_symbol(&symbol.text, symbol.kind);
        }
        self.register_symbol(lhs, SymbolKind::NonTerminal);
        self.prods.push(Production {
            lhs: lhs.to_string(),
            rhs,
        });
    }

    /// Drops every current production and both name tables. Every pass
    /// that rewrites the production list (the expander, the normalizer)
    /// calls this first and repopulates from scratch via
    /// [Grammar::add_production], which is what keeps the name tables in
    /// sync with whatever is actually reachable after the rewrite.
    pub fn clear_productions(&mut self) {
        self.prods.clear();
        self.nonterminals = OrderedSet::new();
        self.terminals = OrderedSet::new();
    }

    /// Produces a fresh nonterminal name derived from `base`, guaranteed
    /// never to collide with one generated earlier in this grammar's
    /// lifetime. Falls back to the stem `"gen"` if `base` is empty.
    pub fn make_generated_name(&mut self, base: &str) -> String {
        let stem = if base.is_empty() { "gen" } else { base };
        self.gen_counter += 1;
        format!("{}__gen_{}", stem, self.gen_counter)
    }
}
