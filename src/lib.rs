//! cfg2yacc turns a human-authored EBNF grammar description into a pair of
//! inputs for a classical LALR parser-generator toolchain: a yacc-style
//! parser specification and a lex-style tokenizer specification.
//!
//! The crate accepts expressive EBNF (alternation, grouping, `?`, `*`, `+`)
//! and lowers it to pure BNF suitable for bottom-up parsing, with indirect
//! left recursion removed ([normalizer::Normalizer]), NULLABLE/FIRST/FOLLOW
//! sets computed over a fixed point ([first_follow]), and LL(1) conflicts
//! diagnosed along the way.
//!
//! # Pipeline
//!
//! ```text
//! source text -> Scanner -> Parser -> Grammar(raw)
//!             -> expander::expand -> Grammar(BNF)
//!             -> normalizer::Normalizer -> Grammar(LR-friendly)
//!             -> first_follow::analyze -> NULLABLE/FIRST/FOLLOW + diagnostics
//!             -> emitter::emit -> parser spec text + tokenizer spec text
//! ```
//!
//! [pipeline::run] ties every stage together; the `cfg2yacc` binary is a
//! thin CLI wrapper around it.
mod error;
pub mod emitter;
pub mod expander;
pub mod first_follow;
pub mod grammar;
pub mod normalizer;
mod parser;
pub mod pipeline;
mod scanner;
pub mod util;

use std::fmt::{Display, Formatter};

/// Whether a [Symbol] refers to a terminal (token) or a nonterminal (rule).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

/// A reference to a terminal or nonterminal appearing in a production's
/// right-hand side. Two symbols are equal iff both `text` and `kind` match.
/// Immutable once created.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol {
    pub text: String,
    pub kind: SymbolKind,
}

/// The EBNF right-hand-side expression tree, as produced by [parser::Parser].
/// Every variant carries the source line it was parsed from, for
/// diagnostics. Owned strictly by its parent; a whole tree is owned by a
/// [RawProduction].
#[derive(Debug, Clone)]
pub enum RhsNode {
    Symbol {
        name: String,
        kind: SymbolKind,
        line: usize,
    },
    /// Ordered concatenation. An empty vec denotes epsilon.
    Sequence { items: Vec<RhsNode>, line: usize },
    /// Choice among alternatives.
    Alternation { items: Vec<RhsNode>, line: usize },
    Optional { inner: Box<RhsNode>, line: usize },
    KleeneStar { inner: Box<RhsNode>, line: usize },
    KleenePlus { inner: Box<RhsNode>, line: usize },
}

/// The untouched EBNF form of a single `lhs ::= expr ;` statement.
#[derive(Debug, Clone)]
pub struct RawProduction {
    pub lhs: String,
    pub expr: RhsNode,
    pub line: usize,
}

/// A single BNF production. An empty `rhs` encodes epsilon. This is the
/// only form fed to the FIRST/FOLLOW engine and to the emitter.
#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<Symbol>,
}

/// The central ledger: owns the raw EBNF productions, the current
/// normalised BNF production list, and the interned terminal/nonterminal
/// name sets. Every pass that rewrites [Grammar::prods] clears it and
/// rebuilds it in a single operation, preserving insertion order (see
/// [grammar]).
pub struct Grammar {
    pub start_symbol: Option<String>,
    pub raw: Vec<RawProduction>,
    pub prods: Vec<Production>,
    pub nonterminals: util::OrderedSet,
    pub terminals: util::OrderedSet,
    gen_counter: u64,
}

/// Scanner token kinds. See [scanner] for lexical rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    TermName,
    Literal,
    ColonEq,
    Semi,
    Bar,
    LParen,
    RParen,
    Star,
    Plus,
    QMark,
    Eof,
    Invalid,
}

/// One scanned token: its kind, its lexeme (quotes retained for
/// [TokenKind::Literal]), and the source line it started on.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

/// Byte-oriented lexical scanner over EBNF source. Tokens are produced
/// lazily, one at a time, as [parser::Parser] asks for them.
pub struct Scanner<'s> {
    src: &'s [u8],
    pos: usize,
    line: usize,
}

/// One-token-lookahead recursive-descent parser over the scanner's output.
/// Produces [RawProduction]s; never mutates them once built. On an error
/// path it frees any partially constructed subtree simply by dropping it.
pub struct Parser<'s> {
    scanner: Scanner<'s>,
    lookahead: Option<Token>,
}

/// Error returned when the CLI cannot complete: bad arguments, or an
/// unreadable input / unopenable output file. The only error type that
/// aborts the pipeline; every other condition is a warning routed through
/// [util::Diagnostics].
#[derive(Debug)]
pub enum CliError {
    BadArgs(String),
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Terminal => write!(f, "terminal"),
            SymbolKind::NonTerminal => write!(f, "nonterminal"),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
