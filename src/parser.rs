use crate::{Parser, RawProduction, RhsNode, Scanner, SymbolKind, Token, TokenKind};
use crate::util::Diagnostics;

/// Parses a whole EBNF source file into its raw productions, in the order
/// they appear, plus the lexically first `lhs` encountered (the implicit
/// start symbol, as spec.md §4.2 defines it). Malformed statements are
/// skipped by resyncing to the next `;` or EOF; the rest of the file is
/// still parsed.
pub fn parse_file(src: &str, diagnostics: &mut Diagnostics) -> (Vec<RawProduction>, Option<String>) {
    let mut parser = Parser::new(src);
    let mut raw = Vec::new();
    let mut start_symbol = None;

    loop {
        match parser.peek_kind() {
            TokenKind::Eof => break,
            TokenKind::Invalid => {
                let bad = parser.consume();
                diagnostics.warn(format!("line {}: invalid token '{}'", bad.line, bad.lexeme));
                continue;
            }
            _ => {}
        }

        let lhs_tok = match parser.expect(TokenKind::Ident) {
            Some(tok) => tok,
            None => {
                parser.resync_to_semi();
                continue;
            }
        };

        if parser.expect(TokenKind::ColonEq).is_none() {
            continue;
        }

        let expr = parser.parse_expression();

        if parser.expect(TokenKind::Semi).is_none() {
            continue;
        }

        if start_symbol.is_none() {
            start_symbol = Some(lhs_tok.lexeme.clone());
        }
        raw.push(RawProduction {
            lhs: lhs_tok.lexeme,
            expr,
            line: lhs_tok.line,
        });
    }

    (raw, start_symbol)
}

impl<'s> Parser<'s> {
    pub fn new(src: &'s str) -> Self {
        Self {
            scanner: Scanner::new(src),
            lookahead: None,
        }
    }

    fn ensure(&mut self) {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.scanner.next_token());
        }
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.ensure();
        self.lookahead.as_ref().unwrap().kind
    }

    fn peek_line(&mut self) -> usize {
        self.ensure();
        self.lookahead.as_ref().unwrap().line
    }

    fn consume(&mut self) -> Token {
        self.ensure();
        self.lookahead.take().unwrap()
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        let tok = self.consume();
        if tok.kind != kind {
            eprintln!("[cfg2yacc] line {}: unexpected token", tok.line);
            None
        } else {
            Some(tok)
        }
    }

    /// Discards tokens until (and including) the next `;`, or until EOF,
    /// whatever comes first. Used to recover from a malformed statement
    /// without aborting the whole parse.
    fn resync_to_semi(&mut self) {
        loop {
            let tok = self.consume();
            if matches!(tok.kind, TokenKind::Semi | TokenKind::Eof) {
                break;
            }
        }
    }

    fn parse_expression(&mut self) -> RhsNode {
        let first = self.parse_sequence();
        let line = rhs_line(&first);
        let mut items = vec![first];
        while self.peek_kind() == TokenKind::Bar {
            self.consume();
            items.push(self.parse_sequence());
        }
        RhsNode::Alternation { items, line }
    }

    /// A sequence is built from whatever postfix items actually produced a
    /// node; an item that parsed to nothing (a grouped sub-expression with
    /// a missing `)`, see [Parser::parse_primary]) is silently dropped,
    /// mirroring the original's `nodevec_push` null-check (it never pushes
    /// a null node into the enclosing vector).
    fn parse_sequence(&mut self) -> RhsNode {
        let mut items = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Bar | TokenKind::Semi | TokenKind::RParen | TokenKind::Eof => break,
                _ => {
                    if let Some(node) = self.parse_postfix() {
                        items.push(node);
                    }
                }
            }
        }
        if items.is_empty() {
            let line = self.peek_line();
            return RhsNode::Sequence { items, line };
        }
        let line = rhs_line(&items[0]);
        RhsNode::Sequence { items, line }
    }

    /// Returns `None` only when the underlying primary yielded no node (a
    /// dropped group); any postfix operator following a dropped group is
    /// still consumed so the token stream stays in sync, but there's
    /// nothing left to wrap it around.
    fn parse_postfix(&mut self) -> Option<RhsNode> {
        let mut node = self.parse_primary();
        loop {
            match self.peek_kind() {
                TokenKind::Star => {
                    let op = self.consume();
                    node = node.map(|inner| RhsNode::KleeneStar {
                        inner: Box::new(inner),
                        line: op.line,
                    });
                }
                TokenKind::Plus => {
                    let op = self.consume();
                    node = node.map(|inner| RhsNode::KleenePlus {
                        inner: Box::new(inner),
                        line: op.line,
                    });
                }
                TokenKind::QMark => {
                    let op = self.consume();
                    node = node.map(|inner| RhsNode::Optional {
                        inner: Box::new(inner),
                        line: op.line,
                    });
                }
                _ => break,
            }
        }
        node
    }

    /// `None` only on `'(' expression` with a missing `)`: the partial
    /// sub-expression is freed and no node is produced for that group,
    /// per spec.md's "frees the partial sub-expression and yields no node
    /// for that group" — matching `parse_primary`'s `TOK_LPAREN` arm in
    /// the original, which frees `inner` and sets it to `NULL` on a failed
    /// `parser_expect(p, TOK_RPAREN, ...)`.
    fn parse_primary(&mut self) -> Option<RhsNode> {
        let tok = self.consume();
        match tok.kind {
            TokenKind::Ident => Some(RhsNode::Symbol {
                name: tok.lexeme,
                kind: SymbolKind::NonTerminal,
                line: tok.line,
            }),
            TokenKind::TermName | TokenKind::Literal => Some(RhsNode::Symbol {
                name: tok.lexeme,
                kind: SymbolKind::Terminal,
                line: tok.line,
            }),
            TokenKind::LParen => {
                let inner = self.parse_expression();
                match self.expect(TokenKind::RParen) {
                    Some(_) => Some(inner),
                    None => None,
                }
            }
            _ => {
                eprintln!("[cfg2yacc] line {}: unexpected symbol in right-hand side", tok.line);
                Some(RhsNode::Symbol {
                    name: "/*error*/".to_string(),
                    kind: SymbolKind::Terminal,
                    line: tok.line,
                })
            }
        }
    }
}

fn rhs_line(node: &RhsNode) -> usize {
    match node {
        RhsNode::Symbol { line, .. }
        | RhsNode::Sequence { line, .. }
        | RhsNode::Alternation { line, .. }
        | RhsNode::Optional { line, .. }
        | RhsNode::KleeneStar { line, .. }
        | RhsNode::KleenePlus { line, .. } => *line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alternation_and_records_start_symbol() {
        let mut diag = Diagnostics::new();
        let (raw, start) = parse_file("expr ::= term | expr '+' term ;", &mut diag);
        assert_eq!(raw.len(), 1);
        assert_eq!(start.as_deref(), Some("expr"));
        match &raw[0].expr {
            RhsNode::Alternation { items, .. } => assert_eq!(items.len(), 2),
            other => panic!("expected alternation, got {:?}", other),
        }
    }

    #[test]
    fn empty_sequence_parses_as_epsilon() {
        let mut diag = Diagnostics::new();
        let (raw, _) = parse_file("empty ::= ;", &mut diag);
        match &raw[0].expr {
            RhsNode::Alternation { items, .. } => match &items[0] {
                RhsNode::Sequence { items, .. } => assert!(items.is_empty()),
                other => panic!("expected sequence, got {:?}", other),
            },
            other => panic!("expected alternation, got {:?}", other),
        }
    }

    #[test]
    fn malformed_statement_is_skipped_and_parsing_continues() {
        let mut diag = Diagnostics::new();
        let (raw, _) = parse_file("::= bad ; good ::= 'x' ;", &mut diag);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].lhs, "good");
    }

    #[test]
    fn missing_close_paren_drops_the_group_from_the_enclosing_sequence() {
        // "x ( y ;" - the group opened by '(' is never closed, so it
        // contributes no node at all; only the leading `x` survives in
        // the enclosing sequence.
        let mut parser = Parser::new("x ( y ;");
        let expr = parser.parse_expression();
        match &expr {
            RhsNode::Alternation { items, .. } => {
                assert_eq!(items.len(), 1);
                match &items[0] {
                    RhsNode::Sequence { items, .. } => {
                        assert_eq!(items.len(), 1);
                        match &items[0] {
                            RhsNode::Symbol { name, .. } => assert_eq!(name, "x"),
                            other => panic!("expected symbol x, got {:?}", other),
                        }
                    }
                    other => panic!("expected sequence, got {:?}", other),
                }
            }
            other => panic!("expected alternation, got {:?}", other),
        }
    }

    #[test]
    fn postfix_operators_nest_left_to_right() {
        let mut diag = Diagnostics::new();
        let (raw, _) = parse_file("a ::= b*+ ;", &mut diag);
        match &raw[0].expr {
            RhsNode::Alternation { items, .. } => match &items[0] {
                RhsNode::Sequence { items, .. } => match &items[0] {
                    RhsNode::KleenePlus { inner, .. } => {
                        assert!(matches!(**inner, RhsNode::KleeneStar { .. }))
                    }
                    other => panic!("expected plus, got {:?}", other),
                },
                other => panic!("expected sequence, got {:?}", other),
            },
            other => panic!("expected alternation, got {:?}", other),
        }
    }
}
