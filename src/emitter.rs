use std::fmt::Write as _;

use regex::escape;

use crate::{Grammar, SymbolKind};

/// Emits the yacc-style parser specification: prologue, `%token`
/// declarations, `%start`, the grouped rule section (one alternative per
/// line, each with a dual-mode JSON/plain semantic action), and the
/// epilogue (`yyerror`, `main`). Every nonterminal's alternatives are
/// grouped together under one `lhs:` header, in first-appearance order.
pub fn emit_parser_spec(grammar: &Grammar) -> String {
    let mut out = String::new();
    emit_prologue(&mut out);
    emit_tokens(&mut out, grammar);
    emit_start(&mut out, grammar);
    emit_rules(&mut out, grammar);
    emit_epilogue(&mut out);
    out
}

fn emit_prologue(out: &mut String) {
    out.push_str("%{\n#include \"ast.h\"\n#include <stdio.h>\n#include <stdlib.h>\n#include <string.h>\n");
    out.push_str("extern int yylex(void);\n");
    out.push_str("extern int yyparse(void);\n");
    out.push_str("void yyerror(const char *msg);\n");
    out.push_str("static int parse_step = 0;\n");
    out.push_str("static int json_mode = 0;\n");
    out.push_str("%}\n\n");
    out.push_str("%define parse.error verbose\n\n");
}

fn emit_tokens(out: &mut String, grammar: &Grammar) {
    let tokens: Vec<&str> = grammar
        .terminals
        .iter()
        .filter(|t| !is_literal_token(t))
        .collect();
    if tokens.is_empty() {
        return;
    }
    let _ = writeln!(out, "%token {}\n", tokens.join(" "));
}

fn emit_start(out: &mut String, grammar: &Grammar) {
    if let Some(start) = &grammar.start_symbol {
        let _ = writeln!(out, "%start {}\n", start);
    }
}

fn emit_rules(out: &mut String, grammar: &Grammar) {
    let mut groups: Vec<&str> = Vec::new();
    for prod in &grammar.prods {
        if !groups.contains(&prod.lhs.as_str()) {
            groups.push(&prod.lhs);
        }
    }

    out.push_str("%%\n");
    for lhs in groups {
        let _ = writeln!(out, "{}:", lhs);
        let mut first_alt = true;
        for prod in grammar.prods.iter().filter(|p| p.lhs == lhs) {
            out.push_str(if first_alt { "    " } else { "  | " });
            first_alt = false;

            let rhs_text: Vec<&str> = prod.rhs.iter().map(|s| s.text.as_str()).collect();
            if rhs_text.is_empty() {
                out.push_str("/* empty */");
            } else {
                out.push_str(&rhs_text.join(" "));
            }
            emit_action(out, lhs, &rhs_text);
            out.push('\n');
        }
        out.push_str("  ;\n\n");
    }
}

fn emit_action(out: &mut String, lhs: &str, rhs: &[&str]) {
    let arrow = if rhs.is_empty() {
        format!("{} -> \u{3b5}", lhs)
    } else {
        format!("{} -> {}", lhs, rhs.join(" "))
    };
    let plain = if rhs.is_empty() {
        format!("  {} -> \u{3b5}", lhs)
    } else {
        format!("  {} -> {}", lhs, rhs.join(" "))
    };

    out.push_str(" {\n");
    out.push_str("        if (json_mode) {\n");
    let _ = writeln!(
        out,
        "            printf(\"%s{{\\\"step\\\": %d, \\\"rule\\\": \\\"{}\\\"}}\",",
        arrow
    );
    out.push_str("                   parse_step > 0 ? \",\\n  \" : \"\\n  \", ++parse_step);\n");
    out.push_str("        } else {\n");
    let _ = writeln!(out, "            printf(\"{}\\n\");", plain);
    out.push_str("        }\n");
    out.push_str("        $$ = 0;\n");
    out.push_str("    }");
}

fn emit_epilogue(out: &mut String) {
    out.push_str("%%\n\n");
    out.push_str("void yyerror(const char *s) {\n");
    out.push_str("    if (json_mode) {\n");
    out.push_str("        printf(\"{\\\"error\\\": \\\"%s\\\", \\\"step\\\": %d}\\n\", s, parse_step);\n");
    out.push_str("    } else {\n");
    out.push_str("        fprintf(stderr, \"Parse error: %s\\n\", s);\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");
    out.push_str("int main(int argc, char *argv[]) {\n");
    out.push_str("    if (argc > 1 && strcmp(argv[1], \"--json\") == 0) {\n");
    out.push_str("        json_mode = 1;\n");
    out.push_str("        printf(\"{\\\"parse_tree\\\": [\");\n");
    out.push_str("    } else {\n");
    out.push_str("        printf(\"Parse Tree:\\n\");\n");
    out.push_str("    }\n");
    out.push_str("    int result = yyparse();\n");
    out.push_str("    if (json_mode) {\n");
    out.push_str("        printf(\"], \\\"success\\\": %s, \\\"steps\\\": %d}\\n\",\n");
    out.push_str("               result == 0 ? \"true\" : \"false\", parse_step);\n");
    out.push_str("    } else {\n");
    out.push_str("        if (result == 0) {\n");
    out.push_str("            printf(\"Input parsed successfully!\\n\");\n");
    out.push_str("        } else {\n");
    out.push_str("            printf(\"Parse failed!\\n\");\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("    return result;\n");
    out.push_str("}\n");
}

/// Derives the flex stub's generated-header include name from the yacc
/// output path: take the file name, replace its extension (or append, if
/// there is none) with `.tab.h`. Falls back to `y.tab.h` when there's no
/// yacc output path to derive from at all.
pub fn derive_header_name(out_y_path: Option<&str>) -> String {
    let Some(path) = out_y_path else {
        return "y.tab.h".to_string();
    };
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(dot) => format!("{}.tab.h", &base[..dot]),
        None => format!("{}.tab.h", base),
    }
}

/// Emits the lex-style tokenizer specification: one pattern per literal
/// token (with regex metacharacters escaped), `NUMBER`/`IDENT`-or-`ID`
/// canonical patterns when those terminal names are present, a keyword
/// pattern for every other ALL_CAPS terminal, and a whitespace-skip plus
/// single-character fallback rule.
pub fn emit_lexer_spec(grammar: &Grammar, header_name: &str) -> String {
    let mut out = String::new();
    out.push_str("%{\n");
    let _ = writeln!(out, "#include \"{}\"", header_name);
    out.push_str("#include <stdlib.h>\n%}\n\n");
    out.push_str("%option noyywrap\n\n");
    out.push_str("%%\n\n");

    for tok in grammar.terminals.iter() {
        if let Some(rule) = literal_rule(tok) {
            emit_literal_rule(&mut out, &rule);
        }
    }

    let has_number = grammar.terminals.contains("NUMBER");
    let has_ident = grammar.terminals.contains("IDENT") || grammar.terminals.contains("ID");
    if has_number {
        out.push_str("[0-9]+     return NUMBER;\n");
    }
    if has_ident {
        if grammar.terminals.contains("ID") {
            out.push_str("[A-Za-z_][A-Za-z0-9_]*  return ID;\n");
        } else {
            out.push_str("[A-Za-z_][A-Za-z0-9_]*  return IDENT;\n");
        }
    }

    for tok in grammar.terminals.iter() {
        if is_all_caps(tok) && tok != "NUMBER" && tok != "IDENT" && tok != "ID" {
            let _ = writeln!(out, "{}       return {};", tok, tok);
        }
    }

    out.push_str("[ \\t\\r\\n]+  /* skip whitespace */;\n");
    out.push_str(".         return yytext[0];\n\n");
    out.push_str("%%\n\n");
    out.push_str("/* user code section */\n");
    out
}

/// The flex pattern and the char-literal text for a `return '...';`
/// statement, for one literal terminal.
struct LiteralRule {
    pattern: String,
    ret: String,
}

/// Mirrors `write_flex_stub`'s handling of a quoted literal terminal: the
/// pattern is normally the literal's first character after the opening
/// quote (regex-escaped), but when that character is a backslash it's the
/// start of an escape sequence (`\n`, `\t`, `\r`, `\\`, or a generic `\X`),
/// which must be decoded to the control character it names rather than
/// treated as a literal backslash.
fn literal_rule(tok: &str) -> Option<LiteralRule> {
    if !is_literal_token(tok) {
        return None;
    }
    let len = tok.len();
    if len < 3 {
        return None;
    }
    let bytes = tok.as_bytes();
    let c = bytes[1] as char;
    if c == '\\' && len >= 4 {
        let esc = bytes[2] as char;
        let (pattern, ret) = match esc {
            'n' => ("\\n".to_string(), "\\n".to_string()),
            't' => ("\\t".to_string(), "\\t".to_string()),
            'r' => ("\\r".to_string(), "\\r".to_string()),
            '\\' => ("\\\\".to_string(), "\\\\".to_string()),
            other => (format!("\\{}", other), other.to_string()),
        };
        return Some(LiteralRule { pattern, ret });
    }
    let pattern = escape(&c.to_string());
    Some(LiteralRule { pattern, ret: c.to_string() })
}

fn emit_literal_rule(out: &mut String, rule: &LiteralRule) {
    let _ = writeln!(out, "{}          return '{}';", rule.pattern, rule.ret);
}

fn is_literal_token(sym: &str) -> bool {
    sym.len() >= 2 && sym.starts_with('\'') && sym.ends_with('\'')
}

fn is_all_caps(sym: &str) -> bool {
    let mut seen_alpha = false;
    for c in sym.chars() {
        if c.is_ascii_alphabetic() {
            seen_alpha = true;
            if !c.is_ascii_uppercase() {
                return false;
            }
        }
    }
    seen_alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    #[test]
    fn derives_tab_h_name_from_yacc_output_path() {
        assert_eq!(derive_header_name(Some("out/parser.y")), "parser.tab.h");
        assert_eq!(derive_header_name(Some("parser")), "parser.tab.h");
        assert_eq!(derive_header_name(None), "y.tab.h");
    }

    #[test]
    fn token_declaration_skips_literal_tokens() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production(
            "s",
            vec![
                Symbol {
                    text: "NUMBER".to_string(),
                    kind: SymbolKind::Terminal,
                },
                Symbol {
                    text: "'+'".to_string(),
                    kind: SymbolKind::Terminal,
                },
            ],
        );
        let spec = emit_parser_spec(&g);
        assert!(spec.contains("%token NUMBER"));
        assert!(!spec.contains("%token NUMBER '+'"));
    }

    #[test]
    fn rules_are_grouped_by_lhs_in_first_appearance_order() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production(
            "s",
            vec![Symbol {
                text: "a".to_string(),
                kind: SymbolKind::NonTerminal,
            }],
        );
        g.add_production("a", vec![]);
        g.add_production(
            "s",
            vec![Symbol {
                text: "NUM".to_string(),
                kind: SymbolKind::Terminal,
            }],
        );
        let spec = emit_parser_spec(&g);
        let s_pos = spec.find("s:").unwrap();
        let a_pos = spec.find("a:").unwrap();
        assert!(s_pos < a_pos);
        assert_eq!(spec.matches("s:").count(), 1);
    }

    #[test]
    fn lexer_spec_escapes_regex_metacharacters_in_literals() {
        let mut g = Grammar::new(Vec::new(), None);
        g.add_production(
            "s",
            vec![Symbol {
                text: "'*'".to_string(),
                kind: SymbolKind::Terminal,
            }],
        );
        let spec = emit_lexer_spec(&g, "y.tab.h");
        assert!(spec.contains("\\*          return '*';"));
    }

    #[test]
    fn newline_escape_literal_emits_a_decoded_newline_rule() {
        let mut g = Grammar::new(Vec::new(), None);
        g.add_production(
            "s",
            vec![Symbol {
                text: "'\\n'".to_string(),
                kind: SymbolKind::Terminal,
            }],
        );
        let spec = emit_lexer_spec(&g, "y.tab.h");
        assert!(spec.contains("\\n          return '\\n';"));
        assert!(!spec.contains("return '\\\\'"));
    }

    #[test]
    fn json_mode_action_payload_is_well_formed_once_interpolated() {
        let mut g = Grammar::new(Vec::new(), Some("s".to_string()));
        g.add_production(
            "s",
            vec![Symbol {
                text: "NUM".to_string(),
                kind: SymbolKind::Terminal,
            }],
        );
        let spec = emit_parser_spec(&g);
        let line = spec
            .lines()
            .find(|l| l.contains("\\\"rule\\\""))
            .expect("a json-mode rule line");
        // The emitted C string literal escapes quotes for the C compiler;
        // undo that escaping and substitute the two printf placeholders the
        // way the generated parser would at runtime, then check the result
        // actually parses as JSON.
        let unescaped = line
            .trim()
            .trim_start_matches("printf(\"")
            .trim_end_matches("\",")
            .replace("\\\"", "\"")
            .replacen("%s", "\n  ", 1)
            .replacen("%d", "1", 1);
        let value: serde_json::Value =
            serde_json::from_str(&unescaped).expect("interpolated rule payload should be valid json");
        assert_eq!(value["rule"], "s -> NUM");
    }

    #[test]
    fn lexer_spec_prefers_id_over_ident_when_both_declared() {
        let mut g = Grammar::new(Vec::new(), None);
        g.add_production(
            "s",
            vec![
                Symbol {
                    text: "IDENT".to_string(),
                    kind: SymbolKind::Terminal,
                },
                Symbol {
                    text: "ID".to_string(),
                    kind: SymbolKind::Terminal,
                },
            ],
        );
        let spec = emit_lexer_spec(&g, "y.tab.h");
        assert!(spec.contains("return ID;"));
        assert!(!spec.contains("return IDENT;"));
    }
}
