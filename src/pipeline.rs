use std::fs;

use crate::util::Diagnostics;
use crate::{emitter, first_follow, normalizer::Normalizer, parser, CliError, Grammar};

/// Which FIRST/FOLLOW report, if any, to produce alongside the two output
/// files. Mirrors the `--no-ff`/`--ff-summary` CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstFollowMode {
    Full,
    Summary,
    Skip,
}

/// One full run's output: the parser spec text, the tokenizer spec text,
/// the optional FIRST/FOLLOW report text, and every diagnostic collected
/// along the way (in emission order, across all stages).
pub struct RunOutput {
    pub parser_spec: String,
    pub lexer_spec: String,
    pub first_follow_report: Option<String>,
    pub diagnostics: Diagnostics,
}

/// Runs the whole pipeline over `source`: scan + parse, EBNF expansion,
/// left-recursion elimination, and (unless `ff_mode` is
/// [FirstFollowMode::Skip]) FIRST/FOLLOW analysis, finishing with both
/// output specs. `header_name` is the flex stub's `#include` target, as
/// derived by [emitter::derive_header_name].
pub fn run(source: &str, header_name: &str, ff_mode: FirstFollowMode) -> RunOutput {
    let mut diagnostics = Diagnostics::new();

    let (raw, start_symbol) = parser::parse_file(source, &mut diagnostics);
    let mut grammar = Grammar::new(raw, start_symbol);

    crate::expander::expand_ebnf(&mut grammar);
    Normalizer::run(&mut grammar, &mut diagnostics);

    let first_follow_report = match ff_mode {
        FirstFollowMode::Skip => None,
        FirstFollowMode::Full => {
            let analysis = first_follow::analyze(&grammar, &mut diagnostics);
            Some(first_follow::format_verbose(&grammar, &analysis))
        }
        FirstFollowMode::Summary => {
            let analysis = first_follow::analyze(&grammar, &mut diagnostics);
            Some(first_follow::format_summary(&grammar, &analysis))
        }
    };

    let parser_spec = emitter::emit_parser_spec(&grammar);
    let lexer_spec = emitter::emit_lexer_spec(&grammar, header_name);

    RunOutput {
        parser_spec,
        lexer_spec,
        first_follow_report,
        diagnostics,
    }
}

/// Reads `input_path`, runs the pipeline, and writes the parser spec to
/// `output_path` and (if given) the tokenizer spec to `lex_path`. The only
/// step that can fail outright; every pipeline-internal problem surfaces
/// as a warning on [RunOutput::diagnostics] instead.
pub fn run_file(
    input_path: &str,
    output_path: &str,
    lex_path: Option<&str>,
    ff_mode: FirstFollowMode,
) -> Result<RunOutput, CliError> {
    let source = fs::read_to_string(input_path).map_err(|source| CliError::Io {
        path: input_path.to_string(),
        source,
    })?;

    let header_name = emitter::derive_header_name(Some(output_path));
    let output = run(&source, &header_name, ff_mode);

    fs::write(output_path, &output.parser_spec).map_err(|source| CliError::Io {
        path: output_path.to_string(),
        source,
    })?;

    if let Some(lex_path) = lex_path {
        fs::write(lex_path, &output.lexer_spec).map_err(|source| CliError::Io {
            path: lex_path.to_string(),
            source,
        })?;
    }

    Ok(output)
}
