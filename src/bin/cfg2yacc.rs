use std::process::ExitCode;

use cfg2yacc::pipeline::{self, FirstFollowMode};
use cfg2yacc::CliError;

struct Args {
    input: String,
    output: String,
    emit_lex: Option<String>,
    ff_mode: FirstFollowMode,
}

fn usage(prog: &str) -> String {
    format!("Usage: {} -i in.ebnf -o out.y [--emit-lex out.l]", prog)
}

/// Outcome of argument parsing: either ready-to-run `Args`, a request for
/// `--help`/`-h` (which prints usage and exits 0, not a `BadArgs` failure),
/// or a `BadArgs` error for anything else malformed.
enum ParsedArgs {
    Run(Args),
    Help(String),
}

fn parse_args(argv: &[String]) -> Result<ParsedArgs, CliError> {
    let prog = argv.first().map(String::as_str).unwrap_or("cfg2yacc");
    let mut input = None;
    let mut output = None;
    let mut emit_lex = None;
    let mut no_ff = false;
    let mut ff_summary = false;

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-i" | "--input" if i + 1 < argv.len() => {
                input = Some(argv[i + 1].clone());
                i += 1;
            }
            "-o" | "--output" if i + 1 < argv.len() => {
                output = Some(argv[i + 1].clone());
                i += 1;
            }
            "--emit-lex" if i + 1 < argv.len() => {
                emit_lex = Some(argv[i + 1].clone());
                i += 1;
            }
            "--no-ff" => no_ff = true,
            "--ff-summary" => ff_summary = true,
            "-h" | "--help" => return Ok(ParsedArgs::Help(usage(prog))),
            _ => {}
        }
        i += 1;
    }

    let (Some(input), Some(output)) = (input, output) else {
        return Err(CliError::BadArgs(usage(prog)));
    };

    let ff_mode = if no_ff {
        FirstFollowMode::Skip
    } else if ff_summary {
        FirstFollowMode::Summary
    } else {
        FirstFollowMode::Full
    };

    Ok(ParsedArgs::Run(Args {
        input,
        output,
        emit_lex,
        ff_mode,
    }))
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(ParsedArgs::Run(args)) => args,
        Ok(ParsedArgs::Help(usage)) => {
            println!("{}", usage);
            return ExitCode::from(0);
        }
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };

    eprintln!("[cfg2yacc] reading grammar: {}", args.input);
    let output = match pipeline::run_file(&args.input, &args.output, args.emit_lex.as_deref(), args.ff_mode) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };

    for diagnostic in output.diagnostics.iter() {
        eprintln!("[cfg2yacc] {}", diagnostic);
    }
    if let Some(report) = &output.first_follow_report {
        print!("{}", report);
    }

    eprintln!(
        "[cfg2yacc] done -> {}{}",
        args.output,
        args.emit_lex.as_deref().map(|l| format!(", {}", l)).unwrap_or_default()
    );

    ExitCode::from(0)
}
