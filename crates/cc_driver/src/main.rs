//! Command-line entry point: wires `analyze_semantic`,
//! `represent_three_address_code`, and `optimize_three_address_code`
//! together (spec §6), the only "fourth entry point" this core exposes —
//! client code of the other three, not a core API of its own.

mod demo;
mod pretty;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Compile a translation unit through the semantic analyzer, TAC
/// lowering, and the TAC optimizer.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file to compile. No lexer/parser is linked into this binary
    /// (see spec §1's named-interface-only collaborators), so a real path
    /// here only reports that gap; use `--demo` to drive the pipeline
    /// end to end against a hand-built translation unit.
    input: Option<std::path::PathBuf>,

    /// Run one of the built-in sample translation units instead of
    /// reading `input`. One of: arithmetic, null-ptr, unreachable.
    #[arg(long)]
    demo: Option<String>,

    /// Enable constant folding.
    #[arg(long)]
    fold: bool,
    /// Enable copy propagation.
    #[arg(long = "copy-prop")]
    copy_prop: bool,
    /// Enable unreachable-code elimination.
    #[arg(long)]
    unreachable: bool,
    /// Enable dead-store elimination.
    #[arg(long = "dead-store")]
    dead_store: bool,
    /// Enable every optimization pass.
    #[arg(long)]
    all: bool,

    /// Increase log verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the produced three-address code to stdout.
    #[arg(long = "emit-tac")]
    emit_tac: bool,
}

fn init_logging(verbose: u8) {
    let filter = if let Ok(from_env) = std::env::var("RUST_LOG") {
        EnvFilter::new(from_env)
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("cc_driver={level},cc_sema={level},cc_lower={level},cc_optim={level}"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn optim_mask(args: &Args) -> u8 {
    if args.all {
        return cc_optim::FOLD | cc_optim::COPY_PROPAGATION | cc_optim::UNREACHABLE_CODE_ELIMINATION | cc_optim::DEAD_STORE_ELIMINATION;
    }
    let mut mask = 0u8;
    if args.fold {
        mask |= cc_optim::FOLD;
    }
    if args.copy_prop {
        mask |= cc_optim::COPY_PROPAGATION;
    }
    if args.unreachable {
        mask |= cc_optim::UNREACHABLE_CODE_ELIMINATION;
    }
    if args.dead_store {
        mask |= cc_optim::DEAD_STORE_ELIMINATION;
    }
    mask
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut idents = cc_ident::IdentContext::new();
    let mut program = match &args.demo {
        Some(name) => demo::by_name(name, &mut idents)
            .ok_or_else(|| anyhow::anyhow!("unknown --demo {name:?}, expected one of {:?}", demo::NAMES))?,
        None => {
            let Some(path) = &args.input else {
                anyhow::bail!("pass an input file or --demo <{}>", demo::NAMES.join("|"));
            };
            anyhow::bail!(
                "{} was given, but no lexer/parser is linked into this binary (see spec §1); \
                 re-run with --demo <{}> to exercise the pipeline end to end",
                path.display(),
                demo::NAMES.join("|")
            );
        }
    };

    let mut frontend = cc_data::FrontendContext::new();
    let mut errors = Vec::new();
    if cc_sema::analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents).is_err() {
        for err in &errors {
            eprintln!("{err}");
        }
        anyhow::bail!("semantic analysis failed with {} error(s)", errors.len());
    }

    let mut tac = cc_lower::represent_three_address_code(&program, &mut frontend, &mut idents);
    let mask = optim_mask(&args);
    cc_optim::optimize_three_address_code(&mut tac, &frontend, mask);

    if args.emit_tac {
        print!("{}", pretty::format_program(&tac, &idents));
    } else {
        println!(
            "compiled {} function(s), {} static variable(s), {} static constant(s)",
            tac.functions.len(),
            tac.static_variables.len(),
            tac.static_constants.len()
        );
    }
    Ok(())
}
