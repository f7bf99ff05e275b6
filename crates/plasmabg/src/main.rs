//! Entry point: parses the CLI, initialises tracing, and dispatches to the
//! windowed host or the CPU probe utility.

mod cli;
mod run;
mod settings;

use anyhow::Result;
use cli::{Command, ProbeArgs};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Probe(probe)) => run_probe(probe),
        None => run::run(cli.run),
    }
}

/// Prints one CPU-evaluated sample of the plasma field, useful for
/// eyeballing ramp values and scripting golden checks.
fn run_probe(args: ProbeArgs) -> Result<()> {
    let options = settings::resolve(&args.run)?;
    let config = options.config.sanitized();

    let field = renderer::field::field_value(args.u, args.v, args.time, config.speed, config.scale);
    let rgba = renderer::field::shade(args.u, args.v, args.time, &config);

    println!("uv:    ({:.4}, {:.4})", args.u, args.v);
    println!("time:  {:.4}s", args.time);
    println!("field: {:.6}", field);
    println!(
        "rgba:  ({:.6}, {:.6}, {:.6}, {:.6})",
        rgba[0], rgba[1], rgba[2], rgba[3]
    );
    Ok(())
}
