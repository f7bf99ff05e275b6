//! Command-line surface for the plasmabg host.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "plasmabg",
    version,
    about = "Animated GPU plasma background layer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate the plasma field on the CPU at one sample point.
    Probe(ProbeArgs),
}

/// Flags shared by the windowed run and the probe subcommand.
#[derive(Args, Clone)]
pub struct RunArgs {
    /// Animation speed multiplier (> 0).
    #[arg(long)]
    pub speed: Option<f32>,

    /// Spatial scale of the plasma field (> 0).
    #[arg(long)]
    pub scale: Option<f32>,

    /// Output opacity in [0, 2].
    #[arg(long)]
    pub opacity: Option<f32>,

    /// RGB tint as RRGGBB hex.
    #[arg(long)]
    pub tint: Option<String>,

    /// Leave the layer hit-testable instead of click-through.
    #[arg(long)]
    pub interactive: bool,

    /// Window size as WIDTHxHEIGHT logical pixels.
    #[arg(long)]
    pub size: Option<String>,

    /// Frame rate cap; omit to render at every display refresh.
    #[arg(long)]
    pub fps: Option<f32>,

    /// Fragment shader file replacing the built-in plasma program.
    #[arg(long)]
    pub fragment: Option<PathBuf>,

    /// TOML settings file; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Normalized horizontal coordinate.
    #[arg(long, default_value_t = 0.5)]
    pub u: f32,

    /// Normalized vertical coordinate.
    #[arg(long, default_value_t = 0.5)]
    pub v: f32,

    /// Timestamp in seconds.
    #[arg(long, default_value_t = 0.0)]
    pub time: f32,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::parse_from([
            "plasmabg",
            "--speed",
            "1.5",
            "--tint",
            "9429f5",
            "--interactive",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.speed, Some(1.5));
        assert_eq!(cli.run.tint.as_deref(), Some("9429f5"));
        assert!(cli.run.interactive);
    }

    #[test]
    fn parses_probe_subcommand() {
        let cli = Cli::parse_from(["plasmabg", "probe", "--u", "0.25", "--time", "3.0"]);
        match cli.command {
            Some(Command::Probe(probe)) => {
                assert_eq!(probe.u, 0.25);
                assert_eq!(probe.v, 0.5);
                assert_eq!(probe.time, 3.0);
            }
            _ => panic!("expected probe subcommand"),
        }
    }
}
