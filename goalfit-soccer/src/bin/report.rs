use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::debug;

use goalfit::print::{tabulate_coefficients, tabulate_comparison, tabulate_diagnostics};
use goalfit::snapshot::ModelSnapshot;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// snapshot files written by the analyse binary
    snapshots: Vec<PathBuf>,

    /// omit the coefficient tables
    #[clap(short = 's', long)]
    summary: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.snapshots.is_empty() {
            bail!("at least one snapshot file must be specified");
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let snapshots = args
        .snapshots
        .iter()
        .map(ModelSnapshot::read)
        .collect::<Result<Vec<_>, _>>()?;

    let mut diagnostics = vec![];
    for snapshot in &snapshots {
        if !args.summary {
            println!(
                "{} ~ {} [{}], fitted {}",
                snapshot.response,
                snapshot.predictors.join(" + "),
                snapshot.family,
                snapshot.created.format("%Y-%m-%d %H:%M:%S UTC")
            );
            let table = tabulate_coefficients(&snapshot.coefficients);
            println!("{}", Console::default().render(&table));
        }
        if let Some(summary) = &snapshot.diagnostics {
            let label = format!("{} ({})", snapshot.response, snapshot.family.kind());
            diagnostics.push((label, summary.clone()));
        }
    }
    if !diagnostics.is_empty() {
        let table = tabulate_diagnostics(&diagnostics);
        println!("Diagnostics:\n{}", Console::default().render(&table));
    }
    let table = tabulate_comparison(&snapshots);
    println!("Comparison:\n{}", Console::default().render(&table));
    Ok(())
}
