use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, error, info};

use goalfit::print::{
    tabulate_coefficients, tabulate_comparison, tabulate_diagnostics, tabulate_encodings,
};
use goalfit::snapshot::DiagnosticsSummary;
use goalfit_soccer::dataset::Dataset;
use goalfit_soccer::pipeline::{Analyser, AnalysisConfig, Fit};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// CSV file of cleaned matches
    #[clap(short = 'f', long)]
    file: PathBuf,

    /// directory to write model snapshots to
    #[clap(short = 'o', long)]
    out_dir: Option<PathBuf>,

    /// restrict the analysis to these seasons
    #[clap(short = 's', long = "season")]
    seasons: Vec<String>,

    /// analyse the two responses one after the other
    #[clap(long)]
    sequential: bool,

    /// print the factor encodings of each model
    #[clap(short = 'e', long)]
    encodings: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.seasons.iter().any(String::is_empty) {
            bail!("seasons cannot be empty");
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

    let mut dataset = Dataset::read_csv(&args.file)?;
    if !args.seasons.is_empty() {
        dataset = dataset.filter(|record| args.seasons.contains(&record.season));
    }
    info!(
        "analysing {} matches from seasons {:?}",
        dataset.len(),
        dataset.seasons()
    );

    let analyser = Analyser::try_from(AnalysisConfig {
        parallel: !args.sequential,
        ..AnalysisConfig::default()
    })?;
    let analysis = analyser.analyse(&dataset);

    let mut diagnostics = vec![];
    let mut snapshots = vec![];
    for outcome in analysis.outcomes() {
        for fit in outcome.fits() {
            print_fit(fit, args.encodings);
            let label = format!("{} ({})", outcome.response, fit.model.family.kind());
            diagnostics.push((label, DiagnosticsSummary::from(&fit.diagnostics)));
            let snapshot = fit.snapshot();
            if let Some(out_dir) = &args.out_dir {
                let path = snapshot.write(out_dir)?;
                info!("wrote {}", path.display());
            }
            snapshots.push(snapshot);
        }
        info!(
            "{}: settled on {} ({})",
            outcome.response,
            outcome.selected().model.family,
            outcome.stage()
        );
    }
    if !diagnostics.is_empty() {
        let table = tabulate_diagnostics(&diagnostics);
        println!("Diagnostics:\n{}", Console::default().render(&table));
        let table = tabulate_comparison(&snapshots);
        println!("Comparison:\n{}", Console::default().render(&table));
    }

    for err in analysis.errors() {
        error!("{err}");
    }
    analysis.ensure_complete()?;
    Ok(())
}

fn print_fit(fit: &Fit, encodings: bool) {
    let model = &fit.model;
    println!(
        "{} ~ {} [{}, {} link]: {} records, {} parameters, {} iterations",
        model.response,
        model.predictors.join(" + "),
        model.family,
        model.link,
        model.n_records,
        model.n_parameters,
        model.iterations
    );
    let table = tabulate_coefficients(&model.coefficients);
    println!("{}", Console::default().render(&table));
    if encodings {
        let table = tabulate_encodings(&model.encodings);
        println!("{}", Console::default().render(&table));
    }
}
