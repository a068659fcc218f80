use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing::{debug, info};

use goalfit_soccer::sim::{simulate, GoalProcess, SimulationConfig};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// CSV file to write the simulated matches to
    #[clap(short = 'o', long)]
    out: PathBuf,

    /// number of teams in the league
    #[clap(short = 't', long, default_value_t = 20)]
    teams: usize,

    /// number of matches across all seasons
    #[clap(short = 'm', long, default_value_t = 3_040)]
    matches: usize,

    /// number of seasons
    #[clap(long, default_value_t = 8)]
    seasons: usize,

    /// draw goals from a Negative Binomial with this θ instead of a Poisson
    #[clap(long)]
    theta: Option<f64>,

    /// inflate the expected goals of this share of matches (requires --inflation)
    #[clap(long)]
    mixture_weight: Option<f64>,

    /// factor by which inflated matches scale their expected goals
    #[clap(long)]
    inflation: Option<f64>,

    /// random seed
    #[clap(long, default_value_t = 0)]
    seed: u64,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.theta.is_some() && self.mixture_weight.is_some() {
            bail!("--theta and --mixture-weight are mutually exclusive");
        }
        if self.mixture_weight.is_some() != self.inflation.is_some() {
            bail!("--mixture-weight and --inflation must be specified together");
        }
        Ok(())
    }

    fn process(&self) -> GoalProcess {
        match (self.theta, self.mixture_weight, self.inflation) {
            (Some(theta), _, _) => GoalProcess::NegativeBinomial { theta },
            (None, Some(weight), Some(inflation)) => GoalProcess::Mixture { weight, inflation },
            _ => GoalProcess::Poisson,
        }
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

    let config = SimulationConfig {
        teams: args.teams,
        matches: args.matches,
        seasons: args.seasons,
        process: args.process(),
        seed: args.seed,
        ..SimulationConfig::default()
    };
    let dataset = simulate(&config)?;
    dataset.write_csv(&args.out)?;
    info!(
        "wrote {} simulated matches ({:?}) to {}",
        dataset.len(),
        config.process,
        args.out.display()
    );
    Ok(())
}
