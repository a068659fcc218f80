//! Synthetic match data with known team effects.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};
use tracing::debug;

use goalfit::model::ValidationError;
use goalfit::sample;

use crate::dataset::{Dataset, MatchRecord};

const FIRST_SEASON: u32 = 2008;
const FIRST_TEAM_ID: i64 = 8_000;
const TEAM_ID_STRIDE: i64 = 37;

/// How goals are drawn given the expected count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GoalProcess {
    Poisson,
    /// Gamma-Poisson with variance `μ + μ²/θ`.
    NegativeBinomial { theta: f64 },
    /// Poisson, with the mean scaled by `inflation` in a `weight` share of matches.
    Mixture { weight: f64, inflation: f64 },
}
impl GoalProcess {
    fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            GoalProcess::Poisson => Ok(()),
            GoalProcess::NegativeBinomial { theta } => {
                if !theta.is_finite() || theta <= 0.0 {
                    return Err(anyhow!("theta must be finite and positive").into());
                }
                Ok(())
            }
            GoalProcess::Mixture { weight, inflation } => {
                if !(0.0..=1.0).contains(&weight) {
                    return Err(anyhow!("mixture weight must lie in [0, 1]").into());
                }
                if !inflation.is_finite() || inflation <= 0.0 {
                    return Err(anyhow!("inflation must be finite and positive").into());
                }
                Ok(())
            }
        }
    }

    fn draw(&self, mean: f64, rand: &mut impl Rand) -> u32 {
        match *self {
            GoalProcess::Poisson => sample::poisson(mean, rand),
            GoalProcess::NegativeBinomial { theta } => sample::negative_binomial(mean, theta, rand),
            GoalProcess::Mixture { weight, inflation } => {
                let mean = if sample::uniform(rand) < weight {
                    mean * inflation
                } else {
                    mean
                };
                sample::poisson(mean, rand)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub teams: usize,
    pub matches: usize,
    pub seasons: usize,
    /// Expected goals of an average away side.
    pub base_rate: f64,
    /// Log-scale lift enjoyed by the home side.
    pub home_advantage: f64,
    /// Standard deviation of the log-scale attacking strength of each team.
    pub attack_spread: f64,
    /// Standard deviation of the log-scale defensive strength of each team.
    pub defence_spread: f64,
    pub process: GoalProcess,
    pub seed: u64,
}
impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.teams < 2 {
            return Err(anyhow!("at least two teams are required").into());
        }
        if self.matches == 0 {
            return Err(anyhow!("at least one match is required").into());
        }
        if self.seasons == 0 {
            return Err(anyhow!("at least one season is required").into());
        }
        if !self.base_rate.is_finite() || self.base_rate <= 0.0 {
            return Err(anyhow!("base rate must be finite and positive").into());
        }
        if !self.home_advantage.is_finite() {
            return Err(anyhow!("home advantage must be finite").into());
        }
        for (name, spread) in [
            ("attack", self.attack_spread),
            ("defence", self.defence_spread),
        ] {
            if !spread.is_finite() || spread < 0.0 {
                return Err(anyhow!("{name} spread must be finite and non-negative").into());
            }
        }
        self.process.validate()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            teams: 20,
            matches: 3_040,
            seasons: 8,
            base_rate: 1.1,
            home_advantage: 0.25,
            attack_spread: 0.2,
            defence_spread: 0.15,
            process: GoalProcess::Poisson,
            seed: 0,
        }
    }
}

/// The source id of the `index`th simulated team.
pub fn team_id(index: usize) -> i64 {
    FIRST_TEAM_ID + TEAM_ID_STRIDE * index as i64
}

/// The label of the `index`th simulated season, e.g. `2008/2009`.
pub fn season(index: usize) -> String {
    let start = FIRST_SEASON + index as u32;
    format!("{start}/{}", start + 1)
}

/// Simulates a league in which `log μ_home = ln(base_rate) + home_advantage + attack[h] − defence[a]`
/// and `log μ_away = ln(base_rate) + attack[a] − defence[h]`.
pub fn simulate(config: &SimulationConfig) -> Result<Dataset, ValidationError> {
    config.validate()?;
    let mut rand = StdRand::seed(config.seed);
    let attack: Vec<_> = (0..config.teams)
        .map(|_| config.attack_spread * sample::standard_normal(&mut rand))
        .collect();
    let defence: Vec<_> = (0..config.teams)
        .map(|_| config.defence_spread * sample::standard_normal(&mut rand))
        .collect();
    debug!("attack: {attack:?}, defence: {defence:?}");

    let base = config.base_rate.ln();
    let records = (0..config.matches)
        .map(|index| {
            let home = sample::index(config.teams, &mut rand);
            let away = (home + 1 + sample::index(config.teams - 1, &mut rand)) % config.teams;
            let home_mean = (base + config.home_advantage + attack[home] - defence[away]).exp();
            let away_mean = (base + attack[away] - defence[home]).exp();
            MatchRecord {
                id: index as i64 + 1,
                season: season(index * config.seasons / config.matches),
                home_team_id: team_id(home),
                away_team_id: team_id(away),
                home_goals: config.process.draw(home_mean, &mut rand),
                away_goals: config.process.draw(away_mean, &mut rand),
            }
        })
        .collect::<Vec<_>>();
    Ok(Dataset::from(records))
}
