//! Console tables of fitted models and their diagnostics.

use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::design::FactorEncoding;
use crate::inference::Significance;
use crate::model::Coefficient;
use crate::snapshot::{DiagnosticsSummary, ModelSnapshot};

fn format_or_dash(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        "-".into()
    }
}

pub fn tabulate_coefficients(coefficients: &[Coefficient]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(16)).with(Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(4))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Coefficient".into(),
                "Estimate".into(),
                "Std. error".into(),
                "z".into(),
                "P-value".into(),
                "".into(),
            ],
        ));
    for coefficient in coefficients {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                coefficient.name.clone().into(),
                format!("{:.6}", coefficient.estimate).into(),
                format_or_dash(coefficient.std_error, 6).into(),
                format_or_dash(coefficient.z, 3).into(),
                format_or_dash(coefficient.p_value, 6).into(),
                Significance::lookup(coefficient.p_value).to_string().into(),
            ],
        ));
    }
    table
}

pub fn tabulate_encodings(encodings: &[FactorEncoding]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(14)).with(Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(7)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Factor".into(), "Reference".into(), "Levels".into()],
        ));
    for encoding in encodings {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                encoding.factor.clone().into(),
                encoding.reference.clone().into(),
                format!("{}", encoding.levels.len()).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_diagnostics(diagnostics: &[(String, DiagnosticsSummary)]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(30)).with(Left)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(13)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Model".into(),
                "Res. var.".into(),
                "χ²".into(),
                "df".into(),
                "P-value".into(),
                "χ²/df".into(),
                "Overdispersed".into(),
            ],
        ));
    for (label, summary) in diagnostics {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                label.clone().into(),
                format!("{:.4}", summary.residual_variance).into(),
                format!("{:.2}", summary.chi_squared).into(),
                format!("{}", summary.degrees_of_freedom).into(),
                format_or_dash(summary.p_value, 6).into(),
                format!("{:.3}", summary.dispersion_ratio).into(),
                if summary.overdispersion { "yes" } else { "no" }.into(),
            ],
        ));
    }
    table
}

/// Goodness of fit of each model, for comparing families on the same response.
pub fn tabulate_comparison(snapshots: &[ModelSnapshot]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12)).with(Left)),
            Col::new(Styles::default().with(MinWidth(18)).with(Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Response".into(),
                "Family".into(),
                "θ".into(),
                "Log-lik.".into(),
                "AIC".into(),
                "Deviance".into(),
                "df".into(),
            ],
        ));
    for snapshot in snapshots {
        let theta = match (snapshot.family.theta(), snapshot.theta_std_error) {
            (Some(theta), Some(se)) => format!("{theta:.3} ± {se:.3}"),
            (Some(theta), None) => format!("{theta:.3}"),
            (None, _) => "-".into(),
        };
        table.push_row(Row::new(
            Styles::default(),
            vec![
                snapshot.response.clone().into(),
                snapshot.family.kind().to_string().into(),
                theta.into(),
                format!("{:.3}", snapshot.log_likelihood).into(),
                format!("{:.3}", snapshot.aic).into(),
                format!("{:.3}", snapshot.deviance).into(),
                format!("{}", snapshot.degrees_of_freedom).into(),
            ],
        ));
    }
    table
}
