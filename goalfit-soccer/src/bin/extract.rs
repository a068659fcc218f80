use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, info};

use goalfit_soccer::data::{load, SourceMapping, TableSchema};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// SQLite store to read matches from
    #[clap(short = 'd', long)]
    db: PathBuf,

    /// CSV file to write the cleaned matches to
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,

    /// name of the match table
    #[clap(short = 't', long)]
    table: Option<String>,

    /// list the tables and columns of the store
    #[clap(short = 'l', long)]
    list: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.out.is_none() && !self.list {
            bail!("either the -o or the -l flag must be specified");
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

    let mut mapping = SourceMapping::default();
    if let Some(table) = &args.table {
        mapping.table = table.clone();
    }
    let extract = load(&args.db, &mapping)?;
    if args.list {
        let table = tabulate_schema(&extract.tables);
        println!("{}", Console::default().render(&table));
    }
    if let Some(out) = &args.out {
        extract.dataset.write_csv(out)?;
        info!(
            "wrote {} matches over {} seasons to {}",
            extract.dataset.len(),
            extract.dataset.seasons().len(),
            out.display()
        );
    }
    Ok(())
}

fn tabulate_schema(tables: &[TableSchema]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(24)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Table".into(), "Column".into(), "Type".into()],
        ));
    for schema in tables {
        for (index, column) in schema.columns.iter().enumerate() {
            let name = if index == 0 { schema.name.clone() } else { String::new() };
            table.push_row(Row::new(
                Styles::default(),
                vec![
                    name.into(),
                    column.name.clone().into(),
                    column.declared_type.clone().into(),
                ],
            ));
        }
    }
    table
}
