use anyhow::Context;
use clap::Parser;
use common::App;
use mapreduce::{init_logger, RunConfig};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Run a MapReduce application over input files")]
struct Cli {
    #[arg(short, long)]
    app_name: String,
    /// Worker threads [default: MR_WORKERS or available parallelism]
    #[arg(short, long)]
    workers: Option<usize>,
    /// Partitions [default: MR_PARTITIONS or 10]
    #[arg(short, long)]
    partitions: Option<usize>,
    /// Output file [default: mr-out-<app>]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Use the single-threaded reference executor
    #[arg(long)]
    sequential: bool,
    #[arg(required = true)]
    input_files: Vec<String>,
}

impl Cli {
    fn config(&self) -> anyhow::Result<RunConfig> {
        let mut config = RunConfig::from_env()?;
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(partitions) = self.partitions {
            config = config.with_partitions(partitions);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let _guard = init_logger()?;
    let cli = Cli::parse();
    let app = App::load(&cli.app_name)?;

    let output = if cli.sequential {
        app.run_sequential(&cli.input_files)?
    } else {
        let config = cli.config()?;
        info!(
            app = %cli.app_name,
            workers = config.workers,
            partitions = config.partitions,
            files = cli.input_files.len(),
            "running"
        );
        app.run(&cli.input_files, &config)?
    };

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("mr-out-{}", cli.app_name)));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (key, value) in &output {
        writeln!(out, "{key} {value}")?;
    }
    out.flush()?;
    info!(keys = output.len(), path = %path.display(), "output written");
    Ok(())
}
