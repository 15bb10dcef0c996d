use clap::{Parser, Subcommand};
use common::config::Config;
use eyre::Result;
use tokio::task::spawn_blocking;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod args;
mod plots;

use args::DatasetArgs;

const MODULES: &[&str] = &["common", "fio", "fio_dataset"];

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the FIO output files a configuration selects
    Ls {
        #[command(flatten)]
        args: DatasetArgs,
    },
    /// Build the dataset and print it
    Plot {
        #[command(flatten)]
        args: DatasetArgs,
        /// table or json, repeatable
        #[arg(long = "plot")]
        plots: Vec<String>,
    },
    /// Print latency histograms from json+ summary documents
    Histogram {
        #[command(flatten)]
        args: DatasetArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("fio_charts={log_level}"));

    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    let result = match args.command {
        Commands::Ls { args } => list_files(args.load().await?).await,
        Commands::Plot { args, plots } => plot(args.load().await?, &plots).await,
        Commands::Histogram { args } => histogram(args.load().await?).await,
    };
    if let Err(err) = &result {
        error!("{err:#?}");
    }
    result
}

async fn list_files(config: Config) -> Result<()> {
    let candidates = spawn_blocking(move || fio_dataset::locator::locate(&config)).await??;
    for candidate in candidates {
        println!("{}", candidate.path.display());
    }
    Ok(())
}

async fn plot(config: Config, names: &[String]) -> Result<()> {
    let plots = plots::plots(names)?;
    let (dataset, config) = spawn_blocking(move || {
        fio_dataset::build_dataset(&config).map(|dataset| (dataset, config))
    })
    .await??;
    if dataset.is_empty() {
        info!("Nothing to plot");
    }

    for (name, output) in common::plot::plot(&plots, &dataset, &config)? {
        if plots.len() > 1 {
            println!("# {name}");
        }
        println!("{output}");
    }
    Ok(())
}

async fn histogram(config: Config) -> Result<()> {
    let histograms = spawn_blocking(move || fio_dataset::build_histograms(&config)).await??;
    for (key, bins) in histograms {
        println!("[{key}]");
        for (latency, count) in bins {
            println!("{latency:>14.3} us {count:>10}");
        }
    }
    Ok(())
}
