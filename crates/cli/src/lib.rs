pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use basket_core::domain::rule::RuleMetric;
use clap::{Args, Parser, Subcommand};

use commands::MiningArgs;

#[derive(Debug, Parser)]
#[command(
    name = "basket",
    about = "Market basket analysis CLI",
    long_about = "Mine association rules and item recommendations from itemized invoices, and operate the invoice database.",
    after_help = "Examples:\n  basket seed\n  basket rules --min-support 0.2\n  basket recommend Milk --top-k 3\n  basket doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List every association rule that clears the metric threshold")]
    Rules {
        #[command(flatten)]
        mining: MiningFlags,
    },
    #[command(about = "Rank items frequently bought together with ITEM")]
    Recommend {
        #[arg(help = "Item name to recommend for")]
        item: String,
        #[arg(long, help = "Maximum number of recommendations")]
        top_k: Option<usize>,
        #[command(flatten)]
        mining: MiningFlags,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo invoices")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and invoice schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct MiningFlags {
    #[arg(long, help = "Minimum itemset support in (0, 1]")]
    min_support: Option<f64>,
    #[arg(long, help = "Minimum value of the rule metric")]
    min_threshold: Option<f64>,
    #[arg(long, help = "Rule metric: support | confidence | lift")]
    metric: Option<RuleMetric>,
    #[arg(long, help = "Read `[{transaction_id, item_name}]` JSON instead of the database")]
    input: Option<PathBuf>,
}

impl MiningFlags {
    fn into_args(self, top_k: Option<usize>) -> MiningArgs {
        MiningArgs {
            min_support: self.min_support,
            min_threshold: self.min_threshold,
            metric: self.metric,
            top_k,
            input: self.input,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Rules { mining } => commands::rules::run(&mining.into_args(None)),
        Command::Recommend { item, top_k, mining } => {
            commands::recommend::run(&item, &mining.into_args(top_k))
        }
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
