mod hyper_args;
mod run_batch;
mod run_classify;
mod run_fit;
mod run_simulate;

use clap::{Parser, Subcommand};
use run_batch::*;
use run_classify::*;
use run_fit::*;
use run_simulate::*;

/// SPLDA
#[derive(Parser, Debug)]
#[command(
    version,
    about = "SPLDA",
    long_about = "Group-sparse Latent Dirichlet Allocation\n\n\
                  Every document carries a group label. Each non-reference group\n\
                  learns which topics to keep at full prior weight and which to\n\
                  shrink, alongside ordinary collapsed Gibbs sampling of topics.\n\n\
                  Corpus files hold one document per line:\n\
                  `name<TAB>label<TAB>whitespace separated tokens`.",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a model on a whole corpus
    Fit(FitArgs),

    /// Train on the front of a corpus and predict the labels of the rest
    Classify(ClassifyArgs),

    /// Run many configurations in parallel from a JSON job list
    Batch(BatchArgs),

    /// Write a synthetic grouped corpus
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Fit(args) => {
            run_fit(args)?;
        }
        Commands::Classify(args) => {
            run_classify(args)?;
        }
        Commands::Batch(args) => {
            run_batch(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    Ok(())
}
