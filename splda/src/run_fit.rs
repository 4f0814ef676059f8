use crate::hyper_args::HyperArgs;

use clap::Args;
use log::info;
use sparse_lda::output::*;
use sparse_lda::{Corpus, SparseLda};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct FitArgs {
    #[arg(
        required = true,
        help = "Corpus file (`name<TAB>label<TAB>tokens`, .gz ok)"
    )]
    corpus_file: Box<str>,

    #[command(flatten)]
    hyper: HyperArgs,

    #[arg(short = 'i', long, default_value_t = 1000, help = "Gibbs iterations")]
    iterations: usize,

    #[arg(
        long,
        default_value_t = 100,
        help = "Log top words every this many iterations (0 = never)"
    )]
    show_topics_interval: usize,

    #[arg(long, default_value_t = 50, help = "Top words per topic in the output")]
    top_words: usize,

    #[arg(
        short,
        long = "out",
        required = true,
        help = "Output header",
        long_help = "Output header. Writes\n\
                     - {out}.topwords.txt\n\
                     - {out}.targets.json: average topic proportions per group\n\
                     - {out}.alphas.json: fitted prior per group\n\
                     - {out}.llik.txt\n\
                     - {out}.doc_topics.txt.gz\n\
                     - {out}.state.txt.gz (with --save-state)"
    )]
    out: Box<str>,

    #[arg(long, default_value_t = false, help = "Also dump every token's topic")]
    save_state: bool,
}

pub fn run_fit(args: &FitArgs) -> anyhow::Result<()> {
    let corpus = Arc::new(Corpus::from_file(&args.corpus_file)?);
    info!(
        "read {} documents, {} word types",
        corpus.len(),
        corpus.num_types()
    );

    let mut model = SparseLda::new(corpus, args.hyper.to_options(true))?;
    model.estimate(args.iterations, args.show_topics_interval)?;

    let out = &args.out;
    write_top_words(&model, args.top_words, true, &format!("{}.topwords.txt", out))?;
    write_group_topics(&model, &format!("{}.targets.json", out))?;
    write_group_alphas(&model, &format!("{}.alphas.json", out))?;
    write_log_likelihood(&model, &format!("{}.llik.txt", out))?;
    write_doc_topics(&model, 0.0, None, &format!("{}.doc_topics.txt.gz", out))?;
    if args.save_state {
        write_state(&model, &format!("{}.state.txt.gz", out))?;
    }

    info!("log-likelihood: {}", model.log_likelihood());
    Ok(())
}
