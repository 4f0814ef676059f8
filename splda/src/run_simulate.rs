use clap::Args;
use log::info;
use sparse_lda::common_io::mkdir;
use sparse_lda::sim::{simulate_corpus, SimArgs};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 200, help = "Number of documents")]
    docs: usize,

    #[arg(long, default_value_t = 3, help = "Number of groups (labels g0, g1, ...)")]
    groups: usize,

    #[arg(long, default_value_t = 6, help = "Number of topics")]
    topics: usize,

    #[arg(long, default_value_t = 2, help = "Topics active in each group")]
    topics_per_group: usize,

    #[arg(long, default_value_t = 60, help = "Vocabulary size")]
    words: usize,

    #[arg(long, default_value_t = 50, help = "Tokens per document")]
    doc_length: usize,

    #[arg(long, default_value_t = 42, help = "Random seed")]
    seed: u64,

    #[arg(short, long = "out", required = true, help = "Output corpus file (.gz ok)")]
    out: Box<str>,
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let corpus = simulate_corpus(&SimArgs {
        num_docs: args.docs,
        num_groups: args.groups,
        num_topics: args.topics,
        num_types: args.words,
        doc_length: args.doc_length,
        topics_per_group: args.topics_per_group,
        rseed: args.seed,
    })?;

    mkdir(&args.out)?;
    corpus.to_file(&args.out)?;
    info!("wrote {} documents to {}", corpus.len(), args.out);
    Ok(())
}
