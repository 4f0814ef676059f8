use crate::hyper_args::HyperArgs;

use clap::Args;
use log::info;
use sparse_lda::classify::train_and_classify;
use sparse_lda::output::{write_accuracy, write_confusions, write_top_words};
use sparse_lda::{ClassifyOptions, Corpus};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[arg(
        required = true,
        help = "Corpus file, documents in random order",
        long_help = "Corpus file (`name<TAB>label<TAB>tokens`, .gz ok).\n\
                     The first --train-fraction of the documents train the model;\n\
                     the rest are classified. Shuffle beforehand for an unbiased split."
    )]
    corpus_file: Box<str>,

    #[command(flatten)]
    hyper: HyperArgs,

    #[arg(short = 'i', long, default_value_t = 1000, help = "Training iterations")]
    iterations: usize,

    #[arg(long, default_value_t = 0.8, help = "Training share of the corpus")]
    train_fraction: f64,

    #[arg(long, default_value_t = 25, help = "Gibbs sweeps per held-out document")]
    inference_sweeps: usize,

    #[arg(long, default_value_t = 50, help = "Top words per topic in the output")]
    top_words: usize,

    #[arg(
        short,
        long = "out",
        required = true,
        help = "Output header",
        long_help = "Output header. Writes\n\
                     - {out}.confusion.json: confusion rows (true -> predicted)\n\
                     - {out}.accuracy.txt: accuracy and macro-F1\n\
                     - {out}.topwords.txt"
    )]
    out: Box<str>,
}

pub fn run_classify(args: &ClassifyArgs) -> anyhow::Result<()> {
    let corpus = Corpus::from_file(&args.corpus_file)?;

    let classify = ClassifyOptions {
        train_fraction: args.train_fraction,
        num_iterations: args.iterations,
        inference_sweeps: args.inference_sweeps,
        show_topics_interval: 0,
    };
    let (model, result) = train_and_classify(&corpus, args.hyper.to_options(true), &classify)?;

    let out = &args.out;
    write_confusions(
        model.groups(),
        &result.confusion,
        &format!("{}.confusion.json", out),
    )?;
    write_accuracy(&result, &format!("{}.accuracy.txt", out))?;
    write_top_words(&model, args.top_words, true, &format!("{}.topwords.txt", out))?;

    info!(
        "accuracy {:.4}, macro-F1 {:.4}",
        result.accuracy, result.macro_f1
    );
    Ok(())
}
