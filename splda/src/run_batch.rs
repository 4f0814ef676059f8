use clap::Args;
use log::info;
use sparse_lda::jobs::{read_jobs, run_jobs, write_report};
use sparse_lda::Corpus;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[arg(required = true, help = "Corpus file (`name<TAB>label<TAB>tokens`, .gz ok)")]
    corpus_file: Box<str>,

    #[arg(
        short = 'j',
        long = "jobs",
        required = true,
        help = "JSON array of job descriptions",
        long_help = "JSON array of jobs, e.g.\n\
                     [{\"kind\": \"fit\", \"options\": {\"num_topics\": 20, \"gamma\": 0.15,\n\
                     \"reference_group\": \"nhl\"}, \"num_iterations\": 1000,\n\
                     \"output_dir\": \"out\"}]\n\
                     Missing fields take their defaults."
    )]
    jobs_file: Box<str>,

    #[arg(long, default_value_t = 16, help = "Maximum number of concurrent jobs")]
    max_threads: usize,

    #[arg(
        short,
        long = "report",
        default_value = "stdout",
        help = "Where to write the per-job outcome report (JSON)"
    )]
    report: Box<str>,
}

pub fn run_batch(args: &BatchArgs) -> anyhow::Result<()> {
    let corpus = Arc::new(Corpus::from_file(&args.corpus_file)?);
    let jobs = read_jobs(&args.jobs_file)?;

    let max_threads = num_cpus::get().min(args.max_threads);
    let outcomes = run_jobs(corpus, &jobs, max_threads)?;
    write_report(&outcomes, &args.report)?;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!("{} jobs done, {} failed", outcomes.len(), failed);
    if failed > 0 {
        return Err(anyhow::anyhow!("{} of {} jobs failed", failed, outcomes.len()));
    }
    Ok(())
}
