//! Batches of independent fits.
//!
//! Each [`Job`] owns its whole pipeline (initialize, estimate, write
//! results) and its own model state. Jobs share only the read-only corpus
//! and run on a rayon pool; a failing or panicking job becomes a
//! [`JobOutcome::Failed`] entry without disturbing the others.

use crate::classify::{train_and_classify, ClassifyOptions};
use crate::common_io::{mkdir, write_types};
use crate::corpus::Corpus;
use crate::model::SparseLda;
use crate::options::LdaOptions;
use crate::output::*;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Fit on the whole corpus
    Fit,
    /// Fit on a training split and classify the rest
    Classify,
}

/// One hyperparameter configuration to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub kind: JobKind,
    pub options: LdaOptions,
    pub num_iterations: usize,
    /// diagnostic interval (0 = never)
    pub show_topics_interval: usize,
    pub num_top_words: usize,
    /// Gibbs sweeps per held-out document (classify only)
    pub inference_sweeps: usize,
    /// training share of the corpus (classify only)
    pub train_fraction: f64,
    pub output_dir: String,
}

impl Default for Job {
    fn default() -> Self {
        let classify = ClassifyOptions::default();
        Job {
            kind: JobKind::Fit,
            options: LdaOptions::default(),
            num_iterations: 1000,
            show_topics_interval: 0,
            num_top_words: 50,
            inference_sweeps: classify.inference_sweeps,
            train_fraction: classify.train_fraction,
            output_dir: ".".to_string(),
        }
    }
}

impl Job {
    /// `{what}_{LDA|sparse}_{reference}_{alpha}_{beta}[_{gamma}_{eta}]`
    pub fn file_stem(&self, what: &str) -> String {
        let o = &self.options;
        if o.is_sparse() {
            format!(
                "{}_sparse_{}_{}_{}_{}_{}",
                what, o.reference_group, o.alpha, o.beta, o.gamma, o.eta
            )
        } else {
            format!("{}_LDA_{}_{}_{}", what, o.reference_group, o.alpha, o.beta)
        }
    }

    fn output_file(&self, what: &str, ext: &str) -> String {
        Path::new(&self.output_dir)
            .join(format!("{}.{}", self.file_stem(what), ext))
            .to_string_lossy()
            .into_owned()
    }

    /// Short human-readable name used in logs and reports.
    pub fn name(&self) -> String {
        let kind = match self.kind {
            JobKind::Fit => "fit",
            JobKind::Classify => "classify",
        };
        self.file_stem(kind)
    }

    fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            train_fraction: self.train_fraction,
            num_iterations: self.num_iterations,
            inference_sweeps: self.inference_sweeps,
            show_topics_interval: self.show_topics_interval,
        }
    }
}

/// Result of one job as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Ok {
        name: String,
        log_likelihood: f64,
        accuracy: Option<f64>,
        macro_f1: Option<f64>,
        files: Vec<String>,
    },
    Failed {
        name: String,
        message: String,
    },
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, JobOutcome::Ok { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            JobOutcome::Ok { name, .. } | JobOutcome::Failed { name, .. } => name,
        }
    }
}

/// Run one job to completion and write its result files.
pub fn run_job(corpus: &Arc<Corpus>, job: &Job) -> anyhow::Result<JobOutcome> {
    info!("starting {}", job.name());

    match job.kind {
        JobKind::Fit => {
            let mut model = SparseLda::new(corpus.clone(), job.options.clone())?;
            model.estimate(job.num_iterations, job.show_topics_interval)?;

            let files = vec![
                job.output_file("topwords", "txt"),
                job.output_file("targets", "json"),
                job.output_file("alphas", "json"),
                job.output_file("llik", "txt"),
            ];
            write_top_words(&model, job.num_top_words, false, &files[0])?;
            write_group_topics(&model, &files[1])?;
            write_group_alphas(&model, &files[2])?;
            write_log_likelihood(&model, &files[3])?;

            Ok(JobOutcome::Ok {
                name: job.name(),
                log_likelihood: model.log_likelihood(),
                accuracy: None,
                macro_f1: None,
                files,
            })
        }
        JobKind::Classify => {
            let (model, result) =
                train_and_classify(corpus, job.options.clone(), &job.classify_options())?;

            let files = vec![
                job.output_file("confusion", "json"),
                job.output_file("accuracy", "txt"),
                job.output_file("classify_topwords", "txt"),
                job.output_file("classify_alphas", "json"),
            ];
            write_confusions(model.groups(), &result.confusion, &files[0])?;
            write_accuracy(&result, &files[1])?;
            write_top_words(&model, job.num_top_words, false, &files[2])?;
            write_group_alphas(&model, &files[3])?;

            Ok(JobOutcome::Ok {
                name: job.name(),
                log_likelihood: model.log_likelihood(),
                accuracy: Some(result.accuracy),
                macro_f1: Some(result.macro_f1),
                files,
            })
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

fn run_contained(corpus: &Arc<Corpus>, job: &Job) -> JobOutcome {
    match catch_unwind(AssertUnwindSafe(|| run_job(corpus, job))) {
        Ok(Ok(outcome)) => {
            info!("finished {}", job.name());
            outcome
        }
        Ok(Err(e)) => {
            warn!("{} failed: {:#}", job.name(), e);
            JobOutcome::Failed {
                name: job.name(),
                message: format!("{:#}", e),
            }
        }
        Err(payload) => {
            let message = panic_message(payload);
            warn!("{} panicked: {}", job.name(), message);
            JobOutcome::Failed {
                name: job.name(),
                message,
            }
        }
    }
}

/// Run every job, at most `num_threads` at a time, and return one outcome
/// per job in input order.
pub fn run_jobs(
    corpus: Arc<Corpus>,
    jobs: &[Job],
    num_threads: usize,
) -> anyhow::Result<Vec<JobOutcome>> {
    let num_threads = num_threads.clamp(1, num_cpus::get().max(1));
    info!("running {} jobs on {} threads", jobs.len(), num_threads);

    let outcomes: Vec<JobOutcome> = if num_threads <= 1 {
        jobs.iter().map(|job| run_contained(&corpus, job)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        pool.install(|| {
            jobs.par_iter()
                .map(|job| run_contained(&corpus, job))
                .collect()
        })
    };

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        warn!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(outcomes)
}

/// Read a batch file: a JSON array of jobs.
pub fn read_jobs(batch_file: &str) -> anyhow::Result<Vec<Job>> {
    let buf = crate::common_io::open_buf_reader(batch_file)?;
    Ok(serde_json::from_reader(buf)?)
}

/// Write outcomes as a pretty-printed JSON array.
pub fn write_report(outcomes: &[JobOutcome], output_file: &str) -> anyhow::Result<()> {
    mkdir(output_file)?;
    write_types(&[serde_json::to_string_pretty(outcomes)?], output_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_io::{create_temp_dir_file, read_lines};
    use crate::corpus::{Document, Vocabulary};

    fn toy_corpus() -> Arc<Corpus> {
        let vocab = Arc::new(Vocabulary::with_size(6));
        let mut docs = vec![];
        for i in 0..10 {
            if i % 2 == 0 {
                docs.push(Document::new(&format!("d{}", i), "nhl", vec![0, 1, 2, 0, 1]));
            } else {
                docs.push(Document::new(&format!("d{}", i), "nfl", vec![3, 4, 5, 4, 3]));
            }
        }
        Arc::new(Corpus::new(vocab, docs))
    }

    fn job_in(dir: &Path, kind: JobKind, options: LdaOptions) -> Job {
        Job {
            kind,
            options,
            num_iterations: 10,
            num_top_words: 3,
            output_dir: dir.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_stem() {
        let mut job = Job::default();
        job.options = LdaOptions::sparse(5, 0.5, 0.01, 0.15, 0.01, "nhl");
        assert_eq!(job.file_stem("alphas"), "alphas_sparse_nhl_0.5_0.01_0.15_0.01");
        job.options = LdaOptions::plain(5, 0.5, 0.01, "nhl");
        assert_eq!(job.file_stem("alphas"), "alphas_LDA_nhl_0.5_0.01");
    }

    #[test]
    fn test_job_from_partial_json() {
        let jobs: Vec<Job> = serde_json::from_str(
            r#"[{"kind": "classify", "options": {"num_topics": 4, "reference_group": "nhl"}}]"#,
        )
        .unwrap();
        assert_eq!(jobs[0].kind, JobKind::Classify);
        assert_eq!(jobs[0].options.num_topics, 4);
        assert_eq!(jobs[0].inference_sweeps, 25);
        assert_eq!(jobs[0].train_fraction, 0.8);
    }

    #[test]
    fn test_failed_job_does_not_abort_siblings() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let good = job_in(dir.path(), JobKind::Fit, LdaOptions::plain(2, 0.5, 0.1, "nhl"));
        let bad = job_in(dir.path(), JobKind::Fit, LdaOptions::plain(2, 0.5, 0.1, "mlb"));
        let classify = job_in(
            dir.path(),
            JobKind::Classify,
            LdaOptions::sparse(2, 0.5, 0.1, 0.15, 0.01, "nhl"),
        );

        let outcomes = run_jobs(toy_corpus(), &[good, bad, classify], 2)?;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());

        if let JobOutcome::Ok { files, accuracy, .. } = &outcomes[2] {
            assert!(accuracy.is_some());
            for f in files {
                assert!(Path::new(f).exists(), "{}", f);
            }
        }
        if let JobOutcome::Failed { message, .. } = &outcomes[1] {
            assert!(message.contains("mlb"));
        }

        let report = create_temp_dir_file("json")?;
        let report = report.to_str().unwrap();
        write_report(&outcomes, report)?;
        let text = read_lines(report)?.join("\n");
        let back: Vec<JobOutcome> = serde_json::from_str(&text)?;
        let names: Vec<&str> = back.iter().map(|o| o.name()).collect();
        assert_eq!(names, outcomes.iter().map(|o| o.name()).collect::<Vec<_>>());
        assert_eq!(back.iter().filter(|o| o.is_ok()).count(), 2);
        Ok(())
    }
}
