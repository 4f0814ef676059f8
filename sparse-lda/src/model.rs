//! Group-sparse LDA: initialization, estimation and result projections.
//!
//! 1. **Initialization**: every token gets a uniformly random topic; all
//!    count tensors are derived from that assignment and every prior
//!    entry starts at `alpha`.
//! 2. **Estimation**: each iteration is one sequential Gibbs sweep over
//!    the requested documents followed by one pass of the inclusion
//!    sampler over every non-reference group.
//! 3. **Projections**: top words, per-document and per-group topic
//!    proportions, per-group priors and the collapsed log-likelihood.
//!    These only read the state.

use crate::alpha::AlphaSampler;
use crate::corpus::{Corpus, GroupIndex};
use crate::error::LdaError;
use crate::gibbs::TokenSampler;
use crate::likelihood;
use crate::options::LdaOptions;
use crate::state::ModelState;

use indicatif::{ProgressBar, ProgressDrawTarget};
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

/// Number of words per topic in the periodic diagnostic
const DIAGNOSTIC_WORDS: usize = 10;

/// A vocabulary id and its probability under one topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordProb {
    pub word: usize,
    pub prob: f64,
}

/// A fitted (or being fitted) group-sparse LDA model.
pub struct SparseLda {
    corpus: Arc<Corpus>,
    groups: GroupIndex,
    options: LdaOptions,
    state: ModelState,
    token_sampler: TokenSampler,
    alpha_sampler: AlphaSampler,
    rng: SmallRng,
}

impl SparseLda {
    /// Build a model over every document of `corpus`.
    ///
    /// Groups are indexed with `options.reference_group` at 0 and the rest
    /// in first-seen order.
    pub fn new(corpus: Arc<Corpus>, options: LdaOptions) -> anyhow::Result<Self> {
        let groups = GroupIndex::build(&corpus, &options.reference_group)?;
        Self::with_groups(corpus, groups, options)
    }

    /// Build a model with a caller-supplied group index.
    ///
    /// Useful when the index must cover labels outside `corpus`, e.g. a
    /// training split whose held-out part contains extra groups.
    pub fn with_groups(
        corpus: Arc<Corpus>,
        groups: GroupIndex,
        options: LdaOptions,
    ) -> anyhow::Result<Self> {
        options.validate()?;
        if corpus.is_empty() {
            return Err(LdaError::EmptyCorpus.into());
        }
        if groups.get(&options.reference_group) != Some(0) {
            return Err(LdaError::UnknownReference(options.reference_group.clone()).into());
        }

        let tokens = corpus.token_sequences()?;
        let doc_group = groups.doc_groups(&corpus)?;

        let mut rng = SmallRng::seed_from_u64(options.seed);
        let state = ModelState::random_init(
            &tokens,
            doc_group,
            groups.len(),
            corpus.num_types(),
            &options,
            &mut rng,
        );

        let token_sampler = TokenSampler::new(options.num_topics);
        let alpha_sampler = AlphaSampler::new(&state);

        Ok(SparseLda {
            corpus,
            groups,
            options,
            state,
            token_sampler,
            alpha_sampler,
            rng,
        })
    }

    /// Run `num_iterations` rounds of {Gibbs sweep, inclusion sweep} over
    /// all documents.
    ///
    /// * `show_topics_interval` - log top words every this many
    ///   iterations (0 = never)
    pub fn estimate(
        &mut self,
        num_iterations: usize,
        show_topics_interval: usize,
    ) -> anyhow::Result<()> {
        self.estimate_range(0..self.state.num_docs(), num_iterations, show_topics_interval)
    }

    /// Same as [`SparseLda::estimate`], resampling tokens only for the
    /// documents in `docs`. The inclusion sampler still sees every
    /// document of each group.
    pub fn estimate_range(
        &mut self,
        docs: Range<usize>,
        num_iterations: usize,
        show_topics_interval: usize,
    ) -> anyhow::Result<()> {
        if docs.start > docs.end || docs.end > self.state.num_docs() {
            return Err(LdaError::InvalidOption(format!(
                "document range {:?} outside 0..{}",
                docs,
                self.state.num_docs()
            ))
            .into());
        }

        let corpus = self.corpus.clone();
        let tokens = corpus.token_sequences()?;

        info!(
            "{}: K={}, D={}, V={}, G={}, docs={:?}, iterations={}",
            if self.options.is_sparse() {
                "sparse LDA"
            } else {
                "LDA"
            },
            self.state.num_topics(),
            self.state.num_docs(),
            self.state.num_types(),
            self.state.num_groups(),
            docs,
            num_iterations,
        );

        let pb = ProgressBar::new(num_iterations as u64);
        if !self.options.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        let start = Instant::now();

        for iter in 0..num_iterations {
            if show_topics_interval != 0 && iter % show_topics_interval == 0 && iter > 0 {
                self.log_diagnostics(DIAGNOSTIC_WORDS);
            }

            let moves =
                self.token_sampler
                    .sweep(&mut self.state, &tokens, docs.clone(), &mut self.rng);
            let dropped = self.alpha_sampler.sweep(&mut self.state, &mut self.rng);

            log::debug!(
                "iteration {}: token moves={}, dropped topics={}",
                iter,
                moves,
                dropped
            );
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!("Total time: {}", format_elapsed(start.elapsed().as_secs()));
        Ok(())
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    pub fn options(&self) -> &LdaOptions {
        &self.options
    }

    /// Read-only view of the sampler state.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn num_topics(&self) -> usize {
        self.state.num_topics()
    }

    /// Collapsed marginal log-likelihood of the current state.
    pub fn log_likelihood(&self) -> f64 {
        likelihood::log_likelihood(&self.state)
    }

    /// Posterior-mean topic proportions of document `d`:
    /// `(n[d,k] + alpha[g,k]) / sum_k (n[d,k] + alpha[g,k])`.
    pub fn topic_probabilities(&self, d: usize) -> Vec<f64> {
        let g = self.state.doc_group(d);
        let alpha = self.state.alpha();
        let counts = self.state.doc_topic_counts();

        let mut probs: Vec<f64> = (0..self.num_topics())
            .map(|t| counts[[d, t]] as f64 + alpha[[g, t]])
            .collect();
        let sum: f64 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= sum);
        probs
    }

    /// Average topic proportions of the documents in each group, indexed
    /// by group. A group without documents gets its normalized prior.
    pub fn group_topic_distributions(&self) -> Vec<Vec<f64>> {
        let k = self.num_topics();
        let mut dists = vec![vec![0.0; k]; self.groups.len()];

        for d in 0..self.state.num_docs() {
            let g = self.state.doc_group(d);
            for (acc, p) in dists[g].iter_mut().zip(self.topic_probabilities(d)) {
                *acc += p;
            }
        }

        let alpha = self.state.alpha();
        for (g, dist) in dists.iter_mut().enumerate() {
            let n_g = self.state.docs_per_group()[g];
            if n_g > 0 {
                dist.iter_mut().for_each(|x| *x /= n_g as f64);
            } else {
                let row = alpha.row(g);
                let sum = row.sum();
                for (x, &a) in dist.iter_mut().zip(row.iter()) {
                    *x = a / sum;
                }
            }
        }
        dists
    }

    /// Current prior vector `alpha[g][.]` of each group.
    pub fn group_alphas(&self) -> Vec<Vec<f64>> {
        self.state
            .alpha()
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect()
    }

    /// Number of topics each group retains, `sum_k alpha[g,k] / alpha`.
    ///
    /// Dropped topics count as `eta` of a topic.
    pub fn effective_topics(&self) -> Vec<f64> {
        let alpha = self.state.hyper().alpha;
        self.state
            .alpha()
            .rows()
            .into_iter()
            .map(|row| row.sum() / alpha)
            .collect()
    }

    /// The `num_words` most probable words of every topic under
    /// `P(w | k) = n[w,k] / n[k]`.
    ///
    /// Ties keep vocabulary order. An empty topic ranks every word at 0.
    pub fn top_words(&self, num_words: usize) -> Vec<Vec<WordProb>> {
        let type_topic = self.state.type_topic_counts();
        let tokens_per_topic = self.state.tokens_per_topic();

        (0..self.num_topics())
            .map(|t| {
                let n_t = tokens_per_topic[t];
                let mut ranked: Vec<WordProb> = type_topic
                    .column(t)
                    .iter()
                    .enumerate()
                    .map(|(word, &n_wt)| WordProb {
                        word,
                        prob: if n_t > 0 {
                            n_wt as f64 / n_t as f64
                        } else {
                            0.0
                        },
                    })
                    .collect();
                ranked.sort_by(|a, b| b.prob.total_cmp(&a.prob));
                ranked.truncate(num_words);
                ranked
            })
            .collect()
    }

    /// Log top words, effective topics per group and the log-likelihood.
    pub fn log_diagnostics(&self, num_words: usize) {
        let vocab = self.corpus.vocab();
        for (t, words) in self.top_words(num_words).iter().enumerate() {
            let words: Vec<&str> = words.iter().map(|wp| vocab.word(wp.word)).collect();
            info!("Topic {}: {}", t, words.join(" "));
        }
        for (g, n_eff) in self.effective_topics().iter().enumerate() {
            info!("Group {} ({}) effective topics: {:.3}", g, self.groups.label(g), n_eff);
        }
        info!("Model log-likelihood: {}", self.log_likelihood());
    }
}

fn format_elapsed(total_seconds: u64) -> String {
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = (total_seconds / 3600) % 24;
    let days = total_seconds / 86400;

    let mut out = String::new();
    if days != 0 {
        out.push_str(&format!("{} days ", days));
    }
    if hours != 0 {
        out.push_str(&format!("{} hours ", hours));
    }
    if minutes != 0 {
        out.push_str(&format!("{} minutes ", minutes));
    }
    out.push_str(&format!("{} seconds", seconds));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Document, Vocabulary};

    fn two_group_corpus() -> Arc<Corpus> {
        let vocab = Arc::new(Vocabulary::from_words(["puck", "goal", "ice", "ball", "yard"]));
        Arc::new(Corpus::new(
            vocab,
            vec![
                Document::new("a", "nhl", vec![0, 1, 2, 0, 2]),
                Document::new("b", "nhl", vec![2, 0, 1, 1]),
                Document::new("c", "nfl", vec![3, 4, 1, 3, 4, 4]),
            ],
        ))
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(5), "5 seconds");
        assert_eq!(format_elapsed(3725), "1 hours 2 minutes 5 seconds");
        assert_eq!(format_elapsed(86400), "1 days 0 seconds");
    }

    #[test]
    fn test_rejects_bad_range() {
        let options = LdaOptions::plain(2, 0.5, 0.01, "nhl");
        let mut model = SparseLda::new(two_group_corpus(), options).unwrap();
        assert!(model.estimate_range(1..5, 1, 0).is_err());
    }

    #[test]
    fn test_rejects_invalid_options_before_fitting() {
        let mut options = LdaOptions::plain(2, 0.5, 0.01, "nhl");
        options.beta = 0.0;
        let err = SparseLda::new(two_group_corpus(), options).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<LdaError>(),
            Some(LdaError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_topic_probabilities_are_normalized() {
        let options = LdaOptions::sparse(3, 0.5, 0.01, 0.15, 0.01, "nhl");
        let mut model = SparseLda::new(two_group_corpus(), options).unwrap();
        model.estimate(5, 0).unwrap();

        for d in 0..3 {
            let sum: f64 = model.topic_probabilities(d).iter().sum();
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
        for dist in model.group_topic_distributions() {
            let sum: f64 = dist.iter().sum();
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_top_words_sorted_with_stable_ties() {
        let options = LdaOptions::plain(2, 0.5, 0.01, "nhl");
        let mut model = SparseLda::new(two_group_corpus(), options).unwrap();
        model.estimate(3, 0).unwrap();

        for words in model.top_words(5) {
            assert_eq!(words.len(), 5);
            for pair in words.windows(2) {
                assert!(pair[0].prob >= pair[1].prob);
                if pair[0].prob == pair[1].prob {
                    assert!(pair[0].word < pair[1].word);
                }
            }
        }
        // asking for more words than the vocabulary holds
        assert!(model.top_words(100).iter().all(|w| w.len() == 5));
    }

    #[test]
    fn test_effective_topics_plain() {
        let options = LdaOptions::plain(4, 0.25, 0.01, "nhl");
        let model = SparseLda::new(two_group_corpus(), options).unwrap();
        assert_eq!(model.effective_topics(), vec![4.0, 4.0]);
        assert_eq!(model.group_alphas(), vec![vec![0.25; 4]; 2]);
    }
}
