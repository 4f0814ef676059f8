//! Held-out label inference.
//!
//! A held-out document is folded into a fitted model by Gibbs-sampling
//! only its own topic counts, with the word-topic counts of the training
//! documents held fixed and the reference prior `alpha` on every topic.
//! Each group `g` is then scored by
//!
//! ```text
//! score(g) = ln prior(g) + sum_k n[d,k] * ln profile(g)[k]
//! profile(g)[k] ∝ sum_{d' in g} n[d',k] + alpha[g,k]
//! prior(g) = (docs in g + 1) / (D + G)
//! ```
//!
//! and the best-scoring group (lowest index on ties) is the prediction.

use crate::corpus::{Corpus, GroupIndex};
use crate::gibbs::sample_cumulative;
use crate::model::SparseLda;
use crate::options::LdaOptions;

use log::info;
use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyOptions {
    /// Share of documents, from the front, used for training. Default: 0.8
    pub train_fraction: f64,
    /// Training iterations. Default: 1000
    pub num_iterations: usize,
    /// Gibbs sweeps per held-out document. Default: 25
    pub inference_sweeps: usize,
    /// Diagnostic interval during training (0 = never). Default: 0
    pub show_topics_interval: usize,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        ClassifyOptions {
            train_fraction: 0.8,
            num_iterations: 1000,
            inference_sweeps: 25,
            show_topics_interval: 0,
        }
    }
}

/// Outcome of classifying a held-out set.
#[derive(Debug, Clone)]
pub struct Classification {
    /// `confusion[true][predicted]`
    pub confusion: Array2<usize>,
    /// predicted group of each held-out document
    pub predictions: Vec<usize>,
    pub accuracy: f64,
    pub macro_f1: f64,
}

/// Per-group log topic profiles `ln profile(g)[k]` and log priors.
struct GroupScorer {
    ln_profile: Array2<f64>,
    ln_prior: Vec<f64>,
}

impl GroupScorer {
    fn new(model: &SparseLda) -> Self {
        let state = model.state();
        let (num_groups, k) = (state.num_groups(), state.num_topics());
        let doc_topic = state.doc_topic_counts();

        let mut profile = state.alpha().to_owned();
        for d in 0..state.num_docs() {
            let g = state.doc_group(d);
            for t in 0..k {
                profile[[g, t]] += doc_topic[[d, t]] as f64;
            }
        }
        for mut row in profile.rows_mut() {
            let sum = row.sum();
            row.mapv_inplace(|x| (x / sum).ln());
        }

        let denom = (state.num_docs() + num_groups) as f64;
        let ln_prior = state
            .docs_per_group()
            .iter()
            .map(|&n| ((n + 1) as f64 / denom).ln())
            .collect();

        GroupScorer {
            ln_profile: profile,
            ln_prior,
        }
    }

    fn predict(&self, topic_counts: &[usize]) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (g, &ln_prior) in self.ln_prior.iter().enumerate() {
            let score = ln_prior
                + topic_counts
                    .iter()
                    .zip(self.ln_profile.row(g))
                    .map(|(&n, &lp)| n as f64 * lp)
                    .sum::<f64>();
            if score > best_score {
                best = g;
                best_score = score;
            }
        }
        best
    }
}

/// Fold one held-out token sequence into `model` and return its topic
/// counts. The model itself is not modified.
pub fn infer_topic_counts<R: Rng>(
    model: &SparseLda,
    tokens: &[usize],
    num_sweeps: usize,
    rng: &mut R,
) -> Vec<usize> {
    let state = model.state();
    let hyper = state.hyper();
    let k = state.num_topics();
    let type_topic = state.type_topic_counts();
    let tokens_per_topic = state.tokens_per_topic();

    let mut topics: Vec<usize> = tokens.iter().map(|_| rng.random_range(0..k)).collect();
    let mut counts = vec![0usize; k];
    for &t in &topics {
        counts[t] += 1;
    }

    let mut weights = vec![0.0; k];
    for _ in 0..num_sweeps {
        for (z, &w) in topics.iter_mut().zip(tokens) {
            counts[*z] -= 1;
            let mut total = 0.0;
            for (t, weight) in weights.iter_mut().enumerate() {
                *weight = (type_topic[[w, t]] as f64 + hyper.beta)
                    / (tokens_per_topic[t] as f64 + hyper.v_beta)
                    * (counts[t] as f64 + hyper.alpha);
                total += *weight;
            }
            *z = sample_cumulative(&weights, total, rng);
            counts[*z] += 1;
        }
    }
    counts
}

/// Predict the group of every document in `held_out` and compare with
/// its true label.
///
/// `held_out` must share the model's vocabulary; its labels must be known
/// to the model's group index.
pub fn classify_held_out<R: Rng>(
    model: &SparseLda,
    held_out: &Corpus,
    num_sweeps: usize,
    rng: &mut R,
) -> anyhow::Result<Classification> {
    let num_groups = model.groups().len();
    let truth = model.groups().doc_groups(held_out)?;
    let tokens = held_out.token_sequences()?;
    if held_out.num_types() > model.state().num_types() {
        return Err(anyhow::anyhow!(
            "held-out vocabulary ({}) exceeds the model's ({})",
            held_out.num_types(),
            model.state().num_types()
        ));
    }

    let scorer = GroupScorer::new(model);
    let mut confusion = Array2::<usize>::zeros((num_groups, num_groups));
    let mut predictions = Vec::with_capacity(tokens.len());

    for (doc, &g_true) in tokens.iter().zip(&truth) {
        let counts = infer_topic_counts(model, doc, num_sweeps, rng);
        let g_pred = scorer.predict(&counts);
        confusion[[g_true, g_pred]] += 1;
        predictions.push(g_pred);
    }

    Ok(Classification {
        accuracy: accuracy(&confusion),
        macro_f1: macro_f1(&confusion),
        confusion,
        predictions,
    })
}

/// Split `corpus`, fit a model on the front part and classify the rest.
///
/// The group index is built over the whole corpus so held-out labels
/// absent from training still get a row in the confusion matrix.
pub fn train_and_classify(
    corpus: &Corpus,
    options: LdaOptions,
    classify: &ClassifyOptions,
) -> anyhow::Result<(SparseLda, Classification)> {
    if !(classify.train_fraction > 0.0 && classify.train_fraction < 1.0) {
        return Err(crate::error::LdaError::InvalidOption(format!(
            "train_fraction must lie in (0, 1), got {}",
            classify.train_fraction
        ))
        .into());
    }

    let groups = GroupIndex::build(corpus, &options.reference_group)?;
    let (train, held_out) = corpus.train_split(classify.train_fraction);
    info!(
        "classification: {} training and {} held-out documents",
        train.len(),
        held_out.len()
    );

    let seed = options.seed;
    let mut model = SparseLda::with_groups(Arc::new(train), groups, options)?;
    model.estimate(classify.num_iterations, classify.show_topics_interval)?;

    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let result = classify_held_out(&model, &held_out, classify.inference_sweeps, &mut rng)?;
    info!(
        "accuracy: {:.4}, macro-F1: {:.4}",
        result.accuracy, result.macro_f1
    );
    Ok((model, result))
}

/// Fraction of documents on the diagonal. 0 for an empty matrix.
pub fn accuracy(confusion: &Array2<usize>) -> f64 {
    let total = confusion.sum();
    if total == 0 {
        return 0.0;
    }
    confusion.diag().sum() as f64 / total as f64
}

/// Unweighted mean of per-class F1 over classes with at least one true or
/// predicted instance.
pub fn macro_f1(confusion: &Array2<usize>) -> f64 {
    let mut f1_sum = 0.0;
    let mut num_classes = 0;

    for c in 0..confusion.nrows() {
        let tp = confusion[[c, c]] as f64;
        let n_true = confusion.row(c).sum();
        let n_pred = confusion.column(c).sum();
        if n_true + n_pred == 0 {
            continue;
        }
        num_classes += 1;

        let precision = if n_pred > 0 { tp / n_pred as f64 } else { 0.0 };
        let recall = if n_true > 0 { tp / n_true as f64 } else { 0.0 };
        if precision + recall > 0.0 {
            f1_sum += 2.0 * precision * recall / (precision + recall);
        }
    }

    if num_classes == 0 {
        0.0
    } else {
        f1_sum / num_classes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Document, Vocabulary};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_accuracy_and_macro_f1() {
        let confusion = array![[3, 1], [0, 4]];
        assert_abs_diff_eq!(accuracy(&confusion), 7.0 / 8.0, epsilon = 1e-12);

        // class 0: p = 1, r = 3/4; class 1: p = 4/5, r = 1
        let f0 = 2.0 * 1.0 * 0.75 / 1.75;
        let f1 = 2.0 * 0.8 * 1.0 / 1.8;
        assert_abs_diff_eq!(macro_f1(&confusion), (f0 + f1) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_macro_f1_skips_absent_classes() {
        let confusion = array![[2, 0, 0], [0, 0, 0], [0, 0, 2]];
        assert_abs_diff_eq!(macro_f1(&confusion), 1.0, epsilon = 1e-12);
        assert_eq!(macro_f1(&Array2::zeros((2, 2))), 0.0);
        assert_eq!(accuracy(&Array2::zeros((2, 2))), 0.0);
    }

    #[test]
    fn test_scorer_prefers_matching_profile_and_breaks_ties_low() {
        let scorer = GroupScorer {
            ln_profile: array![[0.9f64.ln(), 0.1f64.ln()], [0.1f64.ln(), 0.9f64.ln()]],
            ln_prior: vec![0.5f64.ln(), 0.5f64.ln()],
        };
        assert_eq!(scorer.predict(&[5, 0]), 0);
        assert_eq!(scorer.predict(&[0, 5]), 1);
        assert_eq!(scorer.predict(&[2, 2]), 0);
    }

    #[test]
    fn test_inference_leaves_model_untouched() {
        let vocab = Arc::new(Vocabulary::with_size(4));
        let corpus = Arc::new(Corpus::new(
            vocab,
            vec![
                Document::new("a", "x", vec![0, 1, 0, 1]),
                Document::new("b", "y", vec![2, 3, 3, 2]),
            ],
        ));
        let options = LdaOptions::plain(2, 0.5, 0.1, "x");
        let mut model = SparseLda::new(corpus, options).unwrap();
        model.estimate(10, 0).unwrap();

        let before = model.state().type_topic_counts().to_owned();
        let mut rng = SmallRng::seed_from_u64(0);
        let counts = infer_topic_counts(&model, &[0, 1, 2], 5, &mut rng);

        assert_eq!(counts.iter().sum::<usize>(), 3);
        assert_eq!(model.state().type_topic_counts(), before.view());
    }

    #[test]
    fn test_rejects_bad_train_fraction() {
        let vocab = Arc::new(Vocabulary::with_size(2));
        let corpus = Corpus::new(vocab, vec![Document::new("a", "x", vec![0, 1])]);
        let options = LdaOptions::plain(2, 0.5, 0.1, "x");
        let classify = ClassifyOptions {
            train_fraction: 1.0,
            ..Default::default()
        };
        assert!(train_and_classify(&corpus, options, &classify).is_err());
    }
}
