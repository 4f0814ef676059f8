//! Latent inclusion sampler for the group-specific topic priors.
//!
//! Every non-reference group `c` holds a binary inclusion variable per
//! topic `i`. Retained topics carry concentration `alpha`, dropped topics
//! `alpha * eta`. Given all other entries of the group's prior, the two
//! states are scored by the Dirichlet-multinomial likelihood of the
//! group's documents, one document at a time:
//!
//! ```text
//! score(x) = n_c * ln(prior(x))
//!          + sum_{d in c} [ lgamma(x + S_i) + lgamma(x + n[d,i])
//!                           - lgamma(x) - lgamma(x + S_i + n[d]) ]
//! ```
//!
//! where `S_i` is the group's prior mass without topic `i`,
//! `prior(alpha * eta) = 1 - gamma` and `prior(alpha) = gamma`.

use crate::likelihood::ln_gamma;
use crate::state::ModelState;
use rand::Rng;

/// Numerically stable `ln(exp(x) + exp(y))`.
#[inline]
pub fn log_sum_exp(x: f64, y: f64) -> f64 {
    let m = x.max(y);
    m + (-(x - y).abs()).exp().ln_1p()
}

/// Unnormalized log-posterior of the two inclusion states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclusionScores {
    /// topic dropped (`alpha * eta`)
    pub low: f64,
    /// topic retained (`alpha`)
    pub high: f64,
}

impl InclusionScores {
    pub fn prob_dropped(&self) -> f64 {
        (self.low - log_sum_exp(self.low, self.high)).exp()
    }

    pub fn prob_retained(&self) -> f64 {
        (self.high - log_sum_exp(self.low, self.high)).exp()
    }
}

/// Score both inclusion states of `topic` for one group.
///
/// * `state` - Current sufficient statistics
/// * `group_docs` - Indices of the documents in the group
/// * `topic` - Topic being resampled
/// * `alpha_rest` - Sum of the group's prior over every other topic
pub fn inclusion_scores(
    state: &ModelState,
    group_docs: &[usize],
    topic: usize,
    alpha_rest: f64,
) -> InclusionScores {
    let hyper = state.hyper();
    let n_docs = group_docs.len() as f64;

    let score = |x: f64, ln_prior: f64| -> f64 {
        let mut s = n_docs * (ln_prior + ln_gamma(x + alpha_rest) - ln_gamma(x));
        for &d in group_docs {
            s += ln_gamma(x + state.doc_topic[[d, topic]] as f64)
                - ln_gamma(x + alpha_rest + state.doc_len(d) as f64);
        }
        s
    };

    InclusionScores {
        low: score(hyper.alpha_dropped(), (1.0 - hyper.gamma).ln()),
        high: score(hyper.alpha, hyper.gamma.ln()),
    }
}

/// Resamples `alpha[c][i]` for every non-reference group `c`.
pub struct AlphaSampler {
    /// document indices of each group
    group_docs: Vec<Vec<usize>>,
}

impl AlphaSampler {
    pub fn new(state: &ModelState) -> Self {
        let mut group_docs = vec![Vec::new(); state.num_groups()];
        for d in 0..state.num_docs() {
            group_docs[state.doc_group(d)].push(d);
        }
        AlphaSampler { group_docs }
    }

    /// One pass over all (group, topic) pairs except the reference group.
    ///
    /// No-op in plain LDA mode (`gamma >= 1`). Returns the number of
    /// topics switched into the dropped state.
    pub fn sweep<R: Rng>(&self, state: &mut ModelState, rng: &mut R) -> usize {
        let hyper = *state.hyper();
        if !hyper.is_sparse() {
            return 0;
        }

        let mut dropped = 0;
        for c in 1..state.num_groups() {
            let docs = &self.group_docs[c];
            let mut alpha_sum: f64 = state.alpha.row(c).sum();

            for i in 0..state.num_topics() {
                let alpha_rest = alpha_sum - state.alpha[[c, i]];
                let scores = inclusion_scores(state, docs, i, alpha_rest);
                let p = scores.prob_dropped();

                let u: f64 = rng.random();
                let new_alpha = if u < p {
                    dropped += 1;
                    hyper.alpha_dropped()
                } else {
                    hyper.alpha
                };
                state.alpha[[c, i]] = new_alpha;
                alpha_sum = alpha_rest + new_alpha;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LdaOptions;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn toy_state(options: &LdaOptions) -> (Vec<Vec<usize>>, ModelState) {
        let docs: Vec<Vec<usize>> = vec![
            vec![0, 1, 0, 1, 2],
            vec![0, 0, 1, 2],
            vec![3, 4, 3, 4, 4, 3],
            vec![3, 3, 4],
        ];
        let tokens: Vec<&[usize]> = docs.iter().map(|d| d.as_slice()).collect();
        let mut rng = SmallRng::seed_from_u64(11);
        let state = ModelState::random_init(&tokens, vec![0, 0, 1, 1], 2, 5, options, &mut rng);
        (docs, state)
    }

    #[test]
    fn test_log_sum_exp() {
        assert_abs_diff_eq!(log_sum_exp(0.0, 0.0), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            log_sum_exp(1.0, 3.0),
            (1f64.exp() + 3f64.exp()).ln(),
            epsilon = 1e-12
        );
        // far apart values do not overflow
        assert_abs_diff_eq!(log_sum_exp(-1000.0, 1000.0), 1000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inclusion_probabilities_sum_to_one() {
        let options = LdaOptions::sparse(3, 0.5, 0.1, 0.15, 0.01, "a");
        let (_, state) = toy_state(&options);
        let sampler = AlphaSampler::new(&state);

        for i in 0..3 {
            let rest: f64 = state.alpha().row(1).sum() - state.alpha()[[1, i]];
            let scores = inclusion_scores(&state, &sampler.group_docs[1], i, rest);
            assert!(scores.low.is_finite() && scores.high.is_finite());
            assert_abs_diff_eq!(
                scores.prob_dropped() + scores.prob_retained(),
                1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_inclusion_scores_match_direct_formula() {
        let options = LdaOptions::sparse(2, 1.0, 0.1, 0.3, 0.05, "a");
        let (_, state) = toy_state(&options);
        let docs = vec![2, 3];
        let rest = 1.0;
        let scores = inclusion_scores(&state, &docs, 0, rest);

        let x = 0.05;
        let mut low = 2.0 * 0.7f64.ln();
        for &d in &docs {
            let n_di = state.doc_topic_counts()[[d, 0]] as f64;
            let n_d = state.doc_len(d) as f64;
            low += ln_gamma(x + rest) + ln_gamma(x + n_di) - ln_gamma(x) - ln_gamma(x + rest + n_d);
        }
        assert_abs_diff_eq!(scores.low, low, epsilon = 1e-9);
    }

    #[test]
    fn test_reference_group_is_never_resampled() {
        let options = LdaOptions::sparse(3, 0.5, 0.1, 0.05, 0.01, "a");
        let (_, mut state) = toy_state(&options);
        let sampler = AlphaSampler::new(&state);
        let mut rng = SmallRng::seed_from_u64(5);

        for _ in 0..50 {
            sampler.sweep(&mut state, &mut rng);
            assert!(state.alpha().row(0).iter().all(|&a| a == 0.5));
            assert!(state
                .alpha()
                .row(1)
                .iter()
                .all(|&a| a == 0.5 || a == 0.5 * 0.01));
        }
    }

    #[test]
    fn test_plain_mode_is_noop() {
        let options = LdaOptions::plain(3, 0.5, 0.1, "a");
        let (_, mut state) = toy_state(&options);
        let sampler = AlphaSampler::new(&state);
        let mut rng = SmallRng::seed_from_u64(5);

        for _ in 0..10 {
            assert_eq!(sampler.sweep(&mut state, &mut rng), 0);
        }
        assert!(state.alpha().iter().all(|&a| a == 0.5));
    }

    #[test]
    fn test_low_gamma_drops_some_topics() {
        // gamma close to zero puts almost all prior mass on dropping
        let options = LdaOptions::sparse(3, 0.5, 0.1, 1e-6, 0.5, "a");
        let (_, mut state) = toy_state(&options);
        let sampler = AlphaSampler::new(&state);
        let mut rng = SmallRng::seed_from_u64(9);

        let dropped: usize = (0..10).map(|_| sampler.sweep(&mut state, &mut rng)).sum();
        assert!(dropped > 0);
    }
}
