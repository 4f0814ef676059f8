//! Collapsed Gibbs sampler over token-topic assignments.
//!
//! For each token, removes it from the counts, evaluates the collapsed
//! conditional over all K topics
//!
//! ```text
//! p(z = k | rest) ∝ (n[w,k] + beta) / (n[k] + V * beta) * (n[d,k] + alpha[g(d),k])
//! ```
//!
//! and re-inserts it under a topic drawn from that distribution. Tokens
//! are visited strictly in document order: each draw sees every move made
//! earlier in the same sweep.

use crate::state::ModelState;
use rand::Rng;
use std::ops::Range;

/// Sequential token sampler with a reusable weight buffer.
pub struct TokenSampler {
    /// Scratch space for per-topic unnormalized weights
    weights: Vec<f64>,
}

impl TokenSampler {
    pub fn new(num_topics: usize) -> Self {
        TokenSampler {
            weights: vec![0.0; num_topics],
        }
    }

    /// One full sweep over the documents in `docs`.
    ///
    /// Returns the number of tokens whose topic changed.
    ///
    /// * `state` - Sufficient statistics (modified in place)
    /// * `tokens` - Token sequence of every document in the state
    /// * `docs` - Contiguous range of document indices to resample
    /// * `rng` - Random number generator
    pub fn sweep<R: Rng>(
        &mut self,
        state: &mut ModelState,
        tokens: &[&[usize]],
        docs: Range<usize>,
        rng: &mut R,
    ) -> usize {
        debug_assert!(docs.end <= tokens.len());
        self.weights.resize(state.num_topics, 0.0);

        let mut moves = 0;
        for d in docs {
            let g = state.doc_group[d];
            for (i, &w) in tokens[d].iter().enumerate() {
                let old_t = state.topics[d][i];
                state.remove(d, w, old_t);

                let total = self.topic_weights(state, d, g, w);
                let new_t = sample_cumulative(&self.weights, total, rng);

                state.insert(d, w, new_t);
                state.topics[d][i] = new_t;
                if new_t != old_t {
                    moves += 1;
                }
            }
        }
        moves
    }

    /// Fill the weight buffer for a token of type `w` in document `d`
    /// (already removed from the counts) and return the total weight.
    fn topic_weights(&mut self, state: &ModelState, d: usize, g: usize, w: usize) -> f64 {
        let hyper = &state.hyper;
        let mut total = 0.0;
        for (t, weight) in self.weights.iter_mut().enumerate() {
            let word_term = (state.type_topic[[w, t]] as f64 + hyper.beta)
                / (state.tokens_per_topic[t] as f64 + hyper.v_beta);
            let doc_term = state.doc_topic[[d, t]] as f64 + state.alpha[[g, t]];
            *weight = word_term * doc_term;
            total += *weight;
        }
        total
    }
}

/// Draw an index proportionally to `weights` by walking the cumulative sum.
///
/// `total` must equal the sum of `weights` and be positive. Zero-weight
/// entries are never returned.
pub fn sample_cumulative<R: Rng>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    let u: f64 = rng.random::<f64>() * total;
    let mut cum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cum += w;
        if u < cum {
            return i;
        }
    }

    // rounding left u at the very top of the range
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1)
}
