//! Sufficient statistics of the collapsed sampler.
//!
//! Tracks the topic assignment of every token plus the redundant count
//! tensors derived from it:
//!
//! ```text
//! doc_topic[d, k]            tokens of document d in topic k
//! type_topic[w, k]           occurrences of word type w in topic k
//! group_type_topic[g, w, k]  same, restricted to documents of group g
//! tokens_per_topic[k]        = sum_w type_topic[w, k]
//! group_topic[g, k]          = sum_w group_type_topic[g, w, k]
//! ```
//!
//! All tensors are updated together, one token at a time, so they stay
//! mutually consistent outside a single in-flight update.

use crate::options::LdaOptions;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::Rng;

/// Scalar hyperparameters shared by every sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyper {
    pub alpha: f64,
    pub beta: f64,
    /// `beta * V`
    pub v_beta: f64,
    pub gamma: f64,
    pub eta: f64,
}

impl Hyper {
    pub fn is_sparse(&self) -> bool {
        self.gamma < 1.0
    }

    /// Concentration of a dropped topic.
    pub fn alpha_dropped(&self) -> f64 {
        self.alpha * self.eta
    }
}

/// Mutable model state. Only the samplers in this crate write to it.
#[derive(Debug, Clone)]
pub struct ModelState {
    pub(crate) num_topics: usize,
    pub(crate) num_types: usize,
    pub(crate) num_groups: usize,
    pub(crate) hyper: Hyper,
    /// topic of each token, `topics[d][i]`
    pub(crate) topics: Vec<Vec<usize>>,
    pub(crate) doc_group: Vec<usize>,
    pub(crate) docs_per_group: Vec<usize>,
    pub(crate) doc_topic: Array2<usize>,
    pub(crate) type_topic: Array2<usize>,
    pub(crate) group_type_topic: Array3<usize>,
    pub(crate) tokens_per_topic: Array1<usize>,
    pub(crate) group_topic: Array2<usize>,
    /// per-(group, topic) prior concentration
    pub(crate) alpha: Array2<f64>,
}

impl ModelState {
    /// Assign every token a uniformly random topic and accumulate counts.
    ///
    /// * `tokens` - token sequence of each document
    /// * `doc_group` - group index of each document
    /// * `num_groups` - number of groups (G)
    /// * `num_types` - vocabulary size (V)
    /// * `options` - validated hyperparameters
    pub fn random_init<R: Rng>(
        tokens: &[&[usize]],
        doc_group: Vec<usize>,
        num_groups: usize,
        num_types: usize,
        options: &LdaOptions,
        rng: &mut R,
    ) -> Self {
        debug_assert_eq!(tokens.len(), doc_group.len());
        let k = options.num_topics;
        let num_docs = tokens.len();

        let hyper = Hyper {
            alpha: options.alpha,
            beta: options.beta,
            v_beta: options.beta * num_types as f64,
            gamma: options.gamma,
            eta: options.eta,
        };

        let mut state = ModelState {
            num_topics: k,
            num_types,
            num_groups,
            hyper,
            topics: Vec::with_capacity(num_docs),
            doc_group,
            docs_per_group: vec![0; num_groups],
            doc_topic: Array2::zeros((num_docs, k)),
            type_topic: Array2::zeros((num_types, k)),
            group_type_topic: Array3::zeros((num_groups, num_types, k)),
            tokens_per_topic: Array1::zeros(k),
            group_topic: Array2::zeros((num_groups, k)),
            alpha: Array2::from_elem((num_groups, k), options.alpha),
        };

        for (d, doc) in tokens.iter().enumerate() {
            state.docs_per_group[state.doc_group[d]] += 1;
            let mut z_d = Vec::with_capacity(doc.len());
            for &w in doc.iter() {
                let t = rng.random_range(0..k);
                z_d.push(t);
                state.insert(d, w, t);
            }
            state.topics.push(z_d);
        }

        state
    }

    /// Remove one token of type `w` in document `d` from topic `t`.
    #[inline]
    pub(crate) fn remove(&mut self, d: usize, w: usize, t: usize) {
        let g = self.doc_group[d];
        self.doc_topic[[d, t]] -= 1;
        self.type_topic[[w, t]] -= 1;
        self.group_type_topic[[g, w, t]] -= 1;
        self.tokens_per_topic[t] -= 1;
        self.group_topic[[g, t]] -= 1;
    }

    /// Add one token of type `w` in document `d` to topic `t`.
    #[inline]
    pub(crate) fn insert(&mut self, d: usize, w: usize, t: usize) {
        let g = self.doc_group[d];
        self.doc_topic[[d, t]] += 1;
        self.type_topic[[w, t]] += 1;
        self.group_type_topic[[g, w, t]] += 1;
        self.tokens_per_topic[t] += 1;
        self.group_topic[[g, t]] += 1;
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn num_types(&self) -> usize {
        self.num_types
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_docs(&self) -> usize {
        self.topics.len()
    }

    pub fn hyper(&self) -> &Hyper {
        &self.hyper
    }

    pub fn doc_len(&self, d: usize) -> usize {
        self.topics[d].len()
    }

    pub fn doc_group(&self, d: usize) -> usize {
        self.doc_group[d]
    }

    pub fn docs_per_group(&self) -> &[usize] {
        &self.docs_per_group
    }

    pub fn topic_assignments(&self) -> &[Vec<usize>] {
        &self.topics
    }

    pub fn doc_topic_counts(&self) -> ArrayView2<'_, usize> {
        self.doc_topic.view()
    }

    pub fn type_topic_counts(&self) -> ArrayView2<'_, usize> {
        self.type_topic.view()
    }

    pub fn group_type_topic_counts(&self) -> ArrayView3<'_, usize> {
        self.group_type_topic.view()
    }

    pub fn tokens_per_topic(&self) -> ArrayView1<'_, usize> {
        self.tokens_per_topic.view()
    }

    pub fn group_topic_counts(&self) -> ArrayView2<'_, usize> {
        self.group_topic.view()
    }

    pub fn alpha(&self) -> ArrayView2<'_, f64> {
        self.alpha.view()
    }

    /// Verify every count invariant against the topic assignments.
    ///
    /// Recounts from scratch; intended for tests and debugging.
    pub fn check_consistency(&self, tokens: &[&[usize]]) -> Result<(), String> {
        let k = self.num_topics;
        let mut doc_topic = Array2::<usize>::zeros((self.num_docs(), k));
        let mut type_topic = Array2::<usize>::zeros((self.num_types, k));
        let mut group_type_topic = Array3::<usize>::zeros((self.num_groups, self.num_types, k));

        for (d, (z_d, w_d)) in self.topics.iter().zip(tokens).enumerate() {
            if z_d.len() != w_d.len() {
                return Err(format!("document {}: assignment length mismatch", d));
            }
            let g = self.doc_group[d];
            for (&t, &w) in z_d.iter().zip(w_d.iter()) {
                doc_topic[[d, t]] += 1;
                type_topic[[w, t]] += 1;
                group_type_topic[[g, w, t]] += 1;
            }
        }

        for d in 0..self.num_docs() {
            let n_d: usize = self.doc_topic.row(d).sum();
            if n_d != self.doc_len(d) {
                return Err(format!(
                    "document {}: topic counts sum to {}, length is {}",
                    d,
                    n_d,
                    self.doc_len(d)
                ));
            }
        }
        if doc_topic != self.doc_topic {
            return Err("doc-topic counts drifted".into());
        }
        if type_topic != self.type_topic {
            return Err("type-topic counts drifted".into());
        }
        if group_type_topic != self.group_type_topic {
            return Err("group-type-topic counts drifted".into());
        }

        let per_topic = self.type_topic.sum_axis(Axis(0));
        if per_topic != self.tokens_per_topic {
            return Err("tokens-per-topic does not match type-topic counts".into());
        }
        let per_topic_by_group = self.group_topic.sum_axis(Axis(0));
        if per_topic_by_group != self.tokens_per_topic {
            return Err("tokens-per-group-per-topic does not add up".into());
        }
        if self.group_type_topic.sum_axis(Axis(1)) != self.group_topic {
            return Err("group-topic counts do not match group-type-topic counts".into());
        }
        Ok(())
    }
}
