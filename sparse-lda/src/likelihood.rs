//! Collapsed marginal log-likelihood of the current state.
//!
//! ```text
//! llik = sum_d [ lgamma(A_g) - lgamma(A_g + n_d)
//!              + sum_k lgamma(n[d,k] + alpha[g,k]) - lgamma(alpha[g,k]) ]
//!      + sum_k [ lgamma(V beta) - lgamma(n_k + V beta)
//!              + sum_w lgamma(n[w,k] + beta) - lgamma(beta) ]
//! ```
//!
//! with `g = g(d)` and `A_g = sum_k alpha[g,k]`.

use crate::state::ModelState;
use special::Gamma as SpecialGamma;

/// Natural log of the gamma function.
#[inline]
pub fn ln_gamma(x: f64) -> f64 {
    SpecialGamma::ln_gamma(x).0
}

/// Document-topic part, summed over groups and their documents.
pub fn doc_log_likelihood(state: &ModelState) -> f64 {
    let k = state.num_topics();
    let alpha = state.alpha();

    let alpha_sum: Vec<f64> = alpha.rows().into_iter().map(|row| row.sum()).collect();
    let ln_gamma_alpha: Vec<f64> = alpha
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&a| ln_gamma(a)).sum())
        .collect();

    let doc_topic = state.doc_topic_counts();
    let mut llik = 0.0;
    for d in 0..state.num_docs() {
        let g = state.doc_group(d);
        llik += ln_gamma(alpha_sum[g]) - ln_gamma(alpha_sum[g] + state.doc_len(d) as f64);
        for t in 0..k {
            llik += ln_gamma(doc_topic[[d, t]] as f64 + alpha[[g, t]]);
        }
        llik -= ln_gamma_alpha[g];
    }
    llik
}

/// Topic-word part, summed over topics.
pub fn topic_log_likelihood(state: &ModelState) -> f64 {
    let hyper = state.hyper();
    let num_types = state.num_types() as f64;
    let type_topic = state.type_topic_counts();
    let tokens_per_topic = state.tokens_per_topic();

    let mut llik = 0.0;
    for t in 0..state.num_topics() {
        llik += ln_gamma(hyper.v_beta) - ln_gamma(tokens_per_topic[t] as f64 + hyper.v_beta);
        for &n_wt in type_topic.column(t) {
            llik += ln_gamma(n_wt as f64 + hyper.beta);
        }
        llik -= num_types * ln_gamma(hyper.beta);
    }
    llik
}

/// Total collapsed log-likelihood. Read-only; O(D*K + V*K).
pub fn log_likelihood(state: &ModelState) -> f64 {
    doc_log_likelihood(state) + topic_log_likelihood(state)
}
