use crate::error::LdaError;
use serde::{Deserialize, Serialize};

/// Hyperparameters of one model fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdaOptions {
    /// Number of topics (K). Default: 20
    pub num_topics: usize,
    /// Scalar document-topic concentration. Default: 0.5
    pub alpha: f64,
    /// Symmetric topic-word concentration. Default: 0.01
    pub beta: f64,
    /// Prior probability that a group retains a topic at full weight.
    /// `gamma >= 1` disables sparsity (plain LDA). Default: 0.15
    pub gamma: f64,
    /// Multiplier applied to `alpha` for dropped topics, in (0, 1). Default: 0.01
    pub eta: f64,
    /// Label of the reference group (index 0, never sparsified)
    pub reference_group: String,
    /// Random seed. Default: 42
    pub seed: u64,
    /// Draw a progress bar during estimation. Default: false
    pub show_progress: bool,
}

impl Default for LdaOptions {
    fn default() -> Self {
        LdaOptions {
            num_topics: 20,
            alpha: 0.5,
            beta: 0.01,
            gamma: 0.15,
            eta: 0.01,
            reference_group: String::new(),
            seed: 42,
            show_progress: false,
        }
    }
}

impl LdaOptions {
    /// Plain LDA: every group keeps the symmetric prior `alpha`.
    pub fn plain(num_topics: usize, alpha: f64, beta: f64, reference_group: &str) -> Self {
        LdaOptions {
            num_topics,
            alpha,
            beta,
            gamma: 1.0,
            eta: 1.0,
            reference_group: reference_group.to_string(),
            ..Default::default()
        }
    }

    /// Group-sparse LDA.
    pub fn sparse(
        num_topics: usize,
        alpha: f64,
        beta: f64,
        gamma: f64,
        eta: f64,
        reference_group: &str,
    ) -> Self {
        LdaOptions {
            num_topics,
            alpha,
            beta,
            gamma,
            eta,
            reference_group: reference_group.to_string(),
            ..Default::default()
        }
    }

    pub fn is_sparse(&self) -> bool {
        self.gamma < 1.0
    }

    /// Reject any setting that would put a zero or negative argument into
    /// a denominator or a log-gamma call.
    pub fn validate(&self) -> Result<(), LdaError> {
        if self.num_topics == 0 {
            return Err(LdaError::InvalidOption("num_topics must be > 0".into()));
        }
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LdaError::InvalidOption(format!(
                    "{} must be a finite value > 0, got {}",
                    name, value
                )));
            }
        }
        if self.is_sparse() && !(self.eta > 0.0 && self.eta < 1.0) {
            return Err(LdaError::InvalidOption(format!(
                "eta must lie in (0, 1) when gamma < 1, got {}",
                self.eta
            )));
        }
        Ok(())
    }
}
