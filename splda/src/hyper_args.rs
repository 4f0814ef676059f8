use clap::Args;
use sparse_lda::LdaOptions;

/// Hyperparameters shared by `fit` and `classify`.
#[derive(Args, Debug, Clone)]
pub struct HyperArgs {
    #[arg(
        short = 'k',
        long,
        default_value_t = 20,
        help = "Number of topics"
    )]
    pub num_topics: usize,

    #[arg(long, default_value_t = 0.5, help = "Document-topic concentration")]
    pub alpha: f64,

    #[arg(long, default_value_t = 0.01, help = "Topic-word concentration")]
    pub beta: f64,

    #[arg(
        long,
        default_value_t = 0.15,
        help = "Prior probability that a group keeps a topic",
        long_help = "Prior probability that a non-reference group keeps a topic\n\
                     at full weight. Values >= 1 switch sparsity off (plain LDA)."
    )]
    pub gamma: f64,

    #[arg(
        long,
        default_value_t = 0.01,
        help = "Weight multiplier of dropped topics, in (0, 1)"
    )]
    pub eta: f64,

    #[arg(
        short = 'r',
        long = "reference",
        required = true,
        help = "Label of the reference group (never sparsified)"
    )]
    pub reference_group: String,

    #[arg(long, default_value_t = 42, help = "Random seed")]
    pub seed: u64,

    #[arg(long, default_value_t = false, help = "Plain LDA (ignore gamma and eta)")]
    pub plain: bool,
}

impl HyperArgs {
    pub fn to_options(&self, show_progress: bool) -> LdaOptions {
        let mut options = if self.plain {
            LdaOptions::plain(self.num_topics, self.alpha, self.beta, &self.reference_group)
        } else {
            LdaOptions::sparse(
                self.num_topics,
                self.alpha,
                self.beta,
                self.gamma,
                self.eta,
                &self.reference_group,
            )
        };
        options.seed = self.seed;
        options.show_progress = show_progress;
        options
    }
}
