//! Group-sparse Latent Dirichlet Allocation.
//!
//! Documents carry a group label (e.g. the community they were posted in).
//! Every group owns its own Dirichlet prior over topics, and every
//! non-reference group can switch each topic between a full weight
//! (`alpha`) and a sparsified weight (`alpha * eta`) through a latent
//! Bernoulli inclusion variable with prior rate `gamma`.
//!
//! Inference is collapsed Gibbs sampling over token-topic assignments,
//! interleaved with one sweep of the inclusion sampler per iteration.
//!
//! # Model
//!
//! ```text
//! b(g,k)    ~ Bernoulli(gamma)                  for g > 0
//! alpha(g,k) = alpha * (b(g,k) ? 1 : eta)
//! theta(d)  ~ Dirichlet(alpha(g(d), .))
//! phi(k)    ~ Dirichlet(beta)
//! z(d,i)    ~ Categorical(theta(d))
//! w(d,i)    ~ Categorical(phi(z(d,i)))
//! ```
//!
//! Setting `gamma >= 1` recovers plain LDA with a symmetric prior.

/// Buffered (gz-aware) file readers and writers
pub mod common_io;

/// Vocabulary, documents, group indexing and corpus files
pub mod corpus;

/// Typed errors
pub mod error;

/// Hyperparameters and their validation
pub mod options;

/// Count tensors, topic assignments and per-group priors
pub mod state;

/// Collapsed Gibbs sampler over token-topic assignments
pub mod gibbs;

/// Latent inclusion sampler for the group-specific priors
pub mod alpha;

/// Collapsed marginal log-likelihood
pub mod likelihood;

/// Model façade: initialization, estimation and read-only projections
pub mod model;

/// Held-out group label prediction
pub mod classify;

/// Result files
pub mod output;

/// Independent model fits on a worker pool
pub mod jobs;

/// Synthetic grouped corpora
pub mod sim;

pub use classify::{Classification, ClassifyOptions};
pub use corpus::{Corpus, Document, GroupIndex, Payload, Vocabulary};
pub use error::LdaError;
pub use jobs::{Job, JobKind, JobOutcome};
pub use model::{SparseLda, WordProb};
pub use options::LdaOptions;
