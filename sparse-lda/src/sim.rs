use crate::corpus::{Corpus, Document, Vocabulary};
use crate::gibbs::sample_cumulative;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use std::sync::Arc;

pub struct SimArgs {
    pub num_docs: usize,
    pub num_groups: usize,
    pub num_topics: usize,
    pub num_types: usize,
    pub doc_length: usize,
    /// topics active in each group
    pub topics_per_group: usize,
    pub rseed: u64,
}

impl Default for SimArgs {
    fn default() -> Self {
        SimArgs {
            num_docs: 200,
            num_groups: 3,
            num_topics: 6,
            num_types: 60,
            doc_length: 50,
            topics_per_group: 2,
            rseed: 42,
        }
    }
}

/// Label of group `g` in simulated corpora; `g0` is the natural reference.
pub fn group_label(g: usize) -> String {
    format!("g{}", g)
}

fn sample_dirichlet<R: Rng>(rgamma: &Gamma<f64>, dim: usize, rng: &mut R) -> Vec<f64> {
    let mut x: Vec<f64> = (0..dim).map(|_| rgamma.sample(rng)).collect();
    let sum: f64 = x.iter().sum();
    x.iter_mut().for_each(|v| *v /= sum);
    x
}

/// Simulate a grouped corpus where each group draws its documents from
/// its own subset of topics.
///
/// ```text
/// phi(k)   ~ Dirichlet(0.1)                    over words
/// g(d)     ~ Uniform{0..G}
/// theta(d) ~ Dirichlet(1) over the topics of g(d), 0 elsewhere
/// w(d,i)   ~ sum_k theta(d,k) phi(k)
/// ```
///
/// Group `g` uses topics `g * T + j (mod K)` for `j < T`. Documents come
/// out in random group order, so a front/back split is unbiased.
pub fn simulate_corpus(args: &SimArgs) -> anyhow::Result<Corpus> {
    if args.num_groups == 0 || args.num_topics == 0 || args.num_types == 0 {
        return Err(anyhow::anyhow!("need at least one group, topic and word"));
    }
    let topics_per_group = args.topics_per_group.clamp(1, args.num_topics);

    let mut rng = SmallRng::seed_from_u64(args.rseed);

    let rgamma_phi = Gamma::new(0.1, 1.0)?;
    let rgamma_theta = Gamma::new(1.0, 1.0)?;

    let phi: Vec<Vec<f64>> = (0..args.num_topics)
        .map(|_| sample_dirichlet(&rgamma_phi, args.num_types, &mut rng))
        .collect();

    let vocab = Arc::new(Vocabulary::from_words(
        (0..args.num_types).map(|v| format!("w{}", v)),
    ));

    let mut docs = Vec::with_capacity(args.num_docs);
    let mut theta = vec![0.0; args.num_topics];
    for d in 0..args.num_docs {
        let g = rng.random_range(0..args.num_groups);

        theta.iter_mut().for_each(|x| *x = 0.0);
        let weights = sample_dirichlet(&rgamma_theta, topics_per_group, &mut rng);
        for (j, w) in weights.into_iter().enumerate() {
            theta[(g * topics_per_group + j) % args.num_topics] += w;
        }

        let tokens: Vec<usize> = (0..args.doc_length)
            .map(|_| {
                let k = sample_cumulative(&theta, 1.0, &mut rng);
                sample_cumulative(&phi[k], 1.0, &mut rng)
            })
            .collect();

        docs.push(Document::new(
            &format!("doc{}", d),
            &group_label(g),
            tokens,
        ));
    }

    Ok(Corpus::new(vocab, docs))
}
