//! Corpus input contract.
//!
//! A corpus is a list of documents, each a group label plus an ordered
//! sequence of vocabulary ids. Tokenization happens upstream; the file
//! reader here only splits already-tokenized text on whitespace.

use crate::common_io::{open_buf_reader, open_buf_writer};
use crate::error::LdaError;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Fixed mapping between token types and integer ids.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<Box<str>>,
    index: HashMap<Box<str>, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary whose words are the decimal ids `0..size`.
    pub fn with_size(size: usize) -> Self {
        Self::from_words((0..size).map(|v| v.to_string()))
    }

    /// Build from words in id order. Repeated words keep their first id.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::new();
        for w in words {
            vocab.get_or_insert(w.as_ref());
        }
        vocab
    }

    /// Id of `word`, assigning the next free id on first sight.
    pub fn get_or_insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.index.get(word) {
            return id;
        }
        let id = self.words.len();
        let word: Box<str> = word.into();
        self.words.push(word.clone());
        self.index.insert(word, id);
        id
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn word(&self, id: usize) -> &str {
        &self.words[id]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Document payload as delivered by the ingestion pipeline.
///
/// Only `Sequence` can be modelled; `Weighted` (bag-of-words feature
/// vectors) is rejected at model construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Sequence(Vec<usize>),
    Weighted(Vec<(usize, f32)>),
}

/// One corpus item.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: Box<str>,
    pub label: Box<str>,
    pub payload: Payload,
}

impl Document {
    pub fn new(name: &str, label: &str, tokens: Vec<usize>) -> Self {
        Document {
            name: name.into(),
            label: label.into(),
            payload: Payload::Sequence(tokens),
        }
    }

    pub fn weighted(name: &str, label: &str, features: Vec<(usize, f32)>) -> Self {
        Document {
            name: name.into(),
            label: label.into(),
            payload: Payload::Weighted(features),
        }
    }

    /// Token ids if the payload is a flat sequence.
    pub fn tokens(&self) -> Option<&[usize]> {
        match &self.payload {
            Payload::Sequence(tokens) => Some(tokens),
            Payload::Weighted(_) => None,
        }
    }
}

/// Read-only document collection over a shared vocabulary.
#[derive(Debug, Clone)]
pub struct Corpus {
    vocab: Arc<Vocabulary>,
    docs: Vec<Document>,
}

impl Corpus {
    pub fn new(vocab: Arc<Vocabulary>, docs: Vec<Document>) -> Self {
        Corpus { vocab, docs }
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn num_types(&self) -> usize {
        self.vocab.len()
    }

    /// Scan the corpus once and return every document's token sequence.
    ///
    /// Fails on the first weighted payload or out-of-vocabulary id.
    pub fn token_sequences(&self) -> Result<Vec<&[usize]>, LdaError> {
        let num_types = self.num_types();
        self.docs
            .iter()
            .enumerate()
            .map(|(d, doc)| {
                let tokens = doc.tokens().ok_or(LdaError::InputShape { doc: d })?;
                if let Some(&token) = tokens.iter().find(|&&w| w >= num_types) {
                    return Err(LdaError::TokenOutOfRange {
                        doc: d,
                        token,
                        vocab_size: num_types,
                    });
                }
                Ok(tokens)
            })
            .collect()
    }

    /// Split into `[0, n)` and `[n, N)`, both sharing this vocabulary.
    pub fn split_at(&self, n: usize) -> (Corpus, Corpus) {
        let n = n.min(self.docs.len());
        let (head, tail) = self.docs.split_at(n);
        (
            Corpus::new(self.vocab.clone(), head.to_vec()),
            Corpus::new(self.vocab.clone(), tail.to_vec()),
        )
    }

    /// Deterministic training/held-out split at `floor(N * fraction)`.
    ///
    /// No shuffling: pre-randomize the document order for an unbiased split.
    pub fn train_split(&self, fraction: f64) -> (Corpus, Corpus) {
        let n = (self.docs.len() as f64 * fraction).floor() as usize;
        self.split_at(n)
    }

    /// Read a corpus file of `name<TAB>label<TAB>tokens` lines.
    ///
    /// Tokens are whitespace-separated and assigned vocabulary ids in
    /// first-seen order. Blank lines and `#` comments are skipped.
    pub fn from_file(input_file: &str) -> anyhow::Result<Corpus> {
        let buf = open_buf_reader(input_file)?;
        let mut vocab = Vocabulary::new();
        let mut docs = vec![];

        for (i, line) in buf.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let (name, label, text) = match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(label), Some(text)) => (name, label, text),
                _ => {
                    return Err(LdaError::Parse {
                        line: i + 1,
                        message: "expected `name<TAB>label<TAB>tokens`".to_string(),
                    }
                    .into())
                }
            };
            let tokens = text
                .split_whitespace()
                .map(|w| vocab.get_or_insert(w))
                .collect();
            docs.push(Document::new(name, label, tokens));
        }

        Ok(Corpus::new(Arc::new(vocab), docs))
    }

    /// Write in the format read by [`Corpus::from_file`].
    pub fn to_file(&self, output_file: &str) -> anyhow::Result<()> {
        let mut buf = open_buf_writer(output_file)?;
        let tokens = self.token_sequences()?;
        for (doc, tokens) in self.docs.iter().zip(tokens) {
            let text: Vec<&str> = tokens.iter().map(|&w| self.vocab.word(w)).collect();
            writeln!(buf, "{}\t{}\t{}", doc.name, doc.label, text.join(" "))?;
        }
        buf.flush()?;
        Ok(())
    }
}

/// Stable integer index for each group label.
///
/// The reference label always maps to 0. Every other label is numbered
/// `1..G` in the order it first appears in the corpus.
#[derive(Debug, Clone)]
pub struct GroupIndex {
    labels: Vec<Box<str>>,
    index: HashMap<Box<str>, usize>,
}

impl GroupIndex {
    pub fn build(corpus: &Corpus, reference: &str) -> Result<Self, LdaError> {
        if corpus.is_empty() {
            return Err(LdaError::EmptyCorpus);
        }
        if !corpus.docs().iter().any(|d| &*d.label == reference) {
            return Err(LdaError::UnknownReference(reference.to_string()));
        }

        let mut labels: Vec<Box<str>> = vec![reference.into()];
        let mut index: HashMap<Box<str>, usize> = HashMap::new();
        index.insert(reference.into(), 0);

        for doc in corpus.docs() {
            if !index.contains_key(&doc.label) {
                index.insert(doc.label.clone(), labels.len());
                labels.push(doc.label.clone());
            }
        }

        Ok(GroupIndex { labels, index })
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, group: usize) -> &str {
        &self.labels[group]
    }

    pub fn labels(&self) -> &[Box<str>] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Group index of every document in `corpus`.
    pub fn doc_groups(&self, corpus: &Corpus) -> Result<Vec<usize>, LdaError> {
        corpus
            .docs()
            .iter()
            .map(|d| {
                self.get(&d.label)
                    .ok_or_else(|| LdaError::UnknownGroup(d.label.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_io::{create_temp_dir_file, write_types};

    fn toy_corpus() -> Corpus {
        let vocab = Arc::new(Vocabulary::with_size(5));
        Corpus::new(
            vocab,
            vec![
                Document::new("a", "nfl", vec![0, 1]),
                Document::new("b", "nhl", vec![2, 3]),
                Document::new("c", "nba", vec![4]),
                Document::new("d", "nhl", vec![1, 2]),
            ],
        )
    }

    #[test]
    fn test_reference_group_is_zero_and_rest_first_seen() {
        let corpus = toy_corpus();
        let groups = GroupIndex::build(&corpus, "nhl").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.get("nhl"), Some(0));
        assert_eq!(groups.get("nfl"), Some(1));
        assert_eq!(groups.get("nba"), Some(2));
        assert_eq!(groups.doc_groups(&corpus).unwrap(), vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_missing_reference_is_rejected() {
        let corpus = toy_corpus();
        let err = GroupIndex::build(&corpus, "mlb").unwrap_err();
        assert_eq!(err, LdaError::UnknownReference("mlb".to_string()));
    }

    #[test]
    fn test_weighted_payload_is_input_shape_error() {
        let vocab = Arc::new(Vocabulary::with_size(3));
        let corpus = Corpus::new(
            vocab,
            vec![
                Document::new("a", "x", vec![0, 1]),
                Document::weighted("b", "x", vec![(2, 1.5)]),
            ],
        );
        assert_eq!(
            corpus.token_sequences().unwrap_err(),
            LdaError::InputShape { doc: 1 }
        );
    }

    #[test]
    fn test_out_of_vocabulary_token() {
        let vocab = Arc::new(Vocabulary::with_size(2));
        let corpus = Corpus::new(vocab, vec![Document::new("a", "x", vec![0, 7])]);
        assert!(matches!(
            corpus.token_sequences(),
            Err(LdaError::TokenOutOfRange { doc: 0, token: 7, .. })
        ));
    }

    #[test]
    fn test_train_split_floor() {
        let corpus = toy_corpus();
        let (train, held_out) = corpus.train_split(0.8);
        assert_eq!(train.len(), 3);
        assert_eq!(held_out.len(), 1);
        assert_eq!(&*held_out.docs()[0].name, "d");
        assert_eq!(train.num_types(), held_out.num_types());
    }

    #[test]
    fn test_corpus_file_round_trip() -> anyhow::Result<()> {
        let file = create_temp_dir_file("txt")?;
        let file = file.to_str().unwrap();
        write_types(
            &[
                "# comment",
                "t1\tnhl\tgoal save goal",
                "",
                "t2\tnfl\ttouchdown goal",
            ],
            file,
        )?;

        let corpus = Corpus::from_file(file)?;
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.num_types(), 3);
        assert_eq!(corpus.docs()[0].tokens(), Some(&[0, 1, 0][..]));
        assert_eq!(corpus.docs()[1].tokens(), Some(&[2, 0][..]));
        assert_eq!(corpus.vocab().word(2), "touchdown");

        let copy = create_temp_dir_file("txt.gz")?;
        let copy = copy.to_str().unwrap();
        corpus.to_file(copy)?;
        let back = Corpus::from_file(copy)?;
        assert_eq!(back.docs(), corpus.docs());
        Ok(())
    }

    #[test]
    fn test_malformed_line() -> anyhow::Result<()> {
        let file = create_temp_dir_file("txt")?;
        let file = file.to_str().unwrap();
        write_types(&["only-one-field"], file)?;
        let err = Corpus::from_file(file).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LdaError>(),
            Some(LdaError::Parse { line: 1, .. })
        ));
        Ok(())
    }
}
