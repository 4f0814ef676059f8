//! Result files.
//!
//! Per-group arrays (topic distributions, priors, confusion rows) are
//! written as one object, keys in group-index order, closed by the
//! sentinel entry `"gg":4`:
//!
//! ```text
//! {"nhl":[0.1,0.9],"nfl":[0.7,0.3],"gg":4}
//! ```
//!
//! Numbers use Rust's shortest round-trip formatting. The result is valid
//! JSON.

use crate::classify::Classification;
use crate::common_io::{mkdir, open_buf_writer, write_types};
use crate::corpus::GroupIndex;
use crate::model::SparseLda;

use ndarray::Array2;
use std::fmt::Display;
use std::io::Write;

/// Write one array per group, in group-index order, followed by the
/// `"gg":4` sentinel.
pub fn write_group_arrays<T, R>(groups: &GroupIndex, rows: &[R], output_file: &str) -> anyhow::Result<()>
where
    T: Display,
    R: AsRef<[T]>,
{
    if rows.len() != groups.len() {
        return Err(anyhow::anyhow!(
            "{} rows for {} groups",
            rows.len(),
            groups.len()
        ));
    }

    mkdir(output_file)?;
    let mut buf = open_buf_writer(output_file)?;
    write!(buf, "{{")?;
    for (label, row) in groups.labels().iter().zip(rows) {
        let values: Vec<String> = row.as_ref().iter().map(|x| x.to_string()).collect();
        write!(
            buf,
            "{}:[{}],",
            serde_json::to_string(&**label)?,
            values.join(",")
        )?;
    }
    write!(buf, "\"gg\":4}}")?;
    buf.flush()?;
    Ok(())
}

/// Average topic proportions of each group.
pub fn write_group_topics(model: &SparseLda, output_file: &str) -> anyhow::Result<()> {
    write_group_arrays(
        model.groups(),
        &model.group_topic_distributions(),
        output_file,
    )
}

/// Fitted prior vector of each group.
pub fn write_group_alphas(model: &SparseLda, output_file: &str) -> anyhow::Result<()> {
    write_group_arrays(model.groups(), &model.group_alphas(), output_file)
}

/// Confusion matrix rows, `[true][predicted]`.
pub fn write_confusions(
    groups: &GroupIndex,
    confusion: &Array2<usize>,
    output_file: &str,
) -> anyhow::Result<()> {
    let rows: Vec<Vec<usize>> = confusion.rows().into_iter().map(|r| r.to_vec()).collect();
    write_group_arrays(groups, &rows, output_file)
}

/// Top words of each topic.
///
/// * `use_new_lines` - `Topic i` header and one `word prob` per line;
///   otherwise one `Topic i: w1 w2 ...` line per topic
pub fn write_top_words(
    model: &SparseLda,
    num_words: usize,
    use_new_lines: bool,
    output_file: &str,
) -> anyhow::Result<()> {
    let vocab = model.corpus().vocab();
    let mut lines = vec![];
    for (t, words) in model.top_words(num_words).iter().enumerate() {
        if use_new_lines {
            lines.push(format!("Topic {}", t));
            for wp in words {
                lines.push(format!("{} {}", vocab.word(wp.word), wp.prob));
            }
            lines.push(String::new());
        } else {
            let words: Vec<&str> = words.iter().map(|wp| vocab.word(wp.word)).collect();
            lines.push(format!("Topic {}: {}", t, words.join(" ")));
        }
    }
    mkdir(output_file)?;
    write_types(&lines, output_file)
}

pub fn write_log_likelihood(model: &SparseLda, output_file: &str) -> anyhow::Result<()> {
    mkdir(output_file)?;
    write_types(&[model.log_likelihood()], output_file)
}

/// Accuracy, then macro-F1, one per line.
pub fn write_accuracy(result: &Classification, output_file: &str) -> anyhow::Result<()> {
    mkdir(output_file)?;
    write_types(&[result.accuracy, result.macro_f1], output_file)
}

/// Topics of each document in descending proportion `n[d,k] / n[d]`.
///
/// * `threshold` - stop at the first proportion below this
/// * `max_topics` - list at most this many topics per document
pub fn write_doc_topics(
    model: &SparseLda,
    threshold: f64,
    max_topics: Option<usize>,
    output_file: &str,
) -> anyhow::Result<()> {
    let state = model.state();
    let doc_topic = state.doc_topic_counts();
    let max_topics = max_topics.unwrap_or(state.num_topics());

    let mut lines = vec!["#doc source topic proportion ...".to_string()];
    for (d, doc) in model.corpus().docs().iter().enumerate() {
        let n_d = state.doc_len(d);
        let mut ranked: Vec<(usize, f64)> = (0..state.num_topics())
            .filter(|&t| doc_topic[[d, t]] > 0)
            .map(|t| (t, doc_topic[[d, t]] as f64 / n_d as f64))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut line = format!("{} {}", d, doc.name);
        for (t, p) in ranked
            .into_iter()
            .take(max_topics)
            .take_while(|&(_, p)| p >= threshold)
        {
            line.push_str(&format!(" {} {}", t, p));
        }
        lines.push(line);
    }
    mkdir(output_file)?;
    write_types(&lines, output_file)
}

/// Every token's assignment, one per line: `doc pos typeindex type topic`.
pub fn write_state(model: &SparseLda, output_file: &str) -> anyhow::Result<()> {
    let vocab = model.corpus().vocab();
    let tokens = model.corpus().token_sequences()?;

    mkdir(output_file)?;
    let mut buf = open_buf_writer(output_file)?;
    writeln!(buf, "#doc pos typeindex type topic")?;
    for (d, (doc, z_d)) in tokens
        .iter()
        .zip(model.state().topic_assignments())
        .enumerate()
    {
        for (pos, (&w, &t)) in doc.iter().zip(z_d).enumerate() {
            writeln!(buf, "{} {} {} {} {}", d, pos, w, vocab.word(w), t)?;
        }
    }
    buf.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_io::{create_temp_dir_file, read_lines};
    use crate::corpus::{Corpus, Document, Vocabulary};
    use crate::options::LdaOptions;
    use std::sync::Arc;

    fn fitted() -> SparseLda {
        let vocab = Arc::new(Vocabulary::from_words(["puck", "goal", "ball", "yard"]));
        let corpus = Arc::new(Corpus::new(
            vocab,
            vec![
                Document::new("a", "nhl", vec![0, 1, 0]),
                Document::new("b", "nfl", vec![2, 3, 1, 2]),
            ],
        ));
        let mut model = SparseLda::new(corpus, LdaOptions::plain(2, 0.5, 0.1, "nhl")).unwrap();
        model.estimate(5, 0).unwrap();
        model
    }

    #[test]
    fn test_group_arrays_shape() -> anyhow::Result<()> {
        let model = fitted();
        let file = create_temp_dir_file("json")?;
        let file = file.to_str().unwrap();

        write_group_arrays(model.groups(), &[vec![1, 2], vec![3, 4]], file)?;
        let lines = read_lines(file)?;
        assert_eq!(lines.len(), 1);
        assert_eq!(&*lines[0], r#"{"nhl":[1,2],"nfl":[3,4],"gg":4}"#);

        assert!(write_group_arrays(model.groups(), &[vec![1]], file).is_err());
        Ok(())
    }

    #[test]
    fn test_label_is_escaped() -> anyhow::Result<()> {
        let vocab = Arc::new(Vocabulary::with_size(1));
        let corpus = Corpus::new(vocab, vec![Document::new("a", "say \"hi\"", vec![0])]);
        let groups = GroupIndex::build(&corpus, "say \"hi\"")?;
        let file = create_temp_dir_file("json")?;
        let file = file.to_str().unwrap();

        write_group_arrays(&groups, &[vec![0.5]], file)?;
        let parsed: serde_json::Value = serde_json::from_str(&read_lines(file)?[0])?;
        assert_eq!(parsed["say \"hi\""][0], 0.5);
        Ok(())
    }

    #[test]
    fn test_top_words_formats() -> anyhow::Result<()> {
        let model = fitted();
        let file = create_temp_dir_file("txt")?;
        let file = file.to_str().unwrap();

        write_top_words(&model, 3, false, file)?;
        let lines = read_lines(file)?;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Topic 0: "));
        assert_eq!(lines[1].split_whitespace().count(), 5);

        write_top_words(&model, 3, true, file)?;
        let lines = read_lines(file)?;
        assert_eq!(lines.len(), 2 * 5);
        assert_eq!(&*lines[5], "Topic 1");
        Ok(())
    }

    #[test]
    fn test_doc_topics_and_state_dump() -> anyhow::Result<()> {
        let model = fitted();
        let file = create_temp_dir_file("txt.gz")?;
        let file = file.to_str().unwrap();

        write_doc_topics(&model, 0.0, None, file)?;
        let lines = read_lines(file)?;
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0 a "));
        let props: f64 = lines[2]
            .split_whitespace()
            .skip(2)
            .skip(1)
            .step_by(2)
            .map(|p| p.parse::<f64>().unwrap())
            .sum();
        approx::assert_abs_diff_eq!(props, 1.0, epsilon = 1e-9);

        write_state(&model, file)?;
        let lines = read_lines(file)?;
        assert_eq!(lines.len(), 1 + 7);
        assert!(lines[4].starts_with("1 0 2 ball "));
        Ok(())
    }
}
