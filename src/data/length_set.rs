//! Sequence length table keyed by sequence identifier.

use crate::error::{Result, SieveError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// An ordered mapping from sequence identifier to sequence length.
///
/// Identifiers are unique and lengths are strictly positive. Filtering never
/// mutates a set in place: every filter produces a new `LengthSet` that keeps
/// the relative order of the surviving sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, u64)>", into = "Vec<(String, u64)>")]
pub struct LengthSet {
    /// Sequence identifiers in input order.
    ids: Vec<String>,
    /// Lengths aligned with `ids`.
    lengths: Vec<u64>,
    /// Position of each identifier in `ids`.
    index: HashMap<String, usize>,
}

impl LengthSet {
    /// Build a length set from `(id, length)` pairs.
    ///
    /// Fails on duplicate identifiers or zero lengths.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut ids = Vec::new();
        let mut lengths = Vec::new();
        let mut index = HashMap::new();

        for (id, length) in entries {
            let id = id.into();
            if length == 0 {
                return Err(SieveError::InvalidLength {
                    id,
                    value: "0".to_string(),
                });
            }
            if index.insert(id.clone(), ids.len()).is_some() {
                return Err(SieveError::DuplicateId(id));
            }
            ids.push(id);
            lengths.push(length);
        }

        Ok(Self {
            ids,
            lengths,
            index,
        })
    }

    /// An empty set.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Assemble a set from identifiers already known to be unique.
    fn from_parts(ids: Vec<String>, lengths: Vec<u64>) -> Self {
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            ids,
            lengths,
            index,
        }
    }

    /// Load a length table from a TSV file.
    ///
    /// Expected format: two tab-separated columns, sequence id and length.
    /// A leading header row is skipped when its second column is not numeric.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .from_path(path)?;

        let mut entries = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() < 2 {
                continue;
            }
            let id = record[0].trim().to_string();
            let raw = record[1].trim();
            match raw.parse::<u64>() {
                Ok(length) => entries.push((id, length)),
                Err(_) if row_idx == 0 => continue,
                Err(_) => {
                    return Err(SieveError::InvalidLength {
                        id,
                        value: raw.to_string(),
                    })
                }
            }
        }

        if entries.is_empty() {
            return Err(SieveError::InvalidInput(
                "No sequence lengths in TSV".to_string(),
            ));
        }

        Self::new(entries)
    }

    /// Write the length table to a TSV file with an `id\tlength` header.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        writer.write_record(["id", "length"])?;
        for (id, length) in self.iter() {
            writer.write_record([id, length.to_string().as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the set holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sequence identifiers in order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Sequence lengths in order.
    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }

    /// Total number of bases across all sequences.
    pub fn total_length(&self) -> u64 {
        self.lengths.iter().sum()
    }

    /// Look up the length of a sequence.
    pub fn get(&self, id: &str) -> Option<u64> {
        self.index.get(id).map(|&idx| self.lengths[idx])
    }

    /// True when `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of `id` in the set.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterate over `(id, length)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.lengths.iter().copied())
    }

    /// Keep the sequences whose length satisfies `keep`.
    pub fn retain_lengths<F>(&self, keep: F) -> Self
    where
        F: Fn(u64) -> bool,
    {
        let (ids, lengths) = self
            .iter()
            .filter(|(_, length)| keep(*length))
            .map(|(id, length)| (id.to_string(), length))
            .unzip();
        Self::from_parts(ids, lengths)
    }

    /// Subset by position. Repeated positions are rejected.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let mut ids = Vec::with_capacity(indices.len());
        let mut lengths = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.len() {
                return Err(SieveError::InvalidInput(format!(
                    "Index {} out of bounds for {} sequences",
                    idx,
                    self.len()
                )));
            }
            ids.push(self.ids[idx].clone());
            lengths.push(self.lengths[idx]);
        }
        Self::new(ids.into_iter().zip(lengths))
    }
}

impl TryFrom<Vec<(String, u64)>> for LengthSet {
    type Error = SieveError;

    fn try_from(entries: Vec<(String, u64)>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<LengthSet> for Vec<(String, u64)> {
    fn from(set: LengthSet) -> Self {
        set.ids.into_iter().zip(set.lengths).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_set() -> LengthSet {
        LengthSet::new(vec![
            ("contig_1", 1200),
            ("contig_2", 80),
            ("contig_3", 5400),
            ("contig_4", 300),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_preserves_order() {
        let set = create_test_set();
        assert_eq!(set.len(), 4);
        assert_eq!(set.ids()[2], "contig_3");
        assert_eq!(set.lengths(), &[1200, 80, 5400, 300]);
        assert_eq!(set.total_length(), 6980);
        assert_eq!(set.get("contig_4"), Some(300));
        assert_eq!(set.get("missing"), None);
    }

    #[test]
    fn test_rejects_duplicates_and_zero() {
        let dup = LengthSet::new(vec![("a", 10), ("a", 20)]);
        assert!(matches!(dup, Err(SieveError::DuplicateId(id)) if id == "a"));

        let zero = LengthSet::new(vec![("a", 10), ("b", 0)]);
        assert!(matches!(zero, Err(SieveError::InvalidLength { .. })));
    }

    #[test]
    fn test_retain_returns_new_set() {
        let set = create_test_set();
        let long = set.retain_lengths(|len| len >= 300);
        assert_eq!(long.ids(), &["contig_1", "contig_3", "contig_4"]);
        // Original untouched
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_subset_out_of_bounds() {
        let set = create_test_set();
        let subset = set.subset(&[3, 0]).unwrap();
        assert_eq!(subset.ids(), &["contig_4", "contig_1"]);
        assert_eq!(subset.position("contig_1"), Some(1));
        assert!(set.subset(&[7]).is_err());
        assert!(matches!(set.subset(&[1, 1]), Err(SieveError::DuplicateId(_))));
    }

    #[test]
    fn test_lookup_follows_filtering() {
        let entries: Vec<(String, u64)> = (1..=5000u64)
            .map(|i| (format!("contig_{}", i), i))
            .collect();
        let set = LengthSet::new(entries).unwrap();
        assert_eq!(set.position("contig_4000"), Some(3999));
        assert_eq!(set.get("contig_4000"), Some(4000));

        let long = set.retain_lengths(|len| len > 2500);
        assert_eq!(long.position("contig_4000"), Some(1499));
        assert_eq!(long.get("contig_4000"), Some(4000));
        assert!(!long.contains("contig_10"));
        assert!(long.contains("contig_2501"));
        assert_eq!(LengthSet::empty().get("contig_1"), None);
    }

    #[test]
    fn test_tsv_roundtrip_with_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tlength").unwrap();
        writeln!(file, "seq_a\t1500").unwrap();
        writeln!(file, "seq_b\t220").unwrap();
        file.flush().unwrap();

        let set = LengthSet::from_tsv(file.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("seq_b"), Some(220));

        let out = NamedTempFile::new().unwrap();
        set.to_tsv(out.path()).unwrap();
        let reloaded = LengthSet::from_tsv(out.path()).unwrap();
        assert_eq!(reloaded, set);
    }

    #[test]
    fn test_tsv_bad_length() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "seq_a\t1500").unwrap();
        writeln!(file, "seq_b\tabc").unwrap();
        file.flush().unwrap();
        assert!(LengthSet::from_tsv(file.path()).is_err());
    }
}
