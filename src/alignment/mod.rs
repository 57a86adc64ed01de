//! Multiple sequence alignments: row ordering, validation, classification and FASTA export.

use color_eyre::eyre::{Report, Result, WrapErr};
use fasttree_phylo::LabelMap;
use log::debug;
use noodles::fasta;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::path::Path;
use strum::{Display, EnumString};


/// Minimum number of rows needed to build a tree.
pub const MIN_ROWS: usize = 3;

/// Characters allowed in a nucleotide row, besides whitespace.
const NUCLEOTIDE_CHARS: &str = ".-_ACGTUXNRYSWKMBDHV";

// ----------------------------------------------------------------------------
// Sequence Type
// ----------------------------------------------------------------------------

/// Residue type of an alignment, which decides the FastTree model flags.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum SequenceType {
    Nucleotide,
    Protein,
}

/// Returns true if every character of a non-empty row is a nucleotide code, gap or whitespace.
fn is_nucleotide(row: &str) -> bool {
    !row.is_empty()
        && row.chars().all(|c| {
            matches!(c, ' ' | '\t' | '\n') || NUCLEOTIDE_CHARS.contains(c.to_ascii_uppercase())
        })
}

/// Classifies alignment rows as [`SequenceType::Nucleotide`] or [`SequenceType::Protein`].
///
/// Rows are nucleotide only if all of them are; the first row that isn't decides Protein.
///
/// ## Examples
///
/// ```rust
/// use kb_fasttree::alignment::{classify, SequenceType};
/// assert_eq!(classify(["ACGT", "acg-", "ACNN"]), SequenceType::Nucleotide);
/// assert_eq!(classify(["ACGT", "MKLE", "ACGT"]), SequenceType::Protein);
/// assert_eq!(classify(["ACGT", "", "ACGT"]), SequenceType::Protein);
/// ```
pub fn classify<I, S>(rows: I) -> SequenceType
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match rows.into_iter().all(|row| is_nucleotide(row.as_ref())) {
        true => SequenceType::Nucleotide,
        false => SequenceType::Protein,
    }
}

// ----------------------------------------------------------------------------
// Alignment
// ----------------------------------------------------------------------------

/// A multiple sequence alignment, as stored in a `KBaseTrees.MSA` workspace object.
///
/// Fields of the record that the tree build doesn't need are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Alignment {
    /// Row identifier to aligned sequence.
    pub alignment: BTreeMap<String, String>,
    /// Explicit row order, otherwise rows are sorted by identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_order: Option<Vec<String>>,
    /// Row identifier to display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_row_labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_refs: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_refs: Option<serde_json::Value>,
}

impl Alignment {
    pub fn new() -> Self {
        Alignment::default()
    }

    /// Returns the row identifiers in output order.
    ///
    /// ```rust
    /// use kb_fasttree::alignment::Alignment;
    /// let mut msa = Alignment::new();
    /// msa.alignment.insert("B".into(), "ACGT".into());
    /// msa.alignment.insert("A".into(), "ACGA".into());
    /// assert_eq!(msa.row_ids(), ["A", "B"]);
    /// msa.row_order = Some(vec!["B".into(), "A".into()]);
    /// assert_eq!(msa.row_ids(), ["B", "A"]);
    /// ```
    pub fn row_ids(&self) -> Vec<&str> {
        match &self.row_order {
            Some(order) => order.iter().map(String::as_str).collect(),
            None => self.alignment.keys().map(String::as_str).collect(),
        }
    }

    /// Returns the display label of a row, falling back to its identifier.
    pub fn label<'a>(&'a self, row_id: &'a str) -> &'a str {
        self.default_row_labels
            .as_ref()
            .and_then(|labels| labels.get(row_id))
            .map(String::as_str)
            .unwrap_or(row_id)
    }

    /// Returns the aligned sequences in row order, skipping ids that have no sequence.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.row_ids()
            .into_iter()
            .filter_map(|id| self.alignment.get(id).map(|seq| (id, seq.as_str())))
    }

    /// Returns the [`SequenceType`] of the rows.
    pub fn sequence_type(&self) -> SequenceType {
        classify(self.rows().map(|(_, seq)| seq))
    }

    /// Returns validation messages, empty if a tree can be built from the alignment.
    ///
    /// ```rust
    /// use kb_fasttree::alignment::Alignment;
    /// let mut msa = Alignment::new();
    /// msa.alignment.insert("A".into(), "ACGT".into());
    /// msa.alignment.insert("B".into(), "ACGG".into());
    /// assert_eq!(msa.validate("1/2/3"), ["must have 3 or more records in MSA: 1/2/3"]);
    /// msa.alignment.insert("C".into(), "ACGA".into());
    /// assert!(msa.validate("1/2/3").is_empty());
    /// ```
    pub fn validate(&self, input_ref: &str) -> Vec<String> {
        let mut messages = Vec::new();
        let row_ids = self.row_ids();
        if row_ids.len() < MIN_ROWS {
            messages.push(format!("must have {MIN_ROWS} or more records in MSA: {input_ref}"));
        }
        for id in row_ids.iter().filter(|id| !self.alignment.contains_key(**id)) {
            messages.push(format!("row_order id '{id}' has no sequence in MSA: {input_ref}"));
        }
        let mut seen = BTreeSet::new();
        let mut repeated = BTreeSet::new();
        for id in &row_ids {
            if !seen.insert(*id) && repeated.insert(*id) {
                messages.push(format!("row_order id '{id}' is repeated in MSA: {input_ref}"));
            }
        }
        messages
    }

    /// Returns the sanitized label mapping of all rows, plus any collision messages.
    pub fn label_map(&self) -> (LabelMap, Vec<String>) {
        let mut labels = LabelMap::new();
        let mut messages = Vec::new();
        for id in self.row_ids() {
            if let Err(e) = labels.insert(id, self.label(id)) {
                messages.push(e.to_string());
            }
        }
        (labels, messages)
    }

    /// Writes the rows to FASTA with sanitized identifiers, one line per sequence.
    ///
    /// FastTree can't read wrapped sequences, so lines are never wrapped.
    pub fn write_fasta<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut buffer = Vec::new();
        let mut writer = fasta::writer::Builder::default()
            .set_line_base_count(usize::MAX)
            .build_with_writer(&mut buffer);

        let mut count = 0;
        for (id, seq) in self.rows() {
            let name = fasttree_phylo::sanitize(id);
            let definition = fasta::record::Definition::new(name, None);
            let sequence = fasta::record::Sequence::from(seq.as_bytes().to_vec());
            let record = fasta::Record::new(definition, sequence);
            writer
                .write_record(&record)
                .wrap_err_with(|| format!("Failed to write fasta record {id}: {path:?}"))?;
            count += 1;
        }
        drop(writer);

        crate::utils::create_parent_dir(path)?;
        std::fs::write(path, buffer).wrap_err_with(|| format!("Failed to write: {path:?}"))?;
        debug!("Wrote {count} fasta records: {path:?}");
        Ok(())
    }
}
