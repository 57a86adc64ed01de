//! FastTree invocation: command-line options and the process runner.

pub mod runner;

#[doc(inline)]
pub use runner::{RunLog, Runner};

use crate::alignment::SequenceType;
use crate::utils::lenient;
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Default install location of the FastTree binary.
pub const FASTTREE_BIN: &str = "/kb/module/FastTree/bin/FastTree";

/// FastTree options selected by the user.
///
/// Flags that don't apply to the alignment's [`SequenceType`] are dropped when
/// building [`Options::args`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Options {
    /// Use the fastest heuristics (`-fastest`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub fastest: bool,
    /// Use pseudocounts for distances (`-pseudo`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub pseudo: bool,
    /// Generalized time-reversible model, nucleotide only (`-gtr`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub gtr: bool,
    /// Whelan-And-Goldman model, protein only (`-wag`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub wag: bool,
    /// Disable maximum-likelihood NNIs and SPRs (`-noml`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub noml: bool,
    /// Disable minimum-evolution NNIs and SPRs (`-nome`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub nome: bool,
    /// Number of rate categories, protein only (`-cat n`).
    #[serde(default, deserialize_with = "lenient::count")]
    pub cat: Option<u32>,
    /// Single rate category (`-nocat`), takes precedence over `cat`.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub nocat: bool,
    /// Rescale lengths with a gamma model (`-gamma`).
    #[serde(default, deserialize_with = "lenient::flag")]
    pub gamma: bool,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    /// Returns the FastTree arguments for an alignment of `sequence_type`.
    ///
    /// The alignment itself is fed on stdin and the tree read from stdout, so neither
    /// appears in the arguments.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use kb_fasttree::{alignment::SequenceType, fasttree::Options};
    /// let options = Options { gtr: true, wag: true, cat: Some(20), gamma: true, ..Default::default() };
    ///
    /// let args = options.args(SequenceType::Nucleotide, None);
    /// assert_eq!(args, ["-nopr", "-gtr", "-gamma", "-nt"]);
    ///
    /// let args = options.args(SequenceType::Protein, Some("intree.newick".as_ref()));
    /// assert_eq!(args, ["-nopr", "-intree", "intree.newick", "-wag", "-cat", "20", "-gamma"]);
    /// ```
    pub fn args(&self, sequence_type: SequenceType, intree: Option<&Path>) -> Vec<String> {
        let nucleotide = sequence_type == SequenceType::Nucleotide;
        let mut args = vec!["-nopr".to_string()];

        if self.fastest {
            args.push("-fastest".into());
        }
        if self.pseudo {
            args.push("-pseudo".into());
        }
        if let Some(intree) = intree {
            args.push("-intree".into());
            args.push(intree.display().to_string());
        }
        if nucleotide && self.gtr {
            args.push("-gtr".into());
        }
        if !nucleotide && self.wag {
            args.push("-wag".into());
        }
        if self.noml {
            args.push("-noml".into());
        }
        if self.nome {
            args.push("-nome".into());
        }
        match (self.nocat, self.cat) {
            (true, _) => args.push("-nocat".into()),
            (false, Some(n)) if !nucleotide && n > 0 => {
                args.push("-cat".into());
                args.push(n.to_string());
            }
            _ => (),
        }
        if self.gamma {
            args.push("-gamma".into());
        }
        if nucleotide {
            args.push("-nt".into());
        }

        args
    }
}
