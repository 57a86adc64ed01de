//! `kb-fasttree` builds phylogenetic trees of KBase multiple sequence alignments with
//! [FastTree](http://www.microbesonline.org/fasttree/).
//!
//! ## Overview
//!
//! A [run](run::fasttree()) takes an alignment (`KBaseTrees.MSA`) from the Workspace and:
//!
//! 1. Checks the parameters and the alignment. An alignment that can't make a tree gets a
//!    failure report instead of an error.
//! 1. Writes the rows to FASTA, with identifiers [sanitized](fasttree_phylo::sanitize) so
//!    they survive as Newick leaf labels.
//! 1. Classifies the rows as nucleotide or protein, which picks the FastTree model flags.
//! 1. Runs FastTree, optionally from a starting tree (`KBaseTrees.Tree`).
//! 1. Saves the tree, restores the display labels in a second Newick file, and draws the
//!    tree as PNG and PDF with an HTML viewer.
//! 1. Uploads the files and creates a report that links them.
//!
//! ## Command-line
//!
//! ```text
//! kb-fasttree run --params params.json --config deploy.json
//! kb-fasttree status
//! ```

pub mod alignment;
pub mod cli;
pub mod config;
pub mod fasttree;
pub mod render;
pub mod report;
pub mod run;
pub mod status;
pub mod tree;
pub mod utils;
pub mod workspace;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use alignment::Alignment;
#[doc(inline)]
pub use tree::Tree;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
