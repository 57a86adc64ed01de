//! Newick plumbing for FastTree runs.
//!
//! - [`label`] turns arbitrary sequence identifiers into Newick-safe tokens and maps them back.
//! - [`newick`] tokenizes [Newick](https://en.wikipedia.org/wiki/Newick_format) text and rewrites leaf labels.
//! - [`Phylogeny`] is a directed tree of [`Node`] and [`Branch`], used to lay out tree images.

use color_eyre::eyre::{Report, Result};

mod branch;
pub mod label;
pub mod newick;
mod node;
mod phylogeny;

#[doc(inline)]
pub use branch::Branch;
#[doc(inline)]
pub use label::{sanitize, LabelMap};
#[doc(inline)]
pub use node::Node;
#[doc(inline)]
pub use phylogeny::Phylogeny;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Returns an object created from a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`].
pub trait FromNewick {
    fn from_newick(newick: &str) -> Result<Self, Report>
    where
        Self: Sized;
}
