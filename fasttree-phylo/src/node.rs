use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A [`Node`] in the [`Phylogeny`](crate::Phylogeny) graph.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Node {
    /// [`Node`] label for display, already unquoted.
    pub label: String,
    /// Label token exactly as written in the Newick, empty for unnamed nodes.
    pub token: String,
}

#[rustfmt::skip]
impl Default for Node { fn default() -> Self { Self::new() } }
#[rustfmt::skip]
impl Display for Node { fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.label) } }
#[rustfmt::skip]
impl Node { pub fn new() -> Self { Node { label: String::new(), token: String::new() } } }
