//! The `KBaseTrees.Tree` record built from FastTree output.

use crate::alignment::Alignment;
use fasttree_phylo::{sanitize, LabelMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Kind of tree, chosen by the user.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
pub enum TreeType {
    #[default]
    GeneTree,
    SpeciesTree,
}

/// A phylogenetic tree workspace object.
///
/// The same type describes an optional starting tree, where only [`Tree::tree`] is used.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Tree {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub tree_type: TreeType,
    /// Newick string with sanitized leaf labels, always terminated by `;`.
    pub tree: String,
    /// Sanitized leaf label to display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_node_labels: Option<BTreeMap<String, String>>,
    /// Sanitized leaf labels in alignment row order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_refs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kb_refs: Option<serde_json::Value>,
}

/// Trims trailing whitespace and makes sure the tree ends with `;`.
///
/// ```rust
/// use kb_fasttree::tree::normalize_newick;
/// assert_eq!(normalize_newick("(A,B,C);\n"), "(A,B,C);");
/// assert_eq!(normalize_newick("(A,B,C)  \n"), "(A,B,C);");
/// ```
pub fn normalize_newick(newick: &str) -> String {
    let newick = newick.trim_end();
    match newick.ends_with(';') {
        true => newick.to_string(),
        false => format!("{newick};"),
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Builds the output tree of an alignment from FastTree's Newick.
    ///
    /// Every row gets a node label, its identifier when the alignment has no display label for it.
    pub fn from_alignment(
        name: &str,
        description: &str,
        tree_type: TreeType,
        newick: &str,
        alignment: &Alignment,
    ) -> Self {
        let ids = alignment.row_ids();
        let default_node_labels = ids.iter().map(|id| (sanitize(id), alignment.label(id).to_string())).collect();
        let leaf_list = ids.iter().map(|id| sanitize(id)).collect();

        Tree {
            name: name.to_string(),
            description: description.to_string(),
            tree_type,
            tree: normalize_newick(newick),
            default_node_labels: Some(default_node_labels),
            leaf_list: Some(leaf_list),
            ws_refs: alignment.ws_refs.clone(),
            kb_refs: alignment.kb_refs.clone(),
        }
    }

    /// Returns the Newick with display labels restored on the leaves.
    pub fn labeled_newick(&self, labels: &LabelMap) -> color_eyre::eyre::Result<String> {
        labels.restore(&self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{Report, Result};

    fn alignment() -> Alignment {
        let mut msa = Alignment::new();
        for (id, seq) in [("A", "ACGT"), ("B", "ACGG"), ("C c", "ACGA")] {
            msa.alignment.insert(id.into(), seq.into());
        }
        msa
    }

    #[test]
    fn from_alignment_without_labels() -> Result<(), Report> {
        let msa = alignment();
        let tree = Tree::from_alignment("out", "", TreeType::GeneTree, "(A:1,B:1,C_c:1)\n", &msa);
        assert_eq!(tree.tree, "(A:1,B:1,C_c:1);");

        let value = serde_json::to_value(&tree)?;
        assert_eq!(value["type"], "GeneTree");
        assert_eq!(value["leaf_list"], serde_json::json!(["A", "B", "C_c"]));
        assert_eq!(value["default_node_labels"], serde_json::json!({"A": "A", "B": "B", "C_c": "C c"}));
        assert!(value.get("kb_refs").is_none());
        Ok(())
    }

    #[test]
    fn from_alignment_with_labels() -> Result<(), Report> {
        let mut msa = alignment();
        msa.default_row_labels = Some(BTreeMap::from([("C c".to_string(), "Charlie".to_string())]));
        msa.kb_refs = Some(serde_json::json!({"A": ["kb|g.1"]}));

        let tree = Tree::from_alignment("out", "desc", TreeType::SpeciesTree, "(A,B,C_c);", &msa);
        assert_eq!(tree.leaf_list, Some(vec!["A".into(), "B".into(), "C_c".into()]));
        let labels = tree.default_node_labels.clone().unwrap_or_default();
        assert_eq!(labels["C_c"], "Charlie");
        assert_eq!(labels["A"], "A");
        assert_eq!(tree.kb_refs, msa.kb_refs);

        let (map, _) = msa.label_map();
        assert_eq!(tree.labeled_newick(&map)?, "(A,B,Charlie);");
        assert_eq!(serde_json::to_value(&tree)?["type"], "SpeciesTree");
        Ok(())
    }

    #[test]
    fn starting_tree_record() -> Result<(), Report> {
        let tree: Tree = serde_json::from_str(r#"{"tree": "(A,B,C);", "type": "SpeciesTree"}"#)?;
        assert_eq!(tree.tree, "(A,B,C);");
        assert_eq!(tree.tree_type, TreeType::SpeciesTree);
        Ok(())
    }
}
