use crate::{newick, Branch, FromNewick, Node};

use color_eyre::eyre::{eyre, Report, Result};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A rooted [`Phylogeny`] as a directed graph of parents and children.
///
/// - The nodes (`N`) can be any type, [`Node`](crate::Node) carries a label.
/// - The branches (`B`) can be any type, [`Branch`](crate::Branch) carries a length and support.
///
/// Nodes are addressed by [`NodeIndex`], so two nodes may share a label.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Phylogeny<N, B> {
    /// Directed graph of parents and children. `N` are nodes and `B` are branches.
    pub graph: Graph<N, B>,
}

impl<N, B> Default for Phylogeny<N, B>
where
    N: Debug,
    B: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, B> Phylogeny<N, B>
where
    N: Debug,
    B: Debug,
{
    /// Returns a new empty [`Phylogeny`] with nodes (`N`) and branches (`B`).
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use fasttree_phylo::Phylogeny;
    /// let mut phylo: Phylogeny<&str, u32> = Phylogeny::new();
    /// let root = phylo.add_node("N1");
    /// let child = phylo.add_node("N2");
    /// phylo.add_branch(root, child, 1234)?;
    /// assert_eq!(phylo.get_root_index()?, root);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new() -> Self {
        Phylogeny { graph: Graph::new() }
    }

    /// Adds a new node (`N`) to the [`Phylogeny`] and returns its [`NodeIndex`].
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Creates a branch (`B`) from parent to child and returns the [`EdgeIndex`].
    ///
    /// A child that already has a parent is an error, as is a node that is its own parent.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = fasttree_phylo::Phylogeny::new();
    /// let (a, b, c) = (phylo.add_node("A"), phylo.add_node("B"), phylo.add_node("C"));
    /// phylo.add_branch(a, b, 1)?;
    /// phylo.add_branch(b, c, 2)?;
    /// assert!(phylo.add_branch(a, c, 1).is_err());
    /// assert!(phylo.add_branch(c, c, 1).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn add_branch(&mut self, parent: NodeIndex, child: NodeIndex, branch: B) -> Result<EdgeIndex, Report> {
        if parent == child {
            Err(eyre!("Node {:?} can't be its own parent.", self.get_node(&child)?))?
        }
        if let Some(existing) = self.graph.neighbors_directed(child, Direction::Incoming).next() {
            Err(eyre!(
                "Node {:?} already has a parent: {:?}",
                self.get_node(&child)?,
                self.get_node(&existing)?
            ))?
        }
        Ok(self.graph.add_edge(parent, child, branch))
    }

    /// Returns a node (`N`) in the [`Phylogeny`] that corresponds to the [`NodeIndex`].
    pub fn get_node(&self, node_index: &NodeIndex) -> Result<&N, Report> {
        self.graph
            .node_weight(*node_index)
            .ok_or_else(|| eyre!("Failed to get node data for node index {node_index:?}"))
    }

    /// Returns the children of a node and the branches leading to them, in the order they were added.
    ///
    /// ```rust
    /// let mut phylo = fasttree_phylo::Phylogeny::new();
    /// let (a, b, c) = (phylo.add_node("A"), phylo.add_node("B"), phylo.add_node("C"));
    /// phylo.add_branch(a, b, 1)?;
    /// phylo.add_branch(a, c, 2)?;
    /// assert_eq!(phylo.get_children(a), [(b, &1), (c, &2)]);
    /// assert!(phylo.get_children(c).is_empty());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_children(&self, node_index: NodeIndex) -> Vec<(NodeIndex, &B)> {
        let mut children = self.graph.edges(node_index).map(|e| (e.target(), e.weight())).collect::<Vec<_>>();
        // edges come out last added to first added, reverse this
        children.reverse();
        children
    }

    /// Returns the [`NodeIndex`] of the root, the only node with no parents.
    pub fn get_root_index(&self) -> Result<NodeIndex, Report> {
        if self.is_empty() {
            Err(eyre!("Failed to locate root node index in phylogeny as graph is empty!."))?
        }

        let root_indices: Vec<_> = self
            .graph
            .node_indices()
            .filter(|i| self.graph.neighbors_directed(*i, Direction::Incoming).next().is_none())
            .collect();

        match root_indices.len() {
            0 => Err(eyre!("Failed to locate root node index in phylogeny."))?,
            1 => Ok(root_indices[0]),
            _ => Err(eyre!("Failed to locate root node index in phylogeny, multiple roots found: {root_indices:?}"))?
        }
    }

    /// Returns true if the [`Phylogeny`] has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns true if the node has no children.
    pub fn is_tip(&self, node_index: NodeIndex) -> bool {
        self.graph.neighbors(node_index).next().is_none()
    }
}

impl FromNewick for Phylogeny<Node, Branch> {
    /// Returns a [`Phylogeny`] parsed from a [Newick](https://en.wikipedia.org/wiki/Newick_format) string.
    ///
    /// Support values of internal nodes are moved onto the [`Branch`] above the node.
    ///
    /// ```rust
    /// use fasttree_phylo::{FromNewick, Phylogeny, Node, Branch};
    /// let phylo: Phylogeny<Node, Branch> = Phylogeny::from_newick("(A:0.1,'B c':0.2,(C_1:0.3,D:0.4)0.95:0.5);")?;
    /// let root = phylo.get_root_index()?;
    /// let children = phylo.get_children(root);
    /// let labels = children.iter().map(|(i, _)| phylo.get_node(i).map(|n| n.label.as_str())).collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(labels, ["A", "B c", ""]);
    /// assert_eq!(children[2].1, &Branch { length: 0.5, support: Some(0.95) });
    ///
    /// let clade = phylo.get_children(children[2].0);
    /// let tip = phylo.get_node(&clade[0].0)?;
    /// assert_eq!((tip.label.as_str(), tip.token.as_str()), ("C 1", "C_1"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Self, Report> {
        newick::parse(newick)
    }
}
