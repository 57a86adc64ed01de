//! Newick-safe sequence labels.
//!
//! FastTree writes row identifiers into Newick verbatim, so identifiers must not contain
//! whitespace or Newick structure characters. [`sanitize`] rewrites them and a [`LabelMap`]
//! remembers the way back.

use crate::newick;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use std::collections::BTreeMap;

/// Characters with structural meaning in Newick and their percent-style escapes.
pub const ESCAPES: [(char, &str); 9] = [
    ('/', "%2f"),
    ('\\', "%5c"),
    ('(', "%28"),
    (')', "%29"),
    ('[', "%5b"),
    (']', "%5d"),
    (':', "%3a"),
    (';', "%3b"),
    ('|', "%7c"),
];

/// Returns a Newick-safe version of a sequence identifier.
///
/// Each run of whitespace becomes a single `_`, then every character in [`ESCAPES`] is replaced.
///
/// ## Examples
///
/// ```rust
/// use fasttree_phylo::sanitize;
/// assert_eq!(sanitize("seq 1"), "seq_1");
/// assert_eq!(sanitize("a  \t b"), "a_b");
/// assert_eq!(sanitize("gi|123|ref"), "gi%7c123%7cref");
/// assert_eq!(sanitize("E. coli (K-12):x"), "E._coli_%28K-12%29%3ax");
/// assert_eq!(sanitize("plain"), "plain");
/// ```
pub fn sanitize(label: &str) -> String {
    let mut sanitized = String::with_capacity(label.len());
    let mut in_space = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_space {
                sanitized.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        match ESCAPES.iter().find(|(escaped, _)| *escaped == c) {
            Some((_, replacement)) => sanitized.push_str(replacement),
            None => sanitized.push(c),
        }
    }
    sanitized
}

/// Mapping from sanitized identifiers back to display labels.
///
/// Two different identifiers that sanitize to the same token are refused,
/// since their tips could not be told apart in the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelMap {
    /// Sanitized identifier to (original identifier, display label).
    entries: BTreeMap<String, (String, String)>,
}

impl LabelMap {
    pub fn new() -> Self {
        LabelMap::default()
    }

    /// Sanitizes `id`, records its display `label`, and returns the sanitized identifier.
    ///
    /// ```rust
    /// use fasttree_phylo::LabelMap;
    /// let mut labels = LabelMap::new();
    /// assert_eq!(labels.insert("seq 1", "Seq. 1 (E. coli)")?, "seq_1");
    /// // re-inserting the same identifier updates its label
    /// assert_eq!(labels.insert("seq 1", "seq 1")?, "seq_1");
    /// // a different identifier with the same sanitized form is refused
    /// assert!(labels.insert("seq  1", "seq  1").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn insert(&mut self, id: &str, label: &str) -> Result<String, Report> {
        let sanitized = sanitize(id);
        if let Some((existing, _)) = self.entries.get(&sanitized) {
            if existing != id {
                return Err(eyre!(
                    "Row ids '{existing}' and '{id}' both sanitize to '{sanitized}'"
                )
                .suggestion("Rename one of the alignment rows so that ids differ by more than whitespace."));
            }
        }
        self.entries.insert(sanitized.clone(), (id.to_string(), label.to_string()));
        Ok(sanitized)
    }

    /// Returns the display label of a sanitized identifier.
    pub fn get(&self, sanitized: &str) -> Option<&str> {
        self.entries.get(sanitized).map(|(_, label)| label.as_str())
    }

    /// Returns the display label of a sanitized identifier, or the identifier itself.
    pub fn display<'l>(&'l self, sanitized: &'l str) -> &'l str {
        self.get(sanitized).unwrap_or(sanitized)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over (sanitized, display) pairs, sorted by sanitized identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, (_, label))| (k.as_str(), label.as_str()))
    }

    /// Returns a Newick string with every leaf label replaced by its display label.
    ///
    /// Leaf labels are matched as whole tokens, so a label that is a substring of another is
    /// never partially rewritten. Restored labels are quoted when they contain whitespace or
    /// Newick structure characters; leaves without a mapping are re-quoted so their text survives.
    ///
    /// ```rust
    /// use fasttree_phylo::LabelMap;
    /// let mut labels = LabelMap::new();
    /// labels.insert("seq 1", "seq 1")?;
    /// labels.insert("seq 12", "seq 12")?;
    /// labels.insert("gi|7", "gi|7")?;
    /// let newick = "(seq_1:0.1,seq_12:0.2,gi%7c7:0.3)0.99:0.0;";
    /// assert_eq!(labels.restore(newick)?, "('seq 1':0.1,'seq 12':0.2,gi|7:0.3)0.99:0.0;");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn restore(&self, newick: &str) -> Result<String, Report> {
        newick::map_leaf_labels(newick, |raw| {
            let replacement = match self.get(raw) {
                Some(label) => newick::quote(label),
                None => newick::quote(&newick::unquote(raw)),
            };
            (replacement != raw).then_some(replacement)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    #[test]
    fn sanitize_escapes_every_structure_character() -> Result<(), Report> {
        let label = "a/b\\c(d)e[f]g:h;i|j";
        let sanitized = sanitize(label);
        assert_eq!(sanitized, "a%2fb%5cc%28d%29e%5bf%5dg%3ah%3bi%7cj");
        assert!(!sanitized.contains(|c: char| "/\\()[]:;| ".contains(c)));
        Ok(())
    }

    #[test]
    fn sanitize_collapses_leading_and_trailing_whitespace() -> Result<(), Report> {
        assert_eq!(sanitize("  x  "), "_x_");
        assert_eq!(sanitize("\ta\nb"), "_a_b");
        Ok(())
    }

    #[test]
    fn restore_round_trip() -> Result<(), Report> {
        let originals = ["E. coli (K-12)", "B. subtilis 168", "gi|12345|ref|NC_000913", "x:y;z"];
        let mut labels = LabelMap::new();
        let sanitized = originals.iter().map(|l| labels.insert(l, l)).collect::<Result<Vec<_>, _>>()?;
        assert_eq!(labels.len(), 4);

        let newick = format!(
            "(({}:0.1,{}:0.2)0.97:0.05,{}:0.3,{}:0.4);",
            sanitized[0], sanitized[1], sanitized[2], sanitized[3]
        );
        let restored = labels.restore(&newick)?;

        let tips = newick::leaf_labels(&restored)?.iter().map(|raw| newick::unquote(raw)).collect::<Vec<_>>();
        assert_eq!(tips, originals);
        Ok(())
    }

    #[test]
    fn restore_does_not_rewrite_substrings() -> Result<(), Report> {
        let mut labels = LabelMap::new();
        labels.insert("a", "a")?;
        labels.insert("a b", "a b")?;
        let restored = labels.restore("(a:1,a_b:2,ab:3);")?;
        assert_eq!(restored, "(a:1,'a b':2,ab:3);");
        Ok(())
    }

    #[test]
    fn restore_keeps_support_values() -> Result<(), Report> {
        let mut labels = LabelMap::new();
        labels.insert("0.5", "0.5")?;
        let restored = labels.restore("((0.5:1,B:1)0.5:1,C:1);")?;
        assert_eq!(restored, "((0.5:1,B:1)0.5:1,C:1);");
        Ok(())
    }

    #[test]
    fn restore_quotes_labels_with_underscores() -> Result<(), Report> {
        let mut labels = LabelMap::new();
        labels.insert("gi|1", "NC_000913 E. coli")?;
        labels.insert("B", "B_subtilis")?;
        labels.insert("C", "C")?;
        let restored = labels.restore("(gi%7c1:0.1,B:0.2,C:0.3);")?;
        assert_eq!(restored, "('NC_000913 E. coli':0.1,'B_subtilis':0.2,C:0.3);");

        // quoting keeps the underscore, an unquoted token would read back as a space
        let tips = newick::leaf_labels(&restored)?.iter().map(|raw| newick::unquote(raw)).collect::<Vec<_>>();
        assert_eq!(tips, ["NC_000913 E. coli", "B_subtilis", "C"]);
        Ok(())
    }

    #[test]
    fn display_falls_back_to_identifier() -> Result<(), Report> {
        let mut labels = LabelMap::new();
        labels.insert("seq 1", "Seq one")?;
        assert_eq!(labels.display("seq_1"), "Seq one");
        assert_eq!(labels.display("NODE_3"), "NODE_3");
        assert!(!labels.is_empty());
        assert_eq!(labels.iter().collect::<Vec<_>>(), [("seq_1", "Seq one")]);
        Ok(())
    }
}
