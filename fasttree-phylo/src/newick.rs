use crate::{Branch, Node, Phylogeny};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use std::fmt::{Display, Formatter};

/// Characters that end an unquoted Newick label.
const DELIMITERS: &[char] = &['(', ')', '[', ']', ',', ':', ';', '\''];

/// Characters that force a label to be written single-quoted.
const QUOTE_TRIGGERS: &[char] = &['(', ')', '[', ']', ',', ':', ';', '\'', '_'];

// ----------------------------------------------------------------------------
// Token
// ----------------------------------------------------------------------------

/// A lexical token of a Newick string.
///
/// Label, length and comment tokens keep their raw text, so that
/// [`detokenize`] reproduces the input (minus insignificant whitespace).
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// `(`
    Open,
    /// `)`
    Close,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// A node label, quoted or unquoted, as written.
    Label(String),
    /// The text following a `:`.
    Length(String),
    /// A bracketed comment, brackets included.
    Comment(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Label(raw) | Token::Length(raw) | Token::Comment(raw) => write!(f, "{raw}"),
        }
    }
}

/// Splits a Newick string into [`Token`]s.
///
/// Whitespace outside of quoted labels and comments is dropped.
///
/// ## Examples
///
/// ```rust
/// use fasttree_phylo::newick::{tokenize, Token};
/// let tokens = tokenize("(A:0.1,'B c':0.2)0.9;")?;
/// assert_eq!(
///     tokens,
///     [
///         Token::Open,
///         Token::Label("A".into()),
///         Token::Colon,
///         Token::Length("0.1".into()),
///         Token::Comma,
///         Token::Label("'B c'".into()),
///         Token::Colon,
///         Token::Length("0.2".into()),
///         Token::Close,
///         Token::Label("0.9".into()),
///         Token::Semicolon,
///     ]
/// );
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// Unterminated quotes and comments are errors.
///
/// ```rust
/// # use fasttree_phylo::newick::tokenize;
/// assert!(tokenize("('A:0.1,B);").is_err());
/// assert!(tokenize("(A[comment,B);").is_err());
/// ```
pub fn tokenize(newick: &str) -> Result<Vec<Token>, Report> {
    let mut tokens = Vec::new();
    let mut chars = newick.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            ':' => tokens.push(Token::Colon),
            ';' => tokens.push(Token::Semicolon),
            '[' => {
                let mut raw = String::from('[');
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => raw.push(c),
                        None => Err(eyre!("Unterminated comment in newick: {newick}"))?,
                    }
                }
                raw.push(']');
                tokens.push(Token::Comment(raw));
            }
            '\'' => {
                let mut raw = String::from('\'');
                loop {
                    match chars.next() {
                        // a doubled quote is an escaped quote inside the label
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            raw.push_str("''");
                        }
                        Some('\'') => break,
                        Some(c) => raw.push(c),
                        None => Err(eyre!("Unterminated quoted label in newick: {newick}"))?,
                    }
                }
                raw.push('\'');
                push_text(&mut tokens, raw);
            }
            c if c.is_whitespace() => continue,
            c => {
                let mut raw = String::from(c);
                while let Some(&next) = chars.peek() {
                    if DELIMITERS.contains(&next) || next.is_whitespace() {
                        break;
                    }
                    raw.push(next);
                    chars.next();
                }
                push_text(&mut tokens, raw);
            }
        }
    }

    Ok(tokens)
}

/// Text after a colon is a branch length, anything else is a label.
fn push_text(tokens: &mut Vec<Token>, raw: String) {
    match tokens.last() {
        Some(Token::Colon) => tokens.push(Token::Length(raw)),
        _ => tokens.push(Token::Label(raw)),
    }
}

/// Joins [`Token`]s back into a Newick string.
pub fn detokenize(tokens: &[Token]) -> String {
    tokens.iter().join("")
}

// ----------------------------------------------------------------------------
// Labels
// ----------------------------------------------------------------------------

/// Returns the display text of a raw label token.
///
/// Quoted labels lose their quotes (`''` becomes `'`); underscores in unquoted labels become spaces.
///
/// ```rust
/// use fasttree_phylo::newick::unquote;
/// assert_eq!(unquote("Homo_sapiens"), "Homo sapiens");
/// assert_eq!(unquote("'Homo_sapiens'"), "Homo_sapiens");
/// assert_eq!(unquote("'O''Brien (1999)'"), "O'Brien (1999)");
/// ```
pub fn unquote(raw: &str) -> String {
    match raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        true => raw[1..raw.len() - 1].replace("''", "'"),
        false => raw.replace('_', " "),
    }
}

/// Returns a label as a Newick token, quoting it only if needed.
///
/// ```rust
/// use fasttree_phylo::newick::{quote, unquote};
/// assert_eq!(quote("A"), "A");
/// assert_eq!(quote("E. coli (K-12)"), "'E. coli (K-12)'");
/// assert_eq!(quote("O'Brien"), "'O''Brien'");
/// assert_eq!(unquote(&quote("x_y z")), "x_y z");
/// ```
pub fn quote(label: &str) -> String {
    let needs_quotes = label.is_empty()
        || label.chars().any(|c| c.is_whitespace() || QUOTE_TRIGGERS.contains(&c));
    match needs_quotes {
        true => format!("'{}'", label.replace('\'', "''")),
        false => label.to_string(),
    }
}

/// Returns the indices of tokens that are leaf labels.
///
/// A leaf label directly follows `(`, `,` or the start of the string.
fn leaf_positions(tokens: &[Token]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(i, t)| {
            matches!(t, Token::Label(_))
                && (*i == 0 || matches!(tokens[i - 1], Token::Open | Token::Comma))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Returns the raw leaf labels of a Newick string, in order of appearance.
///
/// ```rust
/// use fasttree_phylo::newick::leaf_labels;
/// let labels = leaf_labels("(A:0.1,B:0.2,(C:0.3,D:0.4)0.95:0.5);")?;
/// assert_eq!(labels, ["A", "B", "C", "D"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn leaf_labels(newick: &str) -> Result<Vec<String>, Report> {
    let tokens = tokenize(newick)?;
    let labels = leaf_positions(&tokens)
        .into_iter()
        .filter_map(|i| match &tokens[i] {
            Token::Label(raw) => Some(raw.to_owned()),
            _ => None,
        })
        .collect();
    Ok(labels)
}

/// Rewrites leaf labels of a Newick string.
///
/// `f` receives each raw leaf label and returns its replacement token, or [`None`] to keep it.
/// Internal node labels (support values), branch lengths and comments are never touched,
/// and labels are matched as whole tokens, never as substrings.
///
/// ```rust
/// use fasttree_phylo::newick::map_leaf_labels;
/// let nwk = "(A:0.1,AB:0.2,(B:0.3,A2:0.4)0.95:0.5);";
/// let renamed = map_leaf_labels(nwk, |raw| (raw == "A").then(|| "X".to_string()))?;
/// assert_eq!(renamed, "(X:0.1,AB:0.2,(B:0.3,A2:0.4)0.95:0.5);");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn map_leaf_labels<F>(newick: &str, mut f: F) -> Result<String, Report>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut tokens = tokenize(newick)?;
    for i in leaf_positions(&tokens) {
        if let Token::Label(raw) = &tokens[i] {
            if let Some(replacement) = f(raw) {
                tokens[i] = Token::Label(replacement);
            }
        }
    }
    Ok(detokenize(&tokens))
}

// ----------------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------------

/// Parses a Newick string into a [`Phylogeny`].
///
/// Nodes keep their raw label token next to the unquoted label. A numeric label on an
/// internal node is a support value and is moved onto the [`Branch`] above that node.
pub(crate) fn parse(newick: &str) -> Result<Phylogeny<Node, Branch>, Report> {
    let tokens = tokenize(newick)?
        .into_iter()
        .filter(|t| !matches!(t, Token::Comment(_)))
        .collect_vec();

    let mut parser = Parser { tokens: &tokens, pos: 0, phylogeny: Phylogeny::new() };
    parser
        .subtree()
        .wrap_err_with(|| eyre!("Failed to parse newick: {newick}"))?;

    match parser.tokens.get(parser.pos) {
        None | Some(Token::Semicolon) => Ok(parser.phylogeny),
        Some(token) => Err(eyre!("Unexpected token {token} in newick: {newick}")
            .suggestion("Is the tree missing an opening parenthesis?")),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    phylogeny: Phylogeny<Node, Branch>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Parses one subtree, returning its node and the branch above it.
    fn subtree(&mut self) -> Result<(NodeIndex, Branch), Report> {
        // add the node before descending, so that indices are pre-order
        let index = self.phylogeny.add_node(Node::new());
        let mut children = Vec::new();

        if let Some(Token::Open) = self.peek() {
            self.pos += 1;
            loop {
                children.push(self.subtree()?);
                match self.peek() {
                    Some(Token::Comma) => self.pos += 1,
                    Some(Token::Close) => {
                        self.pos += 1;
                        break;
                    }
                    Some(token) => Err(eyre!("Expected ',' or ')' but found: {token}"))?,
                    None => Err(eyre!("Unbalanced parentheses"))?,
                }
            }
        }

        let mut branch = Branch::new();
        if let Some(Token::Label(raw)) = self.peek() {
            self.pos += 1;
            let label = unquote(raw);
            match (children.is_empty(), label.parse::<f32>()) {
                (false, Ok(support)) => branch.support = Some(support),
                _ => {
                    if let Some(node) = self.phylogeny.graph.node_weight_mut(index) {
                        *node = Node { label, token: raw.to_string() };
                    }
                }
            }
        }
        if let Some(Token::Colon) = self.peek() {
            self.pos += 1;
            if let Some(Token::Length(raw)) = self.peek() {
                self.pos += 1;
                branch.length = raw
                    .parse()
                    .wrap_err_with(|| eyre!("Failed to parse branch length: {raw}"))?;
            }
        }

        for (child, child_branch) in children {
            self.phylogeny.add_branch(index, child, child_branch)?;
        }
        Ok((index, branch))
    }
}
