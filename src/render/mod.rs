//! Tree images: a rectangular layout drawn as SVG, exported to PNG and PDF, plus an HTML viewer.

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use fasttree_phylo::{Branch, FromNewick, LabelMap, Node, Phylogeny};
use indoc::formatdoc;
use log::debug;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use svg::node::element::{Circle, Line, Rectangle, Text};
use svg::Document;


// ----------------------------------------------------------------------------
// Style
// ----------------------------------------------------------------------------

/// Line and internal marker colour.
pub const LINE_COLOR: &str = "#606060";
/// Leaf marker colour.
pub const LEAF_COLOR: &str = "#ffffff";
pub const LINE_WIDTH: f32 = 2.0;
/// Space between adjacent branches.
pub const VERTICAL_MARGIN: f32 = 5.0;
pub const TITLE_SIZE: f32 = 10.0;
pub const LABEL_SIZE: f32 = 10.0;
pub const SUPPORT_SIZE: f32 = 7.0;
pub const LEAF_MARKER_SIZE: u32 = 2;

/// Width of exported images, in pixels.
pub const IMAGE_WIDTH: u32 = 1200;
pub const DPI: f32 = 300.0;
/// Width of the image in the HTML viewer.
pub const HTML_WIDTH: u32 = IMAGE_WIDTH / 2;

/// Horizontal extent of the deepest tip, in drawing units.
const TREE_WIDTH: f32 = 400.0;
const MARGIN: f32 = 10.0;
/// Approximate advance of one label character, relative to the font size.
const CHAR_WIDTH: f32 = 0.6;

/// Returns the marker size of an internal node from its support value.
///
/// A node without a support value (the root) is drawn as fully supported.
///
/// ```rust
/// use kb_fasttree::render::marker_size;
/// assert_eq!(marker_size(Some(0.97)), 6);
/// assert_eq!(marker_size(Some(0.93)), 5);
/// assert_eq!(marker_size(Some(0.85)), 4);
/// assert_eq!(marker_size(Some(0.80)), 2);
/// assert_eq!(marker_size(Some(0.5)), 2);
/// assert_eq!(marker_size(None), 6);
/// ```
pub fn marker_size(support: Option<f32>) -> u32 {
    match support.unwrap_or(1.0) {
        s if s > 0.95 => 6,
        s if s > 0.90 => 5,
        s if s > 0.80 => 4,
        _ => 2,
    }
}

// ----------------------------------------------------------------------------
// Layout
// ----------------------------------------------------------------------------

/// A node placed in the drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct Placed {
    /// Display label, empty for internal nodes.
    pub label: String,
    /// Distance from the root, in branch length units.
    pub depth: f32,
    /// Row of the node, tips are on whole rows and parents sit midway between their children.
    pub row: f32,
    /// Support of the clade below this node.
    pub support: Option<f32>,
    pub is_tip: bool,
    /// Index of the parent in [`Layout::nodes`].
    pub parent: Option<usize>,
    /// Rows of the first and last child.
    pub span: Option<(f32, f32)>,
}

/// Rectangular (phylogram) layout of a tree, nodes in pre-order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    pub nodes: Vec<Placed>,
    pub max_depth: f32,
    pub tips: usize,
}

impl Layout {
    /// Lays out a tree, showing tips with their display label from `labels`.
    ///
    /// Tips are looked up by their label token as written in the Newick.
    pub fn new(phylo: &Phylogeny<Node, Branch>, labels: &LabelMap) -> Result<Self, Report> {
        let root = phylo.get_root_index()?;

        // pre-order walk, children in the order they appear in the newick
        let mut order: Vec<(NodeIndex, Option<usize>, f32, Option<f32>)> = Vec::new();
        let mut stack = vec![(root, None, 0.0, None)];
        while let Some((index, parent, depth, support)) = stack.pop() {
            let position = order.len();
            order.push((index, parent, depth, support));
            for (child, branch) in phylo.get_children(index).into_iter().rev() {
                stack.push((child, Some(position), depth + branch.length.max(0.0), branch.support));
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        let mut tips = 0;
        for (index, parent, depth, support) in &order {
            let node = phylo.get_node(index)?;
            let is_tip = phylo.is_tip(*index);
            let label = match is_tip {
                true => labels.get(&node.token).unwrap_or(node.label.as_str()).to_string(),
                false => String::new(),
            };
            let row = match is_tip {
                true => {
                    tips += 1;
                    (tips - 1) as f32
                }
                false => 0.0,
            };
            nodes.push(Placed { label, depth: *depth, row, support: *support, is_tip, parent: *parent, span: None });
        }

        // children come after their parent in pre-order, so a reverse pass sees them first
        let mut spans: HashMap<usize, (f32, f32)> = HashMap::new();
        for i in (0..nodes.len()).rev() {
            if let Some(&(first, last)) = spans.get(&i) {
                nodes[i].row = (first + last) / 2.0;
                nodes[i].span = Some((first, last));
            }
            if let Some(parent) = nodes[i].parent {
                let row = nodes[i].row;
                spans
                    .entry(parent)
                    .and_modify(|(first, last)| {
                        *first = first.min(row);
                        *last = last.max(row);
                    })
                    .or_insert((row, row));
            }
        }

        let max_depth = nodes.iter().map(|n| n.depth).fold(0.0, f32::max);
        debug!("Tree layout: {} nodes, {tips} tips, depth {max_depth}", nodes.len());
        Ok(Layout { nodes, max_depth, tips })
    }

    /// Returns the SVG drawing of the layout under a title.
    pub fn to_svg(&self, title: &str) -> String {
        let row_height = LABEL_SIZE + VERTICAL_MARGIN;
        let top = MARGIN + TITLE_SIZE + VERTICAL_MARGIN * 2.0;
        let left = MARGIN + SUPPORT_SIZE * 4.0;
        let scale = match self.max_depth > 0.0 {
            true => TREE_WIDTH / self.max_depth,
            false => 0.0,
        };
        let x = |node: &Placed| left + node.depth * scale;
        let y = |row: f32| top + row * row_height + row_height / 2.0;

        let label_width = self
            .nodes
            .iter()
            .filter(|n| n.is_tip)
            .map(|n| n.label.chars().count() as f32 * LABEL_SIZE * CHAR_WIDTH)
            .fold(0.0, f32::max);
        let title_width = title.chars().count() as f32 * TITLE_SIZE * CHAR_WIDTH + MARGIN * 2.0;
        let width = (left + TREE_WIDTH + LABEL_SIZE + label_width + MARGIN).max(title_width);
        let height = top + self.tips.max(1) as f32 * row_height + MARGIN;
        let image_height = (IMAGE_WIDTH as f32 * height / width).ceil();

        let mut doc = Document::new()
            .set("viewBox", (0.0, 0.0, width, height))
            .set("width", IMAGE_WIDTH)
            .set("height", image_height)
            .add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", 0)
                    .set("width", width)
                    .set("height", height)
                    .set("fill", "#ffffff"),
            )
            .add(
                Text::new(title)
                    .set("x", MARGIN)
                    .set("y", MARGIN + TITLE_SIZE)
                    .set("font-family", "sans-serif")
                    .set("font-size", TITLE_SIZE)
                    .set("fill", "#000000"),
            );

        // branches first, so markers are drawn on top
        for node in &self.nodes {
            if let Some(parent) = node.parent.map(|p| &self.nodes[p]) {
                doc = doc.add(branch_line(x(parent), y(node.row), x(node), y(node.row)));
            }
            if let Some((first, last)) = node.span {
                doc = doc.add(branch_line(x(node), y(first), x(node), y(last)));
            }
        }

        for node in &self.nodes {
            let (cx, cy) = (x(node), y(node.row));
            let (size, fill) = match node.is_tip {
                true => (LEAF_MARKER_SIZE, LEAF_COLOR),
                false => (marker_size(node.support), LINE_COLOR),
            };
            doc = doc.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", size as f32 / 2.0)
                    .set("fill", fill),
            );

            if node.is_tip {
                doc = doc.add(
                    Text::new(node.label.as_str())
                        .set("x", cx + LABEL_SIZE / 2.0)
                        .set("y", cy + LABEL_SIZE / 3.0)
                        .set("font-family", "sans-serif")
                        .set("font-size", LABEL_SIZE)
                        .set("fill", "#000000"),
                );
            } else if let (Some(support), Some(_)) = (node.support, node.parent) {
                doc = doc.add(
                    Text::new(format!("{support}"))
                        .set("x", cx - LINE_WIDTH)
                        .set("y", cy - LINE_WIDTH)
                        .set("text-anchor", "end")
                        .set("font-family", "sans-serif")
                        .set("font-size", SUPPORT_SIZE)
                        .set("fill", LINE_COLOR),
                );
            }
        }

        doc.to_string()
    }
}

fn branch_line(x1: f32, y1: f32, x2: f32, y2: f32) -> Line {
    Line::new()
        .set("x1", x1)
        .set("y1", y1)
        .set("x2", x2)
        .set("y2", y2)
        .set("stroke", LINE_COLOR)
        .set("stroke-width", LINE_WIDTH)
        .set("stroke-linecap", "square")
}

// ----------------------------------------------------------------------------
// Export
// ----------------------------------------------------------------------------

/// Returns the SVG drawing of a Newick tree whose leaves carry sanitized identifiers.
pub fn tree_to_svg(newick: &str, labels: &LabelMap, title: &str) -> Result<String, Report> {
    let phylo = Phylogeny::from_newick(newick).wrap_err("Failed to read tree for rendering.")?;
    let layout = Layout::new(&phylo, labels)?;
    Ok(layout.to_svg(title))
}

/// Rasterizes an SVG drawing to a PNG file.
pub fn write_png<P>(svg: &str, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    use resvg::{tiny_skia, usvg};

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options).wrap_err("Failed to parse tree drawing.")?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| eyre!("Invalid image size: {}x{}", size.width(), size.height()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    crate::utils::create_parent_dir(path)?;
    pixmap.save_png(path).wrap_err_with(|| format!("Failed to write png: {path:?}"))?;
    Ok(())
}

/// Converts an SVG drawing to a single page PDF file at [`DPI`].
pub fn write_pdf<P>(svg: &str, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    use svg2pdf::{usvg, ConversionOptions, PageOptions};

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options).wrap_err("Failed to parse tree drawing.")?;
    let mut page = PageOptions::default();
    page.dpi = DPI;
    let pdf = svg2pdf::to_pdf(&tree, ConversionOptions::default(), page)
        .map_err(|e| eyre!("Failed to convert tree drawing to pdf: {e:?}"))?;

    crate::utils::create_parent_dir(path)?;
    std::fs::write(path, pdf).wrap_err_with(|| format!("Failed to write pdf: {path:?}"))?;
    Ok(())
}

/// Returns the HTML page that shows the PNG image of a tree.
///
/// ```rust
/// let html = kb_fasttree::render::html("tree");
/// assert_eq!(html.lines().nth(1), Some("<head><title>KBase FastTree-2: tree</title></head>"));
/// assert!(html.contains(r#"<img width=600 src="tree.png">"#));
/// ```
pub fn html(name: &str) -> String {
    formatdoc! {r#"
        <html>
        <head><title>KBase FastTree-2: {name}</title></head>
        <body bgcolor="white">
        <img width={HTML_WIDTH} src="{name}.png">
        </body>
        </html>"#
    }
}

/// Paths of the rendered images.
#[derive(Clone, Debug)]
pub struct Images<'p> {
    pub png: &'p Path,
    pub pdf: &'p Path,
    pub html: &'p Path,
}

/// Renders a tree to PNG, PDF and the HTML viewer.
///
/// The HTML references the PNG by file name, so both should share a directory.
pub fn render(
    newick: &str,
    labels: &LabelMap,
    name: &str,
    title: &str,
    images: &Images,
) -> Result<(), Report> {
    let svg = tree_to_svg(newick, labels, title)?;
    write_png(&svg, &images.png)?;
    write_pdf(&svg, &images.pdf)?;
    crate::utils::create_parent_dir(&images.html)?;
    std::fs::write(images.html, html(name))
        .wrap_err_with(|| format!("Failed to write html: {:?}", images.html))?;
    Ok(())
}
