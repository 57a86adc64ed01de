//! Build a tree from a workspace alignment: fetch, export, run FastTree, render, save and report.

use crate::alignment::Alignment;
use crate::fasttree::{Options, Runner};
use crate::render::{self, Images};
use crate::report::{self, Artifacts, ExtendedReport, FailureReport, REPORT_TYPE};
use crate::tree::{Tree, TreeType};
use crate::utils::{console::Console, lenient};
use crate::workspace::{FileStaging, ObjectStore, Pack, Provenance, ReportService, SaveObject, Upload};
use chrono::Utc;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

/// Service name recorded in provenance.
pub const SERVICE: &str = "kb_fasttree";
/// Method name recorded in provenance.
pub const METHOD: &str = "run_FastTree";
/// Type of the saved tree object.
pub const TREE_TYPE: &str = "KBaseTrees.Tree";

// ----------------------------------------------------------------------------
// Parameters
// ----------------------------------------------------------------------------

/// Parameters of a tree build.
///
/// ```rust
/// use kb_fasttree::run::Params;
/// let json = r#"{"workspace_name": "my_ws", "input_ref": "1/2/3", "output_name": "tree", "gtr": 1, "cat": "20"}"#;
/// let params: Params = serde_json::from_str(json)?;
/// assert_eq!(params.input_ref.as_deref(), Some("1/2/3"));
/// assert!(params.options.gtr);
/// assert_eq!(params.options.cat, Some(20));
/// assert!(params.intree_ref.is_none());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Params {
    #[serde(default, deserialize_with = "lenient::text")]
    pub workspace_name: Option<String>,
    /// Alignment to build the tree from.
    #[serde(default, deserialize_with = "lenient::text")]
    pub input_ref: Option<String>,
    /// Name of the saved tree.
    #[serde(default, deserialize_with = "lenient::text")]
    pub output_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub desc: Option<String>,
    /// Save a species tree instead of a gene tree.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub species_tree_flag: bool,
    /// Starting tree for FastTree.
    #[serde(default, deserialize_with = "lenient::text")]
    pub intree_ref: Option<String>,
    #[serde(flatten)]
    pub options: Options,
}

/// Returns a required parameter.
fn required<'p>(field: &str, value: &'p Option<String>) -> Result<&'p str, Report> {
    value.as_deref().ok_or_else(|| eyre!("{field} parameter is required"))
}

/// Result of a tree build.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Output {
    pub report_name: String,
    pub report_ref: String,
    /// Reference of the saved tree, missing if the alignment was rejected.
    pub output_ref: Option<String>,
}

// ----------------------------------------------------------------------------
// Run Directory
// ----------------------------------------------------------------------------

/// Returns the id of a run started now, the UTC time to the second.
pub fn run_id() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Files of one run, under `<scratch>/<run_id>`.
#[derive(Clone, Debug, PartialEq)]
pub struct RunDir {
    pub root: PathBuf,
}

#[rustfmt::skip]
impl RunDir {
    pub fn create(scratch: &Path, run_id: &str) -> Result<Self, Report> {
        let root = scratch.join(run_id);
        std::fs::create_dir_all(&root).wrap_err_with(|| format!("Failed to create run directory: {root:?}"))?;
        Ok(RunDir { root })
    }
    pub fn fasta(&self, input_name: &str) -> PathBuf { self.root.join(format!("{input_name}.fasta")) }
    pub fn intree(&self, intree_name: &str) -> PathBuf { self.root.join(format!("{intree_name}.newick")) }
    pub fn output_dir(&self) -> PathBuf { self.root.join("output") }
    pub fn html_dir(&self) -> PathBuf { self.root.join("output_html") }
    pub fn newick(&self, name: &str) -> PathBuf { self.output_dir().join(format!("{name}.newick")) }
    pub fn labeled_newick(&self, name: &str) -> PathBuf { self.output_dir().join(format!("{name}-labels.newick")) }
    pub fn pdf(&self, name: &str) -> PathBuf { self.output_dir().join(format!("{name}.pdf")) }
    pub fn png(&self, name: &str) -> PathBuf { self.html_dir().join(format!("{name}.png")) }
    pub fn html(&self, name: &str) -> PathBuf { self.html_dir().join(format!("{name}.html")) }
}

// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// Everything a run needs besides its parameters.
#[derive(Clone, Debug)]
pub struct Context<W, F, R> {
    /// Directory where the run directory is created.
    pub scratch: PathBuf,
    pub runner: Runner,
    pub workspace: W,
    pub staging: F,
    pub reports: R,
}

/// Builds a tree from the alignment at `input_ref`, saves it as `output_name` and reports it.
///
/// Missing parameters, unreadable inputs, FastTree failures and upload failures are errors.
/// An alignment that can't produce a tree is not an error: a failure report is saved instead
/// and [`Output::output_ref`] is empty.
pub async fn fasttree<W, F, R>(params: &Params, context: &Context<W, F, R>) -> Result<Output, Report>
where
    W: ObjectStore,
    F: FileStaging,
    R: ReportService,
{
    let mut console = Console::new();
    console.log("Running run_FastTree with params=");
    console.log(serde_json::to_string_pretty(params)?);

    // ------------------------------------------------------------------------
    // Parameters

    let workspace_name = required("workspace_name", &params.workspace_name)?;
    let input_ref = required("input_ref", &params.input_ref)?;
    let output_name = required("output_name", &params.output_name)?;
    let desc = params.desc.as_deref().unwrap_or_default();

    let run_id = run_id();
    let run_dir = RunDir::create(&context.scratch, &run_id)?;

    // ------------------------------------------------------------------------
    // Inputs

    let object = context
        .workspace
        .get_object(input_ref)
        .await
        .wrap_err("Unable to fetch input_ref object from workspace")?;
    let type_name = object.info.type_name().wrap_err("Unable to fetch input_ref object from workspace")?;
    if type_name != "MSA" {
        Err(eyre!("Cannot yet handle input_name type of: {type_name}"))?
    }
    let input_name = object.info.name.clone();
    let alignment: Alignment =
        serde_json::from_value(object.data).wrap_err("Unable to fetch input_ref object from workspace")?;
    debug!("Alignment {input_name}: {} rows", alignment.alignment.len());

    let intree = match params.intree_ref.as_deref() {
        Some(intree_ref) => Some(fetch_intree(&context.workspace, intree_ref, &run_dir, &mut console).await?),
        None => None,
    };

    let mut provenance = Provenance {
        input_ws_objects: vec![input_ref.to_string()],
        service: SERVICE.to_string(),
        method: METHOD.to_string(),
    };
    provenance.input_ws_objects.extend(params.intree_ref.clone());

    // ------------------------------------------------------------------------
    // Validation

    let (labels, collisions) = alignment.label_map();
    let mut invalid = Console::new();
    alignment.validate(input_ref).into_iter().chain(collisions).for_each(|m| invalid.log(m));

    if !invalid.is_empty() {
        console.log("SETTING PROVENANCE");
        let report_name = report::report_name(&run_id);
        let report = FailureReport::new(invalid.lines());
        let object = SaveObject::new(REPORT_TYPE, &report_name, &report)?.hidden().with_provenance(provenance);
        let info = context
            .workspace
            .save_object(workspace_name, object)
            .await
            .wrap_err("Unable to save failure report to workspace")?;
        console.log("BUILDING RETURN OBJECT");
        console.log("run_FastTree DONE");
        return Ok(Output { report_name, report_ref: info.reference(), output_ref: None });
    }

    // ------------------------------------------------------------------------
    // FastTree

    let sequence_type = alignment.sequence_type();
    info!("Sequence type: {sequence_type}");
    let fasta = run_dir.fasta(&input_name);
    console.log(format!("writing fasta file: {}", fasta.display()));
    alignment.write_fasta(&fasta)?;

    let args = params.options.args(sequence_type, intree.as_deref());
    let newick_path = run_dir.newick(output_name);
    context.runner.run(&args, &fasta, &newick_path, &mut console).await?;

    // ------------------------------------------------------------------------
    // Tree

    console.log("SETTING PROVENANCE");
    console.log("UPLOADING RESULTS");
    let tree_type = match params.species_tree_flag {
        true => TreeType::SpeciesTree,
        false => TreeType::GeneTree,
    };
    let newick = std::fs::read_to_string(&newick_path)
        .wrap_err_with(|| format!("Failed to read FASTTREE output: {newick_path:?}"))?;
    let tree = Tree::from_alignment(output_name, desc, tree_type, &newick, &alignment);
    console.log(format!("\nNEWICK:\n{}\n", tree.tree));

    let object = SaveObject::new(TREE_TYPE, output_name, &tree)?.with_provenance(provenance);
    let tree_info = context
        .workspace
        .save_object(workspace_name, object)
        .await
        .map_err(|e| eyre!("Unable to save tree {output_name} object to workspace {workspace_name}: {e}"))?;

    console.log("BUILDING REPORT");
    let labeled_path = run_dir.labeled_newick(output_name);
    std::fs::write(&labeled_path, tree.labeled_newick(&labels)?)
        .wrap_err_with(|| format!("Failed to write: {labeled_path:?}"))?;

    let staging = &context.staging;
    let newick_id = upload(staging, &newick_path, None, "newick file").await?;
    let labeled_id = upload(staging, &labeled_path, None, "newick labels file").await?;

    // ------------------------------------------------------------------------
    // Images

    let (png, pdf, html) = (run_dir.png(output_name), run_dir.pdf(output_name), run_dir.html(output_name));
    let title = format!("{output_name}: {desc}");
    render::render(&tree.tree, &labels, output_name, &title, &Images { png: &png, pdf: &pdf, html: &html })?;

    let artifacts = Artifacts {
        newick: newick_id,
        labeled_newick: labeled_id,
        png: upload(staging, &png, None, "png file").await?,
        pdf: upload(staging, &pdf, None, "pdf file").await?,
        html: upload(staging, &run_dir.html_dir(), Some(Pack::Zip), "html directory").await?,
    };

    // ------------------------------------------------------------------------
    // Report

    let report = ExtendedReport::for_tree(workspace_name, output_name, &report::report_name(&run_id), &artifacts);
    let report_info =
        context.reports.create_extended_report(&report).await.wrap_err("Failed to create the run report.")?;

    console.log("BUILDING RETURN OBJECT");
    console.log("run_FastTree DONE");
    Ok(Output {
        report_name: report_info.name,
        report_ref: report_info.reference,
        output_ref: Some(tree_info.reference()),
    })
}

/// Fetches the starting tree and writes its Newick into the run directory.
async fn fetch_intree<W>(
    workspace: &W,
    intree_ref: &str,
    run_dir: &RunDir,
    console: &mut Console,
) -> Result<PathBuf, Report>
where
    W: ObjectStore,
{
    let object = workspace
        .get_object(intree_ref)
        .await
        .wrap_err("Unable to fetch intree_ref object from workspace")?;
    let type_name = object.info.type_name().wrap_err("Unable to fetch intree_ref object from workspace")?;
    if type_name != "Tree" {
        Err(eyre!("Cannot yet handle intree type of: {type_name}"))?
    }
    let newick = object
        .data
        .get("tree")
        .and_then(|t| t.as_str())
        .ok_or_else(|| eyre!("Unable to fetch intree_ref object from workspace: no tree in {intree_ref}"))?;

    let path = run_dir.intree(&object.info.name);
    console.log(format!("writing intree file: {}", path.display()));
    std::fs::write(&path, newick).wrap_err_with(|| format!("Failed to write: {path:?}"))?;
    Ok(path)
}

/// Uploads a file or directory and returns its blob store id.
async fn upload<F>(staging: &F, path: &Path, pack: Option<Pack>, what: &str) -> Result<String, Report>
where
    F: FileStaging,
{
    let uploaded = staging
        .file_to_shock(Upload::new(path, pack))
        .await
        .wrap_err_with(|| format!("error uploading {what} to shock"))?;
    debug!("Uploaded {path:?}: {}", uploaded.shock_id);
    Ok(uploaded.shock_id)
}
