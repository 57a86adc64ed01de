use super::*;
use crate::report::ReportInfo;
use crate::workspace::{ObjectData, ObjectInfo, Uploaded};
use color_eyre::eyre::{Report, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

// ----------------------------------------------------------------------------
// Fakes

#[derive(Default)]
struct FakeWorkspace {
    objects: BTreeMap<String, ObjectData<Value>>,
    saved: Mutex<Vec<(String, SaveObject)>>,
}

impl FakeWorkspace {
    fn with_object(mut self, reference: &str, name: &str, type_string: &str, data: Value) -> Self {
        let info = ObjectInfo { name: name.into(), type_string: type_string.into(), ..Default::default() };
        self.objects.insert(reference.into(), ObjectData { data, info });
        self
    }

    fn saved(&self) -> Vec<(String, SaveObject)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ObjectStore for FakeWorkspace {
    async fn get_object(&self, reference: &str) -> Result<ObjectData<Value>, Report> {
        self.objects.get(reference).cloned().ok_or_else(|| eyre!("No object found: {reference}"))
    }

    async fn save_object(&self, workspace: &str, object: SaveObject) -> Result<ObjectInfo, Report> {
        let mut saved = self.saved.lock().map_err(|e| eyre!("{e}"))?;
        let info = ObjectInfo {
            objid: saved.len() as u64 + 1,
            name: object.name.clone(),
            type_string: object.type_string.clone(),
            version: 1,
            wsid: 10,
            workspace: workspace.into(),
            ..Default::default()
        };
        saved.push((workspace.into(), object));
        Ok(info)
    }
}

#[derive(Default)]
struct FakeStaging {
    uploads: Mutex<Vec<Upload>>,
    fail: bool,
}

impl FileStaging for FakeStaging {
    async fn file_to_shock(&self, upload: Upload) -> Result<Uploaded, Report> {
        if self.fail {
            Err(eyre!("connection refused"))?
        }
        let mut uploads = self.uploads.lock().map_err(|e| eyre!("{e}"))?;
        uploads.push(upload);
        Ok(Uploaded { shock_id: format!("shock_{}", uploads.len()), size: None })
    }
}

#[derive(Default)]
struct FakeReports {
    reports: Mutex<Vec<ExtendedReport>>,
}

impl ReportService for FakeReports {
    async fn create_extended_report(&self, report: &ExtendedReport) -> Result<ReportInfo, Report> {
        self.reports.lock().map_err(|e| eyre!("{e}"))?.push(report.clone());
        Ok(ReportInfo { reference: "10/99/1".into(), name: report.report_object_name.clone() })
    }
}

fn msa(rows: &[(&str, &str)]) -> Value {
    let alignment = rows.iter().map(|(id, seq)| (id.to_string(), json!(seq))).collect::<serde_json::Map<_, _>>();
    json!({ "alignment": alignment, "alignment_length": 4, "sequence_type": "dna" })
}

fn params() -> Params {
    Params {
        workspace_name: Some("my_ws".into()),
        input_ref: Some("1/2/3".into()),
        output_name: Some("my_tree".into()),
        desc: Some("a test tree".into()),
        ..Default::default()
    }
}

fn context(
    scratch: &Path,
    runner: Runner,
    workspace: FakeWorkspace,
    staging: FakeStaging,
) -> Context<FakeWorkspace, FakeStaging, FakeReports> {
    Context { scratch: scratch.to_path_buf(), runner, workspace, staging, reports: FakeReports::default() }
}

/// A FastTree stand-in that joins the FASTA headers into a star tree and records its arguments.
#[cfg(unix)]
fn fake_fasttree(dir: &Path) -> Result<PathBuf, Report> {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("FastTree");
    let args = dir.join("args.txt");
    let script = format!(
        "#!/bin/sh\necho \"$@\" > '{}'\necho 'Reading alignment from standard input' >&2\nleaves=$(sed -n 's/^>\\(.*\\)$/\\1:0.1/p' | paste -sd, -)\necho \"($leaves);\"\n",
        args.display()
    );
    std::fs::write(&path, script)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

// ----------------------------------------------------------------------------
// Tests

#[tokio::test]
async fn missing_parameter_is_fatal() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let context = context(dir.path(), Runner::new("FastTree"), FakeWorkspace::default(), FakeStaging::default());

    for field in ["workspace_name", "input_ref", "output_name"] {
        let mut params = params();
        match field {
            "workspace_name" => params.workspace_name = None,
            "input_ref" => params.input_ref = None,
            _ => params.output_name = None,
        }
        let error = fasttree(&params, &context).await.err().ok_or_else(|| eyre!("expected an error"))?;
        assert_eq!(error.to_string(), format!("{field} parameter is required"));
    }
    assert!(context.workspace.saved().is_empty());
    assert!(std::fs::read_dir(dir.path())?.next().is_none());
    Ok(())
}

#[tokio::test]
async fn wrong_input_type_is_fatal() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let workspace = FakeWorkspace::default().with_object("1/2/3", "genome", "KBaseGenomes.Genome-17.0", json!({}));
    let context = context(dir.path(), Runner::new("FastTree"), workspace, FakeStaging::default());

    let error = fasttree(&params(), &context).await.err().ok_or_else(|| eyre!("expected an error"))?;
    assert_eq!(error.to_string(), "Cannot yet handle input_name type of: Genome");
    Ok(())
}

#[tokio::test]
async fn missing_input_is_wrapped() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let context = context(dir.path(), Runner::new("FastTree"), FakeWorkspace::default(), FakeStaging::default());

    let error = fasttree(&params(), &context).await.err().ok_or_else(|| eyre!("expected an error"))?;
    assert_eq!(error.to_string(), "Unable to fetch input_ref object from workspace");
    Ok(())
}

#[tokio::test]
async fn small_alignment_saves_failure_report() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let workspace =
        FakeWorkspace::default().with_object("1/2/3", "msa", "KBaseTrees.MSA-1.0", msa(&[("A", "ACGT"), ("B", "ACGG")]));
    let context = context(dir.path(), Runner::new("FastTree"), workspace, FakeStaging::default());

    let output = fasttree(&params(), &context).await?;
    assert_eq!(output.output_ref, None);
    assert!(output.report_name.starts_with("fasttree_report_"));
    assert_eq!(output.report_ref, "10/1/1");

    let saved = context.workspace.saved();
    assert_eq!(saved.len(), 1);
    let (workspace_name, report) = &saved[0];
    assert_eq!(workspace_name, "my_ws");
    assert_eq!(report.type_string, "KBaseReport.Report");
    assert_eq!(report.hidden, 1);
    assert_eq!(report.provenance[0].input_ws_objects, ["1/2/3"]);
    assert_eq!(report.provenance[0].method, "run_FastTree");

    let text = report.data["text_message"].as_str().unwrap_or_default();
    assert!(text.starts_with("FAILURE\n\n"));
    assert!(text.contains("must have 3 or more records in MSA: 1/2/3"));
    assert_eq!(report.data["objects_created"], json!([]));

    assert!(context.staging.uploads.lock().map(|u| u.is_empty()).unwrap_or(false));
    let json = serde_json::to_value(&output)?;
    assert_eq!(json["output_ref"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn label_collision_saves_failure_report() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let rows = [("seq 1", "ACGT"), ("seq  1", "ACGG"), ("seq 2", "ACGA")];
    let workspace = FakeWorkspace::default().with_object("1/2/3", "msa", "KBaseTrees.MSA-1.0", msa(&rows));
    let context = context(dir.path(), Runner::new("FastTree"), workspace, FakeStaging::default());

    let output = fasttree(&params(), &context).await?;
    assert_eq!(output.output_ref, None);
    let saved = context.workspace.saved();
    let text = saved[0].1.data["text_message"].as_str().unwrap_or_default().to_string();
    assert!(text.contains("both sanitize to 'seq_1'"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn nucleotide_tree_end_to_end() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let binary = fake_fasttree(dir.path())?;
    let scratch = dir.path().join("scratch");
    let workspace = FakeWorkspace::default().with_object(
        "1/2/3",
        "msa",
        "KBaseTrees.MSA-1.0",
        msa(&[("A", "ACGT"), ("B", "ACGG"), ("C", "ACGA")]),
    );
    let context = context(&scratch, Runner::new(&binary), workspace, FakeStaging::default());

    let mut params = params();
    params.options.gtr = true;
    params.options.wag = true;
    let output = fasttree(&params, &context).await?;

    assert_eq!(output.output_ref.as_deref(), Some("10/1/1"));
    assert_eq!(output.report_ref, "10/99/1");
    assert!(output.report_name.starts_with("fasttree_report_"));

    let args = std::fs::read_to_string(dir.path().join("args.txt"))?;
    assert_eq!(args.trim(), "-nopr -gtr -nt");

    // tree object
    let saved = context.workspace.saved();
    assert_eq!(saved.len(), 1);
    let tree = &saved[0].1;
    assert_eq!(tree.type_string, "KBaseTrees.Tree");
    assert_eq!(tree.name, "my_tree");
    assert_eq!(tree.hidden, 0);
    assert_eq!(tree.data["type"], "GeneTree");
    assert_eq!(tree.data["description"], "a test tree");
    let newick = tree.data["tree"].as_str().unwrap_or_default();
    assert!(newick.ends_with(';'));
    assert_eq!(fasttree_phylo::newick::leaf_labels(newick)?, ["A", "B", "C"]);
    assert_eq!(tree.data["leaf_list"], json!(["A", "B", "C"]));
    assert_eq!(tree.data["default_node_labels"], json!({"A": "A", "B": "B", "C": "C"}));

    // uploads
    let uploads = context.staging.uploads.lock().map_err(|e| eyre!("{e}"))?.clone();
    let files = uploads
        .iter()
        .map(|u| Path::new(&u.file_path).file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(files, ["my_tree.newick", "my_tree-labels.newick", "my_tree.png", "my_tree.pdf", "output_html"]);
    assert_eq!(uploads[4].pack, Some(Pack::Zip));
    assert!(uploads[..4].iter().all(|u| u.pack.is_none() && u.make_handle == 0));
    for upload in &uploads[..4] {
        crate::utils::check_file(&upload.file_path)?;
    }
    assert!(Path::new(&uploads[4].file_path).join("my_tree.html").is_file());

    // report
    let reports = context.reports.reports.lock().map_err(|e| eyre!("{e}"))?.clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].workspace_name, "my_ws");
    assert_eq!(reports[0].objects_created[0].reference, "my_ws/my_tree");
    assert_eq!(reports[0].html_links[0].shock_id, "shock_5");
    assert_eq!(reports[0].file_links.len(), 4);
    assert_eq!(reports[0].report_object_name, output.report_name);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn labels_and_starting_tree() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let binary = fake_fasttree(dir.path())?;
    let scratch = dir.path().join("scratch");

    let mut data = msa(&[("seq 1", "MKLV"), ("gi|2", "MKLI"), ("x", "MKIV")]);
    data["default_row_labels"] = json!({"seq 1": "E. coli", "gi|2": "B. subtilis", "x": "x"});
    data["row_order"] = json!(["x", "seq 1", "gi|2"]);
    let workspace = FakeWorkspace::default()
        .with_object("1/2/3", "msa", "KBaseTrees.MSA-1.0", data)
        .with_object("4/5/6", "start", "KBaseTrees.Tree-1.0", json!({"tree": "(x,seq_1,gi%7c2);"}));
    let context = context(&scratch, Runner::new(&binary), workspace, FakeStaging::default());

    let mut params = params();
    params.intree_ref = Some("4/5/6".into());
    params.species_tree_flag = true;
    params.options.cat = Some(4);
    let output = fasttree(&params, &context).await?;
    assert!(output.output_ref.is_some());

    let args = std::fs::read_to_string(dir.path().join("args.txt"))?;
    let args = args.split_whitespace().collect::<Vec<_>>();
    assert_eq!(args[0], "-nopr");
    assert_eq!(args[1], "-intree");
    assert!(args[2].ends_with("start.newick"));
    assert_eq!(std::fs::read_to_string(args[2])?, "(x,seq_1,gi%7c2);");
    assert_eq!(&args[3..], ["-cat", "4"]);

    let saved = context.workspace.saved();
    let tree = &saved[0].1;
    assert_eq!(tree.data["type"], "SpeciesTree");
    assert_eq!(tree.data["leaf_list"], json!(["x", "seq_1", "gi%7c2"]));
    assert_eq!(tree.data["default_node_labels"]["seq_1"], "E. coli");
    assert_eq!(tree.provenance[0].input_ws_objects, ["1/2/3", "4/5/6"]);

    let uploads = context.staging.uploads.lock().map_err(|e| eyre!("{e}"))?.clone();
    let labeled = std::fs::read_to_string(&uploads[1].file_path)?;
    assert_eq!(labeled, "(x:0.1,'E. coli':0.1,'B. subtilis':0.1);");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn upload_failure_is_fatal() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let binary = fake_fasttree(dir.path())?;
    let workspace = FakeWorkspace::default().with_object(
        "1/2/3",
        "msa",
        "KBaseTrees.MSA-1.0",
        msa(&[("A", "ACGT"), ("B", "ACGG"), ("C", "ACGA")]),
    );
    let staging = FakeStaging { fail: true, ..Default::default() };
    let context = context(dir.path(), Runner::new(&binary), workspace, staging);

    let error = fasttree(&params(), &context).await.err().ok_or_else(|| eyre!("expected an error"))?;
    assert_eq!(error.to_string(), "error uploading newick file to shock");
    // the tree was saved before the upload failed
    assert_eq!(context.workspace.saved().len(), 1);
    Ok(())
}
