//! Run reports: the failure report saved directly and the extended report of a finished tree.

use serde::{Deserialize, Serialize};

/// Version of the report service to call.
pub const SERVICE_VER: &str = "release";
/// Type of report objects.
pub const REPORT_TYPE: &str = "KBaseReport.Report";

/// Returns the report object name of a run.
pub fn report_name(run_id: &str) -> String {
    format!("fasttree_report_{run_id}")
}

/// An object the run created.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CreatedObject {
    #[serde(rename = "ref")]
    pub reference: String,
    pub description: String,
}

/// A plain report, saved directly to the workspace when the input can't be used.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FailureReport {
    pub objects_created: Vec<CreatedObject>,
    pub text_message: String,
}

impl FailureReport {
    /// ```rust
    /// use kb_fasttree::report::FailureReport;
    /// let report = FailureReport::new(&["first".to_string(), "second".to_string()]);
    /// assert_eq!(report.text_message, "FAILURE\n\nfirst\nsecond\n");
    /// assert!(report.objects_created.is_empty());
    /// ```
    pub fn new(messages: &[String]) -> Self {
        FailureReport { objects_created: Vec::new(), text_message: format!("FAILURE\n\n{}\n", messages.join("\n")) }
    }
}

/// A link to an uploaded file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Link {
    pub shock_id: String,
    pub name: String,
    pub label: String,
}

/// Blob store ids of the uploaded artifacts of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Artifacts {
    pub newick: String,
    pub labeled_newick: String,
    pub png: String,
    pub pdf: String,
    pub html: String,
}

/// Parameters of the report service's extended report.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExtendedReport {
    pub objects_created: Vec<CreatedObject>,
    pub message: String,
    pub direct_html: String,
    pub direct_html_link_index: u32,
    pub html_links: Vec<Link>,
    pub file_links: Vec<Link>,
    pub workspace_name: String,
    pub report_object_name: String,
}

impl ExtendedReport {
    /// Describes a saved tree `name` and its uploaded artifacts.
    pub fn for_tree(workspace: &str, name: &str, report_name: &str, artifacts: &Artifacts) -> Self {
        let link = |shock_id: &str, file: String, label: &str| Link {
            shock_id: shock_id.to_string(),
            name: file,
            label: format!("{name} {label}"),
        };

        ExtendedReport {
            objects_created: vec![CreatedObject {
                reference: format!("{workspace}/{name}"),
                description: format!("{name} Tree"),
            }],
            message: String::new(),
            direct_html: String::new(),
            direct_html_link_index: 0,
            html_links: vec![link(&artifacts.html, format!("{name}.html"), "HTML")],
            file_links: vec![
                link(&artifacts.newick, format!("{name}.newick"), "NEWICK"),
                link(&artifacts.labeled_newick, format!("{name}-labels.newick"), "NEWICK (with labels)"),
                link(&artifacts.png, format!("{name}.png"), "PNG"),
                link(&artifacts.pdf, format!("{name}.pdf"), "PDF"),
            ],
            workspace_name: workspace.to_string(),
            report_object_name: report_name.to_string(),
        }
    }
}

/// The report service's answer.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ReportInfo {
    #[serde(rename = "ref")]
    pub reference: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{Report, Result};
    use serde_json::json;

    #[test]
    fn extended_report_links() -> Result<(), Report> {
        let artifacts = Artifacts {
            newick: "s1".into(),
            labeled_newick: "s2".into(),
            png: "s3".into(),
            pdf: "s4".into(),
            html: "s5".into(),
        };
        let report = ExtendedReport::for_tree("my_ws", "tree", &report_name("20240101_000000"), &artifacts);
        let value = serde_json::to_value(&report)?;

        assert_eq!(value["objects_created"], json!([{"ref": "my_ws/tree", "description": "tree Tree"}]));
        assert_eq!(value["html_links"], json!([{"shock_id": "s5", "name": "tree.html", "label": "tree HTML"}]));
        assert_eq!(value["report_object_name"], "fasttree_report_20240101_000000");
        assert_eq!(value["direct_html_link_index"], 0);

        let labels = report.file_links.iter().map(|l| l.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["tree NEWICK", "tree NEWICK (with labels)", "tree PNG", "tree PDF"]);
        assert_eq!(report.file_links[1].name, "tree-labels.newick");
        assert_eq!(report.file_links[1].shock_id, "s2");
        Ok(())
    }

    #[test]
    fn report_info_ref() -> Result<(), Report> {
        let info: ReportInfo = serde_json::from_value(json!({"ref": "1/2/3", "name": "r"}))?;
        assert_eq!(info.reference, "1/2/3");
        Ok(())
    }
}
