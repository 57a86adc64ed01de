use super::client::{parse_response, request_body};
use super::*;
use color_eyre::eyre::{Report, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn info_json() -> Value {
    json!([7, "my_msa", "KBaseTrees.MSA-1.0", "2024-01-01T00:00:00+0000", 2, "user", 42, "my_ws", "abc", 123, null])
}

#[test]
fn object_info_from_tuple() -> Result<(), Report> {
    let info: ObjectInfo = serde_json::from_value(info_json())?;
    assert_eq!(info.name, "my_msa");
    assert_eq!(info.type_name()?, "MSA");
    assert_eq!(info.reference(), "42/7/2");
    assert_eq!(info.meta, None);
    assert_eq!(serde_json::to_value(&info)?, info_json());
    Ok(())
}

#[test]
fn object_data_with_info() -> Result<(), Report> {
    let object: ObjectData<Value> =
        serde_json::from_value(json!({"data": {"tree": "(A,B,C);"}, "info": info_json()}))?;
    assert_eq!(object.data["tree"], "(A,B,C);");
    assert_eq!(object.info.workspace, "my_ws");
    Ok(())
}

#[test]
fn save_object_hidden_and_provenance() -> Result<(), Report> {
    let provenance = Provenance {
        input_ws_objects: vec!["1/2/3".into()],
        service: "kb_fasttree".into(),
        method: "run_FastTree".into(),
    };
    let object = SaveObject::new("KBaseReport.Report", "report", &json!({"text_message": "FAILURE"}))?
        .hidden()
        .with_provenance(provenance);
    let value = serde_json::to_value(&object)?;
    assert_eq!(value["type"], "KBaseReport.Report");
    assert_eq!(value["hidden"], 1);
    assert_eq!(value["meta"], json!({}));
    assert_eq!(value["provenance"][0]["input_ws_objects"], json!(["1/2/3"]));

    let visible = SaveObject::new("KBaseTrees.Tree", "tree", &json!({}))?;
    assert!(serde_json::to_value(&visible)?.get("hidden").is_none());
    Ok(())
}

#[test]
fn upload_params() -> Result<(), Report> {
    let upload = Upload::new(std::path::Path::new("/scratch/run/output_html"), Some(Pack::Zip));
    assert_eq!(
        serde_json::to_value(&upload)?,
        json!({"file_path": "/scratch/run/output_html", "make_handle": 0, "pack": "zip"})
    );
    let upload = Upload::new(std::path::Path::new("tree.newick"), None);
    assert_eq!(serde_json::to_value(&upload)?, json!({"file_path": "tree.newick", "make_handle": 0}));
    Ok(())
}

#[test]
fn request_with_service_ver() -> Result<(), Report> {
    let body = request_body("KBaseReport.create_extended_report", &json!({}), "1", Some("release"))?;
    assert_eq!(body["context"]["service_ver"], "release");
    assert_eq!(body["version"], "1.1");
    assert_eq!(body["params"], json!([{}]));
    Ok(())
}

#[test]
fn response_first_result() -> Result<(), Report> {
    let text = r#"{"version": "1.1", "id": "1", "result": [{"shock_id": "abc-123"}]}"#;
    let uploaded: Uploaded = parse_response("DataFileUtil.file_to_shock", StatusCode::OK, text)?;
    assert_eq!(uploaded.shock_id, "abc-123");
    Ok(())
}

#[test]
fn response_error_is_fatal() -> Result<(), Report> {
    let text = r#"{"version": "1.1", "error": {"name": "JSONRPCError", "code": -32500, "message": "Object not found", "error": "trace"}}"#;
    let result: Result<Value, Report> = parse_response("Workspace.get_objects", StatusCode::INTERNAL_SERVER_ERROR, text);
    let error = result.err().ok_or_else(|| eyre!("expected an error"))?;
    assert!(error.to_string().contains("Object not found"));
    assert!(error.to_string().contains("-32500"));
    Ok(())
}

#[test]
fn response_bad_status_is_fatal() -> Result<(), Report> {
    let result: Result<Value, Report> = parse_response("Workspace.get_objects", StatusCode::BAD_GATEWAY, "<html>");
    assert!(result.is_err());

    let result: Result<Value, Report> = parse_response("Workspace.get_objects", StatusCode::OK, r#"{"result": []}"#);
    assert!(result.is_err());
    Ok(())
}
