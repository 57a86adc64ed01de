//! JSON-RPC 1.1 clients for the platform services.

use crate::report::{ExtendedReport, ReportInfo, SERVICE_VER};
use crate::workspace::{
    FileStaging, ObjectData, ObjectInfo, ObjectStore, ReportService, SaveObject, Upload, Uploaded,
};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::debug;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error object of a failed call.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RpcError {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Server-side trace.
    #[serde(default)]
    pub error: Option<String>,
}

/// A JSON-RPC 1.1 endpoint.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    pub url: String,
    token: Option<String>,
    /// Version of a dynamic service to call through the callback server.
    pub service_ver: Option<String>,
}

impl Client {
    pub fn new(url: &str, token: Option<&str>) -> Self {
        let user_agent = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder().user_agent(user_agent).build().unwrap_or_default();
        Client { http, url: url.to_string(), token: token.map(String::from), service_ver: None }
    }

    pub fn with_service_ver(mut self, service_ver: &str) -> Self {
        self.service_ver = Some(service_ver.to_string());
        self
    }

    /// Calls `method` with a single positional parameter and returns the first result.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, Report>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id: u64 = rand::thread_rng().gen();
        let body = request_body(method, params, &id.to_string(), self.service_ver.as_deref())?;
        debug!("Calling {method}: {}", self.url);

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }
        let response = request.send().await.wrap_err_with(|| format!("Failed to call {method}: {}", self.url))?;
        let status = response.status();
        let text = response.text().await.wrap_err_with(|| format!("Failed to read {method} response."))?;
        parse_response(method, status, &text)
    }
}

/// Returns the request body of a call.
///
/// ```rust
/// use kb_fasttree::workspace::client::request_body;
/// let body = request_body("Workspace.get_objects", &[serde_json::json!({"ref": "1/2/3"})], "7", None)?;
/// assert_eq!(body.to_string(), r#"{"id":"7","method":"Workspace.get_objects","params":[[{"ref":"1/2/3"}]],"version":"1.1"}"#);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn request_body<P>(method: &str, params: &P, id: &str, service_ver: Option<&str>) -> Result<Value, Report>
where
    P: Serialize,
{
    let params = serde_json::to_value(params).wrap_err_with(|| format!("Failed to serialize {method} params."))?;
    let mut body = json!({
        "method": method,
        "params": [params],
        "version": "1.1",
        "id": id,
    });
    if let Some(service_ver) = service_ver {
        body["context"] = json!({ "service_ver": service_ver });
    }
    Ok(body)
}

/// Reads the first result of a response, or the error it carries.
pub fn parse_response<R>(method: &str, status: StatusCode, text: &str) -> Result<R, Report>
where
    R: DeserializeOwned,
{
    let body: Option<Value> = serde_json::from_str(text).ok();

    if let Some(error) = body.as_ref().and_then(|b| b.get("error")).filter(|e| !e.is_null()) {
        let error: RpcError = serde_json::from_value(error.clone()).unwrap_or_default();
        let mut report = eyre!("{method} failed: {} ({}): {}", error.name, error.code, error.message);
        if let Some(trace) = error.error {
            report = report.section(trace);
        }
        return Err(report);
    }
    if !status.is_success() {
        Err(eyre!("{method} failed with status {status}").suggestion(text.chars().take(500).collect::<String>()))?
    }

    let result = body
        .and_then(|mut b| b.get_mut("result").map(Value::take))
        .ok_or_else(|| eyre!("{method} returned no result."))?;
    let first = match result {
        Value::Array(mut results) if !results.is_empty() => results.swap_remove(0),
        other => Err(eyre!("{method} returned an unexpected result: {other}"))?,
    };
    serde_json::from_value(first).wrap_err_with(|| format!("Failed to read {method} result."))
}

// ----------------------------------------------------------------------------
// Services
// ----------------------------------------------------------------------------

/// The Workspace object store.
#[derive(Clone, Debug)]
pub struct Workspace(pub Client);

impl ObjectStore for Workspace {
    async fn get_object(&self, reference: &str) -> Result<ObjectData<Value>, Report> {
        let params = json!([{ "ref": reference }]);
        let mut objects: Vec<ObjectData<Value>> = self.0.call("Workspace.get_objects", &params).await?;
        match objects.is_empty() {
            true => Err(eyre!("No object found: {reference}")),
            false => Ok(objects.swap_remove(0)),
        }
    }

    async fn save_object(&self, workspace: &str, object: SaveObject) -> Result<ObjectInfo, Report> {
        let params = json!({ "workspace": workspace, "objects": [object] });
        let mut infos: Vec<ObjectInfo> = self.0.call("Workspace.save_objects", &params).await?;
        match infos.is_empty() {
            true => Err(eyre!("Workspace.save_objects returned no object info.")),
            false => Ok(infos.swap_remove(0)),
        }
    }
}

/// File staging through the callback server.
#[derive(Clone, Debug)]
pub struct DataFileUtil(pub Client);

impl FileStaging for DataFileUtil {
    async fn file_to_shock(&self, upload: Upload) -> Result<Uploaded, Report> {
        self.0.call("DataFileUtil.file_to_shock", &upload).await
    }
}

/// The report service, called through the callback server at [`SERVICE_VER`].
#[derive(Clone, Debug)]
pub struct KBaseReport(pub Client);

impl KBaseReport {
    pub fn new(url: &str, token: Option<&str>) -> Self {
        KBaseReport(Client::new(url, token).with_service_ver(SERVICE_VER))
    }
}

impl ReportService for KBaseReport {
    async fn create_extended_report(&self, report: &ExtendedReport) -> Result<ReportInfo, Report> {
        self.0.call("KBaseReport.create_extended_report", report).await
    }
}
