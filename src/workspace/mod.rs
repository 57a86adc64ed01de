//! Platform collaborators: the Workspace object store, file staging and the report service.
//!
//! Each collaborator is a trait so a run can be driven against fakes. The [`client`]
//! module implements all three over JSON-RPC 1.1.

pub mod client;

#[doc(inline)]
pub use client::{Client, DataFileUtil, KBaseReport, Workspace};

use crate::report::{ExtendedReport, ReportInfo};
use color_eyre::eyre::{eyre, Report, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[cfg(test)]
mod tests;

// ----------------------------------------------------------------------------
// Object Info
// ----------------------------------------------------------------------------

/// The object info tuple returned by the Workspace for every object.
type InfoTuple = (
    u64,
    String,
    String,
    String,
    u64,
    String,
    u64,
    String,
    String,
    u64,
    Option<BTreeMap<String, String>>,
);

/// Metadata of a stored workspace object.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(from = "InfoTuple", into = "InfoTuple")]
pub struct ObjectInfo {
    pub objid: u64,
    pub name: String,
    /// Full type string (ex. `KBaseTrees.MSA-1.0`).
    pub type_string: String,
    pub save_date: String,
    pub version: u64,
    pub saved_by: String,
    pub wsid: u64,
    pub workspace: String,
    pub chsum: String,
    pub size: u64,
    pub meta: Option<BTreeMap<String, String>>,
}

#[rustfmt::skip]
impl From<InfoTuple> for ObjectInfo {
    fn from(t: InfoTuple) -> Self {
        ObjectInfo { objid: t.0, name: t.1, type_string: t.2, save_date: t.3, version: t.4, saved_by: t.5, wsid: t.6, workspace: t.7, chsum: t.8, size: t.9, meta: t.10 }
    }
}

#[rustfmt::skip]
impl From<ObjectInfo> for InfoTuple {
    fn from(i: ObjectInfo) -> Self {
        (i.objid, i.name, i.type_string, i.save_date, i.version, i.saved_by, i.wsid, i.workspace, i.chsum, i.size, i.meta)
    }
}

impl ObjectInfo {
    /// Returns the versioned reference `wsid/objid/version`.
    ///
    /// ```rust
    /// use kb_fasttree::workspace::ObjectInfo;
    /// let info = ObjectInfo { objid: 2, wsid: 1, version: 3, ..Default::default() };
    /// assert_eq!(info.reference(), "1/2/3");
    /// ```
    pub fn reference(&self) -> String {
        format!("{}/{}/{}", self.wsid, self.objid, self.version)
    }

    /// Returns the short type name, the part between the module and the version.
    ///
    /// ```rust
    /// use kb_fasttree::workspace::ObjectInfo;
    /// let info = ObjectInfo { type_string: "KBaseTrees.MSA-1.0".into(), ..Default::default() };
    /// assert_eq!(info.type_name()?, "MSA");
    /// let info = ObjectInfo { type_string: "MSA".into(), ..Default::default() };
    /// assert!(info.type_name().is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn type_name(&self) -> Result<&str, Report> {
        let (_module, rest) = self
            .type_string
            .split_once('.')
            .ok_or_else(|| eyre!("Malformed object type: {:?}", self.type_string))?;
        Ok(rest.split('-').next().unwrap_or(rest))
    }
}

/// An object fetched from the Workspace.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ObjectData<T> {
    pub data: T,
    pub info: ObjectInfo,
}

// ----------------------------------------------------------------------------
// Saving
// ----------------------------------------------------------------------------

/// Where a saved object came from.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Provenance {
    pub input_ws_objects: Vec<String>,
    pub service: String,
    pub method: String,
}

/// An object to save in a workspace.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SaveObject {
    #[serde(rename = "type")]
    pub type_string: String,
    pub data: serde_json::Value,
    pub name: String,
    pub meta: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hidden: u8,
    pub provenance: Vec<Provenance>,
}

fn is_zero(n: &u8) -> bool {
    *n == 0
}

impl SaveObject {
    pub fn new<T: Serialize>(type_string: &str, name: &str, data: &T) -> Result<Self, Report> {
        Ok(SaveObject {
            type_string: type_string.to_string(),
            data: serde_json::to_value(data)?,
            name: name.to_string(),
            meta: BTreeMap::new(),
            hidden: 0,
            provenance: Vec::new(),
        })
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = 1;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = vec![provenance];
        self
    }
}

// ----------------------------------------------------------------------------
// File Staging
// ----------------------------------------------------------------------------

/// Archive format for uploading a directory.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pack {
    Zip,
}

/// Arguments of a file upload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Upload {
    pub file_path: String,
    pub make_handle: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<Pack>,
}

impl Upload {
    pub fn new(path: &Path, pack: Option<Pack>) -> Self {
        Upload { file_path: path.display().to_string(), make_handle: 0, pack }
    }
}

/// Result of a file upload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Uploaded {
    pub shock_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Reads and writes typed objects.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Fetches the object at `reference` (ex. `1/2/3` or `workspace/name`).
    async fn get_object(&self, reference: &str) -> Result<ObjectData<serde_json::Value>, Report>;

    /// Saves an object into the named workspace and returns its info.
    async fn save_object(&self, workspace: &str, object: SaveObject) -> Result<ObjectInfo, Report>;
}

/// Uploads files to the blob store.
#[allow(async_fn_in_trait)]
pub trait FileStaging {
    async fn file_to_shock(&self, upload: Upload) -> Result<Uploaded, Report>;
}

/// Creates report objects.
#[allow(async_fn_in_trait)]
pub trait ReportService {
    async fn create_extended_report(&self, report: &ExtendedReport) -> Result<ReportInfo, Report>;
}
