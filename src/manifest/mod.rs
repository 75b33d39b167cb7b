//! Sliced-file manifests
//!
//! A sliced dataset is a set of CSV objects described by a JSON manifest
//! stored next to them:
//!
//! ```json
//! {"entries":[{"url":"s3://bucket/key1","mandatory":true}]}
//! ```
//!
//! Importers read the manifest to learn which objects to load; exporters
//! write one after unloading.

mod url;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ImportExportError, ImportExportResult};
use crate::models::CloudLocation;
use crate::storage::{CloudStorage, ObjectInfo, StorageError};

pub use url::ObjectUrl;

/// Suffix appended to a path to obtain its manifest key
pub const MANIFEST_SUFFIX: &str = "manifest";

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

impl ManifestEntry {
    pub fn mandatory(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mandatory: true,
        }
    }
}

/// File produced by a warehouse unload, as reported by the unload statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadedFile {
    /// Name relative to the directory of the export path
    pub file_name: String,
    pub file_size: u64,
    pub row_count: u64,
}

/// Manifest describing the objects of a sliced file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

/// Key of the manifest describing `path`
///
/// A path that already names a manifest is returned unchanged.
pub fn manifest_key(path: &str) -> String {
    if path.ends_with(MANIFEST_SUFFIX) {
        path.to_string()
    } else {
        format!("{}{}", path, MANIFEST_SUFFIX)
    }
}

/// Directory part of a key including the trailing slash, or empty
fn key_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..=index],
        None => "",
    }
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Build a manifest from every object under `location.path`
    ///
    /// The manifest object itself and zero-sized folder markers are skipped.
    pub async fn from_folder(
        storage: &dyn CloudStorage,
        location: &CloudLocation,
        append_separator: bool,
    ) -> ImportExportResult<Self> {
        let objects = list_data_objects(storage, location, append_separator).await?;
        Ok(Self::from_objects(location, &objects))
    }

    /// One mandatory entry per listed object
    pub fn from_objects(location: &CloudLocation, objects: &[ObjectInfo]) -> Self {
        let entries = objects
            .iter()
            .map(|object| ManifestEntry::mandatory(location.with_path(object.key.as_str()).url()))
            .collect();
        Self { entries }
    }

    /// Build a manifest from the rows an unload statement reported
    pub fn from_unload_result(location: &CloudLocation, files: &[UnloadedFile]) -> Self {
        let directory = key_directory(&location.path);
        let entries = files
            .iter()
            .map(|file| {
                let key = if file.file_name.starts_with(directory) {
                    file.file_name.clone()
                } else {
                    format!("{}{}", directory, file.file_name)
                };
                ManifestEntry::mandatory(location.with_path(key).url())
            })
            .collect();
        Self { entries }
    }

    pub fn to_json(&self) -> ImportExportResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> ImportExportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Store the manifest at `<location.path>manifest`
    pub async fn write(
        &self,
        storage: &dyn CloudStorage,
        location: &CloudLocation,
    ) -> ImportExportResult<String> {
        let key = manifest_key(&location.path);
        storage
            .put_object(&location.container, &key, self.to_json()?.into_bytes())
            .await?;
        Ok(location.with_path(key).url())
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.url.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Data objects under `location.path`
///
/// Lists `path + "/"` when `append_separator` is set. Manifests of the
/// listed prefix and zero-sized folder markers are left out.
pub async fn list_data_objects(
    storage: &dyn CloudStorage,
    location: &CloudLocation,
    append_separator: bool,
) -> ImportExportResult<Vec<ObjectInfo>> {
    let prefix = if append_separator && !location.path.ends_with('/') {
        format!("{}/", location.path)
    } else {
        location.path.clone()
    };
    let own_key = manifest_key(&location.path);
    let prefix_manifest = manifest_key(&prefix);

    let objects: Vec<ObjectInfo> = storage
        .list_objects(&location.container, &prefix)
        .await?
        .into_iter()
        .filter(|object| object.key != own_key && object.key != prefix_manifest)
        .filter(|object| !(object.size == 0 && (object.key == prefix || object.key.ends_with('/'))))
        .collect();

    debug!(
        "Listed {} objects under {}",
        objects.len(),
        location.with_path(prefix.as_str())
    );
    Ok(objects)
}

/// Fetch and parse the manifest describing `location`
///
/// A missing manifest fails with `MandatoryFileNotFound` when `mandatory`,
/// otherwise it yields an empty manifest. Entry URLs are returned verbatim.
pub async fn resolve_manifest(
    storage: &dyn CloudStorage,
    location: &CloudLocation,
    mandatory: bool,
) -> ImportExportResult<Manifest> {
    let key = manifest_key(&location.path);
    match storage.get_object(&location.container, &key).await {
        Ok(body) => {
            let text = String::from_utf8(body).map_err(|e| {
                ImportExportError::new(
                    crate::error::ErrorKind::InvalidSourceData,
                    format!("Manifest {} is not valid UTF-8", location.with_path(key.as_str())),
                )
                .with_source(e)
            })?;
            Manifest::from_json(&text)
        }
        Err(StorageError::NotFound(_)) if mandatory => Err(
            ImportExportError::mandatory_file_not_found(&location.with_path(key).url()),
        ),
        Err(StorageError::NotFound(_)) => Ok(Manifest::default()),
        Err(err) => Err(err.into()),
    }
}
