use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ImportExportError};
use crate::storage::StorageProvider;

const AZURE_BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// Parsed provider URL of a single object
///
/// | Provider | Format |
/// |---|---|
/// | S3 | `s3://bucket/key` |
/// | GCS | `gs://bucket/key` |
/// | Azure | `azure://<account>.blob.core.windows.net/<container>/<key>` |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectUrl {
    pub provider: StorageProvider,
    pub account: Option<String>,
    pub container: String,
    pub key: String,
}

impl ObjectUrl {
    /// Public HTTPS endpoint of an Azure blob
    pub fn azure_https(&self) -> Option<String> {
        let account = self.account.as_ref()?;
        Some(format!(
            "https://{}{}/{}/{}",
            account, AZURE_BLOB_HOST_SUFFIX, self.container, self.key
        ))
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            StorageProvider::S3 => write!(f, "s3://{}/{}", self.container, self.key),
            StorageProvider::Gcs => write!(f, "gs://{}/{}", self.container, self.key),
            StorageProvider::Azure => write!(
                f,
                "azure://{}{}/{}/{}",
                self.account.as_deref().unwrap_or_default(),
                AZURE_BLOB_HOST_SUFFIX,
                self.container,
                self.key
            ),
        }
    }
}

impl FromStr for ObjectUrl {
    type Err = ImportExportError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ImportExportError::new(
                ErrorKind::InvalidSourceData,
                format!("Unsupported object URL \"{}\"", url),
            )
            .with_context("url", url)
        };

        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        let provider = match scheme {
            "s3" => StorageProvider::S3,
            "gs" | "gcs" => StorageProvider::Gcs,
            "azure" | "https" => StorageProvider::Azure,
            _ => return Err(invalid()),
        };

        match provider {
            StorageProvider::S3 | StorageProvider::Gcs => {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(invalid());
                }
                Ok(Self {
                    provider,
                    account: None,
                    container: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            StorageProvider::Azure => {
                let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
                let account = host
                    .strip_suffix(AZURE_BLOB_HOST_SUFFIX)
                    .filter(|account| !account.is_empty())
                    .ok_or_else(invalid)?;
                let (container, key) = path.split_once('/').unwrap_or((path, ""));
                if container.is_empty() {
                    return Err(invalid());
                }
                Ok(Self {
                    provider,
                    account: Some(account.to_string()),
                    container: container.to_string(),
                    key: key.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_and_gcs() {
        let url: ObjectUrl = "s3://bucket/dir/file.csv".parse().unwrap();
        assert_eq!(url.provider, StorageProvider::S3);
        assert_eq!(url.container, "bucket");
        assert_eq!(url.key, "dir/file.csv");
        assert_eq!(url.to_string(), "s3://bucket/dir/file.csv");

        let url: ObjectUrl = "gcs://bucket/f.csv".parse().unwrap();
        assert_eq!(url.to_string(), "gs://bucket/f.csv");
    }

    #[test]
    fn test_parse_azure_forms() {
        let url: ObjectUrl = "azure://acc.blob.core.windows.net/cont/a/b.csv"
            .parse()
            .unwrap();
        assert_eq!(url.account.as_deref(), Some("acc"));
        assert_eq!(url.container, "cont");
        assert_eq!(url.key, "a/b.csv");
        assert_eq!(
            url.azure_https().as_deref(),
            Some("https://acc.blob.core.windows.net/cont/a/b.csv")
        );

        let https: ObjectUrl = "https://acc.blob.core.windows.net/cont/a/b.csv"
            .parse()
            .unwrap();
        assert_eq!(https, url);
    }

    #[test]
    fn test_rejects_unknown_urls() {
        assert!("ftp://host/file".parse::<ObjectUrl>().is_err());
        assert!("https://example.com/file".parse::<ObjectUrl>().is_err());
        assert!("s3:///key".parse::<ObjectUrl>().is_err());
        assert!("no-scheme".parse::<ObjectUrl>().is_err());
    }
}
