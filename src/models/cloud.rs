//! Cloud object locations, credentials and CSV dialect options

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::manifest::ObjectUrl;
use crate::storage::StorageProvider;

/// Where an object or object prefix lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudLocation {
    pub provider: StorageProvider,
    /// Storage account, Azure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Bucket (S3, GCS) or container (Azure)
    pub container: String,
    /// Object key or key prefix, without a leading slash
    pub path: String,
}

impl CloudLocation {
    pub fn s3(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            provider: StorageProvider::S3,
            account: None,
            container: bucket.into(),
            path: path.into(),
        }
    }

    pub fn gcs(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            provider: StorageProvider::Gcs,
            account: None,
            container: bucket.into(),
            path: path.into(),
        }
    }

    pub fn azure(
        account: impl Into<String>,
        container: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            provider: StorageProvider::Azure,
            account: Some(account.into()),
            container: container.into(),
            path: path.into(),
        }
    }

    /// Same container, different key
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    /// Provider URL of this location, e.g. `s3://bucket/key`
    pub fn url(&self) -> String {
        self.object_url().to_string()
    }

    pub fn object_url(&self) -> ObjectUrl {
        ObjectUrl {
            provider: self.provider,
            account: self.account.clone(),
            container: self.container.clone(),
            key: self.path.clone(),
        }
    }
}

impl fmt::Display for CloudLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Credentials handed to the warehouse so it can read or write objects
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum CloudCredentials {
    S3 {
        access_key_id: String,
        secret_access_key: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },
    Azure {
        /// Shared access signature, with or without the leading `?`
        sas_token: String,
        /// Account key, required by loaders that cannot use a SAS
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account_key: Option<String>,
    },
    Gcs {
        /// Warehouse-side integration object granting bucket access (Snowflake)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage_integration: Option<String>,
    },
}

impl CloudCredentials {
    pub fn provider(&self) -> StorageProvider {
        match self {
            CloudCredentials::S3 { .. } => StorageProvider::S3,
            CloudCredentials::Azure { .. } => StorageProvider::Azure,
            CloudCredentials::Gcs { .. } => StorageProvider::Gcs,
        }
    }

    /// Secret values that must never appear in diagnostics
    pub fn secrets(&self) -> Vec<&str> {
        match self {
            CloudCredentials::S3 {
                access_key_id,
                secret_access_key,
                session_token,
                ..
            } => {
                let mut secrets = vec![access_key_id.as_str(), secret_access_key.as_str()];
                secrets.extend(session_token.as_deref());
                secrets
            }
            CloudCredentials::Azure {
                sas_token,
                account_key,
            } => {
                let mut secrets = vec![sas_token.as_str(), sas_token.trim_start_matches('?')];
                secrets.extend(account_key.as_deref());
                secrets
            }
            CloudCredentials::Gcs { .. } => Vec::new(),
        }
    }

    /// Check the credentials belong to the provider of `location`
    pub fn ensure_matches(&self, location: &CloudLocation) -> ImportExportResult<()> {
        if self.provider() != location.provider {
            return Err(ImportExportError::validation(format!(
                "{} credentials cannot access {} location {}",
                self.provider(),
                location.provider,
                location
            )));
        }
        if location.provider == StorageProvider::Azure && location.account.is_none() {
            return Err(ImportExportError::validation(format!(
                "Azure location {} has no storage account",
                location.container
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudCredentials::S3 { region, .. } => f
                .debug_struct("S3")
                .field("region", region)
                .finish_non_exhaustive(),
            CloudCredentials::Azure { .. } => f.debug_struct("Azure").finish_non_exhaustive(),
            CloudCredentials::Gcs {
                storage_integration,
            } => f
                .debug_struct("Gcs")
                .field("storage_integration", storage_integration)
                .finish(),
        }
    }
}

/// CSV dialect of source or exported files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    delimiter: String,
    enclosure: Option<String>,
    escape: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            enclosure: Some("\"".to_string()),
            escape: None,
        }
    }
}

impl CsvOptions {
    /// Create CSV options; empty enclosure or escape strings mean "none"
    ///
    /// The delimiter must be exactly one character, the enclosure and escape
    /// at most one.
    pub fn new(delimiter: &str, enclosure: &str, escape: &str) -> ImportExportResult<Self> {
        if delimiter.chars().count() != 1 {
            return Err(invalid_param("delimiter", delimiter));
        }
        if enclosure.chars().count() > 1 {
            return Err(invalid_param("enclosure", enclosure));
        }
        if escape.chars().count() > 1 {
            return Err(invalid_param("escape", escape));
        }
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        Ok(Self {
            delimiter: delimiter.to_string(),
            enclosure: non_empty(enclosure),
            escape: non_empty(escape),
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn enclosure(&self) -> Option<&str> {
        self.enclosure.as_deref()
    }

    pub fn escape(&self) -> Option<&str> {
        self.escape.as_deref()
    }
}

fn invalid_param(name: &str, value: &str) -> ImportExportError {
    ImportExportError::new(
        ErrorKind::InvalidFileParams,
        format!("CSV {} must be a single character, got {:?}", name, value),
    )
    .with_context("parameter", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_urls() {
        assert_eq!(CloudLocation::s3("bucket", "key").url(), "s3://bucket/key");
        assert_eq!(CloudLocation::gcs("bucket", "a/b.csv").url(), "gs://bucket/a/b.csv");
        assert_eq!(
            CloudLocation::azure("acc", "cont", "f.csv").url(),
            "azure://acc.blob.core.windows.net/cont/f.csv"
        );
    }

    #[test]
    fn test_csv_options() {
        let options = CsvOptions::new(";", "", "\\").unwrap();
        assert_eq!(options.delimiter(), ";");
        assert_eq!(options.enclosure(), None);
        assert_eq!(options.escape(), Some("\\"));

        let err = CsvOptions::new(",,", "\"", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFileParams);
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = CloudCredentials::S3 {
            access_key_id: "AKIA".into(),
            secret_access_key: "secret".into(),
            region: "eu-central-1".into(),
            session_token: None,
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("AKIA"));
        assert_eq!(credentials.secrets(), vec!["AKIA", "secret"]);
    }

    #[test]
    fn test_credentials_must_match_location() {
        let credentials = CloudCredentials::Gcs {
            storage_integration: None,
        };
        assert!(credentials.ensure_matches(&CloudLocation::gcs("b", "k")).is_ok());
        let err = credentials
            .ensure_matches(&CloudLocation::s3("b", "k"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
