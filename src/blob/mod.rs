//! Object-storage access for sharing processed outputs.
//!
//! Blobs live in Azure-style containers, one account per environment
//! ("prod"/"dev"), authenticated with per-environment shared-access
//! signatures. Everything goes through the [`BlobStore`] trait so payload
//! helpers can be exercised against an in-memory store.

mod payload;

pub use payload::{
    download_admin_layer, download_csv, download_parquet, upload_admin_layer, upload_csv,
    upload_parquet,
};

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use reqwest::blocking::Client;

use crate::config::Config;
use crate::constants::PROJECT_PREFIX;

/// Which storage account to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobEnv {
    Prod,
    Dev,
}

impl BlobEnv {
    fn as_str(self) -> &'static str {
        match self {
            BlobEnv::Prod => "prod",
            BlobEnv::Dev => "dev",
        }
    }
}

/// Get/put/list access to a blob container.
pub trait BlobStore {
    fn get(&self, name: &str) -> Result<Vec<u8>>;
    fn put(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<()>;
    /// Blob names, optionally restricted to a prefix.
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;
}

/// Prefix a project-relative blob name with the project namespace.
pub fn project_blob_name(rel: &str) -> String {
    format!("{PROJECT_PREFIX}/{rel}")
}

/// One container in one environment, accessed over HTTPS with a SAS token.
pub struct AzureContainer {
    base_url: String,
    sas: String,
    client: Client,
}

impl AzureContainer {
    /// Connect to `container` in the given environment.
    ///
    /// Requires the matching SAS token to be present in the config.
    pub fn new(cfg: &Config, env: BlobEnv, container: &str) -> Result<Self> {
        let sas = match env {
            BlobEnv::Prod => cfg.prod_blob_sas.as_ref(),
            BlobEnv::Dev => cfg.dev_blob_sas.as_ref(),
        }
        .with_context(|| format!("[blob] no SAS token configured for the {} account", env.as_str()))?
        .clone();

        Ok(Self {
            base_url: format!(
                "https://imb0chd0{}.blob.core.windows.net/{container}",
                env.as_str()
            ),
            sas,
            client: Client::builder()
                .build()
                .context("[blob] failed to build HTTP client")?,
        })
    }

    fn blob_url(&self, name: &str) -> String {
        format!("{}/{}?{}", self.base_url, name, self.sas)
    }
}

impl BlobStore for AzureContainer {
    fn get(&self, name: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.blob_url(name))
            .send()
            .with_context(|| format!("[blob] GET {name}"))?
            .error_for_status()
            .with_context(|| format!("[blob] GET {name} returned error status"))?;
        Ok(resp.bytes().with_context(|| format!("[blob] reading body of {name}"))?.to_vec())
    }

    fn put(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put(self.blob_url(name))
            .header("x-ms-blob-type", "BlockBlob")
            .header("content-type", content_type)
            .body(bytes.to_vec())
            .send()
            .with_context(|| format!("[blob] PUT {name}"))?
            .error_for_status()
            .with_context(|| format!("[blob] PUT {name} returned error status"))?;
        Ok(())
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut url = format!("{}?restype=container&comp=list&{}", self.base_url, self.sas);
        if let Some(prefix) = prefix {
            url.push_str(&format!("&prefix={prefix}"));
        }
        let body = self
            .client
            .get(url)
            .send()
            .context("[blob] list request failed")?
            .error_for_status()
            .context("[blob] list returned error status")?
            .text()
            .context("[blob] reading list response")?;
        Ok(parse_blob_names(&body))
    }
}

/// Pull blob names out of the XML list response.
fn parse_blob_names(xml: &str) -> Vec<String> {
    let re = Regex::new(r"<Name>([^<]+)</Name>").expect("static regex");
    re.captures_iter(xml).map(|caps| caps[1].to_string()).collect()
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl BlobStore for MemStore {
    fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .expect("memstore poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("missing blob: {name}"))
    }

    fn put(&self, name: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        self.files
            .lock()
            .expect("memstore poisoned")
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let files = self.files.lock().expect("memstore poisoned");
        let mut names: Vec<String> = files
            .keys()
            .filter(|name| prefix.is_none_or(|p| name.starts_with(p)))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}
