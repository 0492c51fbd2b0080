//! Generic config file loading, with the backend chosen by file
//! extension.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy)]
pub enum ConfigBackend {
    Json5,
    Yaml,
    Hcl,
}

/// json5's error `Display` does not include the location it carries;
/// re-attach it.
fn json5_from_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    json5::from_str(s).map_err(|e| match &e {
        json5::Error::Message { msg, location } => match location {
            Some(json5::Location { line, column }) => {
                anyhow!("{msg} at line:column {line}:{column}")
            }
            None => anyhow!("{msg}"),
        },
    })
}

impl ConfigBackend {
    pub fn load_config_file<T: DeserializeOwned>(self, path: &Path) -> Result<T> {
        let s = std::fs::read_to_string(path)
            .with_context(|| anyhow!("loading config file from {path:?}"))?;
        match self {
            ConfigBackend::Json5 => json5_from_str(&s)
                .with_context(|| anyhow!("decoding JSON5 from config file {path:?}")),
            ConfigBackend::Yaml => serde_yml::from_str(&s)
                .with_context(|| anyhow!("decoding YAML from config file {path:?}")),
            ConfigBackend::Hcl => {
                hcl::from_str(&s).with_context(|| anyhow!("decoding HCL from config file {path:?}"))
            }
        }
    }
}

pub const FILE_EXTENSIONS: &[(&str, ConfigBackend)] = &[
    ("json5", ConfigBackend::Json5),
    ("json", ConfigBackend::Json5),
    ("yml", ConfigBackend::Yaml),
    ("yaml", ConfigBackend::Yaml),
    ("hcl", ConfigBackend::Hcl),
];

pub fn backend_from_path(path: &Path) -> Result<ConfigBackend> {
    if let Some(ext) = path.extension() {
        if let Some(ext) = ext.to_str() {
            if let Some((_, backend)) = FILE_EXTENSIONS.iter().find(|(e, _b)| *e == ext) {
                Ok(*backend)
            } else {
                bail!("given file path does have an unknown extension {ext:?}: {path:?}")
            }
        } else {
            bail!("given file path does have an extension that is not unicode: {path:?}")
        }
    } else {
        bail!(
            "given file path does not have an extension \
                     for determining the file type: {path:?}"
        )
    }
}

pub trait LoadConfigFile: DeserializeOwned {
    fn load_config(path: &Path) -> Result<Self> {
        backend_from_path(path)?.load_config_file(path)
    }
}
