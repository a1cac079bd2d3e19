//! Generic config file loader, the file format chosen by file name
//! extension.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;

use crate::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBackend {
    Json5,
    Yaml,
    Hcl,
}

impl ConfigBackend {
    pub fn parse_str<T: DeserializeOwned>(self, s: &str) -> Result<T> {
        match self {
            ConfigBackend::Json5 => serde_json5::from_str(s).map_err(|e| anyhow!("{e}")),
            ConfigBackend::Yaml => serde_yml::from_str(s).map_err(|e| anyhow!("{e}")),
            ConfigBackend::Hcl => hcl::from_str(s).map_err(|e| anyhow!("{e}")),
        }
    }

    pub fn load_config_file<T: DeserializeOwned>(self, path: &Path) -> Result<T> {
        let s = std::fs::read_to_string(path)
            .with_context(|| anyhow!("loading config file from {path:?}"))?;
        self.parse_str(&s)
            .with_context(|| anyhow!("decoding {self:?} from config file {path:?}"))
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

fn add_extension(path: &Path, extension: &str) -> Option<PathBuf> {
    let mut file_name = path.file_name()?.to_owned();
    file_name.push(".");
    file_name.push(extension);
    Some(path.with_file_name(file_name))
}

pub trait LoadConfigFile: Default + DeserializeOwned {
    /// The extensions from `FILE_EXTENSIONS` are appended to find the
    /// actual file.
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>>;

    /// If `path` is given, the file must exist or an error is
    /// returned. Otherwise, the default location is checked and the
    /// file loaded if there is exactly one candidate; if there are
    /// none, a `Default` instance is returned.
    fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        if let Some(path) = path {
            let path = path.as_ref();
            let backend = backend_from_path(path)?;
            return backend.load_config_file(path);
        }
        let Some(base) = Self::default_config_path_without_suffix()? else {
            return Ok(Self::default());
        };
        let mut found = Vec::new();
        for (extension, backend) in FILE_EXTENSIONS {
            let path = add_extension(&base, extension)
                .ok_or_else(|| anyhow!("path is missing a file name: {base:?}"))?;
            if path.exists() {
                found.push((path, *backend));
            }
        }
        match found.as_slice() {
            [] => {
                info!("no config file at {base:?}.*, using the defaults");
                Ok(Self::default())
            }
            [(path, backend)] => {
                info!("loading config file {path:?}");
                backend.load_config_file(path)
            }
            _ => {
                let paths: Vec<&PathBuf> = found.iter().map(|(path, _)| path).collect();
                bail!("multiple config file paths found, leading to ambiguity: {paths:?}")
            }
        }
    }
}
