//! Module to distribution mapping
//!
//! Resolution order: installed metadata (`*.dist-info` directories under the
//! configured site-packages), then a table of well-known mismatches, then
//! the module name itself. Every result is PEP 503 normalized.

use crate::domain::normalize_name;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Import names whose distribution is named differently
const KNOWN_DISTRIBUTIONS: &[(&str, &str)] = &[
    ("bs4", "beautifulsoup4"),
    ("cv2", "opencv-python"),
    ("PIL", "pillow"),
    ("sklearn", "scikit-learn"),
    ("skimage", "scikit-image"),
    ("yaml", "pyyaml"),
    ("dotenv", "python-dotenv"),
    ("dateutil", "python-dateutil"),
    ("Crypto", "pycryptodome"),
    ("OpenSSL", "pyopenssl"),
    ("importlib_metadata", "importlib-metadata"),
    ("pkg_resources", "setuptools"),
    ("attr", "attrs"),
    ("jwt", "pyjwt"),
    ("magic", "python-magic"),
    ("serial", "pyserial"),
    ("google", "protobuf"),
    ("git", "gitpython"),
    ("docx", "python-docx"),
    ("fitz", "pymupdf"),
];

/// Maps top-level modules to the distributions that provide them
#[derive(Debug, Clone, Default)]
pub struct DistributionIndex {
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl DistributionIndex {
    /// Create an empty index (only the built-in table and identity apply)
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every `*.dist-info` directory under the given site-packages directories
    pub fn load(site_packages: &[PathBuf]) -> Self {
        let mut index = Self::new();
        for dir in site_packages {
            let Ok(entries) = fs::read_dir(dir) else {
                warn!(path = %dir.display(), "site-packages directory not readable");
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_dist_info = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".dist-info"));
                if is_dist_info && path.is_dir() {
                    index.read_dist_info(&path);
                }
            }
        }
        debug!(modules = index.modules.len(), "loaded distribution index");
        index
    }

    /// Records that `distribution` provides `module` (builder pattern)
    pub fn with_module(mut self, module: &str, distribution: &str) -> Self {
        self.insert(module, distribution);
        self
    }

    fn insert(&mut self, module: &str, distribution: &str) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(normalize_name(distribution));
    }

    fn read_dist_info(&mut self, path: &Path) {
        let Some(distribution) = distribution_name(path) else {
            return;
        };
        let modules = match fs::read_to_string(path.join("top_level.txt")) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => fs::read_to_string(path.join("RECORD"))
                .map(|text| modules_from_record(&text))
                .unwrap_or_default(),
        };
        for module in modules {
            self.insert(&module, &distribution);
        }
    }

    /// Returns every candidate distribution for a top-level module
    pub fn candidates(&self, module: &str) -> Vec<String> {
        if let Some(dists) = self.modules.get(module) {
            return dists.iter().cloned().collect();
        }
        if let Some((_, dist)) = KNOWN_DISTRIBUTIONS.iter().find(|(m, _)| *m == module) {
            return vec![normalize_name(dist)];
        }
        vec![normalize_name(module)]
    }

    /// Returns the distribution a module most likely comes from
    pub fn resolve_distribution(&self, module: &str) -> String {
        self.candidates(module)
            .into_iter()
            .next()
            .unwrap_or_else(|| normalize_name(module))
    }
}

/// Reads the distribution name from METADATA, falling back to the directory name
fn distribution_name(dist_info: &Path) -> Option<String> {
    if let Ok(metadata) = fs::read_to_string(dist_info.join("METADATA")) {
        let name = metadata
            .lines()
            .take_while(|l| !l.is_empty())
            .find_map(|l| l.strip_prefix("Name:"))
            .map(|n| n.trim().to_string());
        if name.is_some() {
            return name;
        }
    }
    let stem = dist_info.file_name()?.to_str()?.strip_suffix(".dist-info")?;
    stem.split('-').next().map(str::to_string)
}

/// Derives top-level modules from RECORD paths
fn modules_from_record(record: &str) -> BTreeSet<String> {
    record
        .lines()
        .filter_map(|line| line.split(',').next())
        .filter_map(|path| {
            let first = path.split('/').next()?;
            let nested = path.contains('/');
            if first.is_empty()
                || first.starts_with('.')
                || first.starts_with("__")
                || first.ends_with(".dist-info")
                || first.ends_with(".data")
            {
                return None;
            }
            if nested {
                return Some(first.to_string());
            }
            // single-file module or extension: foo.py, foo.cpython-312-x86_64-linux-gnu.so
            let (name, ext) = first.split_once('.')?;
            let is_module = ext == "py" || ext.ends_with("so") || ext.ends_with("pyd");
            is_module.then(|| name.to_string())
        })
        .collect()
}
