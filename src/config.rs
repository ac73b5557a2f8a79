//! Scan configuration supplied by the invoking collaborator.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::universe::ExcludeFilter;

/// Marker-annotation configuration for the classifier and filter pipeline.
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Suffix (including the package dot) naming internal-marker
    /// annotations, e.g. `.ApiInternal` matches `com.foo.node.ApiInternal`.
    pub internal_annotation_suffix: String,
    /// The project's canonical internal-marker annotation, always treated
    /// as internal even when absent from the scanned universe.
    pub internal_annotation: Option<String>,
    /// Do-not-extend/do-not-implement marker, pinned first when rendered.
    pub sealed_annotation: Option<String>,
    /// Package path segment marking internal packages, e.g. `.internal.`.
    pub internal_package_segment: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            internal_annotation_suffix: ".Internal".to_string(),
            internal_annotation: None,
            sealed_annotation: None,
            internal_package_segment: ".internal.".to_string(),
        }
    }
}

/// Explicit per-method exclusions, keyed by owning class name and
/// `name + descriptor` signature. Removes exactly one overload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MethodExcludes {
    map: HashMap<String, BTreeSet<String>>,
}

impl MethodExcludes {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read method exclusion file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse method exclusion file: {}", path.display()))
    }

    pub fn insert(&mut self, class_name: &str, signature: &str) {
        self.map
            .entry(class_name.to_string())
            .or_default()
            .insert(signature.to_string());
    }

    pub fn contains(&self, class_name: &str, signature: &str) -> bool {
        self.map
            .get(class_name)
            .is_some_and(|signatures| signatures.contains(signature))
    }
}

/// Everything one scan invocation needs besides the target list.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub classpath: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub excludes: ExcludeFilter,
    pub method_excludes: MethodExcludes,
    pub markers: MarkerConfig,
}
