//! Optional Kotlin language-metadata probe.
//!
//! Kotlin stamps every compiled class with a `kotlin.Metadata` annotation
//! whose `k` element encodes the class kind; kind 3 is reserved for
//! compiler-synthesized classes. The probe resolves that accessor once per
//! scan: it is available only when the annotation type itself is on the
//! scanned classpath and declares the kind element. When unavailable the
//! synthetic check is skipped entirely; this refinement is optional, not a
//! guarantee.

use crate::classfile::ElementValue;
use crate::error::ScanError;
use crate::universe::{ClassRecord, Universe};

pub const KOTLIN_METADATA: &str = "kotlin.Metadata";
const CLASS_KIND_ELEMENT: &str = "k";
pub const KIND_SYNTHETIC: i64 = 3;

#[derive(Debug, Clone, Copy)]
pub struct KotlinProbe {
    available: bool,
}

impl KotlinProbe {
    /// Resolves the accessor against the enumerated universe, once per scan.
    pub fn resolve(universe: &Universe) -> Self {
        let available = universe
            .get(KOTLIN_METADATA)
            .is_some_and(|record| record.methods.iter().any(|m| m.name == CLASS_KIND_ELEMENT));
        Self { available }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// True when the class's metadata reports the reserved synthetic kind.
    ///
    /// A metadata annotation whose kind element is present but not an
    /// integral constant breaks the metadata contract and is fatal for the
    /// scan, not a per-class skip.
    pub fn is_synthetic_class(&self, record: &ClassRecord) -> Result<bool, ScanError> {
        if !self.available {
            return Ok(false);
        }
        let Some(metadata) = record
            .annotations
            .iter()
            .find(|a| a.type_name == KOTLIN_METADATA)
        else {
            return Ok(false);
        };
        match metadata.element(CLASS_KIND_ELEMENT) {
            Some(ElementValue::Int(kind)) => Ok(*kind == KIND_SYNTHETIC),
            Some(ElementValue::Other) => Err(ScanError::ReflectiveAccess {
                class_name: record.name.clone(),
                detail: format!("{KOTLIN_METADATA} kind element is not an integral constant"),
            }),
            // Element omitted: the annotation default (kind 0) applies.
            None => Ok(false),
        }
    }
}
