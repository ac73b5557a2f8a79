//! Annotation classification.
//!
//! One pass over the enumerated universe, before any inclusion decision,
//! produces three frozen name sets. Nothing downstream may extend or
//! conditionally rebuild them; they are immutable once constructed and
//! safely shareable read-only across concurrent target scans.

use log::debug;
use std::collections::BTreeSet;

use crate::config::MarkerConfig;
use crate::universe::Universe;

/// Annotation names that are never part of the public surface, regardless
/// of project configuration.
pub const ANNOTATION_BLACKLIST: [&str; 6] = [
    "kotlin.jvm.JvmField",
    "kotlin.jvm.JvmOverloads",
    "kotlin.jvm.JvmStatic",
    "kotlin.jvm.JvmDefault",
    "kotlin.Deprecated",
    "java.lang.Deprecated",
];

/// Marks an annotation type as propagating to subtypes.
pub const INHERITED_META_ANNOTATION: &str = "java.lang.annotation.Inherited";

/// The three derived annotation-name sets, frozen after construction.
#[derive(Debug, Clone, Default)]
pub struct AnnotationContext {
    internal: BTreeSet<String>,
    invisible: BTreeSet<String>,
    inherited: BTreeSet<String>,
}

impl AnnotationContext {
    pub fn build(universe: &Universe, markers: &MarkerConfig) -> Self {
        let mut internal: BTreeSet<String> = universe
            .annotation_types()
            .filter(|r| r.name.ends_with(&markers.internal_annotation_suffix))
            .map(|r| r.name.clone())
            .collect();
        if let Some(default_internal) = &markers.internal_annotation {
            internal.insert(default_internal.clone());
        }

        let mut invisible: BTreeSet<String> = ANNOTATION_BLACKLIST
            .iter()
            .map(|s| s.to_string())
            .collect();
        invisible.extend(
            universe
                .annotation_types()
                .filter(|r| {
                    r.direct_annotation_names()
                        .any(|name| internal.contains(name))
                })
                .map(|r| r.name.clone()),
        );
        invisible.extend(internal.iter().cloned());

        let inherited: BTreeSet<String> = universe
            .annotation_types()
            .filter(|r| {
                r.direct_annotation_names()
                    .any(|name| name == INHERITED_META_ANNOTATION)
            })
            .map(|r| r.name.clone())
            .collect();

        debug!("internal annotations:  {internal:?}");
        debug!("invisible annotations: {invisible:?}");
        debug!("inherited annotations: {inherited:?}");

        Self {
            internal,
            invisible,
            inherited,
        }
    }

    pub fn is_internal(&self, name: &str) -> bool {
        self.internal.contains(name)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        !self.invisible.contains(name)
    }

    pub fn is_inherited(&self, name: &str) -> bool {
        self.inherited.contains(name)
    }

    /// True when any of the given direct annotation names is internal.
    pub fn has_internal<'a>(&self, mut names: impl Iterator<Item = &'a str>) -> bool {
        names.any(|name| self.internal.contains(name))
    }
}
