//! The visibility filter pipeline.
//!
//! Per-entity inclusion predicates over the enumerated universe, consuming
//! the frozen annotation context. Decisions are independent per entity and
//! never feed back into the derived context. All exclusions here are silent
//! by design; only the metadata probe can fail.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::classfile::{
    ACC_ABSTRACT, ACC_FINAL, ACC_NATIVE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC,
    ACC_STRICT, ACC_SYNCHRONIZED, ACC_SYNTHETIC, ACC_TRANSIENT, ACC_VOLATILE,
};
use crate::classifier::AnnotationContext;
use crate::config::{MarkerConfig, MethodExcludes};
use crate::error::ScanError;
use crate::kotlin::KotlinProbe;
use crate::universe::{ClassKind, ClassRecord, MemberRecord, Universe};

pub const VISIBILITY_MASK: u16 = ACC_PUBLIC | ACC_PROTECTED;

/// `java.lang.reflect.Modifier.classModifiers()`.
pub const CLASS_MASK: u16 =
    ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED | ACC_ABSTRACT | ACC_STATIC | ACC_FINAL | ACC_STRICT;

/// Interface modifiers minus ABSTRACT, which every interface carries.
pub const INTERFACE_MASK: u16 =
    ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED | ACC_STATIC | ACC_STRICT;

/// Method modifiers plus the VARARGS bit (which shares its value with
/// TRANSIENT) and the SYNTHETIC bit. BRIDGE (0x0040) is deliberately absent:
/// a bridge method never belongs to the public surface.
pub const METHOD_MASK: u16 = ACC_PUBLIC
    | ACC_PRIVATE
    | ACC_PROTECTED
    | ACC_ABSTRACT
    | ACC_STATIC
    | ACC_FINAL
    | ACC_SYNCHRONIZED
    | ACC_NATIVE
    | ACC_STRICT
    | ACC_TRANSIENT
    | ACC_SYNTHETIC;

/// `java.lang.reflect.Modifier.fieldModifiers()`. Rejects synthetic fields
/// and enum constants (0x4000).
pub const FIELD_MASK: u16 = ACC_PUBLIC
    | ACC_PRIVATE
    | ACC_PROTECTED
    | ACC_STATIC
    | ACC_FINAL
    | ACC_TRANSIENT
    | ACC_VOLATILE;

const ENUM_BASE_CLASS: &str = "java.lang.Enum";

/// Compiler-synthesized internal-scope members carry this marker in their
/// names (lambda bodies, access bridges, default-parameter stubs).
const INTERNAL_SCOPE_MARKER: char = '$';

pub fn is_visible(modifiers: u16) -> bool {
    modifiers & VISIBILITY_MASK != 0
}

/// True when the modifier bits stay within the mask valid for the member
/// kind; anything outside it is compiler-injected.
pub fn is_valid(modifiers: u16, mask: u16) -> bool {
    modifiers & mask == modifiers
}

/// The visible/hidden partition of an entity's annotation names. Hidden
/// names are carried for diagnostics but never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationNames {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
}

pub struct FilterPipeline<'a> {
    universe: &'a Universe,
    context: &'a AnnotationContext,
    probe: &'a KotlinProbe,
    markers: &'a MarkerConfig,
    method_excludes: &'a MethodExcludes,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(
        universe: &'a Universe,
        context: &'a AnnotationContext,
        probe: &'a KotlinProbe,
        markers: &'a MarkerConfig,
        method_excludes: &'a MethodExcludes,
    ) -> Self {
        Self {
            universe,
            context,
            probe,
            markers,
            method_excludes,
        }
    }

    /// The ordered class predicate chain. The first failing predicate
    /// excludes; later predicates are not evaluated.
    pub fn include_class(&self, record: &ClassRecord) -> Result<bool, ScanError> {
        if record.name.contains(&self.markers.internal_package_segment) {
            return Ok(false);
        }
        if record.is_external {
            return Ok(false);
        }
        if record.kind == ClassKind::Annotation && !self.context.is_visible(&record.name) {
            return Ok(false);
        }
        if self.context.has_internal(record.direct_annotation_names()) {
            return Ok(false);
        }
        if !is_visible(record.modifiers) {
            return Ok(false);
        }
        if record.is_synthetic || record.enclosing_method.is_some() {
            return Ok(false);
        }
        if self.probe.is_synthetic_class(record)? {
            return Ok(false);
        }
        Ok(true)
    }

    /// The visible annotation list for an included class: direct
    /// annotations plus the inherited view gathered from ancestors,
    /// partitioned against the invisible set. Annotation-kind classes
    /// render an empty list.
    pub fn class_annotations(&self, record: &ClassRecord) -> AnnotationNames {
        if record.kind == ClassKind::Annotation {
            return AnnotationNames::default();
        }

        let mut gathered: BTreeSet<String> = record
            .direct_annotation_names()
            .map(str::to_string)
            .collect();

        match record.kind {
            ClassKind::Interface => {
                self.gather_inherited(record.interfaces.iter(), &mut gathered);
            }
            _ => {
                let mut interface_seeds: Vec<&String> = record.interfaces.iter().collect();
                let mut current = record.super_name.as_deref();
                while let Some(super_name) = current {
                    let Some(ancestor) = self.universe.get(super_name) else {
                        break;
                    };
                    for name in ancestor.direct_annotation_names() {
                        if self.context.is_inherited(name) {
                            gathered.insert(name.to_string());
                        }
                    }
                    interface_seeds.extend(ancestor.interfaces.iter());
                    current = ancestor.super_name.as_deref();
                }
                self.gather_inherited(interface_seeds.into_iter(), &mut gathered);
            }
        }

        gathered.retain(|name| is_application_annotation(name));

        let (visible, hidden): (Vec<String>, Vec<String>) = gathered
            .into_iter()
            .partition(|name| self.context.is_visible(name));

        let mut visible = visible;
        if let Some(pinned) = &self.markers.sealed_annotation {
            visible.sort_by(|a, b| pinned_first(pinned, a, b));
        } else {
            visible.sort();
        }

        AnnotationNames { visible, hidden }
    }

    /// Walks the transitive superinterface closure, collecting annotations
    /// whose declarations propagate to subtypes.
    fn gather_inherited<'n>(
        &self,
        seeds: impl Iterator<Item = &'n String>,
        gathered: &mut BTreeSet<String>,
    ) {
        let mut queue: Vec<&str> = seeds.map(String::as_str).collect();
        let mut seen: BTreeSet<&str> = queue.iter().copied().collect();
        while let Some(name) = queue.pop() {
            let Some(interface) = self.universe.get(name) else {
                continue;
            };
            for annotation in interface.direct_annotation_names() {
                if self.context.is_inherited(annotation) {
                    gathered.insert(annotation.to_string());
                }
            }
            for extended in &interface.interfaces {
                if seen.insert(extended.as_str()) {
                    queue.push(extended.as_str());
                }
            }
        }
    }

    pub fn include_method(&self, owner: &ClassRecord, method: &MemberRecord) -> bool {
        is_visible(method.modifiers)
            && is_valid(method.modifiers, METHOD_MASK)
            && !self
                .method_excludes
                .contains(&owner.name, &method.signature())
            && !self
                .context
                .has_internal(method.annotations.iter().map(|a| a.type_name.as_str()))
            && !self.is_enum_constructor(owner, method)
            && !method.name.contains(INTERNAL_SCOPE_MARKER)
    }

    pub fn include_field(&self, field: &MemberRecord) -> bool {
        is_visible(field.modifiers)
            && is_valid(field.modifiers, FIELD_MASK)
            && !self
                .context
                .has_internal(field.annotations.iter().map(|a| a.type_name.as_str()))
    }

    /// Members render their directly declared annotations only, in
    /// declaration order; there is no inheritance walk for members.
    pub fn member_annotations(&self, member: &MemberRecord) -> AnnotationNames {
        let (visible, hidden) = member
            .annotations
            .iter()
            .map(|a| a.type_name.clone())
            .partition(|name| self.context.is_visible(name));
        AnnotationNames { visible, hidden }
    }

    // Enum constructors are excluded unconditionally: enum types are
    // implicitly non-extensible, and some compiler versions declare the
    // constructor as protected.
    fn is_enum_constructor(&self, owner: &ClassRecord, method: &MemberRecord) -> bool {
        method.name == "<init>" && self.universe.extends_superclass(owner, ENUM_BASE_CLASS)
    }
}

/// Stable pinned-first comparator: the pinned name sorts before everything,
/// the rest lexicographically.
fn pinned_first(pinned: &str, a: &str, b: &str) -> Ordering {
    if a == pinned {
        Ordering::Less
    } else if b == pinned {
        Ordering::Greater
    } else {
        a.cmp(b)
    }
}

/// Platform annotations never appear in class annotation lists.
fn is_application_annotation(name: &str) -> bool {
    !name.starts_with("java.") && !name.starts_with("kotlin.")
}
