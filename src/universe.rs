//! Class universe enumeration.
//!
//! Every class defined in the scan target enters the universe. Referenced
//! names (superclass, interfaces, direct annotation types on the class and
//! its members) are then resolved transitively against the dependency scope
//! and tagged external. Names neither scope defines (platform types) are
//! silently absent. Exclusion patterns apply here, before classification,
//! so excluded classes never influence the annotation sets.

use log::debug;
use std::collections::BTreeMap;

use crate::classfile::{
    self, AnnotationRef, ConstantValue, RawClass, RawMember, ACC_ANNOTATION, ACC_ENUM,
    ACC_INTERFACE, ACC_SYNTHETIC,
};
use crate::error::ScanError;
use crate::resolver::TargetScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Annotation,
    Enum,
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: u16,
    pub annotations: Vec<AnnotationRef>,
    pub methods: Vec<MemberRecord>,
    pub fields: Vec<MemberRecord>,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub is_external: bool,
    pub is_synthetic: bool,
    pub enclosing_method: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub modifiers: u16,
    pub annotations: Vec<AnnotationRef>,
    pub constant_value: Option<ConstantValue>,
}

impl MemberRecord {
    /// Exclusion-list key: method name immediately followed by its raw
    /// type descriptor.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

impl ClassRecord {
    fn from_raw(raw: RawClass, is_external: bool) -> Self {
        let kind = if raw.access_flags & ACC_ANNOTATION != 0 {
            ClassKind::Annotation
        } else if raw.access_flags & ACC_INTERFACE != 0 {
            ClassKind::Interface
        } else if raw.access_flags & ACC_ENUM != 0 {
            ClassKind::Enum
        } else {
            ClassKind::Class
        };

        let owner = raw.name.clone();
        let member = |m: RawMember| MemberRecord {
            owner: owner.clone(),
            name: m.name,
            descriptor: m.descriptor,
            modifiers: m.access_flags,
            annotations: m.annotations,
            constant_value: m.constant_value,
        };

        Self {
            kind,
            modifiers: raw.access_flags,
            is_synthetic: raw.access_flags & ACC_SYNTHETIC != 0,
            methods: raw.methods.into_iter().map(member).collect(),
            fields: raw.fields.into_iter().map(member).collect(),
            annotations: raw.annotations,
            super_name: raw.super_name,
            interfaces: raw.interfaces,
            enclosing_method: raw.enclosing_method,
            is_external,
            name: raw.name,
        }
    }

    pub fn direct_annotation_names(&self) -> impl Iterator<Item = &str> {
        self.annotations.iter().map(|a| a.type_name.as_str())
    }
}

/// All enumerated classes for one scan target, keyed by fully qualified name.
#[derive(Debug, Default)]
pub struct Universe {
    classes: BTreeMap<String, ClassRecord>,
}

impl Universe {
    pub fn from_records(records: impl IntoIterator<Item = ClassRecord>) -> Self {
        Self {
            classes: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All records, ordered by fully qualified name.
    pub fn classes(&self) -> impl Iterator<Item = &ClassRecord> {
        self.classes.values()
    }

    pub fn annotation_types(&self) -> impl Iterator<Item = &ClassRecord> {
        self.classes()
            .filter(|r| r.kind == ClassKind::Annotation)
    }

    /// Walks the superclass chain looking for `base`. The chain may leave
    /// the universe (platform types); the name is still compared at each
    /// step, so `java.lang.Enum` is found even though it is never loaded.
    pub fn extends_superclass(&self, record: &ClassRecord, base: &str) -> bool {
        let mut current = record.super_name.as_deref();
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self
                .get(name)
                .and_then(|record| record.super_name.as_deref());
        }
        false
    }
}

/// Package/class exclusion patterns, applied at enumeration time.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    packages: Vec<String>,
    classes: Vec<String>,
}

impl ExcludeFilter {
    pub fn new(packages: Vec<String>, classes: Vec<String>) -> Self {
        let packages = packages
            .into_iter()
            .map(|p| {
                let p = p.trim_end_matches('*');
                p.trim_end_matches('.').to_string()
            })
            .collect();
        Self { packages, classes }
    }

    pub fn matches(&self, class_name: &str) -> bool {
        let package = class_name.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        for pattern in &self.packages {
            if package == pattern || package.starts_with(&format!("{pattern}.")) {
                return true;
            }
        }
        for pattern in &self.classes {
            match pattern.strip_suffix('*') {
                Some(prefix) => {
                    if class_name.starts_with(prefix) {
                        return true;
                    }
                }
                None => {
                    if class_name == pattern {
                        return true;
                    }
                }
            }
        }
        false
    }
}

pub fn enumerate(
    scope: &mut TargetScope,
    excludes: &ExcludeFilter,
) -> Result<Universe, ScanError> {
    let mut universe = Universe::default();
    let mut worklist: Vec<String> = Vec::new();

    let target_classes: Vec<(String, String)> = scope.target.classes().to_vec();
    for (class_name, entry_name) in target_classes {
        if excludes.matches(&class_name) {
            continue;
        }
        let bytes = scope.target.read_class(&entry_name)?;
        let raw = classfile::parse_class(&bytes)
            .map_err(|e| ScanError::resolution(scope.target.path(), e))?;
        let record = ClassRecord::from_raw(raw, false);
        collect_references(&record, &mut worklist);
        universe.classes.insert(record.name.clone(), record);
    }

    while let Some(name) = worklist.pop() {
        if universe.classes.contains_key(&name) || excludes.matches(&name) {
            continue;
        }
        let Some(read) = scope.dependencies.read_class(&name) else {
            continue; // platform type, outside both scopes
        };
        let bytes = read?;
        let raw = classfile::parse_class(&bytes)
            .map_err(|e| ScanError::resolution(scope.target.path(), e))?;
        let record = ClassRecord::from_raw(raw, true);
        collect_references(&record, &mut worklist);
        universe.classes.insert(record.name.clone(), record);
    }

    debug!(
        "enumerated {} classes from {}",
        universe.len(),
        scope.target.path().display()
    );
    Ok(universe)
}

fn collect_references(record: &ClassRecord, worklist: &mut Vec<String>) {
    if let Some(super_name) = &record.super_name {
        worklist.push(super_name.clone());
    }
    worklist.extend(record.interfaces.iter().cloned());
    worklist.extend(record.annotations.iter().map(|a| a.type_name.clone()));
    for member in record.methods.iter().chain(record.fields.iter()) {
        worklist.extend(member.annotations.iter().map(|a| a.type_name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, super_name: Option<&str>) -> ClassRecord {
        ClassRecord {
            name: name.to_string(),
            kind: ClassKind::Class,
            modifiers: 0x0001,
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            super_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
            is_external: false,
            is_synthetic: false,
            enclosing_method: None,
        }
    }

    #[test]
    fn exclude_filter_matches_packages_and_subpackages() {
        let filter = ExcludeFilter::new(vec!["com.example.internal".to_string()], Vec::new());
        assert!(filter.matches("com.example.internal.Secret"));
        assert!(filter.matches("com.example.internal.deep.Secret"));
        assert!(!filter.matches("com.example.internals.Public"));
        assert!(!filter.matches("com.example.Api"));
    }

    #[test]
    fn exclude_filter_accepts_glob_suffix_on_packages() {
        let filter = ExcludeFilter::new(vec!["com.example.gen.*".to_string()], Vec::new());
        assert!(filter.matches("com.example.gen.Stub"));
        assert!(filter.matches("com.example.gen.v2.Stub"));
    }

    #[test]
    fn exclude_filter_matches_classes_exactly_or_by_prefix() {
        let filter = ExcludeFilter::new(
            Vec::new(),
            vec!["com.example.Hidden".to_string(), "com.example.Gen*".to_string()],
        );
        assert!(filter.matches("com.example.Hidden"));
        assert!(!filter.matches("com.example.Hidden2"));
        assert!(filter.matches("com.example.GenStub"));
        assert!(!filter.matches("com.example.Api"));
    }

    #[test]
    fn extends_superclass_walks_the_chain() {
        let universe = Universe::from_records([
            record("com.example.Color", Some("java.lang.Enum")),
            record("com.example.Base", Some("java.lang.Object")),
            record("com.example.Mid", Some("com.example.Base")),
            record("com.example.Leaf", Some("com.example.Mid")),
        ]);

        let color = universe.get("com.example.Color").unwrap();
        assert!(universe.extends_superclass(color, "java.lang.Enum"));

        let leaf = universe.get("com.example.Leaf").unwrap();
        assert!(universe.extends_superclass(leaf, "com.example.Base"));
        assert!(universe.extends_superclass(leaf, "java.lang.Object"));
        assert!(!universe.extends_superclass(leaf, "java.lang.Enum"));
    }

    #[test]
    fn classes_iterate_in_name_order() {
        let universe = Universe::from_records([
            record("com.example.Zed", None),
            record("com.example.Alpha", None),
        ]);
        let names: Vec<&str> = universe.classes().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["com.example.Alpha", "com.example.Zed"]);
    }
}
