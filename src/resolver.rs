//! Classpath and target resolution.
//!
//! Builds two nested type-resolution scopes per scan: a dependency scope from
//! the classpath alone, and a target scope layering the artifact under scan
//! on top. Archives are opened read-only through a memory map; class bytes
//! are read lazily from the ZIP central directory. Dropping a scope releases
//! every mapping on all exit paths.

use ignore::WalkBuilder;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use zip::ZipArchive;

use crate::error::ScanError;

/// One opened archive: path, mapped bytes, and its class entries.
pub struct ArchiveSource {
    path: PathBuf,
    archive: ZipArchive<Cursor<Mmap>>,
    classes: Vec<(String, String)>, // (dotted name, entry name)
}

impl ArchiveSource {
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let file =
            File::open(path).map_err(|e| ScanError::resolution(path, e))?;
        // SAFETY: the file is opened read-only and the map lives exactly as
        // long as this source; scans never write to scanned artifacts.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| ScanError::resolution(path, e))?;
        let archive = ZipArchive::new(Cursor::new(mmap))
            .map_err(|e| ScanError::resolution(path, e))?;

        let classes = archive
            .file_names()
            .filter(|name| is_class_entry(name))
            .map(|name| (entry_to_class_name(name), name.to_string()))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            classes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// (dotted class name, entry name) pairs, enumeration order unspecified.
    pub fn classes(&self) -> &[(String, String)] {
        &self.classes
    }

    pub fn read_class(&mut self, entry_name: &str) -> Result<Vec<u8>, ScanError> {
        let mut entry = self
            .archive
            .by_name(entry_name)
            .map_err(|e| ScanError::resolution(&self.path, e))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ScanError::resolution(&self.path, e))?;
        Ok(bytes)
    }
}

/// The dependency scope: every classpath archive, indexed by class name.
/// The first archive defining a name wins, mirroring classloader order.
pub struct ClasspathScope {
    sources: Vec<ArchiveSource>,
    index: HashMap<String, (usize, String)>,
}

impl ClasspathScope {
    pub fn open(entries: &[PathBuf]) -> Result<Self, ScanError> {
        let mut sources = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();
        for entry in entries {
            let source = ArchiveSource::open(entry)?;
            let source_idx = sources.len();
            for (class_name, entry_name) in source.classes() {
                index
                    .entry(class_name.clone())
                    .or_insert_with(|| (source_idx, entry_name.clone()));
            }
            sources.push(source);
        }
        Ok(Self { sources, index })
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.index.contains_key(class_name)
    }

    /// Reads the bytes for a class defined by the dependency scope.
    pub fn read_class(&mut self, class_name: &str) -> Option<Result<Vec<u8>, ScanError>> {
        let (source_idx, entry_name) = self.index.get(class_name)?.clone();
        Some(self.sources[source_idx].read_class(&entry_name))
    }
}

/// The target scope: the artifact under scan layered over its dependencies.
pub struct TargetScope {
    pub target: ArchiveSource,
    pub dependencies: ClasspathScope,
}

impl std::fmt::Debug for TargetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetScope")
            .field("target", &self.target.path())
            .finish()
    }
}

/// Opens both scopes for one scan target. Fails with a resolution error if
/// the target or any classpath entry cannot be opened.
pub fn resolve(target: &Path, classpath: &[PathBuf]) -> Result<TargetScope, ScanError> {
    let dependencies = ClasspathScope::open(classpath)?;
    let target = ArchiveSource::open(target)?;
    Ok(TargetScope {
        target,
        dependencies,
    })
}

/// Expands a directory into the archives beneath it, sorted for determinism.
/// Non-directory paths pass through unchanged.
pub fn expand_classpath(entries: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for entry in entries {
        if entry.is_dir() {
            let mut jars = collect_archives(entry);
            jars.sort();
            expanded.extend(jars);
        } else {
            expanded.push(entry.clone());
        }
    }
    expanded
}

fn collect_archives(base_path: &Path) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "jar") {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    rx.iter().collect()
}

fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class")
        && !name.starts_with("META-INF/")
        && !name.ends_with("module-info.class")
}

fn entry_to_class_name(entry: &str) -> String {
    entry.trim_end_matches(".class").replace(['/', '\\'], ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "api_scanner_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn open_lists_class_entries_only() -> anyhow::Result<()> {
        let jar = temp_path("resolver_entries.jar");
        write_jar(
            &jar,
            &[
                ("com/example/A.class", b"x".as_slice()),
                ("com/example/A$Inner.class", b"x".as_slice()),
                ("module-info.class", b"x".as_slice()),
                ("META-INF/versions/9/com/example/A.class", b"x".as_slice()),
                ("META-INF/MANIFEST.MF", b"x".as_slice()),
                ("com/example/resource.txt", b"x".as_slice()),
            ],
        )?;

        let source = ArchiveSource::open(&jar).unwrap();
        let mut names: Vec<&str> = source.classes().iter().map(|(n, _)| n.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["com.example.A", "com.example.A$Inner"]);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn classpath_first_entry_wins() -> anyhow::Result<()> {
        let jar_a = temp_path("resolver_first.jar");
        let jar_b = temp_path("resolver_second.jar");
        write_jar(&jar_a, &[("com/example/Dup.class", b"first".as_slice())])?;
        write_jar(&jar_b, &[("com/example/Dup.class", b"second".as_slice())])?;

        let mut scope = ClasspathScope::open(&[jar_a.clone(), jar_b.clone()]).unwrap();
        let bytes = scope.read_class("com.example.Dup").unwrap().unwrap();
        assert_eq!(bytes, b"first");

        std::fs::remove_file(jar_a)?;
        std::fs::remove_file(jar_b)?;
        Ok(())
    }

    #[test]
    fn missing_target_is_a_resolution_error() {
        let missing = temp_path("resolver_missing.jar");
        let err = resolve(&missing, &[]).unwrap_err();
        assert!(matches!(err, ScanError::Resolution { .. }));
    }

    #[test]
    fn expand_classpath_keeps_files_and_walks_directories() -> anyhow::Result<()> {
        let base = temp_path("resolver_expand");
        let lib_dir = base.join("libs");
        write_jar(&lib_dir.join("b.jar"), &[("B.class", b"x".as_slice())])?;
        write_jar(&lib_dir.join("a.jar"), &[("A.class", b"x".as_slice())])?;
        let lone = base.join("lone.jar");
        write_jar(&lone, &[("C.class", b"x".as_slice())])?;

        let expanded = expand_classpath(&[lone.clone(), lib_dir.clone()]);
        assert_eq!(expanded[0], lone);
        assert_eq!(
            expanded[1..]
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
                .collect::<Vec<_>>(),
            vec!["a.jar", "b.jar"]
        );

        std::fs::remove_dir_all(base)?;
        Ok(())
    }
}
