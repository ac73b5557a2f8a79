//! Canonical rendering and output writing.
//!
//! One line-oriented block per included class, terminated by `##`. The
//! comparators here are the only source of ordering in the output;
//! enumeration order never leaks through. Writes are all-or-nothing: the
//! file is assembled in full, written to a sibling temp path, and renamed
//! into place.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::classfile::{ConstantValue, ACC_INTERFACE};
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
use crate::error::ScanError;
use crate::filter::{AnnotationNames, CLASS_MASK, FIELD_MASK, INTERFACE_MASK, METHOD_MASK};
use crate::universe::{ClassKind, ClassRecord, MemberRecord};

pub const BLOCK_TERMINATOR: &str = "##";

/// Keywords in the canonical order of `java.lang.reflect.Modifier.toString`.
const MODIFIER_KEYWORDS: [(u16, &str); 11] = [
    (0x0001, "public"),
    (0x0004, "protected"),
    (0x0002, "private"),
    (0x0400, "abstract"),
    (0x0008, "static"),
    (0x0010, "final"),
    (0x0080, "transient"),
    (0x0040, "volatile"),
    (0x0020, "synchronized"),
    (0x0100, "native"),
    (0x0800, "strictfp"),
];

/// Keyword-meaningful method bits: VARARGS and SYNTHETIC validate against
/// the method mask but have no source keyword.
const METHOD_RENDER_MASK: u16 = METHOD_MASK & !0x0080 & !0x1000;

/// One fully filtered class, ready to render.
pub struct ClassBlock<'a> {
    pub record: &'a ClassRecord,
    pub annotations: AnnotationNames,
    pub methods: Vec<MemberLine<'a>>,
    pub fields: Vec<MemberLine<'a>>,
}

pub struct MemberLine<'a> {
    pub member: &'a MemberRecord,
    pub annotations: AnnotationNames,
}

/// Canonical member order: name, then type descriptor.
pub fn member_order(a: &MemberRecord, b: &MemberRecord) -> Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| a.descriptor.cmp(&b.descriptor))
}

pub fn render_block(block: &ClassBlock<'_>) -> String {
    let mut out = String::new();
    render_header(&mut out, block);
    for method in &block.methods {
        render_method(&mut out, method);
    }
    for field in &block.fields {
        render_field(&mut out, field);
    }
    out.push_str(BLOCK_TERMINATOR);
    out.push('\n');
    out
}

fn render_header(out: &mut String, block: &ClassBlock<'_>) {
    let record = block.record;
    for annotation in &block.annotations.visible {
        let _ = write!(out, "@{annotation} ");
    }

    let mask = if record.modifiers & ACC_INTERFACE != 0 {
        INTERFACE_MASK
    } else {
        CLASS_MASK
    };
    push_keywords(out, record.modifiers & mask);

    match record.kind {
        ClassKind::Annotation => {
            let _ = write!(out, "@interface {}", record.name);
        }
        ClassKind::Interface => {
            let _ = write!(out, "interface {}", record.name);
            if !record.interfaces.is_empty() {
                let _ = write!(out, " extends {}", sorted_list(&record.interfaces));
            }
        }
        ClassKind::Class | ClassKind::Enum => {
            let _ = write!(out, "class {}", record.name);
            if let Some(super_name) = &record.super_name {
                if super_name != "java.lang.Object" {
                    let _ = write!(out, " extends {super_name}");
                }
            }
            if !record.interfaces.is_empty() {
                let _ = write!(out, " implements {}", sorted_list(&record.interfaces));
            }
        }
    }
    out.push('\n');
}

fn render_method(out: &mut String, line: &MemberLine<'_>) {
    out.push_str("  ");
    for annotation in &line.annotations.visible {
        let _ = write!(out, "@{annotation} ");
    }
    push_keywords(out, line.member.modifiers & METHOD_RENDER_MASK);

    let member = line.member;
    match parse_method_descriptor(&member.descriptor) {
        Some(descriptor) => {
            if member.name != "<init>" {
                let _ = write!(out, "{} ", descriptor.return_type);
            }
            let params: Vec<String> = descriptor
                .parameters
                .iter()
                .map(|p| p.to_string())
                .collect();
            let _ = write!(out, "{}({})", member.name, params.join(", "));
        }
        None => {
            let _ = write!(out, "{}{}", member.name, member.descriptor);
        }
    }
    out.push('\n');
}

fn render_field(out: &mut String, line: &MemberLine<'_>) {
    out.push_str("  ");
    for annotation in &line.annotations.visible {
        let _ = write!(out, "@{annotation} ");
    }
    push_keywords(out, line.member.modifiers & FIELD_MASK);

    let member = line.member;
    match parse_field_descriptor(&member.descriptor) {
        Some(ty) => {
            let _ = write!(out, "{ty} {}", member.name);
        }
        None => {
            let _ = write!(out, "{} {}", member.descriptor, member.name);
        }
    }
    if let Some(value) = &member.constant_value {
        let _ = write!(out, " = {}", render_constant(value, &member.descriptor));
    }
    out.push('\n');
}

fn push_keywords(out: &mut String, modifiers: u16) {
    for (bit, keyword) in MODIFIER_KEYWORDS {
        if modifiers & bit != 0 {
            out.push_str(keyword);
            out.push(' ');
        }
    }
}

fn render_constant(value: &ConstantValue, descriptor: &str) -> String {
    match value {
        // Booleans reach the pool as integers; the descriptor restores them.
        ConstantValue::Int(v) if descriptor == "Z" => (*v != 0).to_string(),
        ConstantValue::Int(v) => v.to_string(),
        ConstantValue::Long(v) => v.to_string(),
        ConstantValue::Float(v) => v.to_string(),
        ConstantValue::Double(v) => v.to_string(),
        ConstantValue::Str(v) => quote(v),
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn sorted_list(names: &[String]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(", ")
}

/// `foo.jar` maps to `<output_dir>/foo.txt`; other extensions gain a `.txt`
/// suffix instead of colliding with their input name.
pub fn output_path(output_dir: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match name.strip_suffix(".jar") {
        Some(stem) => format!("{stem}.txt"),
        None => format!("{name}.txt"),
    };
    output_dir.join(file_name)
}

/// All-or-nothing write: assemble beside the destination, rename into
/// place. A failed scan never leaves a partial file visible.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ScanError> {
    let io_err = |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(".tmp");
    let tmp = PathBuf::from(tmp_os);

    std::fs::write(&tmp, content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
