//! Class file parsing.
//!
//! Reads a single `.class` byte stream into the metadata the scan pipeline
//! needs: access flags, superclass/interface names, declared members, direct
//! annotations (runtime-visible and runtime-invisible) with their element
//! values, `ConstantValue` initializers, and the `EnclosingMethod` attribute.
//! Nothing is ever executed; constant capture is byte-level only.

use thiserror::Error;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),
}

/// Compile-time constant captured from a `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

/// One annotation element value. Only integral constants are resolved; the
/// classifier works on names alone and the metadata probe needs one int.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Int(i64),
    Other,
}

/// A direct annotation on a class or member.
#[derive(Debug, Clone)]
pub struct AnnotationRef {
    pub type_name: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl AnnotationRef {
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub struct RawMember {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub annotations: Vec<AnnotationRef>,
    pub constant_value: Option<ConstantValue>,
}

#[derive(Debug, Clone)]
pub struct RawClass {
    /// Dotted fully qualified name.
    pub name: String,
    pub access_flags: u16,
    /// Dotted superclass name; `None` only for `java.lang.Object` itself.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<RawMember>,
    pub methods: Vec<RawMember>,
    pub annotations: Vec<AnnotationRef>,
    /// `Class.method` of the enclosing method, when the `EnclosingMethod`
    /// attribute carries a non-null method reference.
    pub enclosing_method: Option<String>,
}

pub fn parse_class(bytes: &[u8]) -> Result<RawClass, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let index = reader.read_u2()?;
        interfaces.push(dotted(pool.class_name(index)?));
    }

    let fields_count = reader.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        fields.push(parse_member(&mut reader, &pool)?);
    }

    let methods_count = reader.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(parse_member(&mut reader, &pool)?);
    }

    let mut annotations = Vec::new();
    let mut enclosing_method = None;
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        match pool.utf8(name_index)? {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let slice = reader.read_slice(length)?;
                annotations.extend(parse_annotations(slice, &pool)?);
            }
            "EnclosingMethod" => {
                let slice = reader.read_slice(length)?;
                enclosing_method = parse_enclosing_method(slice, &pool)?;
            }
            _ => reader.skip(length)?,
        }
    }

    let name = dotted(pool.class_name(this_class)?);
    let super_name = if super_class == 0 {
        None
    } else {
        Some(dotted(pool.class_name(super_class)?))
    };

    Ok(RawClass {
        name,
        access_flags,
        super_name,
        interfaces,
        fields,
        methods,
        annotations,
        enclosing_method,
    })
}

fn parse_member(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<RawMember, ClassParseError> {
    let access_flags = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;
    let name = pool.utf8(name_index)?.to_string();
    let descriptor = pool.utf8(descriptor_index)?.to_string();

    let mut annotations = Vec::new();
    let mut constant_value = None;
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        match pool.utf8(attr_name_index)? {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let slice = reader.read_slice(length)?;
                annotations.extend(parse_annotations(slice, pool)?);
            }
            "ConstantValue" => {
                let slice = reader.read_slice(length)?;
                let mut sub = ClassReader::new(slice);
                let index = sub.read_u2()?;
                constant_value = Some(pool.constant_value(index)?);
            }
            _ => reader.skip(length)?,
        }
    }

    Ok(RawMember {
        name,
        descriptor,
        access_flags,
        annotations,
        constant_value,
    })
}

fn parse_annotations(
    slice: &[u8],
    pool: &ConstantPool,
) -> Result<Vec<AnnotationRef>, ClassParseError> {
    let mut reader = ClassReader::new(slice);
    let count = reader.read_u2()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_annotation(&mut reader, pool)?);
    }
    Ok(annotations)
}

fn parse_annotation(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<AnnotationRef, ClassParseError> {
    let type_index = reader.read_u2()?;
    let type_name = annotation_type_name(pool.utf8(type_index)?);
    let pair_count = reader.read_u2()?;
    let mut elements = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let name_index = reader.read_u2()?;
        let name = pool.utf8(name_index)?.to_string();
        let value = parse_element_value(reader, pool)?;
        elements.push((name, value));
    }
    Ok(AnnotationRef {
        type_name,
        elements,
    })
}

fn parse_element_value(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<ElementValue, ClassParseError> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' | b'J' => {
            let index = reader.read_u2()?;
            Ok(pool.integral_value(index))
        }
        b'D' | b'F' | b's' => {
            reader.read_u2()?;
            Ok(ElementValue::Other)
        }
        b'e' => {
            reader.read_u2()?;
            reader.read_u2()?;
            Ok(ElementValue::Other)
        }
        b'c' => {
            reader.read_u2()?;
            Ok(ElementValue::Other)
        }
        b'@' => {
            parse_annotation(reader, pool)?;
            Ok(ElementValue::Other)
        }
        b'[' => {
            let count = reader.read_u2()?;
            for _ in 0..count {
                parse_element_value(reader, pool)?;
            }
            Ok(ElementValue::Other)
        }
        other => Err(ClassParseError::UnsupportedConstant { tag: other }),
    }
}

fn parse_enclosing_method(
    slice: &[u8],
    pool: &ConstantPool,
) -> Result<Option<String>, ClassParseError> {
    let mut reader = ClassReader::new(slice);
    let class_index = reader.read_u2()?;
    let method_index = reader.read_u2()?;
    // A zero method index marks a class enclosed in a field or instance
    // initializer, not a defining method.
    if method_index == 0 {
        return Ok(None);
    }
    let class_name = dotted(pool.class_name(class_index)?);
    let method_name = pool.name_and_type_name(method_index)?;
    Ok(Some(format!("{class_name}.{method_name}")))
}

/// `Lcom/foo/Bar;` -> `com.foo.Bar`.
fn annotation_type_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .unwrap_or(descriptor)
        .replace('/', ".")
}

fn dotted(internal: &str) -> String {
    internal.replace(['/', '\\'], ".")
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    NameAndType { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(String::from_utf8(bytes.to_vec())?)
                }
                3 => Constant::Integer(reader.read_u4()? as i32),
                4 => Constant::Float(f32::from_bits(reader.read_u4()?)),
                5 => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    entries.push(Constant::Long(((high << 32) | low) as i64));
                    index += 1;
                    Constant::Unusable
                }
                6 => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    entries.push(Constant::Double(f64::from_bits((high << 32) | low)));
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 => Constant::String {
                    string_index: reader.read_u2()?,
                },
                9 | 10 | 11 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                12 => {
                    let name_index = reader.read_u2()?;
                    reader.read_u2()?;
                    Constant::NameAndType { name_index }
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                16 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                19 | 20 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn name_and_type_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::NameAndType { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn constant_value(&self, index: u16) -> Result<ConstantValue, ClassParseError> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(ConstantValue::Int(*v)),
            Constant::Long(v) => Ok(ConstantValue::Long(*v)),
            Constant::Float(v) => Ok(ConstantValue::Float(*v)),
            Constant::Double(v) => Ok(ConstantValue::Double(*v)),
            Constant::String { string_index } => {
                Ok(ConstantValue::Str(self.utf8(*string_index)?.to_string()))
            }
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn integral_value(&self, index: u16) -> ElementValue {
        match self.entries.get(index as usize) {
            Some(Constant::Integer(v)) => ElementValue::Int(*v as i64),
            Some(Constant::Long(v)) => ElementValue::Int(*v),
            _ => ElementValue::Other,
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFEBABE;
        let magic = self.read_u4()?;
        if magic != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        if self.pos >= self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        if self.pos + 2 > self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        if self.pos + 4 > self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos += 4;
        Ok(value)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        if self.pos + len > self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        if self.pos + len > self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        self.pos += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal hand-assembled class files. Pool entries may legally repeat,
    // so every helper just appends.
    struct Pool {
        bytes: Vec<u8>,
        count: u16,
    }

    impl Pool {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                count: 0,
            }
        }

        fn utf8(&mut self, s: &str) -> u16 {
            self.bytes.push(1);
            self.bytes
                .extend_from_slice(&(s.len() as u16).to_be_bytes());
            self.bytes.extend_from_slice(s.as_bytes());
            self.count += 1;
            self.count
        }

        fn class(&mut self, internal_name: &str) -> u16 {
            let name = self.utf8(internal_name);
            self.bytes.push(7);
            self.bytes.extend_from_slice(&name.to_be_bytes());
            self.count += 1;
            self.count
        }

        fn integer(&mut self, v: i32) -> u16 {
            self.bytes.push(3);
            self.bytes.extend_from_slice(&v.to_be_bytes());
            self.count += 1;
            self.count
        }

        fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
            let n = self.utf8(name);
            let d = self.utf8(descriptor);
            self.bytes.push(12);
            self.bytes.extend_from_slice(&n.to_be_bytes());
            self.bytes.extend_from_slice(&d.to_be_bytes());
            self.count += 1;
            self.count
        }
    }

    fn assemble(pool: Pool, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn parses_class_shape_and_members() {
        let mut pool = Pool::new();
        let this = pool.class("com/example/Foo");
        let superc = pool.class("java/lang/Object");
        let iface = pool.class("java/io/Serializable");
        let field_name = pool.utf8("LIMIT");
        let field_desc = pool.utf8("I");
        let cv_attr = pool.utf8("ConstantValue");
        let cv = pool.integer(42);
        let method_name = pool.utf8("run");
        let method_desc = pool.utf8("()V");

        let mut body = Vec::new();
        body.extend_from_slice(&0x0021u16.to_be_bytes()); // public super
        body.extend_from_slice(&this.to_be_bytes());
        body.extend_from_slice(&superc.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&iface.to_be_bytes());

        // one field with a ConstantValue attribute
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&0x0019u16.to_be_bytes()); // public static final
        body.extend_from_slice(&field_name.to_be_bytes());
        body.extend_from_slice(&field_desc.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&cv_attr.to_be_bytes());
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&cv.to_be_bytes());

        // one method, no attributes
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&0x0001u16.to_be_bytes());
        body.extend_from_slice(&method_name.to_be_bytes());
        body.extend_from_slice(&method_desc.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());

        // no class attributes
        body.extend_from_slice(&0u16.to_be_bytes());

        let parsed = parse_class(&assemble(pool, &body)).unwrap();
        assert_eq!(parsed.name, "com.example.Foo");
        assert_eq!(parsed.super_name.as_deref(), Some("java.lang.Object"));
        assert_eq!(parsed.interfaces, vec!["java.io.Serializable"]);
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.fields[0].name, "LIMIT");
        assert_eq!(parsed.fields[0].constant_value, Some(ConstantValue::Int(42)));
        assert_eq!(parsed.methods.len(), 1);
        assert_eq!(parsed.methods[0].descriptor, "()V");
    }

    #[test]
    fn parses_annotations_with_int_elements() {
        let mut pool = Pool::new();
        let this = pool.class("com/example/Bar");
        let superc = pool.class("java/lang/Object");
        let attr = pool.utf8("RuntimeVisibleAnnotations");
        let anno_type = pool.utf8("Lkotlin/Metadata;");
        let k_name = pool.utf8("k");
        let k_value = pool.integer(3);

        let mut body = Vec::new();
        body.extend_from_slice(&0x0021u16.to_be_bytes());
        body.extend_from_slice(&this.to_be_bytes());
        body.extend_from_slice(&superc.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        body.extend_from_slice(&0u16.to_be_bytes()); // fields
        body.extend_from_slice(&0u16.to_be_bytes()); // methods

        let mut attr_body = Vec::new();
        attr_body.extend_from_slice(&1u16.to_be_bytes()); // one annotation
        attr_body.extend_from_slice(&anno_type.to_be_bytes());
        attr_body.extend_from_slice(&1u16.to_be_bytes()); // one pair
        attr_body.extend_from_slice(&k_name.to_be_bytes());
        attr_body.push(b'I');
        attr_body.extend_from_slice(&k_value.to_be_bytes());

        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&attr.to_be_bytes());
        body.extend_from_slice(&(attr_body.len() as u32).to_be_bytes());
        body.extend_from_slice(&attr_body);

        let parsed = parse_class(&assemble(pool, &body)).unwrap();
        assert_eq!(parsed.annotations.len(), 1);
        let anno = &parsed.annotations[0];
        assert_eq!(anno.type_name, "kotlin.Metadata");
        assert_eq!(anno.element("k"), Some(&ElementValue::Int(3)));
    }

    #[test]
    fn enclosing_method_requires_method_reference() {
        let mut pool = Pool::new();
        let this = pool.class("com/example/Outer$1");
        let superc = pool.class("java/lang/Object");
        let attr = pool.utf8("EnclosingMethod");
        let outer = pool.class("com/example/Outer");
        let nat = pool.name_and_type("run", "()V");

        let mut body = Vec::new();
        body.extend_from_slice(&0x0020u16.to_be_bytes());
        body.extend_from_slice(&this.to_be_bytes());
        body.extend_from_slice(&superc.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());

        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&attr.to_be_bytes());
        body.extend_from_slice(&4u32.to_be_bytes());
        body.extend_from_slice(&outer.to_be_bytes());
        body.extend_from_slice(&nat.to_be_bytes());

        let parsed = parse_class(&assemble(pool, &body)).unwrap();
        assert_eq!(
            parsed.enclosing_method.as_deref(),
            Some("com.example.Outer.run")
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let err = parse_class(&[0xCA, 0xFE, 0xBA, 0xBF, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, ClassParseError::InvalidMagic));
    }

    #[test]
    fn rejects_truncated_input() {
        let err = parse_class(&[0xCA, 0xFE]).unwrap_err();
        assert!(matches!(err, ClassParseError::UnexpectedEof));
    }
}
