//! JVM type descriptor parsing for the output format.
//!
//! Descriptors stay raw on the records (exclusion lists match on
//! `name + descriptor`); the formatter turns them into Java-style type names
//! at render time.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaType {
    Void,
    Primitive(&'static str),
    Reference(String),
    Array { element: Box<JavaType>, dimensions: usize },
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Void => f.write_str("void"),
            JavaType::Primitive(name) => f.write_str(name),
            JavaType::Reference(name) => f.write_str(name),
            JavaType::Array {
                element,
                dimensions,
            } => {
                write!(f, "{element}")?;
                for _ in 0..*dimensions {
                    f.write_str("[]")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<JavaType>,
    pub return_type: JavaType,
}

pub fn parse_field_descriptor(descriptor: &str) -> Option<JavaType> {
    let mut parser = DescriptorParser::new(descriptor);
    let ty = parser.parse_type()?;
    if parser.remaining() != 0 {
        return None;
    }
    Some(ty)
}

pub fn parse_method_descriptor(descriptor: &str) -> Option<MethodDescriptor> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect(b'(')?;
    let mut parameters = Vec::new();
    while !parser.peek(b')') {
        parameters.push(parser.parse_type()?);
    }
    parser.expect(b')')?;
    let return_type = if parser.peek(b'V') {
        parser.advance(1);
        JavaType::Void
    } else {
        parser.parse_type()?
    };
    if parser.remaining() != 0 {
        return None;
    }
    Some(MethodDescriptor {
        parameters,
        return_type,
    })
}

struct DescriptorParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn expect(&mut self, ch: u8) -> Option<()> {
        if self.remaining() == 0 || self.bytes[self.pos] != ch {
            return None;
        }
        self.pos += 1;
        Some(())
    }

    fn peek(&self, ch: u8) -> bool {
        self.pos < self.bytes.len() && self.bytes[self.pos] == ch
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    fn parse_type(&mut self) -> Option<JavaType> {
        if self.remaining() == 0 {
            return None;
        }
        match self.bytes[self.pos] {
            b'B' => self.primitive("byte"),
            b'C' => self.primitive("char"),
            b'D' => self.primitive("double"),
            b'F' => self.primitive("float"),
            b'I' => self.primitive("int"),
            b'J' => self.primitive("long"),
            b'S' => self.primitive("short"),
            b'Z' => self.primitive("boolean"),
            b'L' => self.parse_reference(),
            b'[' => self.parse_array(),
            _ => None,
        }
    }

    fn primitive(&mut self, name: &'static str) -> Option<JavaType> {
        self.pos += 1;
        Some(JavaType::Primitive(name))
    }

    fn parse_reference(&mut self) -> Option<JavaType> {
        self.expect(b'L')?;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b';' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return None;
        }
        let name = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        self.pos += 1; // consume ';'
        Some(JavaType::Reference(name.replace('/', ".")))
    }

    fn parse_array(&mut self) -> Option<JavaType> {
        let mut dimensions = 0;
        while self.pos < self.bytes.len() && self.bytes[self.pos] == b'[' {
            dimensions += 1;
            self.pos += 1;
        }
        let element = self.parse_type()?;
        Some(JavaType::Array {
            element: Box::new(element),
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_descriptors_render_as_java_names() {
        assert_eq!(
            parse_field_descriptor("Ljava/lang/String;").unwrap().to_string(),
            "java.lang.String"
        );
        assert_eq!(parse_field_descriptor("I").unwrap().to_string(), "int");
        assert_eq!(parse_field_descriptor("[[J").unwrap().to_string(), "long[][]");
    }

    #[test]
    fn method_descriptors_split_parameters_and_return() {
        let desc = parse_method_descriptor("(Ljava/lang/String;I[B)Ljava/util/List;").unwrap();
        let params: Vec<String> = desc.parameters.iter().map(|p| p.to_string()).collect();
        assert_eq!(params, vec!["java.lang.String", "int", "byte[]"]);
        assert_eq!(desc.return_type.to_string(), "java.util.List");
    }

    #[test]
    fn void_return() {
        let desc = parse_method_descriptor("()V").unwrap();
        assert!(desc.parameters.is_empty());
        assert_eq!(desc.return_type, JavaType::Void);
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        assert!(parse_field_descriptor("Q").is_none());
        assert!(parse_field_descriptor("Ljava/lang/String").is_none());
        assert!(parse_method_descriptor("(I").is_none());
        assert!(parse_method_descriptor("()VX").is_none());
    }
}
