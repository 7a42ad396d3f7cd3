//! Field and method descriptor parsing (JVMS §4.3), and the stack-size
//! accounting derived from them. Both building a descriptor from typed
//! values (`Display`) and parsing an existing descriptor string back into
//! typed values are needed, since a reader decoding an existing class file
//! only ever has the string form.

use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Number of local-variable / operand-stack slots this type occupies (1,
    /// except `long`/`double` which occupy 2 — JVMS §2.6.1).
    pub fn slot_size(&self) -> u16 {
        match self {
            FieldType::Long | FieldType::Double => 2,
            _ => 1,
        }
    }

    fn parse(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<FieldType> {
        match chars.next()? {
            'B' => Some(FieldType::Byte),
            'C' => Some(FieldType::Char),
            'D' => Some(FieldType::Double),
            'F' => Some(FieldType::Float),
            'I' => Some(FieldType::Int),
            'J' => Some(FieldType::Long),
            'S' => Some(FieldType::Short),
            'Z' => Some(FieldType::Boolean),
            'L' => {
                let mut name = String::new();
                loop {
                    match chars.next()? {
                        ';' => break,
                        c => name.push(c),
                    }
                }
                Some(FieldType::Object(name))
            }
            '[' => Some(FieldType::Array(Box::new(FieldType::parse(chars)?))),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => write!(f, "B"),
            FieldType::Char => write!(f, "C"),
            FieldType::Double => write!(f, "D"),
            FieldType::Float => write!(f, "F"),
            FieldType::Int => write!(f, "I"),
            FieldType::Long => write!(f, "J"),
            FieldType::Short => write!(f, "S"),
            FieldType::Boolean => write!(f, "Z"),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(element) => write!(f, "[{element}"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Option<MethodDescriptor> {
        let mut chars = descriptor.chars().peekable();
        if chars.next()? != '(' {
            return None;
        }
        let mut parameters = Vec::new();
        loop {
            match chars.peek()? {
                ')' => {
                    chars.next();
                    break;
                }
                _ => parameters.push(FieldType::parse(&mut chars)?),
            }
        }
        let return_type = if chars.peek() == Some(&'V') {
            chars.next();
            None
        } else {
            Some(FieldType::parse(&mut chars)?)
        };
        Some(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    pub fn argument_stack_size(&self) -> u16 {
        self.parameters.iter().map(FieldType::slot_size).sum()
    }

    pub fn return_stack_size(&self) -> u16 {
        self.return_type.as_ref().map(FieldType::slot_size).unwrap_or(0)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.parameters {
            write!(f, "{param}")?;
        }
        write!(f, ")")?;
        match &self.return_type {
            Some(t) => write!(f, "{t}"),
            None => write!(f, "V"),
        }
    }
}

/// Slot size (1, or 2 for `long`/`double`) of a single field descriptor,
/// defaulting to 1 for malformed input.
pub fn field_type_slot_size(descriptor: &str) -> u16 {
    let mut chars = descriptor.chars().peekable();
    FieldType::parse(&mut chars).map(|t| t.slot_size()).unwrap_or(1)
}

/// Parses a single field descriptor (not a method descriptor) into its
/// `FieldType`, e.g. for a field's type or one array/call argument.
pub fn parse_field_type(descriptor: &str) -> Option<FieldType> {
    let mut chars = descriptor.chars().peekable();
    FieldType::parse(&mut chars)
}

/// Packs `(argument_stack_size << 2) | return_stack_size` into one `u16`:
/// low 2 bits are the return size (0/1/2 slots), the rest the argument
/// stack size. A descriptor that fails to parse packs to 0.
pub fn packed_argument_and_return_size(descriptor: &str) -> u16 {
    match MethodDescriptor::parse(descriptor) {
        Some(d) => (d.argument_stack_size() << 2) | d.return_stack_size(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_descriptors() {
        for (text, expected) in [
            ("B", FieldType::Byte),
            ("C", FieldType::Char),
            ("D", FieldType::Double),
            ("F", FieldType::Float),
            ("I", FieldType::Int),
            ("J", FieldType::Long),
            ("S", FieldType::Short),
            ("Z", FieldType::Boolean),
        ] {
            let mut chars = text.chars().peekable();
            assert_eq!(FieldType::parse(&mut chars), Some(expected));
        }
    }

    #[test]
    fn parses_nested_arrays_and_objects() {
        let mut chars = "[[Ljava/lang/String;".chars().peekable();
        assert_eq!(
            FieldType::parse(&mut chars),
            Some(FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Object(
                "java/lang/String".to_owned()
            ))))))
        );
    }

    #[test]
    fn parses_method_descriptor_and_round_trips_display() {
        let d = MethodDescriptor::parse("(ILjava/lang/String;[D)Z").unwrap();
        assert_eq!(d.parameters.len(), 3);
        assert_eq!(d.return_type, Some(FieldType::Boolean));
        assert_eq!(d.to_string(), "(ILjava/lang/String;[D)Z");
    }

    #[test]
    fn void_no_arg_descriptor() {
        let d = MethodDescriptor::parse("()V").unwrap();
        assert!(d.parameters.is_empty());
        assert_eq!(d.return_type, None);
        assert_eq!(d.to_string(), "()V");
    }

    #[test]
    fn argument_and_return_stack_sizes_count_wide_types_twice() {
        let d = MethodDescriptor::parse("(JID)J").unwrap();
        assert_eq!(d.argument_stack_size(), 2 + 1 + 2);
        assert_eq!(d.return_stack_size(), 2);
    }

    #[test]
    fn field_type_slot_size_counts_wide_types_as_two() {
        assert_eq!(field_type_slot_size("J"), 2);
        assert_eq!(field_type_slot_size("Ljava/lang/String;"), 1);
    }

    #[test]
    fn packed_size_matches_bit_layout() {
        let packed = packed_argument_and_return_size("(I)J");
        assert_eq!(packed & 0b11, 2); // return size
        assert_eq!(packed >> 2, 1); // argument size
    }
}
