//! Abstract interpretation over the JVM's verification type lattice, used to
//! compute `StackMapTable` frames.
//!
//! `AbstractType` is a plain Rust enum rather than a packed integer tag —
//! there's no pressure here to keep it unboxed in a primitive array, so the
//! straightforward representation is also the right one.

use std::fmt;

/// One verification type (JVMS §4.10.1.2).
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum AbstractType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    /// Internal name of a class or interface, e.g. `"java/lang/String"`.
    Reference(String),
    /// `new` at the bytecode offset recorded here, before the constructor runs.
    Uninitialized(u32),
}

impl AbstractType {
    /// Stack-map-frame slot count: everything is 1 except `long`/`double`,
    /// which verification represents as two consecutive `Top`-adjacent
    /// entries collapsing into a single emitted `verification_type_info`
    /// followed by nothing (JVMS §4.10.1.2 — the second local/stack slot a
    /// wide value occupies is *not* separately emitted).
    pub fn slot_size(&self) -> u32 {
        match self {
            AbstractType::Long | AbstractType::Double => 2,
            _ => 1,
        }
    }

    pub fn verification_tag(&self) -> u8 {
        use crate::constants::verification_tag as tag;
        match self {
            AbstractType::Top => tag::TOP,
            AbstractType::Integer => tag::INTEGER,
            AbstractType::Float => tag::FLOAT,
            AbstractType::Double => tag::DOUBLE,
            AbstractType::Long => tag::LONG,
            AbstractType::Null => tag::NULL,
            AbstractType::UninitializedThis => tag::UNINITIALIZED_THIS,
            AbstractType::Reference(_) => tag::OBJECT,
            AbstractType::Uninitialized(_) => tag::UNINITIALIZED,
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractType::Top => write!(f, "top"),
            AbstractType::Integer => write!(f, "int"),
            AbstractType::Float => write!(f, "float"),
            AbstractType::Long => write!(f, "long"),
            AbstractType::Double => write!(f, "double"),
            AbstractType::Null => write!(f, "null"),
            AbstractType::UninitializedThis => write!(f, "uninitializedThis"),
            AbstractType::Reference(name) => write!(f, "{name}"),
            AbstractType::Uninitialized(offset) => write!(f, "uninitialized@{offset}"),
        }
    }
}

/// Resolves the common supertype of two reference types during frame
/// merging (JVMS §4.10.1.3). Computing an exact join requires a loaded class
/// hierarchy, which a writer in isolation doesn't have; the default resolver
/// approximates every join as `java/lang/Object`, and a caller with access to
/// real classpath information can substitute their own resolver through this
/// trait instead.
pub trait CommonSuperClassResolver {
    fn common_super_class(&self, a: &str, b: &str) -> String;
}

/// Resolver used when a `ClassWriter` isn't given a more precise one; always
/// widens to `java/lang/Object`. Correct per JVMS (verification never
/// *requires* a tighter common supertype, only one that type-checks), just
/// more conservative than consulting real class hierarchy info.
pub struct ObjectSuperClassResolver;

impl CommonSuperClassResolver for ObjectSuperClassResolver {
    fn common_super_class(&self, a: &str, b: &str) -> String {
        if a == b {
            a.to_owned()
        } else {
            "java/lang/Object".to_owned()
        }
    }
}

/// The verification state (locals + operand stack) at one basic-block entry.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Frame {
    pub locals: Vec<AbstractType>,
    pub stack: Vec<AbstractType>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            locals: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Merges `other` into `self` in place (the JVMS §4.10.1.3 join), widening
    /// any position that disagrees via `resolver`. Returns `true` if `self`
    /// changed, so a worklist fixpoint knows to re-propagate this block's
    /// successors.
    pub fn merge(&mut self, other: &Frame, resolver: &dyn CommonSuperClassResolver) -> bool {
        let mut changed = false;
        changed |= merge_slots(&mut self.locals, &other.locals, resolver);
        changed |= merge_slots(&mut self.stack, &other.stack, resolver);
        changed
    }
}

fn merge_slots(
    into: &mut Vec<AbstractType>,
    other: &[AbstractType],
    resolver: &dyn CommonSuperClassResolver,
) -> bool {
    let common_len = into.len().min(other.len());
    let mut changed = into.len() != common_len;
    into.truncate(common_len);
    for i in 0..common_len {
        let merged = join(&into[i], &other[i], resolver);
        if merged != into[i] {
            into[i] = merged;
            changed = true;
        }
    }
    changed
}

/// Joins two verification types to their least upper bound in the lattice.
/// `Top` is the bottom of this implementation's merge order (JVMS calls it
/// "unusable" rather than a true top type, but the merge operator treats
/// disagreement as collapsing toward it).
fn join(a: &AbstractType, b: &AbstractType, resolver: &dyn CommonSuperClassResolver) -> AbstractType {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (AbstractType::Null, AbstractType::Reference(name))
        | (AbstractType::Reference(name), AbstractType::Null) => AbstractType::Reference(name.clone()),
        (AbstractType::Null, AbstractType::Null) => AbstractType::Null,
        (AbstractType::Reference(x), AbstractType::Reference(y)) => {
            AbstractType::Reference(resolver.common_super_class(x, y))
        }
        _ => AbstractType::Top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_do_not_change_on_merge() {
        let mut a = Frame {
            locals: vec![AbstractType::Integer],
            stack: vec![],
        };
        let b = a.clone();
        assert!(!a.merge(&b, &ObjectSuperClassResolver));
    }

    #[test]
    fn mismatched_primitives_collapse_to_top() {
        let mut a = Frame {
            locals: vec![AbstractType::Integer],
            stack: vec![],
        };
        let b = Frame {
            locals: vec![AbstractType::Float],
            stack: vec![],
        };
        assert!(a.merge(&b, &ObjectSuperClassResolver));
        assert_eq!(a.locals, vec![AbstractType::Top]);
    }

    #[test]
    fn distinct_references_widen_to_common_super_class() {
        let mut a = Frame {
            locals: vec![],
            stack: vec![AbstractType::Reference("java/lang/String".into())],
        };
        let b = Frame {
            locals: vec![],
            stack: vec![AbstractType::Reference("java/util/ArrayList".into())],
        };
        a.merge(&b, &ObjectSuperClassResolver);
        assert_eq!(a.stack, vec![AbstractType::Reference("java/lang/Object".into())]);
    }

    #[test]
    fn null_joined_with_reference_keeps_the_reference() {
        let mut a = Frame {
            locals: vec![],
            stack: vec![AbstractType::Null],
        };
        let b = Frame {
            locals: vec![],
            stack: vec![AbstractType::Reference("java/lang/String".into())],
        };
        a.merge(&b, &ObjectSuperClassResolver);
        assert_eq!(a.stack, vec![AbstractType::Reference("java/lang/String".into())]);
    }

    #[test]
    fn shorter_locals_truncate_and_mark_changed() {
        let mut a = Frame {
            locals: vec![AbstractType::Integer, AbstractType::Integer],
            stack: vec![],
        };
        let b = Frame {
            locals: vec![AbstractType::Integer],
            stack: vec![],
        };
        assert!(a.merge(&b, &ObjectSuperClassResolver));
        assert_eq!(a.locals, vec![AbstractType::Integer]);
    }
}
