//! Class-file major-version feature gates.
//!
//! Each constant is the minimum `major_version` a feature requires; callers
//! (mainly `ClassWriter`/`MethodWriter`) compare against the version passed
//! to `ClassWriter::new` and either skip the feature, synthesize an older
//! equivalent, or raise `Error::UnsupportedVersion`.

pub const V1_1: u16 = 45;
pub const V1_2: u16 = 46;
pub const V1_4: u16 = 48;
/// `ACC_SYNTHETIC`/`ACC_ANNOTATION`/`ACC_ENUM` valid directly in access_flags;
/// below this, synthetic members need a `Synthetic` attribute instead.
pub const V5: u16 = 49;
/// `StackMapTable` becomes the frame representation used by the verifier.
pub const V6: u16 = 50;
/// `invokedynamic`, `BootstrapMethods`, `CONSTANT_MethodHandle`/`MethodType`.
pub const V7: u16 = 51;
/// `MethodParameters`, type annotations (`RuntimeVisibleTypeAnnotations`).
pub const V8: u16 = 52;
pub const V9: u16 = 53;
pub const V10: u16 = 54;
/// `NestHost`/`NestMembers`, `CONSTANT_Dynamic`.
pub const V11: u16 = 55;
pub const V12: u16 = 56;
pub const V13: u16 = 57;
/// `Record` attribute, record components.
pub const V14: u16 = 58;
/// `PermittedSubclasses`.
pub const V15: u16 = 59;
pub const V16: u16 = 60;
pub const V17: u16 = 61;
pub const V18: u16 = 62;
pub const V19: u16 = 63;
pub const V20: u16 = 64;
pub const V21: u16 = 65;

pub fn supports_stack_map_table(major_version: u16) -> bool {
    major_version >= V6
}

pub fn requires_synthetic_attribute(major_version: u16) -> bool {
    major_version < V5
}

pub fn supports_invoke_dynamic(major_version: u16) -> bool {
    major_version >= V7
}

pub fn supports_nest_members(major_version: u16) -> bool {
    major_version >= V11
}

pub fn supports_records(major_version: u16) -> bool {
    major_version >= V14
}

pub fn supports_permitted_subclasses(major_version: u16) -> bool {
    major_version >= V15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_map_table_requires_v50_plus() {
        assert!(!supports_stack_map_table(49));
        assert!(supports_stack_map_table(50));
    }

    #[test]
    fn synthetic_attribute_needed_before_v49() {
        assert!(requires_synthetic_attribute(48));
        assert!(!requires_synthetic_attribute(49));
    }

    #[test]
    fn records_gate_at_v58() {
        assert!(!supports_records(57));
        assert!(supports_records(58));
    }
}
