//! The constant pool plus the parallel `BootstrapMethods` table.
//!
//! A structurally-keyed interning set: entries are stored in a `Vec` indexed
//! by the real 1-based constant-pool index, with a reverse `HashMap` for
//! dedup, since long/double entries occupy two consecutive slots and a
//! contiguous 0-based index can't represent that directly for byte-exact
//! round-tripping of a pool read from an existing class. The
//! bootstrap-methods table has no double-slot rule, so it's kept as a plain
//! `indexmap::IndexSet`.

use crate::constants::tag;
use crate::error::{Error, Result};
use crate::modified_utf8;
use crate::bytevector::ByteVector;
use indexmap::IndexSet;
use std::collections::HashMap;

const MAX_POOL_SIZE: usize = 65535;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Entry {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl Entry {
    fn tag(&self) -> u8 {
        match self {
            Entry::Utf8(_) => tag::UTF8,
            Entry::Integer(_) => tag::INTEGER,
            Entry::Float(_) => tag::FLOAT,
            Entry::Long(_) => tag::LONG,
            Entry::Double(_) => tag::DOUBLE,
            Entry::Class(_) => tag::CLASS,
            Entry::String(_) => tag::STRING,
            Entry::Fieldref(..) => tag::FIELDREF,
            Entry::Methodref(..) => tag::METHODREF,
            Entry::InterfaceMethodref(..) => tag::INTERFACE_METHODREF,
            Entry::NameAndType(..) => tag::NAME_AND_TYPE,
            Entry::MethodHandle(..) => tag::METHOD_HANDLE,
            Entry::MethodType(_) => tag::METHOD_TYPE,
            Entry::Dynamic(..) => tag::DYNAMIC,
            Entry::InvokeDynamic(..) => tag::INVOKE_DYNAMIC,
            Entry::Module(_) => tag::MODULE,
            Entry::Package(_) => tag::PACKAGE,
        }
    }

    /// Number of constant-pool index slots this entry occupies (JVMS §4.4.5:
    /// long and double "take up two entries in the constant_pool table").
    fn slots(&self) -> u16 {
        match self {
            Entry::Long(_) | Entry::Double(_) => 2,
            _ => 1,
        }
    }
}

/// A single bootstrap method table entry: a method handle plus its static
/// argument constant-pool indices.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BootstrapMethod {
    pub method_handle_index: u16,
    pub arguments: Vec<u16>,
}

/// The constant pool plus the `BootstrapMethods` table, shared by a
/// `ClassReader` (which populates it by walking an existing pool, preserving
/// indices) and a `ClassWriter` (which extends it on demand).
pub struct SymbolTable {
    /// `entries[0]` is always `None` (index 0 is reserved as "absent").
    /// `entries[i]` is `None` also for the phantom second slot of a
    /// long/double at index `i - 1`.
    entries: Vec<Option<Entry>>,
    index_of: HashMap<Entry, u16>,
    bootstrap_methods: IndexSet<BootstrapMethod>,
    major_version: u16,
    minor_version: u16,
    /// Method descriptor → packed (argument stack size, return size),
    /// computed lazily on first lookup.
    descriptor_size_cache: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new(major_version: u16, minor_version: u16) -> Self {
        SymbolTable {
            entries: vec![None],
            index_of: HashMap::new(),
            bootstrap_methods: IndexSet::new(),
            major_version,
            minor_version,
            descriptor_size_cache: HashMap::new(),
        }
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    /// Total number of slots in the pool, i.e. the value written as
    /// `constant_pool_count` (one more than the highest occupied index).
    pub fn constant_pool_count(&self) -> u16 {
        self.entries.len() as u16
    }

    fn next_index(&self, slots: u16) -> Result<u16> {
        let count = self.entries.len() as u32 + slots as u32;
        if count > MAX_POOL_SIZE as u32 {
            return Err(Error::ClassTooLarge);
        }
        Ok(self.entries.len() as u16)
    }

    fn intern(&mut self, entry: Entry) -> Result<u16> {
        if let Some(&index) = self.index_of.get(&entry) {
            log::trace!("constant pool hit for existing index {index}");
            return Ok(index);
        }
        let slots = entry.slots();
        let index = self.next_index(slots)?;
        self.index_of.insert(entry.clone(), index);
        self.entries.push(Some(entry));
        if slots == 2 {
            self.entries.push(None);
        }
        log::trace!("constant pool miss, appended at index {index}");
        Ok(index)
    }

    // --- Primitive/direct constants -------------------------------------------------

    pub fn add_constant_utf8(&mut self, s: &str) -> Result<u16> {
        let len = modified_utf8::encoded_len(s);
        if len > u16::MAX as usize {
            return Err(Error::UtfTooLong { length: len });
        }
        self.intern(Entry::Utf8(s.to_owned()))
    }

    pub fn add_constant_integer(&mut self, value: i32) -> Result<u16> {
        self.intern(Entry::Integer(value))
    }

    pub fn add_constant_float(&mut self, value: f32) -> Result<u16> {
        self.intern(Entry::Float(value.to_bits()))
    }

    pub fn add_constant_long(&mut self, value: i64) -> Result<u16> {
        self.intern(Entry::Long(value))
    }

    pub fn add_constant_double(&mut self, value: f64) -> Result<u16> {
        self.intern(Entry::Double(value.to_bits()))
    }

    // --- Reference-bearing constants, built from strings -----------------------------

    pub fn add_constant_class(&mut self, internal_name: &str) -> Result<u16> {
        let name_index = self.add_constant_utf8(internal_name)?;
        self.intern(Entry::Class(name_index))
    }

    pub fn add_constant_string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.add_constant_utf8(value)?;
        self.intern(Entry::String(string_index))
    }

    pub fn add_constant_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.add_constant_utf8(name)?;
        let descriptor_index = self.add_constant_utf8(descriptor)?;
        self.intern(Entry::NameAndType(name_index, descriptor_index))
    }

    pub fn add_constant_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.add_constant_class(owner)?;
        let nat_index = self.add_constant_name_and_type(name, descriptor)?;
        self.intern(Entry::Fieldref(class_index, nat_index))
    }

    pub fn add_constant_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<u16> {
        let class_index = self.add_constant_class(owner)?;
        let nat_index = self.add_constant_name_and_type(name, descriptor)?;
        if is_interface {
            self.intern(Entry::InterfaceMethodref(class_index, nat_index))
        } else {
            self.intern(Entry::Methodref(class_index, nat_index))
        }
    }

    pub fn add_constant_method_handle(
        &mut self,
        reference_kind: u8,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<u16> {
        let is_field = matches!(reference_kind, 1..=4);
        let member_index = if is_field {
            self.add_constant_field_ref(owner, name, descriptor)?
        } else {
            self.add_constant_method_ref(owner, name, descriptor, is_interface)?
        };
        self.intern(Entry::MethodHandle(reference_kind, member_index))
    }

    pub fn add_constant_method_type(&mut self, descriptor: &str) -> Result<u16> {
        let descriptor_index = self.add_constant_utf8(descriptor)?;
        self.intern(Entry::MethodType(descriptor_index))
    }

    pub fn add_constant_dynamic(&mut self, name: &str, descriptor: &str, bootstrap_method_index: u16) -> Result<u16> {
        let nat_index = self.add_constant_name_and_type(name, descriptor)?;
        self.intern(Entry::Dynamic(bootstrap_method_index, nat_index))
    }

    pub fn add_constant_invoke_dynamic(&mut self, name: &str, descriptor: &str, bootstrap_method_index: u16) -> Result<u16> {
        let nat_index = self.add_constant_name_and_type(name, descriptor)?;
        self.intern(Entry::InvokeDynamic(bootstrap_method_index, nat_index))
    }

    pub fn add_constant_module(&mut self, name: &str) -> Result<u16> {
        let name_index = self.add_constant_utf8(name)?;
        self.intern(Entry::Module(name_index))
    }

    pub fn add_constant_package(&mut self, name: &str) -> Result<u16> {
        let name_index = self.add_constant_utf8(name)?;
        self.intern(Entry::Package(name_index))
    }

    /// Interns a bootstrap method, returning its index in the
    /// `BootstrapMethods` attribute's `bootstrap_methods[]` array.
    pub fn add_bootstrap_method(&mut self, method_handle_index: u16, arguments: &[u16]) -> u16 {
        let (index, _) = self.bootstrap_methods.insert_full(BootstrapMethod {
            method_handle_index,
            arguments: arguments.to_vec(),
        });
        index as u16
    }

    pub fn bootstrap_method_count(&self) -> usize {
        self.bootstrap_methods.len()
    }

    // --- Lookups used by readers/writers --------------------------------------------

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn class_name(&self, class_index: u16) -> Option<&str> {
        match self.entries.get(class_index as usize)?.as_ref()? {
            Entry::Class(name_index) => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::NameAndType(name_index, descriptor_index) => {
                Some((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            _ => None,
        }
    }

    pub fn member_ref(&self, index: u16) -> Option<(&str, &str, &str)> {
        let entry = self.entries.get(index as usize)?.as_ref()?;
        let (class_index, nat_index) = match entry {
            Entry::Fieldref(c, n) | Entry::Methodref(c, n) | Entry::InterfaceMethodref(c, n) => (*c, *n),
            _ => return None,
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Some((owner, name, descriptor))
    }

    /// Returns the packed `(argument_stack_size << 2) | return_size` for a
    /// `Methodref`/`InterfaceMethodref`/invokedynamic `Dynamic` entry,
    /// computing and caching it on first use.
    pub fn method_argument_and_return_size(&mut self, method_ref_index: u16) -> Option<u16> {
        let descriptor = match self.entries.get(method_ref_index as usize)?.as_ref()? {
            Entry::Methodref(_, nat) | Entry::InterfaceMethodref(_, nat) | Entry::InvokeDynamic(_, nat) => {
                let nat = *nat;
                self.name_and_type(nat)?.1.to_owned()
            }
            _ => return None,
        };
        if let Some(&cached) = self.descriptor_size_cache.get(&descriptor) {
            return Some(cached);
        }
        let packed = crate::descriptor::packed_argument_and_return_size(&descriptor);
        self.descriptor_size_cache.insert(descriptor, packed);
        Some(packed)
    }

    pub fn entry_tag(&self, index: u16) -> Option<u8> {
        Some(self.entries.get(index as usize)?.as_ref()?.tag())
    }

    pub fn integer_value(&self, index: u16) -> Option<i32> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float_value(&self, index: u16) -> Option<f32> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::Float(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn long_value(&self, index: u16) -> Option<i64> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn double_value(&self, index: u16) -> Option<f64> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::Double(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// Name and descriptor for a `CONSTANT_InvokeDynamic` or `CONSTANT_Dynamic`
    /// entry — both share the `(bootstrap_method_attr_index, name_and_type_index)` shape.
    pub fn invoke_dynamic_name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::InvokeDynamic(_, nat) | Entry::Dynamic(_, nat) => self.name_and_type(*nat),
            _ => None,
        }
    }

    pub fn invoke_dynamic_bootstrap_index(&self, index: u16) -> Option<u16> {
        match self.entries.get(index as usize)?.as_ref()? {
            Entry::InvokeDynamic(bootstrap, _) | Entry::Dynamic(bootstrap, _) => Some(*bootstrap),
            _ => None,
        }
    }

    // --- Serialization -----------------------------------------------------------------

    pub fn serialize(&self, out: &mut ByteVector) -> Result<()> {
        out.put_short(self.constant_pool_count());
        let mut i = 1usize;
        while i < self.entries.len() {
            match &self.entries[i] {
                None => {
                    i += 1;
                    continue;
                }
                Some(entry) => {
                    self.serialize_entry(entry, out)?;
                    i += entry.slots() as usize;
                }
            }
        }
        Ok(())
    }

    fn serialize_entry(&self, entry: &Entry, out: &mut ByteVector) -> Result<()> {
        out.put_byte(entry.tag());
        match entry {
            Entry::Utf8(s) => {
                out.put_utf8(s)?;
            }
            Entry::Integer(v) => {
                out.put_int(*v as u32);
            }
            Entry::Float(bits) => {
                out.put_int(*bits);
            }
            Entry::Long(v) => {
                out.put_long(*v as u64);
            }
            Entry::Double(bits) => {
                out.put_long(*bits);
            }
            Entry::Class(name_index) | Entry::String(name_index) | Entry::MethodType(name_index) => {
                out.put_short(*name_index);
            }
            Entry::Module(name_index) | Entry::Package(name_index) => {
                out.put_short(*name_index);
            }
            Entry::Fieldref(a, b)
            | Entry::Methodref(a, b)
            | Entry::InterfaceMethodref(a, b)
            | Entry::NameAndType(a, b)
            | Entry::Dynamic(a, b)
            | Entry::InvokeDynamic(a, b) => {
                out.put_short(*a);
                out.put_short(*b);
            }
            Entry::MethodHandle(kind, index) => {
                out.put_byte(*kind);
                out.put_short(*index);
            }
        }
        Ok(())
    }

    /// Serializes the `BootstrapMethods` attribute payload (everything after
    /// the 2-byte `num_bootstrap_methods` is included), or `None` if the
    /// table is empty and the attribute should be omitted entirely.
    pub fn serialize_bootstrap_methods(&self) -> Option<ByteVector> {
        if self.bootstrap_methods.is_empty() {
            return None;
        }
        let mut out = ByteVector::new();
        out.put_short(self.bootstrap_methods.len() as u16);
        for method in &self.bootstrap_methods {
            out.put_short(method.method_handle_index);
            out.put_short(method.arguments.len() as u16);
            for arg in &method.arguments {
                out.put_short(*arg);
            }
        }
        Some(out)
    }

    /// Reconstructs a `SymbolTable` from an existing class's raw constant
    /// pool bytes, preserving the original indices exactly. Used by
    /// `ClassReader`.
    pub(crate) fn read(
        major_version: u16,
        minor_version: u16,
        count: u16,
        read_entry: &mut dyn FnMut() -> Result<(u8, RawEntry)>,
    ) -> Result<Self> {
        let mut table = SymbolTable::new(major_version, minor_version);
        table.entries = vec![None; count as usize];
        let mut i = 1usize;
        while i < count as usize {
            let (tag, raw) = read_entry()?;
            let entry = raw.into_entry(tag)?;
            let slots = entry.slots();
            table.index_of.insert(entry.clone(), i as u16);
            table.entries[i] = Some(entry);
            i += slots as usize;
        }
        Ok(table)
    }
}

/// Raw, not-yet-typed payload for one constant pool entry as decoded by
/// `ClassReader`, passed to `SymbolTable::read` to be folded into an `Entry`.
pub(crate) enum RawEntry {
    Utf8(String),
    FourBytes(u32),
    EightBytes(u64),
    TwoIndices(u16, u16),
    OneIndex(u16),
    MethodHandle(u8, u16),
}

impl RawEntry {
    fn into_entry(self, tag: u8) -> Result<Entry> {
        Ok(match (tag, self) {
            (t, RawEntry::Utf8(s)) if t == tag::UTF8 => Entry::Utf8(s),
            (t, RawEntry::FourBytes(v)) if t == tag::INTEGER => Entry::Integer(v as i32),
            (t, RawEntry::FourBytes(v)) if t == tag::FLOAT => Entry::Float(v),
            (t, RawEntry::EightBytes(v)) if t == tag::LONG => Entry::Long(v as i64),
            (t, RawEntry::EightBytes(v)) if t == tag::DOUBLE => Entry::Double(v),
            (t, RawEntry::OneIndex(i)) if t == tag::CLASS => Entry::Class(i),
            (t, RawEntry::OneIndex(i)) if t == tag::STRING => Entry::String(i),
            (t, RawEntry::OneIndex(i)) if t == tag::METHOD_TYPE => Entry::MethodType(i),
            (t, RawEntry::OneIndex(i)) if t == tag::MODULE => Entry::Module(i),
            (t, RawEntry::OneIndex(i)) if t == tag::PACKAGE => Entry::Package(i),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::FIELDREF => Entry::Fieldref(a, b),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::METHODREF => Entry::Methodref(a, b),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::INTERFACE_METHODREF => Entry::InterfaceMethodref(a, b),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::NAME_AND_TYPE => Entry::NameAndType(a, b),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::DYNAMIC => Entry::Dynamic(a, b),
            (t, RawEntry::TwoIndices(a, b)) if t == tag::INVOKE_DYNAMIC => Entry::InvokeDynamic(a, b),
            (t, RawEntry::MethodHandle(kind, index)) if t == tag::METHOD_HANDLE => Entry::MethodHandle(kind, index),
            (t, _) => return Err(Error::format(format!("unrecognized or mismatched constant pool tag {t}"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_utf8_returns_same_index() {
        let mut t = SymbolTable::new(52, 0);
        let a = t.add_constant_utf8("hello").unwrap();
        let b = t.add_constant_utf8("hello").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn long_consumes_two_slots() {
        let mut t = SymbolTable::new(52, 0);
        let before = t.constant_pool_count();
        t.add_constant_long(42).unwrap();
        assert_eq!(t.constant_pool_count(), before + 2);
    }

    #[test]
    fn method_ref_interns_its_class_and_name_and_type() {
        let mut t = SymbolTable::new(52, 0);
        let r1 = t.add_constant_method_ref("pkg/Foo", "bar", "()V", false).unwrap();
        let r2 = t.add_constant_method_ref("pkg/Foo", "bar", "()V", false).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(t.member_ref(r1), Some(("pkg/Foo", "bar", "()V")));
    }

    #[test]
    fn bootstrap_methods_dedup_structurally() {
        let mut t = SymbolTable::new(55, 0);
        let a = t.add_bootstrap_method(3, &[5, 6]);
        let b = t.add_bootstrap_method(3, &[5, 6]);
        let c = t.add_bootstrap_method(3, &[5, 7]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn class_too_large_when_pool_would_overflow() {
        let mut t = SymbolTable::new(52, 0);
        t.entries.resize(MAX_POOL_SIZE, None);
        let err = t.add_constant_utf8("overflow").unwrap_err();
        assert!(matches!(err, Error::ClassTooLarge));
    }
}
