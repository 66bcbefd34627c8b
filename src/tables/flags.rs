//! Typed flag sets for the row columns that the ECMA-335 tables leave as
//! bare integers (`TypeDef.Flags`, `Field.Flags`, ...).

use bitflags::bitflags;

bitflags! {
    /// `TypeDef.Flags` (ECMA-335 §II.23.1.15).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeAttributes: u32 {
        const VISIBILITY_MASK = 0x0000_0007;
        const NOT_PUBLIC = 0x0000_0000;
        const PUBLIC = 0x0000_0001;
        const NESTED_PUBLIC = 0x0000_0002;
        const NESTED_PRIVATE = 0x0000_0003;
        const NESTED_FAMILY = 0x0000_0004;
        const NESTED_ASSEMBLY = 0x0000_0005;
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;

        const LAYOUT_MASK = 0x0000_0018;
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        const EXPLICIT_LAYOUT = 0x0000_0010;

        const CLASS_SEMANTICS_MASK = 0x0000_0020;
        const INTERFACE = 0x0000_0020;

        const ABSTRACT = 0x0000_0080;
        const SEALED = 0x0000_0100;
        const SPECIAL_NAME = 0x0000_0400;

        const IMPORT = 0x0000_1000;
        const SERIALIZABLE = 0x0000_2000;

        const STRING_FORMAT_MASK = 0x0003_0000;
        const UNICODE_CLASS = 0x0001_0000;
        const AUTO_CLASS = 0x0002_0000;
        const CUSTOM_FORMAT_CLASS = 0x0003_0000;

        const BEFORE_FIELD_INIT = 0x0010_0000;
        const RT_SPECIAL_NAME = 0x0000_0800;
        const HAS_SECURITY = 0x0004_0000;
        const IS_TYPE_FORWARDER = 0x0020_0000;
    }
}

impl TypeAttributes {
    /// True for any of the four "nested" visibility values.
    #[must_use]
    pub const fn is_nested(self) -> bool {
        (self.bits() & Self::VISIBILITY_MASK.bits()) >= Self::NESTED_PUBLIC.bits()
    }
}

bitflags! {
    /// `Field.Flags` (ECMA-335 §II.23.1.5).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldAttributes: u16 {
        const FIELD_ACCESS_MASK = 0x0007;
        const PRIVATE_SCOPE = 0x0000;
        const PRIVATE = 0x0001;
        const FAM_AND_ASSEM = 0x0002;
        const ASSEMBLY = 0x0003;
        const FAMILY = 0x0004;
        const FAM_OR_ASSEM = 0x0005;
        const PUBLIC = 0x0006;

        const STATIC = 0x0010;
        const INIT_ONLY = 0x0020;
        const LITERAL = 0x0040;
        const NOT_SERIALIZED = 0x0080;
        const SPECIAL_NAME = 0x0200;

        const PINVOKE_IMPL = 0x2000;

        const RT_SPECIAL_NAME = 0x0400;
        const HAS_FIELD_MARSHAL = 0x1000;
        const HAS_DEFAULT = 0x8000;
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    /// `MethodDef.Flags` (ECMA-335 §II.23.1.10).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodAttributes: u16 {
        const MEMBER_ACCESS_MASK = 0x0007;
        const PRIVATE_SCOPE = 0x0000;
        const PRIVATE = 0x0001;
        const FAM_AND_ASSEM = 0x0002;
        const ASSEMBLY = 0x0003;
        const FAMILY = 0x0004;
        const FAM_OR_ASSEM = 0x0005;
        const PUBLIC = 0x0006;

        const STATIC = 0x0010;
        const FINAL = 0x0020;
        const VIRTUAL = 0x0040;
        const HIDE_BY_SIG = 0x0080;

        const VTABLE_LAYOUT_MASK = 0x0100;
        const NEW_SLOT = 0x0100;

        const STRICT = 0x0200;
        const ABSTRACT = 0x0400;
        const SPECIAL_NAME = 0x0800;

        const PINVOKE_IMPL = 0x2000;
        const UNMANAGED_EXPORT = 0x0008;

        const RT_SPECIAL_NAME = 0x1000;
        const HAS_SECURITY = 0x4000;
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// `Param.Flags` (ECMA-335 §II.23.1.13).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParamAttributes: u16 {
        const IN = 0x0001;
        const OUT = 0x0002;
        const OPTIONAL = 0x0010;
        const HAS_DEFAULT = 0x1000;
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    /// `Event.EventFlags` (ECMA-335 §II.23.1.4).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventAttributes: u16 {
        const SPECIAL_NAME = 0x0200;
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// `Property.Flags` (ECMA-335 §II.23.1.14).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PropertyAttributes: u16 {
        const SPECIAL_NAME = 0x0200;
        const RT_SPECIAL_NAME = 0x0400;
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// `MethodSemantics.Semantics` (ECMA-335 §II.23.1.12).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodSemanticsAttributes: u16 {
        const SETTER = 0x0001;
        const GETTER = 0x0002;
        const OTHER = 0x0004;
        const ADD_ON = 0x0008;
        const REMOVE_ON = 0x0010;
        const FIRE = 0x0020;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_attributes_nested_detection() {
        assert!(!TypeAttributes::PUBLIC.is_nested());
        assert!(TypeAttributes::NESTED_PUBLIC.is_nested());
        assert!(TypeAttributes::NESTED_FAM_OR_ASSEM.is_nested());
    }

    #[test]
    fn field_attributes_access_mask() {
        let flags = FieldAttributes::PUBLIC | FieldAttributes::STATIC;
        assert!(flags.contains(FieldAttributes::STATIC));
        assert_eq!(
            flags.bits() & FieldAttributes::FIELD_ACCESS_MASK.bits(),
            FieldAttributes::PUBLIC.bits()
        );
    }

    #[test]
    fn method_semantics_combination() {
        let flags = MethodSemanticsAttributes::GETTER | MethodSemanticsAttributes::SETTER;
        assert!(flags.contains(MethodSemanticsAttributes::GETTER));
        assert!(flags.contains(MethodSemanticsAttributes::SETTER));
        assert!(!flags.contains(MethodSemanticsAttributes::OTHER));
    }
}
