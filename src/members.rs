//! Resolved, identity-cached members (ECMA-335 table rows paired with their
//! decoded names and signatures). [`crate::module::Module`] hands these out
//! through [`crate::module::Module::lookup_member`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::signature::{FieldSig, MethodSig, PropertySig, TypeSig};
use crate::tables::{
    CodedIndex, EventAttributes, FieldAttributes, MethodAttributes, ParamAttributes,
    PropertyAttributes, TableId, TypeAttributes,
};
use crate::token::Token;

/// A `TypeRef` row resolved to its name parts and resolution scope.
#[derive(Debug, Clone)]
pub struct TypeReference {
    pub token: Token,
    pub resolution_scope: CodedIndex,
    pub name: String,
    pub namespace: Option<String>,
}

/// A `TypeDef` row resolved to its name parts, base type, and member ranges.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub token: Token,
    pub flags: TypeAttributes,
    pub name: String,
    pub namespace: Option<String>,
    pub extends: CodedIndex,
    /// RID run in the `Field` table this type owns.
    pub fields: crate::token::MetadataRange,
    /// RID run in the `MethodDef` table this type owns.
    pub methods: crate::token::MetadataRange,
    /// The enclosing type, if this type is nested (`NestedClass` table).
    pub enclosing_type: Option<Token>,
}

impl TypeDefinition {
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.enclosing_type.is_some()
    }
}

/// A `Field` row resolved to its name, signature, and declaring type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub token: Token,
    pub flags: FieldAttributes,
    pub name: String,
    pub signature: FieldSig,
    pub declaring_type: Option<Token>,
}

/// A `MethodDef` row resolved to its name, signature, and parameter range.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub token: Token,
    pub flags: MethodAttributes,
    pub impl_flags: u16,
    pub rva: u32,
    pub name: String,
    pub signature: MethodSig,
    /// RID run in the `Param` table this method owns.
    pub params: crate::token::MetadataRange,
    pub declaring_type: Option<Token>,
}

/// A `Param` row resolved to its name and declaring method.
#[derive(Debug, Clone)]
pub struct ParamDefinition {
    pub token: Token,
    pub flags: ParamAttributes,
    pub sequence: u16,
    pub name: String,
    pub declaring_method: Option<Token>,
}

/// A `MemberRef` row. `class` names a `TypeDef`/`TypeRef`/`ModuleRef`/
/// `MethodDef`/`TypeSpec`; the raw signature blob is left undecoded since
/// whether it's a method or field signature depends on the caller's
/// context, not on anything this row carries.
#[derive(Debug, Clone)]
pub struct MemberReference {
    pub token: Token,
    pub class: CodedIndex,
    pub name: String,
    pub signature: Vec<u8>,
}

/// A `Property` row resolved to its name, signature, and declaring type.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub token: Token,
    pub flags: PropertyAttributes,
    pub name: String,
    pub signature: PropertySig,
    pub declaring_type: Option<Token>,
}

/// An `Event` row resolved to its name, event type, and declaring type.
#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub token: Token,
    pub flags: EventAttributes,
    pub name: String,
    pub event_type: CodedIndex,
    pub declaring_type: Option<Token>,
}

/// A `ModuleRef` row.
#[derive(Debug, Clone)]
pub struct ModuleReference {
    pub token: Token,
    pub name: String,
}

/// An `AssemblyRef` row.
#[derive(Debug, Clone)]
pub struct AssemblyReference {
    pub token: Token,
    pub name: String,
    pub version: (u16, u16, u16, u16),
    pub culture: Option<String>,
    pub public_key_or_token: Vec<u8>,
}

/// A `TypeSpec` row, decoded to its (possibly still TypeSpec-referencing)
/// signature. Use [`crate::module::Module::resolve_type_spec`] to expand
/// nested `TypeSpec` references with cycle protection.
#[derive(Debug, Clone)]
pub struct TypeSpecification {
    pub token: Token,
    pub signature: TypeSig,
}

/// Any resolvable metadata member, keyed by its [`Token`].
#[derive(Debug, Clone)]
pub enum Member {
    TypeRef(TypeReference),
    TypeDef(TypeDefinition),
    Field(FieldDefinition),
    MethodDef(MethodDefinition),
    Param(ParamDefinition),
    MemberRef(MemberReference),
    Property(PropertyDefinition),
    Event(EventDefinition),
    ModuleRef(ModuleReference),
    AssemblyRef(AssemblyReference),
    TypeSpec(TypeSpecification),
}

impl Member {
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            Self::TypeRef(m) => m.token,
            Self::TypeDef(m) => m.token,
            Self::Field(m) => m.token,
            Self::MethodDef(m) => m.token,
            Self::Param(m) => m.token,
            Self::MemberRef(m) => m.token,
            Self::Property(m) => m.token,
            Self::Event(m) => m.token,
            Self::ModuleRef(m) => m.token,
            Self::AssemblyRef(m) => m.token,
            Self::TypeSpec(m) => m.token,
        }
    }
}

/// Identity cache from [`Token`] to the `Arc<Member>` it resolved to. Backed
/// by a single mutex over a map-of-maps rather than one mutex per table:
/// construction of any single member is cheap (a handful of heap/blob
/// lookups), so lock contention across tables isn't worth the extra
/// bookkeeping.
#[derive(Debug, Default)]
pub struct MemberCache {
    entries: Mutex<HashMap<TableId, HashMap<u32, Arc<Member>>>>,
}

impl MemberCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached member for `token` if present, without building it.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<Arc<Member>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&token.table())?.get(&token.rid()).cloned()
    }

    /// Return the cached member for `token`, building and inserting it via
    /// `build` on a miss. `build` runs while the table's slot may be
    /// re-entered concurrently by another thread; both threads may build
    /// the same member once, but only one `Arc` survives in the cache.
    pub fn get_or_insert_with<E>(
        &self,
        token: Token,
        build: impl FnOnce() -> Result<Member, E>,
    ) -> Result<Arc<Member>, E> {
        if let Some(existing) = self.get(token) {
            return Ok(existing);
        }
        let member = Arc::new(build()?);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let slot = entries
            .entry(token.table())
            .or_default()
            .entry(token.rid())
            .or_insert_with(|| member.clone());
        Ok(slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableId;

    #[test]
    fn cache_returns_same_arc_on_repeated_lookup() {
        let cache = MemberCache::new();
        let token = Token::new(TableId::TypeRef, 1);
        let built = cache
            .get_or_insert_with::<crate::error::Error>(token, || {
                Ok(Member::TypeRef(TypeReference {
                    token,
                    resolution_scope: CodedIndex::null(),
                    name: "Foo".into(),
                    namespace: None,
                }))
            })
            .unwrap();
        let cached = cache.get(token).unwrap();
        assert!(Arc::ptr_eq(&built, &cached));
    }

    #[test]
    fn cache_does_not_rebuild_on_second_insert_call() {
        let cache = MemberCache::new();
        let token = Token::new(TableId::TypeRef, 2);
        let first = cache
            .get_or_insert_with::<crate::error::Error>(token, || {
                Ok(Member::TypeRef(TypeReference {
                    token,
                    resolution_scope: CodedIndex::null(),
                    name: "A".into(),
                    namespace: None,
                }))
            })
            .unwrap();
        let second = cache
            .get_or_insert_with::<crate::error::Error>(token, || {
                Ok(Member::TypeRef(TypeReference {
                    token,
                    resolution_scope: CodedIndex::null(),
                    name: "B".into(),
                    namespace: None,
                }))
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        if let Member::TypeRef(t) = &*second {
            assert_eq!(t.name, "A");
        } else {
            panic!("expected TypeRef");
        }
    }
}
