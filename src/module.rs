//! The module facade: a single entry point over a parsed [`Metadata`] image
//! that resolves tokens to cached [`Member`]s, decodes heap strings, and
//! exposes the handful of higher-level queries (top-level types, assembly
//! references, corlib discovery) that don't belong on the raw row tables.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::members::{
    AssemblyReference, EventDefinition, FieldDefinition, Member, MemberCache, MemberReference,
    MethodDefinition, ModuleReference, ParamDefinition, PropertyDefinition, TypeDefinition,
    TypeReference, TypeSpecification,
};
use crate::metadata::Metadata;
use crate::range::{MemberRangeResolver, RangeBuild};
use crate::signature::{ElementType, FieldSig, MethodSig, PropertySig, RecursionProtection, TypeSig};
use crate::tables::{CodedIndex, CodedIndexKind, TableId};
use crate::token::{MetadataRange, Token};

/// Names a well-known corlib assembly may be published under, in no
/// particular preference order; among all matches the one with the
/// greatest version wins (see [`Module::corlib_reference`]).
const CORLIB_NAMES: &[&str] = &[
    "mscorlib",
    "System.Private.CoreLib",
    "System.Runtime",
    "netstandard",
];

/// Either an `AssemblyRef` this image names as corlib, or a signal that the
/// image's own `Assembly` row already is corlib (self-hosting, e.g. when
/// parsing mscorlib.dll itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorlibReference {
    AssemblyRef(Token),
    CurrentAssembly,
}

/// A parsed metadata image plus the lazily-built, thread-safe caches that
/// make repeated member/range/string lookups cheap.
#[derive(Debug)]
pub struct Module {
    metadata: Metadata,
    field_range: MemberRangeResolver,
    method_range: MemberRangeResolver,
    param_range: MemberRangeResolver,
    property_range: MemberRangeResolver,
    event_range: MemberRangeResolver,
    nested: OnceLock<HashMap<u32, u32>>,
    cache: MemberCache,
}

impl Module {
    #[must_use]
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            field_range: MemberRangeResolver::new(TableId::Field),
            method_range: MemberRangeResolver::new(TableId::MethodDef),
            param_range: MemberRangeResolver::new(TableId::Param),
            property_range: MemberRangeResolver::new(TableId::Property),
            event_range: MemberRangeResolver::new(TableId::Event),
            nested: OnceLock::new(),
            cache: MemberCache::new(),
        }
    }

    /// Parse a metadata blob and wrap it in a facade.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self::new(Metadata::parse(data)?))
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    // ---- member ranges -------------------------------------------------

    #[must_use]
    pub fn field_range(&self, type_rid: u32) -> MetadataRange {
        self.field_range.range_for_owner(type_rid, || {
            identity_owner_build(
                &self.metadata.type_defs,
                self.metadata.fields.len() as u32,
                |r| r.field_list,
            )
        })
    }

    #[must_use]
    pub fn method_range(&self, type_rid: u32) -> MetadataRange {
        self.method_range.range_for_owner(type_rid, || {
            identity_owner_build(
                &self.metadata.type_defs,
                self.metadata.method_defs.len() as u32,
                |r| r.method_list,
            )
        })
    }

    #[must_use]
    pub fn param_range(&self, method_rid: u32) -> MetadataRange {
        self.param_range.range_for_owner(method_rid, || {
            identity_owner_build(
                &self.metadata.method_defs,
                self.metadata.params.len() as u32,
                |r| r.param_list,
            )
        })
    }

    #[must_use]
    pub fn property_range(&self, type_rid: u32) -> MetadataRange {
        self.property_range.range_for_owner(type_rid, || RangeBuild {
            owner_count: self.metadata.property_maps.len() as u32,
            target_count: self.metadata.properties.len() as u32,
            start_of: {
                let rows = self.metadata.property_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].property_list)
            },
            owner_of_row: {
                let rows = self.metadata.property_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].parent)
            },
        })
    }

    #[must_use]
    pub fn event_range(&self, type_rid: u32) -> MetadataRange {
        self.event_range.range_for_owner(type_rid, || RangeBuild {
            owner_count: self.metadata.event_maps.len() as u32,
            target_count: self.metadata.events.len() as u32,
            start_of: {
                let rows = self.metadata.event_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].event_list)
            },
            owner_of_row: {
                let rows = self.metadata.event_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].parent)
            },
        })
    }

    fn owner_of_field(&self, field_rid: u32) -> Option<u32> {
        self.field_range.owner_of(field_rid, || {
            identity_owner_build(
                &self.metadata.type_defs,
                self.metadata.fields.len() as u32,
                |r| r.field_list,
            )
        })
    }

    fn owner_of_method(&self, method_rid: u32) -> Option<u32> {
        self.method_range.owner_of(method_rid, || {
            identity_owner_build(
                &self.metadata.type_defs,
                self.metadata.method_defs.len() as u32,
                |r| r.method_list,
            )
        })
    }

    fn owner_of_param(&self, param_rid: u32) -> Option<u32> {
        self.param_range.owner_of(param_rid, || {
            identity_owner_build(
                &self.metadata.method_defs,
                self.metadata.params.len() as u32,
                |r| r.param_list,
            )
        })
    }

    fn owner_of_property(&self, property_rid: u32) -> Option<u32> {
        self.property_range.owner_of(property_rid, || RangeBuild {
            owner_count: self.metadata.property_maps.len() as u32,
            target_count: self.metadata.properties.len() as u32,
            start_of: {
                let rows = self.metadata.property_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].property_list)
            },
            owner_of_row: {
                let rows = self.metadata.property_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].parent)
            },
        })
    }

    fn owner_of_event(&self, event_rid: u32) -> Option<u32> {
        self.event_range.owner_of(event_rid, || RangeBuild {
            owner_count: self.metadata.event_maps.len() as u32,
            target_count: self.metadata.events.len() as u32,
            start_of: {
                let rows = self.metadata.event_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].event_list)
            },
            owner_of_row: {
                let rows = self.metadata.event_maps.clone();
                Box::new(move |k| rows[(k - 1) as usize].parent)
            },
        })
    }

    // ---- nested types ----------------------------------------------------

    fn nested_map(&self) -> &HashMap<u32, u32> {
        self.nested.get_or_init(|| {
            self.metadata
                .nested_classes
                .iter()
                .map(|row| (row.nested_class, row.enclosing_class))
                .collect()
        })
    }

    /// The `TypeDef` RIDs that are not nested inside any other type,
    /// excluding RID 1, the `<Module>` pseudo-type.
    #[must_use]
    pub fn top_level_types(&self) -> Vec<Token> {
        let nested = self.nested_map();
        (2..=self.metadata.type_defs.len() as u32)
            .filter(|rid| !nested.contains_key(rid))
            .map(|rid| Token::new(TableId::TypeDef, rid))
            .collect()
    }

    // ---- heap strings ----------------------------------------------------

    /// Decode the string at `offset` in `#Strings`, erroring on a missing
    /// null terminator or invalid UTF-8. Unlike [`Self::try_lookup_string`],
    /// an offset past the end of the heap is also an error here.
    pub fn lookup_string(&self, offset: u32) -> Result<String> {
        self.try_lookup_string(offset)?
            .ok_or_else(|| Error::MalformedImage(format!("string offset {offset} out of range")))
    }

    /// Decode the string at `offset` in `#Strings`. Returns `Ok(None)` only
    /// for an offset past the end of the heap; a present-but-malformed
    /// entry is still an error. This is the corrected contract: earlier
    /// drafts of this crate had the `Ok`/`Err` halves of this check
    /// swapped, turning every malformed entry into a silent `None`.
    pub fn try_lookup_string(&self, offset: u32) -> Result<Option<String>> {
        Ok(self.metadata.strings.get(offset)?.map(str::to_owned))
    }

    /// Decode the user string at `rid` in `#US`.
    pub fn lookup_user_string(&self, rid: u32) -> Result<String> {
        self.try_lookup_user_string(rid)?
            .ok_or_else(|| Error::MalformedImage(format!("user string rid {rid} out of range")))
    }

    pub fn try_lookup_user_string(&self, rid: u32) -> Result<Option<String>> {
        self.metadata.user_strings.get(rid)
    }

    // ---- coded index facade ----------------------------------------------

    /// Decode a coded index value for `kind`, failing on an unrecognized
    /// tag (see [`CodedIndex::try_decode`]).
    pub fn decode_coded_index(&self, kind: CodedIndexKind, value: u32) -> Result<CodedIndex> {
        CodedIndex::try_decode(kind, value)
    }

    /// Encode a coded index back to its wire value for `kind`.
    #[must_use]
    pub fn encode_coded_index(&self, kind: CodedIndexKind, index: CodedIndex) -> u32 {
        index.encode(kind)
    }

    /// The on-disk width (2 or 4 bytes) a coded index of `kind` uses in
    /// this image.
    #[must_use]
    pub fn coded_index_width(&self, kind: CodedIndexKind) -> usize {
        let ctx = self.metadata.tables_header.context();
        ctx.coded_index_size(kind)
    }

    // ---- member resolution -------------------------------------------------

    /// Resolve `token` to its member, failing if the token names a row this
    /// image doesn't have (including nil tokens and unsupported tables).
    pub fn lookup_member(&self, token: Token) -> Result<std::sync::Arc<Member>> {
        self.try_lookup_member(token)?.ok_or_else(|| {
            Error::TokenOutOfRange {
                token: token.to_u32(),
                table: token.table().name(),
                row_count: self.row_count(token.table()),
            }
        })
    }

    /// Resolve `token` to its member. Returns `Ok(None)` for a nil token or
    /// a table this crate doesn't resolve members for; a non-nil RID past
    /// the table's row count is still an error.
    pub fn try_lookup_member(&self, token: Token) -> Result<Option<std::sync::Arc<Member>>> {
        if token.is_nil() {
            return Ok(None);
        }
        let row_count = self.row_count(token.table());
        if token.rid() > row_count {
            return Err(Error::TokenOutOfRange {
                token: token.to_u32(),
                table: token.table().name(),
                row_count,
            });
        }

        let member = self
            .cache
            .get_or_insert_with(token, || self.build_member(token))?;
        Ok(Some(member))
    }

    fn row_count(&self, table: TableId) -> u32 {
        self.metadata.tables_header.row_count(table)
    }

    fn build_member(&self, token: Token) -> Result<Member> {
        let rid = token.rid();
        let idx = (rid - 1) as usize;

        match token.table() {
            TableId::TypeRef => {
                let row = &self.metadata.type_refs[idx];
                Ok(Member::TypeRef(TypeReference {
                    token,
                    resolution_scope: row.resolution_scope,
                    name: self.lookup_string(row.type_name)?,
                    namespace: self.optional_string(row.type_namespace)?,
                }))
            }
            TableId::TypeDef => {
                let row = &self.metadata.type_defs[idx];
                Ok(Member::TypeDef(TypeDefinition {
                    token,
                    flags: row.flags,
                    name: self.lookup_string(row.type_name)?,
                    namespace: self.optional_string(row.type_namespace)?,
                    extends: row.extends,
                    fields: self.field_range(rid),
                    methods: self.method_range(rid),
                    enclosing_type: self
                        .nested_map()
                        .get(&rid)
                        .map(|&enclosing| Token::new(TableId::TypeDef, enclosing)),
                }))
            }
            TableId::Field => {
                let row = &self.metadata.fields[idx];
                let blob = self.blob(row.signature)?;
                Ok(Member::Field(FieldDefinition {
                    token,
                    flags: row.flags,
                    name: self.lookup_string(row.name)?,
                    signature: FieldSig::parse_blob(blob)?,
                    declaring_type: self
                        .owner_of_field(rid)
                        .map(|owner| Token::new(TableId::TypeDef, owner)),
                }))
            }
            TableId::MethodDef => {
                let row = &self.metadata.method_defs[idx];
                let blob = self.blob(row.signature)?;
                Ok(Member::MethodDef(MethodDefinition {
                    token,
                    flags: row.flags,
                    impl_flags: row.impl_flags,
                    rva: row.rva,
                    name: self.lookup_string(row.name)?,
                    signature: MethodSig::parse_blob(blob)?,
                    params: self.param_range(rid),
                    declaring_type: self
                        .owner_of_method(rid)
                        .map(|owner| Token::new(TableId::TypeDef, owner)),
                }))
            }
            TableId::Param => {
                let row = &self.metadata.params[idx];
                Ok(Member::Param(ParamDefinition {
                    token,
                    flags: row.flags,
                    sequence: row.sequence,
                    name: self.lookup_string(row.name)?,
                    declaring_method: self
                        .owner_of_param(rid)
                        .map(|owner| Token::new(TableId::MethodDef, owner)),
                }))
            }
            TableId::MemberRef => {
                let row = &self.metadata.member_refs[idx];
                Ok(Member::MemberRef(MemberReference {
                    token,
                    class: row.class,
                    name: self.lookup_string(row.name)?,
                    signature: self.blob(row.signature)?.to_vec(),
                }))
            }
            TableId::Property => {
                let row = &self.metadata.properties[idx];
                let blob = self.blob(row.property_type)?;
                Ok(Member::Property(PropertyDefinition {
                    token,
                    flags: row.flags,
                    name: self.lookup_string(row.name)?,
                    signature: PropertySig::parse_blob(blob)?,
                    declaring_type: self
                        .owner_of_property(rid)
                        .map(|owner| Token::new(TableId::TypeDef, owner)),
                }))
            }
            TableId::Event => {
                let row = &self.metadata.events[idx];
                Ok(Member::Event(EventDefinition {
                    token,
                    flags: row.event_flags,
                    name: self.lookup_string(row.name)?,
                    event_type: row.event_type,
                    declaring_type: self
                        .owner_of_event(rid)
                        .map(|owner| Token::new(TableId::TypeDef, owner)),
                }))
            }
            TableId::ModuleRef => {
                let row = &self.metadata.module_refs[idx];
                Ok(Member::ModuleRef(ModuleReference {
                    token,
                    name: self.lookup_string(row.name)?,
                }))
            }
            TableId::AssemblyRef => {
                let row = &self.metadata.assembly_refs[idx];
                Ok(Member::AssemblyRef(AssemblyReference {
                    token,
                    name: self.lookup_string(row.name)?,
                    version: (
                        row.major_version,
                        row.minor_version,
                        row.build_number,
                        row.revision_number,
                    ),
                    culture: self.optional_string(row.culture)?,
                    public_key_or_token: self.blob(row.public_key_or_token)?.to_vec(),
                }))
            }
            TableId::TypeSpec => {
                let row = &self.metadata.type_specs[idx];
                let blob = self.blob(row.signature)?;
                let mut reader = crate::reader::Reader::new(blob);
                Ok(Member::TypeSpec(TypeSpecification {
                    token,
                    signature: TypeSig::parse(&mut reader)?,
                }))
            }
            other => Err(Error::MemberResolution(format!(
                "member resolution for table {other} is not supported"
            ))),
        }
    }

    fn blob(&self, offset: u32) -> Result<&[u8]> {
        self.metadata
            .blobs
            .get(offset)?
            .ok_or_else(|| Error::MalformedImage(format!("blob offset {offset} out of range")))
    }

    fn optional_string(&self, offset: u32) -> Result<Option<String>> {
        if offset == 0 {
            return Ok(None);
        }
        Ok(Some(self.lookup_string(offset)?))
    }

    // ---- TypeSpec expansion ----------------------------------------------

    /// Fully expand `rid`'s `TypeSpec` signature, recursively resolving any
    /// nested `TypeSpec` references it contains. `guard` detects a
    /// `TypeSpec` that (directly or transitively) references itself.
    pub fn resolve_type_spec(&self, rid: u32, guard: &mut RecursionProtection) -> Result<TypeSig> {
        guard.enter(rid)?;
        let idx = (rid - 1) as usize;
        let row = self
            .metadata
            .type_specs
            .get(idx)
            .ok_or(Error::RowIndexOutOfBounds {
                table: "TypeSpec",
                index: rid,
                max: self.metadata.type_specs.len() as u32,
            })?;
        let blob = self.blob(row.signature)?;
        let mut reader = crate::reader::Reader::new(blob);
        let sig = TypeSig::parse(&mut reader)?;
        let expanded = self.expand_type_spec_refs(sig, guard)?;
        guard.exit(rid);
        Ok(expanded)
    }

    fn expand_type_spec_refs(&self, sig: TypeSig, guard: &mut RecursionProtection) -> Result<TypeSig> {
        let expand_coded = |this: &Self, value: u32, guard: &mut RecursionProtection| -> Result<TypeSig> {
            let coded = CodedIndex::try_decode(CodedIndexKind::TypeDefOrRef, value)?;
            match coded.table {
                Some(TableId::TypeSpec) => this.resolve_type_spec(coded.row, guard),
                _ => Ok(if coded.table == Some(TableId::TypeDef) {
                    TypeSig::ValueType(value)
                } else {
                    TypeSig::Class(value)
                }),
            }
        };

        Ok(match sig {
            TypeSig::Class(v) => expand_coded(self, v, guard)?,
            TypeSig::ValueType(v) => expand_coded(self, v, guard)?,
            TypeSig::SzArray(inner) => {
                TypeSig::SzArray(Box::new(self.expand_type_spec_refs(*inner, guard)?))
            }
            TypeSig::Array {
                element_type,
                rank,
                sizes,
                lo_bounds,
            } => TypeSig::Array {
                element_type: Box::new(self.expand_type_spec_refs(*element_type, guard)?),
                rank,
                sizes,
                lo_bounds,
            },
            TypeSig::Ptr(inner) => TypeSig::Ptr(Box::new(self.expand_type_spec_refs(*inner, guard)?)),
            TypeSig::ByRef(inner) => {
                TypeSig::ByRef(Box::new(self.expand_type_spec_refs(*inner, guard)?))
            }
            TypeSig::GenericInst {
                is_value_type,
                type_ref,
                type_args,
            } => {
                let mut expanded_args = Vec::with_capacity(type_args.len());
                for arg in type_args {
                    expanded_args.push(self.expand_type_spec_refs(arg, guard)?);
                }
                TypeSig::GenericInst {
                    is_value_type,
                    type_ref,
                    type_args: expanded_args,
                }
            }
            TypeSig::Modified {
                required,
                modifier,
                inner,
            } => TypeSig::Modified {
                required,
                modifier,
                inner: Box::new(self.expand_type_spec_refs(*inner, guard)?),
            },
            TypeSig::Pinned(inner) => {
                TypeSig::Pinned(Box::new(self.expand_type_spec_refs(*inner, guard)?))
            }
            // Primitives, Var/MVar, and FnPtr carry no TypeDefOrRef coded
            // index that could itself be a TypeSpec.
            other => other,
        })
    }

    /// Resolve the primitive [`ElementType`] a local `TypeDef`'s enum value
    /// is backed by, for decoding `Class`/`ValueType`-kinded custom
    /// attribute arguments. Only local `TypeDef` targets are supported;
    /// resolving a `TypeRef`/`TypeSpec` would require cross-assembly
    /// resolution, which is out of scope.
    pub fn resolve_enum_underlying_element_type(&self, coded: CodedIndex) -> Result<ElementType> {
        let Some(TableId::TypeDef) = coded.table else {
            return Err(Error::MemberResolution(
                "enum underlying type resolution is only supported for local TypeDef targets"
                    .into(),
            ));
        };
        for field_token in self.field_range(coded.row) {
            let Member::Field(field) = &*self.lookup_member(field_token)? else {
                continue;
            };
            if field.flags.contains(crate::tables::FieldAttributes::STATIC) {
                continue;
            }
            if let TypeSig::Primitive(elem) = field.signature.field_type {
                return Ok(elem);
            }
        }
        Err(Error::MemberResolution(format!(
            "no instance field found to determine underlying type of TypeDef[{:08X}]",
            coded.row
        )))
    }

    // ---- module identity / assembly references ---------------------------

    #[must_use]
    pub fn name(&self) -> Result<Option<String>> {
        match self.metadata.modules.first() {
            Some(row) => self.optional_string(row.name),
            None => Ok(None),
        }
    }

    #[must_use]
    pub fn mvid(&self) -> Result<Option<[u8; 16]>> {
        match self.metadata.modules.first() {
            Some(row) if row.mvid != 0 => Ok(Some(self.metadata.guids.get(row.mvid)?)),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn enc_id(&self) -> Result<Option<[u8; 16]>> {
        match self.metadata.modules.first() {
            Some(row) if row.enc_id != 0 => Ok(Some(self.metadata.guids.get(row.enc_id)?)),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn enc_base_id(&self) -> Result<Option<[u8; 16]>> {
        match self.metadata.modules.first() {
            Some(row) if row.enc_base_id != 0 => {
                Ok(Some(self.metadata.guids.get(row.enc_base_id)?))
            }
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn assembly_references(&self) -> Vec<Token> {
        (1..=self.metadata.assembly_refs.len() as u32)
            .map(|rid| Token::new(TableId::AssemblyRef, rid))
            .collect()
    }

    /// Find the reference to the platform's base class library, preferring
    /// the greatest version among any row whose name matches a known corlib
    /// name. If this image's own `Assembly` row carries a known corlib
    /// name, that's returned instead (self-hosting).
    pub fn corlib_reference(&self) -> Result<Option<CorlibReference>> {
        if let Some(assembly) = self.metadata.assemblies.first() {
            let name = self.lookup_string(assembly.name)?;
            if CORLIB_NAMES.contains(&name.as_str()) {
                return Ok(Some(CorlibReference::CurrentAssembly));
            }
        }

        let mut best: Option<(Token, (u16, u16, u16, u16))> = None;
        for (i, row) in self.metadata.assembly_refs.iter().enumerate() {
            let name = self.lookup_string(row.name)?;
            if !CORLIB_NAMES.contains(&name.as_str()) {
                continue;
            }
            let version = (
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            );
            let token = Token::new(TableId::AssemblyRef, (i + 1) as u32);
            if best.is_none_or(|(_, best_version)| version > best_version) {
                best = Some((token, version));
            }
        }

        Ok(best.map(|(token, _)| CorlibReference::AssemblyRef(token)))
    }
}

/// Build a [`RangeBuild`] for an owning relation where the owner row's own
/// RID is the owner RID (TypeDef->Field/MethodDef, MethodDef->Param) rather
/// than an indirection through a `.parent` column.
fn identity_owner_build<T>(
    rows: &[T],
    target_count: u32,
    start_of: impl Fn(&T) -> u32 + 'static,
) -> RangeBuild
where
    T: Clone + 'static,
{
    let rows = rows.to_vec();
    let owner_count = rows.len() as u32;
    RangeBuild {
        owner_count,
        target_count,
        start_of: Box::new(move |k| start_of(&rows[(k - 1) as usize])),
        owner_of_row: Box::new(|k| k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corlib_names_cover_known_bcl_assemblies() {
        assert!(CORLIB_NAMES.contains(&"mscorlib"));
        assert!(CORLIB_NAMES.contains(&"System.Private.CoreLib"));
    }
}
