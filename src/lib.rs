//! # cilmeta
//!
//! ECMA-335 CLI/.NET metadata resolution core: tables, heaps, signatures, and
//! the lazy member graph embedded in a .NET PE image's metadata root.
//!
//! This crate is PE-agnostic: it works with the raw metadata bytes handed to
//! it by whatever reads the containing PE file.
//!
//! ## Features
//!
//! - Parse the BSJB metadata root and stream headers.
//! - Access the four heaps: #Strings, #US, #GUID, #Blob.
//! - Parse every ECMA-335 metadata table via the `#~` compressed tables
//!   stream: Module, TypeDef, TypeRef, MethodDef, Assembly, AssemblyRef, etc.
//! - Resolve tokens to cached, `Arc`-identical member objects through
//!   [`Module`].
//! - Decode method/field/property/local-variable signatures and
//!   custom-attribute element values.
//!
//! ## Example
//!
//! ```ignore
//! use cilmeta::Module;
//!
//! let module = Module::parse(&metadata_bytes)?;
//! for token in module.top_level_types() {
//!     let member = module.lookup_member(token)?;
//!     println!("{member:?}");
//! }
//! ```

pub mod error;
pub mod heaps;
pub mod members;
pub mod metadata;
pub mod module;
pub mod range;
pub mod reader;
pub mod root;
pub mod signature;
pub mod stream;
pub mod tables;
pub mod token;
pub mod writer;

// Re-export main types
pub use error::{Error, Result};
pub use members::{
    AssemblyReference, EventDefinition, FieldDefinition, Member, MemberCache, MemberReference,
    MethodDefinition, ModuleReference, ParamDefinition, PropertyDefinition, TypeDefinition,
    TypeReference, TypeSpecification,
};
pub use metadata::Metadata;
pub use module::{CorlibReference, Module};
pub use signature::{
    CallingConvention, ElementType, ElementValue, FieldSig, LocalVarSig, MethodSig,
    PropertySig, RecursionProtection, TypeSig,
};
pub use token::{MetadataRange, Token};
pub use root::MetadataRoot;
pub use stream::StreamHeader;

// Re-export heaps
pub use heaps::{BlobHeap, GuidHeap, StringsHeap, UserStringsHeap};

// Re-export tables
pub use tables::{CodedIndex, CodedIndexKind, TableId, TablesHeader};

// Re-export table rows
pub use tables::{
    AssemblyRefRow, AssemblyRow, ClassLayoutRow, ConstantRow, CustomAttributeRow, DeclSecurityRow,
    EventMapRow, EventRow, FieldLayoutRow, FieldMarshalRow, FieldRow, FieldRvaRow,
    GenericParamConstraintRow, GenericParamRow, ImplMapRow, InterfaceImplRow, MemberRefRow,
    MethodDefRow, MethodImplRow, MethodSemanticsRow, MethodSpecRow, ModuleRefRow, ModuleRow,
    NestedClassRow, ParamRow, PropertyMapRow, PropertyRow, StandAloneSigRow, TypeDefRow,
    TypeRefRow, TypeSpecRow,
};
