//! Metadata tables parsing and writing.

mod coded_index;
mod context;
mod flags;
mod header;
mod rows;
mod table_id;

pub use coded_index::{CodedIndex, CodedIndexKind};
pub use context::TableContext;
pub use flags::{
    EventAttributes, FieldAttributes, MethodAttributes, MethodSemanticsAttributes,
    ParamAttributes, PropertyAttributes, TypeAttributes,
};
pub use header::TablesHeader;
pub use rows::*;
pub use table_id::TableId;

