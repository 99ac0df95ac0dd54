//! C type representation, conversions and layout

pub mod type_system;

pub use type_system::{
    compatible, compatible_unqualified, is_assignable, is_castable, usual_arithmetic_conversion, CType, Field,
    FloatKind, FunctionType, IntRank, Qualifiers, RecordDef, RecordId, RecordKind, TypeKind, TypeRegistry,
};
