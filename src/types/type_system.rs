//! Type System for C99
//!
//! `CType` is a value type. Struct and union definitions live in the
//! `TypeRegistry` arena and are referenced by `RecordId`, so
//! self-referential records need no reference cycles.

use std::fmt;

/// Type qualifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
}

impl Qualifiers {
    pub const NONE: Self = Self {
        is_const: false,
        is_volatile: false,
        is_restrict: false,
    };

    pub fn constant() -> Self {
        Self { is_const: true, ..Self::NONE }
    }

    pub fn is_empty(&self) -> bool {
        !(self.is_const || self.is_volatile || self.is_restrict)
    }

    /// Whether every qualifier in `other` is also in `self`
    pub fn includes(&self, other: Qualifiers) -> bool {
        (self.is_const || !other.is_const)
            && (self.is_volatile || !other.is_volatile)
            && (self.is_restrict || !other.is_restrict)
    }

    /// Union of both qualifier sets
    pub fn merge(&self, other: Qualifiers) -> Qualifiers {
        Qualifiers {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
            is_restrict: self.is_restrict || other.is_restrict,
        }
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        if self.is_const {
            words.push("const");
        }
        if self.is_volatile {
            words.push("volatile");
        }
        if self.is_restrict {
            words.push("restrict");
        }
        write!(f, "{}", words.join(" "))
    }
}

/// Integer conversion rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntRank {
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

impl IntRank {
    /// Size in bytes
    pub fn size(&self) -> u64 {
        match self {
            IntRank::Char => 1,
            IntRank::Short => 2,
            IntRank::Int => 4,
            IntRank::Long | IntRank::LongLong => 8,
        }
    }
}

/// Floating types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloatKind {
    Float,
    Double,
    LongDouble,
}

impl FloatKind {
    pub fn size(&self) -> u64 {
        match self {
            FloatKind::Float => 4,
            FloatKind::Double => 8,
            FloatKind::LongDouble => 16,
        }
    }
}

/// Index of a struct/union in the `TypeRegistry`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub usize);

/// struct or union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Struct,
    Union,
}

impl RecordKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub ret: Box<CType>,
    pub params: Vec<CType>,
    pub variadic: bool,
    /// False for `()` declarations, which skip argument checking
    pub prototyped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Int { rank: IntRank, signed: bool },
    Float(FloatKind),
    Pointer(Box<CType>),
    Array {
        elem: Box<CType>,
        /// None when the length is unknown
        len: Option<u64>,
        vla: bool,
    },
    Function(FunctionType),
    Record(RecordId),
}

/// A resolved C type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CType {
    pub kind: TypeKind,
    pub quals: Qualifiers,
}

impl CType {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, quals: Qualifiers::NONE }
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub fn integer(rank: IntRank, signed: bool) -> Self {
        Self::new(TypeKind::Int { rank, signed })
    }

    pub fn char() -> Self {
        Self::integer(IntRank::Char, true)
    }

    pub fn int() -> Self {
        Self::integer(IntRank::Int, true)
    }

    pub fn uint() -> Self {
        Self::integer(IntRank::Int, false)
    }

    pub fn long() -> Self {
        Self::integer(IntRank::Long, true)
    }

    pub fn ulong() -> Self {
        Self::integer(IntRank::Long, false)
    }

    pub fn float() -> Self {
        Self::new(TypeKind::Float(FloatKind::Float))
    }

    pub fn double() -> Self {
        Self::new(TypeKind::Float(FloatKind::Double))
    }

    pub fn pointer_to(inner: CType) -> Self {
        Self::new(TypeKind::Pointer(Box::new(inner)))
    }

    pub fn array_of(elem: CType, len: Option<u64>) -> Self {
        Self::new(TypeKind::Array {
            elem: Box::new(elem),
            len,
            vla: false,
        })
    }

    pub fn function(ret: CType, params: Vec<CType>, variadic: bool) -> Self {
        Self::new(TypeKind::Function(FunctionType {
            ret: Box::new(ret),
            params,
            variadic,
            prototyped: true,
        }))
    }

    /// `char *`
    pub fn string() -> Self {
        Self::pointer_to(Self::char())
    }

    /// `void *`
    pub fn void_ptr() -> Self {
        Self::pointer_to(Self::void())
    }

    pub fn with_quals(mut self, quals: Qualifiers) -> Self {
        self.quals = self.quals.merge(quals);
        self
    }

    pub fn unqualified(&self) -> CType {
        CType::new(self.kind.clone())
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Bool | TypeKind::Int { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.kind, TypeKind::Float(_))
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_floating()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, TypeKind::Function(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    pub fn is_const(&self) -> bool {
        self.quals.is_const
    }

    /// Pointed-to type of a pointer
    pub fn pointee(&self) -> Option<&CType> {
        match &self.kind {
            TypeKind::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match &self.kind {
            TypeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// `void *` of any qualification
    pub fn is_void_pointer(&self) -> bool {
        self.pointee().map_or(false, |p| p.is_void())
    }

    /// Array-to-pointer and function-to-pointer conversion
    pub fn decay(&self) -> CType {
        match &self.kind {
            TypeKind::Array { elem, .. } => CType::pointer_to((**elem).clone()),
            TypeKind::Function(_) => CType::pointer_to(self.clone()),
            _ => self.clone(),
        }
    }

    /// Integer promotion: `_Bool`, `char` and `short` become `int`
    pub fn promote(&self) -> CType {
        match self.kind {
            TypeKind::Bool => CType::int(),
            TypeKind::Int { rank, .. } if rank < IntRank::Int => CType::int(),
            _ => self.unqualified(),
        }
    }

    fn int_parts(&self) -> Option<(IntRank, bool)> {
        match self.kind {
            TypeKind::Int { rank, signed } => Some((rank, signed)),
            TypeKind::Bool => Some((IntRank::Char, false)),
            _ => None,
        }
    }

    /// Largest value representable, for integer types
    pub fn max_value(&self) -> Option<u64> {
        let (rank, signed) = self.int_parts()?;
        if matches!(self.kind, TypeKind::Bool) {
            return Some(1);
        }
        let bits = rank.size() * 8;
        Some(if signed {
            (1u64 << (bits - 1)) - 1
        } else if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        })
    }
}

/// Usual arithmetic conversions: the common type of two arithmetic operands
pub fn usual_arithmetic_conversion(a: &CType, b: &CType) -> CType {
    if let (TypeKind::Float(_), _) | (_, TypeKind::Float(_)) = (&a.kind, &b.kind) {
        let rank = |t: &CType| match t.kind {
            TypeKind::Float(k) => Some(k),
            _ => None,
        };
        let widest = rank(a).max(rank(b)).unwrap_or(FloatKind::Double);
        return CType::new(TypeKind::Float(widest));
    }

    let a = a.promote();
    let b = b.promote();
    let (ra, sa) = a.int_parts().unwrap_or((IntRank::Int, true));
    let (rb, sb) = b.int_parts().unwrap_or((IntRank::Int, true));

    if sa == sb {
        return CType::integer(ra.max(rb), sa);
    }

    let ((ru, _), (rs, _)) = if sa { ((rb, sb), (ra, sa)) } else { ((ra, sa), (rb, sb)) };
    if ru >= rs {
        // Unsigned operand at equal or higher rank wins
        CType::integer(ru, false)
    } else if rs.size() > ru.size() {
        // Wider signed type holds every value of the unsigned one
        CType::integer(rs, true)
    } else {
        CType::integer(rs, false)
    }
}

/// Type compatibility, qualifiers included
pub fn compatible(a: &CType, b: &CType) -> bool {
    a.quals == b.quals && compatible_unqualified(a, b)
}

/// Type compatibility ignoring top-level qualifiers
pub fn compatible_unqualified(a: &CType, b: &CType) -> bool {
    match (&a.kind, &b.kind) {
        (TypeKind::Void, TypeKind::Void) | (TypeKind::Bool, TypeKind::Bool) => true,
        (TypeKind::Int { rank: r1, signed: s1 }, TypeKind::Int { rank: r2, signed: s2 }) => r1 == r2 && s1 == s2,
        (TypeKind::Float(k1), TypeKind::Float(k2)) => k1 == k2,
        (TypeKind::Pointer(p1), TypeKind::Pointer(p2)) => compatible(p1, p2),
        (
            TypeKind::Array { elem: e1, len: l1, .. },
            TypeKind::Array { elem: e2, len: l2, .. },
        ) => compatible(e1, e2) && (l1.is_none() || l2.is_none() || l1 == l2),
        (TypeKind::Function(f1), TypeKind::Function(f2)) => functions_compatible(f1, f2),
        (TypeKind::Record(r1), TypeKind::Record(r2)) => r1 == r2,
        _ => false,
    }
}

fn functions_compatible(f1: &FunctionType, f2: &FunctionType) -> bool {
    if !compatible(&f1.ret, &f2.ret) {
        return false;
    }
    if !f1.prototyped || !f2.prototyped {
        return true;
    }
    f1.variadic == f2.variadic
        && f1.params.len() == f2.params.len()
        && f1
            .params
            .iter()
            .zip(&f2.params)
            .all(|(p1, p2)| compatible_unqualified(&p1.decay(), &p2.decay()))
}

/// Implicit conversion as done by assignment, initialization, argument
/// passing and return. `source` must already be decayed.
pub fn is_assignable(target: &CType, source: &CType, source_is_null: bool) -> bool {
    if target.is_arithmetic() && source.is_arithmetic() {
        return true;
    }
    match (&target.kind, &source.kind) {
        (TypeKind::Bool, TypeKind::Pointer(_)) => true,
        (TypeKind::Pointer(_), _) if source_is_null && source.is_integer() => true,
        (TypeKind::Pointer(to), TypeKind::Pointer(from)) => {
            to.quals.includes(from.quals) && (to.is_void() || from.is_void() || compatible_unqualified(to, from))
        }
        (TypeKind::Record(a), TypeKind::Record(b)) => a == b,
        _ => false,
    }
}

/// Explicit cast legality
pub fn is_castable(from: &CType, to: &CType) -> bool {
    if to.is_void() {
        return true;
    }
    if compatible_unqualified(from, to) {
        return true;
    }
    match (from.is_arithmetic(), from.is_pointer(), to.is_arithmetic(), to.is_pointer()) {
        // arithmetic -> arithmetic
        (true, _, true, _) => true,
        // pointer -> pointer
        (_, true, _, true) => true,
        // integer <-> pointer
        _ => (from.is_integer() && to.is_pointer()) || (from.is_pointer() && to.is_integer()),
    }
}

/// A struct or union member with its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: CType,
    pub offset: u64,
}

/// A struct or union definition
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub kind: RecordKind,
    pub tag: Option<String>,
    /// None while the record is incomplete
    pub fields: Option<Vec<Field>>,
    pub size: u64,
    pub align: u64,
}

impl RecordDef {
    pub fn is_complete(&self) -> bool {
        self.fields.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.as_ref()?.iter().find(|f| f.name == name)
    }
}

/// Arena of struct/union definitions for one translation unit
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    records: Vec<RecordDef>,
}

/// None when rounding up overflows
fn align_up(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        Some(value.checked_add(align - 1)? / align * align)
    }
}

/// Objects must stay addressable with a signed byte offset
const MAX_OBJECT_SIZE: u64 = i64::MAX as u64;

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new, incomplete record
    pub fn declare(&mut self, kind: RecordKind, tag: Option<String>) -> RecordId {
        self.records.push(RecordDef {
            kind,
            tag,
            fields: None,
            size: 0,
            align: 1,
        });
        RecordId(self.records.len() - 1)
    }

    pub fn get(&self, id: RecordId) -> Option<&RecordDef> {
        self.records.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Complete a record with its members and compute its layout.
    /// Members are `(name, type)` pairs; every type must be complete.
    pub fn complete(&mut self, id: RecordId, members: Vec<(String, CType)>) -> Result<(), String> {
        let kind = match self.get(id) {
            Some(def) if def.is_complete() => return Err("record is already defined".to_string()),
            Some(def) => def.kind,
            None => return Err("unknown record".to_string()),
        };

        let too_large = || "record is too large".to_string();
        let mut fields = Vec::with_capacity(members.len());
        let mut offset = 0u64;
        let mut size = 0u64;
        let mut align = 1u64;

        for (name, ty) in members {
            let member_size = self
                .size_of(&ty)
                .ok_or_else(|| format!("member '{}' has incomplete type", name))?;
            let member_align = self.align_of(&ty).unwrap_or(1);
            align = align.max(member_align);

            let field_offset = match kind {
                RecordKind::Struct => {
                    let at = align_up(offset, member_align).ok_or_else(too_large)?;
                    offset = at
                        .checked_add(member_size)
                        .filter(|&end| end <= MAX_OBJECT_SIZE)
                        .ok_or_else(too_large)?;
                    at
                }
                RecordKind::Union => {
                    size = size.max(member_size);
                    0
                }
            };
            fields.push(Field {
                name,
                ty,
                offset: field_offset,
            });
        }

        let raw = match kind {
            RecordKind::Struct => offset,
            RecordKind::Union => size,
        };
        let size = align_up(raw, align)
            .filter(|&size| size <= MAX_OBJECT_SIZE)
            .ok_or_else(too_large)?;
        if let Some(def) = self.records.get_mut(id.0) {
            def.fields = Some(fields);
            def.size = size;
            def.align = align;
        }
        Ok(())
    }

    /// Size in bytes; None for void, functions, incomplete records and
    /// arrays too large to address
    pub fn size_of(&self, ty: &CType) -> Option<u64> {
        match &ty.kind {
            TypeKind::Void | TypeKind::Function(_) => None,
            TypeKind::Bool => Some(1),
            TypeKind::Int { rank, .. } => Some(rank.size()),
            TypeKind::Float(kind) => Some(kind.size()),
            TypeKind::Pointer(_) => Some(8),
            TypeKind::Array { elem, len, vla } => {
                let elem_size = self.size_of(elem)?;
                match (len, vla) {
                    (Some(n), false) => elem_size.checked_mul(*n).filter(|&size| size <= MAX_OBJECT_SIZE),
                    _ => Some(0),
                }
            }
            TypeKind::Record(id) => {
                let def = self.get(*id)?;
                if def.is_complete() {
                    Some(def.size)
                } else {
                    None
                }
            }
        }
    }

    /// Alignment in bytes
    pub fn align_of(&self, ty: &CType) -> Option<u64> {
        match &ty.kind {
            TypeKind::Array { elem, .. } => self.align_of(elem),
            TypeKind::Record(id) => self.get(*id).filter(|d| d.is_complete()).map(|d| d.align),
            _ => self.size_of(ty),
        }
    }

    /// Whether an object of this type can be defined
    pub fn is_complete(&self, ty: &CType) -> bool {
        match &ty.kind {
            TypeKind::Void | TypeKind::Function(_) => false,
            TypeKind::Array { elem, .. } => self.is_complete(elem),
            TypeKind::Record(id) => self.get(*id).map_or(false, |d| d.is_complete()),
            _ => true,
        }
    }

    /// Look up a member of a struct/union type
    pub fn member(&self, ty: &CType, name: &str) -> Option<&Field> {
        match &ty.kind {
            TypeKind::Record(id) => self.get(*id)?.field(name),
            _ => None,
        }
    }

    /// Human readable type name used in diagnostics
    pub fn type_name(&self, ty: &CType) -> String {
        let quals = if ty.quals.is_empty() {
            String::new()
        } else {
            format!("{} ", ty.quals)
        };
        match &ty.kind {
            TypeKind::Void => format!("{}void", quals),
            TypeKind::Bool => format!("{}_Bool", quals),
            TypeKind::Int { rank, signed } => {
                let base = match rank {
                    IntRank::Char => "char",
                    IntRank::Short => "short",
                    IntRank::Int => "int",
                    IntRank::Long => "long",
                    IntRank::LongLong => "long long",
                };
                if *signed {
                    format!("{}{}", quals, base)
                } else {
                    format!("{}unsigned {}", quals, base)
                }
            }
            TypeKind::Float(kind) => {
                let base = match kind {
                    FloatKind::Float => "float",
                    FloatKind::Double => "double",
                    FloatKind::LongDouble => "long double",
                };
                format!("{}{}", quals, base)
            }
            TypeKind::Pointer(inner) => {
                let suffix = if ty.quals.is_empty() {
                    String::new()
                } else {
                    format!(" {}", ty.quals)
                };
                format!("{} *{}", self.type_name(inner), suffix)
            }
            TypeKind::Array { elem, len, vla } => match (len, vla) {
                (Some(n), false) => format!("{} [{}]", self.type_name(elem), n),
                (_, true) => format!("{} [*]", self.type_name(elem)),
                _ => format!("{} []", self.type_name(elem)),
            },
            TypeKind::Function(f) => {
                let mut params: Vec<String> = f.params.iter().map(|p| self.type_name(p)).collect();
                if f.variadic {
                    params.push("...".to_string());
                }
                if params.is_empty() && f.prototyped {
                    params.push("void".to_string());
                }
                format!("{} ({})", self.type_name(&f.ret), params.join(", "))
            }
            TypeKind::Record(id) => match self.get(*id) {
                Some(def) => format!(
                    "{}{} {}",
                    quals,
                    def.kind.keyword(),
                    def.tag.as_deref().unwrap_or("<anonymous>")
                ),
                None => format!("{}<record>", quals),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ull() -> CType {
        CType::integer(IntRank::LongLong, false)
    }

    #[test]
    fn test_arithmetic_conversions() {
        assert_eq!(usual_arithmetic_conversion(&CType::int(), &CType::float()), CType::float());
        assert_eq!(usual_arithmetic_conversion(&CType::long(), &CType::int()), CType::long());
        assert_eq!(usual_arithmetic_conversion(&CType::char(), &CType::char()), CType::int());
        assert_eq!(
            usual_arithmetic_conversion(&CType::float(), &CType::new(TypeKind::Float(FloatKind::LongDouble))),
            CType::new(TypeKind::Float(FloatKind::LongDouble))
        );
        assert_eq!(usual_arithmetic_conversion(&CType::double(), &CType::float()), CType::double());
        assert_eq!(usual_arithmetic_conversion(&CType::bool(), &CType::integer(IntRank::Short, false)), CType::int());
    }

    #[test]
    fn test_signedness_rules() {
        // unsigned at equal rank wins
        assert_eq!(usual_arithmetic_conversion(&CType::int(), &CType::uint()), CType::uint());
        // wider signed absorbs narrower unsigned
        assert_eq!(usual_arithmetic_conversion(&CType::long(), &CType::uint()), CType::long());
        // same width: unsigned version of the signed type
        assert_eq!(
            usual_arithmetic_conversion(&CType::integer(IntRank::LongLong, true), &CType::ulong()),
            ull()
        );
    }

    #[test]
    fn test_struct_layout() {
        let mut registry = TypeRegistry::new();
        let id = registry.declare(RecordKind::Struct, Some("s".to_string()));
        registry
            .complete(id, vec![("c".to_string(), CType::char()), ("i".to_string(), CType::int())])
            .unwrap();
        let ty = CType::new(TypeKind::Record(id));
        assert_eq!(registry.size_of(&ty), Some(8));
        assert_eq!(registry.align_of(&ty), Some(4));
        assert_eq!(registry.member(&ty, "i").map(|f| f.offset), Some(4));

        // Trailing padding up to the largest alignment
        let id = registry.declare(RecordKind::Struct, None);
        registry
            .complete(
                id,
                vec![("d".to_string(), CType::double()), ("c".to_string(), CType::char())],
            )
            .unwrap();
        assert_eq!(registry.size_of(&CType::new(TypeKind::Record(id))), Some(16));
    }

    #[test]
    fn test_union_layout() {
        let mut registry = TypeRegistry::new();
        let id = registry.declare(RecordKind::Union, Some("u".to_string()));
        registry
            .complete(
                id,
                vec![
                    ("c".to_string(), CType::array_of(CType::char(), Some(5))),
                    ("i".to_string(), CType::int()),
                ],
            )
            .unwrap();
        let ty = CType::new(TypeKind::Record(id));
        assert_eq!(registry.size_of(&ty), Some(8));
        assert_eq!(registry.member(&ty, "i").map(|f| f.offset), Some(0));
    }

    #[test]
    fn test_incomplete_records() {
        let mut registry = TypeRegistry::new();
        let id = registry.declare(RecordKind::Struct, Some("node".to_string()));
        let node = CType::new(TypeKind::Record(id));
        assert_eq!(registry.size_of(&node), None);
        assert!(!registry.is_complete(&node));

        // A pointer to the record being defined is fine; the record itself is not
        assert!(registry
            .complete(id, vec![("next".to_string(), CType::pointer_to(node.clone()))])
            .is_ok());
        assert_eq!(registry.size_of(&node), Some(8));
        assert!(registry.complete(id, vec![]).is_err());

        let other = registry.declare(RecordKind::Struct, None);
        let incomplete = registry.declare(RecordKind::Struct, None);
        assert!(registry
            .complete(other, vec![("x".to_string(), CType::new(TypeKind::Record(incomplete)))])
            .is_err());
    }

    #[test]
    fn test_scalar_sizes() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.size_of(&CType::bool()), Some(1));
        assert_eq!(registry.size_of(&CType::integer(IntRank::Short, true)), Some(2));
        assert_eq!(registry.size_of(&CType::float()), Some(4));
        assert_eq!(registry.size_of(&CType::long()), Some(8));
        assert_eq!(registry.size_of(&CType::new(TypeKind::Float(FloatKind::LongDouble))), Some(16));
        assert_eq!(registry.size_of(&CType::void_ptr()), Some(8));
        assert_eq!(registry.size_of(&CType::array_of(CType::int(), Some(10))), Some(40));
        assert_eq!(registry.size_of(&CType::array_of(CType::int(), None)), Some(0));
        assert_eq!(registry.size_of(&CType::void()), None);
    }

    #[test]
    fn test_assignability() {
        let int_ptr = CType::pointer_to(CType::int());
        let char_ptr = CType::string();
        assert!(is_assignable(&CType::double(), &CType::int(), false));
        assert!(is_assignable(&int_ptr, &CType::int(), true));
        assert!(!is_assignable(&int_ptr, &CType::int(), false));
        assert!(is_assignable(&int_ptr, &CType::void_ptr(), false));
        assert!(is_assignable(&CType::void_ptr(), &char_ptr, false));
        assert!(!is_assignable(&int_ptr, &char_ptr, false));
        assert!(is_assignable(&CType::bool(), &char_ptr, false));
        assert!(!is_assignable(&CType::int(), &char_ptr, false));
        // The target pointee may add qualifiers but never drop them
        let const_char_ptr = CType::pointer_to(CType::char().with_quals(Qualifiers::constant()));
        let const_void_ptr = CType::pointer_to(CType::void().with_quals(Qualifiers::constant()));
        assert!(is_assignable(&const_char_ptr, &char_ptr, false));
        assert!(!is_assignable(&char_ptr, &const_char_ptr, false));
        assert!(is_assignable(&const_void_ptr, &const_char_ptr, false));
        assert!(!is_assignable(&CType::void_ptr(), &const_char_ptr, false));
        assert!(!is_assignable(&char_ptr, &const_void_ptr, false));
    }

    #[test]
    fn test_cast_table() {
        let int_ptr = CType::pointer_to(CType::int());
        assert!(is_castable(&CType::double(), &CType::char()));
        assert!(is_castable(&int_ptr, &CType::string()));
        assert!(is_castable(&CType::long(), &int_ptr));
        assert!(is_castable(&int_ptr, &CType::ulong()));
        assert!(is_castable(&int_ptr, &CType::void()));
        assert!(!is_castable(&CType::double(), &int_ptr));
        assert!(!is_castable(&int_ptr, &CType::float()));

        let mut registry = TypeRegistry::new();
        let id = registry.declare(RecordKind::Struct, None);
        assert!(!is_castable(&CType::new(TypeKind::Record(id)), &CType::int()));
    }

    #[test]
    fn test_function_compatibility() {
        let f = CType::function(CType::int(), vec![CType::int(), CType::string()], false);
        let g = CType::function(CType::int(), vec![CType::int(), CType::string()], false);
        let h = CType::function(CType::int(), vec![CType::int()], false);
        let mut unproto = CType::function(CType::int(), vec![], false);
        if let TypeKind::Function(ft) = &mut unproto.kind {
            ft.prototyped = false;
        }
        assert!(compatible(&f, &g));
        assert!(!compatible(&f, &h));
        assert!(compatible(&f, &unproto));
        // Array parameters adjust to pointers
        let a = CType::function(CType::void(), vec![CType::array_of(CType::int(), None)], false);
        let p = CType::function(CType::void(), vec![CType::pointer_to(CType::int())], false);
        assert!(compatible(&a, &p));
    }

    #[test]
    fn test_type_names() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.type_name(&CType::ulong()), "unsigned long");
        assert_eq!(
            registry.type_name(&CType::pointer_to(CType::char().with_quals(Qualifiers::constant()))),
            "const char *"
        );
        assert_eq!(registry.type_name(&CType::array_of(CType::int(), Some(3))), "int [3]");
        assert_eq!(
            registry.type_name(&CType::function(CType::int(), vec![CType::int()], true)),
            "int (int, ...)"
        );
    }
}
