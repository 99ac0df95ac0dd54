//! Built-in Functions Registry
//!
//! The standard-library functions a program may call without declaring
//! them first. Each carries a stable dispatch ID used by the runtime.
//! `FILE *` is modeled as `void *`, `size_t` as `unsigned long` and
//! `time_t`/`clock_t` as `long`.

use std::collections::HashMap;

use crate::types::{CType, Qualifiers};

/// Header a built-in belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    Stdio,
    Stdlib,
    String,
    Ctype,
    Time,
    Math,
}

impl Header {
    pub fn file_name(&self) -> &'static str {
        match self {
            Header::Stdio => "stdio.h",
            Header::Stdlib => "stdlib.h",
            Header::String => "string.h",
            Header::Ctype => "ctype.h",
            Header::Time => "time.h",
            Header::Math => "math.h",
        }
    }
}

/// Built-in function signature
#[derive(Debug, Clone)]
pub struct BuiltinFunc {
    pub name: String,
    pub params: Vec<(String, CType)>,
    pub ret_type: CType,
    /// Runtime dispatch ID
    pub id: u16,
    pub header: Header,
    /// Whether this function is variadic (like printf)
    pub variadic: bool,
}

impl BuiltinFunc {
    /// The function type used for call checking
    pub fn ty(&self) -> CType {
        CType::function(
            self.ret_type.clone(),
            self.params.iter().map(|(_, ty)| ty.clone()).collect(),
            self.variadic,
        )
    }
}

/// Registry of all built-in functions
pub struct BuiltinRegistry {
    functions: HashMap<String, BuiltinFunc>,
}

fn const_char_ptr() -> CType {
    CType::pointer_to(CType::char().with_quals(Qualifiers::constant()))
}

fn const_void_ptr() -> CType {
    CType::pointer_to(CType::void().with_quals(Qualifiers::constant()))
}

fn size_t() -> CType {
    CType::ulong()
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    fn add(&mut self, header: Header, id: u16, name: &str, ret_type: CType, params: &[(&str, CType)], variadic: bool) {
        self.register(BuiltinFunc {
            name: name.to_string(),
            params: params.iter().map(|(n, t)| (n.to_string(), t.clone())).collect(),
            ret_type,
            id,
            header,
            variadic,
        });
    }

    fn register_all(&mut self) {
        let int = CType::int;
        let file = CType::void_ptr;

        // stdio.h
        self.add(Header::Stdio, 0x0030, "printf", int(), &[("format", const_char_ptr())], true);
        self.add(Header::Stdio, 0x0031, "fprintf", int(), &[("stream", file()), ("format", const_char_ptr())], true);
        self.add(Header::Stdio, 0x0032, "sprintf", int(), &[("str", CType::string()), ("format", const_char_ptr())], true);
        self.add(Header::Stdio, 0x0033, "scanf", int(), &[("format", const_char_ptr())], true);
        self.add(Header::Stdio, 0x0080, "puts", int(), &[("s", const_char_ptr())], false);
        self.add(Header::Stdio, 0x0081, "putchar", int(), &[("c", int())], false);
        self.add(Header::Stdio, 0x0082, "getchar", int(), &[], false);
        self.add(Header::Stdio, 0x0044, "fseek", int(), &[("stream", file()), ("offset", CType::long()), ("whence", int())], false);
        self.add(Header::Stdio, 0x0045, "ftell", CType::long(), &[("stream", file())], false);
        self.add(Header::Stdio, 0x0046, "feof", int(), &[("stream", file())], false);
        self.add(Header::Stdio, 0x0047, "ferror", int(), &[("stream", file())], false);
        self.add(Header::Stdio, 0x00D0, "fflush", int(), &[("stream", file())], false);

        // stdlib.h
        self.add(Header::Stdlib, 0x0001, "malloc", CType::void_ptr(), &[("size", size_t())], false);
        self.add(Header::Stdlib, 0x0002, "free", CType::void(), &[("ptr", CType::void_ptr())], false);
        self.add(Header::Stdlib, 0x0060, "atoi", int(), &[("s", const_char_ptr())], false);
        self.add(Header::Stdlib, 0x0061, "atol", CType::long(), &[("s", const_char_ptr())], false);
        self.add(Header::Stdlib, 0x00C2, "rand", int(), &[], false);
        self.add(Header::Stdlib, 0x00C3, "srand", CType::void(), &[("seed", CType::uint())], false);
        self.add(Header::Stdlib, 0x0070, "exit", CType::void(), &[("status", int())], false);

        // string.h
        let s = CType::string;
        self.add(Header::String, 0x0010, "strlen", size_t(), &[("s", const_char_ptr())], false);
        self.add(Header::String, 0x0011, "strcpy", s(), &[("dest", s()), ("src", const_char_ptr())], false);
        self.add(Header::String, 0x0012, "strncpy", s(), &[("dest", s()), ("src", const_char_ptr()), ("n", size_t())], false);
        self.add(Header::String, 0x0013, "strcmp", int(), &[("a", const_char_ptr()), ("b", const_char_ptr())], false);
        self.add(Header::String, 0x0014, "strncmp", int(), &[("a", const_char_ptr()), ("b", const_char_ptr()), ("n", size_t())], false);
        self.add(Header::String, 0x0015, "strcat", s(), &[("dest", s()), ("src", const_char_ptr())], false);
        self.add(Header::String, 0x0016, "strncat", s(), &[("dest", s()), ("src", const_char_ptr()), ("n", size_t())], false);
        self.add(Header::String, 0x0017, "strchr", s(), &[("s", const_char_ptr()), ("c", int())], false);
        self.add(Header::String, 0x0018, "strstr", s(), &[("haystack", const_char_ptr()), ("needle", const_char_ptr())], false);
        self.add(Header::String, 0x0090, "strdup", s(), &[("s", const_char_ptr())], false);
        self.add(Header::String, 0x0091, "strtok", s(), &[("s", s()), ("delim", const_char_ptr())], false);
        self.add(Header::String, 0x0020, "memcpy", CType::void_ptr(), &[("dest", CType::void_ptr()), ("src", const_void_ptr()), ("n", size_t())], false);
        self.add(Header::String, 0x0022, "memset", CType::void_ptr(), &[("s", CType::void_ptr()), ("c", int()), ("n", size_t())], false);
        self.add(Header::String, 0x0023, "memcmp", int(), &[("a", const_void_ptr()), ("b", const_void_ptr()), ("n", size_t())], false);

        // ctype.h
        for (id, name) in [(0x00A0, "isalpha"), (0x00A1, "isdigit"), (0x00A3, "isspace"), (0x00A6, "toupper"), (0x00A7, "tolower")] {
            self.add(Header::Ctype, id, name, int(), &[("c", int())], false);
        }

        // time.h
        self.add(Header::Time, 0x00B0, "time", CType::long(), &[("t", CType::pointer_to(CType::long()))], false);
        self.add(Header::Time, 0x00B1, "clock", CType::long(), &[], false);

        // math.h
        let double = CType::double;
        for (id, name) in [
            (0x0052, "sqrt"),
            (0x0054, "sin"),
            (0x0055, "cos"),
            (0x0056, "tan"),
            (0x00F3, "log"),
            (0x00F4, "log10"),
            (0x00F5, "exp"),
            (0x00F7, "floor"),
            (0x00F8, "ceil"),
            (0x00F9, "fabs"),
        ] {
            self.add(Header::Math, id, name, double(), &[("x", double())], false);
        }
        self.add(Header::Math, 0x0053, "pow", double(), &[("x", double()), ("y", double())], false);
    }

    fn register(&mut self, func: BuiltinFunc) {
        self.functions.insert(func.name.clone(), func);
    }

    /// Get a built-in function by name
    pub fn get(&self, name: &str) -> Option<&BuiltinFunc> {
        self.functions.get(name)
    }

    /// Dispatch ID of a built-in
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.get(name).map(|f| f.id)
    }

    /// Get all built-in functions
    pub fn all(&self) -> impl Iterator<Item = &BuiltinFunc> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_dispatch_ids() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.id_of("malloc"), Some(0x0001));
        assert_eq!(registry.id_of("printf"), Some(0x0030));
        assert_eq!(registry.id_of("strlen"), Some(0x0010));
        assert_eq!(registry.id_of("fflush"), Some(0x00D0));
        assert_eq!(registry.id_of("fabs"), Some(0x00F9));
        assert_eq!(registry.id_of("main"), None);
    }

    #[test]
    fn test_ids_are_unique_and_in_range() {
        let registry = BuiltinRegistry::new();
        let ids: HashSet<u16> = registry.all().map(|f| f.id).collect();
        assert_eq!(ids.len(), registry.len());
        assert!(registry.all().all(|f| (0x0001..=0x00F9).contains(&f.id)));
        assert_eq!(registry.len(), 51);
    }

    #[test]
    fn test_signatures() {
        let registry = BuiltinRegistry::new();
        let printf = registry.get("printf").unwrap();
        assert!(printf.variadic);
        assert_eq!(printf.header, Header::Stdio);
        assert_eq!(printf.ret_type, CType::int());

        let pow = registry.get("pow").unwrap();
        assert_eq!(pow.params.len(), 2);
        let ty = pow.ty();
        let f = ty.as_function().unwrap();
        assert_eq!(*f.ret, CType::double());
        assert!(!f.variadic);

        assert!(registry.get("free").unwrap().ret_type.is_void());
        assert_eq!(registry.get("isdigit").unwrap().header.file_name(), "ctype.h");
    }
}
