//! C type representation, classification and mapping to C# type names.

/// Generic address type used for raw pointers without a more specific rule.
pub const ADDRESS_TYPE: &str = "IntPtr";

/// Type used for `void*`.
pub const OBJECT_TYPE: &str = "object";

/// Name of the generic pointer wrapper in the generated code.
pub const POINTER_WRAPPER: &str = "Pointer";

/// A C type as reported by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    /// Kind tag with kind-specific payload
    pub kind: CTypeKind,
    /// Whether the type itself is const-qualified
    pub is_const: bool,
    /// Spelling as printed by clang (e.g. `const unsigned char *`)
    pub spelling: String,
    /// Size in bytes, when the type is complete
    pub size: Option<u64>,
}

/// Kinds of C types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CTypeKind {
    Void,
    Bool,
    /// Plain `char` on a signed-char target
    CharS,
    /// Plain `char` on an unsigned-char target
    CharU,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    /// `nullptr_t`
    NullPtr,
    /// Pointer type: T*
    Pointer(Box<CType>),
    /// Array type with a known length: T[N]
    ConstantArray { element: Box<CType>, len: u64 },
    /// Array type without a length: T[]
    IncompleteArray(Box<CType>),
    /// struct or union
    Record,
    Enum,
    /// Typedef name, resolved through its canonical type
    Typedef(Box<CType>),
    /// Elaborated type (`struct Foo` written with the keyword)
    Elaborated(Box<CType>),
    /// Type clang does not expose. `None` when the canonical type is unexposed too.
    Unexposed(Option<Box<CType>>),
    /// Function prototype (with or without parameter list)
    FunctionProto,
    /// Anything else; only the spelling is meaningful
    Other,
}

impl CType {
    /// Create a type with the given kind and spelling.
    pub fn new(kind: CTypeKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            is_const: false,
            spelling: spelling.into(),
            size: None,
        }
    }

    /// Create a builtin type, spelled the way C spells it.
    pub fn builtin(kind: CTypeKind) -> Self {
        let spelling = match &kind {
            CTypeKind::Void => "void",
            CTypeKind::Bool => "_Bool",
            CTypeKind::CharS | CTypeKind::CharU => "char",
            CTypeKind::SChar => "signed char",
            CTypeKind::UChar => "unsigned char",
            CTypeKind::Short => "short",
            CTypeKind::UShort => "unsigned short",
            CTypeKind::Int => "int",
            CTypeKind::UInt => "unsigned int",
            CTypeKind::Long => "long",
            CTypeKind::ULong => "unsigned long",
            CTypeKind::LongLong => "long long",
            CTypeKind::ULongLong => "unsigned long long",
            CTypeKind::Float => "float",
            CTypeKind::Double => "double",
            CTypeKind::NullPtr => "nullptr_t",
            _ => "",
        };
        Self::new(kind, spelling)
    }

    pub fn int() -> Self {
        Self::builtin(CTypeKind::Int)
    }

    pub fn void() -> Self {
        Self::builtin(CTypeKind::Void)
    }

    /// Create a record type named `name`.
    pub fn record(name: &str) -> Self {
        Self::new(CTypeKind::Record, format!("struct {}", name))
    }

    /// Create a pointer to this type.
    pub fn ptr(self) -> Self {
        let spelling = format!("{} *", self.spelling);
        Self::new(CTypeKind::Pointer(Box::new(self)), spelling)
    }

    /// Create a constant array of this type.
    pub fn array(self, len: u64) -> Self {
        let spelling = format!("{} [{}]", self.spelling, len);
        Self::new(
            CTypeKind::ConstantArray {
                element: Box::new(self),
                len,
            },
            spelling,
        )
    }

    /// Create a typedef named `name` for this type.
    pub fn typedef(self, name: &str) -> Self {
        Self::new(CTypeKind::Typedef(Box::new(self)), name)
    }

    /// Mark this type const-qualified.
    pub fn into_const(mut self) -> Self {
        self.is_const = true;
        if !self.spelling.starts_with("const ") {
            self.spelling = format!("const {}", self.spelling);
        }
        self
    }

    /// Set the byte size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Strip typedef and elaborated sugar down to the canonical type.
    pub fn desugar(&self) -> &CType {
        match &self.kind {
            CTypeKind::Typedef(canonical) | CTypeKind::Elaborated(canonical) => canonical.desugar(),
            _ => self,
        }
    }

    /// Pointee of a pointer, or element of an array.
    pub fn pointee(&self) -> Option<&CType> {
        match &self.kind {
            CTypeKind::Pointer(pointee) => Some(pointee),
            CTypeKind::ConstantArray { element, .. } | CTypeKind::IncompleteArray(element) => {
                Some(element)
            }
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.desugar().kind, CTypeKind::Void)
    }

    /// Pointer or array kind, regardless of the pointee.
    pub fn is_c_pointer(&self) -> bool {
        matches!(
            self.desugar().kind,
            CTypeKind::Pointer(_) | CTypeKind::ConstantArray { .. } | CTypeKind::IncompleteArray(_)
        )
    }

    /// Pointer or array whose pointee is not `void`.
    pub fn is_pointer(&self) -> bool {
        match &self.desugar().kind {
            CTypeKind::Pointer(pointee) => !pointee.is_void(),
            CTypeKind::ConstantArray { .. } | CTypeKind::IncompleteArray(_) => true,
            _ => false,
        }
    }

    /// Record type, looking through pointers and arrays.
    pub fn is_record(&self) -> bool {
        let ty = self.desugar();
        match &ty.kind {
            CTypeKind::Record => true,
            _ => ty.pointee().is_some_and(CType::is_record),
        }
    }

    pub fn is_primitive_numeric(&self) -> bool {
        matches!(
            self.desugar().kind,
            CTypeKind::Bool
                | CTypeKind::CharS
                | CTypeKind::CharU
                | CTypeKind::SChar
                | CTypeKind::UChar
                | CTypeKind::Short
                | CTypeKind::UShort
                | CTypeKind::Int
                | CTypeKind::UInt
                | CTypeKind::Long
                | CTypeKind::ULong
                | CTypeKind::LongLong
                | CTypeKind::ULongLong
                | CTypeKind::Float
                | CTypeKind::Double
        )
    }

    pub fn is_function(&self) -> bool {
        matches!(self.desugar().kind, CTypeKind::FunctionProto)
    }

    /// `const char *`
    pub fn is_ptr_to_const_char(&self) -> bool {
        match &self.kind {
            CTypeKind::Pointer(pointee) => {
                pointee.is_const && matches!(pointee.kind, CTypeKind::CharS)
            }
            _ => false,
        }
    }

    /// Get the equivalent C# type name.
    pub fn to_cs_type_str(&self) -> String {
        let is_const = self.is_const;
        let ty = self.desugar();

        let name = match &ty.kind {
            CTypeKind::Record | CTypeKind::Enum => declared_name(&ty.spelling),
            CTypeKind::Pointer(pointee) => pointer_type_str(pointee),
            CTypeKind::ConstantArray { element, .. } | CTypeKind::IncompleteArray(element) => {
                pointer_type_str(element)
            }
            CTypeKind::Unexposed(Some(canonical)) if canonical.is_function() => {
                ADDRESS_TYPE.to_string()
            }
            CTypeKind::Unexposed(Some(canonical)) => canonical.to_cs_type_str(),
            CTypeKind::Unexposed(None) => ty.spelling.clone(),
            _ => ty.to_plain_type_str(),
        };

        if is_const {
            name.replace("const ", "")
        } else {
            name
        }
    }

    /// Fixed mapping for builtin types. Unknown kinds fall back to the spelling,
    /// which is lossy but always defined.
    fn to_plain_type_str(&self) -> String {
        let name = match &self.kind {
            CTypeKind::Bool => "bool",
            CTypeKind::UChar | CTypeKind::CharU => "byte",
            CTypeKind::SChar | CTypeKind::CharS => "sbyte",
            CTypeKind::UShort => "ushort",
            CTypeKind::Short => "short",
            CTypeKind::Float => "float",
            CTypeKind::Double => "double",
            CTypeKind::Int => "int",
            CTypeKind::UInt => "uint",
            CTypeKind::Pointer(_) | CTypeKind::NullPtr | CTypeKind::FunctionProto => ADDRESS_TYPE,
            // 32-bit model: long is int-sized
            CTypeKind::Long | CTypeKind::ULong => "int",
            CTypeKind::LongLong => "long",
            CTypeKind::ULongLong => "ulong",
            CTypeKind::Void => "void",
            _ => return self.spelling.clone(),
        };
        name.to_string()
    }
}

/// Map the pointee of a pointer (or element of an array).
fn pointer_type_str(pointee: &CType) -> String {
    let pointee = pointee.desugar();
    match &pointee.kind {
        CTypeKind::Void => OBJECT_TYPE.to_string(),
        // Function pointers decay to an opaque handle
        CTypeKind::FunctionProto => ADDRESS_TYPE.to_string(),
        // Records are reference types in C#
        CTypeKind::Record => pointee.to_cs_type_str(),
        _ => format!("{}<{}>", POINTER_WRAPPER, pointee.to_cs_type_str()),
    }
}

/// Declared name of a record or enum, without qualifiers or tag keywords.
fn declared_name(spelling: &str) -> String {
    let name = spelling.replace("const ", "");
    let name = name.trim();
    name.strip_prefix("struct ")
        .or_else(|| name.strip_prefix("union "))
        .or_else(|| name.strip_prefix("enum "))
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uchar() -> CType {
        CType::builtin(CTypeKind::UChar)
    }

    #[test]
    fn test_primitive_mapping() {
        let cases = [
            (CTypeKind::Bool, "bool"),
            (CTypeKind::UChar, "byte"),
            (CTypeKind::CharS, "sbyte"),
            (CTypeKind::Short, "short"),
            (CTypeKind::UShort, "ushort"),
            (CTypeKind::Int, "int"),
            (CTypeKind::UInt, "uint"),
            (CTypeKind::Long, "int"),
            (CTypeKind::ULong, "int"),
            (CTypeKind::LongLong, "long"),
            (CTypeKind::ULongLong, "ulong"),
            (CTypeKind::Float, "float"),
            (CTypeKind::Double, "double"),
            (CTypeKind::Void, "void"),
            (CTypeKind::NullPtr, "IntPtr"),
        ];
        for (kind, expected) in cases {
            assert_eq!(CType::builtin(kind.clone()).to_cs_type_str(), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_pointer_mapping() {
        assert_eq!(CType::int().ptr().to_cs_type_str(), "Pointer<int>");
        assert_eq!(uchar().ptr().ptr().to_cs_type_str(), "Pointer<Pointer<byte>>");
        assert_eq!(CType::void().ptr().to_cs_type_str(), "object");
    }

    #[test]
    fn test_record_pointer_maps_to_record_name() {
        let foo = CType::record("Foo");
        assert_eq!(foo.to_cs_type_str(), "Foo");
        assert_eq!(foo.clone().ptr().to_cs_type_str(), "Foo");
        assert_eq!(foo.array(4).to_cs_type_str(), "Foo");
    }

    #[test]
    fn test_array_maps_to_pointer_wrapper() {
        assert_eq!(uchar().array(16).to_cs_type_str(), "Pointer<byte>");
        let incomplete = CType::new(CTypeKind::IncompleteArray(Box::new(CType::int())), "int []");
        assert_eq!(incomplete.to_cs_type_str(), "Pointer<int>");
    }

    #[test]
    fn test_typedef_is_desugared() {
        let size_t = CType::builtin(CTypeKind::ULongLong).typedef("size_t");
        assert_eq!(size_t.to_cs_type_str(), "ulong");
        assert!(size_t.is_primitive_numeric());

        let context = CType::record("stbi__context").typedef("stbi__context");
        assert_eq!(context.clone().ptr().to_cs_type_str(), "stbi__context");
        assert!(context.ptr().is_record());
    }

    #[test]
    fn test_const_is_stripped() {
        let const_uchar_ptr = uchar().into_const().ptr();
        assert_eq!(const_uchar_ptr.to_cs_type_str(), "Pointer<byte>");

        let const_record = CType::record("Foo").into_const();
        assert_eq!(const_record.to_cs_type_str(), "Foo");
    }

    #[test]
    fn test_unexposed_types() {
        let fn_ptr = CType::new(
            CTypeKind::Unexposed(Some(Box::new(CType::new(CTypeKind::FunctionProto, "int (void *)")))),
            "stbi_read_cb",
        );
        assert_eq!(fn_ptr.to_cs_type_str(), "IntPtr");

        let enum_ty = CType::new(CTypeKind::Enum, "enum STBI_color");
        let unexposed = CType::new(CTypeKind::Unexposed(Some(Box::new(enum_ty))), "STBI_color");
        assert_eq!(unexposed.to_cs_type_str(), "STBI_color");

        let opaque = CType::new(CTypeKind::Unexposed(None), "__builtin_va_list");
        assert_eq!(opaque.to_cs_type_str(), "__builtin_va_list");
    }

    #[test]
    fn test_function_pointer_is_opaque() {
        let proto = CType::new(CTypeKind::FunctionProto, "int (int)");
        assert_eq!(proto.ptr().to_cs_type_str(), "IntPtr");
    }

    #[test]
    fn test_unknown_kind_falls_back_to_spelling() {
        let ty = CType::new(CTypeKind::Other, "__int128");
        assert_eq!(ty.to_cs_type_str(), "__int128");
    }

    #[test]
    fn test_classification() {
        let int_ptr = CType::int().ptr();
        assert!(int_ptr.is_pointer());
        assert!(int_ptr.is_c_pointer());
        assert!(!int_ptr.is_record());
        assert!(!int_ptr.is_primitive_numeric());

        let void_ptr = CType::void().ptr();
        assert!(!void_ptr.is_pointer());
        assert!(void_ptr.is_c_pointer());

        assert!(uchar().array(3).is_pointer());
        assert!(CType::builtin(CTypeKind::Double).is_primitive_numeric());
        assert!(!CType::new(CTypeKind::Enum, "enum E").is_primitive_numeric());
        assert!(CType::record("Foo").ptr().ptr().is_record());
    }

    #[test]
    fn test_ptr_to_const_char() {
        let const_char_ptr = CType::builtin(CTypeKind::CharS).into_const().ptr();
        assert!(const_char_ptr.is_ptr_to_const_char());
        assert!(!CType::builtin(CTypeKind::CharS).ptr().is_ptr_to_const_char());
        assert!(!uchar().into_const().ptr().is_ptr_to_const_char());
    }
}
