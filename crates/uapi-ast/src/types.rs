//! C type descriptors with front-end computed layout.

use crate::tree::NodeId;

/// Broad classification of a C type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// int, char, unsigned long, ...
    Builtin,
    Pointer,
    /// struct or union
    Record,
    Enum,
    Typedef,
    /// T[N]
    ConstantArray,
    /// T[]
    IncompleteArray,
    Function,
    Other,
}

/// A C type as seen by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Spelling of the type in the original source (e.g. `unsigned int`,
    /// `struct foo *`, `void (*)(int)`)
    pub spelling: String,
    /// Size in bytes; `None` for incomplete types
    pub size: Option<u64>,
    /// Alignment in bytes
    pub alignment: Option<u64>,
    pub is_const: bool,
    /// Pointee of a pointer type
    pub pointee: Option<Box<TypeInfo>>,
    /// Element of an array type
    pub element: Option<Box<TypeInfo>>,
    /// Length of a constant array
    pub array_size: Option<u64>,
    /// Node declaring this type; `None` for built-in types
    pub declaration: Option<NodeId>,
}

impl TypeInfo {
    pub fn new(kind: TypeKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            size: None,
            alignment: None,
            is_const: false,
            pointee: None,
            element: None,
            array_size: None,
            declaration: None,
        }
    }

    /// A built-in type with its size, aligned to its size.
    pub fn builtin(spelling: impl Into<String>, size: u64) -> Self {
        Self::new(TypeKind::Builtin, spelling).with_layout(size, size)
    }

    /// A type declared by `declaration` (struct, union, enum or typedef).
    pub fn declared(kind: TypeKind, spelling: impl Into<String>, declaration: NodeId) -> Self {
        let mut ty = Self::new(kind, spelling);
        ty.declaration = Some(declaration);
        ty
    }

    /// A pointer to `pointee`, using the LP64 pointer layout.
    pub fn pointer_to(pointee: TypeInfo) -> Self {
        let spelling = match (pointee.kind, pointee.spelling.find('(')) {
            (TypeKind::Function, Some(at)) => format!(
                "{}(*){}",
                &pointee.spelling[..at],
                &pointee.spelling[at..]
            ),
            (TypeKind::Pointer, _) => format!("{}*", pointee.spelling),
            _ => format!("{} *", pointee.spelling),
        };
        let mut ty = Self::new(TypeKind::Pointer, spelling).with_layout(8, 8);
        ty.pointee = Some(Box::new(pointee));
        ty
    }

    /// `element[len]`.
    pub fn array_of(element: TypeInfo, len: u64) -> Self {
        let mut ty = Self::new(
            TypeKind::ConstantArray,
            format!("{} [{}]", element.spelling, len),
        );
        ty.size = element.size.map(|size| size * len);
        ty.alignment = element.alignment;
        ty.array_size = Some(len);
        ty.element = Some(Box::new(element));
        ty
    }

    /// `element[]`.
    pub fn incomplete_array_of(element: TypeInfo) -> Self {
        let mut ty = Self::new(TypeKind::IncompleteArray, format!("{} []", element.spelling));
        ty.alignment = element.alignment;
        ty.element = Some(Box::new(element));
        ty
    }

    pub fn with_layout(mut self, size: u64, alignment: u64) -> Self {
        self.size = Some(size);
        self.alignment = Some(alignment);
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.kind == TypeKind::Pointer
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::ConstantArray | TypeKind::IncompleteArray)
    }

    pub fn is_incomplete(&self) -> bool {
        self.size.is_none()
    }

    /// Function, function pointer, or array of function pointers: the
    /// declarator goes in the middle of the spelling.
    pub fn is_function_like(&self) -> bool {
        match self.kind {
            TypeKind::Function => true,
            TypeKind::Builtin | TypeKind::Record | TypeKind::Enum | TypeKind::Typedef => false,
            TypeKind::Pointer => self
                .pointee
                .as_deref()
                .map_or_else(|| self.spelling.contains('('), TypeInfo::is_function_like),
            TypeKind::ConstantArray | TypeKind::IncompleteArray => self
                .element
                .as_deref()
                .map_or_else(|| self.spelling.contains('('), TypeInfo::is_function_like),
            TypeKind::Other => self.spelling.contains('('),
        }
    }

    /// Peel every array level, returning the innermost element type and the
    /// dimensions outermost first (`None` for `[]`).
    pub fn array_dimensions(&self) -> (&TypeInfo, Vec<Option<u64>>) {
        let mut dims = Vec::new();
        let mut current = self;
        while current.is_array() {
            let Some(element) = current.element.as_deref() else {
                break;
            };
            dims.push(current.array_size);
            current = element;
        }
        (current, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_dimensions() {
        let int = TypeInfo::builtin("int", 4);
        let matrix = TypeInfo::array_of(TypeInfo::array_of(int.clone(), 3), 2);
        assert_eq!(matrix.spelling, "int [3] [2]");
        assert_eq!(matrix.size, Some(24));

        let (element, dims) = matrix.array_dimensions();
        assert_eq!(element, &int);
        assert_eq!(dims, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_flexible_array_dimensions() {
        let flex = TypeInfo::incomplete_array_of(TypeInfo::builtin("char", 1));
        assert!(flex.is_incomplete());
        let (element, dims) = flex.array_dimensions();
        assert_eq!(element.spelling, "char");
        assert_eq!(dims, vec![None]);
    }

    #[test]
    fn test_pointer_spelling() {
        let ptr = TypeInfo::pointer_to(TypeInfo::pointer_to(TypeInfo::builtin("char", 1)));
        assert_eq!(ptr.spelling, "char **");
        assert!(ptr.is_pointer());
        assert!(!ptr.is_function_like());
    }

    #[test]
    fn test_function_like() {
        let callback = TypeInfo::pointer_to(TypeInfo::new(TypeKind::Function, "void (int)"));
        assert!(callback.is_function_like());
        assert!(TypeInfo::array_of(callback, 4).is_function_like());

        let unnamed = TypeInfo::new(TypeKind::Record, "struct (unnamed at a.h:3:5)");
        assert!(!unnamed.is_function_like());
        assert!(!TypeInfo::pointer_to(unnamed).is_function_like());
    }
}
