//! Clang AST parsing using libclang.

use miette::{miette, Result};
use rustc_hash::FxHashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint, c_ulong};
use std::path::Path;
use std::ptr;
use tracing::{debug, info, warn};
use uapi_ast::{
    DeclNode, DeclTree, NodeId, NodeKind, SourceLocation, Token, TokenKind, TypeInfo, TypeKind,
};
use uapi_build::VirtualFile;

/// Parser that uses libclang to parse C translation units.
pub struct ClangParser {
    index: clang_sys::CXIndex,
}

impl ClangParser {
    /// Create a new Clang parser.
    pub fn new() -> Result<Self> {
        unsafe {
            let index = clang_sys::clang_createIndex(0, 0);
            if index.is_null() {
                return Err(miette!("Failed to create clang index"));
            }
            Ok(Self { index })
        }
    }

    /// Parse a translation unit from disk. Each overlay replaces the header
    /// at its path for the duration of the parse.
    pub fn parse_file(
        &self,
        path: &Path,
        args: &[String],
        overlays: &[VirtualFile],
    ) -> Result<DeclTree> {
        let path_str = path.to_string_lossy();
        let files: Vec<(String, &str)> = overlays
            .iter()
            .map(|file| (file.path.to_string_lossy().into_owned(), file.contents.as_str()))
            .collect();
        self.parse(&path_str, args, &files)
    }

    /// Parse C source code from a string.
    pub fn parse_string(&self, source: &str, filename: &str, args: &[String]) -> Result<DeclTree> {
        self.parse(filename, args, &[(filename.to_string(), source)])
    }

    fn parse(&self, filename: &str, args: &[String], files: &[(String, &str)]) -> Result<DeclTree> {
        let c_filename =
            CString::new(filename).map_err(|_| miette!("Invalid path: {}", filename))?;

        let args = args
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| miette!("Invalid argument: {}", arg)))
            .collect::<Result<Vec<_>>>()?;
        let c_args: Vec<*const c_char> = args.iter().map(|s| s.as_ptr()).collect();

        // Unsaved file names and contents must outlive the parse call
        let mut owned = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let c_name = CString::new(name.as_str()).map_err(|_| miette!("Invalid path: {}", name))?;
            let c_contents = CString::new(*contents)
                .map_err(|_| miette!("Unsaved file {} contains a NUL byte", name))?;
            owned.push((c_name, c_contents, contents.len()));
        }
        let mut unsaved: Vec<clang_sys::CXUnsavedFile> = owned
            .iter()
            .map(|(name, contents, len)| clang_sys::CXUnsavedFile {
                Filename: name.as_ptr(),
                Contents: contents.as_ptr(),
                Length: *len as c_ulong,
            })
            .collect();

        unsafe {
            let tu = clang_sys::clang_parseTranslationUnit(
                self.index,
                c_filename.as_ptr(),
                c_args.as_ptr(),
                c_args.len() as c_int,
                unsaved.as_mut_ptr(),
                unsaved.len() as c_uint,
                clang_sys::CXTranslationUnit_DetailedPreprocessingRecord,
            );

            if tu.is_null() {
                return Err(miette!("Failed to parse translation unit: {}", filename));
            }

            if let Err(err) = check_diagnostics(tu) {
                clang_sys::clang_disposeTranslationUnit(tu);
                return Err(err);
            }

            let tree = Walker::new(tu, filename).run();
            clang_sys::clang_disposeTranslationUnit(tu);

            info!(file = filename, nodes = tree.len(), overlays = files.len(), "parsed translation unit");
            Ok(tree)
        }
    }
}

impl Drop for ClangParser {
    fn drop(&mut self) {
        unsafe {
            clang_sys::clang_disposeIndex(self.index);
        }
    }
}

/// Log every diagnostic; fail on the first fatal one.
fn check_diagnostics(tu: clang_sys::CXTranslationUnit) -> Result<()> {
    unsafe {
        let mut fatal = None;
        let options = clang_sys::clang_defaultDiagnosticDisplayOptions();

        for i in 0..clang_sys::clang_getNumDiagnostics(tu) {
            let diag = clang_sys::clang_getDiagnostic(tu, i);
            let severity = clang_sys::clang_getDiagnosticSeverity(diag);
            let message = cx_string_to_string(clang_sys::clang_formatDiagnostic(diag, options));
            clang_sys::clang_disposeDiagnostic(diag);

            match severity {
                clang_sys::CXDiagnostic_Fatal => {
                    warn!("{message}");
                    fatal.get_or_insert(message);
                }
                clang_sys::CXDiagnostic_Error | clang_sys::CXDiagnostic_Warning => warn!("{message}"),
                _ => debug!("{message}"),
            }
        }

        match fatal {
            Some(message) => Err(miette!("Fatal error processing translation unit: {}", message)),
            None => Ok(()),
        }
    }
}

/// Builds a [`DeclTree`] from a parsed translation unit.
///
/// Nodes are created in one walk over the cursors; types are converted
/// afterwards so that every declaration a type refers to already has a
/// [`NodeId`].
struct Walker {
    tu: clang_sys::CXTranslationUnit,
    tree: DeclTree,
    cursors: Vec<(NodeId, clang_sys::CXCursor)>,
    /// Canonical declaration cursors by hash: (cursor, node, is definition)
    declarations: FxHashMap<c_uint, Vec<(clang_sys::CXCursor, NodeId, bool)>>,
}

struct VisitContext<'w> {
    walker: &'w mut Walker,
    parent: NodeId,
}

impl Walker {
    fn new(tu: clang_sys::CXTranslationUnit, filename: &str) -> Self {
        Self {
            tu,
            tree: DeclTree::new(filename),
            cursors: Vec::new(),
            declarations: FxHashMap::default(),
        }
    }

    fn run(mut self) -> DeclTree {
        let root = self.tree.root();
        unsafe {
            let cursor = clang_sys::clang_getTranslationUnitCursor(self.tu);
            self.visit_children(cursor, root);
        }
        self.resolve_types();
        self.tree
    }

    fn visit_children(&mut self, cursor: clang_sys::CXCursor, parent: NodeId) {
        extern "C" fn visitor(
            child: clang_sys::CXCursor,
            _parent: clang_sys::CXCursor,
            data: clang_sys::CXClientData,
        ) -> clang_sys::CXChildVisitResult {
            unsafe {
                let context = &mut *(data as *mut VisitContext<'_>);

                // Skip null cursors
                if clang_sys::clang_Cursor_isNull(child) == 0 {
                    context.walker.visit(child, context.parent);
                }
                clang_sys::CXChildVisit_Continue
            }
        }

        let mut context = VisitContext {
            walker: self,
            parent,
        };
        unsafe {
            clang_sys::clang_visitChildren(
                cursor,
                visitor,
                &mut context as *mut VisitContext<'_> as clang_sys::CXClientData,
            );
        }
    }

    fn visit(&mut self, cursor: clang_sys::CXCursor, parent: NodeId) {
        let kind = unsafe { convert_cursor_kind(clang_sys::clang_getCursorKind(cursor)) };
        let wanted = match self.tree[parent].kind {
            NodeKind::TranslationUnit => true,
            NodeKind::StructDecl | NodeKind::UnionDecl => matches!(
                kind,
                NodeKind::FieldDecl | NodeKind::StructDecl | NodeKind::UnionDecl | NodeKind::EnumDecl
            ),
            NodeKind::EnumDecl => kind == NodeKind::EnumConstantDecl,
            _ => false,
        };
        if !wanted {
            return;
        }

        let mut node = DeclNode::new(kind, declaration_name(cursor, kind))
            .with_location(cursor_location(cursor));

        unsafe {
            match kind {
                NodeKind::EnumConstantDecl => {
                    node.enum_value = Some(self.enum_value(cursor, parent));
                }
                NodeKind::FieldDecl => {
                    if clang_sys::clang_Cursor_isBitField(cursor) != 0 {
                        let width = clang_sys::clang_getFieldDeclBitWidth(cursor);
                        node.bit_width = u32::try_from(width).ok();
                    }
                }
                NodeKind::MacroDefinition => {
                    node.function_like = clang_sys::clang_Cursor_isMacroFunctionLike(cursor) != 0;
                    if !node.is_synthesized() {
                        node.tokens = self.macro_tokens(cursor);
                    }
                }
                _ => {}
            }
        }

        let id = self.tree.add(parent, node);
        self.cursors.push((id, cursor));

        match kind {
            NodeKind::StructDecl | NodeKind::UnionDecl | NodeKind::EnumDecl => {
                self.register(cursor, id);
                self.visit_children(cursor, id);
            }
            NodeKind::TypedefDecl => self.register(cursor, id),
            _ => {}
        }
    }

    fn register(&mut self, cursor: clang_sys::CXCursor, id: NodeId) {
        unsafe {
            let canonical = clang_sys::clang_getCanonicalCursor(cursor);
            let is_definition = clang_sys::clang_isCursorDefinition(cursor) != 0;
            self.declarations
                .entry(clang_sys::clang_hashCursor(canonical))
                .or_default()
                .push((canonical, id, is_definition));
        }
    }

    /// The node declaring `cursor`, preferring its definition.
    fn lookup(&self, cursor: clang_sys::CXCursor) -> Option<NodeId> {
        unsafe {
            if clang_sys::clang_Cursor_isNull(cursor) != 0 {
                return None;
            }
            let canonical = clang_sys::clang_getCanonicalCursor(cursor);
            let candidates = self.declarations.get(&clang_sys::clang_hashCursor(canonical))?;

            let mut found = None;
            for &(candidate, id, is_definition) in candidates {
                if clang_sys::clang_equalCursors(candidate, canonical) == 0 {
                    continue;
                }
                if is_definition {
                    return Some(id);
                }
                found.get_or_insert(id);
            }
            found
        }
    }

    fn resolve_types(&mut self) {
        let cursors = std::mem::take(&mut self.cursors);

        for &(id, cursor) in &cursors {
            let kind = self.tree[id].kind;
            let (ty, underlying) = unsafe {
                match kind {
                    NodeKind::StructDecl | NodeKind::UnionDecl => {
                        let mut ty = self.convert_type(clang_sys::clang_getCursorType(cursor));
                        if clang_sys::clang_isCursorDefinition(cursor) == 0 {
                            ty.size = None;
                            ty.alignment = None;
                        }
                        ty.declaration = Some(id);
                        (Some(ty), None)
                    }
                    NodeKind::EnumDecl => {
                        let mut ty = self.convert_type(clang_sys::clang_getCursorType(cursor));
                        ty.declaration = Some(id);
                        let integer = self.convert_type(clang_sys::clang_getEnumDeclIntegerType(cursor));
                        (Some(ty), Some(integer))
                    }
                    NodeKind::TypedefDecl => {
                        let ty = self.convert_type(clang_sys::clang_getCursorType(cursor));
                        let underlying =
                            self.convert_type(clang_sys::clang_getTypedefDeclUnderlyingType(cursor));
                        (Some(ty), Some(underlying))
                    }
                    NodeKind::FieldDecl | NodeKind::FunctionDecl | NodeKind::VarDecl => {
                        (Some(self.convert_type(clang_sys::clang_getCursorType(cursor))), None)
                    }
                    _ => (None, None),
                }
            };

            if let Some(node) = self.tree.get_mut(id) {
                if ty.is_some() {
                    node.ty = ty;
                }
                if underlying.is_some() {
                    node.underlying = underlying;
                }
            }
        }

        self.cursors = cursors;
    }

    /// Convert a libclang type, with its layout and declaring node.
    fn convert_type(&self, ty: clang_sys::CXType) -> TypeInfo {
        unsafe {
            let spelling = cx_string_to_string(clang_sys::clang_getTypeSpelling(ty));
            let is_const = clang_sys::clang_isConstQualifiedType(ty) != 0;

            let mut info = match ty.kind {
                clang_sys::CXType_Elaborated => {
                    // `struct foo` written out; the named type carries the rest
                    let named = self.convert_type(clang_sys::clang_Type_getNamedType(ty));
                    return TypeInfo {
                        spelling,
                        is_const,
                        ..named
                    };
                }

                clang_sys::CXType_Pointer => {
                    let mut info = TypeInfo::new(TypeKind::Pointer, spelling);
                    let pointee = self.convert_type(clang_sys::clang_getPointeeType(ty));
                    info.pointee = Some(Box::new(pointee));
                    info
                }

                clang_sys::CXType_ConstantArray => {
                    let mut info = TypeInfo::new(TypeKind::ConstantArray, spelling);
                    let element = self.convert_type(clang_sys::clang_getArrayElementType(ty));
                    info.element = Some(Box::new(element));
                    info.array_size = u64::try_from(clang_sys::clang_getArraySize(ty)).ok();
                    info
                }

                clang_sys::CXType_IncompleteArray => {
                    let mut info = TypeInfo::new(TypeKind::IncompleteArray, spelling);
                    let element = self.convert_type(clang_sys::clang_getArrayElementType(ty));
                    info.element = Some(Box::new(element));
                    info
                }

                clang_sys::CXType_Record => TypeInfo::new(TypeKind::Record, spelling),
                clang_sys::CXType_Enum => TypeInfo::new(TypeKind::Enum, spelling),
                clang_sys::CXType_Typedef => TypeInfo::new(TypeKind::Typedef, spelling),

                clang_sys::CXType_FunctionProto | clang_sys::CXType_FunctionNoProto => {
                    TypeInfo::new(TypeKind::Function, spelling)
                }

                kind if (clang_sys::CXType_Void..=clang_sys::CXType_Ibm128)
                    .contains(&kind) =>
                {
                    TypeInfo::new(TypeKind::Builtin, spelling)
                }

                _ => TypeInfo::new(TypeKind::Other, spelling),
            };

            info.is_const = is_const;

            // sizeof(void) and sizeof(function) are GNU extensions, not layout
            let canonical = clang_sys::clang_getCanonicalType(ty).kind;
            let sized = !matches!(
                canonical,
                clang_sys::CXType_Void | clang_sys::CXType_FunctionProto | clang_sys::CXType_FunctionNoProto
            );
            if sized {
                info.size = u64::try_from(clang_sys::clang_Type_getSizeOf(ty)).ok();
                info.alignment = u64::try_from(clang_sys::clang_Type_getAlignOf(ty)).ok();
            }

            if matches!(info.kind, TypeKind::Record | TypeKind::Enum | TypeKind::Typedef) {
                info.declaration = self.lookup(clang_sys::clang_getTypeDeclaration(ty));
            }
            info
        }
    }

    /// Enum constant value, read as unsigned when the enum's integer type is.
    unsafe fn enum_value(&self, cursor: clang_sys::CXCursor, parent: NodeId) -> i128 {
        let enum_cursor = self
            .cursors
            .iter()
            .rev()
            .find(|(id, _)| *id == parent)
            .map(|&(_, cursor)| cursor);

        let unsigned = enum_cursor.is_some_and(|enum_cursor| {
            let integer = clang_sys::clang_getEnumDeclIntegerType(enum_cursor);
            is_unsigned(clang_sys::clang_getCanonicalType(integer).kind)
        });

        if unsigned {
            i128::from(clang_sys::clang_getEnumConstantDeclUnsignedValue(cursor))
        } else {
            i128::from(clang_sys::clang_getEnumConstantDeclValue(cursor))
        }
    }

    /// Tokens spanning a macro definition, starting with its name.
    unsafe fn macro_tokens(&self, cursor: clang_sys::CXCursor) -> Vec<Token> {
        let range = clang_sys::clang_getCursorExtent(cursor);
        let mut tokens: *mut clang_sys::CXToken = ptr::null_mut();
        let mut count: c_uint = 0;
        clang_sys::clang_tokenize(self.tu, range, &mut tokens, &mut count);
        if tokens.is_null() {
            return Vec::new();
        }

        let converted = std::slice::from_raw_parts(tokens, count as usize)
            .iter()
            .map(|&token| {
                let kind = convert_token_kind(clang_sys::clang_getTokenKind(token));
                let spelling = cx_string_to_string(clang_sys::clang_getTokenSpelling(self.tu, token));
                Token::new(kind, spelling)
            })
            .collect();

        clang_sys::clang_disposeTokens(self.tu, tokens, count);
        converted
    }
}

/// Convert a Clang cursor kind to our node kind.
fn convert_cursor_kind(kind: clang_sys::CXCursorKind) -> NodeKind {
    match kind {
        clang_sys::CXCursor_EnumDecl => NodeKind::EnumDecl,
        clang_sys::CXCursor_EnumConstantDecl => NodeKind::EnumConstantDecl,
        clang_sys::CXCursor_StructDecl => NodeKind::StructDecl,
        clang_sys::CXCursor_UnionDecl => NodeKind::UnionDecl,
        clang_sys::CXCursor_TypedefDecl => NodeKind::TypedefDecl,
        clang_sys::CXCursor_FieldDecl => NodeKind::FieldDecl,
        clang_sys::CXCursor_FunctionDecl => NodeKind::FunctionDecl,
        clang_sys::CXCursor_VarDecl => NodeKind::VarDecl,
        clang_sys::CXCursor_MacroDefinition => NodeKind::MacroDefinition,
        clang_sys::CXCursor_MacroExpansion => NodeKind::MacroExpansion,
        clang_sys::CXCursor_InclusionDirective => NodeKind::InclusionDirective,
        clang_sys::CXCursor_TypeRef => NodeKind::TypeRef,
        k if (clang_sys::CXCursor_UnexposedExpr..=clang_sys::CXCursor_CXXParenListInitExpr).contains(&k) => {
            NodeKind::Expression
        }
        _ => NodeKind::Other,
    }
}

fn convert_token_kind(kind: clang_sys::CXTokenKind) -> TokenKind {
    match kind {
        clang_sys::CXToken_Keyword => TokenKind::Keyword,
        clang_sys::CXToken_Identifier => TokenKind::Identifier,
        clang_sys::CXToken_Literal => TokenKind::Literal,
        clang_sys::CXToken_Comment => TokenKind::Comment,
        _ => TokenKind::Punctuation,
    }
}

fn is_unsigned(kind: clang_sys::CXTypeKind) -> bool {
    matches!(
        kind,
        clang_sys::CXType_Bool
            | clang_sys::CXType_Char_U
            | clang_sys::CXType_UChar
            | clang_sys::CXType_UShort
            | clang_sys::CXType_UInt
            | clang_sys::CXType_ULong
            | clang_sys::CXType_ULongLong
            | clang_sys::CXType_UInt128
    )
}

/// Cursor spelling, or the empty string for anonymous records and enums.
fn declaration_name(cursor: clang_sys::CXCursor, kind: NodeKind) -> String {
    let name = cursor_spelling(cursor);
    if !matches!(kind, NodeKind::StructDecl | NodeKind::UnionDecl | NodeKind::EnumDecl) {
        return name;
    }

    let anonymous = unsafe { clang_sys::clang_Cursor_isAnonymous(cursor) != 0 }
        || name.contains("(unnamed")
        || name.contains("(anonymous");
    if anonymous {
        String::new()
    } else {
        name
    }
}

/// Get source location from cursor.
fn cursor_location(cursor: clang_sys::CXCursor) -> SourceLocation {
    unsafe {
        let loc = clang_sys::clang_getCursorLocation(cursor);
        let mut file: clang_sys::CXFile = ptr::null_mut();
        let mut line: u32 = 0;
        let mut column: u32 = 0;
        let mut offset: u32 = 0;

        clang_sys::clang_getSpellingLocation(loc, &mut file, &mut line, &mut column, &mut offset);

        let file_name = if !file.is_null() {
            Some(cx_string_to_string(clang_sys::clang_getFileName(file)))
        } else {
            None
        };

        SourceLocation {
            file: file_name,
            line,
            column,
            offset,
        }
    }
}

/// Convert a CXString to a Rust String.
fn cx_string_to_string(cx_string: clang_sys::CXString) -> String {
    unsafe {
        let c_str = clang_sys::clang_getCString(cx_string);
        let result = if c_str.is_null() {
            String::new()
        } else {
            CStr::from_ptr(c_str).to_string_lossy().into_owned()
        };
        clang_sys::clang_disposeString(cx_string);
        result
    }
}

/// Get the spelling of a cursor.
fn cursor_spelling(cursor: clang_sys::CXCursor) -> String {
    unsafe {
        let spelling = clang_sys::clang_getCursorSpelling(cursor);
        cx_string_to_string(spelling)
    }
}
