//! Symbol and type model for scanned C declarations.
//!
//! Types live in a per-session [`TypeArena`] and are addressed by
//! [`TypeId`]. Struct, union and enum tags are registered in a side table so
//! a forward reference and the later definition share one node.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::directive::Directive;

/// Index of a [`Type`] in its session's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of entity a symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Function,
    Variable,
    Typedef,
    Member,
    EnumMember,
    /// Macro-derived constant
    Const,
    /// Tagged struct definition
    Struct,
    /// Tagged union definition
    Union,
    /// Enum definition (tagged or anonymous)
    Enum,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Member => "member",
            SymbolKind::EnumMember => "enum-member",
            SymbolKind::Const => "const",
            SymbolKind::Struct => "struct",
            SymbolKind::Union => "union",
            SymbolKind::Enum => "enum",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Void,
    Base,
    Struct,
    Union,
    Enum,
    Pointer,
    Array,
    Function,
    TypedefName,
    /// Forward reference that has not been defined (yet)
    Unknown,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Base => "base",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Pointer => "pointer",
            TypeKind::Array => "array",
            TypeKind::Function => "function",
            TypeKind::TypedefName => "typedef-name",
            TypeKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag namespace entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

impl TagKind {
    pub fn type_kind(self) -> TypeKind {
        match self {
            TagKind::Struct => TypeKind::Struct,
            TagKind::Union => TypeKind::Union,
            TagKind::Enum => TypeKind::Enum,
        }
    }

    pub fn symbol_kind(self) -> SymbolKind {
        match self {
            TagKind::Struct => SymbolKind::Struct,
            TagKind::Union => SymbolKind::Union,
            TagKind::Enum => SymbolKind::Enum,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Struct => "struct",
            TagKind::Union => "union",
            TagKind::Enum => "enum",
        }
    }
}

bitflags! {
    /// Storage class specifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StorageClass: u8 {
        const TYPEDEF = 1 << 0;
        const EXTERN = 1 << 1;
        const STATIC = 1 << 2;
        const AUTO = 1 << 3;
        const REGISTER = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
    }
}

bitflags! {
    /// Type qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

bitflags! {
    /// Function specifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FunctionSpecifier: u8 {
        const INLINE = 1 << 0;
        const NORETURN = 1 << 1;
    }
}

/// Lower-case C spellings of the set flags, space separated.
fn flag_words(names: impl Iterator<Item = &'static str>) -> String {
    names
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl StorageClass {
    pub fn spelling(&self) -> String {
        flag_words(self.iter_names().map(|(name, _)| name))
    }
}

impl TypeQualifiers {
    pub fn spelling(&self) -> String {
        flag_words(self.iter_names().map(|(name, _)| name))
    }
}

impl FunctionSpecifier {
    pub fn spelling(&self) -> String {
        flag_words(self.iter_names().map(|(name, _)| name))
    }
}

/// One declared C entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub(crate) kind: SymbolKind,
    pub(crate) ident: Option<String>,
    pub(crate) base_type: TypeId,
    pub(crate) const_int: Option<i64>,
    pub(crate) const_string: Option<String>,
    pub(crate) bit_width: Option<i64>,
    pub(crate) file: PathBuf,
    pub(crate) line: u32,
    pub(crate) raw_directives: Vec<Directive>,
    directive_override: OnceCell<Vec<Directive>>,
}

impl Symbol {
    pub(crate) fn new(
        kind: SymbolKind,
        ident: Option<String>,
        base_type: TypeId,
        file: impl Into<PathBuf>,
        line: u32,
    ) -> Self {
        Symbol {
            kind,
            ident,
            base_type,
            const_int: None,
            const_string: None,
            bit_width: None,
            file: file.into(),
            line,
            raw_directives: Vec::new(),
            directive_override: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn base_type(&self) -> TypeId {
        self.base_type
    }

    pub fn const_int(&self) -> Option<i64> {
        self.const_int
    }

    pub fn const_string(&self) -> Option<&str> {
        self.const_string.as_deref()
    }

    pub fn bit_width(&self) -> Option<i64> {
        self.bit_width
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Directives as attached by the parser.
    pub fn raw_directives(&self) -> &[Directive] {
        &self.raw_directives
    }

    /// The consumer's directive list if one was set, else the parsed one.
    pub fn directives(&self) -> &[Directive] {
        self.directive_override
            .get()
            .map(Vec::as_slice)
            .unwrap_or(&self.raw_directives)
    }

    /// Replace the directive list. Only the first call succeeds; a later call
    /// hands the rejected list back.
    pub fn set_directives(&self, directives: Vec<Directive>) -> Result<(), Vec<Directive>> {
        self.directive_override.set(directives)
    }

    /// Whether `set_directives` has been called.
    pub fn has_directive_override(&self) -> bool {
        self.directive_override.get().is_some()
    }
}

/// One node of the type graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub(crate) kind: TypeKind,
    pub(crate) storage_class: StorageClass,
    pub(crate) qualifiers: TypeQualifiers,
    pub(crate) function_specifier: FunctionSpecifier,
    pub(crate) name: Option<String>,
    pub(crate) base_type: Option<TypeId>,
    pub(crate) child_list: Vec<Symbol>,
    pub(crate) array_len: Option<i64>,
    pub(crate) variadic: bool,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type {
            kind,
            storage_class: StorageClass::empty(),
            qualifiers: TypeQualifiers::empty(),
            function_specifier: FunctionSpecifier::empty(),
            name: None,
            base_type: None,
            child_list: Vec::new(),
            array_len: None,
            variadic: false,
        }
    }

    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Type {
            name: Some(name.into()),
            ..Type::new(kind)
        }
    }

    pub fn derived(kind: TypeKind, base: TypeId) -> Self {
        Type {
            base_type: Some(base),
            ..Type::new(kind)
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn storage_class(&self) -> StorageClass {
        self.storage_class
    }

    pub fn qualifiers(&self) -> TypeQualifiers {
        self.qualifiers
    }

    pub fn function_specifier(&self) -> FunctionSpecifier {
        self.function_specifier
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn base_type(&self) -> Option<TypeId> {
        self.base_type
    }

    /// Members, parameters or enumerators.
    pub fn child_list(&self) -> &[Symbol] {
        &self.child_list
    }

    pub fn array_len(&self) -> Option<i64> {
        self.array_len
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Whether this is a struct/union/enum (defined or forward-declared).
    pub fn is_tagged(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Struct | TypeKind::Union | TypeKind::Enum | TypeKind::Unknown
        )
    }
}

/// Saved state for undoing one file's additions.
#[derive(Debug)]
struct ArenaCheckpoint {
    len: usize,
    tags: HashMap<(TagKind, String), TypeId>,
    // previous contents of nodes changed since the checkpoint
    saved: Vec<(TypeId, Type)>,
}

/// Owning store of every type node created in a session.
#[derive(Debug, Default)]
pub struct TypeArena {
    nodes: Vec<Type>,
    tags: HashMap<(TagKind, String), TypeId>,
    checkpoint: Option<ArenaCheckpoint>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.nodes.len());
        self.nodes.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.nodes[id.0]
    }

    /// Mutable access; nodes older than the active checkpoint are saved first.
    pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut Type {
        if let Some(cp) = &mut self.checkpoint {
            if id.0 < cp.len && !cp.saved.iter().any(|(saved, _)| *saved == id) {
                cp.saved.push((id, self.nodes[id.0].clone()));
            }
        }
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.nodes.iter().enumerate().map(|(i, ty)| (TypeId(i), ty))
    }

    pub fn lookup_tag(&self, kind: TagKind, name: &str) -> Option<TypeId> {
        self.tags.get(&(kind, name.to_string())).copied()
    }

    /// The node for `kind name`, creating an `Unknown` placeholder on first mention.
    pub fn tag_ref(&mut self, kind: TagKind, name: &str) -> TypeId {
        if let Some(id) = self.lookup_tag(kind, name) {
            return id;
        }
        let id = self.alloc(Type::named(TypeKind::Unknown, name));
        self.tags.insert((kind, name.to_string()), id);
        id
    }

    /// Whether the tag already has a body.
    pub fn is_tag_defined(&self, kind: TagKind, name: &str) -> bool {
        self.lookup_tag(kind, name)
            .is_some_and(|id| self.get(id).kind != TypeKind::Unknown)
    }

    /// Start recording changes so they can be undone with [`rollback`](Self::rollback).
    pub(crate) fn checkpoint(&mut self) {
        self.checkpoint = Some(ArenaCheckpoint {
            len: self.nodes.len(),
            tags: self.tags.clone(),
            saved: Vec::new(),
        });
    }

    /// Keep everything done since the checkpoint.
    pub(crate) fn commit(&mut self) {
        self.checkpoint = None;
    }

    /// Undo everything done since the checkpoint.
    pub(crate) fn rollback(&mut self) {
        let Some(cp) = self.checkpoint.take() else {
            return;
        };
        self.nodes.truncate(cp.len);
        self.tags = cp.tags;
        for (id, ty) in cp.saved {
            self.nodes[id.0] = ty;
        }
    }

    /// C-like spelling of a type, e.g. `const char *` or `int (*)(void *, ...)`.
    pub fn spell(&self, id: TypeId) -> String {
        let ty = self.get(id);
        let quals = ty.qualifiers.spelling();
        let base = ty.base_type.map(|b| self.spell(b));

        match ty.kind {
            TypeKind::Pointer => {
                let inner = base.unwrap_or_else(|| "void".to_string());
                if quals.is_empty() {
                    format!("{} *", inner)
                } else {
                    format!("{} * {}", inner, quals)
                }
            }
            TypeKind::Array => {
                let inner = base.unwrap_or_else(|| "void".to_string());
                match ty.array_len {
                    Some(len) => format!("{}[{}]", inner, len),
                    None => format!("{}[]", inner),
                }
            }
            TypeKind::Function => {
                let mut params: Vec<String> =
                    ty.child_list.iter().map(|p| self.spell(p.base_type)).collect();
                if ty.variadic {
                    params.push("...".to_string());
                }
                let params = if params.is_empty() {
                    "void".to_string()
                } else {
                    params.join(", ")
                };
                format!("{} ({})", base.unwrap_or_else(|| "int".to_string()), params)
            }
            _ => {
                let head = match ty.kind {
                    TypeKind::Void => "void".to_string(),
                    TypeKind::Struct | TypeKind::Union | TypeKind::Enum => format!(
                        "{} {}",
                        ty.kind.as_str(),
                        ty.name.as_deref().unwrap_or("<anonymous>")
                    ),
                    _ => ty.name.clone().unwrap_or_else(|| "<unknown>".to_string()),
                };
                if quals.is_empty() {
                    head
                } else {
                    format!("{} {}", quals, head)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_ref_shares_node() {
        let mut arena = TypeArena::new();
        let early = arena.tag_ref(TagKind::Struct, "Foo");
        assert_eq!(arena.get(early).kind(), TypeKind::Unknown);
        assert!(!arena.is_tag_defined(TagKind::Struct, "Foo"));

        let late = arena.tag_ref(TagKind::Struct, "Foo");
        assert_eq!(early, late);

        arena.get_mut(late).kind = TypeKind::Struct;
        assert_eq!(arena.get(early).kind(), TypeKind::Struct);
        assert!(arena.is_tag_defined(TagKind::Struct, "Foo"));

        // separate namespace per tag kind
        assert_ne!(arena.tag_ref(TagKind::Union, "Foo"), early);
    }

    #[test]
    fn test_rollback_restores_nodes_and_tags() {
        let mut arena = TypeArena::new();
        let foo = arena.tag_ref(TagKind::Struct, "Foo");

        arena.checkpoint();
        arena.get_mut(foo).kind = TypeKind::Struct;
        arena.tag_ref(TagKind::Enum, "Bar");
        arena.alloc(Type::new(TypeKind::Void));
        arena.rollback();

        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(foo).kind(), TypeKind::Unknown);
        assert!(arena.lookup_tag(TagKind::Enum, "Bar").is_none());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut arena = TypeArena::new();
        arena.checkpoint();
        let id = arena.alloc(Type::named(TypeKind::Base, "int"));
        arena.commit();
        arena.rollback();
        assert_eq!(arena.get(id).name(), Some("int"));
    }

    #[test]
    fn test_spelling() {
        let mut arena = TypeArena::new();
        let mut ch = Type::named(TypeKind::Base, "char");
        ch.qualifiers = TypeQualifiers::CONST;
        let ch = arena.alloc(ch);
        let ptr = arena.alloc(Type::derived(TypeKind::Pointer, ch));
        assert_eq!(arena.spell(ptr), "const char *");

        let int = arena.alloc(Type::named(TypeKind::Base, "int"));
        let void = arena.alloc(Type::new(TypeKind::Void));
        let void_ptr = arena.alloc(Type::derived(TypeKind::Pointer, void));
        let mut func = Type::derived(TypeKind::Function, int);
        func.child_list
            .push(Symbol::new(SymbolKind::Variable, Some("data".into()), void_ptr, "t.h", 1));
        func.variadic = true;
        let func = arena.alloc(func);
        assert_eq!(arena.spell(func), "int (void *, ...)");

        let mut arr = Type::derived(TypeKind::Array, int);
        arr.array_len = Some(4);
        let arr = arena.alloc(arr);
        assert_eq!(arena.spell(arr), "int[4]");

        let anon = arena.alloc(Type::new(TypeKind::Struct));
        assert_eq!(arena.spell(anon), "struct <anonymous>");
    }

    #[test]
    fn test_flag_spelling() {
        let quals = TypeQualifiers::CONST | TypeQualifiers::VOLATILE;
        assert_eq!(quals.spelling(), "const volatile");
        assert_eq!(StorageClass::THREAD_LOCAL.spelling(), "thread_local");
        assert_eq!(FunctionSpecifier::empty().spelling(), "");
    }

    #[test]
    fn test_set_directives_once() {
        let mut arena = TypeArena::new();
        let int = arena.alloc(Type::named(TypeKind::Base, "int"));
        let mut sym = Symbol::new(SymbolKind::Function, Some("f".into()), int, "t.h", 1);
        sym.raw_directives.push(Directive::new("skip", "", Vec::new(), None));

        assert_eq!(sym.directives().len(), 1);
        assert!(sym.set_directives(Vec::new()).is_ok());
        assert!(sym.directives().is_empty());
        assert_eq!(sym.raw_directives().len(), 1);

        let rejected = sym
            .set_directives(vec![Directive::new("x", "", Vec::new(), None)])
            .unwrap_err();
        assert_eq!(rejected.len(), 1);
        assert!(sym.has_directive_override());
    }
}
