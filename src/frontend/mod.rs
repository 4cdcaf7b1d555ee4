//! The front-end model: everything the analysis needs to know about one
//! parsed and resolved Go package.
//!
//! A front-end produces a [`PackageInfo`]: the declaration tree of every
//! file, a table of semantic types, a table of objects (declared entities),
//! and four lookup tables keyed by identifier occurrence. The analysis only
//! ever reads it. [`PackageBuilder`] is the single way to construct one.

pub mod go;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

/// Trait implemented by each package front-end.
///
/// `load` takes `&mut self` so implementations can reuse an internal parser
/// across calls.
pub trait Frontend: Send {
    fn load(&mut self, dir: &Path) -> Result<PackageInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Import path (or directory, for the analyzed package).
    pub path: String,
    /// Name from the `package` clause.
    pub name: String,
}

// ── Semantic types ──

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Predeclared scalar (`int`, `string`, ...) or `invalid` when the
    /// front-end could not work a type out.
    Basic { name: String },
    /// A declared type. `package` is `None` for universe types like `error`.
    Named {
        name: String,
        package: Option<PackageId>,
        underlying: TypeId,
        type_args: Vec<TypeId>,
    },
    Struct { fields: Vec<Field> },
    Interface {
        embedded: Vec<TypeId>,
        methods: Vec<Method>,
    },
    Signature(Signature),
    Map { key: TypeId, value: TypeId },
    Slice { elem: TypeId },
    Array { elem: TypeId },
    Pointer { elem: TypeId },
    Chan { elem: TypeId },
    TypeParam { name: String, constraint: TypeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub signature: TypeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub recv: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
}

// ── Objects ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Const,
    Var,
    TypeName,
    Func,
    PkgName,
}

/// A declared entity: package-level declaration, local variable, struct
/// field, method, or imported package name.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub package: Option<PackageId>,
    pub ty: TypeId,
}

// ── Declaration tree ──

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub id: IdentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub path: String,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
    /// A declaration the front-end could not classify. The Go loader never
    /// emits it: unknown top-level syntax is a load error there, so reaching
    /// the analysis with one is a broken front-end.
    Bad(BadDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclToken {
    Import,
    Const,
    Var,
    Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub tok: DeclToken,
    pub specs: Vec<Spec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Import { path: String },
    Value { names: Vec<Ident> },
    Type { name: Ident },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Ident,
    pub recv: Option<Receiver>,
    /// `None` for functions declared without a body.
    pub body: Option<SyntaxNode>,
}

/// Syntactic receiver of a method: `(s *Server)` → `Server`, pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadDecl {
    pub kind: String,
    pub line: u32,
}

/// A function body reduced to the structure the analysis walks: nested
/// syntax nodes whose leaves are identifier occurrences.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Ident(Ident),
    Node {
        kind: String,
        children: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    pub fn node(kind: impl Into<String>, children: Vec<SyntaxNode>) -> Self {
        Self::Node {
            kind: kind.into(),
            children,
        }
    }

    /// Depth-first, source-order walk over every identifier occurrence.
    pub fn walk_idents<'a>(&'a self, visit: &mut impl FnMut(&'a Ident)) {
        match self {
            Self::Ident(ident) => visit(ident),
            Self::Node { children, .. } => {
                for child in children {
                    child.walk_idents(visit);
                }
            }
        }
    }
}

// ── Package ──

#[derive(Debug, Clone, Default, PartialEq)]
struct TypeInfo {
    types: HashMap<IdentId, TypeId>,
    defs: HashMap<IdentId, ObjectId>,
    uses: HashMap<IdentId, ObjectId>,
    implicits: HashMap<IdentId, ObjectId>,
}

/// One loaded package, ready for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    package: PackageId,
    packages: Vec<Package>,
    files: Vec<File>,
    types: Vec<Type>,
    objects: Vec<Object>,
    info: TypeInfo,
}

impl PackageInfo {
    /// The package being analyzed.
    pub fn package(&self) -> PackageId {
        self.package
    }

    pub fn package_data(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.0 as usize)
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn ty(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }

    /// The type the expression rooted at this identifier evaluates to.
    pub fn type_of(&self, ident: &Ident) -> Option<TypeId> {
        self.info.types.get(&ident.id).copied()
    }

    /// The object this identifier defines.
    pub fn defined(&self, ident: &Ident) -> Option<&Object> {
        self.lookup(&self.info.defs, ident)
    }

    /// The object this identifier refers to.
    pub fn used(&self, ident: &Ident) -> Option<&Object> {
        self.lookup(&self.info.uses, ident)
    }

    /// The object the compiler implicitly declares at this identifier.
    pub fn implicit(&self, ident: &Ident) -> Option<&Object> {
        self.lookup(&self.info.implicits, ident)
    }

    fn lookup(&self, table: &HashMap<IdentId, ObjectId>, ident: &Ident) -> Option<&Object> {
        table.get(&ident.id).and_then(|&id| self.object(id))
    }
}

/// Incremental construction of a [`PackageInfo`].
///
/// Types and objects are append-only tables; named types are created first
/// and have their underlying type filled in later, which is how recursive
/// type definitions are expressed.
#[derive(Debug)]
pub struct PackageBuilder {
    pkg: PackageInfo,
    next_ident: u32,
    basics: HashMap<String, TypeId>,
}

impl PackageBuilder {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        let mut builder = Self {
            pkg: PackageInfo {
                package: PackageId(0),
                packages: vec![Package {
                    path: path.into(),
                    name: name.into(),
                }],
                files: Vec::new(),
                types: Vec::new(),
                objects: Vec::new(),
                info: TypeInfo::default(),
            },
            next_ident: 0,
            basics: HashMap::new(),
        };
        // Slot 0 is always `invalid`, the placeholder for unknown types.
        builder.basic("invalid");
        builder
    }

    pub fn package(&self) -> PackageId {
        self.pkg.package
    }

    /// Register (or find) another package by import path.
    pub fn foreign_package(&mut self, path: &str) -> PackageId {
        if let Some(idx) = self.pkg.packages.iter().position(|p| p.path == path) {
            return PackageId(idx as u32);
        }
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.pkg.packages.push(Package {
            path: path.to_string(),
            name,
        });
        PackageId(self.pkg.packages.len() as u32 - 1)
    }

    // ── Types ──

    pub fn add_type(&mut self, ty: Type) -> TypeId {
        self.pkg.types.push(ty);
        TypeId(self.pkg.types.len() as u32 - 1)
    }

    /// Overwrite a previously added type.
    pub fn replace_type(&mut self, id: TypeId, ty: Type) {
        if let Some(slot) = self.pkg.types.get_mut(id.0 as usize) {
            *slot = ty;
        }
    }

    pub fn type_data(&self, id: TypeId) -> Option<&Type> {
        self.pkg.ty(id)
    }

    pub fn invalid(&self) -> TypeId {
        TypeId(0)
    }

    pub fn basic(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.basics.get(name) {
            return id;
        }
        let id = self.add_type(Type::Basic {
            name: name.to_string(),
        });
        self.basics.insert(name.to_string(), id);
        id
    }

    /// A named type declared in the analyzed package, underlying type unset.
    pub fn named(&mut self, name: &str) -> TypeId {
        let package = Some(self.pkg.package);
        self.named_in(name, package)
    }

    pub fn named_in(&mut self, name: &str, package: Option<PackageId>) -> TypeId {
        let underlying = self.invalid();
        self.add_type(Type::Named {
            name: name.to_string(),
            package,
            underlying,
            type_args: Vec::new(),
        })
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying_ty: TypeId) {
        if let Some(Type::Named { underlying, .. }) = self.pkg.types.get_mut(named.0 as usize) {
            *underlying = underlying_ty;
        }
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Pointer { elem })
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Slice { elem })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add_type(Type::Map { key, value })
    }

    pub fn struct_of(&mut self, fields: Vec<Field>) -> TypeId {
        self.add_type(Type::Struct { fields })
    }

    pub fn signature(&mut self, sig: Signature) -> TypeId {
        self.add_type(Type::Signature(sig))
    }

    /// Follow named types down to their underlying structure.
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        // Bounded: a malformed table must not hang the loader.
        for _ in 0..64 {
            match self.pkg.ty(id) {
                Some(Type::Named { underlying, .. }) => id = *underlying,
                _ => return id,
            }
        }
        id
    }

    // ── Objects and identifiers ──

    pub fn add_object(
        &mut self,
        name: &str,
        kind: ObjectKind,
        package: Option<PackageId>,
        ty: TypeId,
    ) -> ObjectId {
        self.pkg.objects.push(Object {
            name: name.to_string(),
            kind,
            package,
            ty,
        });
        ObjectId(self.pkg.objects.len() as u32 - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.pkg.object(id)
    }

    pub fn set_object_type(&mut self, id: ObjectId, ty: TypeId) {
        if let Some(obj) = self.pkg.objects.get_mut(id.0 as usize) {
            obj.ty = ty;
        }
    }

    /// A fresh identifier occurrence.
    pub fn ident(&mut self, name: &str) -> Ident {
        let id = IdentId(self.next_ident);
        self.next_ident += 1;
        Ident {
            id,
            name: name.to_string(),
        }
    }

    pub fn record_type(&mut self, ident: &Ident, ty: TypeId) {
        self.pkg.info.types.insert(ident.id, ty);
    }

    pub fn record_def(&mut self, ident: &Ident, obj: ObjectId) {
        self.pkg.info.defs.insert(ident.id, obj);
    }

    pub fn record_use(&mut self, ident: &Ident, obj: ObjectId) {
        self.pkg.info.uses.insert(ident.id, obj);
    }

    pub fn record_implicit(&mut self, ident: &Ident, obj: ObjectId) {
        self.pkg.info.implicits.insert(ident.id, obj);
    }

    pub fn add_file(&mut self, file: File) {
        self.pkg.files.push(file);
    }

    pub fn build(self) -> PackageInfo {
        self.pkg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tables() {
        let mut b = PackageBuilder::new("example.com/shop", "shop");
        let int = b.basic("int");
        assert_eq!(b.basic("int"), int);

        let order = b.named("Order");
        let fields = vec![Field {
            name: "Qty".into(),
            ty: int,
            embedded: false,
        }];
        let st = b.struct_of(fields);
        b.set_underlying(order, st);
        assert_eq!(b.underlying(order), st);

        let obj = b.add_object("Order", ObjectKind::TypeName, Some(b.package()), order);
        let ident = b.ident("Order");
        b.record_def(&ident, obj);

        let pkg = b.build();
        assert_eq!(pkg.defined(&ident).map(|o| o.kind), Some(ObjectKind::TypeName));
        assert!(pkg.used(&ident).is_none());
        assert!(matches!(pkg.ty(st), Some(Type::Struct { .. })));
        assert_eq!(pkg.package_data(pkg.package()).unwrap().name, "shop");
    }

    #[test]
    fn test_foreign_package_dedup() {
        let mut b = PackageBuilder::new("example.com/shop", "shop");
        let io = b.foreign_package("io");
        let http = b.foreign_package("net/http");
        assert_eq!(b.foreign_package("io"), io);
        assert_ne!(io, http);
        assert_ne!(io, b.package());

        let pkg = b.build();
        assert_eq!(pkg.package_data(http).unwrap().name, "http");
    }

    #[test]
    fn test_idents_are_distinct_occurrences() {
        let mut b = PackageBuilder::new("p", "p");
        let first = b.ident("x");
        let second = b.ident("x");
        assert_ne!(first, second);
    }

    #[test]
    fn test_walk_idents_source_order() {
        let mut b = PackageBuilder::new("p", "p");
        let x = b.ident("x");
        let y = b.ident("y");
        let z = b.ident("z");
        let body = SyntaxNode::node(
            "block",
            vec![
                SyntaxNode::node("short_var_declaration", vec![SyntaxNode::Ident(x)]),
                SyntaxNode::node(
                    "call_expression",
                    vec![SyntaxNode::Ident(y), SyntaxNode::node("argument_list", vec![])],
                ),
                SyntaxNode::Ident(z),
            ],
        );

        let mut seen = Vec::new();
        body.walk_idents(&mut |ident| seen.push(ident.name.as_str()));
        assert_eq!(seen, ["x", "y", "z"]);
    }
}
