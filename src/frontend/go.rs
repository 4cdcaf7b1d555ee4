//! Go front-end built on tree-sitter-go.
//!
//! Parses every file of one package directory and resolves identifiers and
//! types well enough for dependency analysis. This is not a type checker:
//! block scopes are flattened per function and expression types are inferred
//! only for the common expression forms. Declaration-level information
//! (declared names, declared types, signatures) is exact.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, trace, warn};
use tree_sitter::{Language, Node, Parser, Tree};
use walkdir::WalkDir;

use super::{
    Decl, DeclToken, Field, File, FuncDecl, Frontend, GenDecl, Ident, Method, ObjectId,
    ObjectKind, PackageBuilder, PackageId, PackageInfo, Receiver, Signature, Spec, SyntaxNode,
    Type, TypeId,
};

const BASIC_TYPES: &[&str] = &[
    "bool",
    "byte",
    "complex64",
    "complex128",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Which files of a package directory are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    /// Also load `_test.go` files that belong to the package itself.
    pub include_tests: bool,
    /// Also load files excluded with a `//go:build ignore` constraint.
    pub build_ignored: bool,
}

pub struct GoLoader {
    language: Language,
    config: LoadConfig,
}

impl GoLoader {
    pub fn new() -> Self {
        Self::with_config(LoadConfig::default())
    }

    pub fn with_config(config: LoadConfig) -> Self {
        Self {
            language: Language::new(tree_sitter_go::LANGUAGE),
            config,
        }
    }

    /// Load the package in `dir` (non-recursive, like `go build`).
    pub fn load_dir(&mut self, dir: &Path) -> Result<PackageInfo> {
        let root = dir
            .canonicalize()
            .with_context(|| format!("cannot find package directory {}", dir.display()))?;
        if !root.is_dir() {
            bail!("not a directory: {}", root.display());
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("cannot list {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_go_source(&name) {
                continue;
            }
            if name.ends_with("_test.go") && !self.config.include_tests {
                continue;
            }
            let source = std::fs::read_to_string(entry.path())
                .with_context(|| format!("cannot read {}", entry.path().display()))?;
            if !self.config.build_ignored && is_build_ignored(&source) {
                debug!(file = %name, "skipping file excluded by build constraint");
                continue;
            }
            sources.push((name, source));
        }

        if sources.is_empty() {
            bail!("no Go files in {}", root.display());
        }
        self.load_sources(&root.to_string_lossy(), sources)
    }

    /// Load a package from in-memory `(file name, source)` pairs.
    pub fn load_sources(
        &mut self,
        path: &str,
        sources: Vec<(String, String)>,
    ) -> Result<PackageInfo> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;

        let mut files = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            let tree = parser
                .parse(&source, None)
                .ok_or_else(|| anyhow!("failed to parse {name}"))?;
            check_syntax(&tree, &name)?;
            let package = package_clause(tree.root_node(), &source)
                .ok_or_else(|| anyhow!("{name}: expected 'package' clause"))?
                .to_string();
            files.push(ParsedFile {
                name,
                source,
                tree,
                package,
            });
        }

        let package = select_package(&mut files, path)?;
        debug!(package = %package, files = files.len(), "parsed package");

        let builder = PackageBuilder::new(path, package.as_str());
        Resolver::new(builder, &files).run()
    }
}

impl Default for GoLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for GoLoader {
    fn load(&mut self, dir: &Path) -> Result<PackageInfo> {
        self.load_dir(dir)
    }
}

struct ParsedFile {
    name: String,
    source: String,
    tree: Tree,
    package: String,
}

fn is_go_source(name: &str) -> bool {
    name.ends_with(".go") && !name.starts_with('.') && !name.starts_with('_')
}

/// True if the file header carries an `ignore` build constraint.
fn is_build_ignored(source: &str) -> bool {
    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let constraint = line
            .strip_prefix("//go:build ")
            .or_else(|| line.strip_prefix("// +build "));
        if let Some(constraint) = constraint {
            if constraint
                .split(|c: char| c.is_whitespace() || "()&|!,".contains(c))
                .any(|tag| tag == "ignore")
            {
                return true;
            }
            continue;
        }
        if !line.starts_with("//") {
            return false;
        }
    }
    false
}

fn check_syntax(tree: &Tree, file: &str) -> Result<()> {
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }
    let node = first_error(root).unwrap_or(root);
    let pos = node.start_position();
    let what = if node.is_missing() {
        format!("missing {}", node.kind())
    } else {
        "syntax error".to_string()
    };
    bail!("{file}:{}:{}: {what}", pos.row + 1, pos.column + 1)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

fn package_clause<'a>(root: Node, source: &'a str) -> Option<&'a str> {
    let clause = named_children(root)
        .into_iter()
        .find(|n| n.kind() == "package_clause")?;
    let name = named_children(clause)
        .into_iter()
        .find(|n| n.kind() == "package_identifier")?;
    Some(node_text(name, source))
}

/// Pick the package name shared by all files, dropping external test
/// packages (`foo_test` next to `foo`).
fn select_package(files: &mut Vec<ParsedFile>, dir: &str) -> Result<String> {
    let primary = files
        .iter()
        .find(|f| !f.name.ends_with("_test.go"))
        .or_else(|| files.first())
        .map(|f| (f.package.clone(), f.name.clone()))
        .ok_or_else(|| anyhow!("no Go files in {dir}"))?;

    let external_test = format!("{}_test", primary.0);
    files.retain(|f| {
        let keep = !(f.name.ends_with("_test.go") && f.package == external_test);
        if !keep {
            debug!(file = %f.name, "skipping external test package file");
        }
        keep
    });

    if let Some(other) = files.iter().find(|f| f.package != primary.0) {
        bail!(
            "found packages {} ({}) and {} ({}) in {dir}",
            primary.0,
            primary.1,
            other.package,
            other.name
        );
    }
    Ok(primary.0)
}

/// Local name an import is referred to by when it has no explicit name.
fn import_name(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    let is_major_version =
        |s: &str| s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit());
    if is_major_version(last) {
        last = segments.next().unwrap_or(last);
    }
    let last = match last.rsplit_once(".v") {
        Some((base, v)) if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => base,
        _ => last,
    };
    last.strip_prefix("go-").unwrap_or(last)
}

/// Extract the text of a tree-sitter node from the source.
/// Returns an empty string if byte offsets fall outside the source or on a char boundary.
fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn field_nodes<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

fn line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

// ── Resolution ──

#[derive(Clone, Copy)]
enum TypeState<'t> {
    Named(TypeId),
    Alias { file: usize, node: Node<'t> },
    Resolving,
    Resolved(TypeId),
}

struct TypeEntry<'t> {
    obj: ObjectId,
    state: TypeState<'t>,
}

#[derive(Clone, Copy)]
struct PendingValue<'t> {
    file: usize,
    ty: Option<Node<'t>>,
    values: Option<Node<'t>>,
    index: usize,
}

#[derive(Clone, Copy)]
enum ValueState<'t> {
    Pending(PendingValue<'t>),
    Resolving,
    Done,
}

struct PendingType<'t> {
    file: usize,
    named: TypeId,
    params: Option<Node<'t>>,
    node: Node<'t>,
}

struct PendingFunc<'t> {
    file: usize,
    decl: usize,
    obj: ObjectId,
    node: Node<'t>,
}

/// Resolution state that must not leak into a lazily resolved declaration
/// from another file.
struct Saved {
    file: usize,
    type_params: Vec<HashMap<String, TypeId>>,
    locals: HashMap<String, ObjectId>,
}

struct Resolver<'t> {
    b: PackageBuilder,
    files: &'t [ParsedFile],
    file: usize,
    imports: Vec<HashMap<String, PackageId>>,
    types: HashMap<String, TypeEntry<'t>>,
    values: HashMap<String, ObjectId>,
    methods: HashMap<String, HashMap<String, ObjectId>>,
    pending_values: HashMap<ObjectId, ValueState<'t>>,
    universe: HashMap<&'static str, TypeId>,
    foreign: HashMap<(PackageId, String), TypeId>,
    members: HashMap<(TypeId, String), Option<ObjectId>>,
    type_params: Vec<HashMap<String, TypeId>>,
    locals: HashMap<String, ObjectId>,
    decls: Vec<Vec<Decl>>,
}

impl<'t> Resolver<'t> {
    fn new(b: PackageBuilder, files: &'t [ParsedFile]) -> Self {
        Self {
            b,
            files,
            file: 0,
            imports: Vec::new(),
            types: HashMap::new(),
            values: HashMap::new(),
            methods: HashMap::new(),
            pending_values: HashMap::new(),
            universe: HashMap::new(),
            foreign: HashMap::new(),
            members: HashMap::new(),
            type_params: Vec::new(),
            locals: HashMap::new(),
            decls: Vec::new(),
        }
    }

    fn run(mut self) -> Result<PackageInfo> {
        let (types, funcs) = self.collect()?;
        self.resolve_named_types(&types)?;
        self.resolve_signatures(&funcs);
        self.resolve_values();
        self.lower_bodies(&funcs);

        let files = self.files;
        let decls = std::mem::take(&mut self.decls);
        for (file, decls) in files.iter().zip(decls) {
            self.b.add_file(File {
                path: file.name.clone(),
                decls,
            });
        }
        Ok(self.b.build())
    }

    fn text(&self, node: Node<'t>) -> &'t str {
        let files: &'t [ParsedFile] = self.files;
        node_text(node, &files[self.file].source)
    }

    fn own(&self) -> Option<PackageId> {
        Some(self.b.package())
    }

    fn enter(&mut self, file: usize) -> Saved {
        Saved {
            file: std::mem::replace(&mut self.file, file),
            type_params: std::mem::take(&mut self.type_params),
            locals: std::mem::take(&mut self.locals),
        }
    }

    fn leave(&mut self, saved: Saved) {
        self.file = saved.file;
        self.type_params = saved.type_params;
        self.locals = saved.locals;
    }

    // ── Pass 1: package-level declarations ──

    #[allow(clippy::type_complexity)]
    fn collect(&mut self) -> Result<(Vec<PendingType<'t>>, Vec<PendingFunc<'t>>)> {
        let mut types = Vec::new();
        let mut funcs = Vec::new();
        let files = self.files;

        for (idx, file) in files.iter().enumerate() {
            self.file = idx;
            self.imports.push(HashMap::new());
            let mut decls = Vec::new();
            for node in named_children(file.tree.root_node()) {
                match node.kind() {
                    "package_clause" => {}
                    "import_declaration" => decls.push(self.collect_imports(node)),
                    "type_declaration" => decls.push(self.collect_types(node, &mut types)),
                    "const_declaration" => {
                        decls.push(self.collect_values(node, DeclToken::Const))
                    }
                    "var_declaration" => decls.push(self.collect_values(node, DeclToken::Var)),
                    "function_declaration" | "method_declaration" => {
                        let decl = decls.len();
                        decls.push(self.collect_func(node, decl, &mut funcs));
                    }
                    other => bail!(
                        "{}:{}: unexpected {other} at package level",
                        file.name,
                        line(node)
                    ),
                }
            }
            self.decls.push(decls);
        }

        debug!(
            types = self.types.len(),
            values = self.values.len(),
            "collected package-level declarations"
        );
        Ok((types, funcs))
    }

    fn collect_imports(&mut self, node: Node<'t>) -> Decl {
        let mut specs = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            for child in named_children(current).into_iter().rev() {
                match child.kind() {
                    "import_spec" => specs.push(child),
                    "import_spec_list" => stack.push(child),
                    _ => {}
                }
            }
        }
        specs.sort_by_key(|n| n.start_byte());

        let mut out = Vec::new();
        for spec in specs {
            let path = spec
                .child_by_field_name("path")
                .map(|p| self.text(p).trim_matches('"').trim_matches('`').to_string())
                .unwrap_or_default();
            if path.is_empty() {
                continue;
            }
            let pkg = self.b.foreign_package(&path);
            let local = match spec.child_by_field_name("name") {
                Some(name) if name.kind() == "package_identifier" => {
                    Some(self.text(name).to_string())
                }
                // Dot and blank imports introduce no package name.
                Some(_) => None,
                None => Some(import_name(&path).to_string()),
            };
            if let Some(local) = local {
                self.imports[self.file].insert(local, pkg);
            }
            out.push(Spec::Import { path });
        }

        Decl::Gen(GenDecl {
            tok: DeclToken::Import,
            specs: out,
        })
    }

    fn collect_types(&mut self, node: Node<'t>, pending: &mut Vec<PendingType<'t>>) -> Decl {
        let mut specs = Vec::new();
        for spec in named_children(node) {
            let (Some(name_node), Some(type_node)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };
            let name = self.text(name_node);
            let ident = self.b.ident(name);
            let own = self.own();

            let entry = match spec.kind() {
                "type_spec" => {
                    let named = self.b.named(name);
                    pending.push(PendingType {
                        file: self.file,
                        named,
                        params: spec.child_by_field_name("type_parameters"),
                        node: type_node,
                    });
                    TypeEntry {
                        obj: self.b.add_object(name, ObjectKind::TypeName, own, named),
                        state: TypeState::Named(named),
                    }
                }
                "type_alias" => {
                    let invalid = self.b.invalid();
                    TypeEntry {
                        obj: self.b.add_object(name, ObjectKind::TypeName, own, invalid),
                        state: TypeState::Alias {
                            file: self.file,
                            node: type_node,
                        },
                    }
                }
                _ => continue,
            };
            self.b.record_def(&ident, entry.obj);
            self.types.insert(name.to_string(), entry);
            specs.push(Spec::Type { name: ident });
        }

        Decl::Gen(GenDecl {
            tok: DeclToken::Type,
            specs,
        })
    }

    fn collect_values(&mut self, node: Node<'t>, tok: DeclToken) -> Decl {
        let mut spec_nodes = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "const_spec" | "var_spec" => spec_nodes.push(child),
                "const_spec_list" | "var_spec_list" => spec_nodes.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|n| matches!(n.kind(), "const_spec" | "var_spec")),
                ),
                _ => {}
            }
        }

        let kind = match tok {
            DeclToken::Const => ObjectKind::Const,
            _ => ObjectKind::Var,
        };
        let mut specs = Vec::new();
        // A const spec with neither type nor value repeats the previous one.
        let mut previous = (None, None);
        for spec in spec_nodes {
            let mut ty = spec.child_by_field_name("type");
            let mut values = spec.child_by_field_name("value");
            if tok == DeclToken::Const {
                if ty.is_none() && values.is_none() {
                    (ty, values) = previous;
                } else {
                    previous = (ty, values);
                }
            }

            let mut names = Vec::new();
            for (index, name_node) in field_nodes(spec, "name").into_iter().enumerate() {
                let name = self.text(name_node);
                let ident = self.b.ident(name);
                let invalid = self.b.invalid();
                let own = self.own();
                let obj = self.b.add_object(name, kind, own, invalid);
                self.b.record_def(&ident, obj);
                if name != "_" {
                    self.values.insert(name.to_string(), obj);
                }
                self.pending_values.insert(
                    obj,
                    ValueState::Pending(PendingValue {
                        file: self.file,
                        ty,
                        values,
                        index,
                    }),
                );
                names.push(ident);
            }
            specs.push(Spec::Value { names });
        }

        Decl::Gen(GenDecl { tok, specs })
    }

    fn collect_func(
        &mut self,
        node: Node<'t>,
        decl: usize,
        pending: &mut Vec<PendingFunc<'t>>,
    ) -> Decl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or("_");
        let ident = self.b.ident(name);
        let invalid = self.b.invalid();
        let own = self.own();
        let obj = self.b.add_object(name, ObjectKind::Func, own, invalid);
        self.b.record_def(&ident, obj);

        let recv = node
            .child_by_field_name("receiver")
            .and_then(|list| self.receiver(list))
            .map(|(recv, _)| recv);
        match &recv {
            Some(recv) => {
                self.methods
                    .entry(recv.type_name.clone())
                    .or_default()
                    .insert(name.to_string(), obj);
            }
            // `init` and `_` are never in scope.
            None if name != "init" && name != "_" => {
                self.values.insert(name.to_string(), obj);
            }
            None => {}
        }

        pending.push(PendingFunc {
            file: self.file,
            decl,
            obj,
            node,
        });
        Decl::Func(FuncDecl {
            name: ident,
            recv,
            body: None,
        })
    }

    /// Syntactic receiver plus the receiver's base type node.
    fn receiver(&self, list: Node<'t>) -> Option<(Receiver, Node<'t>)> {
        let param = named_children(list)
            .into_iter()
            .find(|n| n.kind() == "parameter_declaration")?;
        let mut ty = param.child_by_field_name("type")?;
        let mut pointer = false;
        loop {
            match ty.kind() {
                "pointer_type" | "parenthesized_type" => {
                    pointer |= ty.kind() == "pointer_type";
                    ty = ty.named_child(0)?;
                }
                _ => break,
            }
        }
        let base = match ty.kind() {
            "generic_type" => ty.child_by_field_name("type")?,
            _ => ty,
        };
        let recv = Receiver {
            type_name: self.text(base).to_string(),
            pointer,
        };
        Some((recv, ty))
    }

    // ── Pass 2: declared types ──

    fn resolve_named_types(&mut self, pending: &[PendingType<'t>]) -> Result<()> {
        for p in pending {
            self.file = p.file;
            self.push_type_params(p.params);
            let underlying = self.resolve_type(p.node);
            self.type_params.pop();
            self.b.set_underlying(p.named, underlying);
        }

        let mut aliases: Vec<String> = self
            .types
            .iter()
            .filter(|(_, e)| matches!(e.state, TypeState::Alias { .. }))
            .map(|(name, _)| name.clone())
            .collect();
        aliases.sort();
        for name in aliases {
            self.alias_type(&name);
        }

        // `type A B; type B A` has no underlying type at all. Each hop is a
        // declared type or an instantiation of one.
        let limit = 2 * pending.len() + 2;
        for p in pending {
            let mut id = p.named;
            for _ in 0..limit {
                match self.b.type_data(id) {
                    Some(Type::Named { underlying, .. }) => id = *underlying,
                    _ => break,
                }
            }
            if let Some(Type::Named { name, .. }) = self.b.type_data(id) {
                bail!("invalid recursive type {name}");
            }
        }
        Ok(())
    }

    fn alias_type(&mut self, name: &str) -> TypeId {
        let invalid = self.b.invalid();
        let Some((obj, state)) = self.types.get(name).map(|e| (e.obj, e.state)) else {
            return invalid;
        };
        match state {
            TypeState::Named(id) | TypeState::Resolved(id) => id,
            TypeState::Resolving => {
                warn!(alias = name, "invalid recursive type alias");
                invalid
            }
            TypeState::Alias { file, node } => {
                if let Some(entry) = self.types.get_mut(name) {
                    entry.state = TypeState::Resolving;
                }
                let saved = self.enter(file);
                let ty = self.resolve_type(node);
                self.leave(saved);
                self.b.set_object_type(obj, ty);
                if let Some(entry) = self.types.get_mut(name) {
                    entry.state = TypeState::Resolved(ty);
                }
                ty
            }
        }
    }

    fn push_type_params(&mut self, list: Option<Node<'t>>) {
        let mut scope = HashMap::new();
        let mut constraints = Vec::new();
        for decl in list.map(named_children).unwrap_or_default() {
            if decl.kind() != "type_parameter_declaration" {
                continue;
            }
            let constraint = decl.child_by_field_name("type");
            for name_node in field_nodes(decl, "name") {
                let name = self.text(name_node).to_string();
                let invalid = self.b.invalid();
                let id = self.b.add_type(Type::TypeParam {
                    name: name.clone(),
                    constraint: invalid,
                });
                scope.insert(name.clone(), id);
                constraints.push((id, name, constraint));
            }
        }
        self.type_params.push(scope);

        // Constraints may mention any parameter of the same list.
        for (id, name, constraint) in constraints {
            if let Some(node) = constraint {
                let constraint = self.resolve_type(node);
                self.b.replace_type(id, Type::TypeParam { name, constraint });
            }
        }
    }

    fn resolve_type(&mut self, node: Node<'t>) -> TypeId {
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(node);
                self.lookup_type_name(name)
            }
            "qualified_type" => {
                let (Some(pkg), Some(name)) = (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) else {
                    return self.b.invalid();
                };
                let pkg = self.text(pkg);
                let name = self.text(name);
                self.foreign_type(pkg, name)
            }
            "generic_type" => {
                let Some(base) = node.child_by_field_name("type") else {
                    return self.b.invalid();
                };
                let base = self.resolve_type(base);
                let args: Vec<TypeId> = node
                    .child_by_field_name("type_arguments")
                    .map(named_children)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|arg| self.resolve_type(arg))
                    .collect();
                // The instance's underlying chain runs through the generic
                // type, whose own underlying may not be resolved yet.
                match self.b.type_data(base).cloned() {
                    Some(Type::Named { name, package, .. }) => self.b.add_type(Type::Named {
                        name,
                        package,
                        underlying: base,
                        type_args: args,
                    }),
                    _ => base,
                }
            }
            "pointer_type" => {
                let elem = self.resolve_child(node.named_child(0));
                self.b.pointer(elem)
            }
            "slice_type" => {
                let elem = self.resolve_child(node.child_by_field_name("element"));
                self.b.slice(elem)
            }
            "array_type" | "implicit_length_array_type" => {
                let elem = self.resolve_child(node.child_by_field_name("element"));
                self.b.add_type(Type::Array { elem })
            }
            "map_type" => {
                let key = self.resolve_child(node.child_by_field_name("key"));
                let value = self.resolve_child(node.child_by_field_name("value"));
                self.b.map(key, value)
            }
            "channel_type" => {
                let elem = self.resolve_child(node.child_by_field_name("value"));
                self.b.add_type(Type::Chan { elem })
            }
            "function_type" => self.signature(node, None),
            "struct_type" => self.struct_type(node),
            "interface_type" => self.interface_type(node),
            "parenthesized_type" | "negated_type" => self.resolve_child(node.named_child(0)),
            "type_elem" | "type_constraint" => {
                let terms = named_children(node);
                if terms.len() == 1 {
                    return self.resolve_type(terms[0]);
                }
                // A union of terms constrains like an interface embedding them.
                let embedded = terms.into_iter().map(|t| self.resolve_type(t)).collect();
                self.b.add_type(Type::Interface {
                    embedded,
                    methods: Vec::new(),
                })
            }
            other => {
                trace!(kind = other, "unresolved type expression");
                self.b.invalid()
            }
        }
    }

    fn resolve_child(&mut self, node: Option<Node<'t>>) -> TypeId {
        match node {
            Some(node) => self.resolve_type(node),
            None => self.b.invalid(),
        }
    }

    fn lookup_type_name(&mut self, name: &str) -> TypeId {
        if let Some(id) = self.type_param(name) {
            return id;
        }
        if self.types.contains_key(name) {
            return self.alias_type(name);
        }
        self.universe_type(name).unwrap_or_else(|| self.b.invalid())
    }

    fn type_param(&self, name: &str) -> Option<TypeId> {
        self.type_params
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn universe_type(&mut self, name: &str) -> Option<TypeId> {
        if let Some(&basic) = BASIC_TYPES.iter().find(|&&b| b == name) {
            return Some(self.b.basic(basic));
        }
        let key: &'static str = match name {
            "any" => "any",
            "error" => "error",
            "comparable" => "comparable",
            _ => return None,
        };
        if let Some(&id) = self.universe.get(key) {
            return Some(id);
        }
        let id = match key {
            "error" => {
                let string = self.b.basic("string");
                let sig = self.b.signature(Signature {
                    results: vec![string],
                    ..Signature::default()
                });
                let iface = self.b.add_type(Type::Interface {
                    embedded: Vec::new(),
                    methods: vec![Method {
                        name: "Error".into(),
                        signature: sig,
                    }],
                });
                let named = self.b.named_in("error", None);
                self.b.set_underlying(named, iface);
                named
            }
            _ => {
                let iface = self.b.add_type(Type::Interface {
                    embedded: Vec::new(),
                    methods: Vec::new(),
                });
                if key == "any" {
                    iface
                } else {
                    let named = self.b.named_in(key, None);
                    self.b.set_underlying(named, iface);
                    named
                }
            }
        };
        self.universe.insert(key, id);
        Some(id)
    }

    fn foreign_type(&mut self, pkg: &str, name: &str) -> TypeId {
        let id = match self.imports[self.file].get(pkg) {
            Some(&id) => id,
            None => self.b.foreign_package(pkg),
        };
        let key = (id, name.to_string());
        if let Some(&ty) = self.foreign.get(&key) {
            return ty;
        }
        let ty = self.b.named_in(name, Some(id));
        self.foreign.insert(key, ty);
        ty
    }

    fn struct_type(&mut self, node: Node<'t>) -> TypeId {
        let mut fields = Vec::new();
        let list = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list");
        for decl in list.map(named_children).unwrap_or_default() {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut ty = self.resolve_type(type_node);
            let names = field_nodes(decl, "name");
            if names.is_empty() {
                if has_token(decl, "*") {
                    ty = self.b.pointer(ty);
                }
                fields.push(Field {
                    name: self.embedded_name(type_node),
                    ty,
                    embedded: true,
                });
            } else {
                for name in names {
                    fields.push(Field {
                        name: self.text(name).to_string(),
                        ty,
                        embedded: false,
                    });
                }
            }
        }
        self.b.struct_of(fields)
    }

    fn embedded_name(&self, node: Node<'t>) -> String {
        match node.kind() {
            "qualified_type" => node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|n| self.embedded_name(n))
                .unwrap_or_default(),
            "pointer_type" => node
                .named_child(0)
                .map(|n| self.embedded_name(n))
                .unwrap_or_default(),
            _ => self.text(node).to_string(),
        }
    }

    fn interface_type(&mut self, node: Node<'t>) -> TypeId {
        let mut embedded = Vec::new();
        let mut methods = Vec::new();
        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let name = elem
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    let signature = self.signature(elem, None);
                    methods.push(Method { name, signature });
                }
                "type_elem" | "constraint_elem" | "interface_type_name" => {
                    for term in named_children(elem) {
                        embedded.push(self.resolve_type(term));
                    }
                }
                _ => embedded.push(self.resolve_type(elem)),
            }
        }
        self.b.add_type(Type::Interface { embedded, methods })
    }

    /// Parameter names and types of a `parameter_list`.
    fn parameters(&mut self, list: Node<'t>) -> Vec<(Vec<Node<'t>>, TypeId)> {
        let mut out = Vec::new();
        for param in named_children(list) {
            let variadic = match param.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let mut ty = self.resolve_child(param.child_by_field_name("type"));
            if variadic {
                ty = self.b.slice(ty);
            }
            out.push((field_nodes(param, "name"), ty));
        }
        out
    }

    /// Signature of any node with `parameters`/`result` fields.
    fn signature(&mut self, node: Node<'t>, recv: Option<TypeId>) -> TypeId {
        let mut sig = Signature {
            recv,
            ..Signature::default()
        };
        if let Some(params) = node.child_by_field_name("parameters") {
            for (names, ty) in self.parameters(params) {
                for _ in 0..names.len().max(1) {
                    sig.params.push(ty);
                }
            }
        }
        if let Some(result) = node.child_by_field_name("result") {
            if result.kind() == "parameter_list" {
                for (names, ty) in self.parameters(result) {
                    for _ in 0..names.len().max(1) {
                        sig.results.push(ty);
                    }
                }
            } else {
                let ty = self.resolve_type(result);
                sig.results.push(ty);
            }
        }
        self.b.signature(sig)
    }

    // ── Pass 3: function signatures ──

    /// Push the type parameter scope of a function or method and return its
    /// receiver type.
    fn enter_func_scope(&mut self, node: Node<'t>) -> Option<TypeId> {
        self.push_type_params(node.child_by_field_name("type_parameters"));
        let list = node.child_by_field_name("receiver")?;
        let (recv, ty_node) = self.receiver(list)?;

        // `func (l *List[T])` binds fresh type parameters.
        if ty_node.kind() == "generic_type" {
            for arg in ty_node
                .child_by_field_name("type_arguments")
                .map(named_children)
                .unwrap_or_default()
            {
                let name = self.text(arg).to_string();
                let invalid = self.b.invalid();
                let id = self.b.add_type(Type::TypeParam {
                    name: name.clone(),
                    constraint: invalid,
                });
                if let Some(scope) = self.type_params.last_mut() {
                    scope.insert(name, id);
                }
            }
        }

        let base = self.lookup_type_name(&recv.type_name);
        if base == self.b.invalid() {
            warn!(receiver = %recv.type_name, "method on undeclared type");
            return None;
        }
        Some(if recv.pointer {
            self.b.pointer(base)
        } else {
            base
        })
    }

    fn resolve_signatures(&mut self, funcs: &[PendingFunc<'t>]) {
        for f in funcs {
            self.file = f.file;
            let recv = self.enter_func_scope(f.node);
            let sig = self.signature(f.node, recv);
            self.type_params.pop();
            self.b.set_object_type(f.obj, sig);
        }
    }

    // ── Pass 4: package-level values ──

    fn resolve_values(&mut self) {
        let mut objs: Vec<ObjectId> = self.pending_values.keys().copied().collect();
        objs.sort();
        for obj in objs {
            self.value_type(obj);
        }
    }

    fn value_type(&mut self, obj: ObjectId) -> TypeId {
        let invalid = self.b.invalid();
        match self.pending_values.get(&obj).copied() {
            Some(ValueState::Pending(p)) => {
                self.pending_values.insert(obj, ValueState::Resolving);
                let saved = self.enter(p.file);
                let ty = match p.ty {
                    Some(node) => self.resolve_type(node),
                    None => {
                        let count = p.index + 1;
                        let types = self.assigned_types(p.values, count);
                        types.get(p.index).copied().unwrap_or(invalid)
                    }
                };
                self.leave(saved);
                self.b.set_object_type(obj, ty);
                self.pending_values.insert(obj, ValueState::Done);
                ty
            }
            // Initialization cycle; the type checker would reject it.
            Some(ValueState::Resolving) => invalid,
            Some(ValueState::Done) | None => self.b.object(obj).map_or(invalid, |o| o.ty),
        }
    }

    /// Types assigned to `count` names by an initializer expression list.
    fn assigned_types(&mut self, values: Option<Node<'t>>, count: usize) -> Vec<TypeId> {
        let invalid = self.b.invalid();
        let exprs = values.map(named_children).unwrap_or_default();
        let mut types = if exprs.len() >= count && exprs.len() > 1 || count <= 1 {
            exprs
                .iter()
                .map(|&e| self.expr_type(e).unwrap_or(invalid))
                .collect()
        } else if let [single] = exprs.as_slice() {
            match single.kind() {
                "call_expression" => self.call_results(*single),
                // Comma-ok forms: `v, ok := m[k]`, `x.(T)`, `<-ch`.
                _ => {
                    let first = self.expr_type(*single).unwrap_or(invalid);
                    let ok = self.b.basic("bool");
                    vec![first, ok]
                }
            }
        } else {
            Vec::new()
        };
        types.resize(count.max(types.len()), invalid);
        types
    }

    // ── Pass 5: function bodies ──

    fn lower_bodies(&mut self, funcs: &[PendingFunc<'t>]) {
        for f in funcs {
            self.file = f.file;
            self.locals.clear();
            let recv = self.enter_func_scope(f.node);

            if let (Some(recv), Some(list)) = (recv, f.node.child_by_field_name("receiver")) {
                self.define_params(list, Some(recv));
            }
            if let Some(list) = f.node.child_by_field_name("parameters") {
                self.define_params(list, None);
            }
            if let Some(result) = f.node.child_by_field_name("result") {
                if result.kind() == "parameter_list" {
                    self.define_params(result, None);
                }
            }

            let body = f
                .node
                .child_by_field_name("body")
                .map(|block| {
                    self.lower(block)
                        .unwrap_or_else(|| SyntaxNode::node("block", Vec::new()))
                });
            self.type_params.pop();

            if let Some(Decl::Func(decl)) = self
                .decls
                .get_mut(f.file)
                .and_then(|decls| decls.get_mut(f.decl))
            {
                decl.body = body;
            }
        }
        self.locals.clear();
    }

    /// Bring signature names into the local scope without recording an
    /// occurrence: they are part of the signature, not the body.
    fn define_params(&mut self, list: Node<'t>, recv: Option<TypeId>) {
        for (names, ty) in self.parameters(list) {
            let ty = recv.unwrap_or(ty);
            for name in names {
                let name = self.text(name);
                if name == "_" {
                    continue;
                }
                let own = self.own();
                let obj = self.b.add_object(name, ObjectKind::Var, own, ty);
                self.locals.insert(name.to_string(), obj);
            }
        }
    }

    fn lower(&mut self, node: Node<'t>) -> Option<SyntaxNode> {
        match node.kind() {
            "identifier" => self.lower_value_ident(node),
            "type_identifier" => Some(self.lower_type_ident(node)),
            "field_identifier" | "package_identifier" => Some(self.plain_ident(node)),
            "comment" | "label_name" | "blank_identifier" => None,
            "qualified_type" => Some(SyntaxNode::node(
                "qualified_type",
                named_children(node)
                    .into_iter()
                    .map(|n| self.plain_ident(n))
                    .collect(),
            )),
            "short_var_declaration" => Some(self.lower_define(node)),
            "receive_statement" if has_token(node, ":=") => Some(self.lower_define(node)),
            "var_spec" | "const_spec" => Some(self.lower_local_spec(node)),
            "range_clause" if has_token(node, ":=") => Some(self.lower_range(node)),
            "type_switch_statement" => Some(self.lower_type_switch(node)),
            "parameter_declaration" | "variadic_parameter_declaration" => {
                self.lower_param(node)
            }
            "selector_expression" => Some(self.lower_selector(node)),
            "composite_literal" => Some(self.lower_composite(node)),
            _ => self.lower_children(node),
        }
    }

    fn lower_children(&mut self, node: Node<'t>) -> Option<SyntaxNode> {
        let mut children = Vec::new();
        for child in named_children(node) {
            if let Some(lowered) = self.lower(child) {
                children.push(lowered);
            }
        }
        if children.is_empty() {
            None
        } else {
            Some(SyntaxNode::node(node.kind(), children))
        }
    }

    fn lower_all(&mut self, nodes: impl IntoIterator<Item = Node<'t>>) -> Vec<SyntaxNode> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.lower(node));
        }
        out
    }

    fn plain_ident(&mut self, node: Node<'t>) -> SyntaxNode {
        let name = self.text(node);
        SyntaxNode::Ident(self.b.ident(name))
    }

    fn record_use(&mut self, ident: &Ident, obj: ObjectId) {
        self.b.record_use(ident, obj);
        if let Some(ty) = self.b.object(obj).map(|o| o.ty) {
            if ty != self.b.invalid() {
                self.b.record_type(ident, ty);
            }
        }
    }

    fn lower_value_ident(&mut self, node: Node<'t>) -> Option<SyntaxNode> {
        let name = self.text(node);
        if name == "_" {
            return None;
        }
        let ident = self.b.ident(name);
        if let Some(&obj) = self.locals.get(name) {
            self.record_use(&ident, obj);
        } else if let Some(&obj) = self.values.get(name) {
            self.value_type(obj);
            self.record_use(&ident, obj);
        } else if let Some(obj) = self.types.get(name).map(|e| e.obj) {
            self.alias_type(name);
            self.record_use(&ident, obj);
        } else if let Some(ty) = self.type_param(name) {
            self.b.record_type(&ident, ty);
        }
        Some(SyntaxNode::Ident(ident))
    }

    fn lower_type_ident(&mut self, node: Node<'t>) -> SyntaxNode {
        let name = self.text(node);
        let ident = self.b.ident(name);
        if let Some(ty) = self.type_param(name) {
            self.b.record_type(&ident, ty);
        } else if let Some(obj) = self.types.get(name).map(|e| e.obj) {
            self.alias_type(name);
            self.record_use(&ident, obj);
        }
        SyntaxNode::Ident(ident)
    }

    fn define_local(&mut self, node: Node<'t>, ty: TypeId) -> Option<SyntaxNode> {
        let name = self.text(node);
        if name == "_" {
            return None;
        }
        let ident = self.b.ident(name);
        let own = self.own();
        let obj = self.b.add_object(name, ObjectKind::Var, own, ty);
        self.locals.insert(name.to_string(), obj);
        self.b.record_def(&ident, obj);
        if ty != self.b.invalid() {
            self.b.record_type(&ident, ty);
        }
        Some(SyntaxNode::Ident(ident))
    }

    /// `a, b := x, y` and `case v := <-ch:`
    fn lower_define(&mut self, node: Node<'t>) -> SyntaxNode {
        let right = node.child_by_field_name("right");
        let mut children = self.lower_all(right);

        let names: Vec<Node<'t>> = node
            .child_by_field_name("left")
            .map(named_children)
            .unwrap_or_default();
        let types = match right {
            Some(r) if r.kind() == "expression_list" => self.assigned_types(Some(r), names.len()),
            Some(r) => {
                let invalid = self.b.invalid();
                let first = self.expr_type(r).unwrap_or(invalid);
                let ok = self.b.basic("bool");
                vec![first, ok]
            }
            None => Vec::new(),
        };

        let invalid = self.b.invalid();
        for (i, name) in names.into_iter().enumerate() {
            if name.kind() != "identifier" {
                children.extend(self.lower(name));
                continue;
            }
            let ty = types.get(i).copied().unwrap_or(invalid);
            children.extend(self.define_local(name, ty));
        }
        SyntaxNode::node(node.kind(), children)
    }

    fn lower_local_spec(&mut self, node: Node<'t>) -> SyntaxNode {
        let ty_node = node.child_by_field_name("type");
        let values = node.child_by_field_name("value");
        let mut children = self.lower_all(ty_node.into_iter().chain(values));

        let names = field_nodes(node, "name");
        let types = match ty_node {
            Some(t) => vec![self.resolve_type(t); names.len()],
            None => self.assigned_types(values, names.len()),
        };
        let invalid = self.b.invalid();
        for (i, name) in names.into_iter().enumerate() {
            let ty = types.get(i).copied().unwrap_or(invalid);
            children.extend(self.define_local(name, ty));
        }
        SyntaxNode::node(node.kind(), children)
    }

    fn lower_range(&mut self, node: Node<'t>) -> SyntaxNode {
        let right = node.child_by_field_name("right");
        let mut children = self.lower_all(right);

        let invalid = self.b.invalid();
        let int = self.b.basic("int");
        let ranged = right.and_then(|r| self.expr_type(r));
        let (key, value) = match ranged.map(|t| self.deref_underlying(t)) {
            Some(Type::Slice { elem }) | Some(Type::Array { elem, .. }) => (int, elem),
            Some(Type::Map { key, value }) => (key, value),
            Some(Type::Chan { elem, .. }) => (elem, invalid),
            Some(Type::Basic { name }) if name == "string" => (int, self.b.basic("rune")),
            Some(Type::Basic { name }) if name.starts_with("int") || name.starts_with("uint") => {
                (ranged.unwrap_or(int), invalid)
            }
            _ => (invalid, invalid),
        };

        let names = node
            .child_by_field_name("left")
            .map(named_children)
            .unwrap_or_default();
        for (name, ty) in names.into_iter().zip([key, value]) {
            children.extend(self.define_local(name, ty));
        }
        SyntaxNode::node("range_clause", children)
    }

    fn lower_type_switch(&mut self, node: Node<'t>) -> SyntaxNode {
        let alias_list = node.child_by_field_name("alias");
        let alias = alias_list.and_then(|list| named_children(list).into_iter().next());
        let value = node.child_by_field_name("value");
        let initializer = node.child_by_field_name("initializer");

        let mut children = self.lower_all(initializer.into_iter().chain(value));
        let invalid = self.b.invalid();
        let value_ty = value.and_then(|v| self.expr_type(v)).unwrap_or(invalid);

        let mut alias_name = None;
        if let Some(alias) = alias {
            let name = self.text(alias);
            if name != "_" {
                let ident = self.b.ident(name);
                let own = self.own();
                let obj = self.b.add_object(name, ObjectKind::Var, own, value_ty);
                self.b.record_implicit(&ident, obj);
                self.locals.insert(name.to_string(), obj);
                alias_name = Some((name, obj));
                children.push(SyntaxNode::Ident(ident));
            }
        }

        let skip: Vec<usize> = [alias_list, value, initializer]
            .into_iter()
            .flatten()
            .map(|n| n.id())
            .collect();
        for clause in named_children(node) {
            if skip.contains(&clause.id()) {
                continue;
            }
            // In a single-type case the alias has that type.
            if let Some((name, implicit)) = alias_name {
                let case_types = field_nodes(clause, "type");
                let obj = match case_types.as_slice() {
                    [single] if clause.kind() == "type_case" => {
                        let ty = self.resolve_type(*single);
                        let own = self.own();
                        self.b.add_object(name, ObjectKind::Var, own, ty)
                    }
                    _ => implicit,
                };
                self.locals.insert(name.to_string(), obj);
            }
            children.extend(self.lower(clause));
        }
        SyntaxNode::node("type_switch_statement", children)
    }

    fn lower_param(&mut self, node: Node<'t>) -> Option<SyntaxNode> {
        let ty_node = node.child_by_field_name("type");
        let mut children = self.lower_all(ty_node);
        let mut ty = self.resolve_child(ty_node);
        if node.kind() == "variadic_parameter_declaration" {
            ty = self.b.slice(ty);
        }
        for name in field_nodes(node, "name") {
            children.extend(self.define_local(name, ty));
        }
        if children.is_empty() {
            None
        } else {
            Some(SyntaxNode::node(node.kind(), children))
        }
    }

    fn is_package_name(&self, name: &str) -> bool {
        !self.locals.contains_key(name)
            && !self.values.contains_key(name)
            && !self.types.contains_key(name)
            && self.imports[self.file].contains_key(name)
    }

    fn lower_selector(&mut self, node: Node<'t>) -> SyntaxNode {
        let operand = node.child_by_field_name("operand");
        let field = node.child_by_field_name("field");

        let mut children = Vec::new();
        let foreign = operand
            .is_some_and(|o| o.kind() == "identifier" && self.is_package_name(self.text(o)));
        if foreign {
            // `pkg.Name`: declared elsewhere, nothing to resolve.
            children.extend(operand.map(|o| self.plain_ident(o)));
            children.extend(field.map(|f| self.plain_ident(f)));
            return SyntaxNode::node("selector_expression", children);
        }

        children.extend(self.lower_all(operand));
        if let Some(field) = field {
            let name = self.text(field);
            let ident = self.b.ident(name);
            let member = operand
                .and_then(|o| self.expr_type(o))
                .and_then(|t| self.member(t, name));
            if let Some(obj) = member {
                self.record_use(&ident, obj);
            }
            children.push(SyntaxNode::Ident(ident));
        }
        SyntaxNode::node("selector_expression", children)
    }

    fn lower_composite(&mut self, node: Node<'t>) -> SyntaxNode {
        let ty_node = node.child_by_field_name("type");
        let mut children = self.lower_all(ty_node);
        let ty = ty_node.map(|t| self.resolve_type(t));
        if let Some(body) = node.child_by_field_name("body") {
            children.extend(self.lower_literal(body, ty));
        }
        SyntaxNode::node("composite_literal", children)
    }

    /// Lower a `literal_value`, resolving struct keys to fields and elided
    /// element types to the literal's element type.
    fn lower_literal(&mut self, node: Node<'t>, ty: Option<TypeId>) -> Option<SyntaxNode> {
        let shape = ty.map(|t| self.deref_underlying(t));
        let mut children = Vec::new();
        for elem in named_children(node) {
            match elem.kind() {
                "keyed_element" => {
                    let parts = named_children(elem);
                    let (Some(&key), Some(&value)) = (parts.first(), parts.get(1)) else {
                        children.extend(self.lower(elem));
                        continue;
                    };
                    let (key_ty, value_ty) = match &shape {
                        Some(Type::Struct { .. }) => {
                            let (lowered, field_ty) = self.lower_field_key(key, ty);
                            children.extend(lowered);
                            (None, field_ty)
                        }
                        Some(Type::Map { key: k, value: v }) => (Some(*k), Some(*v)),
                        Some(Type::Slice { elem: e }) | Some(Type::Array { elem: e, .. }) => {
                            (None, Some(*e))
                        }
                        _ => {
                            let (lowered, _) = self.lower_field_key(key, None);
                            children.extend(lowered);
                            (None, None)
                        }
                    };
                    if key_ty.is_some()
                        || matches!(shape, Some(Type::Slice { .. }) | Some(Type::Array { .. }))
                    {
                        children.extend(self.lower_element(key, key_ty));
                    }
                    children.extend(self.lower_element(value, value_ty));
                }
                "literal_element" => {
                    let elem_ty = match &shape {
                        Some(Type::Slice { elem: e }) | Some(Type::Array { elem: e, .. }) => {
                            Some(*e)
                        }
                        Some(Type::Map { value, .. }) => Some(*value),
                        _ => None,
                    };
                    children.extend(self.lower_element(elem, elem_ty));
                }
                _ => children.extend(self.lower(elem)),
            }
        }
        if children.is_empty() {
            None
        } else {
            Some(SyntaxNode::node("literal_value", children))
        }
    }

    /// A struct literal key: `Field: value`. Returns the lowered key and the
    /// field's type.
    fn lower_field_key(
        &mut self,
        key: Node<'t>,
        ty: Option<TypeId>,
    ) -> (Option<SyntaxNode>, Option<TypeId>) {
        let ident_node = match key.kind() {
            "literal_element" => key.named_child(0).filter(|n| {
                matches!(n.kind(), "identifier" | "field_identifier")
            }),
            "identifier" | "field_identifier" => Some(key),
            _ => None,
        };
        let Some(ident_node) = ident_node else {
            return (self.lower(key), None);
        };
        let name = self.text(ident_node);
        let ident = self.b.ident(name);
        let member = ty.and_then(|t| self.member(t, name));
        let field_ty = member.and_then(|obj| self.b.object(obj).map(|o| o.ty));
        if let Some(obj) = member {
            self.record_use(&ident, obj);
        }
        (Some(SyntaxNode::Ident(ident)), field_ty)
    }

    fn lower_element(&mut self, node: Node<'t>, ty: Option<TypeId>) -> Option<SyntaxNode> {
        match node.kind() {
            "literal_element" => {
                let inner = node.named_child(0)?;
                self.lower_element(inner, ty)
            }
            "literal_value" => self.lower_literal(node, ty),
            _ => self.lower(node),
        }
    }

    // ── Expression types ──

    fn deref_underlying(&self, ty: TypeId) -> Type {
        let under = self.b.underlying(ty);
        let under = match self.b.type_data(under) {
            Some(Type::Pointer { elem }) => self.b.underlying(*elem),
            _ => under,
        };
        self.b
            .type_data(under)
            .cloned()
            .unwrap_or(Type::Basic {
                name: "invalid".into(),
            })
    }

    /// Field or method `name` of a value of type `ty`.
    fn member(&mut self, ty: TypeId, name: &str) -> Option<ObjectId> {
        self.member_in(ty, name, 0)
    }

    fn member_in(&mut self, ty: TypeId, name: &str, depth: usize) -> Option<ObjectId> {
        if depth > 4 {
            return None;
        }
        let ty = match self.b.type_data(ty) {
            Some(Type::Pointer { elem }) => *elem,
            _ => ty,
        };
        if let Some(Type::Named {
            name: type_name,
            package,
            ..
        }) = self.b.type_data(ty)
        {
            if *package == self.own() {
                let method = self
                    .methods
                    .get(type_name)
                    .and_then(|m| m.get(name))
                    .copied();
                if method.is_some() {
                    return method;
                }
            }
        }

        let key = (ty, name.to_string());
        if let Some(&cached) = self.members.get(&key) {
            return cached;
        }
        let own = self.own();
        let under = self.b.underlying(ty);
        let found = match self.b.type_data(under).cloned() {
            Some(Type::Struct { fields }) => match fields.iter().find(|f| f.name == name) {
                Some(field) => Some(self.b.add_object(name, ObjectKind::Var, own, field.ty)),
                None => fields
                    .iter()
                    .filter(|f| f.embedded)
                    .find_map(|f| self.member_in(f.ty, name, depth + 1)),
            },
            Some(Type::Interface { embedded, methods }) => {
                match methods.iter().find(|m| m.name == name) {
                    Some(m) => Some(self.b.add_object(name, ObjectKind::Func, own, m.signature)),
                    None => embedded
                        .iter()
                        .find_map(|&e| self.member_in(e, name, depth + 1)),
                }
            }
            Some(Type::TypeParam { constraint, .. }) => {
                self.member_in(constraint, name, depth + 1)
            }
            _ => None,
        };
        self.members.insert(key, found);
        found
    }

    fn ident_type(&mut self, name: &str) -> Option<TypeId> {
        if let Some(&obj) = self.locals.get(name) {
            return self.b.object(obj).map(|o| o.ty);
        }
        let obj = *self.values.get(name)?;
        Some(self.value_type(obj))
    }

    fn expr_type(&mut self, node: Node<'t>) -> Option<TypeId> {
        let ty = match node.kind() {
            "identifier" => {
                let name = self.text(node);
                match name {
                    "true" | "false" => Some(self.b.basic("bool")),
                    "iota" => Some(self.b.basic("int")),
                    _ => self.ident_type(name),
                }
            }
            "int_literal" | "iota" => Some(self.b.basic("int")),
            "float_literal" => Some(self.b.basic("float64")),
            "imaginary_literal" => Some(self.b.basic("complex128")),
            "rune_literal" => Some(self.b.basic("rune")),
            "interpreted_string_literal" | "raw_string_literal" => Some(self.b.basic("string")),
            "true" | "false" => Some(self.b.basic("bool")),
            "parenthesized_expression" => {
                let inner = node.named_child(0)?;
                self.expr_type(inner)
            }
            "composite_literal" | "type_conversion_expression" | "type_assertion_expression" => {
                let ty = node.child_by_field_name("type")?;
                Some(self.resolve_type(ty))
            }
            "func_literal" => Some(self.signature(node, None)),
            "call_expression" => self.call_results(node).into_iter().next(),
            "selector_expression" => {
                let operand = node.child_by_field_name("operand")?;
                if operand.kind() == "identifier" && self.is_package_name(self.text(operand)) {
                    return None;
                }
                let field = node.child_by_field_name("field")?;
                let ty = self.expr_type(operand)?;
                let obj = self.member(ty, self.text(field))?;
                self.b.object(obj).map(|o| o.ty)
            }
            "index_expression" => {
                let operand = self.expr_type(node.child_by_field_name("operand")?)?;
                match self.deref_underlying(operand) {
                    Type::Slice { elem } | Type::Array { elem, .. } => Some(elem),
                    Type::Map { value, .. } => Some(value),
                    Type::Basic { name } if name == "string" => Some(self.b.basic("byte")),
                    // Instantiation of a generic function.
                    Type::Signature(_) => Some(operand),
                    _ => None,
                }
            }
            "slice_expression" => {
                let operand = self.expr_type(node.child_by_field_name("operand")?)?;
                match self.deref_underlying(operand) {
                    Type::Array { elem, .. } => Some(self.b.slice(elem)),
                    _ => Some(operand),
                }
            }
            "unary_expression" => {
                let operator = node.child_by_field_name("operator")?.kind();
                let operand = node.child_by_field_name("operand")?;
                match operator {
                    "!" => Some(self.b.basic("bool")),
                    "&" => {
                        let elem = self.expr_type(operand)?;
                        Some(self.b.pointer(elem))
                    }
                    "*" => {
                        let ptr = self.expr_type(operand)?;
                        match self.b.type_data(self.b.underlying(ptr)) {
                            Some(Type::Pointer { elem }) => Some(*elem),
                            _ => None,
                        }
                    }
                    "<-" => {
                        let ch = self.expr_type(operand)?;
                        match self.deref_underlying(ch) {
                            Type::Chan { elem, .. } => Some(elem),
                            _ => None,
                        }
                    }
                    _ => self.expr_type(operand),
                }
            }
            "binary_expression" => {
                let operator = node.child_by_field_name("operator")?.kind();
                match operator {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => {
                        Some(self.b.basic("bool"))
                    }
                    _ => {
                        let left = node
                            .child_by_field_name("left")
                            .and_then(|l| self.expr_type(l));
                        match left {
                            Some(ty) => Some(ty),
                            None => {
                                let right = node.child_by_field_name("right")?;
                                self.expr_type(right)
                            }
                        }
                    }
                }
            }
            _ => None,
        };
        ty.filter(|&t| t != self.b.invalid())
    }

    /// Result types of a call, with conversions and the common builtins.
    fn call_results(&mut self, node: Node<'t>) -> Vec<TypeId> {
        let Some(func) = node.child_by_field_name("function") else {
            return Vec::new();
        };
        let first_arg = node
            .child_by_field_name("arguments")
            .and_then(|args| named_children(args).into_iter().next());

        match func.kind() {
            "identifier" => {
                let name = self.text(func);
                if !self.locals.contains_key(name) && !self.values.contains_key(name) {
                    match name {
                        "new" => {
                            return first_arg
                                .map(|a| {
                                    let elem = self.resolve_type(a);
                                    self.b.pointer(elem)
                                })
                                .into_iter()
                                .collect();
                        }
                        "make" => {
                            return first_arg.map(|a| self.resolve_type(a)).into_iter().collect()
                        }
                        "len" | "cap" | "copy" => return vec![self.b.basic("int")],
                        "append" | "min" | "max" => {
                            return first_arg
                                .and_then(|a| self.expr_type(a))
                                .into_iter()
                                .collect();
                        }
                        _ => {}
                    }
                    let is_type = self.type_param(name).is_some()
                        || self.types.contains_key(name)
                        || BASIC_TYPES.contains(&name)
                        || matches!(name, "any" | "error");
                    if is_type {
                        return vec![self.lookup_type_name(name)];
                    }
                }
            }
            "parenthesized_type" | "pointer_type" | "slice_type" | "array_type" | "map_type"
            | "channel_type" | "function_type" | "qualified_type" | "generic_type"
            | "interface_type" | "struct_type" => return vec![self.resolve_type(func)],
            _ => {}
        }

        let Some(ty) = self.expr_type(func) else {
            return Vec::new();
        };
        match self.deref_underlying(ty) {
            Type::Signature(sig) => sig.results,
            _ => Vec::new(),
        }
    }
}
