//! Build the declaration dependency graph of one loaded package.
//!
//! Two passes over the declaration tree: the first adds a node per top-level
//! declaration, the second walks each declaration's type (and, for
//! functions, body) and adds an edge to every same-package named type it
//! reaches.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::frontend::{
    Decl, DeclToken, FuncDecl, Ident, Object, ObjectKind, PackageId, PackageInfo, Spec, Type,
    TypeId,
};
use crate::graph::Graph;
use crate::types::Node;

/// Read-only view of the front-end output plus the identity of the package
/// whose declarations become graph nodes.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pkg: &'a PackageInfo,
    package: PackageId,
}

impl<'a> Context<'a> {
    pub fn new(pkg: &'a PackageInfo) -> Self {
        Self {
            pkg,
            package: pkg.package(),
        }
    }

    fn ty(&self, id: TypeId) -> &'a Type {
        match self.pkg.ty(id) {
            Some(ty) => ty,
            None => panic!("type {id:?} is not in the package type table"),
        }
    }
}

/// Build the dependency graph for a loaded package.
///
/// # Panics
///
/// Panics if the front-end output violates the closed-world assumptions of
/// the analysis: a declaration it could not classify, a type id missing from
/// the type table, or an unexpected object bound to a declaration name.
pub fn analyze(pkg: &PackageInfo) -> Graph {
    let ctx = Context::new(pkg);
    let mut graph = Graph::new();

    for file in pkg.files() {
        for decl in &file.decls {
            add_decl_nodes(decl, &mut graph);
        }
    }
    debug!(nodes = graph.node_count(), "declarations enumerated");

    for file in pkg.files() {
        for decl in &file.decls {
            match decl {
                Decl::Gen(gen) => {
                    for spec in &gen.specs {
                        match spec {
                            Spec::Value { names } => {
                                for ident in names {
                                    add_def_edges(&ctx, ident, &mut graph);
                                }
                            }
                            Spec::Type { name } => add_def_edges(&ctx, name, &mut graph),
                            Spec::Import { .. } => {}
                        }
                    }
                }
                Decl::Func(func) => add_func_edges(&ctx, func, &mut graph),
                Decl::Bad(bad) => panic!("unsupported declaration {bad:?}"),
            }
        }
    }
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "references extracted"
    );

    graph
}

// ── Declaration enumeration ──

fn add_decl_nodes(decl: &Decl, graph: &mut Graph) {
    match decl {
        Decl::Gen(gen) => {
            for spec in &gen.specs {
                match spec {
                    Spec::Value { names } => {
                        for ident in names {
                            let node = match gen.tok {
                                DeclToken::Const => Node::constant(&ident.name),
                                _ => Node::variable(&ident.name),
                            };
                            graph.add_node(node);
                        }
                    }
                    Spec::Type { name } => graph.add_node(Node::ty(&name.name)),
                    Spec::Import { .. } => {}
                }
            }
        }
        // Methods are represented by their receiver type.
        Decl::Func(func) => {
            if func.recv.is_none() {
                graph.add_node(Node::function(&func.name.name));
            }
        }
        Decl::Bad(bad) => panic!("unsupported declaration {bad:?}"),
    }
}

// ── Reference extraction ──

fn add_def_edges(ctx: &Context<'_>, ident: &Ident, graph: &mut Graph) {
    let obj = match ctx.pkg.defined(ident) {
        Some(obj) => obj,
        None => panic!("no object recorded for declaration {:?}", ident.name),
    };

    match obj.kind {
        ObjectKind::Const => {
            let from = Node::constant(&obj.name);
            decompose(ctx, &from, obj.ty, graph);
        }
        ObjectKind::Var => {
            let from = Node::variable(&obj.name);
            decompose(ctx, &from, obj.ty, graph);
        }
        ObjectKind::TypeName => {
            let from = Node::ty(&obj.name);
            decompose_declared(ctx, &from, obj.ty, graph);
        }
        // Function declarations are handled by `add_func_edges`.
        ObjectKind::Func => {}
        ObjectKind::PkgName => panic!("unsupported definition object {obj:?}"),
    }
}

fn add_func_edges(ctx: &Context<'_>, func: &FuncDecl, graph: &mut Graph) {
    let obj = ctx.pkg.defined(&func.name);
    let from = func_owner(ctx, func, obj);

    if let Some(obj) = obj {
        decompose(ctx, &from, obj.ty, graph);
    }

    // A body can mention other declarations in many ways; every table entry
    // of every identifier is decomposed and the graph drops duplicates.
    if let Some(body) = &func.body {
        body.walk_idents(&mut |ident| {
            if let Some(ty) = ctx.pkg.type_of(ident) {
                decompose(ctx, &from, ty, graph);
            }
            for obj in [
                ctx.pkg.defined(ident),
                ctx.pkg.used(ident),
                ctx.pkg.implicit(ident),
            ]
            .into_iter()
            .flatten()
            {
                decompose(ctx, &from, obj.ty, graph);
            }
        });
    }
}

/// The node a function's references are attributed to: itself, or the
/// receiver's type for methods.
fn func_owner(ctx: &Context<'_>, func: &FuncDecl, obj: Option<&Object>) -> Node {
    let recv = obj.and_then(|obj| match ctx.ty(obj.ty) {
        Type::Signature(sig) => sig.recv,
        other => panic!("function {:?} has non-signature type {other:?}", obj.name),
    });

    match (recv, &func.recv) {
        (Some(recv), _) => {
            let named = match ctx.ty(recv) {
                Type::Pointer { elem } => *elem,
                _ => recv,
            };
            match ctx.ty(named) {
                Type::Named { name, .. } => Node::ty(name),
                other => panic!("method {:?} has receiver {other:?}", func.name.name),
            }
        }
        (None, Some(recv)) => Node::ty(&recv.type_name),
        (None, None) => Node::function(&func.name.name),
    }
}

// ── Type-shape decomposition ──

/// Add an edge from `from` to every same-package named type reachable
/// through the structure of `ty`.
pub fn decompose(ctx: &Context<'_>, from: &Node, ty: TypeId, graph: &mut Graph) {
    let mut decomposer = Decomposer {
        ctx,
        from,
        graph,
        type_params: HashSet::new(),
        instantiated: false,
    };
    decomposer.visit(ty);
}

/// Decompose the underlying type of a declared type.
///
/// When the underlying chain runs through a generic instance
/// (`type X Box[Circle]`), the instance's type arguments take the place of
/// the generic's type parameters: the arguments are decomposed and the
/// parameters met in the generic's structure are not expanded into their
/// constraints.
fn decompose_declared(ctx: &Context<'_>, from: &Node, ty: TypeId, graph: &mut Graph) {
    let mut id = ty;
    let mut type_args = Vec::new();
    while let Type::Named {
        underlying,
        type_args: args,
        ..
    } = ctx.ty(id)
    {
        type_args.extend_from_slice(args);
        id = *underlying;
    }

    let mut decomposer = Decomposer {
        ctx,
        from,
        graph,
        type_params: HashSet::new(),
        instantiated: false,
    };
    for &arg in &type_args {
        decomposer.visit(arg);
    }
    decomposer.instantiated = !type_args.is_empty();
    decomposer.visit(id);
}

struct Decomposer<'c, 'a, 'g> {
    ctx: &'c Context<'a>,
    from: &'c Node,
    graph: &'g mut Graph,
    // Constraints may mention their own type parameter; each is expanded once.
    type_params: HashSet<TypeId>,
    // Walking a generic's structure on behalf of an instance: its type
    // parameters are bound to arguments that were already decomposed.
    instantiated: bool,
}

impl Decomposer<'_, '_, '_> {
    fn visit(&mut self, id: TypeId) {
        match self.ctx.ty(id) {
            Type::Named {
                name,
                package,
                type_args,
                ..
            } => {
                if *package == Some(self.ctx.package) {
                    let to = Node::ty(name);
                    trace!(from = %self.from, to = %to, "edge");
                    self.graph.add_edge(self.from.clone(), to);
                }
                // `atomic.Pointer[Config]` still references our `Config`.
                for &arg in type_args {
                    self.visit(arg);
                }
            }
            Type::Struct { fields } => {
                for field in fields {
                    self.visit(field.ty);
                }
            }
            Type::Interface { embedded, methods } => {
                for &ty in embedded {
                    self.visit(ty);
                }
                for method in methods {
                    self.visit(method.signature);
                }
            }
            Type::Signature(sig) => {
                for &param in &sig.params {
                    self.visit(param);
                }
                for &result in &sig.results {
                    self.visit(result);
                }
                if let Some(recv) = sig.recv {
                    self.visit(recv);
                }
            }
            Type::Map { key, value } => {
                self.visit(*key);
                self.visit(*value);
            }
            Type::Slice { elem }
            | Type::Array { elem, .. }
            | Type::Pointer { elem }
            | Type::Chan { elem, .. } => self.visit(*elem),
            // Basic types can't belong to our package.
            Type::Basic { .. } => {}
            Type::TypeParam { constraint, .. } => {
                if !self.instantiated && self.type_params.insert(id) {
                    self.visit(*constraint);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{
        BadDecl, Field, File, GenDecl, Method, PackageBuilder, Receiver, Signature, SyntaxNode,
    };
    use crate::types::Edge;

    /// Hand-assembled front-end output, the way a type checker would report
    /// it, so the analysis can be tested without parsing.
    struct Fixture {
        b: PackageBuilder,
        decls: Vec<Decl>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                b: PackageBuilder::new("example.com/shop", "shop"),
                decls: Vec::new(),
            }
        }

        fn own(&self) -> Option<PackageId> {
            Some(self.b.package())
        }

        /// `type <name> <underlying>`
        fn type_decl(&mut self, named: TypeId, underlying: TypeId) {
            self.b.set_underlying(named, underlying);
            let name = match self.b.type_data(named) {
                Some(Type::Named { name, .. }) => name.clone(),
                other => panic!("not a named type: {other:?}"),
            };
            let own = self.own();
            let obj = self.b.add_object(&name, ObjectKind::TypeName, own, named);
            let ident = self.b.ident(&name);
            self.b.record_def(&ident, obj);
            self.decls.push(Decl::Gen(GenDecl {
                tok: DeclToken::Type,
                specs: vec![Spec::Type { name: ident }],
            }));
        }

        fn value_decl(&mut self, tok: DeclToken, name: &str, ty: TypeId) {
            let kind = match tok {
                DeclToken::Const => ObjectKind::Const,
                _ => ObjectKind::Var,
            };
            let own = self.own();
            let obj = self.b.add_object(name, kind, own, ty);
            let ident = self.b.ident(name);
            self.b.record_def(&ident, obj);
            self.decls.push(Decl::Gen(GenDecl {
                tok,
                specs: vec![Spec::Value { names: vec![ident] }],
            }));
        }

        fn func_decl(&mut self, name: &str, sig: Signature, body: Option<SyntaxNode>) {
            let recv = sig.recv.map(|recv| {
                let (elem, pointer) = match self.b.type_data(recv) {
                    Some(Type::Pointer { elem }) => (*elem, true),
                    _ => (recv, false),
                };
                let type_name = match self.b.type_data(elem) {
                    Some(Type::Named { name, .. }) => name.clone(),
                    other => panic!("bad receiver {other:?}"),
                };
                Receiver { type_name, pointer }
            });
            let sig_ty = self.b.signature(sig);
            let own = self.own();
            let obj = self.b.add_object(name, ObjectKind::Func, own, sig_ty);
            let ident = self.b.ident(name);
            self.b.record_def(&ident, obj);
            self.decls.push(Decl::Func(FuncDecl {
                name: ident,
                recv,
                body,
            }));
        }

        /// A local `var <name> <ty>` definition site inside a body.
        fn local_def(&mut self, name: &str, ty: TypeId) -> SyntaxNode {
            let own = self.own();
            let obj = self.b.add_object(name, ObjectKind::Var, own, ty);
            let ident = self.b.ident(name);
            self.b.record_def(&ident, obj);
            SyntaxNode::node("var_spec", vec![SyntaxNode::Ident(ident)])
        }

        /// A use of an existing object inside a body.
        fn use_of(&mut self, name: &str, obj_ty: TypeId, kind: ObjectKind) -> SyntaxNode {
            let own = self.own();
            let obj = self.b.add_object(name, kind, own, obj_ty);
            let ident = self.b.ident(name);
            self.b.record_use(&ident, obj);
            SyntaxNode::Ident(ident)
        }

        fn graph(mut self) -> Graph {
            let decls = std::mem::take(&mut self.decls);
            self.b.add_file(File {
                path: "shop.go".into(),
                decls,
            });
            analyze(&self.b.build())
        }
    }

    fn field(name: &str, ty: TypeId) -> Field {
        Field {
            name: name.into(),
            ty,
            embedded: false,
        }
    }

    fn edge(from: Node, to: Node) -> Edge {
        Edge::new(from, to)
    }

    #[test]
    fn test_end_to_end_method_scenario() {
        // type A struct { B B }; type B struct{}; func (a A) Use() { var x B; _ = x }
        let mut f = Fixture::new();
        let a = f.b.named("A");
        let b = f.b.named("B");
        let a_struct = f.b.struct_of(vec![field("B", b)]);
        let b_struct = f.b.struct_of(vec![]);
        f.type_decl(a, a_struct);
        f.type_decl(b, b_struct);

        let x_def = f.local_def("x", b);
        let x_use = f.use_of("x", b, ObjectKind::Var);
        let body = SyntaxNode::node(
            "block",
            vec![
                x_def,
                SyntaxNode::node("assignment_statement", vec![x_use]),
            ],
        );
        f.func_decl(
            "Use",
            Signature {
                recv: Some(a),
                ..Signature::default()
            },
            Some(body),
        );

        let g = f.graph();
        assert_eq!(g.nodes(), HashSet::from([Node::ty("A"), Node::ty("B")]));
        assert_eq!(g.edges(), HashSet::from([edge(Node::ty("A"), Node::ty("B"))]));
    }

    #[test]
    fn test_declaration_kinds() {
        let mut f = Fixture::new();
        let int = f.b.basic("int");
        let cfg = f.b.named("Config");
        let st = f.b.struct_of(vec![]);
        f.type_decl(cfg, st);
        f.value_decl(DeclToken::Const, "MaxItems", int);
        f.value_decl(DeclToken::Var, "defaultConfig", cfg);
        f.func_decl("Run", Signature::default(), None);
        f.decls.push(Decl::Gen(GenDecl {
            tok: DeclToken::Import,
            specs: vec![Spec::Import { path: "fmt".into() }],
        }));

        let g = f.graph();
        assert_eq!(
            g.nodes(),
            HashSet::from([
                Node::ty("Config"),
                Node::constant("MaxItems"),
                Node::variable("defaultConfig"),
                Node::function("Run"),
            ])
        );
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::variable("defaultConfig"), Node::ty("Config"))])
        );
    }

    #[test]
    fn test_cross_kind_distinct_nodes() {
        let mut f = Fixture::new();
        let foo = f.b.named("Foo");
        let st = f.b.struct_of(vec![]);
        f.type_decl(foo, st);
        f.func_decl(
            "Foo",
            Signature {
                results: vec![foo],
                ..Signature::default()
            },
            None,
        );

        let g = f.graph();
        assert_eq!(g.node_count(), 2);
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::function("Foo"), Node::ty("Foo"))])
        );
    }

    #[test]
    fn test_struct_field_decomposition() {
        let mut f = Fixture::new();
        let int = f.b.basic("int");
        let item = f.b.named("Item");
        let order = f.b.named("Order");
        let item_st = f.b.struct_of(vec![field("Qty", int)]);
        let order_st = f.b.struct_of(vec![field("First", item), field("Count", int)]);
        f.type_decl(item, item_st);
        f.type_decl(order, order_st);

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::ty("Order"), Node::ty("Item"))])
        );
    }

    #[test]
    fn test_foreign_named_type_dropped() {
        let mut f = Fixture::new();
        let bytes = f.b.foreign_package("bytes");
        let buffer = f.b.named_in("Buffer", Some(bytes));
        let err = f.b.named_in("error", None);
        let local = f.b.named("Local");
        let local_st = f.b.struct_of(vec![]);
        f.type_decl(local, local_st);

        let writer = f.b.named("Writer");
        let buf_ptr = f.b.pointer(buffer);
        let st = f
            .b
            .struct_of(vec![field("buf", buf_ptr), field("err", err), field("l", local)]);
        f.type_decl(writer, st);

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::ty("Writer"), Node::ty("Local"))])
        );
        assert!(!g.has_node(&Node::ty("Buffer")));
        assert!(!g.has_node(&Node::ty("error")));
    }

    #[test]
    fn test_nested_shapes() {
        let mut f = Fixture::new();
        let names = ["K", "V", "S", "Arr", "P", "C", "Param", "Res", "Emb", "MArg"];
        let mut ids = Vec::new();
        for name in names {
            let id = f.b.named(name);
            let st = f.b.struct_of(vec![]);
            f.type_decl(id, st);
            ids.push(id);
        }
        let &[k, v, s, arr, p, c, param, res, emb, marg] = ids.as_slice() else {
            unreachable!()
        };

        let map = f.b.map(k, v);
        let slice = f.b.slice(s);
        let array = f.b.add_type(Type::Array { elem: arr });
        let ptr = f.b.pointer(p);
        let chan = f.b.add_type(Type::Chan { elem: c });
        let callback = f.b.signature(Signature {
            params: vec![param],
            results: vec![res],
            ..Signature::default()
        });
        let method_sig = f.b.signature(Signature {
            params: vec![marg],
            ..Signature::default()
        });
        let iface = f.b.add_type(Type::Interface {
            embedded: vec![emb],
            methods: vec![Method {
                name: "Do".into(),
                signature: method_sig,
            }],
        });
        let everything = f.b.named("Everything");
        let st = f.b.struct_of(vec![
            field("m", map),
            field("s", slice),
            field("a", array),
            field("p", ptr),
            field("c", chan),
            field("f", callback),
            field("i", iface),
        ]);
        f.type_decl(everything, st);

        let g = f.graph();
        let targets: HashSet<Node> = g.dependencies(&Node::ty("Everything"));
        let expected: HashSet<Node> = names.iter().map(|n| Node::ty(*n)).collect();
        assert_eq!(targets, expected);
        assert_eq!(g.edge_count(), names.len());
    }

    #[test]
    fn test_self_referential_type() {
        // type List struct { next *List; val int }
        let mut f = Fixture::new();
        let int = f.b.basic("int");
        let list = f.b.named("List");
        let ptr = f.b.pointer(list);
        let st = f.b.struct_of(vec![field("next", ptr), field("val", int)]);
        f.type_decl(list, st);

        let g = f.graph();
        assert!(g.has_node(&Node::ty("List")));
        assert!(g.edges().is_empty());
    }

    #[test]
    fn test_mutually_recursive_types() {
        let mut f = Fixture::new();
        let tree = f.b.named("Tree");
        let node = f.b.named("Node");
        let children = f.b.slice(node);
        let tree_st = f.b.struct_of(vec![field("roots", children)]);
        let tree_ptr = f.b.pointer(tree);
        let node_st = f.b.struct_of(vec![field("owner", tree_ptr)]);
        f.type_decl(tree, tree_st);
        f.type_decl(node, node_st);

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([
                edge(Node::ty("Tree"), Node::ty("Node")),
                edge(Node::ty("Node"), Node::ty("Tree")),
            ])
        );
    }

    #[test]
    fn test_method_body_attributed_to_receiver() {
        let mut f = Fixture::new();
        let server = f.b.named("Server");
        let request = f.b.named("Request");
        let empty = f.b.struct_of(vec![]);
        f.type_decl(server, empty);
        let empty = f.b.struct_of(vec![]);
        f.type_decl(request, empty);

        let req_use = f.use_of("Request", request, ObjectKind::TypeName);
        let body = SyntaxNode::node("block", vec![req_use]);
        let recv = f.b.pointer(server);
        f.func_decl(
            "Handle",
            Signature {
                recv: Some(recv),
                ..Signature::default()
            },
            Some(body),
        );

        let g = f.graph();
        assert!(!g.has_node(&Node::function("Handle")));
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::ty("Server"), Node::ty("Request"))])
        );
    }

    #[test]
    fn test_function_signature_and_body() {
        let mut f = Fixture::new();
        let names = ["In", "Out", "Local", "Used", "Implicit", "Expr"];
        let mut ids = Vec::new();
        for name in names {
            let id = f.b.named(name);
            let st = f.b.struct_of(vec![]);
            f.type_decl(id, st);
            ids.push(id);
        }
        let &[input, output, local, used, implicit, expr] = ids.as_slice() else {
            unreachable!()
        };

        let local_def = f.local_def("tmp", local);
        let used_ident = f.use_of("helper", used, ObjectKind::Var);

        let own = f.own();
        let implicit_obj = f.b.add_object("v", ObjectKind::Var, own, implicit);
        let v = f.b.ident("v");
        f.b.record_implicit(&v, implicit_obj);

        let e = f.b.ident("e");
        f.b.record_type(&e, expr);

        let body = SyntaxNode::node(
            "block",
            vec![local_def, used_ident, SyntaxNode::Ident(v), SyntaxNode::Ident(e)],
        );
        f.func_decl(
            "convert",
            Signature {
                params: vec![input],
                results: vec![output],
                ..Signature::default()
            },
            Some(body),
        );

        let g = f.graph();
        let expected: HashSet<Node> = names.iter().map(|n| Node::ty(*n)).collect();
        assert_eq!(g.dependencies(&Node::function("convert")), expected);
    }

    #[test]
    fn test_funcless_declaration_contributes_body_edges_only() {
        // A function whose name has no recorded object: its signature is
        // unknown, so only the body can contribute.
        let mut f = Fixture::new();
        let sig_only = f.b.named("SigOnly");
        let body_ref = f.b.named("BodyRef");
        let empty = f.b.struct_of(vec![]);
        f.type_decl(sig_only, empty);
        let empty = f.b.struct_of(vec![]);
        f.type_decl(body_ref, empty);

        let body_use = f.use_of("BodyRef", body_ref, ObjectKind::TypeName);
        let name = f.b.ident("asmStub");
        f.decls.push(Decl::Func(FuncDecl {
            name,
            recv: None,
            body: Some(SyntaxNode::node("block", vec![body_use])),
        }));

        let g = f.graph();
        assert_eq!(
            g.dependencies(&Node::function("asmStub")),
            HashSet::from([Node::ty("BodyRef")])
        );
        assert!(g.dependents(&Node::ty("SigOnly")).is_empty());
    }

    #[test]
    fn test_funcless_declaration_without_body_has_no_edges() {
        let mut f = Fixture::new();
        let name = f.b.ident("external");
        f.decls.push(Decl::Func(FuncDecl {
            name,
            recv: None,
            body: None,
        }));

        let g = f.graph();
        assert_eq!(g.nodes(), HashSet::from([Node::function("external")]));
        assert!(g.edges().is_empty());
    }

    #[test]
    fn test_generic_instantiation_and_type_params() {
        // type Box[T Shape] struct{ v T }; var b Box[Circle]
        let mut f = Fixture::new();
        let shape = f.b.named("Shape");
        let iface = f.b.add_type(Type::Interface {
            embedded: vec![],
            methods: vec![],
        });
        f.type_decl(shape, iface);
        let circle = f.b.named("Circle");
        let empty = f.b.struct_of(vec![]);
        f.type_decl(circle, empty);

        let t = f.b.add_type(Type::TypeParam {
            name: "T".into(),
            constraint: shape,
        });
        let boxed = f.b.named("Box");
        let st = f.b.struct_of(vec![field("v", t)]);
        f.type_decl(boxed, st);

        let own = f.own();
        let inst = f.b.add_type(Type::Named {
            name: "Box".into(),
            package: own,
            underlying: st,
            type_args: vec![circle],
        });
        f.value_decl(DeclToken::Var, "b", inst);

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([
                edge(Node::ty("Box"), Node::ty("Shape")),
                edge(Node::variable("b"), Node::ty("Box")),
                edge(Node::variable("b"), Node::ty("Circle")),
            ])
        );
    }

    #[test]
    fn test_foreign_generic_with_local_argument() {
        // var cur atomic.Pointer[Config]
        let mut f = Fixture::new();
        let config = f.b.named("Config");
        let st = f.b.struct_of(vec![]);
        f.type_decl(config, st);

        let atomic = f.b.foreign_package("sync/atomic");
        let pointer = f.b.add_type(Type::Named {
            name: "Pointer".into(),
            package: Some(atomic),
            underlying: f.b.invalid(),
            type_args: vec![config],
        });
        f.value_decl(DeclToken::Var, "cur", pointer);

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::variable("cur"), Node::ty("Config"))])
        );
        assert!(!g.has_node(&Node::ty("Pointer")));
    }

    #[test]
    fn test_type_declared_from_instance_binds_arguments() {
        // type Box[T Shape] struct{ v T }; type X Box[Circle]
        let mut f = Fixture::new();
        let shape = f.b.named("Shape");
        let iface = f.b.add_type(Type::Interface {
            embedded: vec![],
            methods: vec![],
        });
        f.type_decl(shape, iface);
        let circle = f.b.named("Circle");
        let empty = f.b.struct_of(vec![]);
        f.type_decl(circle, empty);

        let t = f.b.add_type(Type::TypeParam {
            name: "T".into(),
            constraint: shape,
        });
        let boxed = f.b.named("Box");
        let st = f.b.struct_of(vec![field("v", t)]);
        f.type_decl(boxed, st);

        let own = f.own();
        let inst = f.b.add_type(Type::Named {
            name: "Box".into(),
            package: own,
            underlying: boxed,
            type_args: vec![circle],
        });
        let x = f.b.named("X");
        f.type_decl(x, inst);

        let g = f.graph();
        assert_eq!(
            g.dependencies(&Node::ty("X")),
            HashSet::from([Node::ty("Circle")])
        );
        assert_eq!(
            g.dependencies(&Node::ty("Box")),
            HashSet::from([Node::ty("Shape")])
        );
    }

    #[test]
    fn test_self_constrained_type_param_terminates() {
        // func Sort[T Ordered[T]](xs []T)
        let mut f = Fixture::new();
        let ordered = f.b.named("Ordered");
        let iface = f.b.add_type(Type::Interface {
            embedded: vec![],
            methods: vec![],
        });
        f.type_decl(ordered, iface);

        let t = f.b.add_type(Type::TypeParam {
            name: "T".into(),
            constraint: f.b.invalid(),
        });
        let own = f.own();
        let ordered_t = f.b.add_type(Type::Named {
            name: "Ordered".into(),
            package: own,
            underlying: iface,
            type_args: vec![t],
        });
        f.b.replace_type(
            t,
            Type::TypeParam {
                name: "T".into(),
                constraint: ordered_t,
            },
        );
        let xs = f.b.slice(t);
        f.func_decl(
            "Sort",
            Signature {
                params: vec![xs],
                ..Signature::default()
            },
            None,
        );

        let g = f.graph();
        assert_eq!(
            g.edges(),
            HashSet::from([edge(Node::function("Sort"), Node::ty("Ordered"))])
        );
    }

    #[test]
    fn test_duplicate_references_single_edge() {
        let mut f = Fixture::new();
        let item = f.b.named("Item");
        let empty = f.b.struct_of(vec![]);
        f.type_decl(item, empty);
        let uses: Vec<SyntaxNode> = (0..5)
            .map(|_| f.use_of("Item", item, ObjectKind::TypeName))
            .collect();
        f.func_decl(
            "build",
            Signature {
                results: vec![item],
                ..Signature::default()
            },
            Some(SyntaxNode::node("block", uses)),
        );

        let g = f.graph();
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    #[should_panic(expected = "unsupported declaration")]
    fn test_bad_declaration_is_fatal() {
        let mut f = Fixture::new();
        f.decls.push(Decl::Bad(BadDecl {
            kind: "ERROR".into(),
            line: 3,
        }));
        f.graph();
    }

    #[test]
    #[should_panic(expected = "not in the package type table")]
    fn test_dangling_type_is_fatal() {
        let mut f = Fixture::new();
        f.value_decl(DeclToken::Var, "broken", TypeId(9_999));
        f.graph();
    }

    #[test]
    #[should_panic(expected = "unsupported definition object")]
    fn test_package_name_definition_is_fatal() {
        let mut f = Fixture::new();
        let invalid = f.b.invalid();
        let obj = f.b.add_object("fmt", ObjectKind::PkgName, None, invalid);
        let ident = f.b.ident("fmt");
        f.b.record_def(&ident, obj);
        f.decls.push(Decl::Gen(GenDecl {
            tok: DeclToken::Var,
            specs: vec![Spec::Value { names: vec![ident] }],
        }));
        f.graph();
    }
}
