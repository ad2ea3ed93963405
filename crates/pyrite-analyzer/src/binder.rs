//! Name binding and scope resolution
//!
//! The binder performs two-pass analysis:
//! 1. Walk the tree once, creating scopes and collecting every binding and
//!    every use together with `global` / `nonlocal` declarations
//! 2. Place bindings in their target scopes, then resolve each use
//!
//! Resolving after collection gives Python's rule that a name bound anywhere
//! in a function body is local to the whole body.

use crate::analysis::{AnalysisOptions, StarImportPolicy};
use crate::ast::*;
use crate::builtins::is_builtin;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::span::Span;
use crate::symbol::{
    ImportEdge, ImportTarget, Reference, Resolution, Scope, ScopeId, ScopeKind, ScopeTree, Symbol,
    SymbolId, SymbolKind,
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Names the interpreter defines implicitly inside a class body
const CLASS_BODY_NAMES: &[&str] = &["__module__", "__qualname__"];

/// `global` / `nonlocal` declarations of one scope
#[derive(Default)]
struct Declarations {
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

struct PendingBinding {
    scope: ScopeId,
    name: String,
    span: Span,
    kind: SymbolKind,
    definition_span: Span,
    detail: Option<String>,
    docstring: Option<String>,
    import: Option<ImportTarget>,
    body_scope: Option<ScopeId>,
    import_edge: Option<usize>,
}

struct PendingUse {
    scope: ScopeId,
    name: String,
    span: Span,
    /// Inside an `Error` node; resolved but never reported
    suppressed: bool,
}

/// Binder for name resolution and scope management
pub struct Binder<'a> {
    source: &'a str,
    options: &'a AnalysisOptions,
    tree: ScopeTree,
    declarations: Vec<Declarations>,
    bindings: Vec<PendingBinding>,
    uses: Vec<PendingUse>,
    current: ScopeId,
    loop_depth: usize,
    error_depth: usize,
    stmt_span: Span,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Binder<'a> {
    /// Create a new binder; `source` is used to render signatures
    pub fn new(source: &'a str, options: &'a AnalysisOptions) -> Self {
        Self {
            source,
            options,
            tree: ScopeTree::default(),
            declarations: Vec::new(),
            bindings: Vec::new(),
            uses: Vec::new(),
            current: ScopeId(0),
            loop_depth: 0,
            error_depth: 0,
            stmt_span: Span::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Bind a module (collect, then resolve)
    pub fn bind(mut self, module: &Module) -> (ScopeTree, Vec<Diagnostic>) {
        // Phase 1: scopes, bindings, uses, declarations
        self.current = self.push_scope(ScopeKind::Module, "<module>", module.span);
        self.stmt_span = module.span;
        self.bind_body(&module.body);

        // Phase 2: place bindings, then resolve uses against them
        self.place_bindings();
        self.resolve_uses();

        self.tree
            .references
            .sort_by_key(|r| (r.span.start, r.span.end, !r.is_binding));
        (self.tree, self.diagnostics)
    }

    // === Phase 1 ===

    fn push_scope(&mut self, kind: ScopeKind, name: &str, span: Span) -> ScopeId {
        let parent = if self.tree.scopes.is_empty() {
            None
        } else {
            Some(self.current)
        };
        let id = ScopeId(self.tree.scopes.len() as u32);
        self.tree.scopes.push(Scope {
            kind,
            name: name.to_string(),
            parent,
            span,
            symbols: IndexMap::new(),
        });
        self.declarations.push(Declarations::default());
        id
    }

    fn scope_kind(&self) -> ScopeKind {
        self.tree.scope(self.current).kind
    }

    /// Run `f` inside `scope` with loop tracking reset
    fn in_scope(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let saved_scope = std::mem::replace(&mut self.current, scope);
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        f(self);
        self.loop_depth = saved_loops;
        self.current = saved_scope;
    }

    fn bind_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.bind_statement(stmt);
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: String, span: Span) {
        if self.error_depth == 0 {
            self.diagnostics.push(Diagnostic::error(code, message, span));
        }
    }

    fn define(&mut self, ident: &Identifier, kind: SymbolKind) {
        self.define_in(self.current, ident, kind);
    }

    fn define_in(&mut self, scope: ScopeId, ident: &Identifier, kind: SymbolKind) {
        self.bindings.push(PendingBinding {
            scope,
            name: ident.name.clone(),
            span: ident.span,
            kind,
            definition_span: self.stmt_span,
            detail: None,
            docstring: None,
            import: None,
            body_scope: None,
            import_edge: None,
        });
    }

    fn use_name(&mut self, ident: &Identifier) {
        self.uses.push(PendingUse {
            scope: self.current,
            name: ident.name.clone(),
            span: ident.span,
            suppressed: self.error_depth > 0,
        });
    }

    /// Bind a statement
    fn bind_statement(&mut self, stmt: &Stmt) {
        let saved_span = std::mem::replace(&mut self.stmt_span, stmt.span());

        match stmt {
            Stmt::FunctionDef(func) => self.bind_function(func),
            Stmt::ClassDef(class) => self.bind_class(class),
            Stmt::Return(ret) => {
                if self.scope_kind() != ScopeKind::Function {
                    self.report(
                        DiagnosticCode::ReturnOutsideFunction,
                        "'return' outside function".to_string(),
                        ret.span,
                    );
                }
                if let Some(value) = &ret.value {
                    self.bind_expr(value);
                }
            }
            Stmt::Delete(del) => {
                for target in &del.targets {
                    self.bind_expr(target);
                }
            }
            Stmt::Assign(assign) => {
                self.bind_expr(&assign.value);
                for target in &assign.targets {
                    self.bind_target(target);
                }
            }
            Stmt::AugAssign(aug) => {
                self.bind_expr(&aug.value);
                self.bind_target(&aug.target);
            }
            Stmt::AnnAssign(ann) => {
                self.bind_expr(&ann.annotation);
                if let Some(value) = &ann.value {
                    self.bind_expr(value);
                }
                self.bind_target(&ann.target);
            }
            Stmt::For(for_stmt) => {
                self.bind_expr(&for_stmt.iter);
                self.bind_target(&for_stmt.target);
                self.bind_loop_body(&for_stmt.body);
                self.bind_body(&for_stmt.orelse);
            }
            Stmt::While(while_stmt) => {
                self.bind_expr(&while_stmt.test);
                self.bind_loop_body(&while_stmt.body);
                self.bind_body(&while_stmt.orelse);
            }
            Stmt::If(if_stmt) => {
                self.bind_expr(&if_stmt.test);
                self.bind_body(&if_stmt.body);
                for clause in &if_stmt.elifs {
                    self.bind_expr(&clause.test);
                    self.bind_body(&clause.body);
                }
                self.bind_body(&if_stmt.orelse);
            }
            Stmt::With(with) => {
                for item in &with.items {
                    self.bind_expr(&item.context);
                    if let Some(target) = &item.target {
                        self.bind_target(target);
                    }
                }
                self.bind_body(&with.body);
            }
            Stmt::Match(match_stmt) => {
                self.bind_expr(&match_stmt.subject);
                for case in &match_stmt.cases {
                    self.bind_pattern(&case.pattern);
                    if let Some(alias) = &case.alias {
                        self.define(alias, SymbolKind::Variable);
                    }
                    if let Some(guard) = &case.guard {
                        self.bind_expr(guard);
                    }
                    self.bind_body(&case.body);
                }
            }
            Stmt::Raise(raise) => {
                if let Some(exc) = &raise.exc {
                    self.bind_expr(exc);
                }
                if let Some(cause) = &raise.cause {
                    self.bind_expr(cause);
                }
            }
            Stmt::Try(try_stmt) => {
                self.bind_body(&try_stmt.body);
                for handler in &try_stmt.handlers {
                    if let Some(ty) = &handler.ty {
                        self.bind_expr(ty);
                    }
                    if let Some(name) = &handler.name {
                        self.define(name, SymbolKind::Variable);
                    }
                    self.bind_body(&handler.body);
                }
                self.bind_body(&try_stmt.orelse);
                self.bind_body(&try_stmt.finalbody);
            }
            Stmt::Assert(assert) => {
                self.bind_expr(&assert.test);
                if let Some(msg) = &assert.msg {
                    self.bind_expr(msg);
                }
            }
            Stmt::Import(import) => self.bind_import(import),
            Stmt::ImportFrom(import) => self.bind_import_from(import),
            Stmt::Global(decl) => {
                for name in &decl.names {
                    self.declarations[self.current.0 as usize]
                        .globals
                        .insert(name.name.clone());
                }
            }
            Stmt::Nonlocal(decl) => {
                if self.scope_kind() == ScopeKind::Module {
                    self.report(
                        DiagnosticCode::NonlocalAtModuleLevel,
                        "nonlocal declaration not allowed at module level".to_string(),
                        decl.span,
                    );
                } else {
                    for name in &decl.names {
                        self.declarations[self.current.0 as usize]
                            .nonlocals
                            .insert(name.name.clone());
                    }
                }
            }
            Stmt::Expr(expr) => self.bind_expr(&expr.value),
            Stmt::Pass(_) => {}
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.report(
                        DiagnosticCode::BreakOutsideLoop,
                        "'break' outside loop".to_string(),
                        *span,
                    );
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    self.report(
                        DiagnosticCode::ContinueOutsideLoop,
                        "'continue' not properly in loop".to_string(),
                        *span,
                    );
                }
            }
            Stmt::Error(error) => {
                self.error_depth += 1;
                self.bind_body(&error.body);
                self.error_depth -= 1;
            }
        }

        self.stmt_span = saved_span;
    }

    fn bind_loop_body(&mut self, body: &[Stmt]) {
        self.loop_depth += 1;
        self.bind_body(body);
        self.loop_depth -= 1;
    }

    fn bind_function(&mut self, func: &FunctionDef) {
        // Evaluated in the enclosing scope
        for decorator in &func.decorators {
            self.bind_expr(decorator);
        }
        self.bind_param_defaults(&func.params);
        if let Some(returns) = &func.returns {
            self.bind_expr(returns);
        }

        let scope = self.push_scope(ScopeKind::Function, &func.name.name, func.span);
        let detail = self.render_function(func);
        self.bindings.push(PendingBinding {
            scope: self.current,
            name: func.name.name.clone(),
            span: func.name.span,
            kind: SymbolKind::Function,
            definition_span: func.span,
            detail: Some(detail),
            docstring: func.docstring(),
            import: None,
            body_scope: Some(scope),
            import_edge: None,
        });

        self.in_scope(scope, |binder| {
            binder.bind_params(&func.params);
            binder.bind_body(&func.body);
        });
    }

    fn bind_class(&mut self, class: &ClassDef) {
        for decorator in &class.decorators {
            self.bind_expr(decorator);
        }
        for base in &class.bases {
            self.bind_expr(base);
        }
        for keyword in &class.keywords {
            self.bind_expr(&keyword.value);
        }

        let scope = self.push_scope(ScopeKind::Class, &class.name.name, class.span);
        let detail = self.render_class(class);
        self.bindings.push(PendingBinding {
            scope: self.current,
            name: class.name.name.clone(),
            span: class.name.span,
            kind: SymbolKind::Class,
            definition_span: class.span,
            detail: Some(detail),
            docstring: class.docstring(),
            import: None,
            body_scope: Some(scope),
            import_edge: None,
        });

        self.in_scope(scope, |binder| binder.bind_body(&class.body));
    }

    fn bind_param_defaults(&mut self, params: &[Param]) {
        for param in params {
            if let Some(annotation) = &param.annotation {
                self.bind_expr(annotation);
            }
            if let Some(default) = &param.default {
                self.bind_expr(default);
            }
        }
    }

    fn bind_params(&mut self, params: &[Param]) {
        let mut seen = HashSet::new();
        for param in params {
            if !seen.insert(param.name.name.as_str()) {
                self.report(
                    DiagnosticCode::DuplicateParameter,
                    format!("duplicate argument '{}' in function definition", param.name.name),
                    param.name.span,
                );
                continue;
            }
            self.define(&param.name, SymbolKind::Parameter);
        }
    }

    fn bind_import(&mut self, import: &ImportStmt) {
        for alias in &import.names {
            // `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`
            let (local, module) = match &alias.asname {
                Some(asname) => (asname.clone(), alias.module.dotted()),
                None => match alias.module.parts.first() {
                    Some(first) => (first.clone(), first.name.clone()),
                    None => continue,
                },
            };
            let target = ImportTarget {
                module,
                level: 0,
                name: None,
            };
            self.bind_import_edge(&local, target, false);
        }
    }

    fn bind_import_from(&mut self, import: &ImportFromStmt) {
        let module = import
            .module
            .as_ref()
            .map(DottedName::dotted)
            .unwrap_or_default();

        if import.is_star {
            self.tree.imports.push(ImportEdge {
                target: ImportTarget {
                    module,
                    level: import.level,
                    name: None,
                },
                alias: "*".to_string(),
                span: import.span,
                is_star: true,
                symbol: None,
            });
            return;
        }

        for alias in &import.names {
            let local = alias.asname.clone().unwrap_or_else(|| alias.name.clone());
            let target = ImportTarget {
                module: module.clone(),
                level: import.level,
                name: Some(alias.name.name.clone()),
            };
            self.bind_import_edge(&local, target, false);
        }
    }

    fn bind_import_edge(&mut self, local: &Identifier, target: ImportTarget, is_star: bool) {
        let edge = self.tree.imports.len();
        self.tree.imports.push(ImportEdge {
            target: target.clone(),
            alias: local.name.clone(),
            span: local.span,
            is_star,
            symbol: None,
        });
        self.bindings.push(PendingBinding {
            scope: self.current,
            name: local.name.clone(),
            span: local.span,
            kind: SymbolKind::Import,
            definition_span: self.stmt_span,
            detail: None,
            docstring: None,
            import: Some(target),
            body_scope: None,
            import_edge: Some(edge),
        });
    }

    /// Bind an assignment target
    fn bind_target(&mut self, target: &Expr) {
        match target {
            Expr::Name(ident) => self.define(ident, SymbolKind::Variable),
            Expr::Tuple(seq) | Expr::List(seq) => {
                for element in &seq.elements {
                    self.bind_target(element);
                }
            }
            Expr::Starred(star) => self.bind_target(&star.value),
            _ => self.bind_expr(target),
        }
    }

    /// Bind names captured by a `case` pattern
    fn bind_pattern(&mut self, pattern: &Expr) {
        match pattern {
            Expr::Name(ident) if ident.name == "_" => {}
            Expr::Name(ident) => self.define(ident, SymbolKind::Variable),
            Expr::Call(call) => {
                self.bind_expr(&call.func);
                for arg in &call.args {
                    self.bind_pattern(arg);
                }
                for keyword in &call.keywords {
                    self.bind_pattern(&keyword.value);
                }
            }
            Expr::Tuple(seq) | Expr::List(seq) => {
                for element in &seq.elements {
                    self.bind_pattern(element);
                }
            }
            Expr::Starred(star) => self.bind_pattern(&star.value),
            Expr::Dict(dict) => {
                for (key, value) in &dict.entries {
                    if let Some(key) = key {
                        self.bind_expr(key);
                    }
                    self.bind_pattern(value);
                }
            }
            Expr::Binary(binary) if binary.op == BinaryOp::BitOr => {
                self.bind_pattern(&binary.left);
                self.bind_pattern(&binary.right);
            }
            _ => self.bind_expr(pattern),
        }
    }

    /// Bind an expression
    fn bind_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(ident) => self.use_name(ident),
            Expr::Literal(..) | Expr::Error(_) => {}
            Expr::BoolOp(bool_op) => {
                for value in &bool_op.values {
                    self.bind_expr(value);
                }
            }
            Expr::Named(named) => {
                self.bind_expr(&named.value);
                // walrus targets escape comprehensions
                let mut scope = self.current;
                while self.tree.scope(scope).kind == ScopeKind::Comprehension {
                    match self.tree.scope(scope).parent {
                        Some(parent) => scope = parent,
                        None => break,
                    }
                }
                self.define_in(scope, &named.target, SymbolKind::Variable);
            }
            Expr::Binary(binary) => {
                self.bind_expr(&binary.left);
                self.bind_expr(&binary.right);
            }
            Expr::Unary(unary) => self.bind_expr(&unary.operand),
            Expr::Lambda(lambda) => {
                self.bind_param_defaults(&lambda.params);
                let scope = self.push_scope(ScopeKind::Lambda, "<lambda>", lambda.span);
                self.in_scope(scope, |binder| {
                    binder.bind_params(&lambda.params);
                    binder.bind_expr(&lambda.body);
                });
            }
            Expr::IfExp(if_exp) => {
                self.bind_expr(&if_exp.test);
                self.bind_expr(&if_exp.body);
                self.bind_expr(&if_exp.orelse);
            }
            Expr::Dict(dict) => {
                for (key, value) in &dict.entries {
                    if let Some(key) = key {
                        self.bind_expr(key);
                    }
                    self.bind_expr(value);
                }
            }
            Expr::Set(seq) | Expr::List(seq) | Expr::Tuple(seq) => {
                for element in &seq.elements {
                    self.bind_expr(element);
                }
            }
            Expr::Comprehension(comp) => self.bind_comprehension(comp),
            Expr::Await(await_expr) => self.bind_expr(&await_expr.value),
            Expr::Yield(yield_expr) => {
                if matches!(self.scope_kind(), ScopeKind::Module | ScopeKind::Class) {
                    self.report(
                        DiagnosticCode::YieldOutsideFunction,
                        "'yield' outside function".to_string(),
                        yield_expr.span,
                    );
                }
                if let Some(value) = &yield_expr.value {
                    self.bind_expr(value);
                }
            }
            Expr::Compare(compare) => {
                self.bind_expr(&compare.left);
                for comparator in &compare.comparators {
                    self.bind_expr(comparator);
                }
            }
            Expr::Call(call) => {
                self.bind_expr(&call.func);
                for arg in &call.args {
                    self.bind_expr(arg);
                }
                for keyword in &call.keywords {
                    self.bind_expr(&keyword.value);
                }
            }
            Expr::Attribute(attr) => self.bind_expr(&attr.value),
            Expr::Subscript(subscript) => {
                self.bind_expr(&subscript.value);
                self.bind_expr(&subscript.index);
            }
            Expr::Slice(slice) => {
                for part in [&slice.lower, &slice.upper, &slice.step].into_iter().flatten() {
                    self.bind_expr(part);
                }
            }
            Expr::Starred(star) => self.bind_expr(&star.value),
        }
    }

    fn bind_comprehension(&mut self, comp: &ComprehensionExpr) {
        // The first iterable is evaluated in the enclosing scope
        if let Some(first) = comp.clauses.first() {
            self.bind_expr(&first.iter);
        }

        let name = match comp.kind {
            ComprehensionKind::List => "<listcomp>",
            ComprehensionKind::Set => "<setcomp>",
            ComprehensionKind::Dict => "<dictcomp>",
            ComprehensionKind::Generator => "<genexpr>",
        };
        let scope = self.push_scope(ScopeKind::Comprehension, name, comp.span);

        let saved_scope = std::mem::replace(&mut self.current, scope);
        for (i, clause) in comp.clauses.iter().enumerate() {
            if i > 0 {
                self.bind_expr(&clause.iter);
            }
            self.bind_target(&clause.target);
            for condition in &clause.ifs {
                self.bind_expr(condition);
            }
        }
        self.bind_expr(&comp.element);
        if let Some(value) = &comp.value {
            self.bind_expr(value);
        }
        self.current = saved_scope;
    }

    // === Phase 2 ===

    /// Names each scope binds locally, ignoring `global` / `nonlocal` names
    fn local_names(&self) -> Vec<HashSet<String>> {
        let mut locals = vec![HashSet::new(); self.tree.scopes.len()];
        for binding in &self.bindings {
            let decls = &self.declarations[binding.scope.0 as usize];
            if !decls.globals.contains(&binding.name) && !decls.nonlocals.contains(&binding.name) {
                locals[binding.scope.0 as usize].insert(binding.name.clone());
            }
        }
        locals
    }

    /// Scope a binding of `name` written in `scope` lands in
    fn binding_scope(&self, scope: ScopeId, name: &str, locals: &[HashSet<String>]) -> ScopeId {
        let decls = &self.declarations[scope.0 as usize];
        if decls.globals.contains(name) {
            return self.tree.root();
        }
        if !decls.nonlocals.contains(name) {
            return scope;
        }

        let mut current = self.tree.scope(scope).parent;
        while let Some(id) = current {
            let candidate = self.tree.scope(id);
            match candidate.kind {
                ScopeKind::Module => break,
                ScopeKind::Class => {}
                _ => {
                    let decls = &self.declarations[id.0 as usize];
                    if locals[id.0 as usize].contains(name) {
                        return id;
                    }
                    if decls.globals.contains(name) {
                        return self.tree.root();
                    }
                }
            }
            current = candidate.parent;
        }
        scope
    }

    fn place_bindings(&mut self) {
        let locals = self.local_names();
        let bindings = std::mem::take(&mut self.bindings);

        for binding in bindings {
            let target = self.binding_scope(binding.scope, &binding.name, &locals);
            let existing = self.tree.lookup_local(target, &binding.name);
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = SymbolId(self.tree.symbols.len() as u32);
                    self.tree.symbols.push(Symbol {
                        name: binding.name.clone(),
                        kind: binding.kind,
                        scope: target,
                        span: binding.span,
                        definition_span: binding.definition_span,
                        detail: binding.detail,
                        docstring: binding.docstring,
                        import: binding.import,
                        body_scope: binding.body_scope,
                    });
                    self.tree.scopes[target.0 as usize]
                        .symbols
                        .insert(binding.name.clone(), id);
                    id
                }
            };

            if let Some(edge) = binding.import_edge {
                self.tree.imports[edge].symbol = Some(id);
            }
            self.tree.references.push(Reference {
                name: binding.name,
                span: binding.span,
                scope: binding.scope,
                resolution: Resolution::Symbol(id),
                is_binding: true,
            });
        }
    }

    fn resolve_uses(&mut self) {
        let locals = self.local_names();
        let report_unresolved = !(self.options.star_imports == StarImportPolicy::Suppress
            && self.tree.has_star_import());
        let uses = std::mem::take(&mut self.uses);

        for name_use in uses {
            let resolution = self.resolve(name_use.scope, &name_use.name, &locals);
            if resolution == Resolution::Unresolved && report_unresolved && !name_use.suppressed {
                self.diagnostics.push(Diagnostic::new(
                    self.options.unresolved_severity,
                    DiagnosticCode::UnresolvedName,
                    format!("undefined name '{}'", name_use.name),
                    name_use.span,
                ));
            }
            self.tree.references.push(Reference {
                name: name_use.name,
                span: name_use.span,
                scope: name_use.scope,
                resolution,
                is_binding: false,
            });
        }
    }

    fn resolve(&self, scope: ScopeId, name: &str, locals: &[HashSet<String>]) -> Resolution {
        let decls = &self.declarations[scope.0 as usize];
        let chain = if decls.globals.contains(name) {
            vec![self.tree.root()]
        } else if decls.nonlocals.contains(name) {
            vec![self.binding_scope(scope, name, locals)]
        } else {
            self.tree.visible_scopes(scope)
        };

        for id in chain {
            if let Some(symbol) = self.tree.lookup_local(id, name) {
                return Resolution::Symbol(symbol);
            }
            if self.declarations[id.0 as usize].globals.contains(name) {
                if let Some(symbol) = self.tree.lookup_local(self.tree.root(), name) {
                    return Resolution::Symbol(symbol);
                }
            }
        }

        let in_class_body = self.tree.scope(scope).kind == ScopeKind::Class;
        if is_builtin(name)
            || self.options.extra_builtins.iter().any(|b| b == name)
            || (in_class_body && CLASS_BODY_NAMES.contains(&name))
        {
            Resolution::Builtin
        } else {
            Resolution::Unresolved
        }
    }

    // === Signatures ===

    fn source_text(&self, span: Span) -> String {
        match self.source.get(span.start..span.end) {
            Some(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
            None => "…".to_string(),
        }
    }

    /// `def name(a, b: int = …, *args, **kw) -> T`
    fn render_function(&self, func: &FunctionDef) -> String {
        let mut parts = Vec::new();
        let mut saw_star = false;
        for (i, param) in func.params.iter().enumerate() {
            match param.kind {
                ParamKind::VarArgs => saw_star = true,
                ParamKind::KeywordOnly if !saw_star => {
                    parts.push("*".to_string());
                    saw_star = true;
                }
                _ => {}
            }
            parts.push(self.render_param(param));

            let next_kind = func.params.get(i + 1).map(|p| p.kind);
            if param.kind == ParamKind::PositionalOnly
                && next_kind != Some(ParamKind::PositionalOnly)
            {
                parts.push("/".to_string());
            }
        }

        let mut rendered = format!(
            "{}def {}({})",
            if func.is_async { "async " } else { "" },
            func.name.name,
            parts.join(", ")
        );
        if let Some(returns) = &func.returns {
            rendered.push_str(" -> ");
            rendered.push_str(&self.source_text(returns.span()));
        }
        rendered
    }

    fn render_param(&self, param: &Param) -> String {
        let prefix = match param.kind {
            ParamKind::VarArgs => "*",
            ParamKind::KwArgs => "**",
            _ => "",
        };
        let mut rendered = format!("{}{}", prefix, param.name.name);
        match (&param.annotation, &param.default) {
            (Some(annotation), Some(_)) => {
                rendered.push_str(&format!(": {} = …", self.source_text(annotation.span())));
            }
            (Some(annotation), None) => {
                rendered.push_str(&format!(": {}", self.source_text(annotation.span())));
            }
            (None, Some(_)) => rendered.push_str("=…"),
            (None, None) => {}
        }
        rendered
    }

    /// `class Name(Base, metaclass=Meta)`
    fn render_class(&self, class: &ClassDef) -> String {
        let mut args: Vec<String> = class
            .bases
            .iter()
            .map(|base| self.source_text(base.span()))
            .collect();
        args.extend(class.keywords.iter().map(|kw| self.source_text(kw.span)));

        if args.is_empty() {
            format!("class {}", class.name.name)
        } else {
            format!("class {}({})", class.name.name, args.join(", "))
        }
    }
}
