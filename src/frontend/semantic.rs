//! Semantic Analysis for C99
//!
//! Performs:
//! - Scope and symbol management
//! - Resolution of declared types, struct/union layout and enum constants
//! - Statement checks: control flow context, switch/case, return, labels
//! - Expression typing (see `semantic_expr`)
//!
//! Errors are recorded per declaration or statement and analysis goes on
//! with the next one.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::diagnostics::Diagnostic;
use crate::frontend::ast::*;
use crate::frontend::symbols::{Symbol, SymbolKind, SymbolTable, Tag};
use crate::stdlib::BuiltinRegistry;
use crate::types::{compatible, CType, FloatKind, FunctionType, IntRank, RecordId, TypeKind, TypeRegistry};
use crate::utils::{Error, Result, Span};

// ==================== Configuration ====================

/// Analyzer options
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Warn about local variables that are never read
    pub warn_unused: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { warn_unused: true }
    }
}

// ==================== Analysis Results ====================

/// A call to a standard-library built-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinCall {
    pub name: String,
    pub id: u16,
    pub span: Span,
}

/// Per-function result: parameters, locals and labels with resolved types
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub ty: CType,
    pub locals: Vec<Symbol>,
    /// Type of every `return` expression, in source order
    pub return_types: Vec<CType>,
}

/// Everything code generation needs from a checked translation unit
#[derive(Debug)]
pub struct Analysis {
    pub globals: Vec<Symbol>,
    pub functions: Vec<FunctionInfo>,
    pub builtin_calls: Vec<BuiltinCall>,
    pub registry: TypeRegistry,
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl Analysis {
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }

    pub fn global(&self, name: &str) -> Option<&Symbol> {
        self.globals.iter().find(|s| s.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// ==================== Analyzer State ====================

/// Which jump statements are legal at the current point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowContext {
    pub in_loop: bool,
    pub in_switch: bool,
}

/// One enclosing switch statement
struct SwitchFrame {
    /// Promoted type of the controlling expression
    ty: CType,
    has_default: bool,
    values: HashSet<i64>,
}

/// State of the function body being checked
struct FunctionContext {
    name: String,
    ret: CType,
    labels: HashMap<String, Symbol>,
    gotos: Vec<Ident>,
    locals: Vec<Symbol>,
    return_types: Vec<CType>,
}

impl FunctionContext {
    fn new(name: &str, ret: CType) -> Self {
        Self {
            name: name.to_string(),
            ret,
            labels: HashMap::new(),
            gotos: Vec::new(),
            locals: Vec::new(),
            return_types: Vec::new(),
        }
    }
}

// ==================== Semantic Analyzer ====================

/// Semantic analyzer
pub struct SemanticAnalyzer {
    config: AnalyzerConfig,
    pub(super) symbols: SymbolTable,
    pub(super) registry: TypeRegistry,
    pub(super) builtins: BuiltinRegistry,
    pub(super) builtin_calls: Vec<BuiltinCall>,
    /// Record definitions already processed, keyed by source offset.
    /// `struct S {..} a, b;` hands the same specifier to every declarator.
    defined_records: HashMap<usize, RecordId>,
    defined_enums: HashSet<usize>,
    initialized_globals: HashSet<String>,
    flow: FlowContext,
    switch_stack: Vec<SwitchFrame>,
    function: Option<FunctionContext>,
    functions: Vec<FunctionInfo>,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    last_message: Option<String>,
}

impl SemanticAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            registry: TypeRegistry::new(),
            builtins: BuiltinRegistry::new(),
            builtin_calls: Vec::new(),
            defined_records: HashMap::new(),
            defined_enums: HashSet::new(),
            initialized_globals: HashSet::new(),
            flow: FlowContext::default(),
            switch_stack: Vec::new(),
            function: None,
            functions: Vec::new(),
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            last_message: None,
        }
    }

    /// Analyze a translation unit. Succeeds only when no error was recorded.
    pub fn analyze(&mut self, unit: &TranslationUnit) -> Result<()> {
        debug!("semantic analysis of {} declarations", unit.decls.len());

        for decl in &unit.decls {
            if let Err(err) = self.check_declaration(decl) {
                self.report(err);
            }
        }

        debug!(
            "semantic analysis done: {} error(s), {} warning(s)",
            self.error_count, self.warning_count
        );
        if self.error_count == 0 {
            Ok(())
        } else {
            Err(Error::AnalysisFailed {
                errors: self.error_count,
                warnings: self.warning_count,
                message: self.last_message.clone().unwrap_or_default(),
            })
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Text of the most recent error
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn builtin_calls(&self) -> &[BuiltinCall] {
        &self.builtin_calls
    }

    pub fn into_analysis(self) -> Analysis {
        Analysis {
            globals: self.symbols.globals().to_vec(),
            functions: self.functions,
            builtin_calls: self.builtin_calls,
            registry: self.registry,
            diagnostics: self.diagnostics,
            error_count: self.error_count,
            warning_count: self.warning_count,
        }
    }

    pub(super) fn report(&mut self, err: Error) {
        debug!("{}", err.render());
        self.error_count += 1;
        self.last_message = Some(err.to_string());
        self.diagnostics.push(Diagnostic::from_error(&err));
    }

    pub(super) fn warn(&mut self, message: String, span: Span) {
        self.warning_count += 1;
        self.diagnostics.push(Diagnostic::warning(message, span));
    }

    pub(super) fn type_name(&self, ty: &CType) -> String {
        self.registry.type_name(ty)
    }

    // ==================== Scopes ====================

    /// Run `f` in a fresh scope; the scope is closed even when `f` fails
    pub(super) fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.symbols.enter_scope();
        let result = f(self);
        self.leave_scope();
        result
    }

    fn leave_scope(&mut self) {
        let scope = match self.symbols.exit_scope() {
            Some(scope) => scope,
            None => return,
        };
        let symbols = scope.into_symbols();

        if self.config.warn_unused {
            for symbol in &symbols {
                if symbol.kind == SymbolKind::Variable && !symbol.is_parameter && !symbol.is_used {
                    self.warn(format!("unused variable '{}'", symbol.name), symbol.span);
                }
            }
        }
        if let Some(ctx) = self.function.as_mut() {
            ctx.locals.extend(symbols);
        }
    }

    /// Run `f` with a different flow context, restoring the old one after
    fn with_flow<T>(&mut self, flow: FlowContext, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.flow, flow);
        let result = f(self);
        self.flow = saved;
        result
    }

    // ==================== Declarations ====================

    fn check_declaration(&mut self, decl: &Declaration) -> Result<()> {
        match decl {
            Declaration::Variable(var) => self.declare_variable(var),
            Declaration::Function(func) if func.is_definition() => self.check_function_definition(func),
            Declaration::Function(func) => {
                let ty = self.resolve_type(&func.ty)?;
                self.declare_function(&func.name, ty, func.storage, false)
            }
            Declaration::Record(spec) => match (&spec.tag, &spec.members) {
                // `struct S;` always introduces S in the current scope
                (Some(tag), None) if self.symbols.lookup_tag_local(&tag.name).is_none() => {
                    let id = self.registry.declare(spec.kind, Some(tag.name.clone()));
                    self.symbols.declare_tag(&tag.name, Tag::Record(id), tag.span)
                }
                _ => self.resolve_record(spec).map(|_| ()),
            },
            Declaration::Enum(spec) => self.resolve_enum(spec),
            Declaration::Typedef(def) => {
                let ty = self.resolve_type(&def.ty)?;
                debug!("typedef '{}' = {}", def.name.name, self.type_name(&ty));
                self.symbols.declare(
                    Symbol::new(&def.name.name, SymbolKind::Type, ty, def.name.span)
                        .with_storage(Some(StorageClass::Typedef))
                        .defined(true),
                )
            }
        }
    }

    fn declare_variable(&mut self, var: &VarDecl) -> Result<()> {
        let name = &var.name;
        let mut ty = self.resolve_type(&var.ty)?;

        // `fn_t f;` where fn_t names a function type
        if ty.is_function() {
            if var.init.is_some() {
                return Err(Error::InvalidInitializer {
                    reason: format!("function '{}' is initialized like a variable", name.name),
                    span: var.span,
                });
            }
            return self.declare_function(name, ty, var.storage, false);
        }
        if ty.is_void() {
            return Err(Error::VoidVariable {
                name: name.name.clone(),
                span: name.span,
            });
        }

        let at_file_scope = self.symbols.level() == 0;
        if at_file_scope {
            if let Some(storage @ (StorageClass::Auto | StorageClass::Register)) = var.storage {
                return Err(Error::InvalidDeclaration {
                    message: format!("storage class '{:?}' at file scope", storage).to_lowercase(),
                    span: var.span,
                });
            }
        }

        let is_extern = var.storage == Some(StorageClass::Extern);
        if let Some(init) = &var.init {
            if is_extern && !at_file_scope {
                return Err(Error::InvalidInitializer {
                    reason: format!("'extern' variable '{}' has an initializer", name.name),
                    span: init.span(),
                });
            }
            ty = self.check_initializer(&ty, init)?;
        }

        let unsized_array = matches!(ty.kind, TypeKind::Array { len: None, vla: false, .. });
        if !is_extern && ((unsized_array && !at_file_scope) || !self.registry.is_complete(&ty)) {
            return Err(Error::IncompleteType {
                ty: self.type_name(&ty),
                span: name.span,
            });
        }

        let defined = var.init.is_some() || !is_extern;
        debug!("variable '{}': {}", name.name, self.type_name(&ty));

        // File-scope redeclarations merge (tentative definitions, extern)
        if at_file_scope {
            if let Some(existing) = self.symbols.lookup_local_mut(&name.name) {
                if existing.kind != SymbolKind::Variable {
                    return Err(Error::Redeclaration {
                        name: name.name.clone(),
                        span: name.span,
                    });
                }
                if !compatible(&existing.ty, &ty) {
                    return Err(Error::ConflictingTypes {
                        name: name.name.clone(),
                        span: name.span,
                    });
                }
                if var.init.is_some() && !self.initialized_globals.insert(name.name.clone()) {
                    return Err(Error::Redefinition {
                        name: name.name.clone(),
                        span: name.span,
                    });
                }
                if matches!(existing.ty.kind, TypeKind::Array { len: None, .. }) {
                    existing.ty = ty;
                }
                existing.is_defined |= defined;
                return Ok(());
            }
            if var.init.is_some() {
                self.initialized_globals.insert(name.name.clone());
            }
        }

        self.symbols.declare(
            Symbol::new(&name.name, SymbolKind::Variable, ty, name.span)
                .with_storage(var.storage)
                .defined(defined),
        )
    }

    /// Declare or complete a function. Compatible redeclarations update the
    /// existing symbol; a second body is an error.
    fn declare_function(
        &mut self,
        name: &Ident,
        ty: CType,
        storage: Option<StorageClass>,
        has_body: bool,
    ) -> Result<()> {
        if let Some(existing) = self.symbols.lookup_local_mut(&name.name) {
            if existing.kind != SymbolKind::Function {
                return Err(Error::Redeclaration {
                    name: name.name.clone(),
                    span: name.span,
                });
            }
            if !compatible(&existing.ty, &ty) {
                return Err(Error::ConflictingTypes {
                    name: name.name.clone(),
                    span: name.span,
                });
            }
            if existing.is_defined && has_body {
                return Err(Error::Redefinition {
                    name: name.name.clone(),
                    span: name.span,
                });
            }
            if ty.as_function().map_or(false, |f| f.prototyped) {
                existing.ty = ty;
            }
            existing.is_defined |= has_body;
            return Ok(());
        }

        self.symbols.declare(
            Symbol::new(&name.name, SymbolKind::Function, ty, name.span)
                .with_storage(storage)
                .defined(has_body),
        )
    }

    fn check_function_definition(&mut self, func: &FunctionDecl) -> Result<()> {
        let name = func.name.name.as_str();
        let ty = self.resolve_type(&func.ty)?;
        let signature: FunctionType = match ty.as_function() {
            Some(signature) => signature.clone(),
            None => {
                return Err(Error::TypeMismatch {
                    expected: "function type".to_string(),
                    got: self.type_name(&ty),
                    span: func.name.span,
                })
            }
        };

        for param in func.params() {
            if param.name.is_none() {
                return Err(Error::UnnamedParameter {
                    function: name.to_string(),
                    span: param.span,
                });
            }
        }
        let ret = (*signature.ret).clone();
        if !ret.is_void() && !self.registry.is_complete(&ret) {
            return Err(Error::IncompleteType {
                ty: self.type_name(&ret),
                span: func.ty.span,
            });
        }

        self.declare_function(&func.name, ty.clone(), func.storage, true)?;
        let body = match &func.body {
            Some(body) => body,
            None => return Ok(()),
        };
        debug!("checking function '{}'", name);

        self.function = Some(FunctionContext::new(name, ret));
        self.flow = FlowContext::default();
        self.switch_stack.clear();

        // Parameter scope; the body block opens its own scope inside it
        let params = func.params();
        let result = self.in_scope(|this| {
            for (param, param_ty) in params.iter().zip(&signature.params) {
                if let Some(ident) = &param.name {
                    this.symbols.declare(
                        Symbol::new(&ident.name, SymbolKind::Variable, param_ty.clone(), ident.span).parameter(),
                    )?;
                }
            }
            this.check_block(body)
        });
        if let Err(err) = result {
            self.report(err);
        }

        self.finish_function(ty);
        Ok(())
    }

    /// Resolve gotos against the function's labels and store its info
    fn finish_function(&mut self, ty: CType) {
        let ctx = match self.function.take() {
            Some(ctx) => ctx,
            None => return,
        };
        let FunctionContext {
            name,
            mut labels,
            gotos,
            mut locals,
            return_types,
            ..
        } = ctx;

        for goto in gotos {
            match labels.get_mut(&goto.name) {
                Some(label) => label.is_used = true,
                None => self.report(Error::UndefinedLabel {
                    name: goto.name,
                    span: goto.span,
                }),
            }
        }

        let mut labels: Vec<Symbol> = labels.into_values().collect();
        labels.sort_by_key(|label| label.span.start);
        locals.extend(labels);

        debug!("function '{}': {} local symbol(s)", name, locals.len());
        self.functions.push(FunctionInfo {
            name,
            ty,
            locals,
            return_types,
        });
    }

    // ==================== Types ====================

    /// Resolve a syntactic type to a `CType`
    pub(super) fn resolve_type(&mut self, ty: &TypeExpr) -> Result<CType> {
        let resolved = match &ty.kind {
            TypeExprKind::Base(base) => base_type(*base),
            TypeExprKind::Record(spec) => CType::new(TypeKind::Record(self.resolve_record(spec)?)),
            TypeExprKind::Enum(spec) => {
                self.resolve_enum(spec)?;
                CType::int()
            }
            TypeExprKind::Typedef(name) => match self.symbols.lookup(name) {
                Some(symbol) if symbol.kind == SymbolKind::Type => symbol.ty.clone(),
                _ => {
                    return Err(Error::UnknownTypeName {
                        name: name.clone(),
                        span: ty.span,
                    })
                }
            },
            TypeExprKind::Pointer(inner) => CType::pointer_to(self.resolve_type(inner)?),
            TypeExprKind::Array { elem, size, vla } => self.resolve_array(elem, size.as_deref(), *vla)?,
            TypeExprKind::Function {
                ret,
                params,
                variadic,
                prototyped,
            } => {
                let ret = self.resolve_type(ret)?;
                if ret.is_array() || ret.is_function() {
                    return Err(Error::InvalidDeclaration {
                        message: format!("function cannot return '{}'", self.type_name(&ret)),
                        span: ty.span,
                    });
                }
                let mut resolved = Vec::with_capacity(params.len());
                for param in params {
                    resolved.push(self.resolve_param_type(param)?);
                }
                CType::new(TypeKind::Function(FunctionType {
                    ret: Box::new(ret),
                    params: resolved,
                    variadic: *variadic,
                    prototyped: *prototyped,
                }))
            }
        };
        Ok(resolved.with_quals(ty.quals))
    }

    fn resolve_array(&mut self, elem: &TypeExpr, size: Option<&Expr>, vla: bool) -> Result<CType> {
        let span = elem.span;
        let elem = self.resolve_type(elem)?;
        if elem.is_function() || !self.registry.is_complete(&elem) {
            return Err(Error::IncompleteType {
                ty: self.type_name(&elem),
                span,
            });
        }

        let (len, vla) = match size {
            None => (None, vla),
            Some(size) => match self.eval_const(size) {
                Ok(n) if n < 0 => {
                    return Err(Error::InvalidArraySize {
                        reason: format!("size {} is negative", n),
                        span: size.span(),
                    })
                }
                Ok(n) => (Some(n as u64), false),
                // Enum constants fold above; anything else is a runtime length
                Err(_) if vla => {
                    if self.symbols.level() == 0 {
                        return Err(Error::InvalidArraySize {
                            reason: "variable length array at file scope".to_string(),
                            span: size.span(),
                        });
                    }
                    let size_ty = self.check_rvalue(size)?;
                    if !size_ty.is_integer() {
                        return Err(Error::InvalidArraySize {
                            reason: format!("size has non-integer type '{}'", self.type_name(&size_ty)),
                            span: size.span(),
                        });
                    }
                    (None, true)
                }
                Err(err) => return Err(err),
            },
        };

        let array = CType::new(TypeKind::Array {
            elem: Box::new(elem),
            len,
            vla,
        });
        // The element is complete, so a missing size means the byte count overflowed
        if len.is_some() && self.registry.size_of(&array).is_none() {
            return Err(Error::InvalidArraySize {
                reason: "array is too large".to_string(),
                span: size.map_or(span, |size| size.span()),
            });
        }
        Ok(array)
    }

    /// Parameter types are adjusted: arrays and functions become pointers.
    /// Array sizes in parameters are not evaluated.
    fn resolve_param_type(&mut self, param: &Param) -> Result<CType> {
        let ty = match &param.ty.kind {
            TypeExprKind::Array { elem, .. } => CType::pointer_to(self.resolve_type(elem)?).with_quals(param.ty.quals),
            _ => self.resolve_type(&param.ty)?.decay(),
        };
        if ty.is_void() {
            return Err(Error::VoidVariable {
                name: param
                    .name
                    .as_ref()
                    .map_or_else(|| "<unnamed>".to_string(), |n| n.name.clone()),
                span: param.span,
            });
        }
        Ok(ty)
    }

    /// Resolve a struct/union specifier, defining it when it has a body
    fn resolve_record(&mut self, spec: &RecordSpec) -> Result<RecordId> {
        let members = match &spec.members {
            Some(members) => members,
            None => return self.record_reference(spec),
        };
        if let Some(&id) = self.defined_records.get(&spec.span.start) {
            return Ok(id);
        }

        let id = match &spec.tag {
            Some(tag) => match self.symbols.lookup_tag_local(&tag.name) {
                // Completes a forward declaration of the same kind
                Some(Tag::Record(id)) if self.record_is_open(id, spec.kind) => id,
                Some(_) => {
                    return Err(Error::Redefinition {
                        name: format!("{} {}", spec.kind.keyword(), tag.name),
                        span: tag.span,
                    })
                }
                None => {
                    let id = self.registry.declare(spec.kind, Some(tag.name.clone()));
                    self.symbols.declare_tag(&tag.name, Tag::Record(id), tag.span)?;
                    id
                }
            },
            None => self.registry.declare(spec.kind, None),
        };
        self.defined_records.insert(spec.span.start, id);

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            if !seen.insert(member.name.name.as_str()) {
                return Err(Error::DuplicateMember {
                    member: member.name.name.clone(),
                    span: member.name.span,
                });
            }
            let ty = self.resolve_type(&member.ty)?;
            // A trailing `T name[]` is a flexible array member
            let is_last = i + 1 == members.len();
            let unsized_array = matches!(ty.kind, TypeKind::Array { len: None, .. });
            if ty.is_function() || !self.registry.is_complete(&ty) || (unsized_array && !is_last) {
                return Err(Error::IncompleteType {
                    ty: self.type_name(&ty),
                    span: member.span,
                });
            }
            fields.push((member.name.name.clone(), ty));
        }

        self.registry
            .complete(id, fields)
            .map_err(|message| Error::InvalidDeclaration {
                message,
                span: spec.span,
            })?;
        let record = CType::new(TypeKind::Record(id));
        debug!(
            "defined {} ({} bytes)",
            self.type_name(&record),
            self.registry.size_of(&record).unwrap_or(0)
        );
        Ok(id)
    }

    fn record_is_open(&self, id: RecordId, kind: RecordKind) -> bool {
        self.registry
            .get(id)
            .map_or(false, |def| def.kind == kind && !def.is_complete())
    }

    /// `struct S` without a body: find the tag, or forward-declare it here
    fn record_reference(&mut self, spec: &RecordSpec) -> Result<RecordId> {
        let tag = match &spec.tag {
            Some(tag) => tag,
            None => return Ok(self.registry.declare(spec.kind, None)),
        };
        let conflict = || Error::ConflictingTypes {
            name: format!("{} {}", spec.kind.keyword(), tag.name),
            span: tag.span,
        };

        match self.symbols.lookup_tag(&tag.name) {
            Some(Tag::Record(id)) => match self.registry.get(id) {
                Some(def) if def.kind != spec.kind => Err(conflict()),
                _ => Ok(id),
            },
            Some(Tag::Enum) => Err(conflict()),
            None => {
                let id = self.registry.declare(spec.kind, Some(tag.name.clone()));
                self.symbols.declare_tag(&tag.name, Tag::Record(id), tag.span)?;
                Ok(id)
            }
        }
    }

    /// Resolve an enum specifier, declaring its enumerators as `int` constants
    fn resolve_enum(&mut self, spec: &EnumSpec) -> Result<()> {
        let enumerators = match &spec.enumerators {
            Some(enumerators) => enumerators,
            None => {
                let tag = match &spec.tag {
                    Some(tag) => tag,
                    None => return Ok(()),
                };
                return match self.symbols.lookup_tag(&tag.name) {
                    Some(Tag::Enum) => Ok(()),
                    Some(Tag::Record(_)) => Err(Error::ConflictingTypes {
                        name: format!("enum {}", tag.name),
                        span: tag.span,
                    }),
                    None => Err(Error::IncompleteType {
                        ty: format!("enum {}", tag.name),
                        span: tag.span,
                    }),
                };
            }
        };
        if !self.defined_enums.insert(spec.span.start) {
            return Ok(());
        }

        if let Some(tag) = &spec.tag {
            if self.symbols.lookup_tag_local(&tag.name).is_some() {
                return Err(Error::Redefinition {
                    name: format!("enum {}", tag.name),
                    span: tag.span,
                });
            }
            self.symbols.declare_tag(&tag.name, Tag::Enum, tag.span)?;
        }

        let mut next = 0i64;
        for enumerator in enumerators {
            let value = match &enumerator.value {
                Some(expr) => self.eval_const(expr)?,
                None => next,
            };
            self.symbols.declare(
                Symbol::new(
                    &enumerator.name.name,
                    SymbolKind::EnumConstant(value),
                    CType::int(),
                    enumerator.name.span,
                )
                .defined(true),
            )?;
            next = value.wrapping_add(1);
        }
        debug!("enum with {} enumerator(s)", enumerators.len());
        Ok(())
    }

    // ==================== Initializers ====================

    /// Check an initializer against the declared type. Returns the type
    /// with an unknown array length filled in.
    fn check_initializer(&mut self, ty: &CType, init: &Initializer) -> Result<CType> {
        if let TypeKind::Array { vla: true, .. } = ty.kind {
            return Err(Error::InvalidInitializer {
                reason: "variable-sized object may not be initialized".to_string(),
                span: init.span(),
            });
        }

        match init {
            Initializer::Expr(expr) => match &ty.kind {
                TypeKind::Array { elem, len, .. } => match expr {
                    Expr::Literal(Literal::String(text, span)) if is_char_type(elem) => {
                        let chars = text.chars().count() as u64;
                        match len {
                            Some(n) if chars > *n => Err(Error::InvalidInitializer {
                                reason: "initializer-string for array is too long".to_string(),
                                span: *span,
                            }),
                            Some(_) => Ok(ty.clone()),
                            None => Ok(CType::array_of((**elem).clone(), Some(chars + 1)).with_quals(ty.quals)),
                        }
                    }
                    _ => Err(Error::InvalidInitializer {
                        reason: "array must be initialized with a brace list".to_string(),
                        span: expr.span(),
                    }),
                },
                _ => {
                    self.check_conversion(ty, expr)?;
                    Ok(ty.clone())
                }
            },

            Initializer::List { items, span } => match &ty.kind {
                TypeKind::Array { elem, len, .. } => {
                    // char s[] = { "text" }
                    if let [Initializer::Expr(expr @ Expr::Literal(Literal::String(..)))] = items.as_slice() {
                        if is_char_type(elem) {
                            return self.check_initializer(ty, &Initializer::Expr(expr.clone()));
                        }
                    }
                    if let Some(n) = len {
                        if items.len() as u64 > *n {
                            return Err(excess_elements("array", *span));
                        }
                    }
                    for item in items {
                        self.check_initializer(elem, item)?;
                    }
                    Ok(match len {
                        Some(_) => ty.clone(),
                        None => CType::array_of((**elem).clone(), Some(items.len() as u64)).with_quals(ty.quals),
                    })
                }
                TypeKind::Record(id) => {
                    let (kind, fields) = match self.registry.get(*id) {
                        Some(def) if def.is_complete() => {
                            (def.kind, def.fields.clone().unwrap_or_default())
                        }
                        _ => {
                            return Err(Error::IncompleteType {
                                ty: self.type_name(ty),
                                span: *span,
                            })
                        }
                    };
                    // A union is initialized through its first member
                    let limit = match kind {
                        RecordKind::Struct => fields.len(),
                        RecordKind::Union => fields.len().min(1),
                    };
                    if items.len() > limit {
                        return Err(excess_elements(kind.keyword(), *span));
                    }
                    for (field, item) in fields.iter().zip(items) {
                        self.check_initializer(&field.ty, item)?;
                    }
                    Ok(ty.clone())
                }
                _ => match items.as_slice() {
                    [item] => self.check_initializer(ty, item),
                    [] => Err(Error::InvalidInitializer {
                        reason: "empty scalar initializer".to_string(),
                        span: *span,
                    }),
                    _ => Err(excess_elements("scalar", *span)),
                },
            },
        }
    }

    // ==================== Statements ====================

    /// Check a compound statement in its own scope. Each failing statement
    /// records one error.
    fn check_block(&mut self, block: &Block) -> Result<()> {
        self.in_scope(|this| {
            for stmt in &block.stmts {
                if let Err(err) = this.check_stmt(stmt) {
                    this.report(err);
                }
            }
            Ok(())
        })
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Compound(block) => self.check_block(block),
            Stmt::Decl { decls, .. } => {
                for decl in decls {
                    if let Err(err) = self.check_declaration(decl) {
                        self.report(err);
                    }
                }
                Ok(())
            }
            Stmt::Expr { expr, .. } => self.check_expr(expr).map(|_| ()),
            Stmt::Empty { .. } => Ok(()),

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_condition(cond)?;
                self.check_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                self.check_condition(cond)?;
                self.check_loop_body(body)
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.check_loop_body(body)?;
                self.check_condition(cond)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => self.in_scope(|this| {
                match init {
                    Some(ForInit::Decl(decls)) => {
                        for decl in decls {
                            this.check_declaration(decl)?;
                        }
                    }
                    Some(ForInit::Expr(expr)) => {
                        this.check_expr(expr)?;
                    }
                    None => {}
                }
                if let Some(cond) = cond {
                    this.check_condition(cond)?;
                }
                if let Some(step) = step {
                    this.check_expr(step)?;
                }
                this.check_loop_body(body)
            }),

            Stmt::Switch { expr, body, .. } => self.check_switch(expr, body),
            Stmt::Case { value, body, span } => {
                self.check_case(value, *span)?;
                self.check_stmt(body)
            }
            Stmt::Default { body, span } => {
                match self.switch_stack.last_mut() {
                    None => return Err(Error::DefaultOutsideSwitch { span: *span }),
                    Some(frame) if frame.has_default => return Err(Error::DuplicateDefault { span: *span }),
                    Some(frame) => frame.has_default = true,
                }
                self.check_stmt(body)
            }

            Stmt::Break { span } => {
                if self.flow.in_loop || self.flow.in_switch {
                    Ok(())
                } else {
                    Err(Error::BreakOutsideLoop { span: *span })
                }
            }
            Stmt::Continue { span } => {
                if self.flow.in_loop {
                    Ok(())
                } else {
                    Err(Error::ContinueOutsideLoop { span: *span })
                }
            }
            Stmt::Return { value, span } => self.check_return(value.as_ref(), *span),

            Stmt::Goto { label, .. } => {
                if label.name.is_empty() {
                    return Err(Error::EmptyLabel { span: label.span });
                }
                if let Some(ctx) = self.function.as_mut() {
                    ctx.gotos.push(label.clone());
                }
                Ok(())
            }
            Stmt::Labeled { label, body, .. } => {
                self.define_label(label)?;
                self.check_stmt(body)
            }
        }
    }

    pub(super) fn check_condition(&mut self, cond: &Expr) -> Result<()> {
        let ty = self.check_rvalue(cond)?;
        if ty.is_scalar() {
            Ok(())
        } else {
            Err(Error::NonScalarCondition {
                ty: self.type_name(&ty),
                span: cond.span(),
            })
        }
    }

    fn check_loop_body(&mut self, body: &Stmt) -> Result<()> {
        let flow = FlowContext {
            in_loop: true,
            ..self.flow
        };
        self.with_flow(flow, |this| this.check_stmt(body))
    }

    fn check_switch(&mut self, expr: &Expr, body: &Stmt) -> Result<()> {
        let ty = self.check_rvalue(expr)?;
        if !ty.is_integer() {
            return Err(Error::NonIntegerSwitch {
                ty: self.type_name(&ty),
                span: expr.span(),
            });
        }

        self.switch_stack.push(SwitchFrame {
            ty: ty.promote(),
            has_default: false,
            values: HashSet::new(),
        });
        let flow = FlowContext {
            in_switch: true,
            ..self.flow
        };
        let result = self.with_flow(flow, |this| this.check_stmt(body));
        self.switch_stack.pop();
        result
    }

    fn check_case(&mut self, value: &Expr, span: Span) -> Result<()> {
        let switch_ty = match self.switch_stack.last() {
            Some(frame) => frame.ty.clone(),
            None => return Err(Error::CaseOutsideSwitch { span }),
        };

        let value_ty = self.check_rvalue(value)?;
        if !value_ty.is_integer() {
            return Err(Error::NotIntegerConstant { span: value.span() });
        }
        let constant = self.eval_const(value)?;

        if value_ty.promote() != switch_ty {
            self.warn(
                format!(
                    "case value of type '{}' does not match switch type '{}'",
                    self.type_name(&value_ty),
                    self.type_name(&switch_ty)
                ),
                value.span(),
            );
        }
        if let Some(frame) = self.switch_stack.last_mut() {
            if !frame.values.insert(constant) {
                return Err(Error::DuplicateCase { value: constant, span });
            }
        }
        Ok(())
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) -> Result<()> {
        let (function, ret) = match &self.function {
            Some(ctx) => (ctx.name.clone(), ctx.ret.clone()),
            None => return Ok(()),
        };

        let returned = match value {
            Some(expr) if ret.is_void() => {
                self.check_expr(expr)?;
                return Err(Error::ReturnValueInVoid { function, span });
            }
            Some(expr) => self.check_conversion(&ret, expr)?,
            None if ret.is_void() => CType::void(),
            None => {
                return Err(Error::MissingReturnValue {
                    function,
                    ty: self.type_name(&ret),
                    span,
                })
            }
        };
        if let Some(ctx) = self.function.as_mut() {
            ctx.return_types.push(returned);
        }
        Ok(())
    }

    /// Labels are function-scoped
    fn define_label(&mut self, label: &Ident) -> Result<()> {
        if label.name.is_empty() {
            return Err(Error::EmptyLabel { span: label.span });
        }
        let ctx = match self.function.as_mut() {
            Some(ctx) => ctx,
            None => return Ok(()),
        };
        if ctx.labels.contains_key(&label.name) {
            return Err(Error::DuplicateLabel {
                name: label.name.clone(),
                span: label.span,
            });
        }
        ctx.labels.insert(
            label.name.clone(),
            Symbol::new(&label.name, SymbolKind::Label, CType::void(), label.span).defined(true),
        );
        Ok(())
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

fn base_type(base: BaseType) -> CType {
    match base {
        BaseType::Void => CType::void(),
        BaseType::Bool => CType::bool(),
        BaseType::Char | BaseType::SChar => CType::char(),
        BaseType::UChar => CType::integer(IntRank::Char, false),
        BaseType::Short => CType::integer(IntRank::Short, true),
        BaseType::UShort => CType::integer(IntRank::Short, false),
        BaseType::Int => CType::int(),
        BaseType::UInt => CType::uint(),
        BaseType::Long => CType::long(),
        BaseType::ULong => CType::ulong(),
        BaseType::LongLong => CType::integer(IntRank::LongLong, true),
        BaseType::ULongLong => CType::integer(IntRank::LongLong, false),
        BaseType::Float => CType::float(),
        BaseType::Double => CType::double(),
        BaseType::LongDouble => CType::new(TypeKind::Float(FloatKind::LongDouble)),
    }
}

fn is_char_type(ty: &CType) -> bool {
    matches!(ty.kind, TypeKind::Int { rank: IntRank::Char, .. })
}

fn excess_elements(what: &str, span: Span) -> Error {
    Error::InvalidInitializer {
        reason: format!("excess elements in {} initializer", what),
        span,
    }
}
