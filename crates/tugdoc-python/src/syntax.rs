// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree handed to the model builder by the external parser.
//!
//! The tree is a reduced Python AST: only the statement and expression shapes
//! the builder reacts to are modelled precisely, and everything else is folded
//! into `Other` variants that keep a line number (statements) or rendered
//! source text (expressions). Every statement carries the source line it
//! starts on.
//!
//! The tree is serde-(de)serializable with an internal `"type"` tag so a
//! parser running out of process can hand it over as JSON:
//!
//! ```json
//! { "type": "assign",
//!   "targets": [{ "type": "name", "id": "X" }],
//!   "value": { "type": "constant", "value": { "kind": "int", "value": 1 } },
//!   "line": 3 }
//! ```
//!
//! Tests construct trees with the builder helpers at the bottom of this file.

use serde::{Deserialize, Serialize};

// ============================================================================
// Module
// ============================================================================

/// The top-level block of one source module.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new(body: Vec<Stmt>) -> Self {
        Module { body }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stmt {
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        #[serde(default)]
        type_comment: Option<String>,
        line: u32,
    },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        #[serde(default)]
        value: Option<Expr>,
        line: u32,
    },
    AugAssign {
        target: Expr,
        op: BinOpKind,
        value: Expr,
        line: u32,
    },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Import {
        names: Vec<ImportAlias>,
        line: u32,
    },
    ImportFrom {
        #[serde(default)]
        module: Option<String>,
        names: Vec<ImportAlias>,
        #[serde(default)]
        level: u32,
        line: u32,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        line: u32,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        line: u32,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(default)]
        is_async: bool,
        line: u32,
    },
    Try {
        body: Vec<Stmt>,
        #[serde(default)]
        handlers: Vec<ExceptHandler>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        #[serde(default)]
        finalbody: Vec<Stmt>,
        line: u32,
    },
    With {
        #[serde(default)]
        items: Vec<Expr>,
        body: Vec<Stmt>,
        #[serde(default)]
        is_async: bool,
        line: u32,
    },
    Match {
        subject: Expr,
        cases: Vec<MatchCase>,
        line: u32,
    },
    Expr {
        value: Expr,
        line: u32,
    },
    Pass {
        line: u32,
    },
    /// Any statement the builder has no handler for (`return`, `del`, ...).
    Other {
        line: u32,
    },
}

impl Stmt {
    /// Source line the statement starts on.
    pub fn line(&self) -> u32 {
        match self {
            Stmt::FunctionDef(def) => def.line,
            Stmt::ClassDef(def) => def.line,
            Stmt::Assign { line, .. }
            | Stmt::AnnAssign { line, .. }
            | Stmt::AugAssign { line, .. }
            | Stmt::Import { line, .. }
            | Stmt::ImportFrom { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::For { line, .. }
            | Stmt::Try { line, .. }
            | Stmt::With { line, .. }
            | Stmt::Match { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::Pass { line }
            | Stmt::Other { line } => *line,
        }
    }

    /// The string literal of a bare string-expression statement.
    pub fn as_docstring(&self) -> Option<&str> {
        match self {
            Stmt::Expr { value, .. } => value.as_str(),
            _ => None,
        }
    }
}

/// A `def` or `async def` statement.
///
/// `line` is the line of the first decorator when the function is decorated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub decorators: Vec<Expr>,
    #[serde(default)]
    pub args: Arguments,
    #[serde(default)]
    pub returns: Option<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// A `class` statement.
///
/// `line` is the line of the first decorator when the class is decorated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<Expr>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub decorators: Vec<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// Parameters of a function definition, grouped the way Python's grammar
/// groups them.
///
/// `defaults` align with the *end* of `posonlyargs + args`; `kw_defaults` is
/// parallel to `kwonlyargs`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub posonlyargs: Vec<Arg>,
    #[serde(default)]
    pub args: Vec<Arg>,
    #[serde(default)]
    pub vararg: Option<Arg>,
    #[serde(default)]
    pub kwonlyargs: Vec<Arg>,
    #[serde(default)]
    pub kw_defaults: Vec<Option<Expr>>,
    #[serde(default)]
    pub kwarg: Option<Arg>,
    #[serde(default)]
    pub defaults: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportAlias {
    pub name: String,
    #[serde(default)]
    pub asname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptHandler {
    #[serde(default)]
    pub exc_type: Option<Expr>,
    #[serde(default)]
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCase {
    /// Rendered pattern text; patterns are opaque to the builder.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// `None` for `**kwargs` splats.
    #[serde(default)]
    pub arg: Option<String>,
    pub value: Expr,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Name {
        id: String,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Constant {
        value: Constant,
    },
    List {
        elts: Vec<Expr>,
    },
    Tuple {
        elts: Vec<Expr>,
    },
    Set {
        elts: Vec<Expr>,
    },
    Dict {
        /// `None` keys are `**mapping` splats.
        keys: Vec<Option<Expr>>,
        values: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        keywords: Vec<Keyword>,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
    },
    Slice {
        #[serde(default)]
        lower: Option<Box<Expr>>,
        #[serde(default)]
        upper: Option<Box<Expr>>,
        #[serde(default)]
        step: Option<Box<Expr>>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOpKind,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOpKind>,
        comparators: Vec<Expr>,
    },
    Starred {
        value: Box<Expr>,
    },
    /// Any other expression, kept as rendered source.
    Other {
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(String),
    Ellipsis,
}

impl Constant {
    /// Python type name of the constant's value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::None => "NoneType",
            Constant::Bool(_) => "bool",
            Constant::Int(_) => "int",
            Constant::Float(_) => "float",
            Constant::Str(_) => "str",
            Constant::Bytes(_) => "bytes",
            Constant::Ellipsis => "ellipsis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOpKind {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

impl BinOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mult => "*",
            BinOpKind::MatMult => "@",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Pow => "**",
            BinOpKind::LShift => "<<",
            BinOpKind::RShift => ">>",
            BinOpKind::BitOr => "|",
            BinOpKind::BitXor => "^",
            BinOpKind::BitAnd => "&",
            BinOpKind::FloorDiv => "//",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOpKind {
    Invert,
    Not,
    UAdd,
    USub,
}

impl UnaryOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOpKind::Invert => "~",
            UnaryOpKind::Not => "not ",
            UnaryOpKind::UAdd => "+",
            UnaryOpKind::USub => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOpKind {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOpKind::Eq => "==",
            CmpOpKind::NotEq => "!=",
            CmpOpKind::Lt => "<",
            CmpOpKind::LtE => "<=",
            CmpOpKind::Gt => ">",
            CmpOpKind::GtE => ">=",
            CmpOpKind::Is => "is",
            CmpOpKind::IsNot => "is not",
            CmpOpKind::In => "in",
            CmpOpKind::NotIn => "not in",
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

impl Expr {
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name { id: id.into() }
    }

    pub fn attribute(value: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    /// `"a.b.c"` as nested attribute accesses.
    pub fn dotted(path: &str) -> Self {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        parts.fold(Expr::name(first), Expr::attribute)
    }

    pub fn constant(value: Constant) -> Self {
        Expr::Constant { value }
    }

    pub fn none() -> Self {
        Expr::constant(Constant::None)
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::constant(Constant::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Expr::constant(Constant::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::constant(Constant::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::constant(Constant::Bool(value))
    }

    pub fn list(elts: Vec<Expr>) -> Self {
        Expr::List { elts }
    }

    pub fn tuple(elts: Vec<Expr>) -> Self {
        Expr::Tuple { elts }
    }

    pub fn set(elts: Vec<Expr>) -> Self {
        Expr::Set { elts }
    }

    pub fn dict(items: Vec<(Expr, Expr)>) -> Self {
        let (keys, values) = items.into_iter().map(|(k, v)| (Some(k), v)).unzip();
        Expr::Dict { keys, values }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
            keywords: Vec::new(),
        }
    }

    pub fn subscript(value: Expr, slice: Expr) -> Self {
        Expr::Subscript {
            value: Box::new(value),
            slice: Box::new(slice),
        }
    }

    pub fn bin_op(left: Expr, op: BinOpKind, right: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn compare(left: Expr, op: CmpOpKind, right: Expr) -> Self {
        Expr::Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        }
    }

    /// The value of a string constant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Constant {
                value: Constant::Str(s),
            } => Some(s),
            _ => None,
        }
    }
}

impl Stmt {
    /// `name = value`
    pub fn assign(name: &str, value: Expr, line: u32) -> Self {
        Stmt::assign_to(Expr::name(name), value, line)
    }

    /// `target = value` for an arbitrary target expression.
    pub fn assign_to(target: Expr, value: Expr, line: u32) -> Self {
        Stmt::Assign {
            targets: vec![target],
            value,
            type_comment: None,
            line,
        }
    }

    /// `name: annotation = value`
    pub fn ann_assign(name: &str, annotation: Expr, value: Option<Expr>, line: u32) -> Self {
        Stmt::AnnAssign {
            target: Expr::name(name),
            annotation,
            value,
            line,
        }
    }

    /// `name op= value`
    pub fn aug_assign(name: &str, op: BinOpKind, value: Expr, line: u32) -> Self {
        Stmt::AugAssign {
            target: Expr::name(name),
            op,
            value,
            line,
        }
    }

    /// A bare string-expression statement.
    pub fn docstring(text: &str, line: u32) -> Self {
        Stmt::Expr {
            value: Expr::str(text),
            line,
        }
    }

    /// `import a.b, c as d` from `(name, asname)` pairs.
    pub fn import(names: &[(&str, Option<&str>)], line: u32) -> Self {
        Stmt::Import {
            names: import_aliases(names),
            line,
        }
    }

    /// `from .module import names` with the given relative `level`.
    pub fn import_from(
        module: Option<&str>,
        names: &[(&str, Option<&str>)],
        level: u32,
        line: u32,
    ) -> Self {
        Stmt::ImportFrom {
            module: module.map(str::to_string),
            names: import_aliases(names),
            level,
            line,
        }
    }

    pub fn if_(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, line: u32) -> Self {
        Stmt::If {
            test,
            body,
            orelse,
            line,
        }
    }

    pub fn try_(
        body: Vec<Stmt>,
        handlers: Vec<Vec<Stmt>>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
        line: u32,
    ) -> Self {
        Stmt::Try {
            body,
            handlers: handlers
                .into_iter()
                .map(|body| ExceptHandler {
                    exc_type: None,
                    name: None,
                    body,
                    line,
                })
                .collect(),
            orelse,
            finalbody,
            line,
        }
    }

    pub fn for_(target: &str, body: Vec<Stmt>, line: u32) -> Self {
        Stmt::For {
            target: Expr::name(target),
            iter: Expr::name("items"),
            body,
            orelse: Vec::new(),
            is_async: false,
            line,
        }
    }
}

fn import_aliases(names: &[(&str, Option<&str>)]) -> Vec<ImportAlias> {
    names
        .iter()
        .map(|(name, asname)| ImportAlias {
            name: name.to_string(),
            asname: asname.map(str::to_string),
        })
        .collect()
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        FunctionDef {
            name: name.into(),
            is_async: false,
            decorators: Vec::new(),
            args: Arguments::default(),
            returns: None,
            body: vec![Stmt::Pass { line: line + 1 }],
            line,
        }
    }

    pub fn with_decorator(mut self, decorator: Expr) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn with_args(mut self, args: Arguments) -> Self {
        self.args = args;
        self
    }

    pub fn with_returns(mut self, returns: Expr) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn into_stmt(self) -> Stmt {
        Stmt::FunctionDef(self)
    }
}

impl ClassDef {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        ClassDef {
            name: name.into(),
            bases: Vec::new(),
            keywords: Vec::new(),
            decorators: Vec::new(),
            body: vec![Stmt::Pass { line: line + 1 }],
            line,
        }
    }

    pub fn with_base(mut self, base: Expr) -> Self {
        self.bases.push(base);
        self
    }

    pub fn with_decorator(mut self, decorator: Expr) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn into_stmt(self) -> Stmt {
        Stmt::ClassDef(self)
    }
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Self {
        Arg {
            name: name.into(),
            annotation: None,
        }
    }

    pub fn annotated(name: impl Into<String>, annotation: Expr) -> Self {
        Arg {
            name: name.into(),
            annotation: Some(annotation),
        }
    }
}

impl Arguments {
    /// Plain positional-or-keyword parameters.
    pub fn simple(names: &[&str]) -> Self {
        Arguments {
            args: names.iter().map(|n| Arg::new(*n)).collect(),
            ..Arguments::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_deserialize_from_tagged_json() {
        let json = r#"{
            "body": [
                {"type": "assign",
                 "targets": [{"type": "name", "id": "X"}],
                 "value": {"type": "constant", "value": {"kind": "int", "value": 1}},
                 "line": 1},
                {"type": "function_def", "name": "f", "line": 3,
                 "args": {"args": [{"name": "a"}]}},
                {"type": "import_from", "module": "os", "names": [{"name": "path"}], "line": 5},
                {"type": "other", "line": 6}
            ]
        }"#;
        let module: Module = serde_json::from_str(json).unwrap();
        assert_eq!(module.body.len(), 4);
        assert_eq!(module.body[0], Stmt::assign("X", Expr::int(1), 1));
        match &module.body[1] {
            Stmt::FunctionDef(def) => {
                assert_eq!(def.name, "f");
                assert_eq!(def.args.args[0].name, "a");
                assert!(def.body.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(module.body[2].line(), 5);
        assert_eq!(module.body[3].line(), 6);
    }

    #[test]
    fn dotted_builder_nests_attributes() {
        let expr = Expr::dotted("a.b.c");
        assert_eq!(
            expr,
            Expr::attribute(Expr::attribute(Expr::name("a"), "b"), "c")
        );
    }

    #[test]
    fn docstring_statement() {
        assert_eq!(Stmt::docstring("hi", 2).as_docstring(), Some("hi"));
        assert_eq!(Stmt::Pass { line: 1 }.as_docstring(), None);
    }

    #[test]
    fn constant_type_names() {
        assert_eq!(Constant::Str(String::new()).type_name(), "str");
        assert_eq!(Constant::Float(1.5).type_name(), "float");
        assert_eq!(Constant::None.type_name(), "NoneType");
    }
}
