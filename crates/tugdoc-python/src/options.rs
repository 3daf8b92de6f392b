// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Builder configuration.
//!
//! Every name table the classifier consults lives here so callers can extend
//! them (a project-specific `Final` re-export, a custom overload marker) from
//! a JSON config file without touching the builder.

use serde::{Deserialize, Serialize};

/// Which declaration keeps the canonical name when two collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later declaration wins; the earlier one is renamed `"name N"`.
    #[default]
    LaterWins,
    /// The earlier declaration keeps the name; the later one is renamed.
    FirstWins,
}

/// Configuration for [`crate::system::System`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Annotations that mark a name as final (a constant).
    pub final_markers: Vec<String>,
    /// Annotations that mark an assignment as a type alias.
    pub type_alias_markers: Vec<String>,
    /// Callables whose call result is a type variable.
    pub type_variable_constructors: Vec<String>,
    /// Decorators marking an overload alternative.
    pub overload_markers: Vec<String>,
    /// `typing` names that are subscriptable type constructors.
    pub typing_aliases: Vec<String>,
    /// Builtin and stdlib classes subscriptable per PEP 585.
    pub subscriptable_classes: Vec<String>,
    /// Base names that make a class an exception.
    pub builtin_exceptions: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    /// Alias hops followed before a lookup gives up.
    pub max_alias_depth: usize,
    /// Diagnostics with a threshold above this are hidden.
    pub verbosity: i8,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

const TYPING_ALIASES: &[&str] = &[
    "typing.Hashable",
    "typing.Awaitable",
    "typing.Coroutine",
    "typing.AsyncIterable",
    "typing.AsyncIterator",
    "typing.Iterable",
    "typing.Iterator",
    "typing.Reversible",
    "typing.Sized",
    "typing.Container",
    "typing.Collection",
    "typing.Callable",
    "typing.AbstractSet",
    "typing.MutableSet",
    "typing.Mapping",
    "typing.MutableMapping",
    "typing.Sequence",
    "typing.MutableSequence",
    "typing.ByteString",
    "typing.Tuple",
    "typing.List",
    "typing.Deque",
    "typing.Set",
    "typing.FrozenSet",
    "typing.MappingView",
    "typing.KeysView",
    "typing.ItemsView",
    "typing.ValuesView",
    "typing.ContextManager",
    "typing.AsyncContextManager",
    "typing.Dict",
    "typing.DefaultDict",
    "typing.OrderedDict",
    "typing.Counter",
    "typing.ChainMap",
    "typing.Generator",
    "typing.AsyncGenerator",
    "typing.Type",
    "typing.Pattern",
    "typing.Match",
    "typing.Union",
    "typing.Literal",
    "typing.Optional",
];

const SUBSCRIPTABLE_CLASSES: &[&str] = &[
    "tuple",
    "list",
    "dict",
    "set",
    "frozenset",
    "type",
    "collections.deque",
    "collections.defaultdict",
    "collections.OrderedDict",
    "collections.Counter",
    "collections.ChainMap",
    "collections.abc.Awaitable",
    "collections.abc.Coroutine",
    "collections.abc.AsyncIterable",
    "collections.abc.AsyncIterator",
    "collections.abc.AsyncGenerator",
    "collections.abc.Iterable",
    "collections.abc.Iterator",
    "collections.abc.Generator",
    "collections.abc.Reversible",
    "collections.abc.Container",
    "collections.abc.Collection",
    "collections.abc.Callable",
    "collections.abc.Set",
    "collections.abc.MutableSet",
    "collections.abc.Mapping",
    "collections.abc.MutableMapping",
    "collections.abc.Sequence",
    "collections.abc.MutableSequence",
    "collections.abc.ByteString",
    "collections.abc.MappingView",
    "collections.abc.KeysView",
    "collections.abc.ItemsView",
    "collections.abc.ValuesView",
    "contextlib.AbstractContextManager",
    "contextlib.AbstractAsyncContextManager",
    "re.Pattern",
    "re.Match",
];

const BUILTIN_EXCEPTIONS: &[&str] = &[
    "BaseException",
    "Exception",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "EOFError",
    "ImportError",
    "ModuleNotFoundError",
    "LookupError",
    "IndexError",
    "KeyError",
    "MemoryError",
    "NameError",
    "OSError",
    "IOError",
    "EnvironmentError",
    "FileNotFoundError",
    "PermissionError",
    "RuntimeError",
    "NotImplementedError",
    "RecursionError",
    "StopIteration",
    "StopAsyncIteration",
    "SyntaxError",
    "SystemError",
    "SystemExit",
    "KeyboardInterrupt",
    "TypeError",
    "ValueError",
    "UnicodeError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "Warning",
    "UserWarning",
    "DeprecationWarning",
    "RuntimeWarning",
];

impl Default for BuilderOptions {
    fn default() -> Self {
        BuilderOptions {
            final_markers: strings(&["typing.Final", "typing_extensions.Final"]),
            type_alias_markers: strings(&["typing.TypeAlias", "typing_extensions.TypeAlias"]),
            type_variable_constructors: strings(&[
                "typing.TypeVar",
                "typing_extensions.TypeVar",
                "typing.TypeVarTuple",
                "typing_extensions.TypeVarTuple",
            ]),
            overload_markers: strings(&["typing.overload", "typing_extensions.overload"]),
            typing_aliases: strings(TYPING_ALIASES),
            subscriptable_classes: strings(SUBSCRIPTABLE_CLASSES),
            builtin_exceptions: strings(BUILTIN_EXCEPTIONS),
            duplicate_policy: DuplicatePolicy::default(),
            max_alias_depth: 32,
            verbosity: 0,
        }
    }
}

impl BuilderOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_verbosity(mut self, verbosity: i8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn is_final_marker(&self, full_name: &str) -> bool {
        self.final_markers.iter().any(|m| m == full_name)
    }

    pub fn is_type_alias_marker(&self, full_name: &str) -> bool {
        self.type_alias_markers.iter().any(|m| m == full_name)
    }

    pub fn is_type_variable_constructor(&self, full_name: &str) -> bool {
        self.type_variable_constructors.iter().any(|m| m == full_name)
    }

    pub fn is_overload_marker(&self, full_name: &str) -> bool {
        self.overload_markers.iter().any(|m| m == full_name)
    }

    /// A `typing` alias or PEP 585 class: something that builds a type when
    /// subscripted.
    pub fn is_type_constructor(&self, full_name: &str) -> bool {
        self.typing_aliases.iter().any(|m| m == full_name)
            || self.subscriptable_classes.iter().any(|m| m == full_name)
    }

    pub fn is_builtin_exception(&self, full_name: &str) -> bool {
        let name = full_name.strip_prefix("builtins.").unwrap_or(full_name);
        self.builtin_exceptions.iter().any(|m| m == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_typing_markers() {
        let opts = BuilderOptions::default();
        assert!(opts.is_final_marker("typing.Final"));
        assert!(opts.is_overload_marker("typing_extensions.overload"));
        assert!(opts.is_type_constructor("typing.List"));
        assert!(opts.is_type_constructor("dict"));
        assert!(opts.is_builtin_exception("builtins.ValueError"));
        assert!(!opts.is_builtin_exception("object"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = BuilderOptions::from_json(
            r#"{"final_markers": ["mylib.Final"], "duplicate_policy": "first_wins"}"#,
        )
        .unwrap();
        assert!(opts.is_final_marker("mylib.Final"));
        assert!(!opts.is_final_marker("typing.Final"));
        assert_eq!(opts.duplicate_policy, DuplicatePolicy::FirstWins);
        assert!(opts.is_overload_marker("typing.overload"));
        assert_eq!(opts.max_alias_depth, 32);
    }
}
