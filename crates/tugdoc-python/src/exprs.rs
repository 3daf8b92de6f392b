// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Expression utilities used while building the model.
//!
//! - [`dotted_name`]: `a.b.c` attribute chains as name segments
//! - [`Expr`]'s `Display` impl renders source text (`unparse`)
//! - [`infer_type`]: structural annotation for a literal value
//! - [`unstring_annotation`]: forward references `"Foo"` to `Foo`
//! - [`is_name_equals_main`]: the `if __name__ == "__main__":` test
//! - [`clean_docstring`]: docstring indentation normalisation

use std::fmt;

use crate::syntax::{CmpOpKind, Constant, Expr, UnaryOpKind};

// ============================================================================
// Names
// ============================================================================

/// Segments of a dotted name, or `None` if the expression is not a pure
/// chain of attribute accesses on a name.
pub fn dotted_name(expr: &Expr) -> Option<Vec<&str>> {
    match expr {
        Expr::Name { id } => Some(vec![id.as_str()]),
        Expr::Attribute { value, attr } => {
            let mut parts = dotted_name(value)?;
            parts.push(attr.as_str());
            Some(parts)
        }
        _ => None,
    }
}

/// [`dotted_name`] joined with dots.
pub fn dotted_string(expr: &Expr) -> Option<String> {
    dotted_name(expr).map(|parts| parts.join("."))
}

/// Whether `name` is a valid Python identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Python's `str.isupper()`: at least one cased character, none lowercase.
pub fn is_upper(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}

/// `None`, written as a literal, a bare name, or a string.
pub fn is_none_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Constant {
            value: Constant::None,
        } => true,
        Expr::Name { id } => id == "None",
        Expr::Constant {
            value: Constant::Str(s),
        } => s == "None",
        _ => false,
    }
}

/// `__name__ == "__main__"` in either operand order.
pub fn is_name_equals_main(test: &Expr) -> bool {
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = test
    else {
        return false;
    };
    if ops.as_slice() != [CmpOpKind::Eq] || comparators.len() != 1 {
        return false;
    }
    let is_name = |e: &Expr| matches!(e, Expr::Name { id } if id == "__name__");
    let is_main = |e: &Expr| e.as_str() == Some("__main__");
    (is_name(left) && is_main(&comparators[0])) || (is_main(left) && is_name(&comparators[0]))
}

// ============================================================================
// Literals and type inference
// ============================================================================

/// Whether the expression is a literal `ast.literal_eval` would accept.
pub fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Constant { .. } => true,
        Expr::List { elts } | Expr::Tuple { elts } | Expr::Set { elts } => {
            elts.iter().all(is_literal)
        }
        Expr::Dict { keys, values } => {
            keys.iter()
                .all(|k| k.as_ref().is_some_and(is_literal))
                && values.iter().all(is_literal)
        }
        Expr::UnaryOp {
            op: UnaryOpKind::USub | UnaryOpKind::UAdd,
            operand,
        } => matches!(
            operand.as_ref(),
            Expr::Constant {
                value: Constant::Int(_) | Constant::Float(_)
            }
        ),
        _ => false,
    }
}

/// Infer an annotation from the shape of a literal value.
///
/// Scalars map to their type name; lists, sets and tuples of one uniform
/// scalar type map to `list[T]`, `set[T]` and `tuple[T, ...]`; dicts with
/// uniform key and value types map to `dict[K, V]`. Anything else that is a
/// literal maps to the bare container name. `None` and non-literals yield
/// `None`.
pub fn infer_type(expr: &Expr) -> Option<Expr> {
    if !is_literal(expr) {
        return None;
    }
    annotation_for_value(expr)
}

fn annotation_for_value(expr: &Expr) -> Option<Expr> {
    let name = match expr {
        Expr::Constant {
            value: Constant::None,
        } => return None,
        Expr::Constant { value } => value.type_name(),
        Expr::UnaryOp { operand, .. } => return annotation_for_value(operand),
        Expr::List { .. } => "list",
        Expr::Set { .. } => "set",
        Expr::Tuple { .. } => "tuple",
        Expr::Dict { .. } => "dict",
        _ => return None,
    };
    let element = match expr {
        Expr::List { elts } | Expr::Set { elts } => annotation_for_elements(elts.iter()),
        Expr::Tuple { elts } => annotation_for_elements(elts.iter())
            .map(|elem| Expr::tuple(vec![elem, Expr::constant(Constant::Ellipsis)])),
        Expr::Dict { keys, values } => {
            let key = annotation_for_elements(keys.iter().flatten());
            let value = annotation_for_elements(values.iter());
            match (key, value) {
                (Some(k), Some(v)) => Some(Expr::tuple(vec![k, v])),
                _ => None,
            }
        }
        _ => return Some(Expr::name(name)),
    };
    Some(match element {
        Some(slice) => Expr::subscript(Expr::name(name), slice),
        None => Expr::name(name),
    })
}

fn annotation_for_elements<'a>(elements: impl Iterator<Item = &'a Expr>) -> Option<Expr> {
    let mut found: Option<String> = None;
    for elem in elements {
        match annotation_for_value(elem) {
            Some(Expr::Name { id }) => {
                if found.as_ref().is_some_and(|f| *f != id) {
                    return None;
                }
                found = Some(id);
            }
            // Nested containers and None elements are too complex to name.
            _ => return None,
        }
    }
    found.map(Expr::name)
}

// ============================================================================
// Annotations
// ============================================================================

/// Replace string forward references with the expression they name.
///
/// Only strings that spell a dotted identifier path are unstrung; any other
/// string is left quoted. Walks into subscripts, tuples, lists and binary
/// operations so `List["Foo"]` and `"A" | None` are handled.
pub fn unstring_annotation(expr: &Expr) -> Expr {
    match expr {
        Expr::Constant {
            value: Constant::Str(s),
        } => {
            let text = s.trim();
            if !text.is_empty() && text.split('.').all(is_identifier) {
                Expr::dotted(text)
            } else {
                expr.clone()
            }
        }
        Expr::Subscript { value, slice } => {
            Expr::subscript(unstring_annotation(value), unstring_annotation(slice))
        }
        Expr::Tuple { elts } => Expr::tuple(elts.iter().map(unstring_annotation).collect()),
        Expr::List { elts } => Expr::list(elts.iter().map(unstring_annotation).collect()),
        Expr::BinOp { left, op, right } => {
            Expr::bin_op(unstring_annotation(left), *op, unstring_annotation(right))
        }
        _ => expr.clone(),
    }
}

// ============================================================================
// Docstrings
// ============================================================================

/// Normalise docstring indentation the way `inspect.cleandoc` does.
///
/// Leading whitespace is stripped from the first line; the common indentation
/// of the remaining lines is removed; leading and trailing blank lines are
/// dropped.
pub fn clean_docstring(text: &str) -> String {
    let expanded = text.replace('\t', "        ");
    let mut lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let margin = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let first = lines[0].trim_start();
    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    cleaned.push(first);
    for line in lines.drain(1..) {
        cleaned.push(line.get(margin..).unwrap_or_else(|| line.trim_start()));
    }
    while cleaned.first().is_some_and(|l| l.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name { id } => write!(f, "{}", id),
            Expr::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Expr::Constant { value } => write!(f, "{}", value),
            Expr::List { elts } => write!(f, "[{}]", join(elts)),
            Expr::Set { elts } => write!(f, "{{{}}}", join(elts)),
            Expr::Tuple { elts } if elts.len() == 1 => write!(f, "({},)", elts[0]),
            Expr::Tuple { elts } => write!(f, "({})", join(elts)),
            Expr::Dict { keys, values } => {
                let items: Vec<String> = keys
                    .iter()
                    .zip(values)
                    .map(|(k, v)| match k {
                        Some(k) => format!("{}: {}", k, v),
                        None => format!("**{}", v),
                    })
                    .collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                let mut parts: Vec<String> = args.iter().map(ToString::to_string).collect();
                parts.extend(keywords.iter().map(|kw| match &kw.arg {
                    Some(name) => format!("{}={}", name, kw.value),
                    None => format!("**{}", kw.value),
                }));
                write!(f, "{}({})", func, parts.join(", "))
            }
            Expr::Subscript { value, slice } => match slice.as_ref() {
                Expr::Tuple { elts } if !elts.is_empty() => write!(f, "{}[{}]", value, join(elts)),
                other => write!(f, "{}[{}]", value, other),
            },
            Expr::Slice { lower, upper, step } => {
                let part = |e: &Option<Box<Expr>>| e.as_ref().map(|e| e.to_string()).unwrap_or_default();
                write!(f, "{}:{}", part(lower), part(upper))?;
                if step.is_some() {
                    write!(f, ":{}", part(step))?;
                }
                Ok(())
            }
            Expr::BinOp { left, op, right } => {
                let left_text = match left.as_ref() {
                    Expr::BinOp { op: inner, .. } if inner != op => format!("({})", left),
                    _ => left.to_string(),
                };
                let right_text = match right.as_ref() {
                    Expr::BinOp { .. } => format!("({})", right),
                    _ => right.to_string(),
                };
                write!(f, "{} {} {}", left_text, op.symbol(), right_text)
            }
            Expr::UnaryOp { op, operand } => match operand.as_ref() {
                Expr::BinOp { .. } | Expr::Compare { .. } => {
                    write!(f, "{}({})", op.symbol(), operand)
                }
                _ => write!(f, "{}{}", op.symbol(), operand),
            },
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                write!(f, "{}", left)?;
                for (op, right) in ops.iter().zip(comparators) {
                    write!(f, " {} {}", op.symbol(), right)?;
                }
                Ok(())
            }
            Expr::Starred { value } => write!(f, "*{}", value),
            Expr::Other { source } => write!(f, "{}", source),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => write!(f, "None"),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Constant::Float(x) => write!(f, "{}", x),
            Constant::Str(s) => write!(f, "'{}'", escape(s)),
            Constant::Bytes(s) => write!(f, "b'{}'", escape(s)),
            Constant::Ellipsis => write!(f, "..."),
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn join(elts: &[Expr]) -> String {
    elts.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::BinOpKind;

    mod names {
        use super::*;

        #[test]
        fn dotted_name_of_attribute_chain() {
            assert_eq!(
                dotted_name(&Expr::dotted("os.path.join")),
                Some(vec!["os", "path", "join"])
            );
        }

        #[test]
        fn dotted_name_rejects_calls() {
            let call = Expr::call(Expr::name("f"), vec![]);
            assert_eq!(dotted_name(&call), None);
            assert_eq!(dotted_name(&Expr::attribute(call, "x")), None);
        }

        #[test]
        fn isupper_semantics() {
            assert!(is_upper("MAX_SIZE"));
            assert!(is_upper("_X1"));
            assert!(!is_upper("_1"));
            assert!(!is_upper("Max"));
        }

        #[test]
        fn main_guard_detection() {
            let test = Expr::compare(Expr::name("__name__"), CmpOpKind::Eq, Expr::str("__main__"));
            assert!(is_name_equals_main(&test));
            let reversed =
                Expr::compare(Expr::str("__main__"), CmpOpKind::Eq, Expr::name("__name__"));
            assert!(is_name_equals_main(&reversed));
            let other = Expr::compare(Expr::name("__name__"), CmpOpKind::NotEq, Expr::str("__main__"));
            assert!(!is_name_equals_main(&other));
        }

        #[test]
        fn none_literal_forms() {
            assert!(is_none_literal(&Expr::none()));
            assert!(is_none_literal(&Expr::name("None")));
            assert!(is_none_literal(&Expr::str("None")));
            assert!(!is_none_literal(&Expr::int(0)));
        }
    }

    mod inference {
        use super::*;

        fn inferred(expr: Expr) -> Option<String> {
            infer_type(&expr).map(|e| e.to_string())
        }

        #[test]
        fn scalars() {
            assert_eq!(inferred(Expr::int(1)).as_deref(), Some("int"));
            assert_eq!(inferred(Expr::str("x")).as_deref(), Some("str"));
            assert_eq!(inferred(Expr::bool(true)).as_deref(), Some("bool"));
            assert_eq!(inferred(Expr::none()), None);
        }

        #[test]
        fn negative_number_is_literal() {
            let neg = Expr::UnaryOp {
                op: UnaryOpKind::USub,
                operand: Box::new(Expr::float(1.5)),
            };
            assert_eq!(inferred(neg).as_deref(), Some("float"));
        }

        #[test]
        fn uniform_containers() {
            assert_eq!(
                inferred(Expr::list(vec![Expr::int(1), Expr::int(2)])).as_deref(),
                Some("list[int]")
            );
            assert_eq!(
                inferred(Expr::tuple(vec![Expr::str("a")])).as_deref(),
                Some("tuple[str, ...]")
            );
            assert_eq!(
                inferred(Expr::dict(vec![(Expr::str("a"), Expr::int(1))])).as_deref(),
                Some("dict[str, int]")
            );
        }

        #[test]
        fn mixed_or_empty_containers_fall_back_to_bare_name() {
            assert_eq!(
                inferred(Expr::list(vec![Expr::int(1), Expr::str("a")])).as_deref(),
                Some("list")
            );
            assert_eq!(inferred(Expr::set(vec![])).as_deref(), Some("set"));
            assert_eq!(
                inferred(Expr::list(vec![Expr::list(vec![Expr::int(1)])])).as_deref(),
                Some("list")
            );
        }

        #[test]
        fn non_literals_are_not_inferred() {
            assert_eq!(inferred(Expr::name("x")), None);
            assert_eq!(inferred(Expr::call(Expr::name("f"), vec![])), None);
        }
    }

    mod annotations {
        use super::*;

        #[test]
        fn unstrings_dotted_forward_reference() {
            assert_eq!(unstring_annotation(&Expr::str("mod.Foo")), Expr::dotted("mod.Foo"));
        }

        #[test]
        fn unstrings_inside_subscripts_and_unions() {
            let ann = Expr::subscript(Expr::name("List"), Expr::str("Foo"));
            assert_eq!(unstring_annotation(&ann).to_string(), "List[Foo]");

            let union = Expr::bin_op(Expr::str("A"), BinOpKind::BitOr, Expr::none());
            assert_eq!(unstring_annotation(&union).to_string(), "A | None");
        }

        #[test]
        fn leaves_complex_strings_quoted() {
            let ann = Expr::str("List[int]");
            assert_eq!(unstring_annotation(&ann), ann);
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn renders_common_shapes() {
            let sub = Expr::subscript(
                Expr::name("dict"),
                Expr::tuple(vec![Expr::name("str"), Expr::name("int")]),
            );
            assert_eq!(sub.to_string(), "dict[str, int]");
            assert_eq!(Expr::tuple(vec![Expr::int(1)]).to_string(), "(1,)");
            assert_eq!(Expr::float(2.0).to_string(), "2.0");
            assert_eq!(Expr::str("it's").to_string(), "'it\\'s'");
            let call = Expr::call(Expr::dotted("typing.TypeVar"), vec![Expr::str("T")]);
            assert_eq!(call.to_string(), "typing.TypeVar('T')");
        }

        #[test]
        fn binop_parenthesizes_mixed_operators() {
            let inner = Expr::bin_op(Expr::int(1), BinOpKind::Add, Expr::int(2));
            let outer = Expr::bin_op(inner, BinOpKind::Mult, Expr::int(3));
            assert_eq!(outer.to_string(), "(1 + 2) * 3");
            let chained = Expr::bin_op(
                Expr::bin_op(Expr::name("a"), BinOpKind::Add, Expr::name("b")),
                BinOpKind::Add,
                Expr::name("c"),
            );
            assert_eq!(chained.to_string(), "a + b + c");
        }
    }

    #[test]
    fn cleandoc_strips_common_indent() {
        let raw = "Summary.\n\n    Details here.\n      Indented more.\n    ";
        assert_eq!(
            clean_docstring(raw),
            "Summary.\n\nDetails here.\n  Indented more."
        );
        assert_eq!(clean_docstring("\n   Only body.\n"), "Only body.");
    }
}
