//! Predicate trees compiled to SQL `WHERE`/`HAVING` text.
//!
//! A [`Filter`] is an immutable, cheaply clonable tree: composing two filters
//! builds a new node that shares both subtrees. Every filter renders two ways
//! from the same walk:
//!
//! - [`Filter::get_sql`] inlines values as SQL literals (debug logging, echo)
//! - [`Filter::collect_params_and_build_sql`] emits `?` placeholders and
//!   appends the values to a parameter list, in left-to-right order
//!
//! Combinators always parenthesize both operands: `(A = 1) OR (B = 2)`.

use crate::value::Value;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// Canonical text of the always-true filter.
pub const ALWAYS_TRUE_SQL: &str = "1=1";

/// Comparison operator of a leaf filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub const fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

/// Boolean junction of a combinator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Junction::And => "AND",
            Junction::Or => "OR",
        }
    }
}

#[derive(Debug)]
enum FilterNode {
    Raw(String),
    Comparison {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Combinator {
        junction: Junction,
        left: Filter,
        right: Filter,
    },
    PrimaryKey(Vec<(String, Value)>),
}

/// An immutable, shareable predicate tree.
///
/// `Filter::default()` is the always-true filter rendering as `1=1`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    node: Option<Arc<FilterNode>>,
}

impl Filter {
    /// The always-true filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A raw SQL condition, rendered verbatim in both modes.
    pub fn sql(condition: impl Into<String>) -> Self {
        let condition = condition.into();
        if condition.trim() == ALWAYS_TRUE_SQL {
            return Self::default();
        }
        Self::from_node(FilterNode::Raw(condition))
    }

    /// A `column <op> value` leaf.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::from_node(FilterNode::Comparison {
            column: column.into(),
            op,
            value: value.into(),
        })
    }

    /// Conjunction of `column = value` pairs over a key, in the given order.
    ///
    /// The order is kept as supplied so that two filters over the same key
    /// always produce byte-identical SQL.
    pub fn by_pk<K, V>(key: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = key
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if pairs.is_empty() {
            return Self::default();
        }
        Self::from_node(FilterNode::PrimaryKey(pairs))
    }

    pub fn and(self, other: Filter) -> Self {
        Self::combine(Junction::And, self, other)
    }

    pub fn or(self, other: Filter) -> Self {
        Self::combine(Junction::Or, self, other)
    }

    /// Whether this is the always-true filter.
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// SQL with values inlined as literals.
    pub fn get_sql(&self) -> String {
        let mut out = String::new();
        self.render(&mut Sink::Literal, &mut out);
        out
    }

    /// SQL with `?` placeholders; referenced values are appended to `params`.
    pub fn collect_params_and_build_sql(&self, params: &mut Vec<Value>) -> String {
        let mut out = String::new();
        self.render(&mut Sink::Params(params), &mut out);
        out
    }

    fn from_node(node: FilterNode) -> Self {
        Self {
            node: Some(Arc::new(node)),
        }
    }

    fn combine(junction: Junction, left: Filter, right: Filter) -> Self {
        Self::from_node(FilterNode::Combinator {
            junction,
            left,
            right,
        })
    }

    fn render(&self, sink: &mut Sink<'_>, out: &mut String) {
        let Some(node) = self.node.as_deref() else {
            out.push_str(ALWAYS_TRUE_SQL);
            return;
        };
        match node {
            FilterNode::Raw(sql) => out.push_str(sql),
            FilterNode::Comparison { column, op, value } => {
                render_comparison(column, *op, value, sink, out);
            }
            FilterNode::Combinator {
                junction,
                left,
                right,
            } => {
                out.push('(');
                left.render(sink, out);
                out.push_str(") ");
                out.push_str(junction.as_sql());
                out.push_str(" (");
                right.render(sink, out);
                out.push(')');
            }
            FilterNode::PrimaryKey(pairs) => {
                if let [(column, value)] = pairs.as_slice() {
                    render_comparison(column, CompareOp::Eq, value, sink, out);
                    return;
                }
                for (i, (column, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    out.push('(');
                    render_comparison(column, CompareOp::Eq, value, sink, out);
                    out.push(')');
                }
            }
        }
    }
}

enum Sink<'a> {
    Literal,
    Params(&'a mut Vec<Value>),
}

fn render_comparison(column: &str, op: CompareOp, value: &Value, sink: &mut Sink<'_>, out: &mut String) {
    out.push_str(column);
    if value.is_null() {
        match op {
            CompareOp::Eq => {
                out.push_str(" IS NULL");
                return;
            }
            CompareOp::Ne => {
                out.push_str(" IS NOT NULL");
                return;
            }
            _ => {}
        }
    }
    out.push(' ');
    out.push_str(op.as_sql());
    out.push(' ');
    match sink {
        Sink::Literal => out.push_str(&parentheses_as_needed(value.sql_str())),
        Sink::Params(params) => {
            params.push(value.clone());
            out.push('?');
        }
    }
}

/// Wrap an operand in parentheses unless it is a bare number or
/// identifier, already parenthesized, or a placeholder.
pub fn parentheses_as_needed(operand: String) -> String {
    if operand == "?" || is_number_or_object_name(&operand) || is_parenthesized(&operand) {
        operand
    } else {
        format!("({})", operand)
    }
}

/// True for strings made only of `[A-Za-z0-9_#$.:]`.
pub fn is_number_or_object_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '$' | '.' | ':'))
}

fn is_parenthesized(s: &str) -> bool {
    if !(s.starts_with('(') && s.ends_with(')')) {
        return false;
    }
    // The opening parenthesis must close at the very end, ignoring quoted text.
    let mut depth = 0_usize;
    let mut in_quote = false;
    let last = s.len() - 1;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

pub fn filter_eq(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Eq, value)
}

pub fn filter_ne(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Ne, value)
}

pub fn filter_lt(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Lt, value)
}

pub fn filter_gt(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Gt, value)
}

pub fn filter_le(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Le, value)
}

pub fn filter_ge(column: impl Into<String>, value: impl Into<Value>) -> Filter {
    Filter::compare(column, CompareOp::Ge, value)
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl BitAnd for &Filter {
    type Output = Filter;

    fn bitand(self, rhs: &Filter) -> Filter {
        self.clone().and(rhs.clone())
    }
}

impl BitOr for &Filter {
    type Output = Filter;

    fn bitor(self, rhs: &Filter) -> Filter {
        self.clone().or(rhs.clone())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_sql())
    }
}
