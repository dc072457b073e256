//! Connector-agnostic predicate trees and the visitor contract that translates them.
//!
//! A [`Filter`] is immutable once built. Children are held in [`Arc`]s, so a
//! sub-tree can be shared by several parents without copying; combinators always
//! build new nodes around existing ones.
//!
//! The only way to interpret a filter is [`Filter::accept`] with a
//! [`FilterVisitor`]. Each node variant knows which visitor method it maps to.
//!
//! # Empty junctions
//!
//! `And`/`Or` are strictly binary. When a caller folds a dynamic list of
//! sub-filters, use [`Junction`]: an empty conjunction is dispatched to
//! [`FilterVisitor::visit_match_all`] (logical true) and an empty disjunction to
//! [`FilterVisitor::visit_match_none`] (logical false).

use std::fmt;
use std::sync::Arc;

use crate::types::{Attribute, ConnectorObject, Value};

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A predicate over connector objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Arc<Filter>, Arc<Filter>),
    Or(Arc<Filter>, Arc<Filter>),
    Not(Arc<Filter>),
    /// Attribute values equal the assertion values.
    Equals(Attribute),
    /// Attribute holds every assertion value.
    ContainsAll(Attribute),
    Contains { name: String, value: String },
    StartsWith { name: String, value: String },
    EndsWith { name: String, value: String },
    GreaterThan { name: String, value: Value },
    GreaterThanOrEqual { name: String, value: Value },
    LessThan { name: String, value: Value },
    LessThanOrEqual { name: String, value: Value },
    /// Backend-specific operator the framework does not know about.
    Extended { operator: String, attribute: Attribute },
}

impl Filter {
    #[must_use]
    pub fn and(left: impl Into<Arc<Filter>>, right: impl Into<Arc<Filter>>) -> Self {
        Filter::And(left.into(), right.into())
    }

    #[must_use]
    pub fn or(left: impl Into<Arc<Filter>>, right: impl Into<Arc<Filter>>) -> Self {
        Filter::Or(left.into(), right.into())
    }

    #[must_use]
    pub fn not(sub: impl Into<Arc<Filter>>) -> Self {
        Filter::Not(sub.into())
    }

    #[must_use]
    pub fn equal(attribute: Attribute) -> Self {
        Filter::Equals(attribute)
    }

    #[must_use]
    pub fn contains_all(attribute: Attribute) -> Self {
        Filter::ContainsAll(attribute)
    }

    #[must_use]
    pub fn contains(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn starts_with(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn ends_with(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn greater_than(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterThan {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn greater_than_or_equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterThanOrEqual {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn less_than(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::LessThan {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn less_than_or_equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::LessThanOrEqual {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn extended(operator: impl Into<String>, attribute: Attribute) -> Self {
        Filter::Extended {
            operator: operator.into(),
            attribute,
        }
    }

    /// Dispatch to the visitor method matching this node's variant.
    pub fn accept<P, V>(&self, visitor: &mut V, p: P) -> V::Output
    where
        V: FilterVisitor<P> + ?Sized,
    {
        match self {
            Filter::And(left, right) => visitor.visit_and(p, left, right),
            Filter::Or(left, right) => visitor.visit_or(p, left, right),
            Filter::Not(sub) => visitor.visit_not(p, sub),
            Filter::Equals(attr) => visitor.visit_equals(p, &attr.name, &attr.values),
            Filter::ContainsAll(attr) => visitor.visit_contains_all(p, &attr.name, &attr.values),
            Filter::Contains { name, value } => visitor.visit_contains(p, name, value),
            Filter::StartsWith { name, value } => visitor.visit_starts_with(p, name, value),
            Filter::EndsWith { name, value } => visitor.visit_ends_with(p, name, value),
            Filter::GreaterThan { name, value } => visitor.visit_greater_than(p, name, value),
            Filter::GreaterThanOrEqual { name, value } => {
                visitor.visit_greater_than_or_equal(p, name, value)
            }
            Filter::LessThan { name, value } => visitor.visit_less_than(p, name, value),
            Filter::LessThanOrEqual { name, value } => {
                visitor.visit_less_than_or_equal(p, name, value)
            }
            Filter::Extended { attribute, .. } => {
                visitor.visit_extended(p, &attribute.name, self, &attribute.values)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FilterVisitor
// ---------------------------------------------------------------------------

/// One method per filter variant, each receiving the node payload plus a
/// caller-supplied parameter `P`.
///
/// Backends implement this to translate a filter into their native query form
/// (SQL, an LDAP filter string, an in-memory predicate).
pub trait FilterVisitor<P> {
    type Output;

    fn visit_and(&mut self, p: P, left: &Filter, right: &Filter) -> Self::Output;

    fn visit_or(&mut self, p: P, left: &Filter, right: &Filter) -> Self::Output;

    fn visit_not(&mut self, p: P, sub: &Filter) -> Self::Output;

    fn visit_equals(&mut self, p: P, name: &str, values: &[Value]) -> Self::Output;

    fn visit_contains_all(&mut self, p: P, name: &str, values: &[Value]) -> Self::Output;

    fn visit_contains(&mut self, p: P, name: &str, value: &str) -> Self::Output;

    fn visit_starts_with(&mut self, p: P, name: &str, value: &str) -> Self::Output;

    fn visit_ends_with(&mut self, p: P, name: &str, value: &str) -> Self::Output;

    fn visit_greater_than(&mut self, p: P, name: &str, value: &Value) -> Self::Output;

    fn visit_greater_than_or_equal(&mut self, p: P, name: &str, value: &Value) -> Self::Output;

    fn visit_less_than(&mut self, p: P, name: &str, value: &Value) -> Self::Output;

    fn visit_less_than_or_equal(&mut self, p: P, name: &str, value: &Value) -> Self::Output;

    /// `filter` is the `Extended` node itself, so the visitor can read its operator.
    fn visit_extended(
        &mut self,
        p: P,
        name: &str,
        filter: &Filter,
        values: &[Value],
    ) -> Self::Output;

    /// Translation of an empty conjunction. Must mean "matches everything".
    fn visit_match_all(&mut self, p: P) -> Self::Output;

    /// Translation of an empty disjunction. Must mean "matches nothing".
    fn visit_match_none(&mut self, p: P) -> Self::Output;
}

// ---------------------------------------------------------------------------
// Junction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    /// Conjunction; identity is "match everything".
    All,
    /// Disjunction; identity is "match nothing".
    Any,
}

/// A dynamically assembled list of sub-filters combined by one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    kind: JunctionKind,
    filters: Vec<Filter>,
}

impl Junction {
    #[must_use]
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            kind: JunctionKind::All,
            filters: filters.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            kind: JunctionKind::Any,
            filters: filters.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> JunctionKind {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Left-nested binary tree, or `None` when there is nothing to combine.
    #[must_use]
    pub fn to_filter(&self) -> Option<Filter> {
        let kind = self.kind;
        self.filters.iter().cloned().reduce(|acc, next| match kind {
            JunctionKind::All => Filter::and(acc, next),
            JunctionKind::Any => Filter::or(acc, next),
        })
    }

    /// Visit the folded tree, or the kind's identity when the list is empty.
    pub fn accept<P, V>(&self, visitor: &mut V, p: P) -> V::Output
    where
        V: FilterVisitor<P> + ?Sized,
    {
        match (self.to_filter(), self.kind) {
            (Some(filter), _) => filter.accept(visitor, p),
            (None, JunctionKind::All) => visitor.visit_match_all(p),
            (None, JunctionKind::Any) => visitor.visit_match_none(p),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectMatcher
// ---------------------------------------------------------------------------

/// Evaluates a filter against a [`ConnectorObject`] in memory.
///
/// String operators are case-sensitive and succeed when any string value of the
/// attribute satisfies them. Ordering operators require a single-valued
/// attribute of a comparable kind. Extended operators never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectMatcher;

impl ObjectMatcher {
    #[must_use]
    pub fn matches(filter: &Filter, object: &ConnectorObject) -> bool {
        filter.accept(&mut ObjectMatcher, object)
    }

    fn any_string(object: &ConnectorObject, name: &str, pred: impl Fn(&str) -> bool) -> bool {
        object
            .attribute(name)
            .is_some_and(|attr| attr.values.iter().filter_map(Value::as_str).any(|s| pred(s)))
    }

    fn compare(
        object: &ConnectorObject,
        name: &str,
        value: &Value,
        accept: impl Fn(std::cmp::Ordering) -> bool,
    ) -> bool {
        object
            .attribute(name)
            .and_then(|attr| attr.single_value().and_then(|own| own.compare(value)))
            .is_some_and(accept)
    }
}

impl<'a> FilterVisitor<&'a ConnectorObject> for ObjectMatcher {
    type Output = bool;

    fn visit_and(&mut self, p: &'a ConnectorObject, left: &Filter, right: &Filter) -> bool {
        left.accept(self, p) && right.accept(self, p)
    }

    fn visit_or(&mut self, p: &'a ConnectorObject, left: &Filter, right: &Filter) -> bool {
        left.accept(self, p) || right.accept(self, p)
    }

    fn visit_not(&mut self, p: &'a ConnectorObject, sub: &Filter) -> bool {
        !sub.accept(self, p)
    }

    fn visit_equals(&mut self, p: &'a ConnectorObject, name: &str, values: &[Value]) -> bool {
        let Some(attr) = p.attribute(name) else {
            return values.is_empty();
        };
        if attr.values.len() != values.len() {
            return false;
        }
        let mut unmatched: Vec<&Value> = attr.values.iter().collect();
        values.iter().all(|expected| {
            match unmatched.iter().position(|own| *own == expected) {
                Some(index) => {
                    unmatched.swap_remove(index);
                    true
                }
                None => false,
            }
        })
    }

    fn visit_contains_all(&mut self, p: &'a ConnectorObject, name: &str, values: &[Value]) -> bool {
        p.attribute(name)
            .is_some_and(|attr| values.iter().all(|v| attr.values.contains(v)))
    }

    fn visit_contains(&mut self, p: &'a ConnectorObject, name: &str, value: &str) -> bool {
        Self::any_string(p, name, |s| s.contains(value))
    }

    fn visit_starts_with(&mut self, p: &'a ConnectorObject, name: &str, value: &str) -> bool {
        Self::any_string(p, name, |s| s.starts_with(value))
    }

    fn visit_ends_with(&mut self, p: &'a ConnectorObject, name: &str, value: &str) -> bool {
        Self::any_string(p, name, |s| s.ends_with(value))
    }

    fn visit_greater_than(&mut self, p: &'a ConnectorObject, name: &str, value: &Value) -> bool {
        Self::compare(p, name, value, std::cmp::Ordering::is_gt)
    }

    fn visit_greater_than_or_equal(
        &mut self,
        p: &'a ConnectorObject,
        name: &str,
        value: &Value,
    ) -> bool {
        Self::compare(p, name, value, std::cmp::Ordering::is_ge)
    }

    fn visit_less_than(&mut self, p: &'a ConnectorObject, name: &str, value: &Value) -> bool {
        Self::compare(p, name, value, std::cmp::Ordering::is_lt)
    }

    fn visit_less_than_or_equal(
        &mut self,
        p: &'a ConnectorObject,
        name: &str,
        value: &Value,
    ) -> bool {
        Self::compare(p, name, value, std::cmp::Ordering::is_le)
    }

    fn visit_extended(
        &mut self,
        _p: &'a ConnectorObject,
        name: &str,
        filter: &Filter,
        _values: &[Value],
    ) -> bool {
        if let Filter::Extended { operator, .. } = filter {
            tracing::debug!(operator = %operator, attribute = name, "extended operator cannot be evaluated in memory");
        }
        false
    }

    fn visit_match_all(&mut self, _p: &'a ConnectorObject) -> bool {
        true
    }

    fn visit_match_none(&mut self, _p: &'a ConnectorObject) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

struct Renderer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
}

impl Renderer<'_, '_> {
    fn values(&mut self, values: &[Value]) -> fmt::Result {
        self.f.write_str("[")?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.f.write_str(", ")?;
            }
            write!(self.f, "{value}")?;
        }
        self.f.write_str("]")
    }

    fn binary(&mut self, left: &Filter, op: &str, right: &Filter) -> fmt::Result {
        self.f.write_str("(")?;
        left.accept(self, ())?;
        write!(self.f, " {op} ")?;
        right.accept(self, ())?;
        self.f.write_str(")")
    }
}

impl FilterVisitor<()> for Renderer<'_, '_> {
    type Output = fmt::Result;

    fn visit_and(&mut self, (): (), left: &Filter, right: &Filter) -> fmt::Result {
        self.binary(left, "AND", right)
    }

    fn visit_or(&mut self, (): (), left: &Filter, right: &Filter) -> fmt::Result {
        self.binary(left, "OR", right)
    }

    fn visit_not(&mut self, (): (), sub: &Filter) -> fmt::Result {
        self.f.write_str("NOT ")?;
        sub.accept(self, ())
    }

    fn visit_equals(&mut self, (): (), name: &str, values: &[Value]) -> fmt::Result {
        write!(self.f, "{name} EQUALS ")?;
        self.values(values)
    }

    fn visit_contains_all(&mut self, (): (), name: &str, values: &[Value]) -> fmt::Result {
        write!(self.f, "{name} CONTAINSALL ")?;
        self.values(values)
    }

    fn visit_contains(&mut self, (): (), name: &str, value: &str) -> fmt::Result {
        write!(self.f, "{name} CONTAINS {value:?}")
    }

    fn visit_starts_with(&mut self, (): (), name: &str, value: &str) -> fmt::Result {
        write!(self.f, "{name} STARTSWITH {value:?}")
    }

    fn visit_ends_with(&mut self, (): (), name: &str, value: &str) -> fmt::Result {
        write!(self.f, "{name} ENDSWITH {value:?}")
    }

    fn visit_greater_than(&mut self, (): (), name: &str, value: &Value) -> fmt::Result {
        write!(self.f, "{name} > {value}")
    }

    fn visit_greater_than_or_equal(&mut self, (): (), name: &str, value: &Value) -> fmt::Result {
        write!(self.f, "{name} >= {value}")
    }

    fn visit_less_than(&mut self, (): (), name: &str, value: &Value) -> fmt::Result {
        write!(self.f, "{name} < {value}")
    }

    fn visit_less_than_or_equal(&mut self, (): (), name: &str, value: &Value) -> fmt::Result {
        write!(self.f, "{name} <= {value}")
    }

    fn visit_extended(
        &mut self,
        (): (),
        name: &str,
        filter: &Filter,
        values: &[Value],
    ) -> fmt::Result {
        let operator = match filter {
            Filter::Extended { operator, .. } => operator.as_str(),
            _ => "?",
        };
        write!(self.f, "{name} {} ", operator.to_uppercase())?;
        self.values(values)
    }

    fn visit_match_all(&mut self, (): ()) -> fmt::Result {
        self.f.write_str("TRUE")
    }

    fn visit_match_none(&mut self, (): ()) -> fmt::Result {
        self.f.write_str("FALSE")
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.accept(&mut Renderer { f }, ())
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.accept(&mut Renderer { f }, ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectClass, Uid};

    /// Translates to an LDAP filter string, the way a directory backend would.
    struct LdapTranslator;

    impl FilterVisitor<()> for LdapTranslator {
        type Output = String;

        fn visit_and(&mut self, (): (), left: &Filter, right: &Filter) -> String {
            format!("(&{}{})", left.accept(self, ()), right.accept(self, ()))
        }

        fn visit_or(&mut self, (): (), left: &Filter, right: &Filter) -> String {
            format!("(|{}{})", left.accept(self, ()), right.accept(self, ()))
        }

        fn visit_not(&mut self, (): (), sub: &Filter) -> String {
            format!("(!{})", sub.accept(self, ()))
        }

        fn visit_equals(&mut self, (): (), name: &str, values: &[Value]) -> String {
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("({name}={})", v.as_str().unwrap_or_default()))
                .collect();
            match parts.as_slice() {
                [single] => single.clone(),
                _ => format!("(&{})", parts.concat()),
            }
        }

        fn visit_contains_all(&mut self, p: (), name: &str, values: &[Value]) -> String {
            self.visit_equals(p, name, values)
        }

        fn visit_contains(&mut self, (): (), name: &str, value: &str) -> String {
            format!("({name}=*{value}*)")
        }

        fn visit_starts_with(&mut self, (): (), name: &str, value: &str) -> String {
            format!("({name}={value}*)")
        }

        fn visit_ends_with(&mut self, (): (), name: &str, value: &str) -> String {
            format!("({name}=*{value})")
        }

        fn visit_greater_than(&mut self, (): (), name: &str, value: &Value) -> String {
            format!("(!({name}<={value}))")
        }

        fn visit_greater_than_or_equal(&mut self, (): (), name: &str, value: &Value) -> String {
            format!("({name}>={value})")
        }

        fn visit_less_than(&mut self, (): (), name: &str, value: &Value) -> String {
            format!("(!({name}>={value}))")
        }

        fn visit_less_than_or_equal(&mut self, (): (), name: &str, value: &Value) -> String {
            format!("({name}<={value})")
        }

        fn visit_extended(&mut self, (): (), name: &str, _filter: &Filter, _values: &[Value]) -> String {
            format!("({name}=*)")
        }

        fn visit_match_all(&mut self, (): ()) -> String {
            "(&)".to_string()
        }

        fn visit_match_none(&mut self, (): ()) -> String {
            "(|)".to_string()
        }
    }

    /// Records which visitor method ran, to check dispatch.
    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl FilterVisitor<u32> for Recorder {
        type Output = u32;

        fn visit_and(&mut self, p: u32, left: &Filter, right: &Filter) -> u32 {
            self.0.push("and");
            left.accept(self, p) + right.accept(self, p)
        }
        fn visit_or(&mut self, p: u32, left: &Filter, right: &Filter) -> u32 {
            self.0.push("or");
            left.accept(self, p) + right.accept(self, p)
        }
        fn visit_not(&mut self, p: u32, sub: &Filter) -> u32 {
            self.0.push("not");
            sub.accept(self, p)
        }
        fn visit_equals(&mut self, p: u32, _: &str, _: &[Value]) -> u32 {
            self.0.push("equals");
            p
        }
        fn visit_contains_all(&mut self, p: u32, _: &str, _: &[Value]) -> u32 {
            self.0.push("contains_all");
            p
        }
        fn visit_contains(&mut self, p: u32, _: &str, _: &str) -> u32 {
            self.0.push("contains");
            p
        }
        fn visit_starts_with(&mut self, p: u32, _: &str, _: &str) -> u32 {
            self.0.push("starts_with");
            p
        }
        fn visit_ends_with(&mut self, p: u32, _: &str, _: &str) -> u32 {
            self.0.push("ends_with");
            p
        }
        fn visit_greater_than(&mut self, p: u32, _: &str, _: &Value) -> u32 {
            self.0.push("gt");
            p
        }
        fn visit_greater_than_or_equal(&mut self, p: u32, _: &str, _: &Value) -> u32 {
            self.0.push("ge");
            p
        }
        fn visit_less_than(&mut self, p: u32, _: &str, _: &Value) -> u32 {
            self.0.push("lt");
            p
        }
        fn visit_less_than_or_equal(&mut self, p: u32, _: &str, _: &Value) -> u32 {
            self.0.push("le");
            p
        }
        fn visit_extended(&mut self, p: u32, _: &str, filter: &Filter, _: &[Value]) -> u32 {
            assert!(matches!(filter, Filter::Extended { .. }));
            self.0.push("extended");
            p
        }
        fn visit_match_all(&mut self, _: u32) -> u32 {
            self.0.push("match_all");
            0
        }
        fn visit_match_none(&mut self, _: u32) -> u32 {
            self.0.push("match_none");
            0
        }
    }

    fn person() -> ConnectorObject {
        ConnectorObject::new(ObjectClass::account(), Uid::new("jdoe"))
            .with(Attribute::single("cn", "John Doe"))
            .with(Attribute::single("age", 42_i64))
            .with(Attribute::new("groups", vec!["admins".into(), "staff".into()]))
    }

    #[test]
    fn every_variant_dispatches_to_its_method() {
        let filter = Filter::and(
            Filter::or(
                Filter::not(Filter::equal(Attribute::single("a", 1_i64))),
                Filter::contains_all(Attribute::single("b", 1_i64)),
            ),
            Filter::and(
                Filter::and(
                    Filter::contains("c", "x"),
                    Filter::and(Filter::starts_with("d", "x"), Filter::ends_with("e", "x")),
                ),
                Filter::and(
                    Filter::and(Filter::greater_than("f", 1_i64), Filter::greater_than_or_equal("g", 1_i64)),
                    Filter::and(
                        Filter::and(Filter::less_than("h", 1_i64), Filter::less_than_or_equal("i", 1_i64)),
                        Filter::extended("matches", Attribute::single("j", "x")),
                    ),
                ),
            ),
        );

        let mut recorder = Recorder::default();
        let leaves = filter.accept(&mut recorder, 1);
        assert_eq!(leaves, 10);
        for expected in [
            "or", "not", "equals", "contains_all", "contains", "starts_with", "ends_with", "gt", "ge",
            "lt", "le", "extended",
        ] {
            assert!(recorder.0.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn translates_to_ldap() {
        let filter = Filter::and(
            Filter::equal(Attribute::single("objectClass", "person")),
            Filter::or(Filter::starts_with("cn", "John"), Filter::not(Filter::contains("mail", "spam"))),
        );
        assert_eq!(
            filter.accept(&mut LdapTranslator, ()),
            "(&(objectClass=person)(|(cn=John*)(!(mail=*spam*))))"
        );
    }

    #[test]
    fn empty_conjunction_matches_everything() {
        let all = Junction::all(Vec::new());
        assert!(all.is_empty());
        assert!(all.to_filter().is_none());
        assert!(all.accept(&mut ObjectMatcher, &person()));
        assert_eq!(all.accept(&mut LdapTranslator, ()), "(&)");
        assert_eq!(all.to_string(), "TRUE");
    }

    #[test]
    fn empty_disjunction_matches_nothing() {
        let any = Junction::any(Vec::new());
        assert!(!any.accept(&mut ObjectMatcher, &person()));
        assert_eq!(any.accept(&mut LdapTranslator, ()), "(|)");
        assert_eq!(any.to_string(), "FALSE");
    }

    #[test]
    fn junction_folds_left_nested() {
        let a = Filter::contains("cn", "a");
        let b = Filter::contains("cn", "b");
        let c = Filter::contains("cn", "c");
        let folded = Junction::any([a.clone(), b.clone(), c.clone()]).to_filter().unwrap();
        assert_eq!(folded, Filter::or(Filter::or(a.clone(), b), c));
        assert_eq!(Junction::all([a.clone()]).to_filter(), Some(a));
    }

    #[test]
    fn shared_subtrees_are_not_copied() {
        let shared = Arc::new(Filter::equal(Attribute::single("cn", "x")));
        let left = Filter::and(shared.clone(), Filter::contains("mail", "@"));
        let right = Filter::not(shared.clone());
        assert_eq!(Arc::strong_count(&shared), 3);
        match (&left, &right) {
            (Filter::And(l, _), Filter::Not(r)) => assert!(Arc::ptr_eq(l, r)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn object_matcher_semantics() {
        let obj = person();
        let m = |f: Filter| ObjectMatcher::matches(&f, &obj);

        assert!(m(Filter::equal(Attribute::single("CN", "John Doe"))));
        assert!(!m(Filter::equal(Attribute::single("cn", "john doe"))));
        assert!(m(Filter::equal(Attribute::new("groups", vec!["staff".into(), "admins".into()]))));
        assert!(!m(Filter::equal(Attribute::single("groups", "staff"))));
        assert!(m(Filter::equal(Attribute::new("missing", Vec::new()))));

        assert!(m(Filter::contains_all(Attribute::single("groups", "staff"))));
        assert!(!m(Filter::contains_all(Attribute::new("groups", vec!["staff".into(), "ops".into()]))));

        assert!(m(Filter::contains("cn", "hn D")));
        assert!(m(Filter::starts_with("cn", "John")));
        assert!(m(Filter::ends_with("cn", "Doe")));
        assert!(!m(Filter::ends_with("age", "2")));

        assert!(m(Filter::greater_than("age", 41_i64)));
        assert!(!m(Filter::greater_than("age", 42_i64)));
        assert!(m(Filter::greater_than_or_equal("age", 42_i64)));
        assert!(m(Filter::less_than("age", 42.5)));
        assert!(m(Filter::less_than_or_equal("age", 42_i64)));
        assert!(!m(Filter::less_than("groups", "z")));
        assert!(!m(Filter::less_than("age", "50")));

        assert!(m(Filter::equal(Attribute::single("__UID__", "jdoe"))));
        assert!(!m(Filter::extended("regex", Attribute::single("cn", ".*"))));
        assert!(m(Filter::not(Filter::extended("regex", Attribute::single("cn", ".*")))));
    }

    #[test]
    fn display_renders_infix() {
        let filter = Filter::and(
            Filter::equal(Attribute::single("cn", "x")),
            Filter::not(Filter::greater_than("age", 3_i64)),
        );
        assert_eq!(filter.to_string(), "(cn EQUALS [\"x\"] AND NOT age > 3)");
    }
}
