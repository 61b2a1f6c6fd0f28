//! The declarative operator tree produced by callers and consumed by the
//! optimizer before it is turned into an executable `Cursor`.

use qc_model::{Direction, Ref, Value};

/// A comparison operator's predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl CompareOp {
    pub fn eval_ordering(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match (self, ord) {
            (CompareOp::Lt, Less) => true,
            (CompareOp::Lte, Less | Equal) => true,
            (CompareOp::Gt, Greater) => true,
            (CompareOp::Gte, Greater | Equal) => true,
            (CompareOp::Eq, Equal) => true,
            (CompareOp::Neq, Less | Greater) => true,
            _ => false,
        }
    }
}

/// An additional direction/value constraint a `LinksTo` hoists into the
/// backend touch itself, instead of checking it with a separate optional
/// child. Produced by the optimizer's sibling-hoist rewrite.
#[derive(Clone, Debug, PartialEq)]
pub struct Linkage {
    pub direction: Direction,
    pub value: Ref,
}

/// The operator tree. Every variant is a pure description: building one
/// does not touch a backend. `qc_optimizer` rewrites a `Shape` into an
/// equivalent, cheaper `Shape`; `crate::cursor::build` turns a (possibly
/// rewritten) `Shape` into an executable `Cursor`.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Every node in the store.
    AllNodes,
    /// Every quad in the store.
    AllQuads,
    /// A fixed, caller-supplied set of refs.
    Fixed(Vec<Ref>),
    /// A fixed set of values, resolved to refs against the backend at
    /// execution time (distinct from `Fixed` which already holds refs).
    Lookup(Vec<Value>),
    /// Intersection: `mandatory` drives iteration, each `optional` child is
    /// checked via `contains` against every candidate the mandatory side
    /// produces.
    And {
        mandatory: Box<Shape>,
        optional: Vec<Shape>,
    },
    /// Union, deduplicated by ref identity.
    Or(Vec<Shape>),
    /// Logical negation; only meaningful as an optional child of `And` or as
    /// the `remove` side of `Except` — it has no sensible standalone scanner
    /// behavior since there is no universe to enumerate.
    Not(Box<Shape>),
    /// `from` minus `remove`.
    Except { from: Box<Shape>, remove: Box<Shape> },
    /// Follow `direction` from each quad `quads` produces to the node there,
    /// deduplicated.
    HasA { quads: Box<Shape>, direction: Direction },
    /// For each node `nodes` produces, every quad that has it in
    /// `direction`; `linkage` is an optional extra (direction, value)
    /// constraint the optimizer has hoisted into the backend touch.
    LinksTo {
        nodes: Box<Shape>,
        direction: Direction,
        linkage: Option<Linkage>,
    },
    /// Record the current result under `tag` as it flows through.
    Save { inner: Box<Shape>, tag: String },
    /// Filter `inner`'s node results by comparing their resolved value.
    Comparison {
        inner: Box<Shape>,
        op: CompareOp,
        value: Value,
    },
    /// Cap the number of results `inner` produces.
    Limit { inner: Box<Shape>, n: u64 },
    /// Wrap a child that is only ever probed (never scanned) when it
    /// appears as an `And` optional — present as a distinct variant so the
    /// optimizer and cost model can tell "must match" from "nice to tag"
    /// children apart.
    Optional(Box<Shape>),
}

impl Shape {
    pub fn and(mandatory: Shape, optional: Vec<Shape>) -> Shape {
        Shape::And {
            mandatory: Box::new(mandatory),
            optional,
        }
    }

    pub fn links_to(nodes: Shape, direction: Direction) -> Shape {
        Shape::LinksTo {
            nodes: Box::new(nodes),
            direction,
            linkage: None,
        }
    }

    pub fn has_a(quads: Shape, direction: Direction) -> Shape {
        Shape::HasA {
            quads: Box::new(quads),
            direction,
        }
    }

    pub fn save(self, tag: impl Into<String>) -> Shape {
        Shape::Save {
            inner: Box::new(self),
            tag: tag.into(),
        }
    }

    pub fn limit(self, n: u64) -> Shape {
        Shape::Limit {
            inner: Box::new(self),
            n,
        }
    }

    /// True for shapes whose scanner behavior is undefined without an
    /// enclosing `And` to supply candidates (currently only `Not`).
    pub fn requires_index_context(&self) -> bool {
        matches!(self, Shape::Not(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_ops_eval_against_ordering() {
        use std::cmp::Ordering::*;
        assert!(CompareOp::Lt.eval_ordering(Less));
        assert!(!CompareOp::Lt.eval_ordering(Equal));
        assert!(CompareOp::Gte.eval_ordering(Equal));
        assert!(CompareOp::Neq.eval_ordering(Greater));
        assert!(!CompareOp::Eq.eval_ordering(Greater));
    }

    #[test]
    fn not_requires_index_context() {
        assert!(Shape::Not(Box::new(Shape::AllNodes)).requires_index_context());
        assert!(!Shape::AllNodes.requires_index_context());
    }
}
