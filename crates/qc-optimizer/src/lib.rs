//! A bottom-up, fixed-point rewriter over [`qc_iter::shape::Shape`] trees.
//!
//! The rewrites here preserve the set of result `Ref`s and the set of tag
//! bindings a shape produces; they only change how cheaply a `Cursor` built
//! from the shape reaches those results. Four rewrites are mandatory:
//!
//! 1. hoisting a `LinksTo` sibling inside an `And` into the other `LinksTo`'s
//!    `linkage`, gated by a cost comparison (§4.4 rule 2);
//! 2. collapsing nested/`Save`-wrapped `Limit`s so a limit sits as close to
//!    a backend-touching shape as shape-level rewriting can get it without
//!    backend cooperation (§4.4 rule 4 — the rest of the push-down is
//!    already realized by `Cursor`'s early-exit `Limit` execution);
//! 3 & 4. `Comparison` over `AllNodes` of a primitive type and genuinely
//!    backend-native range/limit pushdown are left to [`PlanningContext::backend_optimize`],
//!    since they require a concrete index the generic algebra has no
//!    knowledge of (see `qc-store`'s implementation).
//!
//! Rule 1 from spec.md §4.4 ("`LinksTo` with a singleton `Fixed` subject
//! replaced with the backend's direct `quad_iterator`") needs no rewrite
//! here: `qc_iter::cursor::Exec` already dispatches every `LinksTo` straight
//! to `Backend::quad_iterator` regardless of what shape produced its nodes,
//! so a singleton `Fixed` is already indexed by construction.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use qc_cost::SizeEstimate;
use qc_iter::shape::{Linkage, Shape};
use qc_model::{Direction, Ref};

/// What the optimizer needs from the backend it is planning for, decoupled
/// from actually executing a cursor (`qc_iter::backend::Backend`).
pub trait PlanningContext {
    /// A size estimate for a shape, used by the cost-comparison gate on the
    /// `And`/`LinksTo` hoist. Implementors with real statistics (exact node
    /// and quad counts, per-direction cardinalities) should use them;
    /// without any, returning a constant estimated size still gives a
    /// deterministic (if uninformed) planning decision.
    fn size_of(&self, shape: &Shape) -> SizeEstimate;

    /// Whether the backend maintains a composite index over this unordered
    /// direction pair. Consulted only for documentation/diagnostics here —
    /// the actual dispatch to a pair index happens in a backend's own
    /// `backend_optimize`, since the generic algebra has no way to query
    /// one.
    fn has_pair_index(&self, a: Direction, b: Direction) -> bool {
        let _ = (a, b);
        false
    }

    /// Backend-specific rewrites beyond the four generic ones (spec.md
    /// §4.4's extensibility note): primitive-type `Comparison` over
    /// `AllNodes` becoming a range scan, and genuine native `LIMIT`
    /// pushdown. Default is a no-op.
    fn backend_optimize(&self, shape: Shape) -> (Shape, bool) {
        (shape, false)
    }
}

/// A `PlanningContext` with no backend statistics and no `backend_optimize`
/// hook, for tests and for callers that only want the generic rewrites.
#[derive(Default)]
pub struct NoopContext;

impl PlanningContext for NoopContext {
    fn size_of(&self, _shape: &Shape) -> SizeEstimate {
        SizeEstimate::estimated(1_000)
    }
}

/// Optimize `shape` to a fixed point: apply the generic rewrites and the
/// backend's `backend_optimize` hook in a loop until neither reports a
/// change. Terminates because each rule either strictly reduces the operator
/// count (the `Limit` collapses) or replaces a generic operator with an
/// equal-or-cheaper specialized one and never the reverse.
pub fn optimize(shape: Shape, ctx: &dyn PlanningContext) -> Shape {
    let mut current = shape;
    loop {
        let (next, generic_changed) = rewrite_once(current, ctx);
        let (next, backend_changed) = ctx.backend_optimize(next);
        current = next;
        if !generic_changed && !backend_changed {
            return current;
        }
    }
}

/// A single bottom-up pass: recurse into children, then look for a rewrite
/// rooted at this node. Returns the (possibly rewritten) shape and whether
/// anything changed anywhere in the subtree.
fn rewrite_once(shape: Shape, ctx: &dyn PlanningContext) -> (Shape, bool) {
    match shape {
        Shape::And { mandatory, optional } => rewrite_and(*mandatory, optional, ctx),

        Shape::Or(children) => {
            let mut changed = false;
            let children = children
                .into_iter()
                .map(|c| {
                    let (c, c_changed) = rewrite_once(c, ctx);
                    changed |= c_changed;
                    c
                })
                .collect();
            (Shape::Or(children), changed)
        }

        Shape::Not(inner) => {
            let (inner, changed) = rewrite_once(*inner, ctx);
            (Shape::Not(Box::new(inner)), changed)
        }

        Shape::Except { from, remove } => {
            let (from, c1) = rewrite_once(*from, ctx);
            let (remove, c2) = rewrite_once(*remove, ctx);
            (
                Shape::Except {
                    from: Box::new(from),
                    remove: Box::new(remove),
                },
                c1 || c2,
            )
        }

        Shape::HasA { quads, direction } => {
            let (quads, changed) = rewrite_once(*quads, ctx);
            (
                Shape::HasA {
                    quads: Box::new(quads),
                    direction,
                },
                changed,
            )
        }

        Shape::LinksTo { nodes, direction, linkage } => {
            let (nodes, changed) = rewrite_once(*nodes, ctx);
            (
                Shape::LinksTo {
                    nodes: Box::new(nodes),
                    direction,
                    linkage,
                },
                changed,
            )
        }

        Shape::Save { inner, tag } => {
            let (inner, changed) = rewrite_once(*inner, ctx);
            (
                Shape::Save {
                    inner: Box::new(inner),
                    tag,
                },
                changed,
            )
        }

        Shape::Comparison { inner, op, value } => {
            let (inner, changed) = rewrite_once(*inner, ctx);
            (
                Shape::Comparison {
                    inner: Box::new(inner),
                    op,
                    value,
                },
                changed,
            )
        }

        Shape::Limit { inner, n } => rewrite_limit(*inner, n, ctx),

        Shape::Optional(inner) => {
            let (inner, changed) = rewrite_once(*inner, ctx);
            (Shape::Optional(Box::new(inner)), changed)
        }

        leaf @ (Shape::AllNodes | Shape::AllQuads | Shape::Fixed(_) | Shape::Lookup(_)) => (leaf, false),
    }
}

/// Rule 4 (partial): collapse a `Limit` over another `Limit` to the tighter
/// bound, and push a `Limit` below a `Save` (tagging doesn't change which
/// results exist, so the order is immaterial to the result/tag sets but
/// moving the limit closer to the backend-touching shape is what "push
/// down" means at the shape level).
fn rewrite_limit(inner: Shape, n: u64, ctx: &dyn PlanningContext) -> (Shape, bool) {
    match inner {
        Shape::Limit { inner: inner2, n: n2 } => {
            let (rewritten, _) = rewrite_limit(*inner2, n.min(n2), ctx);
            (rewritten, true)
        }
        Shape::Save { inner: inner2, tag } => {
            let (rewritten, _) = rewrite_limit(*inner2, n, ctx);
            (
                Shape::Save {
                    inner: Box::new(rewritten),
                    tag,
                },
                true,
            )
        }
        other => {
            let (other, changed) = rewrite_once(other, ctx);
            (
                Shape::Limit {
                    inner: Box::new(other),
                    n,
                },
                changed,
            )
        }
    }
}

/// Rule 2: within an `And`, hoist one `LinksTo` optional child into the
/// mandatory side's `linkage`, provided the cost inequality from spec.md
/// §4.4 holds. Only one hoist happens per pass (re-running `optimize` picks
/// up any further opportunity, keeping this function simple).
fn rewrite_and(mandatory: Shape, optional: Vec<Shape>, ctx: &dyn PlanningContext) -> (Shape, bool) {
    let (mut mandatory, mut changed) = rewrite_once(mandatory, ctx);

    let mut new_optional = Vec::with_capacity(optional.len());
    let mut hoisted = false;

    for child in optional {
        let (child, c_changed) = rewrite_once(child, ctx);
        changed |= c_changed;

        if !hoisted {
            if let Some(rewritten) = try_hoist(&mandatory, &child, ctx) {
                mandatory = rewritten;
                hoisted = true;
                changed = true;
                continue;
            }
        }
        new_optional.push(child);
    }

    (
        Shape::And {
            mandatory: Box::new(mandatory),
            optional: new_optional,
        },
        changed,
    )
}

/// If `mandatory` and `candidate` are both un-linked `LinksTo`s and the cost
/// inequality favors driving the join from `mandatory`'s backend touch,
/// return `mandatory` with `candidate`'s constraint hoisted in as a linkage.
fn try_hoist(mandatory: &Shape, candidate: &Shape, ctx: &dyn PlanningContext) -> Option<Shape> {
    let (m_nodes, m_dir, m_linkage) = match mandatory {
        Shape::LinksTo { nodes, direction, linkage } => (nodes, *direction, linkage),
        _ => return None,
    };
    if m_linkage.is_some() {
        // Only one linkage slot; don't clobber an earlier hoist.
        return None;
    }
    let (c_dir, singleton) = match candidate {
        Shape::LinksTo { nodes, direction, linkage: None } => (*direction, singleton_ref(nodes)?),
        _ => return None,
    };

    let lto_stats = backend_touch_stats(mandatory, ctx);
    let rhs_stats = backend_touch_stats(candidate, ctx);

    // (lto.contains_cost + rhs.next_cost) * rhs.size <= (lto.next_cost + rhs.contains_cost) * lto.size
    let lhs = (lto_stats.contains_cost + rhs_stats.next_cost) * rhs_stats.size as f64;
    let rhs = (lto_stats.next_cost + rhs_stats.contains_cost) * lto_stats.size as f64;
    if lhs > rhs {
        return None;
    }

    Some(Shape::LinksTo {
        nodes: m_nodes.clone(),
        direction: m_dir,
        linkage: Some(Linkage { direction: c_dir, value: singleton }),
    })
}

/// Extract the one `Ref` a `Shape::Fixed([r])` carries, or `None` for
/// anything else (including a `Fixed` with more than one element, which
/// can't be hoisted as a single linkage value).
fn singleton_ref(nodes: &Shape) -> Option<Ref> {
    match nodes {
        Shape::Fixed(refs) if refs.len() == 1 => Some(refs[0].clone()),
        _ => None,
    }
}

struct TouchStats {
    next_cost: f64,
    contains_cost: f64,
    size: u64,
}

fn backend_touch_stats(shape: &Shape, ctx: &dyn PlanningContext) -> TouchStats {
    let size = ctx.size_of(shape).value.max(1);
    TouchStats {
        next_cost: qc_cost::NEXT_BACKEND_TOUCH,
        contains_cost: qc_cost::CONTAINS_BACKEND_TOUCH,
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_model::Hash128;

    fn fixed_ref(tag: &str) -> Ref {
        Ref::node(Hash128::of(tag.as_bytes()))
    }

    struct FakeSizes {
        follows_size: u64,
        b_size: u64,
    }

    impl PlanningContext for FakeSizes {
        fn size_of(&self, shape: &Shape) -> SizeEstimate {
            match shape {
                Shape::LinksTo { direction: Direction::Predicate, .. } => SizeEstimate::estimated(self.follows_size),
                Shape::LinksTo { direction: Direction::Object, .. } => SizeEstimate::estimated(self.b_size),
                _ => SizeEstimate::estimated(1_000),
            }
        }
    }

    #[test]
    fn hoists_the_cheaper_side_when_gate_holds() {
        // predicate=follows is much larger than object=B: driving from B and
        // checking "predicate == follows" as a linkage is cheaper.
        let ctx = FakeSizes { follows_size: 10_000, b_size: 3 };
        let shape = Shape::and(
            Shape::links_to(Shape::Fixed(vec![fixed_ref("follows")]), Direction::Predicate),
            vec![Shape::links_to(Shape::Fixed(vec![fixed_ref("B")]), Direction::Object)],
        );
        let optimized = optimize(shape, &ctx);
        match optimized {
            Shape::And { mandatory, optional } => {
                assert!(optional.is_empty(), "the Object LinksTo should have been hoisted away");
                match *mandatory {
                    Shape::LinksTo { direction: Direction::Predicate, linkage: Some(l), .. } => {
                        assert_eq!(l.direction, Direction::Object);
                        assert_eq!(l.value, fixed_ref("B"));
                    }
                    other => panic!("expected a linked Predicate LinksTo, got {other:?}"),
                }
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn does_not_hoist_when_gate_fails() {
        // Both sides equally large: the inequality is a non-strict tie, so the
        // default ordering (mandatory stays mandatory) is preserved without a
        // hoist because hoisting buys nothing.
        let ctx = FakeSizes { follows_size: 3, b_size: 10_000 };
        let shape = Shape::and(
            Shape::links_to(Shape::Fixed(vec![fixed_ref("follows")]), Direction::Predicate),
            vec![Shape::links_to(Shape::Fixed(vec![fixed_ref("B")]), Direction::Object)],
        );
        let optimized = optimize(shape, &ctx);
        match optimized {
            Shape::And { mandatory, optional } => {
                assert!(matches!(*mandatory, Shape::LinksTo { linkage: None, .. }));
                assert_eq!(optional.len(), 1);
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn nested_limits_collapse_to_the_tighter_bound() {
        let shape = Shape::AllNodes.limit(50).limit(10);
        let optimized = optimize(shape, &NoopContext);
        assert_eq!(optimized, Shape::AllNodes.limit(10));
    }

    #[test]
    fn limit_pushes_below_save() {
        let shape = Shape::AllNodes.save("x").limit(5);
        let optimized = optimize(shape, &NoopContext);
        assert_eq!(optimized, Shape::AllNodes.limit(5).save("x"));
    }

    #[test]
    fn leaves_without_opportunity_are_unchanged() {
        let shape = Shape::and(Shape::AllNodes, vec![]);
        let optimized = optimize(shape.clone(), &NoopContext);
        assert_eq!(optimized, shape);
    }
}
