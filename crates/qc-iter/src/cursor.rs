//! Turns a (possibly optimizer-rewritten) `Shape` into an executable cursor.
//!
//! The public surface on [`Cursor`] mirrors the scanner/index protocol
//! described by the algebra: `next`/`result`/`next_path` drive scanner
//! mode, `contains` drives index mode, `tag_results` reads back `Save`
//! bindings, and `err`/`close` handle fault and resource cleanup.

use crate::backend::{Backend, BackendCursor};
use crate::compare::compare;
use crate::error::IterError;
use crate::shape::{CompareOp, Linkage, Shape};
use crate::stats::{SizeEstimate, Stats};
use crate::tags::TagMap;
use qc_model::{Direction, Ref};
use rustc_hash::FxHashSet;

type IResult<T, B> = Result<T, IterError<<B as Backend>::Error>>;

/// An executable cursor built from a [`Shape`]. Holds a reference to the
/// backend it runs against for the duration of iteration.
pub struct Cursor<'b, B: Backend> {
    backend: &'b B,
    exec: Exec<B>,
    err: Option<IterError<B::Error>>,
    current: Option<Ref>,
}

impl<'b, B: Backend> Cursor<'b, B> {
    pub fn build(backend: &'b B, shape: &Shape) -> IResult<Self, B> {
        let exec = Exec::build(backend, shape)?;
        Ok(Cursor {
            backend,
            exec,
            err: None,
            current: None,
        })
    }

    /// Advance to the next result. Returns `false` on exhaustion or error;
    /// callers should check [`Cursor::err`] to distinguish the two.
    pub fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.exec.next(self.backend) {
            Ok(Some(r)) => {
                self.current = Some(r);
                true
            }
            Ok(None) => {
                self.current = None;
                false
            }
            Err(e) => {
                self.err = Some(e);
                self.current = None;
                false
            }
        }
    }

    /// The current result, valid after `next` returned `true`.
    pub fn result(&self) -> Option<&Ref> {
        self.current.as_ref()
    }

    /// Advance to an alternate binding for the current result (used by
    /// operators, like `Or`, that can reach the same result via more than
    /// one path). The base algebra here does not track multiple paths per
    /// result, so this always returns `false`; it exists so callers can
    /// write path-aware traversal code against the same interface a richer
    /// backend might offer.
    pub fn next_path(&mut self) -> bool {
        false
    }

    /// Index-mode probe: is `candidate` produced by this cursor?
    pub fn contains(&mut self, candidate: &Ref) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.exec.contains(self.backend, candidate) {
            Ok(b) => b,
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }

    /// Merge this cursor's `Save` bindings (if any, recursively) into `out`.
    pub fn tag_results(&self, out: &mut TagMap) {
        self.exec.tag_results(out);
    }

    pub fn err(&self) -> Option<&IterError<B::Error>> {
        self.err.as_ref()
    }

    pub fn close(&mut self) {
        self.exec.close();
    }

    pub fn stats(&self) -> Stats {
        self.exec.stats(self.backend)
    }
}

enum Exec<B: Backend> {
    AllNodes(B::Cursor),
    AllQuads(B::Cursor),
    Fixed(std::vec::IntoIter<Ref>),
    And {
        mandatory: Box<Exec<B>>,
        optional: Vec<Exec<B>>,
    },
    Or {
        children: Vec<Exec<B>>,
        index: usize,
        seen: FxHashSet<Ref>,
    },
    Not {
        inner: Box<Exec<B>>,
    },
    Except {
        from: Box<Exec<B>>,
        remove: Box<Exec<B>>,
    },
    HasA {
        quads: Box<Exec<B>>,
        direction: Direction,
        seen: FxHashSet<Ref>,
    },
    LinksTo {
        nodes: Box<Exec<B>>,
        direction: Direction,
        linkage: Option<Linkage>,
        sub: Option<B::Cursor>,
    },
    Save {
        inner: Box<Exec<B>>,
        tag: String,
        last: Option<Ref>,
    },
    Comparison {
        inner: Box<Exec<B>>,
        op: CompareOp,
        value: qc_model::Value,
    },
    Limit {
        inner: Box<Exec<B>>,
        remaining: u64,
    },
}

impl<B: Backend> Exec<B> {
    fn build(backend: &B, shape: &Shape) -> IResult<Self, B> {
        Ok(match shape {
            Shape::AllNodes => Exec::AllNodes(backend.nodes_all_iterator()),
            Shape::AllQuads => Exec::AllQuads(backend.quads_all_iterator()),
            Shape::Fixed(refs) => Exec::Fixed(refs.clone().into_iter()),
            Shape::Lookup(values) => {
                let mut refs = Vec::with_capacity(values.len());
                for v in values {
                    if let Some(r) = backend.ref_for_value(v).map_err(IterError::Backend)? {
                        refs.push(r);
                    }
                }
                Exec::Fixed(refs.into_iter())
            }
            Shape::And { mandatory, optional } => Exec::And {
                mandatory: Box::new(Exec::build(backend, mandatory)?),
                optional: optional
                    .iter()
                    .map(|s| Exec::build(backend, s))
                    .collect::<IResult<Vec<_>, B>>()?,
            },
            Shape::Or(children) => Exec::Or {
                children: children
                    .iter()
                    .map(|s| Exec::build(backend, s))
                    .collect::<IResult<Vec<_>, B>>()?,
                index: 0,
                seen: FxHashSet::default(),
            },
            Shape::Not(inner) => Exec::Not {
                inner: Box::new(Exec::build(backend, inner)?),
            },
            Shape::Except { from, remove } => Exec::Except {
                from: Box::new(Exec::build(backend, from)?),
                remove: Box::new(Exec::build(backend, remove)?),
            },
            Shape::HasA { quads, direction } => Exec::HasA {
                quads: Box::new(Exec::build(backend, quads)?),
                direction: *direction,
                seen: FxHashSet::default(),
            },
            Shape::LinksTo { nodes, direction, linkage } => Exec::LinksTo {
                nodes: Box::new(Exec::build(backend, nodes)?),
                direction: *direction,
                linkage: linkage.clone(),
                sub: None,
            },
            Shape::Save { inner, tag } => Exec::Save {
                inner: Box::new(Exec::build(backend, inner)?),
                tag: tag.clone(),
                last: None,
            },
            Shape::Comparison { inner, op, value } => Exec::Comparison {
                inner: Box::new(Exec::build(backend, inner)?),
                op: *op,
                value: value.clone(),
            },
            Shape::Limit { inner, n } => Exec::Limit {
                inner: Box::new(Exec::build(backend, inner)?),
                remaining: *n,
            },
            Shape::Optional(inner) => Exec::build(backend, inner)?,
        })
    }

    fn next(&mut self, backend: &B) -> IResult<Option<Ref>, B> {
        match self {
            Exec::AllNodes(c) | Exec::AllQuads(c) => c.next().map_err(IterError::Backend),
            Exec::Fixed(it) => Ok(it.next()),
            Exec::And { mandatory, optional } => loop {
                match mandatory.next(backend)? {
                    None => return Ok(None),
                    Some(candidate) => {
                        let mut all_ok = true;
                        for child in optional.iter_mut() {
                            if !child.contains(backend, &candidate)? {
                                all_ok = false;
                                break;
                            }
                        }
                        if all_ok {
                            return Ok(Some(candidate));
                        }
                    }
                }
            },
            Exec::Or { children, index, seen } => loop {
                if *index >= children.len() {
                    return Ok(None);
                }
                match children[*index].next(backend)? {
                    Some(candidate) => {
                        if seen.insert(candidate.clone()) {
                            return Ok(Some(candidate));
                        }
                    }
                    None => *index += 1,
                }
            },
            Exec::Not { .. } => Err(IterError::NotRequiresIndexContext),
            Exec::Except { from, remove } => loop {
                match from.next(backend)? {
                    None => return Ok(None),
                    Some(candidate) => {
                        if !remove.contains(backend, &candidate)? {
                            return Ok(Some(candidate));
                        }
                    }
                }
            },
            Exec::HasA { quads, direction, seen } => loop {
                match quads.next(backend)? {
                    None => return Ok(None),
                    Some(quad_ref) => {
                        if let Some(node_ref) =
                            backend.quad_direction(&quad_ref, *direction).map_err(IterError::Backend)?
                        {
                            if seen.insert(node_ref.clone()) {
                                return Ok(Some(node_ref));
                            }
                        }
                    }
                }
            },
            Exec::LinksTo { nodes, direction, linkage, sub } => loop {
                if let Some(cursor) = sub {
                    loop {
                        match cursor.next().map_err(IterError::Backend)? {
                            Some(quad_ref) => {
                                let passes = match linkage {
                                    None => true,
                                    Some(l) => {
                                        backend
                                            .quad_direction(&quad_ref, l.direction)
                                            .map_err(IterError::Backend)?
                                            .as_ref()
                                            == Some(&l.value)
                                    }
                                };
                                if passes {
                                    return Ok(Some(quad_ref));
                                }
                            }
                            None => {
                                *sub = None;
                                break;
                            }
                        }
                    }
                }
                match nodes.next(backend)? {
                    None => return Ok(None),
                    Some(node_ref) => {
                        *sub = Some(backend.quad_iterator(*direction, &node_ref));
                    }
                }
            },
            Exec::Save { inner, last, .. } => {
                let r = inner.next(backend)?;
                *last = r.clone();
                Ok(r)
            }
            Exec::Comparison { inner, op, value } => loop {
                match inner.next(backend)? {
                    None => return Ok(None),
                    Some(candidate) => {
                        let candidate_value = backend.value_of(&candidate).map_err(IterError::Backend)?;
                        match compare(&candidate_value, value) {
                            Some(ord) if op.eval_ordering(ord) => return Ok(Some(candidate)),
                            Some(_) => continue,
                            None => continue,
                        }
                    }
                }
            },
            Exec::Limit { inner, remaining } => {
                if *remaining == 0 {
                    return Ok(None);
                }
                match inner.next(backend)? {
                    Some(r) => {
                        *remaining -= 1;
                        Ok(Some(r))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn contains(&mut self, backend: &B, candidate: &Ref) -> IResult<bool, B> {
        match self {
            Exec::AllNodes(c) | Exec::AllQuads(c) => c.contains(candidate).map_err(IterError::Backend),
            Exec::Fixed(it) => Ok(it.as_slice().iter().any(|r| r == candidate)),
            Exec::And { mandatory, optional } => {
                if !mandatory.contains(backend, candidate)? {
                    return Ok(false);
                }
                for child in optional.iter_mut() {
                    if !child.contains(backend, candidate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Exec::Or { children, .. } => {
                for child in children.iter_mut() {
                    if child.contains(backend, candidate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Exec::Not { inner } => Ok(!inner.contains(backend, candidate)?),
            Exec::Except { from, remove } => {
                Ok(from.contains(backend, candidate)? && !remove.contains(backend, candidate)?)
            }
            Exec::HasA { .. } => Err(IterError::HasARequiresScannerContext),
            Exec::LinksTo { direction, linkage, .. } => {
                let node_ref = match backend.quad_direction(candidate, *direction).map_err(IterError::Backend)? {
                    Some(r) => r,
                    None => return Ok(false),
                };
                if let Some(l) = linkage {
                    let linked = backend.quad_direction(candidate, l.direction).map_err(IterError::Backend)?;
                    if linked.as_ref() != Some(&l.value) {
                        return Ok(false);
                    }
                }
                let _ = node_ref;
                Ok(true)
            }
            Exec::Save { inner, last, .. } => {
                let ok = inner.contains(backend, candidate)?;
                if ok {
                    *last = Some(candidate.clone());
                }
                Ok(ok)
            }
            Exec::Comparison { inner, op, value } => {
                if !inner.contains(backend, candidate)? {
                    return Ok(false);
                }
                let candidate_value = backend.value_of(candidate).map_err(IterError::Backend)?;
                Ok(compare(&candidate_value, value).map(|ord| op.eval_ordering(ord)).unwrap_or(false))
            }
            Exec::Limit { inner, remaining } => {
                if *remaining == 0 {
                    Ok(false)
                } else {
                    inner.contains(backend, candidate)
                }
            }
        }
    }

    fn tag_results(&self, out: &mut TagMap) {
        match self {
            Exec::Save { inner, tag, last } => {
                inner.tag_results(out);
                if let Some(r) = last {
                    out.insert(tag.clone(), r.clone());
                }
            }
            Exec::And { mandatory, optional } => {
                mandatory.tag_results(out);
                for child in optional {
                    child.tag_results(out);
                }
            }
            Exec::Except { from, remove } => {
                from.tag_results(out);
                remove.tag_results(out);
            }
            Exec::HasA { quads, .. } => quads.tag_results(out),
            Exec::LinksTo { nodes, .. } => nodes.tag_results(out),
            Exec::Comparison { inner, .. } | Exec::Limit { inner, .. } | Exec::Not { inner } => {
                inner.tag_results(out)
            }
            Exec::Or { children, .. } => {
                for child in children {
                    child.tag_results(out);
                }
            }
            Exec::AllNodes(_) | Exec::AllQuads(_) | Exec::Fixed(_) => {}
        }
    }

    fn close(&mut self) {
        match self {
            Exec::And { mandatory, optional } => {
                mandatory.close();
                optional.iter_mut().for_each(Exec::close);
            }
            Exec::Or { children, .. } => children.iter_mut().for_each(Exec::close),
            Exec::Not { inner }
            | Exec::Comparison { inner, .. }
            | Exec::Limit { inner, .. }
            | Exec::Save { inner, .. } => inner.close(),
            Exec::Except { from, remove } => {
                from.close();
                remove.close();
            }
            Exec::HasA { quads, .. } => quads.close(),
            Exec::LinksTo { nodes, .. } => nodes.close(),
            Exec::AllNodes(_) | Exec::AllQuads(_) | Exec::Fixed(_) => {}
        }
    }

    fn stats(&self, backend: &B) -> Stats {
        match self {
            Exec::AllNodes(c) | Exec::AllQuads(c) => {
                Stats::new(qc_cost::NEXT_BACKEND_TOUCH, qc_cost::CONTAINS_BACKEND_TOUCH, c.size_hint())
            }
            Exec::Fixed(it) => {
                let remaining = it.as_slice().len() as u64;
                Stats::new(
                    qc_cost::FIXED_OPEN_OVERHEAD,
                    qc_cost::HASH_LOOKUP,
                    SizeEstimate::exact(remaining),
                )
            }
            Exec::And { mandatory, optional } => {
                let mut s = mandatory.stats(backend);
                for child in optional {
                    s = Stats::and_with_check(s, child.stats(backend));
                }
                s
            }
            Exec::Or { children, .. } => {
                let child_stats: Vec<Stats> = children.iter().map(|c| c.stats(backend)).collect();
                Stats::or(&child_stats)
            }
            Exec::Not { inner } => inner.stats(backend),
            Exec::Except { from, remove } => Stats::and_with_check(from.stats(backend), remove.stats(backend)),
            Exec::HasA { quads, .. } => {
                let inner = quads.stats(backend);
                Stats::new(inner.next_cost, inner.contains_cost, inner.size)
            }
            Exec::LinksTo { nodes, .. } => {
                let inner = nodes.stats(backend);
                Stats::new(
                    inner.next_cost + qc_cost::NEXT_BACKEND_TOUCH,
                    inner.contains_cost + qc_cost::CONTAINS_BACKEND_TOUCH,
                    inner.size,
                )
            }
            Exec::Save { inner, .. } => inner.stats(backend),
            Exec::Comparison { inner, .. } => {
                let mut s = inner.stats(backend);
                s.next_cost += qc_cost::COMPARISON_PER_ITEM;
                s.size = s.size.scale(0.5);
                s
            }
            Exec::Limit { inner, remaining } => {
                let mut s = inner.stats(backend);
                s.size = s.size.capped(*remaining);
                s
            }
        }
    }
}
