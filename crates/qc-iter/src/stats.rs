pub use qc_cost::SizeEstimate;

/// The cost/size profile an operator reports about itself, used by the
/// optimizer to pick between rewrite candidates and by `And` to decide
/// which child becomes the scanner-mode primary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    /// Relative cost of one `next()` call.
    pub next_cost: f64,
    /// Relative cost of one `contains()` call.
    pub contains_cost: f64,
    /// How many results this iterator is expected to produce.
    pub size: SizeEstimate,
}

impl Stats {
    pub fn new(next_cost: f64, contains_cost: f64, size: SizeEstimate) -> Self {
        Stats {
            next_cost,
            contains_cost,
            size,
        }
    }

    /// Combine the stats of an `And`'s primary iterator with one optional
    /// check iterator: scanning the primary still costs the same per call,
    /// but each result now also pays the check's contains cost, and the
    /// expected size shrinks by intersection.
    pub fn and_with_check(primary: Stats, check: Stats) -> Stats {
        Stats {
            next_cost: primary.next_cost + check.contains_cost,
            contains_cost: primary.contains_cost + check.contains_cost,
            size: primary.size.intersect(check.size),
        }
    }

    pub fn or(children: &[Stats]) -> Stats {
        let next_cost = children.iter().map(|s| s.next_cost).sum::<f64>().max(qc_cost::FIXED_OPEN_OVERHEAD);
        let contains_cost = children.iter().map(|s| s.contains_cost).sum();
        let size = children
            .iter()
            .map(|s| s.size)
            .reduce(|a, b| a.union(b))
            .unwrap_or(SizeEstimate::exact(0));
        Stats::new(next_cost, contains_cost, size)
    }
}
