use qc_model::Ref;
use rustc_hash::FxHashMap;

/// The set of named bindings a `Save` operator has attached to the current
/// result, keyed by tag name.
pub type TagMap = FxHashMap<String, Ref>;
