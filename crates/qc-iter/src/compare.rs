use qc_model::Value;
use std::cmp::Ordering;

/// Compare two node values for use by the `Comparison` operator.
///
/// Only like-typed pairs compare meaningfully; `Int`/`Float` compare
/// numerically against each other (mixed int/float is allowed, anything
/// else is not comparable), `String`/`Iri`/`BNode` compare lexically
/// against their own kind, and `Time` compares chronologically.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Iri(x), Value::Iri(y)) => Some(x.cmp(y)),
        (Value::BNode(x), Value::BNode(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        (Value::TypedString { value: x, datatype: dx }, Value::TypedString { value: y, datatype: dy })
            if dx == dy =>
        {
            Some(x.cmp(y))
        }
        (Value::LangString { value: x, lang: lx }, Value::LangString { value: y, lang: ly }) if lx == ly => {
            Some(x.cmp(y))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_vs_float_numeric() {
        assert_eq!(compare(&Value::Int(2), &Value::Float(2.5)), Some(Ordering::Less));
    }

    #[test]
    fn mismatched_kinds_incomparable() {
        assert_eq!(compare(&Value::Int(1), &Value::String("1".into())), None);
    }

    #[test]
    fn strings_compare_lexically() {
        assert_eq!(
            compare(&Value::String("a".into()), &Value::String("b".into())),
            Some(Ordering::Less)
        );
    }
}
