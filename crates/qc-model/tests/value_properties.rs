use proptest::prelude::*;
use qc_model::Value;

proptest! {
    #[test]
    fn int_content_hash_is_deterministic(v in any::<i64>()) {
        let a = Value::int(v);
        let b = Value::int(v);
        prop_assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn distinct_ints_rarely_collide(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        prop_assert_ne!(Value::int(a).content_hash(), Value::int(b).content_hash());
    }

    #[test]
    fn iri_and_plain_string_never_collide(s in "[a-zA-Z0-9/:.]{1,40}") {
        prop_assume!(!s.is_empty());
        let iri = Value::iri(s.clone()).unwrap();
        let plain = Value::string(s);
        prop_assert_ne!(iri.content_hash(), plain.content_hash());
    }
}
