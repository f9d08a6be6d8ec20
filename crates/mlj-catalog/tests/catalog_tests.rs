//! Catalog integration tests
//!
//! Cross-checks the function catalog, field combination and the sparse
//! substitution table against each other.

use mlj_catalog::sparse::{has_sparse_variant, is_sparse_variant};
use mlj_catalog::{
    apply_sparse, catalog, combine_fields_and_aggs, AggregationId, AggregationKind, Field,
    FieldType,
};
use proptest::prelude::*;

#[test]
fn sparse_variants_keep_their_kind() {
    for agg in catalog() {
        let sparse = apply_sparse(agg.id, true);
        assert_eq!(sparse.aggregation().kind, agg.kind, "{}", agg.id);
    }
}

#[test]
fn exactly_six_functions_have_sparse_variants() {
    let standard = AggregationId::ALL.iter().filter(|id| has_sparse_variant(**id)).count();
    let sparse = AggregationId::ALL.iter().filter(|id| is_sparse_variant(**id)).count();
    assert_eq!(standard, 6);
    assert_eq!(sparse, 6);
}

#[test]
fn count_functions_never_get_fields() {
    let fields = FieldType::ALL
        .iter()
        .map(|t| Field::new(format!("f_{t}"), *t))
        .collect();
    let caps = combine_fields_and_aggs(fields, catalog());
    for agg in catalog().iter().filter(|a| a.kind == AggregationKind::Count) {
        assert!(caps.fields_for(agg.id).is_empty(), "{}", agg.id);
    }
}

proptest! {
    #[test]
    fn prop_field_aggs_match_reverse_index(type_idx in 0usize..FieldType::ALL.len()) {
        let field_type = FieldType::ALL[type_idx];
        let caps = combine_fields_and_aggs(vec![Field::new("f", field_type)], catalog());
        let field = caps.field("f").unwrap();
        for agg in catalog() {
            let listed = caps.fields_for(agg.id).iter().any(|id| id == "f");
            prop_assert_eq!(listed, field.supports(agg.id));
        }
    }
}
