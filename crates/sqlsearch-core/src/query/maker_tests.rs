//! Tests for the predicate compiler.

use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::sql::{Condition, Operator, Where};

#[test]
fn test_and_with_or_group() {
    // Arrange: age = 30 AND (state = 'CA' OR state = 'NY')
    let tree = Where::and(vec![
        Condition::eq("age", 30).into(),
        Where::or(vec![
            Condition::eq("state", "CA").into(),
            Condition::eq("state", "NY").into(),
        ]),
    ]);

    // Act
    let query = QueryMaker::compile(&tree, false).unwrap();

    // Assert
    assert_eq!(
        query.to_json(),
        json!({
            "bool": {
                "must": [
                    { "term": { "age": 30 } },
                    { "bool": { "should": [
                        { "term": { "state": "CA" } },
                        { "term": { "state": "NY" } }
                    ] } }
                ]
            }
        })
    );
}

#[test]
fn test_or_leaves_go_to_should() {
    let tree = Where::or(vec![
        Condition::eq("a", 1).into(),
        Condition::eq("b", 2).into(),
    ]);

    let query = QueryMaker::compile(&tree, false).unwrap();

    assert!(query.must.is_empty());
    assert_eq!(query.should.len(), 2);
}

#[test]
fn test_single_leaf_root() {
    let query = QueryMaker::compile(&Condition::eq("a", 1).into(), false).unwrap();
    assert_eq!(query.to_json(), json!({ "bool": { "must": [ { "term": { "a": 1 } } ] } }));
}

#[test]
fn test_filter_mode_wraps_tree() {
    let tree = Where::from(Condition::eq("a", 1));

    let query = QueryMaker::compile(&tree, true).unwrap();

    assert_eq!(
        query.to_json(),
        json!({ "bool": { "filter": [
            { "bool": { "must": [ { "term": { "a": 1 } } ] } }
        ] } })
    );
}

#[test]
fn test_compile_optional_none_matches_all() {
    let query = QueryMaker::compile_optional(None, true).unwrap();
    assert_eq!(query.to_json(), json!({ "bool": { "filter": [ { "match_all": {} } ] } }));
}

#[test]
fn test_nested_scope_wraps_leaf() {
    let tree = Where::from(Condition::eq("message.info", "a").nested("message"));

    let query = QueryMaker::compile(&tree, false).unwrap();

    assert_eq!(
        query.must[0].to_json(),
        json!({ "nested": {
            "path": "message",
            "query": { "term": { "message.info": "a" } }
        } })
    );
}

#[test]
fn test_child_scope_wraps_leaf() {
    let query =
        QueryMaker::make_condition(&Condition::eq("author", "x").child("comment")).unwrap();

    assert_eq!(
        query.to_json(),
        json!({ "has_child": {
            "type": "comment",
            "query": { "term": { "author": "x" } }
        } })
    );
}

#[test]
fn test_primitive_shapes() {
    let cases = vec![
        (
            Condition::compare("a", Operator::Neq, 1),
            json!({ "bool": { "must_not": [ { "term": { "a": 1 } } ] } }),
        ),
        (
            Condition::compare("a", Operator::Gt, 1),
            json!({ "range": { "a": { "gt": 1 } } }),
        ),
        (
            Condition::compare("a", Operator::Lte, 9),
            json!({ "range": { "a": { "lte": 9 } } }),
        ),
        (
            Condition::between("age", 20, 30),
            json!({ "range": { "age": { "gte": 20, "lte": 30 } } }),
        ),
        (
            Condition::like("name", "jo%n_"),
            json!({ "wildcard": { "name": "jo*n?" } }),
        ),
        (
            Condition::is_in("s", vec![json!("CA"), json!("NY")]),
            json!({ "terms": { "s": ["CA", "NY"] } }),
        ),
        (
            Condition::is_null("x"),
            json!({ "bool": { "must_not": [ { "exists": { "field": "x" } } ] } }),
        ),
        (
            Condition::new("x", Operator::IsNotNull, vec![]),
            json!({ "exists": { "field": "x" } }),
        ),
        (
            Condition::compare("place", Operator::GeoIntersects, "POINT (30 10)"),
            json!({ "geo_shape": { "place": {
                "shape": "POINT (30 10)",
                "relation": "intersects"
            } } }),
        ),
    ];

    for (condition, expected) in cases {
        let query = QueryMaker::make_primitive(&condition).unwrap();
        assert_eq!(query.to_json(), expected, "condition: {condition}");
    }
}

#[test]
fn test_negated_operators_wrap_in_must_not() {
    for op in [Operator::NotIn, Operator::NotBetween, Operator::NotLike] {
        let operands = match op {
            Operator::NotLike => vec![Operand::Literal(json!("a%"))],
            _ => vec![Operand::Literal(json!(1)), Operand::Literal(json!(2))],
        };
        let query = QueryMaker::make_primitive(&Condition::new("f", op, operands)).unwrap();
        let QueryDsl::Bool(b) = query else {
            panic!("{op} should compile to a bool query");
        };
        assert_eq!(b.must_not.len(), 1);
        assert!(b.must.is_empty() && b.should.is_empty());
    }
}

#[test]
fn test_malformed_predicates() {
    let cases = vec![
        Condition::new("a", Operator::Eq, vec![]),
        Condition::new(
            "a",
            Operator::Gt,
            vec![Operand::Literal(json!(1)), Operand::Literal(json!(2))],
        ),
        Condition::new("a", Operator::Between, vec![Operand::Literal(json!(1))]),
        Condition::new("a", Operator::In, vec![]),
        Condition::new("a", Operator::IsNull, vec![Operand::Literal(json!(1))]),
        Condition::compare("a", Operator::Like, 5),
        Condition::compare("a", Operator::GeoIntersects, 5),
        Condition::compare("a", Operator::Eq, json!(null)),
        Condition::compare("a", Operator::Eq, json!([1, 2])),
        Condition::fields("a.x", Operator::Eq, "b.y"),
        Condition::eq("", 1),
    ];

    for condition in cases {
        let err = QueryMaker::make_primitive(&condition).unwrap_err();
        assert_eq!(err.code(), "SQLS-001", "condition: {condition}");
    }
}

#[test]
fn test_malformed_leaf_fails_whole_compile() {
    let tree = Where::and(vec![
        Condition::eq("a", 1).into(),
        Condition::new("b", Operator::Between, vec![]).into(),
    ]);
    assert!(matches!(
        QueryMaker::compile(&tree, false),
        Err(Error::MalformedPredicate { field, .. }) if field == "b"
    ));
}

#[test]
fn test_like_to_wildcard_escapes() {
    assert_eq!(like_to_wildcard("a%b_c"), "a*b?c");
    assert_eq!(like_to_wildcard(r"100\%"), "100%");
    assert_eq!(like_to_wildcard(r"a\_b"), "a_b");
    assert_eq!(like_to_wildcard("what?*"), r"what\?\*");
}

fn wrap_chain(leaf: Where, depth: usize) -> Where {
    (0..depth).fold(leaf, |node, _| Where::and(vec![node]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Wrapping a tree in single-child groups never changes its query.
    #[test]
    fn prop_single_child_chains_collapse(
        depth in 0usize..8,
        value in any::<i64>(),
        or_group in any::<bool>(),
    ) {
        let inner = if or_group {
            Where::or(vec![Condition::eq("a", value).into(), Condition::eq("b", value).into()])
        } else {
            Where::from(Condition::eq("a", value))
        };

        let plain = QueryMaker::compile(&inner, false).unwrap();
        let wrapped = QueryMaker::compile(&wrap_chain(inner, depth), false).unwrap();

        prop_assert_eq!(plain, wrapped);
    }

    /// Scope wrappers only ever appear directly around leaf primitives.
    #[test]
    fn prop_scope_wraps_exactly_one_leaf(path in "[a-z]{1,8}", value in any::<i32>()) {
        let condition = Condition::eq(format!("{path}.x"), value).nested(path.clone());
        let query = QueryMaker::make_condition(&condition).unwrap();

        match query {
            QueryDsl::Nested { path: p, query } => {
                prop_assert_eq!(p, path);
                let is_term = matches!(*query, QueryDsl::Term { .. });
                prop_assert!(is_term);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    /// Filter mode and query mode compile the same tree.
    #[test]
    fn prop_filter_mode_holds_query_tree(values in prop::collection::vec(any::<u16>(), 1..6)) {
        let tree = Where::or(values.iter().map(|v| Condition::eq("f", *v).into()).collect());

        let scoring = QueryMaker::compile(&tree, false).unwrap();
        let filtering = QueryMaker::compile(&tree, true).unwrap();

        prop_assert_eq!(filtering.filter.len(), 1);
        prop_assert_eq!(&filtering.filter[0], &QueryDsl::Bool(scoring));
    }
}
