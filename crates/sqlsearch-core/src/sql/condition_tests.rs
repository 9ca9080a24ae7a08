//! Tests for the statement model.

use serde_json::json;

use super::*;

#[test]
fn test_unwrap_single_collapses_chain() {
    let leaf = Where::from(Condition::eq("age", 30));
    let chain = Where::and(vec![Where::and(vec![Where::and(vec![leaf.clone()])])]);

    assert_eq!(chain.unwrap_single(), &leaf);
}

#[test]
fn test_unwrap_single_stops_at_multi_child_group() {
    let group = Where::and(vec![
        Condition::eq("a", 1).into(),
        Condition::eq("b", 2).into(),
    ]);
    let chain = Where::and(vec![group.clone()]);

    assert_eq!(chain.unwrap_single(), &group);
}

#[test]
fn test_group_helpers_set_child_connectors() {
    let group = Where::or(vec![Condition::eq("a", 1).into(), Condition::eq("b", 2).into()]);
    let Where::Group { connector, children } = &group else {
        panic!("expected group");
    };
    assert_eq!(*connector, Connector::And);
    assert!(children.iter().all(|c| c.connector() == Connector::Or));
}

#[test]
fn test_connector_accessors() {
    let leaf = Where::from(Condition::eq("a", 1).or());
    assert_eq!(leaf.connector(), Connector::Or);

    let group = Where::and(vec![]).with_connector(Connector::Or);
    assert_eq!(group.connector(), Connector::Or);
}

#[test]
fn test_scope_builders_are_exclusive() {
    let c = Condition::eq("message.info", "x").nested("message").child("comment");
    assert_eq!(
        c.scope,
        Scope::Child {
            child_type: "comment".to_string()
        }
    );
}

#[test]
fn test_operator_swapped() {
    assert_eq!(Operator::Gt.swapped(), Some(Operator::Lt));
    assert_eq!(Operator::Lte.swapped(), Some(Operator::Gte));
    assert_eq!(Operator::Eq.swapped(), Some(Operator::Eq));
    assert_eq!(Operator::Like.swapped(), None);
}

#[test]
fn test_condition_display() {
    assert_eq!(Condition::eq("age", 30).to_string(), "age = 30");
    assert_eq!(
        Condition::between("age", 20, 30).to_string(),
        "age BETWEEN 20 AND 30"
    );
    assert_eq!(
        Condition::is_in("state", vec![json!("CA"), json!("NY")]).to_string(),
        "state IN (\"CA\", \"NY\")"
    );
    assert_eq!(
        Condition::fields("a.k", Operator::Gte, "b.k").to_string(),
        "a.k >= b.k"
    );
    assert_eq!(Condition::is_null("x").to_string(), "x IS NULL");
}

#[test]
fn test_for_each_condition_visits_in_order() {
    let tree = Where::and(vec![
        Condition::eq("a", 1).into(),
        Where::or(vec![Condition::eq("b", 2).into(), Condition::eq("c", 3).or().into()]),
    ]);
    let mut seen = Vec::new();
    tree.for_each_condition(&mut |c| seen.push(c.field.clone()));

    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[test]
fn test_join_select_resolve() {
    let join = JoinSelect::new(
        TableRef::new("users", "u"),
        TableRef::new("orders", "o"),
        vec![Condition::fields("u.id", Operator::Eq, "o.user_id")],
    );

    assert_eq!(join.resolve("u.id"), Some((TableSide::First, "id")));
    assert_eq!(join.resolve("o.user_id"), Some((TableSide::Second, "user_id")));
    assert_eq!(join.resolve("id"), None);
    assert_eq!(join.resolve("uu.id"), None);
}

#[test]
fn test_field_type_compatibility() {
    assert!(FieldType::Long.compatible_with(FieldType::Double));
    assert!(FieldType::Keyword.compatible_with(FieldType::Text));
    assert!(FieldType::Date.compatible_with(FieldType::Long));
    assert!(!FieldType::Long.compatible_with(FieldType::Keyword));
    assert!(!FieldType::Boolean.compatible_with(FieldType::Long));
    assert!(!FieldType::Geo.compatible_with(FieldType::Geo));
}

#[test]
fn test_select_orders_by_score() {
    let mut select = Select {
        table: TableRef::new("accounts", "a"),
        ..Select::default()
    };
    assert!(!select.orders_by_score());

    select.order_by.push(OrderBy {
        field: "_score".to_string(),
        order: SortOrder::Desc,
    });
    assert!(select.orders_by_score());
}
