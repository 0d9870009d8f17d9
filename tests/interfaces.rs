// tests/interfaces.rs
mod common;

use common::run;
use serde_json::json;
use typegraph::{ClassDef, Method, Namespace, Property, Value, make_schema};

#[tokio::test]
async fn unreferenced_implementer_is_served_through_its_interface() {
    let shape = ClassDef::build("Shape")
        .interface()
        .doc("Something with an area.")
        .property(Property::new("area", "float", |me| {
            let side = me.getattr("side")?.as_float().unwrap_or_default();
            let kind = me.class();
            Ok(Value::Float(if kind.name() == "Triangle" { side * side / 2.0 } else { side * side }))
        }))
        .finish();
    let square = ClassDef::build("Square").extends(&shape).object().annotate("side", "float").finish();
    let triangle = ClassDef::build("Triangle").extends(&shape).object().annotate("side", "float").finish();

    let all = [
        Value::object(&square, [("side", Value::from(2.0))]),
        Value::object(&triangle, [("side", Value::from(3.0))]),
    ];
    let query = ClassDef::build("Query")
        .object()
        .method(Method::new("square", "Square", {
            let first = all[0].clone();
            move |_, _| Ok(first.clone())
        }))
        .method(Method::new("shapes", "List[Shape]", move |_, _| Ok(Value::List(all.to_vec()))))
        .finish();

    let ns = Namespace::with_classes([&shape, &square, &triangle]);
    let schema = make_schema(ns, &query, None, []).unwrap();
    assert!(schema.get_type("Triangle").is_some(), "Triangle is only reachable through discovery");
    assert!(schema.types().iter().any(|t| t.name() == "Triangle"));

    let executable = schema.executable().unwrap();
    let root = Value::object(&query, Vec::<(&str, Value)>::new());
    let data = run(&executable, "{ shapes { __typename area ...on Triangle { side } } }", root).await;
    assert_eq!(
        data,
        json!({"shapes": [
            {"__typename": "Square", "area": 4.0},
            {"__typename": "Triangle", "area": 4.5, "side": 3.0},
        ]})
    );
}

#[test]
fn three_level_chain_is_discovered() {
    // Query -> Leaf (implements A); Middle implements A and B; Hidden
    // implements B only and is reachable through Middle's interface.
    let a = ClassDef::build("A").interface().annotate("a", "int").finish();
    let b = ClassDef::build("B").interface().annotate("b", "int").finish();
    let leaf = ClassDef::build("Leaf").extends(&a).object().finish();
    let middle = ClassDef::build("Middle").extends(&a).extends(&b).object().finish();
    let hidden = ClassDef::build("Hidden").extends(&b).object().finish();
    let query = ClassDef::build("Query").object().annotate("leaf", "Leaf").finish();

    let ns = Namespace::with_classes([&a, &b, &leaf, &middle, &hidden]);
    let schema = make_schema(ns, &query, None, []).unwrap();
    let hidden_node = schema.get_type("Hidden").expect("Hidden must be discovered");
    let interfaces: Vec<_> =
        hidden_node.as_object().unwrap().interfaces().iter().map(|i| i.name().to_string()).collect();
    assert_eq!(interfaces, ["B"]);

    let middle_node = schema.get_type("Middle").unwrap();
    assert_eq!(middle_node.fields().keys().collect::<Vec<_>>(), ["b", "a"], "hints of later bases come first");
}
