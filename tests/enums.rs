// tests/enums.rs
mod common;

use common::{run, with_variables};
use serde_json::json;
use typegraph::{ClassDef, ClassRef, Method, Namespace, Param, Value, make_schema};

fn number_schema() -> (ClassRef, ClassRef) {
    let number = ClassDef::build("Number").enumeration().variant("ONE", 1).variant("TWO", 2).finish();
    let query = ClassDef::build("Query")
        .object()
        .method(
            Method::new("describe", "str", |_, args| {
                let member = args.require("n")?.as_enum().cloned();
                Ok(match member {
                    Some(m) => Value::from(format!("{}={:?}", m.name(), m.value())),
                    None => Value::from("not a member"),
                })
            })
            .param(Param::new("n", "Number")),
        )
        .method(Method::new("first", "Number", {
            let number = number.clone();
            move |_, _| Ok(number.variant("ONE").unwrap_or_default())
        }))
        .method(Method::new("raw", "List[Number]", |_, _| Ok(Value::from(vec![2, 1]))))
        .finish();
    (number, query)
}

#[tokio::test]
async fn enum_values_round_trip_by_name() {
    let (number, query) = number_schema();
    let ns = Namespace::with_classes([&number]);
    let schema = make_schema(ns, &query, None, []).unwrap();

    let enum_node = schema.get_type("Number").unwrap().as_enum().unwrap();
    let names: Vec<_> = enum_node.values.keys().cloned().collect();
    assert_eq!(names, ["ONE", "TWO"]);

    let executable = schema.executable().unwrap();
    let root = Value::object(&query, Vec::<(&str, Value)>::new());
    let data = run(&executable, "{ describe(n: ONE) first raw }", root.clone()).await;
    assert_eq!(data, json!({"describe": "ONE=1", "first": "ONE", "raw": ["TWO", "ONE"]}));

    let request = with_variables("query($n: Number!) { describe(n: $n) }", json!({"n": "TWO"}));
    assert_eq!(run(&executable, request, root).await, json!({"describe": "TWO=2"}));
}
