// tests/inputs.rs
mod common;

use common::{run, with_variables};
use serde_json::json;
use typegraph::{ClassDef, Method, Namespace, Param, Value, make_schema, root_request};

#[tokio::test]
async fn records_are_built_from_input_objects() {
    let point = ClassDef::build("Point")
        .record()
        .annotate("x", "int")
        .attr("y", "int", 0)
        .annotate("label", "Optional[str]")
        .finish();
    let query = ClassDef::build("Query")
        .object()
        .method(
            Method::new("describe", "str", |_, args| {
                let p = args.require("p")?;
                let x = p.getattr("x")?.as_int().unwrap_or_default();
                let y = p.getattr("y")?.as_int().unwrap_or_default();
                let label = p.getattr("label")?;
                Ok(Value::from(format!("{}({x}, {y})", label.as_str().unwrap_or("point"))))
            })
            .param(Param::new("p", "Point")),
        )
        .method(
            Method::new("count", "int", |_, args| {
                Ok(Value::Int(args.require("points")?.as_list().map_or(0, |l| l.len() as i64)))
            })
            .param(Param::new("points", "List[Point]")),
        )
        .finish();

    let schema = make_schema(Namespace::with_classes([&point]), &query, None, []).unwrap();
    let input = schema.get_type("Point").unwrap().as_input().unwrap();
    let fields: Vec<_> = input.fields().iter().map(|(n, f)| format!("{n}: {}", f.ty)).collect();
    assert_eq!(fields, ["x: Int!", "y: Int!", "label: String"]);

    let executable = schema.executable().unwrap();
    let root = Value::object(&query, Vec::<(&str, Value)>::new());
    let data = run(
        &executable,
        r#"{ a: describe(p: {x: 1, y: 2, label: "origin"}) b: describe(p: {x: 3, y: 4, label: null}) }"#,
        root.clone(),
    )
    .await;
    assert_eq!(data, json!({"a": "origin(1, 2)", "b": "point(3, 4)"}));

    // A single input where a list is expected is coerced to a one-item list.
    let request = with_variables(
        "query($ps: [Point!]!) { many: count(points: $ps) one: count(points: {x: 1, y: 1, label: null}) }",
        json!({"ps": [{"x": 1, "y": 1, "label": null}, {"x": 2, "y": 2, "label": null}]}),
    );
    assert_eq!(run(&executable, request, root.clone()).await, json!({"many": 2, "one": 1}));

    let response = executable.execute(root_request("{ describe(p: {y: 2}) }", root)).await;
    assert!(!response.errors.is_empty(), "x is required");
}
