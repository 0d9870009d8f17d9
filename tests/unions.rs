// tests/unions.rs
mod common;

use common::run;
use serde_json::json;
use typegraph::{ClassDef, Method, Namespace, Param, SchemaError, Value, make_schema};

#[tokio::test]
async fn named_and_optional_unions_resolve_members() {
    let cat = ClassDef::build("Cat").object().annotate("meows", "int").finish();
    let dog = ClassDef::build("Dog").object().annotate("barks", "int").finish();
    let pick_cat = cat.clone();
    let pick_dog = dog.clone();
    let query = ClassDef::build("Query")
        .object()
        .method(
            Method::new("pet", "Pet", move |_, args| {
                Ok(match args.require("kind")?.as_str() {
                    Some("cat") => Value::object(&pick_cat, [("meows", Value::from(3))]),
                    _ => Value::object(&pick_dog, [("barks", Value::from(5))]),
                })
            })
            .param(Param::new("kind", "str")),
        )
        .method(Method::new("maybePet", "Optional[Pet]", |_, _| Ok(Value::Null)))
        .method(Method::new("pets", "List[Pet]", {
            let (cat, dog) = (cat.clone(), dog.clone());
            move |_, _| {
                Ok(Value::List(vec![
                    Value::object(&dog, [("barks", Value::from(1))]),
                    Value::object(&cat, [("meows", Value::from(2))]),
                ]))
            }
        }))
        .finish();
    let mut ns = Namespace::with_classes([&cat, &dog]);
    ns.bind("Pet", "Union[Cat, Dog]");

    let schema = make_schema(ns, &query, None, []).unwrap();
    let fields = schema.query().fields();
    assert_eq!(fields["pet"].ty.to_string(), "Pet!");
    assert_eq!(fields["maybePet"].ty.to_string(), "Pet");
    assert_eq!(fields["pets"].ty.to_string(), "[Pet!]!");
    let pet = schema.get_type("Pet").unwrap();
    assert_eq!(pet.description(), Some("One of: Cat, Dog."));

    let executable = schema.executable().unwrap();
    let root = Value::object(&query, Vec::<(&str, Value)>::new());
    let query_text = r#"{
        cat: pet(kind: "cat") { __typename ...on Cat { meows } }
        dog: pet(kind: "dog") { __typename ...on Dog { barks } }
        maybePet { __typename }
        pets { __typename }
    }"#;
    let data = run(&executable, query_text, root).await;
    assert_eq!(
        data,
        json!({
            "cat": {"__typename": "Cat", "meows": 3},
            "dog": {"__typename": "Dog", "barks": 5},
            "maybePet": null,
            "pets": [{"__typename": "Dog"}, {"__typename": "Cat"}],
        })
    );
}

#[test]
fn optional_of_a_single_type_is_not_a_union() {
    let cat = ClassDef::build("Cat").object().annotate("meows", "int").finish();
    let query = ClassDef::build("Query").object().annotate("cat", "Union[Cat, None]").finish();
    let schema = make_schema(Namespace::with_classes([&cat]), &query, None, []).unwrap();
    assert_eq!(schema.query().fields()["cat"].ty.to_string(), "Cat");
    assert!(schema.type_map().values().all(|t| t.as_union().is_none()));
}

#[test]
fn bare_union_without_a_name_is_an_error() {
    let query = ClassDef::build("Query").object().annotate("either", "Union[int, str]").finish();
    let err = make_schema(Namespace::new(), &query, None, []).unwrap_err();
    assert!(matches!(err, SchemaError::UnnamedUnion { .. }), "got: {err}");
    assert!(err.to_string().contains("Defined at Query.either"), "got: {err}");
}
