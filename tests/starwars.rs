// tests/starwars.rs
mod common;

use common::{run, starwars, with_variables};
use serde_json::json;
use typegraph::root_request;

#[tokio::test]
async fn hero_name() {
    let sw = starwars();
    let data = run(&sw.executable(), "query HeroNameQuery { hero { name } }", sw.root()).await;
    assert_eq!(data, json!({"hero": {"name": "R2-D2"}}));
}

#[tokio::test]
async fn hero_friends_through_a_method() {
    let sw = starwars();
    let query = "{ hero { id name friends { name } } }";
    let data = run(&sw.executable(), query, sw.root()).await;
    assert_eq!(
        data,
        json!({"hero": {
            "id": "2001",
            "name": "R2-D2",
            "friends": [
                {"name": "Luke Skywalker"},
                {"name": "Han Solo"},
                {"name": "Leia Organa"},
            ],
        }})
    );
}

#[tokio::test]
async fn enum_lists_serialize_raw_values_by_name() {
    let sw = starwars();
    let query = r#"{ human(id: "1004") { name appearsIn friends { name appearsIn } } }"#;
    let data = run(&sw.executable(), query, sw.root()).await;
    assert_eq!(
        data,
        json!({"human": {
            "name": "Wilhuff Tarkin",
            "appearsIn": ["NEWHOPE"],
            "friends": [{"name": "Darth Vader", "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"]}],
        }})
    );
}

#[tokio::test]
async fn lookups_by_literal_and_variable() {
    let sw = starwars();
    let schema = sw.executable();

    let data = run(&schema, r#"{ human(id: "1000") { name homePlanet } }"#, sw.root()).await;
    assert_eq!(data, json!({"human": {"name": "Luke Skywalker", "homePlanet": "Tatooine"}}));

    let query = "query FetchSomeID($someId: String!) { human(id: $someId) { name } }";
    let data = run(&schema, with_variables(query, json!({"someId": "1002"})), sw.root()).await;
    assert_eq!(data, json!({"human": {"name": "Han Solo"}}));

    let data = run(&schema, with_variables(query, json!({"someId": "not a valid id"})), sw.root()).await;
    assert_eq!(data, json!({"human": null}));

    // A droid id does not resolve through `human`.
    let data = run(&schema, r#"{ human(id: "2000") { name } }"#, sw.root()).await;
    assert_eq!(data, json!({"human": null}));
}

#[tokio::test]
async fn aliases_and_enum_arguments() {
    let sw = starwars();
    let query = r#"{
        luke: human(id: "1000") { name }
        leia: human(id: "1003") { name }
        empireHero: hero(episode: EMPIRE) { name }
        jediHero: hero(episode: JEDI) { name }
    }"#;
    let data = run(&sw.executable(), query, sw.root()).await;
    assert_eq!(
        data,
        json!({
            "luke": {"name": "Luke Skywalker"},
            "leia": {"name": "Leia Organa"},
            "empireHero": {"name": "Luke Skywalker"},
            "jediHero": {"name": "R2-D2"},
        })
    );
}

#[tokio::test]
async fn interface_results_pick_their_concrete_type() {
    let sw = starwars();
    let query = r#"{
        hero { __typename name ...on Droid { primaryFunction } }
        luke: hero(episode: EMPIRE) { __typename ...on Human { homePlanet } }
        droid(id: "2000") { friends { __typename name } }
    }"#;
    let data = run(&sw.executable(), query, sw.root()).await;
    assert_eq!(
        data,
        json!({
            "hero": {"__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech"},
            "luke": {"__typename": "Human", "homePlanet": "Tatooine"},
            "droid": {"friends": [
                {"__typename": "Human", "name": "Luke Skywalker"},
                {"__typename": "Human", "name": "Han Solo"},
                {"__typename": "Human", "name": "Leia Organa"},
                {"__typename": "Droid", "name": "R2-D2"},
            ]},
        })
    );
}

#[tokio::test]
async fn invalid_field_is_rejected_by_the_engine() {
    let sw = starwars();
    let response = sw.executable().execute(root_request("{ hero { favoriteSpaceship } }", sw.root())).await;
    assert!(!response.errors.is_empty());
    assert!(response.errors[0].message.contains("favoriteSpaceship"), "got: {:?}", response.errors);
}

#[test]
fn sdl_lists_every_type() {
    let sw = starwars();
    let schema = typegraph::make_schema(sw.namespace.clone(), &sw.query, None, []).unwrap();
    let names: Vec<_> = schema.type_map().keys().cloned().collect();
    for name in ["Query", "Character", "Episode", "Human", "Droid", "String"] {
        assert!(names.iter().any(|n| n == name), "{name} missing from {names:?}");
    }

    let human = schema.get_type("Human").unwrap();
    let fields: Vec<_> = human.fields().keys().cloned().collect();
    assert_eq!(fields, ["friends", "id", "name", "appearsIn", "homePlanet"], "members first, then hints base-first");
    assert_eq!(human.fields()["appearsIn"].ty.to_string(), "[Episode!]!");
    assert_eq!(schema.query().fields()["hero"].args["episode"].ty.to_string(), "Episode");

    let sdl = schema.sdl().unwrap();
    assert!(sdl.contains("interface Character"), "{sdl}");
    assert!(sdl.contains("type Droid implements Character"), "{sdl}");
    assert!(sdl.contains("enum Episode"), "{sdl}");
    assert!(sdl.contains("One of the films in the Star Wars Trilogy"), "{sdl}");
}
