// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::{Request, Variables, dynamic};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value as Json;
use typegraph::{ClassDef, ClassRef, Method, Namespace, Param, Value, make_schema, root_request};

type Characters = Arc<OnceCell<IndexMap<String, Value>>>;

pub struct StarWars {
    pub episode: ClassRef,
    pub character: ClassRef,
    pub human: ClassRef,
    pub droid: ClassRef,
    pub query: ClassRef,
    pub namespace: Namespace,
}

fn lookup(characters: &Characters, id: &str) -> Value {
    characters.get().and_then(|c| c.get(id)).cloned().unwrap_or(Value::Null)
}

fn character(
    class: &ClassRef,
    id: &str,
    name: &str,
    friends: &[&str],
    appears_in: &[i64],
    extra: (&str, Option<&str>),
) -> (String, Value) {
    let value = Value::object(
        class,
        [
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("_friends", Value::from(friends.to_vec())),
            ("appearsIn", Value::from(appears_in.to_vec())),
            (extra.0, Value::from(extra.1)),
        ],
    );
    (id.to_string(), value)
}

pub fn starwars() -> StarWars {
    let characters: Characters = Arc::default();

    let episode = ClassDef::build("Episode")
        .enumeration()
        .doc("One of the films in the Star Wars Trilogy")
        .variant("NEWHOPE", 4)
        .variant("EMPIRE", 5)
        .variant("JEDI", 6)
        .finish();

    let friends_of = characters.clone();
    let character_class = ClassDef::build("Character")
        .interface()
        .doc("A character in the Star Wars Trilogy")
        .annotate("id", "str")
        .annotate("name", "str")
        .annotate("appearsIn", "List[Episode]")
        .method(Method::new("friends", "List['Character']", move |me, _| {
            let ids = me.getattr("_friends")?;
            let friends = ids
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .map(|id| lookup(&friends_of, id))
                .collect();
            Ok(Value::List(friends))
        }))
        .finish();

    let human = ClassDef::build("Human")
        .extends(&character_class)
        .object()
        .doc("A humanoid creature in the Star Wars universe.")
        .annotate("homePlanet", "Optional[str]")
        .finish();
    let droid = ClassDef::build("Droid")
        .extends(&character_class)
        .object()
        .doc("A mechanical creature in the Star Wars universe.")
        .annotate("primaryFunction", "str")
        .finish();

    let by_class = |class: &ClassRef| {
        let characters = characters.clone();
        let class = class.clone();
        move |_: &Value, args: &typegraph::Args| -> anyhow::Result<Value> {
            let id = args.require("id")?.as_str().unwrap_or_default().to_string();
            let found = lookup(&characters, &id);
            Ok(if found.is_instance_of(&class) { found } else { Value::Null })
        }
    };
    let hero_from = characters.clone();
    let query = ClassDef::build("Query")
        .object()
        .method(
            Method::new("hero", "Character", move |_, args| {
                let empire = args
                    .get("episode")
                    .and_then(Value::as_enum)
                    .is_some_and(|episode| episode.name() == "EMPIRE");
                Ok(lookup(&hero_from, if empire { "1000" } else { "2001" }))
            })
            .param(Param::new("episode", "Optional[Episode]").default(Value::Null)),
        )
        .method(Method::new("human", "Optional[Human]", by_class(&human)).param(Param::new("id", "str")))
        .method(Method::new("droid", "Optional[Droid]", by_class(&droid)).param(Param::new("id", "str")))
        .finish();

    let all = [
        character(&human, "1000", "Luke Skywalker", &["1002", "1003", "2000", "2001"], &[4, 5, 6], ("homePlanet", Some("Tatooine"))),
        character(&human, "1001", "Darth Vader", &["1004"], &[4, 5, 6], ("homePlanet", Some("Tatooine"))),
        character(&human, "1002", "Han Solo", &["1000", "1003", "2001"], &[4, 5, 6], ("homePlanet", None)),
        character(&human, "1003", "Leia Organa", &["1000", "1002", "2000", "2001"], &[4, 5, 6], ("homePlanet", Some("Alderaan"))),
        character(&human, "1004", "Wilhuff Tarkin", &["1001"], &[4], ("homePlanet", None)),
        character(&droid, "2000", "C-3PO", &["1000", "1002", "1003", "2001"], &[4, 5, 6], ("primaryFunction", Some("Protocol"))),
        character(&droid, "2001", "R2-D2", &["1000", "1002", "1003"], &[4, 5, 6], ("primaryFunction", Some("Astromech"))),
    ];
    characters.set(all.into_iter().collect()).expect("characters are set once");

    let namespace = Namespace::with_classes([&episode, &character_class, &human, &droid]);
    StarWars { episode, character: character_class, human, droid, query, namespace }
}

impl StarWars {
    pub fn executable(&self) -> dynamic::Schema {
        make_schema(self.namespace.clone(), &self.query, None, [])
            .expect("star wars schema builds")
            .executable()
            .expect("engine accepts the schema")
    }

    pub fn root(&self) -> Value {
        Value::object(&self.query, Vec::<(&str, Value)>::new())
    }
}

/// Run a query and return its data, failing on any error.
pub async fn run(schema: &dynamic::Schema, request: impl Into<Request>, root: Value) -> Json {
    let response = schema.execute(root_request(request, root)).await;
    assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
    response.data.into_json().expect("data converts to json")
}

pub fn with_variables(query: &str, variables: Json) -> Request {
    Request::new(query).variables(Variables::from_json(variables))
}
