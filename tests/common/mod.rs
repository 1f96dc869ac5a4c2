//! Behaviour every `DocumentStore` backend must share.
//!
//! Each check works on its own collection, named by the caller, so checks can run
//! against a shared database without interfering.

#![allow(dead_code)]

use docstore::types::{Order, by_id, doc, everything, exclude, sort_by};
use docstore::{Ctx, DocumentStore, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_owned(),
            age,
            email: None,
        }
    }
}

pub async fn save_then_fetch_round_trip<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let user = User {
        email: Some("ada@example.com".to_owned()),
        ..User::new("ada", 36)
    };

    let id = store.save_one(&ctx, coll, &user).await.unwrap();
    assert!(!id.is_empty());

    let fetched: User = store
        .fetch_one(&ctx, coll, by_id(&id), exclude(["_id"]))
        .await
        .unwrap();
    assert_eq!(fetched, user);
}

pub async fn save_many_returns_ids_in_order<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let users: Vec<User> = (0..5).map(|i| User::new(&format!("u{i}"), i)).collect();

    let ids = store.save_many(&ctx, coll, &users).await.unwrap();
    assert_eq!(ids.len(), users.len());

    for (id, user) in ids.iter().zip(&users) {
        let fetched: User = store
            .fetch_one(&ctx, coll, by_id(id), exclude(["_id"]))
            .await
            .unwrap();
        assert_eq!(&fetched, user);
    }
}

pub async fn fetch_many_honors_limit_and_sort<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let users = vec![
        User::new("c", 30),
        User::new("a", 50),
        User::new("e", 10),
        User::new("b", 40),
        User::new("d", 20),
    ];
    store.save_many(&ctx, coll, &users).await.unwrap();

    let top: Vec<User> = store
        .fetch_many(
            &ctx,
            coll,
            everything(),
            3,
            exclude(["_id"]),
            sort_by("age", Order::Desc),
        )
        .await
        .unwrap();
    let names: Vec<&str> = top.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);

    let all: Vec<User> = store
        .fetch_many(
            &ctx,
            coll,
            doc! { "age": { "$gte": 20 } },
            0,
            exclude(["_id"]),
            sort_by("name", Order::Asc),
        )
        .await
        .unwrap();
    let names: Vec<&str> = all.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c", "d"]);
}

pub async fn count_tracks_inserts_and_deletes<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let users: Vec<User> = (0..6).map(|i| User::new("same", i)).collect();
    store.save_many(&ctx, coll, &users).await.unwrap();
    store
        .save_one(&ctx, coll, &User::new("other", 99))
        .await
        .unwrap();

    let filter = doc! { "name": "same" };
    assert_eq!(store.count(&ctx, coll, filter.clone()).await.unwrap(), 6);

    let deleted = store
        .delete_one(&ctx, coll, filter.clone())
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let deleted = store
        .delete_many(&ctx, coll, doc! { "name": "same", "age": { "$lt": 3 } })
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    assert_eq!(store.count(&ctx, coll, filter).await.unwrap(), 3);
    assert_eq!(store.count(&ctx, coll, everything()).await.unwrap(), 4);
}

pub async fn update_one_versus_many<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let users: Vec<User> = (0..4).map(|_| User::new("twin", 1)).collect();
    store.save_many(&ctx, coll, &users).await.unwrap();

    let modified = store
        .update_one(
            &ctx,
            coll,
            doc! { "name": "twin" },
            doc! { "$set": { "age": 2 } },
        )
        .await
        .unwrap();
    assert_eq!(modified, 1);
    assert_eq!(store.count(&ctx, coll, doc! { "age": 2 }).await.unwrap(), 1);

    let modified = store
        .update_many(
            &ctx,
            coll,
            doc! { "name": "twin" },
            doc! { "$set": { "age": 3 } },
        )
        .await
        .unwrap();
    assert_eq!(modified, 4);
    assert_eq!(store.count(&ctx, coll, doc! { "age": 3 }).await.unwrap(), 4);

    // values already in place are not reported as modified
    let modified = store
        .update_many(
            &ctx,
            coll,
            doc! { "name": "twin" },
            doc! { "$set": { "age": 3 } },
        )
        .await
        .unwrap();
    assert_eq!(modified, 0);
}

pub async fn no_match_is_not_an_error<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    store
        .save_one(&ctx, coll, &User::new("someone", 1))
        .await
        .unwrap();

    let nobody = doc! { "name": "nobody" };
    assert_eq!(
        store.delete_one(&ctx, coll, nobody.clone()).await.unwrap(),
        0
    );
    assert_eq!(
        store.delete_many(&ctx, coll, nobody.clone()).await.unwrap(),
        0
    );
    assert_eq!(
        store
            .update_many(&ctx, coll, nobody.clone(), doc! { "$set": { "age": 2 } })
            .await
            .unwrap(),
        0
    );
    assert_eq!(store.count(&ctx, coll, nobody.clone()).await.unwrap(), 0);

    let none: Vec<User> = store
        .fetch_many(&ctx, coll, nobody, 10, exclude(["_id"]), doc! {})
        .await
        .unwrap();
    assert!(none.is_empty());
}

pub async fn fetch_one_missing_is_not_found<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let res: Result<User, Error> = store
        .fetch_one(&ctx, coll, doc! { "name": "ghost" }, doc! {})
        .await;
    assert!(matches!(res, Err(Error::NotFound)));
}

pub async fn duplicate_id_is_reported<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let record = doc! { "_id": "fixed-id", "name": "first" };

    let id = store.save_one(&ctx, coll, &record).await.unwrap();
    assert_eq!(id, "fixed-id");

    let err = store.save_one(&ctx, coll, &record).await.unwrap_err();
    assert!(err.is_duplicate(), "unexpected error: {err}");
}

pub async fn users_scenario<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    store
        .save_one(&ctx, coll, &doc! { "name": "a" })
        .await
        .unwrap();

    let found: Vec<docstore::types::Document> = store
        .fetch_many(&ctx, coll, doc! { "name": "a" }, 0, doc! {}, doc! {})
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("name").unwrap(), "a");
}

pub async fn unrenderable_ids_are_stored_before_failing<S: DocumentStore>(
    store: &S,
    coll: &str,
) {
    let ctx = Ctx::background();
    let records = vec![
        doc! { "_id": 1, "n": "a" },
        doc! { "_id": 2, "n": "b" },
        doc! { "_id": 3, "n": "c" },
    ];

    let err = store.save_many(&ctx, coll, &records).await.unwrap_err();
    assert!(matches!(err, Error::InvalidObjectId(_)), "unexpected error: {err}");

    // the write went through, only the id rendering failed
    assert_eq!(store.count(&ctx, coll, everything()).await.unwrap(), 3);
}

pub async fn empty_batch_is_rejected<S: DocumentStore>(store: &S, coll: &str) {
    let ctx = Ctx::background();
    let none: Vec<User> = Vec::new();

    let res = store.save_many(&ctx, coll, &none).await;
    assert!(matches!(res, Err(Error::EmptyBatch)));
    assert_eq!(store.count(&ctx, coll, everything()).await.unwrap(), 0);
}
