use bson::{Bson, DateTime, Document as BsonDocument, Uuid, doc};
use chrono::{Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use docresource::{document::document_id, memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
#[document(collection = "users")]
struct User {
    id: Uuid,
    #[serde(rename = "displayName")]
    display_name: String,
}

impl Model for User {}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
#[document(collection = "accounts")]
struct Account {
    id: Uuid,
    name: String,
    password: String,
}

impl Model for Account {
    fn hidden_fields() -> &'static [&'static str] {
        &["password"]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Created {
    #[serde(skip_serializing_if = "Option::is_none")]
    by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Comment {
    id: Uuid,
    body: String,
    #[serde(default)]
    created: Created,
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
#[document(collection = "blogs")]
struct Blog {
    id: Uuid,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blog: Option<String>,
    #[serde(default)]
    created: Created,
    #[serde(default)]
    readers: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    editor: Option<Uuid>,
    #[serde(default)]
    comments: Vec<Comment>,
}

impl Model for Blog {
    fn validate(&self) -> DocumentStoreResult<()> {
        if self.title.is_empty() {
            return Err(DocumentStoreError::Validation("title is required".into()));
        }
        if self.created.by.is_none() {
            return Err(DocumentStoreError::Validation("created.by is required".into()));
        }
        if self.comments.iter().any(|comment| comment.body.is_empty()) {
            return Err(DocumentStoreError::Validation("comment body is required".into()));
        }
        Ok(())
    }

    fn before_save(&mut self) -> DocumentStoreResult<()> {
        self.created.date.get_or_insert_with(DateTime::now);
        Ok(())
    }

    fn hidden_fields() -> &'static [&'static str] {
        &["created.by", "created.date", "readers", "comments"]
    }

    fn references() -> Vec<Reference> {
        vec![
            Reference::to::<User>("created.by"),
            Reference::to::<User>("readers"),
            Reference::to::<User>("comments.created.by"),
            Reference::to::<Account>("editor"),
        ]
    }

    fn virtuals(document: &mut BsonDocument) {
        if let Ok(text) = document.get_str("blog") {
            let tags = text
                .split_whitespace()
                .take(3)
                .map(|word| Bson::String(word.to_string()))
                .collect::<Vec<_>>();
            document.insert("tags", tags);
        }
    }
}

type Store = DocumentStore<InMemoryStore>;

fn store() -> Store {
    DocumentStore::new(InMemoryStore::new())
}

fn all() -> ResourceParams {
    ResourceParams::new()
}

fn owned_by(user: Uuid) -> ResourceParams {
    ResourceParams::new().filter(Filter::eq("created.by", user))
}

fn commented_by(user: Uuid) -> ResourceParams {
    ResourceParams::new().filter(Filter::eq("comments.created.by", user))
}

fn id_of(document: &BsonDocument) -> Uuid {
    document_id(document).expect("document has an id")
}

fn titles(documents: &[BsonDocument]) -> Vec<&str> {
    documents
        .iter()
        .map(|document| document.get_str("title").unwrap())
        .collect()
}

async fn user(store: &Store, name: &str) -> Uuid {
    let created = store
        .resource::<User>()
        .create_doc(doc! { "displayName": name }, &all())
        .await
        .unwrap()
        .unwrap();

    id_of(&created)
}

async fn blog(store: &Store, title: &str, owner: Uuid) -> Uuid {
    let created = store
        .resource::<Blog>()
        .create_doc(
            doc! { "title": title, "blog": "one two three four", "created": { "by": owner } },
            &all(),
        )
        .await
        .unwrap()
        .unwrap();

    id_of(&created)
}

async fn comment(store: &Store, blog_id: Uuid, body: &str, author: Uuid) -> Uuid {
    let created = store
        .resource::<Blog>()
        .create_coll_doc(blog_id, "comments", doc! { "body": body, "created": { "by": author } }, &all())
        .await
        .unwrap()
        .unwrap();

    id_of(&created)
}

#[tokio::test]
async fn create_hides_hidden_fields_and_adds_virtuals() {
    let store = store();
    let alice = user(&store, "alice").await;

    let created = store
        .resource::<Blog>()
        .create_doc(
            doc! { "title": "first", "blog": "one two three four", "created": { "by": alice } },
            &all(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.get_str("title").unwrap(), "first");
    assert_eq!(
        created.get_array("tags").unwrap(),
        &vec![Bson::from("one"), Bson::from("two"), Bson::from("three")]
    );
    assert!(!created.contains_key("readers"));
    assert!(!created.contains_key("comments"));
    assert!(created.get_document("created").map_or(true, |created| created.is_empty()));

    let read = store
        .resource::<Blog>()
        .read_doc_by_id(id_of(&created), &all())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, created);
}

#[tokio::test]
async fn create_runs_the_save_hook() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;

    let read = store
        .resource::<Blog>()
        .read_doc_by_id(blog_id, &ResourceParams::from_json(json!({ "select": "created.date" })).unwrap())
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(read.get_document("created").unwrap().get("date"), Some(Bson::DateTime(_))));
}

#[tokio::test]
async fn create_rejects_invalid_documents() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blogs = store.resource::<Blog>();

    let missing_title = blogs.create_doc(doc! { "created": { "by": alice } }, &all()).await;
    assert!(matches!(missing_title, Err(DocumentStoreError::Validation(_))));

    let empty_title = blogs.create_doc(doc! { "title": "", "created": { "by": alice } }, &all()).await;
    assert!(matches!(empty_title, Err(DocumentStoreError::Validation(_))));

    let no_owner = blogs.create_doc(doc! { "title": "orphan" }, &all()).await;
    assert!(matches!(no_owner, Err(DocumentStoreError::Validation(_))));

    assert!(blogs.read_docs(&all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_outside_the_where_clause_stores_but_returns_nothing() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blogs = store.resource::<Blog>();

    let created = blogs
        .create_doc(doc! { "title": "first", "created": { "by": alice } }, &owned_by(bob))
        .await
        .unwrap();

    assert!(created.is_none());
    assert_eq!(blogs.read_docs(&all()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn where_clause_limits_reads_to_the_owner() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let alices = blog(&store, "alice's", alice).await;
    blog(&store, "bob's", bob).await;
    let blogs = store.resource::<Blog>();

    assert!(blogs.read_doc_by_id(alices, &owned_by(bob)).await.unwrap().is_none());
    assert!(blogs.read_doc_by_id(alices, &owned_by(alice)).await.unwrap().is_some());

    let params = ResourceParams::from_json(json!({ "where": { "created.by": alice.to_string() } })).unwrap();
    let found = blogs.read_docs(&params).await.unwrap();
    assert_eq!(titles(&found), vec!["alice's"]);
}

#[tokio::test]
async fn group_where_clause_matches_owners_and_readers() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let carol = user(&store, "carol").await;
    let blogs = store.resource::<Blog>();

    blogs
        .create_doc(doc! { "title": "shared", "created": { "by": alice }, "readers": [bob] }, &all())
        .await
        .unwrap();
    blogs
        .create_doc(doc! { "title": "private", "created": { "by": alice } }, &all())
        .await
        .unwrap();

    let group = |user: Uuid| {
        ResourceParams::from_json(json!({
            "where": { "$or": [{ "created.by": user.to_string() }, { "readers": user.to_string() }] },
            "sort": "title",
        }))
        .unwrap()
    };

    assert_eq!(titles(&blogs.read_docs(&group(alice)).await.unwrap()), vec!["private", "shared"]);
    assert_eq!(titles(&blogs.read_docs(&group(bob)).await.unwrap()), vec!["shared"]);
    assert!(blogs.read_docs(&group(carol)).await.unwrap().is_empty());
}

#[tokio::test]
async fn patch_respects_the_where_clause() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let blogs = store.resource::<Blog>();

    let refused = blogs
        .patch_doc_by_id(blog_id, doc! { "title": "stolen" }, &owned_by(bob))
        .await
        .unwrap();
    assert!(refused.is_none());

    let patched = blogs
        .patch_doc_by_id(blog_id, doc! { "title": "renamed", "blog": "a b" }, &owned_by(alice))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.get_str("title").unwrap(), "renamed");
    assert_eq!(patched.get_array("tags").unwrap().len(), 2);

    let read = blogs.read_doc_by_id(blog_id, &all()).await.unwrap().unwrap();
    assert_eq!(read.get_str("title").unwrap(), "renamed");
}

#[tokio::test]
async fn patch_rejects_invalid_changes() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;
    let blogs = store.resource::<Blog>();

    let empty = blogs.patch_doc_by_id(blog_id, doc! { "title": "" }, &all()).await;
    assert!(matches!(empty, Err(DocumentStoreError::Validation(_))));

    let new_id = blogs.patch_doc_by_id(blog_id, doc! { "id": Uuid::new() }, &all()).await;
    assert!(matches!(new_id, Err(DocumentStoreError::Validation(_))));

    let read = blogs.read_doc_by_id(blog_id, &all()).await.unwrap().unwrap();
    assert_eq!(read.get_str("title").unwrap(), "first");

    let missing = blogs.patch_doc_by_id(Uuid::new(), doc! { "title": "x" }, &all()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn destroy_returns_the_removed_document() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let blogs = store.resource::<Blog>();

    assert!(blogs.destroy_doc_by_id(blog_id, &owned_by(bob)).await.unwrap().is_none());

    let removed = blogs.destroy_doc_by_id(blog_id, &owned_by(alice)).await.unwrap().unwrap();
    assert_eq!(removed.get_str("title").unwrap(), "first");

    assert!(blogs.read_doc_by_id(blog_id, &all()).await.unwrap().is_none());
    assert!(blogs.destroy_doc_by_id(blog_id, &all()).await.unwrap().is_none());
}

#[tokio::test]
async fn select_overrides_hidden_fields_and_populates_references() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blogs = store.resource::<Blog>();

    let created = blogs
        .create_doc(doc! { "title": "first", "created": { "by": alice }, "readers": [bob] }, &all())
        .await
        .unwrap()
        .unwrap();

    let params = ResourceParams::from_json(json!({
        "select": "title created.by readers",
        "populate": [
            { "path": "created.by", "select": "displayName" },
            "readers",
        ],
    }))
    .unwrap();
    let read = blogs.read_doc_by_id(id_of(&created), &params).await.unwrap().unwrap();

    assert_eq!(
        read.get_document("created").unwrap().get_document("by").unwrap(),
        &doc! { "id": alice, "displayName": "alice" }
    );
    assert_eq!(
        read.get_array("readers").unwrap(),
        &vec![Bson::Document(doc! { "id": bob, "displayName": "bob" })]
    );
    assert!(!read.contains_key("tags"));
}

#[tokio::test]
async fn exclusive_select_keeps_hiding_hidden_fields() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;

    let params = ResourceParams::new().select(Projection::exclude_only(["blog"]));
    let read = store
        .resource::<Blog>()
        .read_doc_by_id(blog_id, &params)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(read.get_str("title").unwrap(), "first");
    assert!(!read.contains_key("blog"));
    assert!(!read.contains_key("readers"));
}

#[tokio::test]
async fn populated_documents_hide_the_referenced_model_hidden_fields() {
    let store = store();
    let alice = user(&store, "alice").await;
    let account = store
        .resource::<Account>()
        .create_doc(doc! { "name": "editor", "password": "hunter2" }, &all())
        .await
        .unwrap()
        .unwrap();
    assert!(!account.contains_key("password"));
    let account_id = id_of(&account);

    let blogs = store.resource::<Blog>();
    let created = blogs
        .create_doc(doc! { "title": "first", "created": { "by": alice }, "editor": account_id }, &all())
        .await
        .unwrap()
        .unwrap();
    let expected = doc! { "id": account_id, "name": "editor" };

    for entry in [
        Populate::new("editor").from_collection("accounts"),
        Populate::new("editor"),
        Populate::of::<Account>("editor"),
    ] {
        let params = ResourceParams::new().populate(entry);
        let read = blogs.read_doc_by_id(id_of(&created), &params).await.unwrap().unwrap();
        assert_eq!(read.get_document("editor").unwrap(), &expected);
    }

    let params = ResourceParams::from_json(json!({
        "populate": { "path": "editor", "model": "accounts", "select": "-name" },
    }))
    .unwrap();
    let read = blogs.read_doc_by_id(id_of(&created), &params).await.unwrap().unwrap();
    assert_eq!(read.get_document("editor").unwrap(), &doc! { "id": account_id });
}

#[tokio::test]
async fn populate_rejects_collections_the_model_does_not_reference() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;

    let params = ResourceParams::new()
        .select(Projection::include_only(["created.by"]))
        .populate(Populate::new("created.by").from_collection("secrets"));
    let read = store.resource::<Blog>().read_doc_by_id(blog_id, &params).await;

    assert!(matches!(read, Err(DocumentStoreError::InvalidQuery(..))));
}

#[tokio::test]
async fn populate_turns_dangling_references_into_null() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;
    store.resource::<User>().destroy_doc_by_id(alice, &all()).await.unwrap();

    let params = ResourceParams::new()
        .select(Projection::include_only(["created.by"]))
        .populate(Populate::new("created.by"));
    let read = store
        .resource::<Blog>()
        .read_doc_by_id(blog_id, &params)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(read.get_document("created").unwrap().get("by"), Some(&Bson::Null));
}

#[tokio::test]
async fn lean_skips_virtuals() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blog_id = blog(&store, "first", alice).await;

    let read = store
        .resource::<Blog>()
        .read_doc_by_id(blog_id, &ResourceParams::new().lean())
        .await
        .unwrap()
        .unwrap();

    assert!(!read.contains_key("tags"));
    assert_eq!(read.get_str("blog").unwrap(), "one two three four");
}

#[tokio::test]
async fn pages_by_count_and_by_range() {
    let store = store();
    let alice = user(&store, "alice").await;
    let blogs = store.resource::<Blog>();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for minute in 0..12 {
        let date = base + Duration::minutes(minute);
        blogs
            .create_doc(
                doc! {
                    "title": format!("blog {minute:02}"),
                    "created": { "by": alice, "date": DateTime::from_chrono(date) },
                },
                &all(),
            )
            .await
            .unwrap();
    }

    let newest = ResourceParams::new()
        .sort(Sort::parse_list("-created.date"))
        .limit(5);
    let first = blogs.read_docs(&newest).await.unwrap();
    assert_eq!(titles(&first), vec!["blog 11", "blog 10", "blog 09", "blog 08", "blog 07"]);

    let second = blogs.read_docs(&newest.clone().skip(5)).await.unwrap();
    assert_eq!(titles(&second), vec!["blog 06", "blog 05", "blog 04", "blog 03", "blog 02"]);

    let last_seen = (base + Duration::minutes(7)).to_rfc3339();
    let params = ResourceParams::from_json(json!({
        "sort": { "created.date": -1 },
        "limit": 5,
        "skip": { "operator": "lt", "path": "created.date", "val": last_seen },
    }))
    .unwrap();
    assert_eq!(titles(&blogs.read_docs(&params).await.unwrap()), titles(&second));

    let third = blogs.read_docs(&newest.skip(10)).await.unwrap();
    assert_eq!(titles(&third), vec!["blog 01", "blog 00"]);
}

#[tokio::test]
async fn zero_limit_returns_every_document() {
    let store = store();
    let alice = user(&store, "alice").await;
    blog(&store, "first", alice).await;
    blog(&store, "second", alice).await;

    let params = ResourceParams::from_json(json!({ "limit": 0 })).unwrap();
    let found = store.resource::<Blog>().read_docs(&params).await.unwrap();

    assert_eq!(titles(&found), vec!["first", "second"]);
}

#[tokio::test]
async fn null_in_where_matches_missing_fields() {
    let store = store();
    let alice = user(&store, "alice").await;
    blog(&store, "with text", alice).await;
    let blogs = store.resource::<Blog>();
    blogs
        .create_doc(doc! { "title": "untitled", "created": { "by": alice } }, &all())
        .await
        .unwrap();

    let missing = ResourceParams::from_json(json!({ "where": { "blog": null } })).unwrap();
    assert_eq!(titles(&blogs.read_docs(&missing).await.unwrap()), vec!["untitled"]);

    let present = ResourceParams::from_json(json!({ "where": { "blog": { "$ne": null } } })).unwrap();
    assert_eq!(titles(&blogs.read_docs(&present).await.unwrap()), vec!["with text"]);

    let either = ResourceParams::from_json(json!({ "where": { "blog": { "$in": [null, "nope"] } } })).unwrap();
    assert_eq!(titles(&blogs.read_docs(&either).await.unwrap()), vec!["untitled"]);
}

#[test]
fn range_skip_rejects_equality_operators() {
    let params = ResourceParams::new().skip_range(FieldOp::Eq, "created.date", 1);

    assert!(matches!(params.to_query(), Err(DocumentStoreError::InvalidQuery(_))));
}

#[tokio::test]
async fn subdocuments_can_be_created_and_read() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let blogs = store.resource::<Blog>();

    let created = blogs
        .create_coll_doc(
            blog_id,
            "comments",
            doc! { "body": "nice post", "created": { "by": bob } },
            &owned_by(alice),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.get_str("body").unwrap(), "nice post");
    let comment_id = id_of(&created);

    comment(&store, blog_id, "thanks", alice).await;

    let listed = blogs.read_coll_docs(blog_id, "comments", &all()).await.unwrap().unwrap();
    assert_eq!(
        listed.iter().map(|item| item.get_str("body").unwrap()).collect::<Vec<_>>(),
        vec!["nice post", "thanks"]
    );

    let read = blogs
        .read_coll_doc_by_id(blog_id, "comments", comment_id, &all())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, created);

    assert!(
        blogs
            .read_coll_doc_by_id(blog_id, "comments", Uuid::new(), &all())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn subdocument_creation_follows_parent_rules() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let blogs = store.resource::<Blog>();

    let foreign = blogs
        .create_coll_doc(blog_id, "comments", doc! { "body": "hi" }, &owned_by(bob))
        .await
        .unwrap();
    assert!(foreign.is_none());

    let empty = blogs
        .create_coll_doc(blog_id, "comments", doc! { "body": "" }, &all())
        .await;
    assert!(matches!(empty, Err(DocumentStoreError::Validation(_))));

    let missing_parent = blogs
        .create_coll_doc(Uuid::new(), "comments", doc! { "body": "hi" }, &all())
        .await
        .unwrap();
    assert!(missing_parent.is_none());

    let listed = blogs.read_coll_docs(blog_id, "comments", &all()).await.unwrap().unwrap();
    assert!(listed.is_empty());
    assert!(blogs.read_coll_docs(Uuid::new(), "comments", &all()).await.unwrap().is_none());
}

#[tokio::test]
async fn subdocument_patch_and_destroy_respect_the_author() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let comment_id = comment(&store, blog_id, "first!", bob).await;
    let blogs = store.resource::<Blog>();

    let refused = blogs
        .patch_coll_doc_by_id(blog_id, "comments", comment_id, doc! { "body": "edited" }, &commented_by(alice))
        .await
        .unwrap();
    assert!(refused.is_none());

    let patched = blogs
        .patch_coll_doc_by_id(blog_id, "comments", comment_id, doc! { "body": "edited" }, &commented_by(bob))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.get_str("body").unwrap(), "edited");

    let invalid = blogs
        .patch_coll_doc_by_id(blog_id, "comments", comment_id, doc! { "body": "" }, &all())
        .await;
    assert!(matches!(invalid, Err(DocumentStoreError::Validation(_))));

    assert!(
        blogs
            .destroy_coll_doc_by_id(blog_id, "comments", comment_id, &commented_by(alice))
            .await
            .unwrap()
            .is_none()
    );

    let removed = blogs
        .destroy_coll_doc_by_id(blog_id, "comments", comment_id, &commented_by(bob))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.get_str("body").unwrap(), "edited");

    let listed = blogs.read_coll_docs(blog_id, "comments", &all()).await.unwrap().unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn subdocument_reads_select_and_populate() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let comment_id = comment(&store, blog_id, "first!", bob).await;
    let blogs = store.resource::<Blog>();

    let selected = blogs
        .read_coll_doc_by_id(
            blog_id,
            "comments",
            comment_id,
            &ResourceParams::new().select(Projection::include_only(["comments.body"])),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selected, doc! { "id": comment_id, "body": "first!" });

    let params = ResourceParams::from_json(json!({ "populate": "comments.created.by" })).unwrap();
    let listed = blogs.read_coll_docs(blog_id, "comments", &params).await.unwrap().unwrap();
    assert_eq!(
        listed[0].get_document("created").unwrap().get_document("by").unwrap(),
        &doc! { "id": bob, "displayName": "bob" }
    );
}

#[tokio::test]
async fn exclusive_select_applies_to_each_subdocument() {
    let store = store();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let blog_id = blog(&store, "first", alice).await;
    let comment_id = comment(&store, blog_id, "first!", bob).await;
    let blogs = store.resource::<Blog>();

    let params = ResourceParams::from_json(json!({ "select": "-comments.body" })).unwrap();
    let listed = blogs.read_coll_docs(blog_id, "comments", &params).await.unwrap().unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(id_of(&listed[0]), comment_id);
    assert!(!listed[0].contains_key("body"));
    assert_eq!(listed[0].get_document("created").unwrap().get("by"), Some(&Bson::from(bob)));

    let params = ResourceParams::new().select(Projection::exclude_only(["comments"]));
    let listed = blogs.read_coll_docs(blog_id, "comments", &params).await.unwrap().unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn resources_work_through_a_dynamic_store() {
    let store = store().into_dyn();
    let users = store.resource::<User>();

    let created = users
        .create_doc(doc! { "displayName": "alice" }, &all())
        .await
        .unwrap()
        .unwrap();
    let found = store
        .as_dyn()
        .resource::<User>()
        .read_docs(&all())
        .await
        .unwrap();

    assert_eq!(found, vec![created]);
    assert_eq!(store.list_collections().await.unwrap(), vec!["users"]);
    store.shutdown().await.unwrap();
}
