//! Repository Integration Tests
//!
//! Tests for the SQLite repositories with an in-memory database.

use std::path::Path;

use crate::domain::survey::{Answer, Answers};
use crate::domain::{
    Comment, DomainError, FieldUpdate, NewAsset, PositionUpdate, SurveyResponse, Tag,
};
use crate::repository::{
    init_db, AssetRepository, AssetTagOperations, CommentRepository, GalleryStore, Repository,
    SurveyRepository, TagRepository,
};

async fn setup_test_db() -> crate::repository::DbState {
    init_db(Path::new(":memory:")).await.expect("Failed to init test DB")
}

fn new_asset(title: &str) -> NewAsset {
    NewAsset {
        title: title.to_string(),
        file_url: format!("https://cdn.test/{}.png", title),
        thumbnail_url: None,
        mime_type: "image/png".to_string(),
    }
}

#[tokio::test]
async fn test_create_assets_appends_display_order() {
    let db = setup_test_db().await;
    let repo = AssetRepository::new(db.conn.clone());

    let a = repo.create_asset(&new_asset("a")).await.unwrap();
    let b = repo.create_asset(&new_asset("b")).await.unwrap();

    assert!(a.id > 0);
    assert_eq!(a.display_order, 0);
    assert_eq!(b.display_order, 1);
    assert_eq!(repo.list_assets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_persist_reorder_is_atomic() {
    let db = setup_test_db().await;
    let repo = AssetRepository::new(db.conn.clone());
    let a = repo.create_asset(&new_asset("a")).await.unwrap();
    let b = repo.create_asset(&new_asset("b")).await.unwrap();

    repo.persist_reorder(&[
        PositionUpdate { id: b.id, display_order: 0 },
        PositionUpdate { id: a.id, display_order: 1 },
    ])
    .await
    .unwrap();
    let ids: Vec<u32> = repo.list_assets().await.unwrap().iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);

    // Unknown id in the middle: nothing may change
    let err = repo
        .persist_reorder(&[
            PositionUpdate { id: a.id, display_order: 0 },
            PositionUpdate { id: 999, display_order: 1 },
            PositionUpdate { id: b.id, display_order: 2 },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let ids: Vec<u32> = repo.list_assets().await.unwrap().iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn test_persist_field_value() {
    let db = setup_test_db().await;
    let repo = AssetRepository::new(db.conn.clone());
    let a = repo.create_asset(&new_asset("a")).await.unwrap();

    repo.persist_field_value(a.id, &FieldUpdate::Title("Cover".to_string())).await.unwrap();
    repo.persist_field_value(a.id, &FieldUpdate::Pinned(true)).await.unwrap();
    repo.persist_field_value(a.id, &FieldUpdate::Rating(Some(4))).await.unwrap();
    repo.persist_field_value(a.id, &FieldUpdate::Description("notes".to_string())).await.unwrap();

    let found = repo.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(found.title, "Cover");
    assert!(found.pinned);
    assert_eq!(found.rating, Some(4));
    assert_eq!(found.description.as_deref(), Some("notes"));
    assert!(found.updated_at.is_some());

    let missing = repo.persist_field_value(999, &FieldUpdate::Pinned(true)).await;
    assert!(matches!(missing, Err(DomainError::NotFound(_))));
    let invalid = repo.persist_field_value(a.id, &FieldUpdate::Rating(Some(9))).await;
    assert!(matches!(invalid, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn test_reindex_compacts_orders() {
    let db = setup_test_db().await;
    let repo = AssetRepository::new(db.conn.clone());
    let a = repo.create_asset(&new_asset("a")).await.unwrap();
    let b = repo.create_asset(&new_asset("b")).await.unwrap();
    let c = repo.create_asset(&new_asset("c")).await.unwrap();
    repo.delete_asset(b.id).await.unwrap();
    repo.persist_field_value(c.id, &FieldUpdate::Pinned(true)).await.unwrap();

    let updates = repo.reindex_assets().await.unwrap();
    assert_eq!(
        updates,
        vec![
            PositionUpdate { id: c.id, display_order: 0 },
            PositionUpdate { id: a.id, display_order: 1 },
        ]
    );
}

#[tokio::test]
async fn test_tags_and_relations() {
    let db = setup_test_db().await;
    let assets = AssetRepository::new(db.conn.clone());
    let tags = TagRepository::new(db.conn.clone());
    let asset = assets.create_asset(&new_asset("a")).await.unwrap();

    let brand = tags.create(&Tag::with_color(0, "brand".to_string(), "#123456".to_string())).await.unwrap();
    let draft = tags.create(&Tag::new(0, " Draft ".to_string())).await.unwrap();
    assert_eq!(draft.name, "Draft");

    let dup = tags.create(&Tag::new(0, "brand".to_string())).await;
    assert!(matches!(dup, Err(DomainError::Conflict(_))));

    tags.add_tag_to_asset(asset.id, draft.id).await.unwrap();
    tags.add_tag_to_asset(asset.id, brand.id).await.unwrap();
    tags.add_tag_to_asset(asset.id, brand.id).await.unwrap();

    let names: Vec<String> = tags.get_tags_for_asset(asset.id).await.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["brand".to_string(), "Draft".to_string()]);
    assert_eq!(tags.get_assets_with_tag(brand.id).await.unwrap(), vec![asset.id]);

    let missing = tags.add_tag_to_asset(999, brand.id).await;
    assert!(matches!(missing, Err(DomainError::NotFound(_))));

    tags.remove_tag_from_asset(asset.id, draft.id).await.unwrap();
    tags.delete(brand.id).await.unwrap();
    assert!(tags.get_tags_for_asset(asset.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_comments_follow_asset_lifecycle() {
    let db = setup_test_db().await;
    let assets = AssetRepository::new(db.conn.clone());
    let comments = CommentRepository::new(db.conn.clone());
    let asset = assets.create_asset(&new_asset("a")).await.unwrap();

    let first = comments
        .create(&Comment::new(asset.id, "ana".to_string(), "Tighten kerning".to_string()))
        .await
        .unwrap();
    comments
        .create(&Comment::new(asset.id, "li".to_string(), "Agreed".to_string()))
        .await
        .unwrap();
    assert_eq!(comments.list_for_asset(asset.id).await.unwrap()[0].id, first.id);

    let orphan = comments
        .create(&Comment::new(999, "ana".to_string(), "?".to_string()))
        .await;
    assert!(matches!(orphan, Err(DomainError::NotFound(_))));

    assets.delete_asset(asset.id).await.unwrap();
    assert!(comments.list_for_asset(asset.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_survey_responses_round_trip() {
    let db = setup_test_db().await;
    let repo = SurveyRepository::new(db.conn.clone());

    let mut answers = Answers::new();
    answers.insert("score".to_string(), Answer::Scale(4));
    let saved = repo
        .save_response(&SurveyResponse {
            id: 0,
            survey_id: "urai-1".to_string(),
            answers,
            submitted_at: 5,
        })
        .await
        .unwrap();
    assert!(saved.id > 0);

    let listed = repo.list_for_survey("urai-1").await.unwrap();
    assert_eq!(listed, vec![saved]);
    assert!(repo.list_for_survey("other").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_database_reports_storage_error() {
    let db = setup_test_db().await;
    let repo = AssetRepository::new(db.conn.clone());
    db.close().await;
    assert!(matches!(repo.list_assets().await, Err(DomainError::Storage(_))));
}
