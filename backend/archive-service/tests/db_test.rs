//! Service and router tests against a live PostgreSQL.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use archive_service::db::Database;
use archive_service::error::AppError;
use archive_service::middleware::{CurrentUser, Role};
use archive_service::models::{
    CreateAnnouncement, CreateTag, MediaType, NewMedia, NewPost, PostStatus, UpdateAnnouncement,
    UpdateTag, UpsertUser, User,
};
use archive_service::services::{
    AnnouncementService, EmailService, MediaService, MessageService, ModerationService,
    PostFilters, PostService, SortOrder, TagService, UserService,
};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use media_store::MemoryMediaStore;
use std::sync::Arc;
use tower::ServiceExt;

use common::{body_json, test_config, TestApp};

async fn setup_db() -> Database {
    let db = Database::connect(&test_config())
        .await
        .expect("Failed to connect to database");
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

async fn create_user(db: &Database, role: Role) -> User {
    let google_id = unique("g");
    UserService::new(db.clone())
        .get_or_create_user(
            &UpsertUser {
                google_id: google_id.clone(),
                email: format!("{}@example.com", google_id),
                name: format!("Resident {}", google_id),
                profile_pic: None,
            },
            role,
        )
        .await
        .expect("Failed to create user")
}

fn as_current(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role(),
    }
}

fn moderation(db: &Database, media: MemoryMediaStore) -> ModerationService {
    let config = test_config();
    ModerationService::new(
        db.clone(),
        EmailService::new(&config.email).unwrap(),
        MediaService::new(Arc::new(media), &config.uploads),
    )
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_get_or_create_user_never_demotes() {
    let db = setup_db().await;
    let users = UserService::new(db.clone());

    let profile = UpsertUser {
        google_id: unique("g"),
        email: "someone@example.com".to_string(),
        name: "Someone".to_string(),
        profile_pic: None,
    };

    let first = users.get_or_create_user(&profile, Role::User).await.unwrap();
    assert_eq!(first.role(), Role::User);

    let promoted = users.get_or_create_user(&profile, Role::Admin).await.unwrap();
    assert_eq!(promoted.id, first.id);
    assert_eq!(promoted.role(), Role::Admin);

    let renamed = UpsertUser {
        name: "Someone Else".to_string(),
        ..profile
    };
    let again = users.get_or_create_user(&renamed, Role::User).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.role(), Role::Admin);
    assert_eq!(again.name, "Someone Else");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_tag_crud_and_duplicates() {
    let db = setup_db().await;
    let tags = TagService::new(db.clone());
    let name = unique("Tag");

    let tag = tags
        .create(CreateTag {
            name: name.clone(),
            display_order: 3,
            image_url: None,
        })
        .await
        .unwrap();
    assert_eq!(tag.name, name);

    let duplicate = tags
        .create(CreateTag {
            name: name.clone(),
            display_order: 4,
            image_url: None,
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let updated = tags
        .update(
            tag.id,
            UpdateTag {
                display_order: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, name);
    assert_eq!(updated.display_order, 9);

    assert!(tags.find_by_name(&name).await.unwrap().is_some());
    tags.delete(tag.id).await.unwrap();
    assert!(matches!(tags.delete(tag.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_seed_predefined_is_idempotent() {
    let db = setup_db().await;
    let tags = TagService::new(db.clone());

    let first = tags.seed_predefined().await.unwrap();
    let before = tags.list().await.unwrap().len();
    assert_eq!(tags.seed_predefined().await.unwrap(), first);
    assert_eq!(tags.list().await.unwrap().len(), before);
    assert!(tags.find_by_name("Trenton Pride").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_post_moderation_lifecycle() {
    let db = setup_db().await;
    let author = create_user(&db, Role::User).await;
    let admin = create_user(&db, Role::Admin).await;
    let media = MemoryMediaStore::new("http://media.test");
    let posts = PostService::new(db.clone());

    let stored = MediaService::new(Arc::new(media.clone()), &test_config().uploads)
        .store("porch.jpg", b"jpeg".to_vec(), Some("Front porch".to_string()))
        .await
        .unwrap();
    assert_eq!(stored.media_type, MediaType::Image);

    let created = posts
        .create(NewPost {
            title: "Corner store".to_string(),
            content: "It sold penny candy.".to_string(),
            tag_id: None,
            user_id: author.id,
            media: vec![stored],
        })
        .await
        .unwrap();
    assert_eq!(created.post.status(), PostStatus::Pending);
    assert_eq!(created.media.len(), 1);
    assert_eq!(created.media[0].caption.as_deref(), Some("Front porch"));

    let approved_filter = PostFilters {
        status: Some(PostStatus::Approved),
        user_id: Some(author.id),
        ..Default::default()
    };
    assert!(posts
        .list(&approved_filter, SortOrder::NewestFirst, None)
        .await
        .unwrap()
        .is_empty());

    let moderation = moderation(&db, media.clone());
    let admin_user = as_current(&admin);
    moderation
        .decide(&admin_user, created.post.id, PostStatus::Approved, None)
        .await
        .unwrap();

    let visible = posts
        .list(&approved_filter, SortOrder::NewestFirst, None)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].post.author_name.as_deref(), Some(author.name.as_str()));

    let history = moderation.history(created.post.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "approve");
    assert_eq!(history[0].admin_id, Some(admin.id));

    assert_eq!(media.len().await, 1);
    moderation.delete(&admin_user, created.post.id).await.unwrap();
    assert!(media.is_empty().await);
    assert!(posts.get(created.post.id).await.unwrap().is_none());
    assert!(matches!(
        moderation.history(created.post.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_bulk_decision_reports_missing_posts() {
    let db = setup_db().await;
    let author = create_user(&db, Role::User).await;
    let admin = create_user(&db, Role::Admin).await;

    let post = PostService::new(db.clone())
        .create(NewPost {
            title: "Mill Hill".to_string(),
            content: "Snow day sledding.".to_string(),
            tag_id: None,
            user_id: author.id,
            media: Vec::<NewMedia>::new(),
        })
        .await
        .unwrap();

    let outcome = moderation(&db, MemoryMediaStore::new("http://media.test"))
        .bulk_decide(
            &as_current(&admin),
            &[post.post.id, i64::MAX],
            PostStatus::Denied,
            Some("Needs a date".to_string()),
        )
        .await;

    assert_eq!(outcome.processed, vec![post.post.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, i64::MAX);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_live_announcements_respect_window_and_since() {
    let db = setup_db().await;
    let admin = create_user(&db, Role::Admin).await;
    let announcements = AnnouncementService::new(db.clone());
    let now = Utc::now();

    let live = announcements
        .create(CreateAnnouncement {
            user_id: admin.id,
            title: unique("Open house"),
            content: "Saturday at the library".to_string(),
            date_start: now - Duration::hours(1),
            date_end: Some(now + Duration::days(1)),
            is_active: true,
        })
        .await
        .unwrap();

    let expired = announcements
        .create(CreateAnnouncement {
            user_id: admin.id,
            title: unique("Old news"),
            content: "Already over".to_string(),
            date_start: now - Duration::days(3),
            date_end: Some(now - Duration::days(1)),
            is_active: true,
        })
        .await
        .unwrap();

    let listed = announcements.list_live(None).await.unwrap();
    assert!(listed.iter().any(|a| a.id == live.id));
    assert!(!listed.iter().any(|a| a.id == expired.id));

    let later = announcements
        .list_live(Some(live.date_created + Duration::seconds(1)))
        .await
        .unwrap();
    assert!(!later.iter().any(|a| a.id == live.id));

    let paused = announcements
        .update(
            live.id,
            UpdateAnnouncement {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!paused.is_active);
    assert!(!announcements
        .list_live(None)
        .await
        .unwrap()
        .iter()
        .any(|a| a.id == live.id));

    announcements.delete(live.id).await.unwrap();
    announcements.delete(expired.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_contact_messages_resolve_and_delete() {
    let db = setup_db().await;
    let messages = MessageService::new(db.clone());

    let message = messages
        .create("Ann", "ann@example.com", "Do you have photos of the old mill?")
        .await
        .unwrap();
    assert!(!message.resolved);

    let resolved = messages.resolve(message.id).await.unwrap();
    assert!(resolved.resolved);
    assert!(messages
        .list(Some(false))
        .await
        .unwrap()
        .iter()
        .all(|m| m.id != message.id));

    messages.delete(message.id).await.unwrap();
    assert!(matches!(
        messages.delete(message.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_pending_post_hidden_from_public_but_visible_to_author() {
    let db = setup_db().await;
    let app = TestApp::with_db(db.clone());
    let author = create_user(&db, Role::User).await;

    let post = PostService::new(db.clone())
        .create(NewPost {
            title: "Duck Island".to_string(),
            content: "Summer evenings.".to_string(),
            tag_id: None,
            user_id: author.id,
            media: Vec::new(),
        })
        .await
        .unwrap();
    let uri = format!("/api/posts/{}", post.post.id);

    let anonymous = Request::builder().uri(&uri).body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let as_author = Request::builder()
        .uri(&uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", app.token_for(&author)),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(as_author).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");

    let stranger = create_user(&db, Role::User).await;
    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/user/posts/{}", post.post.id))
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", app.token_for(&stranger)),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

async fn approved_post(db: &Database, author: &User, title: &str, tag_id: Option<i64>) -> i64 {
    let posts = PostService::new(db.clone());
    let created = posts
        .create(NewPost {
            title: title.to_string(),
            content: "From the neighbourhood.".to_string(),
            tag_id,
            user_id: author.id,
            media: Vec::new(),
        })
        .await
        .unwrap();
    posts
        .set_status(created.post.id, PostStatus::Approved)
        .await
        .unwrap();
    created.post.id
}

async fn approved_ids(posts: &PostService, filters: PostFilters) -> Vec<i64> {
    let filters = PostFilters {
        status: Some(PostStatus::Approved),
        ..filters
    };
    let mut ids: Vec<i64> = posts
        .list(&filters, SortOrder::NewestFirst, None)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.post.id)
        .collect();
    ids.sort_unstable();
    ids
}

fn sorted(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_archive_filters_match_expected_posts() {
    let db = setup_db().await;
    let posts = PostService::new(db.clone());
    let alice = create_user(&db, Role::User).await;
    let bob = create_user(&db, Role::User).await;
    let tag = TagService::new(db.clone())
        .create(CreateTag {
            name: unique("Parks"),
            display_order: 0,
            image_url: None,
        })
        .await
        .unwrap();

    // Shared marker keeps matches to rows created here
    let marker = unique("arch");
    let porch_light = approved_post(&db, &alice, &format!("{} Porch Light", marker), Some(tag.id)).await;
    let porch_swing = approved_post(&db, &bob, &format!("{} porch swing", marker), None).await;
    let percent = approved_post(&db, &alice, &format!("{} 100% Trenton", marker), None).await;
    let thousand = approved_post(&db, &bob, &format!("{} 1000 Trenton", marker), None).await;

    let pending = posts
        .create(NewPost {
            title: format!("{} Porch pending", marker),
            content: "Not reviewed yet.".to_string(),
            tag_id: Some(tag.id),
            user_id: alice.id,
            media: Vec::new(),
        })
        .await
        .unwrap()
        .post
        .id;

    let title = |t: &str| PostFilters {
        title: Some(format!("{} {}", marker, t)),
        ..Default::default()
    };

    // Case-insensitive substring on title
    assert_eq!(
        approved_ids(&posts, title("PORCH")).await,
        sorted(vec![porch_light, porch_swing])
    );

    // `%` matches literally, so "1000" is not a hit
    assert_eq!(approved_ids(&posts, title("100%")).await, vec![percent]);
    assert!(approved_ids(&posts, title("_00")).await.is_empty());

    // Author substring, case-insensitive
    assert_eq!(
        approved_ids(
            &posts,
            PostFilters {
                author: Some(alice.name.to_uppercase()),
                ..Default::default()
            }
        )
        .await,
        sorted(vec![porch_light, percent])
    );

    // Exact tag name
    assert_eq!(
        approved_ids(
            &posts,
            PostFilters {
                tag: Some(tag.name.clone()),
                ..Default::default()
            }
        )
        .await,
        vec![porch_light]
    );
    assert!(approved_ids(
        &posts,
        PostFilters {
            tag: Some(tag.name[..tag.name.len() - 1].to_string()),
            ..Default::default()
        }
    )
    .await
    .is_empty());

    // Date equality on the UTC day
    let created_on = posts
        .require(porch_light)
        .await
        .unwrap()
        .post
        .date_created
        .date_naive();
    assert_eq!(
        approved_ids(
            &posts,
            PostFilters {
                date: Some(created_on),
                ..title("")
            }
        )
        .await,
        sorted(vec![porch_light, porch_swing, percent, thousand])
    );
    assert!(approved_ids(
        &posts,
        PostFilters {
            date: created_on.pred_opt(),
            ..title("")
        }
    )
    .await
    .is_empty());

    // Filters combine with AND
    assert_eq!(
        approved_ids(
            &posts,
            PostFilters {
                author: Some(alice.name.clone()),
                ..title("porch")
            }
        )
        .await,
        vec![porch_light]
    );
    assert!(approved_ids(
        &posts,
        PostFilters {
            author: Some(bob.name.clone()),
            tag: Some(tag.name.clone()),
            ..title("porch")
        }
    )
    .await
    .is_empty());

    // The public endpoint applies the same filters and never shows pending posts
    let app = TestApp::with_db(db.clone());
    let uri = format!("/api/posts?title={}%20porch&tag={}", marker, tag.name);
    let response = app
        .router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![porch_light]);
    assert!(!ids.contains(&pending));
}

fn admin_request(method: Method, uri: &str, token: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_demoted_admin_token_loses_admin_access() {
    let db = setup_db().await;
    let app = TestApp::with_db(db.clone());
    let admin = create_user(&db, Role::Admin).await;
    let token = app.token_for(&admin);

    let response = app
        .router
        .clone()
        .oneshot(admin_request(Method::GET, "/api/admin/users", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    UserService::new(db.clone())
        .update_role(admin.id, Role::User)
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(admin_request(Method::GET, "/api/admin/users", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_admin_token_for_unknown_user_is_unauthorized() {
    let db = setup_db().await;
    let app = TestApp::with_db(db.clone());
    let token = app.token_for(&common::user(i64::MAX - 7, "admin"));

    let response = app
        .router
        .oneshot(admin_request(
            Method::POST,
            "/api/admin/pending-posts",
            &token,
            Some(r#"{"ids":[],"action":"approve"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_admin_cannot_demote_self() {
    let db = setup_db().await;
    let app = TestApp::with_db(db.clone());
    let admin = create_user(&db, Role::Admin).await;
    let other = create_user(&db, Role::User).await;
    let token = app.token_for(&admin);

    let response = app
        .router
        .clone()
        .oneshot(admin_request(
            Method::PATCH,
            &format!("/api/admin/users/{}", admin.id),
            &token,
            Some(r#"{"role":"user"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(admin_request(
            Method::PATCH,
            &format!("/api/admin/users/{}", other.id),
            &token,
            Some(r#"{"role":"owner"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .oneshot(admin_request(
            Method::PATCH,
            &format!("/api/admin/users/{}", other.id),
            &token,
            Some(r#"{"role":"admin"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "admin");
}
