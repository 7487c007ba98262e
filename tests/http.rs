mod common;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{LOCATION, SET_COOKIE};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use quill::cache::PageCache;
use quill::follow::is_following;
use quill::middleware::ClientCtx;
use quill::orm::posts;
use quill::post::{insert_post, NewPost};
use quill::query;
use sea_orm::entity::*;

fn location<B>(resp: &ServiceResponse<B>) -> &str {
    resp.headers()
        .get(LOCATION)
        .expect("expected a redirect")
        .to_str()
        .unwrap()
}

fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    let header = resp
        .headers()
        .get(SET_COOKIE)
        .expect("expected a session cookie")
        .to_str()
        .unwrap();
    Cookie::parse_encoded(header.to_owned()).unwrap().into_owned()
}

fn multipart_text(boundary: &str, text: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n--{b}--\r\n",
        b = boundary,
        text = text
    )
}

/// Builds a full post-form body: text, a group selection (may be empty)
/// and optionally an image file part.
fn multipart_form(
    boundary: &str,
    text: &str,
    group: &str,
    image: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n",
            b = boundary,
            text = text
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"group\"\r\n\r\n{group}\r\n",
            b = boundary,
            group = group
        )
        .as_bytes(),
    );
    if let Some((filename, content_type, data)) = image {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{f}\"\r\nContent-Type: {ct}\r\n\r\n",
                b = boundary,
                f = filename,
                ct = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

#[actix_rt::test]
async fn routes_enforce_identity_and_cache_feeds() {
    std::env::set_var("DIR_MEDIA", std::env::temp_dir().join("quill-test-media"));
    quill::filesystem::init();

    let db = common::setup_db().await;
    let author = common::create_user(&db, "author").await;
    let group = common::create_group(&db, "Announcements", "announcements").await;
    let post_id = insert_post(
        &db,
        author.id,
        NewPost {
            text: "first post",
            group_id: Some(group.id),
            image: None,
        },
    )
    .await
    .unwrap();

    // The handlers read from the process-wide pool.
    quill::init::set_db_pool(db).ok();
    let db = quill::init::get_db_pool();

    let cache = web::Data::new(PageCache::default());
    let secret_key = Key::generate();
    let app = test::init_service(
        App::new()
            .app_data(cache.clone())
            .wrap(ClientCtx::new())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .service(quill::post::view_index)
            .service(quill::post::create_post_form)
            .service(quill::post::create_post)
            .service(quill::post::view_post)
            .service(quill::post::update_post)
            .service(quill::comment::post_comment)
            .service(quill::group::view_group)
            .service(quill::profile::view_profile)
            .service(quill::follow::view_follow_index)
            .service(quill::follow::follow_author)
            .service(quill::login::view_login)
            .service(quill::login::post_login)
            .service(quill::login::view_logout),
    )
    .await;

    // Public feeds render for guests.
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(first_body.contains("first post"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/group/announcements/")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/profile/author/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Unknown slugs, usernames and post ids are 404s.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/group/unknown/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/profile/nobody/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/posts/9999/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Guests are sent to login for authenticated views.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/create/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/follow/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/");

    // The global feed is cached: a post created now is invisible until
    // the cache is cleared.
    let hidden_id = insert_post(db, author.id, NewPost {
        text: "second post",
        group_id: None,
        image: None,
    })
    .await
    .unwrap();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let stale_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(stale_body, first_body);
    assert!(!stale_body.contains("second post"));

    cache.clear();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let fresh_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(fresh_body.contains("second post"));
    assert!(query::get_post(db, hidden_id).await.unwrap().is_some());

    // Login with an unknown username re-renders the form.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[("username", "nobody")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // A known username establishes a session the /create/ page accepts.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[("username", "author")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let author_session = session_cookie(&resp);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(author_session.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Creating through the form maps the text, group and image fields.
    // An empty group selection means no group.
    let boundary = "XBOUNDARY";
    let gif = [0x47u8, 0x49, 0x46, 0x38, 0x39, 0x61];
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(author_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_form(
                boundary,
                "pictured post",
                "",
                Some(("pixel.gif", "image/gif", &gif)),
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author/");

    let created = query::list_by_author(db, author.id).await.unwrap();
    assert_eq!(created[0].text, "pictured post");
    assert_eq!(created[0].group_id, None);
    assert!(created[0].image.as_deref().unwrap().ends_with(".gif"));

    // A group selection lands the post in that group's feed.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(author_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_form(
                boundary,
                "grouped post",
                &group.id.to_string(),
                None,
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let grouped = query::list_by_group(db, group.id).await.unwrap();
    assert_eq!(grouped[0].text, "grouped post");

    // Blank text re-renders the form and writes nothing.
    let count_before = query::list_all(db).await.unwrap().len();
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(author_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_form(boundary, "   ", "", None))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(query::list_all(db).await.unwrap().len(), count_before);

    // A file part with no filename reads as no upload.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(author_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nplain text\r\n--{b}\r\nContent-Disposition: form-data; name=\"image\"\r\n\r\n\r\n--{b}--\r\n",
                b = boundary
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let created = query::list_by_author(db, author.id).await.unwrap();
    assert_eq!(created[0].text, "plain text");
    assert_eq!(created[0].image, None);

    // A second, unrelated user.
    common::create_user(db, "mallory").await;
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[("username", "mallory")])
            .to_request(),
    )
    .await;
    let mallory_session = session_cookie(&resp);

    // A non-author edit attempt redirects to the detail view and writes
    // nothing.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post_id))
            .cookie(mallory_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_text(boundary, "hacked"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post_id));

    let stored = posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "first post");

    // The author may edit through the same route.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post_id))
            .cookie(author_session.clone())
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_text(boundary, "first post, edited"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let stored = posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "first post, edited");

    // Commenting requires a session and lands on the detail page.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post_id))
            .set_form(&[("text", "drive-by")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/");
    assert!(query::list_comments(db, post_id).await.unwrap().is_empty());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post_id))
            .cookie(mallory_session.clone())
            .set_form(&[("text", "nice post")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post_id));
    let comments = query::list_comments(db, post_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "nice post");

    // Following over HTTP records exactly one follow.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(mallory_session.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author/");

    let mallory = query::find_user_by_name(db, "mallory").await.unwrap().unwrap();
    let author = query::find_user_by_name(db, "author").await.unwrap().unwrap();
    assert!(is_following(db, mallory.id, author.id).await.unwrap());

    // The subscription feed now renders for mallory.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(mallory_session)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let feed_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(feed_body.contains("first post, edited"));
}
