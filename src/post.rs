use crate::cache::PageCache;
use crate::filesystem::save_upload;
use crate::forms::{read_post_form, validate_post_form, FieldError, PostFormData};
use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{comments, groups, posts};
use crate::pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::query::{self, CommentForTemplate, PostForTemplate};
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection, DbErr};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    pub page: Page<PostForTemplate>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub client: ClientCtx,
    pub post: PostForTemplate,
    pub comments: Vec<CommentForTemplate>,
    pub can_edit: bool,
    pub errors: Vec<FieldError>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub client: ClientCtx,
    pub is_edit: bool,
    pub post_id: Option<i32>,
    pub groups: Vec<groups::Model>,
    pub text: String,
    pub group_id: Option<i32>,
    pub errors: Vec<FieldError>,
}

impl PostFormTemplate {
    /// Marks the currently chosen group in the form's select box.
    fn is_selected(&self, group: &groups::Model) -> bool {
        self.group_id == Some(group.id)
    }
}

/// Fields of a post a write may set. The author and creation time are
/// fixed at insert and never touched again.
pub struct NewPost<'a> {
    pub text: &'a str,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

pub async fn insert_post(
    db: &DatabaseConnection,
    author_id: i32,
    post: NewPost<'_>,
) -> Result<i32, DbErr> {
    let result = posts::Entity::insert(posts::ActiveModel {
        text: Set(post.text.trim().to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        author_id: Set(author_id),
        group_id: Set(post.group_id),
        image: Set(post.image),
        ..Default::default()
    })
    .exec(db)
    .await?;

    Ok(result.last_insert_id)
}

/// Applies an edit to content fields only. A None image keeps whatever
/// is stored.
pub async fn apply_post_edit(
    db: &DatabaseConnection,
    post_id: i32,
    post: NewPost<'_>,
) -> Result<(), DbErr> {
    let mut update = posts::Entity::update_many()
        .col_expr(posts::Column::Text, Expr::value(post.text.trim()))
        .col_expr(posts::Column::GroupId, Expr::value(post.group_id))
        .filter(posts::Column::Id.eq(post_id));

    if let Some(image) = post.image {
        update = update.col_expr(posts::Column::Image, Expr::value(image));
    }

    update.exec(db).await?;
    Ok(())
}

/// Removes a post and its comments in one transaction.
pub async fn delete_post_with_comments(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    comments::Entity::delete_many()
        .filter(comments::Column::PostId.eq(post_id))
        .exec(&txn)
        .await?;
    posts::Entity::delete_many()
        .filter(posts::Column::Id.eq(post_id))
        .exec(&txn)
        .await?;

    txn.commit().await
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    cache: web::Data<PageCache>,
    pager: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    // The global feed is the hottest view; its rendered body is memoized
    // for a fixed ttl. Writes do not invalidate it.
    let key = req.uri().to_string();
    let body = cache
        .get_or_render(&key, || async move {
            let posts = query::list_all(get_db_pool())
                .await
                .map_err(error::ErrorInternalServerError)?;
            let page = paginate(posts, pager.page.unwrap_or(1), DEFAULT_PAGE_SIZE);

            IndexTemplate { client, page }
                .render()
                .map_err(|_| error::ErrorInternalServerError("Template parsing error"))
        })
        .await?;

    Ok(html_response(body))
}

#[get("/posts/{post_id}/")]
pub async fn view_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let post = query::get_post(db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    let comments = query::list_comments(db, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let can_edit = client.can_edit_post(&post);
    Ok(PostDetailTemplate {
        client,
        post,
        comments,
        can_edit,
        errors: Vec::new(),
    }
    .to_response())
}

#[get("/create/")]
pub async fn create_post_form(client: ClientCtx) -> Result<HttpResponse, Error> {
    if !client.can_create_post() {
        return Ok(redirect_to_login());
    }

    render_post_form(client, false, None, &PostFormData::default(), Vec::new()).await
}

#[post("/create/")]
pub async fn create_post(client: ClientCtx, payload: Multipart) -> Result<HttpResponse, Error> {
    let author_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };
    let db = get_db_pool();

    let form = read_post_form(payload).await?;
    let mut errors = validate_post_form(&form);
    resolve_group(db, &form, &mut errors).await?;
    if !errors.is_empty() {
        return render_post_form(client, false, None, &form, errors).await;
    }

    let image = match &form.image {
        Some(upload) => Some(save_upload(upload).map_err(error::ErrorInternalServerError)?),
        None => None,
    };
    insert_post(
        db,
        author_id,
        NewPost {
            text: &form.text,
            group_id: form.group_id,
            image,
        },
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/profile/{}/", client.get_name())))
        .finish())
}

#[get("/posts/{post_id}/edit/")]
pub async fn edit_post_form(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let post = query::get_post(get_db_pool(), path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.is_user() {
        return Ok(redirect_to_login());
    }
    if !client.can_edit_post(&post) {
        // Not the author; back to the detail page, no mutation.
        return Ok(redirect_to_post(post.id));
    }

    let form = PostFormData {
        text: post.text.clone(),
        group_id: post.group_id,
        image: None,
    };
    render_post_form(client, true, Some(post.id), &form, Vec::new()).await
}

#[post("/posts/{post_id}/edit/")]
pub async fn update_post(
    client: ClientCtx,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let post = query::get_post(db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.is_user() {
        return Ok(redirect_to_login());
    }
    if !client.can_edit_post(&post) {
        return Ok(redirect_to_post(post.id));
    }

    let form = read_post_form(payload).await?;
    let mut errors = validate_post_form(&form);
    resolve_group(db, &form, &mut errors).await?;
    if !errors.is_empty() {
        return render_post_form(client, true, Some(post.id), &form, errors).await;
    }

    let image = match &form.image {
        Some(upload) => Some(save_upload(upload).map_err(error::ErrorInternalServerError)?),
        None => None,
    };
    apply_post_edit(
        db,
        post.id,
        NewPost {
            text: &form.text,
            group_id: form.group_id,
            image,
        },
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to_post(post.id))
}

#[post("/posts/{post_id}/delete/")]
pub async fn delete_post(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let post = query::get_post(db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.is_user() {
        return Ok(redirect_to_login());
    }
    if !client.can_edit_post(&post) {
        return Ok(redirect_to_post(post.id));
    }

    delete_post_with_comments(db, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/profile/{}/", client.get_name())))
        .finish())
}

/// Unknown group selections surface as a field error, not a 404, so the
/// form re-renders with the user's input intact.
async fn resolve_group(
    db: &DatabaseConnection,
    form: &PostFormData,
    errors: &mut Vec<FieldError>,
) -> Result<(), Error> {
    if let Some(group_id) = form.group_id {
        let known = groups::Entity::find_by_id(group_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
        if known.is_none() {
            errors.push(FieldError {
                field: "group",
                message: "Unknown group.".to_owned(),
            });
        }
    }
    Ok(())
}

async fn render_post_form(
    client: ClientCtx,
    is_edit: bool,
    post_id: Option<i32>,
    form: &PostFormData,
    errors: Vec<FieldError>,
) -> Result<HttpResponse, Error> {
    let groups = groups::Entity::find()
        .order_by_asc(groups::Column::Title)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostFormTemplate {
        client,
        is_edit,
        post_id,
        groups,
        text: form.text.clone(),
        group_id: form.group_id,
        errors,
    }
    .to_response())
}

pub fn redirect_to_login() -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", "/auth/login/"))
        .finish()
}

pub fn redirect_to_post(post_id: i32) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", format!("/posts/{}/", post_id)))
        .finish()
}

fn html_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}
