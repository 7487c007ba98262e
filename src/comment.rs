use crate::forms::{validate_comment_form, CommentFormData};
use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::comments;
use crate::post::{redirect_to_login, redirect_to_post, PostDetailTemplate};
use crate::query;
use actix_web::{error, post, web, Error, HttpResponse};
use askama_actix::TemplateToResponse;
use chrono::prelude::Utc;
use sea_orm::{entity::*, DatabaseConnection, DbErr};

pub async fn insert_comment(
    db: &DatabaseConnection,
    post_id: i32,
    author_id: i32,
    text: &str,
) -> Result<i32, DbErr> {
    let result = comments::Entity::insert(comments::ActiveModel {
        post_id: Set(post_id),
        author_id: Set(author_id),
        text: Set(text.trim().to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    })
    .exec(db)
    .await?;

    Ok(result.last_insert_id)
}

#[post("/posts/{post_id}/comment/")]
pub async fn post_comment(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    let author_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };

    let db = get_db_pool();
    let post = query::get_post(db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let errors = validate_comment_form(&form);
    if !errors.is_empty() {
        // Re-render the detail page with the field errors; nothing is written.
        let comments = query::list_comments(db, post.id)
            .await
            .map_err(error::ErrorInternalServerError)?;
        let can_edit = client.can_edit_post(&post);
        return Ok(PostDetailTemplate {
            client,
            post,
            comments,
            can_edit,
            errors,
        }
        .to_response());
    }

    insert_comment(db, post.id, author_id, &form.text)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to_post(post.id))
}
