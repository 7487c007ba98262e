use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::follows;
use crate::pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::post::redirect_to_login;
use crate::query::{self, PostForTemplate};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::sea_query::OnConflict;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub client: ClientCtx,
    pub page: Page<PostForTemplate>,
}

pub async fn is_following(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follows::Entity::find()
        .filter(follows::Column::UserId.eq(user_id))
        .filter(follows::Column::AuthorId.eq(author_id))
        .one(db)
        .await?
        .is_some())
}

/// Establishes a follow. Duplicates and self-follows are no-ops, so the
/// (user, author) pair stays unique without surfacing an error.
///
/// The read keeps repeat requests quiet; the on-conflict clause and the
/// storage index hold the pair unique when requests race.
pub async fn create_follow(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<(), DbErr> {
    if user_id == author_id {
        return Ok(());
    }
    if is_following(db, user_id, author_id).await? {
        return Ok(());
    }

    follows::Entity::insert(follows::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([follows::Column::UserId, follows::Column::AuthorId])
            .do_nothing()
            .to_owned(),
    )
    .exec(db)
    .await?;

    Ok(())
}

/// Removes a follow. Unfollowing an author who was never followed is a
/// no-op.
pub async fn delete_follow(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<(), DbErr> {
    follows::Entity::delete_many()
        .filter(follows::Column::UserId.eq(user_id))
        .filter(follows::Column::AuthorId.eq(author_id))
        .exec(db)
        .await?;

    Ok(())
}

#[get("/follow/")]
pub async fn view_follow_index(
    client: ClientCtx,
    pager: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };

    let posts = query::list_feed(get_db_pool(), user_id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let page = paginate(posts, pager.page.unwrap_or(1), DEFAULT_PAGE_SIZE);

    Ok(FollowTemplate { client, page }.to_response())
}

#[get("/profile/{username}/follow/")]
pub async fn follow_author(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let author = query::find_user_by_name(db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };

    if client.can_follow(&author) {
        create_follow(db, user_id, author.id)
            .await
            .map_err(error::ErrorInternalServerError)?;
    }

    Ok(redirect_to_profile(&author.username))
}

#[get("/profile/{username}/unfollow/")]
pub async fn unfollow_author(
    client: ClientCtx,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let author = query::find_user_by_name(db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(redirect_to_login()),
    };

    delete_follow(db, user_id, author.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect_to_profile(&author.username))
}

fn redirect_to_profile(username: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", format!("/profile/{}/", username)))
        .finish()
}
