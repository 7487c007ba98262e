use crate::follow::is_following;
use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::query::{self, PostForTemplate};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub client: ClientCtx,
    pub author: users::Model,
    pub page: Page<PostForTemplate>,
    pub post_count: usize,
    pub can_follow: bool,
    pub can_unfollow: bool,
}

#[get("/profile/{username}/")]
pub async fn view_profile(
    client: ClientCtx,
    path: web::Path<String>,
    pager: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let author = query::find_user_by_name(db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let posts = query::list_by_author(db, author.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let post_count = posts.len();
    let page = paginate(posts, pager.page.unwrap_or(1), DEFAULT_PAGE_SIZE);

    let following = match client.get_id() {
        Some(user_id) => is_following(db, user_id, author.id)
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => false,
    };
    let can_follow = client.can_follow(&author) && !following;
    let can_unfollow = client.is_user() && following;

    Ok(ProfileTemplate {
        client,
        author,
        page,
        post_count,
        can_follow,
        can_unfollow,
    }
    .to_response())
}
