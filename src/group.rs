use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::groups;
use crate::pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::query::{self, PostForTemplate};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub client: ClientCtx,
    pub group: groups::Model,
    pub page: Page<PostForTemplate>,
}

#[get("/group/{slug}/")]
pub async fn view_group(
    client: ClientCtx,
    path: web::Path<String>,
    pager: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let group = query::find_group_by_slug(db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Group not found."))?;

    let posts = query::list_by_group(db, group.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let page = paginate(posts, pager.page.unwrap_or(1), DEFAULT_PAGE_SIZE);

    Ok(GroupTemplate {
        client,
        group,
        page,
    }
    .to_response())
}
