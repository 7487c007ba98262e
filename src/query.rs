use crate::orm::{comments, follows, groups, posts, users};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

/// A fully joined struct representing the post model and its relational data.
#[derive(Clone, Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
    // join users
    pub username: Option<String>,
    // join groups
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl PostForTemplate {
    pub fn author_name(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }

    pub fn image_url(&self) -> Option<String> {
        self.image
            .as_deref()
            .map(crate::filesystem::get_file_url_by_filename)
    }
}

/// A comment joined with its author's name.
#[derive(Clone, Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    // join users
    pub username: Option<String>,
}

impl CommentForTemplate {
    pub fn author_name(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }
}

/// Shared selector for feed views: posts with author and group adjoined,
/// newest first, insertion order breaking timestamp ties.
fn posts_with_relations() -> Select<posts::Entity> {
    posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .left_join(groups::Entity)
        .column_as(groups::Column::Title, "group_title")
        .column_as(groups::Column::Slug, "group_slug")
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
}

/// Every post, newest first.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<PostForTemplate>, DbErr> {
    posts_with_relations()
        .into_model::<PostForTemplate>()
        .all(db)
        .await
}

/// Posts belonging to one group, newest first.
pub async fn list_by_group(
    db: &DatabaseConnection,
    group_id: i32,
) -> Result<Vec<PostForTemplate>, DbErr> {
    posts_with_relations()
        .filter(posts::Column::GroupId.eq(group_id))
        .into_model::<PostForTemplate>()
        .all(db)
        .await
}

/// Posts written by one author, newest first.
pub async fn list_by_author(
    db: &DatabaseConnection,
    author_id: i32,
) -> Result<Vec<PostForTemplate>, DbErr> {
    posts_with_relations()
        .filter(posts::Column::AuthorId.eq(author_id))
        .into_model::<PostForTemplate>()
        .all(db)
        .await
}

/// Posts by every author `user_id` follows, newest first.
pub async fn list_feed(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<PostForTemplate>, DbErr> {
    posts_with_relations()
        .filter(
            posts::Column::AuthorId.in_subquery(
                Query::select()
                    .column(follows::Column::AuthorId)
                    .from(follows::Entity)
                    .and_where(Expr::col(follows::Column::UserId).eq(user_id))
                    .to_owned(),
            ),
        )
        .into_model::<PostForTemplate>()
        .all(db)
        .await
}

/// One post with its relational data adjoined.
pub async fn get_post(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    posts_with_relations()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

/// Comments under one post, oldest first.
pub async fn list_comments(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_asc(comments::Column::CreatedAt)
        .order_by_asc(comments::Column::Id)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

pub async fn find_group_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<groups::Model>, DbErr> {
    groups::Entity::find()
        .filter(groups::Column::Slug.eq(slug))
        .one(db)
        .await
}

pub async fn find_user_by_name(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await
}
