use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Index, IndexCreateStatement};

/// Directed subscription from `user_id` to `author_id`.
/// The pair is unique; the write layer rejects duplicates and self-follows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Follower,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}

/// Storage-level guard holding the (user, author) pair unique. Derived
/// schemas must create this alongside the table.
pub fn unique_pair_index() -> IndexCreateStatement {
    Index::create()
        .name("idx-follows-user-author")
        .table(Entity)
        .col(Column::UserId)
        .col(Column::AuthorId)
        .unique()
        .to_owned()
}
