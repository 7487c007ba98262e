use quill::orm::{comments, follows, groups, posts, users};
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Schema,
    Set,
};

/// Opens an in-memory database carrying the full schema.
///
/// The pool is capped at one connection; every handle must see the same
/// in-memory file.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("sqlite connect failed");

    let schema = Schema::new(DbBackend::Sqlite);
    create_table(&db, schema.create_table_from_entity(users::Entity)).await;
    create_table(&db, schema.create_table_from_entity(groups::Entity)).await;
    create_table(&db, schema.create_table_from_entity(posts::Entity)).await;
    create_table(&db, schema.create_table_from_entity(comments::Entity)).await;
    create_table(&db, schema.create_table_from_entity(follows::Entity)).await;
    db.execute(db.get_database_backend().build(&follows::unique_pair_index()))
        .await
        .expect("create index failed");

    db
}

async fn create_table(db: &DatabaseConnection, stmt: TableCreateStatement) {
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .expect("create table failed");
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> users::Model {
    let result = users::Entity::insert(users::ActiveModel {
        username: Set(username.to_owned()),
        ..Default::default()
    })
    .exec(db)
    .await
    .expect("insert user failed");

    users::Model {
        id: result.last_insert_id,
        username: username.to_owned(),
    }
}

pub async fn create_group(db: &DatabaseConnection, title: &str, slug: &str) -> groups::Model {
    let result = groups::Entity::insert(groups::ActiveModel {
        title: Set(title.to_owned()),
        slug: Set(slug.to_owned()),
        description: Set(format!("{} description", title)),
        ..Default::default()
    })
    .exec(db)
    .await
    .expect("insert group failed");

    groups::Model {
        id: result.last_insert_id,
        title: title.to_owned(),
        slug: slug.to_owned(),
        description: format!("{} description", title),
    }
}
