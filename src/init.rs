use crate::cache::PageCache;
use crate::middleware::ClientCtx;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{cookie::Key, web, App, HttpServer};
use env_logger::Env;
use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

#[inline(always)]
pub fn get_db_pool() -> &'static DatabaseConnection {
    unsafe { DB_POOL.get_unchecked() }
}

/// This MUST be called before calling get_db_pool, which is unsafe code
pub async fn init_db() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(true);
    let pool = Database::connect(opt).await.expect("Failed to create pool");
    DB_POOL.set(pool).expect("DB_POOL set twice");
}

/// Hands an already-open connection to get_db_pool.
/// Integration tests use this with an in-memory database.
pub fn set_db_pool(pool: DatabaseConnection) -> Result<(), DatabaseConnection> {
    DB_POOL.set(pool)
}

pub fn init() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    crate::filesystem::init();
}

/// This MUST NOT be called before init_db()
pub async fn start() -> std::io::Result<()> {
    let cache = web::Data::new(PageCache::default());
    let secret_key = Key::generate(); // TODO: Should be from .env file

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(cache.clone())
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::NOT_FOUND, crate::error_page::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        crate::error_page::render_500,
                    ),
            )
            .wrap(ClientCtx::new())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .wrap(Logger::new("%a %{User-Agent}i"))
            .service(crate::post::view_index)
            .service(crate::post::create_post_form)
            .service(crate::post::create_post)
            .service(crate::post::view_post)
            .service(crate::post::edit_post_form)
            .service(crate::post::update_post)
            .service(crate::post::delete_post)
            .service(crate::comment::post_comment)
            .service(crate::group::view_group)
            .service(crate::profile::view_profile)
            .service(crate::follow::view_follow_index)
            .service(crate::follow::follow_author)
            .service(crate::follow::unfollow_author)
            .service(crate::login::view_login)
            .service(crate::login::post_login)
            .service(crate::login::view_logout)
            .service(crate::filesystem::view_file)
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await
}
