use quill::init;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init::init();
    init::init_db().await;
    init::start().await
}
