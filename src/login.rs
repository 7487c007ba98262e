use crate::forms::{validate_login_form, FieldError, LoginFormData};
use crate::init::get_db_pool;
use crate::middleware::ClientCtx;
use crate::query::find_user_by_name;
use crate::session::UID_KEY;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub errors: Vec<FieldError>,
}

#[get("/auth/login/")]
pub async fn view_login(client: ClientCtx) -> Result<HttpResponse, Error> {
    Ok(LoginTemplate {
        client,
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/auth/login/")]
pub async fn post_login(
    client: ClientCtx,
    session: Session,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let mut errors = validate_login_form(&form);

    if errors.is_empty() {
        match find_user_by_name(get_db_pool(), form.username.trim())
            .await
            .map_err(error::ErrorInternalServerError)?
        {
            Some(user) => {
                session
                    .insert(UID_KEY, user.id)
                    .map_err(error::ErrorInternalServerError)?;
                return Ok(HttpResponse::Found()
                    .append_header(("Location", "/"))
                    .finish());
            }
            None => {
                errors.push(FieldError {
                    field: "username",
                    message: "Unknown username.".to_owned(),
                });
            }
        }
    }

    Ok(LoginTemplate { client, errors }.to_response())
}

#[get("/auth/logout/")]
pub async fn view_logout(session: Session) -> Result<HttpResponse, Error> {
    session.purge();
    Ok(HttpResponse::Found()
        .append_header(("Location", "/"))
        .finish())
}
