use crate::init::get_db_pool;
use crate::orm::users;
use crate::user::ClientUser;
use actix_session::Session;
use sea_orm::entity::*;

/// Session key under which login stores the user id.
pub const UID_KEY: &str = "uid";

/// Resolves the cookie session to this request's identity, if any.
/// Unknown ids and session errors both read as anonymous.
pub async fn authenticate_client_by_session(session: &Session) -> Option<ClientUser> {
    let uid = match session.get::<i32>(UID_KEY) {
        Ok(Some(uid)) => uid,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("authenticate_client_by_session: session.get(): {}", e);
            return None;
        }
    };

    match users::Entity::find_by_id(uid).one(get_db_pool()).await {
        Ok(Some(user)) => Some(ClientUser {
            id: user.id,
            username: user.username,
        }),
        Ok(None) => None,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}
