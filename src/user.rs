use sea_orm::FromQueryResult;

/// A mini struct holding only what we need to know about the request's
/// authenticated user.
#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub username: String,
}
