pub mod cache;
pub mod comment;
pub mod error_page;
pub mod filesystem;
pub mod follow;
pub mod forms;
pub mod group;
pub mod init;
pub mod login;
pub mod middleware;
pub mod orm;
pub mod pagination;
pub mod post;
pub mod profile;
pub mod query;
pub mod session;
pub mod user;
