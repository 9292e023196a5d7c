pub mod gid;
pub mod shopify_auth;
pub mod time;
