pub mod handlers;
pub mod password;
pub mod revocation;
pub mod tokens;
pub mod users;
