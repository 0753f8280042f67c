pub mod middleware;

pub use middleware::{extract_token, is_auth_path, token_middleware, AUTH_PATH_PREFIX};
