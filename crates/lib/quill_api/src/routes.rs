//! Route paths served by the API.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";

/// `GET` list, `POST` register.
pub const USERS: &str = "/users";
/// `GET` public; `PUT` and `DELETE` owner only.
pub const USERS_ID: &str = "/users/{id}";

/// `GET` list, `POST` create (authenticated).
pub const ARTICLES: &str = "/articles";
/// `GET` public; `PUT` and `DELETE` author only.
pub const ARTICLES_ID: &str = "/articles/{id}";
