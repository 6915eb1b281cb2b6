//! Authentication: password hashing, JWT signing, and the token service
//! that ties them to refresh-token liveness.

pub mod jwt;
pub mod password;
pub mod tokens;

pub use self::jwt::TokenKeys;
pub use self::tokens::TokenService;
