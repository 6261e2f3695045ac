//! Authentication: password hashing, sessions and the request extractor

pub mod extractor;
pub mod password;
pub mod sessions;

pub use extractor::{session_id_from_headers, CurrentUser, SESSION_COOKIE};
pub use password::PasswordHasher;
pub use sessions::SessionStore;
