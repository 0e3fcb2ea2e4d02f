//! Constants used throughout the MyCloud client.
//!
//! Storage keys, REST endpoint paths and the limits the server enforces.

use std::time::Duration;

/// Token store key holding the serialized access/refresh pair.
pub const TOKENS_KEY: &str = "tokens";

/// Token store key holding the cached user profile.
pub const USER_KEY: &str = "user";

/// Refresh this long before the access token expires.
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Timeout for ordinary API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads may take minutes on slow links.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Size of the slices an upload body is streamed in; progress is reported per slice.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Largest file the server accepts.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Longest comment the server accepts, in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// REST endpoint paths relative to the API base URL.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login/";
    pub const REGISTER: &str = "/auth/register/";
    pub const TOKEN_REFRESH: &str = "/auth/token/refresh/";
    pub const CURRENT_USER: &str = "/auth/user/me/";
    pub const LOGOUT: &str = "/auth/logout/";
    pub const HEALTH: &str = "/health/";

    pub const FILES: &str = "/files/";
    pub const FILE_UPLOAD: &str = "/files/upload/";

    pub const ADMIN_USERS: &str = "/admin/users/";

    pub fn file(id: u64) -> String {
        format!("/files/{id}/")
    }

    pub fn file_rename(id: u64) -> String {
        format!("/files/{id}/rename/")
    }

    pub fn file_comment(id: u64) -> String {
        format!("/files/{id}/comment/")
    }

    pub fn file_download(id: u64) -> String {
        format!("/files/{id}/download/")
    }

    pub fn public_download(link: &str) -> String {
        format!("/files/download/public/{link}/")
    }

    pub fn files_of_user(user_id: u64) -> String {
        format!("/files/?user_id={user_id}")
    }

    pub fn admin_user(id: u64) -> String {
        format!("/admin/users/{id}/")
    }

    pub fn admin_user_delete(id: u64) -> String {
        format!("/admin/users/{id}/delete/")
    }

    pub fn admin_user_files(id: u64) -> String {
        format!("/admin/users/{id}/files/")
    }
}
