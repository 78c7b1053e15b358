/// Application name
pub const APP_NAME: &str = "Huddle";

/// Maximum number of image references attached to a single post.
/// Extra references are silently dropped, matching the posting UI.
pub const MAX_POST_IMAGES: usize = 4;

/// Number of random bytes in an invite code (hex-encoded, so the
/// printable code is twice this length).
pub const INVITE_CODE_BYTES: usize = 4;

/// Author name recorded for anonymous comments. The real author is
/// never written, so anonymity cannot be revoked later.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Default number of posts per dashboard page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
