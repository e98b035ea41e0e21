/// Application name
pub const APP_NAME: &str = "Realty";

/// Minimum username length in characters
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length in characters
pub const MAX_USERNAME_LEN: usize = 150;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 5;

/// Maximum length of first / last name
pub const MAX_NAME_LEN: usize = 30;

/// Maximum length of a phone number
pub const MAX_PHONE_LEN: usize = 20;

/// Maximum property title length
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum property location length
pub const MAX_LOCATION_LEN: usize = 300;

/// Properties shown per page of search results
pub const PROPERTIES_PER_PAGE: u32 = 12;

/// Newest active properties shown on the home page
pub const HOME_FEATURED_COUNT: u32 = 6;

/// Captcha length in characters
pub const CAPTCHA_LEN: usize = 6;

/// Alphabet the captcha is drawn from
pub const CAPTCHA_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
