pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{is_valid_url, normalize_start_url};
