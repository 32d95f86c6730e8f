//! Static files compiled into the binary.

use std::borrow::Cow;

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "public/"]
struct Public;

/// The landing page HTML.
pub fn landing_page() -> Option<Cow<'static, [u8]>> {
    Public::get("index.html").map(|file| file.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_page_is_embedded() {
        let page = landing_page().unwrap();
        let html = std::str::from_utf8(&page).unwrap();
        assert!(html.contains(r#"action="/upload""#));
        assert!(html.contains(r#"name="videos""#));
        assert!(html.contains(r#"name="songs""#));
    }
}
