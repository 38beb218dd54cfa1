use ammonia;

/// Clean user-supplied HTML using the ammonia library.
///
/// Whitelist-based sanitization: safe formatting tags (<b>, <p>, <a>, ...)
/// survive, while <script>, <iframe> and event-handler attributes are
/// stripped. Applied to every content body on create and update, so stored
/// markup is safe to render no matter which client wrote it.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tags_are_stripped() {
        let dirty = "<p>hello</p><script>alert('xss')</script>";
        let clean = clean_html(dirty);
        assert!(clean.contains("<p>hello</p>"));
        assert!(!clean.contains("script"));
    }

    #[test]
    fn event_handlers_are_stripped() {
        let dirty = r#"<b onclick="steal()">bold</b>"#;
        let clean = clean_html(dirty);
        assert!(clean.contains("bold"));
        assert!(!clean.contains("onclick"));
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean_html("just words"), "just words");
    }
}
