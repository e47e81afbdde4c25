/// Clean user-supplied text using the ammonia library.
///
/// Exam titles, descriptions and question texts are rendered by the web
/// client, so they are sanitised with a tag whitelist before storage: safe
/// formatting tags (like <b>, <p>) survive while <script>, <iframe> and
/// event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_scripts() {
        let cleaned = clean_html("<b>2 + 2</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>2 + 2</b>");
    }

    #[test]
    fn test_clean_html_keeps_plain_text() {
        assert_eq!(clean_html("Which option is correct?"), "Which option is correct?");
    }
}
