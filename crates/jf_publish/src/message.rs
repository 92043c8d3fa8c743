use jf_core::Article;

const BOILERPLATE_HEADING: &str = "### Abstract";
const MATH_OPEN: &str = "\\(";
const MATH_CLOSE: &str = "\\)";

/// Flattens a stored summary for display in a single message paragraph.
pub fn normalize_summary(summary: &str) -> String {
    summary
        .replace('\n', " ")
        .replace(BOILERPLATE_HEADING, "")
        .replace(MATH_OPEN, "")
        .replace(MATH_CLOSE, "")
        .trim()
        .to_string()
}

/// Journal in italics, linked title, optional translation, then the summary.
pub fn compose_message(article: &Article, translated_title: Option<&str>) -> String {
    let mut message = format!("_{}_\n", article.journal);
    message.push_str(&format!("[{}]({})\n", article.title, article.link));
    if let Some(translated) = translated_title {
        message.push_str(translated);
        message.push('\n');
    }
    message.push('\n');
    message.push_str(&normalize_summary(&article.summary));
    message
}
