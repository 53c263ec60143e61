//! HTML detection and rendering to plain text.
//!
//! The local store shows titles and notes verbatim, so markup coming from
//! other calendars is rendered down before it is written.

use std::sync::LazyLock;

use html2text::render::TrivialDecorator;
use regex::Regex;

/// Wide enough that rendering never wraps a calendar title or note.
const RENDER_WIDTH: usize = 4096;

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A<[a-z][\s\S]*>\z").expect("valid regex"));

/// Whether `text` is markup: opens with a lowercase tag and ends with `>`.
pub fn looks_like_html(text: &str) -> bool {
    LEADING_TAG.is_match(text)
}

/// `text` rendered to plain text if it looks like HTML, else unchanged.
pub fn plain_text(text: &str) -> String {
    if !looks_like_html(text) {
        return text.to_string();
    }

    match html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(text.as_bytes(), RENDER_WIDTH)
    {
        Ok(rendered) => rendered.trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "could not render html, keeping it as is");
            text.to_string()
        }
    }
}
