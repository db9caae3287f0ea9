//! Terminal commands. Each opens the configured database directly; none of
//! them needs a running server.

pub mod add;
pub mod doctor;
pub mod re_embed;
pub mod recent;
pub mod reset;
pub mod search;
pub mod stats;

/// Shorten `content` to at most `max_chars` characters for terminal output.
pub(crate) fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}
