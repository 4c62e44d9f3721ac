//! User-facing strings, picked by the invoker's Discord locale.

use crate::constant::limits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
}
impl Language {
    pub fn from_locale(locale: &str) -> Self {
        if locale.eq_ignore_ascii_case("ja") || locale.to_ascii_lowercase().starts_with("ja-") {
            Self::Japanese
        } else {
            Self::English
        }
    }
}

pub fn unimplemented(language: Language, command_name: &str) -> String {
    match language {
        Language::Japanese => format!("{command_name}は未実装です。"),
        Language::English => format!("/{command_name} is not implemented yet."),
    }
}

/// The error text is cut short so the whole message fits in one Discord message.
pub fn error_occurred(language: Language, error: &str) -> String {
    let header = match language {
        Language::Japanese => "エラーが発生しました。\n",
        Language::English => "An error occurred.\n",
    };
    let budget = limits::MAX_MESSAGE_LENGTH.saturating_sub(header.chars().count());
    format!("{header}{}", truncate(error, budget))
}

fn truncate(text: &str, max_chars: usize) -> String {
    const ELLIPSIS: char = '…';

    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push(ELLIPSIS);
    truncated
}
