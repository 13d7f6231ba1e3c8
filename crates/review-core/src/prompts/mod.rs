//! Prompt construction
//!
//! Prompts and the template report are pure functions of their inputs:
//! numbers are formatted here and handed to bilingual MiniJinja templates.

mod language;
mod market;
mod stock;
mod template;

pub use language::Language;
pub use market::{MarketMood, render_review_prompt, render_template_review, review_system_prompt};
pub use stock::{render_stock_prompt, stock_system_prompt};
pub use template::BilingualTemplate;

/// First `max` characters of a string
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `↑1.23%`, `↓0.50%` or `-0.00%`
pub(crate) fn directional_pct(pct: f64) -> String {
    let arrow = if pct > 0.0 {
        "↑"
    } else if pct < 0.0 {
        "↓"
    } else {
        "-"
    };
    format!("{arrow}{:.2}%", pct.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("沪深两市成交额", 4), "沪深两市");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_directional_pct() {
        assert_eq!(directional_pct(1.234), "↑1.23%");
        assert_eq!(directional_pct(-0.5), "↓0.50%");
        assert_eq!(directional_pct(0.0), "-0.00%");
    }
}
