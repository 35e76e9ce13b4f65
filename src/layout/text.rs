use crate::text_metrics;

pub(crate) const ELLIPSIS: char = '\u{2026}';

/// Splits `text` into lines no wider than `max_width` px, keeping at most `max_lines` lines.
/// Overflow is cut at a word boundary and marked with an ellipsis.
pub(crate) fn wrap_text(
    text: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    max_lines: usize,
) -> Vec<String> {
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font_size, font_family));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let max_lines = max_lines.max(1);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            truncate_with_ellipsis(last, max_width, font_size, font_family);
        }
    }
    lines
}

fn truncate_with_ellipsis(line: &mut String, max_width: f32, font_size: f32, font_family: &str) {
    line.push(ELLIPSIS);
    while text_width(line, font_size, font_family) > max_width {
        line.pop();
        let Some(cut) = line.rfind(' ') else {
            line.push(ELLIPSIS);
            return;
        };
        line.truncate(cut);
        line.push(ELLIPSIS);
    }
}

/// Em-relative advance estimate by character class, used when no font is installed.
pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.31,
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.26,
        'f' | 'r' | 't' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' | '-' => 0.35,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.90,
        'A'..='Z' | '#' | '&' => 0.66,
        'a'..='z' | '0'..='9' => 0.57,
        _ => 0.60,
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

pub(crate) fn wrap_line(line: &str, max_width: f32, font_size: f32, font_family: &str) -> Vec<String> {
    if text_width(line, font_size, font_family) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, font_size, font_family) > max_width {
            if !current.is_empty() {
                lines.push(current.clone());
                current.clear();
            }
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_trims_whitespace() {
        assert_eq!(split_lines("  hello  \n  world  "), vec!["hello", "world"]);
        assert_eq!(split_lines("a\r\nb"), vec!["a", "b"]);
    }

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }

    #[test]
    fn char_width_factor_orders_narrow_and_wide_glyphs() {
        assert!(char_width_factor('i') < char_width_factor('a'));
        assert!(char_width_factor('a') < char_width_factor('H'));
        assert!(char_width_factor('H') < char_width_factor('W'));
    }

    #[test]
    fn fallback_text_width_scales_with_font_size() {
        let w16 = fallback_text_width("Hello", 16.0);
        let w32 = fallback_text_width("Hello", 32.0);
        assert!((w32 - w16 * 2.0).abs() < 0.01, "width should double with font size");
    }

    #[test]
    fn wrap_line_does_not_wrap_short_text() {
        let result = wrap_line("short", 1000.0, 16.0, "sans-serif");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn wrap_line_splits_long_text() {
        let result = wrap_line(
            "this is a rather long line that should be wrapped",
            100.0,
            16.0,
            "sans-serif",
        );
        assert!(result.len() > 1, "expected wrapping, got {:?}", result);
    }

    #[test]
    fn wrap_text_limits_lines_and_marks_overflow() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let lines = wrap_text(text, 80.0, 16.0, "sans-serif", 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(ELLIPSIS), "got {:?}", lines);
    }

    #[test]
    fn wrap_text_empty_string_produces_single_line() {
        assert_eq!(wrap_text("", 100.0, 16.0, "sans-serif", 3), vec![String::new()]);
    }
}
