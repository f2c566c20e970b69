/*!
format.rs

Human output helpers for the smoke-test commands: colored roles, a boxed
header and a plain column table. JSON output paths never use these.

Style detection:
  - NO_COLOR  disables ANSI colors
  - NO_EMOJI  disables status glyphs
  - COLUMNS   terminal width hint (clamped to 40..=220, default 100)
*/

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    /// No color, no emoji, fixed width.
    #[cfg(test)]
    pub fn plain(term_width: usize) -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "info" => "ℹ",
        "list" => "📜",
        "tool" => "🛠",
        _ => "",
    }
}

/// One-line boxed title with an optional dimmed subtitle.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let mut inner = color(Role::Primary, title.as_ref(), style);
    if let Some(sub) = subtitle {
        inner.push_str("  ");
        inner.push_str(&color(Role::Secondary, sub.as_ref(), style));
    }
    let max_inner = style.term_width.saturating_sub(4).max(10);
    let inner = if display_width(&inner) > max_inner {
        truncate_ellipsis(&strip_ansi(&inner), max_inner)
    } else {
        inner
    };
    let width = display_width(&inner) + 2;
    let bar = "─".repeat(width);
    format!("┌{bar}┐\n│ {inner} │\n└{bar}┘")
}

/// Column table; the widest columns shrink first when over `term_width`.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let gap = 2;
    let mut total: usize = widths.iter().sum::<usize>() + gap * (cols - 1);
    while total > style.term_width {
        let Some((idx, widest)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w)
        else {
            break;
        };
        if widest <= 4 {
            break;
        }
        widths[idx] -= 1;
        total -= 1;
    }

    let mut lines = vec![color(Role::Accent, render_row(headers, &widths, gap), style)];
    let sep = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join(&" ".repeat(gap));
    lines.push(color(Role::Dim, sep, style));
    for row in rows {
        let cells: Vec<&str> = (0..cols)
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(render_row(&cells, &widths, gap));
    }
    lines.join("\n")
}

fn render_row(cells: &[&str], widths: &[usize], gap: usize) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| pad(&truncate_ellipsis(c, *w), *w))
        .collect::<Vec<_>>()
        .join(&" ".repeat(gap))
        .trim_end()
        .to_string()
}

fn pad(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Remove CSI color sequences (ESC '[' ... letter).
fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_header_plain() {
        let b = box_header("Tools (9)", Some("12 ms"), &StyleOptions::plain(80));
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "│ Tools (9)  12 ms │");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
    }

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["#", "NAME"],
            &[
                vec!["1".into(), "job_list".into()],
                vec!["10".into(), "s9s_exec".into()],
            ],
            &StyleOptions::plain(80),
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "#   NAME");
        assert_eq!(lines[1], "--  --------");
        assert_eq!(lines[3], "10  s9s_exec");
    }

    #[test]
    fn table_shrinks_to_width() {
        let long = "x".repeat(100);
        let t = table(&["A", "B"], &[vec!["a".into(), long]], &StyleOptions::plain(40));
        assert!(t.lines().all(|l| l.chars().count() <= 40));
        assert!(t.contains('…'));
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_ellipsis("abcdef", 4), "abc…");
        assert_eq!(truncate_ellipsis("abc", 4), "abc");
    }

    #[test]
    fn strip_colors() {
        assert_eq!(strip_ansi("\x1b[38;5;196mRED\x1b[0m"), "RED");
    }
}
