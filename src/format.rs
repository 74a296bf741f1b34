use colored::Colorize;
use regex::Regex;
use std::sync::LazyLock;

use crate::message::{Message, Role};

/// Numeric citation markers such as `[1]` or `[12]`.
static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid citation regex"));

/// Runs of spaces and tabs after text. Indentation and newlines are left
/// alone.
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S)[ \t]{2,}").expect("valid whitespace regex"));

/// Format a message for terminal display with role label and colors.
pub fn format_message(msg: &Message) -> String {
    let label = format_role_label(&msg.role);
    let body = format_body(msg.text(), &msg.role);
    format!("{}\n{}", label, body)
}

fn format_role_label(role: &Role) -> String {
    match role {
        Role::User => format!("{}", "you:".green().bold()),
        Role::Assistant => format!("{}", "ai:".cyan().bold()),
        Role::System => format!("{}", "system:".dimmed()),
    }
}

fn format_body(text: &str, role: &Role) -> String {
    match role {
        Role::User => text.to_string(),
        Role::Assistant => render_markdown_lite(text),
        Role::System => text.dimmed().to_string(),
    }
}

/// Removes `[n]` citation markers left by search-backed models and tidies
/// the spacing they leave behind. Line structure is preserved so lists and
/// code blocks still render.
pub fn strip_citations(text: &str) -> String {
    let without = CITATION.replace_all(text, "");
    let collapsed = INLINE_SPACE.replace_all(&without, "${1} ");
    collapsed
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Minimal markdown renderer for terminal output.
/// Not a full parser. Handles headings, bold, inline code and fenced
/// code blocks.
pub fn render_markdown_lite(text: &str) -> String {
    let mut output = String::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_code_block {
                in_code_block = false;
                output.push('\n');
            } else {
                in_code_block = true;
                let lang = line.trim_start().trim_start_matches('`').trim();
                if !lang.is_empty() {
                    output.push_str(&format!("  {}\n", lang.dimmed()));
                }
            }
            continue;
        }

        if in_code_block {
            output.push_str(&format!("  {}\n", line.dimmed()));
            continue;
        }

        if let Some(heading) = heading_text(line) {
            output.push_str(&render_inline(heading).bold().underline().to_string());
            output.push('\n');
            continue;
        }

        output.push_str(&render_inline(line));
        output.push('\n');
    }

    if output.ends_with('\n') {
        output.pop();
    }
    output
}

/// `# Title` through `###### Title`.
fn heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    line[hashes..].strip_prefix(' ').map(str::trim)
}

/// Handle **bold** and `inline code` within a single line.
fn render_inline(line: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if i + 1 < len && chars[i] == '*' && chars[i + 1] == '*' {
            if let Some(end) = find_closing(&chars, i + 2, &['*', '*']) {
                let bold_text: String = chars[i + 2..end].iter().collect();
                result.push_str(&bold_text.bold().to_string());
                i = end + 2;
                continue;
            }
        }

        if chars[i] == '`' {
            if let Some(end) = find_closing(&chars, i + 1, &['`']) {
                let code_text: String = chars[i + 1..end].iter().collect();
                result.push_str(&code_text.yellow().to_string());
                i = end + 1;
                continue;
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

fn find_closing(chars: &[char], start: usize, pattern: &[char]) -> Option<usize> {
    if start > chars.len() {
        return None;
    }
    chars[start..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|pos| start + pos)
}
