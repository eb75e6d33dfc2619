use regex::Regex;
use std::sync::LazyLock;

pub(crate) const INSTRUCTIONS_OPEN: &str = "<user_instructions>";
pub(crate) const INSTRUCTIONS_CLOSE: &str = "</user_instructions>";
pub(crate) const ENVIRONMENT_OPEN: &str = "<environment_context>";
pub(crate) const ENVIRONMENT_CLOSE: &str = "</environment_context>";
pub(crate) const CWD_OPEN: &str = "<cwd>";
pub(crate) const CWD_CLOSE: &str = "</cwd>";
pub(crate) const CWD_LINE_PREFIX: &str = "Current working directory:";

/// Absolute-path-looking token: drive-letter or rooted form. Last-resort
/// working-directory heuristic only; see `FoldState::absorb_text_for_cwd`.
static ABS_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z]:[\\/][^\s"'<>]+|/[^\s"'<>]+"#).unwrap());

/// One piece of a text field after tag splitting.
pub(crate) enum Segment {
    Instructions(String),
    Environment(String),
    Plain(String),
}

/// Split the recognized inline blocks off the front of a text field.
///
/// The writer emits `<user_instructions>` / `<environment_context>` blocks as
/// literal prefixes; anything after the blocks (or a block with no closing
/// tag) is plain text.
pub(crate) fn split_tagged(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text.trim_start();

    loop {
        if let Some(after) = rest.strip_prefix(INSTRUCTIONS_OPEN) {
            let Some(end) = after.find(INSTRUCTIONS_CLOSE) else {
                segments.push(Segment::Plain(rest.trim().to_string()));
                return segments;
            };
            segments.push(Segment::Instructions(after[..end].trim().to_string()));
            rest = after[end + INSTRUCTIONS_CLOSE.len()..].trim_start();
        } else if let Some(after) = rest.strip_prefix(ENVIRONMENT_OPEN) {
            let Some(end) = after.find(ENVIRONMENT_CLOSE) else {
                segments.push(Segment::Plain(rest.trim().to_string()));
                return segments;
            };
            segments.push(Segment::Environment(after[..end].trim().to_string()));
            rest = after[end + ENVIRONMENT_CLOSE.len()..].trim_start();
        } else {
            break;
        }
    }

    if !rest.is_empty() {
        segments.push(Segment::Plain(rest.trim_end().to_string()));
    }
    segments
}

/// Case/whitespace-insensitive form used to deduplicate repeated
/// instructions text across the header and inline recurrences.
pub(crate) fn normalize_for_dedup(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A line that is just a filesystem path, which must not become a preview.
pub(crate) fn looks_like_path(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return false;
    }

    trimmed.starts_with('/')
        || trimmed.starts_with('\\')
        || trimmed.starts_with('~')
        || trimmed.starts_with("./")
        || is_drive_letter_path(trimmed)
}

fn is_drive_letter_path(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Extract a working directory from the delimited tag or the
/// "Current working directory:" line form, if either appears in the text.
pub(crate) fn extract_cwd_marker(text: &str) -> Option<String> {
    if let Some(start) = text.find(CWD_OPEN) {
        let after = &text[start + CWD_OPEN.len()..];
        let end = after
            .find(CWD_CLOSE)
            .or_else(|| after.find(['"', '\n']))
            .unwrap_or(after.len());
        return clean_path_text(&after[..end]);
    }

    if let Some(start) = text.find(CWD_LINE_PREFIX) {
        let after = &text[start + CWD_LINE_PREFIX.len()..];
        let end = after.find(['"', '\n', '<']).unwrap_or(after.len());
        return clean_path_text(&after[..end]);
    }

    None
}

/// First absolute-path-looking token of depth >= 2 in the text. Best-effort
/// tier only; inherently ambiguous (a path mentioned in conversation matches
/// just as well), so callers never let it override a structured or marker
/// hit.
pub(crate) fn first_absolute_path_token(text: &str) -> Option<String> {
    for found in ABS_PATH_REGEX.find_iter(text) {
        // Reject matches glued to a URL scheme or identifier.
        if found.start() > 0 {
            let prev = text[..found.start()].chars().next_back().unwrap();
            if prev.is_alphanumeric() || prev == ':' || prev == '/' || prev == '\\' {
                continue;
            }
        }

        let token = found.as_str();
        let separators = token.chars().filter(|&c| c == '/' || c == '\\').count();
        if separators >= 2
            && let Some(cleaned) = clean_path_text(token)
        {
            return Some(cleaned);
        }
    }
    None
}

fn clean_path_text(text: &str) -> Option<String> {
    let cleaned = text
        .trim()
        .trim_matches('"')
        .trim_end_matches(['.', ',', ';', ')'])
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tagged_extracts_prefix_blocks() {
        let text = "<user_instructions>do X</user_instructions><environment_context>shell: bash</environment_context>hello";
        let segments = split_tagged(text);
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[0], Segment::Instructions(t) if t == "do X"));
        assert!(matches!(&segments[1], Segment::Environment(t) if t == "shell: bash"));
        assert!(matches!(&segments[2], Segment::Plain(t) if t == "hello"));
    }

    #[test]
    fn unclosed_block_stays_plain() {
        let segments = split_tagged("<user_instructions>do X");
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Plain(_)));
    }

    #[test]
    fn dedup_normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_for_dedup("Do  X\n  now"), normalize_for_dedup("do x now"));
    }

    #[test]
    fn path_lines_are_detected() {
        assert!(looks_like_path("/home/dev/project"));
        assert!(looks_like_path(r"C:\Users\dev"));
        assert!(looks_like_path("~/notes"));
        assert!(!looks_like_path("fix the bug in /home/dev/project"));
        assert!(!looks_like_path("hello"));
    }

    #[test]
    fn cwd_markers_extract() {
        assert_eq!(
            extract_cwd_marker("<cwd>/home/dev/project</cwd>").as_deref(),
            Some("/home/dev/project")
        );
        assert_eq!(
            extract_cwd_marker("Current working directory: /home/dev/project\nmore").as_deref(),
            Some("/home/dev/project")
        );
        assert!(extract_cwd_marker("no markers here").is_none());
    }

    #[test]
    fn absolute_path_token_requires_depth() {
        assert_eq!(
            first_absolute_path_token("see /home/dev/project for details").as_deref(),
            Some("/home/dev/project")
        );
        assert!(first_absolute_path_token("see /tmp for details").is_none());
        // URL interiors do not count as rooted paths
        assert!(first_absolute_path_token("https://example.com/a/b").is_none());
        assert_eq!(
            first_absolute_path_token(r#"ran in D:\work\repo today"#).as_deref(),
            Some(r"D:\work\repo")
        );
    }
}
