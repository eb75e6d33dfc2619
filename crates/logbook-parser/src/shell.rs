use logbook_types::ShellKind;

const POSIX_SHELLS: &[&str] = &["bash", "zsh", "fish", "dash", "ksh", "sh"];
const WINDOWS_SHELLS: &[&str] = &["powershell", "pwsh", "cmd"];

/// Classify an explicit shell field (a name or a full interpreter path).
pub(crate) fn classify_shell_field(value: &str) -> ShellKind {
    let name = value
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_lowercase();
    let name = name.strip_suffix(".exe").unwrap_or(&name);

    if WINDOWS_SHELLS.contains(&name) {
        ShellKind::Windows
    } else if POSIX_SHELLS.contains(&name) {
        ShellKind::Posix
    } else {
        ShellKind::Unknown
    }
}

/// Keyword classification over header text and environment-context blocks.
pub(crate) fn classify_shell_text(text: &str) -> ShellKind {
    let haystack = text.to_lowercase();

    for keyword in ["powershell", "pwsh", "cmd.exe"] {
        if contains_word(&haystack, keyword) {
            return ShellKind::Windows;
        }
    }
    for keyword in ["bash", "zsh", "fish", "dash", "/bin/sh"] {
        if contains_word(&haystack, keyword) {
            return ShellKind::Posix;
        }
    }
    ShellKind::Unknown
}

/// Occurrence with non-word characters (or text boundaries) on both sides,
/// so "zsh" inside an identifier does not count.
fn contains_word(haystack: &str, word: &str) -> bool {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(word) {
        let start = from + offset;
        let end = start + word.len();
        let left_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .unwrap()
                .is_alphanumeric();
        let right_ok = end == haystack.len()
            || !haystack[end..].chars().next().unwrap().is_alphanumeric();
        if left_ok && right_ok {
            return true;
        }
        from = end;
    }
    false
}
