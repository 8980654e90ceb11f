/// Longest file name we will produce, leaving room for an extension.
const MAX_LEN: usize = 250;

/// Turn an arbitrary card/board/attachment name into a safe file name.
///
/// Non-ASCII and punctuation are dropped, runs of whitespace/dashes/underscores
/// collapse to a single dash, dot runs collapse to a single dot. When nothing
/// survives, `fallback` (typically the Trello id) is used instead.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = false;
    let mut prev_dot = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_dash = false;
            prev_dot = false;
        } else if c == '.' {
            if !prev_dot {
                out.push('.');
            }
            prev_dot = true;
            prev_dash = false;
        } else if c.is_whitespace() || c == '-' || c == '_' {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
            prev_dot = false;
        }
        // Everything else (path separators, quotes, non-ASCII) is dropped.
    }
    let trimmed: String = out
        .trim_matches(|c| c == '-' || c == '.')
        .chars()
        .take(MAX_LEN)
        .collect();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(sanitize_filename("notes.txt", "id"), "notes.txt");
    }

    #[test]
    fn collapses_spaces_to_dashes() {
        assert_eq!(sanitize_filename("Write   spec", "id"), "Write-spec");
    }

    #[test]
    fn strips_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd", "id"), "etcpasswd");
        assert_eq!(sanitize_filename("a/b\\c", "id"), "abc");
    }

    #[test]
    fn collapses_dot_runs() {
        assert_eq!(sanitize_filename("report...final.docx", "id"), "report.final.docx");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(sanitize_filename("--hello--", "id"), "hello");
        assert_eq!(sanitize_filename(".hidden.", "id"), "hidden");
    }

    #[test]
    fn falls_back_to_id_when_nothing_survives() {
        assert_eq!(sanitize_filename("???", "5f2a"), "5f2a");
        assert_eq!(sanitize_filename("", "5f2a"), "5f2a");
    }

    #[test]
    fn truncates_very_long_names() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_filename(&long, "id").len(), 250);
    }

    #[test]
    fn drops_non_ascii() {
        assert_eq!(sanitize_filename("résumé café", "id"), "rsum-caf");
    }
}
