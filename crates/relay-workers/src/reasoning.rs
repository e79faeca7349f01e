const OPEN_PREFIX: &[u8] = b"<think";
const CLOSE_TAG: &[u8] = b"</think>";

/// Strips every `<think>…</think>` or self-closing `<think/>`/`<think />`
/// block from `text`, then trims leading/trailing ASCII whitespace (spec
/// §4.3). Tag matching is case-insensitive on the literal "think"; an
/// opening tag with no matching close strips the remainder of the text.
/// Returns the stripped text; an empty result signals the caller should
/// substitute a fallback.
#[must_use]
pub fn strip_reasoning(text: &str) -> String {
    let bytes = text.as_bytes();
    let lower = text.to_ascii_lowercase().into_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if lower[i..].starts_with(OPEN_PREFIX) {
            let after_prefix = i + OPEN_PREFIX.len();
            if let Some(end) = self_closing_end(&lower, after_prefix) {
                i = end;
                continue;
            }
            if lower.get(after_prefix) == Some(&b'>') {
                let open_end = after_prefix + 1;
                i = match find(&lower[open_end..], CLOSE_TAG) {
                    Some(rel) => open_end + rel + CLOSE_TAG.len(),
                    None => bytes.len(),
                };
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    let combined = String::from_utf8(out).expect("byte ranges copied verbatim from valid UTF-8");
    combined.trim_matches(|c: char| c.is_ascii_whitespace()).to_owned()
}

/// If `lower[pos..]` is (optional ASCII whitespace) followed by `/>`,
/// returns the index just past it.
fn self_closing_end(lower: &[u8], pos: usize) -> Option<usize> {
    let mut cursor = pos;
    while lower.get(cursor).is_some_and(u8::is_ascii_whitespace) {
        cursor += 1;
    }
    if lower[cursor..].starts_with(b"/>") {
        Some(cursor + 2)
    } else {
        None
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_balanced_block() {
        assert_eq!(
            strip_reasoning("before <think>internal musing</think> after"),
            "before  after"
        );
    }

    #[test]
    fn strips_case_insensitively() {
        assert_eq!(strip_reasoning("<THINK>nope</THINK>answer"), "answer");
    }

    #[test]
    fn strips_self_closing_variants() {
        assert_eq!(strip_reasoning("a<think/>b"), "ab");
        assert_eq!(strip_reasoning("a<think />b"), "ab");
    }

    #[test]
    fn unclosed_open_tag_strips_remainder() {
        assert_eq!(strip_reasoning("keep this <think>everything after is gone"), "keep this");
    }

    #[test]
    fn preserves_lookalike_tags() {
        assert_eq!(strip_reasoning("<thinking>kept</thinking>"), "<thinking>kept</thinking>");
        assert_eq!(strip_reasoning("<thin>kept</thin>"), "<thin>kept</thin>");
    }

    #[test]
    fn trims_surrounding_whitespace_after_stripping() {
        assert_eq!(strip_reasoning("  <think>x</think>  answer  "), "answer");
    }

    #[test]
    fn fully_reasoning_text_yields_empty_string() {
        assert_eq!(strip_reasoning("<think>only reasoning</think>"), "");
    }
}
