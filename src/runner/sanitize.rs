//! Prompt sanitizer.
//!
//! The prompt is handed to the agent as a literal argv entry (never through a
//! shell), but it is still reduced to a strict allow-list first. This is lossy
//! on purpose: anything outside ASCII letters and digits, whitespace and
//! `-_.,@/` is dropped.

use crate::error::{MeshError, MeshResult};

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 10_000;

const ALLOWED_PUNCTUATION: &[char] = &['-', '_', '.', ',', '@', '/'];

/// Whether `c` survives sanitization.
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c)
}

/// Bound and filter a prompt before it reaches a process argument list.
///
/// Rejects prompts over [`MAX_PROMPT_CHARS`] and prompts with nothing left
/// after filtering. Retained characters keep their relative order.
pub fn sanitize_prompt(prompt: &str) -> MeshResult<String> {
    let len = prompt.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(MeshError::PromptTooLong {
            len,
            max: MAX_PROMPT_CHARS,
        });
    }

    let sanitized: String = prompt.chars().filter(|&c| is_allowed(c)).collect();
    if sanitized.trim().is_empty() {
        return Err(MeshError::EmptyPrompt);
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_shell_metacharacters() {
        let out = sanitize_prompt("review src/main.rs; rm -rf / && echo $(whoami) `id`")
            .expect("sanitize");
        assert_eq!(out, "review src/main.rs rm -rf /  echo whoami id");
    }

    #[test]
    fn keeps_allowed_punctuation_and_whitespace() {
        let input = "a-b_c.d,e@f/g\tline\nnext";
        assert_eq!(sanitize_prompt(input).expect("sanitize"), input);
    }

    #[test]
    fn output_only_contains_allowed_chars_in_order() {
        let input = "Fix: the {bug} in \"parser.rs\" (line 42)! <now>?";
        let out = sanitize_prompt(input).expect("sanitize");
        assert!(out.chars().all(is_allowed));

        let expected: String = input.chars().filter(|&c| is_allowed(c)).collect();
        assert_eq!(out, expected);
        assert_eq!(out, "Fix the bug in parser.rs line 42 now");
    }

    #[test]
    fn rejects_over_ceiling() {
        let long = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert!(matches!(
            sanitize_prompt(&long),
            Err(MeshError::PromptTooLong { len, max }) if len == MAX_PROMPT_CHARS + 1 && max == MAX_PROMPT_CHARS
        ));
    }

    #[test]
    fn accepts_exactly_at_ceiling() {
        let exact = "a".repeat(MAX_PROMPT_CHARS);
        assert_eq!(sanitize_prompt(&exact).expect("sanitize").len(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn ceiling_counts_characters_not_bytes() {
        // 'é' is two bytes in UTF-8.
        let mut accented = "é".repeat(MAX_PROMPT_CHARS - 1);
        accented.push('a');
        assert_eq!(sanitize_prompt(&accented).expect("sanitize"), "a");
    }

    #[test]
    fn non_ascii_letters_dropped() {
        assert_eq!(sanitize_prompt("café ünïcode").expect("sanitize"), "caf ncode");
    }

    #[test]
    fn rejects_blank_result() {
        assert!(matches!(sanitize_prompt(""), Err(MeshError::EmptyPrompt)));
        assert!(matches!(sanitize_prompt("$$$ ;;; !!!"), Err(MeshError::EmptyPrompt)));
    }
}
