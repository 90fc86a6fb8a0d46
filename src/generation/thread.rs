use std::sync::OnceLock;

use regex::Regex;

pub const TWEET_LIMIT: usize = 280;
/// Packing target for the deterministic splitter; leaves headroom for the
/// "(i/n)" suffix and the lead marker on the first tweet.
pub const TWEET_TARGET: usize = 240;

const THREAD_MARKER: &str = "🧵";
const KEEP_READING_CUE: &str = "Keep reading 👇";

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\s*[.)]\s*").expect("valid ordinal pattern"))
}

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?。！？][\"'）)\]]*\s+"#).expect("valid sentence boundary pattern")
    })
}

/// Best-effort detection of a model that declined to produce the requested
/// output. Intentionally simple substring matching; callers fall back to
/// deterministic splitting rather than erroring.
pub fn looks_like_refusal(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    ["i'm sorry", "i am sorry", "cannot assist", "unable to comply"]
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// One tweet per non-empty line, with leading ordinal markers ("1. ", "2) ")
/// stripped and anything over the limit hard-truncated.
pub fn parse_model_thread(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let stripped = ordinal_re().replace(line, "").trim().to_string();
            if stripped.is_empty() {
                None
            } else {
                Some(truncate_chars(&stripped, TWEET_LIMIT))
            }
        })
        .collect()
}

/// Deterministic thread construction from arbitrary prose: paragraph and
/// sentence boundaries where the text has them, character wraps where it
/// does not.
pub fn fallback_thread(source: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(source) {
        for piece in wrap_chars(&sentence, TWEET_TARGET) {
            let current_len = current.chars().count();
            let piece_len = piece.chars().count();
            if current.is_empty() {
                current = piece;
            } else if current_len + 1 + piece_len <= TWEET_TARGET {
                current.push(' ');
                current.push_str(&piece);
            } else {
                chunks.push(std::mem::take(&mut current));
                current = piece;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    decorate(chunks)
}

fn decorate(chunks: Vec<String>) -> Vec<String> {
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let text = if index == 0 {
                if total > 1 {
                    format!("{THREAD_MARKER} {chunk} {KEEP_READING_CUE}")
                } else {
                    format!("{THREAD_MARKER} {chunk}")
                }
            } else {
                format!("{chunk} ({}/{total})", index + 1)
            };
            // decoration can push past the limit; truncate, never re-wrap
            truncate_chars(&text, TWEET_LIMIT)
        })
        .collect()
}

fn split_sentences(source: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for paragraph in source.split("\n\n") {
        let normalized = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            continue;
        }
        let mut start = 0;
        for boundary in sentence_boundary_re().find_iter(&normalized) {
            let sentence = normalized[start..boundary.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = boundary.end();
        }
        let tail = normalized[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }
    sentences
}

fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_refusals_and_empty_output() {
        assert!(looks_like_refusal(""));
        assert!(looks_like_refusal("   \n "));
        assert!(looks_like_refusal("I'm sorry, I can't help with that."));
        assert!(looks_like_refusal("I CANNOT ASSIST with this request"));
        assert!(!looks_like_refusal("1. Here is the first tweet"));
    }

    #[test]
    fn strips_ordinal_markers_from_model_output() {
        let parsed = parse_model_thread("1. first tweet\n\n2) second tweet\n3. third");
        assert_eq!(parsed, vec!["first tweet", "second tweet", "third"]);
    }

    #[test]
    fn hard_truncates_oversized_model_lines() {
        let long_line = "x".repeat(400);
        let parsed = parse_model_thread(&long_line);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].chars().count(), TWEET_LIMIT);
    }

    #[test]
    fn fallback_decorates_first_tweet_and_indexes_the_rest() {
        let source = "This is sentence one about a topic. This is sentence two with more detail. "
            .repeat(20);
        let thread = fallback_thread(&source);

        assert!(thread.len() > 1);
        assert!(thread[0].starts_with(THREAD_MARKER));
        assert!(thread[0].contains(KEEP_READING_CUE));
        let total = thread.len();
        for (index, tweet) in thread.iter().enumerate() {
            assert!(tweet.chars().count() <= TWEET_LIMIT, "tweet over limit: {tweet}");
            if index == 0 {
                continue;
            }
            assert!(!tweet.contains(THREAD_MARKER));
            assert!(
                tweet.ends_with(&format!("({}/{total})", index + 1)),
                "missing index suffix: {tweet}"
            );
        }
    }

    #[test]
    fn single_short_text_yields_one_marked_tweet() {
        let thread = fallback_thread("Just one short thought.");
        assert_eq!(thread.len(), 1);
        assert!(thread[0].starts_with(THREAD_MARKER));
        assert!(!thread[0].contains(KEEP_READING_CUE));
    }

    #[test]
    fn sentence_longer_than_target_is_hard_wrapped() {
        // no sentence punctuation at all, e.g. a language without western
        // sentence structure
        let source = "क".repeat(600);
        let thread = fallback_thread(&source);
        assert!(thread.len() > 1);
        for tweet in &thread {
            assert!(tweet.chars().count() <= TWEET_LIMIT);
        }
    }

    #[test]
    fn multibyte_truncation_respects_char_boundaries() {
        let text = "é".repeat(300);
        let truncated = truncate_chars(&text, TWEET_LIMIT);
        assert_eq!(truncated.chars().count(), TWEET_LIMIT);
    }
}
