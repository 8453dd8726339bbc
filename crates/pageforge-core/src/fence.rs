//! Markdown code-fence stripping for streamed model output
//!
//! Models are told to return raw HTML but routinely wrap it in
//! ` ```html ... ``` `. The stripper removes those markers while text is still
//! streaming. A fragment that ends in the middle of a marker (for example
//! `` "``" `` or `` "```ht" ``) is held back until the next fragment decides it.

const OPEN_FENCE: &str = "```html";
const FENCE: &str = "```";

/// Remove every fence marker from a complete piece of text.
pub fn strip_fences(text: &str) -> String {
    text.replace(OPEN_FENCE, "").replace(FENCE, "")
}

/// Incremental fence stripper.
///
/// Feed fragments in arrival order with [`push`](Self::push) and call
/// [`finish`](Self::finish) once the stream ends. The concatenation of
/// everything returned equals [`strip_fences`] applied to the concatenated input.
#[derive(Debug, Default)]
pub struct FenceStripper {
    pending: String,
}

impl FenceStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip one fragment, returning the text that is safe to emit now.
    pub fn push(&mut self, fragment: &str) -> String {
        let mut text = std::mem::take(&mut self.pending);
        text.push_str(fragment);

        let hold = held_suffix_len(&text);
        let split = text.len() - hold;
        self.pending = text[split..].to_string();
        strip_fences(&text[..split])
    }

    /// Flush whatever is still held back.
    pub fn finish(&mut self) -> String {
        strip_fences(&std::mem::take(&mut self.pending))
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of the open fence.
fn held_suffix_len(text: &str) -> usize {
    (1..OPEN_FENCE.len())
        .rev()
        .find(|&n| text.ends_with(&OPEN_FENCE[..n]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> String {
        let mut stripper = FenceStripper::new();
        let mut out: String = fragments.iter().map(|f| stripper.push(f)).collect();
        out.push_str(&stripper.finish());
        out
    }

    #[test]
    fn test_strip_fences_removes_both_markers() {
        assert_eq!(strip_fences("```html\n<p>x</p>\n```"), "\n<p>x</p>\n");
        assert_eq!(strip_fences("no fences"), "no fences");
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let out = run(&["<!DOCTYPE html>", "<html>```html", "</html>```"]);
        assert_eq!(out, "<!DOCTYPE html><html></html>");
    }

    #[test]
    fn test_marker_split_across_fragments_is_removed() {
        assert_eq!(run(&["``", "`html<div>", "</div>`", "``"]), "<div></div>");
        assert_eq!(run(&["```ht", "ml<p>a</p>"]), "<p>a</p>");
    }

    #[test]
    fn test_matches_whole_text_stripping_for_arbitrary_splits() {
        let text = "```html\n<!DOCTYPE html><html><body>`code`</body></html>\n```";
        for cut in 0..=text.len() {
            let (a, b) = text.split_at(cut);
            assert_eq!(run(&[a, b]), strip_fences(text), "cut at {}", cut);
        }
    }

    #[test]
    fn test_lone_backticks_survive() {
        assert_eq!(run(&["a `b` c", "``"]), "a `b` c``");
    }

    #[test]
    fn test_push_holds_back_partial_marker() {
        let mut stripper = FenceStripper::new();
        assert_eq!(stripper.push("<p>``"), "<p>");
        assert_eq!(stripper.push("x"), "``x");
        assert_eq!(stripper.finish(), "");
    }
}
