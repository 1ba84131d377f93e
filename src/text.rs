pub mod chunking;
pub mod sentence_data;

use sentence_data::SentenceData;
use std::collections::{HashMap, HashSet};

pub struct SentenceSplitter {
    abbreviations: HashSet<String>,
    stop_chars: HashSet<char>,
    force: HashSet<char>,
    closers: HashSet<char>,
    parentheses: HashMap<char, char>,
}

impl SentenceSplitter {
    // terminators that need whitespace (or end of text) after them
    pub const STOP_CHARS: [char; 4] = ['.', '!', '?', '…'];

    // full-width terminators split immediately
    pub const FORCE_STOP_CHARS: [char; 4] = ['。', '．', '！', '？'];

    // closing marks that stay with the sentence they end
    pub const CLOSERS: [char; 10] = [')', ']', '"', '\'', '”', '’', '»', '」', '』', '】'];

    // 地の文だけをまとめる括弧。この中では区切らない。
    pub const PARENTHESES: [(char, char); 3] = [('「', '」'), ('『', '』'), ('【', '】')];

    pub fn new(data: &SentenceData) -> Self {
        SentenceSplitter {
            abbreviations: data.abbreviations().clone(),
            stop_chars: Self::STOP_CHARS.iter().cloned().collect(),
            force: Self::FORCE_STOP_CHARS.iter().cloned().collect(),
            closers: Self::CLOSERS.iter().cloned().collect(),
            parentheses: Self::PARENTHESES.iter().cloned().collect(),
        }
    }

    /// Split `text` into trimmed, non-empty sentences in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut sentences: Vec<String> = vec![];
        let mut waiting_stack: Vec<char> = vec![];
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == '\n' && Self::is_paragraph_break(&chars, i) {
                waiting_stack.clear();
                Self::push_sentence(&mut sentences, &chars[start..i]);
                start = i + 1;
                i += 1;
                continue;
            }
            if let Some(t) = self.parentheses.get(&c) {
                // an opening mark without its closer in this paragraph is plain text
                if Self::closes_in_paragraph(&chars, i + 1, *t) {
                    waiting_stack.push(*t);
                }
                i += 1;
                continue;
            }
            if let Some(d) = waiting_stack.last() {
                if c == *d {
                    waiting_stack.pop();
                }
                i += 1;
                continue;
            }

            if self.force.contains(&c) {
                let end = self.skip_closers(&chars, i + 1);
                Self::push_sentence(&mut sentences, &chars[start..end]);
                start = end;
                i = end;
            } else if self.stop_chars.contains(&c) {
                let mut run_end = i + 1;
                while run_end < chars.len() && self.stop_chars.contains(&chars[run_end]) {
                    run_end += 1;
                }
                let end = self.skip_closers(&chars, run_end);
                let followed_by_space = end == chars.len() || chars[end].is_whitespace();
                let is_period_only = chars[i..run_end].iter().all(|ch| *ch == '.');

                if followed_by_space
                    && !(is_period_only && self.period_continues(&chars, start, i, end))
                {
                    Self::push_sentence(&mut sentences, &chars[start..end]);
                    start = end;
                }
                i = end;
            } else {
                i += 1;
            }
        }
        if start < chars.len() {
            Self::push_sentence(&mut sentences, &chars[start..]);
        }
        sentences
    }

    fn push_sentence(sentences: &mut Vec<String>, buf: &[char]) {
        let s: String = buf.iter().collect();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
    }

    fn skip_closers(&self, chars: &[char], mut pos: usize) -> usize {
        while pos < chars.len() && self.closers.contains(&chars[pos]) {
            pos += 1;
        }
        pos
    }

    fn closes_in_paragraph(chars: &[char], from: usize, closer: char) -> bool {
        for (offset, c) in chars[from..].iter().enumerate() {
            if *c == closer {
                return true;
            }
            if *c == '\n' && Self::is_paragraph_break(chars, from + offset) {
                return false;
            }
        }
        false
    }

    // blank line: '\n', optional horizontal whitespace, '\n'
    fn is_paragraph_break(chars: &[char], pos: usize) -> bool {
        chars[pos + 1..]
            .iter()
            .take_while(|c| c.is_whitespace())
            .any(|c| *c == '\n')
    }

    /// Whether the period at `dot` belongs to the current sentence
    /// (abbreviation, initial, or followed by a lowercase word).
    fn period_continues(&self, chars: &[char], start: usize, dot: usize, end: usize) -> bool {
        let word_start = chars[start..dot]
            .iter()
            .rposition(|c| c.is_whitespace())
            .map(|p| start + p + 1)
            .unwrap_or(start);
        let word: String = chars[word_start..dot]
            .iter()
            .skip_while(|c| !c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if word.is_empty() {
            return false;
        }
        if self.abbreviations.contains(&word) {
            return true;
        }
        let mut letters = word.chars();
        if let (Some(first), None) = (letters.next(), letters.next()) {
            if first.is_alphabetic() {
                return true;
            }
        }

        chars[end..]
            .iter()
            .find(|c| !(c.is_whitespace() || matches!(c, '"' | '\'' | '(' | '“' | '‘')))
            .is_some_and(|c| c.is_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> SentenceSplitter {
        SentenceSplitter::new(&SentenceData::bundled())
    }

    #[test]
    fn test_split() {
        let sentences = splitter().split("Sentence one. Sentence two. Sentence three.");
        assert_eq!(
            sentences,
            vec!["Sentence one.", "Sentence two.", "Sentence three."]
        );
        assert_eq!(splitter().split("Hi. Bye."), vec!["Hi.", "Bye."]);
    }

    #[test]
    fn test_split_empty_and_blank() {
        assert!(splitter().split("").is_empty());
        assert!(splitter().split("  \n\t ").is_empty());
        assert_eq!(splitter().split("no terminator"), vec!["no terminator"]);
    }

    #[test]
    fn test_split_with_abbreviations_and_initials() {
        let text = "Dr. Smith met Mr. J. Doe at noon. They talked.";
        assert_eq!(
            splitter().split(text),
            vec!["Dr. Smith met Mr. J. Doe at noon.", "They talked."]
        );
        let text = "Bring fruit, e.g. apples. Then leave.";
        assert_eq!(
            splitter().split(text),
            vec!["Bring fruit, e.g. apples.", "Then leave."]
        );
    }

    #[test]
    fn test_split_keeps_decimals_and_lowercase_continuations() {
        let text = "Pi is about 3.14 in value. The end.";
        assert_eq!(
            splitter().split(text),
            vec!["Pi is about 3.14 in value.", "The end."]
        );
        let text = "It costs approx. ten dollars. Fine.";
        assert_eq!(
            splitter().split(text),
            vec!["It costs approx. ten dollars.", "Fine."]
        );
    }

    #[test]
    fn test_split_with_closers_and_runs() {
        let text = "He said \"Stop!\" Then he ran. Really?! Yes...";
        assert_eq!(
            splitter().split(text),
            vec!["He said \"Stop!\"", "Then he ran.", "Really?!", "Yes..."]
        );
    }

    #[test]
    fn test_split_on_paragraph_break() {
        let text = "A heading\n\nBody text here. More body\ncontinues.";
        assert_eq!(
            splitter().split(text),
            vec!["A heading", "Body text here.", "More body\ncontinues."]
        );
    }

    #[test]
    fn test_split_with_unclosed_bracket() {
        let text = "Note 【draft. Sentence one. Sentence two.\n\nNew paragraph here. Last one.";
        assert_eq!(
            splitter().split(text),
            vec![
                "Note 【draft.",
                "Sentence one.",
                "Sentence two.",
                "New paragraph here.",
                "Last one."
            ]
        );
        // closed only after a paragraph break: not a quoted span
        let text = "「Open. Still open.\n\nLater.」 Done.";
        assert_eq!(
            splitter().split(text),
            vec!["「Open.", "Still open.", "Later.」", "Done."]
        );
        // closed within the paragraph: stays one sentence
        let text = "He wrote 「Stop. Go.」 twice. Next.";
        assert_eq!(
            splitter().split(text),
            vec!["He wrote 「Stop. Go.」 twice.", "Next."]
        );
    }

    #[test]
    fn test_split_full_width() {
        let text = "これはテストです。「中の。文」です。";
        assert_eq!(
            splitter().split(text),
            vec!["これはテストです。", "「中の。文」です。"]
        );
    }
}
