//! Line and word break classification.
//!
//! Classification looks at a pair of adjacent characters. Line breaks follow
//! the usual set of vertical separators, with CR LF counted as one break.
//! Word breaks use a deliberately small rule: a word starts where whitespace
//! is followed by non-whitespace. This is not UAX #29 segmentation.

use crate::text::content::ContentBuffer;

const CR: char = '\r';
const LF: char = '\n';
const VT: char = '\u{000B}';
const FF: char = '\u{000C}';
const NEL: char = '\u{0085}';
const LINE_SEPARATOR: char = '\u{2028}';
const PARAGRAPH_SEPARATOR: char = '\u{2029}';

/// Line boundary classification of a character given its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineBreak {
    /// Not a line break.
    None,
    /// The character ends a line.
    LineBreak,
    /// LF following CR: part of the same logical break.
    Continuation,
}

impl LineBreak {
    /// True for both `LineBreak` and `Continuation`.
    #[must_use]
    pub fn is_break(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Word boundary classification of a character given its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WordBreak {
    None,
    /// A word starts at the current character.
    WordBreak,
}

/// Classify the boundary at `current`.
///
/// `'\0'` as `current` means "no next character" and never breaks.
#[must_use]
pub fn classify_line_break(previous: char, current: char) -> LineBreak {
    match current {
        '\0' => LineBreak::None,
        LF if previous == CR => LineBreak::Continuation,
        CR | LF | VT | FF | NEL | LINE_SEPARATOR | PARAGRAPH_SEPARATOR => LineBreak::LineBreak,
        _ => LineBreak::None,
    }
}

/// Classify the word boundary at `current`.
#[must_use]
pub fn classify_word_break(previous: char, current: char) -> WordBreak {
    if previous.is_whitespace() && current != '\0' && !current.is_whitespace() {
        WordBreak::WordBreak
    } else {
        WordBreak::None
    }
}

/// True if `ch` is classified as a line break in any context.
#[must_use]
pub fn is_line_break_char(ch: char) -> bool {
    classify_line_break('\0', ch).is_break()
}

/// Single-pass classification over a buffer sub-range.
///
/// The iterator reads one character of look-behind before `start` so a break
/// that straddles the left edge of the range (CR before the range, LF as its
/// first character) classifies as [`LineBreak::Continuation`].
pub struct BreakIterator<'a, B> {
    chars: ropey::iter::Chars<'a>,
    classify: fn(char, char) -> B,
    offset: usize,
    end: usize,
    previous: char,
    current_char: char,
    current: Option<B>,
}

impl<'a, B: Copy> BreakIterator<'a, B> {
    fn new(
        buffer: &'a ContentBuffer,
        start: usize,
        end: usize,
        classify: fn(char, char) -> B,
    ) -> Self {
        let end = end.min(buffer.len());
        let start = start.min(end);
        let previous = if start == 0 {
            '\0'
        } else {
            buffer.char_or_nul(start - 1)
        };
        Self {
            chars: buffer.chars_at(start),
            classify,
            offset: start,
            end,
            previous,
            current_char: '\0',
            current: None,
        }
    }

    /// Character the iterator is positioned on (`'\0'` before the first step).
    #[must_use]
    pub fn current_char(&self) -> char {
        self.current_char
    }

    /// Classification of [`current_char`](Self::current_char).
    #[must_use]
    pub fn current(&self) -> Option<B> {
        self.current
    }

    /// Offset of the next character to be classified.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> BreakIterator<'a, LineBreak> {
    /// Iterate line break classes over `start..end`.
    #[must_use]
    pub fn lines(buffer: &'a ContentBuffer, start: usize, end: usize) -> Self {
        Self::new(buffer, start, end, classify_line_break)
    }
}

impl<'a> BreakIterator<'a, WordBreak> {
    /// Iterate word break classes over `start..end`.
    #[must_use]
    pub fn words(buffer: &'a ContentBuffer, start: usize, end: usize) -> Self {
        Self::new(buffer, start, end, classify_word_break)
    }
}

impl<B: Copy> Iterator for BreakIterator<'_, B> {
    /// `(offset, char, class)` for each character in the range.
    type Item = (usize, char, B);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        let ch = self.chars.next()?;
        let class = (self.classify)(self.previous, ch);
        let offset = self.offset;
        self.previous = ch;
        self.current_char = ch;
        self.current = Some(class);
        self.offset += 1;
        Some((offset, ch, class))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.offset;
        (remaining, Some(remaining))
    }
}

/// Offsets just past each character in `start..end` that ends a line.
///
/// A CR immediately followed by LF does not end the line; the LF does. The
/// character after `end` is consulted for that check.
#[must_use]
pub fn line_ends(buffer: &ContentBuffer, start: usize, end: usize) -> Vec<usize> {
    let mut ends = Vec::new();
    for (offset, ch, class) in BreakIterator::lines(buffer, start, end) {
        if !class.is_break() {
            continue;
        }
        if ch == CR && buffer.char_or_nul(offset + 1) == LF {
            continue;
        }
        ends.push(offset + 1);
    }
    ends
}

/// Offset of the next word start strictly after `offset`, or the buffer end.
#[must_use]
pub fn next_word_start(buffer: &ContentBuffer, offset: usize) -> usize {
    let len = buffer.len();
    if offset >= len {
        return len;
    }
    BreakIterator::words(buffer, offset + 1, len)
        .find(|&(_, _, class)| class == WordBreak::WordBreak)
        .map_or(len, |(at, _, _)| at)
}

/// Offset of the nearest word start strictly before `offset`, or 0.
#[must_use]
pub fn previous_word_start(buffer: &ContentBuffer, offset: usize) -> usize {
    let offset = offset.min(buffer.len());
    BreakIterator::words(buffer, 1, offset)
        .filter(|&(_, _, class)| class == WordBreak::WordBreak)
        .map(|(at, _, _)| at)
        .last()
        .unwrap_or(0)
}
