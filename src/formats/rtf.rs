//! Rich Text Format (`.rtf`) → plain text.
//!
//! A small tokenizer over the RTF byte stream. It tracks group nesting so
//! that destinations which carry no body text (font and colour tables,
//! stylesheets, document info, pictures, anything marked `\*`) are dropped
//! wholesale. No Markdown structure is inferred.
//!
//! Bytes outside ASCII, whether raw or `\'hh`-escaped, are decoded as
//! Windows-1252, the default `\ansicpg` in practice.

use crate::error::FileError;
use std::path::Path;

/// Destinations whose content is never body text.
const IGNORED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "objdata",
    "fldinst",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "xmlnstbl",
    "filetbl",
    "revtbl",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
];

/// Convert the RTF file at `path` to plain text.
pub fn convert(path: &Path) -> Result<String, FileError> {
    let bytes = std::fs::read(path).map_err(|e| FileError::conversion("rtf", e))?;
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    if !bytes[start..].starts_with(b"{\\rtf") {
        return Err(FileError::conversion("rtf", "missing {\\rtf header"));
    }
    Ok(strip_rtf(&bytes[start..]))
}

#[derive(Debug, Clone, Copy)]
struct GroupState {
    ignorable: bool,
    /// Fallback characters that follow each `\uN`.
    unicode_skip: usize,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            ignorable: false,
            unicode_skip: 1,
        }
    }
}

struct Stripper<'a> {
    input: &'a [u8],
    pos: usize,
    out: String,
    state: GroupState,
    stack: Vec<GroupState>,
    /// Fallback characters still to swallow after a `\uN`.
    pending_skip: usize,
    /// High surrogate waiting for its low half.
    pending_high: Option<u32>,
}

/// Strip RTF markup, keeping only body text.
pub fn strip_rtf(input: &[u8]) -> String {
    let mut s = Stripper {
        input,
        pos: 0,
        out: String::with_capacity(input.len() / 2),
        state: GroupState::default(),
        stack: Vec::new(),
        pending_skip: 0,
        pending_high: None,
    };
    s.run();
    s.out
}

impl Stripper<'_> {
    fn run(&mut self) {
        while let Some(&b) = self.input.get(self.pos) {
            self.pos += 1;
            match b {
                b'{' => {
                    self.stack.push(self.state);
                    self.pending_skip = 0;
                }
                b'}' => {
                    if let Some(outer) = self.stack.pop() {
                        self.state = outer;
                    }
                    self.pending_skip = 0;
                }
                b'\\' => self.control(),
                b'\r' | b'\n' => {}
                _ => self.emit(cp1252(b)),
            }
        }
    }

    fn emit(&mut self, ch: char) {
        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            return;
        }
        self.pending_high = None;
        if !self.state.ignorable {
            self.out.push(ch);
        }
    }

    fn control(&mut self) {
        let Some(&c) = self.input.get(self.pos) else {
            return;
        };

        if c.is_ascii_alphabetic() {
            let (word, param) = self.read_control_word();
            self.control_word(&word, param);
            return;
        }

        self.pos += 1;
        match c {
            b'\'' => {
                let hex = self.input.get(self.pos..self.pos + 2);
                let byte = hex
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = byte {
                    self.pos += 2;
                    self.emit(cp1252(byte));
                }
            }
            b'*' => self.state.ignorable = true,
            b'\\' | b'{' | b'}' => self.emit(c as char),
            b'~' => self.emit('\u{00A0}'),
            b'_' => self.emit('-'),
            b'\r' | b'\n' => self.emit('\n'),
            // Optional hyphen, formula character and friends.
            _ => {}
        }
    }

    fn read_control_word(&mut self) -> (String, Option<i32>) {
        let start = self.pos;
        while self.input.get(self.pos).is_some_and(u8::is_ascii_alphabetic) {
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();

        let negative = self.input.get(self.pos) == Some(&b'-')
            && self.input.get(self.pos + 1).is_some_and(u8::is_ascii_digit);
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        let mut value: i32 = 0;
        while let Some(d) = self.input.get(self.pos).filter(|d| d.is_ascii_digit()) {
            value = value.saturating_mul(10).saturating_add(i32::from(d - b'0'));
            self.pos += 1;
        }
        let param = (self.pos > digits_start).then_some(if negative { -value } else { value });

        // A single space delimits the control word and is not text.
        if self.input.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }

        (word, param)
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        match word {
            "par" | "line" | "sect" | "page" | "row" => self.emit('\n'),
            "tab" => self.emit('\t'),
            "cell" => self.emit(' '),
            "emdash" => self.emit('\u{2014}'),
            "endash" => self.emit('\u{2013}'),
            "bullet" => self.emit('\u{2022}'),
            "lquote" => self.emit('\u{2018}'),
            "rquote" => self.emit('\u{2019}'),
            "ldblquote" => self.emit('\u{201C}'),
            "rdblquote" => self.emit('\u{201D}'),
            "uc" => self.state.unicode_skip = param.unwrap_or(1).max(0) as usize,
            "u" => {
                if let Some(n) = param {
                    // Code points above 32767 are written as negative numbers.
                    let code = (if n < 0 { n + 65536 } else { n }) as u32;
                    match (code, self.pending_high.take()) {
                        (0xD800..=0xDBFF, _) => self.pending_high = Some(code),
                        (0xDC00..=0xDFFF, Some(high)) => {
                            let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                            if let Some(ch) = char::from_u32(combined) {
                                self.emit(ch);
                            }
                        }
                        (0xDC00..=0xDFFF, None) => {}
                        _ => {
                            if let Some(ch) = char::from_u32(code) {
                                self.emit(ch);
                            }
                        }
                    }
                    self.pending_skip = self.state.unicode_skip;
                }
            }
            "bin" => {
                let len = param.unwrap_or(0).max(0) as usize;
                self.pos = (self.pos + len).min(self.input.len());
            }
            w if IGNORED_DESTINATIONS.contains(&w) => self.state.ignorable = true,
            _ => {}
        }
    }
}

/// Windows-1252 byte to char; the 0x80–0x9F block differs from Latin-1.
fn cp1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
        '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
        '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
        '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => char::from(byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileErrorKind;

    fn strip(s: &str) -> String {
        strip_rtf(s.as_bytes())
    }

    #[test]
    fn plain_paragraphs() {
        let rtf = r"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times New Roman;}}\f0\fs24 Hello world.\par Second line.\par}";
        assert_eq!(strip(rtf), "Hello world.\nSecond line.\n");
    }

    #[test]
    fn ignorable_destinations_are_dropped() {
        let rtf = r"{\rtf1{\colortbl;\red255\green0\blue0;}{\*\generator Riched20;}{\info{\title Secret}}Body}";
        assert_eq!(strip(rtf), "Body");
    }

    #[test]
    fn hex_escapes_decode_as_cp1252() {
        let rtf = r"{\rtf1 a\'e7\'e3o \'93q\'94}";
        assert_eq!(strip(rtf), "ação \u{201C}q\u{201D}");
    }

    #[test]
    fn unicode_escape_skips_fallback() {
        let rtf = r"{\rtf1 caf\u233?, na\uc2\u239\'3f\'3fve}";
        assert_eq!(strip(rtf), "café, naïve");
    }

    #[test]
    fn negative_unicode_is_wrapped() {
        // \u-3913 → U+F0B7, a private-use bullet from Symbol fonts.
        let rtf = r"{\rtf1 \u-3913?x}";
        assert_eq!(strip(rtf), "\u{F0B7}x");
    }

    #[test]
    fn surrogate_pairs_are_combined() {
        // U+1F600 as the UTF-16 pair D83D DE00, written signed.
        let rtf = r"{\rtf1 a\u-10179?\u-8704?b}";
        assert_eq!(strip(rtf), "a\u{1F600}b");
    }

    #[test]
    fn lone_surrogates_are_dropped() {
        let rtf = r"{\rtf1 a\u-8704?b\u-10179?c}";
        assert_eq!(strip(rtf), "abc");
    }

    #[test]
    fn escaped_braces_and_tabs() {
        let rtf = r"{\rtf1 a\tab b \{c\} d\\e}";
        assert_eq!(strip(rtf), "a\tb {c} d\\e");
    }

    #[test]
    fn group_state_is_restored() {
        let rtf = r"{\rtf1 {\*\unknowndest hidden {nested}}shown}";
        assert_eq!(strip(rtf), "shown");
    }

    #[test]
    fn missing_header_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.rtf");
        std::fs::write(&path, b"just text").unwrap();
        assert_eq!(convert(&path).unwrap_err().kind(), FileErrorKind::ConversionError);
    }

    #[test]
    fn convert_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.rtf");
        std::fs::write(&path, b"\n{\\rtf1\\ansi Memo\\par}").unwrap();
        assert_eq!(convert(&path).unwrap(), "Memo\n");
    }
}
