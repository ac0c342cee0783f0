//! Source map generation for rewritten story files.
//!
//! Produces a version 3 source map from the chunks of a materialized
//! [`EditOverlay`](crate::overlay::EditOverlay). Text copied from the original
//! is mapped at every token start; replaced ranges map their first character
//! to the start of what they replaced; inserted text is left unmapped.
//! Columns count UTF-16 code units, as JavaScript tooling expects.

use crate::overlay::Chunk;
use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A version 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One mapped position: generated column to original line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    column: u32,
    source_line: u32,
    source_column: u32,
}

/// Generated-side cursor that collects segments line by line.
struct MapBuilder {
    lines: Vec<Vec<Segment>>,
    column: u32,
}

impl MapBuilder {
    fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
            column: 0,
        }
    }

    fn mark(&mut self, source_line: u32, source_column: u32) {
        let segment = Segment {
            column: self.column,
            source_line,
            source_column,
        };
        if let Some(line) = self.lines.last_mut() {
            line.push(segment);
        }
    }

    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.lines.push(Vec::new());
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
    }

    fn encode(&self) -> String {
        let mut out = String::new();
        let mut source_line = 0i64;
        let mut source_column = 0i64;
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let mut column = 0i64;
            for (j, segment) in line.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                encode_vlq(&mut out, segment.column as i64 - column);
                // Single source, always index 0.
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, segment.source_line as i64 - source_line);
                encode_vlq(&mut out, segment.source_column as i64 - source_column);
                column = segment.column as i64;
                source_line = segment.source_line as i64;
                source_column = segment.source_column as i64;
            }
        }
        out
    }
}

/// Byte offset to line/UTF-16 column lookup for the original text.
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let column: usize = self.text[self.line_starts[line]..offset]
            .chars()
            .map(char::len_utf16)
            .sum();
        (line as u32, column as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn class(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Space
    } else if ch.is_alphanumeric() || ch == '_' || ch == '$' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// True when `ch` starts a new token after `prev`.
fn starts_token(prev: char, ch: char) -> bool {
    match class(ch) {
        CharClass::Space => false,
        CharClass::Punct => true,
        CharClass::Word => class(prev) != CharClass::Word,
    }
}

/// Builds the map for `chunks`, which must be the materialization of an
/// overlay over `original`.
pub fn generate(chunks: &[Chunk<'_>], original: &str, source: &str) -> SourceMap {
    let index = LineIndex::new(original);
    let mut builder = MapBuilder::new();

    for chunk in chunks {
        match *chunk {
            Chunk::Original { start, text } => {
                let (mut line, mut column) = index.position(start);
                let mut prev: Option<char> = None;
                for ch in text.chars() {
                    if prev.is_none_or(|prev| starts_token(prev, ch)) {
                        builder.mark(line, column);
                    }
                    builder.advance(ch);
                    if ch == '\n' {
                        line += 1;
                        column = 0;
                    } else {
                        column += ch.len_utf16() as u32;
                    }
                    prev = Some(ch);
                }
            }
            Chunk::Replaced { start, text } => {
                let (line, column) = index.position(start);
                builder.mark(line, column);
                text.chars().for_each(|ch| builder.advance(ch));
            }
            Chunk::Inserted { text } => {
                text.chars().for_each(|ch| builder.advance(ch));
            }
        }
    }

    SourceMap {
        version: 3,
        file: None,
        sources: vec![source.to_string()],
        sources_content: Some(vec![original.to_string()]),
        names: Vec::new(),
        mappings: builder.encode(),
    }
}

/// Appends the base64 VLQ encoding of `value`.
fn encode_vlq(out: &mut String, value: i64) {
    let signed = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    let mut rest = signed as u64;
    loop {
        let mut digit = (rest & 0b11111) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

/// Decodes `mappings` into per-line `(column, source_line, source_column)`
/// triples with absolute values.
#[cfg(test)]
pub(crate) fn decode_mappings(mappings: &str) -> Vec<Vec<(u32, u32, u32)>> {
    let mut source_line = 0i64;
    let mut source_column = 0i64;
    mappings
        .split(';')
        .map(|line| {
            let mut column = 0i64;
            line.split(',')
                .filter(|segment| !segment.is_empty())
                .map(|segment| {
                    let fields = decode_vlq(segment);
                    column += fields[0];
                    source_line += fields[2];
                    source_column += fields[3];
                    (column as u32, source_line as u32, source_column as u32)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
fn decode_vlq(segment: &str) -> Vec<i64> {
    let mut values = Vec::new();
    let mut value = 0i64;
    let mut shift = 0;
    for byte in segment.bytes() {
        let digit = BASE64.iter().position(|&b| b == byte).unwrap() as i64;
        value |= (digit & 0b11111) << shift;
        if digit & 0b100000 != 0 {
            shift += 5;
            continue;
        }
        let negative = value & 1 == 1;
        value >>= 1;
        values.push(if negative { -value } else { value });
        value = 0;
        shift = 0;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::EditOverlay;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    fn map_for(overlay: &EditOverlay<'_>) -> SourceMap {
        generate(&overlay.materialize(), overlay.original(), "Button.stories.ts")
    }

    #[test]
    fn encodes_vlq_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-16), "hB");
        assert_eq!(vlq(1000), "w+B");
    }

    #[test]
    fn maps_every_token_of_untouched_text() {
        let overlay = EditOverlay::new("a b");
        let map = map_for(&overlay);
        assert_eq!(map.mappings, "AAAA,EAAE");
        assert_eq!(map.sources, vec!["Button.stories.ts"]);
        assert_eq!(map.sources_content, Some(vec!["a b".to_string()]));
    }

    #[test]
    fn inserted_lines_shift_generated_positions() {
        let mut overlay = EditOverlay::new("x;\n");
        overlay.insert(0, "y\n");
        let map = map_for(&overlay);
        assert_eq!(map.mappings, ";AAAA,CAAC;");
        assert_eq!(
            decode_mappings(&map.mappings),
            vec![vec![], vec![(0, 0, 0), (1, 0, 1)], vec![]]
        );
    }

    #[test]
    fn replaced_text_maps_to_range_start() {
        let mut overlay = EditOverlay::new("export default {};");
        overlay.overwrite(0, 15, "const m = ");
        let decoded = decode_mappings(&map_for(&overlay).mappings);
        assert_eq!(decoded[0][0], (0, 0, 0));
        // `{` now sits at generated column 10 but still maps to column 15.
        assert!(decoded[0].contains(&(10, 0, 15)));
    }

    #[test]
    fn counts_columns_in_utf16() {
        let overlay = EditOverlay::new("'é😀' x");
        let decoded = decode_mappings(&map_for(&overlay).mappings);
        // `'` `é` `😀`(2 units) `'` then `x` at column 6.
        assert_eq!(decoded[0].last(), Some(&(6, 0, 6)));
    }

    #[test]
    fn serializes_standard_fields() {
        let overlay = EditOverlay::new("a");
        let json = map_for(&overlay).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":3,"sources":["Button.stories.ts"],"sourcesContent":["a"],"names":[],"mappings":"AAAA"}"#
        );
    }
}
