// AudSleuth - core/decoder.rs
//
// Fixed-block record decoding. A file is read in blocks of exactly the
// detected width; each block is de-strided (wide layouts carry one padding
// byte after every character byte), decoded as single-byte Latin-1 text and
// sliced into fields by a fixed offset table expressed in character units.
//
// Core layer: accepts Read trait objects, never touches the filesystem.

use crate::core::model::{FieldId, LayoutVariant, Record};
use regex::Regex;
use std::io::{self, ErrorKind, Read};
use std::ops::Range;
use std::sync::OnceLock;

// =============================================================================
// Offset table (post-stride character positions)
// =============================================================================

const EVENT_ID: Range<usize> = 1..4;
const YEAR: Range<usize> = 4..8;
const MONTH: Range<usize> = 8..10;
const DAY: Range<usize> = 10..12;
const HOUR: Range<usize> = 12..14;
const MINUTE: Range<usize> = 14..16;
const SECOND: Range<usize> = 16..18;
const OS_PROCESS_ID: Range<usize> = 18..25;
const SAP_PROCESS_ID: Range<usize> = 25..30;
const CONNECTION_TYPE: usize = 30;
const SAP_PROCESS_ID_HEX: usize = 31;
const TERMINAL: Range<usize> = 32..40;
const LOGIN: Range<usize> = 40..52;
const TRANSACTION_CODE: Range<usize> = 52..72;
const REPORT: Range<usize> = 72..112;
const CLIENT: Range<usize> = 112..115;
const SESSION_ID: usize = 115;
const PARAMETERS: Range<usize> = 116..180;
const REMOTE_HOST_START: usize = 180;

/// Control characters that spreadsheet cells cannot hold. Tab, newline and
/// carriage return are allowed.
fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern, covered by the unit tests below.
    RE.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").expect("illegal_chars: invalid regex")
    })
}

// =============================================================================
// Block decoding
// =============================================================================

/// Collapse a raw block to one byte per logical character.
///
/// For two-byte layouts every other byte is taken starting at offset 0 and
/// the interleaved padding byte is discarded. Single-byte layouts pass
/// through unchanged.
pub fn destride(raw: &[u8], variant: LayoutVariant) -> Vec<u8> {
    match variant.bytes_per_char() {
        1 => raw.to_vec(),
        step => raw.iter().step_by(step).copied().collect(),
    }
}

/// Characters trimmed from field edges: Unicode whitespace plus the ASCII
/// separators 0x1C..=0x1F, which the writer uses as filler.
fn is_padding(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Decode one raw block into a `Record`.
///
/// Never fails: positions beyond the end of a short block decode as empty
/// strings, the same way an out-of-range slice would.
pub fn decode_block(raw: &[u8], variant: LayoutVariant) -> Record {
    let chars = destride(raw, variant);
    let text = |range: Range<usize>| latin1(clamp(&chars, range));
    let trimmed = |range: Range<usize>| text(range).trim_matches(is_padding).to_string();
    let single = |pos: usize| text(pos..pos + 1);

    let date = format!("{}.{}.{}", text(YEAR), text(MONTH), text(DAY));
    let time = format!("{}:{}:{}", text(HOUR), text(MINUTE), text(SECOND));
    let parameters = illegal_chars()
        .replace_all(text(PARAMETERS).trim_matches(is_padding), "")
        .into_owned();

    Record::from_fields([
        (FieldId::Date, date),
        (FieldId::Time, time),
        (FieldId::Client, text(CLIENT)),
        (FieldId::Login, trimmed(LOGIN)),
        (FieldId::RemoteHost, trimmed(REMOTE_HOST_START..chars.len())),
        (FieldId::TransactionCode, trimmed(TRANSACTION_CODE)),
        (FieldId::Report, trimmed(REPORT)),
        (FieldId::ConnectionType, single(CONNECTION_TYPE)),
        (FieldId::Parameters, parameters),
        (FieldId::EventId, text(EVENT_ID)),
        (FieldId::OsProcessId, text(OS_PROCESS_ID)),
        (FieldId::SapProcessId, text(SAP_PROCESS_ID)),
        (FieldId::SapProcessIdHex, single(SAP_PROCESS_ID_HEX)),
        (FieldId::Terminal, trimmed(TERMINAL)),
        (FieldId::SessionId, single(SESSION_ID)),
    ])
}

/// Slice with out-of-range bounds clamped to the available bytes.
fn clamp(bytes: &[u8], range: Range<usize>) -> &[u8] {
    let end = range.end.min(bytes.len());
    let start = range.start.min(end);
    &bytes[start..end]
}

fn latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

// =============================================================================
// Streaming reader
// =============================================================================

/// Iterates over the complete blocks of a stream, decoding each into a
/// `Record`.
///
/// The stream ends at the first short or empty read. A trailing partial
/// block is discarded; its length is kept for reporting.
pub struct RecordReader<R> {
    reader: R,
    variant: LayoutVariant,
    buffer: Vec<u8>,
    blocks_read: u64,
    trailing_bytes: usize,
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    /// `reader` must be positioned at offset 0 (see `detect::detect_layout`).
    pub fn new(reader: R, variant: LayoutVariant) -> Self {
        Self {
            reader,
            variant,
            buffer: vec![0u8; variant.block_width()],
            blocks_read: 0,
            trailing_bytes: 0,
            finished: false,
        }
    }

    /// Complete blocks decoded so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Length of the discarded partial block at end of stream (0 if none).
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    /// Fill the block buffer. Returns the number of bytes read, which is
    /// less than the block width only at end of stream.
    fn fill_block(&mut self) -> io::Result<usize> {
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.fill_block() {
            Ok(n) if n == self.buffer.len() => {
                self.blocks_read += 1;
                tracing::trace!(block = self.blocks_read, "Block decoded");
                Some(Ok(decode_block(&self.buffer, self.variant)))
            }
            Ok(n) => {
                self.finished = true;
                self.trailing_bytes = n;
                if n > 0 {
                    tracing::debug!(bytes = n, "Discarding trailing partial block");
                }
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Lay out `fields` at character positions in one block,
    /// space-padded, then widen to the variant's raw encoding.
    fn encode_block(fields: &[(usize, &str)], variant: LayoutVariant) -> Vec<u8> {
        let chars_per_block = variant.block_width() / variant.bytes_per_char();
        let mut chars = vec![b' '; chars_per_block];
        for (pos, value) in fields {
            for (i, b) in value.bytes().enumerate() {
                if pos + i < chars.len() {
                    chars[pos + i] = b;
                }
            }
        }
        match variant.bytes_per_char() {
            1 => chars,
            _ => chars.iter().flat_map(|&c| [c, 0u8]).collect(),
        }
    }

    fn sample_fields() -> Vec<(usize, &'static str)> {
        vec![
            (0, "2"),
            (1, "123"),
            (4, "20240501"),
            (12, "134502"),
            (18, "0012345"),
            (25, "00042"),
            (30, "D"),
            (31, "A"),
            (32, "TERM01"),
            (40, "ALICE"),
            (52, "SU01"),
            (72, "SAPLSUU5"),
            (112, "300"),
            (115, "7"),
            (116, "SU01&PFCG"),
            (180, "host.example"),
        ]
    }

    #[test]
    fn test_decode_unicode_block_in_canonical_order() {
        let raw = encode_block(&sample_fields(), LayoutVariant::Unicode);
        assert_eq!(raw.len(), 400);
        let record = decode_block(&raw, LayoutVariant::Unicode);
        let expected = [
            "2024.05.01",
            "13:45:02",
            "300",
            "ALICE",
            "host.example",
            "SU01",
            "SAPLSUU5",
            "D",
            "SU01&PFCG",
            "123",
            "0012345",
            "00042",
            "A",
            "TERM01",
            "7",
        ];
        assert_eq!(record.values(), expected);
    }

    #[test]
    fn test_destride_takes_even_offsets() {
        let raw = [b'A', 0, b'B', 0, b'C', 0];
        assert_eq!(destride(&raw, LayoutVariant::Unicode), b"ABC");
        assert_eq!(destride(&raw, LayoutVariant::Classic), raw.to_vec());
    }

    #[test]
    fn test_classic_layout_is_single_byte() {
        let raw = encode_block(&sample_fields(), LayoutVariant::Classic);
        assert_eq!(raw.len(), 180);
        let record = decode_block(&raw, LayoutVariant::Classic);
        assert_eq!(record.get(FieldId::Login), "ALICE");
        assert_eq!(record.get(FieldId::Parameters), "SU01&PFCG");
        // The block ends where the remote host would start.
        assert_eq!(record.get(FieldId::RemoteHost), "");
    }

    #[test]
    fn test_non_unicode_short_block_yields_empty_tail_fields() {
        // 200 raw bytes collapse to 100 characters: everything from the
        // report field onwards is cut short or absent.
        let raw = encode_block(&sample_fields(), LayoutVariant::NonUnicode);
        let record = decode_block(&raw, LayoutVariant::NonUnicode);
        assert_eq!(record.get(FieldId::Login), "ALICE");
        assert_eq!(record.get(FieldId::Client), "");
        assert_eq!(record.get(FieldId::SessionId), "");
        assert_eq!(record.get(FieldId::RemoteHost), "");
    }

    #[test]
    fn test_parameters_strip_control_characters() {
        let mut fields = sample_fields();
        fields.retain(|(pos, _)| *pos != 116);
        fields.push((116, "A\x01B\x1fC\tD"));
        let raw = encode_block(&fields, LayoutVariant::Unicode);
        let record = decode_block(&raw, LayoutVariant::Unicode);
        assert_eq!(record.get(FieldId::Parameters), "ABC\tD");
    }

    #[test]
    fn test_parameters_trim_separator_padding_before_strip() {
        let mut fields = sample_fields();
        fields.retain(|(pos, _)| *pos != 116);
        fields.push((116, "\x1c ABC \x1f"));
        let raw = encode_block(&fields, LayoutVariant::Unicode);
        let record = decode_block(&raw, LayoutVariant::Unicode);
        assert_eq!(record.get(FieldId::Parameters), "ABC");
    }

    #[test]
    fn test_trimmed_fields_drop_separator_padding() {
        let mut fields = sample_fields();
        fields.retain(|(pos, _)| *pos != 40);
        fields.push((40, "ALICE\x1e\x1f"));
        let raw = encode_block(&fields, LayoutVariant::Unicode);
        let record = decode_block(&raw, LayoutVariant::Unicode);
        assert_eq!(record.get(FieldId::Login), "ALICE");
    }

    #[test]
    fn test_latin1_bytes_decode_to_chars() {
        let mut raw = encode_block(&[], LayoutVariant::Classic);
        raw[40..45].copy_from_slice(&[b'J', 0xE9, b'R', 0xD4, b'M']);
        let record = decode_block(&raw, LayoutVariant::Classic);
        assert_eq!(record.get(FieldId::Login), "J\u{e9}R\u{d4}M");
    }

    #[test]
    fn test_reader_drops_trailing_partial_block() {
        let mut bytes = encode_block(&sample_fields(), LayoutVariant::Unicode);
        bytes.extend(encode_block(&sample_fields(), LayoutVariant::Unicode));
        bytes.extend_from_slice(&[b'X'; 57]);
        let mut reader = RecordReader::new(Cursor::new(bytes), LayoutVariant::Unicode);
        let records: Vec<Record> = reader.by_ref().collect::<io::Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(reader.blocks_read(), 2);
        assert_eq!(reader.trailing_bytes(), 57);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_empty_stream() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()), LayoutVariant::Classic);
        assert!(reader.next().is_none());
        assert_eq!(reader.trailing_bytes(), 0);
    }
}
