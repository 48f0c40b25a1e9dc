use bytes::{BufMut, Bytes, BytesMut};
use smol_str::format_smolstr;
use std::io;

/// Sticky error recorded by a [`JsonWriter`].
///
/// The first error wins; once recorded, every subsequent append is a no-op
/// and every finalizer reports the same value. The type is `Clone` so that
/// repeated extraction attempts see the error unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum WriteError {
    /// A delegated serializer handed the writer an error instead of bytes.
    #[error("delegated serializer failed: {0}")]
    Delegate(String),

    /// Draining the buffer into an external sink failed.
    #[error("buffer drain failed: {0}")]
    Io(String),
}

/// Bytes that may be appended verbatim inside a JSON string, by ASCII value.
/// Control characters, `"` and `\` always escape; `<`, `>` and `&` escape
/// only in the default HTML-safe mode.
const fn safe_table(escape_html: bool) -> [bool; 128] {
    let mut table = [true; 128];
    let mut i = 0;
    while i < 0x20 {
        table[i] = false;
        i += 1;
    }
    table[b'"' as usize] = false;
    table[b'\\' as usize] = false;
    if escape_html {
        table[b'<' as usize] = false;
        table[b'>' as usize] = false;
        table[b'&' as usize] = false;
    }
    table
}

static SAFE: [bool; 128] = safe_table(true);
static SAFE_NO_HTML: [bool; 128] = safe_table(false);

const HEX: &[u8; 16] = b"0123456789abcdef";
const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// An exclusively-owned, append-only JSON byte sink.
///
/// All appends are infallible at the call site: failures from delegated
/// serializers are recorded as a sticky [`WriteError`] which suppresses
/// every later append, and the finalizers ([`build_bytes`], [`dump_to`],
/// [`into_reader`]) surface it instead of partial output.
///
/// Output is deterministic: the escape tables and base64 alphabet are
/// compile-time constants and nothing here consults ambient state. A writer
/// is single-owner by construction (`&mut self` everywhere); concurrent
/// encoding takes one writer per thread.
///
/// [`build_bytes`]: JsonWriter::build_bytes
/// [`dump_to`]: JsonWriter::dump_to
/// [`into_reader`]: JsonWriter::into_reader
#[derive(Debug, Default)]
pub struct JsonWriter {
    buf: BytesMut,
    error: Option<WriteError>,
    /// Leave `<`, `>` and `&` unescaped in strings.
    pub no_escape_html: bool,
    /// Make [`nil_map`](JsonWriter::nil_map) emit `{}` instead of `null`.
    pub nil_map_as_empty: bool,
    /// Make [`nil_seq`](JsonWriter::nil_seq) emit `[]` instead of `null`.
    pub nil_seq_as_empty: bool,
}

impl JsonWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with `cap` bytes pre-reserved.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(cap),
            ..Self::default()
        }
    }

    /// Number of bytes accumulated so far.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Reserve room for at least `n` more bytes ahead of raw appends.
    pub fn ensure_space(&mut self, n: usize) {
        self.buf.reserve(n);
    }

    /// The sticky error, if one has been recorded.
    pub fn error(&self) -> Option<&WriteError> {
        self.error.as_ref()
    }

    /// Record an error. The first recorded error is kept; later ones are
    /// ignored, matching the first-failure-wins append contract.
    pub fn set_error(&mut self, err: WriteError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    // ------------------------------------------------------------------
    // Raw appends
    // ------------------------------------------------------------------

    /// Append a single byte verbatim.
    pub fn raw_byte(&mut self, b: u8) {
        if self.error.is_some() {
            return;
        }
        self.buf.put_u8(b);
    }

    /// Append a string verbatim, without quoting or escaping.
    pub fn raw_str(&mut self, s: &str) {
        if self.error.is_some() {
            return;
        }
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append bytes verbatim.
    pub fn raw_bytes(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        self.buf.extend_from_slice(data);
    }

    /// Splice in the result of a delegated serializer, treated as
    /// already-valid JSON.
    ///
    /// An `Err` becomes the sticky error; empty bytes with no error emit
    /// `null`; anything else is appended verbatim.
    pub fn raw<T, E>(&mut self, data: Result<T, E>)
    where
        T: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        if self.error.is_some() {
            return;
        }
        match data {
            Err(err) => self.error = Some(WriteError::Delegate(err.to_string())),
            Ok(bytes) if bytes.as_ref().is_empty() => self.raw_str("null"),
            Ok(bytes) => self.buf.extend_from_slice(bytes.as_ref()),
        }
    }

    /// Splice in the result of a delegated serializer, treated as opaque
    /// text: re-encoded as an escaped, quoted JSON string.
    ///
    /// Error and empty-input handling match [`raw`](JsonWriter::raw).
    pub fn raw_text<T, E>(&mut self, data: Result<T, E>)
    where
        T: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        if self.error.is_some() {
            return;
        }
        match data {
            Err(err) => self.error = Some(WriteError::Delegate(err.to_string())),
            Ok(bytes) if bytes.as_ref().is_empty() => self.raw_str("null"),
            Ok(bytes) => self.string_bytes(bytes.as_ref()),
        }
    }

    // ------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------

    /// Append `true` or `false`.
    pub fn boolean(&mut self, v: bool) {
        self.raw_str(if v { "true" } else { "false" });
    }

    /// Append `null` for an absent map, or `{}` when
    /// [`nil_map_as_empty`](JsonWriter::nil_map_as_empty) is set.
    pub fn nil_map(&mut self) {
        self.raw_str(if self.nil_map_as_empty { "{}" } else { "null" });
    }

    /// Append `null` for an absent sequence, or `[]` when
    /// [`nil_seq_as_empty`](JsonWriter::nil_seq_as_empty) is set.
    pub fn nil_seq(&mut self) {
        self.raw_str(if self.nil_seq_as_empty { "[]" } else { "null" });
    }

    /// Append an unsigned integer as bare digits.
    pub fn uint64(&mut self, v: u64) {
        self.raw_str(&format_smolstr!("{v}"));
    }

    /// Append an unsigned integer wrapped in quotes, for consumers whose
    /// number type cannot hold a full 64-bit value exactly.
    pub fn uint64_str(&mut self, v: u64) {
        self.raw_str(&format_smolstr!("\"{v}\""));
    }

    pub fn uint8(&mut self, v: u8) {
        self.uint64(v as u64);
    }

    pub fn uint8_str(&mut self, v: u8) {
        self.uint64_str(v as u64);
    }

    pub fn uint16(&mut self, v: u16) {
        self.uint64(v as u64);
    }

    pub fn uint16_str(&mut self, v: u16) {
        self.uint64_str(v as u64);
    }

    pub fn uint32(&mut self, v: u32) {
        self.uint64(v as u64);
    }

    pub fn uint32_str(&mut self, v: u32) {
        self.uint64_str(v as u64);
    }

    /// Append a signed integer as bare digits.
    pub fn int64(&mut self, v: i64) {
        self.raw_str(&format_smolstr!("{v}"));
    }

    /// Append a signed integer wrapped in quotes.
    pub fn int64_str(&mut self, v: i64) {
        self.raw_str(&format_smolstr!("\"{v}\""));
    }

    pub fn int8(&mut self, v: i8) {
        self.int64(v as i64);
    }

    pub fn int8_str(&mut self, v: i8) {
        self.int64_str(v as i64);
    }

    pub fn int16(&mut self, v: i16) {
        self.int64(v as i64);
    }

    pub fn int16_str(&mut self, v: i16) {
        self.int64_str(v as i64);
    }

    pub fn int32(&mut self, v: i32) {
        self.int64(v as i64);
    }

    pub fn int32_str(&mut self, v: i32) {
        self.int64_str(v as i64);
    }

    /// Append a float. Non-finite values have no JSON spelling and encode
    /// as `null`.
    pub fn float64(&mut self, v: f64) {
        if v.is_finite() {
            self.raw_str(&format_smolstr!("{v}"));
        } else {
            self.raw_str("null");
        }
    }

    /// Append a float wrapped in quotes. Non-finite values encode as bare
    /// `null`, never a quoted non-number.
    pub fn float64_str(&mut self, v: f64) {
        if v.is_finite() {
            self.raw_str(&format_smolstr!("\"{v}\""));
        } else {
            self.raw_str("null");
        }
    }

    pub fn float32(&mut self, v: f32) {
        if v.is_finite() {
            self.raw_str(&format_smolstr!("{v}"));
        } else {
            self.raw_str("null");
        }
    }

    pub fn float32_str(&mut self, v: f32) {
        if v.is_finite() {
            self.raw_str(&format_smolstr!("\"{v}\""));
        } else {
            self.raw_str("null");
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Append an escaped, quoted JSON string.
    ///
    /// Runs of bytes needing no escape are copied slice-wise in a single
    /// scan rather than pushed per character.
    pub fn string(&mut self, s: &str) {
        if self.error.is_some() {
            return;
        }
        self.ensure_space(s.len() + 2);
        self.buf.put_u8(b'"');
        self.escape_body(s);
        self.buf.put_u8(b'"');
    }

    /// Append bytes as an escaped, quoted JSON string.
    ///
    /// Byte sequences that do not decode as a code point are replaced by
    /// the replacement-character escape, advancing exactly one byte, so a
    /// single stray byte never swallows the valid text after it.
    pub fn string_bytes(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        self.ensure_space(data.len() + 2);
        self.buf.put_u8(b'"');
        let mut rest = data;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    self.escape_body(s);
                    break;
                }
                Err(err) => {
                    let (valid, bad) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees the prefix decodes
                    self.escape_body(unsafe { std::str::from_utf8_unchecked(valid) });
                    self.buf.extend_from_slice(b"\\ufffd");
                    rest = &bad[1..];
                    if rest.is_empty() {
                        break;
                    }
                }
            }
        }
        self.buf.put_u8(b'"');
    }

    fn escape_body(&mut self, s: &str) {
        let table = if self.no_escape_html {
            &SAFE_NO_HTML
        } else {
            &SAFE
        };
        let bytes = s.as_bytes();
        let mut run = 0;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if b < 0x80 {
                if table[b as usize] {
                    i += 1;
                    continue;
                }
                self.buf.extend_from_slice(&bytes[run..i]);
                self.escape_ascii(b);
                i += 1;
                run = i;
            } else if b == 0xe2 && bytes.len() - i >= 3 && bytes[i + 1] == 0x80 {
                // U+2028/U+2029 are legal UTF-8 but illegal unescaped in
                // script-tag embedding contexts
                match bytes[i + 2] {
                    0xa8 => {
                        self.buf.extend_from_slice(&bytes[run..i]);
                        self.buf.extend_from_slice(b"\\u2028");
                        i += 3;
                        run = i;
                    }
                    0xa9 => {
                        self.buf.extend_from_slice(&bytes[run..i]);
                        self.buf.extend_from_slice(b"\\u2029");
                        i += 3;
                        run = i;
                    }
                    _ => i += 3,
                }
            } else {
                i += 1;
            }
        }
        self.buf.extend_from_slice(&bytes[run..]);
    }

    fn escape_ascii(&mut self, b: u8) {
        match b {
            b'"' => self.buf.extend_from_slice(b"\\\""),
            b'\\' => self.buf.extend_from_slice(b"\\\\"),
            b'\n' => self.buf.extend_from_slice(b"\\n"),
            b'\r' => self.buf.extend_from_slice(b"\\r"),
            b'\t' => self.buf.extend_from_slice(b"\\t"),
            _ => {
                self.buf.extend_from_slice(b"\\u00");
                self.buf.put_u8(HEX[(b >> 4) as usize]);
                self.buf.put_u8(HEX[(b & 0xf) as usize]);
            }
        }
    }

    // ------------------------------------------------------------------
    // Base64
    // ------------------------------------------------------------------

    /// Append a byte sequence as a quoted, standard-alphabet base64 string.
    ///
    /// An absent sequence (`None`) emits `null`; a present-but-empty
    /// sequence emits `""`.
    pub fn base64(&mut self, data: Option<&[u8]>) {
        if self.error.is_some() {
            return;
        }
        let Some(data) = data else {
            self.raw_str("null");
            return;
        };
        self.ensure_space(data.len() / 3 * 4 + 6);
        self.buf.put_u8(b'"');
        let mut chunks = data.chunks_exact(3);
        for chunk in &mut chunks {
            let n = (chunk[0] as u32) << 16 | (chunk[1] as u32) << 8 | chunk[2] as u32;
            self.buf.put_u8(BASE64[(n >> 18 & 63) as usize]);
            self.buf.put_u8(BASE64[(n >> 12 & 63) as usize]);
            self.buf.put_u8(BASE64[(n >> 6 & 63) as usize]);
            self.buf.put_u8(BASE64[(n & 63) as usize]);
        }
        match *chunks.remainder() {
            [a] => {
                let n = (a as u32) << 16;
                self.buf.put_u8(BASE64[(n >> 18 & 63) as usize]);
                self.buf.put_u8(BASE64[(n >> 12 & 63) as usize]);
                self.buf.extend_from_slice(b"==");
            }
            [a, b] => {
                let n = (a as u32) << 16 | (b as u32) << 8;
                self.buf.put_u8(BASE64[(n >> 18 & 63) as usize]);
                self.buf.put_u8(BASE64[(n >> 12 & 63) as usize]);
                self.buf.put_u8(BASE64[(n >> 6 & 63) as usize]);
                self.buf.put_u8(b'=');
            }
            _ => {}
        }
        self.buf.put_u8(b'"');
    }

    // ------------------------------------------------------------------
    // Finalizers
    // ------------------------------------------------------------------

    /// Take the accumulated bytes, or the sticky error if one was recorded.
    pub fn build_bytes(self) -> Result<Bytes, WriteError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.buf.freeze()),
        }
    }

    /// Take the accumulated bytes into caller-supplied storage, reusing
    /// its allocation where capacity allows. The sticky error is checked
    /// first and the output vector is left untouched if it is set.
    pub fn build_into(self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        match self.error {
            Some(err) => Err(err),
            None => {
                out.clear();
                out.extend_from_slice(&self.buf);
                Ok(())
            }
        }
    }

    /// Drain the accumulated bytes into an external sink, returning the
    /// number of bytes written. The sticky error is checked first and no
    /// bytes are written if it is set.
    pub fn dump_to<W: io::Write>(&mut self, out: &mut W) -> Result<usize, WriteError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        out.write_all(&self.buf)
            .map_err(|err| WriteError::Io(err.to_string()))?;
        let written = self.buf.len();
        self.buf.clear();
        Ok(written)
    }

    /// Wrap the accumulated bytes as a readable stream, or report the
    /// sticky error without yielding any bytes.
    pub fn into_reader(self) -> Result<io::Cursor<Bytes>, WriteError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(io::Cursor::new(self.buf.freeze())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use std::io::Read;

    fn written(f: impl FnOnce(&mut JsonWriter)) -> String {
        let mut w = JsonWriter::new();
        f(&mut w);
        let bytes = w.build_bytes().expect("no writer error");
        String::from_utf8(bytes.to_vec()).expect("valid utf8")
    }

    #[test]
    fn plain_strings_pass_through_unchanged() {
        for s in ["", "hello", "caffé", "日本語", "punctuation: .!?()[]"] {
            assert_eq!(written(|w| w.string(s)), format!("\"{s}\""));
        }
    }

    #[test]
    fn escapes_quotes_backslashes_and_controls() {
        assert_eq!(written(|w| w.string("a\"b")), r#""a\"b""#);
        assert_eq!(written(|w| w.string("a\\b")), r#""a\\b""#);
        assert_eq!(written(|w| w.string("a\nb\tc\rd")), r#""a\nb\tc\rd""#);
        assert_eq!(written(|w| w.string("\x00\x1f")), r#""\u0000\u001f""#);
    }

    #[test]
    fn html_mode_escapes_angle_brackets_and_ampersand() {
        assert_eq!(
            written(|w| w.string("<b>&</b>")),
            r#""\u003cb\u003e\u0026\u003c/b\u003e""#
        );
    }

    #[test]
    fn no_html_mode_leaves_them_literal() {
        let out = written(|w| {
            w.no_escape_html = true;
            w.string("<b>&</b>");
        });
        assert_eq!(out, r#""<b>&</b>""#);
    }

    #[test]
    fn line_and_paragraph_separators_always_escape() {
        assert_eq!(written(|w| w.string("a\u{2028}b")), r#""a\u2028b""#);
        let out = written(|w| {
            w.no_escape_html = true;
            w.string("a\u{2029}b");
        });
        assert_eq!(out, r#""a\u2029b""#);
    }

    #[test]
    fn invalid_bytes_become_replacement_escapes_one_byte_at_a_time() {
        assert_eq!(
            written(|w| w.string_bytes(b"ok\xffgo")),
            r#""ok\ufffdgo""#
        );
        // two stray continuation bytes produce two replacements
        assert_eq!(
            written(|w| w.string_bytes(b"a\x80\x80b")),
            r#""a\ufffd\ufffdb""#
        );
        // truncated multi-byte sequence at the end
        assert_eq!(written(|w| w.string_bytes(b"x\xe6")), r#""x\ufffd""#);
    }

    #[test]
    fn integer_widths_and_bounds() {
        assert_eq!(written(|w| w.uint64(u64::MAX)), "18446744073709551615");
        assert_eq!(written(|w| w.int64(i64::MIN)), "-9223372036854775808");
        assert_eq!(written(|w| w.int8(-128)), "-128");
        assert_eq!(written(|w| w.uint8(255)), "255");
        assert_eq!(written(|w| w.uint32_str(7)), "\"7\"");
    }

    #[test]
    fn int64_str_round_trips_at_bounds() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let out = written(|w| w.int64_str(v));
            let stripped = out.trim_matches('"');
            assert_eq!(stripped.parse::<i64>().expect("parses"), v);
        }
    }

    #[test]
    fn floats_and_non_finite() {
        assert_eq!(written(|w| w.float64(1.5)), "1.5");
        assert_eq!(written(|w| w.float64(-0.25)), "-0.25");
        assert_eq!(written(|w| w.float32(2.0)), "2");
        assert_eq!(written(|w| w.float64(f64::NAN)), "null");
        assert_eq!(written(|w| w.float64(f64::INFINITY)), "null");
        assert_eq!(written(|w| w.float64_str(3.5)), "\"3.5\"");
    }

    #[test]
    fn booleans_and_nil_containers() {
        assert_eq!(written(|w| w.boolean(true)), "true");
        assert_eq!(written(|w| w.boolean(false)), "false");
        assert_eq!(written(|w| w.nil_map()), "null");
        assert_eq!(written(|w| w.nil_seq()), "null");
        let out = written(|w| {
            w.nil_map_as_empty = true;
            w.nil_seq_as_empty = true;
            w.nil_map();
            w.raw_byte(b',');
            w.nil_seq();
        });
        assert_eq!(out, "{},[]");
    }

    #[test]
    fn base64_nil_empty_and_padding() {
        assert_eq!(written(|w| w.base64(None)), "null");
        assert_eq!(written(|w| w.base64(Some(b""))), "\"\"");
        // remainder of one byte: two padding chars
        assert_eq!(written(|w| w.base64(Some(b"f"))), "\"Zg==\"");
        // remainder of two bytes: one padding char
        assert_eq!(written(|w| w.base64(Some(b"fo"))), "\"Zm8=\"");
        assert_eq!(written(|w| w.base64(Some(b"foo"))), "\"Zm9v\"");
        assert_eq!(written(|w| w.base64(Some(b"foobar"))), "\"Zm9vYmFy\"");
    }

    #[test]
    fn base64_agrees_with_reference_encoder() {
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![255, 254, 253],
            (0..=255).collect(),
            b"The quick brown fox jumps over the lazy dog".to_vec(),
        ];
        for data in samples {
            let out = written(|w| w.base64(Some(&data)));
            let expected = format!("\"{}\"", BASE64_STANDARD.encode(&data));
            assert_eq!(out, expected);
            // and it decodes back to the input
            let decoded = BASE64_STANDARD
                .decode(out.trim_matches('"'))
                .expect("decodes");
            assert_eq!(decoded, data);
        }
    }

    #[test]
    fn raw_splices_error_propagates_empty_is_null() {
        assert_eq!(
            written(|w| w.raw(Ok::<_, WriteError>(b"{\"a\":1}".as_slice()))),
            "{\"a\":1}"
        );
        assert_eq!(written(|w| w.raw(Ok::<_, WriteError>(b"".as_slice()))), "null");

        let mut w = JsonWriter::new();
        w.raw(Err::<&[u8], _>(WriteError::Delegate("boom".into())));
        assert!(matches!(w.error(), Some(WriteError::Delegate(_))));
    }

    #[test]
    fn raw_text_re_escapes() {
        assert_eq!(
            written(|w| w.raw_text(Ok::<_, WriteError>(b"say \"hi\"".as_slice()))),
            r#""say \"hi\"""#
        );
        assert_eq!(
            written(|w| w.raw_text(Ok::<_, WriteError>(b"".as_slice()))),
            "null"
        );
    }

    #[test]
    fn sticky_error_suppresses_all_later_output() {
        let mut w = JsonWriter::new();
        w.raw_str("[1,");
        w.raw(Err::<&[u8], _>(WriteError::Delegate("inner failure".into())));
        // none of these may land
        w.raw_str("2]");
        w.string("nope");
        w.int64(42);
        w.base64(Some(b"data"));

        let mut sink = Vec::new();
        // a second writer error does not replace the first
        w.set_error(WriteError::Delegate("second".into()));
        let err = w.dump_to(&mut sink).expect_err("sticky error");
        assert_eq!(err, WriteError::Delegate("inner failure".into()));
        assert!(sink.is_empty(), "no partial bytes may escape");

        let err2 = w.build_bytes().expect_err("sticky error");
        assert_eq!(err2, WriteError::Delegate("inner failure".into()));
    }

    #[test]
    fn build_into_reuses_caller_storage() {
        let mut w = JsonWriter::new();
        w.string("reused");
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(b"stale");
        w.build_into(&mut out).expect("no error");
        assert_eq!(out, b"\"reused\"");

        let mut w = JsonWriter::new();
        w.set_error(WriteError::Delegate("broken".into()));
        let mut out = b"untouched".to_vec();
        assert!(w.build_into(&mut out).is_err());
        assert_eq!(out, b"untouched");
    }

    #[test]
    fn dump_to_drains_and_resets() {
        let mut w = JsonWriter::new();
        w.raw_str("[1,2]");
        let mut sink = Vec::new();
        assert_eq!(w.dump_to(&mut sink).expect("drains"), 5);
        assert_eq!(sink, b"[1,2]");
        assert_eq!(w.size(), 0);
    }

    #[test]
    fn into_reader_streams_the_bytes() {
        let mut w = JsonWriter::new();
        w.string("stream me");
        let mut reader = w.into_reader().expect("no error");
        let mut out = String::new();
        reader.read_to_string(&mut out).expect("reads");
        assert_eq!(out, "\"stream me\"");
    }

    #[test]
    fn mixed_document_assembly() {
        let mut w = JsonWriter::with_capacity(64);
        w.raw_byte(b'{');
        w.string("id");
        w.raw_byte(b':');
        w.uint64_str(9007199254740993);
        w.raw_byte(b',');
        w.string("tags");
        w.raw_str(":[");
        w.string("a<b");
        w.raw_byte(b']');
        w.raw_byte(b'}');
        assert_eq!(
            w.build_bytes().expect("no error").as_ref(),
            br#"{"id":"9007199254740993","tags":["a\u003cb"]}"#
        );
    }
}
