//! chunked 転送コーディングのデコーダー
//!
//! `SIZE[;ext] CRLF DATA CRLF ... 0 CRLF` を平坦なバイト列として読み出す。
//! チャンク拡張は捨て、トレーラーはパースしない。

use std::io::{self, Read};

use crate::error::Error;
use crate::limits::ReaderLimits;
use crate::source::{ByteSource, read_byte};

use super::head::{LineEvent, read_crlf_line};
use super::phase::{ChunkedPhase, SizeLineScan};

/// 16 進数として不正な文字
const INVALID_HEX: u8 = 0xFF;

/// 16 進数の値テーブル
const HEX_VALUES: [u8; 256] = {
    let mut table = [INVALID_HEX; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as u8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as u8;
        table[b'A' as usize + i] = 10 + i as u8;
        i += 1;
    }
    table
};

/// チャンクサイズをパース
///
/// 前後の空白を取り除いた 16 進数。空、16 進数以外、u64 を超える値はエラー。
fn parse_chunk_size(text: &[u8]) -> Result<u64, Error> {
    let text = text.trim_ascii();
    let invalid = || Error::InvalidChunkSize(String::from_utf8_lossy(text).into_owned());
    if text.is_empty() {
        return Err(invalid());
    }
    let mut size: u64 = 0;
    for &b in text {
        let value = HEX_VALUES[b as usize];
        if value == INVALID_HEX {
            return Err(invalid());
        }
        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(u64::from(value)))
            .ok_or_else(invalid)?;
    }
    Ok(size)
}

/// chunked ボディのリーダー
///
/// `read()` は現在のチャンクの残りバイト数で上限を切るため、
/// 要求より少ないバイト数を返すことがある。`Ok(0)` は終端チャンクを
/// 処理した後にのみ返す。終端チャンクより前に下位ストリームが終了した場合は
/// `Error::TruncatedChunkedBody` を返す。
/// チャンクサイズの合計が `max_body_size` を超えた時点で `Error::BodyTooLarge` を返す。
///
/// エラーを返した後のリーダーは破棄すること。
///
/// ```rust
/// use shiguredo_http11_reader::ChunkedReader;
/// use std::io::Read;
///
/// let mut reader = ChunkedReader::new(&b"3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"[..]);
/// let mut body = Vec::new();
/// reader.read_to_end(&mut body).unwrap();
/// assert_eq!(body, b"abcde");
/// ```
#[derive(Debug)]
pub struct ChunkedReader<R> {
    inner: R,
    phase: ChunkedPhase,
    limits: ReaderLimits,
    /// これまでに宣言されたチャンクサイズの合計
    body_size: u64,
    trailers_consumed: bool,
}

impl<R: Read> ChunkedReader<R> {
    /// 新しいリーダーを作成
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, ReaderLimits::default())
    }

    /// 制限付きでリーダーを作成
    pub fn with_limits(inner: R, limits: ReaderLimits) -> Self {
        Self {
            inner,
            phase: ChunkedPhase::BeforeFirstChunk,
            limits,
            body_size: 0,
            trailers_consumed: false,
        }
    }

    /// 終端チャンクを処理済みか確認
    pub fn is_done(&self) -> bool {
        self.phase == ChunkedPhase::Done
    }

    /// 下位ストリームへの参照を取得
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// 下位ストリームへの可変参照を取得
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// 下位ストリームを取り出す
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// 1 バイト読む
    ///
    /// 終端チャンクを処理した後は `None` を返す。
    pub fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        if self.ensure_chunk()?.is_none() {
            return Ok(None);
        }
        let byte = read_byte(&mut self.inner)?.ok_or(Error::TruncatedChunkedBody)?;
        self.consume(1);
        Ok(Some(byte))
    }

    /// トレーラー行を読み捨てる
    ///
    /// ボディが残っていれば先に読み捨て、終端チャンクの後の行を空行まで読む。
    /// 行はパースせずにそのまま返す。2 回目以降の呼び出しは空を返す。
    pub fn read_trailers(&mut self) -> Result<Vec<String>, Error> {
        while let Some(remaining) = self.ensure_chunk()? {
            let skipped = self.skip_chunk_data(remaining)?;
            self.consume(skipped);
        }
        if self.trailers_consumed {
            return Ok(Vec::new());
        }

        let mut trailers = Vec::new();
        loop {
            match read_crlf_line(&mut self.inner, self.limits.max_head_line_size)? {
                LineEvent::Blank => break,
                LineEvent::Line(line) => {
                    if trailers.len() >= self.limits.max_head_lines {
                        return Err(Error::TooManyHeadLines {
                            count: trailers.len() + 1,
                            limit: self.limits.max_head_lines,
                        });
                    }
                    trailers.push(line);
                }
                LineEvent::Eof => return Err(Error::TruncatedChunkedBody),
            }
        }
        self.trailers_consumed = true;
        tracing::trace!(trailers = trailers.len(), "trailers consumed");
        Ok(trailers)
    }

    /// 現在のチャンクに読めるデータがある状態まで進める
    ///
    /// 現在のチャンクの残りバイト数を返す。終端チャンクを処理済みなら `None`。
    fn ensure_chunk(&mut self) -> Result<Option<u64>, Error> {
        loop {
            match self.phase {
                ChunkedPhase::ReadingChunkData { remaining } => return Ok(Some(remaining)),
                ChunkedPhase::Done => return Ok(None),
                ChunkedPhase::AwaitingTrailingCrlf => {
                    self.read_data_crlf()?;
                    self.phase = ChunkedPhase::ReadingSizeLine;
                }
                ChunkedPhase::BeforeFirstChunk | ChunkedPhase::ReadingSizeLine => {
                    let size = self.read_size_line()?;
                    if size == 0 {
                        tracing::trace!("last chunk");
                        self.phase = ChunkedPhase::Done;
                    } else {
                        tracing::trace!(size, "chunk");
                        self.add_body_size(size)?;
                        self.phase = ChunkedPhase::ReadingChunkData { remaining: size };
                    }
                }
            }
        }
    }

    /// チャンクサイズを合計に加えて上限を確認する
    fn add_body_size(&mut self, size: u64) -> Result<(), Error> {
        let limit = self.limits.max_body_size;
        let total = self
            .body_size
            .checked_add(size)
            .ok_or(Error::BodyTooLarge {
                size: u64::MAX,
                limit,
            })?;
        if total > limit {
            return Err(Error::BodyTooLarge { size: total, limit });
        }
        self.body_size = total;
        Ok(())
    }

    /// チャンクサイズ行を読んでサイズを返す
    fn read_size_line(&mut self) -> Result<u64, Error> {
        let limit = self.limits.max_chunk_line_size;
        let mut line = Vec::new();
        let mut scan = SizeLineScan::Normal;
        let mut extension_start = None;

        loop {
            let b = read_byte(&mut self.inner)?.ok_or(Error::TruncatedChunkedBody)?;
            match scan {
                SizeLineScan::Normal => match b {
                    b'\r' => match read_byte(&mut self.inner)? {
                        Some(b'\n') => break,
                        Some(found) => return Err(Error::InvalidChunkLineEnding { found }),
                        None => return Err(Error::TruncatedChunkedBody),
                    },
                    b'\n' => return Err(Error::InvalidChunkLineEnding { found: b }),
                    b'"' => scan = SizeLineScan::Quoted,
                    b';' if extension_start.is_none() => extension_start = Some(line.len()),
                    _ => {}
                },
                SizeLineScan::Quoted => match b {
                    b'"' => scan = SizeLineScan::Normal,
                    b'\\' => scan = SizeLineScan::Escape,
                    _ => {}
                },
                SizeLineScan::Escape => scan = SizeLineScan::Quoted,
            }
            if line.len() >= limit {
                return Err(Error::ChunkLineTooLong {
                    size: line.len() + 1,
                    limit,
                });
            }
            line.push(b);
        }

        let size_part = &line[..extension_start.unwrap_or(line.len())];
        parse_chunk_size(size_part)
            .inspect_err(|e| tracing::debug!("rejected chunk size line: {e}"))
    }

    /// チャンクデータ後の CRLF を読む
    fn read_data_crlf(&mut self) -> Result<(), Error> {
        for expected in [b'\r', b'\n'] {
            match read_byte(&mut self.inner)? {
                Some(b) if b == expected => {}
                Some(found) => return Err(Error::InvalidChunkDataEnding { found }),
                None => return Err(Error::TruncatedChunkedBody),
            }
        }
        Ok(())
    }

    /// 読み取り後にチャンクの残りを減らす
    fn consume(&mut self, n: u64) {
        if let ChunkedPhase::ReadingChunkData { remaining } = self.phase {
            let remaining = remaining.saturating_sub(n);
            self.phase = if remaining == 0 {
                ChunkedPhase::AwaitingTrailingCrlf
            } else {
                ChunkedPhase::ReadingChunkData { remaining }
            };
        }
    }

    /// 現在のチャンクから最大 `n` バイト読み捨てる
    fn skip_chunk_data(&mut self, n: u64) -> Result<u64, Error> {
        let mut scratch = [0u8; 512];
        let want = n.min(scratch.len() as u64) as usize;
        let read = loop {
            match self.inner.read(&mut scratch[..want]) {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if read == 0 {
            return Err(Error::TruncatedChunkedBody);
        }
        Ok(read as u64)
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(remaining) = self.ensure_chunk()? else {
            return Ok(0);
        };
        let max = remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(Error::TruncatedChunkedBody.into());
        }
        self.consume(n as u64);
        Ok(n)
    }
}

impl<R: ByteSource> ByteSource for ChunkedReader<R> {
    fn available(&self) -> usize {
        match self.phase {
            ChunkedPhase::ReadingChunkData { remaining } => self
                .inner
                .available()
                .min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            _ => 0,
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        let Some(remaining) = self.ensure_chunk()? else {
            return Ok(0);
        };
        let skipped = self.inner.skip(remaining.min(n))?;
        if skipped == 0 {
            return Err(Error::TruncatedChunkedBody.into());
        }
        self.consume(skipped);
        Ok(skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut reader = ChunkedReader::new(input);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).map_err(Error::from_io)?;
        Ok(out)
    }

    #[test]
    fn hex_table() {
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"a").unwrap(), 10);
        assert_eq!(parse_chunk_size(b"FF").unwrap(), 255);
        assert_eq!(parse_chunk_size(b" 1f \t").unwrap(), 31);
        assert_eq!(
            parse_chunk_size(b"ffffffffffffffff").unwrap(),
            u64::MAX
        );
        assert!(parse_chunk_size(b"10000000000000000").is_err());
        assert!(parse_chunk_size(b"").is_err());
        assert!(parse_chunk_size(b"-1").is_err());
        assert!(parse_chunk_size(b"0x10").is_err());
        assert!(parse_chunk_size(b"g").is_err());
    }

    #[test]
    fn three_chunks() {
        let body = decode(b"3\r\nabc\r\n3\r\ndef\r\n2\r\ngh\r\n0\r\n\r\n").unwrap();
        assert_eq!(body, b"abcdefgh");
    }

    #[test]
    fn eof_after_last_chunk() {
        let mut reader = ChunkedReader::new(&b"2\r\nab\r\n0\r\n"[..]);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(reader.is_done());
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.read_byte().unwrap(), None);
    }

    #[test]
    fn read_is_capped_by_chunk() {
        let mut reader = ChunkedReader::new(&b"3\r\nabc\r\n5\r\ndefgh\r\n0\r\n\r\n"[..]);
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"defgh");
    }

    #[test]
    fn read_byte_walks_chunks() {
        let mut reader = ChunkedReader::new(&b"1\r\na\r\n2\r\nbc\r\n0\r\n\r\n"[..]);
        let mut out = Vec::new();
        while let Some(b) = reader.read_byte().unwrap() {
            out.push(b);
        }
        assert_eq!(out, b"abc");
    }

    #[test]
    fn extension_is_ignored() {
        assert_eq!(
            decode(b"5;foo=bar\r\nhello\r\n0\r\n\r\n").unwrap(),
            decode(b"5\r\nhello\r\n0\r\n\r\n").unwrap()
        );
        assert_eq!(decode(b"5 ; a ; b=c\r\nhello\r\n0\r\n\r\n").unwrap(), b"hello");
    }

    #[test]
    fn quoted_extension() {
        let body = decode(b"5;name=\"a;b\\\"c\r\nd\"\r\nhello\r\n0\r\n\r\n").unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn quote_before_semicolon_belongs_to_size() {
        assert!(matches!(
            decode(b"5\";x\"\r\nhello\r\n0\r\n\r\n"),
            Err(Error::InvalidChunkSize(_))
        ));
    }

    #[test]
    fn invalid_size() {
        assert!(matches!(
            decode(b"zzz\r\n"),
            Err(Error::InvalidChunkSize(ref s)) if s == "zzz"
        ));
        assert!(matches!(
            decode(b";ext\r\n\r\n"),
            Err(Error::InvalidChunkSize(_))
        ));
    }

    #[test]
    fn leading_crlf_before_first_chunk() {
        // 最初のサイズ行の前にデータ後の CRLF は来ない
        assert!(matches!(
            decode(b"\r\n5\r\nhello\r\n0\r\n\r\n"),
            Err(Error::InvalidChunkSize(ref s)) if s.is_empty()
        ));
    }

    #[test]
    fn body_size_limit() {
        let limits = ReaderLimits {
            max_body_size: 8,
            ..Default::default()
        };
        let input = b"5\r\nhello\r\n3\r\nabc\r\n0\r\n\r\n";
        let mut reader = ChunkedReader::with_limits(&input[..], limits.clone());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"helloabc");

        let input = b"5\r\nhello\r\n4\r\nabcd\r\n0\r\n\r\n";
        let mut reader = ChunkedReader::with_limits(&input[..], limits);
        let mut out = Vec::new();
        let err = Error::from_io(reader.read_to_end(&mut out).unwrap_err());
        assert!(matches!(err, Error::BodyTooLarge { size: 9, limit: 8 }));
        // 上限を超えるチャンクのデータは読まない
        assert_eq!(out, b"hello");
        assert_eq!(reader.get_ref(), b"abcd\r\n0\r\n\r\n");
    }

    #[test]
    fn body_size_overflow() {
        let mut reader = ChunkedReader::with_limits(
            &b"ffffffffffffffff\r\n"[..],
            ReaderLimits::unlimited(),
        );
        reader.body_size = 1;
        let err = Error::from_io(reader.read(&mut [0u8; 8]).unwrap_err());
        assert!(matches!(err, Error::BodyTooLarge { size: u64::MAX, .. }));
    }

    #[test]
    fn default_limit_rejects_huge_chunk() {
        let err = decode(b"ffffffff\r\n").unwrap_err();
        assert!(matches!(
            err,
            Error::BodyTooLarge { size: 0xffff_ffff, limit: 10_485_760 }
        ));
    }

    #[test]
    fn cr_without_lf_in_size_line() {
        assert!(matches!(
            decode(b"5\rhello"),
            Err(Error::InvalidChunkLineEnding { found: b'h' })
        ));
    }

    #[test]
    fn bare_lf_in_size_line() {
        assert!(matches!(
            decode(b"5\nhello\r\n0\r\n\r\n"),
            Err(Error::InvalidChunkLineEnding { found: b'\n' })
        ));
    }

    #[test]
    fn missing_crlf_after_data() {
        assert!(matches!(
            decode(b"3\r\nabcX\r\n0\r\n\r\n"),
            Err(Error::InvalidChunkDataEnding { found: b'X' })
        ));
        assert!(matches!(
            decode(b"3\r\nabc\rX0\r\n\r\n"),
            Err(Error::InvalidChunkDataEnding { found: b'X' })
        ));
    }

    #[test]
    fn truncated_inside_data() {
        assert!(matches!(
            decode(b"5\r\nhel"),
            Err(Error::TruncatedChunkedBody)
        ));
    }

    #[test]
    fn truncated_before_last_chunk() {
        assert!(matches!(
            decode(b"5\r\nhello\r\n"),
            Err(Error::TruncatedChunkedBody)
        ));
        assert!(matches!(decode(b""), Err(Error::TruncatedChunkedBody)));
        assert!(matches!(decode(b"5"), Err(Error::TruncatedChunkedBody)));
        assert!(matches!(decode(b"5\r"), Err(Error::TruncatedChunkedBody)));
        assert!(matches!(
            decode(b"5\r\nhello\r"),
            Err(Error::TruncatedChunkedBody)
        ));
    }

    #[test]
    fn truncation_surfaces_as_unexpected_eof() {
        let mut reader = ChunkedReader::new(&b"5\r\nhe"[..]);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(out, b"he");
    }

    #[test]
    fn last_chunk_does_not_wait_for_trailing_crlf() {
        // 終端チャンクの後は読まない
        let mut reader = ChunkedReader::new(&b"0\r\nX-Trailer: 1\r\n\r\nNEXT"[..]);
        assert_eq!(reader.read(&mut [0u8; 4]).unwrap(), 0);
        assert_eq!(reader.into_inner(), b"X-Trailer: 1\r\n\r\nNEXT");
    }

    #[test]
    fn data_crlf_is_read_lazily() {
        let mut reader = ChunkedReader::new(&b"3\r\nabc\r\n0\r\n\r\n"[..]);
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.phase, ChunkedPhase::AwaitingTrailingCrlf);
        assert_eq!(reader.get_ref(), b"\r\n0\r\n\r\n");
    }

    #[test]
    fn chunk_line_limit() {
        let limits = ReaderLimits {
            max_chunk_line_size: 4,
            ..Default::default()
        };
        let mut reader = ChunkedReader::with_limits(&b"5;abcdef\r\nhello\r\n0\r\n\r\n"[..], limits);
        let err = Error::from_io(reader.read(&mut [0u8; 8]).unwrap_err());
        assert!(matches!(err, Error::ChunkLineTooLong { size: 5, limit: 4 }));
    }

    #[test]
    fn trailers() {
        let mut reader =
            ChunkedReader::new(&b"3\r\nabc\r\n0\r\nX-Sum: 1\r\nX-Other: 2\r\n\r\nNEXT"[..]);
        let trailers = reader.read_trailers().unwrap();
        assert_eq!(trailers, ["X-Sum: 1", "X-Other: 2"]);
        assert!(reader.read_trailers().unwrap().is_empty());
        assert_eq!(reader.into_inner(), b"NEXT");
    }

    #[test]
    fn trailers_truncated() {
        let mut reader = ChunkedReader::new(&b"0\r\nX-Sum: 1\r\n"[..]);
        assert!(matches!(
            reader.read_trailers(),
            Err(Error::TruncatedChunkedBody)
        ));
    }

    #[test]
    fn available_and_skip_are_capped_by_chunk() {
        let mut reader = ChunkedReader::new(&b"4\r\nabcd\r\n2\r\nef\r\n0\r\n\r\n"[..]);
        assert_eq!(reader.available(), 0);
        assert_eq!(reader.skip(10).unwrap(), 4);
        assert_eq!(reader.available(), 0);
        assert_eq!(reader.read_byte().unwrap(), Some(b'e'));
        assert_eq!(reader.available(), 1);
        assert_eq!(reader.skip(10).unwrap(), 1);
        assert_eq!(reader.skip(10).unwrap(), 0);
        assert!(reader.is_done());
    }

    #[test]
    fn large_chunk_size() {
        let mut input = b"1000\r\n".to_vec();
        input.extend(std::iter::repeat_n(b'x', 0x1000));
        input.extend_from_slice(b"\r\n0\r\n\r\n");
        assert_eq!(decode(&input).unwrap().len(), 0x1000);
    }
}
