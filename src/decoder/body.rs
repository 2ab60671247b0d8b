//! ボディのフレーミング
//!
//! ヘッド行の Transfer-Encoding と Content-Length からボディの区切り方を決め、
//! 下位ストリームを対応するリーダーで包む。ヘッダーマップは構築しない。

use std::io::{self, Read};

use crate::error::Error;
use crate::limits::ReaderLimits;
use crate::source::ByteSource;

use super::chunked::ChunkedReader;
use super::head::HeadLines;
use super::length::LengthLimitedReader;

/// ボディの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Content-Length で指定された固定長
    ContentLength(u64),
    /// Transfer-Encoding: chunked
    Chunked,
    /// ボディなし
    None,
}

impl BodyKind {
    /// ヘッド行からボディの種類を判定
    ///
    /// 先頭行はリクエストラインとして読み飛ばす。
    pub fn from_head_lines(lines: &HeadLines) -> Result<Self, Error> {
        let mut chunked = false;
        let mut content_length = None;

        for line in lines.header_lines() {
            let (name, value) = split_header_line(line)?;
            if name.eq_ignore_ascii_case("Transfer-Encoding") {
                chunked = parse_transfer_encoding(value, chunked)?;
            } else if name.eq_ignore_ascii_case("Content-Length") {
                let parsed = parse_content_length(value)?;
                match content_length {
                    Some(prev) if prev != parsed => {
                        return Err(Error::InvalidContentLength(format!(
                            "mismatched values {prev} and {parsed}"
                        )));
                    }
                    _ => content_length = Some(parsed),
                }
            }
        }

        let kind = match (chunked, content_length) {
            (true, Some(_)) => return Err(Error::ConflictingFraming),
            (true, None) => BodyKind::Chunked,
            (false, Some(n)) => BodyKind::ContentLength(n),
            (false, None) => BodyKind::None,
        };
        tracing::debug!(?kind, "body framing selected");
        Ok(kind)
    }
}

/// ヘッダー行を `name` と `value` に分割
///
/// 値の前後の空白は取り除く。obs-fold、コロンなし、空の名前、
/// 名前に token 以外の文字を含む行はエラー。
pub fn split_header_line(line: &str) -> Result<(&str, &str), Error> {
    let invalid = || Error::InvalidHeaderLine(line.to_string());
    if line.starts_with([' ', '\t']) {
        return Err(invalid());
    }
    let (name, value) = line.split_once(':').ok_or_else(invalid)?;
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(invalid());
    }
    Ok((name, value.trim_matches(|c| c == ' ' || c == '\t')))
}

/// ヘッダー名に使えるトークン文字か確認
fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// Transfer-Encoding の値を解析
///
/// サポートするのは chunked のみで、複数ヘッダーにまたがっても一度だけ指定できる。
/// `seen` はそれまでに chunked が指定されていたか。
fn parse_transfer_encoding(value: &str, seen: bool) -> Result<bool, Error> {
    let unsupported = || Error::UnsupportedTransferCoding(value.to_string());
    let mut chunked = seen;
    for token in value.split(',') {
        let token = token.trim();
        if token.is_empty() || !token.eq_ignore_ascii_case("chunked") || chunked {
            return Err(unsupported());
        }
        chunked = true;
    }
    Ok(chunked)
}

/// Content-Length の値をパース
fn parse_content_length(value: &str) -> Result<u64, Error> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidContentLength(value.to_string()));
    }
    value
        .parse::<u64>()
        .map_err(|_| Error::InvalidContentLength(value.to_string()))
}

/// フレーミング済みのボディ
///
/// どの種類でも `Read` と `ByteSource` として同じように扱える。
#[derive(Debug)]
pub enum Body<R> {
    /// ボディなし (常に終端)
    Empty(R),
    /// Content-Length で区切られたボディ
    Length(LengthLimitedReader<R>),
    /// chunked ボディ
    Chunked(ChunkedReader<R>),
}

impl<R: Read> Body<R> {
    /// ボディの種類に応じて `inner` を包む
    ///
    /// Content-Length が `max_body_size` を超える場合は読み始める前にエラーを返す。
    /// chunked の場合はチャンクサイズ行を読むたびに合計を確認する。
    pub fn new(inner: R, kind: BodyKind, limits: &ReaderLimits) -> Result<Self, Error> {
        let body = match kind {
            BodyKind::None => Body::Empty(inner),
            BodyKind::ContentLength(n) => {
                if n > limits.max_body_size {
                    return Err(Error::BodyTooLarge {
                        size: n,
                        limit: limits.max_body_size,
                    });
                }
                Body::Length(LengthLimitedReader::new(inner, n))
            }
            BodyKind::Chunked => Body::Chunked(ChunkedReader::with_limits(inner, limits.clone())),
        };
        Ok(body)
    }

    /// 下位ストリームを取り出す
    ///
    /// ボディを最後まで読んだ後であれば、次のメッセージの先頭を指している。
    pub fn into_inner(self) -> R {
        match self {
            Body::Empty(inner) => inner,
            Body::Length(reader) => reader.into_inner(),
            Body::Chunked(reader) => reader.into_inner(),
        }
    }
}

impl<R: Read> Read for Body<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Body::Empty(_) => Ok(0),
            Body::Length(reader) => reader.read(buf),
            Body::Chunked(reader) => reader.read(buf),
        }
    }
}

impl<R: ByteSource> ByteSource for Body<R> {
    fn available(&self) -> usize {
        match self {
            Body::Empty(_) => 0,
            Body::Length(reader) => reader.available(),
            Body::Chunked(reader) => reader.available(),
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        match self {
            Body::Empty(_) => Ok(0),
            Body::Length(reader) => reader.skip(n),
            Body::Chunked(reader) => reader.skip(n),
        }
    }
}
