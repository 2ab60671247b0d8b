//! ヘッド読み取り
//!
//! CRLF で終わる行を空行まで 1 バイトずつ読み取る。
//! 空行の直後から先は読まないため、残りのストリームがそのままボディになる。

use std::io::Read;

use crate::error::Error;
use crate::limits::ReaderLimits;
use crate::source::read_byte;

use super::body::BodyKind;
use super::message::Message;

/// ヘッド行
///
/// 到着順に並んだ行。重複は除去しない。
/// 各行は CR / LF を含まず、終端の空行は含まない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadLines {
    lines: Vec<String>,
}

impl HeadLines {
    /// 行のスライスを取得
    pub fn as_slice(&self) -> &[String] {
        &self.lines
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// 空か確認
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 指定位置の行を取得
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// 先頭行 (リクエストライン) を取得
    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    /// 先頭行以外 (ヘッダー行) を取得
    pub fn header_lines(&self) -> &[String] {
        self.lines.get(1..).unwrap_or(&[])
    }

    /// 行を走査
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.lines.iter()
    }

    /// `Vec<String>` に変換
    pub fn into_vec(self) -> Vec<String> {
        self.lines
    }
}

impl<'a> IntoIterator for &'a HeadLines {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// ヘッド行からヘッダーを参照するための共通トレイト
///
/// ヘッダーマップを構築するものではなく、行を `name: value` として
/// その場で走査する。不正な行は無視する。
pub trait HttpHead {
    /// ヘッド行を取得
    fn head_lines(&self) -> &HeadLines;

    /// ヘッダーを取得 (大文字小文字を区別しない)
    fn get_header(&self, name: &str) -> Option<&str> {
        self.head_lines()
            .header_lines()
            .iter()
            .filter_map(|line| line.split_once(':'))
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
    }

    /// 指定した名前のヘッダーをすべて取得
    fn get_headers(&self, name: &str) -> Vec<&str> {
        self.head_lines()
            .header_lines()
            .iter()
            .filter_map(|line| line.split_once(':'))
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
            .collect()
    }

    /// ヘッダーが存在するか確認
    fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// ボディの種類を判定
    fn body_kind(&self) -> Result<BodyKind, Error> {
        BodyKind::from_head_lines(self.head_lines())
    }
}

impl HttpHead for HeadLines {
    fn head_lines(&self) -> &HeadLines {
        self
    }
}

/// 1 行読み取った結果
#[derive(Debug)]
pub(crate) enum LineEvent {
    /// 空ではない行
    Line(String),
    /// 空行
    Blank,
    /// 行の途中または行頭で入力が終了した
    Eof,
}

/// CRLF で終わる行を 1 行読む
///
/// CR の直後が LF でなければ `ExpectedLineFeed`、CR を伴わない LF は `BareLineFeed`。
/// 入力が終了した場合、途中まで読んだ行は捨てる。
pub(crate) fn read_crlf_line<R: Read + ?Sized>(
    source: &mut R,
    max_line_size: usize,
) -> Result<LineEvent, Error> {
    let mut buf = Vec::new();
    loop {
        let Some(b) = read_byte(source)? else {
            return Ok(LineEvent::Eof);
        };
        match b {
            b'\r' => {
                match read_byte(source)? {
                    Some(b'\n') => {}
                    Some(found) => return Err(Error::ExpectedLineFeed { found }),
                    None => return Ok(LineEvent::Eof),
                }
                if buf.is_empty() {
                    return Ok(LineEvent::Blank);
                }
                let line = String::from_utf8(buf).map_err(|_| Error::InvalidUtf8)?;
                return Ok(LineEvent::Line(line));
            }
            b'\n' => return Err(Error::BareLineFeed),
            _ => {
                if buf.len() >= max_line_size {
                    return Err(Error::HeadLineTooLong {
                        size: buf.len() + 1,
                        limit: max_line_size,
                    });
                }
                buf.push(b);
            }
        }
    }
}

/// ヘッドリーダー
///
/// ```rust
/// use shiguredo_http11_reader::{HeadReader, HttpHead};
/// use std::io::Read;
///
/// let input = &b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody"[..];
/// let mut message = HeadReader::new().read_head(input).unwrap();
/// assert_eq!(message.head_lines().as_slice(), ["GET / HTTP/1.1", "Host: x"]);
///
/// let mut rest = String::new();
/// message.body_mut().read_to_string(&mut rest).unwrap();
/// assert_eq!(rest, "body");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeadReader {
    limits: ReaderLimits,
    allow_incomplete_head: bool,
}

impl HeadReader {
    /// 新しいヘッドリーダーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 制限付きでヘッドリーダーを作成
    pub fn with_limits(limits: ReaderLimits) -> Self {
        Self {
            limits,
            allow_incomplete_head: false,
        }
    }

    /// 空行の前に入力が終了した場合の扱いを設定
    ///
    /// true の場合、それまでに読んだ完全な行をそのまま返す。
    /// false (デフォルト) の場合は `Error::IncompleteHead` を返す。
    pub fn allow_incomplete_head(mut self, allow: bool) -> Self {
        self.allow_incomplete_head = allow;
        self
    }

    /// 制限設定を取得
    pub fn limits(&self) -> &ReaderLimits {
        &self.limits
    }

    /// ヘッドを読み取り、残りのストリームをボディとしたメッセージを返す
    pub fn read_head<R: Read>(&self, mut source: R) -> Result<Message<R>, Error> {
        let lines = self.read_lines(&mut source)?;
        Ok(Message::new(lines, source))
    }

    /// ヘッド行のみを読み取る
    ///
    /// 空行の直後で読み取りを止めるため、`source` の残りはボディになる。
    pub fn read_lines<R: Read + ?Sized>(&self, source: &mut R) -> Result<HeadLines, Error> {
        let mut lines = Vec::new();
        loop {
            match read_crlf_line(source, self.limits.max_head_line_size)? {
                LineEvent::Blank => {
                    tracing::trace!(lines = lines.len(), "head finished");
                    return Ok(HeadLines { lines });
                }
                LineEvent::Line(line) => {
                    if lines.len() >= self.limits.max_head_lines {
                        return Err(Error::TooManyHeadLines {
                            count: lines.len() + 1,
                            limit: self.limits.max_head_lines,
                        });
                    }
                    lines.push(line);
                }
                LineEvent::Eof if self.allow_incomplete_head => {
                    tracing::debug!(lines = lines.len(), "head ended without blank line");
                    return Ok(HeadLines { lines });
                }
                LineEvent::Eof => {
                    return Err(Error::IncompleteHead { lines: lines.len() });
                }
            }
        }
    }
}
