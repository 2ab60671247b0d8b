use std::fmt;
use std::io;

/// エラーの分類
///
/// レスポンスを組み立てる側が 4xx 系のどのレスポンスを返すか判断するために使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 行の区切りが不正
    Framing,
    /// リクエストラインやボディ関連ヘッダーの文法エラー
    Grammar,
    /// トークンのインデックスが範囲外
    Bounds,
    /// chunked 転送コーディングのエラー
    ChunkCoding,
    /// 制限超過
    Limit,
    /// 下位ストリームの I/O エラー
    Io,
}

/// HTTP 読み取りエラー
#[derive(Debug)]
pub enum Error {
    /// 下位ストリームの I/O エラー
    Io(io::Error),
    /// CR の直後が LF ではない
    ExpectedLineFeed { found: u8 },
    /// CR を伴わない LF
    BareLineFeed,
    /// 空行に到達する前に入力が終了した
    IncompleteHead { lines: usize },
    /// ヘッド行が UTF-8 ではない
    InvalidUtf8,
    /// ヘッド行が長すぎる
    HeadLineTooLong { size: usize, limit: usize },
    /// ヘッド行数超過
    TooManyHeadLines { count: usize, limit: usize },
    /// ボディサイズ超過
    BodyTooLarge { size: u64, limit: u64 },
    /// リクエストラインがない
    MissingRequestLine,
    /// リクエストラインが文法に一致しない
    InvalidRequestLine(String),
    /// `name: value` 形式ではないヘッダー行
    InvalidHeaderLine(String),
    /// 不正な Content-Length
    InvalidContentLength(String),
    /// chunked 以外の転送コーディング
    UnsupportedTransferCoding(String),
    /// Transfer-Encoding と Content-Length が両方ある
    ConflictingFraming,
    /// トークンのインデックスが 1..=3 の範囲外
    TokenIndexOutOfRange(usize),
    /// チャンクサイズが 16 進数ではない
    InvalidChunkSize(String),
    /// チャンクサイズ行の改行が CRLF ではない
    InvalidChunkLineEnding { found: u8 },
    /// チャンクデータの後に CRLF がない
    InvalidChunkDataEnding { found: u8 },
    /// チャンクサイズ行が長すぎる
    ChunkLineTooLong { size: usize, limit: usize },
    /// 終端チャンクの前に入力が終了した
    TruncatedChunkedBody,
}

impl Error {
    /// エラーの分類を取得
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Io(_) => ErrorCategory::Io,
            Error::ExpectedLineFeed { .. }
            | Error::BareLineFeed
            | Error::IncompleteHead { .. }
            | Error::InvalidUtf8 => ErrorCategory::Framing,
            Error::MissingRequestLine
            | Error::InvalidRequestLine(_)
            | Error::InvalidHeaderLine(_)
            | Error::InvalidContentLength(_)
            | Error::UnsupportedTransferCoding(_)
            | Error::ConflictingFraming => ErrorCategory::Grammar,
            Error::TokenIndexOutOfRange(_) => ErrorCategory::Bounds,
            Error::InvalidChunkSize(_)
            | Error::InvalidChunkLineEnding { .. }
            | Error::InvalidChunkDataEnding { .. }
            | Error::TruncatedChunkedBody => ErrorCategory::ChunkCoding,
            Error::HeadLineTooLong { .. }
            | Error::TooManyHeadLines { .. }
            | Error::BodyTooLarge { .. }
            | Error::ChunkLineTooLong { .. } => ErrorCategory::Limit,
        }
    }

    /// クライアントの送ったデータが原因のエラーか確認
    ///
    /// true の場合、呼び出し側は 4xx 系のレスポンスに変換する。
    /// インデックス範囲外は呼び出し側のバグなので false を返す。
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Io | ErrorCategory::Bounds
        )
    }

    /// `io::Error` から復元する
    ///
    /// `Read` 実装は `Error` を `io::Error` に包んで返すため、
    /// 包まれている場合は取り出し、そうでなければ `Error::Io` にする。
    pub fn from_io(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(e);
        }
        let kind = e.kind();
        match e.into_inner() {
            Some(inner) => match inner.downcast::<Error>() {
                Ok(error) => *error,
                Err(inner) => Error::Io(io::Error::new(kind, inner)),
            },
            None => Error::Io(io::Error::from(kind)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ExpectedLineFeed { found } => {
                write!(f, "expected LF after CR, found 0x{:02X}", found)
            }
            Error::BareLineFeed => write!(f, "bare LF without CR"),
            Error::IncompleteHead { lines } => {
                write!(f, "incomplete head: input ended after {} lines", lines)
            }
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 in head line"),
            Error::HeadLineTooLong { size, limit } => {
                write!(f, "head line too long: {} > {}", size, limit)
            }
            Error::TooManyHeadLines { count, limit } => {
                write!(f, "too many head lines: {} > {}", count, limit)
            }
            Error::BodyTooLarge { size, limit } => {
                write!(f, "body too large: {} > {}", size, limit)
            }
            Error::MissingRequestLine => write!(f, "missing request line"),
            Error::InvalidRequestLine(line) => write!(f, "invalid request line: {}", line),
            Error::InvalidHeaderLine(line) => write!(f, "invalid header line: {}", line),
            Error::InvalidContentLength(value) => {
                write!(f, "invalid Content-Length: {}", value)
            }
            Error::UnsupportedTransferCoding(value) => {
                write!(f, "unsupported Transfer-Encoding: {}", value)
            }
            Error::ConflictingFraming => {
                write!(f, "invalid message: both Transfer-Encoding and Content-Length")
            }
            Error::TokenIndexOutOfRange(index) => {
                write!(f, "request line token index out of range: {} (1..=3)", index)
            }
            Error::InvalidChunkSize(size) => write!(f, "invalid chunk size: {}", size),
            Error::InvalidChunkLineEnding { found } => write!(
                f,
                "invalid chunked encoding: chunk size line not terminated by CRLF (0x{:02X})",
                found
            ),
            Error::InvalidChunkDataEnding { found } => write!(
                f,
                "invalid chunked encoding: expected CRLF after chunk data, found 0x{:02X}",
                found
            ),
            Error::ChunkLineTooLong { size, limit } => {
                write!(f, "chunk line too long: {} > {}", size, limit)
            }
            Error::TruncatedChunkedBody => {
                write!(f, "truncated chunked body: input ended before last chunk")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::from_io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::TruncatedChunkedBody | Error::IncompleteHead { .. } => {
                io::ErrorKind::UnexpectedEof
            }
            _ => io::ErrorKind::InvalidData,
        };
        match e {
            Error::Io(inner) => inner,
            other => io::Error::new(kind, other),
        }
    }
}
