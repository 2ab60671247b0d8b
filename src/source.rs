//! バイトソース
//!
//! ブロッキングな `std::io::Read` を下位ストリームとして扱う。
//! [`ByteSource`] は最適化用の `available()` と `skip()` を追加するトレイトで、
//! 正しさには影響しない。

use std::io::{self, Read};

/// ボディリーダーが下位ストリームに要求する操作
///
/// `available()` はブロックせずに読めることが分かっているバイト数を返す。
/// 分からない場合は 0 を返す。
pub trait ByteSource: Read {
    /// ブロックせずに読めることが分かっているバイト数
    fn available(&self) -> usize {
        0
    }

    /// 最大 `n` バイト読み飛ばす
    ///
    /// 実際に読み飛ばしたバイト数を返す。`n` より小さい場合は入力の終端に達している。
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; 512];
        let mut skipped = 0u64;
        while skipped < n {
            let want = (n - skipped).min(scratch.len() as u64) as usize;
            match self.read(&mut scratch[..want]) {
                Ok(0) => break,
                Ok(read) => skipped += read as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(skipped)
    }
}

impl ByteSource for &[u8] {
    fn available(&self) -> usize {
        self.len()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let len = n.min(self.len() as u64) as usize;
        *self = &self[len..];
        Ok(len as u64)
    }
}

impl<T: AsRef<[u8]>> ByteSource for io::Cursor<T> {
    fn available(&self) -> usize {
        let len = self.get_ref().as_ref().len() as u64;
        len.saturating_sub(self.position()) as usize
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let skipped = n.min(self.available() as u64);
        self.set_position(self.position() + skipped);
        Ok(skipped)
    }
}

impl<R: ByteSource> ByteSource for io::BufReader<R> {
    fn available(&self) -> usize {
        self.buffer()
            .len()
            .saturating_add(self.get_ref().available())
    }
}

impl ByteSource for std::net::TcpStream {}

impl ByteSource for io::Empty {}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }
}

/// 1 バイト読む
///
/// 終端に達した場合は `None` を返す。`Interrupted` は再試行する。
pub(crate) fn read_byte<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// 1 バイトの先読みができるリーダー
///
/// `peek()` は次のバイトを消費せずに返す。先読み済みのバイトがなければ
/// 下位ストリームから 1 バイト読む。`read_byte()` は先読み済みのバイトがあれば
/// それを返して先読みを解除し、なければ下位ストリームに委譲する。
///
/// 先読みで終端を観測した場合もそれを保持するため、
/// 連続した `peek()` が下位ストリームを再度読むことはない。
///
/// ```rust
/// use shiguredo_http11_reader::PeekableReader;
///
/// let mut reader = PeekableReader::new(&b"ab"[..]);
/// assert_eq!(reader.peek().unwrap(), Some(b'a'));
/// assert_eq!(reader.peek().unwrap(), Some(b'a'));
/// assert_eq!(reader.read_byte().unwrap(), Some(b'a'));
/// assert_eq!(reader.peek().unwrap(), Some(b'b'));
/// ```
#[derive(Debug)]
pub struct PeekableReader<R> {
    inner: R,
    /// `Some(None)` は先読みで終端を観測したことを表す
    peeked: Option<Option<u8>>,
}

impl<R: Read> PeekableReader<R> {
    /// 新しいリーダーを作成
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    /// 次のバイトを消費せずに返す
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        if let Some(peeked) = self.peeked {
            return Ok(peeked);
        }
        let next = read_byte(&mut self.inner)?;
        self.peeked = Some(next);
        Ok(next)
    }

    /// 次のバイトを消費して返す
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        match self.peeked.take() {
            Some(peeked) => Ok(peeked),
            None => read_byte(&mut self.inner),
        }
    }

    /// 先読み済みのバイトがあるか確認
    pub fn has_peeked(&self) -> bool {
        self.peeked.is_some()
    }

    /// 下位ストリームへの参照を取得
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// 下位ストリームへの可変参照を取得
    ///
    /// 先読み済みのバイトは下位ストリームからは既に読まれている。
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// 先読み済みのバイトと下位ストリームに分解する
    pub fn into_parts(self) -> (Option<u8>, R) {
        (self.peeked.flatten(), self.inner)
    }
}

impl<R: Read> Read for PeekableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.peeked.take() {
            Some(Some(byte)) => {
                buf[0] = byte;
                Ok(1)
            }
            Some(None) => Ok(0),
            None => self.inner.read(buf),
        }
    }
}

impl<R: ByteSource> ByteSource for PeekableReader<R> {
    fn available(&self) -> usize {
        let pending = usize::from(matches!(self.peeked, Some(Some(_))));
        self.inner.available().saturating_add(pending)
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        match self.peeked.take() {
            Some(Some(_)) => Ok(1 + self.inner.skip(n - 1)?),
            Some(None) => Ok(0),
            None => self.inner.skip(n),
        }
    }
}
