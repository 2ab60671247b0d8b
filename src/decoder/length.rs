//! 長さ制限付きリーダー

use std::io::{self, Read};

use crate::source::ByteSource;

/// 宣言された長さでボディを打ち切るリーダー
///
/// 累計で `limit` バイトを返した後は、下位ストリームにデータが残っていても
/// 常に終端 (`Ok(0)`) を返す。`unbounded()` で作成した場合はそのまま委譲する。
///
/// 下位ストリームが `limit` より先に終端に達してもエラーにはしない。
/// 呼び出し側は `remaining()` で不足を検出できる。
#[derive(Debug)]
pub struct LengthLimitedReader<R> {
    inner: R,
    /// `None` は制限なし
    remaining: Option<u64>,
}

impl<R> LengthLimitedReader<R> {
    /// `limit` バイトで打ち切るリーダーを作成
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: Some(limit),
        }
    }

    /// 制限なしのリーダーを作成
    pub fn unbounded(inner: R) -> Self {
        Self {
            inner,
            remaining: None,
        }
    }

    /// 残りの許容バイト数 (制限なしの場合は `None`)
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// 宣言された長さをすべて返し終えたか確認
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
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

    fn consume(&mut self, n: u64) {
        if let Some(remaining) = &mut self.remaining {
            *remaining = remaining.saturating_sub(n);
        }
    }
}

impl<R: Read> Read for LengthLimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = match self.remaining {
            None => return self.inner.read(buf),
            Some(0) => return Ok(0),
            Some(remaining) => remaining.min(buf.len() as u64) as usize,
        };
        let n = self.inner.read(&mut buf[..max])?;
        self.consume(n as u64);
        Ok(n)
    }
}

impl<R: ByteSource> ByteSource for LengthLimitedReader<R> {
    fn available(&self) -> usize {
        let available = self.inner.available();
        match self.remaining {
            None => available,
            Some(remaining) => available.min(usize::try_from(remaining).unwrap_or(usize::MAX)),
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let capped = self.remaining.map_or(n, |remaining| remaining.min(n));
        if capped == 0 {
            return Ok(0);
        }
        let skipped = self.inner.skip(capped)?;
        self.consume(skipped);
        Ok(skipped)
    }
}
