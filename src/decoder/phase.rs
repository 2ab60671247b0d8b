//! chunked デコード状態の定義

/// chunked デコード状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkedPhase {
    /// 最初のチャンクサイズ行待ち (前に CRLF はない)
    BeforeFirstChunk,
    /// チャンクサイズ行待ち
    ReadingSizeLine,
    /// チャンクデータ読み取り中
    ReadingChunkData { remaining: u64 },
    /// チャンクデータ後の CRLF 待ち
    AwaitingTrailingCrlf,
    /// 終端チャンクを処理済み
    Done,
}

/// チャンクサイズ行の走査状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SizeLineScan {
    /// 通常
    Normal,
    /// 引用符で囲まれた拡張値の中
    Quoted,
    /// 引用符の中で `\` の直後
    Escape,
}
