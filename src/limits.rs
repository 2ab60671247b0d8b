/// リーダーの制限設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderLimits {
    /// 最大ヘッド行長 (デフォルト: 8KB)
    pub max_head_line_size: usize,
    /// 最大ヘッド行数 (デフォルト: 100)
    ///
    /// リクエストラインを含む。
    pub max_head_lines: usize,
    /// 最大ボディサイズ (デフォルト: 10MB)
    ///
    /// Content-Length の宣言値と、chunked のチャンクサイズの合計に適用する。
    pub max_body_size: u64,
    /// 最大チャンクサイズ行長 (デフォルト: 1KB)
    ///
    /// チャンクサイズ自体は "FFFFFFFF" でも 8 バイトだが、
    /// 引用符付きのチャンク拡張を受け付けるため余裕を持たせている。
    pub max_chunk_line_size: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_head_line_size: 8 * 1024, // 8KB
            max_head_lines: 100,
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_chunk_line_size: 1024, // 1KB
        }
    }
}

impl ReaderLimits {
    /// 制限なしの設定を作成
    pub fn unlimited() -> Self {
        Self {
            max_head_line_size: usize::MAX,
            max_head_lines: usize::MAX,
            max_body_size: u64::MAX,
            max_chunk_line_size: usize::MAX,
        }
    }
}
