//! 错误类型定义

use thiserror::Error;

/// 错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 密码学错误
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// 网络错误
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 状态错误（网关返回非 200）
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// 响应解析错误
    #[error("Parse error: {0}")]
    Parse(String),

    /// 编解码错误
    #[error("Encoding/Decoding error: {0}")]
    Encoding(String),

    /// 状态错误
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;
