//! 工商银行开放平台电子券客户端核心库
//!
//! 提供完整的网关接入能力，包括：
//! - 请求签名（sha1WithRSAEncryption，字段字典序拼接）
//! - 网关用户数据解密（AES-128-CBC 双层编码）
//! - 第三方电子券发券与发券查询

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{ClientConfig, IcbcClient};
pub use error::{Error, Result};
pub use protocol::GatewayProtocol;
pub use types::*;
