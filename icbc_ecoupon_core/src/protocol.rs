//! 工行网关签名与加解密协议实现
//!
//! 协议流程：
//! 1. 签名：请求字段按字典序拼接为 `key=value&...`，前缀 `/api{path}?`，
//!    对拼接串做 sha1WithRSAEncryption 签名后 Base64 编码挂到 `sign` 字段
//! 2. 用户数据解密：AES-128-CBC（固定零 IV）→ Base64 → 单引号替换为双引号 → JSON
//!
//! 依赖库说明：
//! - rsa + sha1: 请求签名与验签（PKCS#1 v1.5）
//! - aes + cbc: 用户数据解密（PKCS#7 填充）

use crate::error::{Error, Result};
use crate::types::SignedRequest;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use std::collections::BTreeMap;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// 报文格式，固定 json
pub const FORMAT_JSON: &str = "json";
/// 报文字符集，固定 UTF-8
pub const CHARSET_UTF8: &str = "UTF-8";
/// 签名类型，固定 RSA
pub const SIGN_TYPE_RSA: &str = "RSA";

/// 网关约定的固定零 IV，非调用方可配置项
const ZERO_IV: [u8; 16] = [0u8; 16];

/// 网关签名协议
pub struct GatewayProtocol {
    signing_key: SigningKey<Sha1>,
    verifying_key: Option<VerifyingKey<Sha1>>,
    aes_key: Vec<u8>,
}

impl GatewayProtocol {
    /// 创建协议实例
    ///
    /// 私钥支持 PKCS#8 / PKCS#1 两种 PEM 格式。AES 密钥此处仅做 Base64 解码，
    /// 长度错误在解密时才会暴露。
    pub fn new(
        private_key_pem: &str,
        icbc_public_key_pem: Option<&str>,
        aes_key_base64: &str,
    ) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_key_pem))
            .map_err(|e| Error::Crypto(format!("Invalid private key: {}", e)))?;
        let signing_key = SigningKey::<Sha1>::new(private_key);

        let verifying_key = match icbc_public_key_pem {
            Some(pem) => {
                let public_key = RsaPublicKey::from_public_key_pem(pem)
                    .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
                    .map_err(|e| Error::Crypto(format!("Invalid ICBC public key: {}", e)))?;
                Some(VerifyingKey::<Sha1>::new(public_key))
            }
            None => None,
        };

        let aes_key = BASE64
            .decode(aes_key_base64)
            .map_err(|e| Error::Encoding(format!("Invalid AES key: {}", e)))?;

        Ok(Self {
            signing_key,
            verifying_key,
            aes_key,
        })
    }

    /// 构造并签名请求报文
    ///
    /// msg_id 与 timestamp 由调用方传入，同一组入参的签名结果可复现。
    pub fn sign_request(
        &self,
        path: &str,
        app_id: &str,
        biz_content: &str,
        msg_id: &str,
        timestamp: &str,
    ) -> Result<SignedRequest> {
        let mut fields = BTreeMap::new();
        fields.insert("app_id", app_id);
        fields.insert("msg_id", msg_id);
        fields.insert("timestamp", timestamp);
        fields.insert("format", FORMAT_JSON);
        fields.insert("charset", CHARSET_UTF8);
        fields.insert("sign_type", SIGN_TYPE_RSA);
        fields.insert("biz_content", biz_content);

        let canonical = canonical_sign_string(path, &fields);
        let signature = self
            .signing_key
            .try_sign(canonical.as_bytes())
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let sign = BASE64.encode(signature.to_bytes());

        Ok(SignedRequest {
            app_id: app_id.to_string(),
            msg_id: msg_id.to_string(),
            timestamp: timestamp.to_string(),
            format: FORMAT_JSON.to_string(),
            charset: CHARSET_UTF8.to_string(),
            sign_type: SIGN_TYPE_RSA.to_string(),
            biz_content: biz_content.to_string(),
            sign,
        })
    }

    /// 用工行公钥验签（Base64 签名）
    pub fn verify(&self, data: &[u8], sign: &str) -> Result<bool> {
        let key = self
            .verifying_key
            .as_ref()
            .ok_or_else(|| Error::InvalidState("ICBC public key not configured".to_string()))?;
        let sign_bytes = BASE64
            .decode(sign)
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let signature = Signature::try_from(sign_bytes.as_slice())
            .map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(key.verify(data, &signature).is_ok())
    }

    /// 解密网关下发的用户数据令牌
    ///
    /// 令牌经传输通道后 `+` 会变成空格，先还原再解码。
    /// 解出的明文本身又是一层 Base64，内层是单引号伪 JSON，
    /// 这是网关的实际线上格式，须原样处理。
    pub fn decrypt_user_token(&self, token: &str) -> Result<serde_json::Value> {
        let restored: String = token
            .chars()
            .map(|c| if c.is_whitespace() { '+' } else { c })
            .collect();
        let ciphertext = BASE64
            .decode(restored.as_bytes())
            .map_err(|e| Error::Encoding(e.to_string()))?;

        let decryptor = Aes128CbcDec::new_from_slices(&self.aes_key, &ZERO_IV)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let decoded = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        let inner = BASE64
            .decode(&decoded)
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let json_text = String::from_utf8(inner)
            .map_err(|e| Error::Encoding(e.to_string()))?
            .replace('\'', "\"");
        serde_json::from_str(&json_text).map_err(|e| Error::Parse(e.to_string()))
    }
}

/// 生成消息号：毫秒时间戳十六进制前缀 + 随机字母数字后缀
///
/// 仅用于请求去重，格式不构成对外契约。
pub fn gen_msg_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("{:x}{}", millis, suffix)
}

/// 当前本地时间，网关约定格式 `YYYY-MM-DD HH:MM:SS`
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 拼接待签名串
///
/// 字段按字典序以 `key=value` 拼接，`&` 分隔，前缀 `/api{path}?`。
/// 网关服务端按同样规则重算后验签，顺序与前缀逐字节对齐。
pub fn canonical_sign_string(path: &str, fields: &BTreeMap<&str, &str>) -> String {
    let joined = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("/api{}?{}", path, joined)
}
