//! 工行电子券网关客户端

use crate::error::{Error, Result};
use crate::protocol::{self, GatewayProtocol};
use crate::types::{EcouponParams, EcouponResult, IcbcOptions, IcbcUser, SignedRequest};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// 发券接口路径
const SEND_ECOUPON_PATH: &str = "/ecoupon/send/V1";
/// 发券查询接口路径
const QUERY_ECOUPON_PATH: &str = "/ecoupon/send/query/V1";

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 网关地址
    pub gateway_url: String,
    /// 请求超时（毫秒），超时即失败，不重试
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://gw.open.icbc.com.cn".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// 电子券网关客户端
///
/// 构造后不再持有可变状态，可在多个任务间并发使用。
pub struct IcbcClient {
    config: ClientConfig,
    http_client: Client,
    protocol: GatewayProtocol,
    app_id: String,
    mert_id: String,
}

impl IcbcClient {
    /// 使用默认配置创建客户端
    pub fn new(options: IcbcOptions) -> Result<Self> {
        Self::with_config(options, ClientConfig::default())
    }

    /// 创建新的客户端实例
    pub fn with_config(options: IcbcOptions, config: ClientConfig) -> Result<Self> {
        let protocol = GatewayProtocol::new(
            &options.private_key,
            options.icbc_public_key.as_deref(),
            &options.aes_key,
        )?;

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            protocol,
            app_id: options.app_id,
            mert_id: options.mert_id,
        })
    }

    /// 构造并签名请求报文
    ///
    /// 业务参数序列化为 JSON 串挂到 biz_content，消息号与时间戳现场生成。
    pub fn sign_request<T: Serialize>(&self, path: &str, biz: &T) -> Result<SignedRequest> {
        let biz_content = serde_json::to_string(biz).map_err(|e| Error::Parse(e.to_string()))?;
        let msg_id = protocol::gen_msg_id();
        let timestamp = protocol::now_timestamp();
        debug!("Signing request for {} (msg_id={})", path, msg_id);
        self.protocol
            .sign_request(path, &self.app_id, &biz_content, &msg_id, &timestamp)
    }

    /// 发起一次网关调用
    ///
    /// 非 200 状态直接按传输失败返回，不解析响应体。
    /// 响应含 response_biz_content 时只返回该业务内容，外层信封是传输 plumbing。
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&SignedRequest>,
    ) -> Result<Value> {
        let url = format!("{}/api{}", self.config.gateway_url, path);
        let mut builder = self.http_client.request(method, &url);
        if let Some(body) = body {
            builder = builder.form(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("Request to {} timed out", url))
            } else {
                Error::Network(format!("Failed to connect to {}: {}", url, e))
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let json: Value = serde_json::from_str(&text).map_err(|e| Error::Parse(e.to_string()))?;
        debug!("Gateway response for {} ({} bytes)", path, text.len());

        if let Some(biz) = json.get("response_biz_content") {
            return Ok(biz.clone());
        }
        Ok(json)
    }

    /// 解密网关下发的用户数据令牌
    ///
    /// 令牌畸形属于预期内情况（被篡改或通道损坏），返回 None 而不是错误，
    /// 诊断信息走日志，不输出令牌内容。
    pub fn get_user_info(&self, data: &str) -> Option<IcbcUser> {
        match self.protocol.decrypt_user_token(data) {
            Ok(value) => Some(IcbcUser::from_value(value)),
            Err(e) => {
                warn!("Failed to decrypt user token ({} bytes): {}", data.len(), e);
                None
            }
        }
    }

    /// 用工行公钥验签
    pub fn verify_sign(&self, data: &[u8], sign: &str) -> Result<bool> {
        self.protocol.verify(data, sign)
    }

    async fn send_ecoupon(&self, params: EcouponParams) -> Result<EcouponResult> {
        let signed = self.sign_request(SEND_ECOUPON_PATH, &params)?;
        let value = self
            .request(Method::POST, SEND_ECOUPON_PATH, Some(&signed))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::Parse(e.to_string()))
    }

    async fn query_ecoupon(&self, params: EcouponParams) -> Result<EcouponResult> {
        let signed = self.sign_request(QUERY_ECOUPON_PATH, &params)?;
        let value = self
            .request(Method::POST, QUERY_ECOUPON_PATH, Some(&signed))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::Parse(e.to_string()))
    }

    /// 通过 UID 第三方电子券发券
    ///
    /// act_id 为电子券活动编号，ser_no 为流水号，uid 为客户统一通行证号。
    pub async fn send_ecoupon_by_uid(
        &self,
        act_id: &str,
        ser_no: u64,
        uid: &str,
    ) -> Result<EcouponResult> {
        info!("Sending ecoupon for activity {} by uid", act_id);
        self.send_ecoupon(EcouponParams {
            mert_id: self.mert_id.clone(),
            ec_act_id: act_id.to_string(),
            user_id: Some(uid.to_string()),
            user_mobile_no: None,
            ser_no,
        })
        .await
    }

    /// 通过手机号第三方电子券发券
    pub async fn send_ecoupon_by_mobile(
        &self,
        act_id: &str,
        ser_no: u64,
        phone: &str,
    ) -> Result<EcouponResult> {
        info!("Sending ecoupon for activity {} by mobile", act_id);
        self.send_ecoupon(EcouponParams {
            mert_id: self.mert_id.clone(),
            ec_act_id: act_id.to_string(),
            user_id: None,
            user_mobile_no: Some(phone.to_string()),
            ser_no,
        })
        .await
    }

    /// 通过 UID 发券查询
    pub async fn query_ecoupon_by_uid(
        &self,
        act_id: &str,
        ser_no: u64,
        uid: &str,
    ) -> Result<EcouponResult> {
        info!("Querying ecoupon for activity {} by uid", act_id);
        self.query_ecoupon(EcouponParams {
            mert_id: self.mert_id.clone(),
            ec_act_id: act_id.to_string(),
            user_id: Some(uid.to_string()),
            user_mobile_no: None,
            ser_no,
        })
        .await
    }

    /// 通过手机号发券查询
    pub async fn query_ecoupon_by_mobile(
        &self,
        act_id: &str,
        ser_no: u64,
        phone: &str,
    ) -> Result<EcouponResult> {
        info!("Querying ecoupon for activity {} by mobile", act_id);
        self.query_ecoupon(EcouponParams {
            mert_id: self.mert_id.clone(),
            ec_act_id: act_id.to_string(),
            user_id: None,
            user_mobile_no: Some(phone.to_string()),
            ser_no,
        })
        .await
    }
}
