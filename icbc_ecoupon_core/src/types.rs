//! 数据类型定义

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 客户端凭证配置
#[derive(Debug, Clone)]
pub struct IcbcOptions {
    /// 工行 APP 编号
    pub app_id: String,
    /// 工行商户档案编号
    pub mert_id: String,
    /// 用户数据解密密钥（Base64）
    pub aes_key: String,
    /// 工行服务器公钥（PEM，可选，用于验签）
    pub icbc_public_key: Option<String>,
    /// 自己的私钥（PEM）
    pub private_key: String,
}

/// 已签名的请求报文
///
/// 字段名与网关约定一一对应，签名时按字典序拼接，
/// 传输时作为 form 表单编码。
#[derive(Debug, Clone, Serialize)]
pub struct SignedRequest {
    pub app_id: String,
    pub msg_id: String,
    pub timestamp: String,
    pub format: String,
    pub charset: String,
    pub sign_type: String,
    pub biz_content: String,
    pub sign: String,
}

/// 解密后的用户信息
#[derive(Debug, Clone)]
pub struct IcbcUser {
    /// 解密后原始数据
    pub origin: Value,
    /// 用户唯一标识
    pub cust_id: String,
    /// 手机号（数字会被转为字符串）
    pub phone: String,
    /// 是否为新用户（上游约定：原始字段 isNewUser 等于 "0" 时为新用户）
    pub is_new_user: bool,
    /// 手机设备号
    pub device_id: String,
}

impl IcbcUser {
    /// 从解密出的原始 JSON 归一化出用户信息
    pub fn from_value(origin: Value) -> Self {
        let cust_id = origin
            .get("cust_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let phone = match origin.get("phone") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let is_new_user = origin.get("isNewUser").and_then(Value::as_str) == Some("0");
        let device_id = origin
            .get("device_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            origin,
            cust_id,
            phone,
            is_new_user,
            device_id,
        }
    }
}

/// 电子券业务参数
///
/// user_id 与 user_mobile_no 二选一，未设置的一方不参与序列化。
#[derive(Debug, Clone, Serialize)]
pub struct EcouponParams {
    /// 商户档案编号
    pub mert_id: String,
    /// 电子券活动编号
    pub ec_act_id: String,
    /// 客户统一通行证号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 客户手机号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_mobile_no: Option<String>,
    /// 流水号
    pub ser_no: u64,
}

/// 发券/查询响应
///
/// 业务返回码原样透传，含义由调用方解释。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EcouponResult {
    /// 返回码，交易成功返回0，其余为错误码
    pub return_code: Option<String>,
    /// 返回码说明
    pub return_msg: Option<String>,
    /// 消息号
    pub msg_id: Option<String>,
    /// 返回值
    pub result: Option<String>,
    /// 错误编号
    pub error_code: Option<String>,
    /// 错误信息
    pub error_msg: Option<String>,
    /// 电子券编号
    pub ec_id: Option<String>,
    /// 活动编号
    pub act_id: Option<String>,
    /// 电子券活动名称
    pub ec_act_name: Option<String>,
    /// 电子券面额
    pub ec_face_value: Option<String>,
    /// 电子券状态
    pub ec_status: Option<String>,
    /// 电子券生效日期
    pub effect_begin_date: Option<String>,
    /// 电子券结束日期
    pub effect_end_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_normalization() {
        let user = IcbcUser::from_value(json!({
            "cust_id": "C001",
            "phone": 13800138000u64,
            "isNewUser": "0",
            "device_id": "D001",
            "extra": "kept",
        }));
        assert_eq!(user.cust_id, "C001");
        assert_eq!(user.phone, "13800138000");
        assert!(user.is_new_user);
        assert_eq!(user.device_id, "D001");
        assert_eq!(user.origin["extra"], "kept");
    }

    #[test]
    fn test_user_normalization_old_user() {
        let user = IcbcUser::from_value(json!({
            "cust_id": "C002",
            "phone": "13900139000",
            "isNewUser": "1",
            "device_id": "D002",
        }));
        assert_eq!(user.phone, "13900139000");
        assert!(!user.is_new_user);
    }

    #[test]
    fn test_user_normalization_missing_fields() {
        let user = IcbcUser::from_value(json!({}));
        assert_eq!(user.cust_id, "");
        assert_eq!(user.phone, "");
        assert!(!user.is_new_user);
        assert_eq!(user.device_id, "");
    }

    #[test]
    fn test_ecoupon_params_by_uid() {
        let params = EcouponParams {
            mert_id: "M1".to_string(),
            ec_act_id: "A1".to_string(),
            user_id: Some("U1".to_string()),
            user_mobile_no: None,
            ser_no: 1,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(
            json,
            r#"{"mert_id":"M1","ec_act_id":"A1","user_id":"U1","ser_no":1}"#
        );
    }

    #[test]
    fn test_ecoupon_params_by_mobile() {
        let params = EcouponParams {
            mert_id: "M1".to_string(),
            ec_act_id: "A1".to_string(),
            user_id: None,
            user_mobile_no: Some("13800138000".to_string()),
            ser_no: 2,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(
            json,
            r#"{"mert_id":"M1","ec_act_id":"A1","user_mobile_no":"13800138000","ser_no":2}"#
        );
    }

    #[test]
    fn test_ecoupon_result_partial() {
        let result: EcouponResult = serde_json::from_str(
            r#"{"return_code":"0","ec_id":"E123","unknown_field":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(result.return_code.as_deref(), Some("0"));
        assert_eq!(result.ec_id.as_deref(), Some("E123"));
        assert!(result.error_code.is_none());
    }
}
