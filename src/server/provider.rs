// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 语音呼叫服务商 (Voice call provider)
//!
//! 服务端只发起一次外呼, 不重试; 去重由冷却窗口负责。

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// 服务商拒绝 (号码无效等), 重试无意义
    #[error("provider rejected call (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// 网络错误 / 服务商内部错误
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// 外呼接口 (外部协作者)
pub trait VoiceCallProvider: Send + Sync {
    /// 拨打 `to` 并播报 `announcement`, 成功返回呼叫ID
    fn place_call(&self, to: &str, announcement: &str) -> Result<String, ProviderError>;
}

// ========== Twilio ==========

pub struct TwilioProvider {
    calls_url: String,
    authorization: String,
    from: String,
    agent: ureq::Agent,
}

impl TwilioProvider {
    pub fn new(api_base: &str, account_sid: &str, auth_token: &str, from: &str) -> Self {
        let calls_url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            api_base.trim_end_matches('/'),
            account_sid
        );
        let authorization = format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", account_sid, auth_token))
        );
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(15))
            .build();
        Self {
            calls_url,
            authorization,
            from: from.to_string(),
            agent,
        }
    }

    pub fn calls_url(&self) -> &str {
        &self.calls_url
    }
}

impl VoiceCallProvider for TwilioProvider {
    fn place_call(&self, to: &str, announcement: &str) -> Result<String, ProviderError> {
        let twiml = say_twiml(announcement);
        let response = self
            .agent
            .post(&self.calls_url)
            .set("Authorization", &self.authorization)
            .send_form(&[("To", to), ("From", &self.from), ("Twiml", &twiml)]);

        match response {
            Ok(resp) => {
                let body: Value = resp
                    .into_json()
                    .map_err(|e| ProviderError::Unavailable(format!("bad response body: {}", e)))?;
                Ok(body
                    .get("sid")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string())
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or(body);
                if (400..500).contains(&status) {
                    Err(ProviderError::Rejected { status, message })
                } else {
                    Err(ProviderError::Unavailable(format!("HTTP {}: {}", status, message)))
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(ProviderError::Unavailable(transport.to_string()))
            }
        }
    }
}

/// `<Response><Say>..</Say></Response>`
pub fn say_twiml(announcement: &str) -> String {
    format!("<Response><Say>{}</Say></Response>", escape_xml(announcement))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twiml() {
        assert_eq!(
            say_twiml("Fall Detected! Please check immediately."),
            "<Response><Say>Fall Detected! Please check immediately.</Say></Response>"
        );
        assert_eq!(say_twiml("a<b & c"), "<Response><Say>a&lt;b &amp; c</Say></Response>");
    }

    #[test]
    fn test_calls_url_and_auth() {
        let provider = TwilioProvider::new("https://api.twilio.com/", "AC123", "secret", "+15550000000");
        assert_eq!(
            provider.calls_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
        assert_eq!(provider.authorization, format!("Basic {}", STANDARD.encode("AC123:secret")));
    }

    #[test]
    fn test_unreachable_api_is_unavailable() {
        let provider = TwilioProvider::new("http://127.0.0.1:9", "AC123", "secret", "+15550000000");
        let result = provider.place_call("+15551234567", "test");
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }
}
