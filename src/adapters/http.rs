use crate::domain::model::HttpMethod;
use crate::utils::error::{HarvestError, Result};
use serde_json::{Map, Value};

/// API 請求轉接器，共用一個連線池
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// 發送請求並解析 JSON 回應
    ///
    /// GET 把參數放進 query string，POST 把整份參數作為 JSON body。
    /// 回應狀態非 2xx 時直接視為錯誤，不解析內容。
    pub async fn request(
        &self,
        url: &str,
        method: HttpMethod,
        params: &Map<String, Value>,
        token: Option<&str>,
    ) -> Result<Value> {
        tracing::debug!("📡 {} {}", method.as_str(), url);

        let mut request = match method {
            HttpMethod::Get => self.client.get(url).query(&query_pairs(params)),
            HttpMethod::Post => self.client.post(url).json(params),
        };

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatusError {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// 產生 query 參數：只過濾 null，空字串保留（部分 API 需要空的游標參數）
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), render_query_value(value)))
        .collect()
}

fn render_query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_query_value)
            .collect::<Vec<_>>()
            .join(","),
        // 物件以緊湊 JSON 表示
        other => other.to_string(),
    }
}
