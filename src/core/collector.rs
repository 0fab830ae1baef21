use crate::adapters::http::ApiClient;
use crate::core::path::get_path;
use crate::core::transform::{extract_data, transform_data};
use crate::domain::model::{
    ApiSpec, CollectMode, CollectSettings, FieldSpec, Pagination, Record,
};
use crate::utils::error::{HarvestError, Result};
use serde_json::{Map, Value};

/// 採集過程回調
#[derive(Default)]
pub struct CollectCallbacks<'a> {
    on_progress: Option<Box<dyn FnMut(usize, usize) + Send + 'a>>,
    on_page_data: Option<Box<dyn FnMut(&[Record]) + Send + 'a>>,
}

impl<'a> CollectCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次請求後回報 (目前次數, 累計筆數)
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, usize) + Send + 'a,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// 每頁轉換後的資料
    pub fn on_page_data<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[Record]) + Send + 'a,
    {
        self.on_page_data = Some(Box::new(f));
        self
    }
}

/// 分頁採集引擎：循環請求 API 直到任一終止條件成立
pub struct Collector {
    client: ApiClient,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            client: ApiClient::new(),
        }
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn collect(
        &self,
        api: &ApiSpec,
        export_fields: &[FieldSpec],
        input_params: &Map<String, Value>,
        settings: &CollectSettings,
        token: Option<&str>,
        callbacks: &mut CollectCallbacks<'_>,
    ) -> Result<Vec<Record>> {
        if settings.mode == CollectMode::Times {
            tracing::info!(
                "🚀 Starting collection: up to {} requests (~{} records)",
                settings.times,
                settings.times * api.estimate_per_page
            );
        } else {
            tracing::info!("🚀 Starting collection: until the API reports the end");
        }

        let mut all_data: Vec<Record> = Vec::new();
        // 游標分頁：本輪請求使用的游標
        let mut cursor_value = String::new();
        // 頁碼分頁：本輪請求使用的頁碼
        let mut page_number = match &api.pagination {
            Some(Pagination::Page { start_page, .. }) => *start_page,
            _ => 1,
        };
        // 上一輪請求用過的游標，重複游標偵測用
        let mut prev_cursor_value = String::new();
        let mut same_cursor_count = 0u32;
        let mut current_times = 0usize;

        loop {
            // 構建請求參數
            let mut params = input_params.clone();
            match &api.pagination {
                Some(Pagination::Page { param_name, .. }) => {
                    params.insert(param_name.clone(), Value::from(page_number));
                }
                Some(Pagination::Cursor { param_name, .. }) => {
                    // 游標模式永遠帶參數，第一次為空字串
                    params.insert(param_name.clone(), Value::String(cursor_value.clone()));
                }
                None => {}
            }
            apply_param_rules(api, &mut params);

            tracing::debug!("🔄 Request #{} params: {:?}", current_times + 1, params);
            let response = self
                .client
                .request(&api.url, api.method, &params, token)
                .await?;

            // 檢查業務狀態碼
            if response.get("code").and_then(Value::as_i64) != Some(200) {
                let message = response
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request failed")
                    .to_string();
                return Err(HarvestError::ApiError { message });
            }

            // 提取並轉換本頁資料
            let raw_items = extract_data(&response, api.data_path.as_deref());
            let items = transform_data(&raw_items, export_fields);

            current_times += 1;
            let page_count = items.len();
            all_data.extend(items);

            if let Some(on_progress) = callbacks.on_progress.as_mut() {
                on_progress(current_times, all_data.len());
            }
            if let Some(on_page_data) = callbacks.on_page_data.as_mut() {
                on_page_data(&all_data[all_data.len() - page_count..]);
            }

            // 頁碼分頁模式
            if let Some(Pagination::Page { .. }) = &api.pagination {
                if page_count == 0 {
                    tracing::info!("✅ Collection finished: empty page");
                    break;
                }
                if settings.mode == CollectMode::Times && current_times >= settings.times {
                    tracing::info!("✅ Collection finished: times limit ({})", current_times);
                    break;
                }
                page_number += 1;
                continue;
            }

            // 游標分頁模式（無分頁設定時游標恆為空，只會請求一次）
            if page_count == 0 {
                tracing::info!("✅ Collection finished: empty page");
                break;
            }

            let new_cursor_value = match &api.pagination {
                Some(Pagination::Cursor { response_path, .. }) => {
                    cursor_from_response(&response, response_path)
                }
                _ => String::new(),
            };

            let mut has_more = true;
            if let Some(Pagination::Cursor {
                has_more_path: Some(path),
                ..
            }) = &api.pagination
            {
                has_more = is_truthy_flag(get_path(&response, path));
            }

            // 兜底偵測：游標與上一輪請求用的游標連續相同，視為已到末尾
            if !new_cursor_value.is_empty() && new_cursor_value == prev_cursor_value {
                same_cursor_count += 1;
            } else {
                same_cursor_count = 0;
            }
            prev_cursor_value = std::mem::replace(&mut cursor_value, new_cursor_value);

            if !has_more {
                tracing::info!("✅ Collection finished: no more data");
                break;
            }
            if cursor_value.is_empty() {
                tracing::info!("✅ Collection finished: no pagination cursor");
                break;
            }
            if same_cursor_count >= 2 {
                tracing::info!("✅ Collection finished: cursor repeated, end reached");
                break;
            }
            if settings.mode == CollectMode::Times && current_times >= settings.times {
                tracing::info!("✅ Collection finished: times limit ({})", current_times);
                break;
            }
        }

        tracing::info!(
            "📥 Collected {} records in {} requests",
            all_data.len(),
            current_times
        );
        Ok(all_data)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

/// 參數送出前的最後修整：強制字串化與自訂掛鉤
fn apply_param_rules(api: &ApiSpec, params: &mut Map<String, Value>) {
    for name in &api.string_params {
        if let Some(value) = params.get(name) {
            if value.is_string() || value.is_null() {
                continue;
            }
            let rendered = match value {
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            params.insert(name.clone(), Value::String(rendered));
        }
    }

    if let Some(hook) = &api.transform_params {
        hook.call(params);
    }
}

/// 從回應取出下一頁游標，缺漏或空值一律視為空字串
fn cursor_from_response(response: &Value, response_path: &str) -> String {
    match get_path(response, response_path) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => String::new(),
    }
}

/// hasMore 旗標只認 true、1、"1"
fn is_truthy_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s == "1",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_from_response() {
        let response = json!({"data": {"last_buff": "abc"}});
        assert_eq!(cursor_from_response(&response, "data.last_buff"), "abc");
        assert_eq!(cursor_from_response(&response, "data.next"), "");
        assert_eq!(cursor_from_response(&response, ""), "");

        let numeric = json!({"next_cursor": 12345});
        assert_eq!(cursor_from_response(&numeric, "next_cursor"), "12345");
        let zero = json!({"next_cursor": 0});
        assert_eq!(cursor_from_response(&zero, "next_cursor"), "");
        let empty = json!({"next_cursor": ""});
        assert_eq!(cursor_from_response(&empty, "next_cursor"), "");
    }

    #[test]
    fn test_is_truthy_flag() {
        assert!(is_truthy_flag(Some(&json!(true))));
        assert!(is_truthy_flag(Some(&json!(1))));
        assert!(is_truthy_flag(Some(&json!("1"))));
        assert!(!is_truthy_flag(Some(&json!(false))));
        assert!(!is_truthy_flag(Some(&json!(0))));
        assert!(!is_truthy_flag(Some(&json!("true"))));
        assert!(!is_truthy_flag(Some(&json!(2))));
        assert!(!is_truthy_flag(None));
    }

    #[test]
    fn test_apply_param_rules_string_coercion() {
        let api = ApiSpec {
            url: "https://example.com".to_string(),
            method: Default::default(),
            params: vec![],
            data_path: None,
            pagination: None,
            estimate_per_page: 20,
            allow_collect_all: false,
            string_params: vec!["page".to_string(), "page_size".to_string()],
            transform_params: None,
        };
        let mut params = json!({"page": 3, "page_size": 50, "keyword": "x"})
            .as_object()
            .cloned()
            .unwrap();

        apply_param_rules(&api, &mut params);

        assert_eq!(params["page"], json!("3"));
        assert_eq!(params["page_size"], json!("50"));
        assert_eq!(params["keyword"], json!("x"));
    }

    #[test]
    fn test_apply_param_rules_hook_runs_after_coercion() {
        use crate::domain::model::ParamsHook;

        let api = ApiSpec {
            url: "https://example.com".to_string(),
            method: Default::default(),
            params: vec![],
            data_path: None,
            pagination: None,
            estimate_per_page: 20,
            allow_collect_all: false,
            string_params: vec!["page".to_string()],
            transform_params: Some(ParamsHook::new(|params| {
                let keep = params
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|t| !t.is_empty())
                    .unwrap_or(false);
                if !keep {
                    params.remove("tags");
                }
            })),
        };
        let mut params = json!({"page": 1, "tags": []}).as_object().cloned().unwrap();

        apply_param_rules(&api, &mut params);

        assert_eq!(params["page"], json!("1"));
        assert!(!params.contains_key("tags"));
    }
}
