use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 轉換後的一筆輸出資料，key 為 FieldSpec.key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// 轉成 JSON 物件，供遷移引擎使用
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone().into_iter().collect())
    }
}

/// 表格欄位型別，未知字串一律解析為 Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    DateTime,
    Url,
    Checkbox,
    SingleSelect,
    MultiSelect,
    Phone,
    Email,
    Unknown,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::DateTime => "datetime",
            FieldType::Url => "url",
            FieldType::Checkbox => "checkbox",
            FieldType::SingleSelect => "singleSelect",
            FieldType::MultiSelect => "multiSelect",
            FieldType::Phone => "phone",
            FieldType::Email => "email",
            FieldType::Unknown => "unknown",
        }
    }

    pub fn from_str_lenient(s: &str) -> Self {
        match s {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "datetime" => FieldType::DateTime,
            "url" => FieldType::Url,
            "checkbox" => FieldType::Checkbox,
            "singleSelect" => FieldType::SingleSelect,
            "multiSelect" => FieldType::MultiSelect,
            "phone" => FieldType::Phone,
            "email" => FieldType::Email,
            _ => FieldType::Unknown,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldType::from_str_lenient(&raw))
    }
}

/// 內建具名轉換
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTransform {
    /// 秒級時間戳轉毫秒
    Timestamp,
    /// 秒數轉 MM:SS 或 HH:MM:SS
    Duration,
    /// 填入目前時間（毫秒）
    Now,
}

impl NamedTransform {
    pub fn apply(&self, value: Option<&Value>) -> Value {
        match self {
            NamedTransform::Timestamp => {
                let seconds = value.and_then(json_number).unwrap_or(0.0);
                if seconds == 0.0 {
                    return Value::from(0);
                }
                let ms = seconds * 1000.0;
                if ms.fract() == 0.0 && ms.abs() < 9_007_199_254_740_992.0 {
                    Value::from(ms as i64)
                } else {
                    Value::from(ms)
                }
            }
            NamedTransform::Duration => {
                let seconds = value.and_then(json_number).unwrap_or(0.0);
                if seconds <= 0.0 {
                    return Value::String("00:00".to_string());
                }
                let total = seconds as u64;
                let hours = total / 3600;
                let minutes = (total % 3600) / 60;
                let secs = total % 60;
                let formatted = if hours > 0 {
                    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
                } else {
                    format!("{:02}:{:02}", minutes, secs)
                };
                Value::String(formatted)
            }
            NamedTransform::Now => Value::from(chrono::Utc::now().timestamp_millis()),
        }
    }
}

/// 自訂轉換閉包，無法用設定檔表達，只能由程式註冊
#[derive(Clone)]
pub struct CustomTransform(Arc<dyn Fn(Option<&Value>, &Value) -> Value + Send + Sync>);

impl CustomTransform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: Option<&Value>, item: &Value) -> Value {
        (self.0)(value, item)
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTransform(..)")
    }
}

/// 欄位轉換，於設定載入時解析一次，採集時不再查字串
#[derive(Debug, Clone, Default)]
pub enum Transform {
    #[default]
    Identity,
    /// 空值時代入固定文字
    Default(String),
    Named(NamedTransform),
    Custom(CustomTransform),
}

impl Transform {
    /// 解析設定檔中的轉換字串，未知名稱回退為 Identity
    pub fn parse(spec: &str) -> Self {
        if spec.is_empty() {
            return Transform::Identity;
        }

        if let Some(rest) = spec.strip_prefix("default:") {
            // 只取第一與第二個冒號之間的文字
            let text = rest.split(':').next().unwrap_or("");
            return Transform::Default(text.to_string());
        }

        match spec {
            "timestamp" => Transform::Named(NamedTransform::Timestamp),
            "duration" => Transform::Named(NamedTransform::Duration),
            "now" => Transform::Named(NamedTransform::Now),
            other => {
                tracing::warn!("Unknown transform '{}', falling back to identity", other);
                Transform::Identity
            }
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Value + Send + Sync + 'static,
    {
        Transform::Custom(CustomTransform::new(f))
    }

    pub fn apply(&self, value: Option<&Value>, item: &Value) -> Value {
        match self {
            Transform::Identity => value.cloned().unwrap_or(Value::Null),
            Transform::Default(text) => match value {
                None | Some(Value::Null) => Value::String(text.clone()),
                Some(Value::String(s)) if s.is_empty() => Value::String(text.clone()),
                Some(v) => v.clone(),
            },
            Transform::Named(named) => named.apply(value),
            Transform::Custom(custom) => custom.call(value, item),
        }
    }

    /// 設定檔字串形式，Custom 一律顯示為 "custom"
    pub fn spec_string(&self) -> String {
        match self {
            Transform::Identity => String::new(),
            Transform::Default(text) => format!("default:{}", text),
            Transform::Named(NamedTransform::Timestamp) => "timestamp".to_string(),
            Transform::Named(NamedTransform::Duration) => "duration".to_string(),
            Transform::Named(NamedTransform::Now) => "now".to_string(),
            Transform::Custom(_) => "custom".to_string(),
        }
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.spec_string())
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Transform::parse(&raw))
    }
}

/// 匯出欄位定義：API 欄位如何落到表格欄位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// 來源路徑，支援 a.b.c 巢狀；省略表示值完全由轉換器生成
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub transform: Transform,
}

impl FieldSpec {
    pub fn new(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            source: None,
            transform: Transform::Identity,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// 遷移欄位對應：(來源 key, 目標欄位名稱)，順序即寫入順序
pub type FieldMapping = Vec<(String, String)>;

/// 送出請求前修改參數的掛鉤
#[derive(Clone)]
pub struct ParamsHook(Arc<dyn Fn(&mut serde_json::Map<String, Value>) + Send + Sync>);

impl ParamsHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut serde_json::Map<String, Value>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, params: &mut serde_json::Map<String, Value>) {
        (self.0)(params)
    }
}

impl fmt::Debug for ParamsHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamsHook(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分頁策略。設定檔以 type 欄位區分："page" 為頁碼模式，其餘為游標模式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PaginationSpec", into = "PaginationSpec")]
pub enum Pagination {
    Page {
        param_name: String,
        start_page: u64,
    },
    Cursor {
        param_name: String,
        /// 回應中下一個游標的路徑
        response_path: String,
        /// 回應中「還有更多」旗標的路徑，省略視為永遠還有
        has_more_path: Option<String>,
    },
}

impl Pagination {
    pub fn param_name(&self) -> &str {
        match self {
            Pagination::Page { param_name, .. } | Pagination::Cursor { param_name, .. } => {
                param_name
            }
        }
    }
}

/// 設定檔中的原始分頁區塊
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSpec {
    pub param_name: String,
    #[serde(rename = "type", default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub start_page: Option<u64>,
    #[serde(default)]
    pub response_path: Option<String>,
    #[serde(default)]
    pub has_more_path: Option<String>,
}

impl From<PaginationSpec> for Pagination {
    fn from(spec: PaginationSpec) -> Self {
        if spec.mode.as_deref() == Some("page") {
            Pagination::Page {
                param_name: spec.param_name,
                // 0 不是合法起始頁，視同未設定
                start_page: spec.start_page.filter(|p| *p != 0).unwrap_or(1),
            }
        } else {
            Pagination::Cursor {
                param_name: spec.param_name,
                response_path: spec.response_path.unwrap_or_default(),
                has_more_path: spec.has_more_path.filter(|p| !p.is_empty()),
            }
        }
    }
}

impl From<Pagination> for PaginationSpec {
    fn from(pagination: Pagination) -> Self {
        match pagination {
            Pagination::Page {
                param_name,
                start_page,
            } => PaginationSpec {
                param_name,
                mode: Some("page".to_string()),
                start_page: Some(start_page),
                response_path: None,
                has_more_path: None,
            },
            Pagination::Cursor {
                param_name,
                response_path,
                has_more_path,
            } => PaginationSpec {
                param_name,
                mode: None,
                start_page: None,
                response_path: Some(response_path),
                has_more_path,
            },
        }
    }
}

/// 一支 API 的採集描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSpec {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// 請求會帶上的參數名稱
    #[serde(default)]
    pub params: Vec<String>,
    /// 回應中資料陣列的路徑，省略時取整個回應
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    /// 每頁預估筆數，僅用於進度估算
    #[serde(default = "default_estimate_per_page")]
    pub estimate_per_page: usize,
    /// 是否允許「採集全部」模式
    #[serde(default)]
    pub allow_collect_all: bool,
    /// 這些參數送出前強制轉為字串
    #[serde(default)]
    pub string_params: Vec<String>,
    #[serde(skip)]
    pub transform_params: Option<ParamsHook>,
}

fn default_estimate_per_page() -> usize {
    20
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectMode {
    /// 採集固定次數
    Times,
    /// 採集到 API 表示沒有更多為止
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollectSettings {
    pub mode: CollectMode,
    pub times: usize,
}

impl CollectSettings {
    pub fn times(n: usize) -> Self {
        Self {
            mode: CollectMode::Times,
            times: n,
        }
    }

    pub fn all() -> Self {
        Self {
            mode: CollectMode::All,
            times: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// 一筆記錄的儲存格集合，key 為欄位 id
pub type CellFields = serde_json::Map<String, Value>;

/// 遷移結果統計
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub success: bool,
    pub total: usize,
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub table_name: Option<String>,
}

impl MigrationResult {
    pub fn new(total: usize) -> Self {
        Self {
            success: false,
            total,
            inserted: 0,
            failed: 0,
            errors: Vec::new(),
            table_name: None,
        }
    }
}

/// JS Number() 式的寬鬆數值解析
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(true) => Some(1.0),
        Value::Bool(false) => Some(0.0),
        _ => None,
    }
}

/// JS Boolean() 式的真值判斷
pub(crate) fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_named_transforms() {
        assert!(matches!(
            Transform::parse("timestamp"),
            Transform::Named(NamedTransform::Timestamp)
        ));
        assert!(matches!(
            Transform::parse("duration"),
            Transform::Named(NamedTransform::Duration)
        ));
        assert!(matches!(
            Transform::parse("now"),
            Transform::Named(NamedTransform::Now)
        ));
    }

    #[test]
    fn test_parse_default_transform() {
        match Transform::parse("default:無標題") {
            Transform::Default(text) => assert_eq!(text, "無標題"),
            other => panic!("expected Default, got {:?}", other),
        }

        // 只取第一與第二個冒號之間的文字
        match Transform::parse("default:a:b") {
            Transform::Default(text) => assert_eq!(text, "a"),
            other => panic!("expected Default, got {:?}", other),
        }

        match Transform::parse("default:") {
            Transform::Default(text) => assert_eq!(text, ""),
            other => panic!("expected Default, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_transform_is_identity() {
        assert!(matches!(Transform::parse("upercase"), Transform::Identity));
        assert!(matches!(Transform::parse(""), Transform::Identity));
    }

    #[test]
    fn test_timestamp_transform() {
        let t = Transform::parse("timestamp");
        assert_eq!(t.apply(Some(&json!(1700000000)), &json!({})), json!(1700000000000i64));
        assert_eq!(t.apply(Some(&json!("1700000000")), &json!({})), json!(1700000000000i64));
        assert_eq!(t.apply(Some(&json!(0)), &json!({})), json!(0));
        assert_eq!(t.apply(Some(&json!(null)), &json!({})), json!(0));
        assert_eq!(t.apply(None, &json!({})), json!(0));
        assert_eq!(t.apply(Some(&json!("not-a-number")), &json!({})), json!(0));
    }

    #[test]
    fn test_duration_transform() {
        let t = Transform::parse("duration");
        assert_eq!(t.apply(Some(&json!(0)), &json!({})), json!("00:00"));
        assert_eq!(t.apply(Some(&json!(-5)), &json!({})), json!("00:00"));
        assert_eq!(t.apply(None, &json!({})), json!("00:00"));
        assert_eq!(t.apply(Some(&json!(59)), &json!({})), json!("00:59"));
        assert_eq!(t.apply(Some(&json!(65)), &json!({})), json!("01:05"));
        assert_eq!(t.apply(Some(&json!(3599)), &json!({})), json!("59:59"));
        assert_eq!(t.apply(Some(&json!(3600)), &json!({})), json!("01:00:00"));
        assert_eq!(t.apply(Some(&json!(3661)), &json!({})), json!("01:01:01"));
    }

    #[test]
    fn test_default_transform_substitution() {
        let t = Transform::parse("default:未知作者");
        assert_eq!(t.apply(None, &json!({})), json!("未知作者"));
        assert_eq!(t.apply(Some(&json!(null)), &json!({})), json!("未知作者"));
        assert_eq!(t.apply(Some(&json!("")), &json!({})), json!("未知作者"));
        assert_eq!(t.apply(Some(&json!("張三")), &json!({})), json!("張三"));
        assert_eq!(t.apply(Some(&json!(0)), &json!({})), json!(0));
    }

    #[test]
    fn test_now_transform_is_current_millis() {
        let before = chrono::Utc::now().timestamp_millis();
        let value = Transform::parse("now").apply(None, &json!({}));
        let after = chrono::Utc::now().timestamp_millis();
        let millis = value.as_i64().unwrap();
        assert!(millis >= before && millis <= after);
    }

    #[test]
    fn test_custom_transform_sees_whole_item() {
        let t = Transform::custom(|value, item| {
            let id = item.get("id").and_then(|v| v.as_i64()).unwrap_or(0);
            json!(format!("{}#{}", value.and_then(|v| v.as_str()).unwrap_or(""), id))
        });
        let item = json!({"id": 7, "name": "x"});
        assert_eq!(t.apply(Some(&json!("x")), &item), json!("x#7"));
    }

    #[test]
    fn test_pagination_spec_page_mode() {
        let spec: PaginationSpec = toml::from_str(
            r#"
            type = "page"
            param_name = "page"
            start_page = 3
            "#,
        )
        .unwrap();
        match Pagination::from(spec) {
            Pagination::Page {
                param_name,
                start_page,
            } => {
                assert_eq!(param_name, "page");
                assert_eq!(start_page, 3);
            }
            other => panic!("expected page mode, got {:?}", other),
        }
    }

    #[test]
    fn test_pagination_spec_cursor_mode_defaults() {
        let spec: PaginationSpec = toml::from_str(
            r#"
            param_name = "cursor"
            response_path = "data.last_buff"
            has_more_path = ""
            "#,
        )
        .unwrap();
        match Pagination::from(spec) {
            Pagination::Cursor {
                param_name,
                response_path,
                has_more_path,
            } => {
                assert_eq!(param_name, "cursor");
                assert_eq!(response_path, "data.last_buff");
                // 空字串視為未設定
                assert_eq!(has_more_path, None);
            }
            other => panic!("expected cursor mode, got {:?}", other),
        }
    }

    #[test]
    fn test_field_type_lenient_parse() {
        assert_eq!(FieldType::from_str_lenient("text"), FieldType::Text);
        assert_eq!(FieldType::from_str_lenient("singleSelect"), FieldType::SingleSelect);
        assert_eq!(FieldType::from_str_lenient("formula"), FieldType::Unknown);
    }

    #[test]
    fn test_json_number() {
        assert_eq!(json_number(&json!(12.5)), Some(12.5));
        assert_eq!(json_number(&json!("42")), Some(42.0));
        assert_eq!(json_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(json_number(&json!("abc")), None);
        assert_eq!(json_number(&json!([1])), None);
    }

    #[test]
    fn test_js_truthy() {
        assert!(!js_truthy(&json!(null)));
        assert!(!js_truthy(&json!(0)));
        assert!(!js_truthy(&json!("")));
        assert!(js_truthy(&json!("false")));
        assert!(js_truthy(&json!(1)));
        assert!(js_truthy(&json!([])));
        assert!(js_truthy(&json!({})));
    }
}
