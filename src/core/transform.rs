use crate::core::path::get_path;
use crate::domain::model::{js_truthy, FieldMapping, FieldSpec, Record};
use serde_json::Value;
use std::collections::HashMap;

/// 依欄位定義轉換單筆原始資料
pub fn transform_item(item: &Value, fields: &[FieldSpec]) -> Record {
    let mut data = HashMap::new();
    for field in fields {
        // source 為空代表值由轉換器生成，不從原始資料取值
        let value = field
            .source
            .as_deref()
            .and_then(|source| get_path(item, source));
        data.insert(field.key.clone(), field.transform.apply(value, item));
    }
    Record::new(data)
}

/// 批次轉換，輸入不是陣列時回傳空集合
pub fn transform_data(items: &Value, fields: &[FieldSpec]) -> Vec<Record> {
    match items.as_array() {
        Some(list) => list.iter().map(|item| transform_item(item, fields)).collect(),
        None => Vec::new(),
    }
}

/// 從回應中取出資料區塊
///
/// 未設定路徑時回傳整個回應；路徑指到的值缺漏或為空值時回傳空陣列。
pub fn extract_data(response: &Value, data_path: Option<&str>) -> Value {
    match data_path {
        None | Some("") => response.clone(),
        Some(path) => get_path(response, path)
            .filter(|v| js_truthy(v))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}

/// 由匯出欄位產生遷移對應 (key -> label)
pub fn generate_mapping(fields: &[FieldSpec]) -> FieldMapping {
    fields
        .iter()
        .map(|f| (f.key.clone(), f.label.clone()))
        .collect()
}
