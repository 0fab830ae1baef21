use crate::domain::model::{
    js_truthy, json_number, CellFields, FieldMapping, FieldMeta, FieldSpec, FieldType,
    MigrationResult,
};
use crate::domain::ports::TableStore;
use crate::utils::error::Result;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// 每批寫入的記錄數
const BATCH_SIZE: usize = 100;

/// 批次遷移引擎，透過 TableStore 寫入目標表格
pub struct MigrationEngine<S: TableStore> {
    store: S,
}

#[derive(Default)]
struct BatchOutcome {
    inserted: usize,
    failed: usize,
    errors: Vec<String>,
}

impl<S: TableStore> MigrationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 把 JSON 記錄寫入既有表格
    ///
    /// 找不到表或映射欄位缺漏時整批中止、不寫入任何資料；
    /// 單筆轉換或寫入失敗只計入 failed，不會中止整個流程。
    pub async fn migrate(
        &self,
        records: &[Value],
        mapping: &FieldMapping,
        table_name: &str,
    ) -> MigrationResult {
        tracing::info!(
            "💾 Migrating {} records into table '{}'",
            records.len(),
            table_name
        );

        let mut result = MigrationResult::new(records.len());
        if let Err(e) = self
            .run_migration(records, mapping, table_name, &mut result)
            .await
        {
            result.errors.push(format!("migration failed: {}", e));
        }

        if result.success {
            tracing::info!("✅ Migration finished: {} records inserted", result.inserted);
        } else {
            tracing::error!(
                "❌ Migration finished with problems: {} inserted, {} failed, {} errors",
                result.inserted,
                result.failed,
                result.errors.len()
            );
        }
        result
    }

    async fn run_migration(
        &self,
        records: &[Value],
        mapping: &FieldMapping,
        table_name: &str,
        result: &mut MigrationResult,
    ) -> Result<()> {
        // 1. 取得目標表
        let table = match self.store.table_by_name(table_name).await {
            Ok(Some(table)) => table,
            Ok(None) => {
                result.errors.push(format!("table '{}' not found", table_name));
                return Ok(());
            }
            Err(e) => {
                tracing::error!("❌ Failed to look up table: {}", e);
                result.errors.push(format!("table '{}' not found", table_name));
                return Ok(());
            }
        };

        // 2. 欄位名稱 → 欄位資訊
        let field_map = self.build_field_map(&table.id).await?;

        // 3. 驗證映射欄位齊全，缺欄位時不寫入任何資料
        let missing = validate_mapping(mapping, &field_map);
        if !missing.is_empty() {
            result
                .errors
                .push(format!("fields missing from table: {}", missing.join(", ")));
            return Ok(());
        }

        // 4. 分批寫入
        for chunk in records.chunks(BATCH_SIZE) {
            let outcome = self
                .insert_batch(&table.id, chunk, mapping, &field_map)
                .await;
            result.inserted += outcome.inserted;
            result.failed += outcome.failed;
            result.errors.extend(outcome.errors);
        }

        result.success = result.failed == 0;
        Ok(())
    }

    async fn build_field_map(&self, table_id: &str) -> Result<HashMap<String, FieldMeta>> {
        let mut field_map = HashMap::new();
        for field in self.store.field_list(table_id).await? {
            field_map.insert(field.name.clone(), field);
        }
        Ok(field_map)
    }

    async fn insert_batch(
        &self,
        table_id: &str,
        chunk: &[Value],
        mapping: &FieldMapping,
        field_map: &HashMap<String, FieldMeta>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        let mut cells: Vec<CellFields> = Vec::new();
        for (index, item) in chunk.iter().enumerate() {
            match item.as_object() {
                Some(obj) => cells.push(transform_record(obj, mapping, field_map)),
                None => {
                    outcome.failed += 1;
                    outcome.errors.push(format!(
                        "record {} failed to convert: not a JSON object",
                        index + 1
                    ));
                }
            }
        }

        if !cells.is_empty() {
            match self.store.add_records(table_id, &cells).await {
                Ok(_) => outcome.inserted += cells.len(),
                Err(e) => {
                    // 批次失敗改逐筆寫入
                    tracing::warn!("Batch insert failed, retrying record by record: {}", e);
                    for fields in &cells {
                        match self.store.add_record(table_id, fields).await {
                            Ok(_) => outcome.inserted += 1,
                            Err(single) => {
                                outcome.failed += 1;
                                outcome
                                    .errors
                                    .push(format!("failed to insert record: {}", single));
                            }
                        }
                    }
                }
            }
        }

        outcome
    }

    /// 建表並依匯出欄位加欄位
    ///
    /// 主機建表時會自動附帶一個預設文字欄位且無法刪除，
    /// 因此第一個欄位用改名代替，型別維持文字。
    pub async fn create_table(&self, table_name: &str, fields: &[FieldSpec]) -> Result<String> {
        let table = self.store.create_table(table_name).await?;
        let existing = self.store.field_list(&table.id).await?;
        let default_field = existing.first().cloned();

        for (index, field) in fields.iter().enumerate() {
            match (index, &default_field) {
                (0, Some(default)) => {
                    self.store
                        .rename_field(&table.id, &default.id, &field.label)
                        .await?;
                }
                _ => {
                    self.store
                        .add_field(&table.id, &field.label, table_field_type(field.field_type))
                        .await?;
                }
            }
        }

        tracing::info!("📋 Created table '{}' with {} fields", table_name, fields.len());
        Ok(table.id)
    }

    /// 產生不與現有表重複的表名：base、base1、base2…
    pub async fn generate_unique_table_name(&self, base_name: &str) -> Result<String> {
        let tables = self.store.list_tables().await?;
        let existing: HashSet<String> = tables.into_iter().map(|t| t.name).collect();

        if !existing.contains(base_name) {
            return Ok(base_name.to_string());
        }

        let mut counter = 1u32;
        loop {
            let candidate = format!("{}{}", base_name, counter);
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// 完整流程：取唯一表名 → 建表 → 寫入
    pub async fn create_table_and_migrate(
        &self,
        table_name: &str,
        records: &[Value],
        mapping: &FieldMapping,
        fields: &[FieldSpec],
    ) -> MigrationResult {
        let mut result = MigrationResult::new(records.len());

        let unique_name = match self.generate_unique_table_name(table_name).await {
            Ok(name) => name,
            Err(e) => {
                result
                    .errors
                    .push(format!("failed to create table and migrate: {}", e));
                return result;
            }
        };
        result.table_name = Some(unique_name.clone());

        if let Err(e) = self.create_table(&unique_name, fields).await {
            result.errors.push(format!("failed to create table: {}", e));
            return result;
        }

        let migrated = self.migrate(records, mapping, &unique_name).await;
        result.success = migrated.success;
        result.inserted = migrated.inserted;
        result.failed = migrated.failed;
        result.errors = migrated.errors;
        result
    }
}

/// 回傳映射目標中不存在於表裡的欄位名稱
fn validate_mapping(mapping: &FieldMapping, field_map: &HashMap<String, FieldMeta>) -> Vec<String> {
    mapping
        .iter()
        .filter(|(_, target)| !field_map.contains_key(target))
        .map(|(_, target)| target.clone())
        .collect()
}

fn transform_record(
    item: &Map<String, Value>,
    mapping: &FieldMapping,
    field_map: &HashMap<String, FieldMeta>,
) -> CellFields {
    let mut fields = CellFields::new();
    for (source_key, target_label) in mapping {
        if let Some(raw) = item.get(source_key) {
            if let Some(info) = field_map.get(target_label) {
                if let Some(value) = format_value(raw, info.field_type) {
                    fields.insert(info.id.clone(), value);
                }
            }
        }
    }
    fields
}

/// 依欄位型別轉成主機的儲存格格式，None 表示略過不寫
pub(crate) fn format_value(value: &Value, field_type: FieldType) -> Option<Value> {
    if value.is_null() {
        return None;
    }
    if let Some(s) = value.as_str() {
        if s.is_empty() {
            return None;
        }
    }

    match field_type {
        FieldType::Text => Some(json!([{ "type": "text", "text": stringify(value) }])),
        FieldType::Number => json_number(value).map(Value::from),
        FieldType::DateTime => match value {
            // 數值視為毫秒時間戳直接沿用
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => parse_datetime_millis(s).map(Value::from),
            _ => None,
        },
        FieldType::Checkbox => Some(Value::Bool(js_truthy(value))),
        FieldType::SingleSelect => Some(Value::String(stringify(value))),
        FieldType::MultiSelect => match value.as_array() {
            Some(items) => Some(Value::Array(
                items.iter().map(|v| Value::String(stringify(v))).collect(),
            )),
            None => Some(json!([stringify(value)])),
        },
        FieldType::Url => {
            let s = stringify(value);
            Some(json!({ "link": s, "text": s }))
        }
        FieldType::Phone | FieldType::Email => Some(Value::String(stringify(value))),
        FieldType::Unknown => Some(value.clone()),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // 陣列與物件以緊湊 JSON 呈現
        other => other.to_string(),
    }
}

fn parse_datetime_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

fn table_field_type(field_type: FieldType) -> FieldType {
    // 建表時未知型別一律退回文字
    match field_type {
        FieldType::Unknown => FieldType::Text,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_skips_empty() {
        assert_eq!(format_value(&json!(null), FieldType::Text), None);
        assert_eq!(format_value(&json!(""), FieldType::Text), None);
        assert_eq!(format_value(&json!(""), FieldType::Number), None);
    }

    #[test]
    fn test_format_value_text_segments() {
        assert_eq!(
            format_value(&json!("hello"), FieldType::Text),
            Some(json!([{ "type": "text", "text": "hello" }]))
        );
        assert_eq!(
            format_value(&json!(42), FieldType::Text),
            Some(json!([{ "type": "text", "text": "42" }]))
        );
    }

    #[test]
    fn test_format_value_number() {
        assert_eq!(format_value(&json!(12.5), FieldType::Number), Some(json!(12.5)));
        assert_eq!(format_value(&json!("99"), FieldType::Number), Some(json!(99.0)));
        assert_eq!(format_value(&json!("abc"), FieldType::Number), None);
        assert_eq!(format_value(&json!(true), FieldType::Number), Some(json!(1.0)));
    }

    #[test]
    fn test_format_value_datetime() {
        // 數值直接沿用
        assert_eq!(
            format_value(&json!(1700000000000i64), FieldType::DateTime),
            Some(json!(1700000000000i64))
        );
        // 字串解析成毫秒
        assert_eq!(
            format_value(&json!("2023-11-14T22:13:20Z"), FieldType::DateTime),
            Some(json!(1700000000000i64))
        );
        assert_eq!(
            format_value(&json!("2023-11-14 22:13:20"), FieldType::DateTime),
            Some(json!(1700000000000i64))
        );
        assert_eq!(format_value(&json!("not a date"), FieldType::DateTime), None);
        assert_eq!(format_value(&json!(true), FieldType::DateTime), None);
    }

    #[test]
    fn test_format_value_checkbox() {
        assert_eq!(format_value(&json!(1), FieldType::Checkbox), Some(json!(true)));
        assert_eq!(format_value(&json!(0), FieldType::Checkbox), Some(json!(false)));
        assert_eq!(format_value(&json!("yes"), FieldType::Checkbox), Some(json!(true)));
        assert_eq!(format_value(&json!(false), FieldType::Checkbox), Some(json!(false)));
    }

    #[test]
    fn test_format_value_selects() {
        assert_eq!(
            format_value(&json!("熱門"), FieldType::SingleSelect),
            Some(json!("熱門"))
        );
        assert_eq!(
            format_value(&json!(["a", 1]), FieldType::MultiSelect),
            Some(json!(["a", "1"]))
        );
        // 純量包成單元素陣列
        assert_eq!(
            format_value(&json!("single"), FieldType::MultiSelect),
            Some(json!(["single"]))
        );
    }

    #[test]
    fn test_format_value_url_and_contacts() {
        assert_eq!(
            format_value(&json!("https://example.com"), FieldType::Url),
            Some(json!({ "link": "https://example.com", "text": "https://example.com" }))
        );
        assert_eq!(
            format_value(&json!(123456789), FieldType::Phone),
            Some(json!("123456789"))
        );
        assert_eq!(
            format_value(&json!("a@b.c"), FieldType::Email),
            Some(json!("a@b.c"))
        );
    }

    #[test]
    fn test_format_value_unknown_passthrough() {
        let value = json!({"raw": [1, 2]});
        assert_eq!(format_value(&value, FieldType::Unknown), Some(value.clone()));
    }

    #[test]
    fn test_validate_mapping_collects_all_missing() {
        let mut field_map = HashMap::new();
        field_map.insert(
            "標題".to_string(),
            FieldMeta {
                id: "fld1".to_string(),
                name: "標題".to_string(),
                field_type: FieldType::Text,
            },
        );

        let mapping: FieldMapping = vec![
            ("title".to_string(), "標題".to_string()),
            ("plays".to_string(), "播放數".to_string()),
            ("likes".to_string(), "點讚數".to_string()),
        ];

        let missing = validate_mapping(&mapping, &field_map);
        assert_eq!(missing, vec!["播放數".to_string(), "點讚數".to_string()]);
    }

    #[test]
    fn test_transform_record_skips_absent_sources() {
        let mut field_map = HashMap::new();
        field_map.insert(
            "標題".to_string(),
            FieldMeta {
                id: "fld1".to_string(),
                name: "標題".to_string(),
                field_type: FieldType::Text,
            },
        );
        field_map.insert(
            "播放數".to_string(),
            FieldMeta {
                id: "fld2".to_string(),
                name: "播放數".to_string(),
                field_type: FieldType::Number,
            },
        );

        let mapping: FieldMapping = vec![
            ("title".to_string(), "標題".to_string()),
            ("plays".to_string(), "播放數".to_string()),
        ];

        let item = json!({"title": "影片", "other": 1}).as_object().cloned().unwrap();
        let cells = transform_record(&item, &mapping, &field_map);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells["fld1"], json!([{ "type": "text", "text": "影片" }]));
    }

    #[test]
    fn test_stringify_composites_as_json() {
        assert_eq!(stringify(&json!([1, "a"])), "[1,\"a\"]");
        assert_eq!(stringify(&json!({"k": true})), "{\"k\":true}");
    }
}
