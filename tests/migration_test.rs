use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use table_harvest::domain::model::{
    CellFields, FieldMapping, FieldMeta, FieldSpec, FieldType, TableMeta,
};
use table_harvest::domain::ports::TableStore;
use table_harvest::{HarvestError, LocalTableStore, MigrationEngine};

fn video_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("title", "標題", FieldType::Text),
        FieldSpec::new("plays", "播放量", FieldType::Number),
        FieldSpec::new("published_at", "發布時間", FieldType::DateTime),
    ]
}

fn video_mapping() -> FieldMapping {
    vec![
        ("title".to_string(), "標題".to_string()),
        ("plays".to_string(), "播放量".to_string()),
        ("published_at".to_string(), "發布時間".to_string()),
    ]
}

/// 寫入既有表格：逐儲存格驗證型別轉換結果
#[tokio::test]
async fn test_migrate_into_existing_table() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store.clone());
    let table_id = engine.create_table("視頻成果", &video_fields()).await?;

    let records = vec![
        json!({ "title": "高雄一日遊", "plays": 1234, "published_at": "2024-03-05 12:00:00" }),
        json!({ "title": "台南美食", "plays": "876", "published_at": 1700000000000i64 }),
    ];

    let result = engine.migrate(&records, &video_mapping(), "視頻成果").await;

    assert!(result.success);
    assert_eq!(result.total, 2);
    assert_eq!(result.inserted, 2);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());

    let cells = store.records(&table_id).await?;
    assert_eq!(cells.len(), 2);
    assert_eq!(
        cells[0]["fld1"],
        json!([{ "type": "text", "text": "高雄一日遊" }])
    );
    assert_eq!(cells[0]["fld2"], json!(1234.0));
    assert_eq!(cells[0]["fld3"], json!(1709640000000i64));
    // 字串數字要被轉成數值，毫秒時間戳原樣保留
    assert_eq!(cells[1]["fld2"], json!(876.0));
    assert_eq!(cells[1]["fld3"], json!(1700000000000i64));
    Ok(())
}

/// 目標表不存在：整批中止、不寫入
#[tokio::test]
async fn test_migrate_missing_table() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store);

    let records = vec![json!({ "title": "孤兒記錄" })];
    let result = engine.migrate(&records, &video_mapping(), "不存在的表").await;

    assert!(!result.success);
    assert_eq!(result.inserted, 0);
    assert_eq!(result.errors, vec!["table '不存在的表' not found".to_string()]);
    Ok(())
}

/// 映射欄位缺漏：一次列出所有缺少的欄位，且一筆都不寫
#[tokio::test]
async fn test_migrate_reports_missing_fields() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store.clone());
    let table_id = engine
        .create_table("殘缺表", &[FieldSpec::new("title", "標題", FieldType::Text)])
        .await?;

    let mapping: FieldMapping = vec![
        ("title".to_string(), "標題".to_string()),
        ("plays".to_string(), "播放量".to_string()),
        ("likes".to_string(), "點讚數".to_string()),
    ];
    let records = vec![json!({ "title": "a", "plays": 1, "likes": 2 })];
    let result = engine.migrate(&records, &mapping, "殘缺表").await;

    assert!(!result.success);
    assert_eq!(
        result.errors,
        vec!["fields missing from table: 播放量, 點讚數".to_string()]
    );
    assert_eq!(store.record_count(&table_id).await?, 0);
    Ok(())
}

/// 單筆非物件的記錄只算失敗，不影響其他記錄
#[tokio::test]
async fn test_non_object_record_counted_failed() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store.clone());
    let table_id = engine.create_table("混合表", &video_fields()).await?;

    let records = vec![
        json!({ "title": "正常一" }),
        json!("純字串"),
        json!({ "title": "正常二" }),
    ];
    let result = engine.migrate(&records, &video_mapping(), "混合表").await;

    assert!(!result.success);
    assert_eq!(result.inserted, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(
        result.errors,
        vec!["record 2 failed to convert: not a JSON object".to_string()]
    );
    assert_eq!(store.record_count(&table_id).await?, 2);
    Ok(())
}

/// 批次寫入失敗時退回逐筆寫入的儲存層替身
struct FlakyStore {
    inner: LocalTableStore,
    batch_calls: Arc<Mutex<usize>>,
    single_calls: Arc<Mutex<usize>>,
}

#[async_trait]
impl TableStore for FlakyStore {
    async fn list_tables(&self) -> table_harvest::Result<Vec<TableMeta>> {
        self.inner.list_tables().await
    }

    async fn table_by_name(&self, name: &str) -> table_harvest::Result<Option<TableMeta>> {
        self.inner.table_by_name(name).await
    }

    async fn create_table(&self, name: &str) -> table_harvest::Result<TableMeta> {
        self.inner.create_table(name).await
    }

    async fn field_list(&self, table_id: &str) -> table_harvest::Result<Vec<FieldMeta>> {
        self.inner.field_list(table_id).await
    }

    async fn add_field(
        &self,
        table_id: &str,
        name: &str,
        field_type: FieldType,
    ) -> table_harvest::Result<FieldMeta> {
        self.inner.add_field(table_id, name, field_type).await
    }

    async fn rename_field(
        &self,
        table_id: &str,
        field_id: &str,
        name: &str,
    ) -> table_harvest::Result<()> {
        self.inner.rename_field(table_id, field_id, name).await
    }

    async fn add_record(
        &self,
        table_id: &str,
        fields: &CellFields,
    ) -> table_harvest::Result<String> {
        *self.single_calls.lock().unwrap() += 1;
        self.inner.add_record(table_id, fields).await
    }

    async fn add_records(
        &self,
        _table_id: &str,
        _records: &[CellFields],
    ) -> table_harvest::Result<Vec<String>> {
        *self.batch_calls.lock().unwrap() += 1;
        Err(HarvestError::TableStoreError {
            message: "batch endpoint unavailable".to_string(),
        })
    }
}

/// 150 筆資料分兩批，批次全數失敗後逐筆補寫成功
#[tokio::test]
async fn test_batch_fallback_inserts_record_by_record() -> Result<()> {
    let inner = LocalTableStore::in_memory();
    let meta = inner.create_table("批次表").await?;
    inner.rename_field(&meta.id, "fld1", "標題").await?;

    let batch_calls = Arc::new(Mutex::new(0));
    let single_calls = Arc::new(Mutex::new(0));
    let engine = MigrationEngine::new(FlakyStore {
        inner: inner.clone(),
        batch_calls: batch_calls.clone(),
        single_calls: single_calls.clone(),
    });

    let records: Vec<Value> = (0..150).map(|i| json!({ "title": format!("影片 {}", i) })).collect();
    let mapping: FieldMapping = vec![("title".to_string(), "標題".to_string())];
    let result = engine.migrate(&records, &mapping, "批次表").await;

    assert!(result.success);
    assert_eq!(result.inserted, 150);
    assert_eq!(result.failed, 0);
    assert_eq!(*batch_calls.lock().unwrap(), 2);
    assert_eq!(*single_calls.lock().unwrap(), 150);
    assert_eq!(inner.record_count(&meta.id).await?, 150);
    Ok(())
}

/// 建表時第一個欄位改名自預設欄位，型別保持文字；未知型別退回文字
#[tokio::test]
async fn test_create_table_renames_default_field() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store.clone());

    let fields = vec![
        FieldSpec::new("title", "標題", FieldType::Text),
        FieldSpec::new("plays", "播放量", FieldType::Number),
        FieldSpec::new("extra", "雜項", FieldType::Unknown),
    ];
    let table_id = engine.create_table("新表", &fields).await?;

    let metas = store.field_list(&table_id).await?;
    assert_eq!(metas.len(), 3);
    assert_eq!(metas[0].id, "fld1");
    assert_eq!(metas[0].name, "標題");
    assert_eq!(metas[0].field_type, FieldType::Text);
    assert_eq!(metas[1].name, "播放量");
    assert_eq!(metas[1].field_type, FieldType::Number);
    assert_eq!(metas[2].name, "雜項");
    assert_eq!(metas[2].field_type, FieldType::Text);
    Ok(())
}

/// 表名撞名時依序補數字
#[tokio::test]
async fn test_generate_unique_table_name() -> Result<()> {
    let store = LocalTableStore::in_memory();
    let engine = MigrationEngine::new(store.clone());

    assert_eq!(engine.generate_unique_table_name("成果").await?, "成果");

    store.create_table("成果").await?;
    assert_eq!(engine.generate_unique_table_name("成果").await?, "成果1");

    store.create_table("成果1").await?;
    assert_eq!(engine.generate_unique_table_name("成果").await?, "成果2");
    Ok(())
}

/// 完整流程：撞名取新表名、建表、寫入一氣呵成
#[tokio::test]
async fn test_create_table_and_migrate_end_to_end() -> Result<()> {
    let store = LocalTableStore::in_memory();
    store.create_table("匯出").await?;

    let engine = MigrationEngine::new(store.clone());
    let records = vec![
        json!({ "title": "第一筆", "plays": 10, "published_at": "2024-01-01" }),
        json!({ "title": "第二筆", "plays": 20, "published_at": "2024-01-02" }),
    ];
    let result = engine
        .create_table_and_migrate("匯出", &records, &video_mapping(), &video_fields())
        .await;

    assert!(result.success);
    assert_eq!(result.table_name, Some("匯出1".to_string()));
    assert_eq!(result.inserted, 2);

    // 第二張表的預設欄位拿到 fld2，後續欄位依序遞增
    let meta = store.table_by_name("匯出1").await?.unwrap();
    let cells = store.records(&meta.id).await?;
    assert_eq!(cells.len(), 2);
    assert_eq!(
        cells[0]["fld2"],
        json!([{ "type": "text", "text": "第一筆" }])
    );
    assert_eq!(cells[0]["fld4"], json!(1704067200000i64));
    Ok(())
}
