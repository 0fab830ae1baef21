use crate::domain::model::{CellFields, FieldMeta, FieldType, TableMeta};
use crate::domain::ports::TableStore;
use crate::utils::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    cells: CellFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTable {
    meta: TableMeta,
    fields: Vec<FieldMeta>,
    records: Vec<StoredRecord>,
}

#[derive(Debug)]
struct StoreState {
    tables: Vec<StoredTable>,
    next_table_id: u64,
    next_field_id: u64,
    next_record_id: u64,
}

impl StoreState {
    fn new() -> Self {
        Self {
            tables: Vec::new(),
            next_table_id: 1,
            next_field_id: 1,
            next_record_id: 1,
        }
    }

    fn take_table_id(&mut self) -> String {
        let id = format!("tbl{}", self.next_table_id);
        self.next_table_id += 1;
        id
    }

    fn take_field_id(&mut self) -> String {
        let id = format!("fld{}", self.next_field_id);
        self.next_field_id += 1;
        id
    }

    fn take_record_id(&mut self) -> String {
        let id = format!("rec{}", self.next_record_id);
        self.next_record_id += 1;
        id
    }

    fn table(&self, table_id: &str) -> Result<&StoredTable> {
        self.tables
            .iter()
            .find(|t| t.meta.id == table_id)
            .ok_or_else(|| missing_table(table_id))
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut StoredTable> {
        self.tables
            .iter_mut()
            .find(|t| t.meta.id == table_id)
            .ok_or_else(|| missing_table(table_id))
    }
}

fn missing_table(table_id: &str) -> HarvestError {
    HarvestError::TableStoreError {
        message: format!("table id '{}' does not exist", table_id),
    }
}

fn numeric_suffix(id: &str, prefix: &str) -> u64 {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.parse().ok())
        .unwrap_or(0)
}

/// 本機表格儲存：記憶體為主，可掛上目錄做每表一個 JSON 檔的持久化
///
/// Clone 得到的是同一份儲存的另一個把手。
#[derive(Clone)]
pub struct LocalTableStore {
    state: Arc<Mutex<StoreState>>,
    persist_dir: Option<PathBuf>,
}

impl LocalTableStore {
    /// 純記憶體模式
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
            persist_dir: None,
        }
    }

    /// 開啟持久化目錄（不存在就建立），載入既有表格
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut state = StoreState::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<StoredTable>(&content) {
                Ok(table) => {
                    // 還原 id 計數器，避免與既有資料撞號
                    state.next_table_id = state
                        .next_table_id
                        .max(numeric_suffix(&table.meta.id, "tbl") + 1);
                    for field in &table.fields {
                        state.next_field_id =
                            state.next_field_id.max(numeric_suffix(&field.id, "fld") + 1);
                    }
                    for record in &table.records {
                        state.next_record_id = state
                            .next_record_id
                            .max(numeric_suffix(&record.id, "rec") + 1);
                    }
                    state.tables.push(table);
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable table file {}: {}", path.display(), e);
                }
            }
        }
        state
            .tables
            .sort_by_key(|t| numeric_suffix(&t.meta.id, "tbl"));

        tracing::info!(
            "📁 Table store opened at {} ({} tables)",
            dir.display(),
            state.tables.len()
        );
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            persist_dir: Some(dir),
        })
    }

    /// 取出一張表的所有記錄儲存格，檢視結果用
    pub async fn records(&self, table_id: &str) -> Result<Vec<CellFields>> {
        let state = self.state.lock().await;
        Ok(state
            .table(table_id)?
            .records
            .iter()
            .map(|r| r.cells.clone())
            .collect())
    }

    pub async fn record_count(&self, table_id: &str) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.table(table_id)?.records.len())
    }

    fn persist_table(&self, table: &StoredTable) -> Result<()> {
        if let Some(dir) = &self.persist_dir {
            let path = dir.join(format!("{}.json", table.meta.id));
            let content = serde_json::to_string_pretty(table)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableStore for LocalTableStore {
    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        let state = self.state.lock().await;
        Ok(state.tables.iter().map(|t| t.meta.clone()).collect())
    }

    async fn table_by_name(&self, name: &str) -> Result<Option<TableMeta>> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .iter()
            .find(|t| t.meta.name == name)
            .map(|t| t.meta.clone()))
    }

    async fn create_table(&self, name: &str) -> Result<TableMeta> {
        let mut state = self.state.lock().await;
        let table_id = state.take_table_id();
        let field_id = state.take_field_id();

        // 與真實表格主機一致：新表自帶一個無法刪除的文字欄位
        let table = StoredTable {
            meta: TableMeta {
                id: table_id,
                name: name.to_string(),
            },
            fields: vec![FieldMeta {
                id: field_id,
                name: "Text".to_string(),
                field_type: FieldType::Text,
            }],
            records: Vec::new(),
        };
        self.persist_table(&table)?;

        let meta = table.meta.clone();
        state.tables.push(table);
        Ok(meta)
    }

    async fn field_list(&self, table_id: &str) -> Result<Vec<FieldMeta>> {
        let state = self.state.lock().await;
        Ok(state.table(table_id)?.fields.clone())
    }

    async fn add_field(
        &self,
        table_id: &str,
        name: &str,
        field_type: FieldType,
    ) -> Result<FieldMeta> {
        let mut state = self.state.lock().await;
        let field_id = state.take_field_id();
        let table = state.table_mut(table_id)?;

        let field = FieldMeta {
            id: field_id,
            name: name.to_string(),
            field_type,
        };
        table.fields.push(field.clone());
        self.persist_table(table)?;
        Ok(field)
    }

    async fn rename_field(&self, table_id: &str, field_id: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let table = state.table_mut(table_id)?;
        let field = table
            .fields
            .iter_mut()
            .find(|f| f.id == field_id)
            .ok_or_else(|| HarvestError::TableStoreError {
                message: format!("field id '{}' does not exist", field_id),
            })?;
        field.name = name.to_string();
        self.persist_table(table)?;
        Ok(())
    }

    async fn add_record(&self, table_id: &str, fields: &CellFields) -> Result<String> {
        let mut state = self.state.lock().await;
        let record_id = state.take_record_id();
        let table = state.table_mut(table_id)?;
        table.records.push(StoredRecord {
            id: record_id.clone(),
            cells: fields.clone(),
        });
        self.persist_table(table)?;
        Ok(record_id)
    }

    async fn add_records(&self, table_id: &str, records: &[CellFields]) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        let ids: Vec<String> = records.iter().map(|_| state.take_record_id()).collect();
        let table = state.table_mut(table_id)?;
        for (cells, id) in records.iter().zip(&ids) {
            table.records.push(StoredRecord {
                id: id.clone(),
                cells: cells.clone(),
            });
        }
        self.persist_table(table)?;
        Ok(ids)
    }
}
