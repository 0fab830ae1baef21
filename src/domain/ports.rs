use crate::domain::model::{CellFields, FieldMeta, FieldType, TableMeta};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 目標表格主機的能力介面，遷移引擎只透過它寫入
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<TableMeta>>;

    async fn table_by_name(&self, name: &str) -> Result<Option<TableMeta>>;

    /// 建表，主機會自動附帶一個預設文字欄位
    async fn create_table(&self, name: &str) -> Result<TableMeta>;

    async fn field_list(&self, table_id: &str) -> Result<Vec<FieldMeta>>;

    async fn add_field(&self, table_id: &str, name: &str, field_type: FieldType)
        -> Result<FieldMeta>;

    /// 改名不改型別
    async fn rename_field(&self, table_id: &str, field_id: &str, name: &str) -> Result<()>;

    /// 寫入一筆，回傳記錄 id
    async fn add_record(&self, table_id: &str, fields: &CellFields) -> Result<String>;

    /// 批次寫入，整批成功或整批失敗
    async fn add_records(&self, table_id: &str, records: &[CellFields]) -> Result<Vec<String>>;
}
