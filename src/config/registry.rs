use crate::core::transform::generate_mapping;
use crate::domain::model::{ApiSpec, FieldMapping, FieldSpec, FieldType, Pagination};
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// 平台定義。enabled_functions 的順序就是列表顯示順序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled_functions: Vec<String>,
}

/// 功能目錄項，跨平台共用 id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 使用者輸入欄位。default 會在未提供參數時補上
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl InputField {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// 單一平台功能的完整採集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(default)]
    pub input_fields: Vec<InputField>,
    pub api: ApiSpec,
    #[serde(default)]
    pub export_fields: Vec<FieldSpec>,
}

/// 採集登錄表：平台目錄、功能目錄與逐功能配置
///
/// 內建配置由 [`crate::config::builtin::default_registry`] 提供，
/// 額外平台可透過 TOML 檔案載入後合併進來。
#[derive(Debug, Clone, Default)]
pub struct CollectRegistry {
    platforms: Vec<Platform>,
    functions: HashMap<String, FunctionDef>,
    configs: HashMap<(String, String), FunctionConfig>,
}

/// TOML 登錄檔的原始結構：一個平台帶若干功能
#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    platform: PlatformSection,
    #[serde(default)]
    functions: Vec<FunctionSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlatformSection {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionSection {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    input_fields: Vec<InputField>,
    api: ApiSpec,
    #[serde(default)]
    export_fields: Vec<FieldSpec>,
}

impl CollectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 TOML 檔案建立只含該檔內容的登錄表
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_file(path)?;
        Ok(registry)
    }

    /// 載入 TOML 登錄檔並合併到現有登錄表
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(&path).map_err(HarvestError::IoError)?;
        self.load_toml_str(&content)
    }

    /// 解析 TOML 字串並合併。已存在的平台會追加功能而不是覆蓋
    pub fn load_toml_str(&mut self, content: &str) -> Result<()> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        let file: RegistryFile =
            toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        let platform_id = file.platform.id.clone();
        self.register_platform(Platform {
            id: file.platform.id,
            name: file.platform.name,
            description: file.platform.description,
            enabled_functions: Vec::new(),
        });

        for function in file.functions {
            let function_id = function.id.clone();
            self.register_function(FunctionDef {
                id: function.id,
                name: function.name,
                description: function.description,
            });
            self.register_config(
                &platform_id,
                &function_id,
                FunctionConfig {
                    input_fields: function.input_fields,
                    api: function.api,
                    export_fields: function.export_fields,
                },
            );
            self.enable_function(&platform_id, &function_id);
        }

        Ok(())
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 所有已登錄平台，依登錄順序
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn platform(&self, platform_id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == platform_id)
    }

    /// 平台啟用的功能，依啟用順序；沒有目錄項的 id 會被略過
    pub fn functions(&self, platform_id: &str) -> Vec<&FunctionDef> {
        let Some(platform) = self.platform(platform_id) else {
            return Vec::new();
        };
        platform
            .enabled_functions
            .iter()
            .filter_map(|id| self.functions.get(id))
            .collect()
    }

    pub fn function_config(&self, platform_id: &str, function_id: &str) -> Option<&FunctionConfig> {
        self.configs
            .get(&(platform_id.to_string(), function_id.to_string()))
    }

    pub fn input_fields(&self, platform_id: &str, function_id: &str) -> &[InputField] {
        self.function_config(platform_id, function_id)
            .map(|config| config.input_fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn export_fields(&self, platform_id: &str, function_id: &str) -> &[FieldSpec] {
        self.function_config(platform_id, function_id)
            .map(|config| config.export_fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn api_spec(&self, platform_id: &str, function_id: &str) -> Option<&ApiSpec> {
        self.function_config(platform_id, function_id)
            .map(|config| &config.api)
    }

    /// 匯出欄位的 key → 表格欄位名對照，順序同 export_fields
    pub fn field_mapping(&self, platform_id: &str, function_id: &str) -> FieldMapping {
        generate_mapping(self.export_fields(platform_id, function_id))
    }

    /// 表格欄位名 → 欄位型別，順序同 export_fields
    pub fn field_types(&self, platform_id: &str, function_id: &str) -> Vec<(String, FieldType)> {
        self.export_fields(platform_id, function_id)
            .iter()
            .map(|f| (f.label.clone(), f.field_type))
            .collect()
    }

    /// 登錄平台，id 已存在時不做任何事
    pub fn register_platform(&mut self, platform: Platform) {
        if self.platform(&platform.id).is_none() {
            self.platforms.push(platform);
        }
    }

    /// 登錄功能目錄項，id 已存在時不做任何事
    pub fn register_function(&mut self, def: FunctionDef) {
        self.functions.entry(def.id.clone()).or_insert(def);
    }

    /// 在平台上啟用功能，平台不存在或已啟用時不做任何事
    pub fn enable_function(&mut self, platform_id: &str, function_id: &str) {
        if let Some(platform) = self.platforms.iter_mut().find(|p| p.id == platform_id) {
            if !platform.enabled_functions.iter().any(|f| f == function_id) {
                platform.enabled_functions.push(function_id.to_string());
            }
        }
    }

    pub fn disable_function(&mut self, platform_id: &str, function_id: &str) {
        if let Some(platform) = self.platforms.iter_mut().find(|p| p.id == platform_id) {
            platform.enabled_functions.retain(|f| f != function_id);
        }
    }

    /// 登錄或覆蓋功能配置
    pub fn register_config(
        &mut self,
        platform_id: &str,
        function_id: &str,
        config: FunctionConfig,
    ) {
        self.configs
            .insert((platform_id.to_string(), function_id.to_string()), config);
    }
}

impl Validate for CollectRegistry {
    fn validate(&self) -> Result<()> {
        for platform in &self.platforms {
            validation::validate_non_empty_string("platform.id", &platform.id)?;
            validation::validate_non_empty_string("platform.name", &platform.name)?;

            for function_id in &platform.enabled_functions {
                if self.function_config(&platform.id, function_id).is_none() {
                    tracing::warn!(
                        "Function '{}' enabled on platform '{}' has no config",
                        function_id,
                        platform.id
                    );
                }
            }
        }

        for ((platform_id, function_id), config) in &self.configs {
            let scope = format!("{}.{}", platform_id, function_id);
            validate_function_config(&scope, config)?;
        }

        Ok(())
    }
}

fn validate_function_config(scope: &str, config: &FunctionConfig) -> Result<()> {
    validation::validate_url(&format!("{}.api.url", scope), &config.api.url)?;

    for param in &config.api.params {
        validation::validate_non_empty_string(&format!("{}.api.params", scope), param)?;
    }

    match &config.api.pagination {
        Some(Pagination::Page { param_name, .. }) => {
            validation::validate_non_empty_string(
                &format!("{}.api.pagination.param_name", scope),
                param_name,
            )?;
        }
        Some(Pagination::Cursor {
            param_name,
            response_path,
            ..
        }) => {
            validation::validate_non_empty_string(
                &format!("{}.api.pagination.param_name", scope),
                param_name,
            )?;
            if response_path.is_empty() {
                // 游標取不到值時採集只會跑一頁，多半是配置漏寫
                tracing::warn!(
                    "Cursor pagination for '{}' has no response_path, collection will stop after one page",
                    scope
                );
            }
        }
        None => {}
    }

    let mut seen_keys = HashSet::new();
    for field in &config.export_fields {
        validation::validate_non_empty_string(&format!("{}.export_fields.key", scope), &field.key)?;
        validation::validate_non_empty_string(
            &format!("{}.export_fields.label", scope),
            &field.label,
        )?;
        if !seen_keys.insert(field.key.as_str()) {
            return Err(HarvestError::InvalidConfigValueError {
                field: format!("{}.export_fields", scope),
                value: field.key.clone(),
                reason: "duplicate field key".to_string(),
            });
        }
    }

    for input in &config.input_fields {
        validation::validate_non_empty_string(&format!("{}.input_fields.key", scope), &input.key)?;
        validation::validate_non_empty_string(
            &format!("{}.input_fields.label", scope),
            &input.label,
        )?;
    }

    Ok(())
}
