use clap::Parser;
use serde_json::Value;
use table_harvest::config::builtin;
use table_harvest::domain::model::{CollectMode, MigrationResult, Record};
use table_harvest::utils::monitor::RunMonitor;
use table_harvest::utils::{logger, validation::Validate};
use table_harvest::{
    CliConfig, CollectCallbacks, CollectRegistry, Collector, HarvestError, LocalTableStore,
    MigrationEngine,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("🚀 Starting table-harvest CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let mut monitor = RunMonitor::new(config.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 組登錄表：內建配置加上外部 TOML 檔
    let mut registry = builtin::default_registry();
    for path in &config.registry_files {
        if let Err(e) = registry.load_file(path) {
            tracing::error!("❌ Failed to load registry file '{}': {}", path, e);
            eprintln!("❌ Failed to load registry file '{}': {}", path, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    }
    if let Err(e) = registry.validate() {
        tracing::error!("❌ Registry validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.list {
        display_registry(&registry);
        return Ok(());
    }

    match run(&config, &registry, &mut monitor).await {
        Ok(true) => {
            monitor.log_final();
        }
        Ok(false) => {
            monitor.log_final();
            std::process::exit(1);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                table_harvest::utils::error::ErrorSeverity::Low => 0, // 警告，但成功
                table_harvest::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                table_harvest::utils::error::ErrorSeverity::High => 1, // 處理錯誤
                table_harvest::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// 採集並輸出。回傳 false 表示遷移有失敗筆數
async fn run(
    config: &CliConfig,
    registry: &CollectRegistry,
    monitor: &mut RunMonitor,
) -> table_harvest::Result<bool> {
    let platform_id = config
        .platform
        .as_deref()
        .ok_or_else(|| HarvestError::MissingParamError {
            name: "platform".to_string(),
        })?;
    let function_id = config
        .function
        .as_deref()
        .ok_or_else(|| HarvestError::MissingParamError {
            name: "function".to_string(),
        })?;

    let function_config = registry
        .function_config(platform_id, function_id)
        .ok_or_else(|| HarvestError::ConfigError {
            message: format!(
                "unknown platform/function: {} / {} (use --list to see what's available)",
                platform_id, function_id
            ),
        })?;

    // 合併輸入參數：CLI 提供的優先，其次取輸入欄位預設值
    let mut params = config.parsed_params()?;
    for input in registry.input_fields(platform_id, function_id) {
        if params.contains_key(&input.key) {
            continue;
        }
        if let Some(default) = &input.default {
            params.insert(input.key.clone(), default.clone());
        } else if input.required {
            return Err(HarvestError::MissingParamError {
                name: input.key.clone(),
            });
        }
    }

    let settings = config.collect_settings();
    if settings.mode == CollectMode::All && !function_config.api.allow_collect_all {
        return Err(HarvestError::InvalidConfigValueError {
            field: "mode".to_string(),
            value: "all".to_string(),
            reason: format!(
                "function '{}' does not allow collect-all mode",
                function_id
            ),
        });
    }

    let export_fields = registry.export_fields(platform_id, function_id);
    let token = config.resolved_token();

    let collector = Collector::new();
    let mut callbacks = CollectCallbacks::new().on_progress(|times, total| {
        println!("📥 Request {} done, {} records so far", times, total);
    });

    let records = collector
        .collect(
            &function_config.api,
            export_fields,
            &params,
            &settings,
            token.as_deref(),
            &mut callbacks,
        )
        .await?;

    monitor.log_phase("Collection complete");
    tracing::info!("✅ Collected {} records", records.len());
    println!("✅ Collected {} records", records.len());

    let values: Vec<Value> = records.iter().map(Record::to_value).collect();

    // 沒有指定表格就把結果印到 stdout
    if config.table.is_none() && !config.create_table {
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(true);
    }

    let store = LocalTableStore::open(&config.tables_dir)?;
    let engine = MigrationEngine::new(store);
    let mapping = registry.field_mapping(platform_id, function_id);

    let result = if let Some(table_name) = &config.table {
        engine.migrate(&values, &mapping, table_name).await
    } else {
        let base_name = format!("{}_{}", platform_id, function_id);
        engine
            .create_table_and_migrate(&base_name, &values, &mapping, export_fields)
            .await
    };

    monitor.log_phase("Migration complete");
    display_migration_result(&result);

    Ok(result.success)
}

fn display_registry(registry: &CollectRegistry) {
    println!("📋 Available platforms and functions:");
    for platform in registry.platforms() {
        println!();
        println!(
            "  {} ({}) - {}",
            platform.name, platform.id, platform.description
        );
        for function in registry.functions(&platform.id) {
            println!(
                "    {} ({}) - {}",
                function.name, function.id, function.description
            );
            for input in registry.input_fields(&platform.id, &function.id) {
                let required = if input.required { " [required]" } else { "" };
                let default = match &input.default {
                    Some(value) => format!(" (default: {})", value),
                    None => String::new(),
                };
                println!(
                    "      --param {}=...  {}{}{}",
                    input.key, input.label, required, default
                );
            }
        }
    }
    println!();
}

fn display_migration_result(result: &MigrationResult) {
    println!();
    println!("📊 Migration Summary:");
    if let Some(table_name) = &result.table_name {
        println!("  Table: {}", table_name);
    }
    println!("  Total: {}", result.total);
    println!("  Inserted: {}", result.inserted);
    println!("  Failed: {}", result.failed);
    if !result.errors.is_empty() {
        println!("  Errors:");
        for error in &result.errors {
            println!("    - {}", error);
        }
    }
    println!();
    if result.success {
        println!("✅ Migration completed successfully!");
    } else {
        println!("❌ Migration finished with errors");
    }
}
