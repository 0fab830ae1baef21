//! 配置層：內建登錄表、TOML 登錄檔與 CLI 參數

pub mod builtin;
#[cfg(feature = "cli")]
pub mod cli;
pub mod registry;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use registry::{CollectRegistry, FunctionConfig, FunctionDef, InputField, Platform};
