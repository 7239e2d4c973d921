//! I/O 支持：JSON 与 RON 序列化接口，用于网与迁移系统描述。
use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron error: {0}")]
    RonSpanned(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}
