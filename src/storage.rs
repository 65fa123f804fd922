//! Intent 持久化
//!
//! 保存的 intent 位于 `<root>/<job_id>/intent.json`；apply 路径写入扁平的
//! `<root>/<slug>_<timestamp>.json` 归档。

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{IntentError, IntentResult};

pub const JOB_ID_MAX_CHARS: usize = 120;
pub const INTENT_FILE_NAME: &str = "intent.json";
/// `storage_path` 的前缀，相对于服务工作目录
pub const STORAGE_PATH_PREFIX: &str = "storage";

static UNSAFE_JOB_ID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_-]").unwrap());

/// 保存结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub job_id: String,
    pub relative_path: String,
    pub storage_path: String,
}

/// 归档结果（apply 路径）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRecord {
    pub filename: String,
    pub path: PathBuf,
}

/// 将 `raw` 规范化为 `[0-9A-Za-z_-]`，最多 120 个字符
///
/// 非法字符替换为 `-`，再去掉首尾的 `-`。结果为空时生成
/// `job-<UTC 时间戳>-<6 位十六进制>` 形式的 id。
pub fn normalize_job_id(raw: Option<&str>) -> String {
    let sanitized = raw
        .map(str::trim)
        .map(|value| UNSAFE_JOB_ID_CHARS.replace_all(value, "-"))
        .map(|value| value.trim_matches('-').chars().take(JOB_ID_MAX_CHARS).collect::<String>())
        .unwrap_or_default();

    if sanitized.is_empty() {
        synthesize_job_id()
    } else {
        sanitized
    }
}

fn synthesize_job_id() -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!(
        "job-{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        &tail[..6]
    )
}

/// 以文本形式读取 `job_meta.job_id`，数字原样接受
fn requested_job_id(job_meta: &Map<String, Value>) -> Option<String> {
    match job_meta.get("job_id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct IntentStore {
    root: PathBuf,
}

impl IntentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 按规范化后的 job id 保存 `intent`
    ///
    /// 返回的 intent 在 `job_meta.job_id` 中带有该 id；同一 id 再次保存会原地覆盖。
    pub fn save(&self, intent: &Value) -> IntentResult<(Value, StorageRecord)> {
        let Value::Object(source) = intent else {
            return Err(IntentError::NotAnObject);
        };
        let mut document = source.clone();

        let mut job_meta = match document.remove("job_meta") {
            Some(Value::Object(meta)) => meta,
            _ => Map::new(),
        };
        let job_id = normalize_job_id(requested_job_id(&job_meta).as_deref());
        job_meta.insert("job_id".to_string(), Value::String(job_id.clone()));
        document.insert("job_meta".to_string(), Value::Object(job_meta));
        let document = Value::Object(document);

        let job_dir = self.root.join(&job_id);
        fs::create_dir_all(&job_dir).map_err(|source| storage_error(&job_dir, source))?;

        let target = job_dir.join(INTENT_FILE_NAME);
        write_pretty(&target, &document)?;

        let relative_path = format!("{job_id}/{INTENT_FILE_NAME}");
        info!(job_id = %job_id, path = %target.display(), "intent saved");
        Ok((
            document,
            StorageRecord {
                storage_path: format!("{STORAGE_PATH_PREFIX}/{relative_path}"),
                job_id,
                relative_path,
            },
        ))
    }

    /// 写入扁平的 `<slug>_<timestamp>.json` 归档
    pub fn archive(&self, intent: &Value, profile_slug: &str) -> IntentResult<ArchiveRecord> {
        fs::create_dir_all(&self.root).map_err(|source| storage_error(&self.root, source))?;

        let filename = format!(
            "{}_{}.json",
            profile_slug.replace('/', "-"),
            Utc::now().format("%Y%m%dT%H%M%S")
        );
        let path = self.root.join(&filename);
        write_pretty(&path, intent)?;
        info!(path = %path.display(), "intent archived");
        Ok(ArchiveRecord { filename, path })
    }

    /// 读取已保存的 intent；只接受已是规范形式的 id
    pub fn load(&self, job_id: &str) -> IntentResult<Value> {
        if normalize_job_id(Some(job_id)) != job_id {
            return Err(IntentError::InvalidJobId(job_id.to_string()));
        }
        let path = self.root.join(job_id).join(INTENT_FILE_NAME);
        let raw = fs::read_to_string(&path).map_err(|source| storage_error(&path, source))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn write_pretty(path: &Path, document: &Value) -> IntentResult<()> {
    let body = serde_json::to_string_pretty(document)?;
    fs::write(path, body).map_err(|source| storage_error(path, source))
}

fn storage_error(path: &Path, source: std::io::Error) -> IntentError {
    error!(path = %path.display(), error = %source, "intent storage failed");
    IntentError::Storage {
        path: path.to_path_buf(),
        source,
    }
}
