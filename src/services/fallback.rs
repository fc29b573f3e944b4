//! 降级记录
//! 主存储写入失败时，错误上报落到这里，只保留最近 N 条

use crate::models::FallbackEntry;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct FallbackLog {
    capacity: usize,
    entries: Mutex<VecDeque<FallbackEntry>>,
    path: Option<PathBuf>,
}

impl FallbackLog {
    /// 仅内存保存
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            path: None,
        }
    }

    /// 持久化到 JSON 文件，启动时加载已有内容
    pub async fn with_file(capacity: usize, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let capacity = capacity.max(1);

        let mut entries: VecDeque<FallbackEntry> = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<FallbackEntry>>(&bytes) {
                Ok(list) => list.into(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Fallback log unreadable, starting empty");
                    VecDeque::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read fallback log");
                VecDeque::new()
            }
        };
        while entries.len() > capacity {
            entries.pop_front();
        }

        Self {
            capacity,
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加一条记录，超出容量时丢弃最旧的
    pub async fn push(&self, entry: FallbackEntry) {
        // 写文件期间持有锁，文件内容与内存列表保持同序
        let mut entries = self.entries.lock().await;
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        metrics::counter!("audit_fallback_entries_total").increment(1);

        if let Some(path) = &self.path {
            match serde_json::to_vec_pretty(&*entries) {
                Ok(bytes) => {
                    if let Err(e) = tokio::fs::write(path, bytes).await {
                        tracing::error!(path = %path.display(), error = %e, "Failed to persist fallback log");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize fallback log"),
            }
        }
    }

    /// 当前记录，最旧的在前
    pub async fn entries(&self) -> Vec<FallbackEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }
}
