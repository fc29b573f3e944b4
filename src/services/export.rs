//! 审计日志导出（CSV）

use crate::models::AuditEvent;
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// 导出表头，列顺序固定
pub const EXPORT_HEADERS: [&str; 9] = [
    "Timestamp",
    "User Email",
    "User Role",
    "Action",
    "Resource Type",
    "Resource ID",
    "Description",
    "Status",
    "IP Address",
];

fn writer<W: std::io::Write>(style: QuoteStyle, out: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .quote_style(style)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out)
}

/// 渲染为 CSV 文本，每行以 `\n` 结尾
///
/// 表头不加引号；数据行的每个字段都加引号，内部引号双写。
pub fn render_csv(events: &[AuditEvent]) -> Result<String, csv::Error> {
    let mut header = writer(QuoteStyle::Necessary, Vec::new());
    header.write_record(EXPORT_HEADERS)?;
    let buf = header.into_inner().map_err(|e| e.into_error())?;

    let mut rows = writer(QuoteStyle::Always, buf);
    for event in events {
        let created_at = event.created_at.to_rfc3339();
        rows.write_record([
            created_at.as_str(),
            event.actor_email.as_str(),
            event.actor_role.as_str(),
            event.action_kind.as_str(),
            event.resource_kind.as_deref().unwrap_or_default(),
            event.resource_id.as_deref().unwrap_or_default(),
            event.description.as_str(),
            event.status.as_str(),
            event.ip_address.as_deref().unwrap_or_default(),
        ])?;
    }

    let bytes = rows.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// 下载文件名
pub fn export_filename(date: chrono::NaiveDate) -> String {
    format!("audit-logs-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn event(description: &str) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            actor_id: "u1".to_string(),
            actor_email: "doc@example.com".to_string(),
            actor_role: "psychometrician".to_string(),
            action_kind: "print".to_string(),
            resource_kind: Some("report".to_string()),
            resource_id: None,
            description: description.to_string(),
            details: json!({}),
            ip_address: Some("10.0.0.8".to_string()),
            user_agent: None,
            session_id_hash: None,
            status: "success".to_string(),
            severity: "low".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_header_only_for_empty_export() {
        assert_eq!(
            render_csv(&[]).unwrap(),
            "Timestamp,User Email,User Role,Action,Resource Type,Resource ID,Description,Status,IP Address\n"
        );
    }

    #[test]
    fn test_row_layout() {
        let csv = render_csv(&[event("Printed \"MMPI\" report, page 1")]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"2024-05-01T08:30:00+00:00\",\"doc@example.com\",\"psychometrician\",\"print\",\"report\",\"\",\"Printed \"\"MMPI\"\" report, page 1\",\"success\",\"10.0.0.8\""
        );
    }

    #[test]
    fn test_description_always_quoted() {
        let csv = render_csv(&[event("plain")]).unwrap();
        assert!(csv.lines().nth(1).unwrap().contains(",\"plain\","));
        assert!(csv.ends_with('\n'));
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(export_filename(date), "audit-logs-2024-05-01.csv");
    }
}
