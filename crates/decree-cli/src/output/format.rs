use decree_core::model::DecisionRecord;
use decree_query::SearchHit;

use super::OutputFormat;

pub fn format_record_list(records: &[DecisionRecord], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(records).unwrap_or_default(),
        OutputFormat::Text => format_record_list_text(records),
    }
}

fn format_record_list_text(records: &[DecisionRecord]) -> String {
    if records.is_empty() {
        return "No decision records found.".to_string();
    }

    let mut out = String::new();
    for record in records {
        let title = first_line(&record.body);
        let status = &record.metadata.status;
        let time = record.updated_at.format("%Y-%m-%d");
        let tags = if record.metadata.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", record.metadata.tags.join(", "))
        };
        out.push_str(&format!(
            "{}  {status:<10}  {time}  {title}{tags}\n",
            record.id
        ));
    }
    out
}

pub fn format_record_full(record: &DecisionRecord, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(record).unwrap_or_default(),
        OutputFormat::Text => format_record_full_text(record),
    }
}

fn format_record_full_text(record: &DecisionRecord) -> String {
    let m = &record.metadata;
    let mut out = String::new();

    out.push_str(&format!("Record:  {}\n", record.id));
    out.push_str(&format!("Status:  {}\n", m.status));
    out.push_str(&format!(
        "Created: {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Updated: {}\n",
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !m.tags.is_empty() {
        out.push_str(&format!("Tags:    {}\n", m.tags.join(", ")));
    }
    if !m.deciders.is_empty() {
        out.push_str(&format!("Deciders: {}\n", m.deciders.join(", ")));
    }
    if let Some(old) = &m.supersedes {
        out.push_str(&format!("Supersedes: {old}\n"));
    }
    if let Some(new) = &m.superseded_by {
        out.push_str(&format!("Superseded by: {new}\n"));
    }
    for link in &m.links {
        out.push_str(&format!("Link:    {} -> {}\n", link.rel, link.target));
    }
    out.push('\n');
    out.push_str(&record.body);
    if !record.body.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn format_hits(hits: &[SearchHit], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = hits
                .iter()
                .map(|h| {
                    serde_json::json!({
                        "id": h.id.as_str(),
                        "snippet": h.snippet,
                        "score": h.score,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&rows).unwrap_or_default()
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for h in hits {
                out.push_str(&format!("{}  {}  ({} match(es))\n", h.id, h.snippet, h.score));
            }
            out
        }
    }
}

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or("").trim()
}
