//! Scan report layout.
//!
//! Reports are rendered into a bounded list of named fields so a chat
//! frontend can show them without further splitting.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Most fields one report carries.
pub const MAX_FIELDS: usize = 25;
/// Longest value of one field, in characters.
pub const MAX_FIELD_LEN: usize = 1024;

const NO_GROUP_FIELD: &str = "No Faction";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub name: String,
    pub value: String,
}

/// Result of one tracker scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub title: String,
    /// World label at the time of the scan, if captured.
    pub world: Option<String>,
    /// Distinct players enumerated.
    pub total: usize,
    pub fields: Vec<ReportField>,
    /// Players whose lookup timed out.
    pub unresolved: usize,
    pub generated_at: DateTime<Utc>,
}

/// Render names as bullet lines, chunked to at most `max_len` characters.
pub fn bullets(names: &[String], max_len: usize) -> Vec<String> {
    if names.is_empty() {
        return vec!["_None_".to_string()];
    }
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0;
    for name in names {
        let line = format!("• {name}");
        let line_len = line.chars().count();
        let sep = usize::from(!buf.is_empty());
        if !buf.is_empty() && buf_len + sep + line_len > max_len {
            chunks.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        if !buf.is_empty() {
            buf.push('\n');
            buf_len += 1;
        }
        buf.push_str(&line);
        buf_len += line_len;
    }
    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

impl ScanReport {
    /// Lay out a report.
    ///
    /// Groups are ordered by member count (descending) and then by name;
    /// players without a group come last. Long groups continue in
    /// "(cont.)" fields, and the whole report stops at [`MAX_FIELDS`].
    pub fn build(
        title_prefix: &str,
        world: Option<String>,
        total: usize,
        groups: HashMap<String, Vec<String>>,
        no_group: Vec<String>,
        unresolved: usize,
    ) -> Self {
        let mut groups: Vec<(String, Vec<String>)> = groups.into_iter().collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        let mut fields = Vec::new();
        'groups: for (group, members) in &groups {
            for (i, part) in bullets(members, MAX_FIELD_LEN).into_iter().enumerate() {
                if fields.len() >= MAX_FIELDS {
                    break 'groups;
                }
                let name = if i == 0 {
                    format!("{group} ({})", members.len())
                } else {
                    format!("{group} (cont.)")
                };
                fields.push(ReportField { name, value: part });
            }
        }

        if !no_group.is_empty() {
            for (i, part) in bullets(&no_group, MAX_FIELD_LEN).into_iter().enumerate() {
                if fields.len() >= MAX_FIELDS {
                    break;
                }
                let name = if i == 0 {
                    NO_GROUP_FIELD.to_string()
                } else {
                    format!("{NO_GROUP_FIELD} (cont.)")
                };
                fields.push(ReportField { name, value: part });
            }
        }

        let plural = if total == 1 { "" } else { "s" };
        let title = format!(
            "{title_prefix} - {total} Player{plural} in {}",
            world.as_deref().unwrap_or("Unknown")
        );

        Self {
            title,
            world,
            total,
            fields,
            unresolved,
            generated_at: Utc::now(),
        }
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for field in &self.fields {
            write!(f, "\n{}\n{}", field.name, field.value)?;
        }
        if self.unresolved > 0 {
            write!(f, "\n({} unresolved)", self.unresolved)?;
        }
        Ok(())
    }
}
