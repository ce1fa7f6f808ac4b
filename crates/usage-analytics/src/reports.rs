//! Rendering of adoption tables as JSON records, markdown, or console text.

use crate::aggregations::AdoptionTable;
use usage_core::error::Result;
use usage_core::source::parse_date;

/// Report generator for adoption tables.
pub struct ReportGenerator;

impl ReportGenerator {
    /// One array of records per table, in the public column layout.
    pub fn json(tables: &[AdoptionTable]) -> serde_json::Value {
        serde_json::Value::Array(
            tables
                .iter()
                .map(|table| serde_json::Value::Array(table.to_records()))
                .collect(),
        )
    }

    /// Generate a markdown report covering every table.
    pub fn markdown(tables: &[AdoptionTable], reference_date: &str, period: u32) -> Result<String> {
        let date = parse_date(reference_date)?;
        let mut report = String::new();

        report.push_str(&format!(
            "# Privacy Feature Adoption\n\n**{}** (trailing {} days)\n\n",
            date.format("%B %d, %Y"),
            period
        ));

        for table in tables {
            report.push_str(&format!("## {}\n\n", table.column));
            if table.is_empty() {
                report.push_str("No active clients in window.\n\n");
                continue;
            }
            report.push_str(&format!("| Country | {} |\n", table.column));
            report.push_str("|---------|-------:|\n");
            for row in table.sorted() {
                report.push_str(&format!("| {} | {} |\n", row.country, format_pct(row.pct)));
            }
            report.push('\n');
        }

        Ok(report)
    }

    /// Compact summary for the terminal.
    pub fn text_summary(tables: &[AdoptionTable]) -> String {
        let mut output = String::new();

        for table in tables {
            if table.is_empty() {
                output.push_str(&format!("  {}: no activity\n", table.column));
                continue;
            }
            for row in table.sorted() {
                output.push_str(&format!(
                    "  {:<8} {:<4} {:>6}  ({})\n",
                    table.column,
                    row.country,
                    format_pct(row.pct),
                    row.submission_date
                ));
            }
        }

        output
    }
}

/// Format a percentage with one decimal place.
pub fn format_pct(pct: f64) -> String {
    format!("{:.1}%", pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::AdoptionRow;

    fn table(column: &str, rows: &[(&str, f64)]) -> AdoptionTable {
        AdoptionTable {
            column: column.into(),
            rows: rows
                .iter()
                .map(|(country, pct)| AdoptionRow {
                    submission_date: "20180201".into(),
                    country: country.to_string(),
                    pct: *pct,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.0), "0.0%");
        assert_eq!(format_pct(25.0), "25.0%");
        assert_eq!(format_pct(100.0 / 3.0), "33.3%");
        assert_eq!(format_pct(100.0), "100.0%");
    }

    #[test]
    fn test_json_report() {
        let tables = vec![
            table("pct_TP", &[("All", 50.0)]),
            table("pct_ETP", &[("DE", 0.0), ("All", 25.0)]),
        ];
        let json = ReportGenerator::json(&tables);
        assert_eq!(
            json,
            serde_json::json!([
                [{"submission_date_s3": "20180201", "country": "All", "pct_TP": 50.0}],
                [
                    {"submission_date_s3": "20180201", "country": "All", "pct_ETP": 25.0},
                    {"submission_date_s3": "20180201", "country": "DE", "pct_ETP": 0.0}
                ]
            ])
        );
    }

    #[test]
    fn test_markdown_report_structure() {
        let tables = vec![
            table("pct_TP", &[("US", 100.0), ("All", 50.0)]),
            table("pct_ETP", &[]),
        ];
        let report = ReportGenerator::markdown(&tables, "20180201", 7).unwrap();
        assert!(report.contains("# Privacy Feature Adoption"));
        assert!(report.contains("February 01, 2018"));
        assert!(report.contains("trailing 7 days"));
        assert!(report.contains("## pct_TP"));
        assert!(report.contains("| Country | pct_TP |"));
        assert!(report.contains("No active clients in window."));

        let all = report.find("| All | 50.0% |").unwrap();
        let us = report.find("| US | 100.0% |").unwrap();
        assert!(all < us);
    }

    #[test]
    fn test_markdown_rejects_bad_date() {
        assert!(ReportGenerator::markdown(&[], "not-a-date", 7).is_err());
    }

    #[test]
    fn test_text_summary() {
        let tables = vec![
            table("pct_ETP", &[("All", 25.0), ("DE", 0.0)]),
            table("pct_TP", &[]),
        ];
        let summary = ReportGenerator::text_summary(&tables);
        assert!(summary.contains("25.0%"));
        assert!(summary.contains("DE"));
        assert!(summary.contains("pct_TP: no activity"));
    }
}
