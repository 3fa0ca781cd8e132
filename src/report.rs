//! Report models, printable text and the delimited export.

use crate::error::{GradebookError, Result};
use crate::grade::GradeScale;
use crate::record::AssessmentRecord;
use crate::store::newest_first;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

pub const CSV_HEADER: &str =
    "Student Name,Subject,Score,Max Score,Percentage,Grade,Assessment Type,Date,Comments";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub index: usize,
    pub id: i64,
    pub student_name: String,
    pub grade: String,
    pub grade_color: String,
    pub subject: String,
    pub assessment_type: String,
    pub score_text: String,
    pub date: String,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub lines: Vec<ReportLine>,
}

/// Integral values print without a fractional part, like the browser app.
pub fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

/// Newest first, numbered from 1.
pub fn build_report(
    records: &[AssessmentRecord],
    scale: &GradeScale,
    generated_at: DateTime<Utc>,
) -> Result<Report> {
    if records.is_empty() {
        return Err(GradebookError::validation(
            "assessments",
            "No assessments to generate report",
        ));
    }
    let lines = newest_first(records)
        .into_iter()
        .enumerate()
        .map(|(i, r)| ReportLine {
            index: i + 1,
            id: r.id,
            student_name: r.student_name.clone(),
            grade: r.grade.clone(),
            grade_color: scale.color_of(&r.grade).to_string(),
            subject: r.subject.clone(),
            assessment_type: r.assessment_type.clone(),
            score_text: format!(
                "{}/{} ({}%)",
                format_number(r.raw_score),
                format_number(r.max_score),
                r.percentage
            ),
            date: r.created_at.format("%d %b %Y, %H:%M").to_string(),
            comments: r.has_comments().then(|| r.comments.clone()),
        })
        .collect();
    Ok(Report {
        generated_at,
        total: records.len(),
        lines,
    })
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Teacher Assessment Report");
    let _ = writeln!(
        out,
        "Generated on {}",
        report.generated_at.format("%d/%m/%Y, %H:%M:%S")
    );
    let _ = writeln!(out, "Total Assessments: {}", report.total);
    for line in &report.lines {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}. {} [Grade {}]",
            line.index, line.student_name, line.grade
        );
        let _ = writeln!(out, "   Subject: {}", line.subject);
        let _ = writeln!(out, "   Type: {}", line.assessment_type);
        let _ = writeln!(out, "   Score: {}", line.score_text);
        let _ = writeln!(out, "   Date: {}", line.date);
        if let Some(c) = &line.comments {
            let _ = writeln!(out, "   Comments: {c}");
        }
    }
    out
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// One row per record in insertion order. Text columns are always quoted with
/// embedded quotes doubled; score, max, percentage and grade are written bare.
pub fn to_tabular(records: &[AssessmentRecord]) -> Result<String> {
    if records.is_empty() {
        return Err(GradebookError::validation(
            "assessments",
            "No assessments to export",
        ));
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(CSV_HEADER.as_bytes());
    buf.push(b'\n');

    let mut w = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf);
    for r in records {
        w.write_record([
            quoted(&r.student_name),
            quoted(&r.subject),
            format_number(r.raw_score),
            format_number(r.max_score),
            format!("{}%", r.percentage),
            r.grade.clone(),
            quoted(&r.assessment_type),
            quoted(&r.created_at.format("%d/%m/%Y").to_string()),
            quoted(&r.comments),
        ])
        .map_err(|e| GradebookError::Export(e.to_string()))?;
    }
    let bytes = w
        .into_inner()
        .map_err(|e| GradebookError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GradebookError::Export(e.to_string()))
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("teacher_assessments_{}.csv", today.format("%Y-%m-%d"))
}

pub fn write_export(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write export {}", path.to_string_lossy()))?;
    Ok(())
}
