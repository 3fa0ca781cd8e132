use crate::grade::{round_half_up, GradeScale, NOT_APPLICABLE};
use crate::record::AssessmentRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: String,
    pub label: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: usize,
    pub average_percentage: i64,
    pub average_grade: String,
    pub modal_grade: String,
    pub highest_percentage: Option<i64>,
    pub lowest_percentage: Option<i64>,
    pub distribution: Vec<GradeCount>,
}

pub fn count(records: &[AssessmentRecord]) -> usize {
    records.len()
}

/// `round(sum / count)`, 0 for an empty list.
pub fn average_percentage(records: &[AssessmentRecord]) -> i64 {
    if records.is_empty() {
        return 0;
    }
    let sum: i64 = records.iter().map(|r| r.percentage).sum();
    round_half_up(sum as f64 / records.len() as f64)
}

pub fn average_grade(records: &[AssessmentRecord], scale: &GradeScale) -> String {
    if records.is_empty() {
        return NOT_APPLICABLE.to_string();
    }
    scale.classify(average_percentage(records)).to_string()
}

/// Occurrences per grade, scale grades first in scale order, then any grade
/// the scale does not know in first-seen order.
fn tally(records: &[AssessmentRecord], scale: &GradeScale) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = scale
        .tiers()
        .iter()
        .map(|t| (t.grade.clone(), 0))
        .collect();
    for r in records {
        match out.iter_mut().find(|(g, _)| *g == r.grade) {
            Some((_, n)) => *n += 1,
            None => out.push((r.grade.clone(), 1)),
        }
    }
    out
}

/// Most frequent grade. Ties go to the grade listed first by [`tally`], i.e.
/// the best tier.
pub fn modal_grade(records: &[AssessmentRecord], scale: &GradeScale) -> String {
    let mut best: Option<(String, usize)> = None;
    for (grade, n) in tally(records, scale) {
        if n > best.as_ref().map(|(_, m)| *m).unwrap_or(0) {
            best = Some((grade, n));
        }
    }
    best.map(|(g, _)| g)
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

pub fn distribution(records: &[AssessmentRecord], scale: &GradeScale) -> Vec<GradeCount> {
    tally(records, scale)
        .into_iter()
        .map(|(grade, count)| GradeCount {
            label: scale.tier_of(&grade).map(|t| t.label.clone()),
            grade,
            count,
        })
        .collect()
}

pub fn summarize(records: &[AssessmentRecord], scale: &GradeScale) -> Summary {
    Summary {
        count: count(records),
        average_percentage: average_percentage(records),
        average_grade: average_grade(records, scale),
        modal_grade: modal_grade(records, scale),
        highest_percentage: records.iter().map(|r| r.percentage).max(),
        lowest_percentage: records.iter().map(|r| r.percentage).min(),
        distribution: distribution(records, scale),
    }
}
