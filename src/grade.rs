use crate::error::{GradebookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Grade returned when no tier matches. Unreachable with a validated scale.
pub const FAIL_GRADE: &str = "F";
/// Grade reported for aggregates over an empty store.
pub const NOT_APPLICABLE: &str = "N/A";
pub const NEUTRAL_COLOR: &str = "#f8f9fa";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeTier {
    #[serde(rename = "min")]
    pub min_percentage: i64,
    #[serde(rename = "max")]
    pub max_percentage: i64,
    pub grade: String,
    pub label: String,
    #[serde(rename = "color")]
    pub display_color: String,
    #[serde(rename = "bg")]
    pub background_color: String,
}

impl GradeTier {
    fn new(min: i64, max: i64, grade: &str, label: &str, color: &str, bg: &str) -> Self {
        Self {
            min_percentage: min,
            max_percentage: max,
            grade: grade.to_string(),
            label: label.to_string(),
            display_color: color.to_string(),
            background_color: bg.to_string(),
        }
    }

    pub fn range_text(&self) -> String {
        format!("{}-{}", self.min_percentage, self.max_percentage)
    }
}

/// Ordered tier list, highest minimum first.
///
/// Construction checks that the tiers partition `[0, 100]` so that
/// [`GradeScale::classify`] assigns every percentage to exactly one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradeTier>", into = "Vec<GradeTier>")]
pub struct GradeScale {
    tiers: Vec<GradeTier>,
}

impl GradeScale {
    pub fn new(mut tiers: Vec<GradeTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(GradebookError::validation(
                "gradeScale",
                "grade scale must have at least one tier",
            ));
        }
        tiers.sort_by(|a, b| b.min_percentage.cmp(&a.min_percentage));

        let mut codes = HashSet::new();
        for t in &tiers {
            if t.grade.trim().is_empty() {
                return Err(GradebookError::validation(
                    "gradeScale",
                    "grade code must not be empty",
                ));
            }
            if !codes.insert(t.grade.as_str()) {
                return Err(GradebookError::validation(
                    "gradeScale",
                    format!("duplicate grade code {}", t.grade),
                ));
            }
            if t.min_percentage > t.max_percentage {
                return Err(GradebookError::validation(
                    "gradeScale",
                    format!("tier {} has min above max", t.grade),
                ));
            }
        }

        if tiers[0].max_percentage != 100 {
            return Err(GradebookError::validation(
                "gradeScale",
                "top tier must end at 100",
            ));
        }
        if tiers[tiers.len() - 1].min_percentage != 0 {
            return Err(GradebookError::validation(
                "gradeScale",
                "bottom tier must start at 0",
            ));
        }
        for pair in tiers.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if lower.max_percentage + 1 != upper.min_percentage {
                return Err(GradebookError::validation(
                    "gradeScale",
                    format!(
                        "tiers {} and {} leave a gap or overlap",
                        upper.grade, lower.grade
                    ),
                ));
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[GradeTier] {
        &self.tiers
    }

    /// First tier (highest minimum first) whose minimum is at or below the
    /// percentage. Input is clamped to `[0, 100]`.
    pub fn classify(&self, percentage: i64) -> &str {
        let p = percentage.clamp(0, 100);
        self.tiers
            .iter()
            .find(|t| p >= t.min_percentage)
            .map(|t| t.grade.as_str())
            .unwrap_or(FAIL_GRADE)
    }

    pub fn tier_of(&self, grade: &str) -> Option<&GradeTier> {
        self.tiers.iter().find(|t| t.grade == grade)
    }

    pub fn color_of(&self, grade: &str) -> &str {
        self.tier_of(grade)
            .map(|t| t.background_color.as_str())
            .unwrap_or(NEUTRAL_COLOR)
    }

    pub fn preview(&self, score: f64, max_score: f64) -> Result<GradePreview> {
        if !score.is_finite() || score < 0.0 {
            return Err(GradebookError::validation("score", "Please enter a valid score"));
        }
        if !max_score.is_finite() || max_score <= 0.0 {
            return Err(GradebookError::validation(
                "maxScore",
                "Please enter a valid maximum score",
            ));
        }
        let percentage = percentage_of(score, max_score);
        let grade = self.classify(percentage).to_string();
        let tier = self.tier_of(&grade);
        Ok(GradePreview {
            percentage,
            color: self.color_of(&grade).to_string(),
            label: tier.map(|t| t.label.clone()),
            range: tier.map(|t| t.range_text()),
            grade,
        })
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        Self {
            tiers: vec![
                GradeTier::new(90, 100, "1", "Excellent", "#2E7D32", "#4CAF50"),
                GradeTier::new(80, 89, "2", "Very Good", "#388E3C", "#66BB6A"),
                GradeTier::new(70, 79, "3", "Good", "#43A047", "#81C784"),
                GradeTier::new(60, 69, "4", "Credit", "#7CB342", "#9CCC65"),
                GradeTier::new(55, 59, "5", "Credit", "#C0CA33", "#D4E157"),
                GradeTier::new(50, 54, "6", "Credit", "#FBC02D", "#FFEE58"),
                GradeTier::new(40, 49, "7", "Pass", "#FFA726", "#FFB74D"),
                GradeTier::new(35, 39, "8", "Pass", "#FF7043", "#FF8A65"),
                GradeTier::new(0, 34, "9", "Fail", "#D32F2F", "#EF5350"),
            ],
        }
    }
}

impl TryFrom<Vec<GradeTier>> for GradeScale {
    type Error = GradebookError;

    fn try_from(tiers: Vec<GradeTier>) -> Result<Self> {
        GradeScale::new(tiers)
    }
}

impl From<GradeScale> for Vec<GradeTier> {
    fn from(scale: GradeScale) -> Self {
        scale.tiers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePreview {
    pub percentage: i64,
    pub grade: String,
    pub color: String,
    pub label: Option<String>,
    pub range: Option<String>,
}

/// Rounds half up, matching the browser app's `Math.round`.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub fn percentage_of(score: f64, max_score: f64) -> i64 {
    round_half_up(score / max_score * 100.0)
}
