use crate::error::{GradebookError, Result};
use crate::grade::{percentage_of, GradeScale};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_COMMENTS: &str = "No comments";
pub const DEFAULT_ASSESSMENT_TYPE: &str = "Class Exercise";

/// One scored assessment for one student.
///
/// `percentage` and `grade` are derived from the scores at construction and
/// are never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub id: i64,
    pub student_name: String,
    pub subject: String,
    #[serde(rename = "score")]
    pub raw_score: f64,
    pub max_score: f64,
    pub percentage: i64,
    pub grade: String,
    pub assessment_type: String,
    #[serde(default = "default_comments")]
    pub comments: String,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
}

fn default_comments() -> String {
    NO_COMMENTS.to_string()
}

impl AssessmentRecord {
    pub fn build(
        id: i64,
        input: &RecordInput,
        scale: &GradeScale,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let v = input.validate()?;
        let percentage = percentage_of(v.score, v.max_score);
        Ok(Self {
            id,
            student_name: v.student_name,
            subject: v.subject,
            raw_score: v.score,
            max_score: v.max_score,
            percentage,
            grade: scale.classify(percentage).to_string(),
            assessment_type: v.assessment_type,
            comments: v.comments,
            created_at,
        })
    }

    pub fn has_comments(&self) -> bool {
        self.comments != NO_COMMENTS
    }
}

/// Score fields arrive from form inputs as either JSON numbers or text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            NumberField::Number(n) => *n,
            NumberField::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

/// Raw field values as collected by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub subject: String,
    pub score: Option<NumberField>,
    pub max_score: Option<NumberField>,
    #[serde(default)]
    pub assessment_type: String,
    #[serde(default)]
    pub comments: String,
    #[serde(skip)]
    pub default_max_score: Option<f64>,
}

struct ValidInput {
    student_name: String,
    subject: String,
    score: f64,
    max_score: f64,
    assessment_type: String,
    comments: String,
}

impl RecordInput {
    pub fn from_params(params: &serde_json::Value, default_max_score: f64) -> Result<Self> {
        let mut input: RecordInput = serde_json::from_value(params.clone())
            .map_err(|e| GradebookError::validation("params", e.to_string()))?;
        input.default_max_score = Some(default_max_score);
        Ok(input)
    }

    fn validate(&self) -> Result<ValidInput> {
        let student_name = self.student_name.trim();
        if student_name.is_empty() {
            return Err(GradebookError::validation(
                "studentName",
                "Please enter student name",
            ));
        }
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(GradebookError::validation(
                "subject",
                "Please select a subject",
            ));
        }
        let score = match self.score.as_ref().and_then(NumberField::value) {
            Some(s) if s >= 0.0 => s,
            _ => {
                return Err(GradebookError::validation(
                    "score",
                    "Please enter a valid score",
                ))
            }
        };
        let max_score = match &self.max_score {
            Some(field) => field.value(),
            None => self.default_max_score,
        };
        let max_score = match max_score {
            Some(m) if m > 0.0 => m,
            _ => {
                return Err(GradebookError::validation(
                    "maxScore",
                    "Please enter a valid maximum score",
                ))
            }
        };
        if score > max_score {
            return Err(GradebookError::validation(
                "score",
                "Score cannot be greater than maximum score",
            ));
        }

        let assessment_type = match self.assessment_type.trim() {
            "" => DEFAULT_ASSESSMENT_TYPE.to_string(),
            t => t.to_string(),
        };
        let comments = match self.comments.trim() {
            "" => NO_COMMENTS.to_string(),
            c => c.to_string(),
        };

        Ok(ValidInput {
            student_name: student_name.to_string(),
            subject: subject.to_string(),
            score,
            max_score,
            assessment_type,
            comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(params: serde_json::Value) -> RecordInput {
        RecordInput::from_params(&params, 100.0).expect("params")
    }

    fn field_of(e: GradebookError) -> &'static str {
        match e {
            GradebookError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn derives_percentage_and_grade() {
        let i = input(json!({
            "studentName": "  Ama Boateng ",
            "subject": "Mathematics",
            "score": 41,
            "maxScore": 50,
            "assessmentType": "Class Test"
        }));
        let r = AssessmentRecord::build(7, &i, &GradeScale::default(), Utc::now()).expect("build");
        assert_eq!(r.student_name, "Ama Boateng");
        assert_eq!(r.percentage, 82);
        assert_eq!(r.grade, "2");
        assert_eq!(r.comments, NO_COMMENTS);
        assert!(!r.has_comments());
    }

    #[test]
    fn accepts_text_scores_and_default_max() {
        let i = input(json!({
            "studentName": "Kofi",
            "subject": "English Language",
            "score": " 67.5 "
        }));
        let r = AssessmentRecord::build(1, &i, &GradeScale::default(), Utc::now()).expect("build");
        assert_eq!(r.max_score, 100.0);
        assert_eq!(r.percentage, 68);
        assert_eq!(r.assessment_type, DEFAULT_ASSESSMENT_TYPE);
    }

    #[test]
    fn rejects_bad_fields_in_form_order() {
        let scale = GradeScale::default();
        let cases = [
            (json!({ "subject": "Maths", "score": 1 }), "studentName"),
            (json!({ "studentName": "A", "score": 1 }), "subject"),
            (json!({ "studentName": "A", "subject": "S", "score": "x" }), "score"),
            (json!({ "studentName": "A", "subject": "S", "score": -1 }), "score"),
            (
                json!({ "studentName": "A", "subject": "S", "score": 1, "maxScore": 0 }),
                "maxScore",
            ),
            (
                json!({ "studentName": "A", "subject": "S", "score": 11, "maxScore": 10 }),
                "score",
            ),
        ];
        for (params, field) in cases {
            let err = AssessmentRecord::build(1, &input(params.clone()), &scale, Utc::now())
                .expect_err("should reject");
            assert_eq!(field_of(err), field, "params {params}");
        }
    }

    #[test]
    fn text_numbers_must_parse_whole() {
        assert_eq!(NumberField::Text(" 12.5 ".into()).value(), Some(12.5));
        assert_eq!(NumberField::Text("12abc".into()).value(), None);
        assert_eq!(NumberField::Text("inf".into()).value(), None);
        assert_eq!(NumberField::Text("".into()).value(), None);
    }

    #[test]
    fn reads_records_without_comments_field() {
        let r: AssessmentRecord = serde_json::from_value(json!({
            "id": 1700000000000i64,
            "studentName": "Esi",
            "subject": "Social Studies",
            "score": 30,
            "maxScore": 40,
            "percentage": 75,
            "grade": "3",
            "assessmentType": "Homework",
            "date": "2025-01-10T09:30:00Z",
            "timestamp": 1700000000000i64
        }))
        .expect("record");
        assert_eq!(r.comments, NO_COMMENTS);
        assert_eq!(r.raw_score, 30.0);
    }
}
