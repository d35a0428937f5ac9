//! The structured-output contract and the fixed exam blueprint.
//!
//! The response schema lives in `schema/analysis_result.v1.json` so every
//! backend (and any non-Rust consumer) reads the same document. It is
//! embedded at compile time and parsed once.
//!
//! [`ExamBlueprint`] is the exam layout the prompt asks for. The same
//! constant is used to check the model's answer afterwards, since nothing
//! in the schema can force "exactly five choice questions".

use crate::model::{ExamPaper, QuestionKind};
use once_cell::sync::Lazy;
use serde_json::Value;

/// Version tag of the embedded response schema.
pub const SCHEMA_VERSION: &str = "v1";

const SCHEMA_SOURCE: &str = include_str!("../schema/analysis_result.v1.json");

static RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(SCHEMA_SOURCE).unwrap_or_else(|e| {
        // The file is embedded at compile time; a parse failure is a build defect.
        panic!("schema/analysis_result.v1.json is not valid JSON: {e}")
    })
});

/// The response schema, in the OpenAPI subset Gemini accepts.
pub fn response_schema() -> &'static Value {
    &RESPONSE_SCHEMA
}

/// Layout of one exam section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionPlan {
    pub kind: QuestionKind,
    /// Section name as printed on the paper.
    pub title: &'static str,
    pub count: usize,
    pub points_each: f64,
}

impl SectionPlan {
    pub fn total_points(&self) -> f64 {
        self.count as f64 * self.points_each
    }
}

/// Fixed composition of a generated exam paper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamBlueprint {
    pub sections: [SectionPlan; 3],
}

impl ExamBlueprint {
    /// 5 choice × 4 + 5 fill-in-blank × 4 + 6 application × 10 = 100.
    pub const STANDARD: ExamBlueprint = ExamBlueprint {
        sections: [
            SectionPlan {
                kind: QuestionKind::Choice,
                title: "选择题",
                count: 5,
                points_each: 4.0,
            },
            SectionPlan {
                kind: QuestionKind::Blank,
                title: "填空题",
                count: 5,
                points_each: 4.0,
            },
            SectionPlan {
                kind: QuestionKind::Application,
                title: "应用题",
                count: 6,
                points_each: 10.0,
            },
        ],
    };

    pub fn total_points(&self) -> f64 {
        self.sections.iter().map(SectionPlan::total_points).sum()
    }

    pub fn section(&self, kind: QuestionKind) -> Option<&SectionPlan> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Every way `paper` departs from this blueprint, as readable strings.
    ///
    /// Empty when the paper matches.
    pub fn deviations(&self, paper: &ExamPaper) -> Vec<String> {
        let mut out = Vec::new();

        for (kind, questions) in paper.sections.in_order() {
            let Some(spec) = self.section(kind) else {
                continue;
            };
            let name = kind.as_str();

            if questions.len() != spec.count {
                out.push(format!(
                    "{name}: expected {} questions, got {}",
                    spec.count,
                    questions.len()
                ));
            }

            for q in questions {
                if q.kind != kind {
                    out.push(format!(
                        "{name}: question '{}' has type '{}'",
                        q.id,
                        q.kind.as_str()
                    ));
                }
                if !points_eq(q.points, spec.points_each) {
                    out.push(format!(
                        "{name}: question '{}' is worth {} points, expected {}",
                        q.id, q.points, spec.points_each
                    ));
                }
                let option_count = q.options.as_ref().map_or(0, Vec::len);
                if kind == QuestionKind::Choice && option_count < 2 {
                    out.push(format!("{name}: question '{}' has no answer options", q.id));
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for q in paper.sections.questions() {
            if !seen.insert(q.id.as_str()) {
                out.push(format!("question id '{}' is used more than once", q.id));
            }
        }

        let sum = paper.points_sum();
        if !points_eq(paper.total_points, sum) {
            out.push(format!(
                "totalPoints is {} but the questions add up to {}",
                paper.total_points, sum
            ));
        }
        if !points_eq(paper.total_points, self.total_points()) {
            out.push(format!(
                "totalPoints is {}, expected {}",
                paper.total_points,
                self.total_points()
            ));
        }

        out
    }
}

fn points_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
