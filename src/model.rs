//! Data model shared by the pipeline, the model client, and the renderers.
//!
//! The serde field names mirror the JSON contract in
//! `schema/analysis_result.v1.json` (camelCase, `type` for the question
//! kind), so a model response deserialises straight into [`AnalysisResult`].

use serde::{Deserialize, Serialize};

/// MIME type of every [`PageImage`] payload.
pub const PAGE_IMAGE_MIME: &str = "image/jpeg";

/// One rasterised page, JPEG-encoded and base64-wrapped for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number within the source document.
    pub page_number: usize,
    /// 0-indexed position of the source document in the batch.
    pub document_index: usize,
    /// 0-indexed position of this image in the whole batch.
    pub batch_index: usize,
    pub width: u32,
    pub height: u32,
    /// Base64 JPEG bytes, without a `data:` URI prefix.
    pub data: String,
}

impl PageImage {
    pub fn mime_type(&self) -> &'static str {
        PAGE_IMAGE_MIME
    }

    pub(crate) fn placed(mut self, document_index: usize, batch_index: usize) -> Self {
        self.document_index = document_index;
        self.batch_index = batch_index;
        self
    }
}

/// Coverage-gap analysis of the supplied exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeAnalysis {
    pub covered_points: Vec<String>,
    pub missing_points: Vec<String>,
    pub summary: String,
}

/// The three question kinds of an exam paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[serde(alias = "Choice", alias = "CHOICE")]
    Choice,
    #[serde(alias = "Blank", alias = "BLANK")]
    Blank,
    #[serde(alias = "Application", alias = "APPLICATION")]
    Application,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Choice => "choice",
            QuestionKind::Blank => "blank",
            QuestionKind::Application => "application",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub content: String,
    /// Answer options, only for [`QuestionKind::Choice`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub explanation: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSections {
    pub choices: Vec<Question>,
    pub blanks: Vec<Question>,
    pub applications: Vec<Question>,
}

impl ExamSections {
    /// Sections in print order, paired with the kind each should contain.
    pub fn in_order(&self) -> [(QuestionKind, &[Question]); 3] {
        [
            (QuestionKind::Choice, self.choices.as_slice()),
            (QuestionKind::Blank, self.blanks.as_slice()),
            (QuestionKind::Application, self.applications.as_slice()),
        ]
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.choices
            .iter()
            .chain(self.blanks.iter())
            .chain(self.applications.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPaper {
    pub title: String,
    pub grade: String,
    pub total_points: f64,
    pub sections: ExamSections,
}

impl ExamPaper {
    /// Sum of the points of every question in the paper.
    pub fn points_sum(&self) -> f64 {
        self.sections.questions().map(|q| q.points).sum()
    }
}

/// The single artifact produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: KnowledgeAnalysis,
    pub exam: ExamPaper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_uses_type_field_and_optional_options() {
        let q: Question = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "type": "blank",
            "content": "3 × ___ = 12",
            "answer": "4",
            "explanation": "12 ÷ 3 = 4",
            "points": 4
        }))
        .expect("valid question");
        assert_eq!(q.kind, QuestionKind::Blank);
        assert!(q.options.is_none());

        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "blank");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let r: Result<Question, _> = serde_json::from_value(serde_json::json!({
            "id": "x", "type": "essay", "content": "", "answer": "",
            "explanation": "", "points": 1
        }));
        assert!(r.is_err());
    }

    #[test]
    fn capitalised_kinds_are_accepted() {
        for (raw, kind) in [
            ("Choice", QuestionKind::Choice),
            ("BLANK", QuestionKind::Blank),
            ("Application", QuestionKind::Application),
        ] {
            let k: QuestionKind = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(k, kind);
            assert_eq!(serde_json::to_value(k).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn page_image_placement() {
        let img = PageImage {
            page_number: 2,
            document_index: 0,
            batch_index: 0,
            width: 10,
            height: 10,
            data: String::new(),
        }
        .placed(3, 7);
        assert_eq!((img.document_index, img.batch_index, img.page_number), (3, 7, 2));
        assert_eq!(img.mime_type(), "image/jpeg");
    }
}
