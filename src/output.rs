//! Markdown renderings of an [`AnalysisResult`] and atomic file output.
//!
//! Sections are always printed in the same order (choices, blanks,
//! applications) and questions are numbered from 1 within each section.

use crate::error::GapExamError;
use crate::model::{AnalysisResult, ExamPaper, KnowledgeAnalysis, Question};
use crate::schema::ExamBlueprint;
use std::fmt::Write as _;
use std::path::Path;

/// Minutes printed in the exam header.
pub const EXAM_DURATION_MINUTES: u32 = 90;

const SECTION_NUMERALS: [&str; 3] = ["一", "二", "三"];

/// Which variant of the exam to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamView {
    /// Student copy: answers and explanations suppressed.
    #[default]
    Print,
    /// Answer key: every question followed by its answer and explanation.
    WithAnswers,
}

/// Render the exam paper as Markdown.
pub fn render_exam(paper: &ExamPaper, view: ExamView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", paper.title);
    let _ = writeln!(
        out,
        "适用年级：{}　　总分：{}分　　考试时间：{}分钟\n",
        paper.grade, paper.total_points, EXAM_DURATION_MINUTES
    );
    out.push_str("姓名：__________　　班级：__________　　得分：__________\n\n---\n\n");

    for (numeral, (kind, questions)) in SECTION_NUMERALS.iter().zip(paper.sections.in_order()) {
        let title = ExamBlueprint::STANDARD
            .section(kind)
            .map_or(kind.as_str(), |s| s.title);
        let _ = writeln!(
            out,
            "## {numeral}、{title} ({})\n",
            section_summary(questions)
        );
        for (i, q) in questions.iter().enumerate() {
            render_question(&mut out, i + 1, q, view);
        }
    }

    out.push_str("---\n\n*--- 试卷结束 ---*\n");
    out
}

/// "共5小题，每题4分，共20分", or without the per-question part when the
/// points differ between questions.
fn section_summary(questions: &[Question]) -> String {
    let total: f64 = questions.iter().map(|q| q.points).sum();
    match questions.first() {
        Some(first) if questions.iter().all(|q| q.points == first.points) => format!(
            "共{}小题，每题{}分，共{}分",
            questions.len(),
            first.points,
            total
        ),
        _ => format!("共{}小题，共{}分", questions.len(), total),
    }
}

fn render_question(out: &mut String, number: usize, q: &Question, view: ExamView) {
    let _ = writeln!(out, "**{number}.** {} （{}分）\n", q.content.trim(), q.points);

    if let Some(options) = &q.options {
        for (letter, opt) in ('A'..='Z').zip(options) {
            let _ = writeln!(out, "- {letter}. {}", opt.trim());
        }
        out.push('\n');
    }

    if view == ExamView::WithAnswers {
        let _ = writeln!(out, "> **答案：** {}", q.answer.trim());
        out.push_str(">\n");
        let mut label = Some("**解析：** ");
        for line in q.explanation.trim().lines() {
            if line.trim().is_empty() {
                out.push_str(">\n");
                continue;
            }
            let _ = writeln!(out, "> {}{line}", label.take().unwrap_or_default());
        }
        out.push('\n');
    }
}

/// Render the coverage analysis for `grade` as a Markdown dashboard.
pub fn render_analysis(analysis: &KnowledgeAnalysis, grade: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# 学情分析报告（{grade}）\n");

    let _ = writeln!(out, "## 样卷覆盖知识点\n");
    push_list(&mut out, &analysis.covered_points);

    let _ = writeln!(out, "## 大纲重点遗漏（针对性强化目标）\n");
    push_list(&mut out, &analysis.missing_points);

    let _ = writeln!(out, "## 特级教师评语\n");
    let _ = writeln!(out, "{}", analysis.summary.trim());
    out
}

fn push_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("- （无）\n\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {}", item.trim());
    }
    out.push('\n');
}

/// Serialise the whole result as pretty JSON, using the response field names.
pub fn render_json(result: &AnalysisResult) -> Result<String, GapExamError> {
    serde_json::to_string_pretty(result)
        .map_err(|e| GapExamError::Internal(format!("JSON serialisation: {e}")))
}

/// Write `contents` to `path` via a temporary sibling and a rename, so a
/// reader never sees a half-written file.
pub async fn write_atomic(path: impl AsRef<Path>, contents: &str) -> Result<(), GapExamError> {
    let path = path.as_ref();
    let fail = |source| GapExamError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}
