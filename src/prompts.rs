//! Prompt text for the gap analysis and exam generation request.
//!
//! Only the grade is a parameter. The exam composition paragraph is written
//! from [`ExamBlueprint::STANDARD`] so the numbers the model is asked for are
//! the numbers the response is checked against.

use crate::grade::GradeLevel;
use crate::schema::ExamBlueprint;
use std::fmt::Write as _;

/// Build the full instruction text for `grade`.
pub fn analysis_prompt(grade: &GradeLevel) -> String {
    let grade = grade.label();
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(
        "你是一位扎根江苏多年的数学特级教师，熟悉《义务教育数学课程标准》以及\
**江苏凤凰教育出版社（苏教版）数学教材**的全部单元编排与知识要求。\n\n",
    );
    prompt.push_str("请阅读随附的题目图片（可能来自多份 PDF），依次完成以下任务：\n\n");

    let _ = write!(
        prompt,
        "1. **知识点识别**：识别图片中的每一道数学题，归纳其在苏教版教材中对应的具体知识点。\n\
         2. **大纲比对**：\n\
         \x20  - 以苏教版数学教材中「{grade}」的教学要求为准；\n\
         \x20  - 对照图片中题目覆盖的内容；\n\
         \x20  - 找出该学生在「{grade}」阶段尚未练习或练习不足的核心知识模块，记为“遗漏知识点”。\n\
         3. **生成查漏补缺卷**：\n\
         \x20  - 围绕“遗漏知识点”设计一套全新的「{grade}」提优试卷，题目优先考查遗漏知识点；\n\
         \x20  - 试卷结构：{composition}；\n\
         \x20  - 难度贴近江苏省各市（南京、苏州、无锡等）期末真题；\n\
         \x20  - 每道题都必须给出答案和详尽解析，写清苏教版的典型解题思路与步骤。\n\n",
        composition = composition(&ExamBlueprint::STANDARD),
    );

    prompt.push_str(
        "输出要求：\n\
         - 只输出一个严格符合约定结构的 JSON 对象，不要输出任何额外文字；\n\
         - 选择题的 type 为 \"choice\" 且必须提供 options 数组（不含 A/B/C/D 前缀）；\
填空题的 type 为 \"blank\"；应用题的 type 为 \"application\"；\n\
         - 每道题的 id 在整张试卷内唯一；\n\
         - exam.totalPoints 必须等于所有题目 points 之和。\n",
    );

    prompt
}

/// "5道选择题（每题4分，共20分）、…，满分100分"
fn composition(blueprint: &ExamBlueprint) -> String {
    let parts: Vec<String> = blueprint
        .sections
        .iter()
        .map(|s| {
            format!(
                "{}道{}（每题{}分，共{}分）",
                s.count,
                s.title,
                s.points_each,
                s.total_points()
            )
        })
        .collect();
    format!("{}，满分{}分", parts.join("、"), blueprint.total_points())
}
