//! Grade levels: one school term within primary and lower-secondary school.
//!
//! A [`GradeLevel`] is only ever passed to the model as text (its
//! [`label`](GradeLevel::label)); no local logic depends on which term was
//! chosen.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// School year, primary 1 through junior 3 (grade 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchoolYear {
    Primary1,
    Primary2,
    Primary3,
    Primary4,
    Primary5,
    Primary6,
    Junior1,
    Junior2,
    Junior3,
}

impl SchoolYear {
    pub const ALL: [SchoolYear; 9] = [
        SchoolYear::Primary1,
        SchoolYear::Primary2,
        SchoolYear::Primary3,
        SchoolYear::Primary4,
        SchoolYear::Primary5,
        SchoolYear::Primary6,
        SchoolYear::Junior1,
        SchoolYear::Junior2,
        SchoolYear::Junior3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SchoolYear::Primary1 => "小学一年级",
            SchoolYear::Primary2 => "小学二年级",
            SchoolYear::Primary3 => "小学三年级",
            SchoolYear::Primary4 => "小学四年级",
            SchoolYear::Primary5 => "小学五年级",
            SchoolYear::Primary6 => "小学六年级",
            SchoolYear::Junior1 => "初中一年级（七年级）",
            SchoolYear::Junior2 => "初中二年级（八年级）",
            SchoolYear::Junior3 => "初中三年级（九年级）",
        }
    }

    fn code(self) -> &'static str {
        match self {
            SchoolYear::Primary1 => "p1",
            SchoolYear::Primary2 => "p2",
            SchoolYear::Primary3 => "p3",
            SchoolYear::Primary4 => "p4",
            SchoolYear::Primary5 => "p5",
            SchoolYear::Primary6 => "p6",
            SchoolYear::Junior1 => "j1",
            SchoolYear::Junior2 => "j2",
            SchoolYear::Junior3 => "j3",
        }
    }
}

/// First (autumn) or second (spring) term of a school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub fn label(self) -> &'static str {
        match self {
            Term::First => "上学期",
            Term::Second => "下学期",
        }
    }
}

/// One academic term, e.g. "小学五年级 上学期".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GradeLevel {
    pub year: SchoolYear,
    pub term: Term,
}

impl GradeLevel {
    pub const fn new(year: SchoolYear, term: Term) -> Self {
        Self { year, term }
    }

    /// All 18 terms, in school order.
    pub fn all() -> impl Iterator<Item = GradeLevel> {
        SchoolYear::ALL.into_iter().flat_map(|year| {
            [Term::First, Term::Second]
                .into_iter()
                .map(move |term| GradeLevel::new(year, term))
        })
    }

    /// Human-readable label, as sent to the model.
    pub fn label(&self) -> String {
        format!("{} {}", self.year.label(), self.term.label())
    }

    /// Short code accepted by [`FromStr`], e.g. `p5-1`.
    pub fn code(&self) -> String {
        let term = match self.term {
            Term::First => 1,
            Term::Second => 2,
        };
        format!("{}-{}", self.year.code(), term)
    }
}

impl Default for GradeLevel {
    fn default() -> Self {
        GradeLevel::new(SchoolYear::Primary5, Term::First)
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    /// Parse `p1-1` … `p6-2` (primary) and `j1-1` … `j3-2` (junior).
    /// `g7`–`g9` are accepted as aliases for `j1`–`j3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (year, term) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid grade '{s}': expected e.g. p5-1 or j2-2"))?;

        let year = match year {
            "p1" => SchoolYear::Primary1,
            "p2" => SchoolYear::Primary2,
            "p3" => SchoolYear::Primary3,
            "p4" => SchoolYear::Primary4,
            "p5" => SchoolYear::Primary5,
            "p6" => SchoolYear::Primary6,
            "j1" | "g7" => SchoolYear::Junior1,
            "j2" | "g8" => SchoolYear::Junior2,
            "j3" | "g9" => SchoolYear::Junior3,
            other => return Err(format!("unknown school year '{other}'")),
        };
        let term = match term {
            "1" => Term::First,
            "2" => Term::Second,
            other => return Err(format!("unknown term '{other}': expected 1 or 2")),
        };
        Ok(GradeLevel::new(year, term))
    }
}
