use serde::Serialize;

use crate::domain::exam::clamp_completion;
use crate::domain::{AppState, ExamEntry};

const CHART_LIMIT: usize = 6;
const PROGRESS_LIMIT: usize = 3;
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExamPoint {
    pub paper: String,
    pub total: f64,
    pub mcq: f64,
    pub essay: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTier {
    High,
    Medium,
    Low,
}

impl CompletionTier {
    pub fn for_percent(percent: u8) -> Self {
        if percent >= 85 {
            CompletionTier::High
        } else if percent >= 60 {
            CompletionTier::Medium
        } else {
            CompletionTier::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompletionTier::High => "high",
            CompletionTier::Medium => "medium",
            CompletionTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressItem {
    pub id: String,
    pub paper: String,
    pub percent: u8,
    pub tier: CompletionTier,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightStats {
    Empty,
    #[serde(rename_all = "camelCase")]
    Summary {
        top_paper: String,
        top_total: f64,
        average_completion: u8,
    },
}

impl InsightStats {
    /// Display strings for the top paper, its total, and the mean completion.
    pub fn labels(&self) -> [String; 3] {
        match self {
            InsightStats::Empty => [PLACEHOLDER; 3].map(String::from),
            InsightStats::Summary {
                top_paper,
                top_total,
                average_completion,
            } => [
                top_paper.clone(),
                format_score(*top_total),
                format!("{average_completion}%"),
            ],
        }
    }
}

/// The six newest exams in chronological order. Lists are stored newest first.
pub fn chart_series(exams: &[ExamEntry]) -> Vec<ExamPoint> {
    exams
        .iter()
        .take(CHART_LIMIT)
        .rev()
        .map(|exam| ExamPoint {
            paper: exam.paper.clone(),
            total: exam.total,
            mcq: exam.mcq,
            essay: exam.essay,
        })
        .collect()
}

pub fn top_progress(exams: &[ExamEntry]) -> Vec<ProgressItem> {
    let mut ranked: Vec<&ExamEntry> = exams.iter().collect();
    ranked.sort_by(|left, right| {
        clamp_completion(right.completion).total_cmp(&clamp_completion(left.completion))
    });
    ranked
        .into_iter()
        .take(PROGRESS_LIMIT)
        .map(|exam| {
            let percent = completion_percent(exam.completion);
            ProgressItem {
                id: exam.id.clone(),
                paper: exam.paper.clone(),
                percent,
                tier: CompletionTier::for_percent(percent),
            }
        })
        .collect()
}

pub fn insight_stats(exams: &[ExamEntry]) -> InsightStats {
    let Some(first) = exams.first() else {
        return InsightStats::Empty;
    };
    let top = exams
        .iter()
        .fold(first, |best, exam| if exam.total > best.total { exam } else { best });
    let completion_sum: f64 = exams
        .iter()
        .map(|exam| clamp_completion(exam.completion))
        .sum();
    let average = completion_sum / exams.len() as f64;

    InsightStats::Summary {
        top_paper: top.paper.clone(),
        top_total: top.total,
        average_completion: average.round() as u8,
    }
}

/// Everything the dashboard screen shows for the active subject, derived from
/// one snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub subject_id: String,
    pub subject_name: String,
    pub subjects: Vec<SubjectSummary>,
    pub exams: Vec<ExamEntry>,
    pub chart: Vec<ExamPoint>,
    pub progress: Vec<ProgressItem>,
    pub insights: InsightStats,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub id: String,
    pub name: String,
    pub exam_count: usize,
    pub active: bool,
}

impl DashboardView {
    pub fn from_state(state: &AppState) -> Self {
        let active = state.active_subject();
        let exams = state.active_exams();
        let active_id = active.map(|subject| subject.id.as_str()).unwrap_or_default();
        Self {
            subject_id: active_id.to_string(),
            subject_name: active.map(|subject| subject.name.clone()).unwrap_or_default(),
            subjects: state
                .subjects
                .iter()
                .map(|subject| SubjectSummary {
                    id: subject.id.clone(),
                    name: subject.name.clone(),
                    exam_count: subject.exams.len(),
                    active: subject.id == active_id,
                })
                .collect(),
            exams: exams.to_vec(),
            chart: chart_series(exams),
            progress: top_progress(exams),
            insights: insight_stats(exams),
        }
    }
}

fn completion_percent(value: f64) -> u8 {
    clamp_completion(value).round() as u8
}

pub fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
