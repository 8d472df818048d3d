use crate::domain::exam::{clamp_completion, resolve_total};
use crate::domain::ExamPayload;

/// Raw form fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamForm {
    pub paper: String,
    pub mcq: String,
    pub essay: String,
    /// Absent when the owning store always derives the total.
    pub total: Option<String>,
    pub completion: String,
}

/// Builds a payload from form input, or `None` when the paper name is blank.
///
/// Numbers are parsed leniently: anything unparseable counts as missing.
/// `mcq` and `essay` never go below zero, `total` takes an explicit value
/// (floored at zero) before falling back to `mcq + essay`, and `completion`
/// is clamped to `[0, 100]`.
pub fn build_payload(form: &ExamForm) -> Option<ExamPayload> {
    let paper = form.paper.trim();
    if paper.is_empty() {
        return None;
    }

    let mcq = parse_number(&form.mcq).unwrap_or(0.0).max(0.0);
    let essay = parse_number(&form.essay).unwrap_or(0.0).max(0.0);
    let explicit_total = form
        .total
        .as_deref()
        .and_then(parse_number)
        .map(|total| total.max(0.0));
    let total = resolve_total(explicit_total, mcq, essay);
    let completion = clamp_completion(parse_number(&form.completion).unwrap_or(0.0));

    Some(ExamPayload {
        paper: paper.to_string(),
        mcq,
        essay,
        total,
        completion,
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
