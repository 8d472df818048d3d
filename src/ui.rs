use std::io::{self, IsTerminal};

use scorepad::analytics::{FocusAnalytics, Range};
use scorepad::domain::ExamEntry;
use scorepad::ids::display_id;
use scorepad::selectors::{format_score, CompletionTier, DashboardView, ProgressItem};
use scorepad::timer::{format_clock, SessionMode};

const BAR_WIDTH: usize = 20;

pub fn print_dashboard(view: &DashboardView) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.heading(&view.subject_name),
        palette.id(display_id(&view.subject_id))
    );

    let [top_paper, top_total, average] = view.insights.labels();
    println!(
        "{}",
        palette.dim(&format!(
            "best: {top_paper} ({top_total})  avg completion: {average}"
        ))
    );

    if view.exams.is_empty() {
        println!("{}", palette.dim("no exams recorded"));
    } else {
        for exam in &view.exams {
            println!("{}", format_exam_row(exam, &palette));
        }
    }

    if !view.progress.is_empty() {
        println!();
        println!("{}", palette.heading("Progress"));
        for item in &view.progress {
            println!("{}", format_progress_row(item, &palette));
        }
    }

    if !view.chart.is_empty() {
        println!();
        println!("{}", palette.heading("Recent totals"));
        let peak = view.chart.iter().map(|point| point.total).fold(0.0, f64::max);
        for point in &view.chart {
            println!(
                "{:<16} {} {}",
                point.paper,
                palette.bar(&bar(point.total, peak)),
                format_score(point.total)
            );
        }
    }
}

pub fn print_subjects(view: &DashboardView) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Subjects"));
    for subject in &view.subjects {
        let marker = if subject.active { "*" } else { " " };
        println!(
            "{} {} {} {}",
            marker,
            palette.id(display_id(&subject.id)),
            subject.name,
            palette.dim(&format!("({} exam(s))", subject.exam_count))
        );
    }
}

pub fn print_focus_stats(analytics: &FocusAnalytics, range: Range) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Focus"));
    for window in Range::ALL {
        let line = format!("{:<6} {}", window.as_str(), format_minutes(analytics.total(window)));
        if window == range {
            println!("{}", palette.id(&line));
        } else {
            println!("{line}");
        }
    }

    let series = analytics.series(range);
    if series.is_empty() {
        println!("{}", palette.dim("no sessions in range"));
        return;
    }
    println!();
    let peak = series.iter().map(|point| point.seconds).max().unwrap_or(0);
    for point in &series {
        println!(
            "{:<13} {} {}",
            point.label,
            palette.bar(&bar(point.seconds as f64, peak as f64)),
            format_minutes(point.seconds)
        );
    }
}

/// Single status line for the running timer, redrawn in place.
pub fn timer_status(mode: SessionMode, seconds_left: u32, session: u64) -> String {
    let palette = Palette::auto();
    let label = match mode {
        SessionMode::Focus => palette.paint("1;31", "FOCUS"),
        SessionMode::Break => palette.paint("1;32", "BREAK"),
    };
    format!("{label} #{session} {}", format_clock(seconds_left))
}

fn format_exam_row(exam: &ExamEntry, palette: &Palette) -> String {
    format!(
        "{} {:<16} mcq {:>5}  essay {:>5}  total {:>5}  {}",
        palette.id(display_id(&exam.id)),
        exam.paper,
        format_score(exam.mcq),
        format_score(exam.essay),
        format_score(exam.total),
        palette.dim(&format!("{}%", format_score(exam.completion)))
    )
}

fn format_progress_row(item: &ProgressItem, palette: &Palette) -> String {
    format!(
        "{:<16} {} {}",
        item.paper,
        palette.tier(item.tier, &bar(f64::from(item.percent), 100.0)),
        palette.tier(item.tier, &format!("{}%", item.percent))
    )
}

fn bar(value: f64, peak: f64) -> String {
    if peak <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / peak) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.clamp(1, BAR_WIDTH))
}

pub fn format_minutes(seconds: i64) -> String {
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn bar(&self, text: &str) -> String {
        self.paint("36", text)
    }

    fn tier(&self, tier: CompletionTier, text: &str) -> String {
        self.paint(tier_color_code(tier), text)
    }
}

fn tier_color_code(tier: CompletionTier) -> &'static str {
    match tier {
        CompletionTier::High => "32",
        CompletionTier::Medium => "33",
        CompletionTier::Low => "31",
    }
}
