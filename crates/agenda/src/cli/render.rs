use agendapp::commands::{AffectedBlock, CmdMessage, MessageLevel};
use agendapp::model::{MaterializedEvent, Provenance, Week};
use agendapp::projector::{DaySource, DayView};
use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

const LABEL_WIDTH: usize = 24;
const DATE_FORMAT: &str = "%a %Y-%m-%d";

pub(super) fn print_messages(messages: &[CmdMessage]) {
    print!("{}", render_messages(messages));
}

pub(super) fn print_week(week: Week, events: &[MaterializedEvent]) {
    print!("{}", render_week(week, events));
}

pub(super) fn print_day(view: &DayView) {
    print!("{}", render_day(view));
}

pub(super) fn print_affected(blocks: &[AffectedBlock]) {
    for block in blocks {
        println!("  {} {}", block.id.to_string().bold(), block.state.to_string().dimmed());
    }
}

fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let line = match message.level {
            MessageLevel::Info => message.content.dimmed(),
            MessageLevel::Success => message.content.green(),
            MessageLevel::Warning => message.content.yellow(),
            MessageLevel::Error => message.content.red(),
        };
        out.push_str(&format!("{}\n", line));
    }
    out
}

fn render_week(week: Week, events: &[MaterializedEvent]) -> String {
    let mut out = format!("{}\n", format!("Week of {}", week.start()).bold());
    for date in week.dates() {
        out.push_str(&format!("\n{}\n", date.format(DATE_FORMAT).to_string().underline()));
        let on_date: Vec<_> = events.iter().filter(|e| e.date == date).collect();
        if on_date.is_empty() {
            out.push_str(&format!("    {}\n", "no availability".dimmed()));
        }
        for event in on_date {
            out.push_str(&render_event(event));
        }
    }
    out
}

fn render_day(view: &DayView) -> String {
    let source = match view.source {
        DaySource::Override => "date override",
        DaySource::Template => "weekly template",
        DaySource::None => "no rule",
    };
    let mut out = format!(
        "{} {}\n",
        view.date.format(DATE_FORMAT).to_string().bold(),
        format!("({})", source).dimmed()
    );
    for event in view.availability.iter().chain(&view.blackouts) {
        out.push_str(&render_event(event));
    }
    if view.is_closed() {
        out.push_str(&format!("    {}\n", "closed".red()));
    }
    out
}

fn render_event(event: &MaterializedEvent) -> String {
    let padding = " ".repeat(LABEL_WIDTH.saturating_sub(event.label.width()));
    format!(
        "    {}  {}{}{}\n",
        paint(event.provenance, &event.range.to_string()),
        event.label,
        padding,
        event.id.to_string().dimmed()
    )
}

fn paint(provenance: Provenance, text: &str) -> ColoredString {
    match provenance {
        Provenance::Template => text.green(),
        Provenance::Override => text.cyan(),
        Provenance::Blackout => text.red(),
        Provenance::Pending => text.yellow(),
    }
}
