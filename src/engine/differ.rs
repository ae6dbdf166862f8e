//! Plan display

use colored::{ColoredString, Colorize};
use declarative::Action;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use super::planner::{ExecutionPlan, Operation, Step};

/// Print the plan, grouped by what each step does
pub fn display_plan(plan: &ExecutionPlan, show_diffs: bool) {
    if !plan.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for step in plan.changes() {
        let fields = if step.changed.is_empty() {
            String::new()
        } else {
            format!("({})", step.changed.join(", "))
        };
        println!(
            "│   {} {:<40} {}",
            colored_symbol(step.operation),
            step.address(),
            fields.dimmed()
        );

        if show_diffs && let Some(diff) = declaration_diff(step) {
            for line in diff.lines() {
                println!("│       {}", colorize_diff_line(line));
            }
        }
    }

    let unchanged = plan.count(Operation::Apply(Action::NoOp));
    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Summary: {}", summary_line(plan));
    if unchanged > 0 {
        println!("│          {}", format!("{unchanged} unchanged").dimmed());
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// `N to create, N to update, ...`
pub fn summary_line(plan: &ExecutionPlan) -> String {
    let parts = [
        (plan.count(Operation::Apply(Action::Create)), "to create"),
        (plan.count(Operation::Apply(Action::Update)), "to update"),
        (plan.count(Operation::Apply(Action::Replace)), "to replace"),
        (plan.count(Operation::Delete), "to delete"),
    ];
    parts
        .iter()
        .map(|(n, label)| format!("{n} {label}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn colored_symbol(operation: Operation) -> ColoredString {
    let symbol = operation.symbol();
    match operation {
        Operation::Apply(Action::Create) => symbol.green(),
        Operation::Apply(Action::Update) => symbol.yellow(),
        Operation::Apply(Action::Replace) => symbol.magenta(),
        Operation::Delete => symbol.red(),
        Operation::Apply(Action::NoOp) => symbol.dimmed(),
    }
}

/// Unified diff of the recorded declaration against the new one
///
/// Only updates and replaces have both sides.
pub fn declaration_diff(step: &Step) -> Option<String> {
    let (olds, _) = step.prior.as_ref()?;
    if !matches!(
        step.operation,
        Operation::Apply(Action::Update | Action::Replace)
    ) {
        return None;
    }

    let old_text = pretty(olds);
    let new_text = pretty(&step.inputs);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    Some(out)
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

fn colorize_diff_line(line: &str) -> ColoredString {
    match line.chars().next() {
        Some('+') => line.green(),
        Some('-') => line.red(),
        _ => line.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Kind;
    use serde_json::json;

    fn step(operation: Operation, olds: Value, news: Value) -> Step {
        Step {
            name: "stage".into(),
            kind: Kind::Attribute,
            operation,
            inputs: news,
            prior: Some((olds, json!({}))),
            changed: vec!["title".into()],
        }
    }

    #[test]
    fn test_declaration_diff_marks_changed_lines() {
        let s = step(
            Operation::Apply(Action::Update),
            json!({"title": "Stage", "type": "status"}),
            json!({"title": "Deal stage", "type": "status"}),
        );

        let diff = declaration_diff(&s).unwrap();
        assert!(diff.contains("-  \"title\": \"Stage\""));
        assert!(diff.contains("+  \"title\": \"Deal stage\""));
        assert!(diff.contains("   \"type\": \"status\""));
    }

    #[test]
    fn test_no_diff_without_both_sides() {
        let delete = step(Operation::Delete, json!({}), json!({}));
        assert!(declaration_diff(&delete).is_none());

        let mut create = step(Operation::Apply(Action::Create), json!({}), json!({}));
        create.prior = None;
        assert!(declaration_diff(&create).is_none());
    }

    #[test]
    fn test_summary_line() {
        let plan = ExecutionPlan {
            steps: vec![
                step(Operation::Apply(Action::Create), json!({}), json!({})),
                step(Operation::Delete, json!({}), json!({})),
                step(Operation::Delete, json!({}), json!({})),
            ],
        };
        assert_eq!(
            summary_line(&plan),
            "1 to create, 0 to update, 0 to replace, 2 to delete"
        );
    }
}
