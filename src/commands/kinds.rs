use anyhow::Result;
use colored::Colorize;
use declarative::{DeleteStrategy, Fields};

use crate::resource::Kind;
use crate::ui;

pub fn run() -> Result<()> {
    ui::header("Resource kinds");

    for kind in Kind::ALL {
        let rules = kind.rules();
        println!();
        println!("  {} {}", kind.name().cyan().bold(), kind.description().dimmed());
        ui::kv("  replaced when", &describe(rules.replace_on));
        ui::kv("  updated when", &describe(rules.update_on));
        ui::kv("  identity", &kind.stable_fields().join(", "));
        ui::kv("  on delete", delete_label(kind.delete_strategy()));
    }

    Ok(())
}

fn describe(fields: Fields) -> String {
    match fields {
        Fields::None => "never".to_string(),
        Fields::All => "any field changes".to_string(),
        Fields::Only(names) => names.join(", "),
    }
}

fn delete_label(strategy: DeleteStrategy) -> &'static str {
    match strategy {
        DeleteStrategy::Hard => "deleted",
        DeleteStrategy::Archive => "archived",
        DeleteStrategy::Unsupported => "forgotten (kept in the workspace)",
    }
}
