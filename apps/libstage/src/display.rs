//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::{Style, Term};
use libstage_staging::{ManifestDiff, StagingLayout, StagingOutcome, StagingPlan};
use libstage_types::ColorChoice;
use serde_json::json;
use std::io;

/// Result of one CLI command
pub enum CommandResult {
    Staged(StagingOutcome),
    Planned {
        layout: StagingLayout,
        plan: StagingPlan,
    },
    Verified {
        layout: StagingLayout,
        diff: ManifestDiff,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let value = to_json(result);
            println!(
                "{}",
                serde_json::to_string_pretty(&value).map_err(io::Error::other)?
            );
            return Ok(());
        }

        match result {
            CommandResult::Staged(outcome) => self.render_staged(outcome),
            CommandResult::Planned { layout, plan } => self.render_plan(layout, plan),
            CommandResult::Verified { layout, diff } => self.render_verified(layout, diff),
        }
        Ok(())
    }

    fn render_staged(&self, outcome: &StagingOutcome) {
        println!(
            "{} {} files into {}",
            self.style(Style::new().green().bold(), "Staged"),
            outcome.manifest.len(),
            outcome.layout.all_libs_root().display()
        );
        if outcome.renamed > 0 {
            println!("Renamed {} disguised executable(s)", outcome.renamed);
        }
        for reason in &outcome.skipped {
            println!("  skipped: {reason}");
        }
        for artifact in &outcome.artifacts {
            println!("  {}", artifact.display());
        }
    }

    fn render_plan(&self, layout: &StagingLayout, plan: &StagingPlan) {
        println!(
            "{} {}",
            self.style(Style::new().bold(), "Run directory:"),
            layout.all_libs_root().display()
        );

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Step").add_attribute(Attribute::Bold),
            Cell::new("Command").add_attribute(Attribute::Bold),
        ]);
        for (index, step) in plan.iter().enumerate() {
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(step.short_name()),
                Cell::new(step.description()),
            ]);
        }
        println!("{table}");
    }

    fn render_verified(&self, layout: &StagingLayout, diff: &ManifestDiff) {
        if diff.is_clean() {
            println!(
                "{} {} matches its metadata.txt",
                self.style(Style::new().green().bold(), "[OK]"),
                layout.all_libs_root().display()
            );
            return;
        }

        println!(
            "{} {} differs from its metadata.txt",
            self.style(Style::new().red().bold(), "[DRIFT]"),
            layout.all_libs_root().display()
        );
        for path in &diff.added {
            println!("  + {path}");
        }
        for path in &diff.removed {
            println!("  - {path}");
        }
        for path in &diff.changed {
            println!("  ~ {path}");
        }
    }

    fn style(&self, style: Style, text: &str) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn to_json(result: &CommandResult) -> serde_json::Value {
    match result {
        CommandResult::Staged(outcome) => json!({
            "status": "staged",
            "run_dir": outcome.layout.all_libs_root(),
            "artifacts": outcome.artifacts,
            "renamed": outcome.renamed,
            "skipped": outcome.skipped,
            "manifest": outcome
                .manifest
                .entries()
                .iter()
                .map(|entry| json!({ "path": entry.relative_path, "hash": entry.hash.to_hex() }))
                .collect::<Vec<_>>(),
        }),
        CommandResult::Planned { layout, plan } => json!({
            "status": "planned",
            "run_dir": layout.all_libs_root(),
            "steps": plan
                .iter()
                .map(|step| json!({ "step": step.short_name(), "command": step.description() }))
                .collect::<Vec<_>>(),
        }),
        CommandResult::Verified { layout, diff } => {
            let status = if diff.is_clean() { "clean" } else { "drift" };
            json!({
                "status": status,
                "run_dir": layout.all_libs_root(),
                "added": diff.added,
                "removed": diff.removed,
                "changed": diff.changed,
            })
        }
    }
}
