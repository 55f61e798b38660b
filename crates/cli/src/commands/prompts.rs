//! Prompts command handler.
//!
//! Shows which instruction template each mode uses and flags workspace
//! prompt files that are broken or not tied to any mode.

use clap::Args;
use odes_core::{config::AppConfig, AppResult};
use odes_prompt::{builtin_prompt, list_prompts, resolve_prompt, PromptMode};
use std::path::Path;

const MODES: [PromptMode; 2] = [PromptMode::DirectQuestion, PromptMode::PairedScenario];

/// List the prompts in effect for this workspace
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PromptRow {
    id: String,
    title: String,
    origin: String,
}

impl PromptsCommand {
    /// Execute the prompts command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let rows = prompt_rows(&config.workspace)?;

        if self.json {
            let rows: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.id,
                        "title": row.title,
                        "origin": row.origin,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        println!("{:<16} {:<40} ORIGIN", "ID", "TITLE");
        for row in &rows {
            println!("{:<16} {:<40} {}", row.id, row.title, row.origin);
        }
        Ok(())
    }
}

fn prompt_rows(workspace: &Path) -> AppResult<Vec<PromptRow>> {
    let overrides = list_prompts(workspace)?;
    let mut rows = Vec::new();

    for mode in MODES {
        let id = mode.prompt_id();
        let overridden = overrides.iter().any(|o| o == id);
        let row = match resolve_prompt(workspace, mode) {
            Ok(def) => PromptRow {
                id: id.to_string(),
                title: def.title,
                origin: if overridden { "workspace" } else { "built-in" }.to_string(),
            },
            Err(e) => {
                tracing::warn!(prompt = id, "Workspace prompt is invalid: {}", e);
                PromptRow {
                    id: id.to_string(),
                    title: builtin_prompt(mode).title,
                    origin: format!("invalid workspace file: {}", e),
                }
            }
        };
        rows.push(row);
    }

    for id in overrides {
        if MODES.iter().all(|mode| mode.prompt_id() != id) {
            rows.push(PromptRow {
                id,
                title: String::new(),
                origin: "workspace (unused)".to_string(),
            });
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtins_without_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let rows = prompt_rows(temp_dir.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "odes.direct");
        assert!(rows.iter().all(|r| r.origin == "built-in"));
    }

    #[test]
    fn test_overrides_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = temp_dir.path().join(".odes/prompts");
        fs::create_dir_all(&prompts).unwrap();
        fs::write(
            prompts.join("odes.scenario.yml"),
            "id: odes.scenario\ntitle: House style\napiVersion: \"1.0\"\ntemplate: \"{{claim_summary}}\"\n",
        )
        .unwrap();
        fs::write(prompts.join("odes.direct.yml"), "id: odes.direct\ntitle: \"\"\n").unwrap();
        fs::write(
            prompts.join("drafts.yml"),
            "id: drafts\ntitle: Drafts\napiVersion: \"1.0\"\ntemplate: x\n",
        )
        .unwrap();

        let rows = prompt_rows(temp_dir.path()).unwrap();

        assert!(rows[0].origin.starts_with("invalid workspace file"));
        assert_eq!(rows[1].title, "House style");
        assert_eq!(rows[1].origin, "workspace");
        assert_eq!(rows[2].id, "drafts");
        assert_eq!(rows[2].origin, "workspace (unused)");
    }
}
