use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value, json};

use super::utils::{format_state, print_empty, print_fields, print_json, print_table, text};
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::StateAction;
use crate::error::PlaneError;

pub async fn handle_state(ctx: &CommandContext, action: StateAction) -> Result<()> {
    match action {
        StateAction::List { project } => {
            let project_id = ctx.project_id(&project).await?;
            let states = ctx
                .session
                .cached_states(&ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&states);
            }
            if states.is_empty() {
                print_empty("states");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = states
                .iter()
                .map(|s| vec![text(s, "name"), text(s, "group"), text(s, "id")])
                .collect();
            print_table(&["NAME", "GROUP", "ID"], &rows);
            Ok(())
        }
        StateAction::Show { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let state = ctx
                .resolver()
                .state(&query, &ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&state);
            }
            let group = text(&state, "group");
            println!("{}", format_state(&text(&state, "name"), &group));
            print_fields(&[
                ("Group", group),
                ("Color", text(&state, "color")),
                ("ID", text(&state, "id")),
            ]);
            Ok(())
        }
        StateAction::Create {
            name,
            project,
            group,
            color,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let body = json!({ "name": name, "group": group.as_str(), "color": color });
            let state = ctx
                .session
                .client()
                .create_state(&ctx.workspace, &project_id, body)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::States, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&state);
            }
            println!(
                "{} state {}",
                "Created".green(),
                format_state(&text(&state, "name"), &text(&state, "group"))
            );
            Ok(())
        }
        StateAction::Update {
            query,
            project,
            name,
            group,
            color,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let state = ctx
                .resolver()
                .state(&query, &ctx.workspace, &project_id)
                .await?;
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".to_string(), json!(name));
            }
            if let Some(group) = group {
                body.insert("group".to_string(), json!(group.as_str()));
            }
            if let Some(color) = color {
                body.insert("color".to_string(), json!(color));
            }
            if body.is_empty() {
                return Err(PlaneError::validation(
                    "Nothing to update",
                    "Pass at least one of --name, --group, --color.",
                )
                .into());
            }
            let updated = ctx
                .session
                .client()
                .update_state(&ctx.workspace, &project_id, &id_of(&state)?, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::States, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} state {}", "Updated".green(), text(&updated, "name"));
            Ok(())
        }
        StateAction::Delete { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let state = ctx
                .resolver()
                .state(&query, &ctx.workspace, &project_id)
                .await?;
            ctx.session
                .client()
                .delete_state(&ctx.workspace, &project_id, &id_of(&state)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::States, &ctx.workspace, Some(&project_id));
            println!("{} state {}", "Deleted".red(), text(&state, "name"));
            Ok(())
        }
    }
}
