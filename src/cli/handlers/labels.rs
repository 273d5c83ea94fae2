use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value, json};

use super::utils::{arrange, print_empty, print_fields, print_json, print_table, text};
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::LabelAction;
use crate::error::PlaneError;

pub async fn handle_label(ctx: &CommandContext, action: LabelAction) -> Result<()> {
    match action {
        LabelAction::List {
            project,
            sort,
            limit,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let mut labels = ctx
                .session
                .cached_labels(&ctx.workspace, &project_id)
                .await?;
            arrange(&mut labels, sort, limit);
            if ctx.json {
                return print_json(&labels);
            }
            if labels.is_empty() {
                print_empty("labels");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = labels
                .iter()
                .map(|l| vec![text(l, "name"), text(l, "color"), text(l, "id")])
                .collect();
            print_table(&["NAME", "COLOR", "ID"], &rows);
            Ok(())
        }
        LabelAction::Show { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let label = ctx
                .resolver()
                .label(&query, &ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&label);
            }
            println!("{}", text(&label, "name").magenta().bold());
            print_fields(&[
                ("Color", text(&label, "color")),
                ("Description", text(&label, "description")),
                ("ID", text(&label, "id")),
            ]);
            Ok(())
        }
        LabelAction::Create {
            name,
            project,
            color,
            description,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let mut body = json!({ "name": name });
            if let Some(color) = color {
                body["color"] = json!(color);
            }
            if let Some(description) = description {
                body["description"] = json!(description);
            }
            let label = ctx
                .session
                .client()
                .create_label(&ctx.workspace, &project_id, body)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Labels, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&label);
            }
            println!("{} label {}", "Created".green(), text(&label, "name").magenta());
            Ok(())
        }
        LabelAction::Update {
            query,
            project,
            name,
            color,
            description,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let label = ctx
                .resolver()
                .label(&query, &ctx.workspace, &project_id)
                .await?;
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".to_string(), json!(name));
            }
            if let Some(color) = color {
                body.insert("color".to_string(), json!(color));
            }
            if let Some(description) = description {
                body.insert("description".to_string(), json!(description));
            }
            if body.is_empty() {
                return Err(PlaneError::validation(
                    "Nothing to update",
                    "Pass at least one of --name, --color, --description.",
                )
                .into());
            }
            let updated = ctx
                .session
                .client()
                .update_label(&ctx.workspace, &project_id, &id_of(&label)?, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Labels, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} label {}", "Updated".green(), text(&updated, "name").magenta());
            Ok(())
        }
        LabelAction::Delete { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let label = ctx
                .resolver()
                .label(&query, &ctx.workspace, &project_id)
                .await?;
            ctx.session
                .client()
                .delete_label(&ctx.workspace, &project_id, &id_of(&label)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Labels, &ctx.workspace, Some(&project_id));
            println!("{} label {}", "Deleted".red(), text(&label, "name").magenta());
            Ok(())
        }
    }
}
