use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value, json};

use super::utils::{arrange, print_empty, print_fields, print_json, print_table, text, timestamp};
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::ModuleAction;
use crate::error::PlaneError;
use chrono::NaiveDate;

pub async fn handle_module(ctx: &CommandContext, action: ModuleAction) -> Result<()> {
    match action {
        ModuleAction::List {
            project,
            sort,
            limit,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let mut modules = ctx
                .session
                .cached_modules(&ctx.workspace, &project_id)
                .await?;
            arrange(&mut modules, sort, limit);
            if ctx.json {
                return print_json(&modules);
            }
            if modules.is_empty() {
                print_empty("modules");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = modules
                .iter()
                .map(|m| vec![text(m, "name"), text(m, "status"), text(m, "id")])
                .collect();
            print_table(&["NAME", "STATUS", "ID"], &rows);
            Ok(())
        }
        ModuleAction::Show { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let module = ctx
                .resolver()
                .module(&query, &ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&module);
            }
            println!("{}", text(&module, "name").bold());
            print_fields(&[
                ("Status", text(&module, "status")),
                ("Start", timestamp(&module, "start_date")),
                ("Target", timestamp(&module, "target_date")),
                ("ID", text(&module, "id")),
            ]);
            let description = text(&module, "description");
            if !description.is_empty() {
                println!("\n{}", description);
            }
            Ok(())
        }
        ModuleAction::Create {
            name,
            project,
            description,
            start_date,
            end_date,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let mut body = fields(None, description, start_date, end_date);
            body.insert("name".to_string(), json!(name));
            let module = ctx
                .session
                .client()
                .create_module(&ctx.workspace, &project_id, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Modules, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&module);
            }
            println!("{} module {}", "Created".green(), text(&module, "name").bold());
            Ok(())
        }
        ModuleAction::Update {
            query,
            project,
            name,
            description,
            start_date,
            end_date,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let module = ctx
                .resolver()
                .module(&query, &ctx.workspace, &project_id)
                .await?;
            let body = fields(name, description, start_date, end_date);
            if body.is_empty() {
                return Err(PlaneError::validation(
                    "Nothing to update",
                    "Pass at least one of --name, --description, --start-date, --end-date.",
                )
                .into());
            }
            let updated = ctx
                .session
                .client()
                .update_module(&ctx.workspace, &project_id, &id_of(&module)?, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Modules, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} module {}", "Updated".green(), text(&updated, "name").bold());
            Ok(())
        }
        ModuleAction::Delete { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let module = ctx
                .resolver()
                .module(&query, &ctx.workspace, &project_id)
                .await?;
            ctx.session
                .client()
                .delete_module(&ctx.workspace, &project_id, &id_of(&module)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Modules, &ctx.workspace, Some(&project_id));
            println!("{} module {}", "Deleted".red(), text(&module, "name").bold());
            Ok(())
        }
    }
}

/// Module payload; the end date is what the API calls `target_date`.
fn fields(
    name: Option<String>,
    description: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(name) = name {
        body.insert("name".to_string(), json!(name));
    }
    if let Some(description) = description {
        body.insert("description".to_string(), json!(description));
    }
    if let Some(date) = start_date {
        body.insert("start_date".to_string(), json!(date.to_string()));
    }
    if let Some(date) = end_date {
        body.insert("target_date".to_string(), json!(date.to_string()));
    }
    body
}
