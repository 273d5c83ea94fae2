use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use serde_json::{Map, Value, json};

use super::utils::{
    arrange, format_priority, print_empty, print_fields, print_json, print_table, text, timestamp,
};
use super::work_items::identifier;
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::CycleAction;
use crate::error::PlaneError;
use crate::model::Record;

pub async fn handle_cycle(ctx: &CommandContext, action: CycleAction) -> Result<()> {
    match action {
        CycleAction::List {
            project,
            sort,
            limit,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let mut cycles = ctx
                .session
                .cached_cycles(&ctx.workspace, &project_id)
                .await?;
            arrange(&mut cycles, sort, limit);
            if ctx.json {
                return print_json(&cycles);
            }
            if cycles.is_empty() {
                print_empty("cycles");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = cycles
                .iter()
                .map(|c| {
                    vec![
                        text(c, "name"),
                        timestamp(c, "start_date"),
                        timestamp(c, "end_date"),
                        text(c, "id"),
                    ]
                })
                .collect();
            print_table(&["NAME", "START", "END", "ID"], &rows);
            Ok(())
        }
        CycleAction::Show { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let cycle = ctx
                .resolver()
                .cycle(&query, &ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&cycle);
            }
            println!("{}", text(&cycle, "name").bold());
            print_fields(&[
                ("Start", timestamp(&cycle, "start_date")),
                ("End", timestamp(&cycle, "end_date")),
                ("ID", text(&cycle, "id")),
            ]);
            let description = text(&cycle, "description");
            if !description.is_empty() {
                println!("\n{}", description);
            }
            Ok(())
        }
        CycleAction::Create {
            name,
            project,
            description,
            start_date,
            end_date,
        } => {
            let (project_id, me) = tokio::try_join!(ctx.project_id(&project), async {
                Ok::<_, anyhow::Error>(ctx.session.cached_me(&ctx.workspace).await?)
            })?;
            let mut body = fields(Some(name), description, start_date, end_date);
            body.insert("owned_by".to_string(), json!(id_of(&me)?));
            body.insert("project_id".to_string(), json!(project_id));
            let cycle = ctx
                .session
                .client()
                .create_cycle(&ctx.workspace, &project_id, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Cycles, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&cycle);
            }
            println!("{} cycle {}", "Created".green(), text(&cycle, "name").bold());
            Ok(())
        }
        CycleAction::Update {
            query,
            project,
            name,
            description,
            start_date,
            end_date,
        } => {
            let project_id = ctx.project_id(&project).await?;
            let cycle = ctx
                .resolver()
                .cycle(&query, &ctx.workspace, &project_id)
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
                .update_cycle(&ctx.workspace, &project_id, &id_of(&cycle)?, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Cycles, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} cycle {}", "Updated".green(), text(&updated, "name").bold());
            Ok(())
        }
        CycleAction::Delete { query, project } => {
            let project_id = ctx.project_id(&project).await?;
            let cycle = ctx
                .resolver()
                .cycle(&query, &ctx.workspace, &project_id)
                .await?;
            ctx.session
                .client()
                .delete_cycle(&ctx.workspace, &project_id, &id_of(&cycle)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Cycles, &ctx.workspace, Some(&project_id));
            println!("{} cycle {}", "Deleted".red(), text(&cycle, "name").bold());
            Ok(())
        }
        CycleAction::Items {
            query,
            project,
            limit,
        } => {
            let project = ctx.project(&project).await?;
            let project_id = id_of(&project)?;
            let cycle = ctx
                .resolver()
                .cycle(&query, &ctx.workspace, &project_id)
                .await?;
            let mut items = ctx
                .session
                .client()
                .list_cycle_work_items(&ctx.workspace, &project_id, &id_of(&cycle)?)
                .await?;
            items.truncate(limit);
            if ctx.json {
                return print_json(&items);
            }
            if items.is_empty() {
                print_empty("work items in this cycle");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = items
                .iter()
                .map(|item| {
                    vec![
                        identifier(&project, item),
                        format_priority(&text(item, "priority")).to_string(),
                        text(item, "name"),
                    ]
                })
                .collect();
            print_table(&["ID", "PRIORITY", "NAME"], &rows);
            Ok(())
        }
        CycleAction::AddItem {
            query,
            work_item,
            project,
        } => {
            let (cycle, item, project_id) = membership(ctx, &query, &work_item, &project).await?;
            ctx.session
                .client()
                .add_cycle_work_items(
                    &ctx.workspace,
                    &project_id,
                    &id_of(&cycle)?,
                    &[id_of(&item)?],
                )
                .await?;
            invalidate_membership(ctx, &project_id);
            println!(
                "{} {} to cycle {}",
                "Added".green(),
                text(&item, "name"),
                text(&cycle, "name").bold()
            );
            Ok(())
        }
        CycleAction::RemoveItem {
            query,
            work_item,
            project,
        } => {
            let (cycle, item, project_id) = membership(ctx, &query, &work_item, &project).await?;
            ctx.session
                .client()
                .remove_cycle_work_item(
                    &ctx.workspace,
                    &project_id,
                    &id_of(&cycle)?,
                    &id_of(&item)?,
                )
                .await?;
            invalidate_membership(ctx, &project_id);
            println!(
                "{} {} from cycle {}",
                "Removed".red(),
                text(&item, "name"),
                text(&cycle, "name").bold()
            );
            Ok(())
        }
    }
}

/// The cycle and work item named by an add-item or remove-item call.
async fn membership(
    ctx: &CommandContext,
    cycle: &str,
    work_item: &str,
    project: &str,
) -> Result<(Record, Record, String)> {
    let project_id = ctx.project_id(project).await?;
    let resolver = ctx.resolver();
    let (cycle, item) = tokio::try_join!(
        resolver.cycle(cycle, &ctx.workspace, &project_id),
        resolver.work_item(work_item, &ctx.workspace, Some(&project_id)),
    )?;
    Ok((cycle, item, project_id))
}

/// Cycle membership shows up in both listings.
fn invalidate_membership(ctx: &CommandContext, project_id: &str) {
    let cache = ctx.session.cache();
    cache.invalidate(CachedResource::Cycles, &ctx.workspace, Some(project_id));
    cache.invalidate(CachedResource::WorkItems, &ctx.workspace, Some(project_id));
}

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
        body.insert("end_date".to_string(), json!(date.to_string()));
    }
    body
}
