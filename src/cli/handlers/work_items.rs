use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

use super::utils::{
    format_priority, format_state, print_empty, print_fields, print_json, print_table,
    sort_newest_first, text, timestamp, to_html, warn,
};
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::{PriorityArg, SortArg, WorkItemAction};
use crate::error::PlaneError;
use crate::model::{
    Priority, Record, record_id, related_id, related_ids, str_field, user_display_name,
};
use crate::session::ProjectItems;

/// Fields shared by `wi create` and `wi update`, still as user queries.
#[derive(Default)]
struct Changes {
    title: Option<String>,
    description: Option<String>,
    state: Option<String>,
    priority: Option<PriorityArg>,
    assignees: Vec<String>,
    labels: Vec<String>,
    clear_labels: bool,
    parent: Option<String>,
    estimate: Option<String>,
}

/// `wi list` filters, still as user queries.
struct Filters {
    state: Option<String>,
    assignee: Option<String>,
    labels: Vec<String>,
}

struct Row {
    item: Record,
    identifier: String,
    state: String,
}

pub async fn handle_work_item(ctx: &CommandContext, action: WorkItemAction) -> Result<()> {
    match action {
        WorkItemAction::List {
            project,
            state,
            assignee,
            label,
            sort,
            limit,
        } => {
            let filters = Filters {
                state,
                assignee,
                labels: label,
            };
            list(ctx, project, filters, sort, limit).await
        }
        WorkItemAction::Show { query, project } => show(ctx, &query, project.as_deref()).await,
        WorkItemAction::Search {
            query,
            project,
            sort,
            limit,
        } => search(ctx, &query, project.as_deref(), sort, limit).await,
        WorkItemAction::Create {
            title,
            project,
            description,
            state,
            priority,
            assignee,
            label,
            module,
            parent,
            estimate,
        } => {
            let project = ctx.project(&project).await?;
            let project_id = id_of(&project)?;
            let changes = Changes {
                title: Some(title),
                description,
                state,
                priority,
                assignees: assignee,
                labels: label,
                parent,
                estimate,
                ..Changes::default()
            };
            let body = payload(ctx, &project_id, changes).await?;
            let module = match module {
                Some(query) => Some(
                    ctx.resolver()
                        .module(&query, &ctx.workspace, &project_id)
                        .await?,
                ),
                None => None,
            };
            let item = ctx
                .session
                .client()
                .create_work_item(&ctx.workspace, &project_id, body)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::WorkItems, &ctx.workspace, Some(&project_id));

            if let Some(module) = &module {
                ctx.session
                    .client()
                    .add_module_work_items(
                        &ctx.workspace,
                        &project_id,
                        &id_of(module)?,
                        &[id_of(&item)?],
                    )
                    .await?;
                ctx.session
                    .cache()
                    .invalidate(CachedResource::Modules, &ctx.workspace, Some(&project_id));
            }

            if ctx.json {
                return print_json(&item);
            }
            println!(
                "{} {} {}",
                "Created".green(),
                identifier(&project, &item).cyan(),
                text(&item, "name")
            );
            if let Some(module) = &module {
                println!("  in module {}", text(module, "name").bold());
            }
            Ok(())
        }
        WorkItemAction::Update {
            query,
            project,
            title,
            description,
            state,
            priority,
            assignee,
            label,
            clear_labels,
            estimate,
        } => {
            let (item, project_id) = ctx.locate_work_item(&query, project.as_deref()).await?;
            let changes = Changes {
                title,
                description,
                state,
                priority,
                assignees: assignee,
                labels: label,
                clear_labels,
                estimate,
                ..Changes::default()
            };
            let body = payload(ctx, &project_id, changes).await?;
            if body.as_object().is_some_and(Map::is_empty) {
                return Err(PlaneError::validation(
                    "Nothing to update",
                    "Pass at least one of --title, --description, --state, --priority, \
                     --assignee, --labels, --clear-labels, --estimate.",
                )
                .into());
            }
            let updated = ctx
                .session
                .client()
                .update_work_item(&ctx.workspace, &project_id, &id_of(&item)?, body)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::WorkItems, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} {}", "Updated".green(), text(&updated, "name"));
            Ok(())
        }
        WorkItemAction::Assign {
            query,
            assignee,
            project,
        } => {
            let (item, project_id) = ctx.locate_work_item(&query, project.as_deref()).await?;
            let user = ctx.resolver().user(&assignee, &ctx.workspace).await?;
            let updated = ctx
                .session
                .client()
                .update_work_item(
                    &ctx.workspace,
                    &project_id,
                    &id_of(&item)?,
                    json!({ "assignees": [id_of(&user)?] }),
                )
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::WorkItems, &ctx.workspace, Some(&project_id));

            if ctx.json {
                return print_json(&updated);
            }
            println!(
                "{} {} to {}",
                "Assigned".green(),
                text(&item, "name"),
                user_display_name(&user).cyan()
            );
            Ok(())
        }
        WorkItemAction::Delete { query, project } => {
            let (item, project_id) = ctx.locate_work_item(&query, project.as_deref()).await?;
            ctx.session
                .client()
                .delete_work_item(&ctx.workspace, &project_id, &id_of(&item)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::WorkItems, &ctx.workspace, Some(&project_id));
            println!("{} {}", "Deleted".red(), text(&item, "name"));
            Ok(())
        }
    }
}

async fn list(
    ctx: &CommandContext,
    project: Option<String>,
    filters: Filters,
    sort: SortArg,
    limit: usize,
) -> Result<()> {
    let scoped = project.is_some();
    let batches = match project {
        Some(query) => {
            let project = ctx.project(&query).await?;
            let project_id = id_of(&project)?;
            let items = ctx
                .session
                .cached_work_items(&ctx.workspace, &project_id)
                .await?;
            vec![ProjectItems { project, items }]
        }
        None => {
            let gathered = ctx.session.work_items_across_projects(&ctx.workspace).await?;
            for warning in &gathered.warnings {
                warn(warning);
            }
            gathered.projects
        }
    };

    let assignee_id = match &filters.assignee {
        Some(query) => Some(id_of(&ctx.resolver().user(query, &ctx.workspace).await?)?),
        None => None,
    };

    let mut rows = Vec::new();
    for batch in batches {
        let project_id = id_of(&batch.project)?;
        // another project's workflow may not have this state or label
        let (state_id, label_ids) = match project_filters(ctx, &project_id, &filters).await {
            Ok(found) => found,
            Err(PlaneError::NotFound { .. }) if !scoped => continue,
            Err(e) => return Err(e.into()),
        };
        let states = state_lookup(ctx, &project_id).await;

        for item in batch.items {
            if state_id.is_some() && related_id(&item, "state") != state_id {
                continue;
            }
            if assignee_id
                .as_ref()
                .is_some_and(|id| !related_ids(&item, "assignees").contains(id))
            {
                continue;
            }
            let carried = related_ids(&item, "labels");
            if !label_ids.iter().all(|id| carried.contains(id)) {
                continue;
            }
            let state = related_id(&item, "state")
                .and_then(|id| states.get(&id))
                .map(|(name, _)| name.clone())
                .unwrap_or_default();
            rows.push(Row {
                identifier: identifier(&batch.project, &item),
                item,
                state,
            });
        }
    }

    let field = sort.field();
    rows.sort_by(|a, b| str_field(&b.item, field).cmp(&str_field(&a.item, field)));
    rows.truncate(limit);

    if ctx.json {
        let items: Vec<&Record> = rows.iter().map(|r| &r.item).collect();
        return print_json(&items);
    }
    if rows.is_empty() {
        print_empty("work items");
        return Ok(());
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            let priority = text(&r.item, "priority");
            vec![
                r.identifier.clone(),
                r.state.clone(),
                if priority.is_empty() { "none".to_string() } else { priority },
                text(&r.item, "name"),
            ]
        })
        .collect();
    print_table(&["ID", "STATE", "PRIORITY", "NAME"], &table);
    Ok(())
}

/// State and label IDs the `wi list` filters name within one project.
async fn project_filters(
    ctx: &CommandContext,
    project_id: &str,
    filters: &Filters,
) -> crate::error::Result<(Option<String>, Vec<String>)> {
    let resolver = ctx.resolver();
    let state_id = match &filters.state {
        Some(query) => Some(id_of(&resolver.state(query, &ctx.workspace, project_id).await?)?),
        None => None,
    };
    let mut label_ids = Vec::new();
    for query in &filters.labels {
        label_ids.push(id_of(&resolver.label(query, &ctx.workspace, project_id).await?)?);
    }
    Ok((state_id, label_ids))
}

async fn search(
    ctx: &CommandContext,
    query: &str,
    project: Option<&str>,
    sort: SortArg,
    limit: usize,
) -> Result<()> {
    let project_id = match project {
        Some(project) => Some(ctx.project_id(project).await?),
        None => None,
    };
    let mut results = ctx
        .session
        .client()
        .search_work_items(&ctx.workspace, query)
        .await?;
    if let Some(project_id) = &project_id {
        results.retain(|r| search_project(r).as_ref() == Some(project_id));
    }
    sort_newest_first(&mut results, sort.field());
    results.truncate(limit);

    if ctx.json {
        return print_json(&results);
    }
    if results.is_empty() {
        print_empty("matching work items");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| {
            let identifier = match (str_field(r, "project__identifier"), r.get("sequence_id")) {
                (Some(prefix), Some(sequence)) => format!("{}-{}", prefix, sequence),
                _ => text(r, "id"),
            };
            vec![identifier, text(r, "name")]
        })
        .collect();
    print_table(&["ID", "NAME"], &rows);
    Ok(())
}

/// Search hits carry the project as `project_id` rather than `project`.
fn search_project(result: &Record) -> Option<String> {
    str_field(result, "project_id")
        .map(str::to_string)
        .or_else(|| related_id(result, "project"))
}

async fn show(ctx: &CommandContext, query: &str, project: Option<&str>) -> Result<()> {
    let (item, project_id) = ctx.locate_work_item(query, project).await?;
    if ctx.json {
        return print_json(&item);
    }

    let project = ctx
        .session
        .cached_projects(&ctx.workspace)
        .await?
        .into_iter()
        .find(|p| record_id(p) == Some(project_id.as_str()))
        .unwrap_or_default();
    let states = state_lookup(ctx, &project_id).await;
    let members = names_by_id(
        ctx.session.cached_members(&ctx.workspace).await.unwrap_or_default(),
        user_display_name,
    );
    let labels = names_by_id(
        ctx.session
            .cached_labels(&ctx.workspace, &project_id)
            .await
            .unwrap_or_default(),
        |l| text(l, "name"),
    );

    let state = related_id(&item, "state")
        .and_then(|id| states.get(&id).cloned())
        .map(|(name, group)| format_state(&name, &group).to_string())
        .unwrap_or_default();
    let assignees = lookup_names(&related_ids(&item, "assignees"), &members);
    let label_names = lookup_names(&related_ids(&item, "labels"), &labels);

    println!(
        "{} {}",
        identifier(&project, &item).cyan().bold(),
        text(&item, "name").bold()
    );
    print_fields(&[
        ("Project", text(&project, "name")),
        ("State", state),
        ("Priority", format_priority(&text(&item, "priority")).to_string()),
        ("Assignees", assignees),
        ("Labels", label_names.magenta().to_string()),
        ("Created", timestamp(&item, "created_at")),
        ("Updated", timestamp(&item, "updated_at")),
        ("ID", text(&item, "id")),
    ]);

    let description = str_field(&item, "description_stripped")
        .or_else(|| str_field(&item, "description_html"))
        .unwrap_or_default();
    if !description.trim().is_empty() {
        println!("\n{}", description.trim());
    }
    Ok(())
}

/// Turn user queries into the API payload, resolving names to IDs.
async fn payload(ctx: &CommandContext, project_id: &str, changes: Changes) -> Result<Value> {
    let resolver = ctx.resolver();
    let workspace = ctx.workspace.as_str();
    let mut body = Map::new();

    if let Some(title) = changes.title {
        body.insert("name".to_string(), json!(title));
    }
    if let Some(description) = changes.description {
        body.insert("description_html".to_string(), json!(to_html(&description)));
    }
    if let Some(state) = changes.state {
        let state = resolver.state(&state, workspace, project_id).await?;
        body.insert("state".to_string(), json!(id_of(&state)?));
    }
    if let Some(priority) = changes.priority {
        body.insert("priority".to_string(), json!(Priority::from(priority).to_string()));
    }
    if !changes.assignees.is_empty() {
        let mut ids = Vec::new();
        for query in &changes.assignees {
            ids.push(id_of(&resolver.user(query, workspace).await?)?);
        }
        body.insert("assignees".to_string(), json!(ids));
    }
    if changes.clear_labels {
        body.insert("labels".to_string(), json!([]));
    } else if !changes.labels.is_empty() {
        let mut ids = Vec::new();
        for query in &changes.labels {
            ids.push(id_of(&resolver.label(query, workspace, project_id).await?)?);
        }
        body.insert("labels".to_string(), json!(ids));
    }
    if let Some(parent) = changes.parent {
        let (parent, _) = resolver.work_item_across_projects(&parent, workspace).await?;
        body.insert("parent".to_string(), json!(id_of(&parent)?));
    }
    if let Some(estimate) = changes.estimate {
        let point = resolver.estimate_point(&estimate, workspace, project_id).await?;
        body.insert("estimate_point".to_string(), json!(point));
    }
    Ok(Value::Object(body))
}

/// `FE-42` when both parts are known, otherwise the raw ID.
pub(super) fn identifier(project: &Record, item: &Record) -> String {
    let sequence = item.get("sequence_id").and_then(Value::as_u64);
    match (str_field(project, "identifier"), sequence) {
        (Some(prefix), Some(sequence)) => format!("{}-{}", prefix, sequence),
        _ => text(item, "id"),
    }
}

/// State ID to `(name, group)`; an unavailable listing only costs the column.
async fn state_lookup(ctx: &CommandContext, project_id: &str) -> HashMap<String, (String, String)> {
    match ctx.session.cached_states(&ctx.workspace, project_id).await {
        Ok(states) => states
            .iter()
            .filter_map(|s| {
                Some((
                    record_id(s)?.to_string(),
                    (text(s, "name"), text(s, "group")),
                ))
            })
            .collect(),
        Err(e) => {
            tracing::warn!(project = project_id, error = %e, "Could not load states");
            HashMap::new()
        }
    }
}

fn names_by_id(records: Vec<Record>, name: impl Fn(&Record) -> String) -> HashMap<String, String> {
    records
        .iter()
        .filter_map(|r| Some((record_id(r)?.to_string(), name(r))))
        .collect()
}

fn lookup_names(ids: &[String], names: &HashMap<String, String>) -> String {
    ids.iter()
        .map(|id| names.get(id).cloned().unwrap_or_else(|| id.clone()))
        .collect::<Vec<_>>()
        .join(", ")
}
