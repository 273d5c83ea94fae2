use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde_json::{Map, Value, json};

use super::utils::{
    print_empty, print_fields, print_json, print_table, sort_newest_first, text, timestamp,
};
use super::{CommandContext, id_of};
use crate::cache::CachedResource;
use crate::cli::commands::{ProjectAction, ProjectSortArg, ProjectStateArg};
use crate::error::PlaneError;
use crate::model::Record;

pub async fn handle_project(ctx: &CommandContext, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::List { state, sort, limit } => {
            let mut projects = ctx.session.cached_projects(&ctx.workspace).await?;
            if let Some(state) = state {
                let network = Some(state.network());
                projects.retain(|p| p.get("network").and_then(Value::as_u64) == network);
            }
            match sort {
                ProjectSortArg::Linear => {
                    projects.sort_by(|a, b| sort_order(a).total_cmp(&sort_order(b)))
                }
                ProjectSortArg::Created => sort_newest_first(&mut projects, "created_at"),
                ProjectSortArg::Updated => sort_newest_first(&mut projects, "updated_at"),
            }
            projects.truncate(limit);

            if ctx.json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                print_empty("projects");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = projects
                .iter()
                .map(|p| {
                    vec![
                        text(p, "identifier"),
                        text(p, "name"),
                        project_state(p),
                        text(p, "id"),
                    ]
                })
                .collect();
            print_table(&["IDENT", "NAME", "STATE", "ID"], &rows);
            Ok(())
        }
        ProjectAction::Show { query } => {
            let project = ctx.project(&query).await?;
            if ctx.json {
                return print_json(&project);
            }
            println!(
                "{} {}",
                text(&project, "identifier").cyan().bold(),
                text(&project, "name").bold()
            );
            print_fields(&[
                ("State", project_state(&project)),
                ("ID", text(&project, "id")),
                ("Created", timestamp(&project, "created_at")),
                ("Updated", timestamp(&project, "updated_at")),
            ]);
            let description = text(&project, "description");
            if !description.is_empty() {
                println!("\n{}", description);
            }
            Ok(())
        }
        ProjectAction::Create {
            name,
            identifier,
            description,
        } => {
            let mut body = json!({ "name": name });
            if let Some(identifier) = identifier {
                body["identifier"] = json!(identifier.to_uppercase());
            }
            if let Some(description) = description {
                body["description"] = json!(description);
            }
            let project = ctx
                .session
                .client()
                .create_project(&ctx.workspace, body)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Projects, &ctx.workspace, None);

            if ctx.json {
                return print_json(&project);
            }
            println!(
                "{} project {} {}",
                "Created".green(),
                text(&project, "identifier").cyan(),
                text(&project, "name").bold()
            );
            Ok(())
        }
        ProjectAction::Update {
            query,
            name,
            description,
        } => {
            let project_id = ctx.project_id(&query).await?;
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".to_string(), json!(name));
            }
            if let Some(description) = description {
                body.insert("description".to_string(), json!(description));
            }
            if body.is_empty() {
                return Err(
                    PlaneError::validation("Nothing to update", "Pass --name or --description.")
                        .into(),
                );
            }
            let updated = ctx
                .session
                .client()
                .update_project(&ctx.workspace, &project_id, Value::Object(body))
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Projects, &ctx.workspace, None);

            if ctx.json {
                return print_json(&updated);
            }
            println!("{} project {}", "Updated".green(), text(&updated, "name").bold());
            Ok(())
        }
        ProjectAction::Delete { query } => {
            let project = ctx.project(&query).await?;
            ctx.session
                .client()
                .delete_project(&ctx.workspace, &id_of(&project)?)
                .await?;
            ctx.session
                .cache()
                .invalidate(CachedResource::Projects, &ctx.workspace, None);
            println!("{} project {}", "Deleted".red(), text(&project, "name").bold());
            Ok(())
        }
    }
}

fn sort_order(project: &Record) -> f64 {
    project.get("sort_order").and_then(Value::as_f64).unwrap_or(0.0)
}

/// Lifecycle name for the `network` value, or the raw value if unknown.
fn project_state(project: &Record) -> String {
    let Some(network) = project.get("network").and_then(Value::as_u64) else {
        return String::new();
    };
    [
        ProjectStateArg::Planned,
        ProjectStateArg::Started,
        ProjectStateArg::Paused,
        ProjectStateArg::Completed,
        ProjectStateArg::Canceled,
    ]
    .into_iter()
    .find(|state| state.network() == network)
    .and_then(|state| state.to_possible_value())
    .map(|value| value.get_name().to_string())
    .unwrap_or_else(|| network.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::into_record;

    #[test]
    fn test_project_state_names() {
        let started = into_record(json!({"network": 1})).unwrap();
        let odd = into_record(json!({"network": 9})).unwrap();
        let missing = into_record(json!({})).unwrap();
        assert_eq!(project_state(&started), "started");
        assert_eq!(project_state(&odd), "9");
        assert_eq!(project_state(&missing), "");
    }
}
