use anyhow::Result;
use colored::Colorize;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

use super::utils::{print_empty, print_fields, print_json, print_table, text, timestamp, to_html};
use super::{CommandContext, id_of};
use crate::cli::commands::DocumentAction;
use crate::error::PlaneError;
use crate::model::{Record, str_field};

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

pub async fn handle_document(ctx: &CommandContext, action: DocumentAction) -> Result<()> {
    match action {
        DocumentAction::List { project } => {
            let project_id = ctx.project_id(&project).await?;
            let pages = ctx
                .session
                .client()
                .list_pages(&ctx.workspace, &project_id)
                .await?;
            if ctx.json {
                return print_json(&pages);
            }
            if pages.is_empty() {
                print_empty("documents");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = pages
                .iter()
                .map(|p| vec![text(p, "name"), timestamp(p, "updated_at"), text(p, "id")])
                .collect();
            print_table(&["TITLE", "UPDATED", "ID"], &rows);
            Ok(())
        }
        DocumentAction::Show { query, project } => {
            let project_id = optional_project(ctx, project.as_deref()).await?;
            let page = ctx
                .resolver()
                .document(&query, &ctx.workspace, project_id.as_deref())
                .await?;
            if ctx.json {
                return print_json(&page);
            }
            println!("{}", text(&page, "name").bold());
            print_fields(&[
                ("Created", timestamp(&page, "created_at")),
                ("Updated", timestamp(&page, "updated_at")),
                ("ID", text(&page, "id")),
            ]);
            let content = content_text(&page);
            if !content.is_empty() {
                println!("\n{}", content);
            }
            Ok(())
        }
        DocumentAction::Create {
            title,
            content,
            project,
        } => {
            let project_id = optional_project(ctx, project.as_deref()).await?;
            let mut body = json!({ "name": title });
            if let Some(content) = content {
                body["description_html"] = json!(to_html(&content));
            }
            let page = ctx
                .session
                .client()
                .create_page(&ctx.workspace, project_id.as_deref(), body)
                .await?;
            if ctx.json {
                return print_json(&page);
            }
            println!("{} document {}", "Created".green(), text(&page, "name").bold());
            Ok(())
        }
        DocumentAction::Update {
            query,
            title,
            content,
            project,
        } => {
            let mut body = Map::new();
            if let Some(title) = title {
                body.insert("name".to_string(), json!(title));
            }
            if let Some(content) = content {
                body.insert("description_html".to_string(), json!(to_html(&content)));
            }
            if body.is_empty() {
                return Err(
                    PlaneError::validation("Nothing to update", "Pass --title or --content.")
                        .into(),
                );
            }
            let project_id = optional_project(ctx, project.as_deref()).await?;
            let page = ctx
                .resolver()
                .document(&query, &ctx.workspace, project_id.as_deref())
                .await?;
            let updated = ctx
                .session
                .client()
                .update_page(
                    &ctx.workspace,
                    project_id.as_deref(),
                    &id_of(&page)?,
                    Value::Object(body),
                )
                .await?;
            if ctx.json {
                return print_json(&updated);
            }
            println!("{} document {}", "Updated".green(), text(&updated, "name").bold());
            Ok(())
        }
        DocumentAction::Delete { query, project } => {
            let project_id = optional_project(ctx, project.as_deref()).await?;
            let page = ctx
                .resolver()
                .document(&query, &ctx.workspace, project_id.as_deref())
                .await?;
            ctx.session
                .client()
                .delete_page(&ctx.workspace, project_id.as_deref(), &id_of(&page)?)
                .await?;
            println!("{} document {}", "Deleted".red(), text(&page, "name").bold());
            Ok(())
        }
    }
}

async fn optional_project(ctx: &CommandContext, project: Option<&str>) -> Result<Option<String>> {
    match project {
        Some(project) => Ok(Some(ctx.project_id(project).await?)),
        None => Ok(None),
    }
}

/// Page body as plain text.
fn content_text(page: &Record) -> String {
    let html = str_field(page, "description_html").unwrap_or_default();
    TAG.replace_all(html, "").trim().to_string()
}
