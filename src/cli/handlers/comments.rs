use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::utils::{print_empty, print_json, text, timestamp, to_html};
use super::{CommandContext, id_of};
use crate::cli::commands::CommentAction;
use crate::error::PlaneError;
use crate::model::{related_id, str_field, user_display_name};
use crate::resolve::is_uuid;
use std::collections::HashMap;

pub async fn handle_comment(ctx: &CommandContext, action: CommentAction) -> Result<()> {
    match action {
        CommentAction::List { work_item, project } => {
            let (item, project_id) = ctx.locate_work_item(&work_item, project.as_deref()).await?;
            let comments = ctx
                .session
                .client()
                .list_comments(&ctx.workspace, &project_id, &id_of(&item)?)
                .await?;
            if ctx.json {
                return print_json(&comments);
            }
            if comments.is_empty() {
                print_empty("comments");
                return Ok(());
            }

            let authors: HashMap<String, String> = ctx
                .session
                .cached_members(&ctx.workspace)
                .await
                .unwrap_or_default()
                .iter()
                .filter_map(|m| Some((id_of(m).ok()?, user_display_name(m))))
                .collect();

            for comment in &comments {
                let author = related_id(comment, "actor")
                    .or_else(|| related_id(comment, "created_by"))
                    .map(|id| authors.get(&id).cloned().unwrap_or(id))
                    .unwrap_or_default();
                println!(
                    "{} {}",
                    author.cyan().bold(),
                    timestamp(comment, "created_at").dimmed()
                );
                let body = str_field(comment, "comment_stripped")
                    .or_else(|| str_field(comment, "comment_html"))
                    .unwrap_or_default();
                println!("{}\n", body.trim());
            }
            Ok(())
        }
        CommentAction::Add {
            work_item,
            text: comment,
            project,
        } => {
            let (item, project_id) = ctx.locate_work_item(&work_item, project.as_deref()).await?;
            let created = ctx
                .session
                .client()
                .create_comment(
                    &ctx.workspace,
                    &project_id,
                    &id_of(&item)?,
                    json!({ "comment_html": to_html(&comment) }),
                )
                .await?;
            if ctx.json {
                return print_json(&created);
            }
            println!("{} comment on {}", "Added".green(), text(&item, "name").bold());
            Ok(())
        }
        CommentAction::Update {
            work_item,
            comment,
            text: new_text,
            project,
        } => {
            check_comment_id(&comment)?;
            let (item, project_id) = ctx.locate_work_item(&work_item, project.as_deref()).await?;
            let updated = ctx
                .session
                .client()
                .update_comment(
                    &ctx.workspace,
                    &project_id,
                    &id_of(&item)?,
                    &comment,
                    json!({ "comment_html": to_html(&new_text) }),
                )
                .await?;
            if ctx.json {
                return print_json(&updated);
            }
            println!("{} comment on {}", "Updated".green(), text(&item, "name").bold());
            Ok(())
        }
        CommentAction::Delete {
            work_item,
            comment,
            project,
        } => {
            check_comment_id(&comment)?;
            let (item, project_id) = ctx.locate_work_item(&work_item, project.as_deref()).await?;
            ctx.session
                .client()
                .delete_comment(&ctx.workspace, &project_id, &id_of(&item)?, &comment)
                .await?;
            println!("{} comment on {}", "Deleted".red(), text(&item, "name").bold());
            Ok(())
        }
    }
}

/// Comments have no name to match on.
fn check_comment_id(comment: &str) -> Result<()> {
    if is_uuid(comment) {
        return Ok(());
    }
    Err(PlaneError::validation(
        format!("Not a comment UUID: {}", comment),
        "Run `planecli comment list <work item> --json` to see comment IDs.",
    )
    .into())
}
