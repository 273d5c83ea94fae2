use anyhow::Result;
use colored::Colorize;

use super::CommandContext;
use super::utils::{print_empty, print_fields, print_json, print_table, text};
use crate::cli::commands::UserAction;
use crate::model::user_display_name;

pub async fn handle_user(ctx: &CommandContext, action: UserAction) -> Result<()> {
    match action {
        UserAction::List => {
            let members = ctx.session.cached_members(&ctx.workspace).await?;
            if ctx.json {
                return print_json(&members);
            }
            if members.is_empty() {
                print_empty("members");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = members
                .iter()
                .map(|m| vec![user_display_name(m), text(m, "email"), text(m, "id")])
                .collect();
            print_table(&["NAME", "EMAIL", "ID"], &rows);
            Ok(())
        }
        UserAction::Show { query } => {
            let user = ctx.resolver().user(&query, &ctx.workspace).await?;
            if ctx.json {
                return print_json(&user);
            }
            println!("{}", user_display_name(&user).bold());
            print_fields(&[
                ("Email", text(&user, "email")),
                ("ID", text(&user, "id")),
                ("Name", {
                    let first = text(&user, "first_name");
                    let last = text(&user, "last_name");
                    format!("{} {}", first, last).trim().to_string()
                }),
            ]);
            Ok(())
        }
    }
}
