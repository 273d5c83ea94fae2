use anyhow::Result;
use colored::Colorize;

use super::CommandContext;
use super::utils::{print_fields, print_json, text};
use crate::model::user_display_name;

pub async fn handle_whoami(ctx: &CommandContext) -> Result<()> {
    let me = ctx.session.cached_me(&ctx.workspace).await?;
    if ctx.json {
        return print_json(&me);
    }
    println!("{}", user_display_name(&me).bold());
    print_fields(&[
        ("Email", text(&me, "email")),
        ("ID", text(&me, "id")),
        ("Workspace", ctx.workspace.clone()),
    ]);
    Ok(())
}
