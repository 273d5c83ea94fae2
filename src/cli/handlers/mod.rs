mod cache;
mod comments;
mod configure;
mod cycles;
mod documents;
mod labels;
mod modules;
mod projects;
mod states;
mod users;
mod utils;
mod whoami;
mod work_items;

pub use cache::{handle_cache, handle_cache_clear, handle_cache_path};
pub use comments::handle_comment;
pub use configure::handle_configure;
pub use cycles::handle_cycle;
pub use documents::handle_document;
pub use labels::handle_label;
pub use modules::handle_module;
pub use projects::handle_project;
pub use states::handle_state;
pub use users::handle_user;
pub use whoami::handle_whoami;
pub use work_items::handle_work_item;

use crate::error::PlaneError;
use crate::model::{Record, record_id};
use crate::resolve::Resolver;
use crate::session::Session;
use anyhow::Result;

/// Common context passed to all command handlers
pub struct CommandContext {
    pub session: Session,
    pub workspace: String,
    pub json: bool,
}

impl CommandContext {
    pub fn new(session: Session, workspace: String, json: bool) -> Self {
        Self {
            session,
            workspace,
            json,
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        self.session.resolver()
    }

    /// Resolve a project query to its record.
    pub async fn project(&self, query: &str) -> Result<Record> {
        Ok(self.resolver().project(query, &self.workspace).await?)
    }

    /// Resolve a project query to its ID.
    pub async fn project_id(&self, query: &str) -> Result<String> {
        let project = self.project(query).await?;
        Ok(id_of(&project)?)
    }

    /// Find a work item and the project it lives in.
    pub async fn locate_work_item(
        &self,
        query: &str,
        project: Option<&str>,
    ) -> Result<(Record, String)> {
        match project {
            Some(project) => {
                let project_id = self.project_id(project).await?;
                let item = self
                    .resolver()
                    .work_item(query, &self.workspace, Some(&project_id))
                    .await?;
                Ok((item, project_id))
            }
            None => Ok(self
                .resolver()
                .work_item_across_projects(query, &self.workspace)
                .await?),
        }
    }
}

pub(crate) fn id_of(record: &Record) -> crate::error::Result<String> {
    record_id(record)
        .map(str::to_string)
        .ok_or_else(|| PlaneError::Decode("record has no id".to_string()))
}
