use crate::model::Priority;
use chrono::NaiveDate;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "planecli")]
#[command(
    author,
    version,
    about = "A command-line client for Plane.so with fuzzy name resolution"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Plane instance URL, e.g. https://api.plane.so
    #[arg(long, global = true, env = "PLANE_BASE_URL")]
    pub base_url: Option<String>,

    /// API key used for the X-API-Key header
    #[arg(long, global = true, env = "PLANE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Workspace slug
    #[arg(short = 'w', long, global = true, env = "PLANE_WORKSPACE")]
    pub workspace: Option<String>,

    /// Path to config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Always fetch fresh data; results still refresh the cache
    #[arg(
        long,
        global = true,
        env = "PLANECLI_NO_CACHE",
        value_parser = BoolishValueParser::new()
    )]
    pub no_cache: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to this file (rotated daily)
    #[arg(long, global = true, env = "PLANECLI_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the authenticated user
    Whoami,

    /// Store connection settings in the config file
    Configure,

    /// Manage the local API cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Projects in the workspace
    #[command(visible_alias = "projects")]
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Work items (issues)
    #[command(name = "wi", visible_alias = "work-item", visible_alias = "issue")]
    WorkItem {
        #[command(subcommand)]
        action: WorkItemAction,
    },

    /// Workflow states of a project
    #[command(visible_alias = "states")]
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Labels of a project
    #[command(visible_alias = "labels")]
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },

    /// Modules of a project
    #[command(visible_alias = "modules")]
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },

    /// Cycles of a project
    #[command(visible_alias = "cycles")]
    Cycle {
        #[command(subcommand)]
        action: CycleAction,
    },

    /// Workspace members
    #[command(visible_alias = "users")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Comments on a work item
    #[command(visible_alias = "comments")]
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Documents (pages) of a project or the workspace
    #[command(name = "doc", visible_alias = "document", visible_alias = "docs")]
    Document {
        #[command(subcommand)]
        action: DocumentAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove every cached entry
    Clear,

    /// Print the cache directory
    Path,

    /// Drop one cached listing
    Invalidate {
        /// projects, members, me, states, labels, modules, cycles, work_items, estimate_points
        resource: String,

        /// Project (name, identifier, or UUID) for project-scoped listings
        #[arg(short, long)]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// List projects
    #[command(visible_alias = "ls")]
    List {
        /// Only projects in this state
        #[arg(short, long, value_enum)]
        state: Option<ProjectStateArg>,

        #[arg(long, value_enum, default_value = "linear")]
        sort: ProjectSortArg,

        /// Maximum number of projects to print
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },

    /// Show one project
    Show {
        /// Name, identifier, or UUID
        query: String,
    },

    /// Create a project
    #[command(visible_alias = "new")]
    Create {
        name: String,

        /// Short identifier, e.g. FE; the server picks one if omitted
        #[arg(short, long)]
        identifier: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Rename a project or change its description
    Update {
        /// Name, identifier, or UUID
        query: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Delete a project
    Delete {
        /// Name, identifier, or UUID
        query: String,
    },
}

#[derive(Subcommand)]
pub enum WorkItemAction {
    /// List work items; without --project, lists across all projects
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: Option<String>,

        /// Only items in this state
        #[arg(short, long)]
        state: Option<String>,

        /// Only items assigned to this user ("me" works)
        #[arg(short, long)]
        assignee: Option<String>,

        /// Only items carrying all of these labels (comma-separated)
        #[arg(short, long = "labels", value_delimiter = ',')]
        label: Vec<String>,

        /// Newest first by this timestamp
        #[arg(long, value_enum, default_value = "created")]
        sort: SortArg,

        /// Maximum number of items to print
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },

    /// Show one work item
    Show {
        /// Identifier (ABC-123), UUID, or name (requires --project)
        query: String,

        #[arg(short, long)]
        project: Option<String>,
    },

    /// Search work items by text across the workspace
    Search {
        query: String,

        /// Only results from this project
        #[arg(short, long)]
        project: Option<String>,

        #[arg(long, value_enum, default_value = "created")]
        sort: SortArg,

        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Create a work item
    #[command(visible_alias = "new")]
    Create {
        /// Title of the work item
        title: String,

        #[arg(short, long)]
        project: String,

        /// Description (plain text)
        #[arg(short = 'd', long)]
        description: Option<String>,

        #[arg(short, long)]
        state: Option<String>,

        /// urgent, high, medium, low, none; or 1-4 with 0 for none
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,

        /// Assignee (repeatable)
        #[arg(short, long)]
        assignee: Vec<String>,

        /// Labels (repeatable or comma-separated)
        #[arg(short, long = "labels", value_delimiter = ',')]
        label: Vec<String>,

        /// Module to add the new item to
        #[arg(short, long)]
        module: Option<String>,

        /// Parent work item (ABC-123 or UUID)
        #[arg(long)]
        parent: Option<String>,

        /// Estimate point value or UUID
        #[arg(short, long)]
        estimate: Option<String>,
    },

    /// Update a work item
    Update {
        /// Identifier (ABC-123), UUID, or name (requires --project)
        query: String,

        #[arg(short, long)]
        project: Option<String>,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,

        #[arg(short, long)]
        state: Option<String>,

        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,

        /// Replace assignees (repeatable)
        #[arg(short, long)]
        assignee: Vec<String>,

        /// Replace labels (repeatable or comma-separated)
        #[arg(short, long = "labels", value_delimiter = ',', conflicts_with = "clear_labels")]
        label: Vec<String>,

        /// Remove every label
        #[arg(long)]
        clear_labels: bool,

        /// Estimate point value or UUID
        #[arg(short, long)]
        estimate: Option<String>,
    },

    /// Assign a work item to one user, yourself by default
    Assign {
        /// Identifier (ABC-123), UUID, or name (requires --project)
        query: String,

        #[arg(short, long, default_value = "me")]
        assignee: String,

        #[arg(short, long)]
        project: Option<String>,
    },

    /// Delete a work item
    Delete {
        /// Identifier (ABC-123), UUID, or name (requires --project)
        query: String,

        #[arg(short, long)]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StateAction {
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: String,
    },
    Show {
        query: String,

        #[arg(short, long)]
        project: String,
    },
    Create {
        name: String,

        #[arg(short, long)]
        project: String,

        #[arg(short, long, value_enum)]
        group: StateGroupArg,

        /// Hex color
        #[arg(short, long, default_value = "#000000")]
        color: String,
    },
    Update {
        query: String,

        #[arg(short, long)]
        project: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long, value_enum)]
        group: Option<StateGroupArg>,

        #[arg(short, long)]
        color: Option<String>,
    },
    Delete {
        query: String,

        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum LabelAction {
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: String,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    Show {
        query: String,

        #[arg(short, long)]
        project: String,
    },
    Create {
        name: String,

        #[arg(short, long)]
        project: String,

        /// Hex color, e.g. #ff0000
        #[arg(short, long)]
        color: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    Update {
        query: String,

        #[arg(short, long)]
        project: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        color: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    Delete {
        query: String,

        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum ModuleAction {
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: String,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    Show {
        query: String,

        #[arg(short, long)]
        project: String,
    },
    Create {
        name: String,

        #[arg(short, long)]
        project: String,

        #[arg(short = 'd', long)]
        description: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Target date, YYYY-MM-DD
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    Update {
        query: String,

        #[arg(short, long)]
        project: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    Delete {
        query: String,

        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum CycleAction {
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: String,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    Show {
        query: String,

        #[arg(short, long)]
        project: String,
    },
    Create {
        name: String,

        #[arg(short, long)]
        project: String,

        #[arg(short = 'd', long)]
        description: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// YYYY-MM-DD
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    Update {
        query: String,

        #[arg(short, long)]
        project: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short = 'd', long)]
        description: Option<String>,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    Delete {
        query: String,

        #[arg(short, long)]
        project: String,
    },
    /// Work items in a cycle
    Items {
        query: String,

        #[arg(short, long)]
        project: String,

        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    /// Add a work item to a cycle
    AddItem {
        /// Cycle name or UUID
        query: String,

        /// Work item in the same project (ABC-123, UUID, or name)
        work_item: String,

        #[arg(short, long)]
        project: String,
    },
    /// Remove a work item from a cycle
    RemoveItem {
        /// Cycle name or UUID
        query: String,

        /// Work item in the same project (ABC-123, UUID, or name)
        work_item: String,

        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    #[command(visible_alias = "ls")]
    List,
    Show {
        /// "me", UUID, email, or name
        query: String,
    },
}

#[derive(Subcommand)]
pub enum CommentAction {
    #[command(visible_alias = "ls")]
    List {
        /// Work item (ABC-123, UUID, or name with --project)
        work_item: String,

        #[arg(short, long)]
        project: Option<String>,
    },
    #[command(visible_alias = "create", visible_alias = "new")]
    Add {
        /// Work item (ABC-123, UUID, or name with --project)
        work_item: String,

        /// Comment text
        text: String,

        #[arg(short, long)]
        project: Option<String>,
    },
    Update {
        /// Work item (ABC-123, UUID, or name with --project)
        work_item: String,

        /// Comment UUID
        comment: String,

        /// New comment text
        text: String,

        #[arg(short, long)]
        project: Option<String>,
    },
    Delete {
        /// Work item (ABC-123, UUID, or name with --project)
        work_item: String,

        /// Comment UUID
        comment: String,

        #[arg(short, long)]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DocumentAction {
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        project: String,
    },
    Show {
        /// UUID, or title with --project
        query: String,

        /// Project of the document; workspace pages otherwise
        #[arg(short, long)]
        project: Option<String>,
    },
    #[command(visible_alias = "new")]
    Create {
        title: String,

        /// Content (plain text)
        #[arg(short, long)]
        content: Option<String>,

        /// Create in this project; a workspace page otherwise
        #[arg(short, long)]
        project: Option<String>,
    },
    Update {
        /// UUID, or title with --project
        query: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        #[arg(short, long)]
        project: Option<String>,
    },
    Delete {
        /// UUID, or title with --project
        query: String,

        #[arg(short, long)]
        project: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    #[value(alias = "1")]
    Urgent,
    #[value(alias = "2")]
    High,
    #[value(alias = "3")]
    Medium,
    #[value(alias = "4")]
    Low,
    #[value(alias = "0")]
    None,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Urgent => Priority::Urgent,
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
            PriorityArg::None => Priority::None,
        }
    }
}

/// Listing order; both sort newest first.
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum SortArg {
    Created,
    Updated,
}

impl SortArg {
    pub fn field(self) -> &'static str {
        match self {
            SortArg::Created => "created_at",
            SortArg::Updated => "updated_at",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ProjectSortArg {
    /// The workspace's manual ordering
    Linear,
    Created,
    Updated,
}

/// Project lifecycle, stored by the API in the `network` field.
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ProjectStateArg {
    Planned,
    Started,
    Paused,
    Completed,
    Canceled,
}

impl ProjectStateArg {
    pub fn network(self) -> u64 {
        match self {
            ProjectStateArg::Planned => 0,
            ProjectStateArg::Started => 1,
            ProjectStateArg::Paused => 2,
            ProjectStateArg::Completed => 3,
            ProjectStateArg::Canceled => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum StateGroupArg {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Cancelled,
    Triage,
}

impl StateGroupArg {
    pub fn as_str(self) -> &'static str {
        match self {
            StateGroupArg::Backlog => "backlog",
            StateGroupArg::Unstarted => "unstarted",
            StateGroupArg::Started => "started",
            StateGroupArg::Completed => "completed",
            StateGroupArg::Cancelled => "cancelled",
            StateGroupArg::Triage => "triage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_work_item_create() {
        let cli = Cli::try_parse_from([
            "planecli", "wi", "create", "Fix login", "-p", "FE", "--priority", "high", "-a",
            "me", "-a", "bob", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::WorkItem {
                action:
                    WorkItemAction::Create {
                        title,
                        project,
                        priority,
                        assignee,
                        ..
                    },
            } => {
                assert_eq!(title, "Fix login");
                assert_eq!(project, "FE");
                assert_eq!(priority.map(Priority::from), Some(Priority::High));
                assert_eq!(assignee, vec!["me", "bob"]);
            }
            _ => panic!("expected wi create"),
        }
    }

    #[test]
    fn test_state_list_requires_project() {
        assert!(Cli::try_parse_from(["planecli", "state", "list"]).is_err());
    }

    #[test]
    fn test_numeric_priorities() {
        for (raw, expected) in [
            ("0", Priority::None),
            ("1", Priority::Urgent),
            ("4", Priority::Low),
        ] {
            let cli = Cli::try_parse_from(["planecli", "wi", "update", "FE-1", "--priority", raw])
                .unwrap();
            match cli.command {
                Commands::WorkItem {
                    action: WorkItemAction::Update { priority, .. },
                } => assert_eq!(priority.map(Priority::from), Some(expected)),
                _ => panic!("expected wi update"),
            }
        }
    }

    #[test]
    fn test_work_item_list_defaults() {
        let cli = Cli::try_parse_from(["planecli", "wi", "ls", "--labels", "bug,ui"]).unwrap();
        match cli.command {
            Commands::WorkItem {
                action:
                    WorkItemAction::List {
                        label, sort, limit, ..
                    },
            } => {
                assert_eq!(label, vec!["bug", "ui"]);
                assert_eq!(sort, SortArg::Created);
                assert_eq!(limit, 50);
            }
            _ => panic!("expected wi list"),
        }
    }

    #[test]
    fn test_clear_labels_conflicts_with_labels() {
        assert!(
            Cli::try_parse_from(["planecli", "wi", "update", "FE-1", "--clear-labels", "-l", "x"])
                .is_err()
        );
    }

    #[test]
    fn test_dates_are_validated() {
        let parsed = Cli::try_parse_from([
            "planecli", "cycle", "create", "Sprint 1", "-p", "FE", "--start-date", "2025-01-06",
        ]);
        assert!(parsed.is_ok());
        let bad = Cli::try_parse_from([
            "planecli", "cycle", "create", "Sprint 1", "-p", "FE", "--start-date", "next week",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_document_aliases() {
        for group in ["doc", "docs", "document"] {
            assert!(Cli::try_parse_from(["planecli", group, "list", "-p", "FE"]).is_ok());
        }
        assert!(Cli::try_parse_from(["planecli", "doc", "list"]).is_err());
    }
}
