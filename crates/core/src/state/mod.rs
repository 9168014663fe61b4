pub mod db;
pub mod export;
pub mod io;
pub mod project;
pub mod store;

pub use db::MarketDb;

pub use export::{export_file_name, export_text, ordered_outputs};
pub use project::{
    goals_match, project_name, AgentOutput, ChatMessage, Project, ProjectStatus, Sender,
};
pub use store::{ProjectStore, StoreError, STORAGE_KEY};
