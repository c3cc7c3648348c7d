mod activity_repo;
mod client_repo;
mod entry_repo;
mod project_repo;
mod repo_error;

pub use activity_repo::{ActivityRepository, ActivityRepositoryImpl, NewActivity, UpdateActivity};
pub use client_repo::{ClientRepository, ClientRepositoryImpl, NewClient, UpdateClient};
pub use entry_repo::{EntryRepository, EntryRepositoryImpl, NewManualEntry, UpdateTimeEntry};
pub use project_repo::{NewProject, ProjectRepository, ProjectRepositoryImpl, UpdateProject};
pub use repo_error::RepositoryError;
