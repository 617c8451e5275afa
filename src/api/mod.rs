pub mod coordinator;
pub mod dashboard;
pub mod preceptor;
pub mod program;
pub mod resident;
pub mod sector;
pub mod turma;
pub mod user;
pub mod workday;
