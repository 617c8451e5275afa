pub mod profile;
pub mod program;
pub mod resident;
pub mod role;
pub mod sector;
pub mod turma;
pub mod user;
pub mod workday;
