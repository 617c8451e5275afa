pub mod cpf_registry;
pub mod db_utils;
pub mod validation;
