use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Role tag stored on every user. Exactly one per user.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ToSchema,
)]
pub enum Role {
    #[serde(rename = "secretario")]
    #[strum(serialize = "secretario")]
    Secretary,
    #[serde(rename = "residente")]
    #[strum(serialize = "residente")]
    Resident,
    #[serde(rename = "preceptor")]
    #[strum(serialize = "preceptor")]
    Preceptor,
    #[serde(rename = "coordenador_programa")]
    #[strum(serialize = "coordenador_programa")]
    ProgramCoordinator,
    #[serde(rename = "coordenador_geral")]
    #[strum(serialize = "coordenador_geral")]
    GeneralCoordinator,
    #[serde(rename = "tutor")]
    #[strum(serialize = "tutor")]
    Tutor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Roles allowed to manage organisation and people records.
    pub fn is_staff(self) -> bool {
        matches!(
            self,
            Role::Secretary | Role::GeneralCoordinator | Role::ProgramCoordinator
        )
    }

    pub fn is_coordinator(self) -> bool {
        matches!(self, Role::GeneralCoordinator | Role::ProgramCoordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn tags_match_stored_values() {
        assert_eq!(Role::ProgramCoordinator.as_str(), "coordenador_programa");
        assert_eq!(Role::from_str("residente").unwrap(), Role::Resident);
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn serde_and_strum_agree() {
        for role in Role::iter() {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, role.as_str());
            assert_eq!(role.to_string(), role.as_str());
        }
    }
}
