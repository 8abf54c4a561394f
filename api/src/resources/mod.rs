pub mod annotation;
pub mod dataset;
pub mod image;
pub mod link;
pub mod project;

use crate::error::{Error, Result};

/// An identifier for a server object, rendered by the CLI as `<Kind>:<id>`.
pub trait ObjectId: Copy {
    const KIND: &'static str;

    fn value(&self) -> u64;

    /// The `<Kind>:<id>` form used to reference the object in later commands.
    fn reference(&self) -> String {
        format!("{}:{}", Self::KIND, self.value())
    }
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub u64);

        impl $crate::resources::ObjectId for $name {
            const KIND: &'static str = $kind;

            fn value(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}:{}", $kind, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::Error;

            fn from_str(string: &str) -> $crate::error::Result<Self> {
                $crate::resources::parse_reference($kind, string).map($name)
            }
        }
    };
}

pub(crate) use object_id;

/// Parses `<kind>:<id>`, also accepting a bare numeric id.
pub(crate) fn parse_reference(kind: &'static str, string: &str) -> Result<u64> {
    let bad_identifier = || Error::BadIdentifier {
        kind,
        identifier: string.to_owned(),
    };
    let trimmed = string.trim();
    let number = match trimmed.split_once(':') {
        Some((prefix, number)) if prefix == kind => number,
        Some(_) => return Err(bad_identifier()),
        None => trimmed,
    };
    number.parse().map_err(|_| bad_identifier())
}

/// Finds the identifier printed by an `obj new <kind>` command.
pub(crate) fn find_created(kind: &'static str, command: &str, stdout: &str) -> Result<u64> {
    stdout
        .lines()
        .rev()
        .find_map(|line| parse_reference(kind, line).ok())
        .ok_or_else(|| Error::BadResponse {
            command: command.to_owned(),
            output: stdout.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{
        dataset::DatasetId,
        project::{Project, ProjectId},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_display_reference() {
        let id: DatasetId = "Dataset:51".parse().unwrap();
        assert_eq!(id, DatasetId(51));
        assert_eq!(id.to_string(), "Dataset:51");
        assert_eq!(id.reference(), "Dataset:51");

        assert_eq!("7".parse::<ProjectId>().unwrap(), ProjectId(7));
    }

    #[test]
    fn test_parse_rejects_other_kinds() {
        let error = "Project:3".parse::<DatasetId>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Expected a Dataset identifier of the form `Dataset:<id>`, got: Project:3"
        );
        assert!("Dataset:abc".parse::<DatasetId>().is_err());
        assert!("".parse::<DatasetId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_bare_numbers() {
        let project = Project {
            id: ProjectId(4),
            name: "seed-project".to_owned(),
        };
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(json, r#"{"id":4,"name":"seed-project"}"#);
        assert_eq!(serde_json::from_str::<Project>(&json).unwrap(), project);
    }

    #[test]
    fn test_find_created_uses_last_matching_line() {
        let stdout = "Using session for root@localhost:4064\nDataset:12\n";
        assert_eq!(
            find_created("Dataset", "obj new Dataset", stdout).unwrap(),
            12
        );

        let error = find_created("Dataset", "obj new Dataset", "nothing here\n").unwrap_err();
        assert!(matches!(error, Error::BadResponse { .. }));
    }
}
