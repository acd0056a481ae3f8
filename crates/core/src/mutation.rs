use crate::coercion::coerce_literal;
use crate::data_source::{DataSource, DataSourceError};
use crate::document::FieldValue;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationCommand {
    Update {
        id: FieldValue,
        field: String,
        value: FieldValue,
    },
    Delete {
        id: FieldValue,
    },
}

impl MutationCommand {
    /// Edit of one field; `raw` goes through literal coercion first.
    #[must_use]
    pub fn edit(id: FieldValue, field: impl Into<String>, raw: &str) -> Self {
        Self::Update {
            id,
            field: field.into(),
            value: coerce_literal(raw),
        }
    }

    #[must_use]
    pub fn delete(id: FieldValue) -> Self {
        Self::Delete { id }
    }

    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }

    #[must_use]
    pub fn document_id(&self) -> &FieldValue {
        match self {
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }

    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Update { field, .. } => Some(field),
            Self::Delete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationResponse {
    pub command: MutationCommand,
    pub result: Result<(), DataSourceError>,
}

pub async fn execute_mutation<S>(source: &S, command: MutationCommand) -> MutationResponse
where
    S: DataSource + ?Sized,
{
    let result = match &command {
        MutationCommand::Update { id, field, value } => source.update(id, field, value).await,
        MutationCommand::Delete { id } => source.delete(id).await,
    };
    MutationResponse { command, result }
}

#[cfg(test)]
mod tests {
    use super::MutationCommand;
    use crate::document::FieldValue;

    #[test]
    fn edit_coerces_raw_input() {
        let command = MutationCommand::edit(FieldValue::Int(1), "active", "false");
        assert_eq!(
            command,
            MutationCommand::Update {
                id: FieldValue::Int(1),
                field: "active".to_string(),
                value: FieldValue::Bool(false),
            }
        );
        assert_eq!(command.operation(), "update");
        assert_eq!(command.field(), Some("active"));
    }

    #[test]
    fn delete_targets_one_identifier() {
        let command = MutationCommand::delete(FieldValue::Int(9));
        assert_eq!(command.document_id(), &FieldValue::Int(9));
        assert_eq!(command.operation(), "delete");
        assert!(command.field().is_none());
    }
}
