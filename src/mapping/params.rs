use crate::types::SqlValue;

/// One named query parameter: the field name (without the `@` sigil) and
/// its value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: &'static str,
    pub value: SqlValue,
}

impl BoundParam {
    #[must_use]
    pub fn new(name: &'static str, value: impl Into<SqlValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A parameter record whose fields become named query parameters.
///
/// Register a struct with [`impl_to_params!`](crate::impl_to_params); the
/// unit type `()` is the empty parameter record for non-parameterized
/// commands.
pub trait ToParams {
    fn to_params(&self) -> Vec<BoundParam>;
}

impl ToParams for () {
    fn to_params(&self) -> Vec<BoundParam> {
        Vec::new()
    }
}

impl<P: ToParams> ToParams for &P {
    fn to_params(&self) -> Vec<BoundParam> {
        (**self).to_params()
    }
}

/// Keep only the parameters a command text actually references.
///
/// A parameter survives iff the command contains the literal token
/// `@<name>` as a substring. This is containment, not tokenization: a name
/// that is a prefix of a longer token (`@Id` vs `@IdUser`) false-positive
/// matches. That imprecision is inherited behavior callers may rely on; do
/// not tighten it here.
#[must_use]
pub fn matching_command(cmd: &str, mut params: Vec<BoundParam>) -> Vec<BoundParam> {
    params.retain(|param| cmd.contains(&format!("@{}", param.name)));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id_params() -> Vec<BoundParam> {
        vec![
            BoundParam::new("UserId", 7i64),
            BoundParam::new("Name", "nobody"),
        ]
    }

    #[test]
    fn binds_only_referenced_fields() {
        let bound = matching_command("SELECT * FROM Users WHERE Id=@UserId", user_id_params());
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name, "UserId");
        assert_eq!(bound[0].value, SqlValue::Int(7));
    }

    #[test]
    fn empty_record_binds_nothing() {
        assert!(matching_command("SELECT 1", ().to_params()).is_empty());
    }

    #[test]
    fn unreferenced_fields_are_dropped() {
        let bound = matching_command("SELECT 1", user_id_params());
        assert!(bound.is_empty());
    }

    #[test]
    fn substring_containment_false_positives_are_kept() {
        // "@Id" is a substring of "@IdUser", so a field named Id still
        // binds. Inherited containment semantics.
        let bound = matching_command(
            "SELECT * FROM Users WHERE Id=@IdUser",
            vec![BoundParam::new("Id", 1i64)],
        );
        assert_eq!(bound.len(), 1);
    }

    #[test]
    fn binding_preserves_declaration_order() {
        let bound = matching_command(
            "UPDATE Users SET Name=@Name WHERE Id=@UserId",
            user_id_params(),
        );
        let names: Vec<&str> = bound.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["UserId", "Name"]);
    }
}
