use crate::error::ModelError;

/// Credit a person holds on a movie.
///
/// The catalog stores roles as lowercase strings; any other value is a
/// data integrity problem and must surface as an error rather than be
/// coerced.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Actor,
    Writer,
    Director,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Actor => "actor",
            Role::Writer => "writer",
            Role::Director => "director",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        match value {
            "actor" => Ok(Role::Actor),
            "writer" => Ok(Role::Writer),
            "director" => Ok(Role::Director),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
