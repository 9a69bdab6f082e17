use uuid::Uuid;

/// Strongly typed ID for movies
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Copy,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct MovieId(pub Uuid);

impl Default for MovieId {
    fn default() -> Self {
        Self::new()
    }
}

impl MovieId {
    pub fn new() -> Self {
        MovieId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for MovieId {
    fn from(value: Uuid) -> Self {
        MovieId(value)
    }
}

impl AsRef<Uuid> for MovieId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for persons
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Copy,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonId {
    pub fn new() -> Self {
        PersonId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for PersonId {
    fn from(value: Uuid) -> Self {
        PersonId(value)
    }
}

impl AsRef<Uuid> for PersonId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for genres
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Copy,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct GenreId(pub Uuid);

impl Default for GenreId {
    fn default() -> Self {
        Self::new()
    }
}

impl GenreId {
    pub fn new() -> Self {
        GenreId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for GenreId {
    fn from(value: Uuid) -> Self {
        GenreId(value)
    }
}

impl AsRef<Uuid> for GenreId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for GenreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
