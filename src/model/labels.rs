use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{GenreError, Result};

/// The closed set of genres the deployed models are trained on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Blues,
    Classical,
    Country,
    Disco,
    Hiphop,
    Jazz,
    Metal,
    Pop,
    Reggae,
    Rock,
}

impl Genre {
    /// All genres in label-encoder order.
    pub const ALL: [Genre; 10] = [
        Genre::Blues,
        Genre::Classical,
        Genre::Country,
        Genre::Disco,
        Genre::Hiphop,
        Genre::Jazz,
        Genre::Metal,
        Genre::Pop,
        Genre::Reggae,
        Genre::Rock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Blues => "blues",
            Genre::Classical => "classical",
            Genre::Country => "country",
            Genre::Disco => "disco",
            Genre::Hiphop => "hiphop",
            Genre::Jazz => "jazz",
            Genre::Metal => "metal",
            Genre::Pop => "pop",
            Genre::Reggae => "reggae",
            Genre::Rock => "rock",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGenreError(pub String);

impl fmt::Display for ParseGenreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown genre `{}`", self.0)
    }
}

impl std::error::Error for ParseGenreError {}

impl FromStr for Genre {
    type Err = ParseGenreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| ParseGenreError(s.to_string()))
    }
}

/// Class index to genre, in the order the classifier was trained with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: Vec<Genre>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            labels: Genre::ALL.to_vec(),
        }
    }
}

impl LabelTable {
    pub fn new(labels: Vec<Genre>) -> anyhow::Result<Self> {
        let table = Self { labels };
        table.validate()?;
        Ok(table)
    }

    /// Every genre must appear exactly once.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.labels.len() != Genre::ALL.len() {
            anyhow::bail!(
                "label table has {} entries, expected {}",
                self.labels.len(),
                Genre::ALL.len()
            );
        }
        for g in Genre::ALL {
            let count = self.labels.iter().filter(|&&l| l == g).count();
            if count != 1 {
                anyhow::bail!("genre `{g}` appears {count} times in the label table");
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn genres(&self) -> &[Genre] {
        &self.labels
    }

    pub fn decode(&self, index: usize) -> Result<Genre> {
        self.labels
            .get(index)
            .copied()
            .ok_or(GenreError::UnknownClass {
                index,
                classes: self.labels.len(),
            })
    }

    /// Inverse of [`decode`](Self::decode).
    pub fn index_of(&self, genre: Genre) -> Option<usize> {
        self.labels.iter().position(|&g| g == genre)
    }
}
