//! Tags and recurrence attached to a transaction.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

const TAG_SEPARATOR: char = ',';

/// An ordered set of free-form labels.
///
/// Blank tags are dropped and duplicates keep their first position. The set is
/// persisted as a comma separated string, so tags may not contain commas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct Tags(Vec<String>);

impl TryFrom<Vec<String>> for Tags {
    type Error = Error;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(tags)
    }
}

impl Tags {
    /// Create a tag set from `tags`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidTag] if any tag contains a comma.
    pub fn new<I, S>(tags: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();

        for tag in tags {
            let tag = tag.as_ref().trim();

            if tag.contains(TAG_SEPARATOR) {
                return Err(Error::InvalidTag(tag.to_owned()));
            }

            if !tag.is_empty() && !unique.iter().any(|existing| existing == tag) {
                unique.push(tag.to_owned());
            }
        }

        Ok(Self(unique))
    }

    /// Parse the value of the `tags` column.
    pub(crate) fn from_column(text: &str) -> Self {
        let mut unique: Vec<String> = Vec::new();

        for tag in text.split(TAG_SEPARATOR).map(str::trim) {
            if !tag.is_empty() && !unique.iter().any(|existing| existing == tag) {
                unique.push(tag.to_owned());
            }
        }

        Self(unique)
    }

    /// The value stored in the `tags` column.
    pub(crate) fn to_column(&self) -> String {
        self.0.join(&TAG_SEPARATOR.to_string())
    }

    /// Iterate over the tags in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// How often a recurring transaction repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Repeats every week.
    Weekly,
    /// Repeats every month.
    Monthly,
}

impl Frequency {
    /// The value stored in the `recurringFrequency` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            _ => Err(Error::UnknownFrequency(s.to_owned())),
        }
    }
}

/// Decode the `isRecurring` and `recurringFrequency` column pair.
///
/// A row flagged as recurring with an empty frequency predates frequencies
/// being required and is read as non-recurring.
pub(crate) fn recurrence_from_columns(
    is_recurring: bool,
    frequency: &str,
) -> Result<Option<Frequency>, Error> {
    if !is_recurring || frequency.is_empty() {
        return Ok(None);
    }

    frequency.parse().map(Some)
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{Frequency, Tags, recurrence_from_columns};

    #[test]
    fn new_drops_blank_and_duplicate_tags() {
        let tags = Tags::new(["groceries", " ", "weekly shop", "groceries"]).unwrap();

        assert_eq!(
            tags.iter().collect::<Vec<_>>(),
            ["groceries", "weekly shop"]
        );
    }

    #[test]
    fn new_rejects_commas() {
        let tags = Tags::new(["fish, chips"]);

        assert_eq!(tags, Err(Error::InvalidTag("fish, chips".to_owned())));
    }

    #[test]
    fn column_text_keeps_order() {
        let tags = Tags::new(["b", "a", "c"]).unwrap();

        assert_eq!(tags.to_column(), "b,a,c");
        assert_eq!(Tags::from_column("b,a,c"), tags);
    }

    #[test]
    fn empty_column_is_empty_set() {
        assert!(Tags::from_column("").is_empty());
    }

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!(
            "fortnightly".parse::<Frequency>(),
            Err(Error::UnknownFrequency("fortnightly".to_owned()))
        );
    }

    #[test]
    fn non_recurring_row_ignores_frequency() {
        assert_eq!(recurrence_from_columns(false, "WEEKLY"), Ok(None));
        assert_eq!(recurrence_from_columns(true, ""), Ok(None));
        assert_eq!(
            recurrence_from_columns(true, "WEEKLY"),
            Ok(Some(Frequency::Weekly))
        );
    }

    #[test]
    fn deserialized_tags_are_validated() {
        let tags: Tags = serde_json::from_str(r#"["home", " home ", ""]"#).unwrap();
        assert_eq!(tags, Tags::new(["home"]).unwrap());

        let result = serde_json::from_str::<Tags>(r#"["rent,bills"]"#);
        assert!(result.is_err());
    }
}
