//! Static season calendar and its flattening into an ordered turn sequence.

use std::{collections::HashSet, fmt};

use indexmap::IndexMap;
use serde::{
    de::{self, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use shared::domain::{TurnKey, FINALE_YEAR};
use thiserror::Error;

pub const JUNIOR_YEAR: &str = "Junior Year";
pub const CLASSIC_YEAR: &str = "Classic Year";
pub const SENIOR_YEAR: &str = "Senior Year";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar is not valid JSON: {0}")]
    Parse(String),
    #[error("year '{year}' has no dates")]
    EmptyYear { year: String },
    #[error("'Finale Underway' must contain exactly one date named 'Finale Underway'")]
    MalformedFinale,
    #[error("turn '{0}' appears more than once")]
    DuplicateTurn(TurnKey),
}

/// Ordered year label -> ordered date labels. Key order is chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Calendar {
    years: IndexMap<String, Vec<String>>,
}

// A repeated year label is an error rather than last-wins.
impl<'de> Deserialize<'de> for Calendar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct YearsVisitor;

        impl<'de> Visitor<'de> for YearsVisitor {
            type Value = Calendar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping year labels to lists of dates")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Calendar, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut years = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((year, dates)) = access.next_entry::<String, Vec<String>>()? {
                    if years.contains_key(&year) {
                        return Err(de::Error::custom(format_args!(
                            "year '{year}' appears more than once"
                        )));
                    }
                    years.insert(year, dates);
                }
                Ok(Calendar { years })
            }
        }

        deserializer.deserialize_map(YearsVisitor)
    }
}

/// One schedulable slot of the flattened calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    pub year: String,
    pub date: String,
    pub key: TurnKey,
}

impl Calendar {
    pub fn from_years<Y, D>(years: impl IntoIterator<Item = (Y, Vec<D>)>) -> Self
    where
        Y: Into<String>,
        D: Into<String>,
    {
        Self {
            years: years
                .into_iter()
                .map(|(year, dates)| (year.into(), dates.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Three years of half-month turns followed by the finale.
    pub fn default_season() -> Self {
        let dates: Vec<String> = MONTHS
            .iter()
            .flat_map(|month| [format!("Early {month}"), format!("Late {month}")])
            .collect();

        Self::from_years([
            (JUNIOR_YEAR.to_string(), dates.clone()),
            (CLASSIC_YEAR.to_string(), dates.clone()),
            (SENIOR_YEAR.to_string(), dates),
            (FINALE_YEAR.to_string(), vec![FINALE_YEAR.to_string()]),
        ])
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CalendarError> {
        let calendar: Self =
            serde_json::from_str(raw).map_err(|e| CalendarError::Parse(e.to_string()))?;
        calendar.validate()?;
        Ok(calendar)
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        let mut seen = HashSet::new();
        for (year, dates) in &self.years {
            if dates.is_empty() {
                return Err(CalendarError::EmptyYear { year: year.clone() });
            }
            if year == FINALE_YEAR && (dates.len() != 1 || dates[0] != FINALE_YEAR) {
                return Err(CalendarError::MalformedFinale);
            }
            for date in dates {
                let key = TurnKey::for_turn(year, date);
                if !seen.insert(key.clone()) {
                    return Err(CalendarError::DuplicateTurn(key));
                }
            }
        }
        Ok(())
    }

    pub fn years(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.years
            .iter()
            .map(|(year, dates)| (year.as_str(), dates.as_slice()))
    }

    pub fn turn_count(&self) -> usize {
        self.years.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.turn_count() == 0
    }

    pub fn flatten(&self) -> Vec<Turn> {
        flatten(self)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.flatten().iter().position(|turn| turn.key.as_str() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }
}

pub fn flatten(calendar: &Calendar) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(calendar.turn_count());
    for (year, dates) in calendar.years() {
        for date in dates {
            turns.push(Turn {
                index: turns.len(),
                year: year.to_string(),
                date: date.clone(),
                key: TurnKey::for_turn(year, date),
            });
        }
    }
    turns
}
