use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceType {
    Free,
    Manual,
    Stable,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Free => "FREE",
            PriceType::Manual => "MANUAL",
            PriceType::Stable => "STABLE",
        }
    }
}

impl FromStr for PriceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(PriceType::Free),
            "MANUAL" => Ok(PriceType::Manual),
            "STABLE" => Ok(PriceType::Stable),
            _ => Err(AppError::Validation(format!("Invalid price_type '{}'", s))),
        }
    }
}

impl TryFrom<String> for PriceType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Participation fee in minor currency units. Travels as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct Fee(i64);

impl Fee {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Fee {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Invalid participation_fee '{}'", s));
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some(parts) => parts,
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole.checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Fee)
            .ok_or_else(invalid)
    }
}

impl Serialize for Fee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Where an event takes place: a salon inside a registered facility, or a
/// free-text address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventLocation {
    Facility { facility_id: String, salon_id: String },
    Address { address: String },
}

impl EventLocation {
    /// Exactly one of "facility + salon" or "location" must be given.
    pub fn from_parts(
        facility_id: Option<String>,
        salon_id: Option<String>,
        location: Option<String>,
    ) -> Result<Self, AppError> {
        let location = location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());

        match (facility_id, salon_id, location) {
            (Some(facility_id), Some(salon_id), None) => Ok(EventLocation::Facility { facility_id, salon_id }),
            (None, None, Some(address)) => Ok(EventLocation::Address { address }),
            (Some(_), None, None) | (None, Some(_), None) => {
                Err(AppError::Validation("facility_id and salon_id must be given together".into()))
            }
            (None, None, None) => {
                Err(AppError::Validation("Either facility_id + salon_id or location is required".into()))
            }
            _ => Err(AppError::Validation("facility_id/salon_id and location are mutually exclusive".into())),
        }
    }

    pub fn into_columns(self) -> (Option<String>, Option<String>, Option<String>) {
        match self {
            EventLocation::Facility { facility_id, salon_id } => (Some(facility_id), Some(salon_id), None),
            EventLocation::Address { address } => (None, None, Some(address)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub owner_id: String,
    pub backup_coach_id: Option<String>,
    pub title: String,
    pub description: String,
    pub sport: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    #[sqlx(try_from = "String")]
    pub price_type: PriceType,
    pub participation_fee: Option<Fee>,
    pub facility_id: Option<String>,
    pub salon_id: Option<String>,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.price_type == PriceType::Free
    }

    /// Owner, backup coach and admins may manage an event and its roster.
    pub fn is_managed_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.backup_coach_id.as_deref() == Some(user_id)
    }
}

/// A fee is required for paid price types and forbidden (or zero) for free events.
pub fn validate_pricing(price_type: PriceType, fee: Option<Fee>) -> Result<Option<Fee>, AppError> {
    match (price_type, fee) {
        (PriceType::Free, None) => Ok(None),
        (PriceType::Free, Some(f)) if f.is_zero() => Ok(None),
        (PriceType::Free, Some(_)) => Err(AppError::Validation("Free events cannot carry a participation_fee".into())),
        (_, Some(f)) => Ok(Some(f)),
        (_, None) => Err(AppError::Validation("participation_fee is required unless price_type is FREE".into())),
    }
}

pub fn validate_schedule(start: DateTime<Utc>, end: DateTime<Utc>, capacity: i32) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation("end_time must be after start_time".into()));
    }
    if capacity < 1 {
        return Err(AppError::Validation("capacity must be at least 1".into()));
    }
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub price_type: Option<PriceType>,
    pub owner_id: Option<String>,
    pub sport: Option<String>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    /// Strict lower bound on `start_time`.
    pub after: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// `search` as a substring pattern for `LIKE ... ESCAPE '\'`, with
    /// wildcards in the user input matched literally.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|search| {
            let mut pattern = String::with_capacity(search.len() + 2);
            pattern.push('%');
            for c in search.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if page == 0 {
            return Err(AppError::Validation("page starts at 1".into()));
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(AppError::Validation(format!("limit must be between 1 and {}", Self::MAX_LIMIT)));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_parses_decimal_strings() {
        assert_eq!("12.50".parse::<Fee>().unwrap().cents(), 1250);
        assert_eq!("12.5".parse::<Fee>().unwrap().cents(), 1250);
        assert_eq!("7".parse::<Fee>().unwrap().cents(), 700);
        assert_eq!("0.05".parse::<Fee>().unwrap().cents(), 5);
        assert_eq!(Fee::from_cents(1205).to_string(), "12.05");
    }

    #[test]
    fn fee_rejects_garbage() {
        for bad in ["", "-1", "1.234", "abc", "1.", ".5", "1,50"] {
            assert!(bad.parse::<Fee>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let filter = EventFilter { search: Some("50%_off\\".into()), ..Default::default() };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off\\\\%"));
        assert_eq!(EventFilter::default().search_pattern(), None);
    }

    #[test]
    fn fee_requires_digits_after_the_point() {
        assert!("12.".parse::<Fee>().is_err());
        assert!(serde_json::from_str::<Fee>("\"0.\"").is_err());
        assert_eq!("12.5".parse::<Fee>().unwrap(), Fee::from_cents(1250));
    }

    #[test]
    fn fee_deserializes_from_number_or_string() {
        let a: Fee = serde_json::from_str("\"9.99\"").unwrap();
        let b: Fee = serde_json::from_str("9.99").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn location_requires_exactly_one_form() {
        assert!(EventLocation::from_parts(Some("f".into()), Some("s".into()), None).is_ok());
        assert!(EventLocation::from_parts(None, None, Some("Park".into())).is_ok());
        assert!(EventLocation::from_parts(None, None, None).is_err());
        assert!(EventLocation::from_parts(Some("f".into()), None, None).is_err());
        assert!(EventLocation::from_parts(Some("f".into()), Some("s".into()), Some("Park".into())).is_err());
        assert!(EventLocation::from_parts(None, None, Some("   ".into())).is_err());
    }

    #[test]
    fn pricing_rules() {
        assert_eq!(validate_pricing(PriceType::Free, None).unwrap(), None);
        assert_eq!(validate_pricing(PriceType::Free, Some(Fee::from_cents(0))).unwrap(), None);
        assert!(validate_pricing(PriceType::Free, Some(Fee::from_cents(100))).is_err());
        assert!(validate_pricing(PriceType::Stable, None).is_err());
        assert_eq!(validate_pricing(PriceType::Manual, Some(Fee::from_cents(100))).unwrap(), Some(Fee::from_cents(100)));
    }

    #[test]
    fn page_bounds() {
        assert_eq!(Page::new(None, None).unwrap().offset(), 0);
        assert_eq!(Page::new(Some(3), Some(10)).unwrap().offset(), 20);
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(None, Some(101)).is_err());
    }
}
