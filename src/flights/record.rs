//! Flight records

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::errors::FlightError;
use crate::order::SequenceRecord;

/// Longest accepted flight code
pub const MAX_CODE_LEN: usize = 32;

/// Operational status of a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Emergency,
    Delayed,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Emergency => "emergency",
            FlightStatus::Delayed => "delayed",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; accepts the English names and the Spanish names
/// (`programado`, `emergencia`, `retrasado`) used by older clients.
impl FromStr for FlightStatus {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" | "programado" => Ok(FlightStatus::Scheduled),
            "emergency" | "emergencia" => Ok(FlightStatus::Emergency),
            "delayed" | "retrasado" => Ok(FlightStatus::Delayed),
            _ => Err(FlightError::InvalidStatus(s.to_string())),
        }
    }
}

/// A stored flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub code: String,
    pub status: FlightStatus,
    pub departure: NaiveDateTime,
    pub origin: String,
    pub destination: String,
}

impl SequenceRecord for Flight {
    fn key(&self) -> &str {
        &self.code
    }
}

/// Unvalidated input for creating a flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlight {
    pub code: String,
    pub status: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub origin: String,
    pub destination: String,
}

impl NewFlight {
    /// Validate every attribute and build the flight row.
    ///
    /// Code uniqueness is checked by the store, not here.
    pub fn validate(self) -> Result<Flight, FlightError> {
        validate_code(&self.code)?;
        let status = self.status.parse::<FlightStatus>()?;

        let departure = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .ok_or_else(|| {
                FlightError::InvalidDeparture(format!(
                    "{:04}-{:02}-{:02} is not a calendar date",
                    self.year, self.month, self.day
                ))
            })?
            .and_hms_opt(self.hour, self.minute, 0)
            .ok_or_else(|| {
                FlightError::InvalidDeparture(format!(
                    "{:02}:{:02} is not a time of day",
                    self.hour, self.minute
                ))
            })?;

        Ok(Flight {
            code: self.code,
            status,
            departure,
            origin: self.origin,
            destination: self.destination,
        })
    }
}

fn validate_code(code: &str) -> Result<(), FlightError> {
    let valid = !code.is_empty()
        && code.chars().count() <= MAX_CODE_LEN
        && !code.chars().any(|c| c.is_whitespace() || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(FlightError::InvalidCode(code.to_string()))
    }
}
