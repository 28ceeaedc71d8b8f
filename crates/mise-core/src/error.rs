//! Error kinds surfaced by the generation and shopping pipelines.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::plan::parser::ParseError;

/// A persistence failure. Any open transaction has been rolled back.
#[derive(Debug, Error)]
#[error("store error: {0:#}")]
pub struct StoreError(#[from] pub anyhow::Error);

/// Caller-supplied parameters that cannot be served.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("days must be between 1 and {max}, got {value}")]
    DaysOutOfRange { value: u32, max: u32 },

    #[error("meals_per_day must be between 1 and {max}, got {value}")]
    MealsPerDayOutOfRange { value: u32, max: u32 },

    #[error("suggestion count must be between 1 and {max}, got {value}")]
    CountOutOfRange { value: u32, max: u32 },

    #[error("a {days}-day plan starting {start} runs past the last representable date")]
    DateRangeOverflow { start: NaiveDate, days: u32 },

    #[error("unknown user {0}")]
    UnknownUser(Uuid),

    #[error("unknown recipe {0}")]
    UnknownRecipe(Uuid),
}

/// Any failure of a generation request.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GenerateError {
    /// Stable label for the error kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Gateway(_) => "gateway",
            Self::Parse(_) => "parse",
            Self::Store(_) => "store",
        }
    }
}
