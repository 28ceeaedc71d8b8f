//! Argument resolution shared by the command handlers.
//!
//! - [`resolve_user`] accepts either a user UUID or a username.
//! - [`parse_decimal`] parses a non-negative decimal quantity or price.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use mise_db::queries::users;

/// Resolve `input` to the ID of an existing user.
///
/// A string that parses as a UUID is looked up by ID; anything else is
/// treated as a username.
pub async fn resolve_user(pool: &PgPool, input: &str) -> Result<Uuid> {
    let user = match Uuid::parse_str(input) {
        Ok(id) => users::get_user(pool, id).await?,
        Err(_) => users::get_user_by_username(pool, input).await?,
    };

    match user {
        Some(user) => Ok(user.id),
        None => bail!("user {input:?} not found. Use `mise user add <username>` to create one."),
    }
}

/// Parse a plan, pantry row or ingredient ID.
pub fn parse_id(kind: &str, input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("invalid {kind} ID: {input:?}"))
}

/// Parse a decimal argument, rejecting negative values.
pub fn parse_decimal(label: &str, input: &str) -> Result<BigDecimal> {
    let value = BigDecimal::from_str(input.trim())
        .with_context(|| format!("invalid {label}: {input:?} is not a decimal number"))?;
    if value < BigDecimal::from(0) {
        bail!("invalid {label}: {input} is negative");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_accepts_plain_numbers() {
        assert_eq!(
            parse_decimal("price", "2.50").unwrap(),
            BigDecimal::from_str("2.5").unwrap()
        );
        assert_eq!(parse_decimal("quantity", " 3 ").unwrap(), BigDecimal::from(3));
        assert_eq!(parse_decimal("quantity", "0").unwrap(), BigDecimal::from(0));
    }

    #[test]
    fn parse_decimal_rejects_negative_and_garbage() {
        let err = parse_decimal("price", "-1").unwrap_err();
        assert!(err.to_string().contains("negative"), "got: {err}");

        let err = parse_decimal("quantity", "lots").unwrap_err();
        assert!(err.to_string().contains("invalid quantity"), "got: {err}");
    }

    #[test]
    fn parse_id_names_the_kind() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("plan", &id.to_string()).unwrap(), id);

        let err = parse_id("plan", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("invalid plan ID"), "got: {err}");
    }
}
