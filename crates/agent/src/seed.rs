//! Default-rule seeding configuration.

use autoprice_core::{DayOffset, Month, SeedRequest, Strategy};
use autoprice_sync::config::parse_var;
use autoprice_sync::ConfigError;

/// Absolute diff of the seeded follow-lowest strategy, in euros.
pub const DEFAULT_SEED_DIFF_VALUE: f64 = 0.50;

const SEED_VARS: [&str; 4] = ["SEED_LOCATIONS", "SEED_GROUPS", "SEED_MONTHS", "SEED_DAYS"];

/// Load the seed request from environment variables.
///
/// | Env Var           | Default | Format                         |
/// |-------------------|---------|--------------------------------|
/// | `SEED_LOCATIONS`  | unset   | comma list, e.g. `Albufeira,Aeroporto de Faro` |
/// | `SEED_GROUPS`     | unset   | comma list, e.g. `B1,B2,D`     |
/// | `SEED_MONTHS`     | unset   | comma list of 1-12             |
/// | `SEED_DAYS`       | unset   | comma list of day offsets      |
/// | `SEED_DIFF_VALUE` | `0.50`  | decimal euros                  |
///
/// Returns `Ok(None)` when none of the list variables is set. Setting only
/// some of them is an error.
pub fn from_env() -> Result<Option<SeedRequest>, ConfigError> {
    from_lookup(|var| std::env::var(var).ok())
}

pub fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<SeedRequest>, ConfigError> {
    let present = SEED_VARS.iter().filter(|var| lookup(**var).is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if let Some(missing) = SEED_VARS.iter().find(|var| lookup(**var).is_none()) {
        return Err(ConfigError::Invalid {
            var: *missing,
            expected: "set together with the other SEED_* variables",
            value: String::new(),
        });
    }

    let locations = list(&lookup, "SEED_LOCATIONS", "a comma-separated list of locations", |s| {
        Some(s.to_string())
    })?;
    let groups = list(&lookup, "SEED_GROUPS", "a comma-separated list of groups", |s| {
        Some(s.to_string())
    })?;
    let months = list(&lookup, "SEED_MONTHS", "a comma-separated list of months 1-12", |s| {
        s.parse::<u8>().ok().and_then(|m| Month::new(m).ok())
    })?;
    let days = list(&lookup, "SEED_DAYS", "a comma-separated list of day offsets", |s| {
        s.parse::<DayOffset>().ok()
    })?;

    let diff_value: f64 = parse_var(
        &lookup,
        "SEED_DIFF_VALUE",
        "a decimal number",
        DEFAULT_SEED_DIFF_VALUE,
    )?;

    Ok(Some(SeedRequest {
        locations,
        groups,
        months,
        days,
        strategy: Strategy::follow_lowest_absolute(diff_value),
    }))
}

/// Split a comma list, trimming entries and ignoring empty ones. Any entry
/// `parse` rejects fails the whole variable.
fn list<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, ConfigError> {
    let raw = lookup(var).unwrap_or_default();
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse)
        .collect::<Option<Vec<T>>>();

    match items {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}
