//! Global (non-spatial) variables and their forecast horizons.
//!
//! A global variable is a scalar per timestep (a weather reading, a calendar
//! flag) that the reshaper broadcasts across the whole spatial grid instead of
//! laying it out cell by cell. Some globals are known ahead of time, so the
//! reshaper can inject forward-shifted copies of them as extra channels.

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from global base name to the number of forecast steps to inject.
///
/// Every count is at least 1; a variable with no forecast is simply absent.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::schema::ForecastHorizons;
///
/// let horizons = ForecastHorizons::new()
///     .with("temperature", 2).unwrap()
///     .with("precipitation", 1).unwrap();
/// assert_eq!(horizons.max_steps(), 2);
/// assert!(ForecastHorizons::new().with("wind", 0).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastHorizons(BTreeMap<String, usize>);

impl ForecastHorizons {
    /// Empty mapping (no forecast injection).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a forecast horizon for `base`.
    pub fn with(mut self, base: impl Into<String>, steps: usize) -> Result<Self> {
        let base = base.into();
        if steps == 0 {
            return Err(PrepError::invalid(format!(
                "forecast steps for '{base}' must be >= 1"
            )));
        }
        self.0.insert(base, steps);
        Ok(self)
    }

    /// Forecast steps for `base`, zero when none were requested.
    pub fn steps(&self, base: &str) -> usize {
        self.0.get(base).copied().unwrap_or(0)
    }

    /// Largest horizon, zero when empty.
    pub fn max_steps(&self) -> usize {
        self.0.values().copied().max().unwrap_or(0)
    }

    /// True if no forecasting was requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(base, steps)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// The set of global variables for a dataset, in channel order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalVariables {
    /// Base names treated as scalar, non-spatial variables
    #[serde(default)]
    pub columns: Vec<String>,

    /// Forecast copies to inject per global variable
    #[serde(default, skip_serializing_if = "ForecastHorizons::is_empty")]
    pub forecast: ForecastHorizons,
}

impl GlobalVariables {
    /// No global variables.
    pub fn none() -> Self {
        Self::default()
    }

    /// Globals without forecast injection.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            forecast: ForecastHorizons::new(),
        }
    }

    /// Attach forecast horizons.
    pub fn with_forecast(mut self, forecast: ForecastHorizons) -> Self {
        self.forecast = forecast;
        self
    }

    /// True if `base` is a global variable.
    pub fn contains(&self, base: &str) -> bool {
        self.columns.iter().any(|c| c == base)
    }

    /// True when there are no globals.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of broadcast channels these globals produce (originals plus forecasts).
    pub fn channel_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| 1 + self.forecast.steps(c))
            .sum()
    }

    /// Validate names are unique and every forecast refers to a listed global.
    pub fn validate(&self) -> Result<()> {
        for (i, name) in self.columns.iter().enumerate() {
            if name.is_empty() {
                return Err(PrepError::invalid("global column names must be non-empty"));
            }
            if self.columns[..i].contains(name) {
                return Err(PrepError::invalid(format!(
                    "global column '{name}' listed more than once"
                )));
            }
        }
        for (base, steps) in self.forecast.iter() {
            if !self.contains(base) {
                return Err(PrepError::invalid(format!(
                    "forecast horizon given for '{base}', which is not a global column"
                )));
            }
            if steps == 0 {
                return Err(PrepError::invalid(format!(
                    "forecast steps for '{base}' must be >= 1"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_count() {
        let globals = GlobalVariables::new(["temp", "rain"])
            .with_forecast(ForecastHorizons::new().with("temp", 3).unwrap());
        assert_eq!(globals.channel_count(), 5); // temp + 3 forecasts + rain
        assert!(globals.validate().is_ok());
    }

    #[test]
    fn test_forecast_for_unknown_global_rejected() {
        let globals = GlobalVariables::new(["temp"])
            .with_forecast(ForecastHorizons::new().with("rain", 1).unwrap());
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_duplicate_globals_rejected() {
        let globals = GlobalVariables::new(["temp", "temp"]);
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_zero_steps_rejected_on_deserialize_validation() {
        let globals: GlobalVariables =
            serde_json::from_str(r#"{"columns":["temp"],"forecast":{"temp":0}}"#).unwrap();
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_empty_forecast() {
        let horizons = ForecastHorizons::new();
        assert!(horizons.is_empty());
        assert_eq!(horizons.max_steps(), 0);
        assert_eq!(horizons.steps("anything"), 0);
    }
}
