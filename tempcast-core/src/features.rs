//! Fixed feature schema shared by the generator, the scaler and the forest.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::model::WeatherObservation;

pub const FEATURE_COUNT: usize = 12;

/// Column order of every [`FeatureVector`]. A fitted model is only valid for this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "hour",
    "day",
    "month",
    "weekday",
    "temp",
    "humidity",
    "pressure",
    "feels_like",
    "wind_speed",
    "wind_deg",
    "cloud_cover",
    "visibility",
];

pub const DEFAULT_READING: f64 = 0.0;
pub const DEFAULT_VISIBILITY: f64 = 10_000.0;

/// One model input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, feature: usize) -> f64 {
        self.0[feature]
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// Build the feature row for `observation` as seen at wall-clock time `now`.
///
/// Missing groups or fields fall back to [`DEFAULT_READING`], except
/// visibility which falls back to [`DEFAULT_VISIBILITY`].
pub fn extract(observation: &WeatherObservation, now: NaiveDateTime) -> FeatureVector {
    let main = observation.main.as_ref();
    let wind = observation.wind.as_ref();
    let clouds = observation.clouds.as_ref();

    let reading = |value: Option<f64>| value.unwrap_or(DEFAULT_READING);

    FeatureVector([
        f64::from(now.hour()),
        f64::from(now.day()),
        f64::from(now.month()),
        f64::from(now.weekday().num_days_from_monday()),
        reading(main.and_then(|m| m.temp)),
        reading(main.and_then(|m| m.humidity)),
        reading(main.and_then(|m| m.pressure)),
        reading(main.and_then(|m| m.feels_like)),
        reading(wind.and_then(|w| w.speed)),
        reading(wind.and_then(|w| w.deg)),
        reading(clouds.and_then(|c| c.all)),
        observation.visibility.unwrap_or(DEFAULT_VISIBILITY),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudReadings, MainReadings, WindReadings};
    use chrono::NaiveDate;

    fn tuesday_afternoon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 16)
            .and_then(|d| d.and_hms_opt(15, 45, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn full_observation_in_schema_order() {
        let obs = WeatherObservation {
            main: Some(MainReadings {
                temp: Some(22.0),
                humidity: Some(60.0),
                pressure: Some(1012.0),
                feels_like: Some(23.0),
            }),
            wind: Some(WindReadings { speed: Some(4.0), deg: Some(180.0) }),
            clouds: Some(CloudReadings { all: Some(40.0) }),
            visibility: Some(9000.0),
        };

        let features = extract(&obs, tuesday_afternoon());

        assert_eq!(
            features.values(),
            &[15.0, 16.0, 7.0, 1.0, 22.0, 60.0, 1012.0, 23.0, 4.0, 180.0, 40.0, 9000.0]
        );
    }

    #[test]
    fn empty_observation_uses_defaults() {
        let features = extract(&WeatherObservation::default(), tuesday_afternoon());

        assert_eq!(&features.values()[..4], &[15.0, 16.0, 7.0, 1.0]);
        assert_eq!(&features.values()[4..], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10_000.0]);
    }

    #[test]
    fn partial_groups_default_per_field() {
        let obs = WeatherObservation {
            main: Some(MainReadings { temp: Some(-3.5), ..MainReadings::default() }),
            wind: Some(WindReadings { speed: None, deg: Some(90.0) }),
            clouds: None,
            visibility: None,
        };

        let features = extract(&obs, tuesday_afternoon());

        assert_eq!(features.get(4), -3.5);
        assert_eq!(features.get(5), 0.0);
        assert_eq!(features.get(8), 0.0);
        assert_eq!(features.get(9), 90.0);
        assert_eq!(features.get(10), 0.0);
        assert_eq!(features.get(11), DEFAULT_VISIBILITY);
    }

    #[test]
    fn weekday_counts_from_monday() {
        let monday = NaiveDate::from_ymd_opt(2024, 7, 15)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        let sunday = NaiveDate::from_ymd_opt(2024, 7, 21)
            .and_then(|d| d.and_hms_opt(23, 0, 0))
            .expect("valid timestamp");

        assert_eq!(extract(&WeatherObservation::default(), monday).get(3), 0.0);
        assert_eq!(extract(&WeatherObservation::default(), sunday).get(3), 6.0);
    }

    #[test]
    fn schema_has_twelve_named_columns() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_NAMES[0], "hour");
        assert_eq!(FEATURE_NAMES[FEATURE_COUNT - 1], "visibility");
    }
}
