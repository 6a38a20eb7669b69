//! Report rendering.
//!
//! Turns one [`StationSnapshot`] into the text that gets posted, plus the
//! alert flag deciding whether it gets posted at all. Entries that cannot
//! be rendered (malformed tuple, unknown component, non-numeric value) are
//! logged and skipped; they never abort the report and never count towards
//! the alert.
//!
//! ```text
//! Luftqualität: Leipziger Straße, Chemnitz (DESN083)
//! 01.05.2024 09:00 Uhr
//!
//! 💨💨💨💨💨💨💨💨💨💨 42.5 µg/m³ (PM₁₀/Feinstaub)
//! Gesamtstatus (LQI): 🟢 Gut
//! ```

use chrono_tz::Tz;

use crate::alert::thresholds::{AlertThreshold, Severity};
use crate::catalog::{self, Pollutant};
use crate::config::{Config, ConfigError};
use crate::logging::{self, DataSource};
use crate::model::{DataError, Reading, Report, StationSnapshot};
use crate::scale;

/// Timestamp layout of the report header, in station-local time.
const HEADER_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// One successfully decoded component line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEntry {
    pub pollutant: &'static Pollutant,
    pub value: f64,
    pub severity: Severity,
}

impl RenderedEntry {
    fn from_entry(entry: &serde_json::Value) -> Result<RenderedEntry, DataError> {
        let reading = Reading::from_entry(entry)?;
        let pollutant = catalog::lookup(reading.pollutant_id)
            .ok_or(DataError::UnknownPollutant(reading.pollutant_id))?;
        let value = reading.numeric_value()?;

        Ok(RenderedEntry {
            pollutant,
            value,
            severity: Severity::from_code(reading.severity_code),
        })
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&format!(
            "{} {} {} ({}/{})\nGesamtstatus (LQI): {}\n\n",
            scale::scale_bar(self.value, self.pollutant),
            self.value,
            self.pollutant.unit,
            self.pollutant.symbol,
            self.pollutant.display_name,
            self.severity.label()
        ));
    }
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    station_name: String,
    tz: Tz,
    threshold: AlertThreshold,
}

impl ReportGenerator {
    pub fn new(station_name: &str, tz: Tz, threshold: AlertThreshold) -> Self {
        ReportGenerator {
            station_name: station_name.to_string(),
            tz,
            threshold,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(ReportGenerator::new(
            &config.station.name,
            config.station.tz()?,
            config.alert.threshold(),
        ))
    }

    /// Decodes every reading entry of `snapshot`, skipping the metadata
    /// slots. Returns rendered entries and the errors for the rest.
    pub fn decode(&self, snapshot: &StationSnapshot) -> (Vec<RenderedEntry>, Vec<DataError>) {
        let mut rendered = Vec::new();
        let mut errors = Vec::new();

        for entry in snapshot.reading_entries() {
            match RenderedEntry::from_entry(entry) {
                Ok(r) => rendered.push(r),
                Err(e) => errors.push(e),
            }
        }

        (rendered, errors)
    }

    pub fn generate(&self, snapshot: &StationSnapshot) -> Report {
        let (entries, errors) = self.decode(snapshot);

        for err in &errors {
            logging::warn(
                DataSource::Uba,
                Some(&snapshot.station_id),
                &format!("Skipping entry: {}", err),
            );
        }

        let local = snapshot.timestamp.with_timezone(&self.tz);
        let mut text = format!(
            "Luftqualität: {}\n{} Uhr\n\n",
            self.station_name,
            local.format(HEADER_TIME_FORMAT)
        );
        for entry in &entries {
            entry.write_to(&mut text);
        }

        let severities = entries.iter().map(|e| e.severity);
        Report {
            alert: self.threshold.is_breached_by_any(severities.clone()),
            worst: severities.max(),
            skipped: errors.len(),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Europe::Berlin;
    use serde_json::{Value, json};

    fn generator() -> ReportGenerator {
        ReportGenerator::new(
            "Leipziger Straße, Chemnitz (DESN083)",
            Berlin,
            AlertThreshold::default(),
        )
    }

    fn snapshot(readings: Vec<Value>) -> StationSnapshot {
        let mut entries = vec![json!("2024-05-01 07:00:00"), json!(1), json!(0)];
        entries.extend(readings);
        StationSnapshot {
            station_id: "1671".to_string(),
            key: "2024-05-01 06:00:00".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap(),
            entries,
        }
    }

    #[test]
    fn test_single_good_pm10_reading() {
        let report = generator().generate(&snapshot(vec![json!([1, 42, 0, "42.5"])]));

        let expected = format!(
            "Luftqualität: Leipziger Straße, Chemnitz (DESN083)\n\
             01.05.2024 09:00 Uhr\n\
             \n\
             {} 42.5 µg/m³ (PM₁₀/Feinstaub)\n\
             Gesamtstatus (LQI): 🟢 Gut\n\
             \n",
            "💨".repeat(10)
        );
        assert_eq!(report.text, expected);
        assert!(!report.alert);
        assert_eq!(report.worst, Some(Severity::Good));
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_poor_reading_raises_alert() {
        let report = generator().generate(&snapshot(vec![json!([1, 42, 2, "42.5"])]));
        assert!(report.alert);
        assert!(report.text.contains("Gesamtstatus (LQI): 🔴 Schlecht (😷)"));
    }

    #[test]
    fn test_moderate_reading_raises_alert_under_default_threshold() {
        let report = generator().generate(&snapshot(vec![
            json!([1, 10, 0, "10"]),
            json!([5, 80, 1, "80"]),
        ]));
        assert!(report.alert);
        assert_eq!(report.worst, Some(Severity::Moderate));
    }

    #[test]
    fn test_moderate_reading_quiet_under_poor_threshold() {
        let generator = ReportGenerator::new("X", Berlin, AlertThreshold::new(Severity::Poor));
        let report = generator.generate(&snapshot(vec![json!([5, 80, 1, "80"])]));
        assert!(!report.alert);
    }

    #[test]
    fn test_all_good_is_quiet() {
        let report = generator().generate(&snapshot(vec![
            json!([1, 12, 0, "12.0"]),
            json!([3, 60, 0, "60.1"]),
            json!([5, 18, 0, "18.4"]),
        ]));
        assert!(!report.alert);
        assert_eq!(report.text.matches("🟢 Gut").count(), 3);
    }

    #[test]
    fn test_non_numeric_value_is_skipped() {
        let report = generator().generate(&snapshot(vec![
            json!([1, null, 3, "-"]),
            json!([5, 18, 0, "18.4"]),
        ]));
        assert!(!report.text.contains("PM₁₀"));
        assert!(report.text.contains("18.4 µg/m³ (NO₂/Stickstoffdioxid)"));
        assert_eq!(report.skipped, 1);
        // The skipped entry was critical; it must not raise the alert.
        assert!(!report.alert);
    }

    #[test]
    fn test_unknown_pollutant_is_skipped() {
        let report = generator().generate(&snapshot(vec![
            json!([99, 1, 2, "1.0"]),
            json!([3, 60, 0, "60"]),
        ]));
        assert_eq!(report.skipped, 1);
        assert!(!report.alert);
        assert!(report.text.contains("(O₃/Ozon)"));
    }

    #[test]
    fn test_metadata_slots_are_never_rendered() {
        // Metadata slots shaped like readings must still be skipped.
        let snap = StationSnapshot {
            station_id: "1671".to_string(),
            key: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap(),
            entries: vec![
                json!([2, 1, 3, "1.0"]),
                json!([4, 1, 3, "1.0"]),
                json!([8, 1, 3, "1.0"]),
                json!([5, 18, 0, "18.4"]),
            ],
        };
        let report = generator().generate(&snap);
        assert!(!report.text.contains("Kohlenmonoxid"));
        assert!(!report.text.contains("Schwefeldioxid"));
        assert!(!report.text.contains("Benzol"));
        assert!(report.text.contains("Stickstoffdioxid"));
        assert!(!report.alert);
    }

    #[test]
    fn test_snapshot_without_readings_renders_header_only() {
        let report = generator().generate(&snapshot(Vec::new()));
        assert_eq!(
            report.text,
            "Luftqualität: Leipziger Straße, Chemnitz (DESN083)\n01.05.2024 09:00 Uhr\n\n"
        );
        assert!(!report.alert);
        assert_eq!(report.worst, None);
    }

    #[test]
    fn test_header_uses_winter_offset() {
        let mut snap = snapshot(Vec::new());
        snap.timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        let report = generator().generate(&snap);
        assert!(report.text.contains("16.01.2024 00:30 Uhr"));
    }

    #[test]
    fn test_integral_value_has_no_decimal_point() {
        let report = generator().generate(&snapshot(vec![json!([5, 18, 0, "18"])]));
        assert!(report.text.contains(" 18 µg/m³ (NO₂/Stickstoffdioxid)"));
    }

    #[test]
    fn test_small_value_draws_partial_bar() {
        let report = generator().generate(&snapshot(vec![json!([6, 0, 0, "0.0045"])]));
        // Pb range [0, 1]: 0.0045 * 100 = 0.45 -> 4.5 segments.
        let bar = format!("{}{}", "💨".repeat(4), "🌱".repeat(6));
        let line = format!("{} 0.0045 µg/m³ (Pb/Blei im Feinstaub)", bar);
        assert!(report.text.contains(&line), "got {}", report.text);
    }

    #[test]
    fn test_decode_returns_errors_in_order() {
        let (rendered, errors) = generator().decode(&snapshot(vec![
            json!("bogus"),
            json!([42, 1, 0, "1"]),
            json!([1, 1, 0, "abc"]),
            json!([9, 7, 0, 7.5]),
        ]));
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].pollutant.code, "PM2");
        assert!(matches!(errors[0], DataError::MalformedEntry(_)));
        assert_eq!(errors[1], DataError::UnknownPollutant(42));
        assert!(matches!(errors[2], DataError::NonNumericValue { pollutant_id: 1, .. }));
    }
}
