/// UBA (Umweltbundesamt) Air Quality API Client
///
/// Retrieves hourly air quality index data for a single monitoring station
/// from the German Federal Environment Agency's air_data v2 API.
///
/// API Documentation: https://umweltbundesamt.api.proxy.bund.dev/
///
/// Response shape (abridged):
///
/// ```text
/// { "data": { "1671": {
///     "2024-05-01 08:00:00": [ "2024-05-01 09:00:00", 1, 0,
///                              [1, 42, 0, "42.5"],
///                              [5, 23, 0, "23.1"] ] } } }
/// ```
///
/// Each key is the start of an hourly interval. Its array holds the end of
/// the interval, the overall index, an "incomplete" flag, and then one
/// `[component_id, value, index, "decimal value"]` tuple per component.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::config::UbaConfig;
use crate::logging::{self, DataSource};
use crate::model::{StationSnapshot, UbaError};

// ============================================================================
// Query window
// ============================================================================

/// Date/hour window sent to the API.
///
/// Always spans from hour 1 of the previous station-local day to the
/// current station-local hour of today, so the newest published value is
/// inside the window even shortly after midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub time_from: u32,
    pub time_to: u32,
}

impl QueryWindow {
    /// Window for a run at `now`, using the calendar of `tz`.
    pub fn at(now: DateTime<Utc>, tz: Tz) -> QueryWindow {
        let local = now.with_timezone(&tz);
        let today = local.date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);

        QueryWindow {
            date_from: yesterday,
            date_to: today,
            time_from: 1,
            time_to: local.hour(),
        }
    }
}

/// Builds the request URL for one station and window.
pub fn build_query_url(
    base_url: &str,
    station_id: &str,
    window: &QueryWindow,
    lang: &str,
) -> String {
    format!(
        "{}?station={}&date_from={}&date_to={}&time_from={}&time_to={}&lang={}",
        base_url,
        station_id,
        window.date_from.format("%Y-%m-%d"),
        window.date_to.format("%Y-%m-%d"),
        window.time_from,
        window.time_to,
        lang
    )
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct UbaResponse {
    #[serde(default)]
    data: Value,
}

/// Parses a UBA timestamp.
///
/// The API writes `YYYY-MM-DD HH:MM:SS` without an offset, in the station's
/// local time; it is resolved in `tz`. The end of the last interval of a day
/// is written as hour `24`, which is read as midnight of the following day.
/// RFC 3339 is accepted as well and keeps its own offset.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return resolve_local(naive, tz);
        }
    }

    let (date, time) = raw.split_once([' ', 'T'])?;
    let rest = time.strip_prefix("24:")?;
    let next_day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?.succ_opt()?;
    let midnight = NaiveTime::parse_from_str(&format!("00:{}", rest), "%H:%M:%S").ok()?;
    resolve_local(next_day.and_time(midnight), tz)
}

/// Local wall time to UTC. A repeated hour (end of DST) takes the earlier
/// instant; a skipped hour (start of DST) is moved past the gap.
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extracts the newest snapshot for `station_id` from a response body.
///
/// Snapshot keys are compared as parsed timestamps, not by their position
/// in the document. Keys that do not parse are logged and ignored.
/// Timestamps without an offset are read in the station zone `tz`.
pub fn parse_latest_snapshot(
    body: &str,
    station_id: &str,
    tz: Tz,
) -> Result<StationSnapshot, UbaError> {
    let response: UbaResponse =
        serde_json::from_str(body).map_err(|e| UbaError::ParseError(e.to_string()))?;

    let station_data = match &response.data {
        Value::Object(stations) => stations
            .get(station_id)
            .ok_or_else(|| UbaError::StationNotFound(station_id.to_string()))?,
        // The API answers an empty window with `"data": []`.
        Value::Array(a) if a.is_empty() => {
            return Err(UbaError::NoDataAvailable(station_id.to_string()));
        }
        Value::Null => return Err(UbaError::ParseError("response has no data field".to_string())),
        other => {
            return Err(UbaError::ParseError(format!("unexpected data field: {}", other)));
        }
    };

    let snapshots = match station_data {
        Value::Object(map) => map,
        Value::Array(a) if a.is_empty() => {
            return Err(UbaError::NoDataAvailable(station_id.to_string()));
        }
        other => {
            return Err(UbaError::ParseError(format!("unexpected station data: {}", other)));
        }
    };

    let mut latest: Option<(DateTime<Utc>, &String, &Value)> = None;
    for (key, value) in snapshots {
        let Some(at) = parse_timestamp(key, tz) else {
            logging::warn(
                DataSource::Uba,
                Some(station_id),
                &format!("Ignoring snapshot with unparseable key {:?}", key),
            );
            continue;
        };
        if latest.is_none_or(|(best, _, _)| at > best) {
            latest = Some((at, key, value));
        }
    }

    let (key_time, key, value) =
        latest.ok_or_else(|| UbaError::NoDataAvailable(station_id.to_string()))?;

    let entries = value
        .as_array()
        .ok_or_else(|| UbaError::ParseError(format!("snapshot {} is not an array", key)))?
        .clone();

    // Position 0 is the end of the interval; fall back to the key.
    let timestamp = entries
        .first()
        .and_then(Value::as_str)
        .and_then(|raw| parse_timestamp(raw, tz))
        .unwrap_or(key_time);

    Ok(StationSnapshot {
        station_id: station_id.to_string(),
        key: key.clone(),
        timestamp,
        entries,
    })
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking client for one station.
pub struct UbaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    station_id: String,
    lang: String,
    tz: Tz,
}

impl UbaClient {
    pub fn new(config: &UbaConfig, station_id: &str, tz: Tz) -> Result<UbaClient, UbaError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UbaError::Transport(e.to_string()))?;

        Ok(UbaClient {
            client,
            base_url: config.base_url.clone(),
            station_id: station_id.to_string(),
            lang: config.lang.clone(),
            tz,
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// Fetch the newest snapshot inside `window`.
    pub fn fetch_latest(&self, window: &QueryWindow) -> Result<StationSnapshot, UbaError> {
        let url = build_query_url(&self.base_url, &self.station_id, window, &self.lang);
        logging::debug(DataSource::Uba, Some(&self.station_id), &format!("GET {}", url));

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| UbaError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UbaError::HttpError(response.status().as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| UbaError::Transport(e.to_string()))?;

        parse_latest_snapshot(&body, &self.station_id, self.tz)
    }
}

// ============================================================================
// Tests
// ============================================================================
