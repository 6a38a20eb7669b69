/// Clients for the upstream measurement APIs.
///
/// Submodules:
/// - `uba`: Umweltbundesamt air quality API (hourly index per station).

use crate::model::{StationSnapshot, UbaError};

pub mod uba;

pub use uba::QueryWindow;

/// A type that can fetch the newest snapshot for the configured station.
pub trait SnapshotSource {
    fn station_id(&self) -> &str;

    /// Newest snapshot inside `window`.
    fn fetch_latest(&self, window: &QueryWindow) -> Result<StationSnapshot, UbaError>;
}

impl SnapshotSource for uba::UbaClient {
    fn station_id(&self) -> &str {
        uba::UbaClient::station_id(self)
    }

    fn fetch_latest(&self, window: &QueryWindow) -> Result<StationSnapshot, UbaError> {
        uba::UbaClient::fetch_latest(self, window)
    }
}
