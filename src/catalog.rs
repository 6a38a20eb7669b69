/// Pollutant registry for the UBA air quality feed.
///
/// Defines the canonical list of air components reported by the UBA
/// air_data v2 API, keyed by the API's integer component id, along with the
/// display metadata used in reports and the valid range used for the scale
/// bar. This is the single source of truth for component ids; other modules
/// resolve pollutants through `lookup` rather than hardcoding ids.

// ---------------------------------------------------------------------------
// Pollutant metadata
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` range a reading is clamped into before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Metadata for a single air component.
#[derive(Debug, PartialEq)]
pub struct Pollutant {
    /// UBA component id.
    pub id: u32,
    /// UBA component code.
    pub code: &'static str,
    /// Display symbol, with Unicode subscripts.
    pub symbol: &'static str,
    pub unit: &'static str,
    /// German display name.
    pub display_name: &'static str,
    pub valid_range: ValidRange,
}

const fn range(min: f64, max: f64) -> ValidRange {
    ValidRange { min, max }
}

/// All components the UBA API may report, in component-id order.
///
/// Sources:
///   - Ids, codes, units: UBA air_data v2 `components` endpoint
///   - Ranges for PM10..PM2.5: the published report scale
///   - Ranges for the heavy metals, BaP and benzene: twice the EU limit or
///     target value (Directive 2008/50/EC, 2004/107/EC)
pub static POLLUTANT_REGISTRY: &[Pollutant] = &[
    Pollutant {
        id: 1,
        code: "PM10",
        symbol: "PM₁₀",
        unit: "µg/m³",
        display_name: "Feinstaub",
        valid_range: range(0.0, 100.0),
    },
    Pollutant {
        id: 2,
        code: "CO",
        symbol: "CO",
        unit: "mg/m³",
        display_name: "Kohlenmonoxid",
        valid_range: range(0.0, 50.0),
    },
    Pollutant {
        id: 3,
        code: "O3",
        symbol: "O₃",
        unit: "µg/m³",
        display_name: "Ozon",
        valid_range: range(0.0, 180.0),
    },
    Pollutant {
        id: 4,
        code: "SO2",
        symbol: "SO₂",
        unit: "µg/m³",
        display_name: "Schwefeldioxid",
        valid_range: range(0.0, 50.0),
    },
    Pollutant {
        id: 5,
        code: "NO2",
        symbol: "NO₂",
        unit: "µg/m³",
        display_name: "Stickstoffdioxid",
        valid_range: range(0.0, 200.0),
    },
    Pollutant {
        id: 6,
        code: "PM10PB",
        symbol: "Pb",
        unit: "µg/m³",
        display_name: "Blei im Feinstaub",
        valid_range: range(0.0, 1.0),
    },
    Pollutant {
        id: 7,
        code: "PM10BAP",
        symbol: "BaP",
        unit: "ng/m³",
        display_name: "Benzo(a)pyren im Feinstaub",
        valid_range: range(0.0, 2.0),
    },
    Pollutant {
        id: 8,
        code: "CHB",
        symbol: "C₆H₆",
        unit: "µg/m³",
        display_name: "Benzol",
        valid_range: range(0.0, 10.0),
    },
    Pollutant {
        id: 9,
        code: "PM2",
        symbol: "PM₂,₅",
        unit: "µg/m³",
        display_name: "Feinstaub",
        valid_range: range(0.0, 50.0),
    },
    Pollutant {
        id: 10,
        code: "PM10AS",
        symbol: "As",
        unit: "ng/m³",
        display_name: "Arsen im Feinstaub",
        valid_range: range(0.0, 12.0),
    },
    Pollutant {
        id: 11,
        code: "PM10CD",
        symbol: "Cd",
        unit: "ng/m³",
        display_name: "Cadmium im Feinstaub",
        valid_range: range(0.0, 10.0),
    },
    Pollutant {
        id: 12,
        code: "PM10NI",
        symbol: "Ni",
        unit: "ng/m³",
        display_name: "Nickel im Feinstaub",
        valid_range: range(0.0, 40.0),
    },
];

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

/// Look up a pollutant by its UBA component id.
/// Returns `None` if the id is not in the registry.
pub fn lookup(id: u32) -> Option<&'static Pollutant> {
    POLLUTANT_REGISTRY.iter().find(|p| p.id == id)
}

/// Look up a pollutant by its UBA component code (e.g. `"NO2"`).
pub fn by_code(code: &str) -> Option<&'static Pollutant> {
    POLLUTANT_REGISTRY.iter().find(|p| p.code == code)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_has_twelve_components() {
        assert_eq!(POLLUTANT_REGISTRY.len(), 12);
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<u32> = POLLUTANT_REGISTRY.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), POLLUTANT_REGISTRY.len(), "duplicate component id in registry");
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = POLLUTANT_REGISTRY.iter().map(|p| p.code).collect();
        assert_eq!(codes.len(), POLLUTANT_REGISTRY.len(), "duplicate component code in registry");
    }

    #[test]
    fn test_every_range_is_non_empty() {
        for p in POLLUTANT_REGISTRY {
            assert!(
                p.valid_range.max > p.valid_range.min,
                "{} has an empty valid range",
                p.code
            );
        }
    }

    #[test]
    fn test_lookup_pm10() {
        let pm10 = lookup(1).expect("PM10 should be registered");
        assert_eq!(pm10.code, "PM10");
        assert_eq!(pm10.symbol, "PM₁₀");
        assert_eq!(pm10.unit, "µg/m³");
        assert_eq!(pm10.display_name, "Feinstaub");
        assert_eq!(pm10.valid_range, ValidRange { min: 0.0, max: 100.0 });
    }

    #[test]
    fn test_lookup_unknown_id_is_none() {
        assert!(lookup(0).is_none());
        assert!(lookup(13).is_none());
    }

    #[test]
    fn test_by_code_matches_lookup() {
        for p in POLLUTANT_REGISTRY {
            assert_eq!(by_code(p.code), lookup(p.id));
        }
        assert!(by_code("PM25").is_none());
    }

    #[test]
    fn test_clamp() {
        let r = ValidRange { min: 0.0, max: 50.0 };
        assert_eq!(r.clamp(-3.0), 0.0);
        assert_eq!(r.clamp(12.5), 12.5);
        assert_eq!(r.clamp(80.0), 50.0);
    }
}
