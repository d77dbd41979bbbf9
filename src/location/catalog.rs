/// Destinations offered in place search
///
/// (name, latitude, longitude)
pub const DESTINATIONS: [(&str, f64, f64); 6] = [
    ("Yangon, Myanmar", 16.8409, 96.1735),
    ("Inle Lake, Myanmar", 20.5592, 96.9132),
    ("Mawlamyine, Myanmar", 16.4543, 97.6440),
    ("Mandalay, Myanmar", 21.9588, 96.0891),
    ("Bagan, Myanmar", 21.1717, 94.8585),
    ("Bangkok, Thailand", 13.7563, 100.5018),
];

/// A named place that can be chosen from search
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn from_entry(entry: &(&str, f64, f64)) -> Self {
        Self::new(entry.0, entry.1, entry.2)
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
