//! Accuracy/confidence ladder for IP-geolocation responses.
//!
//! IP-geolocation services report how specific their match is only
//! implicitly, through which address fields they populate. The ladder
//! maps that onto accuracy and confidence: the most precise populated
//! field wins.

/// How specific an IP-geolocation match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Specificity {
    /// No usable address field populated.
    Unknown,
    /// Country-level match only.
    Country,
    /// Region/state-level match.
    Region,
    /// City-level match.
    City,
    /// Postal-code-level match.
    Postal,
}

impl Specificity {
    /// Pick the most precise level for which the service populated a
    /// field.
    pub(crate) fn resolve(country: bool, region: bool, city: bool, postal: bool) -> Self {
        let mut level = Specificity::Unknown;
        if country {
            level = Specificity::Country;
        }
        if region {
            level = Specificity::Region;
        }
        if city {
            level = Specificity::City;
        }
        if postal {
            level = Specificity::Postal;
        }
        level
    }

    /// Uncertainty radius in meters for this level.
    pub(crate) fn accuracy_m(self) -> f64 {
        match self {
            Specificity::Unknown => 1_000_000.0,
            Specificity::Country => 300_000.0,
            Specificity::Region => 100_000.0,
            Specificity::City => 15_000.0,
            Specificity::Postal => 3_000.0,
        }
    }

    /// Trust in a reading at this level.
    pub(crate) fn confidence(self) -> f64 {
        match self {
            Specificity::Unknown => 0.1,
            Specificity::Country => 0.3,
            Specificity::Region => 0.5,
            Specificity::City => 0.7,
            Specificity::Postal => 0.85,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_precise_populated_field_wins() {
        assert_eq!(
            Specificity::resolve(true, true, true, true),
            Specificity::Postal
        );
        assert_eq!(
            Specificity::resolve(true, true, true, false),
            Specificity::City
        );
        assert_eq!(
            Specificity::resolve(true, true, false, false),
            Specificity::Region
        );
        assert_eq!(
            Specificity::resolve(true, false, false, false),
            Specificity::Country
        );
        assert_eq!(
            Specificity::resolve(false, false, false, false),
            Specificity::Unknown
        );
    }

    #[test]
    fn precision_gaps_do_not_matter() {
        // A service may populate a postal code without a region.
        assert_eq!(
            Specificity::resolve(true, false, false, true),
            Specificity::Postal
        );
    }

    #[test]
    fn tighter_levels_are_tighter_and_more_trusted() {
        let levels = [
            Specificity::Unknown,
            Specificity::Country,
            Specificity::Region,
            Specificity::City,
            Specificity::Postal,
        ];
        for pair in levels.windows(2) {
            assert!(pair[1].accuracy_m() < pair[0].accuracy_m());
            assert!(pair[1].confidence() > pair[0].confidence());
        }
    }
}
