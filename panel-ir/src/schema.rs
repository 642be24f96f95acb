//! Fixed header layout of a panel schedule
//!
//! The header has exactly 8 left-side and 7 right-side parameters. Each
//! position carries an immutable label, label cell and value cell. These
//! are contract constants shared by the validator and every renderer;
//! they are enums rather than data so a position/label mismatch cannot be
//! written down in the first place.

/// Cell spanning the panel name across the top row
pub const PANEL_NAME_CELL: &str = "A1:O1";

/// Reserved right-side value cell that must stay blank
pub const RIGHT_UNUSED_VALUE_CELL: &str = "O9";

/// Number of left-side header parameters
pub const LEFT_PARAM_COUNT: usize = 8;

/// Number of right-side header parameters
pub const RIGHT_PARAM_COUNT: usize = 7;

/// Panel name used when no source supplies one
pub const DEFAULT_PANEL_NAME: &str = "PANEL00000";

/// Left-side header parameters, in schedule order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeftField {
    Voltage,
    Phase,
    Wire,
    MainBusAmps,
    MainCircuitBreaker,
    Mounting,
    Feed,
    FeedThruLugs,
}

impl LeftField {
    /// All left fields in schedule order
    pub const ALL: [LeftField; LEFT_PARAM_COUNT] = [
        LeftField::Voltage,
        LeftField::Phase,
        LeftField::Wire,
        LeftField::MainBusAmps,
        LeftField::MainCircuitBreaker,
        LeftField::Mounting,
        LeftField::Feed,
        LeftField::FeedThruLugs,
    ];

    /// Label text printed in the label cell
    pub fn label(self) -> &'static str {
        match self {
            LeftField::Voltage => "VOLTAGE",
            LeftField::Phase => "PHASE",
            LeftField::Wire => "WIRE",
            LeftField::MainBusAmps => "MAIN BUS AMPS",
            LeftField::MainCircuitBreaker => "MAIN CIRCUIT BREAKER",
            LeftField::Mounting => "MOUNTING",
            LeftField::Feed => "FEED",
            LeftField::FeedThruLugs => "FEED-THRU LUGS",
        }
    }

    /// Zero-based position within the left block
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label cell (column A, rows 2-9)
    pub fn label_cell(self) -> String {
        format!("A{}", self.index() + 2)
    }

    /// Value cell (column B, rows 2-9)
    pub fn value_cell(self) -> String {
        format!("B{}", self.index() + 2)
    }

    /// Key used for this field in session `panel_specs` maps
    pub fn param_key(self) -> &'static str {
        match self {
            LeftField::Voltage => "voltage",
            LeftField::Phase => "phase",
            LeftField::Wire => "wire",
            LeftField::MainBusAmps => "main_bus_amps",
            LeftField::MainCircuitBreaker => "main_breaker",
            LeftField::Mounting => "mounting",
            LeftField::Feed => "feed",
            LeftField::FeedThruLugs => "feed_thru_lugs",
        }
    }

    /// Hardcoded lowest-precedence default
    pub fn fallback_default(self) -> &'static str {
        match self {
            LeftField::Voltage => "480Y/277V",
            LeftField::Phase => "3PH",
            LeftField::Wire => "4W+G",
            LeftField::MainBusAmps => "800",
            LeftField::MainCircuitBreaker => "MLO",
            LeftField::Mounting => "SURFACE",
            LeftField::Feed => "UPSTREAM",
            LeftField::FeedThruLugs => "NO",
        }
    }
}

/// Right-side header parameters, in schedule order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RightField {
    Location,
    FedFrom,
    UlListedShortCircuitRating,
    MaxAvailableShortCircuitCurrent,
    PhaseConductor,
    NeutralConductor,
    GroundConductor,
}

impl RightField {
    /// All right fields in schedule order
    pub const ALL: [RightField; RIGHT_PARAM_COUNT] = [
        RightField::Location,
        RightField::FedFrom,
        RightField::UlListedShortCircuitRating,
        RightField::MaxAvailableShortCircuitCurrent,
        RightField::PhaseConductor,
        RightField::NeutralConductor,
        RightField::GroundConductor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RightField::Location => "LOCATION",
            RightField::FedFrom => "FED FROM",
            RightField::UlListedShortCircuitRating => "UL LISTED EQUIPMENT SHORT CIRCUIT RATING",
            RightField::MaxAvailableShortCircuitCurrent => "MAXIMUM AVAILABLE SHORT CIRCUIT CURRENT",
            RightField::PhaseConductor => "PHASE CONDUCTOR",
            RightField::NeutralConductor => "NEUTRAL CONDUCTOR",
            RightField::GroundConductor => "GROUND CONDUCTOR",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Label cell (merged I:N, rows 2-8)
    pub fn label_cell(self) -> String {
        let row = self.index() + 2;
        format!("I{}:N{}", row, row)
    }

    /// Value cell (column O, rows 2-8)
    pub fn value_cell(self) -> String {
        format!("O{}", self.index() + 2)
    }

    pub fn param_key(self) -> &'static str {
        match self {
            RightField::Location => "location",
            RightField::FedFrom => "fed_from",
            RightField::UlListedShortCircuitRating => "ul_listed_sccr",
            RightField::MaxAvailableShortCircuitCurrent => "max_available_sccr",
            RightField::PhaseConductor => "phase_conductor",
            RightField::NeutralConductor => "neutral_conductor",
            RightField::GroundConductor => "ground_conductor",
        }
    }

    pub fn fallback_default(self) -> &'static str {
        match self {
            RightField::Location => "ELECTRICAL ROOM",
            RightField::FedFrom => "UPSTREAM",
            RightField::UlListedShortCircuitRating => "22kA",
            RightField::MaxAvailableShortCircuitCurrent => "18kA",
            RightField::PhaseConductor => "#1/0 CU",
            RightField::NeutralConductor => "#1/0 CU",
            RightField::GroundConductor => "#6 CU",
        }
    }
}

/// Either side of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Left(LeftField),
    Right(RightField),
}

impl HeaderField {
    /// Every header field, left block first
    pub fn all() -> impl Iterator<Item = HeaderField> {
        LeftField::ALL
            .into_iter()
            .map(HeaderField::Left)
            .chain(RightField::ALL.into_iter().map(HeaderField::Right))
    }

    pub fn label(self) -> &'static str {
        match self {
            HeaderField::Left(f) => f.label(),
            HeaderField::Right(f) => f.label(),
        }
    }

    pub fn param_key(self) -> &'static str {
        match self {
            HeaderField::Left(f) => f.param_key(),
            HeaderField::Right(f) => f.param_key(),
        }
    }

    pub fn fallback_default(self) -> &'static str {
        match self {
            HeaderField::Left(f) => f.fallback_default(),
            HeaderField::Right(f) => f.fallback_default(),
        }
    }

    /// Look up a field by its printed label (case- and whitespace-insensitive)
    pub fn from_label(label: &str) -> Option<HeaderField> {
        let wanted = label.trim().to_uppercase();
        Self::all().find(|f| f.label() == wanted)
    }

    /// Look up a field by its `panel_specs` key
    pub fn from_param_key(key: &str) -> Option<HeaderField> {
        Self::all().find(|f| f.param_key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_cells_follow_rows_two_to_nine() {
        assert_eq!(LeftField::Voltage.label_cell(), "A2");
        assert_eq!(LeftField::Voltage.value_cell(), "B2");
        assert_eq!(LeftField::FeedThruLugs.label_cell(), "A9");
        assert_eq!(LeftField::FeedThruLugs.value_cell(), "B9");
    }

    #[test]
    fn test_right_cells_follow_rows_two_to_eight() {
        assert_eq!(RightField::Location.label_cell(), "I2:N2");
        assert_eq!(RightField::Location.value_cell(), "O2");
        assert_eq!(RightField::GroundConductor.label_cell(), "I8:N8");
        assert_eq!(RightField::GroundConductor.value_cell(), "O8");
    }

    #[test]
    fn test_index_matches_position_in_all() {
        for (i, field) in LeftField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        for (i, field) in RightField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(
            HeaderField::from_label(" main circuit breaker "),
            Some(HeaderField::Left(LeftField::MainCircuitBreaker))
        );
        assert_eq!(
            HeaderField::from_label("FED FROM"),
            Some(HeaderField::Right(RightField::FedFrom))
        );
        assert_eq!(HeaderField::from_label("PANEL COLOR"), None);
    }

    #[test]
    fn test_param_keys_are_unique() {
        let keys: Vec<_> = HeaderField::all().map(HeaderField::param_key).collect();
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len());
    }
}
