use serde::Serialize;

use super::features::FeatureSummary;

const SPEED_LIMIT_SIGNS: &[u32] = &[28, 29, 30, 31, 33, 34, 50];
const CIRCULAR_SIGNS: &[u32] = &[21, 22, 24, 45];
const TRIANGULAR_SIGNS: &[u32] = &[1, 3, 4, 19, 35, 46];
const DIRECTIONAL_SIGNS: &[u32] = &[12, 14, 17, 48, 49];

/// Leaves of the fixed decision tree over [`FeatureSummary`] statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    RedHighEdge,
    RedLowEdge,
    BlueHighEdge,
    BlueLowEdge,
    YellowHighEdge,
    YellowLowEdge,
    HighContrast,
    Circular,
    Triangular,
    Default,
}

impl Branch {
    /// Walks the tree. Tests are ordered; the first match wins.
    pub fn select(f: &FeatureSummary) -> Self {
        let (r, g, b) = (f.avg_red, f.avg_green, f.avg_blue);
        let edges = f.edge_count;

        if r > g + 30.0 && r > b + 30.0 {
            if edges > 500 { Self::RedHighEdge } else { Self::RedLowEdge }
        } else if b > r + 20.0 && b > g + 20.0 {
            if edges > 400 { Self::BlueHighEdge } else { Self::BlueLowEdge }
        } else if r > 150.0 && g > 150.0 && b < 100.0 {
            if edges > 600 { Self::YellowHighEdge } else { Self::YellowLowEdge }
        } else if f.avg_brightness > 180.0 && edges > 300 {
            Self::HighContrast
        } else if edges > 400 {
            Self::Circular
        } else if edges > 200 && edges < 400 {
            Self::Triangular
        } else {
            Self::Default
        }
    }

    /// Class ids this leaf may report.
    pub fn candidates(self) -> &'static [u32] {
        match self {
            Self::RedHighEdge => &[23],
            Self::RedLowEdge => &[25],
            Self::BlueHighEdge => &[27],
            Self::BlueLowEdge => &[17],
            Self::YellowHighEdge => &[2],
            Self::YellowLowEdge => &[36],
            Self::HighContrast => SPEED_LIMIT_SIGNS,
            Self::Circular => CIRCULAR_SIGNS,
            Self::Triangular => TRIANGULAR_SIGNS,
            Self::Default => DIRECTIONAL_SIGNS,
        }
    }

    /// Lower bound of the confidence range; the upper bound is `base + spread`.
    pub fn base_confidence(self) -> f32 {
        match self {
            Self::RedHighEdge => 0.85,
            Self::RedLowEdge => 0.80,
            Self::BlueHighEdge => 0.82,
            Self::BlueLowEdge => 0.78,
            Self::YellowHighEdge => 0.88,
            Self::YellowLowEdge => 0.75,
            Self::HighContrast => 0.83,
            Self::Circular => 0.76,
            Self::Triangular => 0.79,
            Self::Default => 0.65,
        }
    }

    pub fn spread(self) -> f32 {
        match self {
            Self::RedHighEdge => 0.10,
            Self::RedLowEdge => 0.15,
            Self::BlueHighEdge => 0.13,
            Self::BlueLowEdge => 0.17,
            Self::YellowHighEdge => 0.08,
            Self::YellowLowEdge => 0.20,
            Self::HighContrast => 0.12,
            Self::Circular => 0.19,
            Self::Triangular => 0.16,
            Self::Default => 0.25,
        }
    }

    pub fn confidence_range(self) -> (f32, f32) {
        let base = self.base_confidence();
        (base, base + self.spread())
    }

    pub fn all() -> [Branch; 10] {
        [
            Self::RedHighEdge,
            Self::RedLowEdge,
            Self::BlueHighEdge,
            Self::BlueLowEdge,
            Self::YellowHighEdge,
            Self::YellowLowEdge,
            Self::HighContrast,
            Self::Circular,
            Self::Triangular,
            Self::Default,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rgb: (f32, f32, f32), brightness: f32, edge_count: u32) -> FeatureSummary {
        FeatureSummary {
            avg_red: rgb.0,
            avg_green: rgb.1,
            avg_blue: rgb.2,
            avg_brightness: brightness,
            edge_count,
        }
    }

    #[test]
    fn test_red_branches() {
        assert_eq!(Branch::select(&summary((200.0, 50.0, 50.0), 100.0, 501)), Branch::RedHighEdge);
        assert_eq!(Branch::select(&summary((200.0, 50.0, 50.0), 100.0, 500)), Branch::RedLowEdge);
        // Dominance margin must be strictly greater than 30
        assert_ne!(Branch::select(&summary((130.0, 100.0, 0.0), 76.0, 0)), Branch::RedLowEdge);
    }

    #[test]
    fn test_blue_branches() {
        assert_eq!(Branch::select(&summary((10.0, 10.0, 200.0), 73.0, 401)), Branch::BlueHighEdge);
        assert_eq!(Branch::select(&summary((10.0, 10.0, 200.0), 73.0, 400)), Branch::BlueLowEdge);
    }

    #[test]
    fn test_yellow_branches() {
        assert_eq!(Branch::select(&summary((220.0, 200.0, 40.0), 153.0, 601)), Branch::YellowHighEdge);
        assert_eq!(Branch::select(&summary((220.0, 200.0, 40.0), 153.0, 0)), Branch::YellowLowEdge);
    }

    #[test]
    fn test_edge_only_branches() {
        let gray = (120.0, 120.0, 120.0);
        assert_eq!(Branch::select(&summary((230.0, 230.0, 230.0), 230.0, 301)), Branch::HighContrast);
        assert_eq!(Branch::select(&summary(gray, 120.0, 401)), Branch::Circular);
        assert_eq!(Branch::select(&summary(gray, 120.0, 300)), Branch::Triangular);
        // 400 exactly falls through both edge tests
        assert_eq!(Branch::select(&summary(gray, 120.0, 400)), Branch::Default);
        assert_eq!(Branch::select(&summary(gray, 120.0, 200)), Branch::Default);
    }

    #[test]
    fn test_confidence_ranges_fit_unit_interval() {
        for branch in Branch::all() {
            let (low, high) = branch.confidence_range();
            assert!(low > 0.0 && high <= 1.0, "{:?}", branch);
            assert!(!branch.candidates().is_empty());
        }
    }
}
