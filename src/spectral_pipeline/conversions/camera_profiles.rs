//! Filter sets of the simulated cameras.
//!
//! Column numbers refer to the camera's filter response table, where column
//! 0 is the wavelength.

use std::fmt;
use std::str::FromStr;

/// How a filter's transmission is built from table columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterSource {
    Column(usize),
    /// Narrowband filter seen through a Bayer or IR-cut filter.
    Product(usize, usize),
    /// Column times the per-band mean of several columns; stands in for
    /// Bayer interpolation where the Bayer filters are near transparent.
    ColumnTimesMean(usize, &'static [usize]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub name: &'static str,
    pub source: FilterSource,
}

const fn column(name: &'static str, index: usize) -> FilterSpec {
    FilterSpec {
        name,
        source: FilterSource::Column(index),
    }
}

const fn product(name: &'static str, a: usize, b: usize) -> FilterSpec {
    FilterSpec {
        name,
        source: FilterSource::Product(a, b),
    }
}

/// One channel of a colour composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelSpec {
    Filter(&'static str),
    Ratio(&'static str, &'static str),
    /// Weighted sum of filter images, shifted so its mean equals the mean
    /// reflectance of the first `anchor_bands` bands of the cropped cube.
    Synthetic {
        terms: &'static [(&'static str, f64)],
        anchor_bands: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composite {
    pub keyword: &'static str,
    /// Red, green, blue
    pub channels: [ChannelSpec; 3],
    /// Shift red and blue so their means equal the green channel's mean.
    pub balance_to_green: bool,
}

const fn composite(keyword: &'static str, red: &'static str, green: &'static str, blue: &'static str) -> Composite {
    Composite {
        keyword,
        channels: [
            ChannelSpec::Filter(red),
            ChannelSpec::Filter(green),
            ChannelSpec::Filter(blue),
        ],
        balance_to_green: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProfile {
    pub name: &'static str,
    pub filter_file: &'static str,
    /// Wavelength range the filter table is sampled on.
    pub crop: (f64, f64),
    pub filters: &'static [FilterSpec],
    pub composites: &'static [Composite],
    pub default_color: &'static str,
    /// Filters written as single-channel images
    pub singles: &'static [&'static str],
    pub singles_by_default: bool,
}

impl CameraProfile {
    pub fn composite(&self, keyword: &str) -> Option<&'static Composite> {
        self.composites.iter().find(|c| c.keyword.eq_ignore_ascii_case(keyword))
    }

    pub fn filter(&self, name: &str) -> Option<&'static FilterSpec> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// Keywords quoted for an error message, e.g. `'IPB', 'IRB' or 'ENH'`.
    pub fn keyword_list(&self) -> String {
        let quoted: Vec<String> = self.composites.iter().map(|c| format!("'{}'", c.keyword)).collect();
        match quoted.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}

const BAYER: &[usize] = &[1, 2, 3];

pub static CASSIS: CameraProfile = CameraProfile {
    name: "CaSSIS",
    filter_file: "cassis-response-mtrdr.txt",
    crop: (380.0, 1100.0),
    filters: &[
        column("BLU", 1),
        column("PAN", 2),
        column("RED", 3),
        column("NIR", 4),
    ],
    composites: &[
        composite("IPB", "NIR", "PAN", "BLU"),
        composite("IRB", "RED", "PAN", "BLU"),
        Composite {
            keyword: "ENH",
            channels: [
                ChannelSpec::Ratio("RED", "PAN"),
                ChannelSpec::Ratio("PAN", "BLU"),
                ChannelSpec::Ratio("PAN", "NIR"),
            ],
            balance_to_green: true,
        },
    ],
    default_color: "IPB",
    singles: &[],
    singles_by_default: false,
};

pub static HIRISE: CameraProfile = CameraProfile {
    name: "HiRISE",
    filter_file: "hirise-response-mtrdr.txt",
    crop: (380.0, 1100.0),
    filters: &[column("NIR", 1), column("RED", 2), column("BG", 3)],
    composites: &[
        composite("IRB", "NIR", "RED", "BG"),
        Composite {
            keyword: "RGB",
            channels: [
                ChannelSpec::Filter("RED"),
                ChannelSpec::Filter("BG"),
                ChannelSpec::Synthetic {
                    terms: &[("BG", 2.0), ("RED", -0.3)],
                    anchor_bands: 10,
                },
            ],
            balance_to_green: false,
        },
        Composite {
            keyword: "ENH",
            channels: [
                ChannelSpec::Ratio("NIR", "RED"),
                ChannelSpec::Ratio("NIR", "BG"),
                ChannelSpec::Ratio("RED", "BG"),
            ],
            balance_to_green: true,
        },
    ],
    default_color: "IRB",
    singles: &[],
    singles_by_default: false,
};

pub static HRSC: CameraProfile = CameraProfile {
    name: "HRSC",
    filter_file: "hrsc-response-mtrdr.txt",
    crop: (380.0, 1100.0),
    filters: &[
        column("ND", 1),
        column("IR", 2),
        column("RED", 3),
        column("GRN", 4),
        column("BLU", 5),
        column("P1", 6),
        column("S1", 7),
    ],
    composites: &[
        composite("IGB", "IR", "GRN", "BLU"),
        composite("IRB", "IR", "RED", "BLU"),
        composite("RGB", "RED", "GRN", "BLU"),
    ],
    default_color: "IGB",
    singles: &["ND", "IR", "RED", "GRN", "BLU", "P1", "S1"],
    singles_by_default: false,
};

pub static MASTCAM: CameraProfile = CameraProfile {
    name: "Mastcam",
    filter_file: "mastcam-response-mtrdr.txt",
    crop: (380.0, 1200.0),
    filters: &[
        product("BLUE", 1, 4),
        product("GREEN", 2, 4),
        product("RED", 3, 4),
        product("L1_527nm", 5, 2),
        product("L2_445nm", 6, 1),
        product("L3_751nm", 7, 3),
        product("L4_676nm", 8, 3),
        FilterSpec {
            name: "L5_867nm",
            source: FilterSource::ColumnTimesMean(9, BAYER),
        },
        FilterSpec {
            name: "L6_1012nm",
            source: FilterSource::ColumnTimesMean(10, BAYER),
        },
        product("R1_527nm", 13, 2),
        product("R2_447nm", 14, 1),
        product("R3_805nm", 15, 3),
        FilterSpec {
            name: "R4_908nm",
            source: FilterSource::ColumnTimesMean(16, BAYER),
        },
        FilterSpec {
            name: "R5_937nm",
            source: FilterSource::ColumnTimesMean(17, BAYER),
        },
        FilterSpec {
            name: "R6_1013nm",
            source: FilterSource::ColumnTimesMean(18, BAYER),
        },
    ],
    composites: &[composite("RGB", "RED", "GREEN", "BLUE")],
    default_color: "RGB",
    singles: &[
        "L1_527nm", "L2_445nm", "L3_751nm", "L4_676nm", "L5_867nm", "L6_1012nm", "R1_527nm",
        "R2_447nm", "R3_805nm", "R4_908nm", "R5_937nm", "R6_1013nm",
    ],
    singles_by_default: true,
};

pub static MASTCAMZ: CameraProfile = CameraProfile {
    name: "Mastcam-Z",
    filter_file: "mastcamz-response-mtrdr.txt",
    crop: (380.0, 1100.0),
    filters: &[
        column("BLUE", 1),
        column("GREEN", 2),
        column("RED", 3),
        column("L1_800nm", 4),
        column("L2_754nm", 5),
        column("L3_677nm", 6),
        column("L4_605nm", 7),
        column("L5_528nm", 8),
        column("L6_442nm", 9),
        column("R2_866nm", 10),
        column("R3_910nm", 11),
        column("R4_939nm", 12),
        column("R5_978nm", 13),
        column("R6_1022nm", 14),
    ],
    composites: &[composite("RGB", "RED", "GREEN", "BLUE")],
    default_color: "RGB",
    singles: &[
        "L1_800nm", "L2_754nm", "L3_677nm", "L4_605nm", "L5_528nm", "L6_442nm", "R2_866nm",
        "R3_910nm", "R4_939nm", "R5_978nm", "R6_1022nm",
    ],
    singles_by_default: true,
};

pub static PANCAM: CameraProfile = CameraProfile {
    name: "Pancam",
    filter_file: "pancam-response-mtrdr.txt",
    crop: (380.0, 1150.0),
    filters: &[
        column("L1_PAN", 1),
        column("L2_750nm", 2),
        column("L3_670nm", 3),
        column("L4_600nm", 4),
        column("L5_530nm", 5),
        column("L6_480nm", 6),
        column("L7_430nm", 7),
        column("R1_430nm", 8),
        column("R2_750nm", 9),
        column("R3_800nm", 10),
        column("R4_860nm", 11),
        column("R5_900nm", 12),
        column("R6_930nm", 13),
        column("R7_980nm", 14),
    ],
    composites: &[
        composite("RGB", "L3_670nm", "L5_530nm", "L7_430nm"),
        composite("IRB", "L2_750nm", "L5_530nm", "L7_430nm"),
    ],
    default_color: "RGB",
    singles: &[
        "L1_PAN", "L2_750nm", "L3_670nm", "L4_600nm", "L5_530nm", "L6_480nm", "L7_430nm",
        "R1_430nm", "R2_750nm", "R3_800nm", "R4_860nm", "R5_900nm", "R6_930nm", "R7_980nm",
    ],
    singles_by_default: true,
};

/// Cameras whose filter sets can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Camera {
    Cassis,
    Hirise,
    Hrsc,
    Mastcam,
    Mastcamz,
    Pancam,
}

impl Camera {
    pub const ALL: [Camera; 6] = [
        Camera::Cassis,
        Camera::Hirise,
        Camera::Hrsc,
        Camera::Mastcam,
        Camera::Mastcamz,
        Camera::Pancam,
    ];

    pub fn profile(&self) -> &'static CameraProfile {
        match self {
            Camera::Cassis => &CASSIS,
            Camera::Hirise => &HIRISE,
            Camera::Hrsc => &HRSC,
            Camera::Mastcam => &MASTCAM,
            Camera::Mastcamz => &MASTCAMZ,
            Camera::Pancam => &PANCAM,
        }
    }
}

impl FromStr for Camera {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cassis" => Ok(Camera::Cassis),
            "hirise" => Ok(Camera::Hirise),
            "hrsc" => Ok(Camera::Hrsc),
            "mastcam" => Ok(Camera::Mastcam),
            "mastcamz" | "mastcam-z" => Ok(Camera::Mastcamz),
            "pancam" => Ok(Camera::Pancam),
            other => Err(format!("unknown camera '{}'", other)),
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_reference_known_filters() {
        for camera in Camera::ALL {
            let profile = camera.profile();
            assert!(profile.composite(profile.default_color).is_some(), "{camera}");
            for composite in profile.composites {
                for channel in &composite.channels {
                    let names: Vec<&str> = match channel {
                        ChannelSpec::Filter(name) => vec![*name],
                        ChannelSpec::Ratio(a, b) => vec![*a, *b],
                        ChannelSpec::Synthetic { terms, .. } => terms.iter().map(|(n, _)| *n).collect(),
                    };
                    for name in names {
                        assert!(profile.filter(name).is_some(), "{camera}: {name}");
                    }
                }
            }
            for name in profile.singles {
                assert!(profile.filter(name).is_some(), "{camera}: {name}");
            }
        }
    }

    #[test]
    fn test_keyword_lookup_ignores_case() {
        assert_eq!(CASSIS.composite("enh").map(|c| c.keyword), Some("ENH"));
        assert!(PANCAM.composite("IPB").is_none());
    }

    #[test]
    fn test_keyword_list() {
        assert_eq!(CASSIS.keyword_list(), "'IPB', 'IRB' or 'ENH'");
        assert_eq!(MASTCAM.keyword_list(), "'RGB'");
    }

    #[test]
    fn test_camera_parsing() {
        assert_eq!("Mastcam-Z".parse::<Camera>(), Ok(Camera::Mastcamz));
        assert!("ctx".parse::<Camera>().is_err());
        assert_eq!(Camera::Hirise.to_string(), "HiRISE");
    }
}
