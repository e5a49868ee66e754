use std::{fmt, str::FromStr};

use serde::Serialize;

/// What to do with a point that has no ground elevation beneath it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingGroundPolicy {
    /// Drop the point from the output and count it.
    #[default]
    Skip,
    /// Write the point with its elevation unchanged.
    PassThrough,
    /// Abort the run.
    Fail,
}

impl FromStr for MissingGroundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "pass-through" | "passthrough" => Ok(Self::PassThrough),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "unknown policy '{}', expected skip, pass-through or fail",
                other
            )),
        }
    }
}

impl fmt::Display for MissingGroundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::PassThrough => "pass-through",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizeOptions {
    /// 1-based DEM band holding the ground elevation.
    pub band: usize,
    pub out_of_bounds: MissingGroundPolicy,
    pub nodata: MissingGroundPolicy,
    /// Points between progress log lines, 0 disables them.
    pub progress_interval: u64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            band: 1,
            out_of_bounds: MissingGroundPolicy::Skip,
            nodata: MissingGroundPolicy::Skip,
            progress_interval: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_parse_from_their_display_names() {
        for policy in [
            MissingGroundPolicy::Skip,
            MissingGroundPolicy::PassThrough,
            MissingGroundPolicy::Fail,
        ] {
            assert_eq!(policy.to_string().parse::<MissingGroundPolicy>(), Ok(policy));
        }
        assert_eq!("PassThrough".parse(), Ok(MissingGroundPolicy::PassThrough));
        assert!("ignore".parse::<MissingGroundPolicy>().is_err());
    }

    #[test]
    fn defaults_skip_missing_ground_on_band_one() {
        let options = NormalizeOptions::default();
        assert_eq!(options.band, 1);
        assert_eq!(options.out_of_bounds, MissingGroundPolicy::Skip);
        assert_eq!(options.nodata, MissingGroundPolicy::Skip);
    }
}
