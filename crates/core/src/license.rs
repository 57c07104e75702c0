//! License file templates.
//!
//! Templates use `{year}` and `{owner}` placeholders and are filled by
//! [`materialize_license`], a pure function with no filesystem access.

use std::str::FromStr;

use crate::errors::LicenseError;

const MIT_TEMPLATE: &str = include_str!("../templates/licenses/mit.txt");
const APACHE_2_TEMPLATE: &str = include_str!("../templates/licenses/apache-2.0.txt");
const GPL_3_TEMPLATE: &str = include_str!("../templates/licenses/gpl-3.0.txt");

/// The license choices offered when creating a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseChoice {
    None,
    Mit,
    Apache2,
    Gpl3,
}

impl LicenseChoice {
    pub const ALL: [LicenseChoice; 4] = [Self::None, Self::Mit, Self::Apache2, Self::Gpl3];

    /// SPDX identifier, or `none`.
    pub fn id(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mit => "MIT",
            Self::Apache2 => "Apache-2.0",
            Self::Gpl3 => "GPL-3.0",
        }
    }

    fn template(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Mit => Some(MIT_TEMPLATE),
            Self::Apache2 => Some(APACHE_2_TEMPLATE),
            Self::Gpl3 => Some(GPL_3_TEMPLATE),
        }
    }
}

impl FromStr for LicenseChoice {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "mit" => Ok(Self::Mit),
            "apache-2.0" | "apache2" | "apache" => Ok(Self::Apache2),
            "gpl-3.0" | "gpl3" | "gpl" => Ok(Self::Gpl3),
            _ => Err(LicenseError::Unsupported(s.to_string())),
        }
    }
}

/// Render the license text for `choice` with `owner` and `year` filled in.
///
/// `none` has no text and fails like an unknown identifier; callers that
/// treat "no license" as a valid request must skip the call instead.
pub fn materialize_license(choice: &str, owner: &str, year: i32) -> Result<String, LicenseError> {
    let parsed: LicenseChoice = choice.parse()?;
    let template = parsed
        .template()
        .ok_or_else(|| LicenseError::Unsupported(choice.to_string()))?;
    Ok(template
        .replace("{year}", &year.to_string())
        .replace("{owner}", owner))
}

/// Whether `choice` names "no license".
pub fn is_no_license(choice: &str) -> bool {
    matches!(choice.parse::<LicenseChoice>(), Ok(LicenseChoice::None))
}
