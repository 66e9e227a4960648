use log::debug;
use serde::Serialize;

use crate::random::{RandomSource, Xorshift64};

/// Coarse family a sign name belongs to, derived from its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignCategory {
    Speed,
    Prohibition,
    Warning,
    Mandatory,
    Directional,
}

impl SignCategory {
    /// Case-insensitive keyword match. Order matters: "No U-turn" is a
    /// prohibition even though it mentions a turn.
    pub fn of(sign_name: &str) -> Self {
        let name = sign_name.to_lowercase();
        let has = |needle: &str| name.contains(needle);

        if has("speed") || has("km/h") {
            Self::Speed
        } else if has("no ") || has("don't") || has("dont") {
            Self::Prohibition
        } else if has("go ") || has("keep") || has("turn") {
            Self::Directional
        } else if has("mandatory") || has("roundabout") {
            Self::Mandatory
        } else {
            Self::Warning
        }
    }

    fn templates(self) -> &'static [&'static str] {
        match self {
            Self::Speed => &[
                "This speed limit sign sets the maximum allowed speed on this road section to {limit}. Drivers must not exceed it.",
                "The {sign} sign shows the maximum permitted velocity of {limit}. Exceeding this limit may result in a traffic violation.",
                "This sign establishes {limit} as the top speed allowed here. Adjust your speed accordingly for safety.",
            ],
            Self::Prohibition => &[
                "This prohibition sign indicates an action that is not allowed. Drivers must not perform the action shown.",
                "Prohibition signs show what is forbidden. Ignoring the {sign} restriction may result in penalties.",
                "This sign marks a prohibited action or movement that drivers must avoid.",
            ],
            Self::Warning => &[
                "This warning sign alerts drivers to a potential hazard ahead. Reduce speed and proceed with caution.",
                "Warning signs indicate dangerous conditions or obstacles. Be extra vigilant in the area marked by the {sign} sign.",
                "This sign warns of upcoming road conditions that require special attention and reduced speed.",
            ],
            Self::Mandatory => &[
                "This mandatory sign indicates a required action that drivers must follow.",
                "Mandatory signs show compulsory behaviour. Failure to comply with the {sign} sign may result in a traffic violation.",
                "This sign requires a specific driving behaviour that must be followed for safety and legal compliance.",
            ],
            Self::Directional => &[
                "This directional sign tells drivers which way traffic must proceed. Follow the direction indicated.",
                "Directional signs guide the flow of traffic. The {sign} sign shows the permitted path at this point.",
                "This sign indicates the direction or lane drivers are required to take. Plan your manoeuvre early.",
            ],
        }
    }
}

/// Canned answer for signs the classifier could not identify.
pub const UNRECOGNIZED_DESCRIPTION: &str = "This sign could not be identified with confidence. \
     Try capturing the sign again with better lighting, closer framing and less motion blur.";

/// True when the name denotes an unidentified sign, so no backend should be asked about it.
pub fn is_unrecognized(sign_name: &str) -> bool {
    sign_name.to_lowercase().contains("unknown")
}

/// First run of ASCII digits in the name, e.g. `60` for "Speed limit (60km/h)".
pub fn speed_limit(sign_name: &str) -> Option<u32> {
    let digits: String = sign_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Builds a description from the category templates. Never returns an empty string.
pub fn describe_sign<R: RandomSource>(sign_name: &str, rng: &mut R) -> String {
    let trimmed = sign_name.trim();
    let sign = if trimmed.is_empty() { "this sign" } else { trimmed };
    let category = SignCategory::of(sign);

    let templates = category.templates();
    let template = templates[rng.next_index(templates.len())];
    let limit = match speed_limit(sign) {
        Some(kmh) => format!("{} km/h", kmh),
        None => "the posted limit".to_string(),
    };
    debug!("Describing {:?} as {:?}", sign, category);

    let body = template.replace("{sign}", sign).replace("{limit}", &limit);
    format!("{} This specific sign is: {}.", body, sign)
}

/// [`describe_sign`] with a clock-seeded generator.
pub fn describe_sign_now(sign_name: &str) -> String {
    describe_sign(sign_name, &mut Xorshift64::from_entropy())
}
