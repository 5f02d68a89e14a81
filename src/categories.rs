/// Category code vocabulary accepted by the sensor API.
///
/// Codes are only validated upstream; this table exists for display
/// (`pollen-gauge categories`) and to warn about likely typos before a request
/// is sent.

/// A known category code and its English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub code: &'static str,
    pub name: &'static str,
}

const fn info(code: &'static str, name: &'static str) -> CategoryInfo {
    CategoryInfo { code, name }
}

/// Every category code the API is known to serve, in display order.
pub const KNOWN_CATEGORIES: &[CategoryInfo] = &[
    info("POL", "Pollen (all)"),
    info("MOL", "Mold"),
    info("WEE", "Weed pollen"),
    info("GRA", "Grass pollen"),
    info("TRE", "Tree pollen"),
    info("OTHPAR", "Other particles"),
    info("AMB-IVA", "Ragweed / marsh elder"),
    info("ART", "Mugwort / sagebrush"),
    info("CHE-AMA", "Goosefoot / pigweed"),
    info("PLA", "Plantain"),
    info("ACE", "Maple"),
    info("ALN", "Alder"),
    info("BET", "Birch"),
    info("CAR", "Hornbeam"),
    info("CUP", "Cypress / juniper"),
    info("FRA", "Ash"),
    info("MOR", "Mulberry"),
    info("OLE", "Olive"),
    info("PIN", "Pine"),
    info("POP", "Poplar / cottonwood"),
    info("QUE", "Oak"),
    info("SAL", "Willow"),
    info("ULM", "Elm"),
    info("LOL", "Ryegrass"),
    info("POA", "Bluegrass"),
];

/// Code requested when the caller supplies none.
pub const DEFAULT_CATEGORY: &str = "POL";

/// Look up a code (exact match, as the API is case-sensitive).
pub fn lookup(code: &str) -> Option<&'static CategoryInfo> {
    KNOWN_CATEGORIES.iter().find(|c| c.code == code)
}

/// Split a comma-separated `categoryCodes` value.
///
/// Whitespace around codes and empty segments are dropped. Falls back to
/// `defaults` when nothing usable remains.
pub fn parse_category_codes(raw: Option<&str>, defaults: &[String]) -> Vec<String> {
    let codes: Vec<String> = raw
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if !codes.is_empty() {
        return codes;
    }
    if defaults.is_empty() {
        vec![DEFAULT_CATEGORY.to_string()]
    } else {
        defaults.to_vec()
    }
}

/// Codes that are not in [`KNOWN_CATEGORIES`].
pub fn unknown_codes(codes: &[String]) -> Vec<&str> {
    codes
        .iter()
        .map(String::as_str)
        .filter(|c| lookup(c).is_none())
        .collect()
}
