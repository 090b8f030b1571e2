// Unit abbreviations used by source tables, mapped to canonical unit names.

/// Canonical unit name for a source abbreviation, or the input unchanged.
pub fn normalize_unit(unit: &str) -> &str {
    UNITS_NORMALIZATION
        .iter()
        .find(|(abbr, _)| *abbr == unit)
        .map(|(_, full)| *full)
        .unwrap_or(unit)
}

const UNITS_NORMALIZATION: &[(&str, &str)] = &[
    ("a", "year"),
    ("Bq", "Becquerel"),
    ("g", "gram"),
    ("GJ", "gigajoule"),
    ("h", "hour"),
    ("ha", "hectare"),
    ("hr", "hour"),
    ("kBq", "kilo Becquerel"),
    ("kg", "kilogram"),
    ("kgkm", "kilogram kilometer"),
    ("km", "kilometer"),
    ("kj", "kilojoule"),
    ("kWh", "kilowatt hour"),
    ("l", "litre"),
    ("lu", "livestock unit"),
    ("m", "meter"),
    ("m*year", "meter-year"),
    ("m2", "square meter"),
    ("m2*year", "square meter-year"),
    ("m3", "cubic meter"),
    ("m3*year", "cubic meter-year"),
    ("Meuro", "million euro"),
    ("MJ", "megajoule"),
    ("my", "meter-year"),
    ("p", "unit"),
    ("pkm", "person kilometer"),
    ("t", "ton"),
    ("TJ", "terajoule"),
    ("tkm", "ton kilometer"),
    ("tonnes", "ton"),
    ("vkm", "vehicle kilometer"),
];
