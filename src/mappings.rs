//! Fixed catalogs the pipeline iterates over.

/// OpenAlex field id of Computer Science.
pub const CS_FIELD_ID: u32 = 17;

/// Computer Science subfields as `(openalex id, display name, short name)`,
/// in the order results are reported.
pub const CS_SUBFIELDS: [(&str, &str, &str); 11] = [
    (
        "1707",
        "Computer Vision and Pattern Recognition",
        "Vision & Recognition",
    ),
    ("1710", "Information Systems", "Info Systems"),
    (
        "1703",
        "Computational Theory and Mathematics",
        "Theory & Math",
    ),
    ("1702", "Artificial Intelligence", "AI"),
    (
        "1705",
        "Computer Networks and Communications",
        "Networks & Communications",
    ),
    ("1706", "Computer Science Applications", "CS Applications"),
    ("1712", "Software", "Software"),
    ("1711", "Signal Processing", "Signal Processing"),
    ("1709", "Human-Computer Interaction", "HCI"),
    ("1708", "Hardware and Architecture", "Hardware & Arch"),
    (
        "1704",
        "Computer Graphics and Computer-Aided Design",
        "Graphics & Aided-Design",
    ),
];

/// Top 15 countries by Computer Science output, most prolific first.
pub const TOP_COUNTRIES: [(&str, &str); 15] = [
    ("CN", "China"),
    ("US", "United States of America"),
    ("IN", "India"),
    ("ID", "Indonesia"),
    ("GB", "Great Britain and Northern Ireland"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("JP", "Japan"),
    ("CA", "Canada"),
    ("IT", "Italy"),
    ("RU", "Russian Federation"),
    ("ES", "Spain"),
    ("BR", "Brazil"),
    ("KR", "Republic of Korea"),
    ("AU", "Australia"),
];

pub fn short_subfield_name(display_name: &str) -> Option<&'static str> {
    CS_SUBFIELDS
        .iter()
        .find(|(_, name, _)| *name == display_name)
        .map(|(_, _, short)| *short)
}

pub fn country_name(code: &str) -> Option<&'static str> {
    TOP_COUNTRIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
