//! Column mapping for the skin-reflectance vendor export.
//!
//! The order of [`MEASUREMENT_COLUMNS`] is the order the backend project
//! expects. It MUST match the data dictionary of the measurement project;
//! if a field is added there, add it here in the same position.

/// Generated record identifier (zero-based row position within one upload)
pub const RECORD_ID: &str = "record_id";
/// Unique patient identifier
pub const UPI: &str = "upi";
/// Measurement session number (blank for sites without sessions)
pub const SESSION: &str = "session";
/// Operator who took the measurement (only for sites that record operators)
pub const OPERATOR: &str = "operator";

/// First reflectance wavelength in nanometres
pub const FIRST_WAVELENGTH_NM: u16 = 400;
/// Spacing between reflectance samples in nanometres
pub const WAVELENGTH_STEP_NM: u16 = 10;
/// Number of reflectance samples per measurement (400nm to 700nm)
pub const WAVELENGTH_COUNT: usize = 31;

/// Vendor header → canonical field name, in canonical output order.
pub const MEASUREMENT_COLUMNS: [(&str, &str); 45] = [
    // Free text and capture time
    ("Group", "group"),
    ("Data Name", "data_name"),
    ("Comment", "comment"),
    ("Date", "date"),
    ("Time", "time"),
    // Summary indices
    ("Melanin Index", "melanin_index"),
    ("Hb Index", "hb_index"),
    ("Hb SO2 Index(%)", "hb_so2_index"),
    ("Hue", "hue"),
    ("Value", "value"),
    ("Chroma", "chroma"),
    ("L*", "lab_l"),
    ("a*", "lab_a"),
    ("b*", "lab_b"),
    // Spectral reflectance
    ("400", "km400"),
    ("410", "km410"),
    ("420", "km420"),
    ("430", "km430"),
    ("440", "km440"),
    ("450", "km450"),
    ("460", "km460"),
    ("470", "km470"),
    ("480", "km480"),
    ("490", "km490"),
    ("500", "km500"),
    ("510", "km510"),
    ("520", "km520"),
    ("530", "km530"),
    ("540", "km540"),
    ("550", "km550"),
    ("560", "km560"),
    ("570", "km570"),
    ("580", "km580"),
    ("590", "km590"),
    ("600", "km600"),
    ("610", "km610"),
    ("620", "km620"),
    ("630", "km630"),
    ("640", "km640"),
    ("650", "km650"),
    ("660", "km660"),
    ("670", "km670"),
    ("680", "km680"),
    ("690", "km690"),
    ("700", "km700"),
];

/// Index of the first reflectance column within [`MEASUREMENT_COLUMNS`]
pub const REFLECTANCE_OFFSET: usize = MEASUREMENT_COLUMNS.len() - WAVELENGTH_COUNT;

/// Vendor header names that must be present in every input file
pub fn required_vendor_columns() -> impl Iterator<Item = &'static str> {
    MEASUREMENT_COLUMNS.iter().map(|(vendor, _)| *vendor)
}

/// Wavelength in nanometres of reflectance sample `index`
pub fn wavelength_nm(index: usize) -> u16 {
    FIRST_WAVELENGTH_NM + WAVELENGTH_STEP_NM * index as u16
}

/// Full output header: identity columns followed by the measurement columns
pub fn canonical_header(with_operator: bool) -> Vec<&'static str> {
    let mut header = vec![RECORD_ID, UPI, SESSION];
    if with_operator {
        header.push(OPERATOR);
    }
    header.extend(MEASUREMENT_COLUMNS.iter().map(|(_, canonical)| *canonical));
    header
}
