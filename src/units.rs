use crate::F;

/// Scale factor from a model unit string to meters, `None` if unrecognized.
pub fn scale_to_meters(units: &str) -> Option<F> {
    let f = match units.trim().to_ascii_lowercase().as_str() {
        "mm" | "millimeters" | "millimetres" => 0.001,
        "cm" | "centimeters" | "centimetres" => 0.01,
        "m" | "meters" | "metres" => 1.,
        "km" | "kilometers" | "kilometres" => 1000.,
        "in" | "inches" => 0.0254,
        "ft" | "feet" => 0.3048,
        "yd" | "yards" => 0.9144,
        "mi" | "miles" => 1609.344,
        _ => return None,
    };
    Some(f)
}

#[test]
fn test_scale_to_meters() {
    assert_eq!(scale_to_meters("mm"), Some(0.001));
    assert_eq!(scale_to_meters(" Feet "), Some(0.3048));
    assert_eq!(scale_to_meters("m"), Some(1.));
    assert_eq!(scale_to_meters("parsecs"), None);
}
