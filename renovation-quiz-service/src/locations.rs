/// Areas the estimator has been trained on.
const AREAS: [&str; 22] = [
    "Manchester City Centre",
    "Salford",
    "Stockport",
    "Bolton",
    "Bury",
    "Oldham",
    "Rochdale",
    "Tameside",
    "Trafford",
    "Wigan",
    "Altrincham",
    "Ashton-under-Lyne",
    "Prestwich",
    "Didsbury",
    "Chorlton",
    "Withington",
    "Levenshulme",
    "Sale",
    "Stretford",
    "Cheadle",
    "Hale",
    "Wilmslow",
];

/// The area list in the order it is offered: alphabetical.
pub fn default_locations() -> Vec<String> {
    let mut locations: Vec<String> = AREAS.iter().map(|s| s.to_string()).collect();
    locations.sort();
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_complete() {
        let locations = default_locations();
        assert_eq!(locations.len(), 22);
        assert_eq!(locations.first().map(String::as_str), Some("Altrincham"));
        assert_eq!(locations.last().map(String::as_str), Some("Withington"));
        assert!(locations.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
