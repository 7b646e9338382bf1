use crate::types::ids::{EventId, PropertyId, ValuationId};

/// Generate a new valuation ID
pub fn generate_valuation_id() -> ValuationId {
    ValuationId::new()
}

/// Generate a new property ID
pub fn generate_property_id() -> PropertyId {
    PropertyId::new()
}

/// Generate a new event ID
pub fn generate_event_id() -> EventId {
    EventId::new()
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-0.004, 2), -0.0);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(generate_valuation_id(), generate_valuation_id());
        assert_ne!(generate_property_id(), generate_property_id());
    }
}
