// Fallback Dataset Provider: static, internally consistent sample results
// served whenever a live supplier cannot be called (forced fallback mode,
// missing credentials, active rate-limit block, or an initiate failure).
//
// The payloads use the exact field names and nesting of a live supplier
// response, so downstream consumers, the markup engine included, cannot tell
// fallback data from live data structurally.

use crate::supplier::{Flow, Supplier};
use serde_json::{json, Value};

/// Deterministic offline result for one supplier/flow. Pure; no clocks, no
/// randomness, no I/O.
pub fn fallback_result(supplier: Supplier, flow: Flow, criteria: &Value) -> Value {
    match (supplier, flow) {
        (Supplier::Flights, Flow::Search) => flight_search(criteria),
        (Supplier::Flights, Flow::Pricing) => flight_pricing(criteria),
        (Supplier::Hotels, Flow::Search) => hotel_search(criteria),
        (Supplier::Hotels, Flow::Pricing) => hotel_pricing(criteria),
        // The booking path never substitutes synthetic data; the orchestrator
        // fails loudly before reaching here. Kept total for safety.
        (_, Flow::Booking) => json!({ "supplier": supplier.to_string(), "bookable": false }),
    }
}

fn criteria_str<'a>(criteria: &'a Value, key: &str, default: &'a str) -> &'a str {
    criteria.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn flight_search(criteria: &Value) -> Value {
    let origin = criteria_str(criteria, "origin", "JED");
    let destination = criteria_str(criteria, "destination", "IST");

    json!({
        "supplier": "flights",
        "criteria": { "origin": origin, "destination": destination },
        "itineraries": [
            {
                "itinerary_id": "FB-IT-1",
                "legs": [
                    {
                        "origin": origin,
                        "destination": destination,
                        "carrier": "XY",
                        "flight_number": "XY101",
                        "departure": "2026-09-01T08:30:00Z",
                        "arrival": "2026-09-01T12:05:00Z",
                        "duration_minutes": 215,
                        "price": { "currency": "USD", "amount": 412.50 }
                    }
                ],
                "passenger_count": 1,
                "price": {
                    "currency": "USD",
                    "total": 412.50,
                    "base_fare": 350.00,
                    "tax": 62.50
                },
                "seats_remaining": 9
            },
            {
                "itinerary_id": "FB-IT-2",
                "legs": [
                    {
                        "origin": origin,
                        "destination": "CAI",
                        "carrier": "MS",
                        "flight_number": "MS644",
                        "departure": "2026-09-01T06:10:00Z",
                        "arrival": "2026-09-01T08:20:00Z",
                        "duration_minutes": 130,
                        "price": { "currency": "USD", "amount": 180.00 }
                    },
                    {
                        "origin": "CAI",
                        "destination": destination,
                        "carrier": "MS",
                        "flight_number": "MS737",
                        "departure": "2026-09-01T10:45:00Z",
                        "arrival": "2026-09-01T13:40:00Z",
                        "duration_minutes": 175,
                        "price": { "currency": "USD", "amount": 175.25 }
                    }
                ],
                "passenger_count": 1,
                "price": {
                    "currency": "USD",
                    "total": 355.25,
                    "base_fare": 300.00,
                    "tax": 55.25
                },
                "seats_remaining": 4
            }
        ]
    })
}

fn flight_pricing(criteria: &Value) -> Value {
    let origin = criteria_str(criteria, "origin", "JED");
    let destination = criteria_str(criteria, "destination", "IST");

    json!({
        "supplier": "flights",
        "criteria": { "origin": origin, "destination": destination },
        "fares": [
            {
                "fare_id": "FB-FARE-1",
                "fare_basis": "YBASIC",
                "validating_carrier": "XY",
                "price": {
                    "currency": "USD",
                    "total": 412.50,
                    "base_fare": 350.00,
                    "tax": 62.50
                },
                "refundable": false
            }
        ]
    })
}

fn hotel_search(criteria: &Value) -> Value {
    let destination = criteria_str(criteria, "destination", "IST");
    let check_in = criteria_str(criteria, "check_in", "2026-09-01");
    let check_out = criteria_str(criteria, "check_out", "2026-09-04");

    json!({
        "supplier": "hotels",
        "criteria": {
            "destination": destination,
            "check_in": check_in,
            "check_out": check_out
        },
        "hotels": [
            {
                "hotel_id": "FB-HT-1",
                "name": "Harbour View Hotel",
                "category": 4,
                "destination_code": destination,
                "rooms": [
                    {
                        "room_id": "DBL",
                        "name": "Double Room",
                        "capacity": { "adults": 2, "children": 0 },
                        "rates": [
                            {
                                "rate_id": "R1",
                                "board_type": "BB",
                                "booking_code": "FB-BC-1",
                                "price": { "currency": "USD", "total": 140.00, "tax": 18.00 }
                            }
                        ]
                    }
                ]
            },
            {
                "hotel_id": "FB-HT-2",
                "name": "Old Town Suites",
                "category": 3,
                "destination_code": destination,
                "rooms": [
                    {
                        "room_id": "STE",
                        "name": "Junior Suite",
                        "capacity": { "adults": 2, "children": 1 },
                        "rates": [
                            {
                                "rate_id": "R2",
                                "board_type": "RO",
                                "booking_code": "FB-BC-2",
                                "price": { "currency": "USD", "total": 96.50, "tax": 12.40 }
                            }
                        ]
                    }
                ]
            }
        ]
    })
}

fn hotel_pricing(criteria: &Value) -> Value {
    let destination = criteria_str(criteria, "destination", "IST");

    json!({
        "supplier": "hotels",
        "criteria": { "destination": destination },
        "rates": [
            {
                "rate_id": "R1",
                "board_type": "BB",
                "booking_code": "FB-BC-1",
                "cancellation_policies": [
                    { "from_date": "2026-08-28T00:00:00Z", "amount": 70.00 }
                ],
                "price": { "currency": "USD", "total": 140.00, "tax": 18.00 }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_equal_criteria() {
        let criteria = json!({ "origin": "JED", "destination": "IST" });
        let a = fallback_result(Supplier::Flights, Flow::Search, &criteria);
        let b = fallback_result(Supplier::Flights, Flow::Search, &criteria);
        assert_eq!(a, b);
    }

    #[test]
    fn flight_search_echoes_criteria() {
        let criteria = json!({ "origin": "RUH", "destination": "LHR" });
        let result = fallback_result(Supplier::Flights, Flow::Search, &criteria);

        assert_eq!(result["criteria"]["origin"], "RUH");
        let legs = result["itineraries"][0]["legs"].as_array().unwrap();
        assert_eq!(legs[0]["origin"], "RUH");

        let itineraries = result["itineraries"].as_array().unwrap();
        assert!(!itineraries.is_empty());
    }

    #[test]
    fn hotel_search_has_live_supplier_shape() {
        let criteria = json!({ "destination": "IST" });
        let result = fallback_result(Supplier::Hotels, Flow::Search, &criteria);

        let hotels = result["hotels"].as_array().unwrap();
        assert!(!hotels.is_empty());
        // Price objects sit where the markup engine expects them.
        assert!(hotels[0]["rooms"][0]["rates"][0]["price"]["total"].is_number());
    }

    #[test]
    fn pricing_payloads_carry_price_objects() {
        let criteria = json!({});
        let flights = fallback_result(Supplier::Flights, Flow::Pricing, &criteria);
        let hotels = fallback_result(Supplier::Hotels, Flow::Pricing, &criteria);

        assert!(flights["fares"][0]["price"]["total"].is_number());
        assert!(hotels["rates"][0]["price"]["total"].is_number());
    }
}
