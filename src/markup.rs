// Price Markup Engine: rewrites arbitrary supplier result trees so every
// recognized price carries the configured profit margin.
//
// Supplier payloads have no fixed schema for where prices live, so the walk
// is declarative: a fixed allow-list of price-bearing field names, a fixed
// allow-list of container fields worth recursing into, and nothing else.
// Scanning every numeric field would corrupt passenger counts and durations;
// recursing into every array would walk unrelated structures.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Field names whose value is a price. The one piece of schema knowledge the
/// engine carries.
const PRICE_FIELDS: &[&str] = &["total", "base_fare", "tax", "amount", "price", "net_rate"];

/// When a price field holds an object rather than a number (suppliers that
/// wrap a price in a currency-tagged object), these nested fields are
/// uplifted instead. One level of indirection only.
const NESTED_AMOUNT_FIELDS: &[&str] = &["amount", "total"];

/// Fields known to hold nested result lists. Recursion is bounded to these.
const CONTAINER_FIELDS: &[&str] = &[
    "itineraries",
    "legs",
    "fares",
    "hotels",
    "rooms",
    "rates",
    "options",
    "results",
];

/// Marker injected at the payload root so downstream consumers can assert a
/// rule took effect without recomputing prices.
const MARKER_FIELD: &str = "applied_markup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkupType {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupRule {
    pub id: u32,
    pub markup_type: MarkupType,
    pub markup_value: f64,
    pub currency: String,
    pub is_active: bool,
}

/// Seam to the external Markup Configuration Store: the gateway only ever
/// reads the currently active rule.
pub trait MarkupRuleSource: Send + Sync {
    fn active_rule(&self) -> Option<MarkupRule>;
}

/// Apply `rule` to a deep copy of `payload`. The input is never mutated; with
/// no rule, or a zero-valued one, the copy comes back unchanged and without a
/// marker.
pub fn apply(rule: Option<&MarkupRule>, payload: &Value) -> Value {
    let mut copy = payload.clone();

    let rule = match rule {
        Some(rule) if rule.markup_value != 0.0 => rule,
        _ => return copy,
    };

    match &mut copy {
        Value::Object(map) => {
            walk_object(map, rule);
            map.insert(
                MARKER_FIELD.to_string(),
                json!({
                    "markup_type": rule.markup_type,
                    "markup_value": rule.markup_value,
                }),
            );
        }
        // Tolerate a bare list at the root; no marker can be attached.
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    walk_object(map, rule);
                }
            }
        }
        _ => {}
    }

    copy
}

fn walk_object(map: &mut Map<String, Value>, rule: &MarkupRule) {
    for (key, value) in map.iter_mut() {
        if PRICE_FIELDS.contains(&key.as_str()) {
            match value {
                Value::Number(_) => uplift_in_place(value, rule),
                Value::Object(inner) => {
                    for nested in NESTED_AMOUNT_FIELDS {
                        if let Some(amount @ Value::Number(_)) = inner.get_mut(*nested) {
                            uplift_in_place(amount, rule);
                        }
                    }
                }
                _ => {}
            }
        } else if CONTAINER_FIELDS.contains(&key.as_str()) {
            if let Value::Array(items) = value {
                for item in items {
                    if let Value::Object(inner) = item {
                        walk_object(inner, rule);
                    }
                }
            }
        }
    }
}

fn uplift_in_place(value: &mut Value, rule: &MarkupRule) {
    if let Some(amount) = value.as_f64() {
        if let Some(number) = serde_json::Number::from_f64(uplift(amount, rule)) {
            *value = Value::Number(number);
        }
    }
}

/// Marked-up amount, rounded to two decimals exactly once.
fn uplift(amount: f64, rule: &MarkupRule) -> f64 {
    let raw = match rule.markup_type {
        MarkupType::Percent => amount * (1.0 + rule.markup_value / 100.0),
        MarkupType::Fixed => amount + rule.markup_value,
    };
    (raw * 100.0).round() / 100.0
}

/// In-memory Markup Configuration Store. Write paths keep the invariant that
/// at most one rule is active: activating a rule deactivates all others under
/// one write lock.
#[derive(Default)]
pub struct InMemoryMarkupStore {
    rules: RwLock<Vec<MarkupRule>>,
}

impl InMemoryMarkupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, rule: MarkupRule) {
        let mut rules = self.rules.write();
        let activate = rule.is_active;
        let id = rule.id;
        if let Some(existing) = rules.iter_mut().find(|r| r.id == id) {
            *existing = rule;
        } else {
            rules.push(rule);
        }
        if activate {
            for other in rules.iter_mut().filter(|r| r.id != id) {
                other.is_active = false;
            }
        }
    }

    pub fn set_active(&self, id: u32) -> bool {
        let mut rules = self.rules.write();
        if !rules.iter().any(|r| r.id == id) {
            return false;
        }
        for rule in rules.iter_mut() {
            rule.is_active = rule.id == id;
        }
        true
    }
}

impl MarkupRuleSource for InMemoryMarkupStore {
    fn active_rule(&self) -> Option<MarkupRule> {
        self.rules.read().iter().find(|r| r.is_active).cloned()
    }
}
