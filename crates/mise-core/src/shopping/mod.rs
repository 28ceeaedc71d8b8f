//! Shopping list aggregation.
//!
//! Folds a plan's required ingredient lines and a pantry snapshot into one
//! net-required line per `(ingredient, unit)`. Unit labels are mapped to
//! their canonical spelling (`cup` and `cups` are one key) but quantities
//! are never converted between units.

mod service;

pub use service::shopping_list_for_plan;

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use mise_db::models::{MeasurementUnit, PantryItemDetail, RequiredLine};

/// Grouping key for required and owned quantities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ShoppingKey {
    pub ingredient_name: String,
    pub unit: String,
}

impl ShoppingKey {
    /// Key for `unit_label`, spelled canonically when it is a known unit
    /// and kept verbatim otherwise.
    pub fn new(ingredient_name: &str, unit_label: &str) -> Self {
        let unit = MeasurementUnit::from_alias(unit_label)
            .map_or_else(|| unit_label.trim().to_string(), |u| u.to_string());
        Self {
            ingredient_name: ingredient_name.to_string(),
            unit,
        }
    }
}

/// Stock on hand for one pantry row, in its ingredient's canonical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PantryStock {
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: BigDecimal,
}

impl From<&PantryItemDetail> for PantryStock {
    fn from(item: &PantryItemDetail) -> Self {
        Self {
            ingredient_name: item.ingredient_name.clone(),
            unit: item.unit.to_string(),
            quantity: item.quantity.clone(),
        }
    }
}

/// One aggregated row of the shopping list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingLine {
    pub ingredient_name: String,
    pub unit: String,
    pub net_quantity: BigDecimal,
    pub cost_per_unit: BigDecimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShoppingListOptions {
    /// Drop lines the pantry already covers.
    pub omit_covered: bool,
}

struct Required {
    quantity: BigDecimal,
    cost_per_unit: BigDecimal,
}

/// Net quantity still to buy per `(ingredient, unit)`, sorted by key.
///
/// `net = max(0, required - owned)`. Pantry stock for keys no line requires
/// is ignored. The result does not depend on input order.
pub fn aggregate(
    lines: &[RequiredLine],
    pantry: &[PantryStock],
    options: ShoppingListOptions,
) -> Vec<ShoppingLine> {
    let mut required: BTreeMap<ShoppingKey, Required> = BTreeMap::new();
    for line in lines {
        let key = ShoppingKey::new(&line.ingredient_name, &line.unit);
        let entry = required.entry(key).or_insert_with(|| Required {
            quantity: BigDecimal::zero(),
            cost_per_unit: line.cost_per_unit.clone(),
        });
        entry.quantity += &line.quantity;
    }

    let mut owned: BTreeMap<ShoppingKey, BigDecimal> = BTreeMap::new();
    for stock in pantry {
        let key = ShoppingKey::new(&stock.ingredient_name, &stock.unit);
        *owned.entry(key).or_insert_with(BigDecimal::zero) += &stock.quantity;
    }

    required
        .into_iter()
        .filter_map(|(key, need)| {
            let have = owned.get(&key).cloned().unwrap_or_else(BigDecimal::zero);
            let net = need.quantity - have;
            let net = if net < BigDecimal::zero() { BigDecimal::zero() } else { net };
            if options.omit_covered && net.is_zero() {
                return None;
            }
            Some(ShoppingLine {
                ingredient_name: key.ingredient_name,
                unit: key.unit,
                net_quantity: net,
                cost_per_unit: need.cost_per_unit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn line(name: &str, quantity: &str, unit: &str) -> RequiredLine {
        RequiredLine {
            ingredient_name: name.to_string(),
            unit: unit.to_string(),
            quantity: dec(quantity),
            cost_per_unit: dec("0.50"),
        }
    }

    fn stock(name: &str, quantity: &str, unit: &str) -> PantryStock {
        PantryStock {
            ingredient_name: name.to_string(),
            unit: unit.to_string(),
            quantity: dec(quantity),
        }
    }

    fn summary(lines: &[ShoppingLine]) -> Vec<(String, String, BigDecimal)> {
        lines
            .iter()
            .map(|l| (l.ingredient_name.clone(), l.unit.clone(), l.net_quantity.clone()))
            .collect()
    }

    #[test]
    fn pantry_is_subtracted_per_key() {
        let lines = [line("flour", "5", "cups"), line("eggs", "3", "pieces")];
        let pantry = [stock("flour", "2", "cups")];

        let result = aggregate(&lines, &pantry, ShoppingListOptions::default());
        assert_eq!(
            summary(&result),
            vec![
                ("eggs".into(), "pieces".into(), dec("3")),
                ("flour".into(), "cups".into(), dec("3")),
            ]
        );
    }

    #[test]
    fn surplus_clamps_at_zero_and_can_be_omitted() {
        let lines = [line("rice", "1", "kg")];
        let pantry = [stock("rice", "2.5", "kg")];

        let result = aggregate(&lines, &pantry, ShoppingListOptions::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].net_quantity, BigDecimal::zero());

        let omitted = aggregate(&lines, &pantry, ShoppingListOptions { omit_covered: true });
        assert!(omitted.is_empty());
    }

    #[test]
    fn mismatched_units_stay_separate() {
        let lines = [line("milk", "1", "cups"), line("milk", "250", "ml")];
        let pantry = [stock("milk", "1", "l")];

        let result = aggregate(&lines, &pantry, ShoppingListOptions::default());
        assert_eq!(
            summary(&result),
            vec![
                ("milk".into(), "cups".into(), dec("1")),
                ("milk".into(), "ml".into(), dec("250")),
            ]
        );
    }

    #[test]
    fn unit_aliases_share_a_key() {
        let lines = [
            line("flour", "5", "cup"),
            line("sugar", "100", "g"),
            line("sugar", "50", "grams"),
        ];
        let pantry = [stock("flour", "2", "cups"), stock("sugar", "30", "grams")];

        let result = aggregate(&lines, &pantry, ShoppingListOptions::default());
        assert_eq!(
            summary(&result),
            vec![
                ("flour".into(), "cups".into(), dec("3")),
                ("sugar".into(), "grams".into(), dec("120")),
            ]
        );
    }

    #[test]
    fn unknown_unit_labels_are_kept_verbatim() {
        let key = ShoppingKey::new("saffron", " pinch ");
        assert_eq!(key.unit, "pinch");
        assert_eq!(ShoppingKey::new("saffron", "Tbsp").unit, "tbsp");
    }

    #[test]
    fn repeated_lines_and_pantry_rows_are_summed() {
        let lines = [
            line("onion", "1", "whole"),
            line("onion", "2", "whole"),
            line("onion", "0.5", "whole"),
        ];
        let pantry = [stock("onion", "1", "whole"), stock("onion", "1", "whole")];

        let result = aggregate(&lines, &pantry, ShoppingListOptions::default());
        assert_eq!(result[0].net_quantity, dec("1.5"));
    }

    #[test]
    fn order_of_inputs_does_not_matter() {
        let mut lines = vec![
            line("b", "1", "g"),
            line("a", "2", "g"),
            line("b", "3", "g"),
            line("c", "4", "cups"),
        ];
        let mut pantry = vec![stock("a", "1", "g"), stock("c", "10", "cups"), stock("b", "1", "g")];

        let forward = aggregate(&lines, &pantry, ShoppingListOptions::default());
        lines.reverse();
        pantry.reverse();
        let backward = aggregate(&lines, &pantry, ShoppingListOptions::default());

        assert_eq!(forward, backward);
        assert!(forward.iter().all(|l| l.net_quantity >= BigDecimal::zero()));
    }

    #[test]
    fn pantry_only_items_are_not_listed() {
        let result = aggregate(&[], &[stock("salt", "1", "kg")], ShoppingListOptions::default());
        assert!(result.is_empty());
    }
}
