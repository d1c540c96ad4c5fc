//! Curated default varieties, served when nothing usable could be read from a response.

use crate::normalizer;
use crate::schema::{Variety, VarietyList};

pub const DEFAULT_KEY: &str = "default";

type Entries = &'static [(&'static str, &'static str)];

static TABLE: &[(&str, Entries)] = &[
    (
        "tomato",
        &[
            ("Roma", "Plum-shaped tomatoes with meaty flesh, perfect for sauces and canning"),
            ("Beefsteak", "Large, juicy tomatoes ideal for slicing and sandwiches"),
            ("Cherry", "Small, sweet tomatoes that grow in clusters, great for salads"),
            ("Early Girl", "Early-maturing variety with medium-sized fruit"),
            ("Brandywine", "Large, pink heirloom variety known for exceptional flavor"),
        ],
    ),
    (
        "pepper",
        &[
            ("Bell", "Sweet, mild peppers available in multiple colors"),
            ("Jalapeño", "Medium-hot peppers popular in Mexican cuisine"),
            ("Habanero", "Very hot peppers with fruity flavor"),
            ("Serrano", "Hot peppers commonly used in salsas and sauces"),
            ("Poblano", "Mild to medium-hot peppers, often used for stuffing"),
        ],
    ),
    (
        "carrot",
        &[
            ("Nantes", "Cylindrical carrots with excellent sweet flavor"),
            ("Imperator", "Long, tapered carrots commonly found in supermarkets"),
            ("Danvers", "Conical shape that grows well in heavy soils"),
            ("Chantenay", "Short, stocky carrots good for heavy or rocky soils"),
            ("Purple Dragon", "Purple skin with orange core, sweet flavor"),
        ],
    ),
    (
        "lettuce",
        &[
            ("Romaine", "Tall, upright lettuce with crisp texture and good flavor"),
            ("Butterhead", "Soft, buttery texture with loose heads"),
            ("Iceberg", "Crisp, pale green heads with mild flavor"),
            ("Leaf Lettuce", "Loose leaves with various colors and textures"),
            ("Mesclun Mix", "Mixed baby greens with various flavors and textures"),
        ],
    ),
    (
        "cucumber",
        &[
            ("Slicing", "Long, smooth cucumbers for fresh eating"),
            ("Pickling", "Smaller cucumbers with bumpy skin, ideal for pickles"),
            ("English", "Long, seedless cucumbers with thin skin"),
            ("Lemon", "Round, yellow cucumbers with mild flavor"),
            ("Armenian", "Long, ribbed cucumbers with mild flavor, technically a melon"),
        ],
    ),
    (
        "bean",
        &[
            ("Bush Bean", "Compact plants that don't require support"),
            ("Pole Bean", "Climbing beans that need trellising"),
            ("Lima Bean", "Flat, kidney-shaped beans with buttery flavor"),
            ("Fava Bean", "Large, flat beans grown in cool weather"),
            ("Snap Bean", "Beans eaten pod and all, commonly green or yellow"),
        ],
    ),
    (
        "squash",
        &[
            ("Butternut", "Sweet, nutty winter squash with tan skin"),
            ("Acorn", "Small, ribbed winter squash with sweet flavor"),
            ("Zucchini", "Popular summer squash harvested when immature"),
            ("Pattypan", "Flying saucer-shaped summer squash"),
            ("Delicata", "Oblong winter squash with edible skin and sweet flavor"),
        ],
    ),
    (
        "sunflower",
        &[
            ("Mammoth", "Giant sunflowers reaching 12 feet with large seed heads"),
            ("Dwarf", "Compact plants good for containers and small spaces"),
            ("Teddy Bear", "Fluffy double-flowered variety with no pollen"),
            ("Red Sun", "Burgundy-red petals with dark centers"),
            ("Vanilla Ice", "Cream-colored petals with chocolate centers"),
        ],
    ),
    (
        DEFAULT_KEY,
        &[
            ("Heritage", "Traditional open-pollinated variety with excellent flavor"),
            ("Hybrid", "Disease-resistant variety with consistent results"),
            ("Dwarf", "Compact plants suitable for containers or small gardens"),
            ("Giant", "Large variety that produces impressive yields"),
            ("Early Season", "Quick-maturing variety for shorter growing seasons"),
        ],
    ),
];

/// All keys in the table, `default` last.
pub fn keys() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|(key, _)| *key)
}

/// The table key a hint resolves to; `default` when nothing matches.
pub fn resolve_key(plant_type_hint: Option<&str>) -> &'static str {
    plant_type_hint
        .map(normalizer::lookup_keys)
        .unwrap_or_default()
        .iter()
        .find_map(|candidate| {
            TABLE
                .iter()
                .map(|(key, _)| *key)
                .find(|key| *key != DEFAULT_KEY && *key == candidate.as_str())
        })
        .unwrap_or(DEFAULT_KEY)
}

pub fn entries(key: &str) -> Option<Entries> {
    TABLE
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, entries)| *entries)
}

/// Default varieties for a plant-type hint. Never empty.
pub fn varieties_for(plant_type_hint: Option<&str>) -> VarietyList {
    let key = resolve_key(plant_type_hint);
    let varieties = entries(key)
        .unwrap_or_default()
        .iter()
        .map(|(name, description)| Variety::new(*name, *description))
        .collect();
    VarietyList::new(varieties)
}
