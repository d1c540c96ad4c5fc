pub const CONNECTION_TEST_REPLY: &str = "API test successful";

/// "Tomato (Roma)" or just "Tomato".
pub fn plant_label(seed_name: &str, variety: Option<&str>) -> String {
    match variety.map(str::trim).filter(|v| !v.is_empty()) {
        Some(variety) => format!("{} ({})", seed_name.trim(), variety),
        None => seed_name.trim().to_string(),
    }
}

pub fn build_seed_details_prompt(context: &str) -> String {
    format!(
        r#"Your task is to provide comprehensive seed and plant information for a seed catalog. I need detailed and accurate information about {context}.

Please format the response as a valid JSON object with the following structure:

```json
{{
  "seed_name": "Common name of the plant/seed",
  "seed_variety": "Specific variety name",
  "description": "General overview description",
  "brand": "Brand name if applicable",
  "sku": "Product SKU or UPC if applicable",
  "detailed_description": {{
    "plant_type": "Annual/Perennial/Biennial/etc.",
    "growth_habit": "Vine/Bush/Upright/Spreading/etc.",
    "plant_size": "Height and spread measurements",
    "fruit_flower_details": "Size, color and shape of fruits or flowers",
    "flavor_profile": "Taste characteristics for edible plants",
    "scent": "Fragrance of flowers or herbs",
    "bloom_time": "When flowers bloom",
    "days_to_maturity": "Average days from planting to harvest",
    "special_characteristics": "Heat tolerance, deer resistance and similar"
  }},
  "growing_instructions": {{
    "sowing_depth": "How deep to plant seeds",
    "spacing": "Distance between plants",
    "soil_temperature": "Optimal soil temperature for germination",
    "sowing_method": "Direct sow or transplant recommendation",
    "days_to_germination": "Average germination time frame",
    "sunlight_needs": "Full sun/part shade/shade requirements",
    "watering_requirements": "Moisture needs and watering frequency",
    "fertilizer_recommendations": "Fertilizer needs and schedule",
    "pest_disease_info": "Common pest issues and prevention",
    "harvesting_tips": "When and how to harvest"
  }},
  "seed_info": {{
    "seed_count": "Approximate number of seeds per packet",
    "seed_type": "Organic/Heirloom/Hybrid/Open-pollinated",
    "germination_rate": "Expected germination percentage",
    "seed_saving": "Instructions for saving seeds"
  }},
  "additional_info": {{
    "hardiness_zones": "USDA growing zones",
    "companion_plants": "Plants that grow well alongside it",
    "container_suitability": "Suitability for container growing",
    "pollinator_friendly": "Attracts beneficial insects",
    "culinary_uses": "How it is used in cooking",
    "storage_recommendations": "How to store harvested produce",
    "historical_background": "Brief history or origin"
  }},
  "vendor_info": {{
    "company_name": "Seed company name",
    "availability": "Seasonal availability",
    "website": "Company website"
  }}
}}
```

For fields you don't have information about, use empty strings or null values. Provide accurate, garden-tested information rather than generic descriptions. Include scientific names when known."#
    )
}

pub fn build_varieties_prompt(search_term: &str) -> String {
    format!(
        r#"Search for seed varieties matching: {search_term}.

Format the response as valid JSON with a "varieties" array containing a name and a brief description for each variety:

{{"varieties": [{{"name": "Variety Name", "description": "Brief description"}}]}}

List 5 real, commonly available varieties. Output ONLY the JSON object."#
    )
}

pub fn build_growing_prompt(plant: &str) -> String {
    format!(
        r#"Provide detailed growing instructions for {plant} seeds. Format your response as a valid JSON object using this structure:

```json
{{
  "sowing_depth": "How deep to plant seeds",
  "spacing": "Distance between plants",
  "soil_temperature": "Optimal soil temperature for germination",
  "sowing_method": "Direct sow or transplant recommendation",
  "days_to_germination": "Average germination time frame",
  "days_to_maturity": "Days from planting to harvest",
  "sunlight_needs": "Full sun/part shade/shade requirements",
  "watering_requirements": "Moisture needs and watering frequency",
  "fertilizer_recommendations": "Fertilizer needs and schedule",
  "pest_disease_info": "Common pest issues and prevention",
  "pruning_maintenance": "Care instructions",
  "harvesting_tips": "When and how to harvest"
}}
```

Make the instructions specific to {plant}. Include exact measurements and ranges where appropriate."#
    )
}

pub fn build_care_prompt(plant: &str) -> String {
    format!(
        r#"Provide complete care instructions for growing {plant} successfully, covering the whole life cycle.

Format the response as a valid JSON object with this structure:

```json
{{
  "soil_preparation": "Detailed soil preparation needs",
  "planting_time": "Best season/months for planting",
  "watering_schedule": "Watering needs by growth stage",
  "fertilizing": "Fertilizing schedule and recommendations",
  "pest_management": "Common pests and organic control methods",
  "disease_prevention": "Common diseases and prevention strategies",
  "pruning_techniques": "How and when to prune",
  "support_requirements": "Trellising or support needs",
  "companion_plants": "What grows well with this plant",
  "succession_planting": "Tips for continuous harvests",
  "overwintering": "How to overwinter if perennial",
  "harvest_indicators": "How to tell when ready to harvest"
}}
```

Give specific, actionable advice for home gardeners."#
    )
}

pub fn build_description_prompt(plant: &str) -> String {
    format!(
        "Write an engaging 2-3 paragraph description for {plant} for a seed catalog. Include appearance, flavor (if edible), unique characteristics and growing benefits. Do not format as JSON, just provide the descriptive text."
    )
}

pub fn build_image_prompt() -> &'static str {
    r#"Analyze this image and identify what type of seed or plant it shows. Focus on the plant species, the variety if visible, and any distinctive characteristics. Provide your response in JSON format with the following structure:
{
  "identification": "Name of the plant/seed",
  "variety": "Specific variety if identifiable",
  "characteristics": ["key characteristic 1", "key characteristic 2"],
  "confidence_level": "high|medium|low",
  "notes": "Any additional observations"
}"#
}

pub fn build_connection_test_prompt() -> String {
    format!("Please respond with the text '{CONNECTION_TEST_REPLY}' and nothing else.")
}

/// Free-form search. Blank parts are left out.
pub fn build_search_prompt(query: &str, context: Option<&str>, seed_context: Option<&str>) -> String {
    let parts: Vec<String> = [
        ("Query", Some(query)),
        ("Context", context),
        ("Seed Context", seed_context),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        let value = value?.trim();
        (!value.is_empty()).then(|| format!("{label}: {value}"))
    })
    .collect();

    if parts.is_empty() {
        "Please provide a search query.".to_string()
    } else {
        parts.join(" ")
    }
}
