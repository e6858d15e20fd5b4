//! Synthetic dataset generation.

use chrono::TimeDelta;
use chrono::Utc;
use livescroll_lib::model::Fields;
use livescroll_lib::model::Value;
use rand::Rng;

const NAMES: &[&str] = &[
    "Contoso", "Fabrikam", "Northwind", "Tailspin", "Litware", "Adventure Works", "Proseware",
    "Woodgrove",
];

/// Builds `count` rows with ids `r0..r{count-1}` under `id_field`.
pub fn generate(count: usize, id_field: &str) -> Vec<Fields> {
    let mut rng = rand::rng();
    let now = Utc::now();

    (0..count)
        .map(|i| {
            let mut fields = Fields::new();
            fields.insert(id_field.to_string(), Value::from(format!("r{i}")));
            let name = NAMES[rng.random_range(0..NAMES.len())];
            fields.insert("name".to_string(), Value::from(format!("{name} {i}")));
            fields.insert("value".to_string(), Value::from(rng.random_range(0..10_000i64)));
            fields.insert(
                "created".to_string(),
                Value::from(now - TimeDelta::minutes(i as i64)),
            );
            fields
        })
        .collect()
}
