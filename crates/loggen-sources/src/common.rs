//! Sampling helpers and the base document shared by every generator.

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

use loggen_core::catalog::GeneratorError;

pub(crate) fn timestamp_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Common envelope every generated document starts from: timestamp, event
/// identity, ECS version, and the synthetic markers downstream filters key on.
pub(crate) fn base_doc(dataset: &str, module: &str) -> Value {
    let now = timestamp_iso();
    json!({
        "@timestamp": &now,
        "event": {
            "dataset": dataset,
            "module": module,
            "created": &now,
        },
        "ecs": { "version": "8.11.0" },
        "labels": { "synthetic": true },
        "tags": ["synthetic", "loggen"],
    })
}

/// Deep-merges `patch` into `doc`: objects merge key by key, anything else
/// is replaced outright.
pub(crate) fn extend(doc: &mut Value, patch: Value) {
    match (doc, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => extend(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, patch) => *slot = patch,
    }
}

pub(crate) fn pick<'a, T>(rng: &mut SmallRng, items: &'a [T]) -> Result<&'a T, GeneratorError> {
    items
        .choose(rng)
        .ok_or_else(|| GeneratorError::Sampling("empty sample table".to_string()))
}

pub(crate) fn pick_weighted<'a, T>(
    rng: &mut SmallRng,
    items: &'a [T],
    weight: impl Fn(&T) -> u32,
) -> Result<&'a T, GeneratorError> {
    items
        .choose_weighted(rng, |item| weight(item))
        .map_err(|err| GeneratorError::Sampling(err.to_string()))
}

pub(crate) fn random_private_ip(rng: &mut SmallRng) -> String {
    match rng.gen_range(0..3) {
        0 => format!(
            "10.{}.{}.{}",
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        1 => format!(
            "172.{}.{}.{}",
            rng.gen_range(16..=31),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        _ => format!(
            "192.168.{}.{}",
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
    }
}

/// Public-looking address: the first octet stays out of multicast and
/// reserved space.
pub(crate) fn random_public_ip(rng: &mut SmallRng) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..=223),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254)
    )
}

pub(crate) fn random_port(rng: &mut SmallRng) -> u16 {
    rng.gen_range(1024..=65535)
}
