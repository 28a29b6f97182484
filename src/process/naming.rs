/*!
 * Process Naming
 * Display-name generation and collision suffixing
 */

use crate::core::limits::APP_NAMES;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Return `base` if free, otherwise `"base (n)"` with the smallest free n >= 1
pub fn unique_name(base: &str, taken: &HashSet<&str>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    (1u32..)
        .map(|i| format!("{} ({})", base, i))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Pick a name from the application pool
pub fn random_app_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    APP_NAMES.choose(rng).copied().unwrap_or("Process")
}
