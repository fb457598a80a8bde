//! Effect fallbacks
//!
//! When a shader variant fails to compile on the current device, the host
//! drops optional features one rank at a time and retries. Each feature block
//! registers its defines with the next free rank; ranks are shared across all
//! blocks of a material.

use crate::MaterialDefines;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct EffectFallbacks {
    ranks: BTreeMap<u32, Vec<String>>,
}

impl EffectFallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `define` to be dropped at fallback level `rank`
    pub fn add_fallback(&mut self, rank: u32, define: impl Into<String>) {
        self.ranks.entry(rank).or_default().push(define.into());
    }

    pub fn has_more_fallbacks(&self) -> bool {
        !self.ranks.is_empty()
    }

    /// Defines registered at `rank`
    pub fn defines_at(&self, rank: u32) -> &[String] {
        self.ranks.get(&rank).map_or(&[], Vec::as_slice)
    }

    /// Number of registered defines across all ranks
    pub fn len(&self) -> usize {
        self.ranks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Turn off the lowest remaining rank of defines.
    ///
    /// Returns `false` once every fallback has been consumed.
    pub fn reduce(&mut self, defines: &mut MaterialDefines) -> bool {
        let Some((rank, names)) = self.ranks.pop_first() else {
            return false;
        };

        for name in &names {
            defines.set_bool(name, false);
        }
        log::debug!("Applied fallback rank {}: disabled {:?}", rank, names);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_drops_lowest_rank_first() {
        let mut fallbacks = EffectFallbacks::new();
        fallbacks.add_fallback(1, "SHEEN");
        fallbacks.add_fallback(0, "CLEARCOAT");
        fallbacks.add_fallback(1, "ANISOTROPIC");

        let mut defines = MaterialDefines::new();
        defines.set_bool("SHEEN", true);
        defines.set_bool("CLEARCOAT", true);
        defines.set_bool("ANISOTROPIC", true);

        assert_eq!(fallbacks.len(), 3);
        assert!(fallbacks.reduce(&mut defines));
        assert!(!defines.get_bool("CLEARCOAT"));
        assert!(defines.get_bool("SHEEN"));

        assert!(fallbacks.reduce(&mut defines));
        assert!(!defines.get_bool("SHEEN"));
        assert!(!defines.get_bool("ANISOTROPIC"));

        assert!(!fallbacks.has_more_fallbacks());
        assert!(!fallbacks.reduce(&mut defines));
    }
}
