//! Resolução temporal: qual valor de uma chave é visível no instante `T`.
//!
//! Regra de visibilidade:
//! 1. Chain vazia, ou `T` anterior à primeira versão: a chave não existia.
//! 2. Seja `v` a versão com o maior `created_at <= T` (empates: a última inserida).
//! 3. `v` tombstone: a chave estava removida em `T`.
//! 4. `v` put: visível sse `T < end(v)`, com
//!    `end(v) = min(próxima.created_at, created_at + ttl)`.
//!
//! A janela é fechada à esquerda e aberta à direita. Ressurreição após
//! delete não tem tratamento especial: um `Put` posterior ao tombstone
//! simplesmente passa a ser a versão encontrada no passo 2.
//!
//! Funções puras, totais, sem efeitos colaterais.

use evokv_common::Timestamp;

use crate::chain::VersionChain;
use crate::version::Version;

/// Resultado detalhado da resolução.
///
/// Na API pública de leitura os três casos de ausência colapsam em `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    /// `T` é anterior à primeira versão (ou a chain está vazia).
    NeverExisted,
    /// O TTL do último `Put` venceu em `at`.
    Expired { at: Timestamp },
    /// Um tombstone gravado em `at` está ativo.
    Deleted { at: Timestamp },
    Present(T),
}

impl<T> Resolution<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Resolution::Present(_))
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolution::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::NeverExisted => Resolution::NeverExisted,
            Resolution::Expired { at } => Resolution::Expired { at },
            Resolution::Deleted { at } => Resolution::Deleted { at },
            Resolution::Present(value) => Resolution::Present(f(value)),
        }
    }
}

impl<T: Clone> Resolution<&T> {
    pub fn cloned(self) -> Resolution<T> {
        self.map(T::clone)
    }
}

/// Resolve a chain em `at`, preservando o motivo da ausência.
pub fn resolve_detailed<V>(chain: &VersionChain<V>, at: Timestamp) -> Resolution<&V> {
    let Some(index) = chain.position_at_or_before(at) else {
        return Resolution::NeverExisted;
    };

    match &chain.versions()[index] {
        Version::Tombstone { created_at } => Resolution::Deleted { at: *created_at },
        Version::Put { value, .. } => match chain.window_end(index) {
            // `at >= end` só é possível pelo TTL: uma próxima versão com
            // `created_at <= at` teria sido escolhida pela busca.
            Some(end) if at >= end => Resolution::Expired { at: end },
            _ => Resolution::Present(value),
        },
    }
}

/// Valor visível em `at`, ou `None`.
pub fn resolve<V>(chain: &VersionChain<V>, at: Timestamp) -> Option<&V> {
    resolve_detailed(chain, at).into_value()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn chain(versions: Vec<Version<&'static str>>) -> VersionChain<&'static str> {
        let mut chain = VersionChain::new();
        for v in versions {
            chain.append(v).unwrap();
        }
        chain
    }

    #[test]
    fn empty_chain_never_existed() {
        let chain: VersionChain<&str> = VersionChain::new();
        assert_eq!(resolve_detailed(&chain, ms(0)), Resolution::NeverExisted);
    }

    #[test]
    fn before_first_version_never_existed() {
        let chain = chain(vec![Version::put("x", ms(1_000), None)]);
        assert_eq!(resolve_detailed(&chain, ms(999)), Resolution::NeverExisted);
        assert_eq!(resolve(&chain, ms(1_000)), Some(&"x"));
    }

    #[test]
    fn ttl_window_is_right_exclusive() {
        let chain = chain(vec![Version::put("x", ms(0), Some(Duration::from_secs(1)))]);
        assert_eq!(resolve(&chain, ms(0)), Some(&"x"));
        assert_eq!(resolve(&chain, ms(999)), Some(&"x"));
        assert_eq!(
            resolve_detailed(&chain, ms(1_000)),
            Resolution::Expired { at: ms(1_000) }
        );
        assert_eq!(resolve(&chain, ms(1_500)), None);
    }

    #[test]
    fn overwrite_ends_previous_window() {
        let chain = chain(vec![
            Version::put("v1", ms(0), None),
            Version::put("v2", ms(1_000), None),
        ]);
        assert_eq!(resolve(&chain, ms(500)), Some(&"v1"));
        assert_eq!(resolve(&chain, ms(1_000)), Some(&"v2"));
        assert_eq!(resolve(&chain, ms(1_500)), Some(&"v2"));
    }

    #[test]
    fn tombstone_hides_value() {
        let chain = chain(vec![Version::put("v", ms(0), None), Version::tombstone(ms(1_000))]);
        assert_eq!(resolve(&chain, ms(500)), Some(&"v"));
        assert_eq!(
            resolve_detailed(&chain, ms(1_000)),
            Resolution::Deleted { at: ms(1_000) }
        );
    }

    #[test]
    fn resurrection_after_tombstone() {
        let chain = chain(vec![
            Version::put("v1", ms(0), None),
            Version::tombstone(ms(1_000)),
            Version::put("v2", ms(2_000), None),
        ]);
        assert_eq!(resolve(&chain, ms(500)), Some(&"v1"));
        assert_eq!(resolve(&chain, ms(1_500)), None);
        assert_eq!(resolve(&chain, ms(2_000)), Some(&"v2"));
    }

    #[test]
    fn revival_after_expiry() {
        let chain = chain(vec![
            Version::put("v1", ms(0), Some(Duration::from_millis(100))),
            Version::put("v2", ms(1_000), None),
        ]);
        assert_eq!(
            resolve_detailed(&chain, ms(500)),
            Resolution::Expired { at: ms(100) }
        );
        assert_eq!(resolve(&chain, ms(1_000)), Some(&"v2"));
    }

    #[test]
    fn tie_break_prefers_later_insertion() {
        let chain = chain(vec![
            Version::put("first", ms(1_000), None),
            Version::put("second", ms(1_000), None),
        ]);
        assert_eq!(resolve(&chain, ms(1_000)), Some(&"second"));

        let deleted = chain_with_tombstone_tie();
        assert_eq!(resolve(&deleted, ms(1_000)), None);
    }

    fn chain_with_tombstone_tie() -> VersionChain<&'static str> {
        chain(vec![Version::put("v", ms(1_000), None), Version::tombstone(ms(1_000))])
    }

    #[test]
    fn zero_ttl_is_never_visible() {
        let chain = chain(vec![Version::put("x", ms(10), Some(Duration::ZERO))]);
        assert_eq!(
            resolve_detailed(&chain, ms(10)),
            Resolution::Expired { at: ms(10) }
        );
    }

    #[test]
    fn no_flapping_inside_window() {
        let chain = chain(vec![
            Version::put("v", ms(100), None),
            Version::put("w", ms(200), None),
        ]);
        for t in 100..200 {
            assert_eq!(resolve(&chain, ms(t)), Some(&"v"));
        }
    }

    #[test]
    fn resolution_helpers() {
        let r: Resolution<&u32> = Resolution::Present(&7);
        assert!(r.is_present());
        assert_eq!(r.cloned(), Resolution::Present(7));
        assert_eq!(Resolution::<u32>::Deleted { at: ms(1) }.into_value(), None);
    }
}
