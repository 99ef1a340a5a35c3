use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use evokv_common::{StoreError, Timestamp};

use crate::clock::{Clock, SystemClock};
use crate::index::{OrderingPolicy, StoreIndex};
use crate::resolve::{Resolution, resolve};
use crate::version::Version;

/// Configuração do store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub ordering: OrderingPolicy,
    /// Liga o atalho de leitura do valor atual.
    pub current_cache: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingPolicy::Strict,
            current_cache: true,
        }
    }
}

/// Tempo de vida restante do valor visível agora.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Absent,
    Persistent,
    Remaining(Duration),
}

struct Shared<K, V> {
    index: StoreIndex<K, V>,
    clock: Arc<dyn Clock>,
}

/// Handle para o store in-memory com histórico.
///
/// Clonar o handle compartilha o mesmo estado.
pub struct Store<K = String, V = Bytes> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(StoreConfig::default(), clock)
    }

    pub fn with_config(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Store {
            shared: Arc::new(Shared {
                index: StoreIndex::new(config.ordering, config.current_cache),
                clock,
            }),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.shared.clock.now()
    }

    // --- Escrita ---

    /// Grava `value` agora. TTL zero é aceito: o valor nasce expirado.
    pub fn set(
        &self,
        key: impl Into<K>,
        value: impl Into<V>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.set_at(key, value, ttl, self.now()).map(|_| ())
    }

    /// Grava `value` em `at`. Retorna o instante efetivamente gravado
    /// (difere de `at` só com `OrderingPolicy::Clamp`).
    pub fn set_at(
        &self,
        key: impl Into<K>,
        value: impl Into<V>,
        ttl: Option<Duration>,
        at: Timestamp,
    ) -> Result<Timestamp, StoreError> {
        self.shared.index.set(key.into(), value.into(), ttl, at)
    }

    /// Remove a chave agora. `false` se não havia nada visível.
    pub fn delete<Q>(&self, key: &Q) -> Result<bool, StoreError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.delete_at(key, self.now())
    }

    pub fn delete_at<Q>(&self, key: &Q, at: Timestamp) -> Result<bool, StoreError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.index.delete(key, at)
    }

    // --- Leitura ---

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.index.current(key, self.now())
    }

    /// Valor visível em `at`. Sempre resolve pela chain, sem cache.
    pub fn get_at_time<Q>(&self, key: &Q, at: Timestamp) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup_at(key, at).into_value()
    }

    /// Como `get_at_time`, mas diz por que a chave está ausente.
    pub fn lookup_at<Q>(&self, key: &Q, at: Timestamp) -> Resolution<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.index.resolve_at(key, at)
    }

    pub fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Quanto falta para a chave deixar de ser visível, considerando também
    /// versões já gravadas para depois de agora (um delete agendado encerra
    /// a vida; um `Put` sem TTL logo em seguida a prolonga).
    pub fn ttl<Q>(&self, key: &Q) -> Ttl
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.now();
        self.shared
            .index
            .with_chain(key, |chain| {
                let Some(index) = chain.position_at_or_before(now) else {
                    return Ttl::Absent;
                };
                if resolve(chain, now).is_none() {
                    return Ttl::Absent;
                }
                match chain.visible_until(index) {
                    Some(end) => Ttl::Remaining(end.duration_since(now)),
                    None => Ttl::Persistent,
                }
            })
            .unwrap_or(Ttl::Absent)
    }

    /// Cópia de todas as versões retidas da chave, em ordem.
    pub fn history<Q>(&self, key: &Q) -> Vec<Version<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared
            .index
            .with_chain(key, |chain| chain.versions().to_vec())
            .unwrap_or_default()
    }

    /// Número de chaves visíveis agora. O(n).
    pub fn size(&self) -> usize {
        self.shared.index.count_present(self.now())
    }

    pub fn get_all_keys(&self) -> HashSet<K> {
        self.shared
            .index
            .present_keys(self.now())
            .into_iter()
            .collect()
    }

    /// Total de versões retidas em todas as chains.
    pub fn version_count(&self) -> usize {
        self.shared.index.version_count()
    }

    // --- Manutenção ---

    pub fn clear(&self) {
        let chains = self.shared.index.chain_count();
        self.shared.index.clear();
        info!(chains, "store limpo");
    }

    /// Remove chains que nunca tiveram valor visível. Não altera nenhuma
    /// leitura histórica. Retorna o número de chains removidas.
    pub fn cleanup_expired(&self) -> usize {
        let evicted = self.shared.index.evict_unobservable();
        if evicted > 0 {
            info!(evicted, "chains sem histórico visível removidas");
        }
        evicted
    }

    /// Descarta o histórico que não influencia leituras em `horizon` ou
    /// depois. Leituras anteriores a `horizon` passam a ver menos história.
    /// Retorna o número de versões descartadas.
    ///
    /// O horizonte nunca passa do relógio: um `horizon` no futuro é tratado
    /// como `now()`, então `get` continua vendo o valor atual.
    pub fn compact_before(&self, horizon: Timestamp) -> usize {
        let now = self.now();
        if horizon > now {
            debug!(%horizon, %now, "horizonte de compactação limitado ao relógio");
        }
        let horizon = horizon.min(now);
        let discarded = self.shared.index.compact_before(horizon);
        info!(%horizon, discarded, "compactação concluída");
        discarded
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
