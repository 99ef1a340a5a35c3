use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, warn};

use evokv_common::{StoreError, Timestamp};

use crate::chain::VersionChain;
use crate::resolve::{Resolution, resolve, resolve_detailed};
use crate::version::Version;

/// O que fazer com uma escrita anterior à última versão da chave.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OrderingPolicy {
    /// Rejeita com `StoreError::OutOfOrderWrite`.
    #[default]
    Strict,
    /// Grava no instante da última versão (`max(at, latest)`).
    Clamp,
}

/// Snapshot derivado do valor atual. Nunca é autoritativo: a chain é.
#[derive(Debug, Clone)]
struct CachedCurrent<V> {
    value: V,
    created_at: Timestamp,
    expires_at: Option<Timestamp>,
    /// Tamanho da chain quando o snapshot foi tirado.
    seq: usize,
}

impl<V> CachedCurrent<V> {
    fn is_fresh(&self, chain_len: usize, now: Timestamp) -> bool {
        self.seq == chain_len
            && self.created_at <= now
            && self.expires_at.is_none_or(|end| now < end)
    }
}

struct IndexEntry<V> {
    chain: VersionChain<V>,
    cached: RwLock<Option<CachedCurrent<V>>>,
}

impl<V> Default for IndexEntry<V> {
    fn default() -> Self {
        Self {
            chain: VersionChain::new(),
            cached: RwLock::new(None),
        }
    }
}

impl<V> IndexEntry<V> {
    fn cache_mut(&mut self) -> &mut Option<CachedCurrent<V>> {
        self.cached.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mapa chave → chain, com o caminho de escrita e o cache do valor atual.
///
/// Escritas numa chave seguram o lock do shard do `DashMap` enquanto fazem
/// append, então são serializadas por chave. Leituras só pegam o lock de
/// leitura do shard e nunca bloqueiam umas às outras.
///
/// Não há lock por chave: o lock é do shard. Duas chaves diferentes que
/// caem no mesmo shard disputam o mesmo lock, e uma escrita bloqueia as
/// leituras do shard inteiro durante o append.
pub struct StoreIndex<K, V> {
    entries: DashMap<K, IndexEntry<V>>,
    ordering: OrderingPolicy,
    cache_enabled: bool,
}

impl<K, V> StoreIndex<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ordering: OrderingPolicy, cache_enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            ordering,
            cache_enabled,
        }
    }

    /// Instante em que a escrita será de fato gravada, segundo a política.
    fn admit(&self, chain: &VersionChain<V>, at: Timestamp) -> Result<Timestamp, StoreError> {
        match chain.last().map(Version::created_at) {
            Some(latest) if at < latest => match self.ordering {
                OrderingPolicy::Strict => Err(StoreError::OutOfOrderWrite { at, latest }),
                OrderingPolicy::Clamp => {
                    warn!(%at, %latest, "escrita fora de ordem ajustada para a última versão");
                    Ok(latest)
                }
            },
            _ => Ok(at),
        }
    }

    /// Acrescenta um `Put` e atualiza o cache. Retorna o instante gravado.
    pub fn set(
        &self,
        key: K,
        value: V,
        ttl: Option<Duration>,
        at: Timestamp,
    ) -> Result<Timestamp, StoreError> {
        let mut entry = self.entries.entry(key).or_default();

        let at = self.admit(&entry.chain, at)?;
        let version = Version::put(value, at, ttl);
        let expires_at = version.expires_at();
        let cached = match (&version, self.cache_enabled) {
            (Version::Put { value, .. }, true) => Some(value.clone()),
            _ => None,
        };
        entry.chain.append(version)?;

        let seq = entry.chain.len();
        *entry.cache_mut() = cached.map(|value| CachedCurrent {
            value,
            created_at: at,
            expires_at,
            seq,
        });

        debug!(%at, ?ttl, versions = seq, "put acrescentado");
        Ok(at)
    }

    /// Acrescenta um tombstone se havia algo visível em `at`.
    ///
    /// Retorna `false` (sem gravar nada) quando a chave nunca existiu, já
    /// estava removida ou expirou.
    pub fn delete<Q>(&self, key: &Q, at: Timestamp) -> Result<bool, StoreError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(false);
        };

        let at = self.admit(&entry.chain, at)?;
        if !resolve_detailed(&entry.chain, at).is_present() {
            return Ok(false);
        }

        entry.chain.append(Version::tombstone(at))?;
        *entry.cache_mut() = None;

        debug!(%at, versions = entry.chain.len(), "tombstone acrescentado");
        Ok(true)
    }

    /// Valor visível em `now`, usando o cache quando ele ainda vale.
    pub fn current<Q>(&self, key: &Q, now: Timestamp) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.get(key)?;
        self.current_of(&entry, now)
    }

    fn current_of(&self, entry: &IndexEntry<V>, now: Timestamp) -> Option<V> {
        if !self.cache_enabled {
            return resolve(&entry.chain, now).cloned();
        }

        {
            let cached = entry.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(c) = cached.as_ref()
                && c.is_fresh(entry.chain.len(), now)
            {
                return Some(c.value.clone());
            }
        }

        let value = resolve(&entry.chain, now).cloned();

        // Só o último `Put` já iniciado pode ir para o cache: uma versão
        // mais antiga ainda vai ser encerrada por uma posterior.
        let refreshed = match (&value, entry.chain.last()) {
            (Some(v), Some(last)) if !last.is_tombstone() && last.created_at() <= now => {
                Some(CachedCurrent {
                    value: v.clone(),
                    created_at: last.created_at(),
                    expires_at: last.expires_at(),
                    seq: entry.chain.len(),
                })
            }
            _ => None,
        };
        *entry.cached.write().unwrap_or_else(PoisonError::into_inner) = refreshed;

        value
    }

    /// Resolução histórica em `at`. Nunca consulta o cache.
    pub fn resolve_at<Q>(&self, key: &Q, at: Timestamp) -> Resolution<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) => resolve_detailed(&entry.chain, at).cloned(),
            None => Resolution::NeverExisted,
        }
    }

    /// Executa `f` com a chain da chave, se ela existir.
    pub fn with_chain<Q, R>(&self, key: &Q, f: impl FnOnce(&VersionChain<V>) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| f(&entry.chain))
    }

    /// Chaves com valor visível em `now`. O(n) sobre todas as chains.
    pub fn present_keys(&self, now: Timestamp) -> Vec<K> {
        self.entries
            .iter()
            .filter(|entry| self.current_of(entry.value(), now).is_some())
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn count_present(&self, now: Timestamp) -> usize {
        self.entries
            .iter()
            .filter(|entry| self.current_of(entry.value(), now).is_some())
            .count()
    }

    /// Número de chains armazenadas, visíveis ou não.
    pub fn chain_count(&self) -> usize {
        self.entries.len()
    }

    pub fn version_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.chain.len()).sum()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove chains sem nenhuma janela visível. Retorna quantas saíram.
    pub fn evict_unobservable(&self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.chain.has_observable_history();
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Compacta todas as chains em `horizon`. Chains vazias são removidas.
    /// Retorna o número de versões descartadas.
    pub fn compact_before(&self, horizon: Timestamp) -> usize {
        let mut discarded = 0;
        self.entries.retain(|_, entry| {
            let n = entry.chain.compact_before(horizon);
            if n > 0 {
                *entry.cache_mut() = None;
                discarded += n;
            }
            !entry.chain.is_empty()
        });
        discarded
    }
}
