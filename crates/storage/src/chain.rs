use evokv_common::{StoreError, Timestamp};

use crate::version::Version;

/// Histórico append-only de uma chave, ordenado por `created_at`.
///
/// Timestamps iguais são permitidos; a ordem de inserção desempata
/// (a versão inserida depois vence).
#[derive(Debug, Clone)]
pub struct VersionChain<V> {
    versions: Vec<Version<V>>,
}

impl<V> VersionChain<V> {
    pub fn new() -> Self {
        Self {
            versions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> &[Version<V>] {
        &self.versions
    }

    pub fn first(&self) -> Option<&Version<V>> {
        self.versions.first()
    }

    pub fn last(&self) -> Option<&Version<V>> {
        self.versions.last()
    }

    /// Acrescenta uma versão ao fim da chain.
    ///
    /// Rejeita (sem alterar nada) uma versão anterior à última.
    pub fn append(&mut self, version: Version<V>) -> Result<(), StoreError> {
        if let Some(last) = self.versions.last()
            && version.created_at() < last.created_at()
        {
            return Err(StoreError::OutOfOrderWrite {
                at: version.created_at(),
                latest: last.created_at(),
            });
        }
        self.versions.push(version);
        Ok(())
    }

    /// Posição da versão com o maior `created_at <= at`.
    ///
    /// Entre timestamps iguais retorna a última inserida.
    pub fn position_at_or_before(&self, at: Timestamp) -> Option<usize> {
        let after = self.versions.partition_point(|v| v.created_at() <= at);
        after.checked_sub(1)
    }

    pub fn find_at_or_before(&self, at: Timestamp) -> Option<&Version<V>> {
        self.position_at_or_before(at).map(|i| &self.versions[i])
    }

    /// Fim (exclusivo) da janela efetiva da versão na posição `index`.
    ///
    /// `None` significa +∞. Para tombstones retorna apenas o início da
    /// próxima versão, já que eles nunca são visíveis.
    pub fn window_end(&self, index: usize) -> Option<Timestamp> {
        let version = self.versions.get(index)?;
        let next = self.versions.get(index + 1).map(Version::created_at);
        match (next, version.expires_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Instante em que a chave deixa de ser visível, partindo do `Put` na
    /// posição `index`. `None` significa que ela nunca deixa.
    ///
    /// Segue adiante enquanto a janela termina exatamente onde começa outro
    /// `Put` com janela não vazia. Para num tombstone ou num TTL que acaba
    /// antes da próxima versão.
    pub fn visible_until(&self, index: usize) -> Option<Timestamp> {
        let mut current = index;
        loop {
            let end = self.window_end(current)?;
            let next = self.position_at_or_before(end)?;
            let continues = next > current
                && matches!(self.versions[next], Version::Put { .. })
                && self.window_end(next).is_none_or(|next_end| end < next_end);
            if !continues {
                return Some(end);
            }
            current = next;
        }
    }

    /// `true` se algum `Put` da chain tem janela efetiva não vazia, ou seja,
    /// se existe algum instante em que a chave foi (ou será) visível.
    pub fn has_observable_history(&self) -> bool {
        self.versions.iter().enumerate().any(|(i, v)| match v {
            Version::Put { created_at, .. } => {
                self.window_end(i).is_none_or(|end| *created_at < end)
            }
            Version::Tombstone { .. } => false,
        })
    }

    /// Descarta o maior prefixo de versões que não influencia nenhuma
    /// consulta em `horizon` ou depois. Retorna quantas foram removidas.
    ///
    /// Um prefixo removível é formado por tombstones com `created_at <= horizon`
    /// e por `Put`s cuja janela termina em `horizon` ou antes.
    pub fn compact_before(&mut self, horizon: Timestamp) -> usize {
        let mut dead = 0;
        while dead < self.versions.len() {
            let removable = match &self.versions[dead] {
                Version::Tombstone { created_at } => *created_at <= horizon,
                Version::Put { .. } => self.window_end(dead).is_some_and(|end| end <= horizon),
            };
            if !removable {
                break;
            }
            dead += 1;
        }
        self.versions.drain(..dead);
        dead
    }
}

impl<V> Default for VersionChain<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn chain(versions: Vec<Version<&'static str>>) -> VersionChain<&'static str> {
        let mut chain = VersionChain::new();
        for v in versions {
            chain.append(v).unwrap();
        }
        chain
    }

    #[test]
    fn empty_chain() {
        let chain: VersionChain<&str> = VersionChain::new();
        assert!(chain.is_empty());
        assert!(chain.last().is_none());
        assert!(chain.find_at_or_before(ts(10)).is_none());
    }

    #[test]
    fn append_rejects_out_of_order() {
        let mut chain = chain(vec![Version::put("a", ts(5), None)]);
        let err = chain.append(Version::put("b", ts(4), None)).unwrap_err();
        assert_eq!(
            err,
            StoreError::OutOfOrderWrite {
                at: ts(4),
                latest: ts(5)
            }
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn append_accepts_equal_timestamp() {
        let mut chain = chain(vec![Version::put("a", ts(5), None)]);
        chain.append(Version::put("b", ts(5), None)).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last().and_then(Version::value), Some(&"b"));
    }

    #[test]
    fn find_at_or_before_binary_search() {
        let chain = chain(vec![
            Version::put("a", ts(1), None),
            Version::put("b", ts(3), None),
            Version::tombstone(ts(5)),
        ]);
        assert!(chain.find_at_or_before(ts(0)).is_none());
        assert_eq!(chain.find_at_or_before(ts(1)).and_then(Version::value), Some(&"a"));
        assert_eq!(chain.find_at_or_before(ts(2)).and_then(Version::value), Some(&"a"));
        assert_eq!(chain.find_at_or_before(ts(3)).and_then(Version::value), Some(&"b"));
        assert!(chain.find_at_or_before(ts(9)).unwrap().is_tombstone());
    }

    #[test]
    fn equal_timestamps_pick_last_inserted() {
        let chain = chain(vec![
            Version::put("a", ts(1), None),
            Version::put("b", ts(1), None),
            Version::put("c", ts(1), None),
        ]);
        assert_eq!(chain.position_at_or_before(ts(1)), Some(2));
    }

    #[test]
    fn window_end_is_min_of_next_and_ttl() {
        let chain = chain(vec![
            Version::put("a", ts(0), Some(Duration::from_secs(10))),
            Version::put("b", ts(4), Some(Duration::from_secs(2))),
            Version::put("c", ts(8), None),
        ]);
        assert_eq!(chain.window_end(0), Some(ts(4)));
        assert_eq!(chain.window_end(1), Some(ts(6)));
        assert_eq!(chain.window_end(2), None);
        assert_eq!(chain.window_end(3), None);
    }

    #[test]
    fn visible_until_follows_contiguous_puts() {
        let overwritten = chain(vec![
            Version::put("a", ts(0), Some(Duration::from_secs(10))),
            Version::put("b", ts(5), None),
        ]);
        assert_eq!(overwritten.visible_until(0), None);

        let expiring = chain(vec![
            Version::put("a", ts(0), None),
            Version::put("b", ts(2), Some(Duration::from_secs(3))),
            Version::tombstone(ts(9)),
        ]);
        assert_eq!(expiring.visible_until(0), Some(ts(5)));
    }

    #[test]
    fn visible_until_stops_at_tombstone_or_gap() {
        let deleted = chain(vec![Version::put("a", ts(0), None), Version::tombstone(ts(5))]);
        assert_eq!(deleted.visible_until(0), Some(ts(5)));

        let gap = chain(vec![
            Version::put("a", ts(0), Some(Duration::from_secs(1))),
            Version::put("b", ts(3), None),
        ]);
        assert_eq!(gap.visible_until(0), Some(ts(1)));

        let hidden_next = chain(vec![
            Version::put("a", ts(0), None),
            Version::put("b", ts(4), Some(Duration::ZERO)),
            Version::put("c", ts(6), None),
        ]);
        assert_eq!(hidden_next.visible_until(0), Some(ts(4)));
    }

    #[test]
    fn observable_history() {
        let hidden = chain(vec![
            Version::put("a", ts(0), Some(Duration::ZERO)),
            Version::put("b", ts(2), None),
            Version::put("c", ts(2), Some(Duration::ZERO)),
        ]);
        assert!(!hidden.has_observable_history());

        let visible = chain(vec![Version::put("a", ts(0), None), Version::tombstone(ts(1))]);
        assert!(visible.has_observable_history());
    }

    #[test]
    fn compact_drops_dead_prefix_only() {
        let mut chain = chain(vec![
            Version::put("a", ts(0), None),
            Version::tombstone(ts(2)),
            Version::put("b", ts(4), Some(Duration::from_secs(1))),
            Version::put("c", ts(6), None),
        ]);
        assert_eq!(chain.compact_before(ts(5)), 3);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.first().and_then(Version::value), Some(&"c"));
    }

    #[test]
    fn compact_keeps_live_version() {
        let mut chain = chain(vec![
            Version::put("a", ts(0), None),
            Version::put("b", ts(4), None),
        ]);
        assert_eq!(chain.compact_before(ts(3)), 0);
        assert_eq!(chain.compact_before(ts(4)), 1);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn compact_can_empty_chain() {
        let mut chain = chain(vec![
            Version::put("a", ts(0), Some(Duration::from_secs(1))),
            Version::tombstone(ts(3)),
        ]);
        assert_eq!(chain.compact_before(ts(3)), 2);
        assert!(chain.is_empty());
    }
}
