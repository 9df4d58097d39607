// src/db/memory_store.rs

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::db::store::{Document, DocumentRef, DocumentStore, StoreError, StoreTransaction};

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    data: Document,
}

#[derive(Default)]
struct Inner {
    documents: Mutex<HashMap<DocumentRef, Versioned>>,
    available: AtomicBool,
    // Falhas simuladas, usadas pelos testes
    rejected_collections: std::sync::RwLock<HashSet<String>>,
    pending_conflicts: AtomicU32,
    commit_delay_ms: AtomicU64,
}

/// Store em memória com controle de concorrência otimista: cada transação
/// guarda a versão de tudo que leu e o commit falha com `Conflict` se algum
/// desses documentos mudou nesse meio tempo.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let inner = Inner {
            available: AtomicBool::new(true),
            ..Default::default()
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Grava um documento diretamente, fora de transação.
    #[cfg(test)]
    pub async fn seed(&self, doc: DocumentRef, data: Document) {
        let mut documents = self.inner.documents.lock().await;
        let version = documents.get(&doc).map_or(1, |v| v.version + 1);
        documents.insert(doc, Versioned { version, data });
    }

    #[cfg(test)]
    pub async fn snapshot(&self, doc: &DocumentRef) -> Option<Document> {
        self.inner
            .documents
            .lock()
            .await
            .get(doc)
            .map(|v| v.data.clone())
    }

    #[cfg(test)]
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .documents
            .lock()
            .await
            .keys()
            .filter(|doc| doc.collection == collection)
            .count()
    }

    #[cfg(test)]
    pub async fn list(&self, collection: &str) -> Vec<(DocumentRef, Document)> {
        self.inner
            .documents
            .lock()
            .await
            .iter()
            .filter(|(doc, _)| doc.collection == collection)
            .map(|(doc, v)| (doc.clone(), v.data.clone()))
            .collect()
    }

    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn reject_writes_to(&self, collection: &str) {
        if let Ok(mut rejected) = self.inner.rejected_collections.write() {
            rejected.insert(collection.to_string());
        }
    }

    /// Os próximos `count` commits falham com `Conflict`.
    #[cfg(test)]
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Faz cada commit esperar `delay` antes de aplicar as escritas.
    #[cfg(test)]
    pub fn delay_commits(&self, delay: Duration) {
        self.inner
            .commit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn check_writable(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        let rejected = self
            .inner
            .rejected_collections
            .read()
            .map(|set| set.contains(&doc.collection))
            .unwrap_or(false);

        if rejected {
            return Err(StoreError::Backend(format!("writes to {doc} are rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<(DocumentRef, Document)>, StoreError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        let documents = self.inner.documents.lock().await;
        let found = documents
            .iter()
            .filter(|(doc, _)| doc.collection == collection)
            .find(|(_, v)| v.data.get(field).and_then(Value::as_str) == Some(value))
            .map(|(doc, v)| (doc.clone(), v.data.clone()));

        Ok(found)
    }
}

enum PendingWrite {
    Create(Document),
    Update(Document),
}

struct MemoryTransaction {
    store: MemoryStore,
    // Versão observada de cada documento lido (None = não existia)
    reads: HashMap<DocumentRef, Option<u64>>,
    writes: Vec<(DocumentRef, PendingWrite)>,
}

impl MemoryTransaction {
    /// Aplica as escritas pendentes sobre o estado lido, para que a transação
    /// enxergue o que ela mesma já escreveu.
    fn overlay(&self, doc: &DocumentRef, mut current: Option<Document>) -> Option<Document> {
        for (target, write) in &self.writes {
            if target != doc {
                continue;
            }
            match write {
                PendingWrite::Create(data) => current = Some(data.clone()),
                PendingWrite::Update(fields) => {
                    if let Some(existing) = current.as_mut() {
                        existing.extend(fields.clone());
                    }
                }
            }
        }
        current
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let committed = self.store.inner.documents.lock().await.get(doc).cloned();

        self.reads
            .entry(doc.clone())
            .or_insert_with(|| committed.as_ref().map(|v| v.version));

        Ok(self.overlay(doc, committed.map(|v| v.data)))
    }

    async fn create(&mut self, doc: &DocumentRef, data: Document) -> Result<(), StoreError> {
        self.store.check_writable(doc)?;

        let pending = self.writes.iter().any(|(target, _)| target == doc);
        if pending {
            return Err(StoreError::AlreadyExists(doc.clone()));
        }

        self.writes.push((doc.clone(), PendingWrite::Create(data)));
        Ok(())
    }

    async fn update(&mut self, doc: &DocumentRef, fields: Document) -> Result<(), StoreError> {
        self.store.check_writable(doc)?;
        self.writes.push((doc.clone(), PendingWrite::Update(fields)));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let inner = &self.store.inner;

        if !inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        let injected = inner
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict("injected conflict".to_string()));
        }

        let delay = inner.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut documents = inner.documents.lock().await;

        for (doc, seen) in &self.reads {
            let current = documents.get(doc).map(|v| v.version);
            if current != *seen {
                return Err(StoreError::Conflict(format!("{doc} changed during the transaction")));
            }
        }

        // Valida tudo antes de aplicar qualquer escrita
        let mut staged: HashMap<DocumentRef, Versioned> = HashMap::new();
        for (doc, write) in &self.writes {
            let base = staged.get(doc).or_else(|| documents.get(doc)).cloned();
            let next = match (write, base) {
                (PendingWrite::Create(_), Some(_)) => {
                    return Err(StoreError::AlreadyExists(doc.clone()));
                }
                (PendingWrite::Create(data), None) => Versioned {
                    version: 1,
                    data: data.clone(),
                },
                (PendingWrite::Update(_), None) => return Err(StoreError::NotFound(doc.clone())),
                (PendingWrite::Update(fields), Some(mut existing)) => {
                    existing.data.extend(fields.clone());
                    existing.version += 1;
                    existing
                }
            };
            staged.insert(doc.clone(), next);
        }

        documents.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
