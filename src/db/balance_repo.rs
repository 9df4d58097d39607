// src/db/balance_repo.rs

use crate::{
    db::store::{
        from_document, to_document, CollectionRef, DocumentRef, DocumentStore, StoreError,
        StoreTransaction,
    },
    models::balance::{balance_document_id, BalanceDocument, BalanceIncrement, BALANCES_COLLECTION},
};

// O repositório de saldos, responsável pela coleção 'balances'
#[derive(Clone)]
pub struct BalanceRepository {
    collection: CollectionRef,
}

impl BalanceRepository {
    pub fn new(store: &dyn DocumentStore) -> Self {
        Self {
            collection: store.collection(BALANCES_COLLECTION),
        }
    }

    pub fn doc_ref(&self, user_id: &str, name: &str) -> DocumentRef {
        self.collection.doc(balance_document_id(user_id, name))
    }

    // Leitura dentro da transação: registra o documento para detecção de conflito
    pub async fn find(
        &self,
        tx: &mut dyn StoreTransaction,
        doc: &DocumentRef,
    ) -> Result<Option<BalanceDocument>, StoreError> {
        tx.get(doc).await?.map(from_document).transpose()
    }

    pub async fn create(
        &self,
        tx: &mut dyn StoreTransaction,
        doc: &DocumentRef,
        balance: &BalanceDocument,
    ) -> Result<(), StoreError> {
        tx.create(doc, to_document(balance)?).await
    }

    pub async fn increment(
        &self,
        tx: &mut dyn StoreTransaction,
        doc: &DocumentRef,
        change: &BalanceIncrement,
    ) -> Result<(), StoreError> {
        tx.update(doc, to_document(change)?).await
    }
}
