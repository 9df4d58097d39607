// src/db/expense_repo.rs

use crate::{
    db::store::{to_document, CollectionRef, DocumentRef, DocumentStore, StoreError, StoreTransaction},
    models::expense::{ExpenseDocument, EXPENSES_COLLECTION},
};

// O repositório de despesas, responsável pela coleção 'expenses'
#[derive(Clone)]
pub struct ExpenseRepository {
    collection: CollectionRef,
}

impl ExpenseRepository {
    pub fn new(store: &dyn DocumentStore) -> Self {
        Self {
            collection: store.collection(EXPENSES_COLLECTION),
        }
    }

    // Referência com id novo; o documento só passa a existir no commit
    pub fn allocate(&self) -> DocumentRef {
        self.collection.new_doc()
    }

    pub async fn create(
        &self,
        tx: &mut dyn StoreTransaction,
        doc: &DocumentRef,
        expense: &ExpenseDocument,
    ) -> Result<(), StoreError> {
        tx.create(doc, to_document(expense)?).await
    }
}
