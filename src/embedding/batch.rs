use crate::catalog::ProductRecord;

/// Ordered `(source_text, record)` pairs submitted in one embedding call.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    number: usize,
    capacity: usize,
    items: Vec<(String, ProductRecord)>,
}

impl EmbeddingBatch {
    pub fn new(number: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            number,
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Appends a record. Returns `false` without modifying the batch when
    /// it is already at capacity.
    pub fn push(&mut self, record: ProductRecord) -> bool {
        if self.is_full() {
            return false;
        }
        let text = record.embedding_text();
        self.items.push((text, record));
        true
    }

    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|(text, _)| text.clone()).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.items.iter().map(|(_, record)| record)
    }
}

/// Splits records into consecutive batches of at most `batch_size`,
/// numbered from zero, preserving record order.
pub fn into_batches(records: Vec<ProductRecord>, batch_size: usize) -> Vec<EmbeddingBatch> {
    let mut batches = Vec::new();
    let mut current = EmbeddingBatch::new(0, batch_size);

    for record in records {
        if current.is_full() {
            let next = EmbeddingBatch::new(current.number() + 1, batch_size);
            batches.push(std::mem::replace(&mut current, next));
        }
        current.push(record);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
