// Copyright 2025 Cowboy AI, LLC.

//! Graph storage: repository abstraction, in-memory backend, transactions

mod graph;
mod memory;
mod transaction;

pub use graph::{
    props, Direction, EntityRecord, GraphRepository, Neighbor, PropMap, RelationRecord,
};
pub use memory::InMemoryGraphRepository;
pub use transaction::{
    ChangeRecord, OperationType, Transaction, TransactionManager, TransactionState,
    TransactionStats, TransactionSummary,
};
