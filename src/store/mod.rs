//! Fact store: the blackboard analyzers write and finders read
//!
//! Three layers of facts:
//! - entities (codebase, modules, files, authors) with parent links
//! - signals per entity, last write wins, full write history
//! - typed relations with forward and reverse indexes
//!
//! Bulk analysis results live in typed `Slot`s. `available()` reports which
//! slots are populated; the kernel uses it to skip analyzers and finders
//! whose inputs are missing.

pub mod entities;
pub mod signals;
pub mod slots;

pub use entities::{Entity, EntityId, EntityType, Relation, RelationGraph, RelationType};
pub use signals::{SignalStore, SignalValue, SignalWrite};
pub use slots::{Slot, SlotKind};

use std::collections::{BTreeMap, BTreeSet};

use crate::architecture::Architecture;
use crate::graph::{AuthorDistance, ClonePair, SpectralSummary, StructuralResult};
use crate::models::{parent_dir, FileMetrics, FileSyntax};
use crate::semantics::{FileSemantics, Role};
use crate::signals::{Signal, SignalField};
use crate::temporal::{ChurnSeries, CoChangeMatrix, GitHistory};

#[derive(Debug, Clone)]
pub struct FactStore {
    pub root: String,
    entities: BTreeMap<EntityId, Entity>,
    signals: SignalStore,
    relations: RelationGraph,

    pub file_metrics: Slot<Vec<FileMetrics>>,
    pub file_syntax: Slot<BTreeMap<String, FileSyntax>>,
    pub file_contents: Slot<BTreeMap<String, String>>,
    pub structural: Slot<StructuralResult>,
    pub git_history: Slot<GitHistory>,
    pub churn: Slot<BTreeMap<String, ChurnSeries>>,
    pub cochange: Slot<CoChangeMatrix>,
    pub semantics: Slot<BTreeMap<String, FileSemantics>>,
    pub roles: Slot<BTreeMap<String, Role>>,
    pub spectral: Slot<SpectralSummary>,
    pub clone_pairs: Slot<Vec<ClonePair>>,
    pub author_distances: Slot<Vec<AuthorDistance>>,
    pub architecture: Slot<Architecture>,
    pub signal_field: Slot<SignalField>,
}

impl FactStore {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut entities = BTreeMap::new();
        let codebase = EntityId::codebase(root.clone());
        entities.insert(codebase.clone(), Entity::new(codebase));
        Self {
            root,
            entities,
            signals: SignalStore::default(),
            relations: RelationGraph::default(),
            file_metrics: Slot::new(SlotKind::FileMetrics),
            file_syntax: Slot::new(SlotKind::FileSyntax),
            file_contents: Slot::new(SlotKind::FileContents),
            structural: Slot::new(SlotKind::Structural),
            git_history: Slot::new(SlotKind::GitHistory),
            churn: Slot::new(SlotKind::Churn),
            cochange: Slot::new(SlotKind::Cochange),
            semantics: Slot::new(SlotKind::Semantics),
            roles: Slot::new(SlotKind::Roles),
            spectral: Slot::new(SlotKind::Spectral),
            clone_pairs: Slot::new(SlotKind::ClonePairs),
            author_distances: Slot::new(SlotKind::AuthorDistances),
            architecture: Slot::new(SlotKind::Architecture),
            signal_field: Slot::new(SlotKind::SignalField),
        }
    }

    /// Loads scanner records: fills the input slots and registers a FILE
    /// entity per path under a MODULE entity for its parent directory.
    pub fn ingest_scan(
        &mut self,
        metrics: Vec<FileMetrics>,
        syntax: BTreeMap<String, FileSyntax>,
        contents: BTreeMap<String, String>,
    ) {
        let codebase = self.codebase_id();
        for m in &metrics {
            let module = EntityId::module(parent_dir(&m.path));
            if !self.entities.contains_key(&module) {
                self.add_entity(Entity::new(module.clone()).with_parent(codebase.clone()));
            }
            let file = EntityId::file(m.path.clone());
            self.add_entity(Entity::new(file.clone()).with_parent(module.clone()));
            self.add_relation(Relation::new(file, RelationType::InModule, module.clone()));
        }
        self.file_metrics.set(metrics, "scanner");
        self.file_syntax.set(syntax, "scanner");
        self.file_contents.set(contents, "scanner");
    }

    pub fn codebase_id(&self) -> EntityId {
        EntityId::codebase(self.root.clone())
    }

    // ------------------------------------------------------------------------
    // entities
    // ------------------------------------------------------------------------

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self, kind: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.id.kind == kind)
    }

    /// File paths in sorted order.
    pub fn files(&self) -> Vec<&str> {
        self.entities(EntityType::File).map(|e| e.id.key.as_str()).collect()
    }

    pub fn modules(&self) -> Vec<&str> {
        self.entities(EntityType::Module).map(|e| e.id.key.as_str()).collect()
    }

    /// Scanned paths as an owned set.
    pub fn file_set(&self) -> BTreeSet<String> {
        self.files().into_iter().map(str::to_string).collect()
    }

    // ------------------------------------------------------------------------
    // signals
    // ------------------------------------------------------------------------

    pub fn set_signal(&mut self, entity: EntityId, signal: Signal, value: impl Into<SignalValue>, producer: &str) {
        self.signals.set(entity, signal, value.into(), producer);
    }

    pub fn get_signal(&self, entity: &EntityId, signal: Signal) -> Option<&SignalValue> {
        self.signals.get(entity, signal)
    }

    pub fn has_signal(&self, entity: &EntityId, signal: Signal) -> bool {
        self.signals.contains(entity, signal)
    }

    /// Writes a batch of signals for one entity.
    pub fn write_signals<I>(&mut self, entity: &EntityId, values: I, producer: &str)
    where
        I: IntoIterator<Item = (Signal, SignalValue)>,
    {
        for (signal, value) in values {
            self.signals.set(entity.clone(), signal, value, producer);
        }
    }

    pub fn signal_history(&self, entity: &EntityId, signal: Signal) -> &[SignalWrite] {
        self.signals.history(entity, signal)
    }

    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    // ------------------------------------------------------------------------
    // relations
    // ------------------------------------------------------------------------

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.add(relation);
    }

    pub fn has_relation(&self, source: &EntityId, kind: RelationType, target: &EntityId) -> bool {
        self.relations.contains(source, kind, target)
    }

    pub fn outgoing<'a>(&'a self, entity: &EntityId, kind: Option<RelationType>) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.outgoing(entity, kind)
    }

    pub fn incoming<'a>(&'a self, entity: &EntityId, kind: Option<RelationType>) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.incoming(entity, kind)
    }

    pub fn relations(&self) -> &RelationGraph {
        &self.relations
    }

    // ------------------------------------------------------------------------
    // slots
    // ------------------------------------------------------------------------

    pub fn is_available(&self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::FileMetrics => self.file_metrics.is_available(),
            SlotKind::FileSyntax => self.file_syntax.is_available(),
            SlotKind::FileContents => self.file_contents.is_available(),
            SlotKind::Structural => self.structural.is_available(),
            SlotKind::GitHistory => self.git_history.is_available(),
            SlotKind::Churn => self.churn.is_available(),
            SlotKind::Cochange => self.cochange.is_available(),
            SlotKind::Semantics => self.semantics.is_available(),
            SlotKind::Roles => self.roles.is_available(),
            SlotKind::Spectral => self.spectral.is_available(),
            SlotKind::ClonePairs => self.clone_pairs.is_available(),
            SlotKind::AuthorDistances => self.author_distances.is_available(),
            SlotKind::Architecture => self.architecture.is_available(),
            SlotKind::SignalField => self.signal_field.is_available(),
        }
    }

    /// Marks `kind` as failed, e.g. when a degrading analyzer errors.
    pub fn set_slot_error(&mut self, kind: SlotKind, error: &str, producer: &str) {
        match kind {
            SlotKind::FileMetrics => self.file_metrics.set_error(error, producer),
            SlotKind::FileSyntax => self.file_syntax.set_error(error, producer),
            SlotKind::FileContents => self.file_contents.set_error(error, producer),
            SlotKind::Structural => self.structural.set_error(error, producer),
            SlotKind::GitHistory => self.git_history.set_error(error, producer),
            SlotKind::Churn => self.churn.set_error(error, producer),
            SlotKind::Cochange => self.cochange.set_error(error, producer),
            SlotKind::Semantics => self.semantics.set_error(error, producer),
            SlotKind::Roles => self.roles.set_error(error, producer),
            SlotKind::Spectral => self.spectral.set_error(error, producer),
            SlotKind::ClonePairs => self.clone_pairs.set_error(error, producer),
            SlotKind::AuthorDistances => self.author_distances.set_error(error, producer),
            SlotKind::Architecture => self.architecture.set_error(error, producer),
            SlotKind::SignalField => self.signal_field.set_error(error, producer),
        }
    }

    /// Populated slots.
    pub fn available(&self) -> BTreeSet<SlotKind> {
        SlotKind::ALL.into_iter().filter(|k| self.is_available(*k)).collect()
    }

    /// Roles, or an empty map before role classification ran.
    pub fn roles_or_empty(&self) -> BTreeMap<String, Role> {
        self.roles.get().cloned().unwrap_or_default()
    }
}
