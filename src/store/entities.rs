use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Codebase,
    Module,
    File,
    Symbol,
    Author,
    Commit,
}

/// Unique identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityType,
    pub key: String,
}

impl EntityId {
    pub fn new(kind: EntityType, key: impl Into<String>) -> Self {
        Self { kind, key: key.into() }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(EntityType::File, path)
    }

    pub fn module(path: impl Into<String>) -> Self {
        Self::new(EntityType::Module, path)
    }

    pub fn codebase(root: impl Into<String>) -> Self {
        Self::new(EntityType::Codebase, root)
    }

    pub fn author(name: impl Into<String>) -> Self {
        Self::new(EntityType::Author, name)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub metadata: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            parent: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Imports,
    Calls,
    CochangesWith,
    SimilarTo,
    AuthoredBy,
    InModule,
    Contains,
    DependsOn,
    ClonedFrom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: EntityId,
    pub kind: RelationType,
    pub target: EntityId,
    pub weight: f64,
    pub metadata: BTreeMap<String, String>,
}

impl Relation {
    pub fn new(source: EntityId, kind: RelationType, target: EntityId) -> Self {
        Self {
            source,
            kind,
            target,
            weight: 1.0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Typed edges with forward and reverse indexes.
///
/// Relations live in one vector; both indexes hold positions into it, so
/// every forward entry has exactly one reverse entry.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    relations: Vec<Relation>,
    forward: BTreeMap<EntityId, Vec<usize>>,
    reverse: BTreeMap<EntityId, Vec<usize>>,
    keys: BTreeSet<(EntityId, RelationType, EntityId)>,
}

impl RelationGraph {
    /// Adds `relation`. A repeated `(source, type, target)` replaces the
    /// weight and metadata of the existing edge.
    pub fn add(&mut self, relation: Relation) {
        let key = (relation.source.clone(), relation.kind, relation.target.clone());
        if self.keys.contains(&key) {
            if let Some(existing) = self
                .forward
                .get(&relation.source)
                .into_iter()
                .flatten()
                .copied()
                .find(|&i| self.relations[i].kind == relation.kind && self.relations[i].target == relation.target)
            {
                self.relations[existing] = relation;
            }
            return;
        }
        let idx = self.relations.len();
        self.forward.entry(relation.source.clone()).or_default().push(idx);
        self.reverse.entry(relation.target.clone()).or_default().push(idx);
        self.keys.insert(key);
        self.relations.push(relation);
    }

    pub fn contains(&self, source: &EntityId, kind: RelationType, target: &EntityId) -> bool {
        self.keys.contains(&(source.clone(), kind, target.clone()))
    }

    pub fn outgoing<'a>(&'a self, entity: &EntityId, kind: Option<RelationType>) -> impl Iterator<Item = &'a Relation> + 'a {
        self.select(self.forward.get(entity), kind)
    }

    pub fn incoming<'a>(&'a self, entity: &EntityId, kind: Option<RelationType>) -> impl Iterator<Item = &'a Relation> + 'a {
        self.select(self.reverse.get(entity), kind)
    }

    fn select<'a>(&'a self, idx: Option<&'a Vec<usize>>, kind: Option<RelationType>) -> impl Iterator<Item = &'a Relation> + 'a {
        idx.into_iter()
            .flatten()
            .map(|&i| &self.relations[i])
            .filter(move |r| kind.is_none_or(|k| r.kind == k))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }
}
