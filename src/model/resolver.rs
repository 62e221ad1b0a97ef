//! Reference resolution
//!
//! Resolves every `source_table` field to its target table and the join-key
//! field in that table, and checks that no chain of sub-table or source-table
//! links is longer than the configured bound. A cycle is an unbounded chain,
//! so it always fails.

use super::schema::{SchemaModel, TableIndex};
use crate::config::ResolverOptions;
use crate::error::{Result, StructureError};
use crate::models::FieldId;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A relation field and where it points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Table owning the relation field
    pub table: TableIndex,
    pub field: FieldId,
    pub field_name: String,
    /// Table named by `source_table`
    pub target: TableIndex,
    /// Field of the target table holding the referenced value: the field with
    /// the same name as the relation field, else the target's first field.
    /// `None` only when the target declares no fields.
    pub join_field: Option<FieldId>,
}

/// Static relation map of a schema
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    relations: Vec<Relation>,
    by_field: HashMap<FieldId, usize>,
    edges: Vec<Vec<TableIndex>>,
    max_depth: usize,
}

impl ReferenceResolver {
    pub(crate) fn new(model: &SchemaModel, options: ResolverOptions) -> Result<Self> {
        let mut relations = Vec::new();
        let mut by_field = HashMap::new();
        let mut edges: Vec<Vec<TableIndex>> = vec![Vec::new(); model.table_count()];

        for table in model.tables() {
            let adjacency = &mut edges[table.index().0];
            for &sub in table.sub_table_indices() {
                if !adjacency.contains(&sub) {
                    adjacency.push(sub);
                }
            }

            for field in table.fields() {
                let Some(source) = field.source_table.as_deref() else { continue };
                let target = model
                    .table_named(source)
                    .ok_or_else(|| StructureError::UnknownTable(source.to_string()))?;
                let join_field = target
                    .field(&field.name)
                    .or_else(|| target.fields().first())
                    .map(|f| f.id);

                by_field.insert(field.id, relations.len());
                relations.push(Relation {
                    table: table.index(),
                    field: field.id,
                    field_name: field.name.clone(),
                    target: target.index(),
                    join_field,
                });
                if !adjacency.contains(&target.index()) {
                    adjacency.push(target.index());
                }
            }
        }

        let max_depth = options.effective_depth(model.table_count());
        DepthCheck::new(model, &edges, max_depth).run()?;
        debug!(
            "Resolved {} relations, longest chain bounded by {}",
            relations.len(),
            max_depth
        );

        Ok(Self {
            relations,
            by_field,
            edges,
            max_depth,
        })
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// The relation carried by a field, if it has a `source_table`.
    pub fn relation(&self, field: FieldId) -> Option<&Relation> {
        self.by_field.get(&field).and_then(|&i| self.relations.get(i))
    }

    /// Relations declared on a table.
    pub fn relations_from(&self, table: TableIndex) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.table == table)
    }

    /// Relations pointing at a table.
    pub fn referencing(&self, target: TableIndex) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.target == target)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Tables reachable from `from` through sub-table and source-table links,
    /// nearest first, excluding `from` itself.
    pub fn reachable(&self, from: TableIndex) -> Vec<TableIndex> {
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        let mut order = Vec::new();
        while let Some(node) = queue.pop_front() {
            for &next in self.edges.get(node.0).map(Vec::as_slice).unwrap_or_default() {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
        order
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Longest-chain computation over the link graph, memoized per table.
struct DepthCheck<'a> {
    model: &'a SchemaModel,
    edges: &'a [Vec<TableIndex>],
    max_depth: usize,
    state: Vec<Visit>,
    height: Vec<usize>,
    longest_next: Vec<Option<TableIndex>>,
    stack: Vec<TableIndex>,
}

impl<'a> DepthCheck<'a> {
    fn new(model: &'a SchemaModel, edges: &'a [Vec<TableIndex>], max_depth: usize) -> Self {
        let n = edges.len();
        Self {
            model,
            edges,
            max_depth,
            state: vec![Visit::New; n],
            height: vec![0; n],
            longest_next: vec![None; n],
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Result<()> {
        for i in 0..self.edges.len() {
            self.visit(TableIndex(i))?;
        }
        Ok(())
    }

    fn visit(&mut self, node: TableIndex) -> Result<usize> {
        match self.state[node.0] {
            Visit::Done => return Ok(self.height[node.0]),
            Visit::Active => return Err(self.cycle_error(node)),
            Visit::New => {}
        }
        self.state[node.0] = Visit::Active;
        self.stack.push(node);

        let edges = self.edges;
        for &next in &edges[node.0] {
            let below = self.visit(next)? + 1;
            if below > self.height[node.0] {
                self.height[node.0] = below;
                self.longest_next[node.0] = Some(next);
            }
        }

        self.stack.pop();
        self.state[node.0] = Visit::Done;
        if self.height[node.0] > self.max_depth {
            return Err(self.depth_error(node));
        }
        Ok(self.height[node.0])
    }

    fn name(&self, index: TableIndex) -> String {
        self.model
            .table_at(index)
            .map(|t| t.qualified_name())
            .unwrap_or_else(|| format!("#{}", index.0))
    }

    fn cycle_error(&self, node: TableIndex) -> StructureError {
        let start = self.stack.iter().position(|&i| i == node).unwrap_or(0);
        let mut path: Vec<String> = self.stack[start..].iter().map(|&i| self.name(i)).collect();
        path.push(self.name(node));
        StructureError::CyclicReference { path }
    }

    fn depth_error(&self, node: TableIndex) -> StructureError {
        let mut path = vec![self.name(node)];
        let mut current = node;
        while let Some(next) = self.longest_next[current.0] {
            path.push(self.name(next));
            current = next;
        }
        StructureError::CyclicReference { path }
    }
}
