//! Dependency resolution: requested ids to a deterministic execution order.
//!
//! Pure functions over the [`Catalog`]; nothing here executes anything, so
//! `plan` can call it on its own.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, SoftwareId};
use crate::error::ResolutionError;

/// Resolve `requested` into an install order.
///
/// Expands the transitive dependency closure, then orders it with Kahn's
/// algorithm. Among simultaneously ready ids the lexically smallest goes
/// first, so the result depends only on the catalog and the requested set.
///
/// # Errors
///
/// - [`ResolutionError::MissingDependency`] for a requested id or a
///   dependency not in the catalog (`required_by` is `None` for the former)
/// - [`ResolutionError::DependencyCycle`] naming one concrete cycle
pub fn resolve(
    catalog: &Catalog,
    requested: &[SoftwareId],
) -> Result<Vec<SoftwareId>, ResolutionError> {
    let closure = closure(catalog, requested)?;
    topological_order(catalog, &closure)
}

/// Resolve `requested` into an uninstall order.
///
/// Prerequisites are never pulled in: removing a tool leaves what it depends
/// on alone. The requested ids are ordered so that dependents come before
/// their dependencies.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_removal(
    catalog: &Catalog,
    requested: &[SoftwareId],
) -> Result<Vec<SoftwareId>, ResolutionError> {
    let nodes = validated(catalog, requested)?;
    for id in &nodes {
        check_dependencies(catalog, id)?;
    }
    let mut order = topological_order(catalog, &nodes)?;
    order.reverse();
    Ok(order)
}

/// Requested ids as a set, each confirmed to exist.
fn validated(
    catalog: &Catalog,
    requested: &[SoftwareId],
) -> Result<BTreeSet<SoftwareId>, ResolutionError> {
    let set: BTreeSet<SoftwareId> = requested.iter().cloned().collect();
    if let Some(unknown) = set.iter().find(|id| !catalog.contains(id)) {
        return Err(ResolutionError::unknown(unknown.clone()));
    }
    Ok(set)
}

fn check_dependencies(catalog: &Catalog, id: &SoftwareId) -> Result<(), ResolutionError> {
    let Some(software) = catalog.get(id) else {
        return Err(ResolutionError::unknown(id.clone()));
    };
    match software.dependencies.iter().find(|d| !catalog.contains(d)) {
        Some(missing) => Err(ResolutionError::MissingDependency {
            id: missing.clone(),
            required_by: Some(id.clone()),
        }),
        None => Ok(()),
    }
}

/// Transitive dependency closure of `requested`.
fn closure(
    catalog: &Catalog,
    requested: &[SoftwareId],
) -> Result<BTreeSet<SoftwareId>, ResolutionError> {
    let mut seen = validated(catalog, requested)?;
    let mut stack: Vec<SoftwareId> = seen.iter().cloned().collect();
    while let Some(id) = stack.pop() {
        check_dependencies(catalog, &id)?;
        let deps = catalog.get(&id).map(|s| s.dependencies.as_slice()).unwrap_or_default();
        for dep in deps {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    Ok(seen)
}

/// Dependencies of `id` that are inside `nodes`, deduplicated.
fn deps_within<'a>(
    catalog: &'a Catalog,
    nodes: &BTreeSet<SoftwareId>,
    id: &SoftwareId,
) -> BTreeSet<&'a SoftwareId> {
    catalog
        .get(id)
        .map(|s| s.dependencies.iter().filter(|d| nodes.contains(*d)).collect())
        .unwrap_or_default()
}

/// Kahn's algorithm over `nodes` with a lexically ordered ready set.
fn topological_order(
    catalog: &Catalog,
    nodes: &BTreeSet<SoftwareId>,
) -> Result<Vec<SoftwareId>, ResolutionError> {
    let mut in_degree: BTreeMap<&SoftwareId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&SoftwareId, Vec<&SoftwareId>> = BTreeMap::new();
    for id in nodes {
        let deps = deps_within(catalog, nodes, id);
        in_degree.insert(id, deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(id);
        }
    }

    let mut ready: BTreeSet<&SoftwareId> = in_degree
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next.clone());
        for dependent in dependents.get(next).into_iter().flatten() {
            if let Some(n) = in_degree.get_mut(dependent) {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let leftover: BTreeSet<&SoftwareId> = in_degree
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(id, _)| id)
            .collect();
        return Err(ResolutionError::DependencyCycle(find_cycle(
            catalog, nodes, &leftover,
        )));
    }
    Ok(order)
}

/// Walk the leftover nodes to one concrete cycle.
///
/// Every leftover node still has an unprocessed dependency, itself leftover,
/// so following the smallest such dependency from any start must revisit a
/// node. The members from the first visit onwards form the cycle.
fn find_cycle(
    catalog: &Catalog,
    nodes: &BTreeSet<SoftwareId>,
    leftover: &BTreeSet<&SoftwareId>,
) -> Vec<SoftwareId> {
    let Some(mut current) = leftover.first().copied() else {
        return Vec::new();
    };
    let mut path: Vec<&SoftwareId> = Vec::new();
    loop {
        if let Some(pos) = path.iter().position(|id| *id == current) {
            return path.split_off(pos).into_iter().cloned().collect();
        }
        path.push(current);
        let next = deps_within(catalog, nodes, current)
            .into_iter()
            .find(|d| leftover.contains(d));
        match next {
            Some(dep) => current = dep,
            None => return path.into_iter().cloned().collect(),
        }
    }
}
