use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::{OrderableResource, ResourceError};

/// Ids created by a batch request, in request order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResourcesResult {
    pub ids: Vec<String>,
}

/// Put siblings in list order by following their `next` ids from the single head.
///
/// Fails when the siblings do not form exactly one chain: no head or several heads,
/// a `next` id naming something outside the set, a cycle, or unreached resources.
pub fn sort_resources<R: OrderableResource>(resources: Vec<R>) -> Result<Vec<R>, ResourceError> {
    if resources.is_empty() {
        return Ok(resources);
    }

    let ids: HashSet<&str> = resources.iter().map(|r| r.id()).collect();
    if ids.len() != resources.len() {
        return Err(ResourceError::InvalidOrdering("duplicate ids".to_string()));
    }

    let mut referenced = HashSet::new();
    for resource in &resources {
        if let Some(next) = resource.next_id() {
            if !ids.contains(next) {
                return Err(ResourceError::InvalidOrdering(format!(
                    "{} {} points at unknown {}",
                    R::TYPE,
                    resource.id(),
                    next
                )));
            }
            if !referenced.insert(next) {
                return Err(ResourceError::InvalidOrdering(format!(
                    "{} {} is the next of more than one {}",
                    R::TYPE,
                    next,
                    R::TYPE
                )));
            }
        }
    }

    let heads: Vec<&str> = resources
        .iter()
        .map(|r| r.id())
        .filter(|id| !referenced.contains(id))
        .collect();
    let head = match heads.as_slice() {
        [head] => head.to_string(),
        [] => return Err(ResourceError::InvalidOrdering("no first resource (cycle)".to_string())),
        _ => {
            return Err(ResourceError::InvalidOrdering(format!(
                "{} resources claim to be first",
                heads.len()
            )))
        }
    };

    let total = resources.len();
    let mut by_id: HashMap<String, R> = resources
        .into_iter()
        .map(|r| (r.id().to_string(), r))
        .collect();

    let mut ordered = Vec::with_capacity(total);
    let mut current = Some(head);
    while let Some(id) = current {
        // A revisit means a cycle; its members were already taken out of the map
        let resource = by_id
            .remove(&id)
            .ok_or_else(|| ResourceError::InvalidOrdering(format!("cycle at {}", id)))?;
        current = resource.next_id().map(str::to_string);
        ordered.push(resource);
    }

    if ordered.len() != total {
        return Err(ResourceError::InvalidOrdering(format!(
            "{} resources are not reachable from the first",
            total - ordered.len()
        )));
    }
    Ok(ordered)
}

/// Rewrite `next` ids so the list order matches slice order; the last one points nowhere
pub fn link_in_order<R: OrderableResource>(resources: &mut [R]) {
    let next_ids: Vec<Option<String>> = resources
        .iter()
        .skip(1)
        .map(|r| Some(r.id().to_string()))
        .chain(std::iter::once(None))
        .collect();

    for (resource, next_id) in resources.iter_mut().zip(next_ids) {
        resource.set_next_id(next_id);
    }
}

/// Repoint whichever sibling's `next` id is `from` at `to`, returning it for saving.
/// With `from` of `None` that sibling is the tail.
pub fn relink<R: OrderableResource>(siblings: Vec<R>, from: Option<&str>, to: Option<&str>) -> Option<R> {
    siblings
        .into_iter()
        .find(|s| s.next_id() == from)
        .map(|mut sibling| {
            sibling.set_next_id(to.map(str::to_string));
            sibling
        })
}

/// Sibling to repoint so that `resource` joins the list just before its `next` id,
/// or at the end when it has none
pub fn link_into<R: OrderableResource>(siblings: Vec<R>, resource: &R) -> Result<Option<R>, ResourceError> {
    let siblings: Vec<R> = siblings.into_iter().filter(|s| s.id() != resource.id()).collect();
    if let Some(next) = resource.next_id() {
        if !siblings.iter().any(|s| s.id() == next) {
            return Err(ResourceError::InvalidOrdering(format!(
                "next {} {} is not a sibling of {}",
                R::TYPE,
                next,
                resource.id()
            )));
        }
    }
    Ok(relink(siblings, resource.next_id(), Some(resource.id())))
}

/// Sibling to repoint so that the list skips over `resource`
pub fn unlink_from<R: OrderableResource>(siblings: Vec<R>, resource: &R) -> Option<R> {
    let siblings: Vec<R> = siblings.into_iter().filter(|s| s.id() != resource.id()).collect();
    relink(siblings, Some(resource.id()), resource.next_id())
}
