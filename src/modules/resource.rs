//! Resource module
//!
//! API resources form a path tree; the provider only lists them flat and
//! only creates one node per call. Lookup flattens the listing into a
//! path map; creation walks up to the deepest existing ancestor and then
//! creates the missing segments one by one, chaining each new id as the
//! next parent.

use super::{ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Listing page size; the tree is fetched in one call.
const RESOURCE_LIMIT: u32 = 500;

#[derive(Debug, Clone, clap::Args)]
pub struct ResourceParams {
    /// Identifier of the REST API owning the resource tree
    #[arg(long)]
    pub rest_api_id: String,

    /// Full resource path, starting with `/`
    #[arg(long)]
    pub name: String,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Flatten a `get_resources` listing into a path-indexed map.
pub fn build_path_map(listing: &Value) -> HashMap<String, Value> {
    listing
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            item.get("path")
                .and_then(Value::as_str)
                .map(|path| (path.to_string(), item.clone()))
        })
        .collect()
}

/// The creates needed to materialize `path`: the id of the deepest
/// existing ancestor, and the missing segments in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlan {
    pub parent_id: String,
    pub path_parts: Vec<String>,
}

pub fn plan_creates(map: &HashMap<String, Value>, path: &str) -> Result<CreatePlan> {
    if !path.starts_with('/') {
        bail!("resource path must start with '/': {path}");
    }

    let mut missing = Vec::new();
    let mut current = path.to_string();
    loop {
        if let Some(entry) = map.get(&current) {
            let parent_id = entry
                .get("id")
                .and_then(Value::as_str)
                .with_context(|| format!("resource '{current}' has no id"))?
                .to_string();
            missing.reverse();
            return Ok(CreatePlan {
                parent_id,
                path_parts: missing,
            });
        }

        match current.rfind('/') {
            Some(0) if current.len() > 1 => {
                missing.push(current[1..].to_string());
                current.truncate(1);
            }
            Some(idx) if idx > 0 => {
                missing.push(current[idx + 1..].to_string());
                current.truncate(idx);
            }
            // The root is always present in a real listing.
            _ => bail!("resource tree has no root entry"),
        }
    }
}

pub struct ResourcePathModule<'a> {
    params: &'a ResourceParams,
    path_map: Mutex<HashMap<String, Value>>,
}

impl<'a> ResourcePathModule<'a> {
    pub fn new(params: &'a ResourceParams) -> Self {
        Self {
            params,
            path_map: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ResourceModule for ResourcePathModule<'_> {
    fn kind(&self) -> &'static str {
        "resource"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw
            .get_resources(&self.params.rest_api_id, RESOURCE_LIMIT)
            .await
            .context("get_resources failed")?;
        let map = build_path_map(&listing);
        let found = map.get(&self.params.name).cloned();
        *self.path_map.lock().unwrap() = map;
        Ok(found)
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        let plan = {
            let map = self.path_map.lock().unwrap();
            plan_creates(&map, &self.params.name)?
        };

        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        let mut parent_id = plan.parent_id;
        let mut created = Value::Null;
        for part in &plan.path_parts {
            created = gw
                .create_resource(&self.params.rest_api_id, &parent_id, part)
                .await
                .with_context(|| format!("create_resource failed for segment '{part}'"))?;
            parent_id = created
                .get("id")
                .and_then(Value::as_str)
                .with_context(|| format!("created resource '{part}' has no id"))?
                .to_string();
        }

        Ok(ReconcileOutcome::changed(Some(created)))
    }

    async fn update(
        &self,
        _gw: &dyn Gateway,
        observed: Value,
        _check_mode: bool,
    ) -> Result<ReconcileOutcome> {
        // Resources have no mutable attributes.
        Ok(ReconcileOutcome::unchanged(Some(observed)))
    }

    async fn delete(&self, gw: &dyn Gateway, observed: &Value) -> Result<()> {
        let id = super::observed_str(observed, "id")?;
        gw.delete_resource(&self.params.rest_api_id, id)
            .await
            .context("delete_resource failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::modules::reconcile;
    use serde_json::json;

    fn params(name: &str) -> ResourceParams {
        ResourceParams {
            rest_api_id: "rest_id".into(),
            name: name.into(),
            state: TargetState::Present,
        }
    }

    fn listing() -> Value {
        json!({"items": [
            {"id": "root", "path": "/"},
            {"id": "abc123", "path": "/base", "parentId": "root"},
        ]})
    }

    #[test]
    fn path_map_is_indexed_by_path() {
        let map = build_path_map(&listing());
        assert_eq!(map["/"]["id"], "root");
        assert_eq!(map["/base"]["parentId"], "root");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn plan_stops_at_deepest_existing_ancestor() {
        let map = build_path_map(&listing());

        let plan = plan_creates(&map, "/base/sub").unwrap();
        assert_eq!(plan.parent_id, "abc123");
        assert_eq!(plan.path_parts, vec!["sub"]);

        let plan = plan_creates(&map, "/base/sub/deep").unwrap();
        assert_eq!(plan.parent_id, "abc123");
        assert_eq!(plan.path_parts, vec!["sub", "deep"]);

        let plan = plan_creates(&map, "/other").unwrap();
        assert_eq!(plan.parent_id, "root");
        assert_eq!(plan.path_parts, vec!["other"]);
    }

    #[test]
    fn plan_rejects_relative_paths() {
        let map = build_path_map(&listing());
        assert!(plan_creates(&map, "base/sub").is_err());
    }

    #[tokio::test]
    async fn existing_path_is_a_no_op() {
        let gw = MockGateway::new().returning("get_resources", listing());

        let p = params("/base");
        let outcome = reconcile(&ResourcePathModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.object.unwrap()["id"], "abc123");
        assert!(gw.calls_for("create_resource").is_empty());
    }

    #[tokio::test]
    async fn missing_segments_are_created_in_order() {
        let gw = MockGateway::new()
            .returning("get_resources", listing())
            .returning(
                "create_resource",
                json!({"id": "sub_id", "path": "/base/sub"}),
            )
            .returning(
                "create_resource",
                json!({"id": "deep_id", "path": "/base/sub/deep"}),
            );

        let p = params("/base/sub/deep");
        let outcome = reconcile(&ResourcePathModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        // Only the final node is reported.
        assert_eq!(outcome.object.unwrap()["id"], "deep_id");
        assert_eq!(
            gw.calls_for("create_resource"),
            vec![
                json!({"restApiId": "rest_id", "parentId": "abc123", "pathPart": "sub"}),
                json!({"restApiId": "rest_id", "parentId": "sub_id", "pathPart": "deep"}),
            ]
        );
    }

    #[tokio::test]
    async fn check_mode_creates_nothing() {
        let gw = MockGateway::new().returning("get_resources", listing());

        let p = params("/base/sub");
        let outcome = reconcile(&ResourcePathModule::new(&p), &gw, true)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert!(outcome.object.is_none());
        assert!(gw.calls_for("create_resource").is_empty());
    }

    #[tokio::test]
    async fn absent_resource_is_deleted_by_id() {
        let gw = MockGateway::new().returning("get_resources", listing());

        let p = ResourceParams {
            state: TargetState::Absent,
            ..params("/base")
        };
        let outcome = reconcile(&ResourcePathModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("delete_resource"),
            vec![json!({"restApiId": "rest_id", "resourceId": "abc123"})]
        );
    }

    #[tokio::test]
    async fn absent_and_missing_is_a_no_op() {
        let gw = MockGateway::new().returning("get_resources", listing());

        let p = ResourceParams {
            state: TargetState::Absent,
            ..params("/ghost")
        };
        let outcome = reconcile(&ResourcePathModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert!(gw.calls_for("delete_resource").is_empty());
    }
}
