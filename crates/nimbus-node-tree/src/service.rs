use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use nimbus_types::{CoreError, CoreResult, Hash, NodeId, Principal, SharedStore, Serial, Timestamp};
use tracing::debug;

use crate::config::{NodeTreeConfig, LISTING_MAX_LIMIT};
use crate::entities::{Attributes, Cluster, Node, Statistics, Version};
use crate::listing::{ListedObject, ListingParams, ListingResult};
use crate::locks::StripedLocks;
use crate::ports::NodeTreeApi;

fn node_path_key(path: &str) -> Vec<u8> {
    format!("node:path:{path}").into_bytes()
}

fn node_id_key(id: NodeId) -> Vec<u8> {
    format!("node:id:{id:020}").into_bytes()
}

fn version_key(node: NodeId, serial: Serial) -> Vec<u8> {
    format!("version:{node:020}:{serial:020}").into_bytes()
}

fn version_prefix(node: NodeId) -> Vec<u8> {
    format!("version:{node:020}:").into_bytes()
}

fn version_serial_index_key(serial: Serial) -> Vec<u8> {
    format!("version_serial:{serial:020}").into_bytes()
}

fn attr_key(node: NodeId, serial: Serial) -> Vec<u8> {
    format!("attr:{node:020}:{serial:020}").into_bytes()
}

fn stats_key(node: NodeId) -> Vec<u8> {
    format!("stats:{node:020}").into_bytes()
}

enum Entry {
    Object(ListedObject),
    Subdir(String),
}

fn entry_path(entry: &Entry) -> &str {
    match entry {
        Entry::Object(o) => &o.path,
        Entry::Subdir(p) => p,
    }
}

pub struct NodeTreeService {
    store: SharedStore,
    config: NodeTreeConfig,
    locks: StripedLocks,
    next_node_id: AtomicU64,
    next_serial: AtomicU64,
}

impl NodeTreeService {
    pub fn new(store: SharedStore, config: NodeTreeConfig) -> Self {
        let next_node_id = Self::scan_max_node_id(&store) + 1;
        let next_serial = Self::scan_max_serial(&store) + 1;
        Self {
            store,
            config,
            locks: StripedLocks::default(),
            next_node_id: AtomicU64::new(next_node_id),
            next_serial: AtomicU64::new(next_serial),
        }
    }

    fn scan_max_node_id(store: &SharedStore) -> u64 {
        store
            .prefix_scan(b"node:id:")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, _)| {
                std::str::from_utf8(&k)
                    .ok()?
                    .strip_prefix("node:id:")?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .unwrap_or(0)
    }

    fn scan_max_serial(store: &SharedStore) -> u64 {
        store
            .prefix_scan(b"version_serial:")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, _)| {
                std::str::from_utf8(&k)
                    .ok()?
                    .strip_prefix("version_serial:")?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .unwrap_or(0)
    }

    fn load_node(&self, id: NodeId) -> CoreResult<Node> {
        let bytes = self
            .store
            .get(&node_id_key(id))
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound(format!("node {id}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::InternalError(format!("node deserialization: {e}")))
    }

    fn save_node(&self, node: &Node) -> CoreResult<()> {
        let bytes = serde_json::to_vec(node)
            .map_err(|e| CoreError::InternalError(format!("node serialization: {e}")))?;
        self.store
            .put(&node_id_key(node.id), &bytes)
            .map_err(CoreError::from)?;
        self.store
            .put(&node_path_key(&node.path), &node.id.to_le_bytes())
            .map_err(CoreError::from)
    }

    fn load_version(&self, node: NodeId, serial: Serial) -> CoreResult<Version> {
        let bytes = self
            .store
            .get(&version_key(node, serial))
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::VersionNotExists { serial, node })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::InternalError(format!("version deserialization: {e}")))
    }

    fn save_version(&self, version: &Version) -> CoreResult<()> {
        let bytes = serde_json::to_vec(version)
            .map_err(|e| CoreError::InternalError(format!("version serialization: {e}")))?;
        self.store
            .put(&version_key(version.node, version.serial), &bytes)
            .map_err(CoreError::from)?;
        self.store
            .put(&version_serial_index_key(version.serial), &version.node.to_le_bytes())
            .map_err(CoreError::from)
    }

    fn all_versions(&self, node: NodeId) -> CoreResult<Vec<Version>> {
        self.store
            .prefix_scan(&version_prefix(node))
            .map_err(CoreError::from)?
            .into_iter()
            .map(|(_, v)| {
                serde_json::from_slice(&v)
                    .map_err(|e| CoreError::InternalError(format!("version deserialization: {e}")))
            })
            .collect()
    }

    fn latest_in_cluster_set(
        &self,
        node: NodeId,
        clusters: &[Cluster],
        before: Timestamp,
    ) -> CoreResult<Option<Version>> {
        let mut best: Option<Version> = None;
        for v in self.all_versions(node)? {
            if !clusters.contains(&v.cluster) || v.mtime > before {
                continue;
            }
            let better = match &best {
                None => true,
                Some(b) => (v.mtime, v.serial) > (b.mtime, b.serial),
            };
            if better {
                best = Some(v);
            }
        }
        Ok(best)
    }

    fn ancestors(&self, node: &Node, depth: u32) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = node.parent;
        for _ in 0..depth {
            match current {
                Some(id) => {
                    out.push(id);
                    current = self.load_node(id).ok().and_then(|n| n.parent);
                }
                None => break,
            }
        }
        out
    }

    fn propagate_statistics(&self, node: &Node, count_delta: i64, bytes_delta: i64, at: Timestamp) -> CoreResult<()> {
        for ancestor in self.ancestors(node, self.config.update_statistics_ancestors_depth) {
            let mut stats = self.statistics_get(ancestor)?;
            stats.apply_delta(count_delta, bytes_delta, at);
            let bytes = serde_json::to_vec(&stats)
                .map_err(|e| CoreError::InternalError(format!("statistics serialization: {e}")))?;
            self.store.put(&stats_key(ancestor), &bytes).map_err(CoreError::from)?;
        }
        Ok(())
    }
}

impl NodeTreeApi for NodeTreeService {
    fn node_lookup(&self, path: &str) -> CoreResult<Option<Node>> {
        match self.store.get(&node_path_key(path)).map_err(CoreError::from)? {
            None => Ok(None),
            Some(bytes) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                let id = u64::from_le_bytes(arr);
                Ok(Some(self.load_node(id)?))
            }
        }
    }

    fn node_lookup_for_update(&self, path: &str) -> CoreResult<(Option<Node>, crate::NodeLockGuard<'_>)> {
        let guard = self.locks.lock_for(path);
        let node = self.node_lookup(path)?;
        Ok((node, guard))
    }

    fn node_create(&self, parent: Option<NodeId>, path: &str) -> CoreResult<Node> {
        let _guard = self.locks.lock_for(path);
        if self.node_lookup(path)?.is_some() {
            return Err(CoreError::Conflict(format!("node already exists at {path}")));
        }
        let id = self.next_node_id.fetch_add(1, Ordering::SeqCst);
        let node = Node {
            id,
            parent,
            path: path.to_string(),
        };
        self.save_node(&node)?;
        debug!(path, id, "node created");
        Ok(node)
    }

    fn node_remove(&self, node: NodeId) -> CoreResult<()> {
        let n = self.load_node(node)?;
        let _guard = self.locks.lock_for(&n.path);
        let descendant_prefix = format!("{}/", n.path);
        if !self
            .store
            .prefix_scan(node_path_key(&descendant_prefix).as_slice())
            .map_err(CoreError::from)?
            .is_empty()
        {
            return Err(CoreError::Conflict("node has descendants".into()));
        }
        if self
            .all_versions(node)?
            .iter()
            .any(|v| v.cluster != Cluster::Deleted)
        {
            return Err(CoreError::Conflict("node has live versions".into()));
        }
        self.store.delete(&node_id_key(node)).map_err(CoreError::from)?;
        self.store.delete(&node_path_key(&n.path)).map_err(CoreError::from)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn version_create(
        &self,
        node: NodeId,
        hash: Option<Hash>,
        size: u64,
        content_type: &str,
        source_version: Option<Serial>,
        modified_by: &Principal,
        uuid: Option<String>,
        checksum: &str,
        cluster: Cluster,
        at: Timestamp,
        available: bool,
        net_superseded: bool,
    ) -> CoreResult<(Serial, Timestamp)> {
        let n = self.load_node(node)?;
        let _guard = self.locks.lock_for(&n.path);

        let previous_normal = self.latest_in_cluster_set(node, &[Cluster::Normal], Timestamp::MAX)?;
        let mut count_delta: i64 = 0;
        let mut bytes_delta: i64 = size as i64;

        if let Some(mut prev) = previous_normal.clone() {
            if cluster == Cluster::Normal || cluster == Cluster::Deleted {
                if net_superseded {
                    bytes_delta -= prev.size as i64;
                }
                prev.cluster = Cluster::History;
                self.save_version(&prev)?;
                self.attribute_del(node, prev.serial, "system", "is_latest")?;
                if cluster == Cluster::Deleted {
                    count_delta = -1;
                }
            }
        } else if cluster == Cluster::Normal {
            count_delta = 1;
        }

        let resolved_uuid = match (uuid, source_version) {
            (Some(u), _) => u,
            (None, Some(src)) => self
                .load_version(node, src)
                .map(|v| v.uuid)
                .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
            (None, None) => previous_normal
                .as_ref()
                .map(|v| v.uuid.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        };

        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let version = Version {
            serial,
            node,
            hash,
            size,
            content_type: content_type.to_string(),
            source_version,
            mtime: at,
            modified_by: modified_by.clone(),
            uuid: resolved_uuid,
            checksum: checksum.to_string(),
            cluster,
            available,
            map_check_timestamp: None,
        };
        self.save_version(&version)?;

        if let Some(src) = source_version {
            self.attribute_copy(node, src, serial)?;
        }
        if cluster == Cluster::Normal {
            self.attribute_set(node, serial, "system", "is_latest", "true")?;
        }

        let own_stats = match cluster {
            Cluster::Normal => Statistics { count: 1, bytes: size, mtime: at },
            Cluster::Deleted => Statistics { count: 0, bytes: 0, mtime: at },
            Cluster::History => self.statistics_get(node)?,
        };
        let bytes = serde_json::to_vec(&own_stats)
            .map_err(|e| CoreError::InternalError(format!("statistics serialization: {e}")))?;
        self.store.put(&stats_key(node), &bytes).map_err(CoreError::from)?;

        self.propagate_statistics(&n, count_delta, bytes_delta, at)?;

        Ok((serial, at))
    }

    fn version_set_available(&self, node: NodeId, serial: Serial, available: bool, checked_at: Timestamp) -> CoreResult<()> {
        let mut version = self.load_version(node, serial)?;
        version.available = available;
        version.map_check_timestamp = Some(checked_at);
        self.save_version(&version)
    }

    fn version_lookup(&self, node: NodeId, before_time: Timestamp, cluster: Cluster) -> CoreResult<Option<Version>> {
        self.latest_in_cluster_set(node, &[cluster], before_time)
    }

    fn version_get_properties(&self, serial: Serial, node: Option<NodeId>) -> CoreResult<Version> {
        let bytes = self
            .store
            .get(&version_serial_index_key(serial))
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::VersionNotExists {
                serial,
                node: node.unwrap_or(0),
            })?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        let indexed_node = u64::from_le_bytes(arr);
        if let Some(expected) = node {
            if expected != indexed_node {
                return Err(CoreError::VersionNotExists { serial, node: expected });
            }
        }
        self.load_version(indexed_node, serial)
    }

    fn version_remove(&self, serial: Serial, refund_stats: bool) -> CoreResult<u64> {
        let version = self.version_get_properties(serial, None)?;
        if refund_stats && version.size > 0 {
            let n = self.load_node(version.node)?;
            self.propagate_statistics(&n, 0, -(version.size as i64), version.mtime)?;
        }
        self.store.delete(&version_key(version.node, serial)).map_err(CoreError::from)?;
        self.store.delete(&version_serial_index_key(serial)).map_err(CoreError::from)?;
        self.store.delete(&attr_key(version.node, serial)).map_err(CoreError::from)?;
        Ok(version.size)
    }

    fn latest_version_list(&self, parent: NodeId, params: &ListingParams) -> CoreResult<ListingResult> {
        let parent_node = self.load_node(parent)?;
        let combined_prefix = if parent_node.path.is_empty() {
            params.prefix.clone()
        } else {
            format!("{}/{}", parent_node.path, params.prefix)
        };
        let before = params.before.unwrap_or(Timestamp::MAX);
        let scan_prefix = node_path_key(&combined_prefix);

        let mut entries: Vec<Entry> = Vec::new();
        let mut seen_subdirs: BTreeSet<String> = BTreeSet::new();

        for (key, value) in self.store.prefix_scan(&scan_prefix).map_err(CoreError::from)? {
            let full_path = std::str::from_utf8(&key)
                .map_err(|e| CoreError::InternalError(format!("path key not utf8: {e}")))?
                .strip_prefix("node:path:")
                .unwrap_or_default()
                .to_string();
            let remainder = &full_path[combined_prefix.len()..];
            if remainder.is_empty() {
                continue;
            }

            if let Some(delim) = params.delimiter {
                if let Some(pos) = remainder.find(delim) {
                    let subdir = format!("{}{}", combined_prefix, &remainder[..=pos]);
                    if seen_subdirs.insert(subdir.clone()) {
                        entries.push(Entry::Subdir(subdir));
                    }
                    continue;
                }
            }

            if let Some(allowed) = &params.allowed_paths {
                if !allowed.contains(&full_path) {
                    continue;
                }
            }

            let mut arr = [0u8; 8];
            arr.copy_from_slice(&value);
            let node_id = u64::from_le_bytes(arr);

            let version = match self.latest_in_cluster_set(
                node_id,
                &[Cluster::Normal, Cluster::History, Cluster::Deleted],
                before,
            )? {
                Some(v) => v,
                None => continue,
            };
            if version.cluster == Cluster::Deleted {
                continue;
            }
            if params.exclude_cluster.contains(&version.cluster) {
                continue;
            }
            if let Some((min, max)) = params.size_range {
                if version.size < min || max.is_some_and(|m| version.size > m) {
                    continue;
                }
            }
            if !params.attr_filters.is_empty() {
                let attrs = self.attributes_for(node_id, version.serial)?;
                let matches = params
                    .attr_filters
                    .iter()
                    .all(|f| attrs.get(&f.domain, &f.key) == Some(f.value.as_str()));
                if !matches {
                    continue;
                }
            }

            entries.push(Entry::Object(ListedObject { path: full_path, version }));
        }

        entries.sort_by(|a, b| entry_path(a).cmp(entry_path(b)));

        let filtered: Vec<Entry> = match &params.marker {
            Some(marker) => entries
                .into_iter()
                .filter(|e| entry_path(e) > marker.as_str())
                .collect(),
            None => entries,
        };

        let limit = params.limit.min(LISTING_MAX_LIMIT);
        let page: Vec<Entry> = filtered.into_iter().take(limit).collect();

        let mut result = ListingResult::default();
        for entry in page {
            match entry {
                Entry::Object(o) => result.objects.push(o),
                Entry::Subdir(s) => result.subdirs.push(s),
            }
        }
        Ok(result)
    }

    fn statistics_get(&self, node: NodeId) -> CoreResult<Statistics> {
        match self.store.get(&stats_key(node)).map_err(CoreError::from)? {
            None => Ok(Statistics::default()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("statistics deserialization: {e}"))),
        }
    }

    fn statistics_latest(
        &self,
        node: NodeId,
        until: Option<Timestamp>,
        except_cluster: Option<Cluster>,
    ) -> CoreResult<Statistics> {
        let n = self.load_node(node)?;
        let before = until.unwrap_or(Timestamp::MAX);
        let descendant_prefix = format!("{}/", n.path);
        let mut total = Statistics::default();

        let mut node_ids: HashSet<NodeId> = HashSet::new();
        node_ids.insert(node);
        for (_, value) in self
            .store
            .prefix_scan(node_path_key(&descendant_prefix).as_slice())
            .map_err(CoreError::from)?
        {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&value);
            node_ids.insert(u64::from_le_bytes(arr));
        }

        for id in node_ids {
            let clusters: Vec<Cluster> = [Cluster::Normal, Cluster::History, Cluster::Deleted]
                .into_iter()
                .filter(|c| Some(*c) != except_cluster)
                .collect();
            if let Some(v) = self.latest_in_cluster_set(id, &clusters, before)? {
                if v.cluster != Cluster::Deleted {
                    total.count += 1;
                    total.bytes += v.size;
                    if v.mtime > total.mtime {
                        total.mtime = v.mtime;
                    }
                }
            }
        }
        Ok(total)
    }

    fn attribute_get(&self, node: NodeId, serial: Serial, domain: &str, key: &str) -> CoreResult<Option<String>> {
        Ok(self.attributes_for(node, serial)?.get(domain, key).map(str::to_string))
    }

    fn attribute_set(&self, node: NodeId, serial: Serial, domain: &str, key: &str, value: &str) -> CoreResult<()> {
        let mut attrs = self.attributes_for(node, serial)?;
        attrs.set(domain, key, value);
        let bytes = serde_json::to_vec(&attrs)
            .map_err(|e| CoreError::InternalError(format!("attribute serialization: {e}")))?;
        self.store.put(&attr_key(node, serial), &bytes).map_err(CoreError::from)
    }

    fn attribute_del(&self, node: NodeId, serial: Serial, domain: &str, key: &str) -> CoreResult<bool> {
        let mut attrs = self.attributes_for(node, serial)?;
        let removed = attrs.del(domain, key);
        if removed {
            let bytes = serde_json::to_vec(&attrs)
                .map_err(|e| CoreError::InternalError(format!("attribute serialization: {e}")))?;
            self.store.put(&attr_key(node, serial), &bytes).map_err(CoreError::from)?;
        }
        Ok(removed)
    }

    fn attribute_copy(&self, node: NodeId, src_version: Serial, dst_version: Serial) -> CoreResult<()> {
        let src_attrs = self.attributes_for(node, src_version)?;
        if src_attrs.is_empty() {
            return Ok(());
        }
        let forked = src_attrs.fork();
        let bytes = serde_json::to_vec(&forked)
            .map_err(|e| CoreError::InternalError(format!("attribute serialization: {e}")))?;
        self.store.put(&attr_key(node, dst_version), &bytes).map_err(CoreError::from)
    }

    fn attributes_for(&self, node: NodeId, serial: Serial) -> CoreResult<Attributes> {
        match self.store.get(&attr_key(node, serial)).map_err(CoreError::from)? {
            None => Ok(Attributes::new()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::InternalError(format!("attribute deserialization: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::InMemoryKVStore;
    use std::sync::Arc;

    fn service() -> NodeTreeService {
        NodeTreeService::new(Arc::new(InMemoryKVStore::new()), NodeTreeConfig::default())
    }

    fn alice() -> Principal {
        Principal::new("alice")
    }

    #[test]
    fn node_create_then_lookup() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        assert_eq!(svc.node_lookup("alice/docs").unwrap().unwrap().id, container.id);
    }

    #[test]
    fn duplicate_node_create_conflicts() {
        let svc = service();
        svc.node_create(None, "alice").unwrap();
        assert!(matches!(svc.node_create(None, "alice"), Err(CoreError::Conflict(_))));
    }

    #[test]
    fn version_create_reclusters_previous_normal() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        let obj = svc.node_create(Some(container.id), "alice/docs/a.txt").unwrap();

        let (s1, _) = svc
            .version_create(obj.id, Some([1u8; 32]), 10, "text/plain", None, &alice(), None, "c1", Cluster::Normal, 100, true, true)
            .unwrap();
        let (s2, _) = svc
            .version_create(obj.id, Some([2u8; 32]), 20, "text/plain", Some(s1), &alice(), None, "c2", Cluster::Normal, 200, true, true)
            .unwrap();

        let v1 = svc.version_get_properties(s1, Some(obj.id)).unwrap();
        assert_eq!(v1.cluster, Cluster::History);
        let v2 = svc.version_get_properties(s2, Some(obj.id)).unwrap();
        assert_eq!(v2.cluster, Cluster::Normal);
        assert_eq!(v1.uuid, v2.uuid);
    }

    #[test]
    fn statistics_reflect_latest_size() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        let obj = svc.node_create(Some(container.id), "alice/docs/a.txt").unwrap();
        svc.version_create(obj.id, Some([1u8; 32]), 10, "text/plain", None, &alice(), None, "c1", Cluster::Normal, 100, true, true)
            .unwrap();

        let container_stats = svc.statistics_get(container.id).unwrap();
        assert_eq!(container_stats.count, 1);
        assert_eq!(container_stats.bytes, 10);
    }

    #[test]
    fn listing_rolls_up_at_delimiter() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        let sub = svc.node_create(Some(container.id), "alice/docs/sub").unwrap();
        let leaf = svc.node_create(Some(sub.id), "alice/docs/sub/a.txt").unwrap();
        let direct = svc.node_create(Some(container.id), "alice/docs/b.txt").unwrap();
        svc.version_create(leaf.id, Some([1u8; 32]), 1, "text/plain", None, &alice(), None, "c", Cluster::Normal, 1, true, true)
            .unwrap();
        svc.version_create(direct.id, Some([2u8; 32]), 2, "text/plain", None, &alice(), None, "c", Cluster::Normal, 1, true, true)
            .unwrap();

        let params = ListingParams {
            prefix: String::new(),
            delimiter: Some('/'),
            ..ListingParams::default()
        };
        let result = svc.latest_version_list(container.id, &params).unwrap();
        assert_eq!(result.subdirs, vec!["alice/docs/sub/".to_string()]);
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].path, "alice/docs/b.txt");
    }

    #[test]
    fn listing_honors_marker_and_limit() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        for name in ["a", "b", "c"] {
            let path = format!("alice/docs/{name}.txt");
            let n = svc.node_create(Some(container.id), &path).unwrap();
            svc.version_create(n.id, Some([1u8; 32]), 1, "text/plain", None, &alice(), None, "c", Cluster::Normal, 1, true, true)
                .unwrap();
        }
        let params = ListingParams {
            marker: Some("alice/docs/a.txt".to_string()),
            limit: 1,
            ..ListingParams::default()
        };
        let result = svc.latest_version_list(container.id, &params).unwrap();
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].path, "alice/docs/b.txt");
    }

    #[test]
    fn point_in_time_listing_hides_deleted_objects() {
        let svc = service();
        let root = svc.node_create(None, "alice").unwrap();
        let container = svc.node_create(Some(root.id), "alice/docs").unwrap();
        let obj = svc.node_create(Some(container.id), "alice/docs/a.txt").unwrap();
        let (s1, _) = svc
            .version_create(obj.id, Some([1u8; 32]), 1, "text/plain", None, &alice(), None, "c", Cluster::Normal, 100, true, true)
            .unwrap();
        svc.version_create(obj.id, None, 0, "text/plain", Some(s1), &alice(), None, "c", Cluster::Deleted, 200, true, true)
            .unwrap();

        let before_delete = ListingParams {
            before: Some(150),
            ..ListingParams::default()
        };
        let after_delete = ListingParams {
            before: Some(250),
            ..ListingParams::default()
        };
        assert_eq!(svc.latest_version_list(container.id, &before_delete).unwrap().objects.len(), 1);
        assert_eq!(svc.latest_version_list(container.id, &after_delete).unwrap().objects.len(), 0);
    }
}
