//! The Storage Façade (§4.7): the one component every outer surface (HTTP
//! handlers, background reconciler) drives. Composes the node tree, block
//! store, permission index, policy store, and commission coordinator behind
//! account/container/object-shaped operations.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use nimbus_block_store::{BlockStoreApi, Hashmap};
use nimbus_bus::{EventSink, Outbox, StorageEvent};
use nimbus_commission::{CommissionCoordinatorApi, MutationAction, ResourceKind};
use nimbus_node_tree::{Cluster, ListingParams, Node, NodeTreeApi, Version};
use nimbus_permissions::{AccessList, Action, PermissionIndexApi};
use nimbus_policy::{Policy, PolicyPatch, PolicyStoreApi, VersioningMode};
use nimbus_quotaholder::QuotaholderApi;
use nimbus_types::{
    hex_encode, CoreError, CoreResult, Hash, NodeId, Principal, ResourceKey, Serial, Timestamp,
};
use tracing::{info, warn};

use crate::config::FacadeConfig;
use crate::entities::{
    AccountStats, ContainerListing, ContainerSummary, ObjectListing, ObjectSummary,
    ListObjectsQuery, PutObjectOutcome, PutObjectRequest, RequestContext,
};
use crate::resolver::DIRECTORY_CONTENT_TYPE;

/// The `client` identity this core registers its commissions under.
const CLIENT_ID: &str = "nimbus-storage";

fn container_path(account: &str, container: &str) -> String {
    format!("{account}/{container}")
}

fn object_path(account: &str, container: &str, name: &str) -> String {
    format!("{account}/{container}/{name}")
}

/// `0` is the wire-layer sentinel for "unbounded"; the Quotaholder itself
/// expresses that as `None`.
fn quota_limit(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

fn is_owner(path: &str, user: &Principal) -> bool {
    path.split('/').next() == Some(user.0.as_str())
}

pub struct StorageFacade {
    tree: Arc<dyn NodeTreeApi + Send + Sync>,
    blocks: Arc<dyn BlockStoreApi + Send + Sync>,
    permissions: Arc<dyn PermissionIndexApi + Send + Sync>,
    policy: Arc<dyn PolicyStoreApi + Send + Sync>,
    quotaholder: Arc<dyn QuotaholderApi + Send + Sync>,
    commissions: Arc<dyn CommissionCoordinatorApi + Send + Sync>,
    events: Arc<dyn EventSink>,
    config: FacadeConfig,
}

impl StorageFacade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: Arc<dyn NodeTreeApi + Send + Sync>,
        blocks: Arc<dyn BlockStoreApi + Send + Sync>,
        permissions: Arc<dyn PermissionIndexApi + Send + Sync>,
        policy: Arc<dyn PolicyStoreApi + Send + Sync>,
        quotaholder: Arc<dyn QuotaholderApi + Send + Sync>,
        commissions: Arc<dyn CommissionCoordinatorApi + Send + Sync>,
        events: Arc<dyn EventSink>,
        config: FacadeConfig,
    ) -> Self {
        Self { tree, blocks, permissions, quotaholder, policy, commissions, events, config }
    }

    fn require_access(&self, path: &str, action: Action, user: &Principal) -> CoreResult<()> {
        if is_owner(path, user) {
            return Ok(());
        }
        if self.permissions.access_check(path, action, user)? {
            Ok(())
        } else {
            Err(CoreError::NotAllowed(format!("{user} may not {action:?} {path}")))
        }
    }

    /// Account nodes are never created through an explicit API call; the
    /// first operation that touches an account materializes its node and
    /// directory-marker version, matching the original system's implicit
    /// account model.
    fn ensure_account(&self, account: &str, at: Timestamp) -> CoreResult<Node> {
        if let Some(node) = self.tree.node_lookup(account)? {
            return Ok(node);
        }
        let node = match self.tree.node_create(None, account) {
            Ok(node) => node,
            Err(CoreError::Conflict(_)) => self
                .tree
                .node_lookup(account)?
                .ok_or_else(|| CoreError::InternalError("account node disappeared".into()))?,
            Err(e) => return Err(e),
        };
        if self.tree.version_lookup(node.id, Timestamp::MAX, Cluster::Normal)?.is_none() {
            self.tree.version_create(
                node.id,
                None,
                0,
                DIRECTORY_CONTENT_TYPE,
                None,
                &Principal::new(account),
                None,
                "",
                Cluster::Normal,
                at,
                true,
                true,
            )?;
        }
        let key = ResourceKey::new(account, account, &self.config.resource_name);
        if self
            .quotaholder
            .get_quota(Some(&[account.to_string()]), Some(&[account.to_string()]), Some(&[self.config.resource_name.clone()]))?
            .is_empty()
        {
            self.quotaholder
                .set_quota(vec![(key, quota_limit(self.config.default_account_quota))])?;
        }
        Ok(node)
    }

    fn ensure_holding(&self, account: &str, project: &str) -> CoreResult<()> {
        if project == account {
            return Ok(());
        }
        let key = ResourceKey::new(account, project, &self.config.resource_name);
        let existing = self.quotaholder.get_quota(
            Some(&[account.to_string()]),
            Some(&[project.to_string()]),
            Some(&[self.config.resource_name.clone()]),
        )?;
        if existing.contains_key(&key) {
            return Ok(());
        }
        self.quotaholder.set_quota(vec![(key, None)])
    }

    fn marker_version(&self, node_id: NodeId) -> CoreResult<Version> {
        self.tree
            .version_lookup(node_id, Timestamp::MAX, Cluster::Normal)?
            .ok_or_else(|| CoreError::NotFound(format!("no marker version for node {node_id}")))
    }

    /// Container-before-object acquisition order (§5 "Locking discipline").
    /// Creates the object node first (outside any lock held on its own
    /// path) if it is genuinely new, then locks it.
    fn lock_container_then_object<'a>(
        &'a self,
        container_path: &str,
        object_path: &str,
    ) -> CoreResult<(nimbus_node_tree::NodeLockGuard<'a>, Node, nimbus_node_tree::NodeLockGuard<'a>)> {
        let (container_node, container_guard) = self.tree.node_lookup_for_update(container_path)?;
        let container_node = container_node.ok_or_else(|| CoreError::NotFound(format!("container {container_path}")))?;

        if self.tree.node_lookup(object_path)?.is_none() {
            match self.tree.node_create(Some(container_node.id), object_path) {
                Ok(_) => {}
                Err(CoreError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        let (object_node, object_guard) = self.tree.node_lookup_for_update(object_path)?;
        let object_node = object_node.ok_or_else(|| CoreError::NotFound(format!("object {object_path}")))?;
        Ok((container_guard, object_node, object_guard))
    }

    // ---------------------------------------------------------------
    // Account
    // ---------------------------------------------------------------

    pub fn account_stats(&self, ctx: &RequestContext, at: Timestamp) -> CoreResult<AccountStats> {
        self.require_access(&ctx.account, Action::Read, &ctx.user)?;
        let node = self.ensure_account(&ctx.account, at)?;
        let stats = self.tree.statistics_get(node.id)?;
        let policy = self.policy.policy_get(node.id)?;
        Ok(AccountStats { count: stats.count, bytes: stats.bytes, until: None, policy })
    }

    pub fn list_containers(
        &self,
        ctx: &RequestContext,
        query: &ListObjectsQuery,
        at: Timestamp,
    ) -> CoreResult<ContainerListing> {
        self.require_access(&ctx.account, Action::Read, &ctx.user)?;
        let node = self.ensure_account(&ctx.account, at)?;

        let allowed = self.allowed_paths_for(ctx, &ctx.account, query.show_only_shared)?;
        let params = ListingParams {
            prefix: query.prefix.clone(),
            marker: query.marker.clone(),
            limit: query.limit.unwrap_or(self.config.listing_limit).min(self.config.listing_limit),
            before: query.until,
            allowed_paths: allowed,
            domain: query.meta_domain.clone(),
            ..ListingParams::default()
        };
        let result = self.tree.latest_version_list(node.id, &params)?;

        let mut containers = Vec::with_capacity(result.objects.len());
        for entry in result.objects {
            if query.show_only_shared && is_owner(&entry.path, &ctx.user) {
                continue;
            }
            if let Some(cnode) = self.tree.node_lookup(&entry.path)? {
                let stats = self.tree.statistics_get(cnode.id)?;
                let policy = self.policy.policy_get(cnode.id)?;
                let name = entry.path.rsplit('/').next().unwrap_or(&entry.path).to_string();
                containers.push(ContainerSummary { name, stats, policy });
            }
        }
        Ok(ContainerListing { containers })
    }

    fn allowed_paths_for(&self, ctx: &RequestContext, scope: &str, show_only_shared: bool) -> CoreResult<Option<HashSet<String>>> {
        if is_owner(scope, &ctx.user) && !show_only_shared {
            return Ok(None);
        }
        Ok(Some(self.permissions.access_list_paths(&ctx.user, Action::Read, Some(scope))?))
    }

    pub fn get_account_meta(&self, ctx: &RequestContext, domain: &str, at: Timestamp) -> CoreResult<Vec<(String, String)>> {
        self.require_access(&ctx.account, Action::Read, &ctx.user)?;
        let node = self.ensure_account(&ctx.account, at)?;
        let version = self.marker_version(node.id)?;
        let attrs = self.tree.attributes_for(node.id, version.serial)?;
        Ok(attrs.domain(domain).map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    pub fn update_account_meta(
        &self,
        ctx: &RequestContext,
        domain: &str,
        updates: Vec<(String, Option<String>)>,
        at: Timestamp,
    ) -> CoreResult<()> {
        self.require_access(&ctx.account, Action::Write, &ctx.user)?;
        let node = self.ensure_account(&ctx.account, at)?;
        let version = self.marker_version(node.id)?;
        for (key, value) in updates {
            match value {
                Some(v) => self.tree.attribute_set(node.id, version.serial, domain, &key, &v)?,
                None => {
                    self.tree.attribute_del(node.id, version.serial, domain, &key)?;
                }
            }
        }
        self.emit(StorageEvent::AccountUpdated { account: Principal::new(ctx.account.clone()), at });
        Ok(())
    }

    pub fn update_account_groups(&self, ctx: &RequestContext, group: &str, members: Vec<Principal>) -> CoreResult<()> {
        self.require_access(&ctx.account, Action::Write, &ctx.user)?;
        self.permissions.update_account_groups(&Principal::new(ctx.account.clone()), group, members)
    }

    pub fn get_account_groups(&self, ctx: &RequestContext) -> CoreResult<BTreeMap<String, Vec<Principal>>> {
        self.require_access(&ctx.account, Action::Read, &ctx.user)?;
        self.permissions.get_account_groups(&Principal::new(ctx.account.clone()))
    }

    // ---------------------------------------------------------------
    // Container
    // ---------------------------------------------------------------

    pub fn put_container(
        &self,
        ctx: &RequestContext,
        container: &str,
        quota: Option<u64>,
        versioning: Option<VersioningMode>,
        project: Option<String>,
        at: Timestamp,
    ) -> CoreResult<ContainerSummary> {
        self.require_access(&ctx.account, Action::Write, &ctx.user)?;
        let account_node = self.ensure_account(&ctx.account, at)?;
        let path = container_path(&ctx.account, container);
        if self.tree.node_lookup(&path)?.is_some() {
            return Err(CoreError::Conflict(format!("container {path} already exists")));
        }

        let node = self.tree.node_create(Some(account_node.id), &path)?;
        self.tree.version_create(
            node.id,
            None,
            0,
            DIRECTORY_CONTENT_TYPE,
            None,
            &ctx.user,
            None,
            "",
            Cluster::Normal,
            at,
            true,
            true,
        )?;

        let resolved_project = project.unwrap_or_else(|| ctx.account.clone());
        let patch = PolicyPatch {
            quota: Some(quota.unwrap_or(self.config.default_container_quota)),
            versioning: Some(versioning.unwrap_or(self.config.default_container_versioning)),
            project: Some(resolved_project.clone()),
        };
        let policy = self.policy.policy_set(node.id, patch, true)?;
        self.ensure_holding(&ctx.account, &resolved_project)?;

        self.emit(StorageEvent::ContainerCreated {
            account: Principal::new(ctx.account.clone()),
            container: container.to_string(),
            at,
        });

        Ok(ContainerSummary { name: container.to_string(), stats: Default::default(), policy })
    }

    /// When `policy.project` changes, moves the container's current usage
    /// to the new project via a reassignment commission before the policy
    /// row is updated; if the commission fails, the policy is left as-is
    /// (§8 scenario 3).
    pub fn update_container_policy(
        &self,
        ctx: &RequestContext,
        container: &str,
        patch: PolicyPatch,
        replace: bool,
        at: Timestamp,
    ) -> CoreResult<Policy> {
        let path = container_path(&ctx.account, container);
        self.require_access(&path, Action::Write, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("container {path}")))?;
        let current = self.policy.policy_get(node.id)?;

        if let Some(new_project) = &patch.project {
            if *new_project != current.project {
                self.ensure_holding(&ctx.account, new_project)?;
                let stats = self.tree.statistics_get(node.id)?;
                if stats.bytes > 0 {
                    let provisions = MutationAction::Reassign {
                        holder: ctx.account.clone(),
                        old_project: current.project.clone(),
                        new_project: new_project.clone(),
                        resource: self.config.resource_name.clone(),
                        bytes: stats.bytes,
                    }
                    .provisions_for(ResourceKind::Container)?;
                    let resource_key = format!("container-reassign:{path}");
                    let serial = self.commissions.issue(
                        &resource_key,
                        CLIENT_ID,
                        provisions,
                        "container project reassignment",
                        false,
                        at,
                    )?;
                    self.commissions.accept(serial, at)?;
                }
            }
        }

        let updated = self.policy.policy_set(node.id, patch, replace)?;
        self.emit(StorageEvent::AccountUpdated { account: Principal::new(ctx.account.clone()), at });
        Ok(updated)
    }

    pub fn delete_container(
        &self,
        ctx: &RequestContext,
        container: &str,
        until: Option<Timestamp>,
        delimiter: Option<char>,
        at: Timestamp,
    ) -> CoreResult<()> {
        let path = container_path(&ctx.account, container);
        self.require_access(&path, Action::Write, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("container {path}")))?;

        if let Some(cutoff) = until {
            self.purge_history_before(ctx, node.id, cutoff, at)?;
            return Ok(());
        }

        if delimiter.is_some() {
            self.delete_contents(ctx, container, at)?;
            return Ok(());
        }

        let params = ListingParams { limit: 1, ..ListingParams::default() };
        let listing = self.tree.latest_version_list(node.id, &params)?;
        if !listing.objects.is_empty() || !listing.subdirs.is_empty() {
            return Err(CoreError::Conflict(format!("container {path} is not empty")));
        }
        self.tree.node_remove(node.id)?;
        self.emit(StorageEvent::ContainerDeleted {
            account: Principal::new(ctx.account.clone()),
            container: container.to_string(),
            at,
        });
        Ok(())
    }

    /// Physically drops every retained HISTORY/DELETED version older than
    /// `cutoff` reachable from each live object's `source_version` chain.
    /// Unless `free_versioning` is set, HISTORY bytes stay counted as usage
    /// until this purge runs (§4.7, §6 "free_versioning"); in that case the
    /// total freed across the sweep is refunded as a single commission
    /// against the container once the purge completes.
    fn purge_history_before(&self, ctx: &RequestContext, node_id: NodeId, cutoff: Timestamp, at: Timestamp) -> CoreResult<()> {
        let policy = self.policy.policy_get(node_id)?;
        let refund_stats = !self.config.free_versioning;
        let mut freed_total: u64 = 0;
        loop {
            let params = ListingParams { limit: self.config.listing_limit, ..ListingParams::default() };
            let listing = self.tree.latest_version_list(node_id, &params)?;
            if listing.objects.is_empty() {
                break;
            }
            for entry in &listing.objects {
                let mut cursor = entry.version.source_version;
                while let Some(serial) = cursor {
                    let version = self.tree.version_get_properties(serial, None)?;
                    cursor = version.source_version;
                    if version.mtime < cutoff {
                        freed_total += self.tree.version_remove(serial, refund_stats)?;
                    }
                }
            }
            if listing.objects.len() < self.config.listing_limit {
                break;
            }
        }
        if refund_stats && freed_total > 0 {
            let provisions = MutationAction::SizeDelta {
                holder: ctx.account.clone(),
                project: policy.project.clone(),
                resource: self.config.resource_name.clone(),
                delta: -(freed_total as i64),
            }
            .provisions_for(ResourceKind::Container)?;
            let resource_key = format!("container-purge:{node_id}:{cutoff}");
            let serial = self.commissions.issue(&resource_key, CLIENT_ID, provisions, "history purge refund", false, at)?;
            self.commissions.accept(serial, at)?;
        }
        Ok(())
    }

    fn delete_contents(&self, ctx: &RequestContext, container: &str, at: Timestamp) -> CoreResult<()> {
        let path = container_path(&ctx.account, container);
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("container {path}")))?;
        loop {
            let params = ListingParams { limit: self.config.listing_limit, ..ListingParams::default() };
            let listing = self.tree.latest_version_list(node.id, &params)?;
            if listing.objects.is_empty() {
                break;
            }
            let count = listing.objects.len();
            for entry in listing.objects {
                let name = entry.path.rsplit('/').next().unwrap_or(&entry.path).to_string();
                self.delete_object(ctx, container, &name, at)?;
            }
            if count < self.config.listing_limit {
                break;
            }
        }
        Ok(())
    }

    pub fn list_objects(&self, ctx: &RequestContext, container: &str, query: &ListObjectsQuery, _at: Timestamp) -> CoreResult<ObjectListing> {
        let path = container_path(&ctx.account, container);
        self.require_access(&path, Action::Read, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("container {path}")))?;

        let allowed = self.allowed_paths_for(ctx, &path, query.show_only_shared)?;
        let params = ListingParams {
            prefix: query.prefix.clone(),
            delimiter: query.delimiter,
            marker: query.marker.clone(),
            limit: query.limit.unwrap_or(self.config.listing_limit).min(self.config.listing_limit),
            before: query.until,
            allowed_paths: allowed,
            domain: query.meta_domain.clone(),
            ..ListingParams::default()
        };
        let result = self.tree.latest_version_list(node.id, &params)?;

        let mut objects = Vec::with_capacity(result.objects.len());
        for entry in result.objects {
            if query.show_only_shared && is_owner(&entry.path, &ctx.user) {
                continue;
            }
            let name = entry.path.rsplit('/').next().unwrap_or(&entry.path).to_string();
            objects.push(ObjectSummary {
                name,
                version_serial: entry.version.serial,
                size: entry.version.size,
                hash: entry.version.hash,
                content_type: entry.version.content_type.clone(),
                mtime: entry.version.mtime,
                uuid: entry.version.uuid.clone(),
            });
        }
        Ok(ObjectListing { objects, subdirs: result.subdirs })
    }

    // ---------------------------------------------------------------
    // Object
    // ---------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn put_object_version(
        &self,
        ctx: &RequestContext,
        container: &str,
        name: &str,
        request: PutObjectRequest,
        hashmap: Hashmap,
        at: Timestamp,
        available: bool,
        require_blocks_present: bool,
    ) -> CoreResult<PutObjectOutcome> {
        let container_path = container_path(&ctx.account, container);
        let object_path = object_path(&ctx.account, container, name);
        self.require_access(&container_path, Action::Write, &ctx.user)?;

        if require_blocks_present {
            let missing = self.blocks.block_search(&hashmap)?;
            if !missing.is_empty() {
                return Ok(PutObjectOutcome::MissingBlocks(missing));
            }
        }
        let root_hash = hashmap.root_hash();
        self.blocks.map_put(&root_hash, &hashmap)?;

        let container_node = self
            .tree
            .node_lookup(&container_path)?
            .ok_or_else(|| CoreError::NotFound(format!("container {container_path}")))?;
        let policy = self.policy.policy_get(container_node.id)?;

        let (_container_guard, object_node, _object_guard) =
            self.lock_container_then_object(&container_path, &object_path)?;

        let previous = self.tree.version_lookup(object_node.id, Timestamp::MAX, Cluster::Normal)?;
        let previous_size = previous.as_ref().map(|v| v.size).unwrap_or(0);
        let net_immediately = policy.versioning == VersioningMode::None || self.config.free_versioning;
        let delta = if net_immediately {
            request.size as i64 - previous_size as i64
        } else {
            request.size as i64
        };

        let container_stats = self.tree.statistics_get(container_node.id)?;
        if policy.quota != 0 && delta > 0 && container_stats.bytes as i64 + delta > policy.quota as i64 {
            return Err(CoreError::quota_exceeded(
                container_path.clone(),
                self.config.resource_name.clone(),
                policy.quota,
                container_stats.bytes,
                delta,
            ));
        }

        let provisions = MutationAction::SizeDelta {
            holder: ctx.account.clone(),
            project: policy.project.clone(),
            resource: self.config.resource_name.clone(),
            delta,
        }
        .provisions_for(ResourceKind::StorageObject)?;

        let resource_key = format!("object:{object_path}#{}", object_node.id);
        let serial = self.commissions.issue(&resource_key, CLIENT_ID, provisions, "object upload", false, at)?;

        let write_result: CoreResult<(Serial, Timestamp)> = (|| {
            let (version_serial, mtime) = self.tree.version_create(
                object_node.id,
                Some(root_hash),
                request.size,
                &request.content_type,
                previous.as_ref().map(|v| v.serial),
                &ctx.user,
                None,
                &request.checksum,
                Cluster::Normal,
                at,
                available,
                net_immediately,
            )?;
            if let Some(prev) = &previous {
                if policy.versioning == VersioningMode::None {
                    self.tree.version_remove(prev.serial, false)?;
                }
            }
            let meta_domain = if request.domain.is_empty() { "user" } else { request.domain.as_str() };
            if request.replace_meta {
                if let Some(prev) = &previous {
                    let stale: Vec<String> = self
                        .tree
                        .attributes_for(object_node.id, prev.serial)?
                        .domain(meta_domain)
                        .map(|(k, _)| k.to_string())
                        .collect();
                    for key in stale {
                        self.tree.attribute_del(object_node.id, version_serial, meta_domain, &key)?;
                    }
                }
            }
            for (key, value) in &request.meta {
                self.tree.attribute_set(object_node.id, version_serial, meta_domain, key, value)?;
            }
            if let Some(perm) = request.permissions.clone() {
                self.permissions.access_set(&object_path, perm)?;
            }
            Ok((version_serial, mtime))
        })();

        let (version_serial, mtime) = match write_result {
            Ok(v) => v,
            Err(err) => {
                if let Err(reject_err) = self.commissions.reject(serial, "local write failed", at) {
                    warn!(error = %reject_err, serial, "failed to reject commission after local write failure");
                }
                return Err(err);
            }
        };
        self.commissions.accept(serial, at)?;

        let mut outbox = Outbox::new();
        outbox.push(if previous.is_some() {
            StorageEvent::ObjectModified {
                account: Principal::new(ctx.account.clone()),
                path: object_path.clone(),
                node: object_node.id,
                version: version_serial,
                size: request.size,
                root_hash,
                at: mtime,
            }
        } else {
            StorageEvent::ObjectCreated {
                account: Principal::new(ctx.account.clone()),
                path: object_path.clone(),
                node: object_node.id,
                version: version_serial,
                size: request.size,
                root_hash,
                at: mtime,
            }
        });
        outbox.flush(&self.events);

        info!(path = %object_path, version_serial, "object version committed");
        Ok(PutObjectOutcome::Created { version_serial, root_hash })
    }

    /// §4.7 `update_object_hashmap`: requires every referenced block to be
    /// present locally before a version is created.
    pub fn update_object_hashmap(
        &self,
        ctx: &RequestContext,
        container: &str,
        name: &str,
        request: PutObjectRequest,
        hashmap: Hashmap,
        at: Timestamp,
    ) -> CoreResult<PutObjectOutcome> {
        self.put_object_version(ctx, container, name, request, hashmap, at, true, true)
    }

    /// §4.7 `register_object_map`: the data is produced out-of-band, so the
    /// version is recorded `available = false` and block presence is not
    /// enforced.
    pub fn register_object_map(
        &self,
        ctx: &RequestContext,
        container: &str,
        name: &str,
        request: PutObjectRequest,
        hashmap: Hashmap,
        at: Timestamp,
    ) -> CoreResult<PutObjectOutcome> {
        self.put_object_version(ctx, container, name, request, hashmap, at, false, false)
    }

    /// Resolves the latest NORMAL version of an object, flipping
    /// `available` once out-of-band block data has shown up (§4.7
    /// "Availability").
    pub fn get_object_version(&self, ctx: &RequestContext, container: &str, name: &str, at: Timestamp) -> CoreResult<Version> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Read, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;
        let version = self
            .tree
            .version_lookup(node.id, Timestamp::MAX, Cluster::Normal)?
            .ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;

        if version.available {
            return Ok(version);
        }
        let due = version.map_check_timestamp.map(|t| at >= t + self.config.map_check_interval).unwrap_or(true);
        if !due {
            return Err(CoreError::IllegalOperation(format!("object {path} block data not yet available")));
        }
        if let Some(hash) = version.hash {
            if self.blocks.map_get(&hash).is_ok() {
                self.tree.version_set_available(node.id, version.serial, true, at)?;
                let mut refreshed = version;
                refreshed.available = true;
                return Ok(refreshed);
            }
        }
        self.tree.version_set_available(node.id, version.serial, false, at)?;
        Err(CoreError::IllegalOperation(format!("object {path} block data not yet available")))
    }

    /// §6 "GET ... with ... version": fetches a specific historical
    /// generation by serial instead of resolving the current NORMAL version.
    /// Unlike [`get_object_version`](Self::get_object_version), this never
    /// refreshes `available` — a client asking for an old version by number
    /// is browsing history, not polling for out-of-band data to show up.
    pub fn get_object_version_at_serial(
        &self,
        ctx: &RequestContext,
        container: &str,
        name: &str,
        serial: Serial,
    ) -> CoreResult<Version> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Read, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;
        self.tree.version_get_properties(serial, Some(node.id))
    }

    /// Walks the `source_version` chain back from the current NORMAL (or,
    /// failing that, DELETED) version to enumerate every generation still
    /// on disk, newest first.
    pub fn list_versions(&self, ctx: &RequestContext, container: &str, name: &str) -> CoreResult<Vec<Version>> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Read, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;

        let head = match self.tree.version_lookup(node.id, Timestamp::MAX, Cluster::Normal)? {
            Some(v) => v,
            None => self
                .tree
                .version_lookup(node.id, Timestamp::MAX, Cluster::Deleted)?
                .ok_or_else(|| CoreError::NotFound(format!("object {path}")))?,
        };

        let mut versions = vec![head.clone()];
        let mut cursor = head.source_version;
        while let Some(serial) = cursor {
            let version = self.tree.version_get_properties(serial, None)?;
            cursor = version.source_version;
            versions.push(version);
        }
        Ok(versions)
    }

    pub fn copy_object(
        &self,
        ctx: &RequestContext,
        src_container: &str,
        src_name: &str,
        dst_container: &str,
        dst_name: &str,
        at: Timestamp,
    ) -> CoreResult<(Serial, Hash)> {
        self.transfer_object(ctx, src_container, src_name, dst_container, dst_name, at, false)
    }

    pub fn move_object(
        &self,
        ctx: &RequestContext,
        src_container: &str,
        src_name: &str,
        dst_container: &str,
        dst_name: &str,
        at: Timestamp,
    ) -> CoreResult<(Serial, Hash)> {
        self.transfer_object(ctx, src_container, src_name, dst_container, dst_name, at, true)
    }

    /// `copy_object`/`move_object`: the destination references the source's
    /// root hash without copying block data (§4.7, §8 scenario 4). A move
    /// additionally deletes the source version. Open Question (§9,
    /// recorded in DESIGN.md): cross-project transfers credit the
    /// destination project, matching the existing system's assumed
    /// behavior.
    fn transfer_object(
        &self,
        ctx: &RequestContext,
        src_container: &str,
        src_name: &str,
        dst_container: &str,
        dst_name: &str,
        at: Timestamp,
        is_move: bool,
    ) -> CoreResult<(Serial, Hash)> {
        let src_path = object_path(&ctx.account, src_container, src_name);
        let dst_container_path = container_path(&ctx.account, dst_container);
        self.require_access(&src_path, Action::Read, &ctx.user)?;
        self.require_access(&dst_container_path, Action::Write, &ctx.user)?;

        let src_node = self.tree.node_lookup(&src_path)?.ok_or_else(|| CoreError::NotFound(format!("object {src_path}")))?;
        let src_version = self
            .tree
            .version_lookup(src_node.id, Timestamp::MAX, Cluster::Normal)?
            .ok_or_else(|| CoreError::NotFound(format!("object {src_path}")))?;

        let request = PutObjectRequest {
            size: src_version.size,
            content_type: src_version.content_type.clone(),
            checksum: src_version.checksum.clone(),
            domain: String::new(),
            meta: Vec::new(),
            replace_meta: false,
            permissions: None,
        };
        let hash = src_version.hash.ok_or_else(|| CoreError::IllegalOperation("cannot copy a directory marker".into()))?;
        let hashmap = self.blocks.map_get(&hash)?;

        let outcome = self.put_object_version(ctx, dst_container, dst_name, request, hashmap, at, src_version.available, false)?;
        let (version_serial, root_hash) = match outcome {
            PutObjectOutcome::Created { version_serial, root_hash } => (version_serial, root_hash),
            PutObjectOutcome::MissingBlocks(_) => {
                return Err(CoreError::InternalError("copy destination reported missing blocks".into()))
            }
        };

        if is_move {
            self.delete_object(ctx, src_container, src_name, at)?;
        }

        Ok((version_serial, root_hash))
    }

    /// §4.7 `delete_object`: `versioning=auto` retains the superseded
    /// version as HISTORY (no refund until a later purge); `versioning=none`
    /// physically removes it and refunds immediately.
    pub fn delete_object(&self, ctx: &RequestContext, container: &str, name: &str, at: Timestamp) -> CoreResult<()> {
        let container_path = container_path(&ctx.account, container);
        let object_path = object_path(&ctx.account, container, name);
        self.require_access(&container_path, Action::Write, &ctx.user)?;

        let container_node = self.tree.node_lookup(&container_path)?.ok_or_else(|| CoreError::NotFound(format!("container {container_path}")))?;
        let policy = self.policy.policy_get(container_node.id)?;

        let (_container_guard, object_node, _object_guard) = self.lock_container_then_object(&container_path, &object_path)?;
        let previous = self
            .tree
            .version_lookup(object_node.id, Timestamp::MAX, Cluster::Normal)?
            .ok_or_else(|| CoreError::NotFound(format!("object {object_path}")))?;

        let net_immediately = policy.versioning == VersioningMode::None || self.config.free_versioning;
        let delta = if net_immediately { -(previous.size as i64) } else { 0 };
        let provisions = MutationAction::SizeDelta {
            holder: ctx.account.clone(),
            project: policy.project.clone(),
            resource: self.config.resource_name.clone(),
            delta,
        }
        .provisions_for(ResourceKind::StorageObject)?;

        let resource_key = format!("object:{object_path}#{}", object_node.id);
        let serial = self.commissions.issue(&resource_key, CLIENT_ID, provisions, "object delete", false, at)?;

        let write_result = self.tree.version_create(
            object_node.id,
            None,
            0,
            &previous.content_type,
            Some(previous.serial),
            &ctx.user,
            Some(previous.uuid.clone()),
            "",
            Cluster::Deleted,
            at,
            true,
            net_immediately,
        );
        if let Err(err) = write_result {
            if let Err(reject_err) = self.commissions.reject(serial, "local delete failed", at) {
                warn!(error = %reject_err, serial, "failed to reject commission after local delete failure");
            }
            return Err(err);
        }
        if policy.versioning == VersioningMode::None {
            self.tree.version_remove(previous.serial, false)?;
        }
        self.commissions.accept(serial, at)?;

        self.emit(StorageEvent::ObjectDeleted { account: Principal::new(ctx.account.clone()), path: object_path, node: object_node.id, at });
        Ok(())
    }

    /// §6 "POST .../{name} → metadata ... updates": edits attributes on the
    /// object's current NORMAL version in place rather than creating a new
    /// one — unlike content writes, metadata edits don't change `size` or
    /// `hash`, so there is nothing for a new version to supersede (Open
    /// Question, recorded in DESIGN.md).
    pub fn update_object_meta(
        &self,
        ctx: &RequestContext,
        container: &str,
        name: &str,
        domain: &str,
        updates: Vec<(String, Option<String>)>,
        at: Timestamp,
    ) -> CoreResult<()> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Write, &ctx.user)?;
        let node = self.tree.node_lookup(&path)?.ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;
        let version = self
            .tree
            .version_lookup(node.id, Timestamp::MAX, Cluster::Normal)?
            .ok_or_else(|| CoreError::NotFound(format!("object {path}")))?;
        for (key, value) in updates {
            match value {
                Some(v) => self.tree.attribute_set(node.id, version.serial, domain, &key, &v)?,
                None => {
                    self.tree.attribute_del(node.id, version.serial, domain, &key)?;
                }
            }
        }
        self.emit(StorageEvent::ObjectModified {
            account: Principal::new(ctx.account.clone()),
            path,
            node: node.id,
            version: version.serial,
            size: version.size,
            root_hash: version.hash.unwrap_or([0u8; 32]),
            at,
        });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sharing
    // ---------------------------------------------------------------

    pub fn update_object_permissions(&self, ctx: &RequestContext, container: &str, name: &str, list: AccessList, at: Timestamp) -> CoreResult<()> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Write, &ctx.user)?;
        self.permissions.access_set(&path, list)?;
        self.emit(StorageEvent::SharingChanged { account: Principal::new(ctx.account.clone()), path, at });
        Ok(())
    }

    pub fn update_object_public(&self, ctx: &RequestContext, container: &str, name: &str, public: bool, at: Timestamp) -> CoreResult<Option<String>> {
        let path = object_path(&ctx.account, container, name);
        self.require_access(&path, Action::Write, &ctx.user)?;
        let token = if public {
            Some(self.permissions.public_set(&path, self.config.public_url_security, &self.config.public_url_alphabet)?)
        } else {
            self.permissions.public_unset(&path)?;
            None
        };
        self.emit(StorageEvent::SharingChanged { account: Principal::new(ctx.account.clone()), path, at });
        Ok(token)
    }

    pub fn resolve_public_token(&self, token: &str) -> CoreResult<Option<String>> {
        self.permissions.public_path(token)
    }

    fn emit(&self, event: StorageEvent) {
        let mut outbox = Outbox::new();
        outbox.push(event);
        outbox.flush(&self.events);
    }
}

/// Hex-encode a root hash for logging/wire responses, re-exported for
/// convenience at the façade boundary.
pub fn root_hash_hex(hash: &Hash) -> String {
    hex_encode(hash)
}
